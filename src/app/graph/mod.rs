mod interaction;
mod labels;
mod model;
mod render;
mod view;

pub(in crate::app) use labels::LabelOverlay;
pub(in crate::app) use model::{Cluster, GraphEdge, GraphModel, GraphNode, NodeRequest};
pub(in crate::app) use render::RenderLayer;
