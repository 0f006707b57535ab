use std::collections::{HashMap, VecDeque};

use eframe::egui::{Vec2, vec2};
use rand::Rng;
use tracing::debug;

use super::super::physics::{ForceParams, Simulation};

const CLUSTER_RADIUS: f32 = 420.0;
const LEAF_JITTER: f32 = 40.0;
pub(in crate::app) const HUB_ID: &str = "__hub__";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(in crate::app) enum Cluster {
    Hub,
    Input,
    Parse,
    Sentiment,
    Topic,
    Entity,
    Conflict,
    Output,
}

impl Cluster {
    pub(in crate::app) const RING: [Cluster; 7] = [
        Cluster::Input,
        Cluster::Parse,
        Cluster::Sentiment,
        Cluster::Topic,
        Cluster::Entity,
        Cluster::Conflict,
        Cluster::Output,
    ];

    pub(in crate::app) fn label(self) -> &'static str {
        match self {
            Self::Hub => "HUB",
            Self::Input => "INPUT",
            Self::Parse => "PARSE",
            Self::Sentiment => "SENTIMENT",
            Self::Topic => "TOPIC",
            Self::Entity => "ENTITY",
            Self::Conflict => "CONFLICT",
            Self::Output => "OUTPUT",
        }
    }

    pub(in crate::app) fn anchor_id(self) -> String {
        match self {
            Self::Hub => HUB_ID.to_owned(),
            other => format!("__cluster_{}__", other.label()),
        }
    }

    fn anchor_position(ring_index: usize) -> Vec2 {
        let angle = (ring_index as f32 / Self::RING.len() as f32) * std::f32::consts::TAU
            - std::f32::consts::FRAC_PI_2;
        vec2(angle.cos(), angle.sin()) * CLUSTER_RADIUS
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) struct GraphNode {
    pub(in crate::app) id: String,
    pub(in crate::app) cluster: Cluster,
    pub(in crate::app) label: String,
    pub(in crate::app) title: String,
    pub(in crate::app) position: Vec2,
    pub(in crate::app) velocity: Vec2,
    pub(in crate::app) fixed: Option<Vec2>,
}

impl GraphNode {
    pub(in crate::app) fn is_leaf(&self) -> bool {
        self.fixed.is_none()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) struct GraphEdge {
    pub(in crate::app) source: usize,
    pub(in crate::app) target: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) struct NodeRequest {
    pub(in crate::app) id: String,
    pub(in crate::app) cluster: Cluster,
    pub(in crate::app) label: String,
    pub(in crate::app) title: String,
}

#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) struct LeafInsert {
    pub(in crate::app) index: usize,
    pub(in crate::app) evicted: Option<String>,
}

#[derive(Clone, Copy)]
pub(in crate::app) struct GraphSnapshot<'a> {
    pub(in crate::app) nodes: &'a [GraphNode],
    pub(in crate::app) edges: &'a [GraphEdge],
}

pub(in crate::app) struct GraphModel<R> {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    index_by_id: HashMap<String, usize>,
    leaf_order: VecDeque<String>,
    max_leaf_nodes: usize,
    revision: u64,
    simulation: Simulation,
    rng: R,
}

impl<R: Rng> GraphModel<R> {
    pub(in crate::app) fn new(max_leaf_nodes: usize, rng: R) -> Self {
        let mut nodes = Vec::with_capacity(Cluster::RING.len() + 1);
        nodes.push(GraphNode {
            id: HUB_ID.to_owned(),
            cluster: Cluster::Hub,
            label: "NLU Core".to_owned(),
            title: String::new(),
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            fixed: Some(Vec2::ZERO),
        });
        for (ring_index, cluster) in Cluster::RING.into_iter().enumerate() {
            let position = Cluster::anchor_position(ring_index);
            nodes.push(GraphNode {
                id: cluster.anchor_id(),
                cluster,
                label: cluster.label().to_owned(),
                title: String::new(),
                position,
                velocity: Vec2::ZERO,
                fixed: Some(position),
            });
        }

        let edges = (1..nodes.len())
            .map(|target| GraphEdge { source: 0, target })
            .collect();
        let index_by_id = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id.clone(), index))
            .collect();

        Self {
            nodes,
            edges,
            index_by_id,
            leaf_order: VecDeque::new(),
            max_leaf_nodes: max_leaf_nodes.max(1),
            revision: 0,
            simulation: Simulation::new(ForceParams::default()),
            rng,
        }
    }

    pub(in crate::app) fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub(in crate::app) fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub(in crate::app) fn leaf_count(&self) -> usize {
        self.leaf_order.len()
    }

    pub(in crate::app) fn max_leaf_nodes(&self) -> usize {
        self.max_leaf_nodes
    }

    pub(in crate::app) fn leaf_ids(&self) -> impl Iterator<Item = &str> {
        self.leaf_order.iter().map(String::as_str)
    }

    /// Bumped whenever node indices may have changed.
    pub(in crate::app) fn revision(&self) -> u64 {
        self.revision
    }

    pub(in crate::app) fn alpha(&self) -> f32 {
        self.simulation.alpha()
    }

    pub(in crate::app) fn steps(&self) -> u64 {
        self.simulation.steps()
    }

    pub(in crate::app) fn snapshot(&self) -> GraphSnapshot<'_> {
        GraphSnapshot {
            nodes: &self.nodes,
            edges: &self.edges,
        }
    }

    pub(in crate::app) fn add_leaf(&mut self, request: NodeRequest) -> Option<LeafInsert> {
        if self.index_by_id.contains_key(&request.id) {
            debug!(id = %request.id, "duplicate leaf ignored");
            return None;
        }

        let evicted = if self.leaf_order.len() >= self.max_leaf_nodes {
            self.evict_oldest()
        } else {
            None
        };

        let anchor = self.index_by_id.get(&request.cluster.anchor_id()).copied();
        let base = anchor
            .and_then(|index| self.nodes.get(index))
            .map_or(Vec2::ZERO, |node| node.position);
        let jitter = vec2(
            self.rng.gen_range(-LEAF_JITTER..LEAF_JITTER),
            self.rng.gen_range(-LEAF_JITTER..LEAF_JITTER),
        );

        let index = self.nodes.len();
        self.index_by_id.insert(request.id.clone(), index);
        self.leaf_order.push_back(request.id.clone());
        self.nodes.push(GraphNode {
            id: request.id,
            cluster: request.cluster,
            label: request.label,
            title: request.title,
            position: base + jitter,
            velocity: Vec2::ZERO,
            fixed: None,
        });
        if let Some(anchor) = anchor {
            self.edges.push(GraphEdge {
                source: anchor,
                target: index,
            });
        }

        self.revision += 1;
        self.simulation.reheat();
        Some(LeafInsert { index, evicted })
    }

    fn evict_oldest(&mut self) -> Option<String> {
        let id = self.leaf_order.pop_front()?;
        let Some(removed) = self.index_by_id.remove(&id) else {
            return Some(id);
        };

        self.nodes.remove(removed);
        self.edges
            .retain(|edge| edge.source != removed && edge.target != removed);
        for edge in &mut self.edges {
            if edge.source > removed {
                edge.source -= 1;
            }
            if edge.target > removed {
                edge.target -= 1;
            }
        }
        for (index, node) in self.nodes.iter().enumerate().skip(removed) {
            self.index_by_id.insert(node.id.clone(), index);
        }

        self.simulation.reheat();
        Some(id)
    }

    pub(in crate::app) fn step(&mut self) {
        self.simulation.step(&mut self.nodes, &self.edges);
    }

    pub(in crate::app) fn stop(&mut self) {
        self.simulation.stop();
    }

    pub(in crate::app) fn is_stopped(&self) -> bool {
        self.simulation.is_stopped()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn request(id: &str, cluster: Cluster) -> NodeRequest {
        NodeRequest {
            id: id.to_owned(),
            cluster,
            label: "Technology".to_owned(),
            title: format!("headline {id}"),
        }
    }

    fn model(max_leaf_nodes: usize) -> GraphModel<StdRng> {
        GraphModel::new(max_leaf_nodes, StdRng::seed_from_u64(7))
    }

    fn assert_consistent(model: &GraphModel<StdRng>) {
        let nodes = model.nodes();
        for edge in model.edges() {
            assert!(edge.source < nodes.len() && edge.target < nodes.len());
        }
        for (index, node) in nodes.iter().enumerate() {
            assert_eq!(model.index_by_id[&node.id], index);
        }
        let leaf_edges = model
            .edges()
            .iter()
            .filter(|edge| nodes[edge.target].is_leaf())
            .count();
        assert_eq!(leaf_edges, model.leaf_count());
    }

    #[test]
    fn skeleton_is_hub_plus_ring_of_fixed_anchors() {
        let model = model(450);
        assert_eq!(model.nodes().len(), 8);
        assert_eq!(model.edges().len(), 7);
        assert!(model.nodes().iter().all(|node| node.fixed.is_some()));

        let input = &model.nodes()[1];
        assert_eq!(input.cluster, Cluster::Input);
        assert!((input.position - vec2(0.0, -420.0)).length() < 1e-3);
        for node in &model.nodes()[1..] {
            assert!((node.position.length() - 420.0).abs() < 1e-3);
        }
        assert_eq!(model.alpha(), 1.0);
    }

    #[test]
    fn leaf_spawns_near_its_anchor_with_one_edge() {
        let mut model = model(450);
        let insert = model.add_leaf(request("a1", Cluster::Topic)).unwrap();
        assert_eq!(insert.evicted, None);

        let anchor = model.nodes()[model.index_by_id["__cluster_TOPIC__"]].position;
        let leaf = &model.nodes()[insert.index];
        let offset = leaf.position - anchor;
        assert!(offset.x.abs() <= 40.0 && offset.y.abs() <= 40.0);
        assert_eq!(
            model.edges().last(),
            Some(&GraphEdge {
                source: model.index_by_id["__cluster_TOPIC__"],
                target: insert.index
            })
        );
        assert!((model.alpha() - 0.3).abs() < 1e-6);
        assert_consistent(&model);
    }

    #[test]
    fn capacity_evicts_oldest_leaf_and_its_edge() {
        let mut model = model(3);
        for id in ["a", "b", "c"] {
            model.add_leaf(request(id, Cluster::Output));
        }
        let insert = model.add_leaf(request("d", Cluster::Conflict)).unwrap();
        assert_eq!(insert.evicted.as_deref(), Some("a"));
        assert_eq!(model.leaf_ids().collect::<Vec<_>>(), ["b", "c", "d"]);
        assert_eq!(model.nodes().len(), 8 + 3);
        assert_eq!(model.edges().len(), 7 + 3);
        assert_consistent(&model);
    }

    #[test]
    fn four_hundred_sixty_insertions_keep_the_newest_four_hundred_fifty() {
        let mut model = model(450);
        for n in 1..=460 {
            let cluster = Cluster::RING[n % Cluster::RING.len()];
            model.add_leaf(request(&format!("#{n}"), cluster));
            assert!(model.leaf_count() <= 450);
            if n % 10 == 0 {
                model.step();
            }
        }

        let expected = (11..=460).map(|n| format!("#{n}")).collect::<Vec<_>>();
        assert_eq!(model.leaf_ids().collect::<Vec<_>>(), expected);
        assert_eq!(model.edges().len(), 7 + 450);
        assert_consistent(&model);
    }

    #[test]
    fn duplicate_ids_are_ignored() {
        let mut model = model(450);
        assert!(model.add_leaf(request("x", Cluster::Entity)).is_some());
        assert!(model.add_leaf(request("x", Cluster::Entity)).is_none());
        assert!(model.add_leaf(request(HUB_ID, Cluster::Entity)).is_none());
        assert_eq!(model.leaf_count(), 1);
    }

    #[test]
    fn stepping_never_moves_the_skeleton() {
        let mut model = model(450);
        for n in 0..40 {
            model.add_leaf(request(&format!("leaf-{n}"), Cluster::Sentiment));
        }
        let skeleton = model.nodes()[..8].to_vec();
        for _ in 0..60 {
            model.step();
        }
        for (before, after) in skeleton.iter().zip(model.nodes()) {
            assert_eq!(before.position, after.position);
        }
        assert!(
            model
                .nodes()
                .iter()
                .all(|node| node.position.x.is_finite() && node.position.y.is_finite())
        );
        model.stop();
        assert!(model.is_stopped());
    }
}
