mod forces;
mod quadtree;

use eframe::egui::Vec2;

use super::graph::{GraphEdge, GraphNode};
use forces::{accumulate_charge, accumulate_collisions};
use quadtree::Cell;

pub(in crate::app) const REHEAT_ALPHA: f32 = 0.3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct ForceParams {
    pub(in crate::app) leaf_link_distance: f32,
    pub(in crate::app) leaf_link_strength: f32,
    pub(in crate::app) charge_strength: f32,
    pub(in crate::app) theta: f32,
    pub(in crate::app) collide_radius: f32,
    pub(in crate::app) alpha_decay: f32,
    pub(in crate::app) alpha_target: f32,
    pub(in crate::app) velocity_decay: f32,
}

impl Default for ForceParams {
    fn default() -> Self {
        Self {
            leaf_link_distance: 120.0,
            leaf_link_strength: 0.8,
            charge_strength: -60.0,
            theta: 0.9,
            collide_radius: 30.0,
            alpha_decay: 0.008,
            alpha_target: 0.0,
            velocity_decay: 0.4,
        }
    }
}

#[derive(Default)]
struct Scratch {
    positions: Vec<Vec2>,
    predicted: Vec<Vec2>,
    radii: Vec<f32>,
    deltas: Vec<Vec2>,
    degree: Vec<u32>,
}

pub(in crate::app) struct Simulation {
    params: ForceParams,
    alpha: f32,
    steps: u64,
    stopped: bool,
    scratch: Scratch,
}

impl Simulation {
    pub(in crate::app) fn new(params: ForceParams) -> Self {
        Self {
            params,
            alpha: 1.0,
            steps: 0,
            stopped: false,
            scratch: Scratch::default(),
        }
    }

    pub(in crate::app) fn alpha(&self) -> f32 {
        self.alpha
    }

    pub(in crate::app) fn steps(&self) -> u64 {
        self.steps
    }

    pub(in crate::app) fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub(in crate::app) fn reheat(&mut self) {
        if !self.stopped {
            self.alpha = REHEAT_ALPHA;
        }
    }

    pub(in crate::app) fn stop(&mut self) {
        self.stopped = true;
        self.scratch = Scratch::default();
    }

    pub(in crate::app) fn step(&mut self, nodes: &mut [GraphNode], edges: &[GraphEdge]) {
        if self.stopped {
            return;
        }

        let params = self.params;
        self.alpha += (params.alpha_target - self.alpha) * params.alpha_decay;
        self.steps += 1;
        let alpha = self.alpha;
        let node_count = nodes.len();
        if node_count == 0 {
            return;
        }

        let scratch = &mut self.scratch;
        scratch.degree.clear();
        scratch.degree.resize(node_count, 0);
        for edge in edges {
            if edge.source < node_count && edge.target < node_count {
                scratch.degree[edge.source] += 1;
                scratch.degree[edge.target] += 1;
            }
        }

        for edge in edges {
            let (source, target) = (edge.source, edge.target);
            if source >= node_count || target >= node_count || source == target {
                continue;
            }
            let Some((distance, strength)) = link_shape(&nodes[source], &nodes[target], params)
            else {
                continue;
            };

            let mut delta = (nodes[target].position + nodes[target].velocity)
                - (nodes[source].position + nodes[source].velocity);
            let mut length = delta.length();
            if length <= 1e-6 {
                continue;
            }
            length = (length - distance) / length * alpha * strength;
            delta *= length;

            let source_degree = scratch.degree[source] as f32;
            let target_degree = scratch.degree[target] as f32;
            let bias = source_degree / (source_degree + target_degree);
            nodes[target].velocity -= delta * bias;
            nodes[source].velocity += delta * (1.0 - bias);
        }

        scratch.positions.clear();
        scratch.positions.extend(nodes.iter().map(|node| node.position));
        if let Some(root) = Cell::build(&scratch.positions) {
            let strength_alpha = params.charge_strength * alpha;
            let theta_sq = params.theta * params.theta;
            for (index, node) in nodes.iter_mut().enumerate() {
                accumulate_charge(
                    &root,
                    index,
                    &scratch.positions,
                    strength_alpha,
                    theta_sq,
                    &mut node.velocity,
                );
            }
        }

        scratch.predicted.clear();
        scratch
            .predicted
            .extend(nodes.iter().map(|node| node.position + node.velocity));
        scratch.radii.clear();
        scratch.radii.resize(node_count, params.collide_radius);
        scratch.deltas.clear();
        scratch.deltas.resize(node_count, Vec2::ZERO);
        if let Some(root) = Cell::build(&scratch.predicted) {
            let reach = params.collide_radius * 2.0;
            accumulate_collisions(
                &root,
                &root,
                true,
                &scratch.predicted,
                &scratch.radii,
                reach * reach,
                &mut scratch.deltas,
            );
        }

        let retain = 1.0 - params.velocity_decay;
        for (node, delta) in nodes.iter_mut().zip(&scratch.deltas) {
            if let Some(pin) = node.fixed {
                node.position = pin;
                node.velocity = Vec2::ZERO;
                continue;
            }
            node.velocity = (node.velocity + *delta) * retain;
            if !node.velocity.x.is_finite() || !node.velocity.y.is_finite() {
                node.velocity = Vec2::ZERO;
            }
            node.position += node.velocity;
        }
    }
}

/// Hub links keep distance 0 between two pinned nodes, so only leaf links
/// carry a spring.
fn link_shape(source: &GraphNode, target: &GraphNode, params: ForceParams) -> Option<(f32, f32)> {
    if source.fixed.is_some() && target.fixed.is_some() {
        return None;
    }
    Some((params.leaf_link_distance, params.leaf_link_strength))
}
