use std::collections::HashMap;

use eframe::egui::{Color32, Vec2};
use rand::Rng;

use super::super::render_utils::{blend_color, cluster_color};
use super::model::{Cluster, GraphSnapshot};

pub(in crate::app) const MAX_INSTANCES: usize = 500;
pub(in crate::app) const MAX_EDGES: usize = 600;
pub(in crate::app) const MAX_SIGNALS: usize = 600;
pub(in crate::app) const PARKED_Z: f32 = -9_999.0;

const ANCHOR_SCALE: f32 = 2.5;
const SIGNAL_SPEED: f32 = 0.4;
const SPAWN_RATE: f32 = 0.8;
const FLASH_STEP: f32 = 0.05;
const HUB_RINGS: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct NodeInstance {
    pub(in crate::app) node: usize,
    pub(in crate::app) position: Vec2,
    pub(in crate::app) scale: f32,
    pub(in crate::app) color: Color32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct LineSlot {
    pub(in crate::app) start: Vec2,
    pub(in crate::app) end: Vec2,
    pub(in crate::app) color: Color32,
    pub(in crate::app) visible: bool,
}

impl Default for LineSlot {
    fn default() -> Self {
        Self {
            start: Vec2::ZERO,
            end: Vec2::ZERO,
            color: Color32::TRANSPARENT,
            visible: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct SignalDot {
    pub(in crate::app) edge_index: usize,
    pub(in crate::app) t: f32,
    pub(in crate::app) speed: f32,
    pub(in crate::app) cluster: Cluster,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct SignalSlot {
    pub(in crate::app) position: Vec2,
    pub(in crate::app) z: f32,
    pub(in crate::app) color: Color32,
}

impl SignalSlot {
    const PARKED: Self = Self {
        position: Vec2::ZERO,
        z: PARKED_Z,
        color: Color32::TRANSPARENT,
    };

    pub(in crate::app) fn is_parked(&self) -> bool {
        self.z <= PARKED_Z
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(in crate::app) struct HubState {
    phase: f32,
    pub(in crate::app) rotation: f32,
}

impl HubState {
    pub(in crate::app) fn pulse(&self) -> f32 {
        0.7 + 0.3 * self.phase.sin()
    }

    /// Opacity of ring `ring`; the core sits at ring 0.
    pub(in crate::app) fn ring_opacity(&self, ring: usize) -> f32 {
        self.pulse() * (0.5 + ring as f32 * 0.1)
    }

    pub(in crate::app) fn ring_count(&self) -> usize {
        HUB_RINGS
    }
}

pub(in crate::app) struct RenderLayer<R> {
    instances: Vec<NodeInstance>,
    lines: Vec<LineSlot>,
    line_count: usize,
    signals: Vec<SignalDot>,
    signal_slots: Vec<SignalSlot>,
    flashes: HashMap<String, f32>,
    hub: HubState,
    rng: R,
    disposed: bool,
}

impl<R: Rng> RenderLayer<R> {
    pub(in crate::app) fn new(rng: R) -> Self {
        Self {
            instances: Vec::with_capacity(MAX_INSTANCES),
            lines: vec![LineSlot::default(); MAX_EDGES],
            line_count: 0,
            signals: Vec::with_capacity(MAX_SIGNALS),
            signal_slots: vec![SignalSlot::PARKED; MAX_SIGNALS],
            flashes: HashMap::new(),
            hub: HubState::default(),
            rng,
            disposed: false,
        }
    }

    pub(in crate::app) fn instances(&self) -> &[NodeInstance] {
        &self.instances
    }

    pub(in crate::app) fn lines(&self) -> impl Iterator<Item = &LineSlot> {
        self.lines.iter().filter(|line| line.visible)
    }

    pub(in crate::app) fn signals(&self) -> &[SignalDot] {
        &self.signals
    }

    pub(in crate::app) fn signal_slots(&self) -> &[SignalSlot] {
        &self.signal_slots
    }

    pub(in crate::app) fn hub(&self) -> HubState {
        self.hub
    }

    pub(in crate::app) fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub(in crate::app) fn flash(&mut self, id: &str) {
        if !self.disposed {
            self.flashes.insert(id.to_owned(), 0.0);
        }
    }

    pub(in crate::app) fn tick_hub(&mut self, delta: f32) {
        if self.disposed {
            return;
        }
        self.hub.phase += delta * 0.8;
        self.hub.rotation = (self.hub.rotation + delta * 0.15) % std::f32::consts::TAU;
    }

    pub(in crate::app) fn update(&mut self, snapshot: GraphSnapshot<'_>, delta: f32) {
        if self.disposed {
            return;
        }
        self.update_instances(snapshot);
        self.update_lines(snapshot, delta);
        self.advance_signals(delta);
    }

    fn update_instances(&mut self, snapshot: GraphSnapshot<'_>) {
        self.instances.clear();
        let drawable = snapshot
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.cluster != Cluster::Hub)
            .take(MAX_INSTANCES);

        for (index, node) in drawable {
            let mut color = cluster_color(node.cluster);
            if let Some(progress) = self.flashes.get_mut(&node.id) {
                *progress += FLASH_STEP;
                let intensity = (1.0 - *progress).max(0.0);
                color = blend_color(color, Color32::WHITE, intensity * 0.8);
            }
            self.instances.push(NodeInstance {
                node: index,
                position: node.position,
                scale: if node.is_leaf() { 1.0 } else { ANCHOR_SCALE },
                color,
            });
        }

        // Flashes for evicted or culled nodes lapse instead of lingering.
        self.flashes.retain(|id, progress| {
            *progress < 1.0 - f32::EPSILON
                && snapshot.nodes.iter().any(|node| node.id == *id)
        });
    }

    fn update_lines(&mut self, snapshot: GraphSnapshot<'_>, delta: f32) {
        let count = snapshot.edges.len().min(MAX_EDGES);
        self.line_count = count;
        let spawn_chance = if delta.is_finite() {
            (delta * SPAWN_RATE).clamp(0.0, 1.0)
        } else {
            0.0
        };

        for (slot_index, slot) in self.lines.iter_mut().enumerate() {
            let endpoints = snapshot.edges.get(slot_index).filter(|_| slot_index < count).and_then(
                |edge| Some((snapshot.nodes.get(edge.source)?, snapshot.nodes.get(edge.target)?)),
            );
            let Some((source, target)) = endpoints else {
                slot.visible = false;
                continue;
            };

            *slot = LineSlot {
                start: source.position,
                end: target.position,
                color: cluster_color(target.cluster),
                visible: true,
            };

            if self.signals.len() < MAX_SIGNALS - 5 && self.rng.gen_bool(spawn_chance as f64) {
                self.signals.push(SignalDot {
                    edge_index: slot_index,
                    t: 0.0,
                    speed: SIGNAL_SPEED * self.rng.gen_range(0.7..1.3),
                    cluster: target.cluster,
                });
            }
        }
    }

    fn advance_signals(&mut self, delta: f32) {
        let step = if delta.is_finite() { delta.max(0.0) } else { 0.0 };
        let lines = &self.lines;
        let line_count = self.line_count;
        let mut active = 0usize;
        let slots = &mut self.signal_slots;
        self.signals.retain_mut(|signal| {
            let Some(line) = lines
                .get(signal.edge_index)
                .filter(|line| signal.edge_index < line_count && line.visible)
            else {
                return false;
            };
            signal.t += signal.speed * step;
            if signal.t >= 1.0 {
                return false;
            }
            if let Some(slot) = slots.get_mut(active) {
                *slot = SignalSlot {
                    position: line.start + (line.end - line.start) * signal.t,
                    z: 0.0,
                    color: cluster_color(signal.cluster),
                };
                active += 1;
            }
            true
        });
        for slot in &mut self.signal_slots[active..] {
            *slot = SignalSlot::PARKED;
        }
    }

    pub(in crate::app) fn dispose(&mut self) {
        self.disposed = true;
        self.instances = Vec::new();
        self.lines = Vec::new();
        self.line_count = 0;
        self.signals = Vec::new();
        self.signal_slots = Vec::new();
        self.flashes = HashMap::new();
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::super::model::{GraphModel, NodeRequest};
    use super::*;

    fn graph_with_leaves(count: usize) -> GraphModel<StdRng> {
        let mut model = GraphModel::new(450, StdRng::seed_from_u64(1));
        for n in 0..count {
            model.add_leaf(NodeRequest {
                id: format!("leaf-{n}"),
                cluster: Cluster::RING[n % Cluster::RING.len()],
                label: "Politics".to_owned(),
                title: String::new(),
            });
        }
        model
    }

    fn frame(layer: &mut RenderLayer<StdRng>, model: &GraphModel<StdRng>, delta: f32) {
        layer.update(model.snapshot(), delta);
    }

    #[test]
    fn instances_skip_the_hub_and_scale_anchors() {
        let model = graph_with_leaves(2);
        let mut layer = RenderLayer::new(StdRng::seed_from_u64(2));
        frame(&mut layer, &model, 0.016);

        assert_eq!(layer.instances().len(), 9);
        assert!(layer.instances()[..7].iter().all(|i| i.scale == ANCHOR_SCALE));
        assert!(layer.instances()[7..].iter().all(|i| i.scale == 1.0));
        assert_eq!(layer.lines().count(), 9);
    }

    #[test]
    fn buffers_never_exceed_their_capacity() {
        let model = graph_with_leaves(450);
        let mut layer = RenderLayer::new(StdRng::seed_from_u64(3));
        for _ in 0..240 {
            frame(&mut layer, &model, 0.05);
            assert!(layer.instances().len() <= MAX_INSTANCES);
            assert!(layer.lines().count() <= MAX_EDGES);
            assert!(layer.signals().len() <= MAX_SIGNALS - 5);
            assert_eq!(layer.signal_slots().len(), MAX_SIGNALS);
        }
        assert_eq!(layer.instances().len(), 7 + 450);
        assert!(!layer.signals().is_empty());
    }

    #[test]
    fn signal_dots_advance_monotonically_and_retire_at_the_end() {
        let model = graph_with_leaves(0);
        let mut layer = RenderLayer::new(StdRng::seed_from_u64(4));
        // Spawned dots never move slower than 0.28/s, so this one stays
        // distinguishable.
        let marker = 0.25;
        layer.signals.push(SignalDot {
            edge_index: 0,
            t: 0.0,
            speed: marker,
            cluster: Cluster::Input,
        });

        let mut last_t = 0.0;
        let mut frames = 0;
        while layer.signals().iter().any(|signal| signal.speed == marker) {
            frame(&mut layer, &model, 0.2);
            if let Some(signal) = layer.signals().iter().find(|signal| signal.speed == marker) {
                assert!(signal.t > last_t && signal.t < 1.0);
                last_t = signal.t;
            }
            frames += 1;
            assert!(frames < 100);
        }
        assert!((19..=21).contains(&frames), "retired after {frames} frames");
    }

    #[test]
    fn unused_signal_slots_are_parked() {
        let model = graph_with_leaves(0);
        let mut layer = RenderLayer::new(StdRng::seed_from_u64(5));
        layer.signals.push(SignalDot {
            edge_index: 3,
            t: 0.5,
            speed: 0.0,
            cluster: Cluster::Topic,
        });
        layer.update(model.snapshot(), 0.0);

        let live = layer.signal_slots().iter().filter(|slot| !slot.is_parked()).count();
        assert_eq!(live, layer.signals().len());
        let anchor = model.nodes()[4].position;
        assert!((layer.signal_slots()[0].position - anchor * 0.5).length() < 1e-3);
    }

    #[test]
    fn dots_on_vanished_edges_are_dropped() {
        let model = graph_with_leaves(0);
        let mut layer = RenderLayer::new(StdRng::seed_from_u64(6));
        layer.signals.push(SignalDot {
            edge_index: 42,
            t: 0.1,
            speed: 0.4,
            cluster: Cluster::Output,
        });
        layer.update(model.snapshot(), 0.0);
        assert!(layer.signals().iter().all(|signal| signal.edge_index < 7));
    }

    #[test]
    fn flash_fades_over_twenty_frames() {
        let model = graph_with_leaves(1);
        let mut layer = RenderLayer::new(StdRng::seed_from_u64(7));
        layer.flash("leaf-0");
        let base = cluster_color(Cluster::Input);

        layer.update(model.snapshot(), 0.0);
        let leaf = *layer.instances().last().unwrap();
        assert_ne!(leaf.color, base);
        for _ in 0..19 {
            layer.update(model.snapshot(), 0.0);
        }
        assert!(layer.flashes.is_empty());
        layer.update(model.snapshot(), 0.0);
        assert_eq!(layer.instances().last().unwrap().color, base);
    }

    #[test]
    fn hub_pulse_and_rotation_follow_elapsed_time() {
        let mut layer = RenderLayer::new(StdRng::seed_from_u64(8));
        assert!((layer.hub().pulse() - 0.7).abs() < 1e-6);
        layer.tick_hub(1.0);
        let hub = layer.hub();
        assert!((hub.pulse() - (0.7 + 0.3 * 0.8_f32.sin())).abs() < 1e-5);
        assert!((hub.rotation - 0.15).abs() < 1e-6);
        assert!(hub.ring_opacity(2) > hub.ring_opacity(0));
    }

    #[test]
    fn dispose_is_idempotent_and_freezes_the_layer() {
        let model = graph_with_leaves(3);
        let mut layer = RenderLayer::new(StdRng::seed_from_u64(9));
        frame(&mut layer, &model, 0.5);
        layer.dispose();
        layer.dispose();
        frame(&mut layer, &model, 0.5);
        layer.tick_hub(1.0);
        layer.flash("leaf-1");

        assert!(layer.is_disposed());
        assert!(layer.instances().is_empty());
        assert_eq!(layer.lines().count(), 0);
        assert!(layer.signal_slots().is_empty());
        assert_eq!(layer.hub(), HubState::default());
    }
}
