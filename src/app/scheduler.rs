use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use super::graph::{GraphModel, LabelOverlay, RenderLayer};
use super::store::GraphStateStore;

/// Separate streams so that, for a fixed seed, adding draws in one component
/// does not shift the others.
fn component_rng(seed: Option<u64>, stream: u64) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(stream)),
        None => StdRng::from_entropy(),
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(in crate::app) struct FrameReport {
    pub(in crate::app) added: usize,
    pub(in crate::app) evicted: usize,
}

pub(in crate::app) struct FrameScheduler {
    graph: GraphModel<StdRng>,
    render: RenderLayer<StdRng>,
    labels: LabelOverlay<StdRng>,
    alive: bool,
    frames: u64,
}

impl FrameScheduler {
    pub(in crate::app) fn mount(max_leaf_nodes: usize, seed: Option<u64>) -> Self {
        info!(max_leaf_nodes, seeded = seed.is_some(), "mounting graph");
        Self {
            graph: GraphModel::new(max_leaf_nodes, component_rng(seed, 0)),
            render: RenderLayer::new(component_rng(seed, 1)),
            labels: LabelOverlay::new(component_rng(seed, 2)),
            alive: true,
            frames: 0,
        }
    }

    pub(in crate::app) fn graph(&self) -> &GraphModel<StdRng> {
        &self.graph
    }

    pub(in crate::app) fn render(&self) -> &RenderLayer<StdRng> {
        &self.render
    }

    pub(in crate::app) fn labels(&self) -> &LabelOverlay<StdRng> {
        &self.labels
    }

    pub(in crate::app) fn is_alive(&self) -> bool {
        self.alive
    }

    pub(in crate::app) fn frames(&self) -> u64 {
        self.frames
    }

    pub(in crate::app) fn tick(&mut self, delta: f32, store: &mut GraphStateStore) -> FrameReport {
        let mut report = FrameReport::default();
        if !self.alive {
            return report;
        }
        self.frames += 1;

        for request in store.drain_nodes() {
            let topic = request.label.clone();
            let id = request.id.clone();
            let Some(insert) = self.graph.add_leaf(request) else {
                continue;
            };
            if let Some(evicted) = insert.evicted {
                debug!(%evicted, "evicted oldest leaf");
                report.evicted += 1;
            }
            debug!(%id, index = insert.index, "leaf added");
            self.labels.spawn(&topic);
            self.render.flash(&id);
            report.added += 1;
        }

        self.graph.step();
        self.render.tick_hub(delta);
        self.render.update(self.graph.snapshot(), delta);
        self.labels.advance(delta);
        report
    }

    pub(in crate::app) fn teardown(&mut self) {
        if self.alive {
            info!(frames = self.frames, "tearing down graph");
        }
        self.alive = false;
        self.graph.stop();
        self.render.dispose();
        self.labels.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;

    use super::*;
    use crate::app::graph::{Cluster, NodeRequest};
    use crate::app::pipeline::{PipelineEvent, PipelineMachine, StageStatus};
    use crate::feed::{CancelToken, test_article};

    const FRAME: f32 = 1.0 / 60.0;

    fn request(n: usize) -> NodeRequest {
        NodeRequest {
            id: format!("#{n}"),
            cluster: Cluster::RING[n % Cluster::RING.len()],
            label: "Technology".to_owned(),
            title: String::new(),
        }
    }

    #[test]
    fn three_article_scenario_lands_in_expected_clusters() {
        let mut store = GraphStateStore::default();
        let mut pipeline = PipelineMachine::new(CancelToken::new());
        let mut scheduler = FrameScheduler::mount(450, Some(11));

        let articles = [
            test_article("a1", "Technology", 0.4),
            test_article("a2", "Conflict", -0.6),
            test_article("a3", "Finance", 0.1),
        ];
        for article in articles {
            assert!(pipeline.enqueue(article.clone()));
            store.add_article(article, Utc::now());
        }

        let mut alert_seen = false;
        let mut added = Vec::new();
        for frame in 0..900u64 {
            let now = Duration::from_millis(frame * 20);
            for event in pipeline.poll(now) {
                if let PipelineEvent::Transition(transition) = &event
                    && transition.status == StageStatus::Alert
                {
                    assert_eq!(transition.article_id, "a2");
                    assert_eq!(transition.stage, 6);
                    alert_seen = true;
                }
                store.apply_pipeline(event);
            }
            let before = scheduler.graph().leaf_count();
            scheduler.tick(0.02, &mut store);
            if scheduler.graph().leaf_count() > before {
                let node = scheduler.graph().nodes().last().unwrap();
                added.push((node.id.clone(), node.cluster));
            }
        }

        assert!(alert_seen);
        assert_eq!(
            added,
            vec![
                ("a1".to_owned(), Cluster::Topic),
                ("a2".to_owned(), Cluster::Conflict),
                ("a3".to_owned(), Cluster::Entity),
            ]
        );
        assert!(store.articles().iter().all(|entry| !entry.processing));
        assert_eq!(scheduler.graph().edges().len(), 10);
    }

    #[test]
    fn four_hundred_sixty_insertions_respect_capacity_every_frame() {
        let mut store = GraphStateStore::default();
        let mut scheduler = FrameScheduler::mount(450, Some(5));
        let mut evicted = 0;
        for n in 1..=460 {
            store.enqueue_node(request(n));
            if n % 4 == 0 {
                evicted += scheduler.tick(FRAME, &mut store).evicted;
                assert!(scheduler.graph().leaf_count() <= 450);
            }
        }
        evicted += scheduler.tick(FRAME, &mut store).evicted;

        let expected = (11..=460).map(|n| format!("#{n}")).collect::<Vec<_>>();
        assert_eq!(scheduler.graph().leaf_ids().collect::<Vec<_>>(), expected);
        assert_eq!(evicted, 10);
        assert!(scheduler.render().instances().len() <= 500);
    }

    #[test]
    fn each_tick_steps_the_simulation_once() {
        let mut store = GraphStateStore::default();
        let mut scheduler = FrameScheduler::mount(450, Some(1));
        store.enqueue_node(request(1));
        let report = scheduler.tick(FRAME, &mut store);
        assert_eq!(report, FrameReport { added: 1, evicted: 0 });
        assert_eq!(scheduler.labels().labels().len(), 1);
        for _ in 0..9 {
            scheduler.tick(FRAME, &mut store);
        }
        assert_eq!(scheduler.frames(), 10);
        assert_eq!(scheduler.graph().steps(), 10);
        assert!(scheduler.graph().alpha() < 0.3);
    }

    #[test]
    fn teardown_is_idempotent_and_freezes_ticks() {
        let mut store = GraphStateStore::default();
        let mut scheduler = FrameScheduler::mount(450, Some(2));
        store.enqueue_node(request(1));
        scheduler.tick(FRAME, &mut store);

        scheduler.teardown();
        scheduler.teardown();
        store.enqueue_node(request(2));
        let report = scheduler.tick(FRAME, &mut store);

        assert_eq!(report, FrameReport::default());
        assert!(!scheduler.is_alive());
        assert!(scheduler.render().is_disposed());
        assert!(scheduler.graph().is_stopped());
        assert!(scheduler.labels().labels().is_empty());
        assert_eq!(store.pending_nodes().len(), 1);
        assert_eq!(scheduler.graph().leaf_count(), 1);
    }

    #[test]
    fn seeded_mounts_are_reproducible() {
        let run = || {
            let mut store = GraphStateStore::default();
            let mut scheduler = FrameScheduler::mount(450, Some(99));
            for n in 0..5 {
                store.enqueue_node(request(n));
            }
            for _ in 0..30 {
                scheduler.tick(FRAME, &mut store);
            }
            scheduler
                .graph()
                .nodes()
                .iter()
                .map(|node| node.position)
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}
