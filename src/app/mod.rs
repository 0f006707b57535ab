use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use eframe::egui::{Context, Vec2};
use tracing::warn;

use crate::config::Config;
use crate::feed::{
    EventFeed, FeedSupervisor, HttpMetricsApi, LiveStream, MetricsPoller, SyntheticFeed,
};

mod graph;
mod physics;
mod pipeline;
mod render_utils;
mod scheduler;
mod store;
mod ui;

use pipeline::PipelineMachine;
use scheduler::FrameScheduler;
use store::GraphStateStore;

pub const MAX_LEAF_NODES: usize = 450;

pub struct NeuralFeedApp {
    model: Box<ViewModel>,
}

struct ViewModel {
    supervisor: FeedSupervisor,
    poller: Option<MetricsPoller>,
    pipeline: PipelineMachine,
    store: GraphStateStore,
    scheduler: FrameScheduler,
    session_start: Instant,
    base_url: String,
    search: String,
    search_match_cache: Option<SearchMatchCache>,
    pan: Vec2,
    zoom: f32,
    orbit: bool,
    orbit_phase: f32,
    show_fps_bar: bool,
    fps_current: f32,
    fps_samples: VecDeque<f32>,
    visible_node_count: usize,
    torn_down: bool,
}

struct SearchMatchCache {
    query: String,
    graph_revision: u64,
    matches: Arc<HashSet<usize>>,
}

fn spawn_sources(config: &Config) -> (FeedSupervisor, Option<MetricsPoller>) {
    let live: Option<Box<dyn EventFeed>> = if config.stream.demo {
        None
    } else {
        Some(Box::new(LiveStream::new(&config.stream.base_url)))
    };
    let synthetic = Box::new(SyntheticFeed::new(
        config.synthetic_timing(),
        config.render.seed,
    ));
    let mut supervisor = FeedSupervisor::new(live, synthetic, config.backoff());
    supervisor.start();

    let poller = if config.stream.demo {
        None
    } else {
        match HttpMetricsApi::new(&config.stream.base_url) {
            Ok(api) => Some(MetricsPoller::spawn(Box::new(api), config.poll_interval())),
            Err(error) => {
                warn!(%error, "metrics polling disabled");
                None
            }
        }
    };

    (supervisor, poller)
}

impl NeuralFeedApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: Config) -> Self {
        let (supervisor, poller) = spawn_sources(&config);
        Self {
            model: Box::new(ViewModel::new(&config, supervisor, poller)),
        }
    }
}

impl ViewModel {
    fn pump_sources(&mut self, now: Duration) {
        if self.torn_down {
            return;
        }

        let poll = self.supervisor.poll(now);
        if poll.demo_mode_changed {
            self.store.set_demo_mode(poll.demo_mode);
        }
        let received_at = Utc::now();
        if poll.live {
            self.store.mark_live(received_at);
        }
        for article in poll.articles {
            if self.pipeline.enqueue(article.clone()) {
                self.store.add_article(article, received_at);
            }
        }

        for event in self.pipeline.poll(now) {
            self.store.apply_pipeline(event);
        }

        if let Some(poller) = &self.poller {
            for update in poller.drain() {
                self.store.apply_polled(update);
            }
        }
    }

    fn teardown(&mut self) {
        self.torn_down = true;
        self.scheduler.teardown();
        self.pipeline.halt();
        self.supervisor.shutdown();
        if let Some(poller) = self.poller.as_mut() {
            poller.stop();
        }
    }
}

impl eframe::App for NeuralFeedApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let now = self.model.session_start.elapsed();
        self.model.pump_sources(now);
        self.model.show(ctx);
        if !self.model.torn_down {
            ctx.request_repaint();
        }
    }
}

impl Drop for NeuralFeedApp {
    fn drop(&mut self) {
        self.model.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{Backoff, ScriptedFeed, parse_timestamp, test_article};

    fn view_model(live: ScriptedFeed, synthetic: ScriptedFeed) -> ViewModel {
        let mut supervisor = FeedSupervisor::new(
            Some(Box::new(live)),
            Box::new(synthetic),
            Backoff::default(),
        );
        supervisor.start();
        let mut config = Config::default();
        config.render.seed = Some(3);
        ViewModel::new(&config, supervisor, None)
    }

    #[test]
    fn live_articles_flow_through_pipeline_into_the_graph() {
        let live = ScriptedFeed::default();
        let mut model = view_model(live.clone(), ScriptedFeed::default());

        live.emit(test_article("n1", "Technology", 0.5));
        live.emit(test_article("n2", "Health", 0.0));
        model.pump_sources(Duration::ZERO);
        assert_eq!(model.store.articles().len(), 2);
        assert_eq!(model.store.articles()[0].article.id, "n2");

        model.pump_sources(Duration::from_millis(3_850));
        model.scheduler.tick(0.016, &mut model.store);
        assert_eq!(model.scheduler.graph().leaf_ids().collect::<Vec<_>>(), ["n1"]);
        assert!(!model.store.demo_mode());
    }

    #[test]
    fn transport_failure_switches_store_to_demo_metrics() {
        let live = ScriptedFeed::default();
        let synthetic = ScriptedFeed::default();
        let mut model = view_model(live.clone(), synthetic.clone());

        live.fail();
        model.pump_sources(Duration::from_secs(1));
        assert!(model.store.demo_mode());
        assert_eq!(model.store.kpi().total_today, 4_821);
        assert!(synthetic.active());
    }

    #[test]
    fn live_article_after_outage_marks_backend_connected() {
        let live = ScriptedFeed::default();
        let mut model = view_model(live.clone(), ScriptedFeed::default());

        live.fail();
        model.pump_sources(Duration::from_secs(1));
        assert!(!model.store.kpi().connected);

        model.pump_sources(Duration::from_secs(4));
        live.emit(test_article("back", "Politics", 0.2));
        model.pump_sources(Duration::from_millis(4_100));

        assert!(!model.store.demo_mode());
        assert!(model.store.kpi().connected);
        assert!(parse_timestamp(&model.store.kpi().last_updated).is_some());
        assert_eq!(model.store.articles()[0].article.id, "back");
    }

    #[test]
    fn teardown_cancels_everything_and_is_idempotent() {
        let live = ScriptedFeed::default();
        let mut model = view_model(live.clone(), ScriptedFeed::default());
        live.emit(test_article("t1", "Finance", 0.1));
        model.pump_sources(Duration::ZERO);

        model.teardown();
        model.teardown();
        assert!(!live.active());
        assert!(model.pipeline.is_halted());
        assert!(!model.scheduler.is_alive());

        live.emit(test_article("t2", "Finance", 0.1));
        model.pump_sources(Duration::from_secs(10));
        assert_eq!(model.store.articles().len(), 1);
    }
}
