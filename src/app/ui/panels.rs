use std::collections::VecDeque;
use std::time::Instant;

use eframe::egui::{self, Align, Color32, Context, Layout, RichText, Vec2};

use crate::config::Config;
use crate::feed::{CancelToken, FeedSupervisor, MetricsPoller};

use super::super::ViewModel;
use super::super::pipeline::PipelineMachine;
use super::super::scheduler::FrameScheduler;
use super::super::store::GraphStateStore;

const DEMO_BANNER: Color32 = Color32::from_rgb(0xf1, 0xc2, 0x1b);

impl ViewModel {
    pub(in crate::app) fn new(
        config: &Config,
        supervisor: FeedSupervisor,
        poller: Option<MetricsPoller>,
    ) -> Self {
        let mut store = GraphStateStore::default();
        store.set_demo_mode(supervisor.demo_mode());

        Self {
            supervisor,
            poller,
            pipeline: PipelineMachine::new(CancelToken::new()),
            store,
            scheduler: FrameScheduler::mount(config.graph.max_leaf_nodes, config.render.seed),
            session_start: Instant::now(),
            base_url: config.stream.base_url.clone(),
            search: String::new(),
            search_match_cache: None,
            pan: Vec2::ZERO,
            zoom: 0.8,
            orbit: true,
            orbit_phase: 0.0,
            show_fps_bar: true,
            fps_current: 0.0,
            fps_samples: VecDeque::new(),
            visible_node_count: 0,
            torn_down: false,
        }
    }

    fn connection_text(&self) -> RichText {
        if self.store.demo_mode() {
            return RichText::new("DEMO MODE · synthetic articles").color(DEMO_BANNER).strong();
        }

        match self.supervisor.reconnect_pending() {
            Some(at) => {
                let wait = at.saturating_sub(self.session_start.elapsed());
                RichText::new(format!("reconnecting in {:.1}s", wait.as_secs_f32()))
                    .color(DEMO_BANNER)
            }
            None => RichText::new(format!("LIVE · {}", self.base_url)),
        }
    }

    pub(in crate::app) fn show(&mut self, ctx: &Context) {
        self.update_fps_counter(ctx);

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("Neural Feed");
                    ui.separator();
                    ui.label(self.connection_text());
                    ui.separator();

                    let graph = self.scheduler.graph();
                    ui.label(format!(
                        "leaves: {} / {}",
                        graph.leaf_count(),
                        graph.max_leaf_nodes()
                    ));
                    ui.label(format!("α {:.3}", graph.alpha()))
                        .on_hover_text(format!(
                            "{} frames, {} simulation steps",
                            self.scheduler.frames(),
                            graph.steps()
                        ));
                    ui.separator();

                    ui.label("Search");
                    ui.add(
                        egui::TextEdit::singleline(&mut self.search)
                            .hint_text("topic or headline")
                            .desired_width(180.0),
                    );
                    ui.checkbox(&mut self.orbit, "Orbit");
                    ui.checkbox(&mut self.show_fps_bar, "FPS");

                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(self.visible_graph_text());
                        if let Some(fps_text) = self.fps_display_text() {
                            ui.label(fps_text);
                        }
                    });
                });
            });

        egui::SidePanel::left("pipeline")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| self.draw_pipeline_panel(ui));

        egui::SidePanel::right("feed")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| self.draw_feed_panel(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_graph(ui));
    }
}
