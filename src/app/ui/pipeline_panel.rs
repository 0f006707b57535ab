use chrono::Utc;
use eframe::egui::{self, Color32, RichText, Ui};

use crate::feed::{KpiMetrics, parse_timestamp};
use crate::util::format_age;

use super::super::ViewModel;
use super::super::pipeline::{STAGES, StageStatus};
use super::super::render_utils::{MUTED, status_color};

fn status_icon(status: StageStatus) -> &'static str {
    match status {
        StageStatus::Queue => "○",
        StageStatus::Active => "◉",
        StageStatus::Done => "●",
        StageStatus::Alert => "◈",
    }
}

fn last_updated_text(kpi: &KpiMetrics) -> String {
    match parse_timestamp(&kpi.last_updated) {
        Some(at) => format!("updated {}", format_age(at, Utc::now())),
        None if kpi.last_updated.is_empty() => "never updated".to_owned(),
        None => format!("updated {}", kpi.last_updated),
    }
}

impl ViewModel {
    pub(in crate::app) fn draw_pipeline_panel(&mut self, ui: &mut Ui) {
        ui.heading("NLP Pipeline");
        ui.add_space(4.0);

        match self.pipeline.in_flight() {
            Some(id) => ui.label(format!("processing {id}")),
            None => ui.label(RichText::new("idle").color(MUTED)),
        };
        let pending = self.pipeline.pending_len();
        if pending > 0 {
            ui.small(format!("{pending} queued"));
        }
        ui.add_space(6.0);

        for (stage, status) in STAGES.iter().zip(self.store.stages()) {
            let color = status_color(*status);
            ui.horizontal(|ui| {
                ui.label(RichText::new(status_icon(*status)).color(color).size(16.0));
                ui.vertical(|ui| {
                    ui.horizontal(|ui| {
                        ui.label(RichText::new(stage.name).strong());
                        ui.label(RichText::new(status.label()).color(color).monospace().small());
                    });
                    ui.label(RichText::new(stage.description).color(MUTED).small())
                        .on_hover_text(format!("dwell {} ms", stage.dwell.as_millis()));
                });
            });
            ui.add_space(2.0);
        }

        ui.separator();
        self.draw_kpi(ui);
    }

    fn draw_kpi(&self, ui: &mut Ui) {
        let kpi = self.store.kpi();
        ui.label(RichText::new("Throughput").strong());

        egui::Grid::new("kpi_grid")
            .num_columns(2)
            .spacing([16.0, 4.0])
            .show(ui, |ui| {
                ui.label("articles / min");
                ui.label(RichText::new(format!("{:.1}", kpi.throughput)).monospace());
                ui.end_row();

                ui.label("total today");
                ui.label(RichText::new(kpi.total_today.to_string()).monospace());
                ui.end_row();

                ui.label("active sources");
                ui.label(RichText::new(kpi.active_sources.to_string()).monospace());
                ui.end_row();

                ui.label("backend");
                if kpi.connected {
                    ui.label(RichText::new("connected").color(Color32::from_rgb(0x6f, 0xdc, 0x8c)));
                } else {
                    ui.label(RichText::new("disconnected").color(Color32::from_rgb(0xff, 0x83, 0x89)));
                }
                ui.end_row();
            });
        ui.small(last_updated_text(kpi));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_status_has_a_distinct_icon() {
        let icons = [
            StageStatus::Queue,
            StageStatus::Active,
            StageStatus::Done,
            StageStatus::Alert,
        ]
        .map(status_icon);
        for (i, a) in icons.iter().enumerate() {
            assert!(icons[i + 1..].iter().all(|b| b != a));
        }
    }

    #[test]
    fn last_updated_handles_missing_and_unparseable_values() {
        let mut kpi = KpiMetrics::default();
        assert_eq!(last_updated_text(&kpi), "never updated");

        kpi.last_updated = "soon".to_owned();
        assert_eq!(last_updated_text(&kpi), "updated soon");

        kpi.last_updated = "2020-01-01T00:00:00Z".to_owned();
        assert!(last_updated_text(&kpi).ends_with("d ago"));
    }
}
