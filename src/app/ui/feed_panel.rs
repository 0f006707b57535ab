use chrono::Utc;
use eframe::egui::{self, Color32, RichText, Sense, Stroke, Ui, vec2};

use crate::feed::{CategoryCount, SentimentLabel, ToneData};
use crate::util::{format_age, truncate_chars};

use super::super::ViewModel;
use super::super::render_utils::{MUTED, sentiment_color, topic_color, with_alpha};

const TITLE_CHARS: usize = 64;
const TOP_ENTITIES: usize = 10;

fn category_fractions(categories: &[CategoryCount]) -> Vec<f32> {
    let max = categories.iter().map(|category| category.count).max().unwrap_or(0);
    if max == 0 {
        return vec![0.0; categories.len()];
    }
    categories
        .iter()
        .map(|category| category.count as f32 / max as f32)
        .collect()
}

fn tone_position(tone: &ToneData) -> f32 {
    ((tone.average_score.clamp(-1.0, 1.0) + 1.0) / 2.0).clamp(0.0, 1.0)
}

fn draw_bar(ui: &mut Ui, fraction: f32, color: Color32) {
    let width = ui.available_width().max(40.0);
    let (rect, _) = ui.allocate_exact_size(vec2(width, 8.0), Sense::hover());
    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 2.0, with_alpha(MUTED, 0.2));
    let mut filled = rect;
    filled.set_width(rect.width() * fraction.clamp(0.0, 1.0));
    painter.rect_filled(filled, 2.0, color);
}

impl ViewModel {
    pub(in crate::app) fn draw_feed_panel(&mut self, ui: &mut Ui) {
        egui::ScrollArea::vertical()
            .id_salt("feed_panel_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                self.draw_article_queue(ui);
                ui.separator();
                self.draw_categories(ui);
                ui.separator();
                self.draw_tone(ui);
                ui.separator();
                self.draw_entities(ui);
            });
    }

    fn draw_article_queue(&self, ui: &mut Ui) {
        ui.heading("Live Articles");
        let articles = self.store.articles();
        if articles.is_empty() {
            ui.label(RichText::new("Waiting for articles...").color(MUTED));
            return;
        }

        let now = Utc::now();
        for queued in articles {
            let article = &queued.article;
            let color = sentiment_color(article.sentiment_label);
            egui::Frame::group(ui.style())
                .stroke(Stroke::new(1.0, with_alpha(color, 0.4)))
                .show(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.label(
                            RichText::new(format!("{:+.2}", article.sentiment_score))
                                .color(color)
                                .monospace(),
                        );
                        ui.label(
                            RichText::new(article.topic.to_uppercase())
                                .color(topic_color(&article.topic))
                                .small(),
                        );
                        if queued.processing {
                            ui.spinner();
                        }
                    });
                    ui.label(truncate_chars(&article.title, TITLE_CHARS))
                        .on_hover_text(article.title.as_str());
                    ui.label(
                        RichText::new(format!(
                            "{} · {} · {}",
                            article.source_type.label(),
                            if article.domain.is_empty() { "unknown" } else { article.domain.as_str() },
                            format_age(queued.received_at, now),
                        ))
                        .color(MUTED)
                        .small(),
                    );
                });
        }
    }

    fn draw_categories(&self, ui: &mut Ui) {
        ui.label(RichText::new("Categories").strong());
        let categories = self.store.categories();
        if categories.is_empty() {
            ui.label(RichText::new("no data").color(MUTED));
            return;
        }

        for (category, fraction) in categories.iter().zip(category_fractions(categories)) {
            ui.horizontal(|ui| {
                ui.label(category.topic.as_str());
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(RichText::new(category.count.to_string()).monospace());
                });
            });
            draw_bar(ui, fraction, topic_color(&category.topic));
        }
    }

    fn draw_tone(&self, ui: &mut Ui) {
        let tone = self.store.tone();
        ui.label(RichText::new("Tone").strong());

        let width = ui.available_width().max(60.0);
        let (rect, _) = ui.allocate_exact_size(vec2(width, 14.0), Sense::hover());
        let painter = ui.painter_at(rect);
        let third = rect.width() / 3.0;
        for (segment, color) in [
            SentimentLabel::Negative,
            SentimentLabel::Neutral,
            SentimentLabel::Positive,
        ]
        .into_iter()
        .map(sentiment_color)
        .enumerate()
        {
            let mut part = rect;
            part.set_left(rect.left() + third * segment as f32);
            part.set_width(third);
            painter.rect_filled(part, 0.0, with_alpha(color, 0.35));
        }
        let x = rect.left() + rect.width() * tone_position(tone);
        painter.line_segment(
            [egui::pos2(x, rect.top()), egui::pos2(x, rect.bottom())],
            Stroke::new(3.0, Color32::WHITE),
        );

        ui.label(
            RichText::new(format!(
                "{} {:+.2} · {} samples",
                tone.label.label(),
                tone.average_score,
                tone.sample_size
            ))
            .color(sentiment_color(tone.label)),
        );
    }

    fn draw_entities(&self, ui: &mut Ui) {
        ui.label(RichText::new("Top Entities").strong());
        let entities = self.store.entities();
        if entities.is_empty() {
            ui.label(RichText::new("no data").color(MUTED));
            return;
        }

        egui::Grid::new("entity_grid")
            .num_columns(2)
            .striped(true)
            .show(ui, |ui| {
                for entity in entities.iter().take(TOP_ENTITIES) {
                    ui.label(entity.text.as_str());
                    ui.label(RichText::new(entity.count.to_string()).monospace());
                    ui.end_row();
                }
            });
    }
}
