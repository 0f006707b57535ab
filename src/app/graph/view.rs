use std::collections::HashSet;
use std::sync::Arc;

use eframe::egui::{self, Align2, Color32, FontId, Painter, Pos2, Sense, Stroke, Ui, Vec2, vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::util::truncate_chars;

use super::super::render_utils::{
    blend_color, cluster_color, dim_color, draw_background, edge_visible, with_alpha,
    world_to_screen,
};
use super::super::{SearchMatchCache, ViewModel};
use super::render::HubState;
use super::Cluster;

const NODE_RADIUS: f32 = 8.0;
const HUB_CORE_RADIUS: f32 = 40.0;
const HUB_RING_RADIUS: f32 = 50.0;
const HUB_RING_SPACING: f32 = 25.0;
const LINE_OPACITY: f32 = 0.25;
const SIGNAL_OPACITY: f32 = 0.9;

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

fn draw_hub(painter: &Painter, center: Pos2, zoom: f32, hub: HubState) {
    painter.circle_filled(
        center,
        HUB_CORE_RADIUS * zoom,
        with_alpha(cluster_color(Cluster::Hub), hub.pulse() * 0.8),
    );

    // Tilted rings: rotation shows up as a wobble of the vertical squash.
    for ring in 0..hub.ring_count() {
        let radius = (HUB_RING_RADIUS + ring as f32 * HUB_RING_SPACING) * zoom;
        let tilt = (hub.rotation + ring as f32 * 0.3).cos().abs().max(0.15);
        let color = with_alpha(cluster_color(Cluster::Hub), hub.ring_opacity(ring + 1));
        let points = (0..=48)
            .map(|step| {
                let angle = step as f32 / 48.0 * std::f32::consts::TAU;
                center + vec2(angle.cos() * radius, angle.sin() * radius * tilt)
            })
            .collect::<Vec<_>>();
        painter.add(egui::Shape::line(points, Stroke::new(2.0 * zoom.sqrt(), color)));
    }
}

impl ViewModel {
    fn cached_search_matches(&mut self) -> Option<Arc<HashSet<usize>>> {
        let query = self.search.trim();
        if query.is_empty() {
            return None;
        }

        let graph = self.scheduler.graph();
        if let Some(cached) = &self.search_match_cache
            && cached.graph_revision == graph.revision()
            && cached.query == query
        {
            return Some(Arc::clone(&cached.matches));
        }

        let matcher = SkimMatcherV2::default();
        let matches = graph
            .nodes()
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_leaf())
            .filter_map(|(index, node)| {
                let hit = fuzzy_match_score(&matcher, &node.label, query).is_some()
                    || fuzzy_match_score(&matcher, &node.title, query).is_some();
                hit.then_some(index)
            })
            .collect::<HashSet<_>>();
        let matches = Arc::new(matches);

        self.search_match_cache = Some(SearchMatchCache {
            query: query.to_owned(),
            graph_revision: graph.revision(),
            matches: Arc::clone(&matches),
        });
        Some(matches)
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let delta = ui
            .ctx()
            .input(|input| input.stable_dt)
            .clamp(0.0, 0.25);
        self.scheduler.tick(delta, &mut self.store);

        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        let zoomed = self.handle_graph_zoom(ui, rect, &response);
        let panned = self.handle_graph_pan(&response);
        self.advance_orbit(delta, zoomed || panned);

        let pan = self.view_pan();
        let zoom = self.zoom;
        draw_background(&painter, rect, pan, zoom);

        let matches = self.cached_search_matches();
        let search_active = matches.as_ref().is_some_and(|matches| !matches.is_empty());
        let render = self.scheduler.render();
        let nodes = self.scheduler.graph().nodes();

        let line_width = (1.0 * zoom.sqrt()).clamp(0.6, 2.0);
        for line in render.lines() {
            let start = world_to_screen(rect, pan, zoom, line.start);
            let end = world_to_screen(rect, pan, zoom, line.end);
            if !edge_visible(rect, start, end, 2.0) {
                continue;
            }
            painter.line_segment(
                [start, end],
                Stroke::new(line_width, with_alpha(line.color, LINE_OPACITY)),
            );
        }

        let signal_radius = (3.0 * zoom.sqrt()).clamp(1.2, 5.0);
        for slot in render.signal_slots().iter().take_while(|slot| !slot.is_parked()) {
            let position = world_to_screen(rect, pan, zoom, slot.position);
            if rect.contains(position) {
                painter.circle_filled(position, signal_radius, with_alpha(slot.color, SIGNAL_OPACITY));
            }
        }

        draw_hub(&painter, world_to_screen(rect, pan, zoom, Vec2::ZERO), zoom, render.hub());

        let instances = render.instances();
        let screen_positions = instances
            .iter()
            .map(|instance| world_to_screen(rect, pan, zoom, instance.position))
            .collect::<Vec<_>>();
        let screen_radii = instances
            .iter()
            .map(|instance| (NODE_RADIUS * instance.scale * zoom).max(1.5))
            .collect::<Vec<_>>();
        let visible = Self::visible_indices(rect, &screen_positions, &screen_radii);
        let hovered = Self::hovered_index(ui, &visible, &screen_positions, &screen_radii);

        for &slot in &visible {
            let instance = &instances[slot];
            let position = screen_positions[slot];
            let radius = screen_radii[slot];
            let is_match = matches
                .as_ref()
                .is_some_and(|matches| matches.contains(&instance.node));
            let is_hovered = hovered == Some(slot);

            let color = if is_hovered {
                blend_color(instance.color, Color32::WHITE, 0.45)
            } else if is_match {
                blend_color(instance.color, Color32::from_rgb(103, 196, 255), 0.55)
            } else if search_active && instance.scale <= 1.0 {
                dim_color(instance.color, 0.35)
            } else {
                instance.color
            };
            painter.circle_filled(position, radius, color);
            if is_match {
                painter.circle_stroke(
                    position,
                    radius + 3.0,
                    Stroke::new(1.5, Color32::from_rgb(103, 196, 255)),
                );
            }

            if instance.scale > 1.0
                && let Some(node) = nodes.get(instance.node)
            {
                painter.text(
                    position + vec2(0.0, radius + 10.0),
                    Align2::CENTER_TOP,
                    &node.label,
                    FontId::monospace(11.0),
                    with_alpha(instance.color, 0.85),
                );
            }
        }

        if hovered.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }

        if let Some(node) = hovered
            .and_then(|slot| instances.get(slot))
            .and_then(|instance| nodes.get(instance.node))
        {
            let text = if node.is_leaf() {
                format!(
                    "{}  |  {}  |  {}",
                    node.cluster.label(),
                    node.label,
                    truncate_chars(&node.title, 72)
                )
            } else {
                format!("{} anchor", node.label)
            };
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                text,
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }

        for label in self.scheduler.labels().labels() {
            let progress = label.progress();
            let position = Pos2::new(
                rect.left() + rect.width() * label.x_fraction,
                rect.top() - 20.0 + (rect.height() + 40.0) * progress,
            );
            let fade = 1.0 - progress * progress;
            painter.text(
                position,
                Align2::CENTER_CENTER,
                &label.text,
                FontId::monospace(16.0),
                with_alpha(label.color, fade),
            );
        }

        self.visible_node_count = visible.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuzzy_search_is_case_insensitive() {
        let matcher = SkimMatcherV2::default();
        assert!(fuzzy_match_score(&matcher, "Technology", "tech").is_some());
        assert!(fuzzy_match_score(&matcher, "GLOBAL ECONOMY", "econ").is_some());
        assert!(fuzzy_match_score(&matcher, "Health", "xyz").is_none());
    }

    #[test]
    fn hub_ring_opacity_never_exceeds_one() {
        let mut hub = HubState::default();
        for _ in 0..100 {
            for ring in 0..=hub.ring_count() {
                assert!(hub.ring_opacity(ring) <= 1.0);
            }
            hub.rotation += 0.1;
        }
    }
}
