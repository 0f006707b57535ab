use eframe::egui::{self, Pos2, Rect, Ui, Vec2, vec2};

use super::super::ViewModel;
use super::super::render_utils::{circle_visible, screen_to_world};

const ORBIT_SPEED: f32 = 0.12;
const ORBIT_AMPLITUDE: Vec2 = vec2(70.0, 35.0);

impl ViewModel {
    pub(in crate::app) fn handle_graph_zoom(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) -> bool {
        if !response.hovered() {
            return false;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return false;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let pan = self.view_pan();
        let world_before = screen_to_world(rect, pan, self.zoom, pointer);

        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.zoom = (self.zoom * zoom_factor).clamp(0.15, 4.0);
        self.pan = pointer - rect.center() - (world_before * self.zoom) - self.orbit_offset();
        true
    }

    pub(in crate::app) fn handle_graph_pan(&mut self, response: &egui::Response) -> bool {
        if response.dragged() {
            self.pan += response.drag_delta();
            return true;
        }
        false
    }

    pub(in crate::app) fn advance_orbit(&mut self, delta: f32, interacting: bool) {
        if self.orbit && !interacting {
            self.orbit_phase = (self.orbit_phase + delta * ORBIT_SPEED) % (std::f32::consts::TAU * 2.0);
        }
    }

    pub(in crate::app) fn orbit_offset(&self) -> Vec2 {
        if !self.orbit {
            return Vec2::ZERO;
        }
        vec2(
            self.orbit_phase.sin() * ORBIT_AMPLITUDE.x,
            (self.orbit_phase * 0.5).sin() * ORBIT_AMPLITUDE.y,
        ) * self.zoom
    }

    pub(in crate::app) fn view_pan(&self) -> Vec2 {
        self.pan + self.orbit_offset()
    }

    pub(in crate::app) fn visible_indices(
        rect: Rect,
        screen_positions: &[Pos2],
        screen_radii: &[f32],
    ) -> Vec<usize> {
        (0..screen_positions.len())
            .filter(|&index| circle_visible(rect, screen_positions[index], screen_radii[index]))
            .collect()
    }

    pub(in crate::app) fn hovered_index(
        ui: &Ui,
        visible_indices: &[usize],
        screen_positions: &[Pos2],
        screen_radii: &[f32],
    ) -> Option<usize> {
        let pointer = ui.input(|input| input.pointer.hover_pos())?;
        visible_indices
            .iter()
            .filter_map(|&index| {
                let distance = screen_positions[index].distance(pointer);
                (distance <= screen_radii[index].max(4.0)).then_some((index, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }
}
