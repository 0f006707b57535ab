use eframe::egui::Color32;
use rand::Rng;

const MIN_FALL_SECS: f32 = 2.5;
const MAX_FALL_SECS: f32 = 5.0;
const X_MIN: f32 = 0.03;
const X_MAX: f32 = 0.97;

fn label_color(key: &str) -> Color32 {
    match key {
        "CONFLICT" => Color32::from_rgb(0xff, 0x83, 0x89),
        "POLITICS" => Color32::from_rgb(0xd4, 0xbb, 0xff),
        "TECHNOLOGY" => Color32::from_rgb(0x82, 0xcf, 0xff),
        "FINANCE" => Color32::from_rgb(0xff, 0xd6, 0xa5),
        "HEALTH" => Color32::from_rgb(0xff, 0xaf, 0xd2),
        "ENVIRONMENT" => Color32::from_rgb(0x6f, 0xdc, 0x8c),
        "OTHER" => Color32::from_rgb(0x8d, 0x8d, 0x8d),
        _ => Color32::WHITE,
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) struct FallingLabel {
    pub(in crate::app) text: String,
    pub(in crate::app) color: Color32,
    pub(in crate::app) x_fraction: f32,
    pub(in crate::app) duration: f32,
    pub(in crate::app) elapsed: f32,
}

impl FallingLabel {
    pub(in crate::app) fn progress(&self) -> f32 {
        (self.elapsed / self.duration).clamp(0.0, 1.0)
    }
}

pub(in crate::app) struct LabelOverlay<R> {
    labels: Vec<FallingLabel>,
    rng: R,
}

impl<R: Rng> LabelOverlay<R> {
    pub(in crate::app) fn new(rng: R) -> Self {
        Self {
            labels: Vec::new(),
            rng,
        }
    }

    pub(in crate::app) fn labels(&self) -> &[FallingLabel] {
        &self.labels
    }

    pub(in crate::app) fn spawn(&mut self, topic: &str) {
        let key = topic.trim().to_uppercase();
        self.labels.push(FallingLabel {
            color: label_color(&key),
            text: format!("{key}▼"),
            x_fraction: self.rng.gen_range(X_MIN..X_MAX),
            duration: self.rng.gen_range(MIN_FALL_SECS..MAX_FALL_SECS),
            elapsed: 0.0,
        });
    }

    pub(in crate::app) fn advance(&mut self, delta: f32) {
        for label in &mut self.labels {
            label.elapsed += delta.max(0.0);
        }
        self.labels.retain(|label| label.elapsed < label.duration);
    }

    pub(in crate::app) fn clear(&mut self) {
        self.labels.clear();
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn known_topics_use_the_palette() {
        let mut overlay = LabelOverlay::new(StdRng::seed_from_u64(3));
        overlay.spawn("Conflict");
        overlay.spawn("quantum");

        let [conflict, unknown] = overlay.labels() else {
            panic!("expected two labels");
        };
        assert_eq!(conflict.text, "CONFLICT▼");
        assert_eq!(conflict.color, Color32::from_rgb(0xff, 0x83, 0x89));
        assert_eq!(unknown.text, "QUANTUM▼");
        assert_eq!(unknown.color, Color32::WHITE);
    }

    #[test]
    fn labels_fall_for_a_bounded_time_then_disappear() {
        let mut overlay = LabelOverlay::new(StdRng::seed_from_u64(9));
        for _ in 0..50 {
            overlay.spawn("Technology");
        }
        for label in overlay.labels() {
            assert!((MIN_FALL_SECS..MAX_FALL_SECS).contains(&label.duration));
            assert!((X_MIN..X_MAX).contains(&label.x_fraction));
        }

        overlay.advance(2.0);
        assert_eq!(overlay.labels().len(), 50);
        assert!(overlay.labels().iter().all(|label| label.progress() > 0.0));
        overlay.advance(3.1);
        assert!(overlay.labels().is_empty());
    }

    #[test]
    fn clear_removes_everything() {
        let mut overlay = LabelOverlay::new(StdRng::seed_from_u64(1));
        overlay.spawn("Finance");
        overlay.clear();
        overlay.clear();
        assert!(overlay.labels().is_empty());
    }
}
