use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, Vec2};

use crate::feed::SentimentLabel;

use super::graph::Cluster;
use super::pipeline::StageStatus;

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

pub(super) fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        (color.a() as f32 * (0.45 + (factor * 0.55))) as u8,
    )
}

pub(super) fn draw_background(painter: &Painter, rect: Rect, pan: Vec2, zoom: f32) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(8, 10, 16));

    let step = (56.0 * zoom.clamp(0.6, 1.8)).max(20.0);
    let origin = rect.center() + pan;

    let mut x = origin.x.rem_euclid(step);
    while x < rect.right() {
        painter.line_segment(
            [Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())],
            Stroke::new(1.0, Color32::from_rgba_unmultiplied(38, 52, 74, 60)),
        );
        x += step;
    }

    let mut y = origin.y.rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment(
            [Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)],
            Stroke::new(1.0, Color32::from_rgba_unmultiplied(38, 52, 74, 60)),
        );
        y += step;
    }
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}

pub(super) fn edge_visible(rect: Rect, start: Pos2, end: Pos2, padding: f32) -> bool {
    let min_x = start.x.min(end.x) - padding;
    let max_x = start.x.max(end.x) + padding;
    let min_y = start.y.min(end.y) - padding;
    let max_y = start.y.max(end.y) + padding;

    if max_x < rect.left() || min_x > rect.right() || max_y < rect.top() || min_y > rect.bottom() {
        return false;
    }

    if rect.contains(start) || rect.contains(end) {
        return true;
    }

    let top_left = rect.left_top();
    let top_right = rect.right_top();
    let bottom_left = rect.left_bottom();
    let bottom_right = rect.right_bottom();

    segments_intersect(start, end, top_left, top_right)
        || segments_intersect(start, end, top_right, bottom_right)
        || segments_intersect(start, end, bottom_right, bottom_left)
        || segments_intersect(start, end, bottom_left, top_left)
}

fn segments_intersect(a1: Pos2, a2: Pos2, b1: Pos2, b2: Pos2) -> bool {
    fn cross(o: Pos2, a: Pos2, b: Pos2) -> f32 {
        let oa = a - o;
        let ob = b - o;
        (oa.x * ob.y) - (oa.y * ob.x)
    }

    let a_min_x = a1.x.min(a2.x);
    let a_max_x = a1.x.max(a2.x);
    let a_min_y = a1.y.min(a2.y);
    let a_max_y = a1.y.max(a2.y);
    let b_min_x = b1.x.min(b2.x);
    let b_max_x = b1.x.max(b2.x);
    let b_min_y = b1.y.min(b2.y);
    let b_max_y = b1.y.max(b2.y);

    if a_max_x < b_min_x || b_max_x < a_min_x || a_max_y < b_min_y || b_max_y < a_min_y {
        return false;
    }

    let c1 = cross(a1, a2, b1);
    let c2 = cross(a1, a2, b2);
    let c3 = cross(b1, b2, a1);
    let c4 = cross(b1, b2, a2);

    (c1 <= 0.0 && c2 >= 0.0 || c1 >= 0.0 && c2 <= 0.0)
        && (c3 <= 0.0 && c4 >= 0.0 || c3 >= 0.0 && c4 <= 0.0)
}

pub(super) fn world_to_screen(rect: Rect, pan: Vec2, zoom: f32, world: Vec2) -> Pos2 {
    rect.center() + pan + world * zoom
}

pub(super) fn screen_to_world(rect: Rect, pan: Vec2, zoom: f32, screen: Pos2) -> Vec2 {
    (screen - rect.center() - pan) / zoom
}

pub(super) fn cluster_color(cluster: Cluster) -> Color32 {
    match cluster {
        Cluster::Hub => Color32::from_rgb(0x0f, 0x62, 0xfe),
        Cluster::Input => Color32::from_rgb(0x6f, 0xdc, 0x8c),
        Cluster::Parse => Color32::from_rgb(0x82, 0xcf, 0xff),
        Cluster::Sentiment => Color32::from_rgb(0xff, 0xaf, 0xd2),
        Cluster::Topic => Color32::from_rgb(0xd4, 0xbb, 0xff),
        Cluster::Entity => Color32::from_rgb(0xff, 0xd6, 0xa5),
        Cluster::Conflict => Color32::from_rgb(0xff, 0x83, 0x89),
        Cluster::Output => Color32::WHITE,
    }
}

pub(super) const MUTED: Color32 = Color32::from_rgb(0x8d, 0x8d, 0x8d);

pub(super) fn topic_color(topic: &str) -> Color32 {
    match topic {
        "Technology" => cluster_color(Cluster::Parse),
        "Politics" => cluster_color(Cluster::Topic),
        "Finance" => cluster_color(Cluster::Entity),
        "Conflict" => cluster_color(Cluster::Conflict),
        "Environment" => cluster_color(Cluster::Input),
        "Health" => cluster_color(Cluster::Sentiment),
        _ => MUTED,
    }
}

pub(super) fn sentiment_color(label: SentimentLabel) -> Color32 {
    match label {
        SentimentLabel::Positive => Color32::from_rgb(0x42, 0xbe, 0x65),
        SentimentLabel::Neutral => Color32::from_rgb(0xf1, 0xc2, 0x1b),
        SentimentLabel::Negative => Color32::from_rgb(0xfa, 0x4d, 0x56),
    }
}

pub(super) fn status_color(status: StageStatus) -> Color32 {
    match status {
        StageStatus::Queue => Color32::from_rgb(0x52, 0x5a, 0x66),
        StageStatus::Active => Color32::from_rgb(0x45, 0x89, 0xff),
        StageStatus::Done => Color32::from_rgb(0x42, 0xbe, 0x65),
        StageStatus::Alert => Color32::from_rgb(0xfa, 0x4d, 0x56),
    }
}

pub(super) fn with_alpha(color: Color32, alpha: f32) -> Color32 {
    Color32::from_rgba_unmultiplied(
        color.r(),
        color.g(),
        color.b(),
        (alpha.clamp(0.0, 1.0) * 255.0) as u8,
    )
}
