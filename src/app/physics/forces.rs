use eframe::egui::{Vec2, vec2};

use super::quadtree::Cell;

const DISTANCE_MIN_SQ: f32 = 1.0;

/// Deterministic unit vector for coincident points, so a pair never gets a
/// zero direction.
fn separation_axis(a: usize, b: usize) -> Vec2 {
    let angle = ((a as f32) * 0.618_034 + (b as f32) * 0.414_214) * std::f32::consts::TAU;
    vec2(angle.cos(), angle.sin())
}

pub(super) fn accumulate_charge(
    cell: &Cell,
    index: usize,
    positions: &[Vec2],
    strength_alpha: f32,
    theta_sq: f32,
    velocity: &mut Vec2,
) {
    if cell.count <= 0.0 {
        return;
    }
    let point = positions[index];

    if cell.is_leaf() {
        for &other in &cell.members {
            if other == index {
                continue;
            }
            let delta = positions[other] - point;
            let mut distance_sq = delta.length_sq();
            let direction = if distance_sq > 0.0 {
                delta
            } else {
                distance_sq = DISTANCE_MIN_SQ;
                separation_axis(index, other)
            };
            if distance_sq < DISTANCE_MIN_SQ {
                distance_sq = (DISTANCE_MIN_SQ * distance_sq).sqrt();
            }
            *velocity += direction * (strength_alpha / distance_sq);
        }
        return;
    }

    let delta = cell.centroid - point;
    let distance_sq = delta.length_sq().max(DISTANCE_MIN_SQ);
    let width = cell.square.width();
    if !cell.square.contains(point) && width * width / theta_sq < distance_sq {
        *velocity += delta * (strength_alpha * cell.count / distance_sq);
        return;
    }

    for child in cell.children() {
        accumulate_charge(child, index, positions, strength_alpha, theta_sq, velocity);
    }
}

fn resolve_overlap(from: usize, to: usize, positions: &[Vec2], radii: &[f32], deltas: &mut [Vec2]) {
    let min_distance = radii[from] + radii[to];
    let delta = positions[from] - positions[to];
    let distance_sq = delta.length_sq();
    if distance_sq >= min_distance * min_distance {
        return;
    }

    let distance = distance_sq.sqrt();
    let direction = if distance > 0.0001 {
        delta / distance
    } else {
        separation_axis(from, to)
    };
    let overlap = min_distance - distance;
    let from_sq = radii[from] * radii[from];
    let to_sq = radii[to] * radii[to];
    let share = if from_sq + to_sq > 0.0 {
        to_sq / (from_sq + to_sq)
    } else {
        0.5
    };

    deltas[from] += direction * (overlap * share);
    deltas[to] -= direction * (overlap * (1.0 - share));
}

pub(super) fn accumulate_collisions(
    a: &Cell,
    b: &Cell,
    same_cell: bool,
    positions: &[Vec2],
    radii: &[f32],
    reach_sq: f32,
    deltas: &mut [Vec2],
) {
    if a.square.gap_sq(b.square) > reach_sq {
        return;
    }

    if a.is_leaf() && b.is_leaf() {
        if same_cell {
            for (offset, &from) in a.members.iter().enumerate() {
                for &to in &a.members[offset + 1..] {
                    resolve_overlap(from, to, positions, radii, deltas);
                }
            }
        } else {
            for &from in &a.members {
                for &to in &b.members {
                    resolve_overlap(from, to, positions, radii, deltas);
                }
            }
        }
        return;
    }

    if same_cell {
        let children = a.children().collect::<Vec<_>>();
        for (offset, first) in children.iter().enumerate() {
            accumulate_collisions(first, first, true, positions, radii, reach_sq, deltas);
            for second in &children[offset + 1..] {
                accumulate_collisions(first, second, false, positions, radii, reach_sq, deltas);
            }
        }
        return;
    }

    let split_a = !a.is_leaf() && (b.is_leaf() || a.square.half_extent >= b.square.half_extent);
    if split_a {
        for child in a.children() {
            accumulate_collisions(child, b, false, positions, radii, reach_sq, deltas);
        }
    } else {
        for child in b.children() {
            accumulate_collisions(a, child, false, positions, radii, reach_sq, deltas);
        }
    }
}
