use eframe::egui::{Vec2, vec2};

const LEAF_CAPACITY: usize = 8;
const MAX_DEPTH: usize = 12;

#[derive(Clone, Copy, Debug)]
pub(super) struct Square {
    pub(super) center: Vec2,
    pub(super) half_extent: f32,
}

impl Square {
    fn enclosing(points: &[Vec2]) -> Option<Self> {
        let (min, max) = points.iter().fold(
            (
                vec2(f32::INFINITY, f32::INFINITY),
                vec2(f32::NEG_INFINITY, f32::NEG_INFINITY),
            ),
            |(min, max), point| (min.min(*point), max.max(*point)),
        );

        if !(min.x.is_finite() && min.y.is_finite() && max.x.is_finite() && max.y.is_finite()) {
            return None;
        }

        let span = (max - min).max_elem().max(1.0);
        Some(Self {
            center: (min + max) * 0.5,
            half_extent: span * 0.5 + 1.0,
        })
    }

    pub(super) fn width(self) -> f32 {
        self.half_extent * 2.0
    }

    pub(super) fn contains(self, point: Vec2) -> bool {
        (point.x - self.center.x).abs() <= self.half_extent
            && (point.y - self.center.y).abs() <= self.half_extent
    }

    pub(super) fn gap_sq(self, other: Self) -> f32 {
        let reach = self.half_extent + other.half_extent;
        let dx = ((self.center.x - other.center.x).abs() - reach).max(0.0);
        let dy = ((self.center.y - other.center.y).abs() - reach).max(0.0);
        dx * dx + dy * dy
    }

    fn quadrant(self, point: Vec2) -> usize {
        usize::from(point.x >= self.center.x) | (usize::from(point.y >= self.center.y) << 1)
    }

    fn child(self, quadrant: usize) -> Self {
        let quarter = self.half_extent * 0.5;
        let sx = if quadrant & 1 == 1 { quarter } else { -quarter };
        let sy = if quadrant & 2 == 2 { quarter } else { -quarter };
        Self {
            center: self.center + vec2(sx, sy),
            half_extent: quarter,
        }
    }
}

pub(super) struct Cell {
    pub(super) square: Square,
    pub(super) centroid: Vec2,
    pub(super) count: f32,
    pub(super) members: Vec<usize>,
    pub(super) children: [Option<Box<Cell>>; 4],
}

impl Cell {
    pub(super) fn build(positions: &[Vec2]) -> Option<Self> {
        let square = Square::enclosing(positions)?;
        Some(Self::subdivide(
            square,
            (0..positions.len()).collect(),
            positions,
            0,
        ))
    }

    fn subdivide(square: Square, members: Vec<usize>, positions: &[Vec2], depth: usize) -> Self {
        let count = members.len() as f32;
        let centroid = if members.is_empty() {
            square.center
        } else {
            members
                .iter()
                .fold(Vec2::ZERO, |sum, &index| sum + positions[index])
                / count
        };

        let mut cell = Self {
            square,
            centroid,
            count,
            members,
            children: std::array::from_fn(|_| None),
        };

        if depth >= MAX_DEPTH || cell.members.len() <= LEAF_CAPACITY {
            return cell;
        }

        let mut buckets: [Vec<usize>; 4] = std::array::from_fn(|_| Vec::new());
        for &index in &cell.members {
            buckets[square.quadrant(positions[index])].push(index);
        }

        // Coincident points would recurse until MAX_DEPTH without splitting.
        if buckets.iter().filter(|bucket| !bucket.is_empty()).count() <= 1 {
            return cell;
        }

        for (quadrant, bucket) in buckets.into_iter().enumerate() {
            if !bucket.is_empty() {
                cell.children[quadrant] = Some(Box::new(Self::subdivide(
                    square.child(quadrant),
                    bucket,
                    positions,
                    depth + 1,
                )));
            }
        }
        cell.members.clear();
        cell
    }

    pub(super) fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    pub(super) fn children(&self) -> impl Iterator<Item = &Cell> {
        self.children.iter().filter_map(|child| child.as_deref())
    }
}
