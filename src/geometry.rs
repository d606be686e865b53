use serde::{Deserialize, Serialize};

/// Tolerance for orientation tests. Collinear points land within it.
const ORIENT_EPS: f32 = 1e-6;

/// A point in canvas (model) space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn distance_to(self, other: Position) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<(f32, f32)> for Position {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

impl From<Position> for (f32, f32) {
    fn from(p: Position) -> Self {
        (p.x, p.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Both dimensions finite and strictly positive.
    pub fn is_valid(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Axis-aligned box. Derived from node position + size on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_node(position: Position, size: Size) -> Self {
        Self::new(position.x, position.y, size.width, size.height)
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Grow the box by `pad` on every side.
    pub fn inflate(&self, pad: f32) -> Self {
        Self::new(
            self.x - pad,
            self.y - pad,
            self.width + pad * 2.0,
            self.height + pad * 2.0,
        )
    }

    /// Corners in clockwise order starting top-left.
    fn corners(&self) -> [Position; 4] {
        [
            Position::new(self.left(), self.top()),
            Position::new(self.right(), self.top()),
            Position::new(self.right(), self.bottom()),
            Position::new(self.left(), self.bottom()),
        ]
    }
}

/// Inclusive containment: points on the border count as inside.
pub fn point_in_box(point: Position, rect: &BoundingBox) -> bool {
    point.x >= rect.left()
        && point.x <= rect.right()
        && point.y >= rect.top()
        && point.y <= rect.bottom()
}

fn orient(a: Position, b: Position, c: Position) -> f32 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// `c` lies within the bounding rectangle of segment `a`-`b`.
fn on_segment(a: Position, b: Position, c: Position) -> bool {
    c.x >= a.x.min(b.x) - ORIENT_EPS
        && c.x <= a.x.max(b.x) + ORIENT_EPS
        && c.y >= a.y.min(b.y) - ORIENT_EPS
        && c.y <= a.y.max(b.y) + ORIENT_EPS
}

/// Segment/segment intersection, touching endpoints included.
///
/// Parallel segments that never meet report `false`; collinear segments
/// only intersect when one endpoint lies on the other segment.
pub fn segments_intersect(a: Position, b: Position, c: Position, d: Position) -> bool {
    let o1 = orient(a, b, c);
    let o2 = orient(a, b, d);
    let o3 = orient(c, d, a);
    let o4 = orient(c, d, b);
    if (o1 > ORIENT_EPS && o2 < -ORIENT_EPS || o1 < -ORIENT_EPS && o2 > ORIENT_EPS)
        && (o3 > ORIENT_EPS && o4 < -ORIENT_EPS || o3 < -ORIENT_EPS && o4 > ORIENT_EPS)
    {
        return true;
    }
    if o1.abs() <= ORIENT_EPS && on_segment(a, b, c) {
        return true;
    }
    if o2.abs() <= ORIENT_EPS && on_segment(a, b, d) {
        return true;
    }
    if o3.abs() <= ORIENT_EPS && on_segment(c, d, a) {
        return true;
    }
    if o4.abs() <= ORIENT_EPS && on_segment(c, d, b) {
        return true;
    }
    false
}

/// True when the segment `a`-`b` crosses or touches `rect`.
pub fn line_intersects_box(a: Position, b: Position, rect: &BoundingBox) -> bool {
    if a.x < rect.left() && b.x < rect.left()
        || a.x > rect.right() && b.x > rect.right()
        || a.y < rect.top() && b.y < rect.top()
        || a.y > rect.bottom() && b.y > rect.bottom()
    {
        return false;
    }
    if point_in_box(a, rect) || point_in_box(b, rect) {
        return true;
    }
    let corners = rect.corners();
    (0..4).any(|idx| segments_intersect(a, b, corners[idx], corners[(idx + 1) % 4]))
}

/// Shortest distance from `point` to the segment `a`-`b`.
pub fn distance_to_segment(point: Position, a: Position, b: Position) -> f32 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    if len_sq <= f32::EPSILON {
        return point.distance_to(a);
    }
    let t = (((point.x - a.x) * dx + (point.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    point.distance_to(Position::new(a.x + t * dx, a.y + t * dy))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f32, y: f32) -> Position {
        Position::new(x, y)
    }

    #[test]
    fn point_on_border_is_inside() {
        let rect = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(point_in_box(p(10.0, 5.0), &rect));
        assert!(point_in_box(p(0.0, 0.0), &rect));
        assert!(!point_in_box(p(10.1, 5.0), &rect));
    }

    #[test]
    fn crossing_segments_intersect() {
        assert!(segments_intersect(p(0.0, 0.0), p(10.0, 10.0), p(0.0, 10.0), p(10.0, 0.0)));
        assert!(!segments_intersect(p(0.0, 0.0), p(4.0, 4.0), p(0.0, 10.0), p(4.0, 6.0)));
    }

    #[test]
    fn parallel_segments_do_not_intersect() {
        assert!(!segments_intersect(p(0.0, 0.0), p(10.0, 0.0), p(0.0, 5.0), p(10.0, 5.0)));
    }

    #[test]
    fn collinear_overlap_counts_once_touching() {
        assert!(segments_intersect(p(0.0, 0.0), p(10.0, 0.0), p(10.0, 0.0), p(20.0, 0.0)));
        assert!(!segments_intersect(p(0.0, 0.0), p(10.0, 0.0), p(11.0, 0.0), p(20.0, 0.0)));
    }

    #[test]
    fn segment_through_box_without_endpoints_inside() {
        let rect = BoundingBox::new(10.0, 10.0, 20.0, 20.0);
        assert!(line_intersects_box(p(0.0, 20.0), p(40.0, 20.0), &rect));
        assert!(line_intersects_box(p(20.0, 0.0), p(20.0, 40.0), &rect));
    }

    #[test]
    fn segment_beside_box_is_rejected_early() {
        let rect = BoundingBox::new(10.0, 10.0, 20.0, 20.0);
        assert!(!line_intersects_box(p(0.0, 0.0), p(0.0, 40.0), &rect));
        assert!(!line_intersects_box(p(0.0, 5.0), p(40.0, 5.0), &rect));
    }

    #[test]
    fn diagonal_missing_corner() {
        let rect = BoundingBox::new(10.0, 10.0, 10.0, 10.0);
        // Passes the axis rejection test but clears the top-left corner.
        assert!(!line_intersects_box(p(0.0, 15.0), p(15.0, 0.0), &rect));
        assert!(line_intersects_box(p(0.0, 25.0), p(25.0, 0.0), &rect));
    }

    #[test]
    fn segment_touching_edge_counts() {
        let rect = BoundingBox::new(10.0, 10.0, 10.0, 10.0);
        assert!(line_intersects_box(p(0.0, 10.0), p(30.0, 10.0), &rect));
    }

    #[test]
    fn distance_clamps_to_segment_ends() {
        assert_eq!(distance_to_segment(p(5.0, 3.0), p(0.0, 0.0), p(10.0, 0.0)), 3.0);
        assert_eq!(distance_to_segment(p(13.0, 4.0), p(0.0, 0.0), p(10.0, 0.0)), 5.0);
        assert_eq!(distance_to_segment(p(3.0, 4.0), p(0.0, 0.0), p(0.0, 0.0)), 5.0);
    }

    #[test]
    fn inflate_grows_every_side() {
        let rect = BoundingBox::new(10.0, 10.0, 10.0, 10.0).inflate(5.0);
        assert_eq!(rect, BoundingBox::new(5.0, 5.0, 20.0, 20.0));
    }
}
