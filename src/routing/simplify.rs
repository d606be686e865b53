use crate::geometry::Position;

const SAME_EPS: f32 = 1e-4;

fn same(a: f32, b: f32) -> bool {
    (a - b).abs() <= SAME_EPS
}

fn same_point(a: Position, b: Position) -> bool {
    same(a.x, b.x) && same(a.y, b.y)
}

/// Drop repeated points and interior points that lie between their
/// neighbours on a straight horizontal or vertical run. A point where the
/// run doubles back is a corner and stays. Endpoints are always kept.
pub fn simplify_orthogonal_path(points: &[Position]) -> Vec<Position> {
    if points.len() <= 2 {
        return points.to_vec();
    }
    let last = points[points.len() - 1];
    let mut out: Vec<Position> = Vec::with_capacity(points.len());
    out.push(points[0]);
    for idx in 1..points.len() - 1 {
        let prev = out[out.len() - 1];
        let curr = points[idx];
        if same_point(curr, prev) {
            continue;
        }
        let next = points[idx + 1..]
            .iter()
            .copied()
            .find(|&p| !same_point(p, curr))
            .unwrap_or(last);
        let horizontal_run = same(prev.y, curr.y)
            && same(curr.y, next.y)
            && (curr.x - prev.x) * (next.x - curr.x) >= 0.0;
        let vertical_run = same(prev.x, curr.x)
            && same(curr.x, next.x)
            && (curr.y - prev.y) * (next.y - curr.y) >= 0.0;
        if horizontal_run || vertical_run {
            continue;
        }
        out.push(curr);
    }
    let tail = out[out.len() - 1];
    if !(same(last.x, tail.x) && same(last.y, tail.y)) || out.len() == 1 {
        out.push(last);
    }
    out
}

pub fn path_length(points: &[Position]) -> f32 {
    points
        .windows(2)
        .map(|segment| segment[0].distance_to(segment[1]))
        .sum()
}

/// Direction changes along the path. Doubling back counts as a bend.
pub fn path_bend_count(points: &[Position]) -> usize {
    if points.len() < 3 {
        return 0;
    }
    let mut bends = 0usize;
    for idx in 1..points.len() - 1 {
        let p0 = points[idx - 1];
        let p1 = points[idx];
        let p2 = points[idx + 1];
        let dx1 = p1.x - p0.x;
        let dy1 = p1.y - p0.y;
        let dx2 = p2.x - p1.x;
        let dy2 = p2.y - p1.y;
        if (dx1.abs() <= SAME_EPS && dy1.abs() <= SAME_EPS)
            || (dx2.abs() <= SAME_EPS && dy2.abs() <= SAME_EPS)
        {
            continue;
        }
        let cross = dx1 * dy2 - dy1 * dx2;
        let dot = dx1 * dx2 + dy1 * dy2;
        if cross.abs() > SAME_EPS || dot < 0.0 {
            bends += 1;
        }
    }
    bends
}

/// Every segment is horizontal or vertical.
pub fn is_orthogonal(points: &[Position]) -> bool {
    points
        .windows(2)
        .all(|segment| same(segment[0].x, segment[1].x) || same(segment[0].y, segment[1].y))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(raw: &[(f32, f32)]) -> Vec<Position> {
        raw.iter().copied().map(Position::from).collect()
    }

    #[test]
    fn collapsed_midpoint_route_becomes_straight() {
        let path = pts(&[(0.0, 50.0), (100.0, 50.0), (100.0, 50.0), (200.0, 50.0)]);
        assert_eq!(simplify_orthogonal_path(&path), pts(&[(0.0, 50.0), (200.0, 50.0)]));
    }

    #[test]
    fn corners_survive() {
        let path = pts(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (20.0, 10.0), (30.0, 10.0)]);
        assert_eq!(
            simplify_orthogonal_path(&path),
            pts(&[(0.0, 0.0), (20.0, 0.0), (20.0, 10.0), (30.0, 10.0)])
        );
    }

    #[test]
    fn short_paths_are_returned_as_is() {
        let path = pts(&[(0.0, 0.0), (5.0, 5.0)]);
        assert_eq!(simplify_orthogonal_path(&path), path);
    }

    #[test]
    fn degenerate_loop_keeps_both_endpoints() {
        let path = pts(&[(0.0, 0.0), (0.0, 0.0), (0.0, 0.0)]);
        assert_eq!(simplify_orthogonal_path(&path), pts(&[(0.0, 0.0), (0.0, 0.0)]));
    }

    #[test]
    fn doubling_back_keeps_the_turn_point() {
        let path = pts(&[(100.0, 50.0), (150.0, 50.0), (150.0, 50.0), (60.0, 50.0)]);
        assert_eq!(
            simplify_orthogonal_path(&path),
            pts(&[(100.0, 50.0), (150.0, 50.0), (60.0, 50.0)])
        );
        let vertical = pts(&[(0.0, 0.0), (0.0, 40.0), (0.0, 10.0)]);
        assert_eq!(simplify_orthogonal_path(&vertical), vertical);
    }

    #[test]
    fn u_turn_counts_as_a_bend() {
        let path = pts(&[(100.0, 50.0), (150.0, 50.0), (60.0, 50.0)]);
        assert_eq!(path_bend_count(&path), 1);
    }

    #[test]
    fn bend_count_tracks_turns() {
        let straight = pts(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]);
        let orth = pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (20.0, 10.0)]);
        assert_eq!(path_bend_count(&straight), 0);
        assert_eq!(path_bend_count(&orth), 2);
        assert_eq!(path_length(&orth), 30.0);
        assert!(is_orthogonal(&orth));
        assert!(!is_orthogonal(&pts(&[(0.0, 0.0), (3.0, 4.0)])));
    }
}
