use crate::geometry::{BoundingBox, Position, line_intersects_box};

/// Result of the obstacle pass: the (unchanged) path plus the indices of the
/// obstacles it runs through.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustedPath {
    pub points: Vec<Position>,
    pub blocking: Vec<usize>,
}

impl AdjustedPath {
    pub fn is_clear(&self) -> bool {
        self.blocking.is_empty()
    }
}

/// Indices into `obstacles` of every box hit by any segment of `path`, in
/// first-hit order and without duplicates.
pub fn find_path_obstacles(path: &[Position], obstacles: &[BoundingBox]) -> Vec<usize> {
    let mut hits: Vec<usize> = Vec::new();
    if path.len() < 2 {
        return hits;
    }
    for segment in path.windows(2) {
        let (a, b) = (segment[0], segment[1]);
        for (idx, obstacle) in obstacles.iter().enumerate() {
            if hits.contains(&idx) {
                continue;
            }
            if line_intersects_box(a, b, obstacle) {
                tracing::trace!(obstacle = idx, ?a, ?b, "path segment crosses obstacle");
                hits.push(idx);
            }
        }
    }
    hits
}

/// Reports which obstacles block `path` and returns it untouched.
///
/// No rerouting happens here: `padding` is accepted for call-site
/// compatibility but unused, so a blocked path is drawn through the node.
pub fn adjust_path_for_obstacles(
    path: Vec<Position>,
    obstacles: &[BoundingBox],
    padding: f32,
) -> AdjustedPath {
    let _ = padding;
    let blocking = find_path_obstacles(&path, obstacles);
    if !blocking.is_empty() {
        tracing::warn!(
            blocked_by = blocking.len(),
            "routed path crosses obstacles; leaving it unadjusted"
        );
    }
    AdjustedPath {
        points: path,
        blocking,
    }
}
