mod obstacles;
mod simplify;

pub use obstacles::*;
pub use simplify::*;

use serde::{Deserialize, Serialize};

use crate::geometry::{BoundingBox, Position};

// ── Fixed routing heuristics ────────────────────────────────────────
/// Default stub length before the first turn when no option is given.
pub const DEFAULT_OFFSET_FROM_PORT: f32 = 50.0;
/// Vertical gap above which a cramped forward route runs through the mid-line
/// instead of bypassing above both ports.
pub const VERTICAL_SPLIT_THRESHOLD: f32 = 100.0;
/// Padding handed to the obstacle pass.
pub const DEFAULT_OBSTACLE_PADDING: f32 = 10.0;

/// Side of its node a port faces. The wire leaves or enters horizontally on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortSide {
    Left,
    Right,
}

impl PortSide {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "left" | "l" => Some(Self::Left),
            "right" | "r" => Some(Self::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutingOptions {
    pub offset_from_port: f32,
    pub custom_waypoints: Vec<Position>,
    pub obstacles: Vec<BoundingBox>,
    pub obstacle_padding: f32,
}

impl Default for RoutingOptions {
    fn default() -> Self {
        Self {
            offset_from_port: DEFAULT_OFFSET_FROM_PORT,
            custom_waypoints: Vec::new(),
            obstacles: Vec::new(),
            obstacle_padding: DEFAULT_OBSTACLE_PADDING,
        }
    }
}

impl RoutingOptions {
    pub fn with_offset(offset_from_port: f32) -> Self {
        Self {
            offset_from_port,
            ..Self::default()
        }
    }
}

/// Right-angled polyline from `from` to `to`.
///
/// The first point is always `from` and the last is always `to`. Custom
/// waypoints replace the automatic route verbatim; they are not checked for
/// orthogonality. Pure: identical inputs give identical output.
pub fn calculate_orthogonal_path(
    from: Position,
    to: Position,
    from_side: PortSide,
    to_side: PortSide,
    options: &RoutingOptions,
) -> Vec<Position> {
    if !options.custom_waypoints.is_empty() {
        return path_through_waypoints(from, to, &options.custom_waypoints);
    }

    let offset = options.offset_from_port;
    let mut points = Vec::with_capacity(6);
    points.push(from);

    match (from_side, to_side) {
        (PortSide::Right, PortSide::Left) => {
            if to.x > from.x + offset * 2.0 {
                let mid_x = (from.x + to.x) / 2.0;
                points.push(Position::new(mid_x, from.y));
                points.push(Position::new(mid_x, to.y));
            } else {
                let extend_x1 = from.x + offset;
                let extend_x2 = to.x - offset;
                let lane_y = if (from.y - to.y).abs() > VERTICAL_SPLIT_THRESHOLD {
                    (from.y + to.y) / 2.0
                } else {
                    from.y.min(to.y) - offset
                };
                push_detour(&mut points, from, to, extend_x1, extend_x2, lane_y);
            }
        }
        (PortSide::Left, PortSide::Right) => {
            if from.x > to.x + offset * 2.0 {
                let mid_x = (from.x + to.x) / 2.0;
                points.push(Position::new(mid_x, from.y));
                points.push(Position::new(mid_x, to.y));
            } else {
                let extend_x1 = from.x - offset;
                let extend_x2 = to.x + offset;
                let bypass_y = from.y.min(to.y) - offset;
                push_detour(&mut points, from, to, extend_x1, extend_x2, bypass_y);
            }
        }
        (PortSide::Right, PortSide::Right) => {
            let extend_x = from.x.max(to.x) + offset;
            points.push(Position::new(extend_x, from.y));
            points.push(Position::new(extend_x, to.y));
        }
        (PortSide::Left, PortSide::Left) => {
            let extend_x = from.x.min(to.x) - offset;
            points.push(Position::new(extend_x, from.y));
            points.push(Position::new(extend_x, to.y));
        }
    }

    points.push(to);

    if options.obstacles.is_empty() {
        return points;
    }
    adjust_path_for_obstacles(points, &options.obstacles, options.obstacle_padding).points
}

/// Default-offset routing with obstacle reporting.
pub fn calculate_smart_orthogonal_path(
    from: Position,
    to: Position,
    from_side: PortSide,
    to_side: PortSide,
    obstacles: &[BoundingBox],
) -> Vec<Position> {
    let options = RoutingOptions {
        obstacles: obstacles.to_vec(),
        ..RoutingOptions::default()
    };
    calculate_orthogonal_path(from, to, from_side, to_side, &options)
}

fn push_detour(
    points: &mut Vec<Position>,
    from: Position,
    to: Position,
    extend_x1: f32,
    extend_x2: f32,
    lane_y: f32,
) {
    points.push(Position::new(extend_x1, from.y));
    points.push(Position::new(extend_x1, lane_y));
    points.push(Position::new(extend_x2, lane_y));
    points.push(Position::new(extend_x2, to.y));
}

fn path_through_waypoints(from: Position, to: Position, waypoints: &[Position]) -> Vec<Position> {
    let mut points = Vec::with_capacity(waypoints.len() + 2);
    points.push(from);
    points.extend_from_slice(waypoints);
    points.push(to);
    points
}

/// Flat `[x0, y0, x1, y1, ...]` form expected by polyline renderers.
pub fn to_flat(points: &[Position]) -> Vec<f32> {
    points.iter().flat_map(|p| [p.x, p.y]).collect()
}
