use serde::{Deserialize, Serialize};

use crate::config::GridConfig;
use crate::geometry::Position;

const ZOOM_STEP: f32 = 1.2;
/// Lowest scale ever applied, whatever the grid config says.
const MIN_SCALE_FLOOR: f32 = 1e-3;

/// Canvas-to-screen transform: `screen = canvas * scale + offset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub scale: f32,
    pub offset: Position,
    #[serde(skip)]
    grid: GridConfig,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(GridConfig::default())
    }
}

impl Viewport {
    pub fn new(grid: GridConfig) -> Self {
        Self {
            scale: 1.0,
            offset: Position::default(),
            grid,
        }
    }

    pub fn set_scale(&mut self, scale: f32) {
        if !scale.is_finite() {
            return;
        }
        let lo = self.grid.min_scale.min(self.grid.max_scale).max(MIN_SCALE_FLOOR);
        let hi = self.grid.min_scale.max(self.grid.max_scale).max(lo);
        self.scale = scale.max(lo).min(hi);
    }

    pub fn zoom_in(&mut self) {
        self.set_scale(self.scale * ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_scale(self.scale / ZOOM_STEP);
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.offset = self.offset.offset(dx, dy);
    }

    pub fn reset(&mut self) {
        self.scale = 1.0;
        self.offset = Position::default();
    }

    pub fn screen_to_canvas(&self, screen: Position) -> Position {
        Position::new(
            (screen.x - self.offset.x) / self.scale,
            (screen.y - self.offset.y) / self.scale,
        )
    }

    pub fn canvas_to_screen(&self, canvas: Position) -> Position {
        Position::new(
            canvas.x * self.scale + self.offset.x,
            canvas.y * self.scale + self.offset.y,
        )
    }

    /// Nearest grid point, or `point` unchanged when snapping is off.
    pub fn snap_to_grid(&self, point: Position) -> Position {
        if !self.grid.snap || self.grid.size <= 0.0 {
            return point;
        }
        let size = self.grid.size;
        Position::new((point.x / size).round() * size, (point.y / size).round() * size)
    }
}
