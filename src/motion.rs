use crate::constants::{CENTERING_FACTOR, CENTERING_THRESHOLD, HITBOX_MARGIN, PLAYER_SPEED};
use crate::grid::Grid;
use crate::types::{Direction, Position};

/// Continuous movement over the cell grid with a shrunken hitbox and a
/// lane-centering nudge on the axis perpendicular to travel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionResolver {
    pub speed: f32,
    pub margin: f32,
    pub centering_threshold: f32,
    pub centering_factor: f32,
}

impl Default for MotionResolver {
    fn default() -> Self {
        Self {
            speed: PLAYER_SPEED,
            margin: HITBOX_MARGIN,
            centering_threshold: CENTERING_THRESHOLD,
            centering_factor: CENTERING_FACTOR,
        }
    }
}

impl MotionResolver {
    pub fn resolve(&self, position: Position, grid: &Grid, intent: Direction) -> Position {
        let (dx, dy) = intent.delta();
        let mut out = position;
        if dx != 0 {
            if let Some(next_x) = self.try_axis(out.x, out.y, dx, |a, b| grid.is_wall(a, b)) {
                out.x = next_x;
                out.y = self.center(out.y);
            }
        }
        if dy != 0 {
            if let Some(next_y) = self.try_axis(out.y, out.x, dy, |a, b| grid.is_wall(b, a)) {
                out.y = next_y;
                out.x = self.center(out.x);
            }
        }
        out
    }

    /// `is_wall(along, across)`; returns the committed coordinate or `None` when
    /// either leading boundary cell is a wall.
    fn try_axis<F>(&self, along: f32, across: f32, sign: i32, is_wall: F) -> Option<f32>
    where
        F: Fn(i32, i32) -> bool,
    {
        let next = along + sign as f32 * self.speed;
        let leading = if sign > 0 {
            (next - self.margin).ceil()
        } else {
            (next + self.margin).floor()
        } as i32;
        let low = (across + self.margin).floor() as i32;
        let high = (across - self.margin).ceil() as i32;
        if is_wall(leading, low) || is_wall(leading, high) {
            return None;
        }
        Some(next)
    }

    fn center(&self, coord: f32) -> f32 {
        let ideal = coord.round();
        if (coord - ideal).abs() < self.centering_threshold {
            coord + (ideal - coord) * self.centering_factor
        } else {
            coord
        }
    }
}
