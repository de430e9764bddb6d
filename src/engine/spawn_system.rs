use super::*;
use crate::constants::{EMPTY_CELL_ATTEMPTS, PURSUER_SPAWN_ATTEMPTS, SAFE_SPAWN_DISTANCE};

use super::utils::{farthest_open_cell, pursuer_kind};

impl<R: RandomSource> GameSession<R> {
    /// Random interior cell that is open; after `EMPTY_CELL_ATTEMPTS` misses,
    /// the first open cell in row-major order.
    pub(super) fn find_empty_cell(&mut self) -> CellPos {
        let max_x = self.grid.cols() as i32 - 2;
        let max_y = self.grid.rows() as i32 - 2;
        for _ in 0..EMPTY_CELL_ATTEMPTS {
            let x = self.rng.int(1, max_x);
            let y = self.rng.int(1, max_y);
            let cell = CellPos::new(x, y);
            if self.grid.is_open(cell) {
                return cell;
            }
        }
        self.grid
            .open_cells()
            .first()
            .copied()
            .unwrap_or(CellPos::new(1, 1))
    }

    pub(super) fn create_pursuers(&mut self) -> Vec<PursuerInternal> {
        let mut pursuers: Vec<PursuerInternal> = Vec::with_capacity(self.config.pursuer_count);
        for idx in 0..self.config.pursuer_count {
            let occupied: Vec<CellPos> = pursuers.iter().map(|p| p.cell).collect();
            let cell = self.pick_pursuer_spawn(&occupied);
            pursuers.push(self.spawn_pursuer(pursuer_kind(idx), cell));
        }
        pursuers
    }

    /// Open cell at least `SAFE_SPAWN_DISTANCE` from the player and not shared
    /// with another pursuer.
    fn pick_pursuer_spawn(&mut self, occupied: &[CellPos]) -> CellPos {
        let player_cell = self.player.position.cell();
        for _ in 0..PURSUER_SPAWN_ATTEMPTS {
            let cell = self.find_empty_cell();
            if cell.manhattan(player_cell) >= SAFE_SPAWN_DISTANCE && !occupied.contains(&cell) {
                return cell;
            }
        }
        farthest_open_cell(&self.grid, player_cell, occupied)
            .unwrap_or_else(|| self.find_empty_cell())
    }

    /// Moves the player to a random open cell and replaces every pursuer.
    pub(super) fn respawn_after_hit(&mut self) {
        let cell = self.find_empty_cell();
        self.player.position = cell.center();
        self.pursuers = self.create_pursuers();
        self.events.push(RuntimeEvent::Respawned {
            x: cell.x,
            y: cell.y,
        });
    }
}
