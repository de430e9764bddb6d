use std::f32::consts::TAU;

use tracing::warn;

use super::*;
use crate::constants::{PHASE_STEP, SNAP_THRESHOLD_RATIO};
use crate::pursuit::{choose_direction, PlanOutcome};
use crate::types::PursuerKind;

impl PursuerInternal {
    pub(super) fn new(kind: PursuerKind, cell: CellPos, speed: f32, phase: f32) -> Self {
        Self {
            view: PursuerView {
                kind,
                x: cell.x as f32,
                y: cell.y as f32,
                dir: Direction::None,
                speed,
                phase,
            },
            cell,
            motion: PursuerMotion::Arrived,
        }
    }

    /// Advances along `view.dir`; returns true on arrival at the next cell.
    fn advance(&mut self) -> bool {
        let PursuerMotion::Traveling { progress } = self.motion else {
            return false;
        };
        let progress = progress + self.view.speed;
        if 1.0 - progress < self.view.speed * SNAP_THRESHOLD_RATIO {
            self.cell = self.cell.step(self.view.dir);
            self.motion = PursuerMotion::Arrived;
            self.sync_view(0.0);
            return true;
        }
        self.motion = PursuerMotion::Traveling { progress };
        self.sync_view(progress);
        false
    }

    fn sync_view(&mut self, progress: f32) {
        let (dx, dy) = self.view.dir.delta();
        self.view.x = self.cell.x as f32 + dx as f32 * progress;
        self.view.y = self.cell.y as f32 + dy as f32 * progress;
    }
}

impl<R: RandomSource> GameSession<R> {
    pub(super) fn update_pursuers(&mut self) {
        let target = self.player.position.cell();
        for idx in 0..self.pursuers.len() {
            if self.pursuers[idx].motion == PursuerMotion::Arrived {
                self.replan_pursuer(idx, target);
            }
            let pursuer = &mut self.pursuers[idx];
            pursuer.advance();
            pursuer.view.phase = (pursuer.view.phase + PHASE_STEP).rem_euclid(TAU);
        }
    }

    fn replan_pursuer(&mut self, idx: usize, target: CellPos) {
        let pursuer = &self.pursuers[idx];
        let from = pursuer.cell;
        let step = choose_direction(&self.grid, from, target, pursuer.view.dir, &mut self.rng);

        if step.outcome == PlanOutcome::Exhausted {
            self.pathfinding_anomalies += 1;
            self.events.push(RuntimeEvent::PathfindingExhausted {
                kind: pursuer.view.kind,
                x: from.x,
                y: from.y,
            });
            warn!(kind = ?pursuer.view.kind, x = from.x, y = from.y, "pursuer lost its target");
        }

        let pursuer = &mut self.pursuers[idx];
        pursuer.view.dir = step.direction;
        if step.direction != Direction::None && self.grid.is_open(from.step(step.direction)) {
            pursuer.motion = PursuerMotion::Traveling { progress: 0.0 };
        }
    }

    pub(super) fn spawn_pursuer(&mut self, kind: PursuerKind, cell: CellPos) -> PursuerInternal {
        let phase = self.rng.next_f32() * TAU;
        PursuerInternal::new(kind, cell, self.pursuer_speed(), phase)
    }
}
