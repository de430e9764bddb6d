use tracing::debug;

use super::*;
use crate::constants::{HIT_DISTANCE, KEY_SCORE, KEY_SPEED_MULTIPLIER, WHEAT_SCORE};

impl<R: RandomSource> GameSession<R> {
    /// Wheat and keys under the player's cell. Returns true when the last
    /// wheat is gone and the session has been won.
    pub(super) fn collect_pickups(&mut self) -> bool {
        let cell = self.player.position.cell();
        let mut took_key = false;
        if let Some(tile) = self.grid.cell_at_mut(cell.x, cell.y) {
            if tile.has_wheat {
                tile.has_wheat = false;
                self.score += WHEAT_SCORE;
                self.wheat_remaining -= 1;
                self.events.push(RuntimeEvent::WheatCollected {
                    x: cell.x,
                    y: cell.y,
                });
            }
            if tile.has_key {
                tile.has_key = false;
                took_key = true;
            }
        }

        if took_key {
            self.score += KEY_SCORE;
            self.keys_collected += 1;
            self.pursuer_speed_multiplier *= KEY_SPEED_MULTIPLIER;
            for pursuer in &mut self.pursuers {
                pursuer.view.speed *= KEY_SPEED_MULTIPLIER;
            }
            self.events.push(RuntimeEvent::KeyCollected {
                x: cell.x,
                y: cell.y,
                speed_multiplier: self.pursuer_speed_multiplier,
            });
            debug!(
                keys = self.keys_collected,
                multiplier = self.pursuer_speed_multiplier,
                "key collected"
            );
        }

        if self.wheat_remaining <= 0 {
            self.finish(Outcome::Won);
            return true;
        }
        false
    }

    /// First pursuer within reach costs one life; later ones are ignored
    /// this tick.
    pub(super) fn resolve_collisions(&mut self) {
        let player = self.player.position;
        let Some(hit_by) = self
            .pursuers
            .iter()
            .find(|p| Position::new(p.view.x, p.view.y).distance_to(player) < HIT_DISTANCE)
            .map(|p| p.view.kind)
        else {
            return;
        };

        self.lives -= 1;
        self.events.push(RuntimeEvent::PlayerHit {
            by: hit_by,
            lives_left: self.lives,
        });
        debug!(by = ?hit_by, lives = self.lives, "player hit");

        if self.lives <= 0 {
            self.finish(Outcome::Lost);
        } else {
            self.respawn_after_hit();
        }
    }

    pub(super) fn finish(&mut self, outcome: Outcome) {
        self.phase = SessionPhase::Ended(outcome);
        let new_best = self.score > self.best_score;
        if new_best {
            self.best_score = self.score;
        }
        self.events.push(RuntimeEvent::SessionEnded {
            outcome,
            score: self.score,
            best_score: self.best_score,
            new_best,
        });
        info!(
            outcome = ?outcome,
            score = self.score,
            best_score = self.best_score,
            ticks = self.tick_counter,
            "session ended"
        );
    }
}
