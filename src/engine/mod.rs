use tracing::info;

use crate::constants::PURSUER_BASE_SPEED;
use crate::error::SessionError;
use crate::grid::Grid;
use crate::maze::generate_maze;
use crate::motion::MotionResolver;
use crate::rng::{EntropyRandom, RandomSource};
use crate::types::{
    CellPos, Direction, Intents, Outcome, PlayerView, Position, PursuerView, RuntimeEvent,
    SessionConfig, SessionPhase, SessionSummary, Snapshot,
};

mod contact_system;
mod pursuer_system;
mod spawn_system;
mod utils;

#[derive(Clone, Copy, Debug, PartialEq)]
enum PursuerMotion {
    /// Sitting on `cell`'s center, ready to replan.
    Arrived,
    /// Between `cell` and the next cell along `view.dir`.
    Traveling { progress: f32 },
}

#[derive(Clone, Debug)]
struct PursuerInternal {
    view: PursuerView,
    cell: CellPos,
    motion: PursuerMotion,
}

#[derive(Clone, Debug)]
struct PlayerInternal {
    position: Position,
    facing: Direction,
}

impl Default for PlayerInternal {
    fn default() -> Self {
        Self {
            position: CellPos::new(1, 1).center(),
            facing: Direction::Right,
        }
    }
}

/// One play session: maze, player, pursuers and the rules tying them together.
/// Hosts own it and call `step` once per tick.
#[derive(Clone, Debug)]
pub struct GameSession<R: RandomSource = EntropyRandom> {
    config: SessionConfig,
    rng: R,
    motion: MotionResolver,
    grid: Grid,
    phase: SessionPhase,

    player: PlayerInternal,
    pursuers: Vec<PursuerInternal>,
    pursuer_speed_multiplier: f32,

    score: i32,
    lives: i32,
    wheat_total: i32,
    wheat_remaining: i32,
    keys_collected: u32,
    best_score: i32,

    events: Vec<RuntimeEvent>,
    tick_counter: u64,
    elapsed_ms: u64,
    pathfinding_anomalies: u64,
}

impl<R: RandomSource> GameSession<R> {
    pub fn new(config: SessionConfig, rng: R) -> Result<Self, SessionError> {
        config.validate()?;
        Ok(Self {
            lives: config.starting_lives,
            config,
            rng,
            motion: MotionResolver::default(),
            grid: Grid::default(),
            phase: SessionPhase::NotStarted,
            player: PlayerInternal::default(),
            pursuers: Vec::new(),
            pursuer_speed_multiplier: 1.0,
            score: 0,
            wheat_total: 0,
            wheat_remaining: 0,
            keys_collected: 0,
            best_score: 0,
            events: Vec::new(),
            tick_counter: 0,
            elapsed_ms: 0,
            pathfinding_anomalies: 0,
        })
    }

    pub fn start(&mut self) -> Result<(), SessionError> {
        self.restart()
    }

    /// Fresh maze and entities; the best score carries over.
    pub fn restart(&mut self) -> Result<(), SessionError> {
        let maze = generate_maze(self.config.rows, self.config.cols, &mut self.rng)?;
        self.grid = maze.grid;
        self.wheat_total = maze.wheat_count as i32;
        self.wheat_remaining = self.wheat_total;
        self.score = 0;
        self.lives = self.config.starting_lives;
        self.keys_collected = 0;
        self.pursuer_speed_multiplier = 1.0;
        self.tick_counter = 0;
        self.elapsed_ms = 0;
        self.pathfinding_anomalies = 0;
        self.events.clear();

        let spawn = self.find_empty_cell();
        self.player = PlayerInternal {
            position: spawn.center(),
            facing: Direction::Right,
        };
        self.pursuers = self.create_pursuers();
        self.phase = SessionPhase::Running;

        self.events.push(RuntimeEvent::SessionStarted {
            wheat_total: self.wheat_total,
            keys: maze.keys.len(),
        });
        info!(
            rows = self.config.rows,
            cols = self.config.cols,
            wheat = self.wheat_total,
            keys = maze.keys.len(),
            "session started"
        );
        Ok(())
    }

    /// Advances one tick. Movement always uses the fixed per-tick speeds;
    /// `delta_ms` only feeds the elapsed clock.
    pub fn step(&mut self, delta_ms: u64, intents: Intents) {
        if !self.is_running() {
            return;
        }
        self.tick_counter += 1;
        self.elapsed_ms = self.elapsed_ms.saturating_add(delta_ms);

        self.move_player(intents);
        if self.collect_pickups() {
            return;
        }
        self.update_pursuers();
        self.resolve_collisions();
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        let (won, ended) = match self.phase {
            SessionPhase::Ended(outcome) => (outcome == Outcome::Won, true),
            _ => (false, false),
        };
        Snapshot {
            tick: self.tick_counter,
            elapsed_ms: self.elapsed_ms,
            phase: self.phase,
            running: self.is_running(),
            ended,
            won,
            score: self.score,
            lives: self.lives,
            wheat_remaining: self.wheat_remaining,
            keys_collected: self.keys_collected,
            best_score: self.best_score,
            tiles: self.grid.to_tiles(),
            player: PlayerView {
                x: self.player.position.x,
                y: self.player.position.y,
                facing: self.player.facing,
            },
            pursuers: self.pursuers.iter().map(|p| p.view.clone()).collect(),
            events: if include_events {
                std::mem::take(&mut self.events)
            } else {
                Vec::new()
            },
        }
    }

    pub fn build_summary(&self) -> SessionSummary {
        SessionSummary {
            outcome: match self.phase {
                SessionPhase::Ended(outcome) => Some(outcome),
                _ => None,
            },
            score: self.score,
            duration_ms: self.elapsed_ms,
            ticks: self.tick_counter,
            wheat_collected: self.wheat_total - self.wheat_remaining,
            wheat_remaining: self.wheat_remaining,
            keys_collected: self.keys_collected,
            lives_left: self.lives,
            pathfinding_anomalies: self.pathfinding_anomalies,
        }
    }

    pub fn set_best_score(&mut self, best_score: i32) {
        self.best_score = best_score;
    }

    pub fn is_running(&self) -> bool {
        self.phase == SessionPhase::Running
    }

    pub fn is_ended(&self) -> bool {
        matches!(self.phase, SessionPhase::Ended(_))
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn lives(&self) -> i32 {
        self.lives
    }

    pub fn wheat_remaining(&self) -> i32 {
        self.wheat_remaining
    }

    pub fn keys_collected(&self) -> u32 {
        self.keys_collected
    }

    pub fn best_score(&self) -> i32 {
        self.best_score
    }

    pub fn tick(&self) -> u64 {
        self.tick_counter
    }

    pub fn player_position(&self) -> Position {
        self.player.position
    }

    pub fn pursuers(&self) -> impl Iterator<Item = &PursuerView> {
        self.pursuers.iter().map(|p| &p.view)
    }

    pub fn pursuer_speed_multiplier(&self) -> f32 {
        self.pursuer_speed_multiplier
    }

    fn move_player(&mut self, intents: Intents) {
        let dir = intents.primary();
        if dir == Direction::None {
            return;
        }
        self.player.facing = dir;
        self.player.position = self.motion.resolve(self.player.position, &self.grid, dir);
    }

    fn pursuer_speed(&self) -> f32 {
        PURSUER_BASE_SPEED * self.pursuer_speed_multiplier
    }
}
