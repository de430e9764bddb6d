use serde::{Deserialize, Serialize};

use crate::constants::{GRID_COLS, GRID_ROWS, PURSUER_COUNT, STARTING_LIVES};
use crate::error::SessionError;
use crate::maze::check_dimensions;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    None,
}

impl Direction {
    /// Canonical order: breadth-first expansion and held-key priority both use it.
    pub const CARDINALS: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn parse_move(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::None => (0, 0),
        }
    }

    pub fn reverse(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::None => Direction::None,
        }
    }
}

/// Set of movement keys held during one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Intents {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl Intents {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_directions<I>(directions: I) -> Self
    where
        I: IntoIterator<Item = Direction>,
    {
        let mut intents = Self::default();
        for dir in directions {
            intents.insert(dir);
        }
        intents
    }

    pub fn insert(&mut self, dir: Direction) {
        match dir {
            Direction::Up => self.up = true,
            Direction::Down => self.down = true,
            Direction::Left => self.left = true,
            Direction::Right => self.right = true,
            Direction::None => {}
        }
    }

    /// One axis per tick: up, then down, then left, then right.
    pub fn primary(&self) -> Direction {
        if self.up {
            Direction::Up
        } else if self.down {
            Direction::Down
        } else if self.left {
            Direction::Left
        } else if self.right {
            Direction::Right
        } else {
            Direction::None
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellPos {
    pub x: i32,
    pub y: i32,
}

impl CellPos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn manhattan(self, other: CellPos) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    pub fn center(self) -> Position {
        Position {
            x: self.x as f32,
            y: self.y as f32,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Cell under the entity; halves round up.
    pub fn cell(self) -> CellPos {
        CellPos {
            x: round_half_up(self.x),
            y: round_half_up(self.y),
        }
    }

    pub fn distance_to(self, other: Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

pub fn round_half_up(value: f32) -> i32 {
    (value + 0.5).floor() as i32
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PursuerKind {
    Rabbit,
    Crow,
    Boar,
    Fox,
}

impl PursuerKind {
    pub const ALL: [PursuerKind; 4] = [
        PursuerKind::Rabbit,
        PursuerKind::Crow,
        PursuerKind::Boar,
        PursuerKind::Fox,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Won,
    Lost,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "outcome", rename_all = "snake_case")]
pub enum SessionPhase {
    NotStarted,
    Running,
    Ended(Outcome),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub rows: usize,
    pub cols: usize,
    #[serde(rename = "startingLives")]
    pub starting_lives: i32,
    #[serde(rename = "pursuerCount")]
    pub pursuer_count: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rows: GRID_ROWS,
            cols: GRID_COLS,
            starting_lives: STARTING_LIVES,
            pursuer_count: PURSUER_COUNT,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), SessionError> {
        check_dimensions(self.rows, self.cols)?;
        if self.starting_lives < 1 {
            return Err(SessionError::InvalidLives(self.starting_lives));
        }
        if self.pursuer_count == 0 {
            return Err(SessionError::NoPursuers);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub x: f32,
    pub y: f32,
    pub facing: Direction,
}

#[derive(Clone, Debug, Serialize)]
pub struct PursuerView {
    pub kind: PursuerKind,
    pub x: f32,
    pub y: f32,
    pub dir: Direction,
    pub speed: f32,
    pub phase: f32,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    SessionStarted {
        #[serde(rename = "wheatTotal")]
        wheat_total: i32,
        keys: usize,
    },
    WheatCollected {
        x: i32,
        y: i32,
    },
    KeyCollected {
        x: i32,
        y: i32,
        #[serde(rename = "speedMultiplier")]
        speed_multiplier: f32,
    },
    PlayerHit {
        by: PursuerKind,
        #[serde(rename = "livesLeft")]
        lives_left: i32,
    },
    Respawned {
        x: i32,
        y: i32,
    },
    PathfindingExhausted {
        kind: PursuerKind,
        x: i32,
        y: i32,
    },
    SessionEnded {
        outcome: Outcome,
        score: i32,
        #[serde(rename = "bestScore")]
        best_score: i32,
        #[serde(rename = "newBest")]
        new_best: bool,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    #[serde(rename = "elapsedMs")]
    pub elapsed_ms: u64,
    pub phase: SessionPhase,
    pub running: bool,
    pub ended: bool,
    pub won: bool,
    pub score: i32,
    pub lives: i32,
    #[serde(rename = "wheatRemaining")]
    pub wheat_remaining: i32,
    #[serde(rename = "keysCollected")]
    pub keys_collected: u32,
    #[serde(rename = "bestScore")]
    pub best_score: i32,
    pub tiles: Vec<String>,
    pub player: PlayerView,
    pub pursuers: Vec<PursuerView>,
    pub events: Vec<RuntimeEvent>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionSummary {
    pub outcome: Option<Outcome>,
    pub score: i32,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    pub ticks: u64,
    #[serde(rename = "wheatCollected")]
    pub wheat_collected: i32,
    #[serde(rename = "wheatRemaining")]
    pub wheat_remaining: i32,
    #[serde(rename = "keysCollected")]
    pub keys_collected: u32,
    #[serde(rename = "livesLeft")]
    pub lives_left: i32,
    #[serde(rename = "pathfindingAnomalies")]
    pub pathfinding_anomalies: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct BestScoreResponse {
    #[serde(rename = "generatedAtIso")]
    pub generated_at_iso: String,
    #[serde(rename = "bestScore")]
    pub best_score: i32,
    pub sessions: u64,
    pub wins: u64,
    #[serde(rename = "winRate")]
    pub win_rate: f64,
    #[serde(rename = "updatedAtMs")]
    pub updated_at_ms: u64,
}
