pub const TICK_RATE: u32 = 60;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

pub const GRID_ROWS: usize = 19;
pub const GRID_COLS: usize = 25;
pub const MIN_GRID_SIDE: usize = 3;

pub const BRAID_CHANCE: f32 = 0.2;
pub const WHEAT_CHANCE: f32 = 0.5;
pub const KEY_CHANCE: f32 = 0.01;
pub const MAX_KEYS: usize = 5;

pub const PLAYER_SPEED: f32 = 0.15;
pub const HITBOX_MARGIN: f32 = 0.4;
pub const CENTERING_THRESHOLD: f32 = 0.3;
pub const CENTERING_FACTOR: f32 = 0.2;

pub const PURSUER_BASE_SPEED: f32 = 0.06;
pub const SNAP_THRESHOLD_RATIO: f32 = 0.6;
pub const RANDOM_TURN_CHANCE: f32 = 0.1;
pub const BFS_ITERATION_CAP: usize = 1000;
pub const PHASE_STEP: f32 = 0.1;

pub const HIT_DISTANCE: f32 = 0.6;
pub const STARTING_LIVES: i32 = 3;
pub const PURSUER_COUNT: usize = 4;
pub const WHEAT_SCORE: i32 = 10;
pub const KEY_SCORE: i32 = 50;
pub const KEY_SPEED_MULTIPLIER: f32 = 1.05;

pub const EMPTY_CELL_ATTEMPTS: usize = 1000;
pub const PURSUER_SPAWN_ATTEMPTS: usize = 24;
pub const SAFE_SPAWN_DISTANCE: i32 = 3;
