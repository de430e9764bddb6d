pub mod best_score;
pub mod constants;
pub mod driver;
pub mod engine;
pub mod error;
pub mod grid;
pub mod maze;
pub mod motion;
pub mod pursuit;
pub mod rng;
pub mod server_protocol;
pub mod types;
