use clap::Parser;
use neon_harvest::constants::{GRID_COLS, GRID_ROWS, TICK_MS};
use neon_harvest::engine::GameSession;
use neon_harvest::error::SessionError;
use neon_harvest::grid::Grid;
use neon_harvest::rng::Rng;
use neon_harvest::types::{
    CellPos, Direction, Intents, Outcome, Position, RuntimeEvent, SessionConfig,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;

/// Largest off-center offset on the cross axis before the autopilot
/// straightens up ahead of a turn.
const ALIGN_TOLERANCE: f32 = 0.3;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = 3)]
    games: u32,
    #[arg(long, default_value_t = 20_000)]
    max_ticks: u64,
    #[arg(long, default_value_t = GRID_ROWS)]
    rows: usize,
    #[arg(long, default_value_t = GRID_COLS)]
    cols: usize,
    #[arg(long)]
    match_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct GameResultLine {
    game: u32,
    seed: u32,
    rows: usize,
    cols: usize,
    outcome: Option<Outcome>,
    score: i32,
    #[serde(rename = "durationMs")]
    duration_ms: u64,
    ticks: u64,
    #[serde(rename = "wheatCollected")]
    wheat_collected: i32,
    #[serde(rename = "wheatRemaining")]
    wheat_remaining: i32,
    #[serde(rename = "keysCollected")]
    keys_collected: u32,
    #[serde(rename = "livesLeft")]
    lives_left: i32,
    hits: u32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug)]
struct GameRunResult {
    result: GameResultLine,
    anomaly_records: Vec<AnomalyRecord>,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    #[serde(rename = "gameCount")]
    game_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageDurationMs")]
    average_duration_ms: u64,
    #[serde(rename = "bestScore")]
    best_score: i32,
    #[serde(rename = "outcomeCounts")]
    outcome_counts: BTreeMap<String, usize>,
    games: Vec<GameResultLine>,
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine {
    #[serde(rename = "timestampMs")]
    timestamp_ms: u64,
    level: String,
    event: String,
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    game: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tick: Option<u64>,
    details: Value,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let base_seed = normalize_seed(cli.seed.unwrap_or_else(now_ms));
    let run_started_at_ms = now_ms();
    let match_id = cli
        .match_id
        .clone()
        .unwrap_or_else(|| default_match_id(base_seed, run_started_at_ms));
    let config = SessionConfig {
        rows: cli.rows,
        cols: cli.cols,
        ..SessionConfig::default()
    };

    let mut has_anomaly = false;
    let mut game_results = Vec::new();
    let mut total_anomalies = 0usize;

    for game in 0..cli.games {
        let seed = base_seed.wrapping_add(game);
        emit_log(
            "info",
            "game_started",
            &match_id,
            Some(game),
            Some(seed),
            None,
            json!({ "rows": config.rows, "cols": config.cols }),
        );

        let run = match run_game(game, seed, &config, cli.max_ticks) {
            Ok(run) => run,
            Err(error) => {
                emit_log(
                    "error",
                    "config_rejected",
                    &match_id,
                    Some(game),
                    Some(seed),
                    None,
                    json!({ "error": error.to_string() }),
                );
                std::process::exit(2);
            }
        };

        for anomaly in &run.anomaly_records {
            emit_log(
                "warn",
                "anomaly_detected",
                &match_id,
                Some(game),
                Some(seed),
                Some(anomaly.tick),
                json!({ "message": anomaly.message }),
            );
        }
        if !run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += run.anomaly_records.len();

        emit_log(
            "info",
            "game_finished",
            &match_id,
            Some(game),
            Some(seed),
            Some(run.result.ticks),
            json!({
                "outcome": run.result.outcome,
                "score": run.result.score,
                "anomalyCount": run.anomaly_records.len(),
            }),
        );

        if let Ok(line) = serde_json::to_string(&run.result) {
            println!("{line}");
        }
        game_results.push(run.result);
    }

    let summary = build_run_summary(
        match_id.clone(),
        run_started_at_ms,
        now_ms(),
        game_results,
        total_anomalies,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            emit_log(
                "error",
                "summary_write_failed",
                &match_id,
                None,
                None,
                None,
                json!({
                    "path": path.to_string_lossy(),
                    "error": error.to_string(),
                }),
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    emit_log(
        "info",
        "run_finished",
        &match_id,
        None,
        None,
        None,
        json!({
            "gameCount": summary.game_count,
            "anomalyCount": summary.anomaly_count,
            "averageDurationMs": summary.average_duration_ms,
            "outcomeCounts": summary.outcome_counts,
            "summaryOut": summary_out_written,
        }),
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn run_game(
    game: u32,
    seed: u32,
    config: &SessionConfig,
    max_ticks: u64,
) -> Result<GameRunResult, SessionError> {
    let mut session = GameSession::new(config.clone(), Rng::new(seed))?;
    session.start()?;

    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();
    let mut hits = 0u32;

    for message in collect_maze_anomalies(session.grid(), session.wheat_remaining()) {
        push_anomaly(&mut anomalies, &mut anomaly_records, &mut anomaly_seen, 0, message);
    }

    while session.is_running() {
        if session.tick() >= max_ticks {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                session.tick(),
                format!("tick cap {max_ticks} reached"),
            );
            break;
        }

        let intent = autopilot_direction(session.grid(), session.player_position());
        session.step(TICK_MS, Intents::from_directions([intent]));
        let snapshot = session.build_snapshot(true);

        let player_cell = session.player_position().cell();
        if !session.grid().is_open(player_cell) {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                format!("player inside wall at ({}, {})", player_cell.x, player_cell.y),
            );
        }
        let wheat_on_grid = session.grid().count_wheat() as i32;
        if wheat_on_grid != snapshot.wheat_remaining {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                format!(
                    "wheat mismatch: counter {} grid {wheat_on_grid}",
                    snapshot.wheat_remaining
                ),
            );
        }

        for event in &snapshot.events {
            match event {
                RuntimeEvent::PlayerHit { .. } => hits += 1,
                RuntimeEvent::PathfindingExhausted { kind, x, y } => push_anomaly(
                    &mut anomalies,
                    &mut anomaly_records,
                    &mut anomaly_seen,
                    snapshot.tick,
                    format!("pathfinding exhausted: {kind:?} at ({x}, {y})"),
                ),
                _ => {}
            }
        }
    }

    let summary = session.build_summary();
    Ok(GameRunResult {
        result: GameResultLine {
            game,
            seed,
            rows: config.rows,
            cols: config.cols,
            outcome: summary.outcome,
            score: summary.score,
            duration_ms: summary.duration_ms,
            ticks: summary.ticks,
            wheat_collected: summary.wheat_collected,
            wheat_remaining: summary.wheat_remaining,
            keys_collected: summary.keys_collected,
            lives_left: summary.lives_left,
            hits,
            anomalies,
        },
        anomaly_records,
    })
}

fn collect_maze_anomalies(grid: &Grid, wheat_remaining: i32) -> Vec<String> {
    let mut anomalies = Vec::new();
    let open = grid.open_cells().len();
    let reachable = grid.reachable_from(CellPos::new(1, 1)).len();
    if reachable != open {
        anomalies.push(format!(
            "maze disconnected: {reachable} of {open} open cells reachable"
        ));
    }
    let wheat = grid.count_wheat() as i32;
    if wheat != wheat_remaining {
        anomalies.push(format!(
            "wheat mismatch at start: counter {wheat_remaining} grid {wheat}"
        ));
    }
    anomalies
}

/// Heads for the nearest wheat, straightening onto the lane first when a turn
/// would otherwise clip a corner.
fn autopilot_direction(grid: &Grid, position: Position) -> Direction {
    let cell = position.cell();
    let dir = nearest_wheat_step(grid, cell);
    let (dx, dy) = dir.delta();
    if dy != 0 {
        let offset = position.x - cell.x as f32;
        if offset.abs() > ALIGN_TOLERANCE {
            return if offset > 0.0 {
                Direction::Left
            } else {
                Direction::Right
            };
        }
    }
    if dx != 0 {
        let offset = position.y - cell.y as f32;
        if offset.abs() > ALIGN_TOLERANCE {
            return if offset > 0.0 {
                Direction::Up
            } else {
                Direction::Down
            };
        }
    }
    dir
}

fn nearest_wheat_step(grid: &Grid, from: CellPos) -> Direction {
    let mut queue: VecDeque<(CellPos, Direction)> = VecDeque::new();
    let mut visited: HashSet<CellPos> = HashSet::new();
    visited.insert(from);
    for dir in Direction::CARDINALS {
        let next = from.step(dir);
        if grid.is_open(next) && visited.insert(next) {
            queue.push_back((next, dir));
        }
    }
    while let Some((cell, first_move)) = queue.pop_front() {
        if grid.cell_at(cell.x, cell.y).map(|c| c.has_wheat).unwrap_or(false) {
            return first_move;
        }
        for dir in Direction::CARDINALS {
            let next = cell.step(dir);
            if grid.is_open(next) && visited.insert(next) {
                queue.push_back((next, first_move));
            }
        }
    }
    Direction::None
}

fn normalize_seed(seed: u64) -> u32 {
    seed as u32
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_match_id(seed: u32, timestamp_ms: u64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn outcome_key(outcome: Option<Outcome>) -> String {
    match outcome {
        Some(Outcome::Won) => "won",
        Some(Outcome::Lost) => "lost",
        None => "unfinished",
    }
    .to_string()
}

fn build_run_summary(
    match_id: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    games: Vec<GameResultLine>,
    anomaly_count: usize,
) -> RunSummary {
    let game_count = games.len();
    let total_duration_ms: u64 = games.iter().map(|game| game.duration_ms).sum();
    let average_duration_ms = if game_count == 0 {
        0
    } else {
        total_duration_ms / game_count as u64
    };
    let mut outcome_counts: BTreeMap<String, usize> = BTreeMap::new();
    for game in &games {
        *outcome_counts.entry(outcome_key(game.outcome)).or_insert(0) += 1;
    }
    RunSummary {
        match_id,
        started_at_ms,
        finished_at_ms,
        game_count,
        anomaly_count,
        average_duration_ms,
        best_score: games.iter().map(|game| game.score).max().unwrap_or(0),
        outcome_counts,
        games,
    }
}

fn emit_log(
    level: &str,
    event: &str,
    match_id: &str,
    game: Option<u32>,
    seed: Option<u32>,
    tick: Option<u64>,
    details: Value,
) {
    let log_line = StructuredLogLine {
        timestamp_ms: now_ms(),
        level: level.to_string(),
        event: event.to_string(),
        match_id: match_id.to_string(),
        game,
        seed,
        tick,
        details,
    };
    if let Ok(text) = serde_json::to_string(&log_line) {
        eprintln!("{text}");
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, summary_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_game_result(outcome: Option<Outcome>, duration_ms: u64, score: i32) -> GameResultLine {
        GameResultLine {
            game: 0,
            seed: 42,
            rows: GRID_ROWS,
            cols: GRID_COLS,
            outcome,
            score,
            duration_ms,
            ticks: duration_ms / TICK_MS,
            wheat_collected: 0,
            wheat_remaining: 0,
            keys_collected: 0,
            lives_left: 0,
            hits: 0,
            anomalies: Vec::new(),
        }
    }

    #[test]
    fn default_match_id_contains_seed_and_timestamp() {
        assert_eq!(default_match_id(42, 123456789), "sim-42-123456789");
    }

    #[test]
    fn build_run_summary_calculates_averages_and_counts() {
        let summary = build_run_summary(
            "sim-42-1".to_string(),
            1,
            2,
            vec![
                make_game_result(Some(Outcome::Lost), 60_000, 300),
                make_game_result(Some(Outcome::Won), 90_000, 1_200),
                make_game_result(Some(Outcome::Lost), 30_000, 80),
            ],
            1,
        );
        assert_eq!(summary.average_duration_ms, 60_000);
        assert_eq!(summary.game_count, 3);
        assert_eq!(summary.best_score, 1_200);
        assert_eq!(summary.outcome_counts.get("lost"), Some(&2));
        assert_eq!(summary.outcome_counts.get("won"), Some(&1));
    }

    #[test]
    fn write_summary_returns_error_when_parent_does_not_exist() {
        let target = std::env::temp_dir()
            .join(format!("neon-harvest-missing-{}", now_ms()))
            .join("summary.json");
        let summary = build_run_summary("sim-1-1".to_string(), 1, 2, Vec::new(), 0);
        assert!(write_summary(&target, &summary).is_err());
    }

    #[test]
    fn push_anomaly_keeps_records_and_deduplicates_summary_messages() {
        let mut anomalies = Vec::new();
        let mut records = Vec::new();
        let mut seen = HashSet::new();
        push_anomaly(&mut anomalies, &mut records, &mut seen, 10, "same anomaly".to_string());
        push_anomaly(&mut anomalies, &mut records, &mut seen, 11, "same anomaly".to_string());

        assert_eq!(anomalies.len(), 1);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].tick, 11);
    }

    #[test]
    fn autopilot_heads_for_nearest_wheat() {
        let grid = Grid::from_tiles(&["#######", "#.   .#", "### ###", "#######"]);
        assert_eq!(nearest_wheat_step(&grid, CellPos::new(2, 1)), Direction::Left);
        assert_eq!(nearest_wheat_step(&grid, CellPos::new(4, 1)), Direction::Right);
        let empty = Grid::from_tiles(&["#####", "#   #", "#####"]);
        assert_eq!(nearest_wheat_step(&empty, CellPos::new(2, 1)), Direction::None);
    }

    #[test]
    fn autopilot_straightens_before_turning() {
        let grid = Grid::from_tiles(&["#####", "#   #", "# # #", "#.  #", "#####"]);
        // Wheat lies below (1,1); an off-center x must be fixed first.
        let step = autopilot_direction(&grid, Position::new(1.4, 1.0));
        assert_eq!(step, Direction::Left);
        let step = autopilot_direction(&grid, Position::new(1.1, 1.0));
        assert_eq!(step, Direction::Down);
    }

    #[test]
    fn maze_checks_flag_disconnected_grid() {
        let grid = Grid::from_tiles(&["#####", "#.#.#", "#####"]);
        let anomalies = collect_maze_anomalies(&grid, 2);
        assert_eq!(anomalies.len(), 1);
        assert!(anomalies[0].starts_with("maze disconnected"));
        assert_eq!(collect_maze_anomalies(&grid, 5).len(), 2);
    }

    #[test]
    fn seeded_games_finish_without_anomalies() {
        let config = SessionConfig {
            rows: 11,
            cols: 15,
            ..SessionConfig::default()
        };
        for seed in 0..4u32 {
            let run = run_game(seed, seed, &config, 20_000).expect("valid config");
            assert!(run.result.anomalies.is_empty(), "seed={seed}: {:?}", run.result.anomalies);
            assert!(run.result.outcome.is_some());
        }
    }

    #[test]
    fn invalid_dimensions_are_rejected() {
        let config = SessionConfig {
            rows: 1,
            ..SessionConfig::default()
        };
        assert!(run_game(0, 1, &config, 10).is_err());
    }
}
