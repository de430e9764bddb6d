use std::collections::{HashSet, VecDeque};

use tracing::{debug, warn};

use crate::constants::{BFS_ITERATION_CAP, RANDOM_TURN_CHANCE};
use crate::grid::Grid;
use crate::rng::RandomSource;
use crate::types::{CellPos, Direction};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlanOutcome {
    /// Shortest path found; `direction` is its first step.
    Reached,
    /// Already standing on the target.
    Idle,
    /// No forward move exists; turning back (or staying when boxed in).
    DeadEnd,
    /// Target lies only behind the pursuer; it pauses so the next plan may
    /// turn around.
    Behind,
    /// Every cell reachable without reversing was visited and the target was
    /// not among them. Generated mazes are connected, so this signals a
    /// broken grid.
    Exhausted,
    /// The search hit its node budget before finishing. Not evidence of a
    /// disconnected grid; the pursuer heads along the best partial path.
    Truncated,
    /// A random legal turn replaced the planned direction.
    RandomTurn,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlannedStep {
    pub direction: Direction,
    pub outcome: PlanOutcome,
}

impl PlannedStep {
    fn new(direction: Direction, outcome: PlanOutcome) -> Self {
        Self { direction, outcome }
    }
}

/// Target cells inside a wall fall back to their first open neighbor.
pub fn resolve_target(grid: &Grid, target: CellPos) -> CellPos {
    if grid.is_open(target) {
        return target;
    }
    Direction::CARDINALS
        .into_iter()
        .map(|dir| target.step(dir))
        .find(|cell| grid.is_open(*cell))
        .unwrap_or(target)
}

/// Breadth-first search from `from` toward `target`; returns the first step of
/// a shortest path that does not start by reversing `current`.
pub fn plan_step(grid: &Grid, from: CellPos, target: CellPos, current: Direction) -> PlannedStep {
    let target = resolve_target(grid, target);
    if from == target {
        return PlannedStep::new(Direction::None, PlanOutcome::Idle);
    }

    let reverse = current.reverse();
    let forward: Vec<Direction> = Direction::CARDINALS
        .into_iter()
        .filter(|dir| current == Direction::None || *dir != reverse)
        .filter(|dir| grid.is_open(from.step(*dir)))
        .collect();

    if forward.is_empty() {
        let fallback = if reverse != Direction::None && grid.is_open(from.step(reverse)) {
            reverse
        } else {
            Direction::None
        };
        return PlannedStep::new(fallback, PlanOutcome::DeadEnd);
    }

    let cap = search_cap(grid);
    let fallback = match search(grid, from, target, &forward, cap) {
        Search::Found(dir) => return PlannedStep::new(dir, PlanOutcome::Reached),
        Search::Capped(fallback) => {
            debug!(from_x = from.x, from_y = from.y, cap, "pursuit search truncated");
            return PlannedStep::new(fallback, PlanOutcome::Truncated);
        }
        Search::Exhausted(fallback) => fallback,
    };

    // The target may only be reachable by turning back. Hold still this time;
    // the next plan starts without a travel direction and may reverse.
    if current != Direction::None && grid.is_open(from.step(reverse)) {
        if let Search::Found(_) = search(grid, from, target, &[reverse], cap) {
            return PlannedStep::new(Direction::None, PlanOutcome::Behind);
        }
    }

    warn!(
        from_x = from.x,
        from_y = from.y,
        target_x = target.x,
        target_y = target.y,
        "pursuit search exhausted without reaching target"
    );
    PlannedStep::new(fallback, PlanOutcome::Exhausted)
}

/// Node budget for one search. Never below the fixed cap, and never below
/// the cell count, so a connected grid of any size is searched completely.
fn search_cap(grid: &Grid) -> usize {
    BFS_ITERATION_CAP.max(grid.rows() * grid.cols())
}

#[derive(Debug, PartialEq)]
enum Search {
    Found(Direction),
    /// Queue drained. Carries the first frontier move.
    Exhausted(Direction),
    /// Budget spent with nodes still queued. Carries the first queued move.
    Capped(Direction),
}

fn search(
    grid: &Grid,
    from: CellPos,
    target: CellPos,
    first_moves: &[Direction],
    cap: usize,
) -> Search {
    let mut queue: VecDeque<(CellPos, Direction)> = VecDeque::new();
    let mut visited: HashSet<CellPos> = HashSet::new();
    visited.insert(from);
    for dir in first_moves {
        let next = from.step(*dir);
        if grid.is_open(next) && visited.insert(next) {
            queue.push_back((next, *dir));
        }
    }
    let first_enqueued = queue.front().map(|(_, dir)| *dir);

    let mut iterations = 0;
    while let Some((cell, first_move)) = queue.pop_front() {
        if iterations == cap {
            return Search::Capped(first_move);
        }
        iterations += 1;
        if cell == target {
            return Search::Found(first_move);
        }
        for dir in Direction::CARDINALS {
            let next = cell.step(dir);
            if grid.is_open(next) && visited.insert(next) {
                queue.push_back((next, first_move));
            }
        }
    }

    Search::Exhausted(first_enqueued.unwrap_or(Direction::None))
}

/// `plan_step` plus the occasional random legal turn that keeps pursuit from
/// being perfectly predictable.
pub fn choose_direction<R: RandomSource + ?Sized>(
    grid: &Grid,
    from: CellPos,
    target: CellPos,
    current: Direction,
    rng: &mut R,
) -> PlannedStep {
    let planned = plan_step(grid, from, target, current);
    if rng.bool(RANDOM_TURN_CHANCE) {
        let options = grid.open_directions(from);
        if !options.is_empty() {
            let dir = options[rng.pick_index(options.len())];
            return PlannedStep::new(dir, PlanOutcome::RandomTurn);
        }
    }
    planned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{GRID_COLS, GRID_ROWS};
    use crate::maze::generate_maze;
    use crate::rng::{Rng, ScriptedRandom};

    fn open_room() -> Grid {
        Grid::from_tiles(&[
            "#######", //
            "#     #", //
            "#     #", //
            "#     #", //
            "#######",
        ])
    }

    #[test]
    fn target_on_same_cell_is_idle() {
        let grid = open_room();
        let step = plan_step(&grid, CellPos::new(2, 2), CellPos::new(2, 2), Direction::Left);
        assert_eq!(step.direction, Direction::None);
        assert_eq!(step.outcome, PlanOutcome::Idle);
    }

    #[test]
    fn adjacent_target_returns_that_step() {
        let grid = open_room();
        let from = CellPos::new(3, 2);
        for dir in Direction::CARDINALS {
            let step = plan_step(&grid, from, from.step(dir), Direction::None);
            assert_eq!(step.direction, dir);
            assert_eq!(step.outcome, PlanOutcome::Reached);
        }
    }

    #[test]
    fn ties_break_in_up_down_left_right_order() {
        let grid = open_room();
        // (1,1) is two steps away either up-then-left or left-then-up.
        let step = plan_step(&grid, CellPos::new(2, 2), CellPos::new(1, 1), Direction::None);
        assert_eq!(step.direction, Direction::Up);
    }

    #[test]
    fn reverse_is_excluded_when_other_moves_exist() {
        let grid = open_room();
        // Target is directly behind a pursuer heading right.
        let step = plan_step(&grid, CellPos::new(3, 2), CellPos::new(1, 2), Direction::Right);
        assert_ne!(step.direction, Direction::Left);
        assert_eq!(step.outcome, PlanOutcome::Reached);
    }

    #[test]
    fn dead_end_turns_back() {
        let grid = Grid::from_tiles(&["#####", "#   #", "#####"]);
        let step = plan_step(&grid, CellPos::new(3, 1), CellPos::new(1, 1), Direction::Right);
        assert_eq!(step.direction, Direction::Left);
        assert_eq!(step.outcome, PlanOutcome::DeadEnd);
    }

    #[test]
    fn boxed_in_pursuer_stays_put() {
        let grid = Grid::from_tiles(&["###", "# #", "###"]);
        let step = plan_step(&grid, CellPos::new(1, 1), CellPos::new(5, 5), Direction::None);
        assert_eq!(step.direction, Direction::None);
        assert_eq!(step.outcome, PlanOutcome::DeadEnd);
    }

    #[test]
    fn wall_target_uses_first_open_neighbor() {
        let grid = Grid::from_tiles(&[
            "#####", //
            "#   #", //
            "# # #", //
            "#   #", //
            "#####",
        ]);
        assert_eq!(resolve_target(&grid, CellPos::new(2, 2)), CellPos::new(2, 1));
        let step = plan_step(&grid, CellPos::new(1, 3), CellPos::new(2, 2), Direction::None);
        assert_eq!(step.direction, Direction::Up);
    }

    #[test]
    fn unreachable_target_reports_exhaustion() {
        let grid = Grid::from_tiles(&["#######", "#  #  #", "#######"]);
        let step = plan_step(&grid, CellPos::new(1, 1), CellPos::new(5, 1), Direction::None);
        assert_eq!(step.outcome, PlanOutcome::Exhausted);
        assert_eq!(step.direction, Direction::Right);
    }

    #[test]
    fn target_behind_pauses_instead_of_reversing() {
        let grid = Grid::from_tiles(&["#######", "#     #", "### ###", "#######"]);
        // Heading right at (2,1) with the target at (1,1): forward search can
        // never get back past the start cell.
        let step = plan_step(&grid, CellPos::new(2, 1), CellPos::new(1, 1), Direction::Right);
        assert_eq!(step.outcome, PlanOutcome::Behind);
        assert_eq!(step.direction, Direction::None);

        let replanned = plan_step(&grid, CellPos::new(2, 1), CellPos::new(1, 1), Direction::None);
        assert_eq!(replanned.direction, Direction::Left);
        assert_eq!(replanned.outcome, PlanOutcome::Reached);
    }

    #[test]
    fn generated_mazes_never_exhaust_search() {
        for seed in 0..30u32 {
            let mut rng = Rng::new(seed);
            let maze = generate_maze(GRID_ROWS, GRID_COLS, &mut rng).expect("valid size");
            let open = maze.grid.open_cells();
            let from = open[rng.pick_index(open.len())];
            for target in open.iter().step_by(7) {
                for current in [Direction::None, Direction::Up, Direction::Right] {
                    let step = plan_step(&maze.grid, from, *target, current);
                    assert_ne!(step.outcome, PlanOutcome::Exhausted, "seed={seed}");
                }
            }
        }
    }

    #[test]
    fn search_budget_scales_with_grid() {
        assert_eq!(search_cap(&open_room()), BFS_ITERATION_CAP);
        assert_eq!(search_cap(&Grid::walled(61, 61)), 61 * 61);
    }

    #[test]
    fn spent_budget_is_truncation_not_exhaustion() {
        let grid = open_room();
        let (from, target) = (CellPos::new(1, 1), CellPos::new(5, 3));
        let moves = [Direction::Down, Direction::Right];
        assert_eq!(search(&grid, from, target, &moves, 2), Search::Capped(Direction::Down));
        assert!(matches!(
            search(&grid, from, target, &moves, BFS_ITERATION_CAP),
            Search::Found(_)
        ));
    }

    #[test]
    fn large_connected_mazes_are_searched_completely() {
        for seed in 0..3u32 {
            let mut rng = Rng::new(seed);
            let maze = generate_maze(61, 61, &mut rng).expect("valid size");
            let open = maze.grid.open_cells();
            assert!(open.len() > BFS_ITERATION_CAP, "seed={seed}");
            let from = open[0];
            for target in open.iter().skip(1).step_by(50) {
                for current in [Direction::None, Direction::Down] {
                    let step = plan_step(&maze.grid, from, *target, current);
                    assert!(
                        matches!(step.outcome, PlanOutcome::Reached | PlanOutcome::Behind),
                        "seed={seed} target={target:?} outcome={:?}",
                        step.outcome
                    );
                }
            }
        }
    }

    #[test]
    fn never_reverses_unless_only_option() {
        for seed in 0..30u32 {
            let mut rng = Rng::new(seed);
            let maze = generate_maze(GRID_ROWS, GRID_COLS, &mut rng).expect("valid size");
            let open = maze.grid.open_cells();
            for from in open.iter().step_by(3) {
                let target = open[rng.pick_index(open.len())];
                for current in Direction::CARDINALS {
                    let step = plan_step(&maze.grid, *from, target, current);
                    if step.direction != current.reverse() {
                        continue;
                    }
                    let forward_moves = maze
                        .grid
                        .open_directions(*from)
                        .into_iter()
                        .filter(|dir| *dir != current.reverse())
                        .count();
                    assert_eq!(forward_moves, 0, "reversed with options at {from:?}");
                }
            }
        }
    }

    #[test]
    fn random_turn_picks_open_direction() {
        let grid = Grid::from_tiles(&["#####", "#   #", "#####"]);
        // First draw hits the 10% roll, second picks the last open direction.
        let mut rng = ScriptedRandom::new(vec![0.05, 0.99]);
        let (from, target) = (CellPos::new(2, 1), CellPos::new(3, 1));
        let step = choose_direction(&grid, from, target, Direction::Right, &mut rng);
        assert_eq!(step.outcome, PlanOutcome::RandomTurn);
        assert_eq!(step.direction, Direction::Right);

        let mut rng = ScriptedRandom::new(vec![0.05, 0.0]);
        let step = choose_direction(&grid, from, target, Direction::Right, &mut rng);
        assert_eq!(step.direction, Direction::Left);
    }

    #[test]
    fn planned_direction_kept_when_roll_misses() {
        let grid = open_room();
        let mut rng = ScriptedRandom::constant(0.5);
        let (from, target) = (CellPos::new(3, 2), CellPos::new(5, 2));
        let step = choose_direction(&grid, from, target, Direction::None, &mut rng);
        assert_eq!(step.direction, Direction::Right);
        assert_eq!(step.outcome, PlanOutcome::Reached);
    }
}
