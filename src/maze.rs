use tracing::debug;

use crate::constants::{BRAID_CHANCE, KEY_CHANCE, MAX_KEYS, MIN_GRID_SIDE, WHEAT_CHANCE};
use crate::error::MazeError;
use crate::grid::Grid;
use crate::rng::RandomSource;
use crate::types::CellPos;

/// Carve offsets: up, right, down, left.
const CARVE_STEPS: [(i32, i32); 4] = [(0, -2), (2, 0), (0, 2), (-2, 0)];

#[derive(Clone, Debug)]
pub struct GeneratedMaze {
    pub grid: Grid,
    pub wheat_count: usize,
    pub keys: Vec<CellPos>,
}

pub fn check_dimensions(rows: usize, cols: usize) -> Result<(), MazeError> {
    if rows < MIN_GRID_SIDE || cols < MIN_GRID_SIDE {
        return Err(MazeError::TooSmall { rows, cols });
    }
    Ok(())
}

pub fn generate_maze<R: RandomSource + ?Sized>(
    rows: usize,
    cols: usize,
    rng: &mut R,
) -> Result<GeneratedMaze, MazeError> {
    check_dimensions(rows, cols)?;
    let mut grid = Grid::walled(rows, cols);

    carve_passages(&mut grid, rng);
    braid_walls(&mut grid, rng);
    open_center_strip(&mut grid);
    seal_border(&mut grid);
    let (wheat_count, keys) = seed_collectibles(&mut grid, rng);

    debug!(rows, cols, wheat_count, keys = keys.len(), "maze generated");
    Ok(GeneratedMaze {
        grid,
        wheat_count,
        keys,
    })
}

fn carve_passages<R: RandomSource + ?Sized>(grid: &mut Grid, rng: &mut R) {
    let rows = grid.rows() as i32;
    let cols = grid.cols() as i32;
    let start = CellPos::new(1, 1);
    grid.set_wall(start.x, start.y, false);
    let mut stack = vec![start];

    while let Some(&current) = stack.last() {
        let neighbors: Vec<CellPos> = CARVE_STEPS
            .iter()
            .map(|(dx, dy)| CellPos::new(current.x + dx, current.y + dy))
            .filter(|next| {
                next.x > 0
                    && next.x < cols - 1
                    && next.y > 0
                    && next.y < rows - 1
                    && grid.is_wall(next.x, next.y)
            })
            .collect();

        if neighbors.is_empty() {
            stack.pop();
            continue;
        }

        let next = neighbors[rng.pick_index(neighbors.len())];
        let between = CellPos::new((current.x + next.x) / 2, (current.y + next.y) / 2);
        grid.set_wall(between.x, between.y, false);
        grid.set_wall(next.x, next.y, false);
        stack.push(next);
    }
}

/// Opens some walls that sit between two open cells so the maze has loops.
fn braid_walls<R: RandomSource + ?Sized>(grid: &mut Grid, rng: &mut R) {
    let rows = grid.rows() as i32;
    let cols = grid.cols() as i32;
    for y in 2..rows - 2 {
        for x in 2..cols - 2 {
            if !grid.is_wall(x, y) {
                continue;
            }
            let vertical = !grid.is_wall(x, y - 1) && !grid.is_wall(x, y + 1);
            let horizontal = !grid.is_wall(x - 1, y) && !grid.is_wall(x + 1, y);
            if (vertical || horizontal) && rng.bool(BRAID_CHANCE) {
                grid.set_wall(x, y, false);
            }
        }
    }
}

fn open_center_strip(grid: &mut Grid) {
    let cx = (grid.cols() / 2) as i32;
    let cy = (grid.rows() / 2) as i32;
    for x in (cx - 1)..=(cx + 1) {
        if grid.is_wall(x, cy) {
            grid.set_wall(x, cy, false);
        }
    }
}

fn seal_border(grid: &mut Grid) {
    let rows = grid.rows() as i32;
    let cols = grid.cols() as i32;
    for y in 0..rows {
        for x in 0..cols {
            if grid.is_border(x, y) {
                grid.set_wall(x, y, true);
            }
        }
    }
}

fn seed_collectibles<R: RandomSource + ?Sized>(
    grid: &mut Grid,
    rng: &mut R,
) -> (usize, Vec<CellPos>) {
    let rows = grid.rows() as i32;
    let cols = grid.cols() as i32;
    let mut wheat_count = 0;
    let mut keys = Vec::new();

    for y in 1..rows - 1 {
        for x in 1..cols - 1 {
            let Some(cell) = grid.cell_at_mut(x, y) else {
                continue;
            };
            if cell.is_wall {
                continue;
            }
            if rng.bool(WHEAT_CHANCE) {
                cell.has_wheat = true;
                wheat_count += 1;
            } else if keys.len() < MAX_KEYS && rng.bool(KEY_CHANCE) {
                cell.has_key = true;
                keys.push(CellPos::new(x, y));
            }
        }
    }

    (wheat_count, keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{GRID_COLS, GRID_ROWS};
    use crate::rng::{Rng, ScriptedRandom};

    fn assert_border_is_wall(grid: &Grid) {
        for y in 0..grid.rows() as i32 {
            for x in 0..grid.cols() as i32 {
                if grid.is_border(x, y) {
                    assert!(grid.is_wall(x, y), "border cell ({x},{y}) is open");
                }
            }
        }
    }

    #[test]
    fn rejects_grids_without_interior_start() {
        let mut rng = Rng::new(1);
        assert_eq!(
            generate_maze(2, 25, &mut rng).map(|_| ()),
            Err(MazeError::TooSmall { rows: 2, cols: 25 })
        );
        assert!(generate_maze(19, 1, &mut rng).is_err());
        assert!(generate_maze(3, 3, &mut rng).is_ok());
    }

    #[test]
    fn standard_grid_is_fully_connected_from_start() {
        for seed in 0..200u32 {
            let mut rng = Rng::new(seed);
            let maze = generate_maze(GRID_ROWS, GRID_COLS, &mut rng).expect("valid size");
            let open = maze.grid.open_cells();
            let reachable = maze.grid.reachable_from(CellPos::new(1, 1));
            assert_eq!(
                reachable.len(),
                open.len(),
                "flood fill mismatch: seed={seed}"
            );
            assert_border_is_wall(&maze.grid);
        }
    }

    #[test]
    fn odd_and_even_sizes_stay_connected() {
        for (rows, cols) in [(3, 3), (4, 4), (5, 8), (12, 9), (20, 30), (31, 17)] {
            for seed in 0..40u32 {
                let mut rng = Rng::new(seed.wrapping_mul(7919));
                let maze = generate_maze(rows, cols, &mut rng).expect("valid size");
                let reachable = maze.grid.reachable_from(CellPos::new(1, 1));
                assert_eq!(
                    reachable.len(),
                    maze.grid.open_cells().len(),
                    "disconnected: {rows}x{cols} seed={seed}"
                );
                assert_border_is_wall(&maze.grid);
            }
        }
    }

    #[test]
    fn wheat_count_matches_cells() {
        for seed in 0..100u32 {
            let mut rng = Rng::new(seed);
            let maze = generate_maze(GRID_ROWS, GRID_COLS, &mut rng).expect("valid size");
            assert_eq!(maze.wheat_count, maze.grid.count_wheat());
            assert!(maze.keys.len() <= MAX_KEYS);
            for key in &maze.keys {
                let cell = maze.grid.cell_at(key.x, key.y).expect("key in bounds");
                assert!(cell.has_key && !cell.has_wheat && !cell.is_wall);
            }
        }
    }

    #[test]
    fn collectibles_never_sit_on_walls() {
        let mut rng = Rng::new(4242);
        let maze = generate_maze(GRID_ROWS, GRID_COLS, &mut rng).expect("valid size");
        for y in 0..GRID_ROWS as i32 {
            for x in 0..GRID_COLS as i32 {
                let cell = maze.grid.cell_at(x, y).expect("in bounds");
                if cell.is_wall {
                    assert!(!cell.has_wheat && !cell.has_key);
                }
                assert!(!(cell.has_wheat && cell.has_key));
            }
        }
    }

    #[test]
    fn low_rolls_open_every_interior_cell_and_fill_with_wheat() {
        let mut rng = ScriptedRandom::constant(0.0);
        let maze = generate_maze(5, 5, &mut rng).expect("valid size");
        assert_eq!(
            maze.grid.to_tiles(),
            vec!["#####", "#...#", "#...#", "#...#", "#####"]
        );
        assert_eq!(maze.wheat_count, 9);
        assert!(maze.keys.is_empty());
    }

    #[test]
    fn high_rolls_carve_last_neighbor_and_skip_braiding() {
        let mut rng = ScriptedRandom::constant(0.99);
        let maze = generate_maze(5, 5, &mut rng).expect("valid size");
        assert_eq!(
            maze.grid.to_tiles(),
            vec!["#####", "# # #", "#   #", "#   #", "#####"]
        );
        assert_eq!(maze.wheat_count, 0);
    }

    #[test]
    fn keys_are_capped_at_five() {
        // 0.7 misses wheat, 0.005 hits the key roll.
        let mut rng = ScriptedRandom::new(vec![0.7, 0.005]);
        let maze = generate_maze(GRID_ROWS, GRID_COLS, &mut rng).expect("valid size");
        assert_eq!(maze.keys.len(), MAX_KEYS);
        assert_eq!(maze.grid.to_tiles().concat().matches('k').count(), MAX_KEYS);
    }

    #[test]
    fn center_strip_is_open() {
        for seed in 0..50u32 {
            let mut rng = Rng::new(seed);
            let maze = generate_maze(GRID_ROWS, GRID_COLS, &mut rng).expect("valid size");
            let cx = (GRID_COLS / 2) as i32;
            let cy = (GRID_ROWS / 2) as i32;
            for x in (cx - 1)..=(cx + 1) {
                assert!(!maze.grid.is_wall(x, cy));
            }
        }
    }
}
