use std::collections::{HashSet, VecDeque};

use crate::types::{CellPos, Direction};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cell {
    pub is_wall: bool,
    pub has_wheat: bool,
    pub has_key: bool,
}

impl Cell {
    pub const WALL: Cell = Cell {
        is_wall: true,
        has_wheat: false,
        has_key: false,
    };
}

/// Row-major cell array. Sessions start from `Grid::default()`, a 0x0 grid on
/// which every coordinate reads as wall.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn walled(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![Cell::WALL; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.cols || y >= self.rows {
            return None;
        }
        Some(y * self.cols + x)
    }

    pub fn cell_at(&self, x: i32, y: i32) -> Option<&Cell> {
        self.index(x, y).map(|idx| &self.cells[idx])
    }

    pub fn cell_at_mut(&mut self, x: i32, y: i32) -> Option<&mut Cell> {
        self.index(x, y).map(move |idx| &mut self.cells[idx])
    }

    pub fn is_wall(&self, x: i32, y: i32) -> bool {
        self.cell_at(x, y).map(|cell| cell.is_wall).unwrap_or(true)
    }

    pub fn is_open(&self, pos: CellPos) -> bool {
        !self.is_wall(pos.x, pos.y)
    }

    pub fn is_border(&self, x: i32, y: i32) -> bool {
        x == 0 || y == 0 || x == self.cols as i32 - 1 || y == self.rows as i32 - 1
    }

    pub(crate) fn set_wall(&mut self, x: i32, y: i32, is_wall: bool) {
        if let Some(cell) = self.cell_at_mut(x, y) {
            cell.is_wall = is_wall;
            if is_wall {
                cell.has_wheat = false;
                cell.has_key = false;
            }
        }
    }

    pub fn open_cells(&self) -> Vec<CellPos> {
        let mut out = Vec::new();
        for y in 0..self.rows as i32 {
            for x in 0..self.cols as i32 {
                if !self.is_wall(x, y) {
                    out.push(CellPos { x, y });
                }
            }
        }
        out
    }

    pub fn count_wheat(&self) -> usize {
        self.cells.iter().filter(|cell| cell.has_wheat).count()
    }

    pub fn open_directions(&self, from: CellPos) -> Vec<Direction> {
        Direction::CARDINALS
            .into_iter()
            .filter(|dir| self.is_open(from.step(*dir)))
            .collect()
    }

    /// Open cells 4-connected to `start`; empty when `start` is a wall.
    pub fn reachable_from(&self, start: CellPos) -> HashSet<CellPos> {
        let mut out = HashSet::new();
        if !self.is_open(start) {
            return out;
        }

        let mut queue = VecDeque::new();
        out.insert(start);
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            for dir in Direction::CARDINALS {
                let next = current.step(dir);
                if !self.is_open(next) {
                    continue;
                }
                if out.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        out
    }

    pub fn to_tiles(&self) -> Vec<String> {
        (0..self.rows as i32)
            .map(|y| {
                (0..self.cols as i32)
                    .map(|x| match self.cell_at(x, y) {
                        Some(cell) if cell.is_wall => '#',
                        Some(cell) if cell.has_wheat => '.',
                        Some(cell) if cell.has_key => 'k',
                        Some(_) => ' ',
                        None => '#',
                    })
                    .collect::<String>()
            })
            .collect()
    }

    /// Inverse of `to_tiles`; fixtures in tests build grids from it.
    pub fn from_tiles(rows: &[&str]) -> Self {
        let height = rows.len();
        let width = rows.iter().map(|row| row.chars().count()).max().unwrap_or(0);
        let mut grid = Self::walled(height, width);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                if let Some(cell) = grid.cell_at_mut(x as i32, y as i32) {
                    *cell = match ch {
                        '#' => Cell::WALL,
                        '.' => Cell {
                            is_wall: false,
                            has_wheat: true,
                            has_key: false,
                        },
                        'k' => Cell {
                            is_wall: false,
                            has_wheat: false,
                            has_key: true,
                        },
                        _ => Cell::default(),
                    };
                }
            }
        }
        grid
    }
}
