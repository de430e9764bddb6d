use crate::grid::Grid;
use crate::types::{CellPos, PursuerKind};

pub(super) fn pursuer_kind(index: usize) -> PursuerKind {
    PursuerKind::ALL[index % PursuerKind::ALL.len()]
}

/// Unoccupied open cell with the greatest Manhattan distance from `from`;
/// ties go to the first in row-major order.
pub(super) fn farthest_open_cell(
    grid: &Grid,
    from: CellPos,
    occupied: &[CellPos],
) -> Option<CellPos> {
    let mut best: Option<(i32, CellPos)> = None;
    for cell in grid.open_cells() {
        if occupied.contains(&cell) {
            continue;
        }
        let distance = cell.manhattan(from);
        if best.map(|(d, _)| distance > d).unwrap_or(true) {
            best = Some((distance, cell));
        }
    }
    best.map(|(_, cell)| cell)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_cycle_through_roster() {
        assert_eq!(pursuer_kind(0), PursuerKind::Rabbit);
        assert_eq!(pursuer_kind(3), PursuerKind::Fox);
        assert_eq!(pursuer_kind(5), PursuerKind::Crow);
    }

    #[test]
    fn farthest_cell_skips_occupied() {
        let grid = Grid::from_tiles(&["######", "#    #", "######"]);
        let from = CellPos::new(1, 1);
        assert_eq!(farthest_open_cell(&grid, from, &[]), Some(CellPos::new(4, 1)));
        assert_eq!(
            farthest_open_cell(&grid, from, &[CellPos::new(4, 1)]),
            Some(CellPos::new(3, 1))
        );
        assert_eq!(farthest_open_cell(&Grid::default(), from, &[]), None);
    }
}
