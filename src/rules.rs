use crate::neighbors::{self, NeighborField};
use life_common::{BoundaryPolicy, Cell, Grid, LifeError};

/// Conway's rule (B3/S23) for a single cell.
#[inline(always)]
pub fn next_state(cell: Cell, live_neighbors: u8) -> Cell {
    match (cell, live_neighbors) {
        (Cell::Alive, 2 | 3) => Cell::Alive,
        (Cell::Dead, 3) => Cell::Alive,
        _ => Cell::Dead,
    }
}

/// Produces the next generation from `grid` and its neighbor counts.
/// The input grid is left as is.
pub fn step(grid: &Grid, field: &NeighborField) -> Result<Grid, LifeError> {
    let (rows, cols) = grid.shape();
    if field.shape() != (rows, cols) {
        let (field_rows, field_cols) = field.shape();
        return Err(LifeError::DimensionMismatch {
            expected_rows: rows,
            expected_cols: cols,
            rows: field_rows,
            cols: field_cols,
        });
    }

    let cells = grid
        .cells()
        .iter()
        .zip(field.counts())
        .map(|(&cell, &n)| next_state(cell, n))
        .collect();
    Grid::from_cells(rows, cols, cells)
}

/// Counts neighbors and applies the rule in one go.
pub fn advance(grid: &Grid, policy: BoundaryPolicy) -> Result<Grid, LifeError> {
    step(grid, &neighbors::count(grid, policy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const POLICIES: [BoundaryPolicy; 2] = [BoundaryPolicy::Clip, BoundaryPolicy::Wrap];

    #[test]
    fn test_transition_table() {
        for n in 0..=8u8 {
            let survives = n == 2 || n == 3;
            assert_eq!(next_state(Cell::Alive, n).is_alive(), survives, "alive with {}", n);
            assert_eq!(next_state(Cell::Dead, n).is_alive(), n == 3, "dead with {}", n);
        }
    }

    #[test]
    fn test_block_is_still_life() {
        let block = Grid::from_pattern("....\n.##.\n.##.\n....").unwrap();
        for policy in POLICIES {
            assert_eq!(advance(&block, policy).unwrap(), block, "{:?}", policy);
        }
    }

    #[test]
    fn test_block_in_corner_is_still_under_clip() {
        let block = Grid::from_pattern("##...\n##...\n.....\n.....").unwrap();
        assert_eq!(advance(&block, BoundaryPolicy::Clip).unwrap(), block);
    }

    #[test]
    fn test_blinker_has_period_two() {
        let horizontal = Grid::from_pattern(".....\n.....\n.###.\n.....\n.....").unwrap();
        let vertical = Grid::from_pattern(".....\n..#..\n..#..\n..#..\n.....").unwrap();
        for policy in POLICIES {
            let once = advance(&horizontal, policy).unwrap();
            assert_eq!(once, vertical, "{:?}", policy);
            assert_eq!(advance(&once, policy).unwrap(), horizontal, "{:?}", policy);
        }
    }

    #[test]
    fn test_lonely_cell_dies() {
        let grid = Grid::from_pattern("...\n.#.\n...").unwrap();
        assert_eq!(advance(&grid, BoundaryPolicy::Clip).unwrap().live_count(), 0);
    }

    #[test]
    fn test_field_of_wrong_shape_is_rejected() {
        let grid = Grid::dead(3, 3).unwrap();
        let other = neighbors::count(&Grid::dead(4, 4).unwrap(), BoundaryPolicy::Clip);
        assert!(matches!(step(&grid, &other), Err(LifeError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_step_leaves_input_untouched() {
        let grid = Grid::from_pattern(".#.\n.#.\n.#.").unwrap();
        let before = grid.clone();
        let _ = advance(&grid, BoundaryPolicy::Wrap).unwrap();
        assert_eq!(grid, before);
    }

    proptest! {
        #[test]
        fn prop_step_preserves_shape(rows in 1usize..16, cols in 1usize..16, seed in any::<u64>()) {
            use rand::{Rng, SeedableRng};
            let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
            let grid = Grid::from_fn(rows, cols, |_, _| Cell::from(rng.random_bool(0.5))).unwrap();
            let next = advance(&grid, BoundaryPolicy::Clip).unwrap();
            prop_assert_eq!(next.shape(), grid.shape());
            prop_assert!(next.cells().iter().all(|c| matches!(c, Cell::Dead | Cell::Alive)));
        }
    }
}
