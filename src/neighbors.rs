use life_common::{BoundaryPolicy, Grid};
use rayon::prelude::*;

/// Live-neighbor count for every cell of a grid, same shape as the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborField {
    rows: usize,
    cols: usize,
    counts: Vec<u8>,
}

impl NeighborField {
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Count for `(row, col)`, always in `0..=8`.
    #[inline(always)]
    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.counts[row * self.cols + col]
    }

    /// Row-major view of all counts.
    pub fn counts(&self) -> &[u8] {
        &self.counts
    }
}

/// Resolves `idx + delta` along an axis of length `len`.
/// Returns `None` when the neighbor falls off a clipped edge.
#[inline(always)]
fn resolve(idx: usize, delta: isize, len: usize, policy: BoundaryPolicy) -> Option<usize> {
    let target = idx as isize + delta;
    match policy {
        BoundaryPolicy::Clip => (0..len as isize).contains(&target).then_some(target as usize),
        BoundaryPolicy::Wrap => Some(target.rem_euclid(len as isize) as usize),
    }
}

/// Sum of `weight(i)` over `idx - 1 ..= idx + 1` on one axis.
#[inline(always)]
fn window_sum<F>(idx: usize, len: usize, policy: BoundaryPolicy, weight: F) -> u8
where
    F: Fn(usize) -> u8,
{
    (-1..=1)
        .filter_map(|delta| resolve(idx, delta, len, policy))
        .map(weight)
        .sum()
}

/// Counts live Moore neighbors of every cell.
///
/// Separable box sum: each row is first reduced to horizontal 3-cell sums,
/// then three of those are added vertically and the center cell subtracted.
/// Rows are processed in parallel. The result equals [`count_direct`] for
/// both boundary policies, including grids narrower than three cells where
/// wrapping visits the same cell more than once.
pub fn count(grid: &Grid, policy: BoundaryPolicy) -> NeighborField {
    let (rows, cols) = grid.shape();

    let mut horizontal = vec![0u8; rows * cols];
    horizontal
        .par_chunks_mut(cols)
        .enumerate()
        .for_each(|(r, out)| {
            let row = grid.row(r);
            for (c, sum) in out.iter_mut().enumerate() {
                *sum = window_sum(c, cols, policy, |cc| row[cc].weight());
            }
        });

    let horizontal = &horizontal; // Immutable borrow for parallel access
    let mut counts = vec![0u8; rows * cols];
    counts
        .par_chunks_mut(cols)
        .enumerate()
        .for_each(|(r, out)| {
            for (c, count) in out.iter_mut().enumerate() {
                let block = window_sum(r, rows, policy, |rr| horizontal[rr * cols + c]);
                *count = block - grid.get(r, c).weight();
            }
        });

    NeighborField { rows, cols, counts }
}

/// Reference implementation: visits the 8 neighbors of every cell one by one.
pub fn count_direct(grid: &Grid, policy: BoundaryPolicy) -> NeighborField {
    let (rows, cols) = grid.shape();
    let mut counts = Vec::with_capacity(rows * cols);

    for r in 0..rows {
        for c in 0..cols {
            let mut total = 0u8;
            for dr in -1..=1isize {
                for dc in -1..=1isize {
                    if dr == 0 && dc == 0 {
                        continue;
                    }
                    if let (Some(nr), Some(nc)) = (resolve(r, dr, rows, policy), resolve(c, dc, cols, policy)) {
                        total += grid.get(nr, nc).weight();
                    }
                }
            }
            counts.push(total);
        }
    }

    NeighborField { rows, cols, counts }
}
