use crate::error::LifeError;
use std::fmt;

/// State of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Cell {
    #[default]
    Dead = 0,
    Alive = 1,
}

impl Cell {
    #[inline(always)]
    pub fn is_alive(self) -> bool {
        self == Cell::Alive
    }

    /// 1 for a live cell, 0 for a dead one.
    #[inline(always)]
    pub fn weight(self) -> u8 {
        self as u8
    }
}

impl From<bool> for Cell {
    #[inline(always)]
    fn from(alive: bool) -> Self {
        if alive { Cell::Alive } else { Cell::Dead }
    }
}

/// A `rows x cols` matrix of cells stored row-major.
///
/// A grid is never modified once built: every generation produces a new one,
/// so a reader always sees either the previous or the next generation in full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Creates an all-dead grid. Fails if either dimension is zero.
    pub fn dead(rows: usize, cols: usize) -> Result<Self, LifeError> {
        check_dims(rows, cols)?;
        Ok(Self { rows, cols, cells: vec![Cell::Dead; rows * cols] })
    }

    /// Builds a grid from a row-major cell vector of length `rows * cols`.
    pub fn from_cells(rows: usize, cols: usize, cells: Vec<Cell>) -> Result<Self, LifeError> {
        check_dims(rows, cols)?;
        if cells.len() != rows * cols {
            return Err(LifeError::config(format!(
                "expected {} cells for a {}x{} grid, got {}",
                rows * cols,
                rows,
                cols,
                cells.len()
            )));
        }
        Ok(Self { rows, cols, cells })
    }

    /// Builds a grid cell by cell from `f(row, col)`.
    pub fn from_fn<F>(rows: usize, cols: usize, mut f: F) -> Result<Self, LifeError>
    where
        F: FnMut(usize, usize) -> Cell,
    {
        check_dims(rows, cols)?;
        let mut cells = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                cells.push(f(r, c));
            }
        }
        Ok(Self { rows, cols, cells })
    }

    /// Builds a grid from nested rows. Every row must have the same length.
    pub fn from_rows(rows: &[Vec<bool>]) -> Result<Self, LifeError> {
        let cols = rows.first().map_or(0, Vec::len);
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != cols) {
            return Err(LifeError::config(format!(
                "row {} has {} cells, expected {}",
                idx,
                row.len(),
                cols
            )));
        }
        let cells = rows.iter().flatten().map(|&alive| Cell::from(alive)).collect();
        Self::from_cells(rows.len(), cols, cells)
    }

    /// Parses a text pattern: one line per row, `#` or `O` for live cells,
    /// `.` for dead ones. Blank lines and surrounding whitespace are ignored.
    pub fn from_pattern(pattern: &str) -> Result<Self, LifeError> {
        let rows = pattern
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                line.chars()
                    .map(|ch| match ch {
                        '#' | 'O' => Ok(true),
                        '.' => Ok(false),
                        other => Err(LifeError::config(format!("unexpected pattern character '{}'", other))),
                    })
                    .collect::<Result<Vec<bool>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_rows(&rows)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline(always)]
    pub fn get(&self, row: usize, col: usize) -> Cell {
        self.cells[row * self.cols + col]
    }

    #[inline(always)]
    pub fn is_alive(&self, row: usize, col: usize) -> bool {
        self.get(row, col).is_alive()
    }

    /// Row-major view of all cells.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn row(&self, row: usize) -> &[Cell] {
        &self.cells[row * self.cols..(row + 1) * self.cols]
    }

    pub fn live_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_alive()).count()
    }

    /// Coordinates of every live cell in row-major order.
    pub fn live_cells(&self) -> Vec<(usize, usize)> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_alive())
            .map(|(idx, _)| (idx / self.cols, idx % self.cols))
            .collect()
    }

    /// Checks that this grid is `rows x cols`.
    pub fn ensure_shape(&self, rows: usize, cols: usize) -> Result<(), LifeError> {
        if self.rows == rows && self.cols == cols {
            Ok(())
        } else {
            Err(LifeError::DimensionMismatch {
                expected_rows: rows,
                expected_cols: cols,
                rows: self.rows,
                cols: self.cols,
            })
        }
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in 0..self.rows {
            for cell in self.row(r) {
                f.write_str(if cell.is_alive() { "#" } else { "." })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

fn check_dims(rows: usize, cols: usize) -> Result<(), LifeError> {
    if rows == 0 || cols == 0 {
        return Err(LifeError::config(format!("grid must be at least 1x1, got {}x{}", rows, cols)));
    }
    Ok(())
}
