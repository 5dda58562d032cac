use life_common::{Cell, Grid, LifeError, PresetKind};
use log::{debug, warn};
use rand::Rng;

/// Glider anchored at the top-left corner, heading towards bottom-right.
///
/// ```text
/// ..#
/// #.#
/// .##
/// ```
const GLIDER: [(usize, usize); 5] = [(0, 2), (1, 0), (1, 2), (2, 1), (2, 2)];

/// Starting pattern for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitPreset {
    /// Every cell independently dead or alive with equal probability.
    Random,
    Glider,
    /// A grid supplied by the caller. Must match the run's shape.
    Imported(Grid),
}

impl InitPreset {
    /// Preset for a configured kind. `Import` needs a grid and has no
    /// preset of its own, so it maps to `None`.
    pub fn from_kind(kind: PresetKind) -> Option<Self> {
        match kind {
            PresetKind::Random => Some(InitPreset::Random),
            PresetKind::Glider => Some(InitPreset::Glider),
            PresetKind::Import => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            InitPreset::Random => "random",
            InitPreset::Glider => "glider",
            InitPreset::Imported(_) => "imported",
        }
    }
}

/// Result of [`initialize_or_fallback`].
#[derive(Debug, Clone)]
pub struct Seeded {
    pub grid: Grid,
    /// Set when the requested preset was rejected and the fallback used.
    pub warning: Option<String>,
}

/// Builds a `rows x cols` starting grid.
///
/// Fails with `Config` for a zero dimension and with `DimensionMismatch`
/// when an imported grid has a different shape.
pub fn initialize<R: Rng + ?Sized>(
    rows: usize,
    cols: usize,
    preset: &InitPreset,
    rng: &mut R,
) -> Result<Grid, LifeError> {
    match preset {
        InitPreset::Random => Grid::from_fn(rows, cols, |_, _| Cell::from(rng.random::<bool>())),
        InitPreset::Glider => {
            if rows < 3 || cols < 3 {
                let grid = Grid::dead(rows, cols)?;
                debug!("Grid {}x{} too small for a glider, starting empty.", rows, cols);
                return Ok(grid);
            }
            Grid::from_fn(rows, cols, |r, c| Cell::from(GLIDER.contains(&(r, c))))
        }
        InitPreset::Imported(grid) => {
            if rows == 0 || cols == 0 {
                return Err(LifeError::config(format!("grid must be at least 1x1, got {}x{}", rows, cols)));
            }
            grid.ensure_shape(rows, cols)?;
            Ok(grid.clone())
        }
    }
}

/// Like [`initialize`], but recovers from a shape mismatch by building the
/// grid from `fallback` instead and reporting why.
pub fn initialize_or_fallback<R: Rng + ?Sized>(
    rows: usize,
    cols: usize,
    preset: &InitPreset,
    fallback: &InitPreset,
    rng: &mut R,
) -> Result<Seeded, LifeError> {
    match initialize(rows, cols, preset, rng) {
        Ok(grid) => Ok(Seeded { grid, warning: None }),
        Err(e) if e.is_recoverable() => {
            let warning = format!("{} grid rejected ({}), starting from {} preset", preset.name(), e, fallback.name());
            warn!("{}", warning);
            let grid = initialize(rows, cols, fallback, rng)?;
            Ok(Seeded { grid, warning: Some(warning) })
        }
        Err(e) => Err(e),
    }
}
