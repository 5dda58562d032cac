pub mod config;
pub mod error;
pub mod grid;
pub mod snapshot;

// Re-export key types for easier use by dependent crates
pub use config::{
    parse_color, BoundaryPolicy, DisplayConfig, InitialConditions, OutputConfig, PresetKind, RulesConfig,
    TimingConfig, WallpaperConfig,
};
pub use error::LifeError;
pub use grid::{Cell, Grid};
pub use snapshot::{GridSnapshot, SnapshotFormat};
