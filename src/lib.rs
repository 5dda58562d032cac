//! Conway's Game of Life as a desktop background: grid evolution, neighbor
//! counting under a chosen boundary policy, rasterization, and the background
//! loop that publishes one image per generation.

pub mod init;
pub mod neighbors;
pub mod platform;
pub mod render;
pub mod rules;
pub mod simulation;
pub mod stats;

pub use init::{initialize, initialize_or_fallback, InitPreset, Seeded};
pub use neighbors::{count, count_direct, NeighborField};
pub use platform::{ArtifactSink, DirectorySink, FileSnapshotStore, FixedResolution, Platform, ResolutionProvider, SnapshotStore};
pub use render::{render, GenerationArtifact, Rasterizer};
pub use rules::{advance, step};
pub use simulation::{grid_dimensions, LoopState, RunConfig, SimulationLoop, StatusEvent, StopToken};

pub use life_common::{BoundaryPolicy, Cell, Grid, LifeError};
