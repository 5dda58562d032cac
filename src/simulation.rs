use crate::init::{self, InitPreset};
use crate::neighbors;
use crate::platform::{FileSnapshotStore, Platform};
use crate::render::Rasterizer;
use crate::rules;
use anyhow::Context;
use life_common::{parse_color, BoundaryPolicy, Grid, LifeError, SnapshotFormat, WallpaperConfig};
use log::{debug, error, info, trace, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Seconds between throughput log lines.
const REPORT_INTERVAL_SECS: f64 = 5.0;

/// Lifecycle of a [`SimulationLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    /// Stop requested or a cycle failed; cleanup in progress.
    Stopping,
}

/// Progress reports sent from the worker to whoever started the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    Generation { generation: u64, live_cells: usize },
    Warning(String),
    Error(String),
}

/// Cooperative cancellation flag shared by the control side and the worker.
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (flag, wakeup) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        wakeup.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleeps for up to `timeout`, waking early on cancellation.
    /// Returns whether the token is cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (flag, wakeup) = &*self.inner;
        let guard = flag.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = wakeup
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

/// Everything one run needs, owned by the loop from `start` to `stop`.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Edge length of one cell in pixels.
    pub cell_size: u32,
    pub preset: InitPreset,
    /// Used when an imported grid has the wrong shape.
    pub fallback: InitPreset,
    pub boundary: BoundaryPolicy,
    /// Seed for random grids. Drawn from the OS when `None`.
    pub seed: Option<u64>,
    /// Delay between generations.
    pub pacing: Duration,
    pub max_generations: Option<u64>,
    /// Resume from the snapshot store unless a grid was imported.
    pub restore_snapshot: bool,
    pub persist_snapshots: bool,
    /// Apply an all-dead image after cleanup.
    pub blank_on_stop: bool,
    pub foreground: [u8; 4],
    pub background: [u8; 4],
}

impl RunConfig {
    pub fn new(cell_size: u32, preset: InitPreset) -> Self {
        Self {
            cell_size,
            preset,
            fallback: InitPreset::Random,
            boundary: BoundaryPolicy::Clip,
            seed: None,
            pacing: Duration::ZERO,
            max_generations: None,
            restore_snapshot: false,
            persist_snapshots: false,
            blank_on_stop: false,
            foreground: crate::render::DEFAULT_FOREGROUND.0,
            background: crate::render::DEFAULT_BACKGROUND.0,
        }
    }

    /// Derives the run settings from the file configuration, reading the
    /// import file if the preset asks for one.
    pub fn from_config(config: &WallpaperConfig) -> anyhow::Result<Self> {
        let initial = &config.initial_conditions;
        let preset = match InitPreset::from_kind(initial.preset) {
            Some(preset) => preset,
            None => {
                let path = initial
                    .import_path
                    .as_deref()
                    .context("preset = \"import\" requires import_path")?;
                let format = SnapshotFormat::from_path(path).unwrap_or(config.output.snapshot_format);
                let snapshot = FileSnapshotStore::read_snapshot(path, format)
                    .with_context(|| format!("Failed to import grid from '{}'", path.display()))?;
                InitPreset::Imported(snapshot.to_grid()?)
            }
        };
        let fallback = InitPreset::from_kind(initial.fallback)
            .context("fallback preset must be \"random\" or \"glider\"")?;

        Ok(Self {
            cell_size: config.display.cell_size,
            preset,
            fallback,
            boundary: config.rules.boundary,
            seed: initial.seed,
            pacing: Duration::from_millis(config.timing.pacing_ms),
            max_generations: config.timing.max_generations,
            restore_snapshot: config.output.restore_snapshot,
            persist_snapshots: config.output.persist_snapshots,
            blank_on_stop: config.output.blank_on_stop,
            foreground: parse_color(&config.output.foreground)?,
            background: parse_color(&config.output.background)?,
        })
    }
}

/// Grid shape for a screen: `(height / cell_size, width / cell_size)`.
pub fn grid_dimensions(width: u32, height: u32, cell_size: u32) -> Result<(usize, usize), LifeError> {
    if cell_size < 1 {
        return Err(LifeError::config("cell size must be at least 1 pixel"));
    }
    let rows = (height / cell_size) as usize;
    let cols = (width / cell_size) as usize;
    if rows < 1 || cols < 1 {
        return Err(LifeError::config(format!(
            "a {}x{} screen holds no {}px cells",
            width, height, cell_size
        )));
    }
    Ok((rows, cols))
}

/// Sends a status event. A receiver that went away is not an error.
fn emit(status: &Sender<StatusEvent>, event: StatusEvent) {
    if status.send(event).is_err() {
        trace!("Status receiver dropped; event discarded.");
    }
}

fn set_state(state: &Mutex<LoopState>, next: LoopState) {
    *state.lock().unwrap_or_else(PoisonError::into_inner) = next;
}

/// A run in progress: the current grid and how to advance and draw it.
struct Run {
    config: RunConfig,
    rasterizer: Rasterizer,
    grid: Grid,
    generation: u64,
}

impl Run {
    /// Resolves the grid shape and picks the starting grid.
    fn prepare(platform: &mut Platform, config: RunConfig, status: &Sender<StatusEvent>) -> Result<Self, LifeError> {
        let rasterizer = Rasterizer::new(config.cell_size)?.with_colors(config.foreground, config.background);
        let (width, height) = platform.resolution.resolution()?;
        let (rows, cols) = grid_dimensions(width, height, config.cell_size)?;
        info!(
            "Screen resolution: {}x{}, grid size: {}x{}, cell size: {}",
            width, height, rows, cols, config.cell_size
        );

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        // A stored grid that cannot be used sends the run to the fallback preset.
        let mut start_preset = &config.preset;
        let restored = if config.restore_snapshot && !matches!(config.preset, InitPreset::Imported(_)) {
            let loaded = match platform.snapshots.load() {
                Ok(Some(grid)) => match grid.ensure_shape(rows, cols) {
                    Ok(()) => Ok(Some(grid)),
                    Err(e) => Err(format!("Stored grid rejected ({})", e)),
                },
                Ok(None) => Ok(None),
                Err(e) => Err(format!("Could not restore stored grid ({})", e)),
            };
            match loaded {
                Ok(grid) => grid,
                Err(reason) => {
                    let msg = format!("{}, starting from {} preset", reason, config.fallback.name());
                    warn!("{}", msg);
                    emit(status, StatusEvent::Warning(msg));
                    start_preset = &config.fallback;
                    None
                }
            }
        } else {
            None
        };

        let grid = match restored {
            Some(grid) => {
                info!("Resuming from stored grid with {} live cells.", grid.live_count());
                grid
            }
            None => {
                let seeded = init::initialize_or_fallback(rows, cols, start_preset, &config.fallback, &mut rng)?;
                if let Some(msg) = seeded.warning {
                    emit(status, StatusEvent::Warning(msg));
                }
                info!("Initialized {} grid with {} live cells.", start_preset.name(), seeded.grid.live_count());
                seeded.grid
            }
        };

        Ok(Self { config, rasterizer, grid, generation: 0 })
    }

    /// Shows the starting grid as generation 0, then runs cycles until the
    /// token is cancelled or the generation cap is reached.
    fn drive(&mut self, platform: &mut Platform, token: &StopToken, status: &Sender<StatusEvent>) -> Result<(), LifeError> {
        let artifact = self.rasterizer.render(&self.grid, self.generation)?;
        platform.sink.apply(&artifact)?;
        emit(status, StatusEvent::Generation { generation: self.generation, live_cells: self.grid.live_count() });
        if self.config.persist_snapshots {
            platform.snapshots.save(&self.grid, self.generation)?;
        }

        let start_time = Instant::now();
        let mut previous_report = start_time;
        loop {
            if token.is_cancelled() {
                info!("Stop requested after generation {}.", self.generation);
                return Ok(());
            }
            if self.config.max_generations.is_some_and(|cap| self.generation >= cap) {
                info!("Reached generation cap of {}.", self.generation);
                return Ok(());
            }
            if !self.config.pacing.is_zero() && token.wait_timeout(self.config.pacing) {
                info!("Stop requested after generation {}.", self.generation);
                return Ok(());
            }

            let cycle_start = Instant::now();
            self.cycle(platform, status)?;
            let cycle_time = cycle_start.elapsed();

            if previous_report.elapsed().as_secs_f64() >= REPORT_INTERVAL_SECS {
                info!(
                    "Generation {} | Live cells: {} | Cycle Time: {:6.2} ms | Elapsed: {:.2} s",
                    self.generation,
                    self.grid.live_count(),
                    cycle_time.as_secs_f64() * 1000.0,
                    start_time.elapsed().as_secs_f64()
                );
                previous_report = Instant::now();
            } else {
                trace!("Generation {} completed in {:.2} ms", self.generation, cycle_time.as_secs_f64() * 1000.0);
            }
        }
    }

    /// One generation: count, apply the rule, render, publish, persist, and
    /// drop the previous image. The current grid is only replaced once the
    /// next one has been fully computed and applied.
    fn cycle(&mut self, platform: &mut Platform, status: &Sender<StatusEvent>) -> Result<(), LifeError> {
        let field = neighbors::count(&self.grid, self.config.boundary);
        let next = rules::step(&self.grid, &field)?;
        let generation = self.generation + 1;

        let artifact = self.rasterizer.render(&next, generation)?;
        platform.sink.apply(&artifact)?;

        let previous = self.generation;
        self.grid = next;
        self.generation = generation;

        emit(status, StatusEvent::Generation { generation, live_cells: self.grid.live_count() });
        if self.config.persist_snapshots {
            platform.snapshots.save(&self.grid, generation)?;
        }
        platform.sink.discard(previous)?;
        Ok(())
    }

    /// Shows an all-dead image in the run's shape.
    fn blank(&self, platform: &mut Platform) -> Result<(), LifeError> {
        let (rows, cols) = self.grid.shape();
        let artifact = self.rasterizer.render(&Grid::dead(rows, cols)?, self.generation)?;
        platform.sink.apply_blank(&artifact)
    }
}

/// Worker body. Always cleans up and hands the platform back, whatever
/// happened inside the generation cycles.
fn run_worker(
    mut platform: Platform,
    mut run: Run,
    token: StopToken,
    status: Sender<StatusEvent>,
    state: Arc<Mutex<LoopState>>,
) -> Platform {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| run.drive(&mut platform, &token, &status)));
    set_state(&state, LoopState::Stopping);

    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!("Simulation stopped at generation {}: {}", run.generation, e);
            emit(&status, StatusEvent::Error(e.to_string()));
        }
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!("Generation cycle panicked at generation {}: {}", run.generation, msg);
            emit(&status, StatusEvent::Error(format!("generation cycle panicked: {}", msg)));
        }
    }

    info!("Cleaning up artifacts...");
    if let Err(e) = platform.sink.cleanup() {
        error!("Cleanup failed: {}", e);
        emit(&status, StatusEvent::Error(e.to_string()));
    }
    if run.config.blank_on_stop {
        if let Err(e) = run.blank(&mut platform) {
            warn!("Could not apply blank wallpaper: {}", e);
            emit(&status, StatusEvent::Warning(format!("could not apply blank image: {}", e)));
        }
    }

    set_state(&state, LoopState::Idle);
    info!("Simulation stopped after {} generation(s).", run.generation);
    platform
}

struct Worker {
    token: StopToken,
    handle: JoinHandle<Platform>,
}

/// Drives a run on a background thread. `start` and `stop` are the only
/// transitions: `Idle -> Running` and `Running -> Stopping -> Idle`.
pub struct SimulationLoop {
    platform: Option<Platform>,
    state: Arc<Mutex<LoopState>>,
    worker: Option<Worker>,
}

impl SimulationLoop {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform: Some(platform),
            state: Arc::new(Mutex::new(LoopState::Idle)),
            worker: None,
        }
    }

    pub fn state(&self) -> LoopState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts a run and returns the channel its status events arrive on.
    ///
    /// Configuration errors are returned directly and leave the loop idle.
    /// Shape mismatches of imported or stored grids are not errors; they are
    /// reported as warning events on the returned channel.
    pub fn start(&mut self, config: RunConfig) -> Result<Receiver<StatusEvent>, LifeError> {
        self.reap()?;
        if self.worker.is_some() {
            return Err(LifeError::InvalidState("simulation already running".to_string()));
        }
        let mut platform = self
            .platform
            .take()
            .ok_or_else(|| LifeError::InvalidState("platform adapters unavailable".to_string()))?;

        let (status_tx, status_rx) = mpsc::channel();
        let run = match Run::prepare(&mut platform, config, &status_tx) {
            Ok(run) => run,
            Err(e) => {
                error!("Failed to start simulation: {}", e);
                self.platform = Some(platform);
                return Err(e);
            }
        };

        let token = StopToken::new();
        set_state(&self.state, LoopState::Running);
        let worker_token = token.clone();
        let state = Arc::clone(&self.state);
        let spawned = thread::Builder::new()
            .name("life-simulation".to_string())
            .spawn(move || run_worker(platform, run, worker_token, status_tx, state));

        match spawned {
            Ok(handle) => {
                debug!("Simulation worker started.");
                self.worker = Some(Worker { token, handle });
                Ok(status_rx)
            }
            Err(e) => {
                // The closure owned the platform and is gone with the failed spawn.
                set_state(&self.state, LoopState::Idle);
                Err(LifeError::InvalidState(format!("failed to spawn simulation worker: {}", e)))
            }
        }
    }

    /// Requests a stop and waits until the worker has cleaned up.
    pub fn stop(&mut self) -> Result<(), LifeError> {
        let worker = self
            .worker
            .take()
            .ok_or_else(|| LifeError::InvalidState("no simulation running".to_string()))?;
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state == LoopState::Running {
                *state = LoopState::Stopping;
            }
        }
        worker.token.cancel();
        self.join(worker)
    }

    /// Waits for a run that ends on its own (generation cap or error).
    pub fn wait(&mut self) -> Result<(), LifeError> {
        match self.worker.take() {
            Some(worker) => self.join(worker),
            None => Ok(()),
        }
    }

    /// A handle that stops the current run from another thread.
    pub fn stop_token(&self) -> Option<StopToken> {
        self.worker.as_ref().map(|worker| worker.token.clone())
    }

    /// Joins a worker that already finished so its platform can be reused.
    fn reap(&mut self) -> Result<(), LifeError> {
        match self.worker.take() {
            Some(worker) if worker.handle.is_finished() => self.join(worker),
            other => {
                self.worker = other;
                Ok(())
            }
        }
    }

    fn join(&mut self, worker: Worker) -> Result<(), LifeError> {
        match worker.handle.join() {
            Ok(platform) => {
                self.platform = Some(platform);
                Ok(())
            }
            Err(_) => {
                set_state(&self.state, LoopState::Idle);
                Err(LifeError::InvalidState("simulation worker panicked during cleanup".to_string()))
            }
        }
    }
}

impl Drop for SimulationLoop {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.token.cancel();
            let _ = worker.handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use life_common::PresetKind;

    #[test]
    fn test_grid_dimensions_floor_divide() {
        assert_eq!(grid_dimensions(1920, 1080, 20).unwrap(), (54, 96));
        assert_eq!(grid_dimensions(1925, 1099, 20).unwrap(), (54, 96));
        assert!(matches!(grid_dimensions(10, 10, 0), Err(LifeError::Config(_))));
        assert!(matches!(grid_dimensions(10, 10, 11), Err(LifeError::Config(_))));
    }

    #[test]
    fn test_stop_token_wakes_waiter() {
        let token = StopToken::new();
        let waiter = token.clone();
        let handle = thread::spawn(move || waiter.wait_timeout(Duration::from_secs(30)));
        token.cancel();
        assert!(handle.join().unwrap());
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_stop_token_times_out_when_not_cancelled() {
        let token = StopToken::new();
        assert!(!token.wait_timeout(Duration::from_millis(5)));
    }

    #[test]
    fn test_run_config_from_file_config() {
        let config = WallpaperConfig::from_toml_str(
            "[initial_conditions]\npreset = \"glider\"\nseed = 3\n[rules]\nboundary = \"wrap\"\n[timing]\npacing_ms = 25\n",
        )
        .unwrap();
        let run = RunConfig::from_config(&config).unwrap();
        assert_eq!(run.preset, InitPreset::Glider);
        assert_eq!(run.boundary, BoundaryPolicy::Wrap);
        assert_eq!(run.seed, Some(3));
        assert_eq!(run.pacing, Duration::from_millis(25));
        assert_eq!(run.background, [0, 0, 0, 255]);
    }

    #[test]
    fn test_run_config_reads_import_file() {
        let dir = std::env::temp_dir().join(format!("life-wallpaper-import-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("seed.json");
        let grid = Grid::from_pattern("#.#\n.#.").unwrap();
        let file = std::fs::File::create(&path).unwrap();
        SnapshotFormat::Json.write(file, &life_common::GridSnapshot::from_grid(&grid, 0)).unwrap();

        let mut config = WallpaperConfig::default();
        config.initial_conditions.preset = PresetKind::Import;
        config.initial_conditions.import_path = Some(path);
        let run = RunConfig::from_config(&config).unwrap();
        assert_eq!(run.preset, InitPreset::Imported(grid));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
