use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;
use life_common::{BoundaryPolicy, PresetKind, SnapshotFormat, WallpaperConfig};
use life_wallpaper::stats::StatsWriter;
use life_wallpaper::{
    DirectorySink, FileSnapshotStore, FixedResolution, Platform, Rasterizer, RunConfig, SimulationLoop, StatusEvent,
    StopToken,
};
use log::{debug, error, info, warn};
use std::io::BufRead;
use std::path::PathBuf;
use std::time::Instant;

/// Game of Life desktop background
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the simulation, publishing every generation as the background
    Run(RunArgs),
    /// Render a stored grid snapshot to a PNG file
    Render(RenderArgs),
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Path to the config.toml file (defaults are used if it does not exist)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Cell size in pixels
    #[arg(long)]
    cell_size: Option<u32>,

    /// Starting pattern
    #[arg(long, value_enum)]
    preset: Option<PresetArg>,

    /// Grid snapshot to start from (implies --preset import)
    #[arg(long)]
    import: Option<PathBuf>,

    /// Seed for the random preset
    #[arg(long)]
    seed: Option<u64>,

    /// Neighbor counting at the grid edge
    #[arg(long, value_enum)]
    boundary: Option<BoundaryArg>,

    /// Stop after this many generations
    #[arg(long)]
    generations: Option<u64>,

    /// Directory for images, snapshot and stats
    #[arg(long)]
    directory: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct RenderArgs {
    /// Input snapshot file
    #[arg(short, long)]
    input: PathBuf,

    /// Output image file (.png)
    #[arg(short, long, default_value = "grid.png")]
    output: PathBuf,

    /// Cell size in pixels
    #[arg(long, default_value_t = 10)]
    cell_size: u32,

    /// Snapshot encoding (guessed from the file extension if omitted)
    #[arg(long, value_enum)]
    format: Option<FormatArg>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PresetArg {
    Random,
    Glider,
    Import,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum BoundaryArg {
    Clip,
    Wrap,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Bincode,
    Json,
    Messagepack,
}

impl From<PresetArg> for PresetKind {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Random => PresetKind::Random,
            PresetArg::Glider => PresetKind::Glider,
            PresetArg::Import => PresetKind::Import,
        }
    }
}

impl From<BoundaryArg> for BoundaryPolicy {
    fn from(arg: BoundaryArg) -> Self {
        match arg {
            BoundaryArg::Clip => BoundaryPolicy::Clip,
            BoundaryArg::Wrap => BoundaryPolicy::Wrap,
        }
    }
}

impl From<FormatArg> for SnapshotFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Bincode => SnapshotFormat::Bincode,
            FormatArg::Json => SnapshotFormat::Json,
            FormatArg::Messagepack => SnapshotFormat::MessagePack,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match Args::parse().command {
        Command::Run(args) => run(args),
        Command::Render(args) => render(args),
    }
}

/// Loads the config file and applies command-line overrides.
fn load_config(args: &RunArgs) -> Result<WallpaperConfig> {
    let mut config = if args.config.exists() {
        info!("Loading configuration from {}", args.config.display());
        WallpaperConfig::load(&args.config)?
    } else {
        warn!("Config file '{}' not found, using defaults.", args.config.display());
        WallpaperConfig::default()
    };

    if let Some(cell_size) = args.cell_size {
        config.display.cell_size = cell_size;
    }
    if let Some(preset) = args.preset {
        config.initial_conditions.preset = preset.into();
    }
    if let Some(path) = &args.import {
        config.initial_conditions.preset = PresetKind::Import;
        config.initial_conditions.import_path = Some(path.clone());
    }
    if let Some(seed) = args.seed {
        config.initial_conditions.seed = Some(seed);
    }
    if let Some(boundary) = args.boundary {
        config.rules.boundary = boundary.into();
    }
    if let Some(generations) = args.generations {
        config.timing.max_generations = Some(generations);
    }
    if let Some(directory) = &args.directory {
        config.output.directory = directory.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Cancels the run when a line is read from stdin.
fn watch_stdin(token: StopToken) {
    std::thread::spawn(move || {
        let mut line = String::new();
        if let Ok(n) = std::io::stdin().lock().read_line(&mut line) {
            if n > 0 {
                info!("Stop requested from terminal.");
                token.cancel();
            }
        }
    });
}

fn run(args: RunArgs) -> Result<()> {
    info!("Starting Game of Life wallpaper...");
    let config = load_config(&args)?;
    let output = &config.output;

    let sink = DirectorySink::new(&output.directory, output.file_prefix.clone())?
        .with_wallpaper_command(output.wallpaper_command.clone());
    let platform = Platform::new(
        FixedResolution { width: config.display.width, height: config.display.height },
        FileSnapshotStore::new(output.snapshot_path(), output.snapshot_format),
        sink,
    );

    let run_config = RunConfig::from_config(&config)?;
    info!(
        "Preset: {} | Boundary: {:?} | Pacing: {} ms",
        run_config.preset.name(),
        run_config.boundary,
        config.timing.pacing_ms
    );

    let mut stats = if output.save_stats {
        Some(StatsWriter::create(&output.stats_path())?)
    } else {
        None
    };

    let mut simulation = SimulationLoop::new(platform);
    let status = simulation.start(run_config).context("Failed to start simulation")?;
    if let Some(token) = simulation.stop_token() {
        info!("Press Enter to stop.");
        watch_stdin(token);
    }

    let start_time = Instant::now();
    let mut errors = 0;
    // The channel closes when the worker has finished cleaning up.
    for event in status {
        match &event {
            StatusEvent::Generation { generation, live_cells } => {
                debug!("Generation {}: {} live cells", generation, live_cells);
            }
            StatusEvent::Warning(msg) => warn!("{}", msg),
            StatusEvent::Error(msg) => {
                error!("{}", msg);
                errors += 1;
            }
        }
        if let Some(stats) = stats.as_mut() {
            stats.record(&event)?;
        }
    }
    simulation.wait()?;

    if let Some(mut stats) = stats {
        stats.flush()?;
        info!("Wrote {} stats rows to {}", stats.rows(), output.stats_path().display());
    }
    info!("Ran for {:.2} s.", start_time.elapsed().as_secs_f64());

    if errors > 0 {
        anyhow::bail!("Simulation stopped with {} error(s).", errors);
    }
    Ok(())
}

fn render(args: RenderArgs) -> Result<()> {
    let format = match args.format {
        Some(format) => format.into(),
        None => SnapshotFormat::from_path(&args.input).unwrap_or_default(),
    };
    let snapshot = FileSnapshotStore::read_snapshot(&args.input, format)
        .with_context(|| format!("Failed to read snapshot '{}'", args.input.display()))?;
    let grid = snapshot.to_grid()?;
    info!(
        "Snapshot: generation {}, {}x{} grid, {} live cells",
        snapshot.generation,
        grid.rows(),
        grid.cols(),
        grid.live_count()
    );

    let artifact = Rasterizer::new(args.cell_size)?.render(&grid, snapshot.generation)?;
    artifact.save_png(&args.output)?;
    info!("Image ({}x{}) saved to: {}", artifact.width(), artifact.height(), args.output.display());
    Ok(())
}
