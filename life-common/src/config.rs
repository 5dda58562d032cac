use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::snapshot::SnapshotFormat;

/// How neighbor counting treats cells beyond the grid edge.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryPolicy {
    /// Off-grid neighbors do not exist.
    #[default]
    Clip,
    /// The grid is a torus; neighbors wrap modulo rows and cols.
    Wrap,
}

/// Named starting pattern for a run.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PresetKind {
    #[default]
    Random,
    Glider,
    /// Start from a grid file supplied by the user.
    Import,
}

// Screen and cell geometry
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct DisplayConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Edge length of one cell in pixels. Smaller means a denser grid.
    #[serde(default = "default_cell_size")]
    pub cell_size: u32,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct InitialConditions {
    #[serde(default)]
    pub preset: PresetKind,
    /// Snapshot file to start from when `preset = "import"`.
    #[serde(default)]
    pub import_path: Option<PathBuf>,
    /// Seed for the random preset. Drawn from the OS when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Preset used when an imported or restored grid has the wrong shape.
    #[serde(default)]
    pub fallback: PresetKind,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct RulesConfig {
    #[serde(default)]
    pub boundary: BoundaryPolicy,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TimingConfig {
    /// Delay between generations in milliseconds.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
    /// Stop on our own after this many generations. Runs until stopped when absent.
    #[serde(default)]
    pub max_generations: Option<u64>,
}

// Where images, snapshots and stats go
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    #[serde(default = "default_snapshot_file")]
    pub snapshot_file: String,
    #[serde(default)]
    pub snapshot_format: SnapshotFormat,
    #[serde(default = "default_true")]
    pub persist_snapshots: bool,
    #[serde(default = "default_true")]
    pub restore_snapshot: bool,
    #[serde(default)]
    pub save_stats: bool,
    #[serde(default = "default_stats_file")]
    pub stats_file: String,
    /// Program and arguments that set the desktop background. `{path}` is
    /// replaced by the image path. Nothing is run when empty.
    #[serde(default)]
    pub wallpaper_command: Vec<String>,
    #[serde(default = "default_true")]
    pub blank_on_stop: bool,
    #[serde(default = "default_foreground")]
    pub foreground: String,
    #[serde(default = "default_background")]
    pub background: String,
}

/// Top-level configuration, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct WallpaperConfig {
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub initial_conditions: InitialConditions,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            width: default_width(),
            height: default_height(),
            cell_size: default_cell_size(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            pacing_ms: default_pacing_ms(),
            max_generations: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            directory: default_directory(),
            file_prefix: default_file_prefix(),
            snapshot_file: default_snapshot_file(),
            snapshot_format: SnapshotFormat::default(),
            persist_snapshots: true,
            restore_snapshot: true,
            save_stats: false,
            stats_file: default_stats_file(),
            wallpaper_command: Vec::new(),
            blank_on_stop: true,
            foreground: default_foreground(),
            background: default_background(),
        }
    }
}

impl OutputConfig {
    pub fn snapshot_path(&self) -> PathBuf {
        self.directory.join(&self.snapshot_file)
    }

    pub fn stats_path(&self) -> PathBuf {
        self.directory.join(&self.stats_file)
    }
}

impl WallpaperConfig {
    /// Loads the configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        let config = Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))?;

        Ok(config)
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: WallpaperConfig = toml::from_str(text)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let display = &self.display;
        if display.cell_size == 0 {
            anyhow::bail!("cell_size must be at least 1 pixel.");
        }
        if display.width < display.cell_size || display.height < display.cell_size {
            anyhow::bail!(
                "Resolution {}x{} is smaller than one {}px cell.",
                display.width,
                display.height,
                display.cell_size
            );
        }
        if self.initial_conditions.preset == PresetKind::Import && self.initial_conditions.import_path.is_none() {
            anyhow::bail!("preset = \"import\" requires import_path.");
        }
        if self.initial_conditions.fallback == PresetKind::Import {
            anyhow::bail!("fallback preset must be \"random\" or \"glider\".");
        }
        if self.output.file_prefix.is_empty() {
            anyhow::bail!("file_prefix must not be empty.");
        }
        parse_color(&self.output.foreground)?;
        parse_color(&self.output.background)?;
        Ok(())
    }
}

// Named colors (RGBA)
const COLOR_MAP: &[(&str, [u8; 4])] = &[
    ("black", [0, 0, 0, 255]),
    ("white", [255, 255, 255, 255]),
    ("red", [255, 0, 0, 255]),
    ("green", [0, 255, 0, 255]),
    ("blue", [0, 0, 255, 255]),
    ("yellow", [255, 255, 0, 255]),
    ("cyan", [0, 255, 255, 255]),
    ("magenta", [255, 0, 255, 255]),
];

/// Parses a color name to opaque RGBA values.
pub fn parse_color(color_name: &str) -> Result<[u8; 4]> {
    COLOR_MAP
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(color_name))
        .map(|&(_, color)| color)
        .ok_or_else(|| anyhow::anyhow!("Color '{}' not recognized.", color_name))
}

fn default_width() -> u32 {
    1920
}

fn default_height() -> u32 {
    1080
}

fn default_cell_size() -> u32 {
    20
}

fn default_pacing_ms() -> u64 {
    1000
}

fn default_directory() -> PathBuf {
    PathBuf::from("gol")
}

fn default_file_prefix() -> String {
    "game_of_life".to_string()
}

fn default_snapshot_file() -> String {
    "game_of_life_grid.bin".to_string()
}

fn default_stats_file() -> String {
    "game_of_life_stats.csv".to_string()
}

fn default_foreground() -> String {
    "white".to_string()
}

fn default_background() -> String {
    "black".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = WallpaperConfig::from_toml_str("").unwrap();
        assert_eq!(config.display.cell_size, 20);
        assert_eq!(config.rules.boundary, BoundaryPolicy::Clip);
        assert_eq!(config.initial_conditions.preset, PresetKind::Random);
        assert_eq!(config.output.snapshot_format, SnapshotFormat::Bincode);
        assert!(config.output.blank_on_stop);
    }

    #[test]
    fn test_sections_are_parsed() {
        let config = WallpaperConfig::from_toml_str(
            r#"
            [display]
            width = 800
            height = 600
            cell_size = 10

            [initial_conditions]
            preset = "glider"
            seed = 7

            [rules]
            boundary = "wrap"

            [timing]
            pacing_ms = 50
            max_generations = 12

            [output]
            snapshot_format = "messagepack"
            wallpaper_command = ["feh", "--bg-fill", "{path}"]
            "#,
        )
        .unwrap();
        assert_eq!(config.display.width, 800);
        assert_eq!(config.initial_conditions.preset, PresetKind::Glider);
        assert_eq!(config.initial_conditions.seed, Some(7));
        assert_eq!(config.rules.boundary, BoundaryPolicy::Wrap);
        assert_eq!(config.timing.max_generations, Some(12));
        assert_eq!(config.output.snapshot_format, SnapshotFormat::MessagePack);
        assert_eq!(config.output.wallpaper_command.len(), 3);
    }

    #[test]
    fn test_zero_cell_size_is_rejected() {
        assert!(WallpaperConfig::from_toml_str("[display]\ncell_size = 0\n").is_err());
    }

    #[test]
    fn test_import_without_path_is_rejected() {
        assert!(WallpaperConfig::from_toml_str("[initial_conditions]\npreset = \"import\"\n").is_err());
    }

    #[test]
    fn test_unknown_color_is_rejected() {
        assert!(WallpaperConfig::from_toml_str("[output]\nforeground = \"mauve\"\n").is_err());
        assert_eq!(parse_color("WHITE").unwrap(), [255, 255, 255, 255]);
    }
}
