//! Capabilities the simulation loop needs from its host: screen size,
//! somewhere to keep the grid between runs, and a way to show images.

use crate::render::GenerationArtifact;
use life_common::{Grid, GridSnapshot, LifeError, SnapshotFormat};
use log::{debug, info, warn};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Supplies the screen size in pixels as `(width, height)`.
pub trait ResolutionProvider: Send {
    fn resolution(&self) -> Result<(u32, u32), LifeError>;
}

/// Keeps the most recent grid between runs.
pub trait SnapshotStore: Send {
    /// The stored grid, or `None` if nothing has been saved yet.
    fn load(&mut self) -> Result<Option<Grid>, LifeError>;
    fn save(&mut self, grid: &Grid, generation: u64) -> Result<(), LifeError>;
}

/// Receives rendered generations, e.g. by setting them as the desktop background.
pub trait ArtifactSink: Send {
    fn apply(&mut self, artifact: &GenerationArtifact) -> Result<(), LifeError>;
    /// Removes a superseded generation's artifact.
    fn discard(&mut self, generation: u64) -> Result<(), LifeError>;
    /// Removes every transient artifact. Called once when a run ends.
    fn cleanup(&mut self) -> Result<(), LifeError>;

    /// Shows the all-dead image left up after a run ends. It is not a
    /// generation and survives `cleanup`.
    fn apply_blank(&mut self, artifact: &GenerationArtifact) -> Result<(), LifeError> {
        self.apply(artifact)
    }
}

/// The adapters one simulation run talks to.
pub struct Platform {
    pub resolution: Box<dyn ResolutionProvider>,
    pub snapshots: Box<dyn SnapshotStore>,
    pub sink: Box<dyn ArtifactSink>,
}

impl Platform {
    pub fn new(
        resolution: impl ResolutionProvider + 'static,
        snapshots: impl SnapshotStore + 'static,
        sink: impl ArtifactSink + 'static,
    ) -> Self {
        Self {
            resolution: Box::new(resolution),
            snapshots: Box::new(snapshots),
            sink: Box::new(sink),
        }
    }
}

/// A resolution known up front, e.g. from the config file.
#[derive(Debug, Clone, Copy)]
pub struct FixedResolution {
    pub width: u32,
    pub height: u32,
}

impl Default for FixedResolution {
    fn default() -> Self {
        FixedResolution { width: 1920, height: 1080 }
    }
}

impl ResolutionProvider for FixedResolution {
    fn resolution(&self) -> Result<(u32, u32), LifeError> {
        Ok((self.width, self.height))
    }
}

/// Stores the grid in a single file.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
    format: SnapshotFormat,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>, format: SnapshotFormat) -> Self {
        Self { path: path.into(), format }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads a snapshot file without going through a store.
    pub fn read_snapshot(path: &Path, format: SnapshotFormat) -> Result<GridSnapshot, LifeError> {
        let file = File::open(path)
            .map_err(|e| LifeError::persistence(format!("failed to open '{}': {}", path.display(), e)))?;
        format.read(BufReader::new(file))
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&mut self) -> Result<Option<Grid>, LifeError> {
        if !self.path.exists() {
            debug!("No snapshot at {}", self.path.display());
            return Ok(None);
        }
        let snapshot = Self::read_snapshot(&self.path, self.format)?;
        let grid = snapshot.to_grid()?;
        info!(
            "Loaded {}x{} grid (generation {}) from {}",
            grid.rows(),
            grid.cols(),
            snapshot.generation,
            self.path.display()
        );
        Ok(Some(grid))
    }

    fn save(&mut self, grid: &Grid, generation: u64) -> Result<(), LifeError> {
        // Write next to the target and rename so a reader never sees half a file.
        let tmp_path = self.path.with_extension("tmp");
        let io_err = |e: std::io::Error| LifeError::persistence(format!("failed to write '{}': {}", tmp_path.display(), e));

        let file = File::create(&tmp_path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        self.format.write(&mut writer, &GridSnapshot::from_grid(grid, generation))?;
        writer.flush().map_err(io_err)?;
        drop(writer);

        fs::rename(&tmp_path, &self.path).map_err(|e| {
            LifeError::persistence(format!("failed to replace '{}': {}", self.path.display(), e))
        })
    }
}

/// Writes each generation as `<prefix>_<generation>.png` into a directory and
/// optionally runs a command that makes it the desktop background. The image
/// shown after a run is `<prefix>_blank.png`.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    directory: PathBuf,
    prefix: String,
    wallpaper_command: Vec<String>,
}

impl DirectorySink {
    pub fn new(directory: impl Into<PathBuf>, prefix: impl Into<String>) -> Result<Self, LifeError> {
        let directory = directory.into();
        fs::create_dir_all(&directory)
            .map_err(|e| LifeError::sink(format!("failed to create '{}': {}", directory.display(), e)))?;
        Ok(Self { directory, prefix: prefix.into(), wallpaper_command: Vec::new() })
    }

    /// Program and arguments run after each image is written. `{path}` in any
    /// argument is replaced by the image path.
    pub fn with_wallpaper_command(mut self, command: Vec<String>) -> Self {
        self.wallpaper_command = command;
        self
    }

    pub fn artifact_path(&self, generation: u64) -> PathBuf {
        self.directory.join(format!("{}_{}.png", self.prefix, generation))
    }

    pub fn blank_path(&self) -> PathBuf {
        self.directory.join(format!("{}_blank.png", self.prefix))
    }

    fn owns(&self, file_name: &str) -> bool {
        file_name
            .strip_prefix(&self.prefix)
            .and_then(|rest| rest.strip_prefix('_'))
            .is_some_and(|rest| rest.ends_with(".png"))
    }

    fn set_wallpaper(&self, path: &Path) -> Result<(), LifeError> {
        let Some((program, args)) = self.wallpaper_command.split_first() else {
            return Ok(());
        };
        let path_str = path.to_string_lossy();
        let args: Vec<String> = args.iter().map(|arg| arg.replace("{path}", &path_str)).collect();

        let status = Command::new(program)
            .args(&args)
            .status()
            .map_err(|e| LifeError::sink(format!("failed to run '{}': {}", program, e)))?;
        if !status.success() {
            return Err(LifeError::sink(format!("'{}' exited with {}", program, status)));
        }
        Ok(())
    }
}

impl ArtifactSink for DirectorySink {
    fn apply(&mut self, artifact: &GenerationArtifact) -> Result<(), LifeError> {
        let path = self.artifact_path(artifact.generation);
        artifact.save_png(&path)?;
        self.set_wallpaper(&path)
    }

    fn discard(&mut self, generation: u64) -> Result<(), LifeError> {
        let path = self.artifact_path(generation);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LifeError::sink(format!("failed to remove '{}': {}", path.display(), e))),
        }
    }

    fn cleanup(&mut self) -> Result<(), LifeError> {
        let entries = fs::read_dir(&self.directory)
            .map_err(|e| LifeError::sink(format!("failed to list '{}': {}", self.directory.display(), e)))?;

        let mut removed = 0;
        let mut failures = Vec::new();
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    warn!("Error reading {}: {}", self.directory.display(), e);
                    failures.push(format!("{}: {}", self.directory.display(), e));
                    continue;
                }
            };
            if !path.file_name().and_then(|n| n.to_str()).is_some_and(|n| self.owns(n)) {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => {
                    warn!("Error deleting {}: {}", path.display(), e);
                    failures.push(format!("{}: {}", path.display(), e));
                }
            }
        }
        info!("Removed {} image(s) from {}", removed, self.directory.display());

        if failures.is_empty() {
            Ok(())
        } else {
            Err(LifeError::sink(format!("cleanup left {} file(s) behind: {}", failures.len(), failures.join("; "))))
        }
    }

    fn apply_blank(&mut self, artifact: &GenerationArtifact) -> Result<(), LifeError> {
        let path = self.blank_path();
        artifact.save_png(&path)?;
        self.set_wallpaper(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("life-wallpaper-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_snapshot_store_save_then_load() {
        let dir = scratch_dir("store");
        let mut store = FileSnapshotStore::new(dir.join("grid.bin"), SnapshotFormat::Bincode);
        assert!(store.load().unwrap().is_none());

        let grid = Grid::from_pattern(".#.\n#.#").unwrap();
        store.save(&grid, 3).unwrap();
        assert_eq!(store.load().unwrap(), Some(grid));
        assert!(!dir.join("grid.tmp").exists());

        let snapshot = FileSnapshotStore::read_snapshot(store.path(), SnapshotFormat::Bincode).unwrap();
        assert_eq!(snapshot.generation, 3);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_corrupt_snapshot_is_a_persistence_error() {
        let dir = scratch_dir("corrupt");
        let path = dir.join("grid.json");
        fs::write(&path, b"{\"rows\": 2").unwrap();
        let mut store = FileSnapshotStore::new(&path, SnapshotFormat::Json);
        assert!(matches!(store.load(), Err(LifeError::Persistence(_))));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_directory_sink_writes_discards_and_cleans_only_its_files() {
        let dir = scratch_dir("sink");
        let unrelated = dir.join("notes.txt");
        fs::write(&unrelated, b"keep me").unwrap();

        let mut sink = DirectorySink::new(&dir, "gol").unwrap();
        let grid = Grid::from_pattern("#.\n.#").unwrap();
        for generation in 1..=2 {
            sink.apply(&render(&grid, 2, generation).unwrap()).unwrap();
        }
        assert!(sink.artifact_path(1).exists());
        assert!(sink.artifact_path(2).exists());

        sink.discard(1).unwrap();
        assert!(!sink.artifact_path(1).exists());
        // Already gone is fine.
        sink.discard(1).unwrap();

        sink.cleanup().unwrap();
        assert!(!sink.artifact_path(2).exists());
        assert!(unrelated.exists());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_cleanup_reports_files_it_could_not_remove() {
        let dir = scratch_dir("cleanup-failure");
        let mut sink = DirectorySink::new(&dir, "gol").unwrap();
        sink.apply(&render(&Grid::dead(1, 1).unwrap(), 1, 4).unwrap()).unwrap();
        // Matches the artifact naming but cannot be removed as a file.
        fs::create_dir(dir.join("gol_9.png")).unwrap();

        match sink.cleanup() {
            Err(LifeError::Sink(msg)) => assert!(msg.contains("gol_9.png"), "{}", msg),
            other => panic!("expected a sink error, got {:?}", other),
        }
        // Everything else was still removed.
        assert!(!sink.artifact_path(4).exists());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_blank_image_has_its_own_name_and_survives_cleanup() {
        let dir = scratch_dir("blank");
        let mut sink = DirectorySink::new(&dir, "gol").unwrap();
        let grid = Grid::dead(2, 2).unwrap();
        sink.apply(&render(&grid, 1, 0).unwrap()).unwrap();
        sink.cleanup().unwrap();
        sink.apply_blank(&render(&grid, 1, 0).unwrap()).unwrap();

        assert!(!sink.artifact_path(0).exists());
        assert!(sink.blank_path().exists());
        // The next run's cleanup takes it down.
        sink.cleanup().unwrap();
        assert!(!sink.blank_path().exists());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_written_image_has_grid_dimensions() {
        let dir = scratch_dir("png");
        let mut sink = DirectorySink::new(&dir, "gol").unwrap();
        sink.apply(&render(&Grid::dead(3, 4).unwrap(), 5, 0).unwrap()).unwrap();
        let decoded = image::open(sink.artifact_path(0)).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (20, 15));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_failing_wallpaper_command_is_a_sink_error() {
        let dir = scratch_dir("command");
        let mut sink = DirectorySink::new(&dir, "gol")
            .unwrap()
            .with_wallpaper_command(vec!["/nonexistent/set-wallpaper".to_string(), "{path}".to_string()]);
        let result = sink.apply(&render(&Grid::dead(1, 1).unwrap(), 1, 0).unwrap());
        assert!(matches!(result, Err(LifeError::Sink(_))));
        fs::remove_dir_all(&dir).unwrap();
    }
}
