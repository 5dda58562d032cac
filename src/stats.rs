use crate::simulation::StatusEvent;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::path::Path;

#[derive(Debug, Serialize)]
struct StatsRow {
    generation: u64,
    live_cells: usize,
}

/// Appends one `generation,live_cells` row per generation event to a CSV file.
pub struct StatsWriter {
    writer: csv::Writer<File>,
    rows: usize,
}

impl StatsWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create stats file '{}'", path.display()))?;
        Ok(Self { writer, rows: 0 })
    }

    /// Records generation events; other events are ignored.
    pub fn record(&mut self, event: &StatusEvent) -> Result<()> {
        if let StatusEvent::Generation { generation, live_cells } = *event {
            self.writer.serialize(StatsRow { generation, live_cells })?;
            self.rows += 1;
        }
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush stats file")
    }
}
