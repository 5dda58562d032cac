use crate::error::LifeError;
use crate::grid::{Cell, Grid};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

/// On-disk form of a grid, tagged with the generation it was taken at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSnapshot {
    /// Generation index of the stored grid.
    pub generation: u64,
    pub rows: u32,
    pub cols: u32,
    /// Row-major cell states, 0 for dead and 1 for alive.
    pub cells: Vec<u8>,
}

impl GridSnapshot {
    pub fn from_grid(grid: &Grid, generation: u64) -> Self {
        Self {
            generation,
            rows: grid.rows() as u32,
            cols: grid.cols() as u32,
            cells: grid.cells().iter().map(|cell| cell.weight()).collect(),
        }
    }

    /// Rebuilds the grid, rejecting malformed cell data.
    pub fn to_grid(&self) -> Result<Grid, LifeError> {
        let cells = self
            .cells
            .iter()
            .map(|&value| match value {
                0 => Ok(Cell::Dead),
                1 => Ok(Cell::Alive),
                other => Err(LifeError::persistence(format!("invalid cell value {} in snapshot", other))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Grid::from_cells(self.rows as usize, self.cols as usize, cells)
            .map_err(|e| LifeError::persistence(format!("corrupt snapshot: {}", e)))
    }
}

/// Serialization used for stored snapshots.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    #[default]
    Bincode,
    Json,
    MessagePack,
}

impl SnapshotFormat {
    /// Guesses the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "bin" | "bincode" => Some(SnapshotFormat::Bincode),
            "json" => Some(SnapshotFormat::Json),
            "msgpack" | "mp" => Some(SnapshotFormat::MessagePack),
            _ => None,
        }
    }

    pub fn write<W: Write>(self, mut writer: W, snapshot: &GridSnapshot) -> Result<(), LifeError> {
        match self {
            SnapshotFormat::Bincode => bincode::serialize_into(writer, snapshot)
                .map_err(|e| LifeError::persistence(format!("bincode encode: {}", e))),
            SnapshotFormat::Json => serde_json::to_writer(writer, snapshot)
                .map_err(|e| LifeError::persistence(format!("json encode: {}", e))),
            SnapshotFormat::MessagePack => rmp_serde::encode::write(&mut writer, snapshot)
                .map_err(|e| LifeError::persistence(format!("messagepack encode: {}", e))),
        }
    }

    pub fn read<R: Read>(self, reader: R) -> Result<GridSnapshot, LifeError> {
        match self {
            SnapshotFormat::Bincode => bincode::deserialize_from(reader)
                .map_err(|e| LifeError::persistence(format!("bincode decode: {}", e))),
            SnapshotFormat::Json => serde_json::from_reader(reader)
                .map_err(|e| LifeError::persistence(format!("json decode: {}", e))),
            SnapshotFormat::MessagePack => rmp_serde::decode::from_read(reader)
                .map_err(|e| LifeError::persistence(format!("messagepack decode: {}", e))),
        }
    }
}
