use image::{ImageBuffer, ImageFormat, Rgba, RgbaImage};
use life_common::{Grid, LifeError};
use std::path::Path;

/// Opaque white, used for live cells unless configured otherwise.
pub const DEFAULT_FOREGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
/// Opaque black, used for dead cells unless configured otherwise.
pub const DEFAULT_BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// The rendered image of one generation.
#[derive(Debug, Clone)]
pub struct GenerationArtifact {
    /// Generation index this image shows. Metadata only.
    pub generation: u64,
    pub image: RgbaImage,
}

impl GenerationArtifact {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Writes the image as PNG.
    pub fn save_png(&self, path: &Path) -> Result<(), LifeError> {
        self.image
            .save_with_format(path, ImageFormat::Png)
            .map_err(|e| LifeError::render(format!("failed to write '{}': {}", path.display(), e)))
    }
}

/// Turns grids into images, one `cell_size x cell_size` block per cell.
#[derive(Debug, Clone, Copy)]
pub struct Rasterizer {
    cell_size: u32,
    foreground: Rgba<u8>,
    background: Rgba<u8>,
}

impl Rasterizer {
    pub fn new(cell_size: u32) -> Result<Self, LifeError> {
        if cell_size < 1 {
            return Err(LifeError::config("cell size must be at least 1 pixel"));
        }
        Ok(Self { cell_size, foreground: DEFAULT_FOREGROUND, background: DEFAULT_BACKGROUND })
    }

    pub fn with_colors(mut self, foreground: [u8; 4], background: [u8; 4]) -> Self {
        self.foreground = Rgba(foreground);
        self.background = Rgba(background);
        self
    }

    /// Image size in pixels for a grid of the given shape.
    pub fn image_size(&self, rows: usize, cols: usize) -> Result<(u32, u32), LifeError> {
        let scale = |cells: usize| {
            u32::try_from(cells)
                .ok()
                .and_then(|n| n.checked_mul(self.cell_size))
                .ok_or_else(|| LifeError::render(format!("{} cells of {}px exceed the image size limit", cells, self.cell_size)))
        };
        Ok((scale(cols)?, scale(rows)?))
    }

    pub fn render(&self, grid: &Grid, generation: u64) -> Result<GenerationArtifact, LifeError> {
        let (width, height) = self.image_size(grid.rows(), grid.cols())?;
        let mut image = ImageBuffer::from_pixel(width, height, self.background);

        let k = self.cell_size;
        for (row, col) in grid.live_cells() {
            let (x0, y0) = (col as u32 * k, row as u32 * k);
            for y in y0..y0 + k {
                for x in x0..x0 + k {
                    image.put_pixel(x, y, self.foreground);
                }
            }
        }

        Ok(GenerationArtifact { generation, image })
    }
}

/// Renders with the default white-on-black colors.
pub fn render(grid: &Grid, cell_size: u32, generation: u64) -> Result<GenerationArtifact, LifeError> {
    Rasterizer::new(cell_size)?.render(grid, generation)
}
