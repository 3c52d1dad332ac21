use serde::{Serialize, Serializer};

use crate::images::to_data_url;

/// Where a tile sheet's pixels come from. Exactly one source per sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Encoded image bytes (PNG, JPEG, ...) carried with the map
    Inline(Vec<u8>),
    /// Path or URL resolved through an [`ImageLoader`](crate::ImageLoader)
    External(String),
}

impl Serialize for ImageSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ImageSource::Inline(bytes) => serializer.serialize_str(&to_data_url(bytes)),
            ImageSource::External(url) => serializer.serialize_str(url),
        }
    }
}

/// Pixel dimensions of a decoded tile-sheet image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl ImageInfo {
    /// Dimensions of an image.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Normalized sub-rectangle of a tile inside its sheet, all values in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileUv {
    /// Left edge
    pub u: f32,
    /// Top edge
    pub v: f32,
    /// Width
    pub w: f32,
    /// Height
    pub h: f32,
}

/// A tile sheet: one image cut into a regular grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TileSetDefinition {
    /// Registry id, referenced by [`TileRef::tileset_id`](crate::TileRef)
    pub id: u32,
    /// Display name (usually the file name)
    pub name: String,
    /// Pixel source
    pub image: ImageSource,
    /// Native tile width in pixels
    pub tile_width: u32,
    /// Native tile height in pixels
    pub tile_height: u32,
    /// Tiles per row
    pub columns: u32,
    /// Tiles per column
    pub rows: u32,
    /// Pixels between adjacent tiles
    pub spacing: u32,
    /// Pixels around the whole grid
    pub margin: u32,
}

impl TileSetDefinition {
    /// Number of addressable tiles.
    pub fn tile_count(&self) -> u32 {
        self.columns.saturating_mul(self.rows)
    }

    /// Recompute `columns`/`rows` for new geometry against the sheet's image.
    pub fn apply_grid(&mut self, image: ImageInfo, grid: TileGrid) {
        self.tile_width = grid.tile_width;
        self.tile_height = grid.tile_height;
        self.spacing = grid.spacing;
        self.margin = grid.margin;
        self.columns = grid_extent(image.width, grid.tile_width, grid.spacing, grid.margin);
        self.rows = grid_extent(image.height, grid.tile_height, grid.spacing, grid.margin);
    }

    /// UV rectangle of `tile_index`, or `None` when the index is past the last row.
    pub fn tile_uv(&self, image: ImageInfo, tile_index: u32) -> Option<TileUv> {
        if self.columns == 0 || image.width == 0 || image.height == 0 {
            return None;
        }
        let col = tile_index % self.columns;
        let row = tile_index / self.columns;
        if row >= self.rows {
            return None;
        }

        // geometry comes from documents as-is; widen before adding
        let step_x = (self.tile_width as u64 + self.spacing as u64) as f32;
        let step_y = (self.tile_height as u64 + self.spacing as u64) as f32;
        let x = self.margin as f32 + col as f32 * step_x;
        let y = self.margin as f32 + row as f32 * step_y;
        let (iw, ih) = (image.width as f32, image.height as f32);

        Some(TileUv {
            u: x / iw,
            v: y / ih,
            w: self.tile_width as f32 / iw,
            h: self.tile_height as f32 / ih,
        })
    }
}

/// Tile geometry of a sheet, without the derived row/column counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    /// Tile width in pixels
    pub tile_width: u32,
    /// Tile height in pixels
    pub tile_height: u32,
    /// Pixels between tiles
    pub spacing: u32,
    /// Pixels around the grid
    pub margin: u32,
}

impl TileGrid {
    /// Square-ish grid with no spacing or margin.
    pub fn new(tile_width: u32, tile_height: u32) -> Self {
        Self {
            tile_width,
            tile_height,
            spacing: 0,
            margin: 0,
        }
    }

    /// Same grid with the given spacing and margin.
    pub fn with_spacing(mut self, spacing: u32, margin: u32) -> Self {
        self.spacing = spacing;
        self.margin = margin;
        self
    }
}

/// Grid parameters produced by a detector (or entered by hand), consumed as
/// plain input when importing a sheet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridDetectionResult {
    /// Tile width in pixels
    pub tile_width: u32,
    /// Tile height in pixels
    pub tile_height: u32,
    /// Derived column count
    pub columns: u32,
    /// Derived row count
    pub rows: u32,
    /// Pixels between tiles
    pub spacing: u32,
    /// Pixels around the grid
    pub margin: u32,
    /// 0..=1, informational only
    pub confidence: f32,
}

impl From<GridDetectionResult> for TileGrid {
    fn from(r: GridDetectionResult) -> Self {
        TileGrid {
            tile_width: r.tile_width,
            tile_height: r.tile_height,
            spacing: r.spacing,
            margin: r.margin,
        }
    }
}

/// Grid parameters entered by hand; always full confidence.
pub fn manual_grid(
    image_width: u32,
    image_height: u32,
    tile_width: u32,
    tile_height: u32,
    spacing: u32,
    margin: u32,
) -> GridDetectionResult {
    GridDetectionResult {
        tile_width,
        tile_height,
        columns: grid_extent(image_width, tile_width, spacing, margin),
        rows: grid_extent(image_height, tile_height, spacing, margin),
        spacing,
        margin,
        confidence: 1.0,
    }
}

/// `floor((image - 2*margin + spacing) / (tile + spacing))`, saturating at zero.
pub fn grid_extent(image_dim: u32, tile_dim: u32, spacing: u32, margin: u32) -> u32 {
    if tile_dim == 0 {
        return 0;
    }
    let usable = image_dim as i64 - 2 * margin as i64 + spacing as i64;
    if usable <= 0 {
        return 0;
    }
    (usable / (tile_dim as i64 + spacing as i64)) as u32
}
