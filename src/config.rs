use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::MapError;

/// Editor session settings.
///
/// Every field has a default, so `{}` is a valid config document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Painting past the right/bottom edge grows the map instead of being ignored
    #[serde(default)]
    pub grow_on_paint: bool,
    /// Upper bound for width and height when growing on paint
    #[serde(default = "default_max_dimension")]
    pub max_map_dimension: u32,
    /// Embed external sheet images as data URLs on export
    #[serde(default = "default_true")]
    pub inline_images_on_export: bool,
    /// Width in cells of a new map
    #[serde(default = "default_cells")]
    pub map_width: u32,
    /// Height in cells of a new map
    #[serde(default = "default_cells")]
    pub map_height: u32,
    /// Nominal cell width in pixels
    #[serde(default = "default_cell_px")]
    pub tile_width: u32,
    /// Nominal cell height in pixels
    #[serde(default = "default_cell_px")]
    pub tile_height: u32,
}

fn default_max_dimension() -> u32 {
    1024
}
fn default_true() -> bool {
    true
}
fn default_cells() -> u32 {
    32
}
fn default_cell_px() -> u32 {
    32
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            grow_on_paint: false,
            max_map_dimension: default_max_dimension(),
            inline_images_on_export: true,
            map_width: default_cells(),
            map_height: default_cells(),
            tile_width: default_cell_px(),
            tile_height: default_cell_px(),
        }
    }
}

impl EditorConfig {
    /// Parse a JSON config document.
    pub fn from_json_str(json: &str) -> Result<Self, MapError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a `.json` config file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let path = path.as_ref();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            return Err(MapError::UnsupportedFormat(path.display().to_string()));
        }
        let txt = fs::read_to_string(path).map_err(|e| MapError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json_str(&txt)
    }
}
