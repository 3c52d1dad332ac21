use log::debug;
use serde::Serialize;

use crate::error::MapError;
use crate::layer::{MapLayer, TileRef};
use crate::tileset::TileSetDefinition;

/// Version string written into new maps and exports.
pub const FORMAT_VERSION: &str = "1.0.0";
/// Name of the layer every new map starts with.
pub const DEFAULT_LAYER_NAME: &str = "Layer 1";

/// The map aggregate: sheets plus a stack of same-sized layers.
///
/// Invariants: there is always at least one layer, and every layer is exactly
/// `width x height` cells. Only `resize` changes the dimensions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TileMapData {
    /// Format version
    pub version: String,
    width: u32,
    height: u32,
    /// Nominal on-screen cell width in pixels
    pub tile_width: u32,
    /// Nominal on-screen cell height in pixels
    pub tile_height: u32,
    /// Sheets referenced by this map
    pub tile_sets: Vec<TileSetDefinition>,
    layers: Vec<MapLayer>,
}

impl TileMapData {
    /// New map with one empty default layer and no sheets.
    pub fn create_empty(width: u32, height: u32, tile_width: u32, tile_height: u32) -> Self {
        Self {
            version: FORMAT_VERSION.to_owned(),
            width,
            height,
            tile_width,
            tile_height,
            tile_sets: Vec::new(),
            layers: vec![MapLayer::new(DEFAULT_LAYER_NAME, width, height)],
        }
    }

    /// Assemble a map from decoded parts, checking the layer invariants.
    pub fn from_parts(
        version: String,
        width: u32,
        height: u32,
        tile_width: u32,
        tile_height: u32,
        tile_sets: Vec<TileSetDefinition>,
        layers: Vec<MapLayer>,
    ) -> Result<Self, MapError> {
        if layers.is_empty() {
            return Err(MapError::NoLayer);
        }
        for l in &layers {
            if l.width() != width || l.height() != height {
                return Err(MapError::InvalidLayerSize {
                    layer: l.name.clone(),
                    expected: width as usize * height as usize,
                    actual: l.cells().len(),
                });
            }
        }
        Ok(Self {
            version,
            width,
            height,
            tile_width,
            tile_height,
            tile_sets,
            layers,
        })
    }

    /// Width in cells.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in cells.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Layers bottom to top.
    pub fn layers(&self) -> &[MapLayer] {
        &self.layers
    }

    /// Layer by index.
    pub fn layer(&self, index: usize) -> Option<&MapLayer> {
        self.layers.get(index)
    }

    /// Mutable layer by index (name, visibility, opacity and cells; never size).
    pub fn layer_mut(&mut self, index: usize) -> Option<&mut MapLayer> {
        self.layers.get_mut(index)
    }

    /// Append an empty layer; returns its index.
    pub fn add_layer(&mut self, name: impl Into<String>) -> usize {
        self.layers.push(MapLayer::new(name, self.width, self.height));
        self.layers.len() - 1
    }

    /// Remove a layer. The last remaining layer cannot be removed.
    pub fn remove_layer(&mut self, index: usize) -> Option<MapLayer> {
        if self.layers.len() <= 1 || index >= self.layers.len() {
            return None;
        }
        Some(self.layers.remove(index))
    }

    /// True when `(x, y)` is a cell of this map.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    /// Tile at a cell of a layer.
    pub fn get_tile(&self, layer_index: usize, x: i32, y: i32) -> Option<TileRef> {
        self.layers.get(layer_index)?.get(x, y)
    }

    /// Write one cell. An unknown layer or out-of-range cell leaves the map
    /// untouched. Returns true when a cell actually changed.
    pub fn set_tile(&mut self, layer_index: usize, x: i32, y: i32, tile: Option<TileRef>) -> bool {
        match self.layers.get_mut(layer_index) {
            Some(layer) => layer.set(x, y, tile),
            None => false,
        }
    }

    /// Change the map dimensions. Cells at indices inside both the old and new
    /// size keep their value; new cells are empty.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == self.width && height == self.height {
            return;
        }
        debug!(
            "resizing map {}x{} -> {}x{}",
            self.width, self.height, width, height
        );
        self.layers = self.layers.iter().map(|l| l.resized(width, height)).collect();
        self.width = width;
        self.height = height;
    }

    /// Grow towards +x/+y so that `(x, y)` is inside the map, without exceeding
    /// `max_dimension` on either axis. Returns true if the map grew.
    pub fn grow_to_include(&mut self, x: i32, y: i32, max_dimension: u32) -> bool {
        if x < 0 || y < 0 {
            return false;
        }
        let need_w = self.width.max(x as u32 + 1);
        let need_h = self.height.max(y as u32 + 1);
        if (need_w, need_h) == (self.width, self.height) {
            return false;
        }
        if need_w > max_dimension || need_h > max_dimension {
            return false;
        }
        self.resize(need_w, need_h);
        true
    }

    /// Size in bytes of the uncompressed JSON form of the map.
    pub fn data_size(&self) -> usize {
        serde_json::to_vec(self).map(|v| v.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_map_has_default_layer() {
        let map = TileMapData::create_empty(4, 3, 32, 32);
        assert_eq!(map.version, FORMAT_VERSION);
        assert_eq!(map.layers().len(), 1);
        assert_eq!(map.layers()[0].name, DEFAULT_LAYER_NAME);
        assert_eq!(map.layers()[0].cells().len(), 12);
        assert!(map.tile_sets.is_empty());
    }

    #[test]
    fn add_layer_matches_map_size() {
        let mut map = TileMapData::create_empty(4, 3, 32, 32);
        map.resize(5, 2);
        let idx = map.add_layer("fg");
        assert_eq!(idx, 1);
        let l = map.layer(idx).expect("fg");
        assert_eq!((l.width(), l.height()), (5, 2));
        assert!(l.visible);
        assert_eq!(l.opacity, 1.0);
    }

    #[test]
    fn set_tile_is_idempotent() {
        let mut map = TileMapData::create_empty(4, 4, 16, 16);
        let t = Some(TileRef::new(0, 7));
        assert!(map.set_tile(0, 1, 2, t));
        let once = map.clone();
        assert!(!map.set_tile(0, 1, 2, t));
        assert_eq!(map, once);
        assert_eq!(map.get_tile(0, 1, 2), t);
    }

    #[test]
    fn out_of_range_set_tile_leaves_map_equal() {
        let mut map = TileMapData::create_empty(4, 4, 16, 16);
        map.set_tile(0, 0, 0, Some(TileRef::new(0, 1)));
        let before = map.clone();

        let t = Some(TileRef::new(0, 2));
        assert!(!map.set_tile(1, 0, 0, t));
        assert!(!map.set_tile(0, 4, 0, t));
        assert!(!map.set_tile(0, 0, -1, t));
        assert_eq!(map, before);
    }

    #[test]
    fn resize_preserves_cells_in_every_layer() {
        let mut map = TileMapData::create_empty(3, 3, 16, 16);
        map.add_layer("fg");
        map.set_tile(0, 2, 2, Some(TileRef::new(0, 1)));
        map.set_tile(1, 0, 1, Some(TileRef::new(1, 1)));

        map.resize(6, 6);
        assert_eq!((map.width(), map.height()), (6, 6));
        assert_eq!(map.get_tile(0, 2, 2), Some(TileRef::new(0, 1)));
        assert_eq!(map.get_tile(1, 0, 1), Some(TileRef::new(1, 1)));
        assert_eq!(map.get_tile(0, 5, 5), None);

        map.resize(2, 2);
        assert_eq!(map.get_tile(0, 2, 2), None);
        assert_eq!(map.get_tile(1, 0, 1), Some(TileRef::new(1, 1)));
        assert!(map.layers().iter().all(|l| l.cells().len() == 4));
    }

    #[test]
    fn grow_to_include_respects_limit_and_direction() {
        let mut map = TileMapData::create_empty(2, 2, 16, 16);
        assert!(map.grow_to_include(4, 1, 8));
        assert_eq!((map.width(), map.height()), (5, 2));
        assert!(!map.grow_to_include(1, 1, 8));
        assert!(!map.grow_to_include(-1, 3, 8));
        assert!(!map.grow_to_include(0, 8, 8));
        assert_eq!((map.width(), map.height()), (5, 2));
    }

    #[test]
    fn last_layer_cannot_be_removed() {
        let mut map = TileMapData::create_empty(2, 2, 16, 16);
        assert!(map.remove_layer(0).is_none());
        map.add_layer("fg");
        assert_eq!(map.remove_layer(0).expect("removed").name, DEFAULT_LAYER_NAME);
        assert_eq!(map.layers().len(), 1);
    }

    #[test]
    fn from_parts_requires_layers() {
        let err = TileMapData::from_parts("1.0.0".into(), 1, 1, 8, 8, vec![], vec![]).unwrap_err();
        assert!(matches!(err, MapError::NoLayer));
    }

    #[test]
    fn data_size_grows_with_content() {
        let small = TileMapData::create_empty(2, 2, 16, 16);
        let large = TileMapData::create_empty(20, 20, 16, 16);
        assert!(small.data_size() > 0);
        assert!(large.data_size() > small.data_size());
    }
}
