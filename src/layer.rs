use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::error::MapError;

/// A reference to one tile of one sheet. `None` in a cell means empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TileRef {
    /// Sheet id in the [`TileSetRegistry`](crate::TileSetRegistry)
    pub tileset_id: u32,
    /// Row-major index within the sheet
    pub tile_index: u32,
}

impl TileRef {
    /// Tile `tile_index` of sheet `tileset_id`.
    pub const fn new(tileset_id: u32, tile_index: u32) -> Self {
        Self {
            tileset_id,
            tile_index,
        }
    }
}

/// One grid of optional tile references, stored row-major (`row * width + col`).
#[derive(Debug, Clone, PartialEq)]
pub struct MapLayer {
    /// Display name
    pub name: String,
    /// Hidden layers keep their data but are not drawn
    pub visible: bool,
    /// 0..=1
    pub opacity: f32,
    width: u32,
    height: u32,
    tiles: Vec<Option<TileRef>>,
}

impl MapLayer {
    /// All-empty layer.
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            visible: true,
            opacity: 1.0,
            width,
            height,
            tiles: vec![None; width as usize * height as usize],
        }
    }

    /// Build from a flat row-major cell list; the length must be `width * height`.
    pub fn from_cells(
        name: impl Into<String>,
        width: u32,
        height: u32,
        cells: Vec<Option<TileRef>>,
    ) -> Result<Self, MapError> {
        let name = name.into();
        let expected = width as usize * height as usize;
        if cells.len() != expected {
            return Err(MapError::InvalidLayerSize {
                layer: name,
                expected,
                actual: cells.len(),
            });
        }
        Ok(Self {
            name,
            visible: true,
            opacity: 1.0,
            width,
            height,
            tiles: cells,
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

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    /// Tile at `(x, y)`; `None` when empty or out of range.
    pub fn get(&self, x: i32, y: i32) -> Option<TileRef> {
        self.index(x, y).and_then(|i| self.tiles[i])
    }

    /// Write one cell. Returns true when the cell changed; out of range is a no-op.
    pub fn set(&mut self, x: i32, y: i32, tile: Option<TileRef>) -> bool {
        match self.index(x, y) {
            Some(i) if self.tiles[i] != tile => {
                self.tiles[i] = tile;
                true
            }
            _ => false,
        }
    }

    /// Flat row-major cells.
    pub fn cells(&self) -> &[Option<TileRef>] {
        &self.tiles
    }

    /// Rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Option<TileRef>]> {
        // chunks() rejects 0; a zero-width layer has no cells anyway
        self.tiles.chunks(self.width.max(1) as usize)
    }

    /// `(x, y, tile)` for every non-empty cell, row-major.
    pub fn occupied(&self) -> impl Iterator<Item = (u32, u32, TileRef)> + '_ {
        let w = self.width.max(1);
        self.tiles.iter().enumerate().filter_map(move |(i, t)| {
            t.map(|tile| ((i as u32) % w, (i as u32) / w, tile))
        })
    }

    /// Copy of this layer at new dimensions. Cells inside both the old and the
    /// new bounds keep their value, the rest are empty.
    pub fn resized(&self, width: u32, height: u32) -> MapLayer {
        let mut tiles = vec![None; width as usize * height as usize];
        let keep_w = self.width.min(width) as usize;
        for y in 0..self.height.min(height) as usize {
            let src = y * self.width as usize;
            let dst = y * width as usize;
            tiles[dst..dst + keep_w].copy_from_slice(&self.tiles[src..src + keep_w]);
        }
        MapLayer {
            name: self.name.clone(),
            visible: self.visible,
            opacity: self.opacity,
            width,
            height,
            tiles,
        }
    }
}

impl Serialize for MapLayer {
    // Plain JSON view (tiles as nested rows); the export format lives in `loader`.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("MapLayer", 4)?;
        s.serialize_field("name", &self.name)?;
        s.serialize_field("visible", &self.visible)?;
        s.serialize_field("opacity", &self.opacity)?;
        s.serialize_field("tiles", &self.rows().collect::<Vec<_>>())?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_layer_is_empty() {
        let layer = MapLayer::new("bg", 3, 2);
        assert_eq!(layer.cells().len(), 6);
        assert!(layer.cells().iter().all(Option::is_none));
        assert_eq!(layer.rows().count(), 2);
    }

    #[test]
    fn set_reports_changes_and_ignores_out_of_range() {
        let mut layer = MapLayer::new("bg", 3, 2);
        let t = TileRef::new(1, 4);

        assert!(layer.set(2, 1, Some(t)));
        assert!(!layer.set(2, 1, Some(t)));
        assert_eq!(layer.get(2, 1), Some(t));
        assert_eq!(layer.cells()[5], Some(t));

        assert!(!layer.set(3, 0, Some(t)));
        assert!(!layer.set(-1, 0, Some(t)));
        assert!(!layer.set(0, 2, Some(t)));
        assert_eq!(layer.get(-1, 0), None);
    }

    #[test]
    fn resize_keeps_overlap() {
        let mut layer = MapLayer::new("bg", 3, 3);
        layer.set(0, 0, Some(TileRef::new(0, 1)));
        layer.set(2, 2, Some(TileRef::new(0, 2)));
        layer.set(1, 0, Some(TileRef::new(0, 3)));

        let grown = layer.resized(5, 4);
        assert_eq!(grown.get(0, 0), Some(TileRef::new(0, 1)));
        assert_eq!(grown.get(2, 2), Some(TileRef::new(0, 2)));
        assert_eq!(grown.get(1, 0), Some(TileRef::new(0, 3)));
        assert_eq!(grown.occupied().count(), 3);

        let shrunk = layer.resized(2, 1);
        assert_eq!(shrunk.cells(), &[Some(TileRef::new(0, 1)), Some(TileRef::new(0, 3))]);
    }

    #[test]
    fn from_cells_checks_length() {
        let err = MapLayer::from_cells("oops", 2, 2, vec![None; 3]).unwrap_err();
        assert!(matches!(err, MapError::InvalidLayerSize { layer, expected: 4, actual: 3 } if layer == "oops"));
    }

    #[test]
    fn occupied_walks_row_major() {
        let mut layer = MapLayer::new("bg", 2, 2);
        layer.set(1, 1, Some(TileRef::new(2, 0)));
        layer.set(1, 0, Some(TileRef::new(1, 0)));
        let seen: Vec<_> = layer.occupied().map(|(x, y, _)| (x, y)).collect();
        assert_eq!(seen, vec![(1, 0), (1, 1)]);
    }
}
