use std::collections::BTreeSet;
use uuid::Uuid;

use crate::error::MapError;
use crate::layer::TileRef;
use crate::map::TileMapData;

/// A rectangular block of one sheet's tiles, painted and erased as one brush.
///
/// Painted cells are plain [`TileRef`]s; deleting the meta-tile later does not
/// touch them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaTile {
    /// Unique id
    pub id: Uuid,
    /// Sheet the block comes from
    pub sheet_id: u32,
    /// Top row of the block in the sheet
    pub start_row: u32,
    /// Left column of the block in the sheet
    pub start_col: u32,
    /// Height of the block in tiles
    pub span_rows: u32,
    /// Width of the block in tiles
    pub span_cols: u32,
}

impl MetaTile {
    /// Build from selected tile indices of a sheet with `columns` tiles per row.
    /// The selection must be a filled rectangle.
    pub fn from_selection(
        sheet_id: u32,
        selected: impl IntoIterator<Item = u32>,
        columns: u32,
    ) -> Result<Self, MapError> {
        if columns == 0 {
            return Err(MapError::NonRectangularSelection("sheet has no columns".into()));
        }
        let selected: BTreeSet<u32> = selected.into_iter().collect();
        if selected.is_empty() {
            return Err(MapError::NonRectangularSelection("selection is empty".into()));
        }

        let (mut min_row, mut max_row) = (u32::MAX, 0);
        let (mut min_col, mut max_col) = (u32::MAX, 0);
        for &idx in &selected {
            let (row, col) = (idx / columns, idx % columns);
            min_row = min_row.min(row);
            max_row = max_row.max(row);
            min_col = min_col.min(col);
            max_col = max_col.max(col);
        }

        let span_rows = max_row - min_row + 1;
        let span_cols = max_col - min_col + 1;
        let area = span_rows as u64 * span_cols as u64;
        if selected.len() as u64 != area {
            return Err(MapError::NonRectangularSelection(format!(
                "{} tiles selected, bounding box {}x{} holds {}",
                selected.len(),
                span_cols,
                span_rows,
                area
            )));
        }
        for row in min_row..=max_row {
            for col in min_col..=max_col {
                if !selected.contains(&(row * columns + col)) {
                    return Err(MapError::NonRectangularSelection(format!(
                        "tile at row {row}, column {col} missing"
                    )));
                }
            }
        }

        Ok(Self {
            id: Uuid::new_v4(),
            sheet_id,
            start_row: min_row,
            start_col: min_col,
            span_rows,
            span_cols,
        })
    }

    /// Sheet tile index for offset `(dx, dy)` inside the block.
    pub fn source_index(&self, dx: u32, dy: u32, columns: u32) -> u32 {
        (self.start_row + dy) * columns + (self.start_col + dx)
    }
}

/// Stamp `meta` with its top-left at `(origin_x, origin_y)`.
///
/// With `grow_limit`, the map first grows (towards +x/+y, up to that many
/// cells per axis) to fit the block. Cells still outside the map are skipped.
/// Returns true if anything changed.
pub fn paint_meta_tile(
    map: &mut TileMapData,
    layer_index: usize,
    origin_x: i32,
    origin_y: i32,
    meta: &MetaTile,
    columns: u32,
    grow_limit: Option<u32>,
) -> bool {
    stamp(map, layer_index, origin_x, origin_y, meta, grow_limit, |dx, dy| {
        Some(TileRef::new(meta.sheet_id, meta.source_index(dx, dy, columns)))
    })
}

/// Clear the footprint of `meta` at `(origin_x, origin_y)`.
pub fn erase_meta_tile(
    map: &mut TileMapData,
    layer_index: usize,
    origin_x: i32,
    origin_y: i32,
    meta: &MetaTile,
) -> bool {
    stamp(map, layer_index, origin_x, origin_y, meta, None, |_, _| None)
}

fn stamp(
    map: &mut TileMapData,
    layer_index: usize,
    origin_x: i32,
    origin_y: i32,
    meta: &MetaTile,
    grow_limit: Option<u32>,
    tile_at: impl Fn(u32, u32) -> Option<TileRef>,
) -> bool {
    if layer_index >= map.layers().len() {
        return false;
    }
    let mut changed = false;
    if let Some(limit) = grow_limit {
        let far_x = origin_x.saturating_add(meta.span_cols as i32 - 1);
        let far_y = origin_y.saturating_add(meta.span_rows as i32 - 1);
        changed |= map.grow_to_include(far_x, far_y, limit);
    }

    for dy in 0..meta.span_rows {
        for dx in 0..meta.span_cols {
            let x = origin_x.saturating_add(dx as i32);
            let y = origin_y.saturating_add(dy as i32);
            changed |= map.set_tile(layer_index, x, y, tile_at(dx, dy));
        }
    }
    changed
}

/// The meta-tiles defined in a session.
#[derive(Debug, Default)]
pub struct MetaTileManager {
    tiles: Vec<MetaTile>,
}

impl MetaTileManager {
    /// No meta-tiles.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a selection and store the resulting meta-tile.
    pub fn create_from_selection(
        &mut self,
        sheet_id: u32,
        selected: impl IntoIterator<Item = u32>,
        columns: u32,
    ) -> Result<&MetaTile, MapError> {
        let meta = MetaTile::from_selection(sheet_id, selected, columns)?;
        self.tiles.push(meta);
        Ok(&self.tiles[self.tiles.len() - 1])
    }

    /// Look up by id.
    pub fn get(&self, id: Uuid) -> Option<&MetaTile> {
        self.tiles.iter().find(|m| m.id == id)
    }

    /// Remove by id. Already painted cells stay as they are.
    pub fn delete(&mut self, id: Uuid) -> Option<MetaTile> {
        let pos = self.tiles.iter().position(|m| m.id == id)?;
        Some(self.tiles.remove(pos))
    }

    /// Drop every meta-tile cut from `sheet_id`; returns how many went.
    pub fn remove_for_sheet(&mut self, sheet_id: u32) -> usize {
        let before = self.tiles.len();
        self.tiles.retain(|m| m.sheet_id != sheet_id);
        before - self.tiles.len()
    }

    /// In creation order.
    pub fn iter(&self) -> impl Iterator<Item = &MetaTile> {
        self.tiles.iter()
    }

    /// Count.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// True when there are none.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Forget all meta-tiles.
    pub fn clear(&mut self) {
        self.tiles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_by_two_block_is_accepted() {
        let meta = MetaTile::from_selection(3, [0, 1, 4, 5], 4).expect("rectangle");
        assert_eq!(meta.sheet_id, 3);
        assert_eq!((meta.start_row, meta.start_col), (0, 0));
        assert_eq!((meta.span_rows, meta.span_cols), (2, 2));
    }

    #[test]
    fn offset_block_and_single_tile() {
        let meta = MetaTile::from_selection(0, [6, 7, 10, 11, 14, 15], 4).expect("rectangle");
        assert_eq!((meta.start_row, meta.start_col), (1, 2));
        assert_eq!((meta.span_rows, meta.span_cols), (3, 2));

        let one = MetaTile::from_selection(0, [9], 4).expect("single");
        assert_eq!((one.span_rows, one.span_cols), (1, 1));
    }

    #[test]
    fn gaps_and_l_shapes_are_rejected() {
        for sel in [vec![0, 2], vec![0, 1, 4], vec![0, 5], vec![]] {
            let err = MetaTile::from_selection(0, sel, 4).unwrap_err();
            assert!(matches!(err, MapError::NonRectangularSelection(_)));
        }
        assert!(MetaTile::from_selection(0, [0], 0).is_err());
    }

    #[test]
    fn duplicates_do_not_count_twice() {
        let meta = MetaTile::from_selection(0, [0, 0, 1, 1], 4).expect("1x2 strip");
        assert_eq!((meta.span_rows, meta.span_cols), (1, 2));
    }

    #[test]
    fn paint_writes_block_with_source_indices() {
        let meta = MetaTile::from_selection(2, [5, 6, 9, 10], 4).expect("rectangle");
        let mut map = TileMapData::create_empty(5, 5, 16, 16);

        assert!(paint_meta_tile(&mut map, 0, 1, 2, &meta, 4, None));
        assert_eq!(map.get_tile(0, 1, 2), Some(TileRef::new(2, 5)));
        assert_eq!(map.get_tile(0, 2, 2), Some(TileRef::new(2, 6)));
        assert_eq!(map.get_tile(0, 1, 3), Some(TileRef::new(2, 9)));
        assert_eq!(map.get_tile(0, 2, 3), Some(TileRef::new(2, 10)));
        assert_eq!(map.layers()[0].occupied().count(), 4);

        assert!(erase_meta_tile(&mut map, 0, 1, 2, &meta));
        assert_eq!(map.layers()[0].occupied().count(), 0);
    }

    #[test]
    fn paint_clips_without_grow_and_grows_with_it() {
        let meta = MetaTile::from_selection(0, [0, 1, 4, 5], 4).expect("rectangle");

        let mut clipped = TileMapData::create_empty(3, 3, 16, 16);
        paint_meta_tile(&mut clipped, 0, 2, 2, &meta, 4, None);
        assert_eq!((clipped.width(), clipped.height()), (3, 3));
        assert_eq!(clipped.layers()[0].occupied().count(), 1);

        let mut grown = TileMapData::create_empty(3, 3, 16, 16);
        paint_meta_tile(&mut grown, 0, 2, 2, &meta, 4, Some(64));
        assert_eq!((grown.width(), grown.height()), (4, 4));
        assert_eq!(grown.get_tile(0, 3, 3), Some(TileRef::new(0, 5)));
    }

    #[test]
    fn bad_layer_is_a_no_op() {
        let meta = MetaTile::from_selection(0, [0], 4).expect("single");
        let mut map = TileMapData::create_empty(3, 3, 16, 16);
        let before = map.clone();
        assert!(!paint_meta_tile(&mut map, 4, 0, 0, &meta, 4, Some(64)));
        assert_eq!(map, before);
    }

    #[test]
    fn manager_create_delete_and_sheet_cleanup() {
        let mut mgr = MetaTileManager::new();
        let a = mgr.create_from_selection(1, [0, 1], 4).expect("a").id;
        let b = mgr.create_from_selection(2, [0], 4).expect("b").id;
        mgr.create_from_selection(1, [4], 4).expect("c");
        assert!(mgr.create_from_selection(1, [0, 2], 4).is_err());
        assert_eq!(mgr.len(), 3);

        assert_eq!(mgr.delete(a).expect("deleted").sheet_id, 1);
        assert!(mgr.get(a).is_none());
        assert_eq!(mgr.remove_for_sheet(1), 1);
        assert_eq!(mgr.iter().map(|m| m.id).collect::<Vec<_>>(), vec![b]);
    }
}
