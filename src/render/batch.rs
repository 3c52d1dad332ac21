use log::debug;
use std::collections::BTreeMap;

use crate::map::TileMapData;
use crate::registry::TileSetRegistry;
use crate::tileset::TileUv;

/// Floats per instance in [`Batch::instance_data`]: `gridX, gridY, u, v, w, h`.
pub const INSTANCE_FLOATS: usize = 6;

/// One tile to draw: a grid cell plus the sheet rectangle to sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileInstance {
    /// Column in the map
    pub grid_x: u32,
    /// Row in the map
    pub grid_y: u32,
    /// Layer the cell came from
    pub layer: usize,
    /// Sheet sub-rectangle
    pub uv: TileUv,
}

/// Every instance that samples one sheet, drawn with a single instanced call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    instances: Vec<TileInstance>,
}

impl Batch {
    /// Instances in layer, row, column order.
    pub fn instances(&self) -> &[TileInstance] {
        &self.instances
    }

    /// Number of instances.
    pub fn count(&self) -> usize {
        self.instances.len()
    }

    /// Instance buffer contents, [`INSTANCE_FLOATS`] per instance.
    pub fn instance_data(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.instances.len() * INSTANCE_FLOATS);
        for i in &self.instances {
            out.extend_from_slice(&[
                i.grid_x as f32,
                i.grid_y as f32,
                i.uv.u,
                i.uv.v,
                i.uv.w,
                i.uv.h,
            ]);
        }
        out
    }
}

/// Batches keyed by sheet id. Sheets with nothing to draw have no entry.
pub type BatchMap = BTreeMap<u32, Batch>;

/// Group every drawable cell of `map` by sheet.
///
/// Cells pointing at an unregistered sheet, at a sheet without a decoded
/// image, or past a sheet's last tile are skipped.
pub fn rebuild(map: &TileMapData, registry: &TileSetRegistry) -> BatchMap {
    let mut batches = BatchMap::new();
    let mut skipped = 0usize;

    for (layer_idx, layer) in map.layers().iter().enumerate() {
        for (x, y, tile) in layer.occupied() {
            let Some(uv) = registry.get_tile_uv(tile.tileset_id, tile.tile_index) else {
                skipped += 1;
                continue;
            };
            batches
                .entry(tile.tileset_id)
                .or_default()
                .instances
                .push(TileInstance {
                    grid_x: x,
                    grid_y: y,
                    layer: layer_idx,
                    uv,
                });
        }
    }

    debug!(
        "rebuilt {} batches ({} instances, {} unresolved cells)",
        batches.len(),
        batches.values().map(Batch::count).sum::<usize>(),
        skipped
    );
    batches
}

/// Last built batches plus the revisions they were built from.
#[derive(Debug, Default)]
pub struct BatchCache {
    built_from: Option<(u64, u64)>,
    batches: BatchMap,
}

impl BatchCache {
    /// Empty, dirty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Batches for the given map revision, rebuilt only when the map or the
    /// registry changed since the last call.
    pub fn get(&mut self, map: &TileMapData, map_revision: u64, registry: &TileSetRegistry) -> &BatchMap {
        let key = (map_revision, registry.revision());
        if self.built_from != Some(key) {
            self.batches = rebuild(map, registry);
            self.built_from = Some(key);
        }
        &self.batches
    }

    /// Force a rebuild on the next [`get`](Self::get).
    pub fn invalidate(&mut self) {
        self.built_from = None;
    }

    /// True when the next `get` would rebuild for these revisions.
    pub fn is_stale(&self, map_revision: u64, registry: &TileSetRegistry) -> bool {
        self.built_from != Some((map_revision, registry.revision()))
    }
}
