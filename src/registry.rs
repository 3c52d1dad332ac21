use log::{debug, info};
use std::collections::BTreeMap;

use crate::error::MapError;
use crate::render::texture::{TextureHandle, TextureProvider};
use crate::tileset::{ImageInfo, TileGrid, TileSetDefinition, TileUv};

/// A registered sheet: its definition plus whatever runtime state it has.
#[derive(Debug, Clone)]
pub struct TileSet {
    definition: TileSetDefinition,
    image: Option<ImageInfo>,
    texture: Option<TextureHandle>,
}

impl TileSet {
    /// Persisted description.
    pub fn definition(&self) -> &TileSetDefinition {
        &self.definition
    }

    /// Decoded image dimensions, `None` until the image has been loaded.
    pub fn image(&self) -> Option<ImageInfo> {
        self.image
    }

    /// GPU texture, if one was uploaded.
    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    /// `columns * rows`
    pub fn tile_count(&self) -> u32 {
        self.definition.tile_count()
    }

    /// UV rectangle of a tile; `None` without an image or past the last row.
    pub fn tile_uv(&self, tile_index: u32) -> Option<TileUv> {
        self.definition.tile_uv(self.image?, tile_index)
    }
}

/// Owns every imported tile sheet of one editing session.
///
/// Ids come from a per-registry counter. Every mutation bumps [`revision`],
/// which render caches compare against.
///
/// [`revision`]: TileSetRegistry::revision
#[derive(Debug, Default)]
pub struct TileSetRegistry {
    sets: BTreeMap<u32, TileSet>,
    next_id: u32,
    revision: u64,
}

impl TileSetRegistry {
    /// Empty registry; ids start at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new sheet under a freshly assigned id (ignores `definition.id`).
    ///
    /// Fails only when no id at or above the counter is free.
    pub fn add_tile_set(
        &mut self,
        mut definition: TileSetDefinition,
        image: Option<ImageInfo>,
    ) -> Result<u32, MapError> {
        let id = (self.next_id..=u32::MAX)
            .find(|id| !self.sets.contains_key(id))
            .ok_or(MapError::TileSetIdsExhausted)?;
        self.next_id = id.saturating_add(1);
        definition.id = id;
        self.put(definition, image);
        Ok(id)
    }

    /// Register a sheet keeping `definition.id`; returns the sheet it displaced.
    /// Used when restoring a map so stored tile references stay valid.
    pub fn insert_tile_set(
        &mut self,
        definition: TileSetDefinition,
        image: Option<ImageInfo>,
    ) -> Option<TileSet> {
        self.next_id = self.next_id.max(definition.id.saturating_add(1));
        self.put(definition, image)
    }

    fn put(&mut self, definition: TileSetDefinition, image: Option<ImageInfo>) -> Option<TileSet> {
        info!(
            "tile set {} '{}' registered ({}x{} tiles)",
            definition.id, definition.name, definition.columns, definition.rows
        );
        self.revision += 1;
        self.sets.insert(
            definition.id,
            TileSet {
                definition,
                image,
                texture: None,
            },
        )
    }

    /// Attach an uploaded texture; returns the one it replaced.
    pub fn attach_texture(&mut self, id: u32, handle: TextureHandle) -> Result<Option<TextureHandle>, MapError> {
        let ts = self.sets.get_mut(&id).ok_or(MapError::UnknownTileSet(id))?;
        self.revision += 1;
        Ok(ts.texture.replace(handle))
    }

    /// Look up a sheet.
    pub fn get_tile_set(&self, id: u32) -> Option<&TileSet> {
        self.sets.get(&id)
    }

    /// Drop a sheet and release its texture. Map cells that still reference it
    /// are left alone.
    pub fn remove_tile_set(
        &mut self,
        id: u32,
        textures: &mut dyn TextureProvider,
    ) -> Option<TileSetDefinition> {
        let ts = self.sets.remove(&id)?;
        if let Some(handle) = ts.texture {
            textures.release(handle);
        }
        self.revision += 1;
        info!("tile set {} removed", id);
        Some(ts.definition)
    }

    /// Change a sheet's tile geometry and re-derive `columns`/`rows` from its image.
    pub fn update_grid(&mut self, id: u32, grid: TileGrid) -> Result<(), MapError> {
        let ts = self.sets.get_mut(&id).ok_or(MapError::UnknownTileSet(id))?;
        let image = ts.image.ok_or(MapError::ImageUnavailable(id))?;
        if grid.tile_width == 0 || grid.tile_height == 0 {
            return Err(MapError::InvalidGrid("tile size must be non-zero".into()));
        }
        ts.definition.apply_grid(image, grid);
        debug!(
            "tile set {} regridded to {}x{} tiles",
            id, ts.definition.columns, ts.definition.rows
        );
        self.revision += 1;
        Ok(())
    }

    /// UV rectangle for a tile of a sheet.
    pub fn get_tile_uv(&self, id: u32, tile_index: u32) -> Option<TileUv> {
        self.sets.get(&id)?.tile_uv(tile_index)
    }

    /// Sheets in id order.
    pub fn iter(&self) -> impl Iterator<Item = &TileSet> {
        self.sets.values()
    }

    /// Snapshot of every definition, in id order.
    pub fn definitions(&self) -> Vec<TileSetDefinition> {
        self.sets.values().map(|t| t.definition.clone()).collect()
    }

    /// Number of sheets.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// True when no sheet is registered.
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Remove everything, release textures and reset the id counter.
    pub fn clear(&mut self, textures: &mut dyn TextureProvider) {
        for ts in std::mem::take(&mut self.sets).into_values() {
            if let Some(handle) = ts.texture {
                textures.release(handle);
            }
        }
        self.next_id = 0;
        self.revision += 1;
    }

    /// Bumped on every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}
