use log::{info, warn};
use macroquad::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use uuid::Uuid;

use crate::config::EditorConfig;
use crate::error::MapError;
use crate::images::ImageLoader;
use crate::layer::TileRef;
use crate::loader::json_loader::{compressed_size, decode_map, encode_map};
use crate::map::TileMapData;
use crate::meta_tile::{self, MetaTileManager};
use crate::registry::TileSetRegistry;
use crate::render::batch::{BatchCache, BatchMap};
use crate::render::draw::draw_batches;
use crate::render::texture::{MacroquadTextures, TextureProvider};
use crate::tileset::{ImageSource, TileGrid, TileSetDefinition};
use crate::view::{pan_by_screen_delta, screen_to_grid, zoom_around_point, GridPos, ViewTransform, Viewport};

/// Outcome of a successful [`Editor::import`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Sheets registered from the document
    pub tile_sets: usize,
    /// Sheets whose image could not be loaded or uploaded; they are registered
    /// without an image and their cells are not drawn
    pub unavailable_images: Vec<u32>,
}

/// One editing session: the map, its sheets, meta-tiles and the canvas view.
///
/// Every map mutation bumps a revision counter; [`batches`](Self::batches)
/// rebuilds only when that counter or the registry's has moved.
pub struct Editor<T: TextureProvider> {
    config: EditorConfig,
    map: TileMapData,
    registry: TileSetRegistry,
    meta_tiles: MetaTileManager,
    textures: T,
    loader: Box<dyn ImageLoader>,
    view: ViewTransform,
    viewport: Viewport,
    map_revision: u64,
    batches: BatchCache,
}

impl<T: TextureProvider> Editor<T> {
    /// Fresh session with an empty map sized from `config`.
    pub fn new(config: EditorConfig, textures: T, loader: Box<dyn ImageLoader>) -> Self {
        let map = TileMapData::create_empty(
            config.map_width,
            config.map_height,
            config.tile_width,
            config.tile_height,
        );
        Self {
            config,
            map,
            registry: TileSetRegistry::new(),
            meta_tiles: MetaTileManager::new(),
            textures,
            loader,
            view: ViewTransform::default(),
            viewport: Viewport::new(800.0, 600.0),
            map_revision: 0,
            batches: BatchCache::new(),
        }
    }

    /// Session settings.
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// The map being edited.
    pub fn map(&self) -> &TileMapData {
        &self.map
    }

    /// Registered sheets.
    pub fn registry(&self) -> &TileSetRegistry {
        &self.registry
    }

    /// Meta-tiles of this session.
    pub fn meta_tiles(&self) -> &MetaTileManager {
        &self.meta_tiles
    }

    /// The texture provider.
    pub fn textures(&self) -> &T {
        &self.textures
    }

    /// Swap the image source used by sheet import, map import and export.
    pub fn set_loader(&mut self, loader: Box<dyn ImageLoader>) {
        self.loader = loader;
    }

    /// Bumped on every change to the map.
    pub fn map_revision(&self) -> u64 {
        self.map_revision
    }

    fn touch(&mut self) {
        self.map_revision += 1;
    }

    // Keeps the map's existing sheet order (document order after an import);
    // sheets new to the map are appended in id order.
    fn sync_tile_sets(&mut self) {
        let mut seen = BTreeSet::new();
        let mut defs: Vec<TileSetDefinition> = self
            .map
            .tile_sets
            .iter()
            .filter(|d| seen.insert(d.id))
            .filter_map(|d| self.registry.get_tile_set(d.id))
            .map(|ts| ts.definition().clone())
            .collect();
        defs.extend(
            self.registry
                .iter()
                .filter(|ts| !seen.contains(&ts.definition().id))
                .map(|ts| ts.definition().clone()),
        );
        self.map.tile_sets = defs;
        self.touch();
    }

    // ---- map & layers ----

    /// Replace the map with an empty one. Registered sheets are kept.
    pub fn new_map(&mut self, width: u32, height: u32, tile_width: u32, tile_height: u32) {
        self.map = TileMapData::create_empty(width, height, tile_width, tile_height);
        info!("new {}x{} map", width, height);
        self.sync_tile_sets();
    }

    /// Append an empty layer; returns its index.
    pub fn add_layer(&mut self, name: impl Into<String>) -> usize {
        let idx = self.map.add_layer(name);
        self.touch();
        idx
    }

    /// Remove a layer. The last remaining layer cannot be removed.
    pub fn remove_layer(&mut self, index: usize) -> bool {
        let removed = self.map.remove_layer(index).is_some();
        if removed {
            self.touch();
        }
        removed
    }

    /// Show or hide a layer.
    pub fn set_layer_visible(&mut self, index: usize, visible: bool) -> bool {
        self.edit_layer(index, |l| l.visible = visible)
    }

    /// Opacity is clamped to `[0, 1]`; NaN is ignored.
    pub fn set_layer_opacity(&mut self, index: usize, opacity: f32) -> bool {
        if opacity.is_nan() {
            return false;
        }
        self.edit_layer(index, |l| l.opacity = opacity.clamp(0.0, 1.0))
    }

    /// Rename a layer.
    pub fn rename_layer(&mut self, index: usize, name: impl Into<String>) -> bool {
        let name = name.into();
        self.edit_layer(index, |l| l.name = name)
    }

    fn edit_layer(&mut self, index: usize, f: impl FnOnce(&mut crate::layer::MapLayer)) -> bool {
        let Some(layer) = self.map.layer_mut(index) else {
            return false;
        };
        f(layer);
        self.touch();
        true
    }

    /// Paint one cell. Out-of-range cells are ignored unless growing on paint
    /// is enabled and the cell lies right of or below the map.
    pub fn paint(&mut self, layer: usize, x: i32, y: i32, tile: TileRef) -> bool {
        let mut changed = false;
        if self.config.grow_on_paint && layer < self.map.layers().len() {
            changed |= self.map.grow_to_include(x, y, self.config.max_map_dimension);
        }
        changed |= self.map.set_tile(layer, x, y, Some(tile));
        if changed {
            self.touch();
        }
        changed
    }

    /// Clear one cell. Never grows the map.
    pub fn erase(&mut self, layer: usize, x: i32, y: i32) -> bool {
        let changed = self.map.set_tile(layer, x, y, None);
        if changed {
            self.touch();
        }
        changed
    }

    /// Resize every layer, keeping cells at matching indices.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.map.resize(width, height);
        self.touch();
    }

    // ---- tile sheets ----

    /// Load, measure and register a sheet image; returns the new sheet id.
    ///
    /// Decode or upload failures leave the registry untouched.
    pub fn import_tile_set(
        &mut self,
        name: impl Into<String>,
        image: ImageSource,
        grid: TileGrid,
    ) -> Result<u32, MapError> {
        if grid.tile_width == 0 || grid.tile_height == 0 {
            return Err(MapError::InvalidGrid("tile size must be non-zero".into()));
        }
        let decoded = self.loader.load(&image)?;
        let info = decoded.info();

        let mut definition = TileSetDefinition {
            id: 0,
            name: name.into(),
            image,
            tile_width: grid.tile_width,
            tile_height: grid.tile_height,
            columns: 0,
            rows: 0,
            spacing: grid.spacing,
            margin: grid.margin,
        };
        definition.apply_grid(info, grid);
        if definition.tile_count() == 0 {
            return Err(MapError::InvalidGrid(format!(
                "{}x{} image holds no {}x{} tile",
                info.width, info.height, grid.tile_width, grid.tile_height
            )));
        }

        let handle = self.textures.upload(&decoded)?;
        let id = match self.registry.add_tile_set(definition, Some(info)) {
            Ok(id) => id,
            Err(e) => {
                self.textures.release(handle);
                return Err(e);
            }
        };
        self.registry.attach_texture(id, handle)?;
        self.sync_tile_sets();
        Ok(id)
    }

    /// Change a sheet's tile geometry; columns and rows are re-derived.
    pub fn update_tile_set_grid(&mut self, id: u32, grid: TileGrid) -> Result<(), MapError> {
        self.registry.update_grid(id, grid)?;
        self.sync_tile_sets();
        Ok(())
    }

    /// Drop a sheet, its texture and the meta-tiles cut from it. Cells that
    /// reference it are kept and simply stop drawing.
    pub fn remove_tile_set(&mut self, id: u32) -> Option<TileSetDefinition> {
        let removed = self.registry.remove_tile_set(id, &mut self.textures)?;
        let dropped = self.meta_tiles.remove_for_sheet(id);
        if dropped > 0 {
            info!("{} meta-tiles of tile set {} dropped", dropped, id);
        }
        self.sync_tile_sets();
        Some(removed)
    }

    // ---- meta-tiles ----

    fn columns_of(&self, sheet_id: u32) -> Result<u32, MapError> {
        self.registry
            .get_tile_set(sheet_id)
            .map(|ts| ts.definition().columns)
            .ok_or(MapError::UnknownTileSet(sheet_id))
    }

    /// Turn a rectangular selection of sheet tiles into a meta-tile.
    pub fn create_meta_tile(
        &mut self,
        sheet_id: u32,
        selection: impl IntoIterator<Item = u32>,
    ) -> Result<Uuid, MapError> {
        let columns = self.columns_of(sheet_id)?;
        let meta = self
            .meta_tiles
            .create_from_selection(sheet_id, selection, columns)?;
        info!(
            "meta-tile {} created ({}x{} from tile set {})",
            meta.id, meta.span_cols, meta.span_rows, sheet_id
        );
        Ok(meta.id)
    }

    /// Stamp a meta-tile with its top-left cell at `(x, y)`.
    pub fn paint_meta_tile(&mut self, id: Uuid, layer: usize, x: i32, y: i32) -> Result<bool, MapError> {
        let meta = self.meta_tiles.get(id).ok_or(MapError::UnknownMetaTile(id))?;
        let columns = self.columns_of(meta.sheet_id)?;
        let grow = self.config.grow_on_paint.then_some(self.config.max_map_dimension);
        let changed = meta_tile::paint_meta_tile(&mut self.map, layer, x, y, meta, columns, grow);
        if changed {
            self.touch();
        }
        Ok(changed)
    }

    /// Clear a meta-tile's footprint at `(x, y)`.
    pub fn erase_meta_tile(&mut self, id: Uuid, layer: usize, x: i32, y: i32) -> Result<bool, MapError> {
        let meta = self.meta_tiles.get(id).ok_or(MapError::UnknownMetaTile(id))?;
        let changed = meta_tile::erase_meta_tile(&mut self.map, layer, x, y, meta);
        if changed {
            self.touch();
        }
        Ok(changed)
    }

    /// Forget a meta-tile. Painted cells stay.
    pub fn delete_meta_tile(&mut self, id: Uuid) -> bool {
        self.meta_tiles.delete(id).is_some()
    }

    // ---- rendering ----

    /// Current per-sheet batches, rebuilt if anything changed since the last call.
    pub fn batches(&mut self) -> &BatchMap {
        self.batches.get(&self.map, self.map_revision, &self.registry)
    }

    // ---- persistence ----

    /// Serialize the map. With `include_images`, external sheet images are
    /// embedded where the loader can fetch them.
    pub fn export(&self, include_images: bool) -> Result<String, MapError> {
        let inline = include_images.then_some(&*self.loader);
        encode_map(&self.map, inline)
    }

    /// Replace the session with a serialized map.
    ///
    /// A malformed document leaves the current map, sheets and textures as
    /// they were. Sheet images that fail to load are reported, not fatal.
    pub fn import(&mut self, json: &str) -> Result<ImportReport, MapError> {
        let map = decode_map(json)?;

        let mut registry = TileSetRegistry::new();
        let mut report = ImportReport::default();
        for def in &map.tile_sets {
            let id = def.id;
            let decoded = match self.loader.load(&def.image) {
                Ok(d) => Some(d),
                Err(e) => {
                    warn!("Image for tile set {} '{}' unavailable: {}", id, def.name, e);
                    None
                }
            };
            if let Some(old) = registry.insert_tile_set(def.clone(), decoded.as_ref().map(|d| d.info())) {
                warn!("Duplicate tile set id {} in document; keeping the last one", id);
                if let Some(h) = old.texture() {
                    self.textures.release(h);
                }
            }
            match decoded.map(|d| self.textures.upload(&d)) {
                Some(Ok(handle)) => {
                    registry.attach_texture(id, handle)?;
                }
                Some(Err(e)) => {
                    warn!("Texture upload for tile set {} failed: {}", id, e);
                    report.unavailable_images.push(id);
                }
                None => report.unavailable_images.push(id),
            }
        }
        report.tile_sets = registry.len();
        report.unavailable_images.sort_unstable();
        report.unavailable_images.dedup();

        self.registry.clear(&mut self.textures);
        self.registry = registry;
        self.meta_tiles.clear();
        self.map = map;
        self.sync_tile_sets();
        self.batches.invalidate();

        info!(
            "imported {}x{} map ({} layers, {} tile sets, {} without image)",
            self.map.width(),
            self.map.height(),
            self.map.layers().len(),
            report.tile_sets,
            report.unavailable_images.len()
        );
        Ok(report)
    }

    /// Export to a `.json` file, inlining images per the config.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), MapError> {
        let path = ensure_json(path.as_ref())?;
        let txt = self.export(self.config.inline_images_on_export)?;
        fs::write(path, txt).map_err(|e| MapError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Import a `.json` map file.
    pub fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<ImportReport, MapError> {
        let path = ensure_json(path.as_ref())?;
        let txt = fs::read_to_string(path).map_err(|e| MapError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.import(&txt)
    }

    /// Size of the map as uncompressed JSON.
    pub fn data_size(&self) -> usize {
        self.map.data_size()
    }

    /// Size of the RLE export without inline images.
    pub fn compressed_size(&self) -> usize {
        compressed_size(&self.map)
    }

    // ---- view ----

    /// Current pan and zoom.
    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    /// Replace the view; zoom is clamped.
    pub fn set_view(&mut self, view: ViewTransform) {
        self.view = ViewTransform::new(view.x, view.y, view.zoom);
    }

    /// Canvas size in pixels.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Update the canvas size after a window resize.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Drag the canvas by a screen-space delta.
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.view = pan_by_screen_delta(&self.view, vec2(dx, dy));
    }

    /// Zoom to `zoom` keeping the point under `screen` still.
    pub fn zoom_at(&mut self, screen: Vec2, zoom: f32) {
        self.view = zoom_around_point(&self.view, self.viewport, screen, zoom);
    }

    /// Cell under a viewport pixel, or `None` outside the map.
    pub fn screen_to_cell(&self, screen: Vec2) -> Option<GridPos> {
        let pos = screen_to_grid(
            screen,
            &self.view,
            self.viewport,
            self.map.tile_width as f32,
            self.map.tile_height as f32,
        );
        self.map.contains(pos.col, pos.row).then_some(pos)
    }
}

impl Editor<MacroquadTextures> {
    /// Draw the map with macroquad. Call once per frame.
    pub fn draw(&mut self) {
        let batches = self.batches.get(&self.map, self.map_revision, &self.registry);
        draw_batches(
            batches,
            &self.map,
            &self.registry,
            &self.textures,
            &self.view,
            self.viewport,
        );
    }
}

fn ensure_json(path: &Path) -> Result<&Path, MapError> {
    if path.extension().and_then(|e| e.to_str()) == Some("json") {
        Ok(path)
    } else {
        Err(MapError::UnsupportedFormat(path.display().to_string()))
    }
}
