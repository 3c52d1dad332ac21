#![warn(missing_docs)]

//! Layered tile-map editing core for Macroquad.
//!
//! A [`TileMapData`] holds grid layers of [`TileRef`]s into sheets owned by a
//! [`TileSetRegistry`]. Maps export to a compact JSON form whose layers are
//! run-length encoded tile strings, and render as one instanced batch per
//! sheet. [`Editor`] ties the pieces into one editing session.

mod config;
mod editor;
mod error;
mod images;
mod layer;
mod loader {
    pub mod json_loader;
    pub mod rle;
}
mod map;
mod meta_tile;
mod registry;
mod render {
    pub mod batch;
    pub mod cull;
    pub mod draw;
    pub mod texture;
}
mod tileset;
mod view;

pub use config::EditorConfig;
pub use editor::{Editor, ImportReport};
pub use error::MapError;
pub use images::{
    decode_image, parse_data_url, to_data_url, DecodedImage, FileImageLoader, ImageLoader,
    MemoryImageLoader,
};
pub use layer::{MapLayer, TileRef};
pub use loader::json_loader::{compressed_size, decode_map, encode_map, MAX_DOCUMENT_CELLS};
pub use loader::rle::{decode_cells, encode_cells};
pub use map::{TileMapData, DEFAULT_LAYER_NAME, FORMAT_VERSION};
pub use meta_tile::{erase_meta_tile, paint_meta_tile, MetaTile, MetaTileManager};
pub use registry::{TileSet, TileSetRegistry};
pub use render::batch::{rebuild as rebuild_batches, Batch, BatchCache, BatchMap, TileInstance, INSTANCE_FLOATS};
pub use render::cull::{visible_cell_range, CellRange};
pub use render::draw::draw_batches;
pub use render::texture::{MacroquadTextures, NoTextures, TextureHandle, TextureProvider};
pub use tileset::{
    grid_extent, manual_grid, GridDetectionResult, ImageInfo, ImageSource, TileGrid, TileSetDefinition,
    TileUv,
};
pub use view::{
    clamp_zoom, pan_by_screen_delta, screen_to_grid, screen_to_world, world_to_grid, world_to_screen,
    zoom_around_point, GridPos, ViewTransform, Viewport, MAX_ZOOM, MIN_ZOOM,
};
