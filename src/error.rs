use std::{io, path::PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Errors produced by the tile-map core.
///
/// Painting, erasing and resizing never fail (out-of-range writes are no-ops);
/// this type covers the operations with an all-or-nothing contract: import,
/// export, tile-sheet registration and meta-tile creation.
#[derive(Debug, Error)]
pub enum MapError {
    /// File I/O error
    #[error("I/O error for {path}: {source}")]
    Io {
        /// File that could not be read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
    /// The document is not valid JSON or does not have the expected shape
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Only `.json` files are supported
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
    /// A map document with no layers
    #[error("No layers found in map document")]
    NoLayer,
    /// Structurally invalid map document
    #[error("Invalid map: {0}")]
    InvalidMap(String),
    /// A layer's expanded tile-string does not hold `width * height` cells
    #[error("Invalid layer size for layer '{layer}': expected {expected} cells, got {actual}")]
    InvalidLayerSize {
        /// Layer name
        layer: String,
        /// `width * height`
        expected: usize,
        /// Cells found (or reached before giving up)
        actual: usize,
    },
    /// A run in a tile-string is not `token` or `count*token`
    #[error("Malformed run '{run}' in layer '{layer}'")]
    InvalidRun {
        /// Layer name
        layer: String,
        /// Offending run text
        run: String,
    },
    /// A token is neither `e` nor `tileset:index`
    #[error("Malformed tile token '{token}' in layer '{layer}'")]
    InvalidToken {
        /// Layer name
        layer: String,
        /// Offending token text
        token: String,
    },
    /// A serialized tile set carries neither inline data nor a URL
    #[error("Tile set {id} has no image source")]
    MissingImageSource {
        /// Tile set id
        id: u32,
    },
    /// Inline image payload is not valid base64 / data URL
    #[error("Invalid inline image data: {0}")]
    InvalidImageData(String),
    /// The image bytes could not be decoded
    #[error("Failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),
    /// The image could not be fetched
    #[error("Failed to fetch image '{url}': {reason}")]
    ImageFetch {
        /// Requested location
        url: String,
        /// What went wrong
        reason: String,
    },
    /// No tile set registered under this id
    #[error("Unknown tile set {0}")]
    UnknownTileSet(u32),
    /// The tile set is registered but its image dimensions are unknown
    #[error("Tile set {0} has no decoded image")]
    ImageUnavailable(u32),
    /// Every tile set id is taken
    #[error("No free tile set id left")]
    TileSetIdsExhausted,
    /// Tile geometry that yields no usable tiles
    #[error("Invalid tile grid: {0}")]
    InvalidGrid(String),
    /// Meta-tile selection is not a filled rectangle
    #[error("Selection is not a filled rectangle: {0}")]
    NonRectangularSelection(String),
    /// No meta-tile with this id
    #[error("Unknown meta-tile {0}")]
    UnknownMetaTile(Uuid),
    /// The texture provider refused an upload
    #[error("Texture upload failed: {0}")]
    Texture(String),
}
