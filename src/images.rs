//! Image fetch/decode collaborator.
//!
//! The core never touches pixels beyond reading dimensions; decoded RGBA is only
//! handed through to a [`TextureProvider`](crate::TextureProvider).

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use image::{GenericImageView, ImageFormat};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::MapError;
use crate::tileset::{ImageInfo, ImageSource};

/// A decoded tile-sheet bitmap.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Tightly packed RGBA8 pixels
    pub rgba: Vec<u8>,
}

impl DecodedImage {
    /// Dimensions only.
    pub fn info(&self) -> ImageInfo {
        ImageInfo::new(self.width, self.height)
    }
}

/// Decode PNG/JPEG/GIF/BMP bytes into RGBA8.
pub fn decode_image(bytes: &[u8]) -> Result<DecodedImage, MapError> {
    let img = image::load_from_memory(bytes)?;
    let (width, height) = img.dimensions();
    Ok(DecodedImage {
        width,
        height,
        rgba: img.to_rgba8().into_raw(),
    })
}

/// Resolves image references to bytes and decodes them.
pub trait ImageLoader {
    /// Fetch the encoded bytes behind `url`.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, MapError>;

    /// Decode encoded bytes.
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, MapError> {
        decode_image(bytes)
    }

    /// Fetch (if external) and decode a sheet's image.
    fn load(&self, source: &ImageSource) -> Result<DecodedImage, MapError> {
        match source {
            ImageSource::Inline(bytes) => self.decode(bytes),
            ImageSource::External(url) => self.decode(&self.fetch(url)?),
        }
    }
}

/// Loads images from disk, relative to a base directory (usually the map's
/// directory). `data:` URLs are decoded in place.
#[derive(Debug, Clone)]
pub struct FileImageLoader {
    base_dir: PathBuf,
}

impl FileImageLoader {
    /// Resolve relative paths against `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Directory relative paths are resolved against.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Point at a new directory, e.g. after loading a map from elsewhere.
    pub fn set_base_dir(&mut self, base_dir: impl Into<PathBuf>) {
        self.base_dir = base_dir.into();
    }
}

impl Default for FileImageLoader {
    fn default() -> Self {
        Self::new("./")
    }
}

impl ImageLoader for FileImageLoader {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, MapError> {
        if url.starts_with("data:") {
            return parse_data_url(url);
        }
        if url.is_empty() {
            return Err(MapError::ImageFetch {
                url: url.to_owned(),
                reason: "empty image reference".into(),
            });
        }
        let rel = url.strip_prefix("file://").unwrap_or(url);
        let path = self.base_dir.join(rel);
        std::fs::read(&path).map_err(|source| MapError::Io { path, source })
    }
}

/// In-memory image store keyed by URL; handy for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryImageLoader {
    images: HashMap<String, Vec<u8>>,
}

impl MemoryImageLoader {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register encoded bytes under `url`.
    pub fn insert(&mut self, url: impl Into<String>, bytes: Vec<u8>) {
        self.images.insert(url.into(), bytes);
    }

    /// Forget `url`.
    pub fn remove(&mut self, url: &str) -> Option<Vec<u8>> {
        self.images.remove(url)
    }
}

impl ImageLoader for MemoryImageLoader {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, MapError> {
        if url.starts_with("data:") {
            return parse_data_url(url);
        }
        self.images
            .get(url)
            .cloned()
            .ok_or_else(|| MapError::ImageFetch {
                url: url.to_owned(),
                reason: "not found".into(),
            })
    }
}

fn mime_for(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => "image/png",
        Ok(ImageFormat::Jpeg) => "image/jpeg",
        Ok(ImageFormat::Gif) => "image/gif",
        Ok(ImageFormat::Bmp) => "image/bmp",
        Ok(ImageFormat::WebP) => "image/webp",
        _ => "application/octet-stream",
    }
}

/// `data:<mime>;base64,<payload>`
pub fn to_data_url(bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_for(bytes), BASE64_STANDARD.encode(bytes))
}

/// Accepts a base64 data URL or a bare base64 payload.
pub fn parse_data_url(text: &str) -> Result<Vec<u8>, MapError> {
    let payload = match text.strip_prefix("data:") {
        Some(rest) => {
            let (meta, data) = rest
                .split_once(',')
                .ok_or_else(|| MapError::InvalidImageData("data URL without ','".into()))?;
            if !meta.ends_with(";base64") {
                return Err(MapError::InvalidImageData(format!(
                    "data URL is not base64 encoded: {meta}"
                )));
            }
            data
        }
        None => text,
    };

    BASE64_STANDARD
        .decode(payload.trim())
        .map_err(|e| MapError::InvalidImageData(e.to_string()))
}
