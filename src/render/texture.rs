use macroquad::prelude::*;
use std::collections::HashMap;

use crate::error::MapError;
use crate::images::DecodedImage;

/// Opaque handle to a GPU texture owned by a [`TextureProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// GPU resource collaborator: turns decoded bitmaps into textures and frees them.
pub trait TextureProvider {
    /// Upload `image` and return a handle to it.
    fn upload(&mut self, image: &DecodedImage) -> Result<TextureHandle, MapError>;
    /// Free the texture behind `handle`. Unknown handles are ignored.
    fn release(&mut self, handle: TextureHandle);
}

/// Headless provider: hands out handles, holds no GPU state.
#[derive(Debug, Default)]
pub struct NoTextures {
    next: u32,
    live: usize,
}

impl NoTextures {
    /// Handles issued and not yet released.
    pub fn live(&self) -> usize {
        self.live
    }
}

impl TextureProvider for NoTextures {
    fn upload(&mut self, _image: &DecodedImage) -> Result<TextureHandle, MapError> {
        let h = TextureHandle(self.next);
        self.next += 1;
        self.live += 1;
        Ok(h)
    }

    fn release(&mut self, _handle: TextureHandle) {
        self.live = self.live.saturating_sub(1);
    }
}

/// Macroquad-backed provider. Needs a live macroquad context.
#[derive(Default)]
pub struct MacroquadTextures {
    textures: HashMap<TextureHandle, Texture2D>,
    next: u32,
}

impl MacroquadTextures {
    /// Empty texture table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Texture behind `handle`, if still alive.
    pub fn get(&self, handle: TextureHandle) -> Option<&Texture2D> {
        self.textures.get(&handle)
    }
}

impl TextureProvider for MacroquadTextures {
    fn upload(&mut self, image: &DecodedImage) -> Result<TextureHandle, MapError> {
        let (w, h) = (
            u16::try_from(image.width).map_err(|_| MapError::Texture(format!("width {} exceeds u16", image.width)))?,
            u16::try_from(image.height).map_err(|_| MapError::Texture(format!("height {} exceeds u16", image.height)))?,
        );
        if image.rgba.len() != w as usize * h as usize * 4 {
            return Err(MapError::Texture("RGBA buffer does not match dimensions".into()));
        }

        let tex = Texture2D::from_rgba8(w, h, &image.rgba);
        tex.set_filter(FilterMode::Nearest);

        let handle = TextureHandle(self.next);
        self.next += 1;
        self.textures.insert(handle, tex);
        Ok(handle)
    }

    fn release(&mut self, handle: TextureHandle) {
        // Texture2D frees its GL object on drop
        self.textures.remove(&handle);
    }
}
