//! Screen / world / grid transforms.
//!
//! `ViewTransform::{x, y}` is the world point shown at the center of the
//! viewport. Screen and world Y both grow downward.

use macroquad::prelude::*;

/// Smallest zoom factor (10%).
pub const MIN_ZOOM: f32 = 0.1;
/// Largest zoom factor (500%).
pub const MAX_ZOOM: f32 = 5.0;

/// Pan and zoom of the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    /// World x at the viewport center
    pub x: f32,
    /// World y at the viewport center
    pub y: f32,
    /// Screen pixels per world unit
    pub zoom: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

impl ViewTransform {
    /// View centered on `(x, y)`; `zoom` is clamped.
    pub fn new(x: f32, y: f32, zoom: f32) -> Self {
        Self {
            x,
            y,
            zoom: clamp_zoom(zoom),
        }
    }

    /// Center as a vector.
    pub fn center(&self) -> Vec2 {
        vec2(self.x, self.y)
    }
}

/// Viewport size in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Width in pixels
    pub width: f32,
    /// Height in pixels
    pub height: f32,
}

impl Viewport {
    /// Viewport of the given size.
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Half the viewport, i.e. the screen position of the view center.
    pub fn half(&self) -> Vec2 {
        vec2(self.width * 0.5, self.height * 0.5)
    }
}

/// A cell address. May be negative or past the map; callers bounds-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridPos {
    /// Column
    pub col: i32,
    /// Row
    pub row: i32,
}

/// Clamp into `[MIN_ZOOM, MAX_ZOOM]`; NaN and non-positive values become `MIN_ZOOM`.
pub fn clamp_zoom(zoom: f32) -> f32 {
    if zoom.is_nan() || zoom <= 0.0 {
        return MIN_ZOOM;
    }
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

/// Viewport pixel to world units.
pub fn screen_to_world(screen: Vec2, view: &ViewTransform, viewport: Viewport) -> Vec2 {
    (screen - viewport.half()) / view.zoom + view.center()
}

/// World units to viewport pixel. Inverse of [`screen_to_world`].
pub fn world_to_screen(world: Vec2, view: &ViewTransform, viewport: Viewport) -> Vec2 {
    (world - view.center()) * view.zoom + viewport.half()
}

/// Cell containing a world point. No bounds checking.
pub fn world_to_grid(world: Vec2, cell_width: f32, cell_height: f32) -> GridPos {
    GridPos {
        col: (world.x / cell_width).floor() as i32,
        row: (world.y / cell_height).floor() as i32,
    }
}

/// Cell under a viewport pixel.
pub fn screen_to_grid(
    screen: Vec2,
    view: &ViewTransform,
    viewport: Viewport,
    cell_width: f32,
    cell_height: f32,
) -> GridPos {
    world_to_grid(screen_to_world(screen, view, viewport), cell_width, cell_height)
}

/// Change zoom while keeping the world point under `screen` fixed on screen.
pub fn zoom_around_point(
    view: &ViewTransform,
    viewport: Viewport,
    screen: Vec2,
    new_zoom: f32,
) -> ViewTransform {
    let anchor = screen_to_world(screen, view, viewport);
    let zoom = clamp_zoom(new_zoom);
    let center = anchor - (screen - viewport.half()) / zoom;
    ViewTransform {
        x: center.x,
        y: center.y,
        zoom,
    }
}

/// Move the view by a screen-space drag so the content follows the pointer.
pub fn pan_by_screen_delta(view: &ViewTransform, delta: Vec2) -> ViewTransform {
    ViewTransform {
        x: view.x - delta.x / view.zoom,
        y: view.y - delta.y / view.zoom,
        zoom: view.zoom,
    }
}
