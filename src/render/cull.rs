use macroquad::prelude::*;

use crate::view::{screen_to_world, world_to_grid, ViewTransform, Viewport};

const CULL_MARGIN_CELLS: i32 = 1;

/// Inclusive range of cells, possibly extending past the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    /// First column
    pub min_col: i32,
    /// First row
    pub min_row: i32,
    /// Last column
    pub max_col: i32,
    /// Last row
    pub max_row: i32,
}

impl CellRange {
    /// True when `(col, row)` is inside the range.
    #[inline]
    pub fn contains(&self, col: i32, row: i32) -> bool {
        col >= self.min_col && col <= self.max_col && row >= self.min_row && row <= self.max_row
    }
}

/// Cells covered by the viewport, padded by one cell on every side.
pub fn visible_cell_range(
    view: &ViewTransform,
    viewport: Viewport,
    cell_width: f32,
    cell_height: f32,
) -> CellRange {
    let a = world_to_grid(screen_to_world(Vec2::ZERO, view, viewport), cell_width, cell_height);
    let b = world_to_grid(
        screen_to_world(vec2(viewport.width, viewport.height), view, viewport),
        cell_width,
        cell_height,
    );

    let (mut cx_min, mut cx_max) = (a.col, b.col);
    let (mut cy_min, mut cy_max) = (a.row, b.row);
    if cx_min > cx_max {
        std::mem::swap(&mut cx_min, &mut cx_max);
    }
    if cy_min > cy_max {
        std::mem::swap(&mut cy_min, &mut cy_max);
    }

    CellRange {
        min_col: cx_min - CULL_MARGIN_CELLS,
        min_row: cy_min - CULL_MARGIN_CELLS,
        max_col: cx_max + CULL_MARGIN_CELLS,
        max_row: cy_max + CULL_MARGIN_CELLS,
    }
}
