use macroquad::prelude::*;

use crate::map::TileMapData;
use crate::registry::TileSetRegistry;
use crate::render::batch::BatchMap;
use crate::render::cull::visible_cell_range;
use crate::render::texture::MacroquadTextures;
use crate::view::{world_to_screen, ViewTransform, Viewport};

/// Draw every batch with macroquad, one texture bind per sheet.
///
/// Instances on hidden layers or outside the viewport are skipped; layer
/// opacity becomes the tint alpha. Sheets without a live texture are skipped.
pub fn draw_batches(
    batches: &BatchMap,
    map: &TileMapData,
    registry: &TileSetRegistry,
    textures: &MacroquadTextures,
    view: &ViewTransform,
    viewport: Viewport,
) {
    let cell_w = map.tile_width as f32;
    let cell_h = map.tile_height as f32;
    let visible = visible_cell_range(view, viewport, cell_w, cell_h);
    let dest = vec2(cell_w * view.zoom, cell_h * view.zoom);

    for (&tileset_id, batch) in batches {
        let Some(tex) = registry
            .get_tile_set(tileset_id)
            .and_then(|ts| ts.texture())
            .and_then(|h| textures.get(h))
        else {
            continue;
        };
        let (tw, th) = (tex.width(), tex.height());

        for inst in batch.instances() {
            let Some(layer) = map.layer(inst.layer) else {
                continue;
            };
            if !layer.visible || !visible.contains(inst.grid_x as i32, inst.grid_y as i32) {
                continue;
            }

            let world = vec2(inst.grid_x as f32 * cell_w, inst.grid_y as f32 * cell_h);
            let screen = world_to_screen(world, view, viewport);

            draw_texture_ex(
                tex,
                screen.x,
                screen.y,
                Color::new(1.0, 1.0, 1.0, layer.opacity),
                DrawTextureParams {
                    dest_size: Some(dest),
                    source: Some(Rect::new(
                        inst.uv.u * tw,
                        inst.uv.v * th,
                        inst.uv.w * tw,
                        inst.uv.h * th,
                    )),
                    ..Default::default()
                },
            );
        }
    }
}
