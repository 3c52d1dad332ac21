// src/loader/json_loader.rs
use crate::error::MapError;
use crate::images::{parse_data_url, to_data_url, ImageLoader};
use crate::layer::MapLayer;
use crate::loader::rle::{decode_cells, encode_cells};
use crate::map::TileMapData;
use crate::tileset::{ImageSource, TileSetDefinition};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Largest number of cells, summed over all layers, a document may expand to.
pub const MAX_DOCUMENT_CELLS: u64 = 1 << 24;

// Short keys are what older exports used; accepted on read, never written.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonMap {
    #[serde(alias = "v")]
    version: String,
    #[serde(alias = "w")]
    width: u32,
    #[serde(alias = "h")]
    height: u32,
    #[serde(alias = "tw")]
    tile_width: u32,
    #[serde(alias = "th")]
    tile_height: u32,
    #[serde(alias = "ts", default)]
    tile_sets: Vec<JsonTileSet>,
    #[serde(alias = "l")]
    layers: Vec<JsonLayer>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonTileSet {
    #[serde(alias = "i")]
    id: u32,
    #[serde(alias = "n")]
    name: String,
    #[serde(alias = "d", default, skip_serializing_if = "Option::is_none")]
    image_data: Option<String>,
    #[serde(alias = "u", default, skip_serializing_if = "Option::is_none")]
    image_url: Option<String>,
    #[serde(alias = "tw")]
    tile_width: u32,
    #[serde(alias = "th")]
    tile_height: u32,
    #[serde(alias = "c")]
    columns: u32,
    #[serde(alias = "r")]
    rows: u32,
    #[serde(alias = "s", default)]
    spacing: u32,
    #[serde(alias = "m", default)]
    margin: u32,
}

#[derive(Serialize, Deserialize)]
struct JsonLayer {
    #[serde(alias = "n")]
    name: String,
    #[serde(alias = "v", default = "default_true")]
    visible: bool,
    #[serde(alias = "o", default = "one")]
    opacity: f32,
    #[serde(alias = "t")]
    tiles: String,
}

fn default_true() -> bool {
    true
}
fn one() -> f32 {
    1.0
}

fn tile_set_to_json(ts: &TileSetDefinition, inline: Option<&dyn ImageLoader>) -> JsonTileSet {
    let (image_data, image_url) = match (&ts.image, inline) {
        (ImageSource::Inline(bytes), _) => (Some(to_data_url(bytes)), None),
        (ImageSource::External(url), Some(loader)) => match loader.fetch(url) {
            Ok(bytes) => (Some(to_data_url(&bytes)), None),
            Err(e) => {
                warn!("Could not inline image for tile set {} ({}): {}", ts.id, url, e);
                (None, Some(url.clone()))
            }
        },
        (ImageSource::External(url), None) => (None, Some(url.clone())),
    };

    JsonTileSet {
        id: ts.id,
        name: ts.name.clone(),
        image_data,
        image_url,
        tile_width: ts.tile_width,
        tile_height: ts.tile_height,
        columns: ts.columns,
        rows: ts.rows,
        spacing: ts.spacing,
        margin: ts.margin,
    }
}

fn tile_set_from_json(ts: JsonTileSet) -> Result<TileSetDefinition, MapError> {
    let image_url = ts.image_url.filter(|u| !u.is_empty());
    let image = match (ts.image_data.filter(|d| !d.is_empty()), image_url) {
        (Some(data), _) => ImageSource::Inline(parse_data_url(&data)?),
        (None, Some(url)) => ImageSource::External(url),
        (None, None) => return Err(MapError::MissingImageSource { id: ts.id }),
    };

    Ok(TileSetDefinition {
        id: ts.id,
        name: ts.name,
        image,
        tile_width: ts.tile_width,
        tile_height: ts.tile_height,
        columns: ts.columns,
        rows: ts.rows,
        spacing: ts.spacing,
        margin: ts.margin,
    })
}

/// Serialize a map to its compact JSON form.
///
/// With `inline` set, external sheet images are fetched through the loader
/// and embedded as base64 data URLs; a sheet whose image cannot be fetched
/// keeps its URL reference instead. Inline sheets are always embedded.
pub fn encode_map(map: &TileMapData, inline: Option<&dyn ImageLoader>) -> Result<String, MapError> {
    let doc = JsonMap {
        version: map.version.clone(),
        width: map.width(),
        height: map.height(),
        tile_width: map.tile_width,
        tile_height: map.tile_height,
        tile_sets: map
            .tile_sets
            .iter()
            .map(|ts| tile_set_to_json(ts, inline))
            .collect(),
        layers: map
            .layers()
            .iter()
            .map(|l| JsonLayer {
                name: l.name.clone(),
                visible: l.visible,
                opacity: l.opacity,
                tiles: encode_cells(l.cells()),
            })
            .collect(),
    };

    let txt = serde_json::to_string(&doc)?;
    info!(
        "Encoded {}x{} map ({} layers, {} tile sets) into {} bytes",
        map.width(),
        map.height(),
        map.layers().len(),
        map.tile_sets.len(),
        txt.len()
    );
    Ok(txt)
}

/// Parse a map exported by [`encode_map`]. Either the whole document decodes
/// or an error is returned; nothing is partially applied.
pub fn decode_map(json: &str) -> Result<TileMapData, MapError> {
    let j: JsonMap = serde_json::from_str(json)?;

    if j.layers.is_empty() {
        return Err(MapError::NoLayer);
    }
    let expected = j.width as u64 * j.height as u64;
    let total = expected.saturating_mul(j.layers.len() as u64);
    if total > MAX_DOCUMENT_CELLS {
        return Err(MapError::InvalidMap(format!(
            "{}x{} map with {} layers exceeds {} cells",
            j.width,
            j.height,
            j.layers.len(),
            MAX_DOCUMENT_CELLS
        )));
    }
    let expected = expected as usize;

    let tile_sets = j
        .tile_sets
        .into_iter()
        .map(tile_set_from_json)
        .collect::<Result<Vec<_>, _>>()?;

    let mut layers = Vec::with_capacity(j.layers.len());
    for l in j.layers {
        let cells = decode_cells(&l.name, &l.tiles, expected)?;
        let mut layer = MapLayer::from_cells(l.name, j.width, j.height, cells)?;
        layer.visible = l.visible;
        layer.opacity = l.opacity.clamp(0.0, 1.0);
        layers.push(layer);
    }

    TileMapData::from_parts(
        j.version,
        j.width,
        j.height,
        j.tile_width,
        j.tile_height,
        tile_sets,
        layers,
    )
}

/// Byte length of the export without inline images.
pub fn compressed_size(map: &TileMapData) -> usize {
    encode_map(map, None).map(|s| s.len()).unwrap_or(0)
}
