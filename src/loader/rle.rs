//! Run-length encoded tile-strings.
//!
//! ```text
//! tile-string := run (',' run)*
//! run         := token | count '*' token
//! token       := 'e' | integer ':' integer
//! ```

use crate::error::MapError;
use crate::layer::TileRef;
use std::fmt::Write as _;

/// Token for an empty cell.
pub const EMPTY_TOKEN: &str = "e";

// upper bound on the up-front allocation; longer layers grow as runs arrive
const PREALLOC_CELLS: usize = 1 << 16;

fn push_token(out: &mut String, cell: Option<TileRef>) {
    match cell {
        None => out.push_str(EMPTY_TOKEN),
        Some(t) => {
            let _ = write!(out, "{}:{}", t.tileset_id, t.tile_index);
        }
    }
}

fn push_run(out: &mut String, cell: Option<TileRef>, count: usize) {
    if !out.is_empty() {
        out.push(',');
    }
    if count > 1 {
        let _ = write!(out, "{count}*");
    }
    push_token(out, cell);
}

/// Encode row-major cells. An empty slice encodes to an empty string.
pub fn encode_cells(cells: &[Option<TileRef>]) -> String {
    let mut out = String::new();
    let mut iter = cells.iter().copied();
    let Some(mut current) = iter.next() else {
        return out;
    };
    let mut count = 1usize;

    for cell in iter {
        if cell == current {
            count += 1;
        } else {
            push_run(&mut out, current, count);
            current = cell;
            count = 1;
        }
    }
    push_run(&mut out, current, count);
    out
}

fn parse_number(text: &str) -> Option<u64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn parse_token(layer: &str, token: &str) -> Result<Option<TileRef>, MapError> {
    if token == EMPTY_TOKEN {
        return Ok(None);
    }
    let bad = || MapError::InvalidToken {
        layer: layer.to_owned(),
        token: token.to_owned(),
    };
    let (set, index) = token.split_once(':').ok_or_else(bad)?;
    let set = parse_number(set).and_then(|n| u32::try_from(n).ok()).ok_or_else(bad)?;
    let index = parse_number(index).and_then(|n| u32::try_from(n).ok()).ok_or_else(bad)?;
    Ok(Some(TileRef::new(set, index)))
}

/// Decode a tile-string into exactly `expected` row-major cells.
///
/// Fails on malformed runs or tokens, and when the expanded length differs from
/// `expected`. Expansion stops as soon as it would overshoot, so a hostile
/// count cannot force a huge allocation.
pub fn decode_cells(
    layer: &str,
    tiles: &str,
    expected: usize,
) -> Result<Vec<Option<TileRef>>, MapError> {
    let mut cells = Vec::with_capacity(expected.min(PREALLOC_CELLS));
    if tiles.is_empty() {
        return if expected == 0 {
            Ok(cells)
        } else {
            Err(MapError::InvalidLayerSize {
                layer: layer.to_owned(),
                expected,
                actual: 0,
            })
        };
    }

    for run in tiles.split(',') {
        let (count, token) = match run.split_once('*') {
            Some((count, token)) => {
                let count = parse_number(count)
                    .filter(|&n| n > 0)
                    .ok_or_else(|| MapError::InvalidRun {
                        layer: layer.to_owned(),
                        run: run.to_owned(),
                    })?;
                (count, token)
            }
            None => (1, run),
        };
        let cell = parse_token(layer, token)?;

        let total = (cells.len() as u64).saturating_add(count);
        if total > expected as u64 {
            return Err(MapError::InvalidLayerSize {
                layer: layer.to_owned(),
                expected,
                actual: total.min(usize::MAX as u64) as usize,
            });
        }
        cells.resize(total as usize, cell);
    }

    if cells.len() != expected {
        return Err(MapError::InvalidLayerSize {
            layer: layer.to_owned(),
            expected,
            actual: cells.len(),
        });
    }
    Ok(cells)
}
