// tests/load_tests.rs

use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
use macroquad_tile_editor::{
    Editor, EditorConfig, FileImageLoader, ImageSource, MapError, MemoryImageLoader, NoTextures,
    TileGrid, TileRef,
};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn temp_dir() -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("tile_editor_io_{nanos}"));
    fs::create_dir_all(&dir).expect("failed to create temp dir");
    dir
}

fn png(w: u32, h: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(w, h, Rgba([200, 40, 40, 255]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut out, ImageOutputFormat::Png)
        .expect("encode png");
    out.into_inner()
}

fn small_config() -> EditorConfig {
    EditorConfig {
        map_width: 6,
        map_height: 4,
        tile_width: 16,
        tile_height: 16,
        ..EditorConfig::default()
    }
}

#[test]
fn save_and_load_with_inlined_images() -> anyhow::Result<()> {
    init_logs();
    let dir = temp_dir();
    fs::write(dir.join("tiles.png"), png(32, 32))?;

    let mut ed = Editor::new(
        small_config(),
        NoTextures::default(),
        Box::new(FileImageLoader::new(&dir)),
    );
    let sheet = ed.import_tile_set("tiles", ImageSource::External("tiles.png".into()), TileGrid::new(16, 16))?;
    ed.paint(0, 0, 0, TileRef::new(sheet, 3));
    ed.paint(0, 5, 3, TileRef::new(sheet, 1));
    let fg = ed.add_layer("fg");
    ed.set_layer_opacity(fg, 0.5);
    ed.paint(fg, 2, 2, TileRef::new(sheet, 2));

    let path = dir.join("level.json");
    ed.save_to_file(&path)?;

    // this loader cannot see tiles.png, so the image must come from the saved file
    let elsewhere = dir.join("elsewhere");
    let mut restored = Editor::new(
        EditorConfig::default(),
        NoTextures::default(),
        Box::new(FileImageLoader::new(&elsewhere)),
    );
    let report = restored.load_from_file(&path)?;

    assert_eq!(report.tile_sets, 1);
    assert!(report.unavailable_images.is_empty());
    assert_eq!(restored.textures().live(), 1);
    assert_eq!((restored.map().width(), restored.map().height()), (6, 4));
    assert_eq!(restored.map().layers(), ed.map().layers());
    assert!(matches!(restored.map().tile_sets[0].image, ImageSource::Inline(_)));

    let batches = restored.batches();
    assert_eq!(batches[&sheet].count(), 3);
    Ok(())
}

#[test]
fn unsupported_extensions_are_rejected() {
    let mut ed = Editor::new(small_config(), NoTextures::default(), Box::new(MemoryImageLoader::new()));
    match ed.save_to_file("level.tmx") {
        Err(MapError::UnsupportedFormat(name)) => assert_eq!(name, "level.tmx"),
        other => panic!("expected UnsupportedFormat, got {:?}", other),
    }
    assert!(matches!(
        ed.load_from_file("level.txt"),
        Err(MapError::UnsupportedFormat(_))
    ));
}

#[test]
fn missing_file_reports_its_path() {
    let path = temp_dir().join("nothing_here.json");
    let mut ed = Editor::new(small_config(), NoTextures::default(), Box::new(MemoryImageLoader::new()));
    match ed.load_from_file(&path) {
        Err(MapError::Io { path: p, .. }) => assert_eq!(p, path),
        other => panic!("expected Io error, got {:?}", other),
    }
}

#[test]
fn unreachable_images_are_reported_not_fatal() -> anyhow::Result<()> {
    init_logs();
    let json = r#"{
      "version": "1.0.0", "width": 3, "height": 1, "tileWidth": 16, "tileHeight": 16,
      "tileSets": [
        {"id": 4, "name": "gone", "imageUrl": "gone.png", "tileWidth": 8, "tileHeight": 8,
         "columns": 2, "rows": 2, "spacing": 0, "margin": 0}
      ],
      "layers": [{"name": "Layer 1", "visible": true, "opacity": 1.0, "tiles": "4:3,2*e"}]
    }"#;

    let mut ed = Editor::new(small_config(), NoTextures::default(), Box::new(MemoryImageLoader::new()));
    let report = ed.import(json)?;
    assert_eq!(report.unavailable_images, vec![4]);

    // geometry is kept as stored and the reference survives
    let ts = ed.registry().get_tile_set(4).expect("registered");
    assert_eq!((ts.definition().columns, ts.definition().rows), (2, 2));
    assert!(ts.image().is_none());
    assert_eq!(ed.map().get_tile(0, 0, 0), Some(TileRef::new(4, 3)));
    assert!(ed.batches().is_empty());

    // exporting again keeps the URL reference
    let out = ed.export(true)?;
    let v: serde_json::Value = serde_json::from_str(&out)?;
    assert_eq!(v["tileSets"][0]["imageUrl"], "gone.png");
    assert_eq!(v["layers"][0]["tiles"], "4:3,2*e");
    Ok(())
}

#[test]
fn failed_import_leaves_session_untouched() -> anyhow::Result<()> {
    let mut loader = MemoryImageLoader::new();
    loader.insert("sheet.png", png(16, 16));
    let mut ed = Editor::new(small_config(), NoTextures::default(), Box::new(loader));
    let sheet = ed.import_tile_set("sheet", ImageSource::External("sheet.png".into()), TileGrid::new(8, 8))?;
    ed.paint(0, 1, 1, TileRef::new(sheet, 0));
    let before = ed.map().clone();
    let revision = ed.map_revision();

    let bad_runs = r#"{"version":"1.0.0","width":2,"height":1,"tileWidth":8,"tileHeight":8,
      "layers":[{"name":"L","visible":true,"opacity":1,"tiles":"x*e,e"}]}"#;
    let bad_count = r#"{"version":"1.0.0","width":2,"height":2,"tileWidth":8,"tileHeight":8,
      "layers":[{"name":"L","visible":true,"opacity":1,"tiles":"3*e"}]}"#;

    assert!(matches!(ed.import(bad_runs), Err(MapError::InvalidRun { .. })));
    assert!(matches!(ed.import(bad_count), Err(MapError::InvalidLayerSize { .. })));
    assert!(ed.import("not json").is_err());

    assert_eq!(ed.map(), &before);
    assert_eq!(ed.map_revision(), revision);
    assert_eq!(ed.registry().len(), 1);
    assert_eq!(ed.textures().live(), 1);
    Ok(())
}

#[test]
fn successful_import_releases_previous_textures() -> anyhow::Result<()> {
    let mut loader = MemoryImageLoader::new();
    loader.insert("a.png", png(16, 16));
    loader.insert("b.png", png(16, 16));
    let mut ed = Editor::new(small_config(), NoTextures::default(), Box::new(loader));
    ed.import_tile_set("a", ImageSource::External("a.png".into()), TileGrid::new(8, 8))?;
    ed.import_tile_set("b", ImageSource::External("b.png".into()), TileGrid::new(8, 8))?;
    assert_eq!(ed.textures().live(), 2);

    let json = r#"{"version":"1.0.0","width":1,"height":1,"tileWidth":8,"tileHeight":8,
      "tileSets":[{"id":7,"name":"a","imageUrl":"a.png","tileWidth":8,"tileHeight":8,"columns":2,"rows":2}],
      "layers":[{"name":"L","tiles":"7:0"}]}"#;
    ed.import(json)?;

    assert_eq!(ed.textures().live(), 1);
    assert_eq!(ed.registry().len(), 1);
    // ids continue after the highest imported id
    let next = ed.import_tile_set("b", ImageSource::External("b.png".into()), TileGrid::new(8, 8))?;
    assert_eq!(next, 8);
    Ok(())
}

#[test]
fn config_file_drives_new_sessions() -> anyhow::Result<()> {
    let dir = temp_dir();
    let path = dir.join("editor.json");
    fs::write(&path, r#"{"map_width": 3, "map_height": 2, "grow_on_paint": true, "max_map_dimension": 5}"#)?;

    let cfg = EditorConfig::load_from_file(&path)?;
    let mut ed = Editor::new(cfg, NoTextures::default(), Box::new(MemoryImageLoader::new()));
    assert_eq!((ed.map().width(), ed.map().height()), (3, 2));
    assert!(ed.paint(0, 4, 4, TileRef::new(0, 0)));
    assert_eq!((ed.map().width(), ed.map().height()), (5, 5));
    assert!(!ed.paint(0, 5, 0, TileRef::new(0, 0)));
    Ok(())
}

#[test]
fn highest_sheet_id_then_new_sheet_is_an_error() -> anyhow::Result<()> {
    let mut loader = MemoryImageLoader::new();
    loader.insert("a.png", png(16, 16));
    let mut ed = Editor::new(small_config(), NoTextures::default(), Box::new(loader));

    let json = r#"{"version":"1.0.0","width":1,"height":1,"tileWidth":8,"tileHeight":8,
      "tileSets":[{"id":4294967295,"name":"top","imageUrl":"a.png","tileWidth":8,"tileHeight":8,"columns":2,"rows":2}],
      "layers":[{"name":"L","tiles":"4294967295:0"}]}"#;
    ed.import(json)?;
    assert_eq!(ed.textures().live(), 1);

    let err = ed
        .import_tile_set("b", ImageSource::External("a.png".into()), TileGrid::new(8, 8))
        .unwrap_err();
    assert!(matches!(err, MapError::TileSetIdsExhausted));
    assert_eq!(ed.registry().len(), 1);
    assert_eq!(ed.textures().live(), 1);
    Ok(())
}

#[test]
fn absurd_stored_geometry_still_batches() -> anyhow::Result<()> {
    let mut loader = MemoryImageLoader::new();
    loader.insert("a.png", png(16, 16));
    let mut ed = Editor::new(small_config(), NoTextures::default(), Box::new(loader));

    let json = r#"{"version":"1.0.0","width":2,"height":1,"tileWidth":8,"tileHeight":8,
      "tileSets":[{"id":0,"name":"odd","imageUrl":"a.png","tileWidth":4294967295,"tileHeight":4294967295,
        "columns":2,"rows":2,"spacing":1,"margin":0}],
      "layers":[{"name":"L","tiles":"0:3,0:0"}]}"#;
    let report = ed.import(json)?;
    assert!(report.unavailable_images.is_empty());
    assert_eq!(ed.batches()[&0].count(), 2);
    Ok(())
}

#[test]
fn export_keeps_document_sheet_order() -> anyhow::Result<()> {
    let mut ed = Editor::new(small_config(), NoTextures::default(), Box::new(MemoryImageLoader::new()));
    let json = r#"{"version":"1.0.0","width":1,"height":1,"tileWidth":8,"tileHeight":8,
      "tileSets":[
        {"id":5,"name":"five","imageUrl":"five.png","tileWidth":8,"tileHeight":8,"columns":1,"rows":1},
        {"id":2,"name":"two","imageUrl":"two.png","tileWidth":8,"tileHeight":8,"columns":1,"rows":1}
      ],
      "layers":[{"name":"L","tiles":"e"}]}"#;
    ed.import(json)?;

    let out: serde_json::Value = serde_json::from_str(&ed.export(false)?)?;
    let ids: Vec<u64> = out["tileSets"]
        .as_array()
        .map(|a| a.iter().filter_map(|t| t["id"].as_u64()).collect())
        .unwrap_or_default();
    assert_eq!(ids, vec![5, 2]);

    ed.remove_tile_set(5);
    let out: serde_json::Value = serde_json::from_str(&ed.export(false)?)?;
    assert_eq!(out["tileSets"][0]["id"], 2);
    Ok(())
}

#[test]
fn oversized_document_is_refused_without_touching_the_session() {
    let mut ed = Editor::new(small_config(), NoTextures::default(), Box::new(MemoryImageLoader::new()));
    let before = ed.map().clone();

    let huge = r#"{"version":"1.0.0","width":4294967295,"height":4294967295,"tileWidth":8,"tileHeight":8,
      "layers":[{"name":"L","tiles":"e"}]}"#;
    assert!(matches!(ed.import(huge), Err(MapError::InvalidMap(_))));
    assert_eq!(ed.map(), &before);
}
