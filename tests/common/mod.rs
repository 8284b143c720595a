#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::json;
use shelf_lib::db::Database;
use shelf_lib::export::Exporter;
use shelf_lib::models::{BoundingBox, TextFragment};
use shelf_lib::ocr::FixtureRecognizer;
use shelf_lib::session::ScanController;
use shelf_lib::settings::{CaptureSettings, SettingsStore, UserSettings};
use shelf_lib::storage::ImageStore;

pub const SOUP: [(&str, f64); 7] = [
    ("Tomato Soup", 0.95),
    ("Ingredients", 0.9),
    ("2 tomatoes", 0.9),
    ("1 onion", 0.6),
    ("Instructions", 0.9),
    ("1. Chop tomatoes", 0.9),
    ("2. Simmer 10 min", 0.85),
];

pub const TART: [(&str, f64); 5] = [
    ("Lemon Tart", 0.95),
    ("Zest of 3 lemons", 0.9),
    ("200g caster sugar", 0.9),
    ("Directions", 0.9),
    ("Bake the pastry case blind until golden", 0.9),
];

/// One fragment per line, stacked 60px apart from the top of the page.
pub fn fragments(lines: &[(&str, f64)]) -> Vec<TextFragment> {
    lines
        .iter()
        .enumerate()
        .map(|(index, (text, confidence))| {
            TextFragment::new(
                *text,
                *confidence,
                BoundingBox::new(40.0, 60.0 + 60.0 * index as f64, 400.0, 24.0),
            )
        })
        .collect()
}

/// Write a recorded frame as a bare recognition file.
pub fn write_frame(dir: &Path, name: &str, fragments: &[TextFragment]) -> PathBuf {
    let path = dir.join(name);
    let body = json!({
        "width": 800.0,
        "height": 1000.0,
        "fragments": fragments,
    });
    fs::write(&path, serde_json::to_string_pretty(&body).unwrap()).unwrap();
    path
}

pub fn corner_number(value: &str) -> TextFragment {
    TextFragment::new(value, 0.95, BoundingBox::new(700.0, 960.0, 30.0, 20.0))
}

pub fn fast_settings(path: PathBuf) -> SettingsStore {
    let settings = SettingsStore::new(path).unwrap();
    settings
        .update(UserSettings {
            keep_page_images: false,
            capture: CaptureSettings {
                interval_ms: 150,
                processing_interval_ms: 0,
                ..CaptureSettings::default()
            },
            ..UserSettings::default()
        })
        .unwrap();
    settings
}

pub fn controller(data_dir: &Path, db: Database) -> ScanController {
    ScanController::new(
        db,
        Arc::new(FixtureRecognizer::new()),
        Arc::new(fast_settings(data_dir.join("settings.json"))),
        ImageStore::new(data_dir),
        Exporter::new(data_dir.join("exports")),
    )
}
