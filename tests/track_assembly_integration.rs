// Integration tests for loading track documents from disk

use std::fs;
use std::path::Path;

use serde_json::{Value, json};
use tempfile::TempDir;
use tracksmith::track::{DrsRole, MarkerRole};
use tracksmith::writer::write_model;
use tracksmith::{
    AssemblerConfig, Diagnostic, TrackModel, TracksmithError, load_track, load_track_blocking,
};
use uom::si::length::kilometer;

/// Closed loop around a small ellipse, with the first point repeated at the end
fn ring(n: usize) -> Vec<[f64; 2]> {
    let mut coords: Vec<[f64; 2]> = (0..n)
        .map(|i| {
            let a = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
            [-8.628 + 0.005 * a.cos(), 37.232 + 0.003 * a.sin()]
        })
        .collect();
    coords.push(coords[0]);
    coords
}

fn feature(geometry: Value, properties: Value) -> Value {
    json!({"type": "Feature", "geometry": geometry, "properties": properties})
}

fn line(coords: &[[f64; 2]], properties: Value) -> Value {
    feature(json!({"type": "LineString", "coordinates": coords}), properties)
}

fn point(coord: [f64; 2], properties: Value) -> Value {
    feature(json!({"type": "Point", "coordinates": coord}), properties)
}

/// Circuit with a pit lane, three sectors, one DRS zone and all markers
fn circuit() -> Value {
    let track = ring(40);
    let pit: Vec<[f64; 2]> = vec![
        track[36],
        [-8.6236, 37.2312],
        [-8.6234, 37.2318],
        [-8.6236, 37.2324],
        track[4],
    ];
    json!({
        "type": "FeatureCollection",
        "features": [
            line(&track, json!({"rt:kind": "track", "rt:width": 12, "name": "Test Ring"})),
            line(&pit, json!({"rt:kind": "pit", "rt:width": "6"})),
            point(track[0], json!({"rt:raceway": "start-finish", "rt:sector": "1"})),
            point(track[14], json!({"rt:sector": "2", "rt:width": 14})),
            point(track[27], json!({"rt:sector": "3"})),
            point(track[30], json!({"rt:drs": "detect"})),
            point(track[33], json!({"rt:drs": "start"})),
            point(track[2], json!({"rt:drs": "finish"})),
            point(track[38], json!({"rt:starting-grid": "start"})),
            point(track[35], json!({"rt:starting-grid": "finish"})),
            point(pit[1], json!({"rt:pit-stop": "start"})),
            point(pit[3], json!({"rt:pit-stop": "finish"})),
        ]
    })
}

fn write_document(dir: &Path, name: &str, document: &Value) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(document).unwrap()).unwrap();
    path
}

fn assert_full_circuit(model: &TrackModel) {
    assert!(model.track.closed);
    assert_eq!(model.track.len(), 41);
    assert_eq!(model.track.left.len(), 41);
    assert_eq!(model.track.right.len(), 41);
    assert_eq!(model.start_finish_index, 0);

    let ids: Vec<&str> = model.sectors.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(model.sectors[0].start, 0);
    assert_eq!(model.sectors[0].end, 14);
    assert_eq!(model.sectors[2].start, 27);

    assert_eq!(model.drs.len(), 1);
    assert_eq!(model.drs[0].detect, 30);
    assert_eq!(model.drs[0].start, 33);
    assert_eq!(model.drs[0].finish, 2);

    let pit = model.pit.as_ref().unwrap();
    assert_eq!(pit.len(), 5);
    assert!(!pit.closed);
    assert_eq!(model.pit_stop.len(), 2);
    assert_eq!(model.pit_stop[&MarkerRole::Start], pit.center[1]);
    assert_eq!(
        model.starting_grid[&MarkerRole::Finish],
        model.track.center[35]
    );
}

#[test]
fn test_load_full_circuit() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_document(temp_dir.path(), "ring.geojson", &circuit());

    let model = load_track_blocking(&path, AssemblerConfig::default()).unwrap();
    assert_full_circuit(&model);
    assert!(
        model.diagnostics.is_empty(),
        "unexpected diagnostics: {:?}",
        model.diagnostics
    );

    // Ellipse of roughly 880m by 670m
    let km = model.track_length().get::<kilometer>();
    assert!(km > 2.0 && km < 3.0, "track length {km}");
}

#[tokio::test(flavor = "current_thread")]
async fn test_async_load_matches_blocking_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_document(temp_dir.path(), "ring.geojson", &circuit());

    let from_async = load_track(&path, AssemblerConfig::default()).await.unwrap();
    let from_blocking = load_track_blocking(&path, AssemblerConfig::default()).unwrap();
    assert_eq!(from_async, from_blocking);
}

#[test]
fn test_repeated_loads_are_identical() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_document(temp_dir.path(), "ring.geojson", &circuit());

    let first = load_track_blocking(&path, AssemblerConfig::default()).unwrap();
    for _ in 0..3 {
        let again = load_track_blocking(&path, AssemblerConfig::default()).unwrap();
        assert_eq!(first, again);
    }
}

#[test]
fn test_incomplete_document_resolves_with_diagnostics() {
    let track = ring(24);
    let document = json!({
        "type": "FeatureCollection",
        "features": [
            line(&track, json!({"kind": "track"})),
            point(track[5], json!({"rt:drs": "start"})),
            point([-8.0, 37.0], json!({"rt:sector": "1"})),
            feature(json!({"type": "Polygon", "coordinates": [[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [0.0, 0.0]]]}), json!({})),
        ]
    });
    let temp_dir = TempDir::new().unwrap();
    let path = write_document(temp_dir.path(), "partial.geojson", &document);

    let model = load_track_blocking(&path, AssemblerConfig::default()).unwrap();
    assert_eq!(model.track.len(), 25);
    assert_eq!(model.start_finish_index, 0);
    assert_eq!(model.sectors.len(), 1);
    assert!(model.drs.is_empty());

    let d = &model.diagnostics;
    assert!(d.contains(&Diagnostic::MissingRaceway));
    assert!(d.contains(&Diagnostic::NoSectorMarkers));
    assert!(d.contains(&Diagnostic::IncompleteDrs {
        missing: vec![DrsRole::Detect, DrsRole::Finish]
    }));
    assert!(
        d.iter()
            .any(|d| matches!(d, Diagnostic::UnmatchedAnnotation { feature_index: 2, .. }))
    );
    assert!(
        d.iter()
            .any(|d| matches!(d, Diagnostic::IgnoredFeature { feature_index: 3, .. }))
    );
}

#[test]
fn test_export_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_document(temp_dir.path(), "ring.geojson", &circuit());
    let output = temp_dir.path().join("ring.json");

    let model = load_track_blocking(&input, AssemblerConfig::default()).unwrap();
    write_model(&output, &model).unwrap();

    let content = fs::read_to_string(&output).unwrap();
    let exported: TrackModel = serde_json::from_str(&content).unwrap();
    assert_full_circuit(&exported);
    assert_eq!(exported.zoom(), model.zoom());
    assert_eq!(exported.diagnostics, model.diagnostics);
}

#[test]
fn test_config_file_drives_the_load() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_document(temp_dir.path(), "ring.geojson", &circuit());
    let config_path = temp_dir.path().join("config.json");
    fs::write(&config_path, r#"{"zoom": 15, "default_width": 8.0}"#).unwrap();

    let config = AssemblerConfig::from_path(&config_path).unwrap();
    let model = load_track_blocking(&input, config).unwrap();
    let default_zoom = load_track_blocking(&input, AssemblerConfig::default()).unwrap();

    assert_eq!(model.zoom(), 15);
    // Two zoom levels down is a quarter of the pixels
    let ratio = default_zoom.dimensions.0 / model.dimensions.0;
    assert!((ratio - 4.0).abs() < 1e-6, "ratio {ratio}");
}

#[test]
fn test_missing_track_centerline() {
    let document = json!({
        "type": "FeatureCollection",
        "features": [line(&ring(10), json!({"rt:kind": "pit"}))]
    });
    let temp_dir = TempDir::new().unwrap();
    let path = write_document(temp_dir.path(), "pit_only.geojson", &document);

    assert!(matches!(
        load_track_blocking(&path, AssemblerConfig::default()),
        Err(TracksmithError::MissingTrackCenterline)
    ));
}

#[test]
fn test_unreadable_and_malformed_documents() {
    let temp_dir = TempDir::new().unwrap();

    let missing = temp_dir.path().join("nope.geojson");
    assert!(matches!(
        load_track_blocking(&missing, AssemblerConfig::default()),
        Err(TracksmithError::DocumentReadError { .. })
    ));

    let broken = temp_dir.path().join("broken.geojson");
    fs::write(&broken, "{\"type\": \"FeatureCollection\", \"features\": [").unwrap();
    assert!(matches!(
        load_track_blocking(&broken, AssemblerConfig::default()),
        Err(TracksmithError::DocumentParseError { .. })
    ));
}
