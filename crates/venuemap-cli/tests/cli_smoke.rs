use assert_cmd::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn repo_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("expected crates/<name> layout")
        .to_path_buf()
}

fn venues() -> PathBuf {
    repo_root().join("fixtures").join("venues")
}

fn run_json(args: &[&str]) -> serde_json::Value {
    let exe = assert_cmd::cargo_bin!("venuemap-cli");
    let output = Command::new(exe)
        .current_dir(repo_root())
        .args(args)
        .output()
        .expect("spawn venuemap-cli");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn sanitize_strips_active_content() {
    let svg = venues().join("arena.svg");
    let exe = assert_cmd::cargo_bin!("venuemap-cli");
    let output = Command::new(exe)
        .args(["sanitize", svg.to_string_lossy().as_ref()])
        .output()
        .expect("spawn venuemap-cli");
    assert!(output.status.success());

    let text = String::from_utf8(output.stdout).expect("utf-8 output");
    assert!(text.trim_start().starts_with("<svg"));
    assert!(!text.contains("<script"));
    assert!(!text.contains("onclick"));
    assert!(!text.contains("@import"));
    assert!(text.contains("232-group"));
}

#[test]
fn resolve_reports_bindings_and_states() {
    let svg = venues().join("arena.svg");
    let catalog = venues().join("arena.catalog.json");
    let value = run_json(&[
        "resolve",
        "--catalog",
        catalog.to_string_lossy().as_ref(),
        "--selected",
        "t305",
        svg.to_string_lossy().as_ref(),
    ]);

    assert_eq!(value["viewBox"], serde_json::json!([0.0, 0.0, 1200.0, 800.0]));
    assert_eq!(value["summary"]["proximityMatches"], 2);

    let bindings = value["bindings"].as_array().expect("bindings array");
    let by_id = |id: &str| {
        bindings
            .iter()
            .find(|b| b["element"]["id"] == id)
            .unwrap_or_else(|| panic!("no binding for {id}"))
    };
    let group = by_id("232-group");
    assert_eq!(group["sectionId"], "s232");
    assert_eq!(group["state"], "available");
    assert_eq!(group["class"], "venue-section-available");
    assert_eq!(by_id("t305-group")["state"], "selected");
}

#[test]
fn click_at_point_resolves_by_proximity() {
    let svg = venues().join("arena.svg");
    let catalog = venues().join("arena.catalog.json");
    let value = run_json(&[
        "click",
        "--catalog",
        catalog.to_string_lossy().as_ref(),
        "--at",
        "875,120",
        svg.to_string_lossy().as_ref(),
    ]);

    assert_eq!(value["outcome"]["outcome"], "resolved");
    assert_eq!(value["outcome"]["sectionId"], "s101");
    assert_eq!(value["section"]["id"], "s101");
    assert_eq!(value["diagnostics"][0]["path"], "proximity");
}

#[test]
fn click_on_background_is_unresolved() {
    let svg = venues().join("arena.svg");
    let catalog = venues().join("arena.catalog.json");
    let value = run_json(&[
        "click",
        "--catalog",
        catalog.to_string_lossy().as_ref(),
        "--element",
        "background",
        svg.to_string_lossy().as_ref(),
    ]);
    assert_eq!(value["outcome"]["outcome"], "unresolved");
    assert!(value.get("section").is_none());
}

#[test]
fn config_file_and_temp_catalog_are_honored() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let svg = tmp.path().join("tiny.svg");
    fs::write(
        &svg,
        r#"<svg viewBox="0 0 400 100">
  <path d="M0 0H100V100H0Z"/>
  <text x="300" y="50">7</text>
</svg>"#,
    )
    .expect("write svg");
    let catalog = tmp.path().join("catalog.json");
    fs::write(
        &catalog,
        r#"{ "sections": [{ "id": "s7", "name": "Section 7" }], "ticketCounts": { "s7": 1 } }"#,
    )
    .expect("write catalog");

    // The label sits about 255 units from the shape, past the default reach.
    let value = run_json(&[
        "resolve",
        "--catalog",
        catalog.to_string_lossy().as_ref(),
        svg.to_string_lossy().as_ref(),
    ]);
    assert_eq!(value["summary"]["proximityMatches"], 0);

    let config = tmp.path().join("config.json");
    fs::write(&config, r#"{ "geometry": { "maxLabelDistance": 300 } }"#).expect("write config");
    let value = run_json(&[
        "resolve",
        "--catalog",
        catalog.to_string_lossy().as_ref(),
        "--config",
        config.to_string_lossy().as_ref(),
        svg.to_string_lossy().as_ref(),
    ]);
    assert_eq!(value["summary"]["proximityMatches"], 1);
}

#[test]
fn input_without_svg_root_exits_with_code_3() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let input = tmp.path().join("not-a-map.html");
    fs::write(&input, "<html><body>nothing here</body></html>").expect("write input");

    let exe = assert_cmd::cargo_bin!("venuemap-cli");
    Command::new(exe)
        .args(["sanitize", input.to_string_lossy().as_ref()])
        .assert()
        .code(3);
}

#[test]
fn missing_catalog_is_a_usage_error() {
    let exe = assert_cmd::cargo_bin!("venuemap-cli");
    Command::new(exe).args(["resolve", "map.svg"]).assert().code(2);
}
