use std::fs;
use std::path::{Path, PathBuf};
use venuemap_core::geom::point;
use venuemap_core::{
    CatalogDocument, ClickOutcome, ClickResolver, PointerInput, ResolutionPath, ResolutionStage,
    ResolvedMap, ResolverConfig, VisualState,
};

fn repo_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("expected crates/<name> layout")
        .to_path_buf()
}

fn load_arena() -> ResolvedMap {
    let dir = repo_root().join("fixtures").join("venues");
    let svg = fs::read_to_string(dir.join("arena.svg")).expect("read arena.svg");
    let catalog_json =
        fs::read_to_string(dir.join("arena.catalog.json")).expect("read arena.catalog.json");
    let catalog = CatalogDocument::from_json_str(&catalog_json).expect("valid catalog");
    ResolvedMap::build(
        &svg,
        &catalog.sections,
        &catalog.availability_input(),
        &ResolverConfig::default(),
    )
    .expect("arena builds")
}

fn click_at(map: &ResolvedMap, input_id: u64, x: f64, y: f64) -> (ClickOutcome, Vec<ResolutionPath>) {
    let input = PointerInput::at_point(input_id, map.document(), point(x, y));
    let mut paths = Vec::new();
    let outcome = ClickResolver::new().dispatch(map, &input, &mut |d| paths.push(d.path));
    (outcome, paths)
}

fn resolved_section(outcome: &ClickOutcome) -> Option<&str> {
    match outcome {
        ClickOutcome::Resolved { section_id, .. } => Some(section_id.as_str()),
        _ => None,
    }
}

#[test]
fn arena_binds_every_strategy() {
    let map = load_arena();
    let doc = map.document();
    let table = map.table();
    let section_of = |raw: &str| {
        let el = doc.find_by_id(raw).expect("element present");
        table
            .record_for(el)
            .map(|r| map.index().record(r).section.id.clone())
    };

    assert_eq!(section_of("232-group").as_deref(), Some("s232"));
    assert_eq!(section_of("path232").as_deref(), Some("s232"));
    assert_eq!(section_of("t305-group").as_deref(), Some("t305"));
    assert_eq!(section_of("stage"), None);
    assert_eq!(section_of("background"), None);
    // The layer holds several sections, so it must not stand for any one of them.
    assert_eq!(section_of("Layer_1"), None);
    assert_eq!(section_of("labels"), None);

    let summary = map.summary();
    assert_eq!(summary.proximity_matches, 2);
    assert_eq!(summary.heuristic_matches, 0);
    assert_eq!(summary.label_matches, 3);
    assert_eq!(summary.dropped_aliases, 2);
}

#[test]
fn sanitizing_removes_active_content_before_matching() {
    let map = load_arena();
    let doc = map.document();
    for id in doc.ids() {
        let el = doc.element(id);
        assert_ne!(el.tag(), "script");
        assert_ne!(el.tag(), "metadata");
        assert!(el.attr("onclick").is_none());
        assert_ne!(el.attr("pointer-events"), Some("none"));
    }
    assert!(doc.find_by_id("base").is_none());
}

#[test]
fn clicks_resolve_through_each_binding_kind() {
    let map = load_arena();

    let (outcome, paths) = click_at(&map, 1, 200.0, 120.0);
    assert_eq!(resolved_section(&outcome), Some("s232"));
    assert_eq!(paths, vec![ResolutionPath::Mapping]);

    let (outcome, _) = click_at(&map, 2, 500.0, 120.0);
    assert_eq!(resolved_section(&outcome), Some("t305"));

    let (outcome, paths) = click_at(&map, 3, 875.0, 120.0);
    assert_eq!(resolved_section(&outcome), Some("s101"));
    assert_eq!(paths, vec![ResolutionPath::Proximity]);

    let (outcome, _) = click_at(&map, 4, 1075.0, 120.0);
    assert_eq!(resolved_section(&outcome), Some("s102"));

    // The orchestra shape has no identifier and its label only resolves heuristically,
    // so the shape stays unbound and only a click on the label text reaches it.
    let (outcome, paths) = click_at(&map, 5, 600.0, 420.0);
    assert_eq!(outcome, ClickOutcome::Unresolved);
    assert!(paths.iter().all(|p| *p == ResolutionPath::None));

    let (outcome, _) = click_at(&map, 6, 600.0, 470.0);
    assert_eq!(resolved_section(&outcome), Some("orch"));
    assert!(matches!(outcome, ClickOutcome::Resolved { stage: ResolutionStage::Tertiary, .. }));
}

#[test]
fn decoration_and_background_stay_unresolved() {
    let map = load_arena();
    for (i, (x, y)) in [(200.0, 650.0), (600.0, 50.0), (1100.0, 500.0)].into_iter().enumerate() {
        let (outcome, paths) = click_at(&map, 10 + i as u64, x, y);
        assert_eq!(outcome, ClickOutcome::Unresolved, "click at ({x}, {y})");
        assert!(paths.iter().all(|p| *p == ResolutionPath::None));
    }
}

#[test]
fn availability_drives_visual_state() {
    let map = load_arena();
    let doc = map.document();
    let state_of = |raw: &str, selection: Option<&str>| {
        let el = doc.find_by_id(raw).expect("element present");
        map.visual_states(selection)
            .into_iter()
            .find(|(e, _)| *e == el)
            .map(|(_, s)| s)
    };
    assert_eq!(state_of("232-group", None), Some(VisualState::Available));
    assert_eq!(state_of("t305-group", None), Some(VisualState::Unavailable));
    assert_eq!(state_of("t305-group", Some("t305")), Some(VisualState::Selected));

    let s232 = map.index().record_for_section("s232").unwrap();
    let availability = map.index().record(s232).availability.clone().unwrap();
    assert!(availability.has_inventory);
    assert_eq!(availability.min_price, Some(89.5));
}

#[test]
fn fixture_config_overrides_defaults() {
    let path = repo_root()
        .join("fixtures")
        .join("venues")
        .join("resolver.config.json");
    let text = fs::read_to_string(path).expect("read config");
    let config = ResolverConfig::from_json_str(&text).expect("valid config");
    assert_eq!(config.geometry.max_label_distance, 150.0);
    assert_eq!(config.max_ancestor_depth, 6);
    assert_eq!(config.geometry.min_shape_area, 80.0);
    assert_eq!(config.heuristic.min_confidence, 60);
}
