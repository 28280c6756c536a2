//! Layout management and layout round-trips

mod common;

use common::{modelspace_count, roundtrip, roundtrip_binary};
use dxfcore::{CadDocument, DxfError, DxfVersion, Vector3};

fn circle(doc: &CadDocument, radius: f64) -> dxfcore::DxfEntity {
    let mut circle = doc.new_entity("CIRCLE");
    circle.set("center", Vector3::ZERO).unwrap();
    circle.set("radius", radius).unwrap();
    circle
}

fn sample() -> CadDocument {
    let mut doc = CadDocument::new();
    doc.new_layout("Sheet").unwrap();
    for (layout, radius) in [("Model", 1.0), ("Model", 2.0), ("Layout1", 3.0), ("Sheet", 4.0)] {
        let entity = circle(&doc, radius);
        doc.add_to_layout(layout, entity).unwrap();
    }
    doc
}

fn radii(doc: &CadDocument, layout: &str) -> Vec<f64> {
    doc.layout_entities(layout)
        .unwrap()
        .filter_map(|e| e.get_f64("radius"))
        .collect()
}

#[test]
fn test_exactly_one_modelspace() {
    let doc = sample();
    let models: Vec<_> = doc.layouts.iter().filter(|l| l.is_modelspace()).collect();
    assert_eq!(models.len(), 1);
    assert!(doc.db().is_alive(doc.modelspace().block_record));
}

#[test]
fn test_layouts_survive_roundtrip() {
    let doc = sample();
    for reloaded in [roundtrip(&doc), roundtrip_binary(&doc)] {
        assert_eq!(reloaded.layout_names(), vec!["Model", "Layout1", "Sheet"]);
        assert_eq!(reloaded.active_layout().unwrap().name, "Layout1");
        assert_eq!(radii(&reloaded, "Model"), vec![1.0, 2.0]);
        assert_eq!(radii(&reloaded, "Layout1"), vec![3.0]);
        assert_eq!(radii(&reloaded, "Sheet"), vec![4.0]);
    }
}

#[test]
fn test_active_layout_survives_roundtrip() {
    let mut doc = sample();
    doc.set_active_layout("Sheet").unwrap();
    let reloaded = roundtrip(&doc);
    assert_eq!(reloaded.active_layout().unwrap().name, "Sheet");
    assert_eq!(radii(&reloaded, "Sheet"), vec![4.0]);
    assert_eq!(radii(&reloaded, "Layout1"), vec![3.0]);
}

#[test]
fn test_paperspace_entities_are_flagged() {
    let doc = sample();
    for entity in doc.layout_entities("Sheet").unwrap() {
        assert!(entity.paperspace());
    }
    for entity in doc.layout_entities("Model").unwrap() {
        assert!(!entity.paperspace());
    }
}

#[test]
fn test_deleted_layout_is_gone_after_save() {
    let mut doc = sample();
    doc.delete_layout("Sheet").unwrap();
    doc.purge();
    let reloaded = roundtrip(&doc);
    assert_eq!(reloaded.layout_names(), vec!["Model", "Layout1"]);
    assert!(reloaded.block("*Paper_Space0").is_none());
    assert_eq!(modelspace_count(&reloaded), 2);
}

#[test]
fn test_r12_layouts_roundtrip() {
    let mut doc = CadDocument::with_version(DxfVersion::AC1009);
    let model = circle(&doc, 1.0);
    doc.add_to_layout("Model", model).unwrap();
    let paper = circle(&doc, 2.0);
    doc.add_to_layout("Layout1", paper).unwrap();
    assert!(matches!(
        doc.new_layout("Second"),
        Err(DxfError::InvalidOperation(_))
    ));

    let reloaded = roundtrip(&doc);
    assert!(reloaded.version.is_legacy());
    assert_eq!(radii(&reloaded, "Model"), vec![1.0]);
    let paper = reloaded.active_layout().unwrap().name.clone();
    assert_eq!(radii(&reloaded, &paper), vec![2.0]);
}

#[test]
fn test_layout_lookup_is_case_insensitive() {
    let doc = sample();
    assert!(doc.layout("sheet").is_ok());
    assert!(doc.layout("MODEL").unwrap().is_modelspace());
    assert!(matches!(doc.layout("Nope"), Err(DxfError::KeyNotFound(_))));
}
