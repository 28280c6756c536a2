//! Block definition index and reference counting

mod common;

use dxfcore::blocks::{BlockRef, ReferenceRule};
use dxfcore::{CadDocument, DxfEntity};

fn insert(doc: &CadDocument, block: &str) -> DxfEntity {
    let mut insert = doc.new_entity("INSERT");
    insert.set("name", block).unwrap();
    insert
}

/// Block "A" inserted twice, block "B" never
fn sample() -> CadDocument {
    let mut doc = CadDocument::new();
    doc.new_block("A").unwrap();
    doc.new_block("B").unwrap();
    for _ in 0..2 {
        let entity = insert(&doc, "A");
        doc.add_to_layout("Model", entity).unwrap();
    }
    doc.rebuild_block_index();
    doc
}

#[test]
fn test_reference_counts() {
    let doc = sample();
    assert_eq!(doc.reference_count("A"), 2);
    assert_eq!(doc.reference_count("B"), 0);
    let a = doc.block("A").unwrap().record_handle;
    assert_eq!(doc.reference_count(a), 2);

    let unreferenced = doc.find_unreferenced_blocks();
    assert_eq!(unreferenced.len(), 1);
    assert!(unreferenced.contains("B"));
}

#[test]
fn test_counts_survive_roundtrip() {
    let mut doc = common::roundtrip(&sample());
    doc.rebuild_block_index();
    assert_eq!(doc.reference_count("A"), 2);
    assert_eq!(
        doc.find_unreferenced_blocks().into_iter().collect::<Vec<_>>(),
        vec!["B".to_string()]
    );
}

#[test]
fn test_rebuild_is_idempotent() {
    let mut doc = sample();
    let first = doc.block_references().handle_counts().clone();
    let index = doc.block_index().clone();
    doc.rebuild_block_index();
    assert_eq!(doc.block_references().handle_counts(), &first);
    assert_eq!(doc.block_index(), &index);
}

#[test]
fn test_dangling_insert_is_reported() {
    let mut doc = sample();
    let entity = insert(&doc, "MISSING");
    doc.add_to_layout("Model", entity).unwrap();
    doc.rebuild_block_index();

    let dangling = doc.dangling_block_references();
    assert_eq!(dangling.len(), 1);
    assert_eq!(dangling[0].target, BlockRef::Name("MISSING".to_string()));
}

#[test]
fn test_block_in_block_counts() {
    let mut doc = sample();
    let entity = insert(&doc, "B");
    doc.add_to_block("A", entity).unwrap();
    doc.rebuild_block_index();
    assert_eq!(doc.reference_count("B"), 1);
    assert!(doc.find_unreferenced_blocks().is_empty());
}

/// Counts block names stored in XDATA string tags of an application
struct TitleBlockRule;

impl ReferenceRule for TitleBlockRule {
    fn name(&self) -> &'static str {
        "title-block"
    }

    fn collect(&self, entity: &DxfEntity, refs: &mut Vec<BlockRef>) {
        if let Some(tags) = entity.xdata.get("TITLER") {
            refs.extend(
                tags.iter()
                    .filter(|t| t.code == 1000)
                    .filter_map(|t| t.as_str())
                    .map(BlockRef::from),
            );
        }
    }
}

#[test]
fn test_custom_reference_rule() {
    let mut doc = sample();
    doc.new_table_entry(dxfcore::TableKind::AppId, "TITLER").unwrap();
    let mut line = doc.new_entity("LINE");
    line.xdata
        .add("TITLER", vec![dxfcore::Tag::string(1000, "B")])
        .unwrap();
    doc.add_to_layout("Model", line).unwrap();

    doc.rebuild_block_index();
    assert_eq!(doc.reference_count("B"), 0);

    doc.add_reference_rule(Box::new(TitleBlockRule));
    doc.rebuild_block_index();
    assert_eq!(doc.reference_count("B"), 1);
}
