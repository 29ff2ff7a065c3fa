// Tests for schema discovery

use geoharvest_core::error::SinkError;
use geoharvest_core::record::materialize;
use geoharvest_core::schema::{MAX_FIELD_NAME_LEN, SchemaRegistry, TEXT_FIELD_WIDTH};
use geoharvest_core::sink::{FeatureSink, MemorySink};
use geoharvest_scanner::{ListingNode, ResponseMetadata};
use serde_json::{Value, json};

fn listing(value: Value) -> ListingNode {
    ListingNode::new(value.as_object().expect("fixture must be an object").clone())
}

// ============================================================================
// Registration Tests
// ============================================================================

#[test]
fn test_observe_registers_non_reserved_keys_in_order() {
    let mut schema = SchemaRegistry::new();
    let mut sink = MemorySink::new();

    let registered = schema
        .observe(
            &listing(json!({
                "Longitude": -93.15801,
                "PostingURL": "/ram/zip/4461977531.html",
                "Ask": "0",
                "Latitude": 44.953179,
                "PostingTitle": "Free burning / Fire wood Pallets"
            })),
            &mut sink,
        )
        .unwrap();

    assert_eq!(registered, vec!["PostingURL", "Ask", "PostingTitle"]);
    assert_eq!(schema.fields(), ["PostingUR", "Ask", "PostingTi"]);
    assert_eq!(sink.field_names(), vec!["PostingUR", "Ask", "PostingTi"]);
    assert!(sink.fields().iter().all(|f| f.width == TEXT_FIELD_WIDTH));
}

#[test]
fn test_observe_never_registers_coordinates() {
    let mut schema = SchemaRegistry::new();
    let mut sink = MemorySink::new();

    schema
        .observe(&listing(json!({"Latitude": 1.0, "Longitude": 2.0})), &mut sink)
        .unwrap();

    assert!(schema.is_empty());
    assert!(!schema.contains_key("Latitude"));
    assert!(!schema.contains_key("Longitude"));
    assert!(sink.fields().is_empty());
}

#[test]
fn test_observe_same_keys_twice_registers_nothing_new() {
    let mut schema = SchemaRegistry::new();
    let mut sink = MemorySink::new();
    let node = listing(json!({"Ask": "5", "PostingID": "1"}));

    schema.observe(&node, &mut sink).unwrap();
    let second = schema.observe(&node, &mut sink).unwrap();

    assert!(second.is_empty());
    assert_eq!(sink.fields().len(), 2);
}

#[test]
fn test_schema_size_is_non_decreasing() {
    let mut schema = SchemaRegistry::new();
    let mut sink = MemorySink::new();
    let nodes = vec![
        json!({"Ask": "5", "PostingID": "1"}),
        json!({"PostingID": "2"}),
        json!({"Ask": "", "ImageThumb": "http://images.example.org/a.jpg"}),
        json!({}),
        json!({"CategoryID": "101", "Ask": "0"}),
    ];

    let mut previous = 0;
    for node in nodes {
        schema.observe(&listing(node), &mut sink).unwrap();
        assert!(schema.key_count() >= previous);
        previous = schema.key_count();
    }

    assert_eq!(schema.key_count(), 4);
    assert_eq!(schema.fields(), ["Ask", "PostingID", "ImageThum", "CategoryI"]);
}

// ============================================================================
// Truncation Collision Tests
// ============================================================================

#[test]
fn test_keys_differing_past_limit_share_one_field() {
    let mut schema = SchemaRegistry::new();
    let mut sink = MemorySink::new();

    schema
        .observe(&listing(json!({"PostingTitleShort": "a"})), &mut sink)
        .unwrap();
    let registered = schema
        .observe(&listing(json!({"PostingTitleLong": "b"})), &mut sink)
        .unwrap();

    assert_eq!(registered, vec!["PostingTitleLong"]);
    assert_eq!(schema.key_count(), 2);
    assert_eq!(schema.field_count(), 1);
    assert_eq!(sink.field_names(), vec!["PostingTi"]);
    assert_eq!(
        schema.field_for("PostingTitleShort"),
        schema.field_for("PostingTitleLong")
    );
}

#[test]
fn test_field_names_respect_limit() {
    let mut schema = SchemaRegistry::new();
    let mut sink = MemorySink::new();

    schema
        .observe(
            &listing(json!({"AVeryLongAttributeNameIndeed": "x", "Id": "1"})),
            &mut sink,
        )
        .unwrap();

    assert!(
        sink.fields()
            .iter()
            .all(|f| f.name.chars().count() <= MAX_FIELD_NAME_LEN)
    );
}

// ============================================================================
// Ordering Invariant Tests
// ============================================================================

#[test]
fn test_every_written_attribute_is_registered_first() {
    let mut schema = SchemaRegistry::new();
    let mut sink = MemorySink::new();
    let metadata = ResponseMetadata::new("//duluth.example.org");

    let nodes = vec![
        json!({"Longitude": -92.1, "Latitude": 46.8, "PostingURL": "/a.html", "Ask": "1"}),
        json!({"Longitude": -92.2, "Latitude": 46.7, "PostingURL": "/b.html", "Color": "red"}),
    ];

    for value in nodes {
        let node = listing(value);
        schema.observe(&node, &mut sink).unwrap();
        let record = materialize(node, &metadata, &schema).unwrap();

        for name in record.attributes.keys() {
            assert!(sink.fields().iter().any(|f| &f.name == name));
        }
        sink.append_record(&record).unwrap();
    }

    assert_eq!(sink.records_written(), 2);
}

#[test]
fn test_failed_field_creation_leaves_key_unregistered() {
    let mut schema = SchemaRegistry::new();
    let mut sink = MemorySink::new();
    sink.add_text_field("Ask", TEXT_FIELD_WIDTH).unwrap();

    let result = schema.observe(&listing(json!({"Ask": "5"})), &mut sink);

    assert!(matches!(result, Err(SinkError::DuplicateField(ref name)) if name == "Ask"));
    assert!(!schema.contains_key("Ask"));
    assert!(schema.fields().is_empty());
}
