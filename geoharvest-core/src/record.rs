use crate::resolve::absolute_url;
use crate::schema::SchemaRegistry;
use geoharvest_scanner::error::Result;
use geoharvest_scanner::{ListingNode, ResponseMetadata};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// A point plus its text attributes, keyed by field name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRecord {
    pub longitude: f64,
    pub latitude: f64,
    pub attributes: BTreeMap<String, String>,
}

impl OutputRecord {
    pub fn point(&self) -> (f64, f64) {
        (self.longitude, self.latitude)
    }

    pub fn attribute(&self, field: &str) -> Option<&str> {
        self.attributes.get(field).map(String::as_str)
    }
}

/// Build the record for one listing.
///
/// The posting URL is made absolute before attributes are copied. Only keys
/// already in `schema` are copied, so the listing must have been observed
/// first. When two keys share a field the later one in the listing wins.
pub fn materialize(
    mut listing: ListingNode,
    metadata: &ResponseMetadata,
    schema: &SchemaRegistry,
) -> Result<OutputRecord> {
    let (longitude, latitude) = listing.coordinates()?;

    let posting_url = absolute_url(metadata, listing.posting_url()?);
    listing.set_posting_url(posting_url);

    let mut attributes = BTreeMap::new();
    for (key, value) in listing.attributes() {
        let Some(field) = schema.field_for(key) else {
            continue;
        };
        if let Some(text) = attribute_text(value) {
            attributes.insert(field, text);
        }
    }

    Ok(OutputRecord {
        longitude,
        latitude,
        attributes,
    })
}

/// Render a JSON value as a text attribute. `null` has no text form.
pub fn attribute_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}
