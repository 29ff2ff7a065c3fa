//! Output schema discovered while listings stream in.
//!
//! Listings carry different attribute sets, so the dataset's fields are not
//! known up front. [`SchemaRegistry::observe`] adds a text field to the sink
//! the first time a key shows up, before any record carrying it is written.

use crate::error::SinkError;
use crate::sink::FeatureSink;
use geoharvest_scanner::ListingNode;
use geoharvest_scanner::response::{LATITUDE_FIELD, LONGITUDE_FIELD};
use std::collections::HashSet;
use tracing::debug;

/// Field names are cut to this many characters.
pub const MAX_FIELD_NAME_LEN: usize = 9;

/// Width of every text field created in the sink.
pub const TEXT_FIELD_WIDTH: usize = 255;

/// Keys that become geometry rather than attributes.
pub const RESERVED_KEYS: [&str; 2] = [LATITUDE_FIELD, LONGITUDE_FIELD];

pub fn field_name(key: &str) -> String {
    key.chars().take(MAX_FIELD_NAME_LEN).collect()
}

pub fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Keys seen so far and the fields they were registered under.
///
/// Two keys sharing their first [`MAX_FIELD_NAME_LEN`] characters map to
/// the same field. The second key is still recorded as seen but no new
/// field is created for it.
#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    known_keys: HashSet<String>,
    fields: Vec<String>,
    field_names: HashSet<String>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every unseen, non-reserved key on `listing`, creating sink
    /// fields as needed. Returns the keys registered by this call.
    pub fn observe<S: FeatureSink + ?Sized>(
        &mut self,
        listing: &ListingNode,
        sink: &mut S,
    ) -> Result<Vec<String>, SinkError> {
        let mut registered = Vec::new();

        for (key, _) in listing.attributes() {
            if is_reserved(key) || self.known_keys.contains(key) {
                continue;
            }

            let name = field_name(key);
            if self.field_names.contains(&name) {
                debug!("Key '{}' collapses onto existing field '{}'", key, name);
            } else {
                sink.add_text_field(&name, TEXT_FIELD_WIDTH)?;
                debug!("Added field '{}' for key '{}'", name, key);
                self.field_names.insert(name.clone());
                self.fields.push(name);
            }

            self.known_keys.insert(key.clone());
            registered.push(key.clone());
        }

        Ok(registered)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.known_keys.contains(key)
    }

    /// The field a registered key writes to, `None` if the key is unseen.
    pub fn field_for(&self, key: &str) -> Option<String> {
        self.contains_key(key).then(|| field_name(key))
    }

    /// Field names in registration order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn key_count(&self) -> usize {
        self.known_keys.len()
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known_keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_name_truncates() {
        assert_eq!(field_name("PostingTitle"), "PostingTi");
        assert_eq!(field_name("Ask"), "Ask");
        assert_eq!(field_name(""), "");
    }

    #[test]
    fn test_field_name_counts_chars_not_bytes() {
        assert_eq!(field_name("ÅÅÅÅÅÅÅÅÅÅÅ"), "ÅÅÅÅÅÅÅÅÅ");
    }

    #[test]
    fn test_reserved_keys() {
        assert!(is_reserved("Latitude"));
        assert!(is_reserved("Longitude"));
        assert!(!is_reserved("latitude"));
        assert!(!is_reserved("PostingURL"));
    }
}
