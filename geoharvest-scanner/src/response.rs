use crate::error::{Result, ScanError};
use serde_json::{Map, Value};

/// Presence of this member marks a node as a server-side cluster.
pub const CLUSTER_MARKER: &str = "GeoCluster";
/// Relative path a cluster must be re-queried with.
pub const CLUSTER_URL_FIELD: &str = "url";
pub const LATITUDE_FIELD: &str = "Latitude";
pub const LONGITUDE_FIELD: &str = "Longitude";
pub const POSTING_URL_FIELD: &str = "PostingURL";
pub const BASE_URL_FIELD: &str = "baseurl";

/// One entry of a search response page.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultNode {
    Cluster(ClusterNode),
    Listing(ListingNode),
}

impl ResultNode {
    /// Route a raw JSON object to its variant. The decision only looks at
    /// whether the cluster marker is present, so it never fails.
    pub fn classify(fields: Map<String, Value>) -> Self {
        if fields.contains_key(CLUSTER_MARKER) {
            ResultNode::Cluster(ClusterNode { fields })
        } else {
            ResultNode::Listing(ListingNode { fields })
        }
    }

    pub fn is_cluster(&self) -> bool {
        matches!(self, ResultNode::Cluster(_))
    }

    pub fn fields(&self) -> &Map<String, Value> {
        match self {
            ResultNode::Cluster(cluster) => &cluster.fields,
            ResultNode::Listing(listing) => &listing.fields,
        }
    }

    pub fn into_fields(self) -> Map<String, Value> {
        match self {
            ResultNode::Cluster(cluster) => cluster.fields,
            ResultNode::Listing(listing) => listing.fields,
        }
    }
}

/// Placeholder standing in for several nearby listings.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterNode {
    fields: Map<String, Value>,
}

impl ClusterNode {
    /// Relative path (starting with `/`) of the follow-up search.
    pub fn expansion_path(&self) -> Result<&str> {
        string_field(&self.fields, CLUSTER_URL_FIELD)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// A single geotagged posting with an open-ended attribute bag.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingNode {
    fields: Map<String, Value>,
}

impl ListingNode {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Point coordinates as `(longitude, latitude)`.
    pub fn coordinates(&self) -> Result<(f64, f64)> {
        let longitude = coordinate(&self.fields, LONGITUDE_FIELD)?;
        let latitude = coordinate(&self.fields, LATITUDE_FIELD)?;
        Ok((longitude, latitude))
    }

    pub fn posting_url(&self) -> Result<&str> {
        string_field(&self.fields, POSTING_URL_FIELD)
    }

    pub fn set_posting_url(&mut self, url: String) {
        self.fields
            .insert(POSTING_URL_FIELD.to_string(), Value::String(url));
    }

    /// Every member of the node in response order, coordinates included.
    pub fn attributes(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// Response metadata: everything after the node list.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseMetadata {
    base_url: String,
    extra: Map<String, Value>,
}

impl ResponseMetadata {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            extra: Map::new(),
        }
    }

    fn from_object(mut extra: Map<String, Value>) -> Result<Self> {
        let base_url = match extra.remove(BASE_URL_FIELD) {
            Some(Value::String(base_url)) => base_url,
            Some(other) => {
                return Err(ScanError::InvalidField {
                    field: BASE_URL_FIELD,
                    reason: format!("expected a string, found {}", other),
                });
            }
            None => {
                return Err(ScanError::MissingField {
                    field: BASE_URL_FIELD,
                });
            }
        };
        Ok(Self { base_url, extra })
    }

    /// Scheme-relative host, e.g. `//minneapolis.craigslist.org`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Number of clusters the server reported for this page.
    pub fn clustered(&self) -> Option<u64> {
        self.extra.get("clustered").and_then(Value::as_u64)
    }

    pub fn geocoded(&self) -> Option<u64> {
        self.extra.get("geocoded").and_then(Value::as_u64)
    }

    pub fn non_geocoded(&self) -> Option<u64> {
        self.extra.get("NonGeocoded").and_then(Value::as_u64)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

/// A decoded search response: `[nodes, metadata]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub nodes: Vec<ResultNode>,
    pub metadata: ResponseMetadata,
}

impl ResponseEnvelope {
    pub fn from_json_str(body: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(body)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Array(mut parts) = value else {
            return Err(ScanError::UnexpectedShape(
                "response is not a JSON array".to_string(),
            ));
        };
        if parts.len() != 2 {
            return Err(ScanError::UnexpectedShape(format!(
                "expected [nodes, metadata], found {} elements",
                parts.len()
            )));
        }

        let metadata = match parts.pop() {
            Some(Value::Object(object)) => ResponseMetadata::from_object(object)?,
            _ => {
                return Err(ScanError::UnexpectedShape(
                    "metadata is not a JSON object".to_string(),
                ));
            }
        };

        let Some(Value::Array(raw_nodes)) = parts.pop() else {
            return Err(ScanError::UnexpectedShape(
                "node list is not a JSON array".to_string(),
            ));
        };

        let nodes = raw_nodes
            .into_iter()
            .enumerate()
            .map(|(idx, raw)| match raw {
                Value::Object(fields) => Ok(ResultNode::classify(fields)),
                other => Err(ScanError::UnexpectedShape(format!(
                    "node {} is not a JSON object: {}",
                    idx, other
                ))),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { nodes, metadata })
    }

    pub fn cluster_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_cluster()).count()
    }

    pub fn listing_count(&self) -> usize {
        self.nodes.len() - self.cluster_count()
    }
}

fn string_field<'a>(fields: &'a Map<String, Value>, field: &'static str) -> Result<&'a str> {
    match fields.get(field) {
        Some(Value::String(s)) => Ok(s),
        None | Some(Value::Null) => Err(ScanError::MissingField { field }),
        Some(other) => Err(ScanError::InvalidField {
            field,
            reason: format!("expected a string, found {}", other),
        }),
    }
}

// Coordinates arrive as JSON numbers, but numeric strings are accepted too.
fn coordinate(fields: &Map<String, Value>, field: &'static str) -> Result<f64> {
    let parsed = match fields.get(field) {
        None | Some(Value::Null) => return Err(ScanError::MissingField { field }),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    match parsed {
        Some(value) if value.is_finite() => Ok(value),
        _ => Err(ScanError::InvalidField {
            field,
            reason: format!("not a coordinate: {}", fields[field]),
        }),
    }
}
