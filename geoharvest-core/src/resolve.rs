// Relative URL resolution against a response's base host.

use crate::model::WorkItem;
use geoharvest_scanner::error::Result;
use geoharvest_scanner::{ClusterNode, ResponseMetadata};

/// Prepended to the scheme-relative `baseurl` of every response.
pub const URL_SCHEME: &str = "http:";

/// Plain concatenation: scheme, base host, then the server-supplied path.
pub fn absolute_url(metadata: &ResponseMetadata, relative: &str) -> String {
    format!("{}{}{}", URL_SCHEME, metadata.base_url(), relative)
}

/// Turn a cluster into the follow-up search that breaks it apart.
pub fn expand_cluster(cluster: &ClusterNode, metadata: &ResponseMetadata) -> Result<WorkItem> {
    let path = cluster.expansion_path()?;
    Ok(WorkItem::new(absolute_url(metadata, path)))
}
