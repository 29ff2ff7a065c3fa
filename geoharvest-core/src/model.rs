use crate::error::{HarvestError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

pub const DEFAULT_DOMAIN: &str = "craigslist.org";
/// "For sale" section.
pub const DEFAULT_CATEGORY: &str = "sss";

/// One site to search, fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTarget {
    pub site: String,
    pub category: String,
    pub query: String,
}

impl SearchTarget {
    pub fn new(
        site: impl Into<String>,
        category: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        Self {
            site: site.into(),
            category: category.into(),
            query: query.into(),
        }
    }

    /// `http://{site}.{domain}/jsonsearch/{category}/?query={query}`
    pub fn work_item(&self, domain: &str) -> Result<WorkItem> {
        if self.site.is_empty() || self.site.contains(['/', ':', '?', '#']) {
            return Err(HarvestError::InvalidTarget(format!(
                "site '{}' is not a subdomain label",
                self.site
            )));
        }

        let base = format!(
            "http://{}.{}/jsonsearch/{}/",
            self.site, domain, self.category
        );
        let mut url = Url::parse(&base)
            .map_err(|e| HarvestError::InvalidTarget(format!("{}: {}", base, e)))?;
        url.query_pairs_mut().append_pair("query", &self.query);

        Ok(WorkItem::new(url.to_string()))
    }
}

/// Build one target per site, all sharing the category and query.
pub fn targets_for_sites(sites: &[String], category: &str, query: &str) -> Vec<SearchTarget> {
    sites
        .iter()
        .map(|site| SearchTarget::new(site.as_str(), category, query))
        .collect()
}

/// A request URL waiting in the harvest queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkItem(String);

impl WorkItem {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkItem {
    fn from(url: &str) -> Self {
        Self(url.to_string())
    }
}
