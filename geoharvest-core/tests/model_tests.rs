// Tests for search targets and work items

use geoharvest_core::error::HarvestError;
use geoharvest_core::model::{
    DEFAULT_CATEGORY, DEFAULT_DOMAIN, SearchTarget, WorkItem, targets_for_sites,
};

#[test]
fn test_work_item_url_shape() {
    let target = SearchTarget::new("minneapolis", "cta", "chevy truck");
    let item = target.work_item(DEFAULT_DOMAIN).unwrap();

    assert_eq!(
        item.as_str(),
        "http://minneapolis.craigslist.org/jsonsearch/cta/?query=chevy+truck"
    );
}

#[test]
fn test_work_item_empty_query_still_present() {
    let target = SearchTarget::new("duluth", DEFAULT_CATEGORY, "");
    let item = target.work_item("example.org").unwrap();

    assert_eq!(item.as_str(), "http://duluth.example.org/jsonsearch/sss/?query=");
}

#[test]
fn test_work_item_encodes_query() {
    let target = SearchTarget::new("fargo", "zip", "saw & drill/bits");
    let item = target.work_item(DEFAULT_DOMAIN).unwrap();

    assert!(item.as_str().ends_with("?query=saw+%26+drill%2Fbits"));
}

#[test]
fn test_work_item_rejects_empty_site() {
    let target = SearchTarget::new("", DEFAULT_CATEGORY, "boat");
    assert!(matches!(
        target.work_item(DEFAULT_DOMAIN),
        Err(HarvestError::InvalidTarget(_))
    ));
}

#[test]
fn test_work_item_rejects_site_with_path() {
    let target = SearchTarget::new("evil.com/x", DEFAULT_CATEGORY, "boat");
    assert!(matches!(
        target.work_item(DEFAULT_DOMAIN),
        Err(HarvestError::InvalidTarget(_))
    ));
}

#[test]
fn test_targets_for_sites() {
    let sites = vec!["minneapolis".to_string(), "brainerd".to_string()];
    let targets = targets_for_sites(&sites, "sss", "dodge ram 1500");

    assert_eq!(targets.len(), 2);
    assert_eq!(targets[1].site, "brainerd");
    assert!(targets.iter().all(|t| t.query == "dodge ram 1500"));
}

#[test]
fn test_work_item_display() {
    let item = WorkItem::from("http://a.example.org/");
    assert_eq!(item.to_string(), "http://a.example.org/");
    assert_eq!(item.into_string(), "http://a.example.org/");
}
