pub mod error;
pub mod harvest;
pub mod model;
pub mod record;
pub mod report;
pub mod resolve;
pub mod schema;
pub mod sink;

pub use error::{HarvestError, SinkError};
pub use harvest::{
    HarvestOptions, HarvestProgress, HarvestProgressCallback, HarvestState, HarvestSummary,
    Harvester, execute_harvest,
};
pub use model::{SearchTarget, WorkItem};
pub use record::{OutputRecord, materialize};
pub use schema::SchemaRegistry;
pub use sink::{FeatureSink, GeoJsonSeqSink, MemorySink};

const BANNER: &str = r#"
  ┌──────────────────────────────┐
  │   G E O H A R V E S T   ⌖    │
  └──────────────────────────────┘"#;

pub fn print_banner() {
    println!("{}", BANNER);
    println!("  classifieds map search -> point dataset  v{}", env!("CARGO_PKG_VERSION"));
    println!();
}
