pub mod error;
pub mod fetcher;
pub mod response;

pub use error::ScanError;
pub use fetcher::Fetcher;
pub use response::{ClusterNode, ListingNode, ResponseEnvelope, ResponseMetadata, ResultNode};
