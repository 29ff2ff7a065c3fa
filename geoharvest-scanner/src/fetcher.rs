use crate::error::{Result, ScanError};
use crate::response::ResponseEnvelope;
use reqwest::Client;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, HeaderMap, HeaderName, HeaderValue,
};
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Copied from a desktop Firefox session; the search endpoint turns away
/// obvious bots.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux i686 on x86_64; rv:28.0) Gecko/20100101 Firefox/28.0";

/// Issues search requests and decodes their JSON payloads.
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(Self::browser_headers())
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client })
    }

    /// The fixed header set sent with every request, User-Agent aside.
    pub fn browser_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-us,en;q=0.8,pt-br;q=0.6,pt;q=0.4,es;q=0.2"),
        );
        headers.insert(
            HeaderName::from_static("x-requested-with"),
            HeaderValue::from_static("XMLHttpRequest"),
        );
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
        headers
    }

    /// GET `url` and decode the `[nodes, metadata]` payload.
    ///
    /// Anything but a 200 is an error; the caller decides whether that ends
    /// the run. No retries are attempted.
    pub async fn fetch(&self, url: &str) -> Result<ResponseEnvelope> {
        Url::parse(url).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", url, e)))?;

        debug!("Fetching {}", url);
        let start = Instant::now();
        let response = self.client.get(url).send().await?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(ScanError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.text().await?;
        let envelope = ResponseEnvelope::from_json_str(&body)?;

        let metadata = &envelope.metadata;
        debug!(
            "Fetched {} in {:?}: {} listings, {} clusters (server reports {:?} clustered, {:?} geocoded, {:?} not geocoded)",
            url,
            start.elapsed(),
            envelope.listing_count(),
            envelope.cluster_count(),
            metadata.clustered(),
            metadata.geocoded(),
            metadata.non_geocoded()
        );

        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path, query_param},
    };

    const PAGE: &str = r#"[[{"Longitude":-93.278732,"PostingURL":"/hnp/for/4421028222.html","Ask":"5","Latitude":44.874455,"PostingTitle":"Put another log on the fire"}],{"baseurl":"//minneapolis.craigslist.org","clustered":0}]"#;

    #[tokio::test]
    async fn test_fetch_decodes_page() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/jsonsearch/sss/"))
            .and(query_param("query", "firewood"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/json")
                    .set_body_string(PAGE),
            )
            .mount(&mock_server)
            .await;

        let fetcher = Fetcher::new().unwrap();
        let url = format!("{}/jsonsearch/sss/?query=firewood", mock_server.uri());
        let envelope = fetcher.fetch(&url).await.unwrap();

        assert_eq!(envelope.nodes.len(), 1);
        assert_eq!(envelope.listing_count(), 1);
        assert_eq!(
            envelope.metadata.base_url(),
            "//minneapolis.craigslist.org"
        );
        assert_eq!(envelope.metadata.clustered(), Some(0));
        assert_eq!(envelope.metadata.geocoded(), None);
    }

    #[tokio::test]
    async fn test_fetch_sends_browser_headers() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(header("x-requested-with", "XMLHttpRequest"))
            .and(header("user-agent", BROWSER_USER_AGENT))
            .and(header("cache-control", "max-age=0"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .expect(1)
            .mount(&mock_server)
            .await;

        let fetcher = Fetcher::new().unwrap();
        let result = fetcher.fetch(&format!("{}/", mock_server.uri())).await;

        assert!(result.is_ok(), "headers did not match: {:?}", result.err());
    }

    #[tokio::test]
    async fn test_fetch_non_200_is_status_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let fetcher = Fetcher::new().unwrap();
        let url = format!("{}/jsonsearch/sss/", mock_server.uri());
        let err = fetcher.fetch(&url).await.unwrap_err();

        match err {
            ScanError::Status { url: failed, status } => {
                assert_eq!(status, 500);
                assert_eq!(failed, url);
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_other_2xx_is_still_an_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        let fetcher = Fetcher::new().unwrap();
        let err = fetcher
            .fetch(&format!("{}/", mock_server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::Status { status: 204, .. }));
    }

    #[tokio::test]
    async fn test_fetch_html_body_is_decode_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<html><body>blocked</body></html>"),
            )
            .mount(&mock_server)
            .await;

        let fetcher = Fetcher::new().unwrap();
        let err = fetcher
            .fetch(&format!("{}/", mock_server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::JsonError(_)));
    }

    #[tokio::test]
    async fn test_fetch_invalid_url() {
        let fetcher = Fetcher::new().unwrap();
        let err = fetcher.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, ScanError::InvalidUrl(_)));
    }
}
