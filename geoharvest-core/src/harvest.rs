use crate::error::{HarvestError, Result};
use crate::model::{SearchTarget, WorkItem};
use crate::record::materialize;
use crate::resolve::expand_cluster;
use crate::schema::SchemaRegistry;
use crate::sink::FeatureSink;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use geoharvest_scanner::{Fetcher, ResponseEnvelope, ResultNode, ScanError};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Options for configuring a harvest run
pub struct HarvestOptions {
    pub targets: Vec<SearchTarget>,
    pub domain: String,
    /// Maximum number of fetches in flight at once
    pub concurrency: usize,
    pub timeout_secs: u64,
    pub show_progress_bars: bool,
}

/// Snapshot handed to the progress callback after each fetched page
#[derive(Debug, Clone)]
pub struct HarvestProgress {
    pub url: String,
    pub queued: usize,
    pub urls_fetched: usize,
    pub records_written: usize,
}

/// Callback for reporting harvest progress
pub type HarvestProgressCallback = Arc<dyn Fn(HarvestProgress) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HarvestState {
    Seeding,
    Draining,
    Done,
    Aborted,
}

impl HarvestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HarvestState::Seeding => "seeding",
            HarvestState::Draining => "draining",
            HarvestState::Done => "done",
            HarvestState::Aborted => "aborted",
        }
    }
}

/// How a run ended. `error` is set exactly when `state` is `Aborted`.
#[derive(Debug)]
pub struct HarvestSummary {
    pub state: HarvestState,
    pub records_written: usize,
    pub urls_fetched: usize,
    pub clusters_expanded: usize,
    pub max_queue_len: usize,
    pub fields: Vec<String>,
    pub error: Option<HarvestError>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl HarvestSummary {
    pub fn is_done(&self) -> bool {
        self.state == HarvestState::Done
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Drains a FIFO queue of search URLs into a feature sink.
///
/// Clusters found in a response are expanded into new URLs at the tail of
/// the queue; listings are registered with the schema, materialized and
/// appended to the sink straight away. The first failure ends the run and
/// leaves already-written records in place.
pub struct Harvester<'a, S: FeatureSink + ?Sized> {
    fetcher: &'a Fetcher,
    sink: &'a mut S,
    concurrency: usize,
    progress_callback: Option<HarvestProgressCallback>,
    queue: VecDeque<WorkItem>,
    schema: SchemaRegistry,
    state: HarvestState,
    records_written: usize,
    urls_fetched: usize,
    clusters_expanded: usize,
    max_queue_len: usize,
}

impl<'a, S: FeatureSink + ?Sized> Harvester<'a, S> {
    pub fn new(fetcher: &'a Fetcher, sink: &'a mut S) -> Self {
        Self {
            fetcher,
            sink,
            concurrency: 1,
            progress_callback: None,
            queue: VecDeque::new(),
            schema: SchemaRegistry::new(),
            state: HarvestState::Seeding,
            records_written: 0,
            urls_fetched: 0,
            clusters_expanded: 0,
            max_queue_len: 0,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_progress_callback(mut self, callback: HarvestProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn state(&self) -> HarvestState {
        self.state
    }

    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Queue the initial URLs and move on to draining.
    pub fn seed(&mut self, seeds: impl IntoIterator<Item = WorkItem>) {
        for item in seeds {
            debug!("Seeding {}", item);
            self.enqueue(item);
        }
        info!("Seeded queue with {} URL(s)", self.queue.len());
        self.state = HarvestState::Draining;
    }

    /// Process the queue until it is empty or something fails.
    pub async fn drain(&mut self) -> Result<()> {
        match self.drain_queue().await {
            Ok(()) => {
                self.state = HarvestState::Done;
                info!(
                    "Harvest complete: {} records from {} URLs",
                    self.records_written, self.urls_fetched
                );
                Ok(())
            }
            Err(e) => {
                self.state = HarvestState::Aborted;
                warn!(
                    "Harvest aborted after {} records: {}",
                    self.records_written, e
                );
                Err(e)
            }
        }
    }

    /// Seed, drain and summarize.
    pub async fn run(mut self, seeds: impl IntoIterator<Item = WorkItem>) -> HarvestSummary {
        let started_at = Utc::now();
        self.seed(seeds);
        let error = self.drain().await.err();

        HarvestSummary {
            state: self.state,
            records_written: self.records_written,
            urls_fetched: self.urls_fetched,
            clusters_expanded: self.clusters_expanded,
            max_queue_len: self.max_queue_len,
            fields: self.schema.fields().to_vec(),
            error,
            started_at,
            finished_at: Utc::now(),
        }
    }

    async fn drain_queue(&mut self) -> Result<()> {
        let fetcher = self.fetcher;

        // The queue only ever empties between batches, so nothing is in
        // flight when the loop condition sees it empty.
        while !self.queue.is_empty() {
            let batch_len = self.concurrency.min(self.queue.len());
            let batch: Vec<WorkItem> = self.queue.drain(..batch_len).collect();

            if self.queue.len() % 10 == 0 {
                info!("There are {} URLs left in the queue", self.queue.len());
            }

            let responses = join_all(batch.iter().map(|item| fetcher.fetch(item.as_str()))).await;

            // Responses are handled in dequeue order; a failure drops the
            // rest of the batch.
            for (item, response) in batch.into_iter().zip(responses) {
                let envelope = response.map_err(|source| HarvestError::Fetch {
                    url: item.to_string(),
                    source,
                })?;
                self.urls_fetched += 1;
                self.process_envelope(&item, envelope)?;
                self.report_progress(&item);
            }
        }

        Ok(())
    }

    fn process_envelope(&mut self, item: &WorkItem, envelope: ResponseEnvelope) -> Result<()> {
        let ResponseEnvelope { nodes, metadata } = envelope;
        let malformed = |source: ScanError| HarvestError::Malformed {
            url: item.to_string(),
            source,
        };

        for node in nodes {
            match node {
                ResultNode::Cluster(cluster) => {
                    let expansion = expand_cluster(&cluster, &metadata).map_err(malformed)?;
                    debug!("Expanding cluster via {}", expansion);
                    self.clusters_expanded += 1;
                    self.enqueue(expansion);
                }
                ResultNode::Listing(listing) => {
                    self.schema.observe(&listing, &mut *self.sink)?;
                    let record = materialize(listing, &metadata, &self.schema).map_err(malformed)?;
                    self.sink.append_record(&record)?;
                    self.records_written += 1;
                }
            }
        }

        Ok(())
    }

    fn enqueue(&mut self, item: WorkItem) {
        self.queue.push_back(item);
        self.max_queue_len = self.max_queue_len.max(self.queue.len());
    }

    fn report_progress(&self, item: &WorkItem) {
        if let Some(ref callback) = self.progress_callback {
            callback(HarvestProgress {
                url: item.to_string(),
                queued: self.queue.len(),
                urls_fetched: self.urls_fetched,
                records_written: self.records_written,
            });
        }
    }
}

/// Build seeds for every target and run a harvest into `sink`.
///
/// Setup problems (bad targets, HTTP client construction) come back as
/// `Err`; anything that goes wrong once draining starts is reported in the
/// summary instead.
pub async fn execute_harvest<S: FeatureSink + ?Sized>(
    options: HarvestOptions,
    sink: &mut S,
    progress_callback: Option<HarvestProgressCallback>,
) -> Result<HarvestSummary> {
    let HarvestOptions {
        targets,
        domain,
        concurrency,
        timeout_secs,
        show_progress_bars,
    } = options;

    let seeds = targets
        .iter()
        .map(|target| target.work_item(&domain))
        .collect::<Result<Vec<_>>>()?;

    let fetcher = Fetcher::with_timeout(timeout_secs).map_err(HarvestError::Client)?;

    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Starting harvest...");
        Some(Arc::new(pb))
    } else {
        None
    };

    let pb_clone = progress_bar.clone();
    let internal_callback: HarvestProgressCallback = Arc::new(move |progress: HarvestProgress| {
        if let Some(ref pb) = pb_clone {
            pb.set_message(format!(
                "{} records, {} URLs fetched, {} queued",
                progress.records_written, progress.urls_fetched, progress.queued
            ));
        }
        if let Some(ref callback) = progress_callback {
            callback(progress);
        }
    });

    let summary = Harvester::new(&fetcher, sink)
        .with_concurrency(concurrency)
        .with_progress_callback(internal_callback)
        .run(seeds)
        .await;

    if let Some(ref pb) = progress_bar {
        pb.finish_and_clear();
    }

    Ok(summary)
}
