use crate::config::SearcherConfig;
use crate::engine::EngineSelectors;
use crate::http::{Fetch, FetchError};
use crate::parser::ResultPage;
use crate::store::{ResultStore, StoredResults};
use crate::types::{QueryUrl, RunStats};
use crate::writer::Preview;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Knobs for a [`Pipeline`] run.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// Maximum number of fetch+parse units in flight.
    pub concurrency: usize,
    /// Deadline for each fetch.
    pub timeout: Duration,
    /// Show a progress bar on stderr.
    pub progress: bool,
    /// Echo newly stored entries to stdout.
    pub preview: Option<Preview>,
}

impl From<&SearcherConfig> for PipelineOptions {
    fn from(config: &SearcherConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            timeout: config.timeout(),
            progress: config.progress,
            preview: config.preview.then_some(Preview {
                show_urls: config.preview_urls,
            }),
        }
    }
}

enum UnitOutcome {
    Stored { parsed: usize, stored: usize },
    Failed,
}

/// The `Pipeline` struct runs every query through fetch, parse and store.
///
/// Each query becomes its own tokio task. A semaphore with
/// `options.concurrency` permits bounds how many of them are fetching or
/// parsing at once; the rest wait for a permit.
pub struct Pipeline<F> {
    fetcher: Arc<F>,
    engines: Arc<Vec<EngineSelectors>>,
    options: PipelineOptions,
}

impl<F: Fetch + 'static> Pipeline<F> {
    /// Creates a pipeline. `QueryUrl::engine` indexes into `engines`.
    pub fn new(fetcher: Arc<F>, engines: Vec<EngineSelectors>, options: PipelineOptions) -> Self {
        Self {
            fetcher,
            engines: Arc::new(engines),
            options,
        }
    }

    /// Runs all queries and returns the populated results once every task
    /// has finished.
    pub async fn run(&self, queries: Vec<QueryUrl>, store: ResultStore) -> (StoredResults, RunStats) {
        let store = Arc::new(store);
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let progress = self.progress_bar(queries.len());
        let mut stats = RunStats {
            queries: queries.len(),
            ..Default::default()
        };

        let handles: Vec<_> = queries
            .into_iter()
            .map(|query| {
                let fetcher = Arc::clone(&self.fetcher);
                let engines = Arc::clone(&self.engines);
                let store = Arc::clone(&store);
                let semaphore = Arc::clone(&semaphore);
                let progress = progress.clone();
                let options = self.options;

                tokio::spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return UnitOutcome::Failed;
                    };
                    let outcome = run_unit(&*fetcher, &engines, &query, &store, options).await;
                    progress.inc(1);
                    outcome
                })
            })
            .collect();

        for joined in join_all(handles).await {
            match joined {
                Ok(UnitOutcome::Stored { parsed, stored }) => {
                    stats.parsed += parsed;
                    stats.stored += stored;
                }
                Ok(UnitOutcome::Failed) => stats.failed += 1,
                Err(e) => {
                    warn!("Search task did not complete: {}", e);
                    stats.failed += 1;
                }
            }
        }

        progress.finish_with_message(format!(
            "Completed: {} of {} queries answered",
            stats.queries - stats.failed,
            stats.queries
        ));
        info!(
            queries = stats.queries,
            failed = stats.failed,
            parsed = stats.parsed,
            stored = stats.stored,
            "search run finished"
        );

        let results = match Arc::try_unwrap(store) {
            Ok(store) => store.into_results(),
            Err(shared) => shared.snapshot(),
        };
        (results, stats)
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.options.progress {
            return ProgressBar::hidden();
        }

        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_message("Searching...");
        bar
    }
}

/// Fetches one query and files its results. Every failure is logged at
/// debug level and ends the unit without results.
async fn run_unit<F: Fetch>(
    fetcher: &F,
    engines: &[EngineSelectors],
    query: &QueryUrl,
    store: &ResultStore,
    options: PipelineOptions,
) -> UnitOutcome {
    let Some(selectors) = engines.get(query.engine) else {
        debug!("No engine at index {} for {}", query.engine, query.url);
        return UnitOutcome::Failed;
    };

    let fetched = tokio::time::timeout(options.timeout, fetcher.fetch(&query.url, options.timeout))
        .await
        .unwrap_or_else(|_| Err(FetchError::Timeout(query.url.clone())));

    let body = match fetched {
        Ok(body) => body,
        Err(e) => {
            debug!("{} skipped: {}", selectors.engine.name, e);
            return UnitOutcome::Failed;
        }
    };

    let (parsed, stored) = ingest(&body, selectors, query.term.as_deref(), store, options.preview);
    debug!(
        "{} returned {} results ({} new) for {:?}",
        selectors.engine.name, parsed, stored, query.term
    );
    UnitOutcome::Stored { parsed, stored }
}

/// Parses `body` and stores each entry under `term`. Returns the number of
/// entries parsed and the number that were new.
pub fn ingest(
    body: &str,
    selectors: &EngineSelectors,
    term: Option<&str>,
    store: &ResultStore,
    preview: Option<Preview>,
) -> (usize, usize) {
    let page = ResultPage::parse(body);
    let mut parsed = 0;
    let mut stored = 0;

    for entry in page.entries(selectors) {
        parsed += 1;
        if store.insert(term, &entry.url, &entry.blurb) {
            stored += 1;
            if let Some(preview) = preview {
                preview.print(&entry);
            }
        }
    }

    (parsed, stored)
}
