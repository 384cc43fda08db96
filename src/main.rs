use anyhow::{bail, Context};
use searcher::{
    config::SearcherConfig,
    engine,
    http::Fetcher,
    pipeline::{Pipeline, PipelineOptions},
    query::{build_queries, read_terms},
    store::ResultStore,
    writer::{self, Sink, Writer},
};
use std::fs::File;
use std::io::{self, BufReader};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn, Level};

/// The main entry point of the application.
///
/// Usage: `searcher <search target> [terms file | -]`
///
/// Everything else comes from `searcher.toml` (or `.json`/`.yaml`) in the
/// working directory and `SEARCHER_*` environment variables.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut config = SearcherConfig::load().context("loading configuration")?;

    let mut args = std::env::args().skip(1);
    if let Some(target) = args.next() {
        config.search_target = target;
    }
    if let Some(terms_file) = args.next() {
        config.terms_file = Some(terms_file);
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(if config.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    config.validate()?;

    let terms = match config.terms_file.as_deref() {
        Some("-") => read_terms(io::stdin().lock()).context("reading terms from stdin")?,
        Some(path) => {
            let file = File::open(path).with_context(|| format!("opening terms file {path}"))?;
            read_terms(BufReader::new(file)).with_context(|| format!("reading terms file {path}"))?
        }
        None => {
            info!("No additional search terms supplied. Continuing with base search only.");
            Vec::new()
        }
    };
    if config.terms_file.is_some() && terms.is_empty() {
        bail!("terms file contained no terms");
    }

    if config.write_files {
        writer::prepare_output_dir(&config.output_dir)
            .with_context(|| format!("creating output directory {}", config.output_dir))?;
    }

    let start_time = Instant::now();

    let selected = config.selected_engines();
    let engines = engine::compile_all(&selected)?;
    let queries = build_queries(&config.search_target, config.exact, &terms, &selected);

    let fetcher = Arc::new(Fetcher::new(config.platform)?);
    let pipeline = Pipeline::new(fetcher, engines, PipelineOptions::from(&config));
    let (results, stats) = pipeline.run(queries, ResultStore::new(&terms)).await;

    let documents = writer::documents(&results);

    if config.write_files {
        let report = Writer::new(vec![Sink::Files(config.output_dir.clone().into())]).write(&documents);
        if report.failed > 0 {
            warn!("{} of {} documents could not be written", report.failed, documents.len());
        }
    }

    if config.print_json {
        let stdout = Writer::new(vec![Sink::Stdout]);
        if config.combined && !terms.is_empty() {
            match writer::combined_document(&results) {
                Ok(document) => {
                    stdout.write(&[document]);
                }
                Err(e) => warn!("Failed to encode combined results: {}", e),
            }
        } else {
            stdout.write(&documents);
        }
    }

    info!(
        "Searched {} queries in {:.2?}: {} failed, {} results stored",
        stats.queries,
        start_time.elapsed(),
        stats.failed,
        stats.stored
    );

    Ok(())
}
