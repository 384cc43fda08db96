use crate::engine::{self, Engine};
use crate::{Result, SearcherError};
use ::config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// The `SearcherConfig` struct holds the configuration settings for a search run.
/// It includes the query itself, the concurrency cap, the request deadline,
/// engine selection and the output switches.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearcherConfig {
    /// The base search phrase. Words are separated by whitespace.
    pub search_target: String,
    /// Wrap the base phrase in quotes so engines match it exactly.
    pub exact: bool,
    /// File with one auxiliary term per line, or `-` for stdin.
    pub terms_file: Option<String>,
    /// Maximum number of fetch+parse units in flight.
    pub concurrency: usize,
    /// Per-request deadline in milliseconds.
    pub timeout_ms: u64,
    /// Operating system the user agents pretend to run on.
    pub platform: Platform,
    /// Names of the engines to query, see [`engine::ENGINES`].
    pub engines: Vec<String>,
    /// Directory receiving one JSON file per document.
    pub output_dir: String,
    /// Write documents to `output_dir`.
    pub write_files: bool,
    /// Print documents to stdout.
    pub print_json: bool,
    /// Print a single term -> url -> blurb document to stdout instead of one per term.
    pub combined: bool,
    /// Echo each newly stored blurb while the run is in progress.
    pub preview: bool,
    /// Print the URL above each previewed blurb.
    pub preview_urls: bool,
    /// Show a progress bar on stderr.
    pub progress: bool,
    /// Log skipped requests and other diagnostics.
    pub verbose: bool,
}

/// The browser platform advertised in request headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    #[serde(alias = "w")]
    Windows,
    #[serde(alias = "m", alias = "macos")]
    Mac,
}

impl Default for SearcherConfig {
    fn default() -> Self {
        Self {
            search_target: String::new(),
            exact: false,
            terms_file: None,
            concurrency: crate::DEFAULT_CONCURRENCY,
            timeout_ms: crate::DEFAULT_TIMEOUT.as_millis() as u64,
            platform: Platform::default(),
            engines: engine::DEFAULT_ENGINES
                .iter()
                .map(|name| name.to_string())
                .collect(),
            output_dir: String::from(crate::DEFAULT_OUTPUT_DIR),
            write_files: true,
            print_json: false,
            combined: false,
            preview: false,
            preview_urls: false,
            progress: true,
            verbose: false,
        }
    }
}

impl SearcherConfig {
    /// Loads the configuration from `searcher.{toml,json,yaml}` in the working
    /// directory (if present) and `SEARCHER_*` environment variables, on top of
    /// the defaults.
    pub fn load() -> Result<Self> {
        Self::load_from("searcher")
    }

    /// Same as [`SearcherConfig::load`] with an explicit file name. The file is optional.
    pub fn load_from(file: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(file).required(false))
            .add_source(
                Environment::with_prefix("SEARCHER")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("engines"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Rejects settings a run cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.search_target.trim().is_empty() {
            return Err(SearcherError::InvalidSetting(
                "search target must not be empty".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(SearcherError::InvalidSetting(
                "concurrency must be > 0".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(SearcherError::InvalidSetting(
                "timeout_ms must be > 0".to_string(),
            ));
        }
        if self.engines.is_empty() {
            return Err(SearcherError::InvalidSetting(
                "at least one engine must be enabled".to_string(),
            ));
        }
        if let Some(unknown) = self.engines.iter().find(|name| engine::find(name).is_none()) {
            return Err(SearcherError::InvalidSetting(format!(
                "unknown engine: {unknown}"
            )));
        }
        Ok(())
    }

    /// The per-request deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Catalog entries for the configured engine names, in configuration order.
    /// Unknown names are skipped; [`SearcherConfig::validate`] reports them.
    pub fn selected_engines(&self) -> Vec<&'static Engine> {
        self.engines
            .iter()
            .filter_map(|name| engine::find(name))
            .collect()
    }
}
