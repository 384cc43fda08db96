
/// One request to send: the URL for a single (engine, term) pair.
///
/// `term` is carried next to the URL so results can be routed to the right
/// store key once the response comes back. It is `None` when the run has no
/// auxiliary terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryUrl {
    /// Index of the originating engine in the compiled engine list.
    pub engine: usize,
    /// Auxiliary term this query was built for.
    pub term: Option<String>,
    /// The outgoing request URL.
    pub url: String,
}

/// A cleaned (url, blurb) pair extracted from one result item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEntry {
    pub url: String,
    pub blurb: String,
}

/// Counters collected over one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Number of queries scheduled.
    pub queries: usize,
    /// Queries whose fetch failed or whose task did not complete.
    pub failed: usize,
    /// Entries extracted from successful responses.
    pub parsed: usize,
    /// Entries that were new for their key.
    pub stored: usize,
}
