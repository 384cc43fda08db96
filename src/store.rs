use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// url -> blurb for one key.
pub type UrlMap = BTreeMap<String, String>;

/// Everything collected by a run, keyed by term. `None` is the key used
/// when the run has no auxiliary terms.
pub type StoredResults = BTreeMap<Option<String>, UrlMap>;

/// The `ResultStore` struct accumulates results from concurrent workers.
///
/// For each (term, url) the first blurb written is kept and later writes
/// are ignored. Nothing is ever removed. Reading happens only after the
/// run, by consuming the store with [`ResultStore::into_results`].
#[derive(Debug, Default)]
pub struct ResultStore {
    entries: Mutex<StoredResults>,
}

impl ResultStore {
    /// Creates a store with an empty map for every term, or a single flat
    /// map when `terms` is empty.
    pub fn new(terms: &[String]) -> Self {
        let mut entries = StoredResults::new();
        if terms.is_empty() {
            entries.insert(None, UrlMap::new());
        }
        for term in terms {
            entries.insert(Some(term.clone()), UrlMap::new());
        }

        Self {
            entries: Mutex::new(entries),
        }
    }

    /// Stores `blurb` for `url` under `term` unless the pair is already present.
    /// Returns `true` when the entry was added.
    pub fn put(&self, term: &str, url: &str, blurb: &str) -> bool {
        self.insert(Some(term), url, blurb)
    }

    /// Same as [`ResultStore::put`] against the flat map.
    pub fn put_flat(&self, url: &str, blurb: &str) -> bool {
        self.insert(None, url, blurb)
    }

    /// Routes to [`ResultStore::put`] or [`ResultStore::put_flat`].
    pub fn insert(&self, term: Option<&str>, url: &str, blurb: &str) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let urls = entries.entry(term.map(str::to_string)).or_default();
        if urls.contains_key(url) {
            return false;
        }
        urls.insert(url.to_string(), blurb.to_string());
        true
    }

    /// A copy of the current contents.
    pub fn snapshot(&self) -> StoredResults {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Consumes the store once all writers are done.
    pub fn into_results(self) -> StoredResults {
        self.entries
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
