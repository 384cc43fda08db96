use crate::query::file_stem;
use crate::store::{StoredResults, UrlMap};
use crate::types::ResultEntry;
use crate::Result;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Name of the document holding results of a run without auxiliary terms.
pub const FLAT_DOCUMENT: &str = "search";

/// Longest blurb echoed by [`Preview`], in characters.
pub const PREVIEW_LIMIT: usize = 200;

/// A serialized JSON document, ready for any number of sinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// File stem: `search` or the term with words joined by `+`.
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Where documents go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sink {
    /// `<dir>/<name>.json`, one file per document.
    Files(PathBuf),
    Stdout,
}

/// Outcome of a [`Writer::write`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub written: usize,
    pub failed: usize,
}

/// Encodes `value` as JSON with 4-space indentation and no trailing newline.
///
/// Map keys come out in the map's iteration order, which is sorted for the
/// `BTreeMap`s used throughout the crate. HTML characters are not escaped.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut bytes, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;
    Ok(bytes)
}

/// The document name for a store key.
pub fn document_name(term: Option<&str>) -> String {
    match term {
        Some(term) => file_stem(term),
        None => FLAT_DOCUMENT.to_string(),
    }
}

/// Serializes every key of `results` into its own url -> blurb document.
///
/// A document that fails to serialize is logged and left out.
pub fn documents(results: &StoredResults) -> Vec<Document> {
    results
        .iter()
        .filter_map(|(term, urls)| {
            let name = document_name(term.as_deref());
            match encode(urls) {
                Ok(bytes) => Some(Document { name, bytes }),
                Err(e) => {
                    error!("Failed to encode {}: {}", name, e);
                    None
                }
            }
        })
        .collect()
}

/// Serializes all keys into a single term -> url -> blurb document for display.
pub fn combined_document(results: &StoredResults) -> Result<Document> {
    let combined: BTreeMap<String, &UrlMap> = results
        .iter()
        .map(|(term, urls)| (term.clone().unwrap_or_else(|| FLAT_DOCUMENT.to_string()), urls))
        .collect();

    Ok(Document {
        name: String::from("combined"),
        bytes: encode(&combined)?,
    })
}

/// Creates the output directory and its parents.
///
/// This is the one failure that stops a run before it starts.
pub fn prepare_output_dir(dir: impl AsRef<Path>) -> Result<()> {
    fs::create_dir_all(dir.as_ref())?;
    Ok(())
}

/// The `Writer` struct hands serialized documents to its sinks.
pub struct Writer {
    sinks: Vec<Sink>,
}

impl Writer {
    pub fn new(sinks: Vec<Sink>) -> Self {
        Self { sinks }
    }

    /// Writes every document to every sink.
    ///
    /// Failures are logged and counted; remaining sinks and documents are
    /// still written.
    pub fn write(&self, documents: &[Document]) -> WriteReport {
        self.write_with_stdout(documents, &mut io::stdout().lock())
    }

    fn write_with_stdout(&self, documents: &[Document], stdout: &mut impl Write) -> WriteReport {
        let mut report = WriteReport::default();
        let mut streamed = 0;

        for document in documents {
            for sink in &self.sinks {
                let outcome = match sink {
                    Sink::Files(dir) => write_file(dir, document).map(|path| {
                        debug!("Wrote {}", path.display());
                    }),
                    Sink::Stdout => {
                        let outcome = write_stream(stdout, document, streamed == 0);
                        streamed += 1;
                        outcome
                    }
                };

                match outcome {
                    Ok(()) => report.written += 1,
                    Err(e) => {
                        error!("Failed to write {} to {:?}: {}", document.name, sink, e);
                        report.failed += 1;
                    }
                }
            }
        }

        report
    }
}

fn write_file(dir: &Path, document: &Document) -> io::Result<PathBuf> {
    let path = dir.join(format!("{}.json", document.name));
    let mut file = File::create(&path)?;
    file.write_all(&document.bytes)?;
    file.sync_all()?;
    Ok(path)
}

/// Writes the document bytes unchanged, preceded by a newline unless it is
/// the first document on this stream.
fn write_stream(out: &mut impl Write, document: &Document, first: bool) -> io::Result<()> {
    if !first {
        out.write_all(b"\n")?;
    }
    out.write_all(&document.bytes)?;
    out.flush()
}

/// Echoes results to stdout as they are stored.
#[derive(Debug, Clone, Copy)]
pub struct Preview {
    pub show_urls: bool,
}

impl Preview {
    /// Formats one entry: optional URL line, blurb cut to [`PREVIEW_LIMIT`]
    /// characters, blank line.
    pub fn render(&self, entry: &ResultEntry) -> String {
        let blurb: String = entry.blurb.chars().take(PREVIEW_LIMIT).collect();
        if self.show_urls && !blurb.is_empty() {
            format!("{}\n{}\n", entry.url, blurb)
        } else {
            format!("{}\n", blurb)
        }
    }

    pub fn print(&self, entry: &ResultEntry) {
        println!("{}", self.render(entry));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StoredResults {
        let mut results = StoredResults::new();
        let mut lifetimes = UrlMap::new();
        lifetimes.insert("https://z.example/".to_string(), "last".to_string());
        lifetimes.insert("https://a.example/?x=1&y=<2>".to_string(), "first & <b>".to_string());
        results.insert(Some("lifetimes".to_string()), lifetimes);
        results.insert(Some("borrow checker".to_string()), UrlMap::new());
        results
    }

    #[test]
    fn encode_sorts_keys_indents_and_skips_html_escaping() {
        let results = sample();
        let bytes = encode(&results[&Some("lifetimes".to_string())]).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert_eq!(
            text,
            "{\n    \"https://a.example/?x=1&y=<2>\": \"first & <b>\",\n    \"https://z.example/\": \"last\"\n}"
        );
        assert!(!text.ends_with('\n'));
    }

    #[test]
    fn encode_is_stable_across_calls() {
        let results = sample();
        assert_eq!(documents(&results), documents(&results));
    }

    #[test]
    fn documents_are_named_per_term() {
        let docs = documents(&sample());
        let names: Vec<_> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["borrow+checker", "lifetimes"]);
        assert_eq!(docs[0].bytes, b"{}");
    }

    #[test]
    fn flat_results_use_search_document() {
        let mut results = StoredResults::new();
        results.insert(None, UrlMap::new());
        let docs = documents(&results);
        assert_eq!(docs[0].name, FLAT_DOCUMENT);
    }

    #[test]
    fn combined_document_nests_terms() {
        let doc = combined_document(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&doc.bytes).unwrap();
        assert_eq!(value["lifetimes"]["https://z.example/"], "last");
        assert!(value["borrow checker"].as_object().unwrap().is_empty());
    }

    #[test]
    fn file_sink_writes_identical_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let docs = documents(&sample());
        let writer = Writer::new(vec![Sink::Files(dir.path().to_path_buf())]);

        let report = writer.write(&docs);
        assert_eq!(report, WriteReport { written: 2, failed: 0 });

        let written = fs::read(dir.path().join("lifetimes.json")).unwrap();
        assert_eq!(written, docs[1].bytes);
        assert!(dir.path().join("borrow+checker.json").exists());
    }

    #[test]
    fn failed_sink_does_not_stop_other_documents() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let writer = Writer::new(vec![
            Sink::Files(missing),
            Sink::Files(dir.path().to_path_buf()),
        ]);

        let report = writer.write(&documents(&sample()));
        assert_eq!(report, WriteReport { written: 2, failed: 2 });
        assert!(dir.path().join("lifetimes.json").exists());
    }

    #[test]
    fn stream_sink_separates_documents_without_trailing_newline() {
        let docs = documents(&sample());
        let mut out = Vec::new();
        let report = Writer::new(vec![Sink::Stdout]).write_with_stdout(&docs, &mut out);

        assert_eq!(report, WriteReport { written: 2, failed: 0 });
        let mut expected = docs[0].bytes.clone();
        expected.push(b'\n');
        expected.extend_from_slice(&docs[1].bytes);
        assert_eq!(out, expected);
    }

    #[test]
    fn stream_and_file_sinks_receive_same_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let doc = Document {
            name: "search".to_string(),
            bytes: b"{}".to_vec(),
        };
        let mut out = Vec::new();
        Writer::new(vec![Sink::Files(dir.path().to_path_buf()), Sink::Stdout])
            .write_with_stdout(std::slice::from_ref(&doc), &mut out);

        assert_eq!(out, doc.bytes);
        assert_eq!(fs::read(dir.path().join("search.json")).unwrap(), doc.bytes);
    }

    #[test]
    fn term_documents_stay_inside_output_dir() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("data");
        prepare_output_dir(&dir).unwrap();

        let mut results = StoredResults::new();
        for term in ["../escaped", "a/b", "..", "c\\d"] {
            results.insert(Some(term.to_string()), UrlMap::new());
        }
        let report = Writer::new(vec![Sink::Files(dir.clone())]).write(&documents(&results));

        assert_eq!(report, WriteReport { written: 4, failed: 0 });
        assert!(!root.path().join("escaped.json").exists());
        let mut names: Vec<_> = fs::read_dir(&dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, vec![".._escaped.json", "__.json", "a_b.json", "c_d.json"]);
    }

    #[test]
    fn prepare_output_dir_creates_nested_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a/b/data");
        prepare_output_dir(&target).unwrap();
        assert!(target.is_dir());
        prepare_output_dir(&target).unwrap();
    }

    #[test]
    fn preview_truncates_and_shows_url() {
        let entry = ResultEntry {
            url: "https://example.com/".to_string(),
            blurb: "é".repeat(300),
        };
        let rendered = Preview { show_urls: true }.render(&entry);
        let mut lines = rendered.lines();
        assert_eq!(lines.next(), Some("https://example.com/"));
        assert_eq!(lines.next().unwrap().chars().count(), PREVIEW_LIMIT);

        let empty = ResultEntry {
            url: "https://example.com/".to_string(),
            blurb: String::new(),
        };
        assert_eq!(Preview { show_urls: true }.render(&empty), "\n");
    }
}
