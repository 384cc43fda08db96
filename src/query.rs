use crate::engine::Engine;
use crate::types::QueryUrl;
use std::collections::HashSet;
use std::io::BufRead;

/// Joins the whitespace-separated words of `text` with `separator`.
fn join_words(text: &str, separator: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(separator)
}

/// Percent-encodes each word of `text` and joins them with `separator`.
fn encode_words(text: &str, separator: &str) -> String {
    text.split_whitespace()
        .map(|word| urlencoding::encode(word).into_owned())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Normalizes a term for use as a store key: trimmed, single spaces.
pub fn normalize_term(term: &str) -> String {
    join_words(term, " ")
}

/// The form of a term used in output file names.
///
/// Path separators become `_`, and a stem made only of dots is replaced
/// with underscores, so the name always stays inside the output directory.
pub fn file_stem(term: &str) -> String {
    let stem: String = join_words(term, "+")
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();

    if stem.chars().all(|c| c == '.') {
        "_".repeat(stem.len().max(1))
    } else {
        stem
    }
}

/// Builds the query URL for every (engine, term) pair.
///
/// Words are percent-encoded, then the base phrase is joined with each
/// engine's separator and, when `exact` is set, wrapped in double quotes.
/// Auxiliary terms are appended after one more separator. With no terms,
/// one URL per engine is produced and its `term` is `None`.
///
/// `phrase` must not be empty; callers reject that before building queries.
pub fn build_queries(
    phrase: &str,
    exact: bool,
    terms: &[String],
    engines: &[&Engine],
) -> Vec<QueryUrl> {
    let mut queries = Vec::with_capacity(engines.len() * terms.len().max(1));

    for (index, engine) in engines.iter().enumerate() {
        let mut base = encode_words(phrase, engine.separator);
        if exact {
            base = format!("\"{base}\"");
        }
        let base = format!("{}{}", engine.base_url, base);

        if terms.is_empty() {
            queries.push(QueryUrl {
                engine: index,
                term: None,
                url: base,
            });
            continue;
        }

        for term in terms {
            queries.push(QueryUrl {
                engine: index,
                term: Some(term.clone()),
                url: format!(
                    "{}{}{}",
                    base,
                    engine.separator,
                    encode_words(term, engine.separator)
                ),
            });
        }
    }

    queries
}

/// Reads auxiliary terms, one per line.
///
/// Blank lines are skipped, whitespace inside a term is collapsed, and a
/// term that repeats an earlier one is dropped.
pub fn read_terms(reader: impl BufRead) -> std::io::Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut terms = Vec::new();

    for line in reader.lines() {
        let term = normalize_term(&line?);
        if term.is_empty() || !seen.insert(term.clone()) {
            continue;
        }
        terms.push(term);
    }

    Ok(terms)
}
