//! The catalog of supported search engines.
//!
//! Every engine is described by data only: where to send the query, how to
//! join words, and which CSS selectors locate result items, links and
//! blurbs. Adding an engine means adding a row to [`ENGINES`].

use crate::{Result, SearcherError};
use scraper::Selector;

/// A search provider and the HTML structure of its result page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Engine {
    pub name: &'static str,
    /// Query URL up to and including the query parameter, e.g. `...?q=`.
    pub base_url: &'static str,
    /// Joins words inside the query parameter.
    pub separator: &'static str,
    /// Matches one result item.
    pub item_selector: &'static str,
    /// Matches the result anchor inside an item.
    pub link_selector: &'static str,
    /// Matches the snippet inside an item.
    pub blurb_selector: &'static str,
}

pub const ENGINES: &[Engine] = &[
    Engine {
        name: "ask",
        base_url: "https://www.ask.com/web?q=",
        separator: "+",
        item_selector: "div.PartialSearchResults-item",
        link_selector: "a.PartialSearchResults-item-title-link",
        blurb_selector: "div.PartialSearchResults-item p",
    },
    Engine {
        name: "bing",
        base_url: "https://bing.com/search?q=",
        separator: "+",
        item_selector: "li.b_algo",
        link_selector: "h2 a",
        blurb_selector: "div.b_caption p",
    },
    Engine {
        name: "brave",
        base_url: "https://search.brave.com/search?q=",
        separator: "+",
        item_selector: "div.fdb",
        link_selector: "div.fdb > a.result-header",
        blurb_selector: "div.snippet-content p.snippet-description",
    },
    Engine {
        name: "duckduckgo",
        base_url: "https://html.duckduckgo.com/html?q=",
        separator: "+",
        item_selector: "div.web-result",
        link_selector: "a.result__a",
        blurb_selector: "a.result__snippet",
    },
    Engine {
        name: "yahoo",
        base_url: "https://search.yahoo.com/search?p=",
        separator: "+",
        item_selector: "div.algo",
        link_selector: "h3 > a",
        blurb_selector: "div.compText",
    },
    Engine {
        name: "yandex",
        base_url: "https://yandex.com/search/?text=",
        separator: "%20",
        item_selector: "li.serp-item",
        link_selector: "a.OrganicTitle-Link",
        blurb_selector: "span.OrganicTextContentSpan",
    },
];

/// Engines queried when the configuration does not name any.
pub const DEFAULT_ENGINES: &[&str] = &["ask", "bing", "brave", "duckduckgo", "yahoo"];

/// Looks up a catalog entry by name (case-insensitive).
pub fn find(name: &str) -> Option<&'static Engine> {
    ENGINES
        .iter()
        .find(|engine| engine.name.eq_ignore_ascii_case(name.trim()))
}

/// An engine with its selectors parsed, ready for extraction.
#[derive(Debug)]
pub struct EngineSelectors {
    pub engine: &'static Engine,
    pub item: Selector,
    pub link: Selector,
    pub blurb: Selector,
}

impl Engine {
    /// Parses the three selectors of this engine.
    ///
    /// # Errors
    ///
    /// Returns [`SearcherError::SelectorError`] naming the engine if any of
    /// the selector strings is not valid CSS.
    pub fn compile(&'static self) -> Result<EngineSelectors> {
        let parse = |text: &str| {
            Selector::parse(text).map_err(|e| SearcherError::SelectorError {
                engine: self.name.to_string(),
                reason: format!("{text:?}: {e:?}"),
            })
        };

        Ok(EngineSelectors {
            engine: self,
            item: parse(self.item_selector)?,
            link: parse(self.link_selector)?,
            blurb: parse(self.blurb_selector)?,
        })
    }
}

/// Compiles every engine in `engines`, preserving order.
pub fn compile_all(engines: &[&'static Engine]) -> Result<Vec<EngineSelectors>> {
    engines.iter().map(|engine| engine.compile()).collect()
}
