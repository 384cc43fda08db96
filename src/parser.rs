use crate::engine::EngineSelectors;
use crate::types::ResultEntry;
use scraper::Html;
use std::borrow::Cow;
use tracing::{debug, instrument};

/// A redirect wrapper some engines put around result links.
///
/// A link starting with `prefix` holds the real target between `start` and
/// the following `end` marker (or the end of the string).
struct RedirectWrapper {
    prefix: &'static str,
    start: &'static str,
    end: &'static str,
}

const REDIRECT_WRAPPERS: &[RedirectWrapper] = &[
    // ask: /redir?u=<target>&...
    RedirectWrapper {
        prefix: "/redir?",
        start: "u=",
        end: "&",
    },
    // duckduckgo: //duckduckgo.com/l/?uddg=<target>&rut=...
    RedirectWrapper {
        prefix: "//duck",
        start: "uddg=",
        end: "&rut",
    },
    // yahoo: https://r.search.yahoo.com/.../RU=<target>/RK=...
    RedirectWrapper {
        prefix: "https://r.search.yahoo.com/",
        start: "/RU=",
        end: "/RK=",
    },
];

/// A parsed engine result page.
///
/// `scraper::Html` is not `Send`, so a page is parsed, drained and dropped
/// without crossing an `.await`.
pub struct ResultPage {
    document: Html,
}

impl ResultPage {
    /// Parses an HTML body. Malformed markup is repaired, never rejected.
    #[instrument(skip(body), fields(body_length = body.len()))]
    pub fn parse(body: &str) -> Self {
        Self {
            document: Html::parse_document(body),
        }
    }

    /// Yields one entry per result item that has a link, in document order.
    ///
    /// The link is the `href` of the first node matching the engine's link
    /// selector; items without one are skipped. The blurb is the text of
    /// the first node matching the blurb selector, or empty.
    pub fn entries<'a>(
        &'a self,
        selectors: &'a EngineSelectors,
    ) -> impl Iterator<Item = ResultEntry> + 'a {
        self.document.select(&selectors.item).filter_map(move |item| {
            let href = item.select(&selectors.link).next()?.value().attr("href")?;
            let url = clean_link(href);
            if url.is_empty() {
                return None;
            }

            let blurb = item
                .select(&selectors.blurb)
                .next()
                .map(|node| clean_blurb(&node.text().collect::<String>()))
                .unwrap_or_default();

            Some(ResultEntry { url, blurb })
        })
    }
}

/// Tidies a blurb: trims it, turns every run of two or more whitespace
/// characters into one space and drops lone newlines.
pub fn clean_blurb(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    let mut chars = text.trim().chars().peekable();

    while let Some(c) = chars.next() {
        if !c.is_whitespace() {
            cleaned.push(c);
            continue;
        }

        let mut run = 1;
        while chars.next_if(|next| next.is_whitespace()).is_some() {
            run += 1;
        }

        if run > 1 {
            cleaned.push(' ');
        } else if c != '\n' {
            cleaned.push(c);
        }
    }

    cleaned
}

/// Turns a raw result `href` into the target URL.
///
/// Percent-decodes the link and strips the redirect wrappers in
/// [`REDIRECT_WRAPPERS`], repeating until nothing changes. If any decode
/// fails (a `%` without two hex digits, or bytes that are not UTF-8) the
/// raw `href` is returned untouched. Every step that changes the value
/// makes it shorter, so the loop ends.
pub fn clean_link(href: &str) -> String {
    let mut current = href.to_string();

    loop {
        let Some(decoded) = percent_decode(&current) else {
            debug!("Unable to clean {}", href);
            return href.to_string();
        };
        let next = unwrap_redirect(&decoded).unwrap_or(decoded);

        if next == current {
            return current;
        }
        current = next;
    }
}

/// Strict percent-decoding: `None` on a malformed escape or non-UTF-8 output.
fn percent_decode(link: &str) -> Option<String> {
    let bytes = link.as_bytes();
    let well_formed = bytes.iter().enumerate().all(|(i, &b)| {
        b != b'%'
            || (bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
                && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit))
    });
    if !well_formed {
        return None;
    }

    match urlencoding::decode(link) {
        Ok(Cow::Owned(decoded)) => Some(decoded),
        Ok(Cow::Borrowed(_)) => Some(link.to_string()),
        Err(_) => None,
    }
}

fn unwrap_redirect(link: &str) -> Option<String> {
    REDIRECT_WRAPPERS.iter().find_map(|wrapper| {
        if !link.starts_with(wrapper.prefix) {
            return None;
        }
        let (_, rest) = link.split_once(wrapper.start)?;
        let target = rest.split(wrapper.end).next().unwrap_or(rest);
        (!target.is_empty()).then(|| target.to_string())
    })
}
