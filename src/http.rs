//! HTTP fetching with rotating browser header profiles.
//!
//! [`Fetcher`] sends one GET per call with its own deadline. Each request
//! carries a header set that is consistent with a real Firefox or Chrome
//! install, picked at random from a small pool so that consecutive
//! requests do not look identical.

use crate::config::Platform;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, DNT,
    UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};
use reqwest::{Client, Url};
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE_EN: &str = "en-US,en;q=0.5";
const CHROME_CLIENT_HINTS: &str =
    r#"" Not A;Brand";v="99", "Chromium";v="99", "Google Chrome";v="99""#;

const FIREFOX_WINDOWS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:99.0) Gecko/20100101 Firefox/99.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:108.0) Gecko/20100101 Firefox/108.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:102.0) Gecko/20100101 Firefox/102.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:106.0) Gecko/20100101 Firefox/106.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:104.0) Gecko/20100101 Firefox/104.0",
];

const FIREFOX_MAC: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:107.0) Gecko/20100101 Firefox/107.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:106.0) Gecko/20100101 Firefox/106.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:104.0) Gecko/20100101 Firefox/104.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:102.0) Gecko/20100101 Firefox/102.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:101.0) Gecko/20100101 Firefox/101.0",
];

const CHROME_WINDOWS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/100.0.4896.127 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/101.0.4951.54 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; WOW64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/99.0.4844.51 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; WOW64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/99.0.4844.84 Safari/537.36",
];

const CHROME_MAC: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_14_6) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/100.0.4896.127 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/100.0.4692.56 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/100.0.4889.0 Safari/537.36",
];

/// Why a single fetch produced no body. None of these stop a run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("unable to create request for {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request timed out for {0}")]
    Timeout(String),
    #[error("unable to make request for {url}: {reason}")]
    Connect { url: String, reason: String },
    #[error("HTTP response: {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("unable to read body for {url}: {reason}")]
    Body { url: String, reason: String },
}

/// Something that can GET a URL and hand back its body.
///
/// Implementations must be safe to call from many tasks at once; bounding
/// concurrency is the caller's job.
pub trait Fetch: Send + Sync {
    fn fetch(
        &self,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Browser whose request headers are imitated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Browser {
    Firefox,
    Chrome,
}

const BROWSERS: &[Browser] = &[Browser::Firefox, Browser::Chrome];

/// User agents for a browser on a platform.
pub fn user_agents(browser: Browser, platform: Platform) -> &'static [&'static str] {
    match (browser, platform) {
        (Browser::Firefox, Platform::Windows) => FIREFOX_WINDOWS,
        (Browser::Firefox, Platform::Mac) => FIREFOX_MAC,
        (Browser::Chrome, Platform::Windows) => CHROME_WINDOWS,
        (Browser::Chrome, Platform::Mac) => CHROME_MAC,
    }
}

/// Builds the full header set a browser would send for a top-level navigation.
pub fn browser_headers(browser: Browser, platform: Platform, user_agent: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(user_agent));
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_EN));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert(fetch_header("sec-fetch-dest"), HeaderValue::from_static("document"));
    headers.insert(fetch_header("sec-fetch-mode"), HeaderValue::from_static("navigate"));
    headers.insert(fetch_header("sec-fetch-site"), HeaderValue::from_static("none"));
    headers.insert(fetch_header("sec-fetch-user"), HeaderValue::from_static("?1"));

    match browser {
        Browser::Firefox => {
            headers.insert(DNT, HeaderValue::from_static("1"));
            headers.insert(fetch_header("sec-gpc"), HeaderValue::from_static("1"));
        }
        Browser::Chrome => {
            let platform_hint = match platform {
                Platform::Windows => "\"Windows\"",
                Platform::Mac => "\"macOS\"",
            };
            headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
            headers.insert(fetch_header("sec-ch-ua"), HeaderValue::from_static(CHROME_CLIENT_HINTS));
            headers.insert(fetch_header("sec-ch-ua-mobile"), HeaderValue::from_static("?0"));
            headers.insert(fetch_header("sec-ch-ua-platform"), HeaderValue::from_static(platform_hint));
        }
    }

    headers
}

fn fetch_header(name: &'static str) -> HeaderName {
    HeaderName::from_static(name)
}

/// The production [`Fetch`] implementation backed by `reqwest`.
///
/// The random source choosing header profiles is a constructor parameter so
/// tests can pass a seeded generator.
pub struct Fetcher<R = StdRng> {
    client: Client,
    platform: Platform,
    rng: Mutex<R>,
}

impl Fetcher<StdRng> {
    /// Creates a fetcher whose header rotation is seeded from the OS.
    pub fn new(platform: Platform) -> crate::Result<Self> {
        Self::with_rng(platform, StdRng::from_entropy())
    }
}

impl<R: Rng> Fetcher<R> {
    /// Creates a fetcher drawing header profiles from `rng`.
    pub fn with_rng(platform: Platform, rng: R) -> crate::Result<Self> {
        let client = Client::builder().gzip(true).brotli(true).build()?;

        Ok(Self {
            client,
            platform,
            rng: Mutex::new(rng),
        })
    }

    /// Picks a browser and one of its user agents, each uniformly.
    pub fn pick_profile(&self) -> (Browser, &'static str) {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let browser = BROWSERS
            .choose(&mut *rng)
            .copied()
            .unwrap_or(Browser::Firefox);
        let agents = user_agents(browser, self.platform);
        let agent = agents.choose(&mut *rng).copied().unwrap_or(agents[0]);
        (browser, agent)
    }

    fn request_headers(&self) -> HeaderMap {
        let (browser, agent) = self.pick_profile();
        browser_headers(browser, self.platform, agent)
    }
}

impl<R: Rng + Send> Fetch for Fetcher<R> {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let target = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        debug!("Fetching {}", url);

        let response = self
            .client
            .get(target)
            .headers(self.request_headers())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| send_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(url.to_string())
            } else {
                FetchError::Body {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })
    }
}

fn send_error(url: &str, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(url.to_string())
    } else if err.is_builder() {
        FetchError::InvalidUrl {
            url: url.to_string(),
            reason: err.to_string(),
        }
    } else {
        FetchError::Connect {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}
