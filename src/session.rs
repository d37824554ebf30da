//! Fetches pages from legistar while threading the hidden session state the
//! server expects between requests.
//!
//! Legistar is a WebForms app: every response carries opaque state tokens
//! (`__VIEWSTATE` and friends) that must be echoed back on the next POST, and
//! cookies that must be forwarded verbatim. A [`Session`] owns both and is
//! never shared between walks.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{COOKIE, SET_COOKIE};
use scraper::Html;
use tracing::{debug, info};

use crate::cache::PageCache;
use crate::{selector, Result};

/// The hidden inputs legistar round-trips on every postback.
const HIDDEN_STATE_FIELDS: [&str; 3] =
    ["__VIEWSTATE", "__EVENTVALIDATION", "__VIEWSTATEGENERATOR"];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Form fields for one simulated UI event.
pub type Payload = BTreeMap<String, String>;

/// Cookie jar plus accumulated hidden-state fields, exclusively owned by one
/// walk. Later responses overwrite same-named hidden fields but never remove
/// others.
#[derive(Debug, Default)]
pub struct Session {
    cookies: BTreeMap<String, String>,
    hidden: BTreeMap<String, String>,
}

impl Session {
    fn cookie_header(&self) -> String {
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        pairs.join("; ")
    }

    /// Replaces the cookie jar wholesale with the `Set-Cookie` values of the
    /// latest response.
    fn replace_cookies<'a>(&mut self, set_cookie_values: impl Iterator<Item = &'a str>) {
        let mut jar = BTreeMap::new();
        for value in set_cookie_values {
            // Only the leading name=value pair matters; attributes like
            // Path and HttpOnly are dropped.
            let pair = value.split(';').next().unwrap_or(value);
            if let Some((name, val)) = pair.split_once('=') {
                jar.insert(name.trim().to_owned(), val.trim().to_owned());
            }
        }
        self.cookies = jar;
    }

    /// Pulls the known hidden-state tokens out of a parsed page. Runs on
    /// cached content too, so a warm-cache run sees the same state a cold
    /// one would.
    fn absorb_hidden_state(&mut self, doc: &Html) -> Result<()> {
        for field in HIDDEN_STATE_FIELDS {
            let sel = selector(&format!("#{field}"))?;
            if let Some(element) = doc.select(&sel).next() {
                match element.value().attr("value") {
                    Some(value) if !value.is_empty() => {
                        self.hidden.insert(field.to_owned(), value.to_owned());
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

/// Cache-first GET/POST client for the legistar UI.
pub struct Fetcher<C: PageCache> {
    client: Client,
    cache: C,
    session: Session,
}

impl<C: PageCache> Fetcher<C> {
    pub fn new(cache: C) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(Duration::from_secs(20))
            .build()?;
        Ok(Self {
            client,
            cache,
            session: Session::default(),
        })
    }

    /// Fetches `url` under the logical name `name`.
    ///
    /// A cached entry short-circuits the network entirely. Otherwise a GET is
    /// issued when `payload` is `None`, and a form POST (with the session's
    /// hidden-state fields merged in, payload keys winning) when it is
    /// `Some`. The raw body is written to the cache atomically before
    /// parsing, so a crash never leaves a partial entry and a re-run resumes
    /// from here.
    pub fn fetch(&mut self, url: &str, name: &str, payload: Option<Payload>) -> Result<Html> {
        let body = match self.cache.get(name)? {
            Some(bytes) => {
                debug!(name, "cache hit");
                String::from_utf8_lossy(&bytes).into_owned()
            }
            None => {
                info!(name, url, post = payload.is_some(), "fetching");
                let body = self.fetch_remote(url, payload)?;
                self.cache.put(name, body.as_bytes())?;
                body
            }
        };

        let doc = Html::parse_document(&body);
        self.session.absorb_hidden_state(&doc)?;
        Ok(doc)
    }

    fn fetch_remote(&mut self, url: &str, payload: Option<Payload>) -> Result<String> {
        let request = match payload {
            None => self.client.get(url),
            Some(mut form) => {
                for (field, value) in &self.session.hidden {
                    form.entry(field.clone()).or_insert_with(|| value.clone());
                }
                self.client.post(url).form(&form)
            }
        };
        let request = if self.session.cookies.is_empty() {
            request
        } else {
            request.header(COOKIE, self.session.cookie_header())
        };

        let response = request.send()?.error_for_status()?;
        let set_cookies = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::to_owned)
            .collect::<Vec<_>>();
        self.session
            .replace_cookies(set_cookies.iter().map(String::as_str));

        Ok(response.text()?)
    }
}
