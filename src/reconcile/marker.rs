use anyhow::{Context, Result};
use reqwest::Url;
use std::sync::Mutex;
use tracing::debug;
use url::form_urlencoded;

const MARKER_PREFIX: &str = "booking_";

/// Order marker round-tripped through the payment redirect, `booking_<id>_<suffix>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderMarker {
    booking_id: u64,
    raw: String,
}

impl OrderMarker {
    /// Parse a marker. Anything not starting with `booking_<digits>_` is rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let rest = raw.strip_prefix(MARKER_PREFIX)?;
        let digits_end = rest.find(|c: char| !c.is_ascii_digit())?;
        if digits_end == 0 || !rest[digits_end..].starts_with('_') {
            return None;
        }

        let booking_id = rest[..digits_end].parse::<u64>().ok()?;

        Some(OrderMarker {
            booking_id,
            raw: raw.to_string(),
        })
    }

    pub fn booking_id(&self) -> u64 {
        self.booking_id
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Page-addressable state holding the order marker.
///
/// The poller clears the marker exactly once, when a session resolves, so a
/// reload of the page does not resume polling.
pub trait PageState: Send + Sync {
    fn order_marker(&self) -> Option<String>;

    fn clear_order_marker(&self);
}

/// `PageState` backed by the page URL and its marker query parameter
pub struct PageUrl {
    url: Mutex<Url>,
    param: String,
}

impl PageUrl {
    pub fn new(url: Url, param: impl Into<String>) -> Self {
        PageUrl {
            url: Mutex::new(url),
            param: param.into(),
        }
    }

    pub fn parse(url: &str, param: impl Into<String>) -> Result<Self> {
        let url = Url::parse(url).with_context(|| format!("Invalid page URL: {}", url))?;
        Ok(Self::new(url, param))
    }

    /// In-page navigation to `url`, as a router push would do
    pub fn replace(&self, url: Url) {
        *self.lock() = url;
    }

    /// Current URL, including any marker that has not been cleared yet
    pub fn current(&self) -> Url {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Url> {
        self.url.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PageState for PageUrl {
    fn order_marker(&self) -> Option<String> {
        self.lock()
            .query_pairs()
            .find(|(key, _)| key == self.param.as_str())
            .map(|(_, value)| value.into_owned())
    }

    fn clear_order_marker(&self) {
        let mut url = self.lock();

        // Other parameters keep their original encoding
        let kept: Vec<String> = url
            .query()
            .unwrap_or_default()
            .split('&')
            .filter(|segment| !segment.is_empty())
            .filter(|segment| {
                form_urlencoded::parse(segment.as_bytes())
                    .next()
                    .map_or(true, |(key, _)| key != self.param.as_str())
            })
            .map(str::to_string)
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&kept.join("&")));
        }

        debug!(url = %url, param = %self.param, "Order marker cleared from page URL");
    }
}
