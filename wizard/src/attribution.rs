//! Marketing attribution extraction.
//!
//! Attribution is read exactly once per submission, at submit time, so a
//! user navigating mid-flow cannot make the recorded campaign drift from
//! the page that actually converted.

use crate::constants::SOURCE_TAG;
use serde::{Deserialize, Serialize};
use url::Url;

/// Campaign parameters captured from the converting page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageAttribution {
    /// `utm_source`, defaulting to the fixed site tag when absent.
    pub utm_source: String,
    /// `utm_medium`.
    pub utm_medium: Option<String>,
    /// `utm_campaign`.
    pub utm_campaign: Option<String>,
    /// `utm_content`.
    pub utm_content: Option<String>,
    /// `utm_term`.
    pub utm_term: Option<String>,
    /// Full page URL.
    pub url: Option<String>,
    /// Document referrer.
    pub referrer: Option<String>,
}

impl Default for PageAttribution {
    fn default() -> Self {
        Self {
            utm_source: SOURCE_TAG.to_string(),
            utm_medium: None,
            utm_campaign: None,
            utm_content: None,
            utm_term: None,
            url: None,
            referrer: None,
        }
    }
}

impl PageAttribution {
    /// Extract attribution from a page URL and referrer.
    ///
    /// Pure and synchronous; blank parameters count as absent.
    #[must_use]
    pub fn from_page(url: &Url, referrer: Option<&str>) -> Self {
        let get = |key: &str| -> Option<String> {
            url.query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            utm_source: get("utm_source").unwrap_or_else(|| SOURCE_TAG.to_string()),
            utm_medium: get("utm_medium"),
            utm_campaign: get("utm_campaign"),
            utm_content: get("utm_content"),
            utm_term: get("utm_term"),
            url: Some(url.to_string()),
            referrer: referrer
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(ToString::to_string),
        }
    }
}

/// Source of attribution at submit time.
///
/// The production host hands the wizard something that can observe the
/// current page; tests hand it a fixed value.
pub trait AttributionReader: Send + Sync {
    /// Read the attribution for the submission happening right now.
    fn read(&self) -> PageAttribution;
}

/// An attribution reader returning a pre-parsed value.
///
/// Covers hosts whose entry URL is fixed for the session, and every test.
#[derive(Debug, Clone, Default)]
pub struct StaticAttribution(pub PageAttribution);

impl AttributionReader for StaticAttribution {
    fn read(&self) -> PageAttribution {
        self.0.clone()
    }
}
