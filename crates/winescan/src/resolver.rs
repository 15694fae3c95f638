//! Payload resolution.
//!
//! Turns a decoded payload into a catalog match using an ordered cascade:
//! explicit `wine:<ID>` reference, then URL, then keyword search on names.
//! The first tier that claims the payload decides the outcome.

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::catalog::{Catalog, ItemRecord};

/// Prefix of an explicit catalog reference.
pub const REFERENCE_PREFIX: &str = "wine:";

/// Prefix added to the label of keyword matches.
pub const KEYWORD_LABEL_PREFIX: &str = "keyword:";

/// Which resolution tier handled a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// `wine:<ID>` direct key lookup.
    Reference,
    /// Well-formed URL, looked up by full text then by last path segment.
    Url,
    /// Case-insensitive substring search over names.
    Keyword,
}

impl std::fmt::Display for MatchTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reference => write!(f, "reference"),
            Self::Url => write!(f, "url"),
            Self::Keyword => write!(f, "keyword"),
        }
    }
}

/// Outcome of resolving one payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Canonical label recorded in history.
    pub label: String,
    /// The tier that handled the payload.
    pub tier: MatchTier,
    /// Catalog key of the matched record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// The matched record, if any.
    pub record: Option<ItemRecord>,
}

impl Resolution {
    fn new(tier: MatchTier, label: &str, hit: Option<(&str, &ItemRecord)>) -> Self {
        Self {
            label: label.to_string(),
            tier,
            key: hit.map(|(key, _)| key.to_string()),
            record: hit.map(|(_, record)| record.clone()),
        }
    }

    /// Check if a record was found.
    #[must_use]
    pub fn is_match(&self) -> bool {
        self.record.is_some()
    }
}

/// Resolve `payload` against `catalog`.
#[must_use]
pub fn resolve(payload: &str, catalog: &Catalog) -> Resolution {
    let resolution = if let Some(rest) = payload.strip_prefix(REFERENCE_PREFIX) {
        let id = rest.split(':').next().unwrap_or(rest);
        Resolution::new(MatchTier::Reference, payload, catalog.get_entry(id))
    } else if is_url(payload) {
        let hit = catalog
            .get_entry(payload)
            .or_else(|| catalog.get_entry(last_segment(payload)));
        Resolution::new(MatchTier::Url, payload, hit)
    } else {
        match catalog.find_by_name(payload) {
            Some(hit) => Resolution::new(
                MatchTier::Keyword,
                &format!("{KEYWORD_LABEL_PREFIX}{payload}"),
                Some(hit),
            ),
            None => Resolution::new(MatchTier::Keyword, payload, None),
        }
    };

    debug!(
        tier = %resolution.tier,
        matched = resolution.is_match(),
        label = %resolution.label,
        "Resolved payload"
    );
    resolution
}

fn is_url(payload: &str) -> bool {
    Url::parse(payload).is_ok()
}

/// Text after the last `/`, cut at the first `?`.
fn last_segment(payload: &str) -> &str {
    let segment = payload.rsplit('/').next().unwrap_or(payload);
    segment.split('?').next().unwrap_or(segment)
}
