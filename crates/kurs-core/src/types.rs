// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core data types: source descriptors, extraction results, rate records,
//! provenance tags and the error taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How a source page is acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// Plain HTTP GET, markup parsed as-is.
    Static,
    /// Page rendered in the headless browser before extraction.
    Rendered,
}

impl FetchMode {
    /// The other acquisition mode, used as the last-resort fallback.
    pub fn opposite(self) -> Self {
        match self {
            Self::Static => Self::Rendered,
            Self::Rendered => Self::Static,
        }
    }

    /// Label used by the HTTP API listing.
    pub fn method_label(self) -> &'static str {
        match self {
            Self::Static => "fetch",
            Self::Rendered => "browser",
        }
    }
}

/// Selects which extractor profile (strategy ordering and parsing quirks)
/// applies to a rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorVariant {
    Generic,
    /// Official reference rate interleaved with commercial columns.
    Hamkor,
    /// Data attributes and localized labels, table first.
    Tbc,
    /// SPA blocks with one value per line and `-0.00` noise tokens.
    Asaka,
    /// Tab-separated table rows in the rendered text.
    Hayot,
    /// Mobile-app rates listed next to branch rates.
    Brb,
    /// Generic chain with wider windows and stricter integer parsing.
    Extended,
}

impl ExtractorVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Hamkor => "hamkor",
            Self::Tbc => "tbc",
            Self::Asaka => "asaka",
            Self::Hayot => "hayot",
            Self::Brb => "brb",
            Self::Extended => "extended",
        }
    }
}

/// Immutable description of one bank website.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Canonical, unique source name.
    pub name: String,
    /// Primary page URL.
    pub url: String,
    pub mode: FetchMode,
    /// Extra wait after navigation so client-side rendering can finish.
    /// Only meaningful for rendered sources.
    #[serde(with = "duration_ms")]
    pub settle: Duration,
    /// Alternate page tried when the primary one yields nothing usable.
    pub alt_url: Option<String>,
    pub variant: ExtractorVariant,
}

impl SourceDescriptor {
    /// A static source using the generic profile.
    pub fn fetched(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            mode: FetchMode::Static,
            settle: Duration::ZERO,
            alt_url: None,
            variant: ExtractorVariant::Generic,
        }
    }

    /// A rendered source with the given settle delay in milliseconds.
    pub fn rendered(name: &str, url: &str, settle_ms: u64) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            mode: FetchMode::Rendered,
            settle: Duration::from_millis(settle_ms),
            alt_url: None,
            variant: ExtractorVariant::Generic,
        }
    }

    pub fn with_alt(mut self, alt_url: &str) -> Self {
        self.alt_url = Some(alt_url.to_string());
        self
    }

    pub fn with_variant(mut self, variant: ExtractorVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Static sources are "light": no rendering cost.
    pub fn is_light(&self) -> bool {
        self.mode == FetchMode::Static
    }
}

/// Output of one extraction attempt. Not persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawExtraction {
    pub buy: Option<i64>,
    pub sell: Option<i64>,
    /// Which strategy produced the values, e.g. `generic:table`.
    pub strategy: String,
}

impl RawExtraction {
    pub fn miss() -> Self {
        Self::default()
    }

    pub fn is_hit(&self) -> bool {
        self.buy.is_some() || self.sell.is_some()
    }
}

/// One stage that contributed to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProvenanceTag {
    Own,
    OwnAlt,
    Channel,
    SwapFix,
    None,
    Error,
}

impl ProvenanceTag {
    const ALL: [ProvenanceTag; 6] = [
        Self::Own,
        Self::OwnAlt,
        Self::Channel,
        Self::SwapFix,
        Self::None,
        Self::Error,
    ];

    fn bit(self) -> u8 {
        match self {
            Self::Own => 1,
            Self::OwnAlt => 1 << 1,
            Self::Channel => 1 << 2,
            Self::SwapFix => 1 << 3,
            Self::None => 1 << 4,
            Self::Error => 1 << 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Own => "own",
            Self::OwnAlt => "own-alt",
            Self::Channel => "channel",
            Self::SwapFix => "swap-fix",
            Self::None => "none",
            Self::Error => "error",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

/// Composable set of [`ProvenanceTag`]s, serialized as `own+channel`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Provenance(u8);

impl Provenance {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn of(tag: ProvenanceTag) -> Self {
        Self(tag.bit())
    }

    pub fn insert(&mut self, tag: ProvenanceTag) {
        self.0 |= tag.bit();
    }

    pub fn remove(&mut self, tag: ProvenanceTag) {
        self.0 &= !tag.bit();
    }

    pub fn with(mut self, tag: ProvenanceTag) -> Self {
        self.insert(tag);
        self
    }

    pub fn contains(&self, tag: ProvenanceTag) -> bool {
        self.0 & tag.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn tags(&self) -> impl Iterator<Item = ProvenanceTag> + '_ {
        ProvenanceTag::ALL.into_iter().filter(|t| self.contains(*t))
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let joined: Vec<&str> = self.tags().map(ProvenanceTag::as_str).collect();
        f.write_str(&joined.join("+"))
    }
}

impl From<Provenance> for String {
    fn from(p: Provenance) -> Self {
        p.to_string()
    }
}

impl TryFrom<String> for Provenance {
    type Error = KursError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let mut p = Provenance::empty();
        for part in s.split('+').map(str::trim).filter(|p| !p.is_empty()) {
            let tag = ProvenanceTag::parse(part)
                .ok_or_else(|| KursError::Validation(format!("unknown provenance tag: {part}")))?;
            p.insert(tag);
        }
        Ok(p)
    }
}

/// Final per-source result in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateRecord {
    pub name: String,
    pub buy: Option<i64>,
    pub sell: Option<i64>,
    #[serde(rename = "source")]
    pub provenance: Provenance,
}

impl RateRecord {
    pub fn empty(name: &str, tag: ProvenanceTag) -> Self {
        Self {
            name: name.to_string(),
            buy: None,
            sell: None,
            provenance: Provenance::of(tag),
        }
    }

    pub fn is_full(&self) -> bool {
        self.buy.is_some() && self.sell.is_some()
    }

    pub fn is_resolved(&self) -> bool {
        self.buy.is_some() || self.sell.is_some()
    }

    pub fn is_partial(&self) -> bool {
        self.is_resolved() && !self.is_full()
    }
}

/// Errors that can occur while collecting and reconciling rates.
#[derive(thiserror::Error, Debug)]
pub enum KursError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Render engine error: {0}")]
    RenderEngine(String),

    #[error("No strategy matched a plausible rate")]
    ExtractionMiss,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Cycle resolved {resolved} sources, {required} required")]
    InsufficientCycle { resolved: usize, required: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl KursError {
    /// True for failures of the transport (as opposed to "page loaded but
    /// nothing recognisable on it").
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout(_) | Self::HttpStatus { .. } | Self::RenderEngine(_)
        )
    }
}

/// Convenience result type.
pub type KursResult<T> = Result<T, KursError>;

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
