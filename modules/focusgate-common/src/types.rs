use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Comments beyond this many are ignored when classifying.
pub const MAX_COMMENTS: usize = 5;

/// Minimum length of a sub-token split out of a keyword phrase.
pub const MIN_TOKEN_LEN: usize = 3;

// --- Content ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    VideoSite,
    ForumSite,
}

impl SourceKind {
    /// What the identity key names on this kind of site.
    pub fn identity_label(&self) -> &'static str {
        match self {
            SourceKind::VideoSite => "Channel",
            SourceKind::ForumSite => "Subreddit",
        }
    }

    pub fn site_name(&self) -> &'static str {
        match self {
            SourceKind::VideoSite => "youtube",
            SourceKind::ForumSite => "reddit",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.site_name())
    }
}

/// Snapshot of one page's content as handed over by a scraper.
///
/// `identity_key` (channel or community name) is what every cache and
/// blocklist entry keys off. `url` is only consulted for URL rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct ContentItem {
    pub source_kind: SourceKind,
    #[builder(setter(into))]
    pub identity_key: String,
    #[serde(default)]
    #[builder(default, setter(into))]
    pub url: String,
    #[serde(default)]
    #[builder(default, setter(into))]
    pub title: String,
    #[serde(default)]
    #[builder(default, setter(into))]
    pub body_text: String,
    #[serde(default)]
    #[builder(default)]
    pub comments: Vec<String>,
}

impl ContentItem {
    /// Items without an identity never enter the decision pipeline.
    pub fn has_identity(&self) -> bool {
        !self.identity_key.trim().is_empty()
    }

    pub fn top_comments(&self) -> &[String] {
        let n = self.comments.len().min(MAX_COMMENTS);
        &self.comments[..n]
    }
}

// --- Surfaces ---

/// The visible surface (a browser tab) a classification belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceId(String);

impl SurfaceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SurfaceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<u64> for SurfaceId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

// --- Verdicts ---

/// Which pipeline stage produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictSource {
    TempWhitelist,
    PermanentBlocklist,
    UrlRule,
    Heuristic,
    RemoteGate,
    /// The remote gate was unavailable and the mode's default applied.
    RemoteGateDefault,
}

impl VerdictSource {
    /// Block terminals from these sources add the identity to the blocklist.
    pub fn learns_block(&self) -> bool {
        matches!(
            self,
            VerdictSource::Heuristic | VerdictSource::RemoteGate | VerdictSource::RemoteGateDefault
        )
    }
}

/// Final outcome for one content item. Never mutated after construction;
/// a later classification produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    is_entertainment: bool,
    reasoning: String,
    identity_key: String,
    produced_at: DateTime<Utc>,
    source: VerdictSource,
}

impl Verdict {
    pub fn allow(
        identity_key: impl Into<String>,
        reasoning: impl Into<String>,
        source: VerdictSource,
        produced_at: DateTime<Utc>,
    ) -> Self {
        Self::new(false, identity_key, reasoning, source, produced_at)
    }

    pub fn block(
        identity_key: impl Into<String>,
        reasoning: impl Into<String>,
        source: VerdictSource,
        produced_at: DateTime<Utc>,
    ) -> Self {
        Self::new(true, identity_key, reasoning, source, produced_at)
    }

    fn new(
        is_entertainment: bool,
        identity_key: impl Into<String>,
        reasoning: impl Into<String>,
        source: VerdictSource,
        produced_at: DateTime<Utc>,
    ) -> Self {
        let reasoning = reasoning.into();
        let reasoning = if reasoning.trim().is_empty() {
            if is_entertainment {
                "Classified as entertainment.".to_string()
            } else {
                "Classified as not entertainment.".to_string()
            }
        } else {
            reasoning
        };
        Self {
            is_entertainment,
            reasoning,
            identity_key: identity_key.into(),
            produced_at,
            source,
        }
    }

    pub fn is_entertainment(&self) -> bool {
        self.is_entertainment
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    pub fn identity_key(&self) -> &str {
        &self.identity_key
    }

    pub fn produced_at(&self) -> DateTime<Utc> {
        self.produced_at
    }

    pub fn source(&self) -> VerdictSource {
        self.source
    }
}

/// What a result reader sees for a surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SurfaceState {
    Classifying {
        identity_key: String,
        started_at: DateTime<Utc>,
    },
    Decided {
        verdict: Verdict,
    },
}

impl SurfaceState {
    pub fn verdict(&self) -> Option<&Verdict> {
        match self {
            SurfaceState::Decided { verdict } => Some(verdict),
            SurfaceState::Classifying { .. } => None,
        }
    }

    /// When this state was written.
    pub fn updated_at(&self) -> DateTime<Utc> {
        match self {
            SurfaceState::Classifying { started_at, .. } => *started_at,
            SurfaceState::Decided { verdict } => verdict.produced_at(),
        }
    }
}

// --- Profile ---

/// Raw preference text as typed by the user (comma-separated topics).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileText {
    #[serde(default)]
    pub productive: String,
    #[serde(default)]
    pub unwanted: String,
}

impl ProfileText {
    pub fn new(productive: impl Into<String>, unwanted: impl Into<String>) -> Self {
        Self {
            productive: productive.into(),
            unwanted: unwanted.into(),
        }
    }

    pub fn productive_terms(&self) -> Vec<String> {
        split_terms(&self.productive)
    }

    pub fn unwanted_terms(&self) -> Vec<String> {
        split_terms(&self.unwanted)
    }

    pub fn is_empty(&self) -> bool {
        self.productive_terms().is_empty() && self.unwanted_terms().is_empty()
    }
}

/// Split comma-separated free text into trimmed, non-empty terms.
pub fn split_terms(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Expanded keyword sets per user term, used for local matching.
///
/// Construct through [`KeywordProfile::normalized`] so every keyword is
/// lowercase, trimmed, deduplicated, and every term matches itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordProfile {
    pub productive: BTreeMap<String, BTreeSet<String>>,
    pub unwanted: BTreeMap<String, BTreeSet<String>>,
}

impl KeywordProfile {
    /// Build a profile from the user's terms and whatever the expansion
    /// step returned for them.
    pub fn normalized(
        productive_terms: &[String],
        unwanted_terms: &[String],
        raw_productive: &BTreeMap<String, Vec<String>>,
        raw_unwanted: &BTreeMap<String, Vec<String>>,
    ) -> Self {
        Self {
            productive: normalize_term_map(productive_terms, raw_productive),
            unwanted: normalize_term_map(unwanted_terms, raw_unwanted),
        }
    }

    /// All productive keywords, deduplicated across terms.
    pub fn productive_keywords(&self) -> BTreeSet<&str> {
        flatten(&self.productive)
    }

    /// All unwanted keywords, deduplicated across terms.
    pub fn unwanted_keywords(&self) -> BTreeSet<&str> {
        flatten(&self.unwanted)
    }

    pub fn is_empty(&self) -> bool {
        self.productive.is_empty() && self.unwanted.is_empty()
    }
}

fn flatten(map: &BTreeMap<String, BTreeSet<String>>) -> BTreeSet<&str> {
    map.values()
        .flat_map(|set| set.iter().map(String::as_str))
        .collect()
}

fn normalize_term_map(
    terms: &[String],
    raw: &BTreeMap<String, Vec<String>>,
) -> BTreeMap<String, BTreeSet<String>> {
    let mut out: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for term in terms {
        let key = term.trim();
        if !key.is_empty() {
            out.entry(key.to_string()).or_default();
        }
    }

    for (raw_term, keywords) in raw {
        let raw_key = raw_term.trim();
        if raw_key.is_empty() {
            continue;
        }
        // Fold the model's key back onto the user's spelling of the term.
        let key = terms
            .iter()
            .map(|t| t.trim())
            .find(|t| t.eq_ignore_ascii_case(raw_key))
            .unwrap_or(raw_key)
            .to_string();

        let set = out.entry(key).or_default();
        set.extend(
            keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty()),
        );
    }

    for (term, set) in out.iter_mut() {
        set.insert(term.to_lowercase());
        let tokens: Vec<String> = set
            .iter()
            .flat_map(|phrase| sub_tokens(phrase))
            .collect();
        set.extend(tokens);
    }

    out
}

/// Alphanumeric pieces of a lowercase phrase, at least `MIN_TOKEN_LEN` long.
fn sub_tokens(phrase: &str) -> Vec<String> {
    phrase
        .split(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit()))
        .filter(|t| t.len() >= MIN_TOKEN_LEN)
        .map(str::to_string)
        .collect()
}

/// Generated classification guidance, derived from the user's preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInstructions {
    #[serde(default)]
    pub relevant_topics: Vec<String>,
    #[serde(default)]
    pub entertainment_indicators: Vec<String>,
}

impl UserInstructions {
    pub fn is_empty(&self) -> bool {
        self.relevant_topics.is_empty() && self.entertainment_indicators.is_empty()
    }
}
