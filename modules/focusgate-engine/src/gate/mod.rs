//! Remote reasoning fallback.
//!
//! `ReasoningGate` is the seam between the decision engine and the remote
//! text-reasoning service. Implementations never surface errors: transport,
//! status, envelope and parse failures all come back as `None`, and the
//! engine applies the mode's default.

mod groq;
pub mod prompts;

pub use groq::GroqGate;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use focusgate_common::{ContentItem, ProfileText, UserInstructions};

/// Keyword candidates per user term, as returned by the expansion call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawKeywordMaps {
    pub productive: BTreeMap<String, Vec<String>>,
    pub unwanted: BTreeMap<String, Vec<String>>,
}

/// Inputs for the dual-list (lenient) classification.
#[derive(Debug, Clone, Copy)]
pub struct DualListContext<'a> {
    pub productive: &'a str,
    pub unwanted: &'a str,
    pub instructions: Option<&'a UserInstructions>,
}

/// Dual-list answer. `entertainment` is `None` when the model omitted it or
/// returned a non-boolean; callers treat that like an absent result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DualListResult {
    pub reasoning: String,
    pub entertainment: Option<bool>,
}

/// Productive-only gate answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrictResult {
    pub reasoning: String,
    /// Defaults to `false` when missing or malformed.
    pub productive_match: bool,
}

#[async_trait]
pub trait ReasoningGate: Send + Sync {
    /// Expand user terms into 8-15 candidate keywords each.
    async fn expand_keywords(
        &self,
        productive_terms: &[String],
        unwanted_terms: &[String],
    ) -> Option<RawKeywordMaps>;

    /// Generalise the user's preferences into classification guidance.
    async fn generate_instructions(&self, profile: &ProfileText) -> Option<UserInstructions>;

    /// Lenient classification against both lists.
    async fn classify_dual(
        &self,
        item: &ContentItem,
        context: DualListContext<'_>,
    ) -> Option<DualListResult>;

    /// Strict gate: is this content about one of the productive topics?
    async fn classify_strict(&self, item: &ContentItem, productive: &str) -> Option<StrictResult>;
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

fn parse_object(raw: &str, what: &str) -> Option<Value> {
    match ai_client::parse_json_lenient::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Some(value),
        Ok(other) => {
            warn!(what, kind = %value_kind(&other), "Model returned JSON that is not an object");
            None
        }
        Err(e) => {
            warn!(what, error = %e, "Failed to parse model response");
            None
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn reasoning_of(value: &Value) -> String {
    value
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn term_map(value: Option<&Value>) -> BTreeMap<String, Vec<String>> {
    match value {
        Some(Value::Object(map)) => map
            .iter()
            .map(|(term, keywords)| (term.clone(), string_list(Some(keywords))))
            .collect(),
        _ => BTreeMap::new(),
    }
}

pub fn parse_keyword_maps(raw: &str) -> Option<RawKeywordMaps> {
    let value = parse_object(raw, "keyword_maps")?;
    Some(RawKeywordMaps {
        productive: term_map(value.get("productive")),
        unwanted: term_map(value.get("unwanted")),
    })
}

pub fn parse_instructions(raw: &str) -> Option<UserInstructions> {
    let value = parse_object(raw, "instructions")?;
    Some(UserInstructions {
        relevant_topics: string_list(value.get("relevant_topics")),
        entertainment_indicators: string_list(value.get("entertainment_indicators")),
    })
}

pub fn parse_dual_list(raw: &str) -> Option<DualListResult> {
    let value = parse_object(raw, "dual_list")?;
    let entertainment = value.get("entertainment").and_then(Value::as_bool);
    if entertainment.is_none() {
        warn!("Dual-list response missing boolean `entertainment`");
    }
    Some(DualListResult {
        reasoning: reasoning_of(&value),
        entertainment,
    })
}

pub fn parse_strict(raw: &str) -> Option<StrictResult> {
    let value = parse_object(raw, "strict_gate")?;
    let productive_match = match value.get("productive_match").and_then(Value::as_bool) {
        Some(flag) => flag,
        None => {
            warn!("Strict response missing `productive_match`, treating as non-productive");
            false
        }
    };
    Some(StrictResult {
        reasoning: reasoning_of(&value),
        productive_match,
    })
}
