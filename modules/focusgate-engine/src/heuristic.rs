//! Local keyword heuristic. Cheap, no remote call, and deliberately
//! reluctant: it only commits when one category both clears an absolute
//! floor and dominates the other by the configured ratio.

use std::collections::BTreeSet;

use serde::Serialize;

use focusgate_common::{ContentItem, DominanceRatio, KeywordProfile};

/// Below this many total hits the heuristic never decides.
pub const MIN_TOTAL_HITS: usize = 3;
/// The winning category needs at least this many hits of its own.
pub const MIN_SIDE_HITS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicDecision {
    Allow,
    Block,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeuristicOutcome {
    pub decision: HeuristicDecision,
    pub reason: String,
    pub productive_hits: usize,
    pub unwanted_hits: usize,
}

impl HeuristicOutcome {
    fn unknown(reason: impl Into<String>) -> Self {
        Self {
            decision: HeuristicDecision::Unknown,
            reason: reason.into(),
            productive_hits: 0,
            unwanted_hits: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicScorer;

impl HeuristicScorer {
    pub fn score(
        &self,
        item: &ContentItem,
        profile: &KeywordProfile,
        ratio: DominanceRatio,
    ) -> HeuristicOutcome {
        let corpus = corpus(item);
        if corpus.is_empty() {
            return HeuristicOutcome::unknown("Insufficient content text.");
        }

        let productive_hits = count_hits(&corpus, &profile.productive_keywords());
        let unwanted_hits = count_hits(&corpus, &profile.unwanted_keywords());
        let (decision, reason) = decide(productive_hits, unwanted_hits, ratio);

        HeuristicOutcome {
            decision,
            reason,
            productive_hits,
            unwanted_hits,
        }
    }
}

/// Lowercased title, body, comments and identity, newline-joined.
pub fn corpus(item: &ContentItem) -> String {
    let mut fields: Vec<&str> = vec![item.title.as_str(), item.body_text.as_str()];
    fields.extend(item.top_comments().iter().map(String::as_str));
    fields.push(item.identity_key.as_str());

    fields
        .into_iter()
        .filter(|f| !f.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .to_lowercase()
}

/// The scoring policy on raw hit counts.
pub fn decide(
    productive_hits: usize,
    unwanted_hits: usize,
    ratio: DominanceRatio,
) -> (HeuristicDecision, String) {
    let p = productive_hits;
    let u = unwanted_hits;

    if p + u < MIN_TOTAL_HITS {
        return (
            HeuristicDecision::Unknown,
            format!("Insufficient signal (productive={p}, unwanted={u})"),
        );
    }

    let unwanted_ratio = u as f64 / p.max(1) as f64;
    if u >= MIN_SIDE_HITS && unwanted_ratio >= ratio.value() {
        return (
            HeuristicDecision::Block,
            format!("Unwanted keywords dominate (ratio {unwanted_ratio:.2}, productive={p}, unwanted={u})"),
        );
    }

    let productive_ratio = p as f64 / u.max(1) as f64;
    if p >= MIN_SIDE_HITS && productive_ratio >= ratio.value() {
        return (
            HeuristicDecision::Allow,
            format!("Productive keywords dominate (ratio {productive_ratio:.2}, productive={p}, unwanted={u})"),
        );
    }

    (
        HeuristicDecision::Unknown,
        format!("Inconclusive ratio ({p}:{u})"),
    )
}

fn count_hits(corpus: &str, keywords: &BTreeSet<&str>) -> usize {
    keywords
        .iter()
        .map(|kw| count_occurrences(corpus, kw))
        .sum()
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit()
}

/// Occurrences of `keyword` in `corpus` not flanked by an ASCII letter or
/// digit on either side. Both inputs are expected lowercase.
pub fn count_occurrences(corpus: &str, keyword: &str) -> usize {
    if keyword.is_empty() {
        return 0;
    }

    let mut count = 0;
    let mut from = 0;
    while let Some(offset) = corpus[from..].find(keyword) {
        let start = from + offset;
        let end = start + keyword.len();

        let before_ok = corpus[..start].chars().next_back().map_or(true, |c| !is_word_char(c));
        let after_ok = corpus[end..].chars().next().map_or(true, |c| !is_word_char(c));

        if before_ok && after_ok {
            count += 1;
            from = end;
        } else {
            // Step one character so an overlapping, valid match is not skipped.
            from = start + corpus[start..].chars().next().map_or(1, char::len_utf8);
        }
    }
    count
}
