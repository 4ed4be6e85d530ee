// Test doubles for the decision engine.
//
// - MockGate (ReasoningGate): canned answers per call kind, call counters
// - RecordingNavigator (Navigator): records redirects plus the surface state
//   that was visible when each redirect happened
//
// Plus helpers for building content items and fixed timestamps.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use focusgate_common::{
    ContentItem, ProfileText, SourceKind, SurfaceId, SurfaceState, UserInstructions,
};

use crate::gate::{DualListContext, DualListResult, RawKeywordMaps, ReasoningGate, StrictResult};
use crate::navigator::Navigator;
use crate::store::DecisionStore;

// ---------------------------------------------------------------------------
// MockGate
// ---------------------------------------------------------------------------

/// Deterministic `ReasoningGate`. Every call kind returns its configured
/// answer, or `None` (an unavailable remote) when nothing was configured.
#[derive(Default)]
pub struct MockGate {
    expansion: Option<RawKeywordMaps>,
    instructions: Option<UserInstructions>,
    dual: Option<DualListResult>,
    strict: Option<StrictResult>,
    expand_calls: AtomicUsize,
    instruction_calls: AtomicUsize,
    dual_calls: AtomicUsize,
    strict_calls: AtomicUsize,
    last_dual_instructions: Mutex<Option<UserInstructions>>,
    last_strict_productive: Mutex<Option<String>>,
    unblock_in_flight: Option<InFlightUnblock>,
}

/// An unblock written to the store while a classification call is running.
struct InFlightUnblock {
    store: Arc<dyn DecisionStore>,
    identity_key: String,
    at: DateTime<Utc>,
}

impl MockGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_expansion(mut self, maps: RawKeywordMaps) -> Self {
        self.expansion = Some(maps);
        self
    }

    pub fn with_instructions(mut self, instructions: UserInstructions) -> Self {
        self.instructions = Some(instructions);
        self
    }

    pub fn with_dual(mut self, result: DualListResult) -> Self {
        self.dual = Some(result);
        self
    }

    /// Dual-list answer with an explicit entertainment flag.
    pub fn entertainment(self, entertainment: bool) -> Self {
        self.with_dual(DualListResult {
            reasoning: format!("mock: entertainment={entertainment}"),
            entertainment: Some(entertainment),
        })
    }

    /// Strict-gate answer.
    pub fn productive_match(mut self, productive_match: bool) -> Self {
        self.strict = Some(StrictResult {
            reasoning: format!("mock: productive_match={productive_match}"),
            productive_match,
        });
        self
    }

    /// Whitelist `identity_key` (as an unblock would) from inside every
    /// classification call, before the answer is returned.
    pub fn unblock_during_classify(
        mut self,
        store: Arc<dyn DecisionStore>,
        identity_key: &str,
        at: DateTime<Utc>,
    ) -> Self {
        self.unblock_in_flight = Some(InFlightUnblock {
            store,
            identity_key: identity_key.to_string(),
            at,
        });
        self
    }

    async fn run_in_flight_unblock(&self) {
        if let Some(unblock) = &self.unblock_in_flight {
            unblock
                .store
                .whitelist(&unblock.identity_key, unblock.at)
                .await
                .unwrap();
            unblock
                .store
                .remove_from_blocklist(&unblock.identity_key)
                .await
                .unwrap();
        }
    }

    pub fn expand_calls(&self) -> usize {
        self.expand_calls.load(Ordering::SeqCst)
    }

    pub fn instruction_calls(&self) -> usize {
        self.instruction_calls.load(Ordering::SeqCst)
    }

    pub fn dual_calls(&self) -> usize {
        self.dual_calls.load(Ordering::SeqCst)
    }

    pub fn strict_calls(&self) -> usize {
        self.strict_calls.load(Ordering::SeqCst)
    }

    /// Classification calls of either kind.
    pub fn classify_calls(&self) -> usize {
        self.dual_calls() + self.strict_calls()
    }

    pub fn last_dual_instructions(&self) -> Option<UserInstructions> {
        self.last_dual_instructions.lock().unwrap().clone()
    }

    pub fn last_strict_productive(&self) -> Option<String> {
        self.last_strict_productive.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReasoningGate for MockGate {
    async fn expand_keywords(
        &self,
        _productive_terms: &[String],
        _unwanted_terms: &[String],
    ) -> Option<RawKeywordMaps> {
        self.expand_calls.fetch_add(1, Ordering::SeqCst);
        self.expansion.clone()
    }

    async fn generate_instructions(&self, _profile: &ProfileText) -> Option<UserInstructions> {
        self.instruction_calls.fetch_add(1, Ordering::SeqCst);
        self.instructions.clone()
    }

    async fn classify_dual(
        &self,
        _item: &ContentItem,
        context: DualListContext<'_>,
    ) -> Option<DualListResult> {
        self.dual_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_dual_instructions.lock().unwrap() = context.instructions.cloned();
        self.run_in_flight_unblock().await;
        self.dual.clone()
    }

    async fn classify_strict(&self, _item: &ContentItem, productive: &str) -> Option<StrictResult> {
        self.strict_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_strict_productive.lock().unwrap() = Some(productive.to_string());
        self.run_in_flight_unblock().await;
        self.strict.clone()
    }
}

// ---------------------------------------------------------------------------
// RecordingNavigator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Redirect {
    pub surface: SurfaceId,
    pub target_url: String,
    /// The store's surface state at the moment of the redirect.
    pub visible_state: Option<SurfaceState>,
}

/// Records every redirect. Reads the store on each call so tests can check
/// that a verdict was already published.
pub struct RecordingNavigator {
    store: Arc<dyn DecisionStore>,
    redirects: Mutex<Vec<Redirect>>,
}

impl RecordingNavigator {
    pub fn new(store: Arc<dyn DecisionStore>) -> Self {
        Self {
            store,
            redirects: Mutex::new(Vec::new()),
        }
    }

    pub fn redirects(&self) -> Vec<Redirect> {
        self.redirects.lock().unwrap().clone()
    }
}

#[async_trait]
impl Navigator for RecordingNavigator {
    async fn redirect(&self, surface: &SurfaceId, target_url: &str) -> Result<()> {
        let visible_state = self.store.surface_state(surface).await?;
        self.redirects.lock().unwrap().push(Redirect {
            surface: surface.clone(),
            target_url: target_url.to_string(),
            visible_state,
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn video_item(channel: &str, title: &str) -> ContentItem {
    ContentItem::builder()
        .source_kind(SourceKind::VideoSite)
        .identity_key(channel)
        .url(format!("https://www.youtube.com/watch?v={}", channel.trim()))
        .title(title)
        .build()
}

pub fn forum_item(subreddit: &str, title: &str, body: &str) -> ContentItem {
    ContentItem::builder()
        .source_kind(SourceKind::ForumSite)
        .identity_key(subreddit)
        .url(format!("https://www.reddit.com/r/{}/comments/1", subreddit.trim()))
        .title(title)
        .body_text(body)
        .build()
}

/// A fixed instant so tests can reason about the whitelist window.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}
