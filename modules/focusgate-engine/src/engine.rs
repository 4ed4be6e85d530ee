//! The per-item decision pipeline.
//!
//! Each classification walks an explicit state machine:
//!
//! ```text
//! Start -> UrlRuleCheck -> TempWhitelistCheck -> PermanentBlocklistCheck
//!       -> HeuristicCheck -> RemoteGate(mode) -> Terminal(verdict)
//! ```
//!
//! Any stage may jump straight to `Terminal`. `Start` drops items without
//! an identity key. Reaching `Terminal` always writes the surface verdict
//! before the navigator is asked to redirect.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

use focusgate_common::config::DEFAULT_REDIRECT_URL;
use focusgate_common::{
    ContentItem, FocusError, KeywordProfile, Mode, ProfileText, Settings, SurfaceId,
    SurfaceState, UserInstructions, Verdict, VerdictSource,
};

use crate::expander::KeywordExpander;
use crate::gate::{DualListContext, DualListResult, ReasoningGate};
use crate::heuristic::{HeuristicDecision, HeuristicScorer};
use crate::navigator::{Navigator, NoopNavigator};
use crate::store::{whitelist_is_live, DecisionStore};
use crate::url_rules;

/// Collaborators the engine is built from.
#[derive(Clone, TypedBuilder)]
pub struct EngineDeps {
    pub store: Arc<dyn DecisionStore>,
    pub gate: Arc<dyn ReasoningGate>,
    #[builder(default = Arc::new(NoopNavigator) as Arc<dyn Navigator>)]
    pub navigator: Arc<dyn Navigator>,
    #[builder(default = DEFAULT_REDIRECT_URL.to_string(), setter(into))]
    pub redirect_url: String,
}

/// Pipeline position for one content item.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Start,
    UrlRuleCheck,
    TempWhitelistCheck,
    PermanentBlocklistCheck,
    HeuristicCheck,
    RemoteGate(Mode),
    Terminal(Verdict),
    /// No identity key; nothing is produced.
    Dropped,
}

impl Stage {
    pub fn is_final(&self) -> bool {
        matches!(self, Stage::Terminal(_) | Stage::Dropped)
    }
}

/// Per-run inputs shared by every transition.
pub struct Run<'a> {
    pub surface: &'a SurfaceId,
    pub item: &'a ContentItem,
    pub settings: Settings,
    pub now: DateTime<Utc>,
}

impl Run<'_> {
    fn identity_key(&self) -> &str {
        self.item.identity_key.trim()
    }

    fn allow(&self, reasoning: impl Into<String>, source: VerdictSource) -> Stage {
        Stage::Terminal(Verdict::allow(self.identity_key(), reasoning, source, self.now))
    }

    fn block(&self, reasoning: impl Into<String>, source: VerdictSource) -> Stage {
        Stage::Terminal(Verdict::block(self.identity_key(), reasoning, source, self.now))
    }
}

pub struct DecisionEngine {
    store: Arc<dyn DecisionStore>,
    gate: Arc<dyn ReasoningGate>,
    navigator: Arc<dyn Navigator>,
    redirect_url: String,
    expander: KeywordExpander,
    scorer: HeuristicScorer,
}

impl DecisionEngine {
    pub fn new(deps: EngineDeps) -> Self {
        Self {
            expander: KeywordExpander::new(deps.gate.clone()),
            store: deps.store,
            gate: deps.gate,
            navigator: deps.navigator,
            redirect_url: deps.redirect_url,
            scorer: HeuristicScorer,
        }
    }

    // -----------------------------------------------------------------------
    // Classification
    // -----------------------------------------------------------------------

    /// Fire-and-forget classification. The verdict is also readable via
    /// [`get_verdict`](Self::get_verdict) once the task finishes.
    pub fn submit(self: &Arc<Self>, surface: SurfaceId, item: ContentItem) -> JoinHandle<Option<Verdict>> {
        let engine = Arc::clone(self);
        tokio::spawn(async move { engine.classify(&surface, &item).await })
    }

    pub async fn classify(&self, surface: &SurfaceId, item: &ContentItem) -> Option<Verdict> {
        self.classify_at(surface, item, Utc::now()).await
    }

    /// Run the pipeline with an explicit clock.
    pub async fn classify_at(
        &self,
        surface: &SurfaceId,
        item: &ContentItem,
        now: DateTime<Utc>,
    ) -> Option<Verdict> {
        let run = Run {
            surface,
            item,
            settings: self.load_settings().await,
            now,
        };

        let mut stage = Stage::Start;
        while !stage.is_final() {
            stage = self.step(stage, &run).await;
        }

        match stage {
            Stage::Terminal(verdict) => {
                self.finish(&run, &verdict).await;
                Some(verdict)
            }
            _ => None,
        }
    }

    /// One transition of the pipeline. Final stages map to themselves.
    pub async fn step(&self, stage: Stage, run: &Run<'_>) -> Stage {
        debug!(stage = ?stage, identity_key = %run.item.identity_key, "Pipeline step");
        match stage {
            Stage::Start => self.start(run).await,
            Stage::UrlRuleCheck => self.check_url_rules(run),
            Stage::TempWhitelistCheck => self.check_whitelist(run).await,
            Stage::PermanentBlocklistCheck => self.check_blocklist(run).await,
            Stage::HeuristicCheck => self.check_heuristic(run).await,
            Stage::RemoteGate(Mode::Lenient) => self.remote_lenient(run).await,
            Stage::RemoteGate(Mode::Strict) => self.remote_strict(run).await,
            done @ (Stage::Terminal(_) | Stage::Dropped) => done,
        }
    }

    async fn start(&self, run: &Run<'_>) -> Stage {
        if !run.item.has_identity() {
            warn!(surface = %run.surface, url = %run.item.url, "Content item has no identity key, dropping");
            return Stage::Dropped;
        }

        let classifying = SurfaceState::Classifying {
            identity_key: run.identity_key().to_string(),
            started_at: run.now,
        };
        if let Err(e) = self.store.set_surface_state(run.surface, classifying).await {
            warn!(error = %e, surface = %run.surface, "Failed to record classifying state");
        }
        Stage::UrlRuleCheck
    }

    fn check_url_rules(&self, run: &Run<'_>) -> Stage {
        match url_rules::match_rules(&run.settings.url_rules, &run.item.url) {
            Some(rule) => {
                info!(url = %run.item.url, rule = ?rule, "URL rule matched");
                run.block(rule.reason(), VerdictSource::UrlRule)
            }
            None => Stage::TempWhitelistCheck,
        }
    }

    async fn check_whitelist(&self, run: &Run<'_>) -> Stage {
        if self.is_whitelisted(run.identity_key(), run.now).await {
            info!(identity_key = %run.identity_key(), "Identity temporarily whitelisted");
            return run.allow(
                format!(
                    "{} '{}' was recently manually unblocked.",
                    run.item.source_kind.identity_label(),
                    run.identity_key()
                ),
                VerdictSource::TempWhitelist,
            );
        }
        Stage::PermanentBlocklistCheck
    }

    async fn check_blocklist(&self, run: &Run<'_>) -> Stage {
        match self.store.is_blocked(run.identity_key()).await {
            Ok(true) => {
                info!(identity_key = %run.identity_key(), "Identity on permanent blocklist");
                run.block(
                    format!(
                        "{} '{}' is on your blocklist.",
                        run.item.source_kind.identity_label(),
                        run.identity_key()
                    ),
                    VerdictSource::PermanentBlocklist,
                )
            }
            Ok(false) => Stage::HeuristicCheck,
            Err(e) => {
                warn!(error = %e, "Blocklist lookup failed, continuing as not blocked");
                Stage::HeuristicCheck
            }
        }
    }

    async fn check_heuristic(&self, run: &Run<'_>) -> Stage {
        let remote = Stage::RemoteGate(run.settings.mode);

        let Some(profile) = self.load_profile().await else {
            debug!("No keyword profile, skipping heuristic");
            return remote;
        };

        let outcome = self
            .scorer
            .score(run.item, &profile, run.settings.dominance_ratio);
        info!(
            identity_key = %run.identity_key(),
            decision = ?outcome.decision,
            productive_hits = outcome.productive_hits,
            unwanted_hits = outcome.unwanted_hits,
            "Heuristic scored"
        );

        match outcome.decision {
            HeuristicDecision::Allow => run.allow(outcome.reason, VerdictSource::Heuristic),
            HeuristicDecision::Block => run.block(outcome.reason, VerdictSource::Heuristic),
            HeuristicDecision::Unknown => remote,
        }
    }

    async fn remote_lenient(&self, run: &Run<'_>) -> Stage {
        let instructions = self.load_instructions().await;
        let context = DualListContext {
            productive: &run.settings.productive_content,
            unwanted: &run.settings.unwanted_content,
            instructions: instructions.as_ref(),
        };

        match self.gate.classify_dual(run.item, context).await {
            Some(DualListResult {
                reasoning,
                entertainment: Some(true),
            }) => run.block(reasoning, VerdictSource::RemoteGate),
            Some(DualListResult {
                reasoning,
                entertainment: Some(false),
            }) => run.allow(reasoning, VerdictSource::RemoteGate),
            _ => {
                warn!(identity_key = %run.identity_key(), "Dual-list gate unavailable, allowing by default");
                run.allow(
                    "Remote classification unavailable; allowed by default in lenient mode.",
                    VerdictSource::RemoteGateDefault,
                )
            }
        }
    }

    async fn remote_strict(&self, run: &Run<'_>) -> Stage {
        match self
            .gate
            .classify_strict(run.item, &run.settings.productive_content)
            .await
        {
            Some(result) if result.productive_match => {
                run.allow(result.reasoning, VerdictSource::RemoteGate)
            }
            Some(result) => run.block(result.reasoning, VerdictSource::RemoteGate),
            None => {
                warn!(identity_key = %run.identity_key(), "Strict gate unavailable, blocking by default");
                run.block(
                    "Productive match could not be confirmed; blocked by default in strict mode.",
                    VerdictSource::RemoteGateDefault,
                )
            }
        }
    }

    /// Terminal side effects, in order: learn the block, publish the verdict,
    /// then redirect.
    async fn finish(&self, run: &Run<'_>, verdict: &Verdict) {
        info!(
            surface = %run.surface,
            identity_key = %verdict.identity_key(),
            entertainment = verdict.is_entertainment(),
            source = ?verdict.source(),
            "Verdict reached"
        );

        if verdict.is_entertainment() && verdict.source().learns_block() {
            self.learn_block(verdict.identity_key(), run.now).await;
        }

        self.publish(run.surface, verdict, &run.item.url).await;
    }

    async fn learn_block(&self, identity_key: &str, now: DateTime<Utc>) {
        // A live whitelist entry wins over a block reached on a stale read.
        if self.is_whitelisted(identity_key, now).await {
            info!(identity_key, "Whitelist live, not adding to blocklist");
            return;
        }
        match self.store.add_to_blocklist(identity_key).await {
            Ok(true) => info!(identity_key, "Added to permanent blocklist"),
            Ok(false) => debug!(identity_key, "Already on permanent blocklist"),
            Err(e) => warn!(identity_key, error = %e, "Failed to add to blocklist"),
        }
    }

    /// Write the surface verdict, then redirect if it is a block.
    async fn publish(&self, surface: &SurfaceId, verdict: &Verdict, current_url: &str) {
        let state = SurfaceState::Decided {
            verdict: verdict.clone(),
        };
        if let Err(e) = self.store.set_surface_state(surface, state).await {
            warn!(error = %e, %surface, "Failed to record verdict");
        }

        if !verdict.is_entertainment() || current_url == self.redirect_url {
            return;
        }
        if let Err(e) = self.navigator.redirect(surface, &self.redirect_url).await {
            warn!(error = %e, %surface, "Redirect failed");
        }
    }

    // -----------------------------------------------------------------------
    // Navigation pre-check
    // -----------------------------------------------------------------------

    pub async fn check_navigation(&self, surface: &SurfaceId, url: &str) -> Option<Verdict> {
        self.check_navigation_at(surface, url, Utc::now()).await
    }

    /// Homepage and URL-rule checks on page load, before any content is
    /// scraped. The verdict is keyed by the URL and never touches the
    /// blocklist.
    pub async fn check_navigation_at(
        &self,
        surface: &SurfaceId,
        url: &str,
        now: DateTime<Utc>,
    ) -> Option<Verdict> {
        if url.is_empty() || url == self.redirect_url {
            return None;
        }

        let settings = self.load_settings().await;
        let rule = url_rules::match_homepage(&settings.block_homepages, url)
            .or_else(|| url_rules::match_rules(&settings.url_rules, url))?;

        info!(%surface, url, rule = ?rule, "Navigation blocked");
        let verdict = Verdict::block(url, rule.reason(), VerdictSource::UrlRule, now);
        self.publish(surface, &verdict, url).await;
        Some(verdict)
    }

    // -----------------------------------------------------------------------
    // Results
    // -----------------------------------------------------------------------

    pub async fn get_verdict(&self, surface: &SurfaceId) -> Option<SurfaceState> {
        self.store
            .surface_state(surface)
            .await
            .map_err(|e| warn!(error = %e, %surface, "Failed to read surface state"))
            .ok()
            .flatten()
    }

    // -----------------------------------------------------------------------
    // Administration
    // -----------------------------------------------------------------------

    pub async fn unblock(&self, identity_key: &str) -> Result<bool, FocusError> {
        self.unblock_at(identity_key, Utc::now()).await
    }

    /// Remove from the blocklist and whitelist for the next ten minutes.
    /// Returns whether the key was on the blocklist.
    pub async fn unblock_at(
        &self,
        identity_key: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, FocusError> {
        let key = identity_key.trim();
        if key.is_empty() {
            return Err(FocusError::Validation("identity key is empty".into()));
        }

        // Whitelist first: if the removal then fails, the key is still
        // allowed for the window instead of being neither blocked nor listed.
        self.store.whitelist(key, now).await?;
        let removed = self.store.remove_from_blocklist(key).await?;
        info!(identity_key = key, removed, "Unblocked");
        Ok(removed)
    }

    /// Alias of [`unblock`](Self::unblock) for the blocklist admin surface.
    pub async fn remove(&self, identity_key: &str) -> Result<bool, FocusError> {
        self.unblock(identity_key).await
    }

    pub async fn list_blocked(&self) -> Result<Vec<String>, FocusError> {
        self.store.blocklist().await
    }

    pub async fn settings(&self) -> Result<Settings, FocusError> {
        self.store.settings().await
    }

    pub async fn save_settings(&self, settings: &Settings) -> Result<(), FocusError> {
        self.store.save_settings(settings).await?;
        info!(mode = ?settings.mode, ratio = settings.dominance_ratio.value(), "Settings saved");
        Ok(())
    }

    /// Store new preference text and rebuild the keyword profile and
    /// guidance from it. Returns whether a keyword profile is now available.
    pub async fn update_profile(&self, text: ProfileText) -> Result<bool, FocusError> {
        let mut settings = self.store.settings().await?;
        settings.productive_content = text.productive.clone();
        settings.unwanted_content = text.unwanted.clone();
        self.store.save_settings(&settings).await?;

        let profile = self.expander.expand(&text).await;
        let instructions = self.expander.generate_instructions(&text).await;
        let available = profile.is_some();

        self.store.set_keyword_profile(profile).await?;
        self.store.set_user_instructions(instructions).await?;
        info!(profile_available = available, "Profile updated");
        Ok(available)
    }

    // -----------------------------------------------------------------------
    // Store reads with defaults
    // -----------------------------------------------------------------------

    async fn load_settings(&self) -> Settings {
        self.store.settings().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load settings, using defaults");
            Settings::default()
        })
    }

    async fn load_profile(&self) -> Option<KeywordProfile> {
        self.store
            .keyword_profile()
            .await
            .map_err(|e| warn!(error = %e, "Failed to load keyword profile"))
            .ok()
            .flatten()
            .filter(|p| !p.is_empty())
    }

    async fn load_instructions(&self) -> Option<UserInstructions> {
        self.store
            .user_instructions()
            .await
            .map_err(|e| warn!(error = %e, "Failed to load user instructions"))
            .ok()
            .flatten()
    }

    async fn is_whitelisted(&self, identity_key: &str, now: DateTime<Utc>) -> bool {
        match self.store.whitelisted_at(identity_key).await {
            Ok(Some(at)) => whitelist_is_live(at, now),
            Ok(None) => false,
            Err(e) => {
                warn!(identity_key, error = %e, "Whitelist lookup failed, treating as not whitelisted");
                false
            }
        }
    }
}
