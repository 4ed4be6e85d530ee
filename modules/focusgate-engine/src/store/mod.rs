//! Persistent user state: blocklist, temporary whitelist, keyword profile,
//! generated guidance, settings and per-surface results.
//!
//! The engine only sees the `DecisionStore` trait. Two implementations:
//! `MemoryStore` for tests and embedding, `FileStore` for the CLI.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use focusgate_common::{
    FocusError, KeywordProfile, Settings, SurfaceId, SurfaceState, UserInstructions,
};

/// How long a manual unblock suppresses blocking for an identity.
pub const WHITELIST_WINDOW_MINUTES: i64 = 10;

/// Whether a whitelist entry created at `at` still applies at `now`.
pub fn whitelist_is_live(at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - at < Duration::minutes(WHITELIST_WINDOW_MINUTES)
}

/// Surface results older than this are dropped when a `FileStore` opens.
pub const SURFACE_RETENTION_HOURS: i64 = 24;

pub type StoreResult<T> = Result<T, FocusError>;

#[async_trait]
pub trait DecisionStore: Send + Sync {
    // --- Blocklist ---

    /// Blocked identity keys in insertion order.
    async fn blocklist(&self) -> StoreResult<Vec<String>>;
    async fn is_blocked(&self, identity_key: &str) -> StoreResult<bool>;
    /// Add-if-absent. Returns true if the key was newly added.
    async fn add_to_blocklist(&self, identity_key: &str) -> StoreResult<bool>;
    /// Returns true if the key was present.
    async fn remove_from_blocklist(&self, identity_key: &str) -> StoreResult<bool>;

    // --- Temporary whitelist ---

    /// Creation time of the whitelist entry, live or not.
    async fn whitelisted_at(&self, identity_key: &str) -> StoreResult<Option<DateTime<Utc>>>;
    async fn whitelist(&self, identity_key: &str, at: DateTime<Utc>) -> StoreResult<()>;

    // --- Profile ---

    async fn keyword_profile(&self) -> StoreResult<Option<KeywordProfile>>;
    async fn set_keyword_profile(&self, profile: Option<KeywordProfile>) -> StoreResult<()>;
    async fn user_instructions(&self) -> StoreResult<Option<UserInstructions>>;
    async fn set_user_instructions(&self, instructions: Option<UserInstructions>)
        -> StoreResult<()>;

    // --- Settings ---

    async fn settings(&self) -> StoreResult<Settings>;
    async fn save_settings(&self, settings: &Settings) -> StoreResult<()>;

    // --- Surface results ---

    async fn surface_state(&self, surface: &SurfaceId) -> StoreResult<Option<SurfaceState>>;
    async fn set_surface_state(&self, surface: &SurfaceId, state: SurfaceState)
        -> StoreResult<()>;
}

/// Everything a store holds, in the shape `FileStore` writes to disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct StoreState {
    #[serde(default)]
    pub blocklist: Vec<String>,
    #[serde(default)]
    pub temp_whitelist: BTreeMap<String, DateTime<Utc>>,
    #[serde(default)]
    pub keyword_profile: Option<KeywordProfile>,
    #[serde(default)]
    pub user_instructions: Option<UserInstructions>,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub surfaces: BTreeMap<SurfaceId, SurfaceState>,
}

impl StoreState {
    pub fn add_to_blocklist(&mut self, identity_key: &str) -> bool {
        if self.blocklist.iter().any(|k| k == identity_key) {
            return false;
        }
        self.blocklist.push(identity_key.to_string());
        true
    }

    pub fn remove_from_blocklist(&mut self, identity_key: &str) -> bool {
        let before = self.blocklist.len();
        self.blocklist.retain(|k| k != identity_key);
        self.blocklist.len() != before
    }

    /// Drop surface results written before `cutoff`. Returns how many went.
    pub fn prune_surfaces(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.surfaces.len();
        self.surfaces.retain(|_, state| state.updated_at() >= cutoff);
        before - self.surfaces.len()
    }
}
