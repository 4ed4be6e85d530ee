use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use focusgate_common::{
    FocusError, KeywordProfile, Settings, SurfaceId, SurfaceState, UserInstructions,
};

use super::{DecisionStore, StoreResult, StoreState};

/// In-process store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            inner: Mutex::new(StoreState {
                settings,
                ..StoreState::default()
            }),
        }
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, StoreState>> {
        self.inner
            .lock()
            .map_err(|_| FocusError::Storage("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl DecisionStore for MemoryStore {
    async fn blocklist(&self) -> StoreResult<Vec<String>> {
        Ok(self.lock()?.blocklist.clone())
    }

    async fn is_blocked(&self, identity_key: &str) -> StoreResult<bool> {
        Ok(self.lock()?.blocklist.iter().any(|k| k == identity_key))
    }

    async fn add_to_blocklist(&self, identity_key: &str) -> StoreResult<bool> {
        Ok(self.lock()?.add_to_blocklist(identity_key))
    }

    async fn remove_from_blocklist(&self, identity_key: &str) -> StoreResult<bool> {
        Ok(self.lock()?.remove_from_blocklist(identity_key))
    }

    async fn whitelisted_at(&self, identity_key: &str) -> StoreResult<Option<DateTime<Utc>>> {
        Ok(self.lock()?.temp_whitelist.get(identity_key).copied())
    }

    async fn whitelist(&self, identity_key: &str, at: DateTime<Utc>) -> StoreResult<()> {
        self.lock()?
            .temp_whitelist
            .insert(identity_key.to_string(), at);
        Ok(())
    }

    async fn keyword_profile(&self) -> StoreResult<Option<KeywordProfile>> {
        Ok(self.lock()?.keyword_profile.clone())
    }

    async fn set_keyword_profile(&self, profile: Option<KeywordProfile>) -> StoreResult<()> {
        self.lock()?.keyword_profile = profile;
        Ok(())
    }

    async fn user_instructions(&self) -> StoreResult<Option<UserInstructions>> {
        Ok(self.lock()?.user_instructions.clone())
    }

    async fn set_user_instructions(
        &self,
        instructions: Option<UserInstructions>,
    ) -> StoreResult<()> {
        self.lock()?.user_instructions = instructions;
        Ok(())
    }

    async fn settings(&self) -> StoreResult<Settings> {
        Ok(self.lock()?.settings.clone())
    }

    async fn save_settings(&self, settings: &Settings) -> StoreResult<()> {
        self.lock()?.settings = settings.clone();
        Ok(())
    }

    async fn surface_state(&self, surface: &SurfaceId) -> StoreResult<Option<SurfaceState>> {
        Ok(self.lock()?.surfaces.get(surface).cloned())
    }

    async fn set_surface_state(&self, surface: &SurfaceId, state: SurfaceState) -> StoreResult<()> {
        self.lock()?.surfaces.insert(surface.clone(), state);
        Ok(())
    }
}
