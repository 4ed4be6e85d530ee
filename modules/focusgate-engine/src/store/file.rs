use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};

use focusgate_common::{
    FocusError, KeywordProfile, Settings, SurfaceId, SurfaceState, UserInstructions,
};

use super::{DecisionStore, StoreResult, StoreState, SURFACE_RETENTION_HOURS};

/// JSON-file store. The whole state is loaded on open and rewritten after
/// every mutation (temp file, then rename). Surface results older than
/// [`SURFACE_RETENTION_HOURS`] are dropped on open.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    state: Mutex<StoreState>,
}

impl FileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut state: StoreState = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "No store file yet, starting empty");
                StoreState::default()
            }
            Err(e) => {
                return Err(FocusError::Storage(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            }
        };

        let cutoff = Utc::now() - Duration::hours(SURFACE_RETENTION_HOURS);
        let pruned = state.prune_surfaces(cutoff);
        if pruned > 0 {
            info!(pruned, "Dropped stale surface results");
        }

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, state: &StoreState) -> StoreResult<()> {
        let json = serde_json::to_vec_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| FocusError::Storage(format!("failed to write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            FocusError::Storage(format!("failed to replace {}: {e}", self.path.display()))
        })?;
        debug!(path = %self.path.display(), "Store persisted");
        Ok(())
    }

    /// Apply `f` to a copy of the state under the lock, write the copy to
    /// disk, and only then make it current. A failed write leaves the
    /// in-memory state untouched.
    async fn mutate<T: Send>(&self, f: impl FnOnce(&mut StoreState) -> T + Send) -> StoreResult<T> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let out = f(&mut next);
        self.persist(&next).await?;
        *state = next;
        Ok(out)
    }
}

#[async_trait]
impl DecisionStore for FileStore {
    async fn blocklist(&self) -> StoreResult<Vec<String>> {
        Ok(self.state.lock().await.blocklist.clone())
    }

    async fn is_blocked(&self, identity_key: &str) -> StoreResult<bool> {
        Ok(self
            .state
            .lock()
            .await
            .blocklist
            .iter()
            .any(|k| k == identity_key))
    }

    async fn add_to_blocklist(&self, identity_key: &str) -> StoreResult<bool> {
        self.mutate(|s| s.add_to_blocklist(identity_key)).await
    }

    async fn remove_from_blocklist(&self, identity_key: &str) -> StoreResult<bool> {
        self.mutate(|s| s.remove_from_blocklist(identity_key)).await
    }

    async fn whitelisted_at(&self, identity_key: &str) -> StoreResult<Option<DateTime<Utc>>> {
        Ok(self.state.lock().await.temp_whitelist.get(identity_key).copied())
    }

    async fn whitelist(&self, identity_key: &str, at: DateTime<Utc>) -> StoreResult<()> {
        self.mutate(|s| {
            s.temp_whitelist.insert(identity_key.to_string(), at);
        })
        .await
    }

    async fn keyword_profile(&self) -> StoreResult<Option<KeywordProfile>> {
        Ok(self.state.lock().await.keyword_profile.clone())
    }

    async fn set_keyword_profile(&self, profile: Option<KeywordProfile>) -> StoreResult<()> {
        self.mutate(|s| s.keyword_profile = profile).await
    }

    async fn user_instructions(&self) -> StoreResult<Option<UserInstructions>> {
        Ok(self.state.lock().await.user_instructions.clone())
    }

    async fn set_user_instructions(
        &self,
        instructions: Option<UserInstructions>,
    ) -> StoreResult<()> {
        self.mutate(|s| s.user_instructions = instructions).await
    }

    async fn settings(&self) -> StoreResult<Settings> {
        Ok(self.state.lock().await.settings.clone())
    }

    async fn save_settings(&self, settings: &Settings) -> StoreResult<()> {
        let settings = settings.clone();
        self.mutate(|s| s.settings = settings).await
    }

    async fn surface_state(&self, surface: &SurfaceId) -> StoreResult<Option<SurfaceState>> {
        Ok(self.state.lock().await.surfaces.get(surface).cloned())
    }

    async fn set_surface_state(&self, surface: &SurfaceId, state: SurfaceState) -> StoreResult<()> {
        let surface = surface.clone();
        self.mutate(|s| {
            s.surfaces.insert(surface, state);
        })
        .await
    }
}
