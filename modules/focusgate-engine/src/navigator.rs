use async_trait::async_trait;
use tracing::debug;

use focusgate_common::SurfaceId;

/// Sends a blocked surface somewhere else. Called only after the surface's
/// verdict has been written.
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn redirect(&self, surface: &SurfaceId, target_url: &str) -> anyhow::Result<()>;
}

/// Navigator for headless use: logs and does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNavigator;

#[async_trait]
impl Navigator for NoopNavigator {
    async fn redirect(&self, surface: &SurfaceId, target_url: &str) -> anyhow::Result<()> {
        debug!(%surface, target_url, "Redirect requested (no navigator attached)");
        Ok(())
    }
}
