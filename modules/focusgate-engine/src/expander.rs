//! Turns the user's free-text preferences into a normalized keyword profile
//! and generated guidance.

use std::sync::Arc;

use tracing::{info, warn};

use focusgate_common::{KeywordProfile, ProfileText, UserInstructions};

use crate::gate::ReasoningGate;

pub struct KeywordExpander {
    gate: Arc<dyn ReasoningGate>,
}

impl KeywordExpander {
    pub fn new(gate: Arc<dyn ReasoningGate>) -> Self {
        Self { gate }
    }

    /// `None` means "no profile available": both lists empty, or the remote
    /// expansion failed. There is never a partial profile.
    pub async fn expand(&self, text: &ProfileText) -> Option<KeywordProfile> {
        let productive = text.productive_terms();
        let unwanted = text.unwanted_terms();
        if productive.is_empty() && unwanted.is_empty() {
            info!("No preference terms, skipping keyword expansion");
            return None;
        }

        let Some(raw) = self.gate.expand_keywords(&productive, &unwanted).await else {
            warn!("Keyword expansion unavailable, no profile built");
            return None;
        };

        let profile =
            KeywordProfile::normalized(&productive, &unwanted, &raw.productive, &raw.unwanted);
        info!(
            productive_terms = profile.productive.len(),
            unwanted_terms = profile.unwanted.len(),
            productive_keywords = profile.productive_keywords().len(),
            unwanted_keywords = profile.unwanted_keywords().len(),
            "Keyword profile built"
        );
        Some(profile)
    }

    pub async fn generate_instructions(&self, text: &ProfileText) -> Option<UserInstructions> {
        if text.is_empty() {
            return None;
        }
        let instructions = self.gate.generate_instructions(text).await;
        if instructions.is_none() {
            warn!("Instruction generation unavailable");
        }
        instructions
    }
}
