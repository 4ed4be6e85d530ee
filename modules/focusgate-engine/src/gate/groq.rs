use async_trait::async_trait;
use tracing::{debug, info, warn};

use ai_client::{OpenAi, PromptBuilder};
use focusgate_common::{AppConfig, ContentItem, ProfileText, UserInstructions};

use super::prompts;
use super::{
    parse_dual_list, parse_instructions, parse_keyword_maps, parse_strict, DualListContext,
    DualListResult, RawKeywordMaps, ReasoningGate, StrictResult,
};

/// `ReasoningGate` backed by an OpenAI-compatible chat endpoint (Groq by default).
///
/// Built without an API key it is inert: every call logs and returns `None`.
#[derive(Clone)]
pub struct GroqGate {
    agent: Option<OpenAi>,
}

impl GroqGate {
    pub fn new(config: &AppConfig) -> Self {
        let agent = config
            .groq_api_key
            .as_deref()
            .map(|key| OpenAi::new(key, &config.model).with_base_url(&config.api_base));
        Self { agent }
    }

    pub fn from_agent(agent: OpenAi) -> Self {
        Self { agent: Some(agent) }
    }

    pub fn is_configured(&self) -> bool {
        self.agent.is_some()
    }

    fn agent(&self, call: &str) -> Option<&OpenAi> {
        if self.agent.is_none() {
            info!(call, "API key not set, skipping remote call");
        }
        self.agent.as_ref()
    }
}

#[async_trait]
impl ReasoningGate for GroqGate {
    async fn expand_keywords(
        &self,
        productive_terms: &[String],
        unwanted_terms: &[String],
    ) -> Option<RawKeywordMaps> {
        let agent = self.agent("expand_keywords")?;
        info!(
            productive_terms = productive_terms.len(),
            unwanted_terms = unwanted_terms.len(),
            "Requesting keyword expansion"
        );

        let raw = agent
            .prompt(prompts::keyword_expansion_prompt(productive_terms, unwanted_terms))
            .temperature(0.2)
            .max_tokens(1000)
            .top_p(1.0)
            .send()
            .await
            .map_err(|e| warn!(error = %e, "Keyword expansion call failed"))
            .ok()?;

        parse_keyword_maps(&raw)
    }

    async fn generate_instructions(&self, profile: &ProfileText) -> Option<UserInstructions> {
        let agent = self.agent("generate_instructions")?;

        let raw = agent
            .prompt(prompts::instructions_prompt(profile))
            .temperature(0.2)
            .max_tokens(250)
            .top_p(1.0)
            .json_object()
            .send()
            .await
            .map_err(|e| warn!(error = %e, "Instruction generation call failed"))
            .ok()?;

        parse_instructions(&raw)
    }

    async fn classify_dual(
        &self,
        item: &ContentItem,
        context: DualListContext<'_>,
    ) -> Option<DualListResult> {
        let agent = self.agent("classify_dual")?;
        debug!(identity_key = %item.identity_key, "Sending dual-list classification");

        let prompt = prompts::dual_list_prompt(
            item,
            context.productive,
            context.unwanted,
            context.instructions,
        );
        let raw = agent
            .prompt(prompt)
            .temperature(0.1)
            .max_tokens(1000)
            .top_p(1.0)
            .send()
            .await
            .map_err(|e| warn!(error = %e, "Dual-list classification call failed"))
            .ok()?;

        parse_dual_list(&raw)
    }

    async fn classify_strict(&self, item: &ContentItem, productive: &str) -> Option<StrictResult> {
        let agent = self.agent("classify_strict")?;
        if productive.trim().is_empty() {
            info!("No productive content configured, skipping strict gate");
            return None;
        }
        debug!(identity_key = %item.identity_key, "Sending strict productive-only gate");

        let raw = agent
            .prompt(prompts::strict_gate_prompt(item, productive))
            .temperature(0.1)
            .max_tokens(400)
            .top_p(1.0)
            .send()
            .await
            .map_err(|e| warn!(error = %e, "Strict gate call failed"))
            .ok()?;

        parse_strict(&raw)
    }
}
