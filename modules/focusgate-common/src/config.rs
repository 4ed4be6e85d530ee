use std::env;
use std::path::PathBuf;

pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_REDIRECT_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
pub const DEFAULT_STORE_PATH: &str = "focusgate-store.json";

/// Application configuration loaded from environment variables.
/// Contains only secrets and deployment values; user preferences live in
/// the stored `Settings`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Remote reasoning service
    pub groq_api_key: Option<String>,
    pub api_base: String,
    pub model: String,

    // Where blocked surfaces are sent
    pub redirect_url: String,

    // File-backed store used by the CLI
    pub store_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            groq_api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            redirect_url: DEFAULT_REDIRECT_URL.to_string(),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

impl AppConfig {
    /// Load configuration from `.env` and the process environment.
    ///
    /// Nothing is required: without `GROQ_API_KEY` the remote stages are
    /// skipped and classification degrades to local checks.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let config = Self {
            groq_api_key: env::var("GROQ_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            api_base: env::var("FOCUSGATE_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            model: env::var("FOCUSGATE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            redirect_url: env::var("FOCUSGATE_REDIRECT_URL")
                .unwrap_or_else(|_| DEFAULT_REDIRECT_URL.to_string()),
            store_path: env::var("FOCUSGATE_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_STORE_PATH)),
        };

        config.log_redacted();
        config
    }

    pub fn has_remote(&self) -> bool {
        self.groq_api_key.is_some()
    }

    /// Log the loaded configuration with secrets shortened.
    pub fn log_redacted(&self) {
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => {
                    let n = v.char_indices().nth(5).map(|(i, _)| i).unwrap_or(v.len());
                    format!("{}...({} chars)", &v[..n], v.len())
                }
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  GROQ_API_KEY: {}", preview_opt(&self.groq_api_key));
        tracing::info!("  FOCUSGATE_API_BASE: {}", self.api_base);
        tracing::info!("  FOCUSGATE_MODEL: {}", self.model);
        tracing::info!("  FOCUSGATE_REDIRECT_URL: {}", self.redirect_url);
        tracing::info!("  FOCUSGATE_STORE_PATH: {}", self.store_path.display());
    }
}
