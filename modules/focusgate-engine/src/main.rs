use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use focusgate_common::{AppConfig, ContentItem, ProfileText, Settings, SurfaceId};
use focusgate_engine::{DecisionEngine, EngineDeps, FileStore, GroqGate, Navigator};

#[derive(Parser)]
#[command(name = "focusgate", about = "Classify pages as productive or entertainment")]
struct Cli {
    /// Store file (overrides FOCUSGATE_STORE_PATH)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify a content item (JSON) from a file or stdin
    Classify {
        #[arg(long)]
        surface: String,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Run the page-load checks (homepages, URL rules) for a URL
    Navigate {
        #[arg(long)]
        surface: String,
        url: String,
    },
    /// Store preference text and rebuild the keyword profile
    Profile {
        #[arg(long, default_value = "")]
        productive: String,
        #[arg(long, default_value = "")]
        unwanted: String,
    },
    /// Remove from the blocklist and whitelist for ten minutes
    Unblock { identity_key: String },
    /// Same as unblock
    Remove { identity_key: String },
    /// List permanently blocked identities
    Blocked,
    /// Show or replace settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Show the stored state for a surface
    Status {
        #[arg(long)]
        surface: String,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    Load { file: PathBuf },
}

/// Prints redirects instead of driving a browser.
struct PrintNavigator;

#[async_trait]
impl Navigator for PrintNavigator {
    async fn redirect(&self, surface: &SurfaceId, target_url: &str) -> Result<()> {
        println!("redirect {surface} -> {target_url}");
        Ok(())
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_item(file: Option<&PathBuf>) -> Result<ContentItem> {
    let raw = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    serde_json::from_str(&raw).context("Content item is not valid JSON")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays parseable
    let filter = EnvFilter::from_default_env()
        .add_directive("focusgate=info".parse()?)
        .add_directive("ai_client=info".parse()?);
    if cli.json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let config = AppConfig::from_env();
    let store_path = cli.store.clone().unwrap_or_else(|| config.store_path.clone());
    let store = Arc::new(FileStore::open(&store_path).await?);
    info!(path = %store_path.display(), "Store opened");

    let engine = DecisionEngine::new(
        EngineDeps::builder()
            .store(store)
            .gate(Arc::new(GroqGate::new(&config)))
            .navigator(Arc::new(PrintNavigator))
            .redirect_url(config.redirect_url.clone())
            .build(),
    );

    match cli.command {
        Command::Classify { surface, file } => {
            let item = read_item(file.as_ref())?;
            match engine.classify(&SurfaceId::new(surface), &item).await {
                Some(verdict) => print_json(&verdict)?,
                None => println!("no verdict"),
            }
        }
        Command::Navigate { surface, url } => {
            match engine.check_navigation(&SurfaceId::new(surface), &url).await {
                Some(verdict) => print_json(&verdict)?,
                None => println!("allowed"),
            }
        }
        Command::Profile {
            productive,
            unwanted,
        } => {
            let available = engine
                .update_profile(ProfileText::new(productive, unwanted))
                .await?;
            if available {
                println!("keyword profile updated");
            } else {
                println!("no keyword profile available");
            }
        }
        Command::Unblock { identity_key } | Command::Remove { identity_key } => {
            let was_blocked = engine.unblock(&identity_key).await?;
            if was_blocked {
                println!("unblocked {identity_key}");
            } else {
                println!("{identity_key} was not blocked; whitelisted for 10 minutes");
            }
        }
        Command::Blocked => {
            for key in engine.list_blocked().await? {
                println!("{key}");
            }
        }
        Command::Settings { action } => match action {
            SettingsAction::Show => print_json(&engine.settings().await?)?,
            SettingsAction::Load { file } => {
                let raw = std::fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                let settings: Settings =
                    serde_json::from_str(&raw).context("Settings file is not valid JSON")?;
                engine.save_settings(&settings).await?;
                print_json(&settings)?;
            }
        },
        Command::Status { surface } => match engine.get_verdict(&SurfaceId::new(surface)).await {
            Some(state) => print_json(&state)?,
            None => println!("no verdict"),
        },
    }

    Ok(())
}
