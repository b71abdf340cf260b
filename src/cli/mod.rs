//! Command-line interface for snapdex.
//!
//! Provides commands for capturing images into entries, refreshing voice
//! status, listing stored entries, managing owners, and checking providers.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::info;

use crate::adapters::{GeminiClient, Providers};
use crate::config::{self, ResolvedConfig};
use crate::core::{check_providers, Orchestrator, VoiceStatusRefresher, VoiceSynthesizer};
use crate::domain::{
    mime_type_for_extension, Capture, CreateEntryRequest, VoiceStatus, VoiceStatusRequest,
};
use crate::store::{DocumentStore, SqliteStore};

pub mod owner;

/// snapdex - turn photos into catalog entries
#[derive(Parser, Debug)]
#[command(name = "snapdex")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an entry from an image file
    Capture {
        /// Image file, or a text file holding a data URI
        image: PathBuf,

        /// Identity-token subject of the owner (anonymous if omitted)
        #[arg(short, long, env = "SNAPDEX_OWNER")]
        owner: Option<String>,
    },

    /// Refresh the voice fields of an entry
    VoiceStatus {
        /// JSON file with `{"capture": ...}` or a bare entry ("-" for stdin)
        input: String,
    },

    /// List stored entries, newest first
    Entries {
        /// Maximum number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Manage owners
    Owner {
        #[command(subcommand)]
        command: owner::OwnerCommands,
    },

    /// Check connectivity to every provider
    Check,

    /// List the generative models available to the configured key
    Models,

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let config = config::load_config()?;

        match self.command {
            Commands::Capture { image, owner } => capture(&config, &image, owner.as_deref()).await,
            Commands::VoiceStatus { input } => voice_status(&config, &input).await,
            Commands::Entries { limit } => list_entries(&config, limit).await,
            Commands::Owner { command } => owner::execute(&config, command).await,
            Commands::Check => check(&config).await,
            Commands::Models => list_models(&config).await,
            Commands::Config => show_config(&config),
        }
    }
}

/// Open the configured document store
fn open_store(config: &ResolvedConfig) -> Result<Arc<SqliteStore>> {
    let store = SqliteStore::open(&config.database).with_context(|| {
        format!(
            "Failed to open document store at {}",
            config.database.display()
        )
    })?;
    Ok(Arc::new(store))
}

/// Read an image file into a capture
fn read_capture(path: &Path) -> Result<Capture> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read image: {}", path.display()))?;

    // Allow passing a data URI saved as text
    if bytes.starts_with(b"data:") {
        let uri = String::from_utf8(bytes).context("Data URI file is not valid UTF-8")?;
        return Ok(Capture::new(uri.trim()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    Ok(Capture::from_bytes(mime_type_for_extension(extension), &bytes))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn capture(config: &ResolvedConfig, image: &Path, owner: Option<&str>) -> Result<()> {
    let request = CreateEntryRequest {
        capture: read_capture(image)?,
    };

    let providers = Providers::from_config(config)?;
    let store: Arc<dyn DocumentStore> = open_store(config)?;
    let orchestrator = Orchestrator::new(&providers, store, config.voice.timeout());

    info!(image = %image.display(), "Creating entry");
    let response = orchestrator.create_entry(&request, owner).await;
    print_json(&response)?;

    if !response.success {
        anyhow::bail!("Entry creation failed (status {})", response.status_code());
    }
    Ok(())
}

async fn voice_status(config: &ResolvedConfig, input: &str) -> Result<()> {
    let raw = if input == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(input).with_context(|| format!("Failed to read {}", input))?
    };

    let value: Value = serde_json::from_str(&raw).context("Input is not valid JSON")?;
    let request = if value.get("capture").is_some() {
        serde_json::from_value::<VoiceStatusRequest>(value)?
    } else {
        VoiceStatusRequest { capture: value }
    };

    let providers = Providers::from_config(config)?;
    let store: Arc<dyn DocumentStore> = open_store(config)?;
    let refresher = VoiceStatusRefresher::new(
        VoiceSynthesizer::new(Arc::clone(&providers.speech), config.voice.timeout()),
        Arc::clone(&providers.speech),
        store,
    );

    print_json(&refresher.handle(request).await)
}

async fn list_entries(config: &ResolvedConfig, limit: usize) -> Result<()> {
    let store = open_store(config)?;
    let entries = store.list_entries(limit).await?;

    if entries.is_empty() {
        println!("No entries found");
        return Ok(());
    }

    println!(
        "{:<6} {:<28} {:<12} {:<16} {:<10}",
        "NO", "OBJECT", "TYPE", "OWNER", "VOICE"
    );
    println!("{}", "-".repeat(76));

    for entry in entries {
        let voice = entry
            .voice_status
            .map(VoiceStatus::as_str)
            .unwrap_or("-");
        println!(
            "{:<6} {:<28} {:<12} {:<16} {:<10}",
            entry.no.map(|n| n.to_string()).unwrap_or_default(),
            entry.object(),
            entry.attributes.kind,
            entry.user_name.as_deref().unwrap_or("anonymous"),
            voice
        );
    }

    Ok(())
}

async fn check(config: &ResolvedConfig) -> Result<()> {
    let providers = Providers::from_config(config)?;
    let store: Arc<dyn DocumentStore> = open_store(config)?;

    let report = check_providers(&providers, store).await;
    print_json(&report)?;

    if !report.all_ok() {
        anyhow::bail!("One or more providers are unreachable");
    }
    Ok(())
}

async fn list_models(config: &ResolvedConfig) -> Result<()> {
    let api_key = config
        .credentials
        .gemini_api_key
        .clone()
        .context("GEMINI_API_KEY environment variable required")?;

    let client = GeminiClient::with_client(
        reqwest::Client::new(),
        api_key,
        config.models.vision.clone(),
        config.models.api_base.clone(),
    );
    let listing = client.list_models().await?;

    let names: Vec<&str> = listing
        .get("models")
        .and_then(Value::as_array)
        .map(|models| {
            models
                .iter()
                .filter_map(|m| m.get("name").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    if names.is_empty() {
        println!("No models returned");
    }
    for name in names {
        println!("{}", name.trim_start_matches("models/"));
    }
    Ok(())
}

fn show_config(config: &ResolvedConfig) -> Result<()> {
    println!("snapdex configuration");
    println!();
    println!(
        "Config file: {}",
        config
            .config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:     {}", config.home.display());
    println!("  Database: {}", config.database.display());
    println!();
    println!("Models:");
    println!("  Vision:    {}", config.models.vision);
    println!("  Text:      {}", config.models.text);
    println!("  Embedding: {}", config.models.embedding);
    println!("  API base:  {}", config.models.api_base);
    println!();
    println!("Voice:");
    println!("  Timeout:     {}ms", config.voice.timeout_ms);
    println!("  Model token: {}", config.voice.model_token);
    println!();
    println!("Credentials: {:?}", config.credentials);

    Ok(())
}
