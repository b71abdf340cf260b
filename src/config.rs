//! Configuration for snapdex.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (SNAPDEX_HOME, SNAPDEX_DB, SNAPDEX_VOICE_TIMEOUT_MS)
//! 2. Config file (.snapdex/config.yaml)
//! 3. Defaults (~/.snapdex)
//!
//! Provider credentials are only ever read from the environment.
//!
//! Config file discovery:
//! - Searches current directory and parents for .snapdex/config.yaml
//! - Paths in config file are relative to the .snapdex/ directory

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Default speech budget, well under a serverless request ceiling
pub const DEFAULT_VOICE_TIMEOUT_MS: u64 = 4500;

/// Default speech model token
pub const DEFAULT_VOICE_MODEL: &str = "weight_dh8zry5bgkfm0z6nv3anqa9y5";

pub const DEFAULT_VISION_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";
pub const DEFAULT_MODEL_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub models: Option<ModelsConfig>,
    #[serde(default)]
    pub voice: Option<VoiceConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .snapdex/)
    pub home: Option<String>,
    /// SQLite database file (relative to .snapdex/)
    pub database: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    pub vision: Option<String>,
    pub text: Option<String>,
    pub embedding: Option<String>,
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoiceConfig {
    pub timeout_ms: Option<u64>,
    pub model_token: Option<String>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// State directory
    pub home: PathBuf,
    /// Document store location
    pub database: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub models: ModelSettings,
    pub voice: VoiceSettings,
    pub credentials: Credentials,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSettings {
    /// Model used for image description
    pub vision: String,
    /// Model used for structured attributes
    pub text: String,
    pub embedding: String,
    pub api_base: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            vision: DEFAULT_VISION_MODEL.to_string(),
            text: DEFAULT_VISION_MODEL.to_string(),
            embedding: DEFAULT_EMBEDDING_MODEL.to_string(),
            api_base: DEFAULT_MODEL_API_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceSettings {
    pub timeout_ms: u64,
    pub model_token: String,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_VOICE_TIMEOUT_MS,
            model_token: DEFAULT_VOICE_MODEL.to_string(),
        }
    }
}

impl VoiceSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Provider credentials, all sourced from the environment
#[derive(Clone, Default)]
pub struct Credentials {
    pub gemini_api_key: Option<String>,
    pub cloudinary: Option<CloudinaryCredentials>,
    pub fakeyou: Option<FakeYouCredentials>,
}

#[derive(Clone)]
pub struct CloudinaryCredentials {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Clone)]
pub struct FakeYouCredentials {
    pub username_or_email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn set(present: bool) -> &'static str {
            if present {
                "<set>"
            } else {
                "<unset>"
            }
        }
        f.debug_struct("Credentials")
            .field("gemini_api_key", &set(self.gemini_api_key.is_some()))
            .field("cloudinary", &set(self.cloudinary.is_some()))
            .field("fakeyou", &set(self.fakeyou.is_some()))
            .finish()
    }
}

impl Credentials {
    /// Read credentials through an environment lookup
    fn from_env(env: &impl Fn(&str) -> Option<String>) -> Self {
        let cloudinary = match (
            env("CLOUDINARY_NAME"),
            env("CLOUDINARY_KEY"),
            env("CLOUDINARY_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryCredentials {
                cloud_name,
                api_key,
                api_secret,
            }),
            _ => None,
        };

        let fakeyou = match (env("FAKEYOU_EMAIL"), env("FAKEYOU_PASSWORD")) {
            (Some(username_or_email), Some(password)) => Some(FakeYouCredentials {
                username_or_email,
                password,
            }),
            _ => None,
        };

        Self {
            gemini_api_key: env("GEMINI_API_KEY"),
            cloudinary,
            fakeyou,
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".snapdex").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Merge file settings, environment and defaults
fn resolve_config(
    config: Option<(PathBuf, ConfigFile)>,
    env: impl Fn(&str) -> Option<String>,
    default_home: PathBuf,
) -> ResolvedConfig {
    let (config_file, file) = match config {
        Some((path, file)) => (Some(path), Some(file)),
        None => (None, None),
    };
    let config_dir = config_file
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf);

    let home = if let Some(env_home) = env("SNAPDEX_HOME") {
        PathBuf::from(env_home)
    } else if let (Some(dir), Some(home)) = (
        config_dir.as_deref(),
        file.as_ref().and_then(|f| f.paths.home.as_deref()),
    ) {
        resolve_path(dir, home)
    } else {
        default_home
    };

    let database = if let Some(env_db) = env("SNAPDEX_DB") {
        PathBuf::from(env_db)
    } else if let (Some(dir), Some(db)) = (
        config_dir.as_deref(),
        file.as_ref().and_then(|f| f.paths.database.as_deref()),
    ) {
        resolve_path(dir, db)
    } else {
        home.join("snapdex.db")
    };

    let mut models = ModelSettings::default();
    if let Some(m) = file.as_ref().and_then(|f| f.models.as_ref()) {
        if let Some(ref vision) = m.vision {
            models.vision = vision.clone();
        }
        if let Some(ref text) = m.text {
            models.text = text.clone();
        }
        if let Some(ref embedding) = m.embedding {
            models.embedding = embedding.clone();
        }
        if let Some(ref api_base) = m.api_base {
            models.api_base = api_base.trim_end_matches('/').to_string();
        }
    }

    let mut voice = VoiceSettings::default();
    if let Some(v) = file.as_ref().and_then(|f| f.voice.as_ref()) {
        if let Some(timeout_ms) = v.timeout_ms {
            voice.timeout_ms = timeout_ms;
        }
        if let Some(ref model_token) = v.model_token {
            voice.model_token = model_token.clone();
        }
    }
    if let Some(timeout_ms) = env("SNAPDEX_VOICE_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
        voice.timeout_ms = timeout_ms;
    }

    let credentials = Credentials::from_env(&env);

    ResolvedConfig {
        home,
        database,
        config_file,
        models,
        voice,
        credentials,
    }
}

/// Load configuration from all sources
pub fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".snapdex");

    let config = match find_config_file() {
        Some(path) => {
            let file = load_config_file(&path)?;
            Some((path, file))
        }
        None => None,
    };

    Ok(resolve_config(
        config,
        |key| std::env::var(key).ok().filter(|v| !v.is_empty()),
        default_home,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::TempDir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_file() {
        let config = resolve_config(None, env_from(&[]), PathBuf::from("/home/u/.snapdex"));

        assert_eq!(config.home, PathBuf::from("/home/u/.snapdex"));
        assert_eq!(config.database, PathBuf::from("/home/u/.snapdex/snapdex.db"));
        assert!(config.config_file.is_none());
        assert_eq!(config.models, ModelSettings::default());
        assert_eq!(config.voice.timeout(), Duration::from_millis(4500));
        assert!(config.credentials.gemini_api_key.is_none());
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let dot_dir = temp.path().join(".snapdex");
        std::fs::create_dir_all(&dot_dir).unwrap();

        let config_path = dot_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
paths:
  database: ./dex.db
models:
  embedding: text-embedding-005
voice:
  timeout_ms: 3000
"#
        )
        .unwrap();

        let parsed = load_config_file(&config_path).unwrap();
        assert_eq!(parsed.version, "1.0");
        assert_eq!(parsed.paths.database, Some("./dex.db".to_string()));

        let config = resolve_config(
            Some((config_path.clone(), parsed)),
            env_from(&[]),
            PathBuf::from("/unused"),
        );
        assert_eq!(config.database, dot_dir.join("./dex.db"));
        assert_eq!(config.models.embedding, "text-embedding-005");
        assert_eq!(config.models.vision, DEFAULT_VISION_MODEL);
        assert_eq!(config.voice.timeout_ms, 3000);
        assert_eq!(config.config_file, Some(config_path));
    }

    #[test]
    fn test_env_overrides_file() {
        let file: ConfigFile = serde_yaml::from_str(
            "version: \"1.0\"\npaths:\n  home: /from/file\nvoice:\n  timeout_ms: 3000\n",
        )
        .unwrap();

        let config = resolve_config(
            Some((PathBuf::from("/proj/.snapdex/config.yaml"), file)),
            env_from(&[
                ("SNAPDEX_HOME", "/from/env"),
                ("SNAPDEX_VOICE_TIMEOUT_MS", "1200"),
            ]),
            PathBuf::from("/unused"),
        );

        assert_eq!(config.home, PathBuf::from("/from/env"));
        assert_eq!(config.database, PathBuf::from("/from/env/snapdex.db"));
        assert_eq!(config.voice.timeout_ms, 1200);
    }

    #[test]
    fn test_credentials_need_every_part() {
        let config = resolve_config(
            None,
            env_from(&[
                ("GEMINI_API_KEY", "g-key"),
                ("CLOUDINARY_NAME", "demo"),
                ("CLOUDINARY_KEY", "123"),
                ("FAKEYOU_EMAIL", "a@b.c"),
                ("FAKEYOU_PASSWORD", "pw"),
            ]),
            PathBuf::from("/h"),
        );

        assert_eq!(config.credentials.gemini_api_key.as_deref(), Some("g-key"));
        assert!(config.credentials.cloudinary.is_none());
        assert!(config.credentials.fakeyou.is_some());

        let debug = format!("{:?}", config.credentials);
        assert!(!debug.contains("g-key"));
        assert!(debug.contains("<unset>"));
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
        assert_eq!(
            resolve_path(&base, "./subdir"),
            PathBuf::from("/home/user/project/./subdir")
        );
    }
}
