
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub openai: OpenAIConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// API key, or a `${VAR}` / `$VAR` reference resolved on every request.
    #[serde(default = "default_api_key")]
    pub api_key: String,

    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Request timeout in seconds. Unset means no timeout beyond the transport default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Ask the Responses API for schema-constrained JSON output.
    #[serde(default)]
    pub structured_output: bool,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: default_api_key(),
            base_url: default_openai_base_url(),
            model: default_model(),
            timeout_secs: None,
            structured_output: false,
        }
    }
}

impl OpenAIConfig {
    /// Resolves the credential. Returns `None` when the key is empty or
    /// references an unset environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        let key = expand_env(self.api_key.trim());
        if key.is_empty() || key.starts_with('$') {
            None
        } else {
            Some(key)
        }
    }

    /// Name used in "not configured" errors: the referenced variable if any.
    pub fn credential_name(&self) -> String {
        env_reference(self.api_key.trim())
            .map(str::to_string)
            .unwrap_or_else(|| "OpenAI API key".to_string())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum image lookups in flight at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Pause after the term list is published, before lookups start
    #[serde(default = "default_terms_pause_ms")]
    pub terms_pause_ms: u64,

    /// Pause while the collage stage is active
    #[serde(default = "default_collage_pause_ms")]
    pub collage_pause_ms: u64,

    /// Pause before final results are delivered
    #[serde(default = "default_finalize_pause_ms")]
    pub finalize_pause_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            terms_pause_ms: default_terms_pause_ms(),
            collage_pause_ms: default_collage_pause_ms(),
            finalize_pause_ms: default_finalize_pause_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// "pretty" (default) or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_api_key() -> String {
    "${OPENAI_API_KEY}".to_string()
}
fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_model() -> String {
    "gpt-5".to_string()
}
fn default_bind() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    31337
}
fn default_max_concurrency() -> usize {
    6
}
fn default_terms_pause_ms() -> u64 {
    500
}
fn default_collage_pause_ms() -> u64 {
    300
}
fn default_finalize_pause_ms() -> u64 {
    500
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

impl Config {
    /// Loads the config from `path`, or from the default location when `None`.
    /// A missing default config is created from the template.
    pub fn load_from(path: Option<&str>) -> Result<Self> {
        let path = match path {
            Some(p) => PathBuf::from(shellexpand::tilde(p).to_string()),
            None => Self::config_path()?,
        };

        if !path.exists() {
            let config = Config::default();
            config.save_with_template(&path)?;
            return Ok(config);
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        config
            .validate()
            .context("Configuration validation failed")?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.openai.base_url.trim().is_empty() {
            anyhow::bail!("openai.base_url cannot be empty");
        }
        if self.openai.model.trim().is_empty() {
            anyhow::bail!("openai.model cannot be empty");
        }
        if self.search.max_concurrency == 0 {
            anyhow::bail!("search.max_concurrency must be at least 1");
        }
        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            other => anyhow::bail!(
                "Unknown logging.format '{}'. Expected \"pretty\" or \"json\"",
                other
            ),
        }

        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;

        Ok(())
    }

    /// Save config with a helpful template (for first-time setup)
    pub fn save_with_template(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, DEFAULT_CONFIG_TEMPLATE)?;
        eprintln!("Created default config at {}", path.display());

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let base = directories::BaseDirs::new()
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;

        Ok(base.home_dir().join(".refmonster").join("config.toml"))
    }

    pub fn get_value(&self, key: &str) -> Result<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["openai", "api_key"] => Ok(self.openai.api_key.clone()),
            ["openai", "base_url"] => Ok(self.openai.base_url.clone()),
            ["openai", "model"] => Ok(self.openai.model.clone()),
            ["openai", "timeout_secs"] => Ok(self
                .openai
                .timeout_secs
                .map(|t| t.to_string())
                .unwrap_or_default()),
            ["openai", "structured_output"] => Ok(self.openai.structured_output.to_string()),
            ["server", "bind"] => Ok(self.server.bind.clone()),
            ["server", "port"] => Ok(self.server.port.to_string()),
            ["search", "max_concurrency"] => Ok(self.search.max_concurrency.to_string()),
            ["search", "terms_pause_ms"] => Ok(self.search.terms_pause_ms.to_string()),
            ["search", "collage_pause_ms"] => Ok(self.search.collage_pause_ms.to_string()),
            ["search", "finalize_pause_ms"] => Ok(self.search.finalize_pause_ms.to_string()),
            ["logging", "level"] => Ok(self.logging.level.clone()),
            ["logging", "format"] => Ok(self.logging.format.clone()),
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["openai", "api_key"] => self.openai.api_key = value.to_string(),
            ["openai", "base_url"] => self.openai.base_url = value.to_string(),
            ["openai", "model"] => self.openai.model = value.to_string(),
            ["openai", "timeout_secs"] => {
                self.openai.timeout_secs = if value.is_empty() {
                    None
                } else {
                    Some(value.parse()?)
                }
            }
            ["openai", "structured_output"] => self.openai.structured_output = value.parse()?,
            ["server", "bind"] => self.server.bind = value.to_string(),
            ["server", "port"] => self.server.port = value.parse()?,
            ["search", "max_concurrency"] => self.search.max_concurrency = value.parse()?,
            ["search", "terms_pause_ms"] => self.search.terms_pause_ms = value.parse()?,
            ["search", "collage_pause_ms"] => self.search.collage_pause_ms = value.parse()?,
            ["search", "finalize_pause_ms"] => self.search.finalize_pause_ms = value.parse()?,
            ["logging", "level"] => self.logging.level = value.to_string(),
            ["logging", "format"] => self.logging.format = value.to_string(),
            _ => anyhow::bail!("Unknown config key: {}", key),
        }

        Ok(())
    }
}

fn env_reference(s: &str) -> Option<&str> {
    s.strip_prefix("${")
        .and_then(|s| s.strip_suffix('}'))
        .or_else(|| s.strip_prefix('$'))
}

fn expand_env(s: &str) -> String {
    match env_reference(s) {
        Some(var_name) => std::env::var(var_name).unwrap_or_else(|_| s.to_string()),
        None => s.to_string(),
    }
}

/// Default config template with helpful comments (used for first-time setup)
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# RefMonster Configuration
# Auto-created on first run. Edit as needed.

[openai]
# Literal key or an environment reference, resolved on every request
api_key = "${OPENAI_API_KEY}"
base_url = "https://api.openai.com/v1"
model = "gpt-5"
# timeout_secs = 120
# Request schema-constrained JSON output from the Responses API
structured_output = false

[server]
bind = "127.0.0.1"
port = 31337

[search]
# Maximum image lookups in flight at once
max_concurrency = 6
terms_pause_ms = 500
collage_pause_ms = 300
finalize_pause_ms = 500

[logging]
level = "info"
# "pretty" or "json"
format = "pretty"
"#;
