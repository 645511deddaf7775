use crate::errors::{AppError, AppResult, ErrorContextExt};
use crate::slack::client::DEFAULT_API_BASE_URL;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Main configuration structure for the alert-slack service
///
/// Contains the Slack connection settings, the message layout options used
/// when composing notifications, the callback server settings and logging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub slack: SlackConfig,
    #[serde(default)]
    pub message: MessageConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where and as whom messages are delivered
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    pub webhook_url: Option<String>,
    pub token: Option<String>,
    pub proxy_address: Option<String>,
    pub api_base_url: String,
    pub channel: String,
    pub user_name: String,
    pub message_icon: String,
    pub link_names: bool,
    pub notify_users: String,
    pub timeout_secs: Option<u64>,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            token: None,
            proxy_address: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            channel: "#channel".to_string(),
            user_name: "Graylog".to_string(),
            message_icon: String::new(),
            link_names: true,
            notify_users: String::new(),
            timeout_secs: None,
        }
    }
}

impl SlackConfig {
    pub fn has_token(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

/// How backlog entries are laid out as attachments
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageConfig {
    pub color: String,
    pub backlog_items: usize,
    pub short_mode: bool,
    /// Comma separated list of field names or templates
    pub fields: String,
    pub footer_text: String,
    pub footer_icon_url: String,
    pub footer_ts_field: String,
    pub graylog_url: String,
    pub acknowledge: bool,
    pub preformat: bool,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            color: "#FF0000".to_string(),
            backlog_items: 1,
            short_mode: true,
            fields: String::new(),
            footer_text: "{{source}}".to_string(),
            footer_icon_url: String::new(),
            footer_ts_field: "timestamp".to_string(),
            graylog_url: String::new(),
            acknowledge: false,
            preformat: false,
        }
    }
}

impl MessageConfig {
    pub fn custom_fields(&self) -> Vec<String> {
        self.fields
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:9000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub log_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_path: None,
        }
    }
}

impl Config {
    /// Check the settings a send needs before any network traffic happens
    pub fn validate(&self) -> AppResult<()> {
        let webhook = self.slack.webhook_url.as_deref().unwrap_or("").trim();
        if webhook.is_empty() && !self.slack.has_token() {
            return Err(AppError::config(
                "Either slack.webhook_url or slack.token must be set",
            ));
        }
        if !webhook.is_empty() {
            Url::parse(webhook)
                .map_err(|e| AppError::invalid_config_value("slack.webhook_url", webhook, e))?;
        }
        if let Some(proxy) = self.slack.proxy_address.as_deref().filter(|p| !p.is_empty()) {
            Url::parse(proxy)
                .map_err(|e| AppError::invalid_config_value("slack.proxy_address", proxy, e))?;
        }
        if !self.message.graylog_url.is_empty() {
            Url::parse(&self.message.graylog_url).map_err(|e| {
                AppError::invalid_config_value("message.graylog_url", &self.message.graylog_url, e)
            })?;
        }
        if self.message.acknowledge && !self.slack.has_token() {
            tracing::warn!("message.acknowledge is enabled without slack.token; button callbacks need a Slack app");
        }
        Ok(())
    }
}

/// Configuration manager for the alert-slack service
///
/// Loads the TOML configuration from an explicit path, or from the per-user
/// configuration directory (`<config dir>/alert-slack/config.toml`). A default
/// file is written when none exists yet.
///
/// # Example
///
/// ```rust,no_run
/// use alert_slack::config::ConfigManager;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let manager = ConfigManager::load(None)?;
///     println!("Channel: {}", manager.config().slack.channel);
///     Ok(())
/// }
/// ```
pub struct ConfigManager {
    config_path: PathBuf,
    config: Config,
}

impl ConfigManager {
    /// Load configuration from `path`, or from the default location
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration directory cannot be created or
    /// the file cannot be read, parsed, or (when missing) written.
    pub fn load(path: Option<PathBuf>) -> AppResult<Self> {
        let config_path = match path {
            Some(path) => path,
            None => Self::default_config_path()?,
        };
        let config = Self::load_or_create(&config_path)?;
        Ok(ConfigManager {
            config_path,
            config,
        })
    }

    /// Write a fresh default configuration, refusing to clobber an existing
    /// file unless `force` is set
    pub fn init(path: Option<PathBuf>, force: bool) -> AppResult<Self> {
        let config_path = match path {
            Some(path) => path,
            None => Self::default_config_path()?,
        };
        if config_path.exists() && !force {
            return Err(AppError::config(format!(
                "Configuration already exists at {} (use --force to overwrite)",
                config_path.display()
            )));
        }
        let manager = ConfigManager {
            config_path,
            config: Config::default(),
        };
        manager.save()?;
        Ok(manager)
    }

    pub fn default_config_path() -> AppResult<PathBuf> {
        let base_dirs =
            BaseDirs::new().ok_or_else(|| AppError::config("Failed to get base directories"))?;
        Ok(base_dirs.config_dir().join("alert-slack").join("config.toml"))
    }

    fn load_or_create(path: &Path) -> AppResult<Config> {
        if path.exists() {
            let content = fs::read_to_string(path).in_file_operation(path, "read config file")?;
            toml::from_str(&content)
                .map_err(|e| AppError::config_with_source("Failed to parse config file", e))
        } else {
            let config = Config::default();
            write_config(path, &config)?;
            Ok(config)
        }
    }

    /// Saves the current configuration to disk
    pub fn save(&self) -> AppResult<()> {
        write_config(&self.config_path, &self.config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

fn write_config(path: &Path, config: &Config) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).in_file_operation(parent, "create config directory")?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| AppError::config_with_source("Failed to serialize config", e))?;
    fs::write(path, content).in_file_operation(path, "write config file")
}
