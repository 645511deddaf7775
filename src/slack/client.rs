//! Slack delivery client
//!
//! Chooses between the two delivery modes once, at construction time:
//!
//! - **Webhook**: no token configured, the message is POSTed to the
//!   pre-shared incoming webhook URL.
//! - **Api**: a bot token is configured, the message is POSTed to
//!   `chat.postMessage` with bearer authentication, and the `users.list`
//!   directory becomes available for mention resolution.
//!
//! Both modes share one `reqwest` client that optionally routes through an
//! HTTP proxy. The client never retries; retry policy belongs to the caller.

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::directory::{CursorState, UserDirectoryCache, UserListResponse};
use super::message::Message;
use super::traits::SlackClient;
use crate::config::SlackConfig;
use crate::errors::{AppError, AppResult};

pub const DEFAULT_API_BASE_URL: &str = "https://slack.com/api/";

const WEBHOOK_CONTENT_TYPE: &str = "application/json";
const API_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Connection settings for [`DeliveryClient`]
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    pub webhook_url: Option<String>,
    pub token: Option<String>,
    pub proxy_address: Option<String>,
    pub api_base_url: String,
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            token: None,
            proxy_address: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: None,
            user_agent: Some(concat!("alert-slack/", env!("CARGO_PKG_VERSION")).to_string()),
        }
    }
}

impl From<&SlackConfig> for DeliveryConfig {
    fn from(config: &SlackConfig) -> Self {
        Self {
            webhook_url: config.webhook_url.clone(),
            token: config.token.clone(),
            proxy_address: config.proxy_address.clone(),
            api_base_url: config.api_base_url.clone(),
            timeout_secs: config.timeout_secs,
            ..Default::default()
        }
    }
}

/// How messages reach Slack
#[derive(Debug, Clone)]
pub enum DeliveryMode {
    Webhook { url: Url },
    Api { token: String },
}

/// Delivers messages and resolves mentions against the Slack user directory
#[derive(Clone)]
pub struct DeliveryClient {
    http: Client,
    mode: DeliveryMode,
    api_base: Url,
    directory: UserDirectoryCache,
}

impl DeliveryClient {
    /// Create a client with its own directory cache
    pub fn new(config: DeliveryConfig) -> AppResult<Self> {
        Self::with_directory(config, UserDirectoryCache::new())
    }

    /// Create a client that shares an existing directory cache
    pub fn with_directory(config: DeliveryConfig, directory: UserDirectoryCache) -> AppResult<Self> {
        let mode = Self::select_mode(&config)?;
        let api_base = Self::parse_api_base(&config.api_base_url)?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout));
        }
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent);
        }
        builder = match non_empty(&config.proxy_address) {
            Some(address) => builder.proxy(build_proxy(address)?),
            None => builder.no_proxy(),
        };
        let http = builder
            .build()
            .map_err(|e| AppError::config_with_source("Failed to create HTTP client", e))?;

        Ok(Self {
            http,
            mode,
            api_base,
            directory,
        })
    }

    fn select_mode(config: &DeliveryConfig) -> AppResult<DeliveryMode> {
        if let Some(token) = non_empty(&config.token) {
            return Ok(DeliveryMode::Api {
                token: token.to_string(),
            });
        }
        match non_empty(&config.webhook_url) {
            Some(raw) => {
                let url = Url::parse(raw)
                    .map_err(|e| AppError::invalid_config_value("slack.webhook_url", raw, e))?;
                Ok(DeliveryMode::Webhook { url })
            }
            None => Err(AppError::config(
                "Either a webhook URL or an API token must be configured",
            )),
        }
    }

    fn parse_api_base(raw: &str) -> AppResult<Url> {
        let normalized = if raw.ends_with('/') {
            raw.to_string()
        } else {
            format!("{raw}/")
        };
        Url::parse(&normalized).map_err(|e| AppError::invalid_config_value("slack.api_base_url", raw, e))
    }

    pub fn mode(&self) -> &DeliveryMode {
        &self.mode
    }

    pub fn directory(&self) -> &UserDirectoryCache {
        &self.directory
    }

    fn api_endpoint(&self, method: &str) -> AppResult<Url> {
        Ok(self.api_base.join(method)?)
    }

    /// Deliver a message. Any status other than 200 is a rejection.
    pub async fn send(&self, message: &Message) -> AppResult<()> {
        let body = message.serialize_json()?;
        debug!(payload = %body, "Sending Slack message");

        let request = match &self.mode {
            DeliveryMode::Webhook { url } => self
                .http
                .post(url.clone())
                .header(CONTENT_TYPE, HeaderValue::from_static(WEBHOOK_CONTENT_TYPE)),
            DeliveryMode::Api { token } => self
                .http
                .post(self.api_endpoint("chat.postMessage")?)
                .header(CONTENT_TYPE, HeaderValue::from_static(API_CONTENT_TYPE))
                .bearer_auth(token),
        };

        let response = request.body(body).send().await.map_err(|e| {
            let url = e.url().map(|u| u.to_string()).unwrap_or_else(|| "unknown".to_string());
            AppError::connectivity(url, e)
        })?;

        let status = response.status();
        let response_body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        debug!(status = status.as_u16(), body = %response_body, "Received Slack response");

        if status != reqwest::StatusCode::OK {
            return Err(AppError::rejected(status.as_u16(), response_body));
        }

        info!(channel = ?message.channel, "Slack message delivered");
        Ok(())
    }

    /// Resolve a display name to a user id.
    ///
    /// Webhook mode has no directory access, so the name is echoed back. In
    /// API mode a cache miss triggers a full directory traversal; a name that
    /// is still unknown afterwards is returned unchanged.
    pub async fn resolve_user(&self, display_name: &str) -> AppResult<String> {
        let token = match &self.mode {
            DeliveryMode::Webhook { .. } => return Ok(display_name.to_string()),
            DeliveryMode::Api { token } => token,
        };

        if let Some(id) = self.directory.get(display_name) {
            return Ok(id);
        }

        self.fill_directory(token).await?;

        match self.directory.get(display_name) {
            Some(id) => Ok(id),
            None => {
                warn!(user = display_name, "Slack user not found in directory");
                Ok(display_name.to_string())
            }
        }
    }

    /// Page through `users.list` until the cursor runs out, caching every
    /// non-bot member by display name.
    async fn fill_directory(&self, token: &str) -> AppResult<()> {
        let mut cursor = CursorState::first_page();
        let mut pages = 0usize;

        loop {
            let page = self.fetch_directory_page(token, &cursor).await?;
            if !page.ok {
                return Err(AppError::directory_lookup(
                    page.error.unwrap_or_else(|| "unknown error".to_string()),
                ));
            }
            pages += 1;

            for member in page.members.iter().filter(|m| !m.is_bot) {
                if let Some(name) = member.display_name() {
                    self.directory.put(name, member.id.clone());
                }
            }

            let next = page.next_cursor();
            if next.is_empty() || next == cursor.cursor {
                break;
            }
            cursor.cursor = next.to_string();
        }

        debug!(pages, "Slack user directory refreshed");
        Ok(())
    }

    async fn fetch_directory_page(
        &self,
        token: &str,
        cursor: &CursorState,
    ) -> AppResult<UserListResponse> {
        let url = self
            .api_endpoint("users.list")
            .map_err(|e| AppError::directory_lookup_with_source("Invalid users.list URL", e))?;

        let response = self
            .http
            .get(url)
            .query(&cursor.query_pairs())
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::directory_lookup_with_source("Could not reach users.list", e))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::directory_lookup_with_source(
                "users.list request was rejected",
                AppError::rejected(status.as_u16(), body),
            ));
        }

        response
            .json::<UserListResponse>()
            .await
            .map_err(|e| AppError::directory_lookup_with_source("Malformed users.list response", e))
    }
}

#[async_trait]
impl SlackClient for DeliveryClient {
    async fn send(&self, message: &Message) -> AppResult<()> {
        DeliveryClient::send(self, message).await
    }

    async fn resolve_user(&self, display_name: &str) -> AppResult<String> {
        DeliveryClient::resolve_user(self, display_name).await
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Route through `host:port` taken from the configured proxy URL
fn build_proxy(address: &str) -> AppResult<reqwest::Proxy> {
    let uri = Url::parse(address)
        .map_err(|e| AppError::invalid_config_value("slack.proxy_address", address, e))?;
    let host = uri
        .host_str()
        .ok_or_else(|| AppError::config(format!("Proxy address '{address}' has no host")))?;
    let port = uri
        .port_or_known_default()
        .ok_or_else(|| AppError::config(format!("Proxy address '{address}' has no port")))?;

    reqwest::Proxy::all(format!("http://{host}:{port}"))
        .map_err(|e| AppError::invalid_config_value("slack.proxy_address", address, e))
}
