//! User directory cache and `users.list` wire types
//!
//! Mentions in notifications are written as display names (`@alice`) but Slack
//! needs opaque user ids (`<@U024BE7LH>`). Resolved ids are kept in a bounded,
//! time-expiring cache so a full directory traversal only happens on a miss.

use moka::sync::Cache;
use serde::Deserialize;
use std::time::Duration;

pub const DIRECTORY_CACHE_CAPACITY: u64 = 1000;
pub const DIRECTORY_CACHE_TTL: Duration = Duration::from_secs(3600);
pub const DIRECTORY_PAGE_SIZE: u32 = 200;

/// Display name to user id cache, safe to share between clients.
///
/// Cloning is cheap and clones share the same underlying storage. Entries
/// expire a fixed time after they were written; capacity eviction is
/// approximate.
#[derive(Clone)]
pub struct UserDirectoryCache {
    inner: Cache<String, String>,
}

impl UserDirectoryCache {
    pub fn new() -> Self {
        Self::with_policy(DIRECTORY_CACHE_CAPACITY, DIRECTORY_CACHE_TTL)
    }

    pub fn with_policy(capacity: u64, time_to_live: Duration) -> Self {
        let inner = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(time_to_live)
            .build();
        Self { inner }
    }

    pub fn get(&self, display_name: &str) -> Option<String> {
        self.inner.get(display_name)
    }

    /// Insert or overwrite an entry, restarting its time to live
    pub fn put(&self, display_name: impl Into<String>, user_id: impl Into<String>) {
        self.inner.insert(display_name.into(), user_id.into());
    }

    /// Approximate number of resident entries
    pub fn len(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for UserDirectoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UserDirectoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDirectoryCache")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}

/// Pagination state for directory traversal. An empty cursor means the
/// listing is exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorState {
    pub page_size: u32,
    pub cursor: String,
}

impl CursorState {
    pub fn first_page() -> Self {
        CursorState {
            page_size: DIRECTORY_PAGE_SIZE,
            cursor: String::new(),
        }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("limit", self.page_size.to_string())];
        if !self.cursor.is_empty() {
            pairs.push(("cursor", self.cursor.clone()));
        }
        pairs
    }
}

/// Response of `GET users.list`
#[derive(Debug, Clone, Deserialize)]
pub struct UserListResponse {
    #[serde(default = "default_ok")]
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub response_metadata: Option<ResponseMetadata>,
}

fn default_ok() -> bool {
    true
}

impl UserListResponse {
    pub fn next_cursor(&self) -> &str {
        self.response_metadata
            .as_ref()
            .map(|meta| meta.next_cursor.as_str())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMetadata {
    #[serde(default)]
    pub next_cursor: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub profile: Option<Profile>,
}

impl Member {
    /// Display name used as the mention key, if the member has one
    pub fn display_name(&self) -> Option<&str> {
        self.profile
            .as_ref()
            .and_then(|profile| profile.display_name.as_deref())
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub real_name: Option<String>,
}
