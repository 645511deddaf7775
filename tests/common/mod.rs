//! Common test utilities and helpers
//!
//! Reusable helpers for driving the `alert-slack` binary and for standing up
//! a fake Slack Web API inside a test.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use assert_cmd::Command;
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use predicates::prelude::*;
use serde_json::{json, Value};
use std::collections::HashMap;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test command builder for the alert-slack CLI
pub struct TestCommand {
    cmd: Command,
}

impl TestCommand {
    pub fn new() -> Self {
        let cmd = Command::cargo_bin("alert-slack").expect("Failed to find alert-slack binary");
        Self { cmd }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            self.cmd.arg(arg.as_ref());
        }
        self
    }

    pub fn arg<S: AsRef<str>>(mut self, arg: S) -> Self {
        self.cmd.arg(arg.as_ref());
        self
    }

    pub fn stdin<S: AsRef<str>>(mut self, input: S) -> Self {
        self.cmd.write_stdin(input.as_ref());
        self
    }

    pub fn expect_success(mut self) -> TestAssertion {
        let assert = self.cmd.assert().success();
        TestAssertion { assert }
    }

    pub fn expect_failure(mut self) -> TestAssertion {
        let assert = self.cmd.assert().failure();
        TestAssertion { assert }
    }
}

impl Default for TestCommand {
    fn default() -> Self {
        Self::new()
    }
}

/// Test assertion wrapper with convenient methods
pub struct TestAssertion {
    assert: assert_cmd::assert::Assert,
}

impl TestAssertion {
    pub fn stdout_contains<S: AsRef<str>>(self, text: S) -> Self {
        let assert = self.assert.stdout(predicate::str::contains(text.as_ref()));
        Self { assert }
    }

    pub fn stderr_contains<S: AsRef<str>>(self, text: S) -> Self {
        let assert = self.assert.stderr(predicate::str::contains(text.as_ref()));
        Self { assert }
    }

    pub fn stdout_contains_all<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for pattern in patterns {
            self.assert = self.assert.stdout(predicate::str::contains(pattern.as_ref()));
        }
        self
    }

    pub fn done(self) -> assert_cmd::assert::Assert {
        self.assert
    }
}

/// Temporary directory holding a config file and event fixtures
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub config_path: PathBuf,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config_path = temp_dir.path().join("config.toml");
        Self {
            temp_dir,
            config_path,
        }
    }

    /// Environment with `contents` as its config file
    pub fn with_config(contents: &str) -> Self {
        let env = Self::new();
        std::fs::write(&env.config_path, contents).expect("Failed to write config");
        env
    }

    pub fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, contents).expect("Failed to write fixture");
        path
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Command pointed at this environment's config file
    pub fn command(&self) -> TestCommand {
        TestCommand::new()
            .arg("--config")
            .arg(self.config_path.to_string_lossy())
    }
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

/// Event context with two backlog entries
pub fn sample_event() -> Value {
    json!({
        "event_definition": {"id": "def-1", "type": "aggregation-v1", "title": "High error rate"},
        "job_definition_id": "job-1",
        "job_trigger_id": "trigger-1",
        "event": {"priority": 2},
        "streams": [{"id": "s1", "title": "Errors"}],
        "backlog": [
            {"id": "m1", "index": "graylog_0", "timestamp": "2024-03-01T10:00:00Z",
             "message": "boom", "fields": {"source": "web-01", "owner": "alice"}},
            {"id": "m2", "index": "graylog_1", "timestamp": "2024-03-01T10:00:05Z",
             "message": "bang", "fields": {"source": "web-02", "owner": "bob"}}
        ]
    })
}

/// What the fake Slack API has seen
#[derive(Default)]
pub struct FakeSlackLog {
    pub directory_requests: Vec<HashMap<String, String>>,
    pub posted: Vec<(Option<String>, Value)>,
}

/// Fake Slack Web API: `users.list` served as fixed pages keyed by cursor,
/// `chat.postMessage` recorded
pub struct FakeSlack {
    pub addr: SocketAddr,
    pub log: Arc<Mutex<FakeSlackLog>>,
}

#[derive(Clone)]
struct FakeSlackState {
    pages: Arc<HashMap<String, Value>>,
    log: Arc<Mutex<FakeSlackLog>>,
}

impl FakeSlack {
    /// `pages` maps an incoming cursor ("" for the first page) to the response
    pub async fn start(pages: HashMap<String, Value>) -> Self {
        let log = Arc::new(Mutex::new(FakeSlackLog::default()));
        let state = FakeSlackState {
            pages: Arc::new(pages),
            log: log.clone(),
        };
        let app = Router::new()
            .route("/api/users.list", get(users_list))
            .route("/api/chat.postMessage", post(post_message))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fake slack");
        let addr = listener.local_addr().expect("fake slack address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake slack server");
        });
        Self { addr, log }
    }

    pub fn api_base_url(&self) -> String {
        format!("http://{}/api/", self.addr)
    }

    pub fn directory_requests(&self) -> Vec<HashMap<String, String>> {
        self.log.lock().unwrap().directory_requests.clone()
    }

    pub fn posted(&self) -> Vec<(Option<String>, Value)> {
        self.log.lock().unwrap().posted.clone()
    }
}

async fn users_list(
    State(state): State<FakeSlackState>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let cursor = query.get("cursor").cloned().unwrap_or_default();
    state.log.lock().unwrap().directory_requests.push(query);
    let page = state
        .pages
        .get(&cursor)
        .cloned()
        .unwrap_or_else(|| json!({"ok": false, "error": "invalid_cursor"}));
    Json(page)
}

async fn post_message(
    State(state): State<FakeSlackState>,
    headers: axum::http::HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.log.lock().unwrap().posted.push((auth, body));
    Json(json!({"ok": true}))
}
