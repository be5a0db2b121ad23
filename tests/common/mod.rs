//! In-process fakes for the three collaborator traits plus router helpers.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::{get, post},
    Router,
};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tooldispatch::error::{ModelError, RemoteError};
use tooldispatch::execution::ResultPayload;
use tooldispatch::handlers::{
    batch_dispatch_handler, dispatch_handler, health_handler, ready_handler,
    refresh_tools_handler, tools_handler,
};
use tooldispatch::selection::{ModelOutput, ModelPrompt};
use tooldispatch::{AppState, Config, LanguageModel, ToolExecutor, ToolSource};
use tower::ServiceExt;

/// Replies from a script. Each rule is `(needle, output)`; the first rule
/// whose needle occurs in the user prompt wins. An empty needle matches all.
pub struct ScriptedModel {
    rules: Vec<(String, ModelOutput)>,
    delay: Option<Duration>,
    fail: bool,
    prompts: Mutex<Vec<ModelPrompt>>,
}

impl ScriptedModel {
    pub fn new(output: ModelOutput) -> Self {
        Self::routed(vec![("", output)])
    }

    pub fn routed(rules: Vec<(&str, ModelOutput)>) -> Self {
        Self {
            rules: rules
                .into_iter()
                .map(|(needle, output)| (needle.to_string(), output))
                .collect(),
            delay: None,
            fail: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Structured reply naming `name` with `arguments`.
    pub fn selecting(name: &str, arguments: Value) -> Self {
        Self::new(ModelOutput::Structured(
            json!({ "name": name, "arguments": arguments }),
        ))
    }

    pub fn failing() -> Self {
        let mut model = Self::routed(Vec::new());
        model.fail = true;
        model
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn prompts(&self) -> Vec<ModelPrompt> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &ModelPrompt) -> Result<ModelOutput, ModelError> {
        self.prompts.lock().unwrap().push(prompt.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(ModelError::Transport("connection refused".into()));
        }

        self.rules
            .iter()
            .find(|(needle, _)| prompt.user.contains(needle.as_str()))
            .map(|(_, output)| output.clone())
            .ok_or_else(|| ModelError::InvalidResponse("no scripted reply".into()))
    }
}

/// Records every call and answers with a fixed reply.
pub struct RecordingExecutor {
    reply: Result<ResultPayload, RemoteError>,
    calls: Mutex<Vec<(String, Map<String, Value>)>>,
}

impl RecordingExecutor {
    pub fn replying(payload: ResultPayload) -> Self {
        Self {
            reply: Ok(payload),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: RemoteError) -> Self {
        Self {
            reply: Err(error),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, Map<String, Value>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ToolExecutor for RecordingExecutor {
    async fn call_tool(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<ResultPayload, RemoteError> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments.clone()));
        self.reply.clone()
    }
}

/// Serves a replaceable list of raw descriptors.
pub struct StaticSource {
    tools: Mutex<Result<Vec<Value>, RemoteError>>,
}

impl StaticSource {
    pub fn new(tools: Vec<Value>) -> Self {
        Self {
            tools: Mutex::new(Ok(tools)),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            tools: Mutex::new(Err(RemoteError::Transport("connection refused".into()))),
        }
    }

    pub fn replace(&self, tools: Vec<Value>) {
        *self.tools.lock().unwrap() = Ok(tools);
    }
}

#[async_trait]
impl ToolSource for StaticSource {
    async fn list_tools(&self) -> Result<Vec<Value>, RemoteError> {
        self.tools.lock().unwrap().clone()
    }
}

/// Replies to successive `list_tools` calls from a script of
/// `(delay, tools)` steps; the last step repeats once the script runs out.
pub struct SequencedSource {
    steps: Vec<(Duration, Vec<Value>)>,
    calls: AtomicUsize,
}

impl SequencedSource {
    pub fn new(steps: Vec<(Duration, Vec<Value>)>) -> Self {
        Self {
            steps,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ToolSource for SequencedSource {
    async fn list_tools(&self) -> Result<Vec<Value>, RemoteError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let (delay, tools) = self.steps[call.min(self.steps.len() - 1)].clone();
        tokio::time::sleep(delay).await;
        Ok(tools)
    }
}

pub fn add_numbers_tool() -> Value {
    json!({
        "name": "add_numbers",
        "description": "Adds two numbers together.",
        "inputSchema": {
            "type": "object",
            "properties": {
                "a": { "type": "number" },
                "b": { "type": "number" }
            },
            "required": ["a", "b"]
        }
    })
}

pub fn multiply_numbers_tool() -> Value {
    json!({
        "name": "multiply_numbers",
        "description": "Multiplies two numbers.",
        "inputSchema": {
            "type": "object",
            "properties": {
                "a": { "type": "number" },
                "b": { "type": "number" }
            },
            "required": ["a", "b"]
        }
    })
}

pub fn arithmetic_tools() -> Vec<Value> {
    vec![add_numbers_tool(), multiply_numbers_tool()]
}

/// State with its first catalog already loaded from `source`.
pub async fn ready_state(
    config: Config,
    source: Arc<dyn ToolSource>,
    model: Arc<dyn LanguageModel>,
    executor: Arc<dyn ToolExecutor>,
) -> Arc<AppState> {
    let state = AppState::with_backends(config, source, model, executor);
    state.refresh_catalog().await.unwrap();
    Arc::new(state)
}

/// Helper to create a test router with every endpoint but `/metrics`.
pub fn create_test_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/dispatch", post(dispatch_handler))
        .route("/dispatch/batch", post(batch_dispatch_handler))
        .route("/tools", get(tools_handler))
        .route("/tools/refresh", post(refresh_tools_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .with_state(state)
}

/// Helper to make a JSON request to the router.
pub async fn json_request(
    app: Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let req = match method {
        "GET" => Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
        "POST" => Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.unwrap_or(json!({})).to_string()))
            .unwrap(),
        _ => panic!("Unsupported method"),
    };

    let response = app.oneshot(req).await.unwrap();
    let status = response.status();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(json!({}));

    (status, body)
}
