//! External collaborators of the dispatch pipeline.
//!
//! The core only sees the three traits below. Concrete implementations talk
//! to Ollama (`/api/chat`), an MCP server over streamable HTTP, or read a
//! static tools file.

pub mod file;
pub mod mcp;
pub mod ollama;

use crate::error::{ModelError, RemoteError};
use crate::execution::ResultPayload;
use crate::selection::{ModelOutput, ModelPrompt};
use async_trait::async_trait;
use serde_json::{Map, Value};

pub use file::FileToolSource;
pub use mcp::McpClient;
pub use ollama::OllamaBackend;

/// A language model that can answer one selection prompt.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &ModelPrompt) -> Result<ModelOutput, ModelError>;
}

/// Supplies raw tool descriptors (`name`, `description`, `inputSchema`).
#[async_trait]
pub trait ToolSource: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<Value>, RemoteError>;
}

/// Executes one named tool with keyword arguments.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn call_tool(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<ResultPayload, RemoteError>;
}
