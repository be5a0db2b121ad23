//! Type definitions shared by the selection stages.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The `{name, arguments}` pair chosen by the language model for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub name: String,
    pub arguments: Map<String, Value>,
}

/// What a model round-trip handed back.
///
/// Backends with schema-constrained generation return `Structured`; plain
/// chat backends return the assistant text, which may wrap the object in prose.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput {
    Structured(Value),
    Text(String),
}

impl ModelOutput {
    /// The output as text, for error diagnostics.
    pub fn to_raw_string(&self) -> String {
        match self {
            ModelOutput::Structured(value) => value.to_string(),
            ModelOutput::Text(text) => text.clone(),
        }
    }
}

/// A single selection request as sent to a model backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPrompt {
    /// Instructions plus the catalog prompt fragment.
    pub system: String,
    /// The user's request.
    pub user: String,
    /// JSON schema of the expected reply, for backends that can enforce one.
    pub response_schema: Option<Value>,
}
