//! Type definitions for the tool catalog.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Closed set of parameter types a tool argument can be checked against.
///
/// Resolved once when the catalog is built from the remote JSON schema;
/// unions collapse to their first non-null member and anything that cannot
/// be resolved becomes `Any`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    Any,
}

impl ParamType {
    /// Map a JSON-Schema `type` keyword to a tag. `null` has no tag of its own.
    pub fn from_schema_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "integer" => Some(Self::Integer),
            "boolean" => Some(Self::Boolean),
            "object" => Some(Self::Object),
            "array" => Some(Self::Array),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
            Self::Any => "any",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared argument of a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub required: bool,
    /// The schema allowed an explicit `null` (e.g. `anyOf: [integer, null]`).
    #[serde(default)]
    pub nullable: bool,
}

/// A normalized tool record, read-only for the lifetime of a catalog snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique tool identifier (from MCP tool.name)
    pub name: String,

    /// Single-line description, internal whitespace collapsed. May be empty.
    pub description: String,

    /// Parameters in schema declaration order.
    pub parameters: Vec<ParameterSpec>,
}

impl ToolDescriptor {
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.parameters.iter().filter(|p| p.required)
    }
}

/// Immutable snapshot of the tools advertised by the remote side.
///
/// Tools keep the order in which they were advertised. The prompt fragment
/// and fingerprint are computed once at construction, so every dispatch
/// cycle that shares the snapshot sees the same values.
#[derive(Debug, Clone)]
pub struct ToolCatalog {
    tools: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
    prompt_fragment: String,
    fingerprint: String,
}

impl ToolCatalog {
    pub(crate) fn from_parts(
        tools: Vec<ToolDescriptor>,
        index: HashMap<String, usize>,
        prompt_fragment: String,
        fingerprint: String,
    ) -> Self {
        Self {
            tools,
            index,
            prompt_fragment,
            fingerprint,
        }
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&idx| &self.tools[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Natural-language listing of every tool, for the selection prompt.
    pub fn prompt_fragment(&self) -> &str {
        &self.prompt_fragment
    }

    /// Hex SHA-256 identifying this snapshot's contents.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}
