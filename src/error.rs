use crate::catalog::ParamType;
use crate::execution::ResultPayload;
use crate::selection::Selection;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Failures while turning a remote tool listing into a catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Expected a tools array in catalog response")]
    MissingToolsArray,

    #[error("Malformed tool definition: {0}")]
    MalformedTool(String),

    #[error("All {0} tool definitions failed to parse")]
    AllMalformed(usize),

    #[error("Failed to fetch tool catalog: {0}")]
    Source(#[from] RemoteError),
}

/// Failures raised by the language model backend.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model backend request failed: {0}")]
    Transport(String),

    #[error("Model backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Model backend returned an unexpected response: {0}")]
    InvalidResponse(String),
}

/// Failures raised by the remote tool server. Relayed verbatim by the invoker.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    #[error("Tool server request failed: {0}")]
    Transport(String),

    #[error("Tool server returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Tool server error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Tool reported failure: {0}")]
    ToolFailed(String),

    #[error("Tool server returned an unexpected response: {0}")]
    Protocol(String),

    #[error("Failed to read tools file: {0}")]
    Io(String),
}

/// Everything that can abort one dispatch cycle.
///
/// Extraction and validation variants are always raised before the remote
/// call, so a cycle that fails with one of them has had no side effect.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Request text cannot be empty")]
    EmptyRequest,

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Selection request failed: {0}")]
    Model(#[from] ModelError),

    #[error("Could not extract a tool selection from model output: {reason}")]
    Extraction { reason: String, raw_output: String },

    #[error("Unknown tool '{}'", .selection.name)]
    UnknownTool {
        selection: Selection,
        available: Vec<String>,
    },

    #[error("Tool '{}' is missing required arguments: {}", .selection.name, .missing.join(", "))]
    MissingArguments {
        selection: Selection,
        missing: Vec<String>,
    },

    #[error("Argument '{parameter}' of tool '{}' expects {expected}, got {found}", .selection.name)]
    TypeMismatch {
        selection: Selection,
        parameter: String,
        expected: ParamType,
        found: String,
    },

    #[error("Tool '{}' failed: {source}", .selection.name)]
    RemoteExecution {
        selection: Selection,
        #[source]
        source: RemoteError,
    },

    #[error("Result payload cannot be rendered for display")]
    UnrepresentableResult { payload: ResultPayload },
}

impl DispatchError {
    /// Stable tag for metrics labels and response bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::EmptyRequest => "empty_request",
            DispatchError::Catalog(_) => "catalog",
            DispatchError::Model(_) => "model",
            DispatchError::Extraction { .. } => "extraction",
            DispatchError::UnknownTool { .. } => "unknown_tool",
            DispatchError::MissingArguments { .. } => "missing_arguments",
            DispatchError::TypeMismatch { .. } => "type_mismatch",
            DispatchError::RemoteExecution { .. } => "remote_execution",
            DispatchError::UnrepresentableResult { .. } => "unrepresentable_result",
        }
    }

    /// Diagnostic context for the caller: offending selection, raw output, etc.
    pub fn context(&self) -> Value {
        match self {
            DispatchError::EmptyRequest | DispatchError::Catalog(_) | DispatchError::Model(_) => {
                Value::Null
            }
            DispatchError::Extraction { raw_output, .. } => json!({ "raw_output": raw_output }),
            DispatchError::UnknownTool {
                selection,
                available,
            } => json!({ "selection": selection, "available": available }),
            DispatchError::MissingArguments { selection, missing } => {
                json!({ "selection": selection, "missing": missing })
            }
            DispatchError::TypeMismatch {
                selection,
                parameter,
                expected,
                found,
            } => json!({
                "selection": selection,
                "parameter": parameter,
                "expected": expected,
                "found": found,
            }),
            DispatchError::RemoteExecution { selection, .. } => json!({ "selection": selection }),
            DispatchError::UnrepresentableResult { payload } => json!({ "payload": payload }),
        }
    }
}

pub type DispatchResult<T> = std::result::Result<T, DispatchError>;

/// HTTP-facing error. Logged once here, at the service boundary.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    ValidationError(String),

    #[error("Service temporarily unavailable: {0}")]
    ResourceError(String),

    #[error("Dispatch deadline of {0}s exceeded")]
    TimeoutError(u64),

    #[error(transparent)]
    CatalogError(#[from] CatalogError),

    #[error(transparent)]
    DispatchError(#[from] DispatchError),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation",
            AppError::ResourceError(_) => "resource",
            AppError::TimeoutError(_) => "timeout",
            AppError::CatalogError(_) => "catalog",
            AppError::DispatchError(e) => e.kind(),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
    kind: &'static str,
    #[serde(skip_serializing_if = "Value::is_null")]
    context: Value,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let (status, context) = match &self {
            AppError::ValidationError(msg) => {
                tracing::warn!(error = %msg, "Validation error");
                (StatusCode::BAD_REQUEST, Value::Null)
            }
            AppError::ResourceError(msg) => {
                tracing::warn!(error = %msg, "Resource error");
                (StatusCode::SERVICE_UNAVAILABLE, Value::Null)
            }
            AppError::TimeoutError(secs) => {
                tracing::warn!(timeout_secs = secs, "Dispatch deadline exceeded");
                (StatusCode::GATEWAY_TIMEOUT, Value::Null)
            }
            AppError::CatalogError(e) => {
                tracing::error!(error = %e, "Catalog error");
                (StatusCode::BAD_GATEWAY, Value::Null)
            }
            AppError::DispatchError(e) => {
                let status = dispatch_status(e);
                if status.is_server_error() {
                    tracing::error!(error = %e, kind, "Dispatch failed");
                } else {
                    tracing::warn!(error = %e, kind, "Dispatch rejected");
                }
                (status, e.context())
            }
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: status.as_u16(),
            kind,
            context,
        });

        (status, body).into_response()
    }
}

fn dispatch_status(err: &DispatchError) -> StatusCode {
    match err {
        DispatchError::EmptyRequest => StatusCode::BAD_REQUEST,
        DispatchError::UnknownTool { .. }
        | DispatchError::MissingArguments { .. }
        | DispatchError::TypeMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        DispatchError::Catalog(_)
        | DispatchError::Model(_)
        | DispatchError::Extraction { .. }
        | DispatchError::RemoteExecution { .. } => StatusCode::BAD_GATEWAY,
        DispatchError::UnrepresentableResult { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn selection(name: &str) -> Selection {
        Selection {
            name: name.to_string(),
            arguments: Map::new(),
        }
    }

    #[test]
    fn test_missing_arguments_message_names_all() {
        let err = DispatchError::MissingArguments {
            selection: selection("add_blog_post"),
            missing: vec!["title".into(), "content".into()],
        };

        assert_eq!(
            err.to_string(),
            "Tool 'add_blog_post' is missing required arguments: title, content"
        );
        assert_eq!(err.kind(), "missing_arguments");
    }

    #[test]
    fn test_validation_errors_map_to_422() {
        let err = DispatchError::UnknownTool {
            selection: selection("nope"),
            available: vec![],
        };
        assert_eq!(dispatch_status(&err), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_remote_failure_maps_to_502_and_keeps_selection() {
        let err = DispatchError::RemoteExecution {
            selection: selection("remove_blog_post"),
            source: RemoteError::ToolFailed("no such post".into()),
        };

        assert_eq!(dispatch_status(&err), StatusCode::BAD_GATEWAY);
        assert_eq!(err.context()["selection"]["name"], "remove_blog_post");
    }

    #[test]
    fn test_extraction_context_carries_raw_output() {
        let err = DispatchError::Extraction {
            reason: "no JSON object found".into(),
            raw_output: "I cannot help".into(),
        };
        assert_eq!(err.context()["raw_output"], "I cannot help");
    }
}
