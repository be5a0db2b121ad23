use crate::backends::ToolSource;
use crate::catalog::tools_array;
use crate::error::RemoteError;
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;

/// Reads tool descriptors from a JSON file instead of asking the server.
///
/// The file may hold a bare array, `{"tools": [...]}`, or a saved
/// `tools/list` response. It is re-read on every listing so a catalog
/// refresh picks up edits.
pub struct FileToolSource {
    path: PathBuf,
}

impl FileToolSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ToolSource for FileToolSource {
    async fn list_tools(&self) -> Result<Vec<Value>, RemoteError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| RemoteError::Io(format!("{}: {}", self.path.display(), e)))?;

        let document: Value = serde_json::from_slice(&bytes)
            .map_err(|e| RemoteError::Io(format!("{}: invalid JSON: {}", self.path.display(), e)))?;

        let tools = tools_array(&document)
            .map_err(|e| RemoteError::Io(format!("{}: {}", self.path.display(), e)))?;

        tracing::debug!(path = %self.path.display(), count = tools.len(), "Loaded tools file");

        Ok(tools.clone())
    }
}
