use crate::backends::ToolExecutor;
use crate::error::{DispatchError, DispatchResult};
use crate::execution::types::ResultPayload;
use crate::selection::Selection;
use std::sync::Arc;

/// Sends a validated selection to the remote execution boundary.
///
/// One remote call per selection and no retries. Mutating tools take effect
/// on the remote side as soon as the call lands; if the caller drops the
/// future mid-call, the effect may have happened without the result being
/// delivered (at-most-once from the caller's point of view).
#[derive(Clone)]
pub struct Invoker {
    executor: Arc<dyn ToolExecutor>,
}

impl Invoker {
    pub fn new(executor: Arc<dyn ToolExecutor>) -> Self {
        Self { executor }
    }

    /// Remote faults are relayed untouched, with the selection attached.
    pub async fn invoke(&self, selection: &Selection) -> DispatchResult<ResultPayload> {
        self.executor
            .call_tool(&selection.name, &selection.arguments)
            .await
            .map_err(|source| DispatchError::RemoteExecution {
                selection: selection.clone(),
                source,
            })
    }
}
