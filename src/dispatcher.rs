//! The natural-language dispatch pipeline.
//!
//! One cycle is a strictly sequential chain:
//!
//! ```text
//! text ─► requester ─► extractor ─► validator ─► invoker ─► normalizer ─► lines
//!          (model I/O)                            (remote I/O)
//! ```
//!
//! Only the requester and the invoker suspend. Extraction and validation
//! failures end the cycle before the invoker runs, so a rejected selection
//! never reaches the remote side. Dropping the future before the invoker
//! starts is side-effect free.

use crate::backends::{LanguageModel, ToolExecutor};
use crate::catalog::ToolCatalog;
use crate::error::DispatchResult;
use crate::execution::{normalize_result, Invoker};
use crate::selection::{extract_selection, validate_selection, Selection, SelectionRequester};
use serde::Serialize;
use std::sync::Arc;

/// Result of one completed dispatch cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchOutcome {
    pub selection: Selection,
    pub lines: Vec<String>,
}

/// Runs dispatch cycles against one immutable catalog snapshot.
///
/// Cheap to clone; clones share the snapshot and the backend handles, so
/// independent cycles can run as separate tasks.
#[derive(Clone)]
pub struct Dispatcher {
    catalog: Arc<ToolCatalog>,
    requester: SelectionRequester,
    invoker: Invoker,
}

impl Dispatcher {
    pub fn new(
        catalog: Arc<ToolCatalog>,
        model: Arc<dyn LanguageModel>,
        executor: Arc<dyn ToolExecutor>,
    ) -> Self {
        Self {
            catalog,
            requester: SelectionRequester::new(model),
            invoker: Invoker::new(executor),
        }
    }

    pub fn catalog(&self) -> &Arc<ToolCatalog> {
        &self.catalog
    }

    /// Select and validate without invoking anything.
    pub async fn plan(&self, text: &str) -> DispatchResult<Selection> {
        let output = self
            .requester
            .request(text, self.catalog.prompt_fragment())
            .await?;
        let candidate = extract_selection(&output)?;
        validate_selection(candidate, &self.catalog)
    }

    /// Full cycle: select, validate, invoke once, render.
    pub async fn dispatch(&self, text: &str) -> DispatchResult<DispatchOutcome> {
        let selection = self.plan(text).await?;
        let payload = self.invoker.invoke(&selection).await?;
        let lines = normalize_result(&payload)?;

        Ok(DispatchOutcome { selection, lines })
    }
}
