//! Tooldispatch - Natural-language tool dispatch service
//!
//! This library exposes the dispatch pipeline (catalog adaptation, tool
//! selection, validation, invocation, result rendering) and the HTTP service
//! built on it, enabling integration tests and embedding in other applications.

pub mod backends;
pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod execution;
pub mod handlers;
pub mod selection;
pub mod server;
pub mod state;

// Re-export key types for convenience
pub use backends::{LanguageModel, ToolExecutor, ToolSource};
pub use catalog::{adapt_tools, ToolCatalog, ToolDescriptor};
pub use config::{Config, ModelMode};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::{AppError, DispatchError, Result};
pub use handlers::{
    batch_dispatch_handler, dispatch_handler, health_handler, ready_handler,
    refresh_tools_handler, tools_handler,
};
pub use selection::Selection;
pub use state::AppState;
