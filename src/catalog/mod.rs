//! Catalog module for adapting remote tool descriptors.
//!
//! This module transforms MCP (Model Context Protocol) tool definitions
//! into a typed catalog and the prompt fragment the language model selects from.

pub mod adapter;
pub mod types;

pub use adapter::{adapt_tools, build_catalog, tools_array, CatalogResult};
pub use types::{ParamType, ParameterSpec, ToolCatalog, ToolDescriptor};
