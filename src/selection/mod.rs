//! Tool selection: ask the model, recover its answer, check it against the catalog.

pub mod extractor;
pub mod requester;
pub mod types;
pub mod validator;

pub use extractor::extract_selection;
pub use requester::{build_prompt, selection_schema, SelectionRequester};
pub use types::{ModelOutput, ModelPrompt, Selection};
pub use validator::validate_selection;
