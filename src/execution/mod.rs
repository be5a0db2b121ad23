pub mod invoker;
pub mod normalizer;
pub mod types;

pub use invoker::Invoker;
pub use normalizer::normalize_result;
pub use types::{ContentItem, ResultPayload};
