pub mod dispatch;
pub mod health;
pub mod tools;

pub use dispatch::{batch_dispatch_handler, dispatch_handler};
pub use health::{health_handler, ready_handler};
pub use tools::{refresh_tools_handler, tools_handler};
