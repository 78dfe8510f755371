//! CLI command handlers, one file per command.

mod completions;
mod convert;
mod fetch;
mod resolve;

pub use completions::run_completions;
pub use convert::run_convert;
pub use fetch::run_fetch;
pub use resolve::run_resolve;
