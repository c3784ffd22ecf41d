//! Language-model providers, retry policy and response extraction.

pub mod json;
pub mod model;
pub mod retry;
pub mod subprocess;

pub use json::extract_json;
pub use model::{CliModel, LanguageModel, Provider};
pub use retry::{RetryPolicy, retry_with_backoff, with_timeout};
