//! Concrete `Actor`/`NumericJudge`/`FeedbackJudge` implementations:
//! a deterministic mock for tests and demos, and an HTTP client for a real
//! chat-completion backend.

pub mod http;
pub mod mock;

pub use http::{HttpActor, HttpConfigError};
pub use mock::MockActor;
