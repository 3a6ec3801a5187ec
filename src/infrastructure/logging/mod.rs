//! Structured logging, grounded in the teacher's `tracing` +
//! `tracing-subscriber` + `tracing-appender` stack (`infrastructure::logging`).
//! No secret scrubbing or audit trail is carried over: no credentials pass
//! through this core, so those teacher concerns have no counterpart here.

pub mod logger;

pub use logger::LoggerImpl;
