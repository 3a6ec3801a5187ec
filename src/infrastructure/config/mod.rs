//! Configuration loading infrastructure: hierarchical merging with
//! figment, layered over the `services::config::Config` schema.

pub mod loader;

pub use loader::ConfigLoader;
