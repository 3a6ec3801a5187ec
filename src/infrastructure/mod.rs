//! Infrastructure: concrete, swappable implementations of the domain
//! ports and the ambient engineering concerns (config loading, logging,
//! actor/judge collaborators) layered on top of `domain` and `services`.

pub mod actors;
pub mod config;
pub mod logging;
