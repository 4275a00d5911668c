//! CLI command implementations.
//!
//! Each command takes a loaded [`Context`] plus the collaborators it talks
//! to; `main` builds the real ones with [`services`].

pub mod combine;
pub mod config;
mod context;
pub mod deploy;
pub mod print;
pub mod repositories;
pub mod services;
mod switch;
mod sync;

pub use context::Context;
pub use switch::{revert_switch, switch};
pub use sync::sync;
