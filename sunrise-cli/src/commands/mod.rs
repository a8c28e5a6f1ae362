//! CLI command implementations.

pub mod cache;
pub mod install;
pub mod session;
pub mod status;
pub mod verify;
