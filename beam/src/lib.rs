//! Beam Library
//!
//! Release deployment, rollback and lifecycle control for a service
//! running on a fleet of remote hosts.

pub mod config;
pub mod deploy;
pub mod errors;
pub mod logs;
pub mod prompt;
pub mod remote;
pub mod utils;
