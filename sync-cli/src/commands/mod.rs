//! CLI command implementations.

pub mod config;
pub mod connect;
pub mod relay;
pub mod send;
