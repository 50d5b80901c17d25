//! # Registrar Application Library
//!
//! The HTTP API, CLI and configuration layers of the Registrar binary,
//! exposed as a library so integration tests can drive the router directly.

pub mod api;
pub mod cli;
pub mod config;
