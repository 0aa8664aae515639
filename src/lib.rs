//! Convertaphile - Web-facing media format conversion service
//!
//! This library crate exposes the core functionality for integration testing.

pub mod cleanup;
pub mod config;
pub mod server;
pub mod stats;
