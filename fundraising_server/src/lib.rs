//! # Fundraising server
//! This crate hosts the fundraising engine as a long-running process. It is responsible for:
//! * Connecting to the primary campaign store and bringing its schema up to date.
//! * Connecting to the search cluster, or falling back to an in-memory index.
//! * Running the search sync workers, and draining the sync queue on shutdown.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
pub mod cli;
pub mod config;
pub mod errors;
pub mod server;
