//! # bangumi
//!
//! Server and CLI around the `bangumi-core` query engine.
//!
//! - [`api`]: axum JSON API; every read endpoint takes its query state from
//!   the request's query string
//! - [`cli`]: clap commands for browsing, classifying and status snapshots
//! - [`config`]: TOML settings with CLI overrides

pub mod api;
pub mod cli;
pub mod config;
