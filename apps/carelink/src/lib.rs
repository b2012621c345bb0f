//! # carelink
//!
//! The CareLink server and CLI - THE BINARY.
//!
//! Everything async or network-facing lives here; record logic lives in
//! `carelink-core`.
//!
//! - [`api`]: axum router for `POST /api` and `GET /health`
//! - [`gateway`]: reqwest client for the condition classifier
//! - [`config`]: TOML + environment configuration
//! - [`cli`]: clap commands

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;

pub use config::AppConfig;
pub use error::AppError;
