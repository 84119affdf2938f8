//! Shared types, errors, and configuration for Attest.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Application-wide error types
//! - Configuration management (approval settings, cache sizing)

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, ApprovalSettings, CacheConfig};
pub use error::{AppError, AppResult};
