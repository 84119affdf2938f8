//! Core decision logic for Attest.
//!
//! This crate contains pure approval logic with ZERO web or database dependencies.
//! Persistence, the organisational hierarchy, categories, and security are
//! consumed through traits so that callers can plug in their own backends.
//!
//! # Modules
//!
//! - `approval` - Multi-level data approval and acceptance workflow engine

pub mod approval;
