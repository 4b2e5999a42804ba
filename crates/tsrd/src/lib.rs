//! tsrd - Central registry daemon for tmux session inventories
//!
//! This crate provides the server side of tsr:
//! - `registry` - TTL-bounded in-memory store of per-machine inventories
//! - `api` - the HTTP push/pull API on top of the registry
//! - `auth` - bearer-token authentication boundary
//! - `config` - environment-driven configuration
//!
//! # Architecture
//!
//! ```text
//! agents ──POST /api/sessions──▶ auth ──▶ validate ──▶ Registry::update
//! clients ──GET /api/sessions──▶ auth ──▶ Registry::snapshot ──▶ JSON
//!                                             │
//!                               eviction task (every ttl/2)
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Poisoned locks are recovered, not propagated

pub mod api;
pub mod auth;
pub mod config;
pub mod registry;
