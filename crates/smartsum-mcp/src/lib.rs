//! `smartsum` crate (library surface).
//!
//! The primary entrypoint for end users is the `smartsum` binary (CLI + MCP stdio).
//! This library module re-exports the building blocks so they can be embedded
//! without depending on internal crate layout.

pub use smartsum_core as core;
pub use smartsum_local as local;
