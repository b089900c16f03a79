//! Public facade crate for `smartsum`.
//!
//! This crate intentionally contains no IO or provider-specific logic.
//! It re-exports the page/section/summary types and traits from `smartsum-core`.

pub use smartsum_core::*;
