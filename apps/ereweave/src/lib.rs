//! # Ereweave Library
//!
//! This library exposes the command implementations for testing and
//! integration.
//!
//! The main binary uses these modules through the `main.rs` entry point.

pub mod cli;

// Re-export ereweave_core for convenience
pub use ereweave_core;
