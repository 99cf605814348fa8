//! # Formats Module
//!
//! Serialization and format handling for ERE graphs.
//!
//! This module contains:
//! - JSON graph documents (`{"theGraph": {label: record}}`)
//! - Binary snapshot format (postcard + header)
//!
//! Conversions are pure; the thin file helpers in [`persistence`] are the
//! only functions here that touch the filesystem.

mod json;
mod persistence;

pub use json::*;
pub use persistence::*;
