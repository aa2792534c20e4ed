//! fsexport - Material archive export tool
//!
//! Reads a material archive, lists its channels and exports a time window of
//! the selected channels into a fresh, self-contained archive. This library
//! crate exposes the core functionality for integration testing.

pub mod catalog;
pub mod config;
pub mod events;
pub mod export;
pub mod license;
