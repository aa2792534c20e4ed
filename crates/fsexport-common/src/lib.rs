//! Fsexport-Common: Shared types, identifiers, and time primitives.
//!
//! This crate provides common functionality used across fsexport:
//!
//! - **Typed IDs**: `ArchiveId` for exported archives, `MaterialFileId` for material files
//! - **Core Types**: Data types, channel roles, file states and channel identity
//! - **Time**: Microsecond `Timestamp` and the inclusive `TimeInterval`
//! - **Path Utilities**: Well-known archive file names and material file naming
//! - **Errors**: Parse errors for data types and channel identifiers
//!
//! # Examples
//!
//! ```
//! use fsexport_common::{ChannelIdentifier, DataType, TimeInterval, Timestamp};
//! use fsexport_common::paths::material_file_name;
//!
//! let id = ChannelIdentifier::new(DataType::Camera, 3);
//! assert_eq!(id.to_string(), "Camera 3");
//!
//! let interval = TimeInterval::new(Timestamp::from_micros(10), Timestamp::from_micros(20));
//! assert!(interval.contains(Timestamp::from_micros(20)));
//!
//! assert_eq!(material_file_name(26u32.into()), "0000001A.mfd");
//! ```

pub mod error;
pub mod ids;
pub mod paths;
pub mod time;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use time::{TimeInterval, Timestamp};
pub use types::*;
