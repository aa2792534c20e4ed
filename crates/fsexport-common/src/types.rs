//! Core type definitions for archive channels and material files.
//!
//! Enums are serialized in lowercase for the JSON archive info; the binary
//! index and frame codec use the numeric discriminants.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Error;

/// Kind of data a channel records.
///
/// The declaration order is the catalog listing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum DataType {
    /// Unknown or unset data type.
    Undefined = 0,
    /// Video stream from a camera.
    Camera = 1,
    /// Audio stream.
    Audio = 2,
    /// Text stream (overlays, POS data, ...).
    Text = 3,
    /// Alarm bookkeeping log; never exported.
    AlarmLog = 4,
}

impl DataType {
    /// Whether channels of this type carry exportable frames.
    #[must_use]
    pub fn is_exportable(self) -> bool {
        matches!(self, Self::Camera | Self::Audio | Self::Text)
    }

    /// Human-readable label used for exported channel names.
    ///
    /// Anything that is not audio or text is labelled as a camera.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Audio => "Audio",
            Self::Text => "Text",
            _ => "Camera",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "Undefined"),
            Self::Camera => write!(f, "Camera"),
            Self::Audio => write!(f, "Audio"),
            Self::Text => write!(f, "Text"),
            Self::AlarmLog => write!(f, "AlarmLog"),
        }
    }
}

impl TryFrom<u8> for DataType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Undefined),
            1 => Ok(Self::Camera),
            2 => Ok(Self::Audio),
            3 => Ok(Self::Text),
            4 => Ok(Self::AlarmLog),
            other => Err(Error::UnknownDataTypeCode(other)),
        }
    }
}

impl std::str::FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "camera" | "video" => Ok(Self::Camera),
            "audio" => Ok(Self::Audio),
            "text" => Ok(Self::Text),
            "alarmlog" => Ok(Self::AlarmLog),
            other => Err(Error::UnknownDataType(other.to_string())),
        }
    }
}

/// Role of an index record within its channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelRole {
    /// Unknown role; never exported.
    Undefined,
    /// Regular recorded material.
    Material,
    /// Pre-alarm buffer; never exported.
    Prerecording,
}

impl fmt::Display for ChannelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Material => write!(f, "material"),
            Self::Prerecording => write!(f, "prerecording"),
        }
    }
}

/// Fill state of a material file as recorded in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileState {
    /// Allocated but never written.
    Empty,
    /// Being written or closed early.
    Partial,
    /// Closed normally.
    Complete,
}

/// Identity of a logical recording channel.
///
/// Ordering is by data type first, then channel number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChannelIdentifier {
    pub data_type: DataType,
    pub number: u16,
}

impl ChannelIdentifier {
    #[must_use]
    pub fn new(data_type: DataType, number: u16) -> Self {
        Self { data_type, number }
    }
}

impl fmt::Display for ChannelIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.data_type, self.number)
    }
}

impl std::str::FromStr for ChannelIdentifier {
    type Err = Error;

    /// Parse `type:number`, e.g. `camera:3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, number) = s
            .split_once(':')
            .ok_or_else(|| Error::invalid_channel(s, "expected <type>:<number>"))?;
        let number = number
            .trim()
            .parse::<u16>()
            .map_err(|e| Error::invalid_channel(s, format!("bad channel number: {e}")))?;
        Ok(Self::new(kind.trim().parse()?, number))
    }
}
