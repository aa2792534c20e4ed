//! License files.
//!
//! A license file holds one line, `base64(payload) "." hex(signature)`, where
//! the payload is JSON and the signature is HMAC-SHA256 of the raw payload
//! bytes under the configured key.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Product name a license must carry.
pub const PRODUCT: &str = "fsexport";

#[derive(Debug, Error)]
pub enum LicenseError {
    #[error("cannot read license file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed license: {0}")]
    Malformed(String),

    #[error("license signature does not verify")]
    BadSignature,

    #[error("license is for product {0:?}")]
    WrongProduct(String),

    #[error("license expired at {0}")]
    Expired(DateTime<Utc>),

    #[error("no valid license key configured")]
    InvalidKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub holder: String,
    pub product: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl License {
    pub fn new(holder: impl Into<String>) -> Self {
        Self {
            holder: holder.into(),
            product: PRODUCT.to_string(),
            expires_at: None,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Turns license file content into a verified [`License`].
pub trait LicenseDecoder: Send + Sync {
    fn decode(&self, content: &str) -> Result<License, LicenseError>;
}

/// Verifies HMAC-SHA256 signed licenses.
#[derive(Clone)]
pub struct HmacLicenseDecoder {
    key: Vec<u8>,
}

impl HmacLicenseDecoder {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    /// Key given as hex, as stored in the config file.
    pub fn from_hex(key: &str) -> Result<Self, LicenseError> {
        let key = hex::decode(key.trim()).map_err(|_| LicenseError::InvalidKey)?;
        if key.is_empty() {
            return Err(LicenseError::InvalidKey);
        }
        Ok(Self::new(key))
    }

    fn mac(&self) -> Result<HmacSha256, LicenseError> {
        HmacSha256::new_from_slice(&self.key).map_err(|_| LicenseError::InvalidKey)
    }

    /// Produce signed license file content.
    pub fn sign(&self, license: &License) -> Result<String, LicenseError> {
        let payload =
            serde_json::to_vec(license).map_err(|e| LicenseError::Malformed(e.to_string()))?;
        let mut mac = self.mac()?;
        mac.update(&payload);
        let signature = mac.finalize().into_bytes();
        Ok(format!("{}.{}", STANDARD.encode(&payload), hex::encode(signature)))
    }

    /// Verify `content` as of `now`.
    pub fn verify_at(&self, content: &str, now: DateTime<Utc>) -> Result<License, LicenseError> {
        let (payload, signature) = content
            .trim()
            .split_once('.')
            .ok_or_else(|| LicenseError::Malformed("missing signature separator".into()))?;
        let payload = STANDARD
            .decode(payload)
            .map_err(|e| LicenseError::Malformed(format!("payload is not base64: {e}")))?;
        let signature = hex::decode(signature)
            .map_err(|e| LicenseError::Malformed(format!("signature is not hex: {e}")))?;

        let mut mac = self.mac()?;
        mac.update(&payload);
        mac.verify_slice(&signature)
            .map_err(|_| LicenseError::BadSignature)?;

        let license: License = serde_json::from_slice(&payload)
            .map_err(|e| LicenseError::Malformed(format!("payload is not a license: {e}")))?;
        if license.product != PRODUCT {
            return Err(LicenseError::WrongProduct(license.product));
        }
        if let Some(at) = license.expires_at.filter(|_| license.is_expired_at(now)) {
            return Err(LicenseError::Expired(at));
        }
        Ok(license)
    }
}

impl LicenseDecoder for HmacLicenseDecoder {
    fn decode(&self, content: &str) -> Result<License, LicenseError> {
        self.verify_at(content, Utc::now())
    }
}

impl std::fmt::Debug for HmacLicenseDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacLicenseDecoder").finish_non_exhaustive()
    }
}

/// Read and decode a license file.
pub fn read_license(decoder: &dyn LicenseDecoder, path: &Path) -> Result<License, LicenseError> {
    let content = std::fs::read_to_string(path)?;
    decoder.decode(&content)
}
