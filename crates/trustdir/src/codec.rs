//! Attribute codec: directory attribute text to typed values and back.
//!
//! Conventions shared by every trust attribute:
//!
//! - An absent attribute is not an error. Integers read as `0`, blobs as
//!   empty, identifiers as the null SID.
//! - Integers are unsigned 32-bit, written in base-10 text.
//! - Binary values travel as standard base64, padded on write and with or
//!   without padding on read. A blob that fails to decode or decodes to
//!   nothing is treated exactly like an absent one.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;

use crate::error::{Result, StoreError};
use crate::sid::DomSid;

const BLOB_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode an optional unsigned 32-bit attribute. Absent reads as `0`.
///
/// # Errors
///
/// Returns `StoreError::DecodeError` for non-numeric text, signs, trailing
/// garbage, or values above `u32::MAX`.
pub fn decode_u32(raw: Option<&str>) -> Result<u32> {
    match raw {
        None => Ok(0),
        Some(text) => parse_u32(text),
    }
}

/// Parse a present unsigned 32-bit attribute value.
pub fn parse_u32(text: &str) -> Result<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(StoreError::DecodeError(format!(
            "'{text}' is not an unsigned decimal integer"
        )));
    }
    text.parse::<u32>()
        .map_err(|_| StoreError::DecodeError(format!("'{text}' exceeds the 32-bit range")))
}

/// Render an unsigned 32-bit value as decimal text.
pub fn encode_u32(value: u32) -> String {
    value.to_string()
}

/// Decode an optional base64 attribute. Absent, undecodable and empty all
/// yield an empty blob.
pub fn decode_blob(raw: Option<&str>) -> Vec<u8> {
    raw.and_then(|text| {
        BLOB_ENGINE
            .decode(text.trim())
            .map_err(|e| log::debug!("discarding undecodable blob attribute: {e}"))
            .ok()
    })
    .unwrap_or_default()
}

/// Base64-encode a blob for writing. Callers only write non-empty blobs.
pub fn encode_blob(blob: &[u8]) -> String {
    BLOB_ENGINE.encode(blob)
}

/// Decode an optional security identifier. Absent reads as the null SID.
///
/// # Errors
///
/// Returns `StoreError::DecodeError` if the text is not a SID.
pub fn decode_sid(raw: Option<&str>) -> Result<DomSid> {
    match raw {
        None => Ok(DomSid::null()),
        Some(text) => text.parse(),
    }
}
