//! Input normalization: data-URL prefix stripping and Base64 alphabet checks.
//!
//! Only the character set is checked. Padding, length and whether the bytes
//! decode to an actual image are left to the model endpoint.

use crate::errors::ValidationError;
use std::fmt::Display;

const DATA_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// Base64 image payload with any data-URL prefix removed.
///
/// Never empty, and every character is in `[A-Za-z0-9+/=]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage(String);

impl NormalizedImage {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for NormalizedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NormalizedImage {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub fn normalize(raw: Option<&str>) -> Result<NormalizedImage, ValidationError> {
    let raw = match raw {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Err(ValidationError::MissingPayload),
    };

    let payload = match strip_data_url(raw) {
        Some(rest) => rest,
        None => raw.trim(),
    };

    if payload.is_empty() || !payload.bytes().all(is_base64_byte) {
        return Err(ValidationError::InvalidEncoding);
    }
    Ok(NormalizedImage(payload.to_string()))
}

/// Returns what follows a `data:image/<subtype>;base64,` header.
///
/// Returns `None` when `raw` is not a data URL. A value that starts with
/// `data:` but lacks an `image/<subtype>;base64,` header is returned as-is so
/// that the alphabet check rejects it.
fn strip_data_url(raw: &str) -> Option<&str> {
    if !raw.starts_with(DATA_PREFIX) {
        return None;
    }
    let header_end = match raw.find(BASE64_MARKER) {
        Some(idx) => idx,
        None => return Some(raw),
    };
    let mime = &raw[DATA_PREFIX.len()..header_end];
    if is_image_mime(mime) {
        Some(&raw[header_end + BASE64_MARKER.len()..])
    } else {
        Some(raw)
    }
}

fn is_image_mime(mime: &str) -> bool {
    match mime.strip_prefix("image/") {
        Some(subtype) => {
            !subtype.is_empty()
                && subtype
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    }
}

fn is_base64_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'='
}
