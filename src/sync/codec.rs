//! Transport encoding for file content embedded in Contents API payloads.
//!
//! Content is always handled as UTF-8 bytes before base64, never per char,
//! so multi-byte text survives the round trip unchanged.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::SyncResult;

/// Encode text for the `content` field of a write request
pub fn encode_text(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Decode the `content` field of a read response.
///
/// GitHub wraps the base64 payload with newlines every 60 columns, so all
/// ASCII whitespace is dropped before decoding.
pub fn decode_text(content: &str) -> SyncResult<String> {
    let compact: String = content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = STANDARD.decode(compact)?;
    Ok(String::from_utf8(bytes)?)
}
