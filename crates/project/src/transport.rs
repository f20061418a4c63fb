//! Printable encodings for binary envelopes.
//!
//! The preference store only holds strings, so every envelope passes through
//! a [`TextTransport`] on its way in and out.

use crate::TransportError;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Reversible mapping between arbitrary bytes and a printable string.
///
/// Implementations must satisfy `decode(encode(b)) == b` for every byte
/// sequence, the empty one included.
pub trait TextTransport {
    fn encode(&self, bytes: &[u8]) -> String;
    fn decode(&self, text: &str) -> Result<Vec<u8>, TransportError>;
}

/// Standard padded base64.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Transport;

impl TextTransport for Base64Transport {
    fn encode(&self, bytes: &[u8]) -> String {
        STANDARD.encode(bytes)
    }

    fn decode(&self, text: &str) -> Result<Vec<u8>, TransportError> {
        Ok(STANDARD.decode(text)?)
    }
}
