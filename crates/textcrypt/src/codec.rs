//! Text-safe transport encoding for binary cryptographic material.
//!
//! Keys, IVs, and ciphertext are raw bytes; callers move them through
//! storage and transport layers as base64 strings. [`Codec`] owns the
//! base64 engine doing that conversion so an alternative alphabet or
//! padding policy can be injected at construction; everything downstream
//! only ever sees `encode` and `decode`.

use base64::engine::{general_purpose, GeneralPurpose};
use base64::Engine;
use thiserror::Error;

/// Errors produced by the codec layer.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The input is not valid base64 under the configured engine:
    /// characters outside the alphabet, a length no encoder could have
    /// produced, or non-canonical padding.
    #[error("malformed portable text: {0}")]
    Malformed(#[from] base64::DecodeError),
}

/// Lossless binary/text converter for key material, IVs, and ciphertext.
///
/// The engine is injected at construction; [`Codec::standard`] picks the
/// standard alphabet with canonical `=` padding and no line breaks, which
/// is what every portable field in this crate uses.
#[derive(Debug, Clone)]
pub struct Codec<E = GeneralPurpose> {
    engine: E,
}

impl Codec {
    /// Codec over the standard base64 alphabet with canonical padding.
    pub const fn standard() -> Self {
        Self {
            engine: general_purpose::STANDARD,
        }
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::standard()
    }
}

impl<E: Engine> Codec<E> {
    /// Build a codec over a caller-supplied base64 engine.
    pub const fn new(engine: E) -> Self {
        Self { engine }
    }

    /// Encode a byte sequence as base64 text.
    ///
    /// Accepts whatever view of the bytes the caller holds (`Vec<u8>`,
    /// slice, or fixed array) and always produces a single line with
    /// deterministic padding.
    pub fn encode(&self, bytes: impl AsRef<[u8]>) -> String {
        self.engine.encode(bytes)
    }

    /// Decode base64 text back into the exact byte sequence it encodes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Malformed`] if `text` is not valid base64;
    /// input is never truncated or partially decoded.
    pub fn decode(&self, text: &str) -> Result<Vec<u8>, CodecError> {
        Ok(self.engine.decode(text)?)
    }
}
