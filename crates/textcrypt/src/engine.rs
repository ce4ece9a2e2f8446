//! Message encryption engine: AES-256-CBC with per-message keys.
//!
//! Lifecycle of one message:
//!
//! ```text
//! text --encrypt_message--> CipherBundle { key, iv, ciphertext }
//!      --export_bundle----> PortableBundle { base64 key / iv / ciphertext }
//!      --import_bundle----> CipherBundle
//!      --decrypt_message--> text
//! ```
//!
//! Every encryption draws an independent key and IV; nothing is cached or
//! reused between calls, each of which runs to completion synchronously.
//! A single engine can therefore be shared freely across threads.

use base64::engine::GeneralPurpose;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::codec::{Codec, CodecError};
use crate::key::{CipherKey, KeyError};
use crate::provider::{CryptoProvider, RustCryptoProvider, IV_LEN};

/// Errors surfaced by engine operations.
#[derive(Debug, Error)]
pub enum CipherError {
    /// No usable cryptographic backend in this environment. Probed once
    /// at engine construction; see [`CipherEngine::is_supported`].
    #[error("cryptographic provider unavailable in this environment")]
    Unsupported,

    /// Padding validation rejected the ciphertext: wrong key, corrupted
    /// or truncated data. The message is unrecoverable with this bundle.
    #[error("decryption failed: wrong key or corrupted ciphertext")]
    DecryptionFailed,

    /// Decryption produced bytes that are not valid UTF-8. Distinct from
    /// [`DecryptionFailed`](CipherError::DecryptionFailed): the padding
    /// checked out (a mismatched IV, or a rare wrong-key false accept)
    /// but the result is not text.
    #[error("decrypted bytes are not valid UTF-8")]
    InvalidUtf8,

    /// A portable field failed base64 decoding.
    #[error(transparent)]
    Encoding(#[from] CodecError),

    /// Key export or import failed.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// A decoded IV does not have the required length.
    #[error("invalid IV length: expected {IV_LEN} bytes, got {0}")]
    InvalidIvLength(usize),
}

/// Deterministic UTF-8 byte encoding of a message.
///
/// Covers the full Unicode range, multi-byte code points and embedded NUL
/// characters included. This is the exact byte sequence
/// [`CipherEngine::encrypt_message`] feeds into the cipher.
pub fn message_encoding(text: &str) -> Vec<u8> {
    text.as_bytes().to_vec()
}

/// Everything needed to recover one message: key, IV, and ciphertext.
///
/// Produced whole by [`CipherEngine::encrypt_message`] and consumed whole
/// by [`CipherEngine::decrypt_message`]. A bundle with any field swapped
/// out decrypts to garbage or fails outright.
#[derive(Debug, Clone)]
pub struct CipherBundle {
    /// Key generated for this message alone.
    pub key: CipherKey,
    /// Random per-message IV.
    pub iv: [u8; IV_LEN],
    /// CBC ciphertext, padded to whole blocks.
    pub ciphertext: Vec<u8>,
}

/// A [`CipherBundle`] with every field rendered as portable base64 text.
///
/// This is the form that crosses storage and transport boundaries; see
/// [`CipherEngine::export_bundle`] and [`CipherEngine::import_bundle`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortableBundle {
    /// Exported key material, base64.
    pub key: String,
    /// IV bytes, base64.
    pub iv: String,
    /// Ciphertext bytes, base64.
    pub ciphertext: String,
}

/// Message encryption engine with explicitly injected dependencies.
///
/// The provider supplies the cipher and randomness primitives; the codec
/// supplies the binary/text conversion. Both are fixed at construction,
/// nothing is looked up from ambient state, and no field is ever mutated
/// afterwards.
#[derive(Debug, Clone)]
pub struct CipherEngine<P = RustCryptoProvider, E = GeneralPurpose> {
    provider: P,
    codec: Codec<E>,
    supported: bool,
}

impl CipherEngine {
    /// Engine over the default RustCrypto backend and the standard codec.
    pub fn new() -> Self {
        Self::with_parts(RustCryptoProvider, Codec::standard())
    }
}

impl Default for CipherEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: CryptoProvider, E: Engine> CipherEngine<P, E> {
    /// Build an engine from a caller-supplied provider and codec.
    ///
    /// The provider's availability is probed exactly once, here; the
    /// result is what [`is_supported`](CipherEngine::is_supported)
    /// reports for the engine's whole lifetime.
    pub fn with_parts(provider: P, codec: Codec<E>) -> Self {
        let supported = provider.is_available();
        Self {
            provider,
            codec,
            supported,
        }
    }

    /// Whether cipher operations can run in this environment.
    ///
    /// Callers may branch on this up front;
    /// [`encrypt_message`](CipherEngine::encrypt_message) and
    /// [`decrypt_message`](CipherEngine::decrypt_message) fail fast with
    /// [`CipherError::Unsupported`] when it is `false`.
    pub fn is_supported(&self) -> bool {
        self.supported
    }

    /// The codec this engine renders portable fields with.
    pub fn codec(&self) -> &Codec<E> {
        &self.codec
    }

    /// Encrypt a message under a fresh key and IV.
    ///
    /// Each call draws an independent 256-bit key and 16-byte IV from the
    /// provider's CSPRNG, so identical plaintexts produce unrelated
    /// bundles and no key or IV is ever reused by the engine.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Unsupported`] when the provider is absent.
    pub fn encrypt_message(&self, text: &str) -> Result<CipherBundle, CipherError> {
        if !self.supported {
            return Err(CipherError::Unsupported);
        }
        let encoded = message_encoding(text);
        let key = CipherKey::generate(&self.provider);
        let mut iv = [0u8; IV_LEN];
        self.provider.fill_random(&mut iv);
        let ciphertext = self.provider.encrypt(key.material(), &iv, &encoded);
        debug!(
            plaintext_len = encoded.len(),
            ciphertext_len = ciphertext.len(),
            "message encrypted"
        );
        Ok(CipherBundle {
            key,
            iv,
            ciphertext,
        })
    }

    /// Decrypt a bundle back into the original message.
    ///
    /// # Errors
    ///
    /// - [`CipherError::Unsupported`] when the provider is absent.
    /// - [`CipherError::DecryptionFailed`] when padding validation
    ///   rejects the ciphertext (wrong key, damage in transit).
    /// - [`CipherError::InvalidUtf8`] when the decrypted bytes are not a
    ///   valid UTF-8 message.
    pub fn decrypt_message(&self, bundle: &CipherBundle) -> Result<String, CipherError> {
        if !self.supported {
            return Err(CipherError::Unsupported);
        }
        let plaintext = self
            .provider
            .decrypt(bundle.key.material(), &bundle.iv, &bundle.ciphertext)
            .map_err(|_| CipherError::DecryptionFailed)?;
        let message = String::from_utf8(plaintext).map_err(|_| CipherError::InvalidUtf8)?;
        debug!(ciphertext_len = bundle.ciphertext.len(), "message decrypted");
        Ok(message)
    }

    /// Export a key to portable text: raw bytes out, then base64.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::NotExtractable`] (as [`CipherError::Key`]) for
    /// keys constructed non-extractable. Keys minted by
    /// [`encrypt_message`](CipherEngine::encrypt_message) always export.
    pub fn export_key(&self, key: &CipherKey) -> Result<String, CipherError> {
        Ok(self.codec.encode(key.export_raw()?))
    }

    /// Rebuild a key from portable text: base64 in, then length-checked
    /// reconstruction. The result is interchangeable with the key that
    /// was exported, algorithm and usages included.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Encoding`] for malformed base64 and
    /// [`CipherError::Key`] when the decoded material is not exactly
    /// [`KEY_LEN`](crate::provider::KEY_LEN) bytes.
    pub fn import_key(&self, text: &str) -> Result<CipherKey, CipherError> {
        let raw = self.codec.decode(text)?;
        Ok(CipherKey::from_raw(&raw)?)
    }

    /// Render every bundle field as portable text.
    ///
    /// # Errors
    ///
    /// Propagates [`KeyError::NotExtractable`] from the key export.
    pub fn export_bundle(&self, bundle: &CipherBundle) -> Result<PortableBundle, CipherError> {
        Ok(PortableBundle {
            key: self.export_key(&bundle.key)?,
            iv: self.codec.encode(bundle.iv),
            ciphertext: self.codec.encode(&bundle.ciphertext),
        })
    }

    /// Rebuild a [`CipherBundle`] from its portable form.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Encoding`] for malformed base64,
    /// [`CipherError::Key`] for bad key material, and
    /// [`CipherError::InvalidIvLength`] when the IV field does not decode
    /// to exactly [`IV_LEN`] bytes.
    pub fn import_bundle(&self, portable: &PortableBundle) -> Result<CipherBundle, CipherError> {
        let key = self.import_key(&portable.key)?;
        let iv_bytes = self.codec.decode(&portable.iv)?;
        let iv: [u8; IV_LEN] = iv_bytes
            .as_slice()
            .try_into()
            .map_err(|_| CipherError::InvalidIvLength(iv_bytes.len()))?;
        let ciphertext = self.codec.decode(&portable.ciphertext)?;
        Ok(CipherBundle {
            key,
            iv,
            ciphertext,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ProviderError, KEY_LEN};

    /// Provider stub reporting an absent environment. The primitives
    /// delegate to the real backend, but a correct engine never reaches
    /// them.
    struct AbsentProvider;

    impl CryptoProvider for AbsentProvider {
        fn is_available(&self) -> bool {
            false
        }

        fn fill_random(&self, buf: &mut [u8]) {
            RustCryptoProvider.fill_random(buf);
        }

        fn encrypt(&self, key: &[u8; KEY_LEN], iv: &[u8; IV_LEN], plaintext: &[u8]) -> Vec<u8> {
            RustCryptoProvider.encrypt(key, iv, plaintext)
        }

        fn decrypt(
            &self,
            key: &[u8; KEY_LEN],
            iv: &[u8; IV_LEN],
            ciphertext: &[u8],
        ) -> Result<Vec<u8>, ProviderError> {
            RustCryptoProvider.decrypt(key, iv, ciphertext)
        }
    }

    fn absent_engine() -> CipherEngine<AbsentProvider> {
        CipherEngine::with_parts(AbsentProvider, Codec::standard())
    }

    #[test]
    fn round_trips_plain_ascii() {
        let engine = CipherEngine::new();
        let bundle = engine.encrypt_message("abc123").unwrap();
        assert_ne!(bundle.ciphertext, b"abc123");
        assert_eq!(engine.decrypt_message(&bundle).unwrap(), "abc123");
    }

    #[test]
    fn round_trips_unicode_and_embedded_nul() {
        let engine = CipherEngine::new();
        for text in ["", "héllo wörld", "暗号文 🔐", "a\0b\0c", "line\nbreak"] {
            let bundle = engine.encrypt_message(text).unwrap();
            assert_eq!(engine.decrypt_message(&bundle).unwrap(), text, "{text:?}");
        }
    }

    #[test]
    fn repeated_encryption_never_reuses_key_or_iv() {
        let engine = CipherEngine::new();
        let a = engine.encrypt_message("same message").unwrap();
        let b = engine.encrypt_message("same message").unwrap();
        assert_ne!(a.key.export_raw().unwrap(), b.key.export_raw().unwrap());
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn ciphertext_is_padded_to_whole_blocks() {
        let engine = CipherEngine::new();
        // 6 bytes of UTF-8 pad up to one block, 16 bytes to two.
        assert_eq!(engine.encrypt_message("abc123").unwrap().ciphertext.len(), 16);
        let aligned = "0123456789abcdef";
        assert_eq!(engine.encrypt_message(aligned).unwrap().ciphertext.len(), 32);
    }

    #[test]
    fn wrong_key_never_recovers_the_message() {
        let engine = CipherEngine::new();
        let original = "confidential payload";
        let mut bundle = engine.encrypt_message(original).unwrap();
        bundle.key = engine.encrypt_message("other").unwrap().key;
        match engine.decrypt_message(&bundle) {
            Err(CipherError::DecryptionFailed | CipherError::InvalidUtf8) => {}
            Err(other) => panic!("unexpected error kind: {other:?}"),
            // Padding can validate by chance; the text still never matches.
            Ok(recovered) => assert_ne!(recovered, original),
        }
    }

    #[test]
    fn wrong_iv_never_recovers_the_message() {
        let engine = CipherEngine::new();
        let original = "a message spanning more than one cipher block";
        let mut bundle = engine.encrypt_message(original).unwrap();
        bundle.iv[0] ^= 0x01;
        match engine.decrypt_message(&bundle) {
            Err(CipherError::DecryptionFailed | CipherError::InvalidUtf8) => {}
            Err(other) => panic!("unexpected error kind: {other:?}"),
            Ok(recovered) => assert_ne!(recovered, original),
        }
    }

    #[test]
    fn non_utf8_plaintext_surfaces_as_invalid_utf8() {
        // A hand-assembled bundle can hold ciphertext over bytes that
        // never came from message_encoding. The padding validates; the
        // text decode must fail with the distinct error kind.
        let engine = CipherEngine::new();
        let key_bytes = [0x42u8; KEY_LEN];
        let iv = [0x24u8; IV_LEN];
        // 0xC3 opens a two-byte sequence that 0x28 cannot continue.
        let ciphertext = RustCryptoProvider.encrypt(&key_bytes, &iv, &[0xC3, 0x28]);
        let bundle = CipherBundle {
            key: CipherKey::from_raw(&key_bytes).unwrap(),
            iv,
            ciphertext,
        };
        assert!(matches!(
            engine.decrypt_message(&bundle),
            Err(CipherError::InvalidUtf8)
        ));
    }

    #[test]
    fn truncated_ciphertext_fails_decryption() {
        let engine = CipherEngine::new();
        let mut bundle = engine.encrypt_message("abc123").unwrap();
        bundle.ciphertext.pop();
        assert!(matches!(
            engine.decrypt_message(&bundle),
            Err(CipherError::DecryptionFailed)
        ));
    }

    #[test]
    fn unsupported_environment_fails_fast() {
        let real = CipherEngine::new();
        let bundle = real.encrypt_message("abc123").unwrap();

        let engine = absent_engine();
        assert!(!engine.is_supported());
        assert!(matches!(
            engine.encrypt_message("abc123"),
            Err(CipherError::Unsupported)
        ));
        assert!(matches!(
            engine.decrypt_message(&bundle),
            Err(CipherError::Unsupported)
        ));
    }

    #[test]
    fn availability_is_probed_at_construction_only() {
        // The flag is captured once; the engine never re-probes.
        let engine = absent_engine();
        assert!(!engine.is_supported());
        assert!(!engine.is_supported());
    }

    #[test]
    fn key_survives_the_portable_text_form() {
        let engine = CipherEngine::new();
        let bundle = engine.encrypt_message("abc123").unwrap();
        let text = engine.export_key(&bundle.key).unwrap();
        let imported = engine.import_key(&text).unwrap();
        assert_eq!(
            imported.export_raw().unwrap(),
            bundle.key.export_raw().unwrap()
        );
        assert!(imported.is_extractable());
    }

    #[test]
    fn import_key_rejects_malformed_text_and_wrong_lengths() {
        let engine = CipherEngine::new();
        assert!(matches!(
            engine.import_key("not//valid//base64!!"),
            Err(CipherError::Encoding(_))
        ));
        // "AAAA" decodes to 3 bytes, far short of a key.
        match engine.import_key("AAAA") {
            Err(CipherError::Key(KeyError::InvalidLength(got))) => assert_eq!(got, 3),
            other => panic!("expected InvalidLength, got {other:?}"),
        }
    }

    #[test]
    fn non_extractable_key_blocks_export_but_not_decryption() {
        let engine = CipherEngine::new();
        let bundle = engine.encrypt_message("abc123").unwrap();
        let raw = *bundle.key.export_raw().unwrap();

        let locked = CipherKey::from_raw_non_extractable(&raw).unwrap();
        assert!(matches!(
            engine.export_key(&locked),
            Err(CipherError::Key(KeyError::NotExtractable))
        ));

        let relocked = CipherBundle {
            key: locked,
            iv: bundle.iv,
            ciphertext: bundle.ciphertext.clone(),
        };
        assert_eq!(engine.decrypt_message(&relocked).unwrap(), "abc123");
    }

    #[test]
    fn bundle_survives_the_portable_form() {
        let engine = CipherEngine::new();
        let bundle = engine.encrypt_message("portable round trip").unwrap();
        let portable = engine.export_bundle(&bundle).unwrap();
        let rebuilt = engine.import_bundle(&portable).unwrap();
        assert_eq!(rebuilt.iv, bundle.iv);
        assert_eq!(rebuilt.ciphertext, bundle.ciphertext);
        assert_eq!(
            engine.decrypt_message(&rebuilt).unwrap(),
            "portable round trip"
        );
    }

    #[test]
    fn import_bundle_validates_the_iv_length() {
        let engine = CipherEngine::new();
        let bundle = engine.encrypt_message("abc123").unwrap();
        let mut portable = engine.export_bundle(&bundle).unwrap();
        portable.iv = engine.codec().encode([0u8; 4]);
        match engine.import_bundle(&portable) {
            Err(CipherError::InvalidIvLength(got)) => assert_eq!(got, 4),
            other => panic!("expected InvalidIvLength, got {other:?}"),
        }
    }

    #[test]
    fn portable_bundle_serialises_as_json() {
        let engine = CipherEngine::new();
        let bundle = engine.encrypt_message("abc123").unwrap();
        let portable = engine.export_bundle(&bundle).unwrap();
        let json = serde_json::to_string(&portable).unwrap();
        let parsed: PortableBundle = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, portable);
        let rebuilt = engine.import_bundle(&parsed).unwrap();
        assert_eq!(engine.decrypt_message(&rebuilt).unwrap(), "abc123");
    }

    #[test]
    fn message_encoding_is_utf8_bytes() {
        assert_eq!(message_encoding("abc123"), b"abc123");
        assert_eq!(message_encoding(""), Vec::<u8>::new());
        assert_eq!(message_encoding("é"), vec![0xC3, 0xA9]);
    }
}
