//! Cryptographic primitive provider: AES-256-CBC and secure randomness.
//!
//! The engine never calls cipher or RNG code directly; everything goes
//! through [`CryptoProvider`] so a build can swap in a platform backend
//! and so tests can present an environment where the primitives are
//! absent. [`RustCryptoProvider`] is the default software backend over
//! the RustCrypto `aes` and `cbc` crates.

use aes::Aes256;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use thiserror::Error;

/// Byte length of an AES-256 key.
pub const KEY_LEN: usize = 32;

/// Byte length of a CBC initialization vector, one AES block.
pub const IV_LEN: usize = 16;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Errors produced by a provider primitive.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// PKCS#7 padding validation rejected the ciphertext during
    /// decryption. CBC cannot tell a wrong key from truncated or
    /// corrupted data; they all surface here.
    #[error("ciphertext rejected: padding validation failed")]
    RejectedCiphertext,
}

/// Source of the AES-CBC primitives and cryptographically secure randomness.
///
/// Availability is a property of the environment, reported by
/// [`is_available`](CryptoProvider::is_available) without side effects.
/// The engine probes it once at construction and refuses to run cipher
/// operations against an absent backend. Implementations must draw
/// randomness from a cryptographically secure source, never a seeded or
/// deterministic one.
pub trait CryptoProvider {
    /// Reports whether the primitives are usable in this environment.
    fn is_available(&self) -> bool;

    /// Fill `buf` with cryptographically secure random bytes.
    fn fill_random(&self, buf: &mut [u8]);

    /// AES-256-CBC encrypt `plaintext` under `key` and `iv` with PKCS#7
    /// padding.
    ///
    /// Key and IV sizes are fixed by the signature and PKCS#7 accepts any
    /// plaintext length, the empty message included, so encryption cannot
    /// fail. Output length is `plaintext.len()` rounded up to the next
    /// multiple of [`IV_LEN`] (a full padding block when already aligned).
    fn encrypt(&self, key: &[u8; KEY_LEN], iv: &[u8; IV_LEN], plaintext: &[u8]) -> Vec<u8>;

    /// AES-256-CBC decrypt `ciphertext` under `key` and `iv`, validating
    /// and stripping the PKCS#7 padding.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::RejectedCiphertext`] when padding
    /// validation fails: wrong key, damaged ciphertext, or a length that
    /// is not a whole number of blocks.
    fn decrypt(
        &self,
        key: &[u8; KEY_LEN],
        iv: &[u8; IV_LEN],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, ProviderError>;
}

/// Default software backend over the RustCrypto `aes` and `cbc` crates.
///
/// Compiled into the binary, so [`is_available`](CryptoProvider::is_available)
/// always reports `true`; the capability probe exists for providers that
/// wrap platform facilities which may be missing at runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustCryptoProvider;

impl CryptoProvider for RustCryptoProvider {
    fn is_available(&self) -> bool {
        true
    }

    fn fill_random(&self, buf: &mut [u8]) {
        // ThreadRng is a CSPRNG reseeded from the operating system.
        rand::rng().fill_bytes(buf);
    }

    fn encrypt(&self, key: &[u8; KEY_LEN], iv: &[u8; IV_LEN], plaintext: &[u8]) -> Vec<u8> {
        Aes256CbcEnc::new(key.into(), iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
    }

    fn decrypt(
        &self,
        key: &[u8; KEY_LEN],
        iv: &[u8; IV_LEN],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, ProviderError> {
        Aes256CbcDec::new(key.into(), iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| ProviderError::RejectedCiphertext)
    }
}
