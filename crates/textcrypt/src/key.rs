//! Key handles: generation, import, and guarded export of AES-256 material.

use std::fmt;

use thiserror::Error;

use crate::provider::{CryptoProvider, KEY_LEN};

/// Errors produced by the key layer.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The key was constructed non-extractable; its raw bytes stay inside
    /// the handle.
    #[error("key is not extractable")]
    NotExtractable,

    /// Imported key material has the wrong length for AES-256.
    #[error("invalid key length: expected {KEY_LEN} bytes, got {0}")]
    InvalidLength(usize),
}

/// Cipher identity attached to every [`CipherKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Algorithm {
    /// Cipher and mode name.
    pub name: &'static str,
    /// Key size in bits.
    pub key_bits: u32,
}

/// The one algorithm this crate implements.
pub const AES_CBC_256: Algorithm = Algorithm {
    name: "AES-CBC",
    key_bits: 256,
};

/// Operations a [`CipherKey`] may be used for.
///
/// The set is fixed: keys encrypt and decrypt, nothing else. No signing,
/// no derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUsage {
    /// The key may encrypt messages.
    Encrypt,
    /// The key may decrypt messages.
    Decrypt,
}

/// Opaque handle to 256-bit AES key material.
///
/// Immutable once constructed. The raw bytes leave the handle only
/// through [`export_raw`](CipherKey::export_raw), and only when the key
/// is extractable. On drop the material is overwritten with zeroes to
/// limit how long plaintext keys linger in memory.
#[derive(Clone)]
pub struct CipherKey {
    bytes: Box<[u8; KEY_LEN]>,
    extractable: bool,
}

impl CipherKey {
    /// Generate a fresh random key from the provider's CSPRNG.
    ///
    /// Generated keys are extractable, like keys rebuilt by
    /// [`from_raw`](CipherKey::from_raw).
    pub fn generate(provider: &impl CryptoProvider) -> Self {
        let mut bytes = Box::new([0u8; KEY_LEN]);
        provider.fill_random(&mut bytes[..]);
        Self {
            bytes,
            extractable: true,
        }
    }

    /// Reconstruct an extractable key from raw material.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidLength`] unless `raw` is exactly
    /// [`KEY_LEN`] bytes.
    pub fn from_raw(raw: &[u8]) -> Result<Self, KeyError> {
        Self::build(raw, true)
    }

    /// Reconstruct a key whose material can never be exported again.
    ///
    /// Non-extractable keys still encrypt and decrypt; only
    /// [`export_raw`](CipherKey::export_raw) refuses them.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidLength`] unless `raw` is exactly
    /// [`KEY_LEN`] bytes.
    pub fn from_raw_non_extractable(raw: &[u8]) -> Result<Self, KeyError> {
        Self::build(raw, false)
    }

    fn build(raw: &[u8], extractable: bool) -> Result<Self, KeyError> {
        if raw.len() != KEY_LEN {
            return Err(KeyError::InvalidLength(raw.len()));
        }
        let mut bytes = Box::new([0u8; KEY_LEN]);
        bytes.copy_from_slice(raw);
        Ok(Self { bytes, extractable })
    }

    /// Whether [`export_raw`](CipherKey::export_raw) will hand out the bytes.
    pub fn is_extractable(&self) -> bool {
        self.extractable
    }

    /// The algorithm this key is bound to.
    pub fn algorithm(&self) -> Algorithm {
        AES_CBC_256
    }

    /// Operations the key may perform: always both encrypt and decrypt.
    pub fn usages(&self) -> &'static [KeyUsage] {
        &[KeyUsage::Encrypt, KeyUsage::Decrypt]
    }

    /// Borrow the raw key material for export.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::NotExtractable`] if the key was constructed
    /// non-extractable.
    pub fn export_raw(&self) -> Result<&[u8; KEY_LEN], KeyError> {
        if !self.extractable {
            return Err(KeyError::NotExtractable);
        }
        Ok(&self.bytes)
    }

    /// Unguarded access for the engine's cipher calls. Non-extractable
    /// keys must still encrypt and decrypt.
    pub(crate) fn material(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl Drop for CipherKey {
    fn drop(&mut self) {
        // Zero the key material before the allocation is released.
        self.bytes.iter_mut().for_each(|b| *b = 0);
    }
}

impl fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material, not even in debug output.
        f.write_str("CipherKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::RustCryptoProvider;

    #[test]
    fn generated_keys_are_extractable_and_distinct() {
        let provider = RustCryptoProvider;
        let a = CipherKey::generate(&provider);
        let b = CipherKey::generate(&provider);
        assert!(a.is_extractable());
        assert_ne!(a.export_raw().unwrap(), b.export_raw().unwrap());
    }

    #[test]
    fn raw_material_round_trips() {
        let raw: Vec<u8> = (0..KEY_LEN as u8).collect();
        let key = CipherKey::from_raw(&raw).unwrap();
        assert_eq!(key.export_raw().unwrap().as_slice(), raw.as_slice());
    }

    #[test]
    fn wrong_length_material_is_rejected() {
        for len in [0usize, 16, 31, 33, 64] {
            let raw = vec![0u8; len];
            match CipherKey::from_raw(&raw) {
                Err(KeyError::InvalidLength(got)) => assert_eq!(got, len),
                other => panic!("expected InvalidLength for {len}, got {other:?}"),
            }
        }
    }

    #[test]
    fn non_extractable_keys_refuse_export() {
        let raw = [7u8; KEY_LEN];
        let key = CipherKey::from_raw_non_extractable(&raw).unwrap();
        assert!(!key.is_extractable());
        assert!(matches!(key.export_raw(), Err(KeyError::NotExtractable)));
        // The cipher path still sees the material.
        assert_eq!(key.material(), &raw);
    }

    #[test]
    fn clone_preserves_material_and_extractability() {
        let provider = RustCryptoProvider;
        let key = CipherKey::generate(&provider);
        let copy = key.clone();
        assert_eq!(key.export_raw().unwrap(), copy.export_raw().unwrap());
        assert_eq!(key.is_extractable(), copy.is_extractable());
    }

    #[test]
    fn debug_output_redacts_material() {
        let key = CipherKey::from_raw(&[0xAB; KEY_LEN]).unwrap();
        let rendered = format!("{key:?}");
        assert_eq!(rendered, "CipherKey([REDACTED])");
        assert!(!rendered.contains("AB"));
    }

    #[test]
    fn algorithm_and_usages_are_fixed() {
        let key = CipherKey::from_raw(&[1u8; KEY_LEN]).unwrap();
        assert_eq!(key.algorithm(), AES_CBC_256);
        assert_eq!(key.algorithm().name, "AES-CBC");
        assert_eq!(key.algorithm().key_bits, 256);
        assert_eq!(key.usages(), &[KeyUsage::Encrypt, KeyUsage::Decrypt]);
    }
}
