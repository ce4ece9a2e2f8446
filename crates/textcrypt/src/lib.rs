//! AES-256-CBC text message encryption with portable base64 bundles.
//!
//! Each message is sealed under its own fresh key and IV; the result is a
//! [`CipherBundle`] holding exactly what decryption needs. Bundles and
//! keys render to plain base64 text so they survive any channel that
//! carries strings, and rebuild losslessly on the other side.
//!
//! ```
//! use textcrypt::CipherEngine;
//!
//! let engine = CipherEngine::new();
//! let bundle = engine.encrypt_message("attack at dawn")?;
//!
//! // Move the bundle anywhere text survives...
//! let portable = engine.export_bundle(&bundle)?;
//!
//! // ...and rebuild it to decrypt.
//! let restored = engine.import_bundle(&portable)?;
//! assert_eq!(engine.decrypt_message(&restored)?, "attack at dawn");
//! # Ok::<(), textcrypt::CipherError>(())
//! ```
//!
//! The cipher backend and the base64 engine are injected at construction
//! (see [`CipherEngine::with_parts`]); environments without a usable
//! backend are reported through [`CipherEngine::is_supported`] instead of
//! failing deep inside an operation.

pub mod codec;
pub mod engine;
pub mod key;
pub mod provider;

pub use codec::{Codec, CodecError};
pub use engine::{message_encoding, CipherBundle, CipherEngine, CipherError, PortableBundle};
pub use key::{Algorithm, CipherKey, KeyError, KeyUsage, AES_CBC_256};
pub use provider::{CryptoProvider, ProviderError, RustCryptoProvider, IV_LEN, KEY_LEN};
