//! Subcommand implementations.

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use textcrypt::{CipherEngine, Codec, PortableBundle};
use tracing::info;

/// Encrypt `text` (or stdin) and emit the portable bundle as JSON.
pub fn encrypt(text: Option<String>, output: Option<PathBuf>) -> Result<()> {
    let engine = CipherEngine::new();
    let text = match text {
        Some(t) => t,
        None => read_stdin_text()?,
    };

    let bundle = engine.encrypt_message(&text).context("encryption failed")?;
    let portable = engine
        .export_bundle(&bundle)
        .context("bundle export failed")?;
    let json = serde_json::to_string_pretty(&portable)?;

    match output {
        Some(path) => {
            fs::write(&path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "bundle written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Rebuild a bundle from JSON (file or stdin) or from the three field
/// flags, decrypt it, and print the message.
pub fn decrypt(
    bundle: Option<PathBuf>,
    key: Option<String>,
    iv: Option<String>,
    ciphertext: Option<String>,
) -> Result<()> {
    let engine = CipherEngine::new();

    let portable = match (bundle, key, iv, ciphertext) {
        (None, Some(key), Some(iv), Some(ciphertext)) => PortableBundle {
            key,
            iv,
            ciphertext,
        },
        (Some(path), None, None, None) => {
            let json = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("{} is not valid bundle JSON", path.display()))?
        }
        (None, None, None, None) => {
            let json = read_stdin_text()?;
            serde_json::from_str(&json).context("stdin is not valid bundle JSON")?
        }
        _ => bail!("pass either --bundle (or bundle JSON on stdin) or all of --key, --iv and --ciphertext"),
    };

    let rebuilt = engine
        .import_bundle(&portable)
        .context("bundle fields failed to decode")?;
    let message = engine
        .decrypt_message(&rebuilt)
        .context("decryption failed")?;
    println!("{message}");
    Ok(())
}

/// Base64-encode raw bytes from `input` (or stdin) onto stdout.
pub fn encode(input: Option<PathBuf>) -> Result<()> {
    let bytes = match input {
        Some(path) => {
            fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?
        }
        None => read_stdin_bytes()?,
    };
    let codec = Codec::standard();
    println!("{}", codec.encode(&bytes));
    Ok(())
}

/// Decode base64 text back into raw bytes on stdout.
pub fn decode(text: Option<String>) -> Result<()> {
    let text = match text {
        Some(t) => t,
        None => read_stdin_text()?,
    };
    let codec = Codec::standard();
    let bytes = codec
        .decode(text.trim())
        .context("input is not valid base64")?;
    io::stdout()
        .write_all(&bytes)
        .context("failed to write decoded bytes")?;
    Ok(())
}

fn read_stdin_text() -> Result<String> {
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read stdin")?;
    Ok(buf)
}

fn read_stdin_bytes() -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    io::stdin()
        .read_to_end(&mut buf)
        .context("failed to read stdin")?;
    Ok(buf)
}
