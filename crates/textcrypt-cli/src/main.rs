//! `textcrypt` command-line binary entry point.
//!
//! The library hands back a cipher bundle of three binary fields (key,
//! IV, ciphertext); this binary is the transport layer around it. It
//! renders bundles as JSON documents of base64 fields on stdout and
//! rebuilds them from JSON or from individual field flags.
//!
//! Startup sequence:
//! 1. Parse the command line.
//! 2. Initialise logging on stderr, keeping stdout for payloads.
//! 3. Dispatch to the subcommand implementation.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "textcrypt", version, about = "Encrypt short text messages into portable bundles")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encrypt a message under a fresh key and print the portable bundle
    Encrypt {
        /// Message text; read from stdin when omitted
        text: Option<String>,

        /// Write the bundle JSON to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decrypt a portable bundle and print the message
    Decrypt {
        /// Bundle JSON file; read from stdin when no field flags are given
        #[arg(short, long)]
        bundle: Option<PathBuf>,

        /// Key field (base64), used together with --iv and --ciphertext
        #[arg(long)]
        key: Option<String>,

        /// IV field (base64)
        #[arg(long)]
        iv: Option<String>,

        /// Ciphertext field (base64)
        #[arg(long)]
        ciphertext: Option<String>,
    },

    /// Base64-encode raw bytes from a file or stdin
    Encode {
        /// Input file; stdin when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Decode base64 text back to raw bytes on stdout
    Decode {
        /// Base64 text; read from stdin when omitted
        text: Option<String>,
    },
}

fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Command line
    // -----------------------------------------------------------------------
    let cli = Cli::parse();

    // -----------------------------------------------------------------------
    // 2. Telemetry on stderr, stdout stays a clean payload channel
    // -----------------------------------------------------------------------
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise tracing subscriber: {e}"))?;

    // -----------------------------------------------------------------------
    // 3. Dispatch
    // -----------------------------------------------------------------------
    match cli.command {
        Command::Encrypt { text, output } => commands::encrypt(text, output),
        Command::Decrypt {
            bundle,
            key,
            iv,
            ciphertext,
        } => commands::decrypt(bundle, key, iv, ciphertext),
        Command::Encode { input } => commands::encode(input),
        Command::Decode { text } => commands::decode(text),
    }
}
