use clap::{Parser, Subcommand};
use std::path::PathBuf;
use zeroize::Zeroize;

#[derive(Parser)]
#[command(name = "keypeek", version = "0.3.0")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decrypt a keystore and print the private key
    Show {
        /// Keystore JSON file
        #[arg(short, long)]
        source: PathBuf,
        /// Password (use @<filepath> for file, - for stdin, or literal string)
        #[arg(short, long, env = "KEYPEEK_PASSWORD")]
        password: String,
        /// Print bare hex without label or trailing newline
        #[arg(long)]
        raw: bool,
    },
    /// Print keystore metadata without decrypting
    Inspect {
        /// Keystore JSON file
        #[arg(short, long)]
        source: PathBuf,
    },
    /// Check a password against a keystore without printing the key
    Verify {
        /// Keystore JSON file
        #[arg(short, long)]
        source: PathBuf,
        /// Password (use @<filepath> for file, - for stdin, or literal string)
        #[arg(short, long, env = "KEYPEEK_PASSWORD")]
        password: String,
    },
    /// Decrypt a keystore and write the hex key to a file
    Export {
        /// Keystore JSON file
        #[arg(short, long)]
        source: PathBuf,
        /// Password (use @<filepath> for file, - for stdin, or literal string)
        #[arg(short, long, env = "KEYPEEK_PASSWORD")]
        password: String,
        /// Target file path (unencrypted key hex will be written here)
        #[arg(short, long)]
        target: PathBuf,
        /// Force overwrite existing file
        #[arg(long)]
        force: bool,
    },
    /// List keystore files in a directory
    List {
        /// Directory containing keystore JSON files
        #[arg(short, long, default_value = ".")]
        source: PathBuf,
    },
}

/// Memory-safe container for sensitive data that zeros on drop
pub struct SecureBuffer {
    data: Vec<u8>,
}

impl SecureBuffer {
    pub fn new(mut data: Vec<u8>) -> Self {
        // Ensure capacity equals length to prevent leftover data in unused capacity
        data.shrink_to_fit();
        Self { data }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Lowercase hex rendering of the contents
    pub fn to_hex(&self) -> String {
        hex::encode(&self.data)
    }
}

impl Drop for SecureBuffer {
    fn drop(&mut self) {
        // Explicitly zero memory before deallocation
        self.data.zeroize();
    }
}
