use serde::Deserialize;
use std::fs;
use std::path::Path;
use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::errors::KeyfileError;

/// The only envelope version this tool understands
const SUPPORTED_VERSION: u64 = 3;

/// Timestamp embedded in geth keystore filenames (colons replaced by dashes)
const FILENAME_TIMESTAMP: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day]T[hour]-[minute]-[second].[subsecond]Z");

/// A V3 Web3 keystore file
#[derive(Debug, Deserialize)]
pub struct Keyfile {
    /// Encryption envelope (some producers capitalize the key)
    #[serde(alias = "Crypto")]
    pub crypto: CryptoSection,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub version: u64,
}

#[derive(Debug, Deserialize)]
pub struct CryptoSection {
    pub cipher: String,
    pub cipherparams: CipherParams,
    pub ciphertext: String,
    pub kdf: String,
    pub kdfparams: KdfParams,
    pub mac: String,
}

#[derive(Debug, Deserialize)]
pub struct CipherParams {
    pub iv: String,
}

/// KDF parameters; the scrypt and pbkdf2 shapes share dklen and salt
#[derive(Debug, Deserialize)]
pub struct KdfParams {
    pub dklen: u32,
    pub salt: String,
    #[serde(default)]
    pub n: Option<u64>,
    #[serde(default)]
    pub r: Option<u32>,
    #[serde(default)]
    pub p: Option<u32>,
    #[serde(default)]
    pub c: Option<u32>,
    #[serde(default)]
    pub prf: Option<String>,
}

impl Keyfile {
    /// Load and parse a keystore file, rejecting unsupported versions
    pub fn load(path: &Path) -> Result<Self, KeyfileError> {
        if !path.exists() {
            return Err(KeyfileError::InvalidPath(format!(
                "Keystore file not found: {}",
                path.display()
            )));
        }

        let contents = fs::read_to_string(path)?;
        let keyfile: Keyfile = serde_json::from_str(&contents)?;

        if keyfile.version != SUPPORTED_VERSION {
            return Err(KeyfileError::UnsupportedVersion(keyfile.version));
        }

        Ok(keyfile)
    }

    /// Address with 0x prefix, from the JSON body or the geth filename
    pub fn display_address(&self, path: &Path) -> String {
        self.address
            .as_deref()
            .map(normalize_address)
            .or_else(|| filename_address(path))
            .unwrap_or_else(|| "(unknown)".to_string())
    }

    /// One-line KDF description for inspection output
    pub fn kdf_summary(&self) -> String {
        let params = &self.crypto.kdfparams;
        match self.crypto.kdf.as_str() {
            "scrypt" => format!(
                "scrypt (n={}, r={}, p={}, dklen={})",
                params.n.map_or_else(|| "?".to_string(), |v| v.to_string()),
                params.r.map_or_else(|| "?".to_string(), |v| v.to_string()),
                params.p.map_or_else(|| "?".to_string(), |v| v.to_string()),
                params.dklen
            ),
            "pbkdf2" => format!(
                "pbkdf2 (c={}, prf={}, dklen={})",
                params.c.map_or_else(|| "?".to_string(), |v| v.to_string()),
                params.prf.as_deref().unwrap_or("?"),
                params.dklen
            ),
            other => other.to_string(),
        }
    }
}

fn normalize_address(addr: &str) -> String {
    let stripped = addr.strip_prefix("0x").unwrap_or(addr);
    format!("0x{}", stripped.to_lowercase())
}

/// Split a geth-style filename (UTC--<timestamp>--<address>) into its segments
fn filename_segments(path: &Path) -> Option<(String, String)> {
    let name = path.file_name()?.to_str()?;
    let mut parts = name.split("--");
    if parts.next()? != "UTC" {
        return None;
    }
    let timestamp = parts.next()?;
    let address = parts.next()?;
    Some((timestamp.to_string(), address.to_string()))
}

/// Creation time encoded in a geth keystore filename, if present
pub fn filename_created_at(path: &Path) -> Option<OffsetDateTime> {
    let (timestamp, _) = filename_segments(path)?;
    PrimitiveDateTime::parse(&timestamp, FILENAME_TIMESTAMP)
        .ok()
        .map(|dt| dt.assume_utc())
}

/// Address encoded in a geth keystore filename, if present
pub fn filename_address(path: &Path) -> Option<String> {
    let (_, address) = filename_segments(path)?;
    Some(normalize_address(&address))
}

/// RFC 3339 rendering for inspection output
pub fn format_created_at(created: OffsetDateTime) -> String {
    created
        .format(&Rfc3339)
        .unwrap_or_else(|_| created.to_string())
}
