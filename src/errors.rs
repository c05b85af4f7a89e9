use std::io;

#[derive(Debug)]
pub enum KeyfileError {
    Io(io::Error),
    Json(serde_json::Error),
    Hex(hex::FromHexError),
    Kdf(String),
    MacMismatch,
    UnsupportedCipher(String),
    UnsupportedVersion(u64),
    Parse(String),
    InvalidPath(String),
    FileExists(String),
    Lock(String),
}

impl From<io::Error> for KeyfileError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for KeyfileError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl From<hex::FromHexError> for KeyfileError {
    fn from(err: hex::FromHexError) -> Self {
        Self::Hex(err)
    }
}

impl std::fmt::Display for KeyfileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Json(e) => write!(f, "Malformed keystore JSON: {}", e),
            Self::Hex(e) => write!(f, "Invalid hex in keystore: {}", e),
            Self::Kdf(msg) => write!(f, "KDF error: {}", msg),
            Self::MacMismatch => write!(f, "MAC mismatch (wrong password or corrupted keystore)"),
            Self::UnsupportedCipher(c) => write!(f, "Unsupported cipher: {}", c),
            Self::UnsupportedVersion(v) => write!(f, "Unsupported keystore version: {}", v),
            Self::Parse(msg) => write!(f, "Parse error: {}", msg),
            Self::InvalidPath(msg) => write!(f, "Invalid path: {}", msg),
            Self::FileExists(msg) => write!(f, "File exists: {}", msg),
            Self::Lock(msg) => write!(f, "Lock error: {}", msg),
        }
    }
}

impl std::error::Error for KeyfileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Hex(e) => Some(e),
            _ => None,
        }
    }
}
