use aes::cipher::{KeyIvInit, StreamCipher};
use pbkdf2::pbkdf2_hmac;
use rust_scrypt::ScryptParams;
use sha2::Sha256;
use sha3::{Digest, Keccak256};

use crate::errors::KeyfileError;
use crate::keyfile::{CryptoSection, Keyfile};
use crate::structs::SecureBuffer;

type Aes128Ctr = ctr::Ctr128BE<aes::Aes128>;

/// Only cipher the V3 envelope ever uses
const SUPPORTED_CIPHER: &str = "aes-128-ctr";

/// The derived key is split: first half encrypts, second half authenticates
const MIN_DERIVED_KEY_LEN: usize = 32;

/// Cap on dklen so a hostile keystore cannot request a huge derivation
const MAX_DERIVED_KEY_LEN: usize = 1024;

/// Decrypt the private key held in a keystore.
///
/// Derives the decryption key from the password per the keystore's KDF
/// parameters, checks the keccak-256 MAC, then strips the AES-128-CTR
/// keystream. Returns the raw key bytes in a zero-on-drop buffer.
pub fn recover_private_key(
    keyfile: &Keyfile,
    password: &[u8],
) -> Result<SecureBuffer, KeyfileError> {
    let crypto = &keyfile.crypto;

    if crypto.cipher != SUPPORTED_CIPHER {
        return Err(KeyfileError::UnsupportedCipher(crypto.cipher.clone()));
    }

    let derived = derive_key(password, crypto)?;
    let ciphertext = hex::decode(&crypto.ciphertext)?;
    verify_mac(derived.as_slice(), &ciphertext, &crypto.mac)?;

    let iv = hex::decode(&crypto.cipherparams.iv)?;
    let mut cipher = Aes128Ctr::new_from_slices(&derived.as_slice()[..16], &iv)
        .map_err(|e| KeyfileError::Parse(format!("Invalid cipher key/IV length: {}", e)))?;

    let mut plaintext = ciphertext;
    cipher.apply_keystream(&mut plaintext);

    Ok(SecureBuffer::new(plaintext))
}

/// Check a password against a keystore without touching the ciphertext
pub fn verify_password(keyfile: &Keyfile, password: &[u8]) -> Result<(), KeyfileError> {
    let crypto = &keyfile.crypto;
    let derived = derive_key(password, crypto)?;
    let ciphertext = hex::decode(&crypto.ciphertext)?;
    verify_mac(derived.as_slice(), &ciphertext, &crypto.mac)
}

/// Run the keystore's KDF over the password
fn derive_key(password: &[u8], crypto: &CryptoSection) -> Result<SecureBuffer, KeyfileError> {
    let params = &crypto.kdfparams;
    let salt = hex::decode(&params.salt)?;

    let dklen = params.dklen as usize;
    if !(MIN_DERIVED_KEY_LEN..=MAX_DERIVED_KEY_LEN).contains(&dklen) {
        return Err(KeyfileError::Kdf(format!(
            "dklen must be between {} and {}, got {}",
            MIN_DERIVED_KEY_LEN, MAX_DERIVED_KEY_LEN, dklen
        )));
    }

    let mut derived = vec![0u8; dklen];

    match crypto.kdf.as_str() {
        "scrypt" => {
            let n = require(params.n, "n")?;
            let r = require(params.r, "r")?;
            let p = require(params.p, "p")?;

            if n < 2 || !n.is_power_of_two() {
                return Err(KeyfileError::Kdf(format!(
                    "scrypt n must be a power of two greater than one, got {}",
                    n
                )));
            }
            if r == 0 || p == 0 || (r as u64) * (p as u64) >= (1 << 30) {
                return Err(KeyfileError::Kdf(format!(
                    "Invalid scrypt parameters: r={}, p={}",
                    r, p
                )));
            }

            // Keystores produced by Ethereum tooling sit outside the RFC 7914
            // n < 2^(128*r/8) bound, so the backend must not enforce it
            rust_scrypt::scrypt(password, &salt, &ScryptParams { n, r, p }, &mut derived);
        }
        "pbkdf2" => {
            let rounds = require(params.c, "c")?;
            if rounds == 0 {
                return Err(KeyfileError::Kdf("pbkdf2 c must be nonzero".to_string()));
            }

            // hmac-sha256 is the only PRF the format ever specifies
            match params.prf.as_deref() {
                Some("hmac-sha256") | None => {}
                Some(other) => {
                    return Err(KeyfileError::Kdf(format!("Unsupported prf: {}", other)));
                }
            }

            pbkdf2_hmac::<Sha256>(password, &salt, rounds, &mut derived);
        }
        other => {
            return Err(KeyfileError::Kdf(format!("Unsupported kdf: {}", other)));
        }
    }

    Ok(SecureBuffer::new(derived))
}

fn require<T: Copy>(value: Option<T>, name: &str) -> Result<T, KeyfileError> {
    value.ok_or_else(|| KeyfileError::Kdf(format!("Missing kdf parameter: {}", name)))
}

/// MAC is keccak-256 over the second half of the derived key and the ciphertext
fn verify_mac(derived: &[u8], ciphertext: &[u8], mac_hex: &str) -> Result<(), KeyfileError> {
    let expected = hex::decode(mac_hex)?;

    let mut hasher = Keccak256::new();
    hasher.update(&derived[16..32]);
    hasher.update(ciphertext);
    let actual = hasher.finalize();

    if actual.as_slice() != expected.as_slice() {
        return Err(KeyfileError::MacMismatch);
    }
    Ok(())
}
