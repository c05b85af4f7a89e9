mod crypto;
mod errors;
mod keyfile;
mod locks;
mod structs;

use errors::KeyfileError;
use keyfile::Keyfile;
use locks::FileLockGuard;
use structs::{Cli, Commands, SecureBuffer};

use clap::Parser;
use secrecy::{ExposeSecret, SecretString};
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::process;

/// Minimal Web3 keystore utility for inspecting encrypted key files
/// and recovering the private keys they hold

/// Main function
fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Show {
            source,
            password,
            raw,
        } => show_private_key(&source, &password, raw),
        Commands::Inspect { source } => inspect_keyfile(&source),
        Commands::Verify { source, password } => verify_keyfile_password(&source, &password),
        Commands::Export {
            source,
            password,
            target,
            force,
        } => export_private_key(&source, &password, &target, force),
        Commands::List { source } => list_keyfiles(&source),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Decrypt a keystore and print the private key to stdout
fn show_private_key(source: &Path, password: &str, raw: bool) -> Result<(), KeyfileError> {
    let key = recover_from_file(source, password)?;

    if raw {
        // Write to stdout without trailing newline (for scripts)
        io::stdout().write_all(key.to_hex().as_bytes())?;
        io::stdout().flush()?;
    } else {
        println!("Private Key: {}", key.to_hex());
    }

    Ok(())
}

/// Print keystore metadata; no password required
fn inspect_keyfile(source: &Path) -> Result<(), KeyfileError> {
    let keyfile = Keyfile::load(source)?;

    println!("Keystore:  {}", source.display());
    println!("Address:   {}", keyfile.display_address(source));
    println!("Version:   {}", keyfile.version);
    if let Some(id) = &keyfile.id {
        println!("Id:        {}", id);
    }
    println!("Cipher:    {}", keyfile.crypto.cipher);
    println!("KDF:       {}", keyfile.kdf_summary());
    if let Some(created) = keyfile::filename_created_at(source) {
        println!("Created:   {}", keyfile::format_created_at(created));
    }

    Ok(())
}

/// Check a password against a keystore's MAC without printing key material
fn verify_keyfile_password(source: &Path, password: &str) -> Result<(), KeyfileError> {
    let keyfile = Keyfile::load(source)?;
    let password = read_password_input(password)?;

    crypto::verify_password(&keyfile, password.expose_secret().as_bytes())?;

    println!("Password OK for {}", source.display());
    Ok(())
}

/// Decrypt a keystore and write the hex key to target with overwrite protection
fn export_private_key(
    source: &Path,
    password: &str,
    target: &Path,
    force: bool,
) -> Result<(), KeyfileError> {
    // Check for existing file unless force is specified
    if !force && target.exists() {
        return Err(KeyfileError::FileExists(format!(
            "Output file {} already exists. Use --force to overwrite",
            target.display()
        )));
    }

    // Ensure target directory exists with proper permissions
    let parent_dir = target
        .parent()
        .ok_or_else(|| KeyfileError::Parse("Unable to get target parent directory".to_string()))?;
    if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
        fs::create_dir_all(parent_dir)?;
        set_file_permissions(parent_dir, 0o700)?;
    }

    let key = recover_from_file(source, password)?;

    let _lock = FileLockGuard::new(target)?;

    // Atomic write to prevent partial files
    let temp_path = target.with_extension("tmp");
    fs::write(&temp_path, key.to_hex().as_bytes())?;
    set_file_permissions(&temp_path, 0o600)?;
    fs::rename(&temp_path, target)?;

    println!(
        "Exported {} bytes of key material to {}",
        key.len(),
        target.display()
    );
    Ok(())
}

/// List keystore files in a directory with address and KDF summary
fn list_keyfiles(dir: &Path) -> Result<(), KeyfileError> {
    if !dir.is_dir() {
        return Err(KeyfileError::InvalidPath(format!(
            "Not a directory: {}",
            dir.display()
        )));
    }

    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    paths.sort();

    let mut count = 0;
    for path in paths {
        // Geth keystore files carry no extension, so attempt-parse everything
        let keyfile = match Keyfile::load(&path) {
            Ok(keyfile) => keyfile,
            Err(_) => continue,
        };

        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("(invalid name)");
        println!(
            "{}  {}  {}",
            keyfile.display_address(&path),
            keyfile.kdf_summary(),
            name
        );
        count += 1;
    }

    if count == 0 {
        eprintln!("Warning: No keystore files found in {}", dir.display());
    }

    Ok(())
}

/// Load a keystore file and decrypt its private key
fn recover_from_file(source: &Path, password_input: &str) -> Result<SecureBuffer, KeyfileError> {
    let keyfile = Keyfile::load(source)?;
    let password = read_password_input(password_input)?;
    crypto::recover_private_key(&keyfile, password.expose_secret().as_bytes())
}

/// Resolve a password argument: - for stdin, @<filepath> for a file, else literal.
/// A bare path is never treated as a file; passwords can look like filenames.
fn read_password_input(input: &str) -> Result<SecretString, KeyfileError> {
    if input == "-" {
        let mut content = String::new();
        io::stdin().read_to_string(&mut content)?;
        if content.ends_with('\n') {
            content.pop();
        }
        Ok(SecretString::from(content))
    } else if let Some(filename) = input.strip_prefix('@') {
        if !Path::new(filename).exists() {
            return Err(KeyfileError::InvalidPath(format!(
                "Password file not found: {}",
                filename
            )));
        }
        let mut content = fs::read_to_string(filename)?;
        // Remove trailing newline for consistency
        if content.ends_with('\n') {
            content.pop();
        }
        Ok(SecretString::from(content))
    } else {
        Ok(SecretString::from(input.to_string()))
    }
}

/// Set file permissions (Unix-only)
fn set_file_permissions(path: &Path, mode: u32) -> Result<(), KeyfileError> {
    use std::os::unix::fs::PermissionsExt;
    let permissions = std::fs::Permissions::from_mode(mode);
    fs::set_permissions(path, permissions)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    // Canonical Web3 secret-storage pbkdf2 vector, password "testpassword"
    const TEST_SECRET: &str = "7a28b5ba57c53603b0b07b56bba752f7784bf506fa95edc395f5cf6c7514fe9d";

    const PBKDF2_KEYFILE: &str = r#"{
        "crypto": {
            "cipher": "aes-128-ctr",
            "cipherparams": {"iv": "6087dab2f9fdbbfaddc31a909735c1e6"},
            "ciphertext": "5318b4d5bcd28de64ee5559e671353e16f075ecae9f99c7a79a38af5f869aa46",
            "kdf": "pbkdf2",
            "kdfparams": {
                "c": 262144,
                "dklen": 32,
                "prf": "hmac-sha256",
                "salt": "ae3cd4e7013836a3df6bd7241b12db061dbe2c6785853cce422d148a624ce0bd"
            },
            "mac": "517ead924a9d0dc3124507e3393d175ce3ff7c1e96529c6c555ce9e51205e9b2"
        },
        "id": "3198bc9c-6672-5ab3-d995-4942343ae5b6",
        "version": 3
    }"#;

    fn write_keystore(dir: &Path) -> std::path::PathBuf {
        let path =
            dir.join("UTC--2025-02-10T16-32-59.510001000Z--6603b5d2a0a6f7d4e1f75cb83fb9d0adc4ca21ad");
        fs::write(&path, PBKDF2_KEYFILE).unwrap();
        path
    }

    #[test]
    fn test_recover_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let keystore = write_keystore(temp_dir.path());

        let key = recover_from_file(&keystore, "testpassword").unwrap();
        assert_eq!(key.to_hex(), TEST_SECRET);
    }

    #[test]
    fn test_recover_wrong_password() {
        let temp_dir = TempDir::new().unwrap();
        let keystore = write_keystore(temp_dir.path());

        let result = recover_from_file(&keystore, "wrongpassword");
        assert!(matches!(result, Err(KeyfileError::MacMismatch)));
    }

    #[test]
    fn test_password_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let keystore = write_keystore(temp_dir.path());

        let password_file = temp_dir.path().join("password.txt");
        fs::write(&password_file, "testpassword\n").unwrap();

        let key =
            recover_from_file(&keystore, &format!("@{}", password_file.display())).unwrap();
        assert_eq!(key.to_hex(), TEST_SECRET);
    }

    #[test]
    fn test_password_file_missing() {
        let result = read_password_input("@/nonexistent/password.txt");
        assert!(matches!(result.unwrap_err(), KeyfileError::InvalidPath(_)));
    }

    #[test]
    fn test_password_literal_even_if_path_exists() {
        let temp_dir = TempDir::new().unwrap();
        let decoy = temp_dir.path().join("hunter2");
        fs::write(&decoy, "not-the-password").unwrap();

        let password = read_password_input(decoy.to_str().unwrap()).unwrap();
        assert_eq!(password.expose_secret(), decoy.to_str().unwrap());
    }

    #[test]
    fn test_export_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let keystore = write_keystore(temp_dir.path());
        let target = temp_dir.path().join("exported.key");

        export_private_key(&keystore, "testpassword", &target, false).unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), TEST_SECRET);

        let metadata = fs::metadata(&target).unwrap();
        assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn test_export_no_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let keystore = write_keystore(temp_dir.path());
        let target = temp_dir.path().join("exported.key");

        export_private_key(&keystore, "testpassword", &target, false).unwrap();

        let result = export_private_key(&keystore, "testpassword", &target, false);
        assert!(matches!(result.unwrap_err(), KeyfileError::FileExists(_)));

        // Force should succeed
        export_private_key(&keystore, "testpassword", &target, true).unwrap();
    }

    #[test]
    fn test_export_creates_parent_dir() {
        let temp_dir = TempDir::new().unwrap();
        let keystore = write_keystore(temp_dir.path());
        let target = temp_dir.path().join("nested/dir/exported.key");

        export_private_key(&keystore, "testpassword", &target, false).unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), TEST_SECRET);

        let dir_metadata = fs::metadata(temp_dir.path().join("nested/dir")).unwrap();
        assert_eq!(dir_metadata.permissions().mode() & 0o777, 0o700);
    }

    #[test]
    fn test_verify_password_command() {
        let temp_dir = TempDir::new().unwrap();
        let keystore = write_keystore(temp_dir.path());

        verify_keyfile_password(&keystore, "testpassword").unwrap();

        let result = verify_keyfile_password(&keystore, "wrongpassword");
        assert!(matches!(result.unwrap_err(), KeyfileError::MacMismatch));
    }

    #[test]
    fn test_list_skips_non_keystores() {
        let temp_dir = TempDir::new().unwrap();
        write_keystore(temp_dir.path());
        fs::write(temp_dir.path().join("notes.txt"), "not a keystore").unwrap();

        list_keyfiles(temp_dir.path()).unwrap();
    }

    #[test]
    fn test_list_rejects_non_directory() {
        let temp_dir = TempDir::new().unwrap();
        let keystore = write_keystore(temp_dir.path());

        let result = list_keyfiles(&keystore);
        assert!(matches!(result.unwrap_err(), KeyfileError::InvalidPath(_)));
    }

    #[test]
    fn test_inspect_keyfile() {
        let temp_dir = TempDir::new().unwrap();
        let keystore = write_keystore(temp_dir.path());

        inspect_keyfile(&keystore).unwrap();
    }
}
