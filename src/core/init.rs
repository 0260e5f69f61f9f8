use anyhow::Result;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use directories::BaseDirs;
use std::path::{Path, PathBuf};
use zeroize::Zeroize;

/// Environment variable overriding the vault directory.
/// Used by scripts and tests to keep vaults isolated.
pub const VAULT_HOME_ENV_VAR: &str = "TOKEN_LOCKER_HOME";

/// An opened vault: the directory holding the vault files and the master
/// key derived from the passphrase. The key is zeroized on drop.
pub struct Vault {
    base_dir: PathBuf,
    master_key: Option<Vec<u8>>,
}

impl Vault {
    /// Resolves the vault directory, creating it if needed.
    pub fn vault_dir() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var(VAULT_HOME_ENV_VAR) {
            let vault_dir = PathBuf::from(dir);
            std::fs::create_dir_all(&vault_dir)?;
            return Ok(vault_dir);
        }

        let base_dirs = BaseDirs::new()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine user directories"))?;
        let config_dir = base_dirs.config_dir();

        #[cfg(unix)]
        let sub_dir = ".token-locker";
        #[cfg(not(unix))]
        let sub_dir = "token-locker";

        let vault_dir = config_dir.join(sub_dir);
        std::fs::create_dir_all(&vault_dir)?;
        Ok(vault_dir)
    }

    /// Whether a vault already exists at the resolved directory.
    pub fn is_initialized() -> Result<bool> {
        Ok(Self::vault_dir()?.join("salt").exists())
    }

    /// Initializes or opens the vault with the provided passphrase.
    pub fn init_or_load_with_passphrase(passphrase: &str) -> Result<Self> {
        let vault_dir = Self::vault_dir()?;

        let salt_path = vault_dir.join("salt");
        let master_key = if salt_path.exists() {
            Self::load_key(&vault_dir, passphrase)?
        } else {
            Self::init_key(&vault_dir, passphrase)?
        };

        Ok(Self {
            base_dir: vault_dir,
            master_key: Some(master_key),
        })
    }

    /// First run: generates a salt, stores the passphrase verifier, derives the key.
    fn init_key(vault_dir: &Path, passphrase: &str) -> Result<Vec<u8>> {
        let salt = SaltString::generate(&mut OsRng);
        std::fs::write(vault_dir.join("salt"), salt.as_str())?;

        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(passphrase.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Hash error: {}", e))?
            .to_string();
        std::fs::write(vault_dir.join("hash"), &hash)?;

        let mut key = [0u8; 32];
        let mut salt_bytes = [0u8; 16];
        salt.decode_b64(&mut salt_bytes)
            .map_err(|e| anyhow::anyhow!("Salt decoding error: {}", e))?;
        argon2
            .hash_password_into(passphrase.as_bytes(), &salt_bytes, &mut key)
            .map_err(|e| anyhow::anyhow!("Key derivation error: {}", e))?;

        Ok(key.to_vec())
    }

    /// Later runs: reads the salt, verifies the passphrase, derives the key.
    fn load_key(vault_dir: &Path, passphrase: &str) -> Result<Vec<u8>> {
        let salt_str = std::fs::read_to_string(vault_dir.join("salt"))?;
        let salt =
            SaltString::from_b64(&salt_str).map_err(|e| anyhow::anyhow!("Salt error: {}", e))?;

        let hash_str = std::fs::read_to_string(vault_dir.join("hash"))?;
        let expected_hash =
            PasswordHash::new(&hash_str).map_err(|e| anyhow::anyhow!("Hash error: {}", e))?;

        let argon2 = Argon2::default();
        argon2
            .verify_password(passphrase.as_bytes(), &expected_hash)
            .map_err(|e| anyhow::anyhow!("Incorrect passphrase: {}", e))?;

        let mut salt_bytes = [0u8; 16];
        salt.decode_b64(&mut salt_bytes)
            .map_err(|e| anyhow::anyhow!("Salt decoding error: {}", e))?;
        let mut key = [0u8; 32];
        argon2
            .hash_password_into(passphrase.as_bytes(), &salt_bytes, &mut key)
            .map_err(|e| anyhow::anyhow!("Key derivation error: {}", e))?;

        Ok(key.to_vec())
    }

    /// Returns the master key for sealing/opening envelopes (use temporarily).
    pub fn master_key(&self) -> Option<&[u8]> {
        self.master_key.as_deref()
    }

    /// Returns the vault base directory.
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }
}

impl Drop for Vault {
    fn drop(&mut self) {
        if let Some(ref mut key) = self.master_key {
            key.zeroize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_then_load_derives_same_key() {
        let dir = TempDir::new().unwrap();

        let first = Vault::init_key(dir.path(), "my passphrase").unwrap();
        let second = Vault::load_key(dir.path(), "my passphrase").unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 32);
    }

    #[test]
    fn test_wrong_passphrase_rejected() {
        let dir = TempDir::new().unwrap();

        Vault::init_key(dir.path(), "my passphrase").unwrap();
        let result = Vault::load_key(dir.path(), "not my passphrase");

        assert!(result.is_err(), "wrong passphrase must not derive a key");
    }

    #[test]
    fn test_init_writes_salt_and_hash() {
        let dir = TempDir::new().unwrap();

        Vault::init_key(dir.path(), "my passphrase").unwrap();

        assert!(dir.path().join("salt").exists());
        assert!(dir.path().join("hash").exists());
    }
}
