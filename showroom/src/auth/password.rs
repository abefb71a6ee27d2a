//! Password hashing and verification.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use once_cell::sync::OnceCell;

use crate::{config::PasswordConfig, errors::Error};

/// Argon2 hashing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Params {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Argon2Params {
    fn to_argon2(self) -> Result<Argon2<'static>, Error> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None).map_err(|e| Error::Internal {
            operation: format!("create argon2 params: {e}"),
        })?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Default for Argon2Params {
    /// Argon2id RFC recommendations
    fn default() -> Self {
        Self {
            memory_kib: 19456, // 19 MB
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl From<&PasswordConfig> for Argon2Params {
    fn from(config: &PasswordConfig) -> Self {
        Self {
            memory_kib: config.argon2_memory_kib,
            iterations: config.argon2_iterations,
            parallelism: config.argon2_parallelism,
        }
    }
}

/// Hash a password with Argon2id.
pub fn hash_password(input: &str, params: Argon2Params) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = params.to_argon2()?;

    let hash = argon2.hash_password(input.as_bytes(), &salt).map_err(|e| Error::Internal {
        operation: format!("hash password: {e}"),
    })?;

    Ok(hash.to_string())
}

/// Verify a password against a stored hash.
///
/// Verification uses the parameters embedded in the hash itself.
pub fn verify_password(input: &str, hash: &str) -> Result<bool, Error> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| Error::Internal {
        operation: format!("parse password hash: {e}"),
    })?;

    Ok(Argon2::default().verify_password(input.as_bytes(), &parsed_hash).is_ok())
}

/// Check a new password against the configured length bounds.
pub fn validate_password_length(input: &str, config: &PasswordConfig) -> Result<(), Error> {
    let length = input.chars().count();
    if length < config.min_length {
        return Err(Error::bad_request(format!("Password must be at least {} characters", config.min_length)));
    }
    if length > config.max_length {
        return Err(Error::bad_request(format!("Password must be no more than {} characters", config.max_length)));
    }
    Ok(())
}

static DUMMY_HASH: OnceCell<String> = OnceCell::new();

/// Burn roughly the time of a real verification when the account does not exist, so that
/// "unknown email" and "wrong password" cost the same. Always returns `false`.
pub fn verify_unknown_account(input: &str, params: Argon2Params) -> Result<bool, Error> {
    let hash = DUMMY_HASH.get_or_try_init(|| hash_password("showroom-unknown-account", params))?;
    verify_password(input, hash)?;
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_params() -> Argon2Params {
        Argon2Params {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn test_password_hashing() {
        let hash = hash_password("test_password_123", fast_params()).unwrap();

        assert!(!hash.is_empty());
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("test_password_123", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_same_input_different_hashes() {
        let hash1 = hash_password("same_password", fast_params()).unwrap();
        let hash2 = hash_password("same_password", fast_params()).unwrap();

        assert_ne!(hash1, hash2);
        assert!(verify_password("same_password", &hash1).unwrap());
        assert!(verify_password("same_password", &hash2).unwrap());
    }

    #[test]
    fn test_invalid_stored_hash_is_an_error() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_unknown_account_never_verifies() {
        assert!(!verify_unknown_account("showroom-unknown-account", fast_params()).unwrap());
        assert!(!verify_unknown_account("other", fast_params()).unwrap());
    }

    #[test]
    fn test_password_length_bounds() {
        let config = PasswordConfig::default();
        assert!(validate_password_length("short", &config).is_err());
        assert!(validate_password_length("long enough", &config).is_ok());
        assert!(validate_password_length(&"x".repeat(config.max_length + 1), &config).is_err());
    }

    #[test]
    fn test_params_from_config() {
        let config = PasswordConfig::default();
        let params = Argon2Params::from(&config);
        assert_eq!(params.memory_kib, config.argon2_memory_kib);
        assert_eq!(params.iterations, config.argon2_iterations);
    }
}
