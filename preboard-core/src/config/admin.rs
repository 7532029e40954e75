//! Admin API credentials.

use argon2::{Argon2, PasswordHash, PasswordVerifier};

/// Admin configuration holding the argon2 hash of the admin secret.
#[derive(Clone)]
pub struct AdminConfig {
    pub secret_hash: String,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("secret_hash", &"<redacted>")
            .finish()
    }
}

impl AdminConfig {
    pub fn new(secret_hash: String) -> Self {
        Self { secret_hash }
    }

    /// Verify a plaintext secret from the `Preboard-Admin-Authorization` header.
    pub fn verify_secret(&self, plaintext: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(&self.secret_hash) else {
            return false;
        };

        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::{
        PasswordHasher,
        password_hash::{SaltString, rand_core::OsRng},
    };

    #[test]
    fn test_verify_secret() {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(b"ops-dashboard-secret", &salt)
            .unwrap()
            .to_string();

        let admin = AdminConfig::new(hash);
        assert!(admin.verify_secret("ops-dashboard-secret"));
        assert!(!admin.verify_secret("wrong"));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        let admin = AdminConfig::new("plaintext".into());
        assert!(!admin.verify_secret("plaintext"));
    }
}
