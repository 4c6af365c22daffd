use crate::config::Config;
use argon2::password_hash::rand_core::{OsRng, RngCore};
use argon2::password_hash::{Error, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Params, Version};
use argon2::{Argon2, Error as ArgonError};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Mac, SimpleHmac};

/// Takes a plaintext `password` and hashes it using a cryptographically secure,
/// memory-hard hash: Argon2id. A randomly generated `salt` is mixed in with the
/// hash to protect against rainbow table attacks.
pub fn hash_password(config: &Config, password: &str, salt: &SaltString) -> Result<String, Error> {
    let argon_context = create_argon_context(config)?;
    let password_hash = argon_context.hash_password(password.as_bytes(), salt)?;
    Ok(password_hash.to_string())
}

/// Returns [`Ok`] if `password` matches `password_hash`.
pub fn is_valid_password(config: &Config, password_hash: &str, password: &str) -> Result<(), Error> {
    let argon_context = create_argon_context(config)?;
    PasswordHash::new(password_hash)
        .and_then(|parsed_hash| argon_context.verify_password(password.as_bytes(), &parsed_hash))
}

/// Computes the token that must accompany a password reset for a user with the given `password_salt`.
/// The salt changes whenever the password does, so a token can only be used once.
pub fn reset_token(config: &Config, password_salt: &str) -> String {
    let mut mac = Hmac::new_from_slice(config.password_secret.as_bytes()).expect("HMAC should take key of any size");
    mac.update(password_salt.as_bytes());
    URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}

/// Generates a random alphanumeric password of `TEMPORARY_PASSWORD_LENGTH` characters.
pub fn temporary_password() -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789";
    (0..TEMPORARY_PASSWORD_LENGTH)
        .map(|_| ALPHABET[OsRng.next_u32() as usize % ALPHABET.len()] as char)
        .collect()
}

const TEMPORARY_PASSWORD_LENGTH: usize = 16;

type Hmac = SimpleHmac<blake3::Hasher>;

fn create_argon_context(config: &Config) -> Result<Argon2<'_>, ArgonError> {
    Argon2::new_with_secret(
        config.password_secret.as_bytes(),
        Algorithm::default(),
        Version::default(),
        Params::default(),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config;
    use crate::test::*;

    #[test]
    fn hash_password() {
        let test_config = config::test_config(None);
        let salt = SaltString::generate(&mut OsRng);
        let hash = super::hash_password(&test_config, TEST_PASSWORD, &salt).unwrap();
        assert!(is_valid_password(&test_config, &hash, TEST_PASSWORD).is_ok());
        assert!(is_valid_password(&test_config, &hash, "wrong_password").is_err());

        let mut other_config = config::test_config(None);
        other_config.password_secret = String::from("another_secret");
        assert!(is_valid_password(&other_config, &hash, TEST_PASSWORD).is_err());
    }

    #[test]
    fn reset_token() {
        let test_config = config::test_config(None);
        let token = super::reset_token(&test_config, "first_salt");
        assert_eq!(token, super::reset_token(&test_config, "first_salt"));
        assert_ne!(token, super::reset_token(&test_config, "second_salt"));
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn temporary_password() {
        let password = super::temporary_password();
        assert_eq!(password.len(), TEMPORARY_PASSWORD_LENGTH);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(password, super::temporary_password());
    }
}
