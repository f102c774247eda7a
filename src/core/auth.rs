use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::core::error::ServiceError;

#[cfg(not(test))]
const PBKDF2_ROUNDS: u32 = 100_000;
#[cfg(test)]
const PBKDF2_ROUNDS: u32 = 1_000;

const SALT_LENGTH: usize = 16;
const HASH_LENGTH: usize = 32;
const SCHEME: &str = "pbkdf2_sha256";

/// Hash a password as `pbkdf2_sha256$<rounds>$<salt hex>$<hash hex>`
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    let hash = derive(password, &salt, PBKDF2_ROUNDS);
    format!("{}${}${}${}", SCHEME, PBKDF2_ROUNDS, hex::encode(salt), hex::encode(hash))
}

/// Check a password against a stored hash. Malformed hashes never verify.
pub fn verify_password(password: &str, encoded: &str) -> bool {
    let parts: Vec<&str> = encoded.split('$').collect();
    if parts.len() != 4 || parts[0] != SCHEME {
        return false;
    }
    let rounds: u32 = match parts[1].parse() {
        Ok(r) if r > 0 => r,
        _ => return false,
    };
    let (salt, expected) = match (hex::decode(parts[2]), hex::decode(parts[3])) {
        (Ok(salt), Ok(expected)) if expected.len() == HASH_LENGTH => (salt, expected),
        _ => return false,
    };

    let actual = derive(password, &salt, rounds);
    actual[..].ct_eq(&expected[..]).into()
}

/// [`hash_password`] on the blocking pool. Call it without holding the database lock.
pub async fn hash_password_blocking(password: String) -> Result<String, ServiceError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ServiceError::Internal(format!("password hashing failed: {}", e)))
}

/// [`verify_password`] on the blocking pool
pub async fn verify_password_blocking(password: String, encoded: String) -> Result<bool, ServiceError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &encoded))
        .await
        .map_err(|e| ServiceError::Internal(format!("password check failed: {}", e)))
}

/// Random token of `bytes` bytes, hex encoded
pub fn generate_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

fn derive(password: &str, salt: &[u8], rounds: u32) -> [u8; HASH_LENGTH] {
    let mut out = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, rounds, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let encoded = hash_password("s3cret!");
        assert!(encoded.starts_with("pbkdf2_sha256$"));
        assert!(verify_password("s3cret!", &encoded));
        assert!(!verify_password("s3cret", &encoded));
    }

    #[test]
    fn test_same_password_gets_different_salts() {
        assert_ne!(hash_password("abcdef"), hash_password("abcdef"));
    }

    #[test]
    fn test_malformed_hashes_never_verify() {
        assert!(!verify_password("abcdef", ""));
        assert!(!verify_password("abcdef", "plain-text"));
        assert!(!verify_password("abcdef", "pbkdf2_sha256$0$00$00"));
        assert!(!verify_password("abcdef", "bcrypt$1000$00$00"));
        assert!(!verify_password("abcdef", "pbkdf2_sha256$1000$zz$zz"));
    }

    #[tokio::test]
    async fn test_blocking_helpers_agree_with_sync_versions() {
        let encoded = hash_password_blocking("s3cret!".to_string()).await.unwrap();
        assert!(verify_password("s3cret!", &encoded));
        assert!(verify_password_blocking("s3cret!".to_string(), encoded.clone()).await.unwrap());
        assert!(!verify_password_blocking("wrong!!".to_string(), encoded).await.unwrap());
    }

    #[test]
    fn test_generate_token_length() {
        let token = generate_token(32);
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token(32));
    }
}
