use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use rand_core::OsRng;
use sha2::{Digest, Sha256};

use crate::errors::AppError;

const MIN_PASSWORD_LENGTH: usize = 8;
const SPECIAL_CHARS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

/// Passwords every strength meter has seen a thousand times.
const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "12345678", "123456789", "qwerty123", "letmein1",
    "admin123", "welcome1", "iloveyou", "sunshine1",
];

/// Length of a bare SHA-256 hex digest, the pre-migration storage format.
const LEGACY_DIGEST_LEN: usize = 64;

pub fn validate_password_strength(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::bad_request(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(AppError::bad_request("password must contain an uppercase letter"));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(AppError::bad_request("password must contain a lowercase letter"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::bad_request("password must contain a digit"));
    }
    if !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        return Err(AppError::bad_request("password must contain a special character"));
    }
    if COMMON_PASSWORDS.contains(&password.to_lowercase().as_str()) {
        return Err(AppError::bad_request("password is too common"));
    }
    Ok(())
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    validate_password_strength(password)?;

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AppError::integrity(format!("failed to hash password: {err}")))
}

/// Verifies a password against either a modern argon2 hash or the deprecated
/// fixed-length hex digest still present on unmigrated rows.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    if is_legacy_digest(password_hash) {
        return Ok(legacy_digest(password) == password_hash.to_lowercase());
    }

    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|err| AppError::integrity(format!("invalid password hash: {err}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn is_legacy_digest(stored: &str) -> bool {
    stored.len() == LEGACY_DIGEST_LEN && stored.chars().all(|c| c.is_ascii_hexdigit())
}

fn legacy_digest(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn utc_now() -> DateTime<Utc> {
    Utc::now()
}

/// Case folding applied to every email before storage or comparison.
pub fn fold_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strength_policy_rejects_weak_passwords() {
        assert!(validate_password_strength("short1!").is_err());
        assert!(validate_password_strength("alllowercase1!").is_err());
        assert!(validate_password_strength("ALLUPPERCASE1!").is_err());
        assert!(validate_password_strength("NoDigits!!").is_err());
        assert!(validate_password_strength("NoSpecial11").is_err());
        assert!(validate_password_strength("Password1!").is_ok());
    }

    #[test]
    fn strength_policy_rejects_blacklisted() {
        // Blacklist matching is case-insensitive and runs after the shape checks.
        assert!(validate_password_strength("password").is_err());
    }

    #[test]
    fn argon2_round_trip() {
        let hash = hash_password("Aa1!aaaa").unwrap();
        assert!(verify_password("Aa1!aaaa", &hash).unwrap());
        assert!(!verify_password("Aa1!aaab", &hash).unwrap());
    }

    #[test]
    fn legacy_digest_accepted() {
        let stored = legacy_digest("Aa1!aaaa");
        assert!(verify_password("Aa1!aaaa", &stored).unwrap());
        assert!(!verify_password("wrong", &stored).unwrap());
    }

    #[test]
    fn emails_fold_to_lowercase() {
        assert_eq!(fold_email("  A@X "), "a@x");
    }
}
