use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::Rng;
use sha2::{Digest, Sha256};

use maxdate_shared::errors::{AppError, ErrorCode};

pub const MAX_EMAIL_LEN: usize = 50;
const PASSWORD_MIN_CHARS: usize = 8;
const PASSWORD_MAX_CHARS: usize = 20;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::internal(format!("invalid password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Email rules: at most 50 characters, contains `@`, `.ru` domain.
pub fn validate_email(email: &str) -> Result<(), AppError> {
    if email.chars().count() > MAX_EMAIL_LEN {
        return Err(AppError::new(ErrorCode::InvalidEmail, "email must not exceed 50 characters"));
    }
    if !email.contains('@') {
        return Err(AppError::new(ErrorCode::InvalidEmail, "email must contain @"));
    }
    if !email.to_lowercase().ends_with(".ru") {
        return Err(AppError::new(ErrorCode::InvalidEmail, "email must end with .ru"));
    }
    Ok(())
}

fn is_cyrillic_lower(c: char) -> bool {
    ('а'..='я').contains(&c) || c == 'ё'
}

fn is_cyrillic_upper(c: char) -> bool {
    ('А'..='Я').contains(&c) || c == 'Ё'
}

/// Password rules: 8 to 20 characters, at least one digit, one lowercase and
/// one uppercase Cyrillic letter, no Latin letters and no punctuation.
pub fn validate_password(password: &str) -> Result<(), AppError> {
    let weak = |message: &str| Err(AppError::new(ErrorCode::PasswordTooWeak, message));
    let len = password.chars().count();

    if !(PASSWORD_MIN_CHARS..=PASSWORD_MAX_CHARS).contains(&len) {
        return weak("password must be between 8 and 20 characters");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return weak("password must contain at least one digit");
    }
    if !password.chars().any(is_cyrillic_lower) {
        return weak("password must contain at least one lowercase Cyrillic letter");
    }
    if !password.chars().any(is_cyrillic_upper) {
        return weak("password must contain at least one uppercase Cyrillic letter");
    }
    if password.chars().any(|c| c.is_ascii_alphabetic()) {
        return weak("password must not contain Latin letters");
    }
    if password.chars().any(|c| c.is_ascii_punctuation()) {
        return weak("password must not contain special characters");
    }
    Ok(())
}

/// 32 random bytes, hex encoded.
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_cyrillic_password_with_digit() {
        assert!(validate_password("Пароль123").is_ok());
        assert!(validate_password("ЁжикВтумане1").is_ok());
    }

    #[test]
    fn rejects_passwords_breaking_a_rule() {
        for bad in ["Пар1", "ПарольБезЦифр", "пароль123", "ПАРОЛЬ123", "Пароль123abc", "Пароль123!", "Пароль123456789012345"] {
            let err = validate_password(bad).unwrap_err();
            assert_eq!(err.code(), ErrorCode::PasswordTooWeak, "{bad}");
        }
    }

    #[test]
    fn email_rules() {
        assert!(validate_email("anna@mail.ru").is_ok());
        assert!(validate_email("ANNA@MAIL.RU").is_ok());
        assert!(validate_email("anna.mail.ru").is_err());
        assert!(validate_email("anna@gmail.com").is_err());
        let long = format!("{}@mail.ru", "a".repeat(45));
        assert!(validate_email(&long).is_err());
    }

    #[test]
    fn hashed_password_verifies() {
        let hash = hash_password("Пароль123").unwrap();
        assert!(verify_password("Пароль123", &hash).unwrap());
        assert!(!verify_password("Пароль124", &hash).unwrap());
    }

    #[test]
    fn tokens_are_random_and_hash_deterministically() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
        assert_eq!(hash_token(&a), hash_token(&a));
        assert_ne!(hash_token(&a), a);
    }
}
