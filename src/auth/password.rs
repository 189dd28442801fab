use bcrypt::{hash, verify, DEFAULT_COST};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PasswordError {
    #[error("Password must be at least 8 characters long")]
    TooShort,
    #[error("Password must be no more than 128 characters long")]
    TooLong,
    #[error("Password must contain at least one uppercase letter")]
    NoUppercase,
    #[error("Password must contain at least one lowercase letter")]
    NoLowercase,
    #[error("Password must contain at least one number")]
    NoNumber,
    #[error("Password must contain at least one special character")]
    NoSpecialChar,
    #[error("Failed to hash password")]
    HashingFailed,
    #[error("Failed to verify password")]
    VerificationFailed,
}

/// Password strength requirements
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_number: bool,
    pub require_special_char: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
            require_uppercase: true,
            require_lowercase: true,
            require_number: true,
            require_special_char: true,
        }
    }
}

pub fn validate_password_strength(password: &str, policy: &PasswordPolicy) -> Result<(), PasswordError> {
    let length = password.chars().count();
    if length < policy.min_length {
        return Err(PasswordError::TooShort);
    }
    if length > policy.max_length {
        return Err(PasswordError::TooLong);
    }

    if policy.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
        return Err(PasswordError::NoUppercase);
    }
    if policy.require_lowercase && !password.chars().any(|c| c.is_lowercase()) {
        return Err(PasswordError::NoLowercase);
    }
    if policy.require_number && !password.chars().any(|c| c.is_numeric()) {
        return Err(PasswordError::NoNumber);
    }
    if policy.require_special_char && password.chars().all(|c| c.is_alphanumeric()) {
        return Err(PasswordError::NoSpecialChar);
    }

    Ok(())
}

/// Hash a password with bcrypt after checking it against the default policy.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    validate_password_strength(password, &PasswordPolicy::default())?;

    hash(password, DEFAULT_COST).map_err(|_| PasswordError::HashingFailed)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    verify(password, hash).map_err(|_| PasswordError::VerificationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_validation() {
        let policy = PasswordPolicy::default();

        assert_eq!(validate_password_strength("short", &policy), Err(PasswordError::TooShort));
        assert_eq!(
            validate_password_strength("lowercase123!", &policy),
            Err(PasswordError::NoUppercase)
        );
        assert_eq!(
            validate_password_strength("UPPERCASE123!", &policy),
            Err(PasswordError::NoLowercase)
        );
        assert_eq!(
            validate_password_strength("Password!", &policy),
            Err(PasswordError::NoNumber)
        );
        assert_eq!(
            validate_password_strength("Password123", &policy),
            Err(PasswordError::NoSpecialChar)
        );
        assert!(validate_password_strength("Password123!", &policy).is_ok());
    }

    #[test]
    fn test_overlong_password_rejected() {
        let policy = PasswordPolicy::default();
        let long = format!("Aa1!{}", "x".repeat(200));
        assert_eq!(validate_password_strength(&long, &policy), Err(PasswordError::TooLong));
    }

    #[test]
    fn test_hash_and_verify() {
        let hashed = hash_password("Squat4Days!").unwrap();
        assert!(verify_password("Squat4Days!", &hashed).unwrap());
        assert!(!verify_password("Squat4Days?", &hashed).unwrap());
    }

    #[test]
    fn test_hash_rejects_weak_password() {
        assert_eq!(hash_password("weak"), Err(PasswordError::TooShort));
    }
}
