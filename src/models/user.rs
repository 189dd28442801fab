use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::sync::OnceLock;
use uuid::Uuid;

use crate::auth::{UserInfo, UserRole};
use crate::error::AppError;

pub const USER_COLUMNS: &str =
    "id, email, password_hash, full_name, phone, role, balance_cents, is_active, created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    /// Amount the member still owes for selected plans.
    pub balance_cents: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        UserInfo {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            phone: user.phone,
            role: user.role,
            balance_cents: user.balance_cents,
            created_at: user.created_at,
        }
    }
}

/// Row returned by the admin member listing.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MemberSummary {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub balance_cents: i64,
    pub is_active: bool,
    pub plan_name: Option<String>,
    pub plan_status: Option<String>,
    pub plan_end_date: Option<chrono::NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct MemberQuery {
    pub search: Option<String>,
    pub role: Option<UserRole>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn phone_regex() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(r"^\+?[0-9][0-9 \-]{6,18}[0-9]$").expect("valid phone regex"))
}

pub fn validate_phone(phone: Option<&str>) -> Result<(), AppError> {
    match phone.map(str::trim) {
        None | Some("") => Ok(()),
        Some(value) if phone_regex().is_match(value) => Ok(()),
        Some(_) => Err(AppError::validation("phone must contain 8 to 20 digits")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_normalization() {
        let cases = [
            ("USER@EXAMPLE.COM", "user@example.com"),
            ("  user@example.com  ", "user@example.com"),
            ("Lifter@Gym.Com", "lifter@gym.com"),
        ];
        for (input, expected) in cases {
            assert_eq!(normalize_email(input), expected);
        }
    }

    #[test]
    fn test_phone_validation() {
        assert!(validate_phone(None).is_ok());
        assert!(validate_phone(Some("")).is_ok());
        assert!(validate_phone(Some("+63 917 555 0101")).is_ok());
        assert!(validate_phone(Some("0917-555-0101")).is_ok());
        assert!(validate_phone(Some("call me")).is_err());
        assert!(validate_phone(Some("123")).is_err());
    }
}
