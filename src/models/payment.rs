use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::MemberPlanStatus;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    EWallet,
}

impl PaymentMethod {
    /// Non-cash payments must carry a transaction reference.
    pub fn requires_reference(&self) -> bool {
        !matches!(self, PaymentMethod::Cash)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
}

pub const PAYMENT_COLUMNS: &str = "id, user_id, member_plan_id, amount_cents, payment_method, reference, status, \
     reviewed_by, reviewed_at, rejection_reason, created_at";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub member_plan_id: Uuid,
    pub amount_cents: i64,
    pub payment_method: PaymentMethod,
    pub reference: Option<String>,
    pub status: PaymentStatus,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Payment joined with member and plan details for the admin review queue.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PaymentReview {
    pub id: Uuid,
    pub user_id: Uuid,
    pub member_name: String,
    pub member_email: String,
    pub plan_name: String,
    pub plan_price_cents: i64,
    pub amount_cents: i64,
    pub payment_method: PaymentMethod,
    pub reference: Option<String>,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitPaymentRequest {
    pub member_plan_id: Uuid,
    pub amount_cents: i64,
    pub payment_method: PaymentMethod,
    pub reference: Option<String>,
}

impl SubmitPaymentRequest {
    /// Checks that do not need the database; balance is checked in the transaction.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.amount_cents <= 0 {
            return Err(AppError::validation("Payment amount must be positive"));
        }

        let reference = self.reference.as_deref().map(str::trim).unwrap_or("");
        if self.payment_method.requires_reference() && reference.is_empty() {
            return Err(AppError::validation("A reference number is required for this payment method"));
        }
        if reference.len() > 100 {
            return Err(AppError::validation("Reference must be at most 100 characters"));
        }

        Ok(())
    }
}

pub fn ensure_within_balance(amount_cents: i64, balance_cents: i64) -> Result<(), AppError> {
    if balance_cents <= 0 {
        return Err(AppError::rejected("There is no outstanding balance to pay"));
    }
    if amount_cents > balance_cents {
        return Err(AppError::validation(format!(
            "Payment exceeds the outstanding balance of {}",
            format_cents(balance_cents)
        )));
    }
    Ok(())
}

/// Check that a payment may be booked against `target`.
/// While a plan awaits payment, the outstanding balance belongs to it and nothing else.
pub fn ensure_payable_plan(
    target_id: Uuid,
    target_status: MemberPlanStatus,
    awaiting_payment: Option<Uuid>,
) -> Result<(), AppError> {
    if !matches!(target_status, MemberPlanStatus::Pending | MemberPlanStatus::Active) {
        return Err(AppError::rejected("Payments can only be made for pending or active memberships"));
    }
    match awaiting_payment {
        Some(pending_id) if pending_id != target_id => Err(AppError::rejected(
            "Payments must go to the plan awaiting activation",
        )),
        _ => Ok(()),
    }
}

#[derive(Debug, Deserialize)]
pub struct PaymentQuery {
    pub status: Option<PaymentStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RejectPaymentRequest {
    pub reason: Option<String>,
}

pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn request(amount_cents: i64, method: PaymentMethod, reference: Option<&str>) -> SubmitPaymentRequest {
        SubmitPaymentRequest {
            member_plan_id: Uuid::new_v4(),
            amount_cents,
            payment_method: method,
            reference: reference.map(str::to_string),
        }
    }

    #[test]
    fn test_amount_must_be_positive() {
        assert_matches!(request(0, PaymentMethod::Cash, None).validate(), Err(AppError::Validation(_)));
        assert_matches!(request(-500, PaymentMethod::Cash, None).validate(), Err(AppError::Validation(_)));
        assert!(request(1500, PaymentMethod::Cash, None).validate().is_ok());
    }

    #[test]
    fn test_reference_required_for_electronic_payments() {
        assert!(request(1500, PaymentMethod::Card, None).validate().is_err());
        assert!(request(1500, PaymentMethod::BankTransfer, Some("  ")).validate().is_err());
        assert!(request(1500, PaymentMethod::EWallet, Some("GC-1234")).validate().is_ok());
    }

    #[test]
    fn test_balance_checks() {
        assert!(ensure_within_balance(2500, 2500).is_ok());
        assert!(ensure_within_balance(1000, 2500).is_ok());
        assert_matches!(ensure_within_balance(2600, 2500), Err(AppError::Validation(_)));
        assert_matches!(ensure_within_balance(100, 0), Err(AppError::Rejected(_)));
    }

    #[test]
    fn test_payment_goes_to_the_plan_awaiting_activation() {
        let active = Uuid::new_v4();
        let pending = Uuid::new_v4();

        assert!(ensure_payable_plan(pending, MemberPlanStatus::Pending, Some(pending)).is_ok());
        assert!(ensure_payable_plan(active, MemberPlanStatus::Active, None).is_ok());
        assert_matches!(
            ensure_payable_plan(active, MemberPlanStatus::Active, Some(pending)),
            Err(AppError::Rejected(_))
        );
        assert_matches!(
            ensure_payable_plan(active, MemberPlanStatus::Expired, None),
            Err(AppError::Rejected(_))
        );
    }

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(2500), "25.00");
        assert_eq!(format_cents(7), "0.07");
        assert_eq!(format_cents(-1050), "-10.50");
    }
}
