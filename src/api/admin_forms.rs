use axum::{
    extract::{Path, State},
    middleware,
    response::Redirect,
    routing::{get, post},
    Extension, Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::auth::{admin_only_middleware, jwt_auth_middleware, AuthService, UserSession};
use crate::error::{AppError, AppResult};
use crate::models::{ApiResponse, PaymentQuery, PaymentReview, PaymentStatus};
use crate::services::{payment_service::PaymentDecision, FlashMessage, FlashStore, PaymentService};

const PAYMENTS_PAGE: &str = "/admin/payments";

#[derive(Clone)]
pub struct AdminFormsState {
    pub payment_service: PaymentService,
    pub flash: FlashStore,
}

/// Review queue plus whatever the last form post left behind.
#[derive(Debug, Serialize)]
pub struct PaymentsPage {
    pub flash: Vec<FlashMessage>,
    pub pending: Vec<PaymentReview>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectPaymentForm {
    pub reason: Option<String>,
}

/// The payments page and its form posts. Each post answers with a 303 back to the page
/// and leaves the outcome as a flash message.
pub fn admin_form_routes(db: PgPool, auth_service: AuthService, flash: FlashStore) -> Router {
    Router::new()
        .route("/payments", get(payments_page))
        .route("/payments/:id/approve", post(approve_payment_form))
        .route("/payments/:id/reject", post(reject_payment_form))
        .route_layer(middleware::from_fn(admin_only_middleware))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(AdminFormsState {
            payment_service: PaymentService::new(db),
            flash,
        })
}

#[tracing::instrument(skip(state, session), fields(admin_id = %session.user_id))]
async fn payments_page(
    State(state): State<AdminFormsState>,
    Extension(session): Extension<UserSession>,
) -> AppResult<Json<ApiResponse<PaymentsPage>>> {
    let pending = state
        .payment_service
        .list_payments(&PaymentQuery {
            status: Some(PaymentStatus::Pending),
            limit: None,
            offset: None,
        })
        .await?;

    Ok(Json(ApiResponse::ok(PaymentsPage {
        flash: state.flash.take(session.user_id),
        pending,
    })))
}

#[tracing::instrument(skip(state, session), fields(admin_id = %session.user_id))]
async fn approve_payment_form(
    State(state): State<AdminFormsState>,
    Extension(session): Extension<UserSession>,
    Path(payment_id): Path<Uuid>,
) -> Redirect {
    let outcome = state.payment_service.approve(payment_id, session.user_id).await;
    flash_outcome(&state.flash, session.user_id, outcome, |decision| {
        if decision.plan_activated {
            "Payment approved and membership activated".to_string()
        } else {
            "Payment approved".to_string()
        }
    });
    Redirect::to(PAYMENTS_PAGE)
}

#[tracing::instrument(skip(state, session, form), fields(admin_id = %session.user_id))]
async fn reject_payment_form(
    State(state): State<AdminFormsState>,
    Extension(session): Extension<UserSession>,
    Path(payment_id): Path<Uuid>,
    form: Option<Form<RejectPaymentForm>>,
) -> Redirect {
    let reason = form
        .and_then(|Form(f)| f.reason)
        .filter(|r| !r.trim().is_empty());
    let outcome = state
        .payment_service
        .reject(payment_id, session.user_id, reason)
        .await;
    flash_outcome(&state.flash, session.user_id, outcome, |_| "Payment rejected".to_string());
    Redirect::to(PAYMENTS_PAGE)
}

fn flash_outcome(
    flash: &FlashStore,
    user_id: Uuid,
    outcome: Result<PaymentDecision, AppError>,
    on_success: impl FnOnce(&PaymentDecision) -> String,
) {
    match outcome {
        Ok(decision) => flash.success(user_id, on_success(&decision)),
        Err(e) => {
            warn!(%user_id, error = %e, "Payment review from form failed");
            flash.error(user_id, e.public_message());
        }
    }
}
