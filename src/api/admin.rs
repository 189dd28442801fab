use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, post, put},
    Extension, Router,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{
    admin_only_middleware, jwt_auth_middleware, trainer_or_admin_middleware, AuthService, UserInfo,
    UserSession,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    ApiResponse, AttendanceEntry, AttendanceQuery, BroadcastRequest, BroadcastResult, CheckInRequest,
    CheckInResult, ClassListing, CreateClassRequest, CreateEquipmentRequest, CreatePlanRequest,
    CreateTrainerRequest, Equipment, EquipmentQuery, GymClass, GymFeedbackEntry, ManualCheckInRequest,
    MemberQuery, MemberSummary, MembershipPlan, PaginationQuery, PaymentQuery, PaymentReview,
    RejectPaymentRequest, SetActiveRequest, Trainer, TrainerProfile, UpdateEquipmentRequest,
    UpdatePlanRequest, UpdateRoleRequest, UpdateTrainerRequest,
};
use crate::services::{
    payment_service::PaymentDecision, user_service::DashboardStats, AttendanceService, ClassService,
    EquipmentService, FeedbackService, MembershipService, NotificationService, PaymentService,
    TrainerService, UserService,
};

#[derive(Clone)]
pub struct AdminAppState {
    pub user_service: UserService,
    pub membership_service: MembershipService,
    pub payment_service: PaymentService,
    pub trainer_service: TrainerService,
    pub class_service: ClassService,
    pub equipment_service: EquipmentService,
    pub notification_service: NotificationService,
    pub feedback_service: FeedbackService,
    pub attendance_service: AttendanceService,
}

impl AdminAppState {
    pub fn new(db: PgPool, attendance_service: AttendanceService, max_freeze_days: i64) -> Self {
        Self {
            user_service: UserService::new(db.clone()),
            membership_service: MembershipService::new(db.clone(), max_freeze_days),
            payment_service: PaymentService::new(db.clone()),
            trainer_service: TrainerService::new(db.clone()),
            class_service: ClassService::new(db.clone()),
            equipment_service: EquipmentService::new(db.clone()),
            notification_service: NotificationService::new(db.clone()),
            feedback_service: FeedbackService::new(db),
            attendance_service,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IncludeInactiveQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

/// Back-office routes. Front-desk check-in is open to trainers as well.
pub fn admin_routes(state: AdminAppState, auth_service: AuthService) -> Router {
    let admin = Router::new()
        .route("/dashboard", get(dashboard))
        .route("/members", get(list_members))
        .route("/users/:id/role", put(update_role))
        .route("/users/:id/active", put(set_active))
        .route("/payments", get(list_payments))
        .route("/payments/:id/approve", post(approve_payment))
        .route("/payments/:id/reject", post(reject_payment))
        .route("/plans", get(list_plans).post(create_plan))
        .route("/plans/:id", put(update_plan))
        .route("/trainers", get(list_trainers).post(create_trainer))
        .route("/trainers/:id", put(update_trainer).delete(deactivate_trainer))
        .route("/classes", get(list_classes).post(create_class))
        .route("/classes/:id/cancel", post(cancel_class))
        .route("/equipment", get(list_equipment).post(create_equipment))
        .route("/equipment/:id", put(update_equipment))
        .route("/equipment/:id/retire", post(retire_equipment))
        .route("/equipment/:id/maintenance", post(record_maintenance))
        .route("/notifications", post(broadcast))
        .route("/feedback", get(list_feedback))
        .route_layer(middleware::from_fn(admin_only_middleware))
        .route_layer(middleware::from_fn_with_state(
            auth_service.clone(),
            jwt_auth_middleware,
        ));

    let front_desk = Router::new()
        .route("/attendance", get(attendance_for_day))
        .route("/attendance/check-in", post(check_in))
        .route("/attendance/manual", post(manual_check_in))
        .route_layer(middleware::from_fn(trainer_or_admin_middleware))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware));

    admin.merge(front_desk).with_state(state)
}

async fn dashboard(State(state): State<AdminAppState>) -> AppResult<Json<ApiResponse<DashboardStats>>> {
    Ok(Json(ApiResponse::ok(state.user_service.dashboard_stats().await?)))
}

async fn list_members(
    State(state): State<AdminAppState>,
    WithRejection(Query(query), _): WithRejection<Query<MemberQuery>, AppError>,
) -> AppResult<Json<ApiResponse<Vec<MemberSummary>>>> {
    Ok(Json(ApiResponse::ok(state.user_service.list_members(&query).await?)))
}

#[tracing::instrument(skip(state, session, request), fields(admin_id = %session.user_id))]
async fn update_role(
    State(state): State<AdminAppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(user_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateRoleRequest>, AppError>,
) -> AppResult<Json<ApiResponse<UserInfo>>> {
    let user = state
        .user_service
        .update_role(session.user_id, user_id, request.role)
        .await?;
    Ok(Json(ApiResponse::ok(user)))
}

#[tracing::instrument(skip(state, session, request), fields(admin_id = %session.user_id))]
async fn set_active(
    State(state): State<AdminAppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(user_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<SetActiveRequest>, AppError>,
) -> AppResult<Json<ApiResponse<UserInfo>>> {
    let user = state
        .user_service
        .set_active(session.user_id, user_id, request.is_active)
        .await?;
    Ok(Json(ApiResponse::ok(user)))
}

async fn list_payments(
    State(state): State<AdminAppState>,
    WithRejection(Query(query), _): WithRejection<Query<PaymentQuery>, AppError>,
) -> AppResult<Json<ApiResponse<Vec<PaymentReview>>>> {
    Ok(Json(ApiResponse::ok(state.payment_service.list_payments(&query).await?)))
}

#[tracing::instrument(skip(state, session), fields(admin_id = %session.user_id))]
async fn approve_payment(
    State(state): State<AdminAppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(payment_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<ApiResponse<PaymentDecision>>> {
    let decision = state.payment_service.approve(payment_id, session.user_id).await?;
    let message = if decision.plan_activated {
        "Payment approved and membership activated"
    } else {
        "Payment approved"
    };
    Ok(Json(ApiResponse::with_message(decision, message)))
}

#[tracing::instrument(skip(state, session, request), fields(admin_id = %session.user_id))]
async fn reject_payment(
    State(state): State<AdminAppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(payment_id), _): WithRejection<Path<Uuid>, AppError>,
    request: Option<Json<RejectPaymentRequest>>,
) -> AppResult<Json<ApiResponse<PaymentDecision>>> {
    let reason = request.and_then(|Json(r)| r.reason);
    let decision = state
        .payment_service
        .reject(payment_id, session.user_id, reason)
        .await?;
    Ok(Json(ApiResponse::with_message(decision, "Payment rejected")))
}

async fn list_plans(State(state): State<AdminAppState>) -> AppResult<Json<ApiResponse<Vec<MembershipPlan>>>> {
    Ok(Json(ApiResponse::ok(state.membership_service.list_plans(true).await?)))
}

async fn create_plan(
    State(state): State<AdminAppState>,
    WithRejection(Json(request), _): WithRejection<Json<CreatePlanRequest>, AppError>,
) -> AppResult<(StatusCode, Json<ApiResponse<MembershipPlan>>)> {
    let plan = state.membership_service.create_plan(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(plan))))
}

async fn update_plan(
    State(state): State<AdminAppState>,
    WithRejection(Path(plan_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<UpdatePlanRequest>, AppError>,
) -> AppResult<Json<ApiResponse<MembershipPlan>>> {
    Ok(Json(ApiResponse::ok(state.membership_service.update_plan(plan_id, request).await?)))
}

async fn list_trainers(
    State(state): State<AdminAppState>,
    WithRejection(Query(query), _): WithRejection<Query<IncludeInactiveQuery>, AppError>,
) -> AppResult<Json<ApiResponse<Vec<TrainerProfile>>>> {
    let trainers = state.trainer_service.list_trainers(query.include_inactive).await?;
    Ok(Json(ApiResponse::ok(trainers)))
}

async fn create_trainer(
    State(state): State<AdminAppState>,
    WithRejection(Json(request), _): WithRejection<Json<CreateTrainerRequest>, AppError>,
) -> AppResult<(StatusCode, Json<ApiResponse<Trainer>>)> {
    let trainer = state.trainer_service.create_trainer(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(trainer))))
}

async fn update_trainer(
    State(state): State<AdminAppState>,
    WithRejection(Path(trainer_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateTrainerRequest>, AppError>,
) -> AppResult<Json<ApiResponse<Trainer>>> {
    Ok(Json(ApiResponse::ok(state.trainer_service.update_trainer(trainer_id, request).await?)))
}

async fn deactivate_trainer(
    State(state): State<AdminAppState>,
    WithRejection(Path(trainer_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<ApiResponse<Trainer>>> {
    let trainer = state.trainer_service.deactivate_trainer(trainer_id).await?;
    Ok(Json(ApiResponse::with_message(trainer, "Trainer deactivated")))
}

async fn list_classes(State(state): State<AdminAppState>) -> AppResult<Json<ApiResponse<Vec<ClassListing>>>> {
    Ok(Json(ApiResponse::ok(state.class_service.list_all().await?)))
}

async fn create_class(
    State(state): State<AdminAppState>,
    WithRejection(Json(request), _): WithRejection<Json<CreateClassRequest>, AppError>,
) -> AppResult<(StatusCode, Json<ApiResponse<GymClass>>)> {
    let class = state.class_service.create_class(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(class))))
}

#[tracing::instrument(skip(state, session), fields(admin_id = %session.user_id))]
async fn cancel_class(
    State(state): State<AdminAppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(class_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<ApiResponse<GymClass>>> {
    let (class, notified) = state.class_service.cancel_class(class_id, session.user_id).await?;
    Ok(Json(ApiResponse::with_message(
        class,
        format!("Class cancelled, {} member(s) notified", notified),
    )))
}

async fn list_equipment(
    State(state): State<AdminAppState>,
    WithRejection(Query(query), _): WithRejection<Query<EquipmentQuery>, AppError>,
) -> AppResult<Json<ApiResponse<Vec<Equipment>>>> {
    Ok(Json(ApiResponse::ok(state.equipment_service.list_equipment(&query).await?)))
}

async fn create_equipment(
    State(state): State<AdminAppState>,
    WithRejection(Json(request), _): WithRejection<Json<CreateEquipmentRequest>, AppError>,
) -> AppResult<(StatusCode, Json<ApiResponse<Equipment>>)> {
    let equipment = state.equipment_service.create(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(equipment))))
}

async fn update_equipment(
    State(state): State<AdminAppState>,
    WithRejection(Path(equipment_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateEquipmentRequest>, AppError>,
) -> AppResult<Json<ApiResponse<Equipment>>> {
    Ok(Json(ApiResponse::ok(state.equipment_service.update(equipment_id, request).await?)))
}

async fn retire_equipment(
    State(state): State<AdminAppState>,
    WithRejection(Path(equipment_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<ApiResponse<Equipment>>> {
    Ok(Json(ApiResponse::ok(state.equipment_service.retire(equipment_id).await?)))
}

async fn record_maintenance(
    State(state): State<AdminAppState>,
    WithRejection(Path(equipment_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<ApiResponse<Equipment>>> {
    Ok(Json(ApiResponse::ok(
        state.equipment_service.record_maintenance(equipment_id).await?,
    )))
}

#[tracing::instrument(skip(state, session, request), fields(admin_id = %session.user_id))]
async fn broadcast(
    State(state): State<AdminAppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<BroadcastRequest>, AppError>,
) -> AppResult<(StatusCode, Json<ApiResponse<BroadcastResult>>)> {
    request.validate()?;
    let result = state
        .notification_service
        .broadcast(session.user_id, request.audience, request.title.trim(), request.message.trim())
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(result))))
}

async fn list_feedback(
    State(state): State<AdminAppState>,
    WithRejection(Query(page), _): WithRejection<Query<PaginationQuery>, AppError>,
) -> AppResult<Json<ApiResponse<Vec<GymFeedbackEntry>>>> {
    let entries = state.feedback_service.list_gym_feedback(page.limit, page.offset).await?;
    Ok(Json(ApiResponse::ok(entries)))
}

async fn attendance_for_day(
    State(state): State<AdminAppState>,
    WithRejection(Query(query), _): WithRejection<Query<AttendanceQuery>, AppError>,
) -> AppResult<Json<ApiResponse<Value>>> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let entries: Vec<AttendanceEntry> = state.attendance_service.attendance_for_day(date).await?;
    Ok(Json(ApiResponse::ok(json!({
        "date": date,
        "count": entries.len(),
        "entries": entries,
    }))))
}

#[tracing::instrument(skip(state, session, request), fields(staff_id = %session.user_id))]
async fn check_in(
    State(state): State<AdminAppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<CheckInRequest>, AppError>,
) -> AppResult<(StatusCode, Json<CheckInResult>)> {
    let result = state
        .attendance_service
        .check_in(&request.payload, session.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

#[tracing::instrument(skip(state, session, request), fields(staff_id = %session.user_id))]
async fn manual_check_in(
    State(state): State<AdminAppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<ManualCheckInRequest>, AppError>,
) -> AppResult<(StatusCode, Json<CheckInResult>)> {
    let result = state
        .attendance_service
        .manual_check_in(request.user_id, session.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}
