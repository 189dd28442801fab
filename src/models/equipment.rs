use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "equipment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EquipmentStatus {
    Available,
    Maintenance,
    Retired,
}

pub const EQUIPMENT_COLUMNS: &str =
    "id, name, category, quantity, status, last_maintenance_on, notes, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Equipment {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub quantity: i32,
    pub status: EquipmentStatus,
    pub last_maintenance_on: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEquipmentRequest {
    #[validate(length(min = 1, max = 120, message = "must be between 1 and 120 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 60, message = "must be between 1 and 60 characters"))]
    pub category: String,
    #[validate(range(min = 0, max = 10000, message = "must be between 0 and 10000"))]
    pub quantity: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateEquipmentRequest {
    #[validate(length(min = 1, max = 120, message = "must be between 1 and 120 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 60, message = "must be between 1 and 60 characters"))]
    pub category: Option<String>,
    #[validate(range(min = 0, max = 10000, message = "must be between 0 and 10000"))]
    pub quantity: Option<i32>,
    pub status: Option<EquipmentStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EquipmentQuery {
    pub status: Option<EquipmentStatus>,
    pub category: Option<String>,
}
