use chrono::Utc;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{
    CreateEquipmentRequest, Equipment, EquipmentQuery, EquipmentStatus, UpdateEquipmentRequest,
    EQUIPMENT_COLUMNS,
};

#[derive(Clone)]
pub struct EquipmentService {
    db: PgPool,
}

impl EquipmentService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_equipment(&self, query: &EquipmentQuery) -> AppResult<Vec<Equipment>> {
        let equipment = sqlx::query_as::<_, Equipment>(&format!(
            r#"
            SELECT {EQUIPMENT_COLUMNS} FROM equipment
            WHERE ($1::equipment_status IS NULL OR status = $1)
              AND ($2::TEXT IS NULL OR category = $2)
            ORDER BY category, name
            "#
        ))
        .bind(query.status)
        .bind(query.category.as_deref())
        .fetch_all(&self.db)
        .await?;

        Ok(equipment)
    }

    pub async fn create(&self, request: CreateEquipmentRequest) -> AppResult<Equipment> {
        request.validate()?;

        let equipment = sqlx::query_as::<_, Equipment>(&format!(
            r#"
            INSERT INTO equipment (name, category, quantity, status, notes)
            VALUES ($1, $2, $3, 'available', $4)
            RETURNING {EQUIPMENT_COLUMNS}
            "#
        ))
        .bind(request.name.trim())
        .bind(request.category.trim().to_lowercase())
        .bind(request.quantity)
        .bind(request.notes)
        .fetch_one(&self.db)
        .await?;

        info!(equipment_id = %equipment.id, name = %equipment.name, "Equipment added");
        Ok(equipment)
    }

    pub async fn update(&self, equipment_id: Uuid, request: UpdateEquipmentRequest) -> AppResult<Equipment> {
        request.validate()?;

        sqlx::query_as::<_, Equipment>(&format!(
            r#"
            UPDATE equipment
            SET name = COALESCE($2, name),
                category = COALESCE($3, category),
                quantity = COALESCE($4, quantity),
                status = COALESCE($5, status),
                notes = COALESCE($6, notes),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {EQUIPMENT_COLUMNS}
            "#
        ))
        .bind(equipment_id)
        .bind(request.name.as_deref().map(str::trim))
        .bind(request.category.map(|c| c.trim().to_lowercase()))
        .bind(request.quantity)
        .bind(request.status)
        .bind(request.notes)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Equipment"))
    }

    pub async fn retire(&self, equipment_id: Uuid) -> AppResult<Equipment> {
        let equipment = self.set_status(equipment_id, EquipmentStatus::Retired).await?;
        info!(%equipment_id, "Equipment retired");
        Ok(equipment)
    }

    /// Toggle maintenance: available items go into maintenance, items in
    /// maintenance come back as available with today's service date.
    pub async fn record_maintenance(&self, equipment_id: Uuid) -> AppResult<Equipment> {
        let current: EquipmentStatus = sqlx::query_scalar("SELECT status FROM equipment WHERE id = $1")
            .bind(equipment_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Equipment"))?;

        let equipment = match current {
            EquipmentStatus::Retired => {
                return Err(AppError::rejected("Retired equipment cannot be serviced"));
            }
            EquipmentStatus::Available => self.set_status(equipment_id, EquipmentStatus::Maintenance).await?,
            EquipmentStatus::Maintenance => {
                sqlx::query_as::<_, Equipment>(&format!(
                    r#"
                    UPDATE equipment
                    SET status = 'available', last_maintenance_on = $2, updated_at = NOW()
                    WHERE id = $1
                    RETURNING {EQUIPMENT_COLUMNS}
                    "#
                ))
                .bind(equipment_id)
                .bind(Utc::now().date_naive())
                .fetch_one(&self.db)
                .await?
            }
        };

        info!(%equipment_id, status = ?equipment.status, "Equipment maintenance recorded");
        Ok(equipment)
    }

    async fn set_status(&self, equipment_id: Uuid, status: EquipmentStatus) -> AppResult<Equipment> {
        sqlx::query_as::<_, Equipment>(&format!(
            r#"
            UPDATE equipment SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {EQUIPMENT_COLUMNS}
            "#
        ))
        .bind(equipment_id)
        .bind(status)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Equipment"))
    }
}
