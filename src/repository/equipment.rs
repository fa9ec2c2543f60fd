//! Equipment repository for database operations

use chrono::Utc;
use sqlx::{Pool, Postgres, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::{AvailabilityStatus, Condition},
        equipment::{CreateEquipment, Equipment, EquipmentHistoryEntry, UpdateEquipment},
    },
};

#[derive(Clone)]
pub struct EquipmentRepository {
    pool: Pool<Postgres>,
}

impl EquipmentRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List all equipment
    pub async fn list(&self) -> AppResult<Vec<Equipment>> {
        let rows = sqlx::query_as::<_, Equipment>("SELECT * FROM equipment ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Get equipment by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Equipment> {
        sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    /// Get equipment by ID with a row lock.
    ///
    /// Serializes every availability mutation on the same item: a
    /// concurrent transaction blocks here until the first one commits.
    pub async fn get_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: i32,
    ) -> AppResult<Equipment> {
        sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    /// Create equipment
    pub async fn create(&self, data: &CreateEquipment) -> AppResult<Equipment> {
        let row = sqlx::query_as::<_, Equipment>(
            r#"
            INSERT INTO equipment (name, serial_number, category, condition, status, entry_date, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.serial_number)
        .bind(i16::from(data.category.unwrap_or(crate::models::EquipmentCategory::Other)))
        .bind(i16::from(data.condition.unwrap_or(Condition::Good)))
        .bind(i16::from(AvailabilityStatus::Available))
        .bind(data.entry_date)
        .bind(&data.notes)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Update descriptive fields. Availability status and condition are
    /// owned by the availability tracker and not touched here.
    pub async fn update_meta(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: i32,
        data: &UpdateEquipment,
    ) -> AppResult<Equipment> {
        let now = Utc::now();
        let mut sets = vec!["modif_date = $1".to_string()];
        let mut idx = 2;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, idx));
                    idx += 1;
                }
            };
        }

        add_field!(data.name, "name");
        add_field!(data.serial_number, "serial_number");
        add_field!(data.category, "category");
        add_field!(data.entry_date, "entry_date");
        add_field!(data.exit_date, "exit_date");
        add_field!(data.notes, "notes");

        let query = format!(
            "UPDATE equipment SET {} WHERE id = ${} RETURNING *",
            sets.join(", "),
            idx
        );

        let mut builder = sqlx::query_as::<_, Equipment>(&query).bind(now);

        if let Some(ref val) = data.name {
            builder = builder.bind(val);
        }
        if let Some(ref val) = data.serial_number {
            builder = builder.bind(val);
        }
        if let Some(val) = data.category {
            builder = builder.bind(i16::from(val));
        }
        if let Some(val) = data.entry_date {
            builder = builder.bind(val);
        }
        if let Some(val) = data.exit_date {
            builder = builder.bind(val);
        }
        if let Some(ref val) = data.notes {
            builder = builder.bind(val);
        }

        builder
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    /// Write the availability status (and optionally the condition) of an
    /// already-locked equipment row.
    pub async fn set_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: i32,
        status: AvailabilityStatus,
        condition: Option<Condition>,
    ) -> AppResult<Equipment> {
        let row = match condition {
            Some(cond) => {
                sqlx::query_as::<_, Equipment>(
                    "UPDATE equipment SET status = $1, condition = $2, modif_date = $3 WHERE id = $4 RETURNING *",
                )
                .bind(i16::from(status))
                .bind(i16::from(cond))
                .bind(Utc::now())
                .bind(id)
                .fetch_optional(&mut **tx)
                .await?
            }
            None => {
                sqlx::query_as::<_, Equipment>(
                    "UPDATE equipment SET status = $1, modif_date = $2 WHERE id = $3 RETURNING *",
                )
                .bind(i16::from(status))
                .bind(Utc::now())
                .bind(id)
                .fetch_optional(&mut **tx)
                .await?
            }
        };
        row.ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    /// Append an availability audit entry
    pub async fn add_history(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        equipment_id: i32,
        actor_id: i32,
        from_status: AvailabilityStatus,
        to_status: AvailabilityStatus,
        condition: Option<Condition>,
        note: Option<&str>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO equipment_history (equipment_id, actor_id, from_status, to_status, condition, note, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(equipment_id)
        .bind(actor_id)
        .bind(i16::from(from_status))
        .bind(i16::from(to_status))
        .bind(condition.map(i16::from))
        .bind(note)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Availability audit trail for one item, newest first
    pub async fn history(&self, equipment_id: i32) -> AppResult<Vec<EquipmentHistoryEntry>> {
        let rows = sqlx::query_as::<_, EquipmentHistoryEntry>(
            "SELECT * FROM equipment_history WHERE equipment_id = $1 ORDER BY created_at DESC",
        )
        .bind(equipment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Delete equipment (caller checks for open loans first)
    pub async fn delete(&self, tx: &mut Transaction<'_, Postgres>, id: i32) -> AppResult<()> {
        sqlx::query("DELETE FROM equipment_history WHERE equipment_id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        let result = sqlx::query("DELETE FROM equipment WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Equipment {} not found", id)));
        }
        Ok(())
    }
}
