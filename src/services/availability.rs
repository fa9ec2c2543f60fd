//! Equipment availability tracker.
//!
//! Every write to an equipment item's availability status goes through
//! this service, inside the caller's transaction, so the loan/equipment
//! pair can never be observed half-updated. Each transition appends an
//! audit entry to the item's history.

use sqlx::{Postgres, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::{AvailabilityStatus, Condition},
        equipment::{CreateEquipment, Equipment, EquipmentHistoryEntry, UpdateEquipment},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct AvailabilityService {
    repository: Repository,
}

impl AvailabilityService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self) -> AppResult<Vec<Equipment>> {
        self.repository.equipment.list().await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Equipment> {
        self.repository.equipment.get_by_id(id).await
    }

    pub async fn history(&self, id: i32) -> AppResult<Vec<EquipmentHistoryEntry>> {
        // 404 on unknown id rather than an empty history
        self.repository.equipment.get_by_id(id).await?;
        self.repository.equipment.history(id).await
    }

    pub async fn create(&self, data: &CreateEquipment) -> AppResult<Equipment> {
        self.repository.equipment.create(data).await
    }

    /// Take an available item out of inventory for a loan.
    ///
    /// Locks the equipment row, which serializes concurrent loan creation
    /// on the same item: the second caller blocks, then sees `OnLoan` and
    /// fails. Also cross-checks the open-loan count so a stale `Available`
    /// status is surfaced as a consistency violation instead of silently
    /// producing a double lend.
    pub async fn mark_on_loan(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        equipment_id: i32,
        actor_id: i32,
    ) -> AppResult<Equipment> {
        let equipment = self.repository.equipment.get_for_update(tx, equipment_id).await?;

        match equipment.availability() {
            AvailabilityStatus::OnLoan => {
                return Err(AppError::EquipmentUnavailable(format!(
                    "Equipment {} is already on loan",
                    equipment_id
                )));
            }
            AvailabilityStatus::UnderMaintenance => {
                return Err(AppError::EquipmentUnavailable(format!(
                    "Equipment {} is under maintenance",
                    equipment_id
                )));
            }
            AvailabilityStatus::Available => {}
        }

        let open = self
            .repository
            .loans
            .count_open_for_equipment(tx, equipment_id)
            .await?;
        if open > 0 {
            return Err(AppError::Consistency(format!(
                "Equipment {} is marked available but has {} open loan(s)",
                equipment_id, open
            )));
        }

        let updated = self
            .repository
            .equipment
            .set_status(tx, equipment_id, AvailabilityStatus::OnLoan, None)
            .await?;
        self.repository
            .equipment
            .add_history(
                tx,
                equipment_id,
                actor_id,
                AvailabilityStatus::Available,
                AvailabilityStatus::OnLoan,
                None,
                Some("lent out"),
            )
            .await?;

        Ok(updated)
    }

    /// Bring a lent-out item back into inventory.
    ///
    /// With a condition (a physical return) the item's condition is
    /// updated and a Poor/Damaged/Unusable item is parked in maintenance.
    /// Without one (a cancellation, the item never left) the stored
    /// condition decides.
    ///
    /// Calling this for an item that is not on loan means the loan and
    /// equipment records disagree; that is reported, never patched over.
    pub async fn mark_returned(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        equipment_id: i32,
        condition: Option<Condition>,
        actor_id: i32,
        note: &str,
    ) -> AppResult<Equipment> {
        let equipment = self.repository.equipment.get_for_update(tx, equipment_id).await?;

        if equipment.availability() != AvailabilityStatus::OnLoan {
            return Err(AppError::Consistency(format!(
                "Equipment {} has an open loan but is marked '{}'",
                equipment_id,
                equipment.availability()
            )));
        }

        let effective_condition = condition.unwrap_or_else(|| equipment.condition());
        let next = AvailabilityStatus::after_return(effective_condition);

        let updated = self
            .repository
            .equipment
            .set_status(tx, equipment_id, next, condition)
            .await?;
        self.repository
            .equipment
            .add_history(
                tx,
                equipment_id,
                actor_id,
                AvailabilityStatus::OnLoan,
                next,
                Some(effective_condition),
                Some(note),
            )
            .await?;

        Ok(updated)
    }

    /// Update descriptive fields and, when requested, move an item
    /// between `Available` and `UnderMaintenance`. Items on loan cannot
    /// be edited into a different availability here, and `OnLoan` can
    /// only ever result from a loan.
    pub async fn update(
        &self,
        id: i32,
        data: &UpdateEquipment,
        actor_id: i32,
    ) -> AppResult<Equipment> {
        let mut tx = self.repository.pool.begin().await?;

        let current = self.repository.equipment.get_for_update(&mut tx, id).await?;
        let mut equipment = self.repository.equipment.update_meta(&mut tx, id, data).await?;

        let status_change = data.status.filter(|s| *s != current.availability());
        if let Some(target) = status_change {
            if target == AvailabilityStatus::OnLoan {
                return Err(AppError::Validation(
                    "Status 'on loan' can only result from a loan".to_string(),
                ));
            }
            if current.availability() == AvailabilityStatus::OnLoan {
                return Err(AppError::InvalidTransition(format!(
                    "Equipment {} is on loan; return or cancel the loan first",
                    id
                )));
            }
            equipment = self
                .repository
                .equipment
                .set_status(&mut tx, id, target, data.condition)
                .await?;
            self.repository
                .equipment
                .add_history(
                    &mut tx,
                    id,
                    actor_id,
                    current.availability(),
                    target,
                    data.condition,
                    Some("maintenance action"),
                )
                .await?;
        } else if let Some(condition) = data.condition {
            // Recondition without a status change (e.g. repaired in place)
            equipment = self
                .repository
                .equipment
                .set_status(&mut tx, id, current.availability(), Some(condition))
                .await?;
        }

        tx.commit().await?;
        Ok(equipment)
    }

    /// Delete an item. Refused while an open loan references it.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.repository.pool.begin().await?;

        self.repository.equipment.get_for_update(&mut tx, id).await?;
        let open = self.repository.loans.count_open_for_equipment(&mut tx, id).await?;
        if open > 0 {
            return Err(AppError::DeleteNotAllowed(format!(
                "Equipment {} has an open loan",
                id
            )));
        }

        self.repository.equipment.delete(&mut tx, id).await?;
        tx.commit().await?;
        Ok(())
    }
}
