//! Equipment model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::enums::{AvailabilityStatus, Condition, EquipmentCategory};

/// Equipment record from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Equipment {
    pub id: i32,
    /// Equipment name / description
    pub name: String,
    /// Manufacturer serial number or internal inventory code
    pub serial_number: String,
    /// Category (0=mobility, 1=medical, 2=household, 3=childcare, 4=other)
    pub category: i16,
    /// Condition (0=new .. 5=unusable)
    pub condition: i16,
    /// Availability (0=available, 1=on loan, 2=under maintenance)
    pub status: i16,
    /// Date the item entered the inventory
    pub entry_date: Option<DateTime<Utc>>,
    /// Date the item left the inventory for good
    pub exit_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub crea_date: Option<DateTime<Utc>>,
    pub modif_date: Option<DateTime<Utc>>,
}

impl Equipment {
    pub fn availability(&self) -> AvailabilityStatus {
        AvailabilityStatus::from(self.status)
    }

    pub fn condition(&self) -> Condition {
        Condition::from(self.condition)
    }

    pub fn category(&self) -> EquipmentCategory {
        EquipmentCategory::from(self.category)
    }
}

/// Create equipment request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEquipment {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub serial_number: String,
    pub category: Option<EquipmentCategory>,
    pub condition: Option<Condition>,
    pub entry_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Update equipment request.
///
/// `status` may move an item between `Available` and `UnderMaintenance`;
/// `OnLoan` is owned by the loan lifecycle and rejected here.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateEquipment {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub serial_number: Option<String>,
    pub category: Option<EquipmentCategory>,
    pub condition: Option<Condition>,
    pub status: Option<AvailabilityStatus>,
    pub entry_date: Option<DateTime<Utc>>,
    pub exit_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Availability audit entry (who, when, which transition)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct EquipmentHistoryEntry {
    pub id: i32,
    pub equipment_id: i32,
    /// User who triggered the transition
    pub actor_id: i32,
    /// Availability before (0=available, 1=on loan, 2=under maintenance)
    pub from_status: i16,
    /// Availability after
    pub to_status: i16,
    /// Condition recorded at transition time, if any
    pub condition: Option<i16>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}
