//! Shared domain enums (stored as SMALLINT codes in Postgres)

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// Condition
// ---------------------------------------------------------------------------

/// Physical condition of an equipment item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[repr(i16)]
pub enum Condition {
    New = 0,
    Good = 1,
    Fair = 2,
    Poor = 3,
    Damaged = 4,
    Unusable = 5,
}

impl Condition {
    /// Items returned in this condition go to maintenance instead of the shelf
    pub fn needs_maintenance(&self) -> bool {
        matches!(self, Condition::Poor | Condition::Damaged | Condition::Unusable)
    }
}

impl From<i16> for Condition {
    fn from(v: i16) -> Self {
        match v {
            0 => Condition::New,
            1 => Condition::Good,
            2 => Condition::Fair,
            3 => Condition::Poor,
            4 => Condition::Damaged,
            5 => Condition::Unusable,
            _ => Condition::Good,
        }
    }
}

impl From<Condition> for i16 {
    fn from(c: Condition) -> Self {
        c as i16
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Condition::New => "New",
            Condition::Good => "Good",
            Condition::Fair => "Fair",
            Condition::Poor => "Poor",
            Condition::Damaged => "Damaged",
            Condition::Unusable => "Unusable",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// AvailabilityStatus
// ---------------------------------------------------------------------------

/// Lending availability of an equipment item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[repr(i16)]
pub enum AvailabilityStatus {
    Available = 0,
    OnLoan = 1,
    UnderMaintenance = 2,
}

impl AvailabilityStatus {
    /// Status an item takes when it comes back in the given condition
    pub fn after_return(condition: Condition) -> Self {
        if condition.needs_maintenance() {
            AvailabilityStatus::UnderMaintenance
        } else {
            AvailabilityStatus::Available
        }
    }
}

impl From<i16> for AvailabilityStatus {
    fn from(v: i16) -> Self {
        match v {
            1 => AvailabilityStatus::OnLoan,
            2 => AvailabilityStatus::UnderMaintenance,
            _ => AvailabilityStatus::Available,
        }
    }
}

impl From<AvailabilityStatus> for i16 {
    fn from(s: AvailabilityStatus) -> Self {
        s as i16
    }
}

impl std::fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AvailabilityStatus::Available => "Available",
            AvailabilityStatus::OnLoan => "On loan",
            AvailabilityStatus::UnderMaintenance => "Under maintenance",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// LoanStatus
// ---------------------------------------------------------------------------

/// Loan lifecycle status.
///
/// `Overdue` is derived: open loans are stored as `Pending`/`Active` and
/// reported as `Overdue` once their expected return date has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum LoanStatus {
    Pending = 0,
    Active = 1,
    Returned = 2,
    Cancelled = 3,
    Overdue = 4,
}

impl LoanStatus {
    /// Open loans keep the equipment out of inventory
    pub fn is_open(&self) -> bool {
        matches!(self, LoanStatus::Pending | LoanStatus::Active | LoanStatus::Overdue)
    }

    /// Terminal loans accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoanStatus::Returned | LoanStatus::Cancelled)
    }
}

impl From<i16> for LoanStatus {
    fn from(v: i16) -> Self {
        match v {
            0 => LoanStatus::Pending,
            2 => LoanStatus::Returned,
            3 => LoanStatus::Cancelled,
            4 => LoanStatus::Overdue,
            _ => LoanStatus::Active,
        }
    }
}

impl From<LoanStatus> for i16 {
    fn from(s: LoanStatus) -> Self {
        s as i16
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LoanStatus::Pending => "Pending",
            LoanStatus::Active => "Active",
            LoanStatus::Returned => "Returned",
            LoanStatus::Cancelled => "Cancelled",
            LoanStatus::Overdue => "Overdue",
        };
        write!(f, "{}", label)
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(LoanStatus::Pending),
            "active" => Ok(LoanStatus::Active),
            "returned" => Ok(LoanStatus::Returned),
            "cancelled" => Ok(LoanStatus::Cancelled),
            "overdue" => Ok(LoanStatus::Overdue),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

// ---------------------------------------------------------------------------
// EquipmentCategory
// ---------------------------------------------------------------------------

/// Equipment category codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[repr(i16)]
pub enum EquipmentCategory {
    Mobility = 0,
    Medical = 1,
    Household = 2,
    Childcare = 3,
    Other = 4,
}

impl From<i16> for EquipmentCategory {
    fn from(v: i16) -> Self {
        match v {
            0 => EquipmentCategory::Mobility,
            1 => EquipmentCategory::Medical,
            2 => EquipmentCategory::Household,
            3 => EquipmentCategory::Childcare,
            _ => EquipmentCategory::Other,
        }
    }
}

impl From<EquipmentCategory> for i16 {
    fn from(c: EquipmentCategory) -> Self {
        c as i16
    }
}

impl std::fmt::Display for EquipmentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            EquipmentCategory::Mobility => "Mobility",
            EquipmentCategory::Medical => "Medical",
            EquipmentCategory::Household => "Household",
            EquipmentCategory::Childcare => "Childcare",
            EquipmentCategory::Other => "Other",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// User role codes (stored in users.role)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum Role {
    Admin = 0,
    Staff = 1,
    Volunteer = 2,
}

impl From<i16> for Role {
    fn from(v: i16) -> Self {
        match v {
            0 => Role::Admin,
            1 => Role::Staff,
            _ => Role::Volunteer,
        }
    }
}

impl From<Role> for i16 {
    fn from(r: Role) -> Self {
        r as i16
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Role::Admin => "Admin",
            Role::Staff => "Staff",
            Role::Volunteer => "Volunteer",
        };
        write!(f, "{}", label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_and_open_are_disjoint() {
        for status in [
            LoanStatus::Pending,
            LoanStatus::Active,
            LoanStatus::Returned,
            LoanStatus::Cancelled,
            LoanStatus::Overdue,
        ] {
            assert_ne!(status.is_open(), status.is_terminal());
        }
    }

    #[test]
    fn damaged_returns_go_to_maintenance() {
        assert_eq!(
            AvailabilityStatus::after_return(Condition::Damaged),
            AvailabilityStatus::UnderMaintenance
        );
        assert_eq!(
            AvailabilityStatus::after_return(Condition::Poor),
            AvailabilityStatus::UnderMaintenance
        );
        assert_eq!(
            AvailabilityStatus::after_return(Condition::Good),
            AvailabilityStatus::Available
        );
    }

    #[test]
    fn status_roundtrips_through_db_code() {
        for status in [
            LoanStatus::Pending,
            LoanStatus::Active,
            LoanStatus::Returned,
            LoanStatus::Cancelled,
        ] {
            assert_eq!(LoanStatus::from(i16::from(status)), status);
        }
    }

    #[test]
    fn status_parses_from_query_param() {
        assert_eq!("overdue".parse::<LoanStatus>(), Ok(LoanStatus::Overdue));
        assert_eq!("Returned".parse::<LoanStatus>(), Ok(LoanStatus::Returned));
        assert!("open".parse::<LoanStatus>().is_err());
    }
}
