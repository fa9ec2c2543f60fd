//! Loan model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::enums::{Condition, LoanStatus};

/// Loan record from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Loan {
    pub id: i32,
    pub equipment_id: i32,
    pub borrower_name: String,
    pub borrower_phone: String,
    pub borrower_email: Option<String>,
    pub borrower_address: Option<String>,
    pub loan_date: DateTime<Utc>,
    pub expected_return_date: DateTime<Utc>,
    pub actual_return_date: Option<DateTime<Utc>>,
    /// Stored status (0=pending, 1=active, 2=returned, 3=cancelled).
    /// Overdue is never stored, see [`Loan::reported_status`].
    pub status: i16,
    pub cancel_reason: Option<String>,
    pub notes: Option<String>,
    pub created_by: i32,
}

impl Loan {
    pub fn status(&self) -> LoanStatus {
        LoanStatus::from(self.status)
    }

    /// Status as surfaced to callers: open loans past their expected
    /// return date are reported as `Overdue` regardless of what is stored.
    pub fn reported_status(&self, now: DateTime<Utc>) -> LoanStatus {
        let stored = self.status();
        if stored.is_open() && self.expected_return_date < now {
            LoanStatus::Overdue
        } else {
            stored
        }
    }

    pub fn is_open(&self) -> bool {
        self.status().is_open()
    }
}

/// Borrower contact information supplied at loan creation
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct BorrowerInfo {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 6, max = 30))]
    pub phone: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
}

/// Create loan request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateLoan {
    pub equipment_id: i32,
    pub borrower: BorrowerInfo,
    pub expected_return_date: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Return request body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReturnLoan {
    /// Condition observed when the item came back
    pub condition: Condition,
    pub notes: Option<String>,
}

/// Cancel request body
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CancelLoan {
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

/// Bulk status update request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BulkStatusUpdate {
    pub loan_ids: Vec<i32>,
    /// Target status, only `returned` and `cancelled` are accepted
    pub status: LoanStatus,
    /// Condition applied to every returned item (defaults to Good)
    pub condition: Option<Condition>,
    /// Reason applied to every cancelled loan
    pub reason: Option<String>,
}

/// Outcome for one loan id in a bulk update
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BulkItemResult {
    pub loan_id: i32,
    pub success: bool,
    /// Error kind when the item failed (e.g. `invalid_transition`)
    pub error: Option<String>,
    pub message: Option<String>,
}

/// Aggregate bulk update result
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BulkResult {
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BulkItemResult>,
}

/// Loan list query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct LoanQuery {
    /// Page number (default: 1)
    pub page: Option<i64>,
    /// Page size (default: 20, max: 100)
    pub limit: Option<i64>,
    /// Filter by reported status, including the derived `overdue` bucket
    pub status: Option<String>,
    /// Search over borrower name/phone and equipment name/serial
    pub search: Option<String>,
    /// Sort column: loan_date, expected_return_date, borrower_name
    pub sort_by: Option<String>,
    /// asc or desc (default: desc)
    pub sort_order: Option<String>,
}

/// Loan with display fields for list/detail responses
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub equipment_id: i32,
    pub equipment_name: String,
    pub equipment_serial: String,
    pub borrower_name: String,
    pub borrower_phone: String,
    pub borrower_email: Option<String>,
    pub loan_date: DateTime<Utc>,
    pub expected_return_date: DateTime<Utc>,
    pub actual_return_date: Option<DateTime<Utc>>,
    /// Reported status (overdue derived at read time)
    pub status: LoanStatus,
    pub cancel_reason: Option<String>,
    pub notes: Option<String>,
}

/// Aggregate loan counts per reported status
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoanStats {
    pub total: i64,
    pub pending: i64,
    pub active: i64,
    pub overdue: i64,
    pub returned: i64,
    pub cancelled: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn loan(status: LoanStatus, expected_in_days: i64) -> Loan {
        let now = Utc::now();
        Loan {
            id: 1,
            equipment_id: 7,
            borrower_name: "Karim B.".into(),
            borrower_phone: "0601020304".into(),
            borrower_email: None,
            borrower_address: None,
            loan_date: now - Duration::days(10),
            expected_return_date: now + Duration::days(expected_in_days),
            actual_return_date: None,
            status: status.into(),
            cancel_reason: None,
            notes: None,
            created_by: 1,
        }
    }

    #[test]
    fn active_loan_past_due_is_reported_overdue() {
        let l = loan(LoanStatus::Active, -1);
        assert_eq!(l.status(), LoanStatus::Active);
        assert_eq!(l.reported_status(Utc::now()), LoanStatus::Overdue);
    }

    #[test]
    fn active_loan_before_due_stays_active() {
        let l = loan(LoanStatus::Active, 3);
        assert_eq!(l.reported_status(Utc::now()), LoanStatus::Active);
    }

    #[test]
    fn terminal_loans_never_become_overdue() {
        let l = loan(LoanStatus::Returned, -30);
        assert_eq!(l.reported_status(Utc::now()), LoanStatus::Returned);
        let l = loan(LoanStatus::Cancelled, -30);
        assert_eq!(l.reported_status(Utc::now()), LoanStatus::Cancelled);
    }

    #[test]
    fn pending_counts_as_open_for_overdue_purposes() {
        let l = loan(LoanStatus::Pending, -2);
        assert!(l.is_open());
        assert_eq!(l.reported_status(Utc::now()), LoanStatus::Overdue);
    }
}
