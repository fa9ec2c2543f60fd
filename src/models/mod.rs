//! Data models for Amana

pub mod enums;
pub mod equipment;
pub mod loan;
pub mod user;

// Re-export commonly used types
pub use enums::{AvailabilityStatus, Condition, EquipmentCategory, LoanStatus, Role};
pub use equipment::{Equipment, EquipmentHistoryEntry};
pub use loan::{Loan, LoanDetails};
pub use user::{User, UserClaims};
