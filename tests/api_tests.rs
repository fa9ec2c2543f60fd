//! End-to-end API tests, driven through the crate's own client.
//!
//! These need a running server with a provisioned admin/admin account:
//! run with `cargo test -- --ignored`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{json, Value};

use amana_server::client::{ApiClient, ApiError, LoanApi, LoanListQuery, MemorySession};
use amana_server::models::equipment::Equipment;
use amana_server::models::loan::{
    BorrowerInfo, BulkStatusUpdate, CancelLoan, CreateLoan, LoanDetails, LoanStats, ReturnLoan,
};
use amana_server::models::{AvailabilityStatus, Condition, LoanStatus};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Authenticated client + loan bindings
async fn connect() -> (Arc<ApiClient>, LoanApi) {
    let session = Arc::new(MemorySession::new());
    let client = Arc::new(ApiClient::new(BASE_URL, session).expect("Failed to build client"));
    client
        .login("admin", "admin")
        .await
        .expect("Failed to log in as admin");
    let loans = LoanApi::new(client.clone());
    (client, loans)
}

/// Create a fresh equipment item with a unique serial number
async fn create_equipment(client: &ApiClient, name: &str) -> Equipment {
    let serial = format!("T-{}", Utc::now().timestamp_nanos_opt().unwrap_or_default());
    client
        .post(
            "/equipment",
            &json!({
                "name": name,
                "serial_number": serial,
                "category": "Mobility",
                "condition": "Good"
            }),
        )
        .await
        .expect("Failed to create equipment")
}

async fn get_equipment(client: &ApiClient, id: i32) -> Equipment {
    client
        .get(&format!("/equipment/{}", id), &[])
        .await
        .expect("Failed to fetch equipment")
}

fn borrower() -> BorrowerInfo {
    BorrowerInfo {
        name: "Samira T.".to_string(),
        phone: "0612345678".to_string(),
        email: None,
        address: None,
    }
}

fn create_request(equipment_id: i32, due_in: ChronoDuration) -> CreateLoan {
    CreateLoan {
        equipment_id,
        borrower: borrower(),
        expected_return_date: Utc::now() + due_in,
        notes: None,
    }
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let session = Arc::new(MemorySession::new());
    let client = ApiClient::new(BASE_URL, session).unwrap();

    let body: Value = client.get("/health", &[]).await.expect("Health check failed");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let session = Arc::new(MemorySession::new());
    let client = ApiClient::new(BASE_URL, session).unwrap();

    match client.login("admin", "wrong").await {
        Err(ApiError::Client { status: 401, .. }) => {}
        other => panic!("expected 401, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
#[ignore]
async fn test_loan_round_trip_releases_equipment() {
    let (client, loans) = connect().await;
    let equipment = create_equipment(&client, "Foldable wheelchair").await;

    let loan = loans
        .create(&create_request(equipment.id, ChronoDuration::days(14)))
        .await
        .expect("Failed to create loan");
    assert_eq!(loan.status, LoanStatus::Active);
    assert_eq!(
        get_equipment(&client, equipment.id).await.availability(),
        AvailabilityStatus::OnLoan
    );

    let expected_return = loan.expected_return_date;
    let returned = loans
        .return_loan(loan.id, &ReturnLoan { condition: Condition::Good, notes: None })
        .await
        .expect("Failed to return loan");
    assert_eq!(returned.status, LoanStatus::Returned);
    assert!(returned.actual_return_date.is_some());
    assert_eq!(returned.expected_return_date, expected_return);
    assert_eq!(
        get_equipment(&client, equipment.id).await.availability(),
        AvailabilityStatus::Available
    );
}

#[tokio::test]
#[ignore]
async fn test_double_lend_is_rejected() {
    let (client, loans) = connect().await;
    let equipment = create_equipment(&client, "Hospital bed").await;

    loans
        .create(&create_request(equipment.id, ChronoDuration::days(7)))
        .await
        .expect("First loan should succeed");

    match loans.create(&create_request(equipment.id, ChronoDuration::days(7))).await {
        Err(ApiError::Client { status: 409, message }) => {
            assert!(message.contains("already on loan"), "message: {}", message);
        }
        other => panic!("expected 409, got {:?}", other.map(|l| l.id)),
    }
}

#[tokio::test]
#[ignore]
async fn test_terminal_loans_reject_transitions() {
    let (client, loans) = connect().await;
    let equipment = create_equipment(&client, "Walking frame").await;

    let loan = loans
        .create(&create_request(equipment.id, ChronoDuration::days(7)))
        .await
        .unwrap();
    loans
        .return_loan(loan.id, &ReturnLoan { condition: Condition::Good, notes: None })
        .await
        .unwrap();

    for result in [
        loans
            .return_loan(loan.id, &ReturnLoan { condition: Condition::Good, notes: None })
            .await,
        loans
            .cancel(loan.id, &CancelLoan { reason: "too late".to_string() })
            .await,
    ] {
        match result {
            Err(ApiError::Client { status: 409, .. }) => {}
            other => panic!("expected 409, got {:?}", other.map(|l| l.id)),
        }
    }
}

#[tokio::test]
#[ignore]
async fn test_damaged_return_goes_to_maintenance() {
    let (client, loans) = connect().await;
    let equipment = create_equipment(&client, "Oxygen concentrator").await;

    let loan = loans
        .create(&create_request(equipment.id, ChronoDuration::days(7)))
        .await
        .unwrap();
    loans
        .return_loan(loan.id, &ReturnLoan { condition: Condition::Damaged, notes: None })
        .await
        .unwrap();

    assert_eq!(
        get_equipment(&client, equipment.id).await.availability(),
        AvailabilityStatus::UnderMaintenance
    );
}

#[tokio::test]
#[ignore]
async fn test_cancel_releases_equipment_unchanged() {
    let (client, loans) = connect().await;
    let equipment = create_equipment(&client, "Crutches pair").await;

    let loan = loans
        .create(&create_request(equipment.id, ChronoDuration::days(7)))
        .await
        .unwrap();
    let cancelled = loans
        .cancel(loan.id, &CancelLoan { reason: "beneficiary moved away".to_string() })
        .await
        .unwrap();

    assert_eq!(cancelled.status, LoanStatus::Cancelled);
    assert_eq!(cancelled.cancel_reason.as_deref(), Some("beneficiary moved away"));
    let after = get_equipment(&client, equipment.id).await;
    assert_eq!(after.availability(), AvailabilityStatus::Available);
    assert_eq!(after.condition, equipment.condition);
}

#[tokio::test]
#[ignore]
async fn test_past_due_loan_is_reported_overdue() {
    let (client, loans) = connect().await;
    let equipment = create_equipment(&client, "Shower chair").await;

    let loan = loans
        .create(&create_request(equipment.id, ChronoDuration::seconds(2)))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;

    // no transition call happened; the read derives the status
    let fetched = loans.get(loan.id).await.unwrap();
    assert_eq!(fetched.status, LoanStatus::Overdue);

    let (listed, _) = loans
        .list(&LoanListQuery { status: Some("overdue".to_string()), limit: Some(100), ..Default::default() })
        .await
        .unwrap();
    assert!(listed.iter().any(|l: &LoanDetails| l.id == loan.id));
}

#[tokio::test]
#[ignore]
async fn test_bulk_update_isolates_failures() {
    let (client, loans) = connect().await;
    let eq_a = create_equipment(&client, "Commode chair").await;
    let eq_b = create_equipment(&client, "Patient lift").await;

    let loan_a = loans.create(&create_request(eq_a.id, ChronoDuration::days(7))).await.unwrap();
    let loan_b = loans.create(&create_request(eq_b.id, ChronoDuration::days(7))).await.unwrap();

    // close B first so the bulk run hits a terminal loan
    loans
        .return_loan(loan_b.id, &ReturnLoan { condition: Condition::Good, notes: None })
        .await
        .unwrap();

    let result = loans
        .bulk_update_status(&BulkStatusUpdate {
            loan_ids: vec![loan_a.id, loan_b.id],
            status: LoanStatus::Returned,
            condition: Some(Condition::Good),
            reason: None,
        })
        .await
        .unwrap();

    assert_eq!(result.succeeded, 1);
    assert_eq!(result.failed, 1);
    let b_result = result.results.iter().find(|r| r.loan_id == loan_b.id).unwrap();
    assert!(!b_result.success);
    assert_eq!(b_result.error.as_deref(), Some("invalid_transition"));

    // A's equipment was released, B's state untouched
    assert_eq!(
        get_equipment(&client, eq_a.id).await.availability(),
        AvailabilityStatus::Available
    );
}

#[tokio::test]
#[ignore]
async fn test_delete_requires_terminal_state() {
    let (client, loans) = connect().await;
    let equipment = create_equipment(&client, "Nebulizer").await;

    let loan = loans.create(&create_request(equipment.id, ChronoDuration::days(7))).await.unwrap();

    match loans.delete(loan.id).await {
        Err(ApiError::Client { status: 409, .. }) => {}
        other => panic!("expected 409, got {:?}", other),
    }

    loans
        .cancel(loan.id, &CancelLoan { reason: "created by mistake".to_string() })
        .await
        .unwrap();
    loans.delete(loan.id).await.expect("Terminal loan should delete");
}

#[tokio::test]
#[ignore]
async fn test_exports_have_expected_shape() {
    let (client, loans) = connect().await;
    let equipment = create_equipment(&client, "Wheelchair, electric").await;
    loans.create(&create_request(equipment.id, ChronoDuration::days(7))).await.unwrap();

    let csv = loans.export_csv(&LoanListQuery::default()).await.unwrap();
    let text = String::from_utf8(csv).unwrap();
    assert!(text.starts_with("id,equipment,serial,borrower"));
    assert!(text.lines().count() >= 2);

    let pdf = loans.export_pdf(&LoanListQuery::default()).await.unwrap();
    assert!(pdf.starts_with(b"%PDF-1.4"));
}

#[tokio::test]
#[ignore]
async fn test_stats_count_reported_statuses() {
    let (client, loans) = connect().await;
    let equipment = create_equipment(&client, "Blood pressure monitor").await;

    let before: LoanStats = loans.stats().await.unwrap();
    loans.create(&create_request(equipment.id, ChronoDuration::days(7))).await.unwrap();
    let after: LoanStats = loans.stats().await.unwrap();

    assert_eq!(after.total, before.total + 1);
    assert_eq!(after.active, before.active + 1);
}

#[tokio::test]
#[ignore]
async fn test_equipment_history_records_transitions() {
    let (client, loans) = connect().await;
    let equipment = create_equipment(&client, "Hoist sling").await;

    let loan = loans.create(&create_request(equipment.id, ChronoDuration::days(7))).await.unwrap();
    loans
        .return_loan(loan.id, &ReturnLoan { condition: Condition::Fair, notes: None })
        .await
        .unwrap();

    let history: Value = client
        .get(&format!("/equipment/{}/history", equipment.id), &[])
        .await
        .unwrap();
    let entries = history.as_array().unwrap();
    assert!(entries.len() >= 2, "expected lend + return entries");
}
