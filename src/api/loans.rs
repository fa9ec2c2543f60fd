//! Loan endpoints

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::loan::{
        BulkResult, BulkStatusUpdate, CancelLoan, CreateLoan, Loan, LoanDetails, LoanQuery,
        LoanStats, ReturnLoan,
    },
    services::export,
};

use super::AuthenticatedUser;

/// Pagination metadata of the list envelope
#[derive(Serialize, ToSchema)]
pub struct PaginationMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

/// Loan list response envelope
#[derive(Serialize, ToSchema)]
pub struct LoanListResponse {
    pub success: bool,
    pub data: Vec<LoanDetails>,
    pub pagination: PaginationMeta,
}

/// List loans with filtering, search and pagination
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(LoanQuery),
    responses(
        (status = 200, description = "Paginated loan list", body = LoanListResponse),
        (status = 400, description = "Invalid filter")
    )
)]
pub async fn list_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<LoanQuery>,
) -> AppResult<Json<LoanListResponse>> {
    claims.require_staff()?;

    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let (loans, total) = state.services.loans.list(&query).await?;

    Ok(Json(LoanListResponse {
        success: true,
        data: loans,
        pagination: PaginationMeta { page, limit, total },
    }))
}

/// Loan details by id (status derived at read time)
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan details", body = LoanDetails),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<LoanDetails>> {
    claims.require_staff()?;
    let loan = state.services.loans.get(id).await?;
    Ok(Json(loan))
}

/// Create a loan on an available equipment item
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Loan created", body = LoanDetails),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Equipment not found"),
        (status = 409, description = "Equipment unavailable")
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateLoan>,
) -> AppResult<(StatusCode, Json<LoanDetails>)> {
    claims.require_staff()?;
    let loan = state.services.loans.create_loan(claims.user_id, request).await?;
    let details = state.services.loans.get(loan.id).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

/// Return the equipment of an open loan
#[utoipa::path(
    put,
    path = "/loans/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    request_body = ReturnLoan,
    responses(
        (status = 200, description = "Loan returned", body = LoanDetails),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan already closed")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<ReturnLoan>,
) -> AppResult<Json<LoanDetails>> {
    claims.require_staff()?;
    let loan: Loan = state
        .services
        .loans
        .return_loan(claims.user_id, id, request)
        .await?;
    let details = state.services.loans.get(loan.id).await?;
    Ok(Json(details))
}

/// Cancel an open loan
#[utoipa::path(
    put,
    path = "/loans/{id}/cancel",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    request_body = CancelLoan,
    responses(
        (status = 200, description = "Loan cancelled", body = LoanDetails),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan already closed")
    )
)]
pub async fn cancel_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<CancelLoan>,
) -> AppResult<Json<LoanDetails>> {
    claims.require_staff()?;
    let loan = state
        .services
        .loans
        .cancel_loan(claims.user_id, id, request)
        .await?;
    let details = state.services.loans.get(loan.id).await?;
    Ok(Json(details))
}

/// Return or cancel a batch of loans, reporting per-id outcomes
#[utoipa::path(
    patch,
    path = "/loans/bulk-update-status",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = BulkStatusUpdate,
    responses(
        (status = 200, description = "Per-id results", body = BulkResult),
        (status = 400, description = "Invalid target status")
    )
)]
pub async fn bulk_update_status(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<BulkStatusUpdate>,
) -> AppResult<Json<BulkResult>> {
    claims.require_staff()?;
    let result = state
        .services
        .loans
        .bulk_update_status(claims.user_id, request)
        .await?;
    Ok(Json(result))
}

/// Delete a closed loan record
#[utoipa::path(
    delete,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 204, description = "Loan deleted"),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan is still open")
    )
)]
pub async fn delete_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;
    state.services.loans.delete_loan(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Aggregate loan counts per reported status
#[utoipa::path(
    get,
    path = "/loans/stats",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Loan statistics", body = LoanStats)
    )
)]
pub async fn loan_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<LoanStats>> {
    claims.require_staff()?;
    let stats = state.services.loans.stats().await?;
    Ok(Json(stats))
}

/// Export the filtered loan set as CSV
#[utoipa::path(
    get,
    path = "/loans/export/csv",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(LoanQuery),
    responses(
        (status = 200, description = "CSV byte stream")
    )
)]
pub async fn export_csv(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<LoanQuery>,
) -> AppResult<Response> {
    claims.require_staff()?;
    let loans = state.services.loans.list_for_export(&query).await?;
    let csv = export::loans_to_csv(&loans);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"loans.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}

/// Export the filtered loan set as PDF
#[utoipa::path(
    get,
    path = "/loans/export/pdf",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(LoanQuery),
    responses(
        (status = 200, description = "PDF byte stream")
    )
)]
pub async fn export_pdf(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<LoanQuery>,
) -> AppResult<Response> {
    claims.require_staff()?;
    let loans = state.services.loans.list_for_export(&query).await?;
    let pdf = export::loans_to_pdf(&loans);

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"loans.pdf\"",
            ),
        ],
        pdf,
    )
        .into_response())
}
