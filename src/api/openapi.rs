//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, equipment, health, loans};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Amana API",
        version = "1.0.0",
        description = "Association Management System REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html"),
        contact(name = "Amana Dev Team", email = "dev@amana-asso.org")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::me,
        // Equipment
        equipment::list_equipment,
        equipment::get_equipment,
        equipment::equipment_history,
        equipment::create_equipment,
        equipment::update_equipment,
        equipment::delete_equipment,
        // Loans
        loans::list_loans,
        loans::get_loan,
        loans::create_loan,
        loans::return_loan,
        loans::cancel_loan,
        loans::bulk_update_status,
        loans::delete_loan,
        loans::loan_stats,
        loans::export_csv,
        loans::export_pdf,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            crate::models::user::UserInfo,
            // Equipment
            crate::models::equipment::Equipment,
            crate::models::equipment::CreateEquipment,
            crate::models::equipment::UpdateEquipment,
            crate::models::equipment::EquipmentHistoryEntry,
            crate::models::enums::AvailabilityStatus,
            crate::models::enums::Condition,
            crate::models::enums::EquipmentCategory,
            // Loans
            crate::models::loan::BorrowerInfo,
            crate::models::loan::CreateLoan,
            crate::models::loan::ReturnLoan,
            crate::models::loan::CancelLoan,
            crate::models::loan::BulkStatusUpdate,
            crate::models::loan::BulkItemResult,
            crate::models::loan::BulkResult,
            crate::models::loan::LoanDetails,
            crate::models::loan::LoanStats,
            crate::models::enums::LoanStatus,
            loans::LoanListResponse,
            loans::PaginationMeta,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "equipment", description = "Equipment inventory and availability"),
        (name = "loans", description = "Loan lifecycle, queries and exports")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
