//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::api::handlers::{health_handler, unit_handler, user_handler};
use domain::{AssignmentCandidate, BatchOutcome, UnitResponse, UserResponse, UserRole};

/// OpenAPI document served at `/api-docs/openapi.json`
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Unit Admin Service",
        version = "0.1.0",
        description = "User approval and unit assignment administration",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    paths(
        health_handler::health,
        // Users
        user_handler::list_users,
        user_handler::get_user,
        user_handler::register_user,
        user_handler::create_user,
        user_handler::update_user,
        user_handler::reset_password,
        user_handler::approve_user,
        user_handler::bulk_approve,
        user_handler::bulk_reject,
        user_handler::delete_user,
        // Units
        unit_handler::list_units,
        unit_handler::get_unit,
        unit_handler::create_unit,
        unit_handler::update_unit,
        unit_handler::delete_unit,
    ),
    components(
        schemas(
            UserRole,
            UserResponse,
            UnitResponse,
            AssignmentCandidate,
            BatchOutcome,
            user_handler::RegisterRequest,
            user_handler::CreateUserRequest,
            user_handler::UpdateUserRequest,
            user_handler::ResetPasswordRequest,
            user_handler::ApproveUserRequest,
            user_handler::BulkApproveRequest,
            user_handler::BulkRejectRequest,
            user_handler::BulkRejectResponse,
            unit_handler::CreateUnitRequest,
            unit_handler::UpdateUnitRequest,
        )
    ),
    tags(
        (name = "Health", description = "Liveness and database connectivity"),
        (name = "Users", description = "Registration, approval and user maintenance"),
        (name = "Units", description = "Organizational unit maintenance")
    )
)]
pub struct ApiDoc;
