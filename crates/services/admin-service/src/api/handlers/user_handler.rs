//! User management handlers.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::{Actor, ValidatedJson};
use crate::api::AppState;
use crate::repository::UserPage;
use crate::types::{ApiResponse, Created, Paginated, PaginationParams};
use common::AppResult;
use domain::{
    ApproveUser, AssignmentCandidate, BatchOutcome, CreateUser, RegisterUser, UpdateUser,
    UserResponse, UserRole,
};

/// Self-registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50, message = "Username must be 3 to 50 characters"))]
    #[schema(example = "jdelacruz")]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "user@example.com")]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(min_length = 8)]
    pub password: String,
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    #[schema(example = "Juan Dela Cruz")]
    pub name: String,
}

/// Admin user creation request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 3, max = 50, message = "Username must be 3 to 50 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    /// Defaults to `pending`
    pub role: Option<UserRole>,
    pub unit_id: Option<Uuid>,
}

/// Full profile update; every field is written
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 3, max = 50, message = "Username must be 3 to 50 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    pub role: UserRole,
    /// `null` clears the assignment
    pub unit_id: Option<Uuid>,
}

/// Password reset request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Single approval request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ApproveUserRequest {
    pub role: UserRole,
    pub unit_id: Uuid,
}

/// Bulk approval request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BulkApproveRequest {
    pub users: Vec<AssignmentCandidate>,
}

/// Bulk rejection request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BulkRejectRequest {
    pub user_ids: Vec<Uuid>,
}

/// Bulk rejection result
#[derive(Debug, Serialize, ToSchema)]
pub struct BulkRejectResponse {
    /// Users actually deleted
    pub removed: u64,
}

/// Optional listing filter
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserFilter {
    /// e.g. `pending` for the approval queue
    pub role: Option<UserRole>,
}

/// Create user routes
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/register", post(register_user))
        .route("/approve", post(bulk_approve))
        .route("/reject", post(bulk_reject))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
        .route("/:id/password", put(reset_password))
        .route("/:id/approve", post(approve_user))
}

/// List users ordered by name
#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    params(PaginationParams, UserFilter),
    responses(
        (status = 200, description = "One page of users")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
    Query(filter): Query<UserFilter>,
) -> AppResult<Json<ApiResponse<Paginated<UserResponse>>>> {
    let page = UserPage {
        page: params.page(),
        per_page: params.limit(),
        role: filter.role,
    };
    let (users, total) = state.user_service.list_users(page).await?;

    let data = users.into_iter().map(UserResponse::from).collect();
    Ok(Json(ApiResponse::success(Paginated::new(
        data,
        page.page,
        page.per_page,
        total,
    ))))
}

/// Get user by ID
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    let user = state.user_service.get_user(id).await?;
    Ok(Json(ApiResponse::success(UserResponse::from(user))))
}

/// Register a new account; it waits for approval
#[utoipa::path(
    post,
    path = "/users/register",
    tag = "Users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered as pending", body = UserResponse),
        (status = 409, description = "Username or email taken"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> AppResult<Created<UserResponse>> {
    let user = state
        .user_service
        .register_user(RegisterUser {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            name: payload.name,
        })
        .await?;

    Ok(Created(UserResponse::from(user)))
}

/// Create a user directly
#[utoipa::path(
    post,
    path = "/users",
    tag = "Users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 409, description = "Username or email taken"),
        (status = 422, description = "Validation error or DO unit already held")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> AppResult<Created<UserResponse>> {
    let user = state
        .user_service
        .create_user(CreateUser {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            name: payload.name,
            role: payload.role,
            unit_id: payload.unit_id,
        })
        .await?;

    Ok(Created(UserResponse::from(user)))
}

/// Update a user's profile, role and unit
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 404, description = "User not found"),
        (status = 422, description = "Validation error or DO unit already held")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    let user = state
        .user_service
        .update_user(
            id,
            UpdateUser {
                username: payload.username,
                email: payload.email,
                name: payload.name,
                role: payload.role,
                unit_id: payload.unit_id,
            },
        )
        .await?;

    Ok(Json(ApiResponse::with_message(
        UserResponse::from(user),
        "User updated successfully.",
    )))
}

/// Set a new password
#[utoipa::path(
    put,
    path = "/users/{id}/password",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset"),
        (status = 404, description = "User not found")
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<ResetPasswordRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.user_service.reset_password(id, payload.password).await?;
    Ok(Json(ApiResponse::message("Password reset successfully.")))
}

/// Approve one user into a unit
#[utoipa::path(
    post,
    path = "/users/{id}/approve",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = ApproveUserRequest,
    responses(
        (status = 200, description = "User approved", body = UserResponse),
        (status = 404, description = "User not found"),
        (status = 422, description = "DO unit already held")
    )
)]
pub async fn approve_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<ApproveUserRequest>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    let user = state
        .user_service
        .approve_user(
            id,
            ApproveUser {
                role: payload.role,
                unit_id: payload.unit_id,
            },
        )
        .await?;

    Ok(Json(ApiResponse::with_message(
        UserResponse::from(user),
        "User approved successfully.",
    )))
}

/// Approve many pending users in one transaction
#[utoipa::path(
    post,
    path = "/users/approve",
    tag = "Users",
    request_body = BulkApproveRequest,
    responses(
        (status = 200, description = "Batch applied", body = BatchOutcome),
        (status = 422, description = "Batch rejected; nothing written")
    )
)]
pub async fn bulk_approve(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<BulkApproveRequest>,
) -> AppResult<Json<ApiResponse<BatchOutcome>>> {
    let outcome = state.user_service.bulk_approve(payload.users).await?;

    let message = format!("{} user(s) approved.", outcome.applied_count());
    Ok(Json(ApiResponse::with_message(outcome, message)))
}

/// Delete pending registrations
#[utoipa::path(
    post,
    path = "/users/reject",
    tag = "Users",
    request_body = BulkRejectRequest,
    responses(
        (status = 200, description = "Users removed", body = BulkRejectResponse)
    )
)]
pub async fn bulk_reject(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<BulkRejectRequest>,
) -> AppResult<Json<ApiResponse<BulkRejectResponse>>> {
    let removed = state.user_service.bulk_reject(payload.user_ids).await?;

    Ok(Json(ApiResponse::with_message(
        BulkRejectResponse { removed },
        format!("{} user(s) rejected.", removed),
    )))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "Users",
    params(
        ("id" = Uuid, Path, description = "User ID"),
        ("x-user-id" = Uuid, Header, description = "Acting user")
    ),
    responses(
        (status = 200, description = "User deleted"),
        (status = 400, description = "Attempt to delete own account"),
        (status = 401, description = "Acting user missing"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Actor(actor_id): Actor,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.user_service.delete_user(actor_id, id).await?;
    Ok(Json(ApiResponse::message("User deleted successfully.")))
}
