//! Unit maintenance handlers.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::AppState;
use crate::types::{ApiResponse, Created};
use common::AppResult;
use domain::{CreateUnit, UnitResponse, UpdateUnit};

/// Unit creation request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUnitRequest {
    #[validate(length(min = 1, max = 50, message = "Code is required"))]
    #[schema(example = "CPMSD-DO")]
    pub code: String,
    /// `DEPARTMENT/SUBUNIT`; stored upper-cased
    #[validate(length(min = 3, max = 255, message = "Full name is required"))]
    #[schema(example = "CPMSD/DO")]
    pub full_name: String,
    /// Defaults to `true`
    pub is_active: Option<bool>,
}

/// Unit update request; omitted fields are kept
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUnitRequest {
    #[validate(length(min = 1, max = 50, message = "Code is required"))]
    pub code: Option<String>,
    #[validate(length(min = 3, max = 255, message = "Full name is required"))]
    pub full_name: Option<String>,
    pub is_active: Option<bool>,
}

/// Unit listing filter
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UnitFilter {
    /// Only units marked active
    #[serde(default)]
    pub active_only: bool,
}

/// Create unit routes
pub fn unit_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_units).post(create_unit))
        .route("/:id", get(get_unit).put(update_unit).delete(delete_unit))
}

/// List units ordered by full name
#[utoipa::path(
    get,
    path = "/units",
    tag = "Units",
    params(UnitFilter),
    responses(
        (status = 200, description = "All units", body = [UnitResponse])
    )
)]
pub async fn list_units(
    State(state): State<AppState>,
    Query(filter): Query<UnitFilter>,
) -> AppResult<Json<ApiResponse<Vec<UnitResponse>>>> {
    let units = state.unit_service.list_units(filter.active_only).await?;
    Ok(Json(ApiResponse::success(
        units.into_iter().map(UnitResponse::from).collect(),
    )))
}

/// Get unit by ID
#[utoipa::path(
    get,
    path = "/units/{id}",
    tag = "Units",
    params(("id" = Uuid, Path, description = "Unit ID")),
    responses(
        (status = 200, description = "Unit found", body = UnitResponse),
        (status = 404, description = "Unit not found")
    )
)]
pub async fn get_unit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<UnitResponse>>> {
    let unit = state.unit_service.get_unit(id).await?;
    Ok(Json(ApiResponse::success(UnitResponse::from(unit))))
}

/// Create a unit
#[utoipa::path(
    post,
    path = "/units",
    tag = "Units",
    request_body = CreateUnitRequest,
    responses(
        (status = 201, description = "Unit created", body = UnitResponse),
        (status = 409, description = "Code or full name taken"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn create_unit(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateUnitRequest>,
) -> AppResult<Created<UnitResponse>> {
    let unit = state
        .unit_service
        .create_unit(CreateUnit {
            code: payload.code,
            full_name: payload.full_name,
            is_active: payload.is_active,
        })
        .await?;

    Ok(Created(UnitResponse::from(unit)))
}

/// Update a unit
#[utoipa::path(
    put,
    path = "/units/{id}",
    tag = "Units",
    params(("id" = Uuid, Path, description = "Unit ID")),
    request_body = UpdateUnitRequest,
    responses(
        (status = 200, description = "Unit updated", body = UnitResponse),
        (status = 404, description = "Unit not found"),
        (status = 409, description = "Code or full name taken"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn update_unit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateUnitRequest>,
) -> AppResult<Json<ApiResponse<UnitResponse>>> {
    let unit = state
        .unit_service
        .update_unit(
            id,
            UpdateUnit {
                code: payload.code,
                full_name: payload.full_name,
                is_active: payload.is_active,
            },
        )
        .await?;

    Ok(Json(ApiResponse::with_message(
        UnitResponse::from(unit),
        "Unit updated successfully.",
    )))
}

/// Delete an unused unit
#[utoipa::path(
    delete,
    path = "/units/{id}",
    tag = "Units",
    params(("id" = Uuid, Path, description = "Unit ID")),
    responses(
        (status = 200, description = "Unit deleted"),
        (status = 400, description = "Unit still assigned to users"),
        (status = 404, description = "Unit not found")
    )
)]
pub async fn delete_unit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.unit_service.delete_unit(id).await?;
    Ok(Json(ApiResponse::message("Unit deleted successfully.")))
}
