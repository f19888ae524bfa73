// src/handlers/legal_parameter.rs

use crate::{
    auth::AuthCompany,
    errors::{AppError, AppResult},
    models::{
        CreateParameterRequest, LegalParameter, ParameterCategory, ParameterStatus,
        ReviseParameterRequest, SetParameterStatusRequest,
    },
    state::AppState,
    store::{NewLegalParameter, ParameterRevision},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use rust_decimal_macros::dec;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ParameterListQuery {
    pub category: Option<ParameterCategory>,
    pub status: Option<ParameterStatus>,
}

// Keys are normalized the way the rest of the data set expects them:
// lowercase snake_case, ascii alphanumerics only.
fn normalize_key(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

fn validate_ranges(
    percentage: rust_decimal::Decimal,
    min_range: Option<rust_decimal::Decimal>,
    max_range: Option<rust_decimal::Decimal>,
) -> AppResult<()> {
    if percentage < dec!(0) {
        return Err(AppError::Validation(
            "Percentage cannot be negative".to_string(),
        ));
    }
    if let (Some(min), Some(max)) = (min_range, max_range)
        && min > max
    {
        return Err(AppError::Validation(
            "minRange cannot be greater than maxRange".to_string(),
        ));
    }
    Ok(())
}

/// Create a legal tax/contribution parameter
#[utoipa::path(
    post,
    path = "/api/v1/legal-parameters",
    request_body = CreateParameterRequest,
    responses(
        (status = 201, description = "Parameter created", body = LegalParameter),
        (status = 409, description = "Key already exists for this effective date"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Legal Parameters"
)]
pub async fn create_parameter(
    auth: AuthCompany,
    State(state): State<AppState>,
    Json(body): Json<CreateParameterRequest>,
) -> AppResult<(StatusCode, Json<LegalParameter>)> {
    let key = normalize_key(&body.key);
    if key.is_empty() || body.name.trim().is_empty() {
        return Err(AppError::Validation(
            "Parameter key and name are required".to_string(),
        ));
    }
    validate_ranges(body.percentage, body.min_range, body.max_range)?;

    let parameter = state
        .store
        .create_parameter(NewLegalParameter {
            company_id: auth.id,
            key,
            name: body.name,
            category: body.category,
            param_type: body.param_type,
            percentage: body.percentage,
            min_range: body.min_range,
            max_range: body.max_range,
            description: body.description,
            effective_date: body.effective_date.unwrap_or_else(|| Utc::now().date_naive()),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(parameter)))
}

/// List legal parameters, optionally filtered by category and status
#[utoipa::path(
    get,
    path = "/api/v1/legal-parameters",
    params(ParameterListQuery),
    responses(
        (status = 200, description = "List of parameters", body = Vec<LegalParameter>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Legal Parameters"
)]
pub async fn list_parameters(
    auth: AuthCompany,
    State(state): State<AppState>,
    Query(query): Query<ParameterListQuery>,
) -> AppResult<Json<Vec<LegalParameter>>> {
    let parameters = state
        .store
        .list_parameters(auth.id, query.category, query.status)
        .await?;
    Ok(Json(parameters))
}

/// Get a single legal parameter
#[utoipa::path(
    get,
    path = "/api/v1/legal-parameters/{parameter_id}",
    params(("parameter_id" = Uuid, Path, description = "Parameter ID")),
    responses(
        (status = 200, description = "Parameter detail", body = LegalParameter),
        (status = 404, description = "Parameter not found"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Legal Parameters"
)]
pub async fn get_parameter(
    auth: AuthCompany,
    State(state): State<AppState>,
    Path(parameter_id): Path<Uuid>,
) -> AppResult<Json<LegalParameter>> {
    let parameter = state
        .store
        .find_parameter(auth.id, parameter_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Legal parameter {} not found", parameter_id))
        })?;
    Ok(Json(parameter))
}

/// Revise a parameter's rates. History is never mutated in place: the old
/// row is deactivated and an active successor is inserted with the new
/// effective date, so stubs already built keep pointing at the data they
/// were computed from.
#[utoipa::path(
    post,
    path = "/api/v1/legal-parameters/{parameter_id}/revise",
    request_body = ReviseParameterRequest,
    params(("parameter_id" = Uuid, Path, description = "Parameter ID")),
    responses(
        (status = 201, description = "Successor parameter created", body = LegalParameter),
        (status = 404, description = "Parameter not found"),
        (status = 409, description = "Revision for that effective date already exists"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Legal Parameters"
)]
pub async fn revise_parameter(
    auth: AuthCompany,
    State(state): State<AppState>,
    Path(parameter_id): Path<Uuid>,
    Json(body): Json<ReviseParameterRequest>,
) -> AppResult<(StatusCode, Json<LegalParameter>)> {
    validate_ranges(body.percentage, body.min_range, body.max_range)?;

    let successor = state
        .store
        .supersede_parameter(
            auth.id,
            parameter_id,
            ParameterRevision {
                percentage: body.percentage,
                min_range: body.min_range,
                max_range: body.max_range,
                description: body.description,
                effective_date: body.effective_date.unwrap_or_else(|| Utc::now().date_naive()),
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(successor)))
}

/// Activate or deactivate a parameter
#[utoipa::path(
    patch,
    path = "/api/v1/legal-parameters/{parameter_id}/status",
    request_body = SetParameterStatusRequest,
    params(("parameter_id" = Uuid, Path, description = "Parameter ID")),
    responses(
        (status = 200, description = "Status updated", body = LegalParameter),
        (status = 404, description = "Parameter not found"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Legal Parameters"
)]
pub async fn set_parameter_status(
    auth: AuthCompany,
    State(state): State<AppState>,
    Path(parameter_id): Path<Uuid>,
    Json(body): Json<SetParameterStatusRequest>,
) -> AppResult<Json<LegalParameter>> {
    let parameter = state
        .store
        .set_parameter_status(auth.id, parameter_id, body.status)
        .await?;
    Ok(Json(parameter))
}

/// Delete an inactive parameter
#[utoipa::path(
    delete,
    path = "/api/v1/legal-parameters/{parameter_id}",
    params(("parameter_id" = Uuid, Path, description = "Parameter ID")),
    responses(
        (status = 200, description = "Parameter deleted"),
        (status = 404, description = "Parameter not found"),
        (status = 409, description = "Parameter is still active"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Legal Parameters"
)]
pub async fn delete_parameter(
    auth: AuthCompany,
    State(state): State<AppState>,
    Path(parameter_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    state.store.delete_parameter(auth.id, parameter_id).await?;
    Ok(Json(serde_json::json!({
        "message": "Legal parameter deleted successfully",
        "id": parameter_id,
    })))
}
