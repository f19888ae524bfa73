// src/handlers/company.rs

use crate::{
    auth::{AuthCompany, generate_token},
    errors::{AppError, AppResult},
    models::{AuthResponse, CompanyPublic, LoginRequest, RegisterCompanyRequest},
    state::AppState,
    store::NewCompany,
};
use axum::{Json, extract::State, http::StatusCode};
use bcrypt::{DEFAULT_COST, hash, verify};

/// Register a new company
#[utoipa::path(
    post,
    path = "/api/v1/companies/register",
    request_body = RegisterCompanyRequest,
    responses(
        (status = 201, description = "Company registered", body = AuthResponse),
        (status = 409, description = "Email already exists"),
    ),
    tag = "Companies"
)]
pub async fn register_company(
    State(state): State<AppState>,
    Json(body): Json<RegisterCompanyRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    if body.name.trim().is_empty() || body.email.trim().is_empty() {
        return Err(AppError::Validation(
            "Company name and email are required".to_string(),
        ));
    }

    let password_hash =
        hash(&body.password, DEFAULT_COST).map_err(|e| AppError::Internal(e.to_string()))?;

    let company = state
        .store
        .create_company(NewCompany {
            name: body.name,
            email: body.email,
            password_hash,
        })
        .await?;

    let token = generate_token(
        company.id,
        &company.name,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            company: company.into(),
        }),
    ))
}

/// Login a company
#[utoipa::path(
    post,
    path = "/api/v1/companies/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
    ),
    tag = "Companies"
)]
pub async fn login_company(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let company = state
        .store
        .find_company_by_email(&body.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    let valid = verify(&body.password, &company.password_hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    if !valid {
        return Err(AppError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    let token = generate_token(
        company.id,
        &company.name,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )?;

    Ok(Json(AuthResponse {
        token,
        company: company.into(),
    }))
}

/// Get current company profile
#[utoipa::path(
    get,
    path = "/api/v1/companies/me",
    responses(
        (status = 200, description = "Company profile", body = CompanyPublic),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Companies"
)]
pub async fn get_company_profile(
    auth: AuthCompany,
    State(state): State<AppState>,
) -> AppResult<Json<CompanyPublic>> {
    let company = state
        .store
        .find_company(auth.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Company not found".to_string()))?;

    Ok(Json(company.into()))
}
