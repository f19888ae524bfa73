// src/handlers/payroll.rs

use crate::{
    auth::AuthCompany,
    errors::{AppError, AppResult},
    models::{
        ApproveStubRequest, BatchResult, GenerateBatchRequest, GenerateStubRequest, PayStub,
        PayStubDetail, PayrollRun, StubFilter,
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

/// Generate a pay stub for one employee.
/// The owning payroll run is created on first use of its period key and its
/// totals are recomputed in the same transaction.
#[utoipa::path(
    post,
    path = "/api/v1/payroll/stubs",
    request_body = GenerateStubRequest,
    responses(
        (status = 201, description = "Pay stub created", body = PayStub),
        (status = 400, description = "Invalid salary or attendance input"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Stub already exists, or the run is already approved"),
        (status = 422, description = "Malformed legal parameter data"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn generate_stub(
    auth: AuthCompany,
    State(state): State<AppState>,
    Json(body): Json<GenerateStubRequest>,
) -> AppResult<(StatusCode, Json<PayStub>)> {
    let (stub, _run) = state
        .payroll
        .generate_stub(auth.id, body, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(stub)))
}

/// Generate stubs for many employees under a single payroll run.
/// Best-effort per item: unresolvable employees are skipped and reported,
/// not fatal to the batch.
#[utoipa::path(
    post,
    path = "/api/v1/payroll/batch",
    request_body = GenerateBatchRequest,
    responses(
        (status = 201, description = "Batch processed", body = BatchResult),
        (status = 409, description = "Run for this period is already approved"),
        (status = 422, description = "Malformed legal parameter data"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn generate_batch(
    auth: AuthCompany,
    State(state): State<AppState>,
    Json(body): Json<GenerateBatchRequest>,
) -> AppResult<(StatusCode, Json<BatchResult>)> {
    let result = state
        .payroll
        .generate_batch(auth.id, body, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// List pay stubs, optionally filtered by employee, run, or status
#[utoipa::path(
    get,
    path = "/api/v1/payroll/stubs",
    params(
        ("employee_id" = Option<Uuid>, Query, description = "Filter by employee"),
        ("run_id" = Option<Uuid>, Query, description = "Filter by payroll run"),
        ("status" = Option<String>, Query, description = "Filter by stub status"),
    ),
    responses((status = 200, description = "List of pay stubs", body = Vec<PayStub>)),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_stubs(
    auth: AuthCompany,
    State(state): State<AppState>,
    Query(filter): Query<StubFilter>,
) -> AppResult<Json<Vec<PayStub>>> {
    let stubs = state.store.list_stubs(auth.id, filter).await?;
    Ok(Json(stubs))
}

/// Get one pay stub with its itemized deductions and allowances
#[utoipa::path(
    get,
    path = "/api/v1/payroll/stubs/{stub_id}",
    params(("stub_id" = Uuid, Path, description = "Pay stub ID")),
    responses(
        (status = 200, description = "Pay stub detail", body = PayStubDetail),
        (status = 404, description = "Stub not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn get_stub(
    auth: AuthCompany,
    State(state): State<AppState>,
    Path(stub_id): Path<Uuid>,
) -> AppResult<Json<PayStubDetail>> {
    let stub = state
        .store
        .find_stub(auth.id, stub_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Pay stub {} not found", stub_id)))?;
    Ok(Json(stub))
}

/// Approve a draft pay stub
#[utoipa::path(
    post,
    path = "/api/v1/payroll/stubs/{stub_id}/approve",
    request_body = ApproveStubRequest,
    params(("stub_id" = Uuid, Path, description = "Pay stub ID")),
    responses(
        (status = 200, description = "Stub approved", body = PayStub),
        (status = 404, description = "Stub not found"),
        (status = 409, description = "Stub or its run is no longer draft"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn approve_stub(
    auth: AuthCompany,
    State(state): State<AppState>,
    Path(stub_id): Path<Uuid>,
    Json(body): Json<ApproveStubRequest>,
) -> AppResult<Json<PayStub>> {
    if body.approved_by.trim().is_empty() {
        return Err(AppError::Validation("approved_by is required".to_string()));
    }
    let (stub, _run) = state
        .payroll
        .approve_stub(auth.id, stub_id, body.approved_by, Utc::now())
        .await?;
    Ok(Json(stub))
}

/// Reject a draft pay stub. The owning run stays draft.
#[utoipa::path(
    post,
    path = "/api/v1/payroll/stubs/{stub_id}/reject",
    params(("stub_id" = Uuid, Path, description = "Pay stub ID")),
    responses(
        (status = 200, description = "Stub rejected", body = PayStub),
        (status = 404, description = "Stub not found"),
        (status = 409, description = "Stub or its run is no longer draft"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn reject_stub(
    auth: AuthCompany,
    State(state): State<AppState>,
    Path(stub_id): Path<Uuid>,
) -> AppResult<Json<PayStub>> {
    let (stub, _run) = state
        .payroll
        .reject_stub(auth.id, stub_id, Utc::now())
        .await?;
    Ok(Json(stub))
}

/// List all payroll runs for the company
#[utoipa::path(
    get,
    path = "/api/v1/payroll/runs",
    responses((status = 200, description = "List of payroll runs", body = Vec<PayrollRun>)),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_runs(
    auth: AuthCompany,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<PayrollRun>>> {
    let runs = state.store.list_runs(auth.id).await?;
    Ok(Json(runs))
}

/// Get one payroll run with its cached totals
#[utoipa::path(
    get,
    path = "/api/v1/payroll/runs/{run_id}",
    params(("run_id" = Uuid, Path, description = "Payroll run ID")),
    responses(
        (status = 200, description = "Payroll run detail", body = PayrollRun),
        (status = 404, description = "Run not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn get_run(
    auth: AuthCompany,
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> AppResult<Json<PayrollRun>> {
    let run = state
        .store
        .find_run(auth.id, run_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Payroll run {} not found", run_id)))?;
    Ok(Json(run))
}

/// Approve a payroll run. Terminal: an approved run never re-opens, and its
/// stubs can no longer change status.
#[utoipa::path(
    post,
    path = "/api/v1/payroll/runs/{run_id}/approve",
    params(("run_id" = Uuid, Path, description = "Payroll run ID")),
    responses(
        (status = 200, description = "Run approved", body = PayrollRun),
        (status = 404, description = "Run not found"),
        (status = 409, description = "Run is already approved"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn approve_run(
    auth: AuthCompany,
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> AppResult<Json<PayrollRun>> {
    let run = state.payroll.approve_run(auth.id, run_id).await?;
    Ok(Json(run))
}

/// Recompute a run's totals from its current stubs.
/// A full recompute over every linked stub regardless of stub status —
/// idempotent, and immune to drift from missed update events.
#[utoipa::path(
    post,
    path = "/api/v1/payroll/runs/{run_id}/recompute",
    params(("run_id" = Uuid, Path, description = "Payroll run ID")),
    responses(
        (status = 200, description = "Totals recomputed", body = PayrollRun),
        (status = 404, description = "Run not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn recompute_run(
    auth: AuthCompany,
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> AppResult<Json<PayrollRun>> {
    let run = state.payroll.recompute_run(auth.id, run_id).await?;
    Ok(Json(run))
}
