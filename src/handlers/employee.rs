// src/handlers/employee.rs

use crate::{
    auth::AuthCompany,
    errors::{AppError, AppResult},
    models::{CreateEmployeeRequest, Employee, SetBaseSalaryRequest},
    state::AppState,
    store::NewEmployee,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rust_decimal_macros::dec;
use uuid::Uuid;

/// Onboard a new employee
#[utoipa::path(
    post,
    path = "/api/v1/employees",
    request_body = CreateEmployeeRequest,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Cedula or access-user link already taken"),
    ),
    security(("bearer_auth" = [])),
    tag = "Employees"
)]
pub async fn create_employee(
    auth: AuthCompany,
    State(state): State<AppState>,
    Json(body): Json<CreateEmployeeRequest>,
) -> AppResult<(StatusCode, Json<Employee>)> {
    if body.cedula.trim().is_empty() {
        return Err(AppError::Validation("Cedula is required".to_string()));
    }
    if body.base_salary < dec!(0) {
        return Err(AppError::Validation(
            "Base salary cannot be negative".to_string(),
        ));
    }

    let employee = state
        .store
        .create_employee(NewEmployee {
            company_id: auth.id,
            cedula: body.cedula,
            first_name: body.first_name,
            last_name: body.last_name,
            email: body.email,
            position: body.position,
            base_salary: body.base_salary,
            hire_date: body.hire_date,
            access_user_id: body.access_user_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(employee)))
}

/// List all employees for the authenticated company
#[utoipa::path(
    get,
    path = "/api/v1/employees",
    responses(
        (status = 200, description = "List of employees", body = Vec<Employee>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Employees"
)]
pub async fn list_employees(
    auth: AuthCompany,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Employee>>> {
    let employees = state.store.list_employees(auth.id).await?;
    Ok(Json(employees))
}

/// Get a single employee
#[utoipa::path(
    get,
    path = "/api/v1/employees/{employee_id}",
    params(("employee_id" = Uuid, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee detail", body = Employee),
        (status = 404, description = "Employee not found"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Employees"
)]
pub async fn get_employee(
    auth: AuthCompany,
    State(state): State<AppState>,
    Path(employee_id): Path<Uuid>,
) -> AppResult<Json<Employee>> {
    let employee = state
        .store
        .find_employee(employee_id)
        .await?
        .filter(|e| e.company_id == auth.id)
        .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", employee_id)))?;

    Ok(Json(employee))
}

/// Set an employee's base salary
#[utoipa::path(
    patch,
    path = "/api/v1/employees/{employee_id}/salary",
    request_body = SetBaseSalaryRequest,
    params(("employee_id" = Uuid, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Salary updated", body = Employee),
        (status = 404, description = "Employee not found"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Employees"
)]
pub async fn set_base_salary(
    auth: AuthCompany,
    State(state): State<AppState>,
    Path(employee_id): Path<Uuid>,
    Json(body): Json<SetBaseSalaryRequest>,
) -> AppResult<Json<Employee>> {
    if body.base_salary < dec!(0) {
        return Err(AppError::Validation(
            "Base salary cannot be negative".to_string(),
        ));
    }

    let employee = state
        .store
        .set_base_salary(auth.id, employee_id, body.base_salary)
        .await?;
    Ok(Json(employee))
}

/// Deactivate (soft-delete) an employee
#[utoipa::path(
    delete,
    path = "/api/v1/employees/{employee_id}",
    params(("employee_id" = Uuid, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee deactivated"),
        (status = 404, description = "Employee not found"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Employees"
)]
pub async fn deactivate_employee(
    auth: AuthCompany,
    State(state): State<AppState>,
    Path(employee_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    state.store.deactivate_employee(auth.id, employee_id).await?;
    Ok(Json(
        serde_json::json!({ "message": "Employee deactivated successfully" }),
    ))
}
