// src/routes/mod.rs

use crate::{
    handlers::{
        company::{get_company_profile, login_company, register_company},
        employee::{
            create_employee, deactivate_employee, get_employee, list_employees, set_base_salary,
        },
        legal_parameter::{
            create_parameter, delete_parameter, get_parameter, list_parameters, revise_parameter,
            set_parameter_status,
        },
        payroll::{
            approve_run, approve_stub, generate_batch, generate_stub, get_run, get_stub,
            list_runs, list_stubs, recompute_run, reject_stub,
        },
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, patch, post},
};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // ─── Companies ────────────────────────────────────────
        .route("/companies/register", post(register_company))
        .route("/companies/login", post(login_company))
        .route("/companies/me", get(get_company_profile))
        // ─── Employees ────────────────────────────────────────
        .route("/employees", post(create_employee).get(list_employees))
        .route(
            "/employees/{employee_id}",
            get(get_employee).delete(deactivate_employee),
        )
        .route("/employees/{employee_id}/salary", patch(set_base_salary))
        // ─── Legal Parameters ─────────────────────────────────
        .route(
            "/legal-parameters",
            post(create_parameter).get(list_parameters),
        )
        .route(
            "/legal-parameters/{parameter_id}",
            get(get_parameter).delete(delete_parameter),
        )
        .route(
            "/legal-parameters/{parameter_id}/revise",
            post(revise_parameter),
        )
        .route(
            "/legal-parameters/{parameter_id}/status",
            patch(set_parameter_status),
        )
        // ─── Payroll ──────────────────────────────────────────
        .route("/payroll/stubs", post(generate_stub).get(list_stubs))
        .route("/payroll/batch", post(generate_batch))
        .route("/payroll/stubs/{stub_id}", get(get_stub))
        .route("/payroll/stubs/{stub_id}/approve", post(approve_stub))
        .route("/payroll/stubs/{stub_id}/reject", post(reject_stub))
        .route("/payroll/runs", get(list_runs))
        .route("/payroll/runs/{run_id}", get(get_run))
        .route("/payroll/runs/{run_id}/approve", post(approve_run))
        .route("/payroll/runs/{run_id}/recompute", post(recompute_run))
}
