// src/openapi.rs

use crate::models::{
    AllowanceInput, ApproveStubRequest, AuthResponse, BatchResult, BatchSkip, BatchStubInput,
    CompanyPublic, CreateEmployeeRequest, CreateParameterRequest, DeductionInput, Employee,
    GenerateBatchRequest, GenerateStubRequest, LegalParameter, LoginRequest, ParameterCategory,
    ParameterStatus, ParameterType, PayStub, PayStubDetail, PayrollRun, PayrollType,
    RegisterCompanyRequest, ReviseParameterRequest, RunStatus, SetBaseSalaryRequest,
    SetParameterStatusRequest, StubAllowance, StubDeduction, StubStatus,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Planilla API",
        version = "1.0.0",
        description = "Payroll administration backend built with Rust and Axum. \
            Company-scoped employees and legal tax/contribution parameters, \
            progressive ISR bracket calculation, pay stub generation with \
            attendance proration and thirteenth-month bonuses, and payroll runs \
            with consistent recomputed totals.",
        license(name = "MIT")
    ),
    paths(
        // Companies
        crate::handlers::company::register_company,
        crate::handlers::company::login_company,
        crate::handlers::company::get_company_profile,
        // Employees
        crate::handlers::employee::create_employee,
        crate::handlers::employee::list_employees,
        crate::handlers::employee::get_employee,
        crate::handlers::employee::set_base_salary,
        crate::handlers::employee::deactivate_employee,
        // Legal parameters
        crate::handlers::legal_parameter::create_parameter,
        crate::handlers::legal_parameter::list_parameters,
        crate::handlers::legal_parameter::get_parameter,
        crate::handlers::legal_parameter::revise_parameter,
        crate::handlers::legal_parameter::set_parameter_status,
        crate::handlers::legal_parameter::delete_parameter,
        // Payroll
        crate::handlers::payroll::generate_stub,
        crate::handlers::payroll::generate_batch,
        crate::handlers::payroll::list_stubs,
        crate::handlers::payroll::get_stub,
        crate::handlers::payroll::approve_stub,
        crate::handlers::payroll::reject_stub,
        crate::handlers::payroll::list_runs,
        crate::handlers::payroll::get_run,
        crate::handlers::payroll::approve_run,
        crate::handlers::payroll::recompute_run,
    ),
    components(
        schemas(
            RegisterCompanyRequest, LoginRequest, AuthResponse, CompanyPublic,
            CreateEmployeeRequest, Employee, SetBaseSalaryRequest,
            CreateParameterRequest, ReviseParameterRequest, SetParameterStatusRequest,
            LegalParameter, ParameterCategory, ParameterType, ParameterStatus,
            GenerateStubRequest, GenerateBatchRequest, BatchStubInput, BatchResult, BatchSkip,
            DeductionInput, AllowanceInput, ApproveStubRequest,
            PayStub, PayStubDetail, StubDeduction, StubAllowance, StubStatus,
            PayrollRun, PayrollType, RunStatus,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Companies", description = "Register, login, and manage your company"),
        (name = "Employees", description = "Onboard and manage employees"),
        (name = "Legal Parameters", description = "Company-scoped tax and contribution rules"),
        (name = "Payroll", description = "Generate stubs and manage payroll runs"),
    )
)]
pub struct ApiDoc;
