// src/models/mod.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// ─── Company ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterCompanyRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub company: CompanyPublic,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CompanyPublic {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<Company> for CompanyPublic {
    fn from(company: Company) -> Self {
        CompanyPublic {
            id: company.id,
            name: company.name,
            email: company.email,
            created_at: company.created_at,
        }
    }
}

// ─── Employee ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Employee {
    pub id: Uuid,
    pub company_id: Uuid,
    /// National ID number, unique within the company
    pub cedula: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub position: Option<String>,
    pub base_salary: Decimal,
    pub hire_date: NaiveDate,
    /// Optional link to a platform login. At most one employee per access user.
    pub access_user_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEmployeeRequest {
    pub cedula: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub position: Option<String>,
    pub base_salary: Decimal,
    pub hire_date: NaiveDate,
    pub access_user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetBaseSalaryRequest {
    pub base_salary: Decimal,
}

// ─── Legal Parameters ─────────────────────────────────────────────────────────

// sqlx 0.8: custom Postgres enums need #[sqlx(type_name = "...")] on the enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "parameter_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ParameterCategory {
    SocialSecurity,
    EducationalInsurance,
    Isr,
    Other,
}

/// Which side of the employment relationship pays. Only `Employee` amounts
/// reduce net pay; `Employer` amounts are reporting-only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "parameter_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    Employee,
    Employer,
    Fixed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "parameter_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ParameterStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LegalParameter {
    pub id: Uuid,
    pub company_id: Uuid,
    pub key: String,
    pub name: String,
    pub category: ParameterCategory,
    pub param_type: ParameterType,
    /// Percentage points, e.g. 8.75 means 8.75%
    pub percentage: Decimal,
    /// Lower income bound for bracket-style parameters (ISR)
    pub min_range: Option<Decimal>,
    /// Upper income bound; the top bracket carries a large sentinel, not infinity
    pub max_range: Option<Decimal>,
    pub description: Option<String>,
    pub effective_date: NaiveDate,
    pub status: ParameterStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateParameterRequest {
    pub key: String,
    pub name: String,
    pub category: ParameterCategory,
    pub param_type: ParameterType,
    pub percentage: Decimal,
    pub min_range: Option<Decimal>,
    pub max_range: Option<Decimal>,
    pub description: Option<String>,
    pub effective_date: Option<NaiveDate>,
}

/// Replaces a parameter's numeric content. History is never mutated: the old
/// row is deactivated and a successor row with a new effective date is
/// inserted in the same transaction.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviseParameterRequest {
    pub percentage: Decimal,
    pub min_range: Option<Decimal>,
    pub max_range: Option<Decimal>,
    pub description: Option<String>,
    pub effective_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetParameterStatusRequest {
    pub status: ParameterStatus,
}

// ─── Pay Stubs ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq, Hash)]
#[sqlx(type_name = "payroll_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PayrollType {
    Regular,
    ThirteenthMonth,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "stub_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StubStatus {
    Draft,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PayStub {
    pub id: Uuid,
    /// Human-facing identifier, traceable to (employee, creation time)
    pub payroll_number: String,
    pub payroll_run_id: Uuid,
    pub employee_id: Uuid,
    pub company_id: Uuid,
    pub pay_period: NaiveDate,
    pub payment_date: NaiveDate,
    pub payroll_type: PayrollType,
    pub working_days: i32,
    pub days_worked: i32,
    pub base_salary: Decimal,
    pub prorated_salary: Decimal,
    pub total_allowances: Decimal,
    pub gross_salary: Decimal,
    pub income_tax: Decimal,
    pub social_security: Decimal,
    pub private_insurance: Decimal,
    /// Educational insurance plus ad-hoc deductions
    pub other_deductions: Decimal,
    pub total_deductions: Decimal,
    pub net_salary: Decimal,
    pub bonus_amount: Decimal,
    pub bonus_note: Option<String>,
    pub status: StubStatus,
    pub approved_by: Option<String>,
    pub approval_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StubDeduction {
    pub id: Uuid,
    pub pay_stub_id: Uuid,
    pub deduction_type: String,
    pub description: Option<String>,
    pub amount: Decimal,
    pub is_fixed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StubAllowance {
    pub id: Uuid,
    pub pay_stub_id: Uuid,
    pub allowance_type: String,
    pub description: Option<String>,
    pub amount: Decimal,
}

/// A stub together with its itemized deduction and allowance rows
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PayStubDetail {
    #[serde(flatten)]
    pub stub: PayStub,
    pub deductions: Vec<StubDeduction>,
    pub allowances: Vec<StubAllowance>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DeductionInput {
    #[serde(rename = "type")]
    pub deduction_type: Option<String>,
    pub description: Option<String>,
    pub amount: Decimal,
    pub is_fixed: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AllowanceInput {
    #[serde(rename = "type")]
    pub allowance_type: Option<String>,
    pub description: Option<String>,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateStubRequest {
    pub employee_id: Uuid,
    pub pay_period: NaiveDate,
    pub payment_date: Option<NaiveDate>,
    pub base_salary: Decimal,
    /// Defaults to 30
    pub working_days: Option<i32>,
    /// Defaults to working_days
    pub days_worked: Option<i32>,
    /// Defaults to regular
    pub payroll_type: Option<PayrollType>,
    /// Biweekly cycle id, defaults to 1
    pub sub_period: Option<i32>,
    #[serde(default)]
    pub deductions: Vec<DeductionInput>,
    #[serde(default)]
    pub allowances: Vec<AllowanceInput>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BatchStubInput {
    pub employee_id: Uuid,
    /// Defaults to the employee's stored base salary
    pub base_salary: Option<Decimal>,
    pub working_days: Option<i32>,
    pub days_worked: Option<i32>,
    #[serde(default)]
    pub deductions: Vec<DeductionInput>,
    #[serde(default)]
    pub allowances: Vec<AllowanceInput>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateBatchRequest {
    pub period_date: NaiveDate,
    pub payment_date: Option<NaiveDate>,
    pub sub_period: Option<i32>,
    pub payroll_type: Option<PayrollType>,
    pub stubs: Vec<BatchStubInput>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchSkip {
    pub employee_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchResult {
    pub created: i32,
    pub skipped: i32,
    pub skips: Vec<BatchSkip>,
    /// None when every input was skipped and no run existed for the key
    pub run: Option<PayrollRun>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApproveStubRequest {
    pub approved_by: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct StubFilter {
    pub employee_id: Option<Uuid>,
    pub run_id: Option<Uuid>,
    pub status: Option<StubStatus>,
}

// ─── Payroll Run ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "run_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Draft,
    Approved,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PayrollRun {
    pub id: Uuid,
    pub company_id: Uuid,
    /// Always the first day of the month
    pub period_date: NaiveDate,
    pub sub_period: i32,
    pub payroll_type: PayrollType,
    pub status: RunStatus,
    pub total_gross: Decimal,
    pub total_deductions: Decimal,
    pub total_net: Decimal,
    pub stub_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ─── JWT Claims ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub company_name: String,
    pub exp: usize,
    pub iat: usize,
}
