// src/store/mod.rs
//
// Persistence seam. The engine treats storage as a generic transactional
// store: every method is atomic, and the methods that mutate stubs recompute
// the owning run's totals inside the same transaction, so readers only ever
// see fully consistent states. Uniqueness races (run keys, access-user
// links) are resolved here with insert-or-get semantics, never by callers
// checking first and acting second.

pub mod memory;
pub mod postgres;

use crate::{
    engine::stub::StubAmounts,
    errors::AppResult,
    models::{
        Company, Employee, LegalParameter, ParameterCategory, ParameterStatus, ParameterType,
        PayStub, PayStubDetail, PayrollRun, PayrollType, StubFilter, StubStatus,
        AllowanceInput, DeductionInput,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Identity of a payroll run. Any day within a month maps to the same run:
/// the period date is normalized to the first of its month at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunKey {
    pub company_id: Uuid,
    pub period_date: NaiveDate,
    pub sub_period: i32,
    pub payroll_type: PayrollType,
}

impl RunKey {
    pub fn new(
        company_id: Uuid,
        period_date: NaiveDate,
        sub_period: i32,
        payroll_type: PayrollType,
    ) -> Self {
        let period_date = period_date.with_day(1).unwrap_or(period_date);
        Self {
            company_id,
            period_date,
            sub_period,
            payroll_type,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewCompany {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub company_id: Uuid,
    pub cedula: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub position: Option<String>,
    pub base_salary: Decimal,
    pub hire_date: NaiveDate,
    pub access_user_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewLegalParameter {
    pub company_id: Uuid,
    pub key: String,
    pub name: String,
    pub category: ParameterCategory,
    pub param_type: ParameterType,
    pub percentage: Decimal,
    pub min_range: Option<Decimal>,
    pub max_range: Option<Decimal>,
    pub description: Option<String>,
    pub effective_date: NaiveDate,
}

/// Successor values for a parameter revision. Everything else is inherited
/// from the row being superseded.
#[derive(Debug, Clone)]
pub struct ParameterRevision {
    pub percentage: Decimal,
    pub min_range: Option<Decimal>,
    pub max_range: Option<Decimal>,
    pub description: Option<String>,
    pub effective_date: NaiveDate,
}

/// A fully calculated stub ready to persist, with its itemized rows.
#[derive(Debug, Clone)]
pub struct NewPayStub {
    pub id: Uuid,
    pub payroll_number: String,
    pub employee_id: Uuid,
    pub company_id: Uuid,
    pub pay_period: NaiveDate,
    pub payment_date: NaiveDate,
    pub payroll_type: PayrollType,
    pub working_days: i32,
    pub days_worked: i32,
    pub base_salary: Decimal,
    pub amounts: StubAmounts,
    pub deductions: Vec<DeductionInput>,
    pub allowances: Vec<AllowanceInput>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait PayrollStore: Send + Sync {
    // ─── Companies ────────────────────────────────────────────────────────
    async fn create_company(&self, new: NewCompany) -> AppResult<Company>;
    async fn find_company(&self, id: Uuid) -> AppResult<Option<Company>>;
    async fn find_company_by_email(&self, email: &str) -> AppResult<Option<Company>>;

    // ─── Employees ────────────────────────────────────────────────────────
    async fn create_employee(&self, new: NewEmployee) -> AppResult<Employee>;
    async fn list_employees(&self, company_id: Uuid) -> AppResult<Vec<Employee>>;
    async fn find_employee(&self, id: Uuid) -> AppResult<Option<Employee>>;
    async fn set_base_salary(
        &self,
        company_id: Uuid,
        employee_id: Uuid,
        base_salary: Decimal,
    ) -> AppResult<Employee>;
    async fn deactivate_employee(&self, company_id: Uuid, employee_id: Uuid) -> AppResult<()>;

    // ─── Legal parameters ─────────────────────────────────────────────────
    async fn create_parameter(&self, new: NewLegalParameter) -> AppResult<LegalParameter>;
    async fn list_parameters(
        &self,
        company_id: Uuid,
        category: Option<ParameterCategory>,
        status: Option<ParameterStatus>,
    ) -> AppResult<Vec<LegalParameter>>;
    async fn find_parameter(
        &self,
        company_id: Uuid,
        id: Uuid,
    ) -> AppResult<Option<LegalParameter>>;
    /// Active parameters only, optionally restricted to one category.
    async fn find_active_parameters(
        &self,
        company_id: Uuid,
        category: Option<ParameterCategory>,
    ) -> AppResult<Vec<LegalParameter>>;
    /// Deactivates the row and inserts its successor atomically.
    async fn supersede_parameter(
        &self,
        company_id: Uuid,
        id: Uuid,
        revision: ParameterRevision,
    ) -> AppResult<LegalParameter>;
    async fn set_parameter_status(
        &self,
        company_id: Uuid,
        id: Uuid,
        status: ParameterStatus,
    ) -> AppResult<LegalParameter>;
    /// Only inactive parameters may be removed.
    async fn delete_parameter(&self, company_id: Uuid, id: Uuid) -> AppResult<()>;

    // ─── Runs and stubs ───────────────────────────────────────────────────
    async fn find_run_by_key(&self, key: RunKey) -> AppResult<Option<PayrollRun>>;
    /// Creates the run if needed, inserts the stub with its itemized rows,
    /// and recomputes run totals — one transaction. Duplicate
    /// (employee, period, type) is a conflict, and so is a run that is
    /// already approved: approved totals never change.
    async fn create_stub(&self, key: RunKey, stub: NewPayStub)
        -> AppResult<(PayStub, PayrollRun)>;
    async fn find_stub(&self, company_id: Uuid, id: Uuid) -> AppResult<Option<PayStubDetail>>;
    async fn list_stubs(&self, company_id: Uuid, filter: StubFilter) -> AppResult<Vec<PayStub>>;
    /// Status transition plus totals recompute in one transaction. Refused
    /// once the owning run is approved.
    async fn set_stub_status(
        &self,
        company_id: Uuid,
        stub_id: Uuid,
        status: StubStatus,
        approved_by: Option<String>,
        at: DateTime<Utc>,
    ) -> AppResult<(PayStub, PayrollRun)>;
    async fn list_runs(&self, company_id: Uuid) -> AppResult<Vec<PayrollRun>>;
    async fn find_run(&self, company_id: Uuid, id: Uuid) -> AppResult<Option<PayrollRun>>;
    /// Draft → approved, terminal. Approving twice is a conflict.
    async fn approve_run(&self, company_id: Uuid, id: Uuid) -> AppResult<PayrollRun>;
    /// Full recompute over every stub currently linked to the run,
    /// regardless of stub status. Deliberately not incremental.
    async fn recompute_totals(&self, company_id: Uuid, run_id: Uuid) -> AppResult<PayrollRun>;
}
