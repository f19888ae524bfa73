// src/store/memory.rs
//
// In-memory PayrollStore. One mutex guards all tables, so every trait
// method is a single critical section — the same atomicity the Postgres
// store gets from transactions. Used by the test suite; not wired in
// production.

use crate::{
    errors::{AppError, AppResult},
    models::{
        Company, Employee, LegalParameter, ParameterCategory, ParameterStatus, PayStub,
        PayStubDetail, PayrollRun, RunStatus, StubAllowance, StubDeduction, StubFilter,
        StubStatus,
    },
    store::{
        NewCompany, NewEmployee, NewLegalParameter, NewPayStub, ParameterRevision, PayrollStore,
        RunKey,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    companies: HashMap<Uuid, Company>,
    employees: HashMap<Uuid, Employee>,
    parameters: HashMap<Uuid, LegalParameter>,
    runs: HashMap<Uuid, PayrollRun>,
    stubs: HashMap<Uuid, PayStub>,
    deductions: Vec<StubDeduction>,
    allowances: Vec<StubAllowance>,
}

impl Inner {
    fn run_for_key(&self, key: &RunKey) -> Option<Uuid> {
        self.runs
            .values()
            .find(|r| {
                r.company_id == key.company_id
                    && r.period_date == key.period_date
                    && r.sub_period == key.sub_period
                    && r.payroll_type == key.payroll_type
            })
            .map(|r| r.id)
    }

    fn get_or_create_run(&mut self, key: RunKey) -> PayrollRun {
        if let Some(id) = self.run_for_key(&key) {
            return self.runs[&id].clone();
        }
        let now = Utc::now();
        let run = PayrollRun {
            id: Uuid::new_v4(),
            company_id: key.company_id,
            period_date: key.period_date,
            sub_period: key.sub_period,
            payroll_type: key.payroll_type,
            status: RunStatus::Draft,
            total_gross: Decimal::ZERO,
            total_deductions: Decimal::ZERO,
            total_net: Decimal::ZERO,
            stub_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.runs.insert(run.id, run.clone());
        run
    }

    // Full recompute over all linked stubs, regardless of stub status.
    fn recompute(&mut self, run_id: Uuid) -> AppResult<PayrollRun> {
        let stubs: Vec<&PayStub> = self
            .stubs
            .values()
            .filter(|s| s.payroll_run_id == run_id)
            .collect();
        let total_gross = stubs.iter().map(|s| s.gross_salary).sum();
        let total_deductions = stubs.iter().map(|s| s.total_deductions).sum();
        let total_net = stubs.iter().map(|s| s.net_salary).sum();
        let stub_count = stubs.len() as i32;

        let run = self
            .runs
            .get_mut(&run_id)
            .ok_or_else(|| AppError::NotFound(format!("Payroll run {} not found", run_id)))?;
        run.total_gross = total_gross;
        run.total_deductions = total_deductions;
        run.total_net = total_net;
        run.stub_count = stub_count;
        run.updated_at = Utc::now();
        Ok(run.clone())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PayrollStore for MemoryStore {
    async fn create_company(&self, new: NewCompany) -> AppResult<Company> {
        let mut inner = self.inner.lock().await;
        if inner.companies.values().any(|c| c.email == new.email) {
            return Err(AppError::Conflict(format!(
                "Company with email '{}' already exists",
                new.email
            )));
        }
        let now = Utc::now();
        let company = Company {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            created_at: now,
            updated_at: now,
        };
        inner.companies.insert(company.id, company.clone());
        Ok(company)
    }

    async fn find_company(&self, id: Uuid) -> AppResult<Option<Company>> {
        Ok(self.inner.lock().await.companies.get(&id).cloned())
    }

    async fn find_company_by_email(&self, email: &str) -> AppResult<Option<Company>> {
        Ok(self
            .inner
            .lock()
            .await
            .companies
            .values()
            .find(|c| c.email == email)
            .cloned())
    }

    async fn create_employee(&self, new: NewEmployee) -> AppResult<Employee> {
        let mut inner = self.inner.lock().await;
        if inner
            .employees
            .values()
            .any(|e| e.company_id == new.company_id && e.cedula == new.cedula)
        {
            return Err(AppError::Conflict(format!(
                "Employee with cedula '{}' already exists in this company",
                new.cedula
            )));
        }
        if let Some(user_id) = new.access_user_id
            && inner
                .employees
                .values()
                .any(|e| e.access_user_id == Some(user_id))
        {
            return Err(AppError::Conflict(format!(
                "Access user {} is already linked to another employee",
                user_id
            )));
        }
        let now = Utc::now();
        let employee = Employee {
            id: Uuid::new_v4(),
            company_id: new.company_id,
            cedula: new.cedula,
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
            position: new.position,
            base_salary: new.base_salary,
            hire_date: new.hire_date,
            access_user_id: new.access_user_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        inner.employees.insert(employee.id, employee.clone());
        Ok(employee)
    }

    async fn list_employees(&self, company_id: Uuid) -> AppResult<Vec<Employee>> {
        let inner = self.inner.lock().await;
        let mut employees: Vec<Employee> = inner
            .employees
            .values()
            .filter(|e| e.company_id == company_id)
            .cloned()
            .collect();
        employees.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(employees)
    }

    async fn find_employee(&self, id: Uuid) -> AppResult<Option<Employee>> {
        Ok(self.inner.lock().await.employees.get(&id).cloned())
    }

    async fn set_base_salary(
        &self,
        company_id: Uuid,
        employee_id: Uuid,
        base_salary: Decimal,
    ) -> AppResult<Employee> {
        let mut inner = self.inner.lock().await;
        let employee = inner
            .employees
            .get_mut(&employee_id)
            .filter(|e| e.company_id == company_id)
            .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", employee_id)))?;
        employee.base_salary = base_salary;
        employee.updated_at = Utc::now();
        Ok(employee.clone())
    }

    async fn deactivate_employee(&self, company_id: Uuid, employee_id: Uuid) -> AppResult<()> {
        let mut inner = self.inner.lock().await;
        let employee = inner
            .employees
            .get_mut(&employee_id)
            .filter(|e| e.company_id == company_id)
            .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", employee_id)))?;
        employee.is_active = false;
        employee.updated_at = Utc::now();
        Ok(())
    }

    async fn create_parameter(&self, new: NewLegalParameter) -> AppResult<LegalParameter> {
        let mut inner = self.inner.lock().await;
        if inner.parameters.values().any(|p| {
            p.company_id == new.company_id
                && p.key == new.key
                && p.effective_date == new.effective_date
        }) {
            return Err(AppError::Conflict(format!(
                "Parameter '{}' already exists for this company and effective date",
                new.key
            )));
        }
        let parameter = LegalParameter {
            id: Uuid::new_v4(),
            company_id: new.company_id,
            key: new.key,
            name: new.name,
            category: new.category,
            param_type: new.param_type,
            percentage: new.percentage,
            min_range: new.min_range,
            max_range: new.max_range,
            description: new.description,
            effective_date: new.effective_date,
            status: ParameterStatus::Active,
            created_at: Utc::now(),
        };
        inner.parameters.insert(parameter.id, parameter.clone());
        Ok(parameter)
    }

    async fn list_parameters(
        &self,
        company_id: Uuid,
        category: Option<ParameterCategory>,
        status: Option<ParameterStatus>,
    ) -> AppResult<Vec<LegalParameter>> {
        let inner = self.inner.lock().await;
        let mut params: Vec<LegalParameter> = inner
            .parameters
            .values()
            .filter(|p| p.company_id == company_id)
            .filter(|p| category.is_none_or(|c| p.category == c))
            .filter(|p| status.is_none_or(|s| p.status == s))
            .cloned()
            .collect();
        params.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(params)
    }

    async fn find_parameter(
        &self,
        company_id: Uuid,
        id: Uuid,
    ) -> AppResult<Option<LegalParameter>> {
        Ok(self
            .inner
            .lock()
            .await
            .parameters
            .get(&id)
            .filter(|p| p.company_id == company_id)
            .cloned())
    }

    async fn find_active_parameters(
        &self,
        company_id: Uuid,
        category: Option<ParameterCategory>,
    ) -> AppResult<Vec<LegalParameter>> {
        self.list_parameters(company_id, category, Some(ParameterStatus::Active))
            .await
    }

    async fn supersede_parameter(
        &self,
        company_id: Uuid,
        id: Uuid,
        revision: ParameterRevision,
    ) -> AppResult<LegalParameter> {
        let mut inner = self.inner.lock().await;
        let old = inner
            .parameters
            .get(&id)
            .filter(|p| p.company_id == company_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Legal parameter {} not found", id)))?;
        if inner.parameters.values().any(|p| {
            p.company_id == company_id
                && p.key == old.key
                && p.effective_date == revision.effective_date
        }) {
            return Err(AppError::Conflict(format!(
                "Parameter '{}' already has a revision effective {}",
                old.key, revision.effective_date
            )));
        }

        if let Some(existing) = inner.parameters.get_mut(&id) {
            existing.status = ParameterStatus::Inactive;
        }
        let successor = LegalParameter {
            id: Uuid::new_v4(),
            company_id: old.company_id,
            key: old.key,
            name: old.name,
            category: old.category,
            param_type: old.param_type,
            percentage: revision.percentage,
            min_range: revision.min_range,
            max_range: revision.max_range,
            description: revision.description.or(old.description),
            effective_date: revision.effective_date,
            status: ParameterStatus::Active,
            created_at: Utc::now(),
        };
        inner.parameters.insert(successor.id, successor.clone());
        Ok(successor)
    }

    async fn set_parameter_status(
        &self,
        company_id: Uuid,
        id: Uuid,
        status: ParameterStatus,
    ) -> AppResult<LegalParameter> {
        let mut inner = self.inner.lock().await;
        let parameter = inner
            .parameters
            .get_mut(&id)
            .filter(|p| p.company_id == company_id)
            .ok_or_else(|| AppError::NotFound(format!("Legal parameter {} not found", id)))?;
        parameter.status = status;
        Ok(parameter.clone())
    }

    async fn delete_parameter(&self, company_id: Uuid, id: Uuid) -> AppResult<()> {
        let mut inner = self.inner.lock().await;
        let parameter = inner
            .parameters
            .get(&id)
            .filter(|p| p.company_id == company_id)
            .ok_or_else(|| AppError::NotFound(format!("Legal parameter {} not found", id)))?;
        if parameter.status == ParameterStatus::Active {
            return Err(AppError::Conflict(
                "Active parameters cannot be deleted; deactivate or supersede them".to_string(),
            ));
        }
        inner.parameters.remove(&id);
        Ok(())
    }

    async fn find_run_by_key(&self, key: RunKey) -> AppResult<Option<PayrollRun>> {
        let inner = self.inner.lock().await;
        Ok(inner.run_for_key(&key).map(|id| inner.runs[&id].clone()))
    }

    async fn create_stub(
        &self,
        key: RunKey,
        stub: NewPayStub,
    ) -> AppResult<(PayStub, PayrollRun)> {
        let mut inner = self.inner.lock().await;
        if inner.stubs.values().any(|s| {
            s.employee_id == stub.employee_id
                && s.pay_period == stub.pay_period
                && s.payroll_type == stub.payroll_type
        }) {
            return Err(AppError::Conflict(format!(
                "A {:?} stub already exists for employee {} in this period",
                stub.payroll_type, stub.employee_id
            )));
        }

        let run = inner.get_or_create_run(key);
        if run.status == RunStatus::Approved {
            return Err(AppError::Conflict(
                "Payroll run for this period is already approved; corrections need a new sub-period"
                    .to_string(),
            ));
        }
        let record = PayStub {
            id: stub.id,
            payroll_number: stub.payroll_number.clone(),
            payroll_run_id: run.id,
            employee_id: stub.employee_id,
            company_id: stub.company_id,
            pay_period: stub.pay_period,
            payment_date: stub.payment_date,
            payroll_type: stub.payroll_type,
            working_days: stub.working_days,
            days_worked: stub.days_worked,
            base_salary: stub.base_salary,
            prorated_salary: stub.amounts.prorated_salary,
            total_allowances: stub.amounts.total_allowances,
            gross_salary: stub.amounts.gross_salary,
            income_tax: stub.amounts.income_tax,
            social_security: stub.amounts.social_security,
            private_insurance: stub.amounts.private_insurance,
            other_deductions: stub.amounts.other_deductions,
            total_deductions: stub.amounts.total_deductions,
            net_salary: stub.amounts.net_salary,
            bonus_amount: stub.amounts.bonus_amount,
            bonus_note: stub.amounts.bonus_note.clone(),
            status: StubStatus::Draft,
            approved_by: None,
            approval_date: None,
            created_at: stub.created_at,
        };
        inner.stubs.insert(record.id, record.clone());
        for d in &stub.deductions {
            inner.deductions.push(StubDeduction {
                id: Uuid::new_v4(),
                pay_stub_id: record.id,
                deduction_type: d.deduction_type.clone().unwrap_or_else(|| "OTHER".to_string()),
                description: d.description.clone(),
                amount: d.amount,
                is_fixed: d.is_fixed.unwrap_or(false),
            });
        }
        for a in &stub.allowances {
            inner.allowances.push(StubAllowance {
                id: Uuid::new_v4(),
                pay_stub_id: record.id,
                allowance_type: a.allowance_type.clone().unwrap_or_else(|| "OTHER".to_string()),
                description: a.description.clone(),
                amount: a.amount,
            });
        }
        let run = inner.recompute(run.id)?;
        Ok((record, run))
    }

    async fn find_stub(&self, company_id: Uuid, id: Uuid) -> AppResult<Option<PayStubDetail>> {
        let inner = self.inner.lock().await;
        let Some(stub) = inner
            .stubs
            .get(&id)
            .filter(|s| s.company_id == company_id)
            .cloned()
        else {
            return Ok(None);
        };
        let deductions = inner
            .deductions
            .iter()
            .filter(|d| d.pay_stub_id == id)
            .cloned()
            .collect();
        let allowances = inner
            .allowances
            .iter()
            .filter(|a| a.pay_stub_id == id)
            .cloned()
            .collect();
        Ok(Some(PayStubDetail {
            stub,
            deductions,
            allowances,
        }))
    }

    async fn list_stubs(&self, company_id: Uuid, filter: StubFilter) -> AppResult<Vec<PayStub>> {
        let inner = self.inner.lock().await;
        let mut stubs: Vec<PayStub> = inner
            .stubs
            .values()
            .filter(|s| s.company_id == company_id)
            .filter(|s| filter.employee_id.is_none_or(|e| s.employee_id == e))
            .filter(|s| filter.run_id.is_none_or(|r| s.payroll_run_id == r))
            .filter(|s| filter.status.is_none_or(|st| s.status == st))
            .cloned()
            .collect();
        stubs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(stubs)
    }

    async fn set_stub_status(
        &self,
        company_id: Uuid,
        stub_id: Uuid,
        status: StubStatus,
        approved_by: Option<String>,
        at: DateTime<Utc>,
    ) -> AppResult<(PayStub, PayrollRun)> {
        let mut inner = self.inner.lock().await;
        let stub = inner
            .stubs
            .get(&stub_id)
            .filter(|s| s.company_id == company_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Pay stub {} not found", stub_id)))?;

        let run = inner
            .runs
            .get(&stub.payroll_run_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("Payroll run {} not found", stub.payroll_run_id))
            })?;
        if run.status == RunStatus::Approved {
            return Err(AppError::Conflict(
                "Payroll run is approved; its stubs can no longer change".to_string(),
            ));
        }
        if stub.status != StubStatus::Draft {
            return Err(AppError::Conflict(format!(
                "Pay stub is already {:?} and cannot change status",
                stub.status
            )));
        }

        let run_id = stub.payroll_run_id;
        let stub = inner
            .stubs
            .get_mut(&stub_id)
            .ok_or_else(|| AppError::NotFound(format!("Pay stub {} not found", stub_id)))?;
        stub.status = status;
        if status == StubStatus::Approved {
            stub.approved_by = approved_by;
            stub.approval_date = Some(at);
        }
        let stub = stub.clone();
        let run = inner.recompute(run_id)?;
        Ok((stub, run))
    }

    async fn list_runs(&self, company_id: Uuid) -> AppResult<Vec<PayrollRun>> {
        let inner = self.inner.lock().await;
        let mut runs: Vec<PayrollRun> = inner
            .runs
            .values()
            .filter(|r| r.company_id == company_id)
            .cloned()
            .collect();
        runs.sort_by(|a, b| b.period_date.cmp(&a.period_date));
        Ok(runs)
    }

    async fn find_run(&self, company_id: Uuid, id: Uuid) -> AppResult<Option<PayrollRun>> {
        Ok(self
            .inner
            .lock()
            .await
            .runs
            .get(&id)
            .filter(|r| r.company_id == company_id)
            .cloned())
    }

    async fn approve_run(&self, company_id: Uuid, id: Uuid) -> AppResult<PayrollRun> {
        let mut inner = self.inner.lock().await;
        let run = inner
            .runs
            .get_mut(&id)
            .filter(|r| r.company_id == company_id)
            .ok_or_else(|| AppError::NotFound(format!("Payroll run {} not found", id)))?;
        if run.status == RunStatus::Approved {
            return Err(AppError::Conflict(
                "Payroll run is already approved".to_string(),
            ));
        }
        run.status = RunStatus::Approved;
        run.updated_at = Utc::now();
        Ok(run.clone())
    }

    async fn recompute_totals(&self, company_id: Uuid, run_id: Uuid) -> AppResult<PayrollRun> {
        let mut inner = self.inner.lock().await;
        if !inner
            .runs
            .get(&run_id)
            .is_some_and(|r| r.company_id == company_id)
        {
            return Err(AppError::NotFound(format!(
                "Payroll run {} not found",
                run_id
            )));
        }
        inner.recompute(run_id)
    }
}
