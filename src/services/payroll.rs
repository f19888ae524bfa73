// src/services/payroll.rs
//
// Orchestration between the calculation engine and the store: resolve the
// employee and the company's legal parameters, run the pure calculation,
// persist atomically. Handlers pass the current time in explicitly so the
// engine stays deterministic under test.

use crate::{
    engine::{
        params::CompanyParameters,
        stub::{self, StubInputs, DEFAULT_WORKING_DAYS},
    },
    errors::{AppError, AppResult},
    models::{
        BatchResult, BatchSkip, Employee, GenerateBatchRequest, GenerateStubRequest, PayStub,
        PayrollRun, PayrollType, RunStatus, StubStatus,
    },
    store::{NewPayStub, PayrollStore, RunKey},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub const DEFAULT_SUB_PERIOD: i32 = 1;

pub struct PayrollService {
    store: Arc<dyn PayrollStore>,
}

impl PayrollService {
    pub fn new(store: Arc<dyn PayrollStore>) -> Self {
        Self { store }
    }

    /// Build and persist one pay stub. Creates the owning run on first use of
    /// its (company, period, sub-period, type) key; run totals are recomputed
    /// in the same transaction as the insert.
    pub async fn generate_stub(
        &self,
        company_id: Uuid,
        req: GenerateStubRequest,
        now: DateTime<Utc>,
    ) -> AppResult<(PayStub, PayrollRun)> {
        let employee = self.resolve_employee(company_id, req.employee_id).await?;

        let parameters = self.store.find_active_parameters(company_id, None).await?;
        let params = CompanyParameters::resolve(&parameters)?;

        let payroll_type = req.payroll_type.unwrap_or(PayrollType::Regular);
        let working_days = req.working_days.unwrap_or(DEFAULT_WORKING_DAYS);
        let days_worked = req.days_worked.unwrap_or(working_days);

        let amounts = stub::calculate(&StubInputs {
            base_salary: req.base_salary,
            working_days,
            days_worked,
            payroll_type,
            pay_period: req.pay_period,
            hire_date: employee.hire_date,
            deductions: &req.deductions,
            allowances: &req.allowances,
            params: &params,
        })?;

        let key = RunKey::new(
            company_id,
            req.pay_period,
            req.sub_period.unwrap_or(DEFAULT_SUB_PERIOD),
            payroll_type,
        );
        let new_stub = NewPayStub {
            id: Uuid::new_v4(),
            payroll_number: payroll_number(employee.id, now),
            employee_id: employee.id,
            company_id,
            pay_period: req.pay_period,
            payment_date: req.payment_date.unwrap_or_else(|| now.date_naive()),
            payroll_type,
            working_days,
            days_worked,
            base_salary: req.base_salary,
            amounts,
            deductions: req.deductions,
            allowances: req.allowances,
            created_at: now,
        };

        let (stub, run) = self.store.create_stub(key, new_stub).await?;
        info!(
            "Generated stub {} for employee {} (run {}, net {})",
            stub.payroll_number, stub.employee_id, run.id, stub.net_salary
        );
        Ok((stub, run))
    }

    /// Build one run and one stub per input. Best-effort per item: inputs
    /// whose employee cannot be resolved (or that fail validation or collide
    /// with an existing stub) are skipped, not fatal. Malformed legal
    /// parameters fail the whole batch — every item would compute wrong.
    /// The run itself is created by the first stub insert, so a batch where
    /// everything is skipped leaves no empty run behind.
    pub async fn generate_batch(
        &self,
        company_id: Uuid,
        req: GenerateBatchRequest,
        now: DateTime<Utc>,
    ) -> AppResult<BatchResult> {
        let payroll_type = req.payroll_type.unwrap_or(PayrollType::Regular);
        let sub_period = req.sub_period.unwrap_or(DEFAULT_SUB_PERIOD);
        let key = RunKey::new(company_id, req.period_date, sub_period, payroll_type);

        if let Some(run) = self.store.find_run_by_key(key).await?
            && run.status == RunStatus::Approved
        {
            return Err(AppError::Conflict(
                "Payroll run for this period is already approved; corrections need a new sub-period"
                    .to_string(),
            ));
        }

        let parameters = self.store.find_active_parameters(company_id, None).await?;
        let params = CompanyParameters::resolve(&parameters)?;

        let mut created = 0i32;
        let mut run_id = None;
        let mut skips: Vec<BatchSkip> = Vec::new();

        for input in req.stubs {
            let employee = match self.resolve_employee(company_id, input.employee_id).await {
                Ok(e) if e.is_active => e,
                Ok(_) => {
                    skips.push(BatchSkip {
                        employee_id: input.employee_id,
                        reason: "employee is inactive".to_string(),
                    });
                    continue;
                }
                Err(e) => {
                    skips.push(BatchSkip {
                        employee_id: input.employee_id,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let base_salary = input.base_salary.unwrap_or(employee.base_salary);
            let working_days = input.working_days.unwrap_or(DEFAULT_WORKING_DAYS);
            let days_worked = input.days_worked.unwrap_or(working_days);

            let result = stub::calculate(&StubInputs {
                base_salary,
                working_days,
                days_worked,
                payroll_type,
                pay_period: req.period_date,
                hire_date: employee.hire_date,
                deductions: &input.deductions,
                allowances: &input.allowances,
                params: &params,
            });
            let amounts = match result {
                Ok(amounts) => amounts,
                Err(e) => {
                    warn!("Skipping employee {} in batch: {}", employee.id, e);
                    skips.push(BatchSkip {
                        employee_id: employee.id,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let new_stub = NewPayStub {
                id: Uuid::new_v4(),
                payroll_number: payroll_number(employee.id, now),
                employee_id: employee.id,
                company_id,
                pay_period: key.period_date,
                payment_date: req.payment_date.unwrap_or_else(|| now.date_naive()),
                payroll_type,
                working_days,
                days_worked,
                base_salary,
                amounts,
                deductions: input.deductions,
                allowances: input.allowances,
                created_at: now,
            };
            match self.store.create_stub(key, new_stub).await {
                Ok((_, run)) => {
                    created += 1;
                    run_id = Some(run.id);
                }
                Err(AppError::Conflict(reason)) => {
                    warn!("Skipping employee {} in batch: {}", employee.id, reason);
                    skips.push(BatchSkip {
                        employee_id: employee.id,
                        reason,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        // An all-skip batch may still target a run that existed beforehand;
        // report it without touching its totals.
        let run = match run_id {
            Some(id) => Some(self.store.recompute_totals(company_id, id).await?),
            None => self.store.find_run_by_key(key).await?,
        };
        match &run {
            Some(run) => info!(
                "Batch for run {}: {} created, {} skipped, total net {}",
                run.id,
                created,
                skips.len(),
                run.total_net
            ),
            None => info!("Batch created no stubs: {} skipped", skips.len()),
        }
        Ok(BatchResult {
            created,
            skipped: skips.len() as i32,
            skips,
            run,
        })
    }

    pub async fn approve_stub(
        &self,
        company_id: Uuid,
        stub_id: Uuid,
        approved_by: String,
        now: DateTime<Utc>,
    ) -> AppResult<(PayStub, PayrollRun)> {
        let (stub, run) = self
            .store
            .set_stub_status(company_id, stub_id, StubStatus::Approved, Some(approved_by), now)
            .await?;
        info!("Approved stub {} (run {})", stub.payroll_number, run.id);
        Ok((stub, run))
    }

    /// Rejection is stub-level; the owning run stays draft and the rejected
    /// stub remains part of its totals.
    pub async fn reject_stub(
        &self,
        company_id: Uuid,
        stub_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<(PayStub, PayrollRun)> {
        let (stub, run) = self
            .store
            .set_stub_status(company_id, stub_id, StubStatus::Rejected, None, now)
            .await?;
        info!("Rejected stub {} (run {})", stub.payroll_number, run.id);
        Ok((stub, run))
    }

    pub async fn approve_run(&self, company_id: Uuid, run_id: Uuid) -> AppResult<PayrollRun> {
        let run = self.store.approve_run(company_id, run_id).await?;
        info!("Approved payroll run {} (net {})", run.id, run.total_net);
        Ok(run)
    }

    pub async fn recompute_run(&self, company_id: Uuid, run_id: Uuid) -> AppResult<PayrollRun> {
        self.store.recompute_totals(company_id, run_id).await
    }

    async fn resolve_employee(&self, company_id: Uuid, employee_id: Uuid) -> AppResult<Employee> {
        self.store
            .find_employee(employee_id)
            .await?
            .filter(|e| e.company_id == company_id)
            .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", employee_id)))
    }
}

/// Unique and traceable to (employee, creation time); not monotonic.
fn payroll_number(employee_id: Uuid, at: DateTime<Utc>) -> String {
    let id = employee_id.to_string();
    format!("PR-{}-{}", &id[..8], at.timestamp_millis())
}
