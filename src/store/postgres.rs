// src/store/postgres.rs
//
// sqlx/PostgreSQL PayrollStore. Multi-statement operations run inside a
// transaction; duplicate-key races surface as Conflict via the unique
// constraints in the schema, not client-side checks.

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
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn conflict_on_unique(err: sqlx::Error, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict(message.to_string())
        }
        _ => AppError::Database(err),
    }
}

async fn get_or_create_run_tx(conn: &mut PgConnection, key: RunKey) -> AppResult<PayrollRun> {
    let inserted = sqlx::query_as::<_, PayrollRun>(
        r#"INSERT INTO payroll_runs (
            id, company_id, period_date, sub_period, payroll_type, status,
            total_gross, total_deductions, total_net, stub_count, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, 'draft', 0, 0, 0, 0, NOW(), NOW())
        ON CONFLICT (company_id, period_date, sub_period, payroll_type) DO NOTHING
        RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(key.company_id)
    .bind(key.period_date)
    .bind(key.sub_period)
    .bind(key.payroll_type)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(run) = inserted {
        return Ok(run);
    }
    // Lost the insert race (or the run already existed) — read the winner,
    // locked so its status cannot flip mid-transaction.
    let run = sqlx::query_as::<_, PayrollRun>(
        r#"SELECT * FROM payroll_runs
           WHERE company_id = $1 AND period_date = $2 AND sub_period = $3 AND payroll_type = $4
           FOR UPDATE"#,
    )
    .bind(key.company_id)
    .bind(key.period_date)
    .bind(key.sub_period)
    .bind(key.payroll_type)
    .fetch_one(&mut *conn)
    .await?;
    Ok(run)
}

async fn recompute_tx(conn: &mut PgConnection, run_id: Uuid) -> AppResult<PayrollRun> {
    let run = sqlx::query_as::<_, PayrollRun>(
        r#"UPDATE payroll_runs SET
            total_gross = agg.gross,
            total_deductions = agg.deductions,
            total_net = agg.net,
            stub_count = agg.count,
            updated_at = NOW()
        FROM (
            SELECT
                COALESCE(SUM(gross_salary), 0) AS gross,
                COALESCE(SUM(total_deductions), 0) AS deductions,
                COALESCE(SUM(net_salary), 0) AS net,
                COUNT(*)::int AS count
            FROM pay_stubs WHERE payroll_run_id = $1
        ) AS agg
        WHERE id = $1
        RETURNING payroll_runs.*"#,
    )
    .bind(run_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Payroll run {} not found", run_id)))?;
    Ok(run)
}

#[async_trait]
impl PayrollStore for PgStore {
    async fn create_company(&self, new: NewCompany) -> AppResult<Company> {
        sqlx::query_as::<_, Company>(
            r#"INSERT INTO companies (id, name, email, password_hash, created_at, updated_at)
               VALUES ($1, $2, $3, $4, NOW(), NOW())
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            conflict_on_unique(
                e,
                &format!("Company with email '{}' already exists", new.email),
            )
        })
    }

    async fn find_company(&self, id: Uuid) -> AppResult<Option<Company>> {
        Ok(
            sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn find_company_by_email(&self, email: &str) -> AppResult<Option<Company>> {
        Ok(
            sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn create_employee(&self, new: NewEmployee) -> AppResult<Employee> {
        sqlx::query_as::<_, Employee>(
            r#"INSERT INTO employees (
                id, company_id, cedula, first_name, last_name, email, position,
                base_salary, hire_date, access_user_id, is_active, created_at, updated_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,true,NOW(),NOW())
            RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(new.company_id)
        .bind(&new.cedula)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.email)
        .bind(&new.position)
        .bind(new.base_salary)
        .bind(new.hire_date)
        .bind(new.access_user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            conflict_on_unique(
                e,
                "Employee cedula or access-user link already exists",
            )
        })
    }

    async fn list_employees(&self, company_id: Uuid) -> AppResult<Vec<Employee>> {
        Ok(sqlx::query_as::<_, Employee>(
            "SELECT * FROM employees WHERE company_id = $1 ORDER BY created_at DESC",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn find_employee(&self, id: Uuid) -> AppResult<Option<Employee>> {
        Ok(
            sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn set_base_salary(
        &self,
        company_id: Uuid,
        employee_id: Uuid,
        base_salary: Decimal,
    ) -> AppResult<Employee> {
        sqlx::query_as::<_, Employee>(
            r#"UPDATE employees SET base_salary = $1, updated_at = NOW()
               WHERE id = $2 AND company_id = $3
               RETURNING *"#,
        )
        .bind(base_salary)
        .bind(employee_id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", employee_id)))
    }

    async fn deactivate_employee(&self, company_id: Uuid, employee_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE employees SET is_active = false, updated_at = NOW() WHERE id = $1 AND company_id = $2",
        )
        .bind(employee_id)
        .bind(company_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Employee {} not found",
                employee_id
            )));
        }
        Ok(())
    }

    async fn create_parameter(&self, new: NewLegalParameter) -> AppResult<LegalParameter> {
        sqlx::query_as::<_, LegalParameter>(
            r#"INSERT INTO legal_parameters (
                id, company_id, key, name, category, param_type, percentage,
                min_range, max_range, description, effective_date, status, created_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,'active',NOW())
            RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(new.company_id)
        .bind(&new.key)
        .bind(&new.name)
        .bind(new.category)
        .bind(new.param_type)
        .bind(new.percentage)
        .bind(new.min_range)
        .bind(new.max_range)
        .bind(&new.description)
        .bind(new.effective_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            conflict_on_unique(
                e,
                &format!(
                    "Parameter '{}' already exists for this company and effective date",
                    new.key
                ),
            )
        })
    }

    async fn list_parameters(
        &self,
        company_id: Uuid,
        category: Option<ParameterCategory>,
        status: Option<ParameterStatus>,
    ) -> AppResult<Vec<LegalParameter>> {
        Ok(sqlx::query_as::<_, LegalParameter>(
            r#"SELECT * FROM legal_parameters
               WHERE company_id = $1
                 AND ($2::parameter_category IS NULL OR category = $2)
                 AND ($3::parameter_status IS NULL OR status = $3)
               ORDER BY key, effective_date"#,
        )
        .bind(company_id)
        .bind(category)
        .bind(status)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn find_parameter(
        &self,
        company_id: Uuid,
        id: Uuid,
    ) -> AppResult<Option<LegalParameter>> {
        Ok(sqlx::query_as::<_, LegalParameter>(
            "SELECT * FROM legal_parameters WHERE id = $1 AND company_id = $2",
        )
        .bind(id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?)
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
        let mut tx = self.pool.begin().await?;

        let old = sqlx::query_as::<_, LegalParameter>(
            "SELECT * FROM legal_parameters WHERE id = $1 AND company_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(company_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Legal parameter {} not found", id)))?;

        sqlx::query("UPDATE legal_parameters SET status = 'inactive' WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let successor = sqlx::query_as::<_, LegalParameter>(
            r#"INSERT INTO legal_parameters (
                id, company_id, key, name, category, param_type, percentage,
                min_range, max_range, description, effective_date, status, created_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,'active',NOW())
            RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(old.company_id)
        .bind(&old.key)
        .bind(&old.name)
        .bind(old.category)
        .bind(old.param_type)
        .bind(revision.percentage)
        .bind(revision.min_range)
        .bind(revision.max_range)
        .bind(revision.description.or(old.description))
        .bind(revision.effective_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            conflict_on_unique(
                e,
                &format!(
                    "Parameter '{}' already has a revision for that effective date",
                    old.key
                ),
            )
        })?;

        tx.commit().await?;
        Ok(successor)
    }

    async fn set_parameter_status(
        &self,
        company_id: Uuid,
        id: Uuid,
        status: ParameterStatus,
    ) -> AppResult<LegalParameter> {
        sqlx::query_as::<_, LegalParameter>(
            r#"UPDATE legal_parameters SET status = $1
               WHERE id = $2 AND company_id = $3
               RETURNING *"#,
        )
        .bind(status)
        .bind(id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Legal parameter {} not found", id)))
    }

    async fn delete_parameter(&self, company_id: Uuid, id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            "DELETE FROM legal_parameters WHERE id = $1 AND company_id = $2 AND status = 'inactive'",
        )
        .bind(id)
        .bind(company_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            // Either absent or still active — distinguish for the caller.
            let exists = sqlx::query(
                "SELECT 1 FROM legal_parameters WHERE id = $1 AND company_id = $2",
            )
            .bind(id)
            .bind(company_id)
            .fetch_optional(&self.pool)
            .await?;
            return Err(match exists {
                Some(_) => AppError::Conflict(
                    "Active parameters cannot be deleted; deactivate or supersede them"
                        .to_string(),
                ),
                None => AppError::NotFound(format!("Legal parameter {} not found", id)),
            });
        }
        Ok(())
    }

    async fn find_run_by_key(&self, key: RunKey) -> AppResult<Option<PayrollRun>> {
        Ok(sqlx::query_as::<_, PayrollRun>(
            r#"SELECT * FROM payroll_runs
               WHERE company_id = $1 AND period_date = $2 AND sub_period = $3 AND payroll_type = $4"#,
        )
        .bind(key.company_id)
        .bind(key.period_date)
        .bind(key.sub_period)
        .bind(key.payroll_type)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_stub(
        &self,
        key: RunKey,
        stub: NewPayStub,
    ) -> AppResult<(PayStub, PayrollRun)> {
        let mut tx = self.pool.begin().await?;

        let run = get_or_create_run_tx(&mut tx, key).await?;
        if run.status == RunStatus::Approved {
            return Err(AppError::Conflict(
                "Payroll run for this period is already approved; corrections need a new sub-period"
                    .to_string(),
            ));
        }

        let record = sqlx::query_as::<_, PayStub>(
            r#"INSERT INTO pay_stubs (
                id, payroll_number, payroll_run_id, employee_id, company_id,
                pay_period, payment_date, payroll_type, working_days, days_worked,
                base_salary, prorated_salary, total_allowances, gross_salary,
                income_tax, social_security, private_insurance, other_deductions,
                total_deductions, net_salary, bonus_amount, bonus_note,
                status, created_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20,$21,$22,'draft',$23)
            RETURNING *"#,
        )
        .bind(stub.id)
        .bind(&stub.payroll_number)
        .bind(run.id)
        .bind(stub.employee_id)
        .bind(stub.company_id)
        .bind(stub.pay_period)
        .bind(stub.payment_date)
        .bind(stub.payroll_type)
        .bind(stub.working_days)
        .bind(stub.days_worked)
        .bind(stub.base_salary)
        .bind(stub.amounts.prorated_salary)
        .bind(stub.amounts.total_allowances)
        .bind(stub.amounts.gross_salary)
        .bind(stub.amounts.income_tax)
        .bind(stub.amounts.social_security)
        .bind(stub.amounts.private_insurance)
        .bind(stub.amounts.other_deductions)
        .bind(stub.amounts.total_deductions)
        .bind(stub.amounts.net_salary)
        .bind(stub.amounts.bonus_amount)
        .bind(&stub.amounts.bonus_note)
        .bind(stub.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            conflict_on_unique(
                e,
                "A stub of this type already exists for this employee and period",
            )
        })?;

        for d in &stub.deductions {
            sqlx::query(
                r#"INSERT INTO stub_deductions (id, pay_stub_id, deduction_type, description, amount, is_fixed)
                   VALUES ($1, $2, $3, $4, $5, $6)"#,
            )
            .bind(Uuid::new_v4())
            .bind(record.id)
            .bind(d.deduction_type.as_deref().unwrap_or("OTHER"))
            .bind(&d.description)
            .bind(d.amount)
            .bind(d.is_fixed.unwrap_or(false))
            .execute(&mut *tx)
            .await?;
        }
        for a in &stub.allowances {
            sqlx::query(
                r#"INSERT INTO stub_allowances (id, pay_stub_id, allowance_type, description, amount)
                   VALUES ($1, $2, $3, $4, $5)"#,
            )
            .bind(Uuid::new_v4())
            .bind(record.id)
            .bind(a.allowance_type.as_deref().unwrap_or("OTHER"))
            .bind(&a.description)
            .bind(a.amount)
            .execute(&mut *tx)
            .await?;
        }

        let run = recompute_tx(&mut tx, run.id).await?;
        tx.commit().await?;
        Ok((record, run))
    }

    async fn find_stub(&self, company_id: Uuid, id: Uuid) -> AppResult<Option<PayStubDetail>> {
        let stub = sqlx::query_as::<_, PayStub>(
            "SELECT * FROM pay_stubs WHERE id = $1 AND company_id = $2",
        )
        .bind(id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(stub) = stub else {
            return Ok(None);
        };

        let deductions = sqlx::query_as::<_, StubDeduction>(
            "SELECT * FROM stub_deductions WHERE pay_stub_id = $1",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        let allowances = sqlx::query_as::<_, StubAllowance>(
            "SELECT * FROM stub_allowances WHERE pay_stub_id = $1",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(PayStubDetail {
            stub,
            deductions,
            allowances,
        }))
    }

    async fn list_stubs(&self, company_id: Uuid, filter: StubFilter) -> AppResult<Vec<PayStub>> {
        Ok(sqlx::query_as::<_, PayStub>(
            r#"SELECT * FROM pay_stubs
               WHERE company_id = $1
                 AND ($2::uuid IS NULL OR employee_id = $2)
                 AND ($3::uuid IS NULL OR payroll_run_id = $3)
                 AND ($4::stub_status IS NULL OR status = $4)
               ORDER BY created_at DESC"#,
        )
        .bind(company_id)
        .bind(filter.employee_id)
        .bind(filter.run_id)
        .bind(filter.status)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn set_stub_status(
        &self,
        company_id: Uuid,
        stub_id: Uuid,
        status: StubStatus,
        approved_by: Option<String>,
        at: DateTime<Utc>,
    ) -> AppResult<(PayStub, PayrollRun)> {
        let mut tx = self.pool.begin().await?;

        let stub = sqlx::query_as::<_, PayStub>(
            "SELECT * FROM pay_stubs WHERE id = $1 AND company_id = $2 FOR UPDATE",
        )
        .bind(stub_id)
        .bind(company_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Pay stub {} not found", stub_id)))?;

        let run = sqlx::query_as::<_, PayrollRun>(
            "SELECT * FROM payroll_runs WHERE id = $1 FOR UPDATE",
        )
        .bind(stub.payroll_run_id)
        .fetch_one(&mut *tx)
        .await?;

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

        let stub = sqlx::query_as::<_, PayStub>(
            r#"UPDATE pay_stubs SET
                status = $1,
                approved_by = CASE WHEN $1 = 'approved'::stub_status THEN $2 ELSE approved_by END,
                approval_date = CASE WHEN $1 = 'approved'::stub_status THEN $3 ELSE approval_date END
               WHERE id = $4
               RETURNING *"#,
        )
        .bind(status)
        .bind(&approved_by)
        .bind(at)
        .bind(stub_id)
        .fetch_one(&mut *tx)
        .await?;

        let run = recompute_tx(&mut tx, stub.payroll_run_id).await?;
        tx.commit().await?;
        Ok((stub, run))
    }

    async fn list_runs(&self, company_id: Uuid) -> AppResult<Vec<PayrollRun>> {
        Ok(sqlx::query_as::<_, PayrollRun>(
            "SELECT * FROM payroll_runs WHERE company_id = $1 ORDER BY period_date DESC, sub_period DESC",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn find_run(&self, company_id: Uuid, id: Uuid) -> AppResult<Option<PayrollRun>> {
        Ok(sqlx::query_as::<_, PayrollRun>(
            "SELECT * FROM payroll_runs WHERE id = $1 AND company_id = $2",
        )
        .bind(id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn approve_run(&self, company_id: Uuid, id: Uuid) -> AppResult<PayrollRun> {
        let run = sqlx::query_as::<_, PayrollRun>(
            r#"UPDATE payroll_runs SET status = 'approved', updated_at = NOW()
               WHERE id = $1 AND company_id = $2 AND status = 'draft'
               RETURNING *"#,
        )
        .bind(id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;
        match run {
            Some(run) => Ok(run),
            None => {
                let exists = sqlx::query("SELECT 1 FROM payroll_runs WHERE id = $1 AND company_id = $2")
                    .bind(id)
                    .bind(company_id)
                    .fetch_optional(&self.pool)
                    .await?;
                Err(match exists {
                    Some(_) => {
                        AppError::Conflict("Payroll run is already approved".to_string())
                    }
                    None => AppError::NotFound(format!("Payroll run {} not found", id)),
                })
            }
        }
    }

    async fn recompute_totals(&self, company_id: Uuid, run_id: Uuid) -> AppResult<PayrollRun> {
        let mut tx = self.pool.begin().await?;
        let exists = sqlx::query("SELECT 1 FROM payroll_runs WHERE id = $1 AND company_id = $2")
            .bind(run_id)
            .bind(company_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound(format!(
                "Payroll run {} not found",
                run_id
            )));
        }
        let run = recompute_tx(&mut tx, run_id).await?;
        tx.commit().await?;
        Ok(run)
    }
}
