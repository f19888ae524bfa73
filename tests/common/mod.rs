//! Shared fixtures for the integration suite: an in-memory store seeded with
//! a company and the Panama legal parameter set, driven through the same
//! service layer the HTTP handlers use.

#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use planilla::models::{Employee, ParameterCategory, ParameterType};
use planilla::services::payroll::PayrollService;
use planilla::store::{MemoryStore, NewCompany, NewEmployee, NewLegalParameter, PayrollStore};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub service: Arc<PayrollService>,
    pub company_id: Uuid,
}

impl TestApp {
    /// A company with the standard Panama parameters already configured.
    pub async fn seeded() -> Self {
        let app = Self::empty().await;
        seed_panama_parameters(app.store.as_ref(), app.company_id).await;
        app
    }

    /// A company with no legal parameters at all.
    pub async fn empty() -> Self {
        let store = Arc::new(MemoryStore::new());
        let service = Arc::new(PayrollService::new(store.clone()));
        let company = store
            .create_company(NewCompany {
                name: "Acme Panama".to_string(),
                email: format!("{}@acme.test", Uuid::new_v4()),
                password_hash: "not-a-real-hash".to_string(),
            })
            .await
            .expect("create company");
        Self {
            store,
            service,
            company_id: company.id,
        }
    }

    pub async fn employee(&self, cedula: &str, base_salary: Decimal, hire: NaiveDate) -> Employee {
        self.store
            .create_employee(NewEmployee {
                company_id: self.company_id,
                cedula: cedula.to_string(),
                first_name: "Ana".to_string(),
                last_name: cedula.to_string(),
                email: format!("{}@acme.test", cedula),
                position: None,
                base_salary,
                hire_date: hire,
                access_user_id: None,
            })
            .await
            .expect("create employee")
    }
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
}

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).single().expect("valid test time")
}

fn rate_param(
    company_id: Uuid,
    key: &str,
    category: ParameterCategory,
    param_type: ParameterType,
    percentage: Decimal,
) -> NewLegalParameter {
    NewLegalParameter {
        company_id,
        key: key.to_string(),
        name: key.to_string(),
        category,
        param_type,
        percentage,
        min_range: None,
        max_range: None,
        description: None,
        effective_date: day(2024, 1, 1),
    }
}

fn isr_bracket(
    company_id: Uuid,
    ordinal: u32,
    min: Decimal,
    max: Decimal,
    percentage: Decimal,
) -> NewLegalParameter {
    NewLegalParameter {
        company_id,
        key: format!("isr_bracket_{}", ordinal),
        name: format!("ISR bracket {}", ordinal),
        category: ParameterCategory::Isr,
        param_type: ParameterType::Employee,
        percentage,
        min_range: Some(min),
        max_range: Some(max),
        description: None,
        effective_date: day(2024, 1, 1),
    }
}

/// Standard Panama rates: SSS 8.75% / 12.25%, educational 1.25%, and the
/// four ISR brackets.
pub async fn seed_panama_parameters(store: &MemoryStore, company_id: Uuid) {
    let params = vec![
        rate_param(
            company_id,
            "sss_employee",
            ParameterCategory::SocialSecurity,
            ParameterType::Employee,
            dec!(8.75),
        ),
        rate_param(
            company_id,
            "sss_employer",
            ParameterCategory::SocialSecurity,
            ParameterType::Employer,
            dec!(12.25),
        ),
        rate_param(
            company_id,
            "educational_insurance",
            ParameterCategory::EducationalInsurance,
            ParameterType::Employee,
            dec!(1.25),
        ),
        isr_bracket(company_id, 1, dec!(0), dec!(12000), dec!(0)),
        isr_bracket(company_id, 2, dec!(12001), dec!(36000), dec!(15)),
        isr_bracket(company_id, 3, dec!(36001), dec!(60000), dec!(20)),
        isr_bracket(company_id, 4, dec!(60001), dec!(999999), dec!(25)),
    ];
    for param in params {
        store.create_parameter(param).await.expect("seed parameter");
    }
}
