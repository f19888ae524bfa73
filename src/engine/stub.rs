// src/engine/stub.rs

use crate::{
    engine::{contribution::flat_contribution, params::CompanyParameters, round_money},
    errors::{AppError, AppResult},
    models::{AllowanceInput, DeductionInput, PayrollType},
};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const DEFAULT_WORKING_DAYS: i32 = 30;

/// Everything the pay-stub arithmetic needs, fully resolved. The pay period
/// is the evaluation date for bonus math — the engine never reads a clock.
#[derive(Debug)]
pub struct StubInputs<'a> {
    pub base_salary: Decimal,
    pub working_days: i32,
    pub days_worked: i32,
    pub payroll_type: PayrollType,
    pub pay_period: NaiveDate,
    pub hire_date: NaiveDate,
    pub deductions: &'a [DeductionInput],
    pub allowances: &'a [AllowanceInput],
    pub params: &'a CompanyParameters,
}

/// The computed monetary fields of one stub. Invariants (each within one
/// minor unit): `gross = prorated + total_allowances`,
/// `total_deductions = income_tax + social_security + private_insurance +
/// other_deductions`, `net = gross - total_deductions`.
#[derive(Debug, Clone, PartialEq)]
pub struct StubAmounts {
    pub prorated_salary: Decimal,
    pub total_allowances: Decimal,
    pub gross_salary: Decimal,
    pub income_tax: Decimal,
    pub social_security: Decimal,
    pub private_insurance: Decimal,
    pub other_deductions: Decimal,
    pub total_deductions: Decimal,
    pub net_salary: Decimal,
    pub bonus_amount: Decimal,
    pub bonus_note: Option<String>,
}

pub fn calculate(inputs: &StubInputs<'_>) -> AppResult<StubAmounts> {
    validate(inputs)?;

    // Decimal division throughout; each field is rounded exactly once.
    let prorated_salary = round_money(
        inputs.base_salary / Decimal::from(inputs.working_days)
            * Decimal::from(inputs.days_worked),
    );

    let social_security =
        flat_contribution(prorated_salary, inputs.params.social_security_rate);
    let educational_insurance =
        flat_contribution(prorated_salary, inputs.params.educational_insurance_rate);
    let private_insurance =
        flat_contribution(prorated_salary, inputs.params.private_insurance_rate);

    // ISR applies after the social-security contribution comes off.
    let taxable_income = prorated_salary - social_security;
    let income_tax = inputs.params.brackets.tax(taxable_income);

    let custom_deductions: Decimal = inputs.deductions.iter().map(|d| d.amount).sum();
    let total_allowances: Decimal =
        round_money(inputs.allowances.iter().map(|a| a.amount).sum());

    let other_deductions = round_money(educational_insurance + custom_deductions);
    let gross_salary = round_money(prorated_salary + total_allowances);
    let total_deductions =
        round_money(income_tax + social_security + private_insurance + other_deductions);
    let net_salary = gross_salary - total_deductions;

    let (bonus_amount, bonus_note) = match inputs.payroll_type {
        PayrollType::ThirteenthMonth => {
            thirteenth_month_bonus(inputs.base_salary, inputs.hire_date, inputs.pay_period)
        }
        PayrollType::Regular => (Decimal::ZERO, None),
    };

    Ok(StubAmounts {
        prorated_salary,
        total_allowances,
        gross_salary,
        income_tax,
        social_security,
        private_insurance,
        other_deductions,
        total_deductions,
        net_salary,
        bonus_amount,
        bonus_note,
    })
}

fn validate(inputs: &StubInputs<'_>) -> AppResult<()> {
    if inputs.base_salary < Decimal::ZERO {
        return Err(AppError::Validation(
            "Base salary cannot be negative".to_string(),
        ));
    }
    if inputs.working_days <= 0 {
        return Err(AppError::Validation(
            "Working days must be greater than zero".to_string(),
        ));
    }
    if inputs.days_worked < 0 || inputs.days_worked > inputs.working_days {
        return Err(AppError::Validation(format!(
            "Days worked must be between 0 and {}",
            inputs.working_days
        )));
    }
    if inputs.deductions.iter().any(|d| d.amount < Decimal::ZERO) {
        return Err(AppError::Validation(
            "Deduction amounts cannot be negative".to_string(),
        ));
    }
    if inputs.allowances.iter().any(|a| a.amount < Decimal::ZERO) {
        return Err(AppError::Validation(
            "Allowance amounts cannot be negative".to_string(),
        ));
    }
    Ok(())
}

/// Prorated annual bonus for a thirteenth-month run.
///
/// Employees hired within the run's calendar year get
/// `base * months / 12`, where `months` is the whole-month count between the
/// hire date and December 31 approximated as ceil(day span / 30) and capped
/// at 12 — a documented approximation, not calendar-exact month arithmetic.
/// Everyone else gets the full base salary.
pub fn thirteenth_month_bonus(
    base_salary: Decimal,
    hire_date: NaiveDate,
    pay_period: NaiveDate,
) -> (Decimal, Option<String>) {
    let year = pay_period.year();
    let Some(end_of_year) = NaiveDate::from_ymd_opt(year, 12, 31) else {
        // December 31 exists in every chrono-representable year
        return (Decimal::ZERO, None);
    };

    if hire_date.year() == year {
        let days = (end_of_year - hire_date).num_days().max(0);
        // ceil(days / 30); days is non-negative here
        let months = ((days + 29) / 30).min(12);
        let bonus = round_money(base_salary * Decimal::from(months) / dec!(12));
        let note = format!("Prorated thirteenth month: {} months worked this year", months);
        (bonus, Some(note))
    } else {
        (
            round_money(base_salary),
            Some("Full thirteenth month (12 months worked)".to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tax::{BracketTable, TaxBracket};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    fn panama_params() -> CompanyParameters {
        CompanyParameters {
            social_security_rate: dec!(8.75),
            educational_insurance_rate: dec!(0),
            private_insurance_rate: dec!(0),
            brackets: BracketTable::new(vec![
                TaxBracket { min: dec!(0), max: dec!(12000), rate: dec!(0) },
                TaxBracket { min: dec!(12001), max: dec!(36000), rate: dec!(15) },
                TaxBracket { min: dec!(36001), max: dec!(60000), rate: dec!(20) },
                TaxBracket { min: dec!(60001), max: dec!(999999), rate: dec!(25) },
            ])
            .expect("well-formed table"),
        }
    }

    fn inputs<'a>(params: &'a CompanyParameters) -> StubInputs<'a> {
        StubInputs {
            base_salary: dec!(2400),
            working_days: 30,
            days_worked: 30,
            payroll_type: PayrollType::Regular,
            pay_period: day(2024, 6, 1),
            hire_date: day(2020, 2, 15),
            deductions: &[],
            allowances: &[],
            params,
        }
    }

    #[test]
    fn full_month_stub_matches_reference_scenario() {
        // baseSalary=2400, 30/30 days, SSS 8.75%, taxable below the exempt
        // ceiling: socialSecurity = 210.00, incomeTax = 0, net = gross - 210
        let params = panama_params();
        let amounts = calculate(&inputs(&params)).expect("calculates");

        assert_eq!(amounts.prorated_salary, dec!(2400.00));
        assert_eq!(amounts.social_security, dec!(210.00));
        assert_eq!(amounts.income_tax, dec!(0));
        assert_eq!(amounts.gross_salary, dec!(2400.00));
        assert_eq!(amounts.net_salary, amounts.gross_salary - dec!(210.00));
    }

    #[test]
    fn proration_scales_salary_by_days_worked() {
        let params = panama_params();
        let mut i = inputs(&params);
        i.days_worked = 15;
        let amounts = calculate(&i).expect("calculates");
        assert_eq!(amounts.prorated_salary, dec!(1200.00));
        assert_eq!(amounts.social_security, dec!(105.00));
    }

    #[test]
    fn deduction_and_net_invariants_hold() {
        let params = panama_params();
        let deductions = [DeductionInput {
            deduction_type: Some("LOAN".to_string()),
            description: None,
            amount: dec!(75.50),
            is_fixed: Some(true),
        }];
        let allowances = [AllowanceInput {
            allowance_type: Some("TRANSPORT".to_string()),
            description: None,
            amount: dec!(120.00),
        }];
        let mut i = inputs(&params);
        i.deductions = &deductions;
        i.allowances = &allowances;

        let amounts = calculate(&i).expect("calculates");
        assert_eq!(amounts.gross_salary, amounts.prorated_salary + amounts.total_allowances);
        assert_eq!(
            amounts.total_deductions,
            amounts.income_tax
                + amounts.social_security
                + amounts.private_insurance
                + amounts.other_deductions
        );
        assert_eq!(amounts.net_salary, amounts.gross_salary - amounts.total_deductions);
    }

    #[test]
    fn educational_insurance_lands_in_other_deductions() {
        let mut params = panama_params();
        params.educational_insurance_rate = dec!(1.25);
        let amounts = calculate(&inputs(&params)).expect("calculates");
        // 1.25% of 2400.00
        assert_eq!(amounts.other_deductions, dec!(30.00));
    }

    #[test]
    fn regular_stub_carries_no_bonus() {
        let params = panama_params();
        let amounts = calculate(&inputs(&params)).expect("calculates");
        assert_eq!(amounts.bonus_amount, dec!(0));
        assert!(amounts.bonus_note.is_none());
    }

    #[test]
    fn thirteenth_month_hired_mid_year_is_strictly_partial() {
        // Hired 1 March of the run's year: bonus strictly between 0 and base
        let (bonus, note) =
            thirteenth_month_bonus(dec!(2400), day(2024, 3, 1), day(2024, 12, 1));
        assert!(bonus > dec!(0) && bonus < dec!(2400), "bonus was {}", bonus);
        // 305 days -> ceil(305/30) = 11 months
        assert_eq!(bonus, dec!(2200.00));
        assert_eq!(
            note.as_deref(),
            Some("Prorated thirteenth month: 11 months worked this year")
        );
    }

    #[test]
    fn thirteenth_month_prior_year_hire_gets_full_base() {
        let (bonus, note) =
            thirteenth_month_bonus(dec!(2400), day(2019, 7, 1), day(2024, 12, 1));
        assert_eq!(bonus, dec!(2400.00));
        assert_eq!(note.as_deref(), Some("Full thirteenth month (12 months worked)"));
    }

    #[test]
    fn thirteenth_month_rounds_partial_months_up() {
        // Hired 1 December: exactly 30 days to Dec 31 -> 1 month
        let (bonus, _) =
            thirteenth_month_bonus(dec!(2400), day(2024, 12, 1), day(2024, 12, 1));
        assert_eq!(bonus, dec!(200.00));
        // One day later: 29 days still count as a full month
        let (bonus, _) =
            thirteenth_month_bonus(dec!(2400), day(2024, 12, 2), day(2024, 12, 1));
        assert_eq!(bonus, dec!(200.00));
    }

    #[test]
    fn thirteenth_month_january_hire_is_capped_at_full_base() {
        // The 30-day approximation would yield 13 months for a Jan 1 hire;
        // the cap keeps the bonus at one full base salary.
        let (bonus, _) =
            thirteenth_month_bonus(dec!(2400), day(2024, 1, 1), day(2024, 12, 1));
        assert_eq!(bonus, dec!(2400.00));
    }

    #[test]
    fn invalid_attendance_is_rejected() {
        let params = panama_params();
        let mut i = inputs(&params);
        i.days_worked = 31;
        assert!(matches!(calculate(&i), Err(AppError::Validation(_))));

        let mut i = inputs(&params);
        i.working_days = 0;
        assert!(matches!(calculate(&i), Err(AppError::Validation(_))));

        let mut i = inputs(&params);
        i.base_salary = dec!(-1);
        assert!(matches!(calculate(&i), Err(AppError::Validation(_))));
    }
}
