// src/engine/params.rs

use crate::{
    errors::AppResult,
    models::{LegalParameter, ParameterCategory, ParameterStatus, ParameterType},
    engine::tax::BracketTable,
};
use rust_decimal::Decimal;

/// Private-insurance plans are configured as a company-specific `other`
/// parameter under this key.
pub const PRIVATE_INSURANCE_KEY: &str = "private_insurance";

/// The rates and bracket table a single stub build reads. Resolved once from
/// the company's active legal parameters, before any arithmetic, so malformed
/// parameter data is rejected up front and the parameter set cannot change
/// mid-calculation.
#[derive(Debug, Clone, Default)]
pub struct CompanyParameters {
    pub social_security_rate: Decimal,
    pub educational_insurance_rate: Decimal,
    pub private_insurance_rate: Decimal,
    pub brackets: BracketTable,
}

impl CompanyParameters {
    /// A company with no parameters configured deducts nothing — the same
    /// zero-rate fallback the rest of the system uses for unset tax config.
    pub fn resolve(params: &[LegalParameter]) -> AppResult<Self> {
        let active: Vec<&LegalParameter> = params
            .iter()
            .filter(|p| p.status == ParameterStatus::Active)
            .collect();

        let brackets = BracketTable::from_parameters(
            active
                .iter()
                .copied()
                .filter(|p| p.category == ParameterCategory::Isr),
        )?;

        Ok(Self {
            social_security_rate: employee_rate(&active, ParameterCategory::SocialSecurity, None),
            educational_insurance_rate: employee_rate(
                &active,
                ParameterCategory::EducationalInsurance,
                None,
            ),
            private_insurance_rate: employee_rate(
                &active,
                ParameterCategory::Other,
                Some(PRIVATE_INSURANCE_KEY),
            ),
            brackets,
        })
    }
}

// Most recent effective employee-side rate in a category, 0 when unset.
fn employee_rate(
    active: &[&LegalParameter],
    category: ParameterCategory,
    key: Option<&str>,
) -> Decimal {
    active
        .iter()
        .filter(|p| {
            p.category == category
                && p.param_type == ParameterType::Employee
                && key.is_none_or(|k| p.key == k)
        })
        .max_by_key(|p| p.effective_date)
        .map(|p| p.percentage)
        .unwrap_or(Decimal::ZERO)
}
