// src/engine/tax.rs

use crate::{
    engine::round_money,
    errors::{AppError, AppResult},
    models::LegalParameter,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// One contiguous income range taxed at a single marginal rate.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxBracket {
    pub min: Decimal,
    pub max: Decimal,
    /// Percentage points, e.g. 15 means 15%
    pub rate: Decimal,
}

/// A validated progressive bracket table.
///
/// Validation happens once at construction; `tax` itself cannot fail. Legal
/// parameter rows are commonly seeded with adjacent bounds like
/// `(0, 12000)` / `(12001, 36000)`, so the effective floor of each bracket is
/// taken from the previous bracket's ceiling. That also fixes the boundary
/// convention: an income exactly equal to a bracket's ceiling is taxed
/// entirely within that bracket, never spilled into the next one.
#[derive(Debug, Clone, Default)]
pub struct BracketTable {
    // (floor, ceiling, rate) with floors derived from the previous ceiling
    rows: Vec<TaxBracket>,
}

impl BracketTable {
    pub fn new(mut brackets: Vec<TaxBracket>) -> AppResult<Self> {
        if brackets.is_empty() {
            return Ok(Self { rows: Vec::new() });
        }

        brackets.sort_by(|a, b| a.min.cmp(&b.min));

        let first = &brackets[0];
        if first.min != Decimal::ZERO {
            return Err(AppError::Configuration(format!(
                "bracket table does not cover income from 0 (starts at {})",
                first.min
            )));
        }

        let mut rows: Vec<TaxBracket> = Vec::with_capacity(brackets.len());
        for bracket in brackets {
            if bracket.rate < Decimal::ZERO {
                return Err(AppError::Configuration(format!(
                    "negative tax rate {} in bracket starting at {}",
                    bracket.rate, bracket.min
                )));
            }
            if bracket.max < bracket.min {
                return Err(AppError::Configuration(format!(
                    "bracket range inverted: min {} > max {}",
                    bracket.min, bracket.max
                )));
            }
            if let Some(prev) = rows.last() {
                let gap = bracket.min - prev.max;
                if gap < Decimal::ZERO {
                    return Err(AppError::Configuration(format!(
                        "overlapping brackets: {} starts below previous ceiling {}",
                        bracket.min, prev.max
                    )));
                }
                if gap > Decimal::ONE {
                    return Err(AppError::Configuration(format!(
                        "income between {} and {} is not covered by any bracket",
                        prev.max, bracket.min
                    )));
                }
                // Close the seam: the previous ceiling is this bracket's floor.
                rows.push(TaxBracket {
                    min: prev.max,
                    max: bracket.max,
                    rate: bracket.rate,
                });
            } else {
                rows.push(bracket);
            }
        }

        Ok(Self { rows })
    }

    /// Build the table from a company's active ISR legal parameters, one
    /// bracket per row. A parameter without a min/max range is malformed.
    pub fn from_parameters<'a, I>(params: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = &'a LegalParameter>,
    {
        let mut brackets = Vec::new();
        for param in params {
            let (min, max) = match (param.min_range, param.max_range) {
                (Some(min), Some(max)) => (min, max),
                _ => {
                    return Err(AppError::Configuration(format!(
                        "ISR parameter '{}' is missing its income range",
                        param.key
                    )));
                }
            };
            brackets.push(TaxBracket {
                min,
                max,
                rate: param.percentage,
            });
        }
        Self::new(brackets)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Progressive income tax on `taxable`. Income above each bracket's floor
    /// up to its ceiling is taxed at that bracket's rate; no amount is taxed
    /// twice. Non-positive income taxes to zero, and so does an empty table
    /// (a company that has not configured ISR rates).
    pub fn tax(&self, taxable: Decimal) -> Decimal {
        if taxable <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let hundred = dec!(100);
        let mut total = Decimal::ZERO;
        for row in &self.rows {
            if taxable <= row.min {
                break;
            }
            let span = taxable.min(row.max) - row.min;
            total += span * row.rate / hundred;
        }
        round_money(total)
    }
}
