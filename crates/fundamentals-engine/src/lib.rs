use analysis_core::{
    AnalysisError, FinancialStatementSet, MetricsReport, PeriodValue, StatementTable,
};
use chrono::NaiveDate;
use statement_normalizer as norm;
use statrs::statistics::Statistics;

/// Debt-payback years reported for a loss-making company. Payback time is
/// undefined when the latest net income is zero or negative, and any
/// computed value is capped here so reports stay bounded.
pub const DEBT_YEARS_SENTINEL: f64 = 99.0;

/// Latest-period free cash flow.
///
/// Prefers the provider's reported "Free Cash Flow" row; otherwise falls
/// back to operating cash flow plus capital expenditure. Capex is reported
/// as a negative figure, so the addition nets it out. `None` when neither
/// path resolves.
pub fn free_cash_flow(cash_flow: &StatementTable) -> Option<f64> {
    if let Some(fcf) = norm::latest(cash_flow, &norm::FREE_CASH_FLOW) {
        return Some(fcf);
    }
    let ocf = norm::latest(cash_flow, &norm::OPERATING_CASH_FLOW)?;
    let capex = norm::latest(cash_flow, &norm::CAPITAL_EXPENDITURE)?;
    Some(ocf + capex)
}

/// Per-period and trailing fundamental metrics from a statement set.
///
/// The five computations (margin, ROE, debt coverage, free cash flow, book
/// value trend) are independent; a missing line item degrades its own metric
/// and never aborts the siblings.
pub struct FundamentalsEngine;

impl FundamentalsEngine {
    pub fn new() -> Self {
        Self
    }

    /// Pure function of the statement snapshot: identical input yields an
    /// identical report. Only the empty-statement invariant is an error.
    pub fn compute_metrics(
        &self,
        statements: &FinancialStatementSet,
    ) -> Result<MetricsReport, AnalysisError> {
        statements.validate()?;

        let income = &statements.income_statement;
        let balance = &statements.balance_sheet;
        let cash_flow = &statements.cash_flow_statement;

        let margins = RatioSeries::from_pairs(norm::paired_series(
            income,
            &norm::GROSS_PROFIT,
            income,
            &norm::TOTAL_REVENUE,
        ));
        let roe = RatioSeries::from_pairs(norm::paired_series(
            income,
            &norm::NET_INCOME,
            balance,
            &norm::STOCKHOLDERS_EQUITY,
        ));

        if margins.current.is_none() {
            tracing::debug!("{}: gross margin unavailable", statements.symbol);
        }

        let fcf = free_cash_flow(cash_flow);

        Ok(MetricsReport {
            symbol: statements.symbol.clone(),
            current_gross_margin: margins.current,
            average_gross_margin: margins.average,
            margin_volatility: margins.volatility,
            margin_series: margins.ascending,
            current_roe: roe.current,
            average_roe: roe.average,
            roe_series: roe.ascending,
            debt_years: self.debt_years(income, balance),
            free_cash_flow: fcf,
            free_cash_flow_positive: fcf.map(|v| v > 0.0).unwrap_or(false),
            book_value_trend_up: self.book_value_trend(balance),
        })
    }

    /// Years of latest net income needed to clear long-term debt.
    ///
    /// A missing long-term-debt row means the company carries none and
    /// resolves to zero; a missing net-income row leaves the metric absent.
    fn debt_years(&self, income: &StatementTable, balance: &StatementTable) -> Option<f64> {
        let net_income = norm::latest(income, &norm::NET_INCOME)?;
        if net_income <= 0.0 {
            return Some(DEBT_YEARS_SENTINEL);
        }
        let long_term_debt = norm::latest_or(balance, &norm::LONG_TERM_DEBT, 0.0);
        Some((long_term_debt / net_income).min(DEBT_YEARS_SENTINEL))
    }

    /// True iff the latest stockholders' equity strictly exceeds the oldest
    /// available period's. Needs at least two periods.
    fn book_value_trend(&self, balance: &StatementTable) -> bool {
        let equity = norm::series(balance, &norm::STOCKHOLDERS_EQUITY);
        if equity.len() < 2 {
            return false;
        }
        match (equity.first(), equity.last()) {
            (Some(newest), Some(oldest)) => newest.value > oldest.value,
            _ => false,
        }
    }
}

impl Default for FundamentalsEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// A percentage ratio computed per period, with its trailing aggregates.
struct RatioSeries {
    /// Latest-period ratio.
    current: Option<f64>,
    /// Arithmetic mean across usable periods.
    average: Option<f64>,
    /// Standard deviation across usable periods (needs at least two).
    volatility: Option<f64>,
    /// Usable periods ascending by period end.
    ascending: Vec<PeriodValue>,
}

impl RatioSeries {
    /// `pairs` is (period, numerator, denominator), most recent first.
    /// Periods with a zero or negative denominator are excluded from the
    /// series and every aggregate rather than treated as zero.
    fn from_pairs(pairs: Vec<(NaiveDate, f64, f64)>) -> Self {
        let mut descending: Vec<PeriodValue> = pairs
            .into_iter()
            .filter(|(_, _, den)| *den > 0.0)
            .map(|(period, num, den)| PeriodValue::new(period, (num / den) * 100.0))
            .collect();

        let current = descending.first().map(|pv| pv.value);
        let values: Vec<f64> = descending.iter().map(|pv| pv.value).collect();
        let average = if values.is_empty() {
            None
        } else {
            Some(values.iter().copied().mean())
        };
        let volatility = if values.len() >= 2 {
            Some(values.iter().copied().std_dev())
        } else {
            None
        };

        descending.reverse();
        Self {
            current,
            average,
            volatility,
            ascending: descending,
        }
    }
}
