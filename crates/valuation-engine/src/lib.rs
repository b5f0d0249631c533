use analysis_core::{
    AnalysisError, FinancialStatementSet, MetricsReport, QuoteInfo, ScoreCard, ValuationReport,
    Verdict,
};
use fundamentals_engine::free_cash_flow;
use serde::{Deserialize, Serialize};

// Valuation and scoring policy. Fixed business constants, named for
// auditability and testing; not runtime configuration.
pub const GRAHAM_MULTIPLIER: f64 = 22.5;
pub const DISCOUNT_RATE: f64 = 0.10;
pub const TERMINAL_GROWTH_RATE: f64 = 0.03;
pub const GROWTH_RATE_CAP: f64 = 0.15;
pub const DEFAULT_GROWTH_RATE: f64 = 0.05;
pub const PROJECTION_YEARS: i32 = 10;

pub const MOAT_MARGIN_THRESHOLD: f64 = 40.0;
pub const ROE_THRESHOLD: f64 = 15.0;
pub const DEBT_YEARS_LIMIT: f64 = 5.0;

pub const MOAT_WEIGHT: u8 = 30;
pub const MANAGEMENT_WEIGHT: u8 = 30;
pub const DEBT_WEIGHT: u8 = 20;
pub const CASH_WEIGHT: u8 = 20;

/// Outcome of the DCF model for one company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfEstimate {
    pub fair_value: Option<f64>,
    /// Growth assumption actually projected with, when the model ran.
    pub growth_rate: Option<f64>,
    /// Reason the model was inapplicable, when it did not.
    pub note: Option<String>,
}

impl DcfEstimate {
    fn unavailable(note: &str) -> Self {
        Self {
            fair_value: None,
            growth_rate: None,
            note: Some(note.to_string()),
        }
    }
}

/// Intrinsic-value models and scorecard aggregation.
pub struct ValuationEngine;

impl ValuationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Graham number: `sqrt(22.5 * EPS * book value per share)`.
    ///
    /// Both operands must be present and strictly positive; a company with
    /// negative earnings or negative book equity has no meaningful Graham
    /// estimate, and a negative operand under the root is never computed.
    pub fn calculate_graham(&self, quote: &QuoteInfo) -> Option<f64> {
        let eps = quote.trailing_eps.filter(|v| *v > 0.0)?;
        let bvps = quote.book_value_per_share.filter(|v| *v > 0.0)?;
        Some((GRAHAM_MULTIPLIER * eps * bvps).sqrt())
    }

    /// Two-stage discounted-cash-flow fair value per share.
    ///
    /// Base FCF comes from the same fallback chain the fundamentals use.
    /// Only the sign of the base FCF gates eligibility; the growth rate is
    /// capped at [`GROWTH_RATE_CAP`] with no floor, so a reported decline
    /// projects as a decline.
    pub fn calculate_dcf(&self, statements: &FinancialStatementSet) -> DcfEstimate {
        let base_fcf = match free_cash_flow(&statements.cash_flow_statement) {
            Some(v) => v,
            None => {
                tracing::debug!("{}: DCF skipped, free cash flow unavailable", statements.symbol);
                return DcfEstimate::unavailable("free cash flow unavailable");
            }
        };
        if base_fcf <= 0.0 {
            return DcfEstimate::unavailable("negative free cash flow");
        }
        let shares = match statements.quote.shares_outstanding {
            Some(s) if s > 0.0 => s,
            _ => return DcfEstimate::unavailable("shares outstanding unavailable"),
        };

        let growth_rate = statements
            .quote
            .revenue_growth
            .map(|g| g.min(GROWTH_RATE_CAP))
            .unwrap_or(DEFAULT_GROWTH_RATE);

        let mut projected_fcf = base_fcf;
        let mut present_value = 0.0;
        for year in 1..=PROJECTION_YEARS {
            projected_fcf *= 1.0 + growth_rate;
            present_value += projected_fcf / (1.0 + DISCOUNT_RATE).powi(year);
        }
        // DISCOUNT_RATE > TERMINAL_GROWTH_RATE by construction, so the
        // perpetuity denominator stays positive.
        let terminal_value = projected_fcf * (1.0 + TERMINAL_GROWTH_RATE)
            / (DISCOUNT_RATE - TERMINAL_GROWTH_RATE);
        present_value += terminal_value / (1.0 + DISCOUNT_RATE).powi(PROJECTION_YEARS);

        DcfEstimate {
            fair_value: Some(present_value / shares),
            growth_rate: Some(growth_rate),
            note: None,
        }
    }

    /// Four-pillar scorecard: 30/30/20/20 weighted sum of pass flags.
    pub fn build_scorecard(&self, metrics: &MetricsReport) -> ScoreCard {
        let moat_pass = metrics
            .average_gross_margin
            .map(|m| m > MOAT_MARGIN_THRESHOLD)
            .unwrap_or(false);
        let management_pass = metrics
            .current_roe
            .map(|r| r > ROE_THRESHOLD)
            .unwrap_or(false);
        let debt_pass = metrics
            .debt_years
            .map(|y| y < DEBT_YEARS_LIMIT)
            .unwrap_or(false);
        let cash_pass = metrics.free_cash_flow_positive;

        let score = [
            (moat_pass, MOAT_WEIGHT),
            (management_pass, MANAGEMENT_WEIGHT),
            (debt_pass, DEBT_WEIGHT),
            (cash_pass, CASH_WEIGHT),
        ]
        .iter()
        .filter(|(pass, _)| *pass)
        .map(|(_, weight)| weight)
        .sum();

        ScoreCard {
            moat_pass,
            management_pass,
            debt_pass,
            cash_pass,
            score,
            verdict: Verdict::from_score(score),
        }
    }

    /// Assemble all valuation models for one statement set.
    ///
    /// Short-circuits with `DataUnavailable` on the empty-statement
    /// invariant before any model runs; every other failure mode lands in
    /// the report's optional fields.
    pub fn build_report(
        &self,
        statements: &FinancialStatementSet,
    ) -> Result<ValuationReport, AnalysisError> {
        statements.validate()?;
        let dcf = self.calculate_dcf(statements);
        Ok(ValuationReport {
            symbol: statements.symbol.clone(),
            graham_number: self.calculate_graham(&statements.quote),
            dcf_fair_value: dcf.fair_value,
            dcf_growth_rate: dcf.growth_rate,
            dcf_note: dcf.note,
            analyst_target_price: statements.quote.analyst_target_price,
        })
    }
}

impl Default for ValuationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{PeriodValue, StatementTable};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn date(y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, 12, 31).unwrap()
    }

    fn table(rows: &[(&str, &[(i32, f64)])]) -> StatementTable {
        let mut t = StatementTable::new();
        for (name, values) in rows {
            t.insert_row(
                *name,
                values.iter().map(|(y, v)| PeriodValue::new(date(*y), *v)).collect(),
            );
        }
        t
    }

    fn statement_set(quote: QuoteInfo) -> FinancialStatementSet {
        FinancialStatementSet {
            symbol: "TEST".to_string(),
            income_statement: table(&[
                ("Total Revenue", &[(2024, 1000.0)] as &[_]),
                ("Net Income", &[(2024, 120.0)] as &[_]),
            ]),
            balance_sheet: table(&[("Stockholders Equity", &[(2024, 600.0)])]),
            cash_flow_statement: table(&[
                ("Operating Cash Flow", &[(2024, 1000.0)] as &[_]),
                ("Capital Expenditure", &[(2024, 0.0)] as &[_]),
            ]),
            quote,
        }
    }

    fn quote() -> QuoteInfo {
        QuoteInfo {
            symbol: "TEST".to_string(),
            shares_outstanding: Some(100.0),
            ..QuoteInfo::default()
        }
    }

    #[test]
    fn test_graham_number_example() {
        let engine = ValuationEngine::new();
        let q = QuoteInfo {
            symbol: "TEST".to_string(),
            trailing_eps: Some(5.0),
            book_value_per_share: Some(20.0),
            ..QuoteInfo::default()
        };
        // sqrt(22.5 * 5 * 20) = sqrt(2250)
        assert_relative_eq!(engine.calculate_graham(&q).unwrap(), 47.4341649, epsilon = 1e-6);
    }

    #[test]
    fn test_graham_requires_positive_operands() {
        let engine = ValuationEngine::new();
        let negative_eps = QuoteInfo {
            symbol: "TEST".to_string(),
            trailing_eps: Some(-2.0),
            book_value_per_share: Some(20.0),
            ..QuoteInfo::default()
        };
        assert_eq!(engine.calculate_graham(&negative_eps), None);

        let missing_bvps = QuoteInfo {
            symbol: "TEST".to_string(),
            trailing_eps: Some(5.0),
            ..QuoteInfo::default()
        };
        assert_eq!(engine.calculate_graham(&missing_bvps), None);
    }

    #[test]
    fn test_dcf_zero_growth_hand_computed() {
        // Base FCF 1000, growth 0: annuity of 1000 over 10 years at 10%
        // plus the discounted perpetuity 1000*1.03/0.07.
        let mut q = quote();
        q.revenue_growth = Some(0.0);
        let est = ValuationEngine::new().calculate_dcf(&statement_set(q));
        assert_relative_eq!(est.fair_value.unwrap(), 118.1756, epsilon = 1e-2);
        assert_eq!(est.growth_rate, Some(0.0));
        assert_eq!(est.note, None);
    }

    #[test]
    fn test_dcf_growth_is_capped() {
        let mut q = quote();
        q.revenue_growth = Some(0.40);
        let est = ValuationEngine::new().calculate_dcf(&statement_set(q));
        assert_eq!(est.growth_rate, Some(GROWTH_RATE_CAP));
        assert!(est.fair_value.is_some());
    }

    #[test]
    fn test_dcf_negative_growth_passes_through() {
        let mut q = quote();
        q.revenue_growth = Some(-0.10);
        let est = ValuationEngine::new().calculate_dcf(&statement_set(q));
        // A reported decline is not floored; only the base FCF sign gates
        // eligibility.
        assert_eq!(est.growth_rate, Some(-0.10));
        let fv = est.fair_value.unwrap();
        assert!(fv > 0.0 && fv.is_finite());
    }

    #[test]
    fn test_dcf_default_growth_when_unreported() {
        let est = ValuationEngine::new().calculate_dcf(&statement_set(quote()));
        assert_eq!(est.growth_rate, Some(DEFAULT_GROWTH_RATE));
    }

    #[test]
    fn test_dcf_unavailable_on_negative_base_fcf() {
        let mut set = statement_set(quote());
        set.cash_flow_statement = table(&[
            ("Operating Cash Flow", &[(2024, 200.0)] as &[_]),
            ("Capital Expenditure", &[(2024, -500.0)] as &[_]),
        ]);
        let est = ValuationEngine::new().calculate_dcf(&set);
        assert_eq!(est.fair_value, None);
        assert_eq!(est.note.as_deref(), Some("negative free cash flow"));
    }

    #[test]
    fn test_dcf_unavailable_without_shares() {
        let mut q = quote();
        q.shares_outstanding = None;
        let est = ValuationEngine::new().calculate_dcf(&statement_set(q));
        assert_eq!(est.fair_value, None);
        assert_eq!(est.note.as_deref(), Some("shares outstanding unavailable"));
    }

    fn metrics(
        avg_margin: Option<f64>,
        roe: Option<f64>,
        debt_years: Option<f64>,
        fcf_positive: bool,
    ) -> MetricsReport {
        MetricsReport {
            symbol: "TEST".to_string(),
            average_gross_margin: avg_margin,
            current_roe: roe,
            debt_years,
            free_cash_flow_positive: fcf_positive,
            ..MetricsReport::default()
        }
    }

    #[test]
    fn test_scorecard_three_pillar_pass_is_high_quality() {
        let card = ValuationEngine::new().build_scorecard(&metrics(
            Some(45.0),
            Some(20.0),
            Some(7.0),
            true,
        ));
        assert!(card.moat_pass && card.management_pass && card.cash_pass);
        assert!(!card.debt_pass);
        assert_eq!(card.score, 80);
        assert_eq!(card.verdict, Verdict::HighQuality);
    }

    #[test]
    fn test_scorecard_all_fail() {
        let card = ValuationEngine::new().build_scorecard(&metrics(None, None, None, false));
        assert_eq!(card.score, 0);
        assert_eq!(card.verdict, Verdict::FailsCriteria);
    }

    #[test]
    fn test_scorecard_loss_maker_fails_debt_pillar() {
        let card = ValuationEngine::new().build_scorecard(&metrics(
            Some(45.0),
            Some(20.0),
            Some(fundamentals_engine::DEBT_YEARS_SENTINEL),
            true,
        ));
        assert!(!card.debt_pass);
    }

    #[test]
    fn test_verdict_bands() {
        assert_eq!(Verdict::from_score(80), Verdict::HighQuality);
        assert_eq!(Verdict::from_score(50), Verdict::Mixed);
        assert_eq!(Verdict::from_score(79), Verdict::Mixed);
        assert_eq!(Verdict::from_score(40), Verdict::FailsCriteria);
    }

    #[test]
    fn test_build_report_short_circuits_on_empty_statements() {
        let mut set = statement_set(quote());
        set.income_statement = StatementTable::new();
        let err = ValuationEngine::new().build_report(&set).unwrap_err();
        assert!(matches!(err, AnalysisError::DataUnavailable(_)));
    }

    #[test]
    fn test_build_report_passes_analyst_target_through() {
        let mut q = quote();
        q.analyst_target_price = Some(180.0);
        q.trailing_eps = Some(5.0);
        q.book_value_per_share = Some(20.0);
        let report = ValuationEngine::new().build_report(&statement_set(q)).unwrap();
        assert_eq!(report.analyst_target_price, Some(180.0));
        assert!(report.graham_number.is_some());
        assert!(report.dcf_fair_value.is_some());
    }
}
