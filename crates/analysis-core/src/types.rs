use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One (fiscal-period, value) observation from a statement row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodValue {
    pub period_end: NaiveDate,
    pub value: f64,
}

impl PeriodValue {
    pub fn new(period_end: NaiveDate, value: f64) -> Self {
        Self { period_end, value }
    }
}

/// One statement table: line-item name mapped to its values, most recent
/// fiscal period first. Providers report annual columns, typically the four
/// most recent fiscal years.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementTable {
    rows: BTreeMap<String, Vec<PeriodValue>>,
}

impl StatementTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row, keeping its values ordered most-recent-first.
    pub fn insert_row(&mut self, name: impl Into<String>, mut values: Vec<PeriodValue>) {
        values.sort_by(|a, b| b.period_end.cmp(&a.period_end));
        self.rows.insert(name.into(), values);
    }

    pub fn row(&self, name: &str) -> Option<&[PeriodValue]> {
        self.rows.get(name).map(|v| v.as_slice())
    }

    /// True when the table has no rows with at least one value.
    pub fn is_empty(&self) -> bool {
        self.rows.values().all(|v| v.is_empty())
    }

    pub fn line_items(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(|s| s.as_str())
    }
}

/// Scalar quote/metadata snapshot for one ticker. Everything the provider
/// may omit is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteInfo {
    pub symbol: String,
    #[serde(default)]
    pub long_name: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub shares_outstanding: Option<f64>,
    #[serde(default)]
    pub trailing_eps: Option<f64>,
    #[serde(default)]
    pub book_value_per_share: Option<f64>,
    #[serde(default)]
    pub trailing_pe: Option<f64>,
    #[serde(default)]
    pub price_to_book: Option<f64>,
    /// Provider-reported year-over-year revenue growth, as a fraction.
    #[serde(default)]
    pub revenue_growth: Option<f64>,
    /// Pre-computed ratios the provider may supply alongside the statements.
    #[serde(default)]
    pub return_on_equity: Option<f64>,
    #[serde(default)]
    pub debt_to_equity: Option<f64>,
    #[serde(default)]
    pub gross_margins: Option<f64>,
    #[serde(default)]
    pub free_cash_flow: Option<f64>,
    #[serde(default)]
    pub analyst_target_price: Option<f64>,
    #[serde(default)]
    pub recommendation_key: Option<String>,
}

/// Immutable statement snapshot for one ticker: the three statement tables
/// plus the quote snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialStatementSet {
    pub symbol: String,
    pub income_statement: StatementTable,
    pub balance_sheet: StatementTable,
    pub cash_flow_statement: StatementTable,
    pub quote: QuoteInfo,
}

impl FinancialStatementSet {
    /// A set with an empty income statement or empty balance sheet is
    /// invalid and short-circuits every downstream computation.
    pub fn validate(&self) -> Result<(), crate::AnalysisError> {
        if self.income_statement.is_empty() || self.balance_sheet.is_empty() {
            return Err(crate::AnalysisError::DataUnavailable(format!(
                "no usable income statement or balance sheet for {}",
                self.symbol
            )));
        }
        Ok(())
    }
}

/// Derived fundamental metrics for one ticker, recomputed on every request.
///
/// Every numeric field is either a finite value or `None` — a missing line
/// item degrades the specific metric, never the whole report. The one
/// retained numeric sentinel is the 99.0 debt-years cap for loss-makers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub symbol: String,
    /// Gross margin of the latest fiscal period, percent.
    pub current_gross_margin: Option<f64>,
    /// Arithmetic mean of per-period gross margins, percent.
    pub average_gross_margin: Option<f64>,
    /// Standard deviation of the margin series; stability signal.
    pub margin_volatility: Option<f64>,
    /// Per-period gross margins, ascending by period end.
    pub margin_series: Vec<PeriodValue>,
    /// Return on equity of the latest period, percent.
    pub current_roe: Option<f64>,
    pub average_roe: Option<f64>,
    /// Per-period ROE, ascending by period end.
    pub roe_series: Vec<PeriodValue>,
    /// Years of latest net income needed to clear long-term debt.
    /// Capped at 99.0 when net income is zero or negative.
    pub debt_years: Option<f64>,
    /// Latest-period free cash flow (reported row, or OCF + capex).
    pub free_cash_flow: Option<f64>,
    pub free_cash_flow_positive: bool,
    /// Latest stockholders' equity strictly above the oldest period's.
    pub book_value_trend_up: bool,
}

/// Intrinsic-value estimates. Absence of a field means its preconditions do
/// not hold for this company — an expected state, not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValuationReport {
    pub symbol: String,
    /// sqrt(22.5 * EPS * book value per share); requires both positive.
    pub graham_number: Option<f64>,
    pub dcf_fair_value: Option<f64>,
    /// Growth assumption the DCF actually projected with.
    pub dcf_growth_rate: Option<f64>,
    /// Human-readable reason when the DCF is unavailable.
    pub dcf_note: Option<String>,
    /// Analyst consensus target, passed through from the provider.
    pub analyst_target_price: Option<f64>,
}

/// Quality verdict band, fixed policy thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    HighQuality,
    Mixed,
    FailsCriteria,
}

impl Verdict {
    pub fn from_score(score: u8) -> Self {
        match score {
            s if s >= 80 => Verdict::HighQuality,
            s if s >= 50 => Verdict::Mixed,
            _ => Verdict::FailsCriteria,
        }
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            Verdict::HighQuality => "High quality",
            Verdict::Mixed => "Mixed",
            Verdict::FailsCriteria => "Fails criteria",
        }
    }
}

/// Four-pillar pass/fail scorecard with its weighted 0-100 score.
/// Constructed once per analysis request, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub moat_pass: bool,
    pub management_pass: bool,
    pub debt_pass: bool,
    pub cash_pass: bool,
    pub score: u8,
    pub verdict: Verdict,
}

/// One hit from the free-text company search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanySearchHit {
    pub symbol: String,
    pub display_name: String,
    #[serde(default)]
    pub exchange: Option<String>,
}

/// Complete per-ticker analysis bundle handed to presentation. Plain data,
/// no behavior attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyAnalysis {
    pub symbol: String,
    pub generated_at: DateTime<Utc>,
    pub quote: QuoteInfo,
    pub metrics: MetricsReport,
    pub valuation: ValuationReport,
    pub scorecard: ScoreCard,
}
