use analysis_core::{
    AnalysisError, CompanySearchHit, FinancialStatementSet, PeriodValue, QuoteInfo,
    StatementSource, StatementTable,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

const BASE_URL: &str = "https://query2.finance.yahoo.com";

// Yahoo throttles generic clients hard; present a browser user agent.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

const QUOTE_SUMMARY_MODULES: &str = "incomeStatementHistory,balanceSheetHistory,\
cashflowStatementHistory,defaultKeyStatistics,financialData,price,summaryProfile";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Provider statement keys mapped to the canonical line-item names the
/// normalizer's alias tables expect first.
const INCOME_ROWS: &[(&str, &str)] = &[
    ("totalRevenue", "Total Revenue"),
    ("grossProfit", "Gross Profit"),
    ("netIncome", "Net Income"),
];

const BALANCE_ROWS: &[(&str, &str)] = &[
    ("totalStockholderEquity", "Stockholders Equity"),
    ("longTermDebt", "Long Term Debt"),
    ("totalAssets", "Total Assets"),
    ("totalLiab", "Total Liabilities"),
    ("cash", "Cash And Cash Equivalents"),
];

const CASH_FLOW_ROWS: &[(&str, &str)] = &[
    ("totalCashFromOperatingActivities", "Operating Cash Flow"),
    ("capitalExpenditures", "Capital Expenditure"),
];

/// Statement and quote data from Yahoo Finance.
#[derive(Clone)]
pub struct YahooClient {
    client: reqwest::Client,
}

impl YahooClient {
    pub fn new() -> Self {
        let timeout_secs = std::env::var("QUALITYLENS_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client }
    }

    /// One `quoteSummary` round trip covering the three statement histories
    /// plus the scalar quote modules.
    pub async fn fetch_statements(
        &self,
        symbol: &str,
    ) -> Result<FinancialStatementSet, AnalysisError> {
        let url = format!("{}/v10/finance/quoteSummary/{}", BASE_URL, symbol);
        tracing::debug!("fetching statements for {}", symbol);

        let response = self
            .client
            .get(&url)
            .query(&[("modules", QUOTE_SUMMARY_MODULES)])
            .send()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        if response.status().as_u16() == 404 {
            return Err(AnalysisError::SymbolNotFound(symbol.to_string()));
        }
        if !response.status().is_success() {
            return Err(AnalysisError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        parse_quote_summary(symbol, &json)
    }

    /// Free-text company lookup. A blank query returns an empty list
    /// without a request; no match is an empty list, never an error.
    pub async fn search_company(
        &self,
        query: &str,
    ) -> Result<Vec<CompanySearchHit>, AnalysisError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/v1/finance/search", BASE_URL);
        let response = self
            .client
            .get(&url)
            .query(&[("q", query), ("quotesCount", "10"), ("newsCount", "0")])
            .send()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AnalysisError::ApiError(format!("HTTP {}", response.status())));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        Ok(parse_search(&json))
    }
}

impl Default for YahooClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatementSource for YahooClient {
    async fn fetch_statements(
        &self,
        symbol: &str,
    ) -> Result<FinancialStatementSet, AnalysisError> {
        YahooClient::fetch_statements(self, symbol).await
    }

    async fn search_company(
        &self,
        query: &str,
    ) -> Result<Vec<CompanySearchHit>, AnalysisError> {
        YahooClient::search_company(self, query).await
    }
}

/// Unwrap the provider's `{"raw": n, "fmt": "..."}` numeric envelope.
fn raw_f64(node: &Value, key: &str) -> Option<f64> {
    node.get(key)
        .and_then(|v| v.get("raw"))
        .and_then(|v| v.as_f64())
        .filter(|v| v.is_finite())
}

fn str_field(node: &Value, key: &str) -> Option<String> {
    node.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

fn period_end(entry: &Value) -> Option<NaiveDate> {
    let epoch = entry.get("endDate").and_then(|v| v.get("raw")).and_then(|v| v.as_i64())?;
    DateTime::from_timestamp(epoch, 0).map(|dt| dt.date_naive())
}

/// Annual statement entries for one module, e.g.
/// `incomeStatementHistory.incomeStatementHistory[]`.
fn statement_entries<'a>(result: &'a Value, module: &str, list: &str) -> Vec<&'a Value> {
    result
        .get(module)
        .and_then(|v| v.get(list))
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().collect())
        .unwrap_or_default()
}

fn parse_statement(entries: &[&Value], rows: &[(&str, &str)]) -> StatementTable {
    let mut collected: BTreeMap<&str, Vec<PeriodValue>> = BTreeMap::new();
    for entry in entries {
        let Some(period) = period_end(entry) else { continue };
        for &(key, name) in rows {
            if let Some(value) = raw_f64(entry, key) {
                collected.entry(name).or_default().push(PeriodValue::new(period, value));
            }
        }
    }

    let mut table = StatementTable::new();
    for (name, values) in collected {
        table.insert_row(name, values);
    }
    table
}

fn parse_quote(symbol: &str, result: &Value) -> QuoteInfo {
    let null = Value::Null;
    let stats = result.get("defaultKeyStatistics").unwrap_or(&null);
    let financial = result.get("financialData").unwrap_or(&null);
    let price = result.get("price").unwrap_or(&null);
    let profile = result.get("summaryProfile").unwrap_or(&null);

    QuoteInfo {
        symbol: symbol.to_string(),
        long_name: str_field(price, "longName"),
        sector: str_field(profile, "sector"),
        industry: str_field(profile, "industry"),
        currency: str_field(financial, "financialCurrency"),
        current_price: raw_f64(financial, "currentPrice"),
        market_cap: raw_f64(price, "marketCap"),
        shares_outstanding: raw_f64(stats, "sharesOutstanding"),
        trailing_eps: raw_f64(stats, "trailingEps"),
        book_value_per_share: raw_f64(stats, "bookValue"),
        trailing_pe: raw_f64(stats, "trailingPE"),
        price_to_book: raw_f64(stats, "priceToBook"),
        revenue_growth: raw_f64(financial, "revenueGrowth"),
        return_on_equity: raw_f64(financial, "returnOnEquity"),
        debt_to_equity: raw_f64(financial, "debtToEquity"),
        gross_margins: raw_f64(financial, "grossMargins"),
        free_cash_flow: raw_f64(financial, "freeCashflow"),
        analyst_target_price: raw_f64(financial, "targetMeanPrice"),
        recommendation_key: str_field(financial, "recommendationKey"),
    }
}

fn parse_quote_summary(symbol: &str, json: &Value) -> Result<FinancialStatementSet, AnalysisError> {
    let result = json
        .get("quoteSummary")
        .and_then(|v| v.get("result"))
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| AnalysisError::SymbolNotFound(symbol.to_string()))?;

    let set = FinancialStatementSet {
        symbol: symbol.to_string(),
        income_statement: parse_statement(
            &statement_entries(result, "incomeStatementHistory", "incomeStatementHistory"),
            INCOME_ROWS,
        ),
        balance_sheet: parse_statement(
            &statement_entries(result, "balanceSheetHistory", "balanceSheetStatements"),
            BALANCE_ROWS,
        ),
        cash_flow_statement: parse_statement(
            &statement_entries(result, "cashflowStatementHistory", "cashflowStatements"),
            CASH_FLOW_ROWS,
        ),
        quote: parse_quote(symbol, result),
    };

    set.validate()?;
    Ok(set)
}

fn parse_search(json: &Value) -> Vec<CompanySearchHit> {
    json.get("quotes")
        .and_then(|v| v.as_array())
        .map(|quotes| {
            quotes
                .iter()
                .filter_map(|q| {
                    let symbol = str_field(q, "symbol")?;
                    let display_name = str_field(q, "longname")
                        .or_else(|| str_field(q, "shortname"))
                        .unwrap_or_else(|| symbol.clone());
                    Some(CompanySearchHit {
                        symbol,
                        display_name,
                        exchange: str_field(q, "exchDisp").or_else(|| str_field(q, "exchange")),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}
