use analysis_core::{
    AnalysisError, CompanyAnalysis, CompanySearchHit, FinancialStatementSet, StatementSource,
};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use fundamentals_engine::FundamentalsEngine;
use valuation_engine::ValuationEngine;
use yahoo_client::YahooClient;

/// Internal cache entry with timestamp
struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

const CACHE_TTL_SECS: i64 = 3600; // 1 hour

/// Composes the data source and the engines into one analysis request.
///
/// The orchestrator owns the per-ticker fetch memoization; the engines stay
/// stateless and recompute on every request, so concurrent callers never
/// share mutable state.
pub struct AnalysisOrchestrator<S: StatementSource> {
    source: S,
    fundamentals: FundamentalsEngine,
    valuation: ValuationEngine,
    /// Cache fetched statement sets per symbol (1-hour TTL)
    statements_cache: DashMap<String, CacheEntry<FinancialStatementSet>>,
}

impl AnalysisOrchestrator<YahooClient> {
    /// Orchestrator wired to the default Yahoo Finance source.
    pub fn yahoo() -> Self {
        Self::new(YahooClient::new())
    }
}

impl<S: StatementSource> AnalysisOrchestrator<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            fundamentals: FundamentalsEngine::new(),
            valuation: ValuationEngine::new(),
            statements_cache: DashMap::new(),
        }
    }

    /// Fetch statements with TTL memoization so repeated requests within
    /// the window never hit the remote provider.
    async fn get_statements(&self, symbol: &str) -> Result<FinancialStatementSet, AnalysisError> {
        if let Some(entry) = self.statements_cache.get(symbol) {
            if Utc::now() - entry.cached_at < Duration::seconds(CACHE_TTL_SECS) {
                tracing::debug!("statements cache hit for {}", symbol);
                return Ok(entry.data.clone());
            }
        }

        let data = self.source.fetch_statements(symbol).await?;
        self.statements_cache.insert(
            symbol.to_string(),
            CacheEntry {
                data: data.clone(),
                cached_at: Utc::now(),
            },
        );
        Ok(data)
    }

    /// Run one full analysis: fetch → metrics → valuation → scorecard.
    pub async fn analyze(&self, symbol: &str) -> Result<CompanyAnalysis, AnalysisError> {
        tracing::info!("starting analysis for {}", symbol);

        let statements = self.get_statements(symbol).await?;
        let metrics = self.fundamentals.compute_metrics(&statements)?;
        let valuation = self.valuation.build_report(&statements)?;
        let scorecard = self.valuation.build_scorecard(&metrics);

        tracing::info!(
            "{}: score {} ({})",
            symbol,
            scorecard.score,
            scorecard.verdict.to_label()
        );

        Ok(CompanyAnalysis {
            symbol: statements.symbol.clone(),
            generated_at: Utc::now(),
            quote: statements.quote,
            metrics,
            valuation,
            scorecard,
        })
    }

    pub async fn search(&self, query: &str) -> Result<Vec<CompanySearchHit>, AnalysisError> {
        self.source.search_company(query).await
    }
}
