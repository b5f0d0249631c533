use async_trait::async_trait;
use crate::{AnalysisError, CompanySearchHit, FinancialStatementSet};

/// Trait for statement/quote data providers.
///
/// Implementations must distinguish an unknown or delisted ticker
/// (`SymbolNotFound`) from a transient fetch failure (`ApiError`).
#[async_trait]
pub trait StatementSource: Send + Sync {
    async fn fetch_statements(
        &self,
        symbol: &str,
    ) -> Result<FinancialStatementSet, AnalysisError>;

    /// Free-text company lookup. Empty list on no match; an empty or
    /// garbage query must not produce an error.
    async fn search_company(
        &self,
        query: &str,
    ) -> Result<Vec<CompanySearchHit>, AnalysisError>;
}
