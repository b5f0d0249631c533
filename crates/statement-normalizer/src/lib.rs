use analysis_core::{PeriodValue, StatementTable};
use chrono::NaiveDate;

/// Ordered candidate line-item names for one logical field.
///
/// Data providers rename line items across schema versions; callers resolve
/// through the first name that exists in the table instead of hard-coding
/// one spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldAliases {
    /// Stable logical identifier, used in logs and notes.
    pub field: &'static str,
    pub names: &'static [&'static str],
}

pub const TOTAL_REVENUE: FieldAliases = FieldAliases {
    field: "total_revenue",
    names: &["Total Revenue", "totalRevenue", "Operating Revenue"],
};

pub const GROSS_PROFIT: FieldAliases = FieldAliases {
    field: "gross_profit",
    names: &["Gross Profit", "grossProfit"],
};

pub const NET_INCOME: FieldAliases = FieldAliases {
    field: "net_income",
    names: &["Net Income", "netIncome", "Net Income Common Stockholders"],
};

pub const STOCKHOLDERS_EQUITY: FieldAliases = FieldAliases {
    field: "stockholders_equity",
    names: &[
        "Stockholders Equity",
        "Total Stockholder Equity",
        "totalStockholderEquity",
        "Common Stock Equity",
    ],
};

pub const LONG_TERM_DEBT: FieldAliases = FieldAliases {
    field: "long_term_debt",
    names: &[
        "Long Term Debt",
        "longTermDebt",
        "Long Term Debt And Capital Lease Obligation",
        "Total Debt",
    ],
};

pub const OPERATING_CASH_FLOW: FieldAliases = FieldAliases {
    field: "operating_cash_flow",
    names: &[
        "Operating Cash Flow",
        "Total Cash From Operating Activities",
        "totalCashFromOperatingActivities",
        "Cash Flow From Continuing Operating Activities",
    ],
};

pub const CAPITAL_EXPENDITURE: FieldAliases = FieldAliases {
    field: "capital_expenditure",
    names: &["Capital Expenditure", "Capital Expenditures", "capitalExpenditures"],
};

pub const FREE_CASH_FLOW: FieldAliases = FieldAliases {
    field: "free_cash_flow",
    names: &["Free Cash Flow", "freeCashFlow"],
};

/// Resolve the first alias that has a row in `table`.
fn resolve<'a>(table: &'a StatementTable, aliases: &FieldAliases) -> Option<&'a [PeriodValue]> {
    aliases
        .names
        .iter()
        .find_map(|name| table.row(name))
        .filter(|row| !row.is_empty())
}

/// Value of a logical field at `period_index` (0 = most recent period).
///
/// Returns `None` when no alias resolves, the row is shorter than the index,
/// or the stored value is not finite. No failure mode escapes as a panic or
/// error; callers supply their own default.
pub fn field(table: &StatementTable, aliases: &FieldAliases, period_index: usize) -> Option<f64> {
    resolve(table, aliases)
        .and_then(|row| row.get(period_index))
        .map(|pv| pv.value)
        .filter(|v| v.is_finite())
}

/// Most-recent-period value of a logical field.
pub fn latest(table: &StatementTable, aliases: &FieldAliases) -> Option<f64> {
    field(table, aliases, 0)
}

/// Like [`latest`] but degrading to `default` instead of `None`.
pub fn latest_or(table: &StatementTable, aliases: &FieldAliases, default: f64) -> f64 {
    latest(table, aliases).unwrap_or(default)
}

/// All finite observations of a logical field, most recent first.
pub fn series(table: &StatementTable, aliases: &FieldAliases) -> Vec<PeriodValue> {
    resolve(table, aliases)
        .map(|row| row.iter().copied().filter(|pv| pv.value.is_finite()).collect())
        .unwrap_or_default()
}

/// Two logical fields joined on period-end date, most recent first.
///
/// Periods where either side is missing are dropped, so ratio computations
/// exclude them instead of treating the absent operand as zero. The two
/// fields may come from different statements (e.g. net income against
/// stockholders' equity).
pub fn paired_series(
    left_table: &StatementTable,
    left: &FieldAliases,
    right_table: &StatementTable,
    right: &FieldAliases,
) -> Vec<(NaiveDate, f64, f64)> {
    let rhs = series(right_table, right);
    series(left_table, left)
        .iter()
        .filter_map(|l| {
            rhs.iter()
                .find(|r| r.period_end == l.period_end)
                .map(|r| (l.period_end, l.value, r.value))
        })
        .collect()
}
