use crate::error::{ForecastError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[schemars(description = "Food and drink inputs (coffee beans, milk, flour)")]
    Ingredients,

    #[schemars(description = "Electricity, water, gas, internet and similar bills")]
    Utilities,

    #[schemars(description = "Consumables such as cups, napkins and cleaning supplies")]
    Supplies,

    #[schemars(description = "Equipment purchases, repairs and maintenance")]
    Equipment,

    #[schemars(
        description = "Everything else. Positive amounts in this category are sales revenue; rent, wages and fees are also recorded here."
    )]
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Ingredients,
        Category::Utilities,
        Category::Supplies,
        Category::Equipment,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Ingredients => "ingredients",
            Category::Utilities => "utilities",
            Category::Supplies => "supplies",
            Category::Equipment => "equipment",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| ForecastError::MalformedRecord(format!("Unknown category '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    Check,
}

/// A single bookkeeping entry as stored. The sign of `amount` alone does not
/// say whether this is revenue or an expense; see [`crate::classifier`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Transaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Store-assigned identifier. Absent on records not yet inserted.")]
    pub id: Option<i64>,

    #[schemars(description = "Calendar date of the transaction in YYYY-MM-DD format")]
    pub date: NaiveDate,

    #[schemars(
        description = "Signed amount. Negative amounts are always expenses. Positive amounts are revenue only in the 'other' category."
    )]
    pub amount: f64,

    #[serde(default)]
    pub description: Option<String>,

    pub category: Category,

    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Transaction {
    pub fn new(date: NaiveDate, amount: f64, category: Category) -> Self {
        Self {
            id: None,
            date,
            amount,
            description: None,
            category,
            payment_method: None,
            created_at: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(method);
        self
    }

    /// Number of optional columns left empty on this record.
    pub fn missing_fields(&self) -> usize {
        usize::from(self.description.is_none()) + usize::from(self.payment_method.is_none())
    }
}

/// Raw row as returned by the record store. Every column may be null.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionRow {
    pub id: Option<i64>,
    pub date: Option<NaiveDate>,
    pub amount: Option<f64>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub created_at: Option<DateTime<Utc>>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = ForecastError;

    fn try_from(row: TransactionRow) -> Result<Self> {
        let label = row
            .id
            .map(|id| format!("record {}", id))
            .unwrap_or_else(|| "unsaved record".to_string());

        let date = row
            .date
            .ok_or_else(|| ForecastError::MalformedRecord(format!("{} has no date", label)))?;
        let amount = row
            .amount
            .ok_or_else(|| ForecastError::MalformedRecord(format!("{} has no amount", label)))?;
        if !amount.is_finite() {
            return Err(ForecastError::MalformedRecord(format!(
                "{} has non-finite amount {}",
                label, amount
            )));
        }
        let category = row
            .category
            .as_deref()
            .ok_or_else(|| ForecastError::MalformedRecord(format!("{} has no category", label)))?
            .parse::<Category>()?;

        Ok(Transaction {
            id: row.id,
            date,
            amount,
            description: row.description,
            category,
            payment_method: row.payment_method,
            created_at: row.created_at,
        })
    }
}

/// Converts fetched rows, failing on the first malformed one.
pub fn transactions_from_rows(rows: Vec<TransactionRow>) -> Result<Vec<Transaction>> {
    rows.into_iter().map(Transaction::try_from).collect()
}

/// The metric a forecast is requested for.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum SeriesSelector {
    #[schemars(description = "Daily total revenue")]
    Revenue,
    #[schemars(description = "Daily total expenses")]
    Expenses,
    #[schemars(description = "Revenue forecast minus expense forecast")]
    Profit,
    #[schemars(description = "Daily net cash flow (revenue minus expenses)")]
    CashFlow,
}

impl SeriesSelector {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesSelector::Revenue => "revenue",
            SeriesSelector::Expenses => "expenses",
            SeriesSelector::Profit => "profit",
            SeriesSelector::CashFlow => "cash_flow",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            SeriesSelector::Revenue => "Revenue",
            SeriesSelector::Expenses => "Expenses",
            SeriesSelector::Profit => "Profit",
            SeriesSelector::CashFlow => "Cash flow",
        }
    }
}

impl fmt::Display for SeriesSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convenience forecast horizons offered to API clients.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ForecastPeriod {
    Week,
    Month,
    Quarter,
}

impl ForecastPeriod {
    pub fn days(&self) -> u32 {
        match self {
            ForecastPeriod::Week => 7,
            ForecastPeriod::Month => 30,
            ForecastPeriod::Quarter => 90,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ForecastRequest {
    #[schemars(description = "Which series to forecast")]
    pub metric: SeriesSelector,

    #[schemars(description = "Number of days to forecast beyond the last recorded date. Must be positive.")]
    pub horizon_days: u32,
}

impl ForecastRequest {
    pub fn new(metric: SeriesSelector, period: ForecastPeriod) -> Self {
        Self {
            metric,
            horizon_days: period.days(),
        }
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ForecastRequest)
    }
}
