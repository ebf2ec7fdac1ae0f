//! # Cash-flow Forecast
//!
//! A library for forecasting small-business cash flow from raw bookkeeping
//! transactions, and for checking how far those forecasts can be trusted.
//!
//! ## Core Concepts
//!
//! - **Classification**: a transaction's role (revenue or expense) follows from
//!   its sign *and* its category. Positive amounts are revenue only in the
//!   `other` category.
//! - **Daily series**: classified amounts summed per calendar date. Days
//!   without activity are absent rather than zero.
//! - **Seasonal model**: a piecewise-linear trend with weekly and monthly
//!   cycles that scale with the trend level, fitted deterministically.
//! - **Validation**: backtests and rolling-origin cross-validation score the
//!   model on held-out history; business checks score the books themselves.
//!
//! ## Example
//!
//! ```rust,ignore
//! use cashflow_forecast::*;
//! use chrono::NaiveDate;
//!
//! let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
//! let transactions: Vec<Transaction> = (1..=28)
//!     .flat_map(|d| {
//!         vec![
//!             Transaction::new(day(d), 520.0, Category::Other),
//!             Transaction::new(day(d), -140.0, Category::Ingredients),
//!         ]
//!     })
//!     .collect();
//!
//! let prepared = prepare_series(&transactions);
//! let engine = ForecastEngine::default();
//! let result = engine.forecast(&prepared.total_revenue, 7)?;
//! let summary = summarize(&result)?;
//! println!("next week: {}", format_money(summary.total_over_horizon));
//!
//! let report = Validator::default().generate_report(&transactions)?;
//! println!("{}", report.to_presentation_json()?);
//! ```

pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod math;
pub mod schema;
pub mod seasonality;
pub mod service;
pub mod store;
pub mod summary;
pub mod utils;
pub mod validation;

pub use aggregator::{
    category_breakdown, net_cash_flow, prepare_series, slice_series, DailySeries, PreparedSeries,
};
pub use classifier::{classify, classify_all, classify_role, ClassifiedEntry, Role};
pub use config::{
    CrossValidationConfig, ForecastConfig, ModelConfig, SeasonalityMode, StoreConfig,
    ValidationConfig,
};
pub use engine::{
    FittedModel, FittedSeasonalModel, ForecastEngine, ForecastModel, ForecastPoint,
    ForecastResult, SeasonalRegression,
};
pub use error::{ForecastError, Result};
pub use schema::*;
pub use seasonality::SeasonalComponent;
pub use service::{
    ComprehensiveForecast, CurrentMetrics, ForecastDataPoint, ForecastResponse, ForecastService,
};
pub use store::{InMemoryStore, TransactionStore};
#[cfg(feature = "supabase")]
pub use store::SupabaseStore;
pub use summary::{
    generate_business_insights, metric_insights, ratio_pct, recommendations, summarize,
    summarize_points, ForecastSummary, Ratio, TrendDirection,
};
pub use utils::{format_money, round_money, round_pct};
pub use validation::{
    accuracy_tier, AccuracyTier, BacktestReport, BusinessMetrics, ConfidenceChecks,
    ConfidenceLevel, CrossValidationReport, DataQualityReport, ValidationReport, Validator,
};
