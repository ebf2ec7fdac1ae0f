use crate::aggregator::{category_breakdown, prepare_series, DailySeries, PreparedSeries};
use crate::classifier::{classify_all, Role};
use crate::config::ForecastConfig;
use crate::engine::{ForecastEngine, ForecastModel, ForecastPoint, SeasonalRegression};
use crate::error::{ForecastError, Result};
use crate::schema::{Category, ForecastRequest, SeriesSelector, Transaction};
use crate::store::TransactionStore;
use crate::summary::{
    generate_business_insights, metric_insights, recommendations, summarize_points,
    ForecastSummary, Ratio,
};
use crate::utils::{round_money, round_pct, shift_days, window_start};
use chrono::{DateTime, NaiveDate, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastDataPoint {
    pub date: NaiveDate,
    pub predicted_value: f64,
    pub trend: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub metric: SeriesSelector,
    pub period_days: u32,
    pub forecast_data: Vec<ForecastDataPoint>,
    pub summary: ForecastSummary,
    pub business_insights: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComprehensiveForecast {
    pub horizon_days: u32,
    pub summaries: BTreeMap<SeriesSelector, ForecastSummary>,
    /// Metrics that could not be forecast, with the reason.
    pub unavailable: BTreeMap<SeriesSelector, String>,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub category_breakdown: BTreeMap<Category, f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentMetrics {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub revenue: f64,
    pub expenses: f64,
    pub profit: f64,
    pub profit_margin_pct: Ratio,
    pub daily_avg_revenue: f64,
    pub daily_avg_expenses: f64,
    pub transaction_count: usize,
    pub category_breakdown: BTreeMap<Category, f64>,
    pub last_updated: DateTime<Utc>,
}

fn series_label(metric: SeriesSelector) -> &'static str {
    match metric {
        SeriesSelector::Revenue => "total_revenue",
        SeriesSelector::Expenses => "total_expenses",
        SeriesSelector::CashFlow => "net_cash_flow",
        SeriesSelector::Profit => "profit",
    }
}

/// Revenue minus expenses on each date both forecasts cover. Bounds take the
/// pessimistic pairing of the two intervals.
pub fn combine_profit(revenue: &[ForecastPoint], expenses: &[ForecastPoint]) -> Vec<ForecastPoint> {
    let by_date: BTreeMap<NaiveDate, &ForecastPoint> =
        expenses.iter().map(|p| (p.date, p)).collect();
    revenue
        .iter()
        .filter_map(|rev| {
            by_date.get(&rev.date).map(|exp| ForecastPoint {
                date: rev.date,
                yhat: rev.yhat - exp.yhat,
                yhat_lower: rev.yhat_lower - exp.yhat_upper,
                yhat_upper: rev.yhat_upper - exp.yhat_lower,
                trend: rev.trend - exp.trend,
            })
        })
        .collect()
}

/// Runs the forecast pipeline over whatever the store holds.
pub struct ForecastService<S, M = SeasonalRegression> {
    store: S,
    engine: ForecastEngine<M>,
    metrics_window_days: i64,
}

impl<S: TransactionStore> ForecastService<S> {
    pub fn new(store: S, config: ForecastConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            engine: ForecastEngine::new(config.model)?,
            metrics_window_days: config.validation.business_window_days,
        })
    }
}

impl<S: TransactionStore, M: ForecastModel> ForecastService<S, M> {
    pub fn with_engine(store: S, engine: ForecastEngine<M>, metrics_window_days: i64) -> Self {
        Self {
            store,
            engine,
            metrics_window_days,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn load(&self) -> Result<Vec<Transaction>> {
        let transactions = self.store.fetch_all().await?;
        if transactions.is_empty() {
            return Err(ForecastError::NoData);
        }
        Ok(transactions)
    }

    /// The trailing `horizon_days` forecast points for one metric.
    pub fn forecast_points(
        &self,
        prepared: &PreparedSeries,
        metric: SeriesSelector,
        horizon_days: u32,
    ) -> Result<Vec<ForecastPoint>> {
        match prepared.select(metric) {
            Some(series) => {
                let result =
                    self.engine
                        .forecast_labeled(series_label(metric), series, horizon_days)?;
                Ok(result.future().to_vec())
            }
            None => self.profit_points(prepared, horizon_days),
        }
    }

    /// Revenue and expense series may end on different days; both are
    /// forecast through the later end so the horizons line up.
    fn profit_points(
        &self,
        prepared: &PreparedSeries,
        horizon_days: u32,
    ) -> Result<Vec<ForecastPoint>> {
        let revenue = &prepared.total_revenue;
        let expenses = &prepared.total_expenses;
        let (Some(&rev_last), Some(&exp_last)) =
            (revenue.keys().next_back(), expenses.keys().next_back())
        else {
            let empty = if revenue.is_empty() {
                SeriesSelector::Revenue
            } else {
                SeriesSelector::Expenses
            };
            return Err(ForecastError::InsufficientData {
                series: series_label(empty).to_string(),
                required: self.engine.min_points(),
                found: 0,
            });
        };
        let last = rev_last.max(exp_last);
        let end = shift_days(last, i64::from(horizon_days)).ok_or_else(|| {
            ForecastError::InvalidInput(format!(
                "{} days past {} is outside the supported calendar",
                horizon_days, last
            ))
        })?;

        let extended = |series: &DailySeries, metric: SeriesSelector| -> Result<Vec<ForecastPoint>> {
            let own_last = series.keys().next_back().copied().unwrap_or(last);
            let horizon = u32::try_from((last - own_last).num_days())
                .ok()
                .and_then(|lag| horizon_days.checked_add(lag))
                .ok_or_else(|| {
                    ForecastError::InvalidInput(format!(
                        "{} horizon of {} days cannot be extended to {}",
                        metric, horizon_days, last
                    ))
                })?;
            let result = self
                .engine
                .forecast_labeled(series_label(metric), series, horizon)?;
            Ok(result
                .predictions
                .into_iter()
                .filter(|p| p.date > last && p.date <= end)
                .collect())
        };

        let rev = extended(revenue, SeriesSelector::Revenue)?;
        let exp = extended(expenses, SeriesSelector::Expenses)?;
        Ok(combine_profit(&rev, &exp))
    }

    pub async fn forecast(&self, request: &ForecastRequest) -> Result<ForecastResponse> {
        let transactions = self.load().await?;
        info!(
            "Forecasting {} for {} days from {} records",
            request.metric,
            request.horizon_days,
            transactions.len()
        );
        let prepared = prepare_series(&transactions);
        let points = self.forecast_points(&prepared, request.metric, request.horizon_days)?;
        let summary = summarize_points(&points)?;

        let forecast_data = points
            .iter()
            .map(|p| ForecastDataPoint {
                date: p.date,
                predicted_value: round_money(p.yhat),
                trend: round_money(p.trend),
            })
            .collect();

        Ok(ForecastResponse {
            metric: request.metric,
            period_days: request.horizon_days,
            forecast_data,
            business_insights: metric_insights(request.metric, &summary, request.horizon_days),
            summary: summary.rounded(),
            generated_at: Utc::now(),
        })
    }

    /// Expenses, revenue and cash flow together. A metric without enough
    /// history is reported as unavailable instead of failing the rest.
    pub async fn comprehensive_forecast(&self, horizon_days: u32) -> Result<ComprehensiveForecast> {
        let transactions = self.load().await?;
        let prepared = prepare_series(&transactions);

        let mut summaries = BTreeMap::new();
        let mut unavailable = BTreeMap::new();
        for metric in [
            SeriesSelector::Expenses,
            SeriesSelector::Revenue,
            SeriesSelector::CashFlow,
        ] {
            match self
                .forecast_points(&prepared, metric, horizon_days)
                .and_then(|points| summarize_points(&points))
            {
                Ok(summary) => {
                    summaries.insert(metric, summary);
                }
                Err(e @ ForecastError::InsufficientData { .. }) => {
                    warn!("Skipping {} forecast: {}", metric, e);
                    unavailable.insert(metric, e.to_string());
                }
                Err(e) => return Err(e),
            }
        }

        Ok(ComprehensiveForecast {
            horizon_days,
            insights: generate_business_insights(&summaries, horizon_days),
            recommendations: recommendations(&summaries),
            summaries,
            unavailable,
            category_breakdown: category_breakdown(&transactions),
        })
    }

    /// Totals over the trailing window using the same revenue/expense rules
    /// as the forecasts.
    pub async fn current_metrics(&self) -> Result<CurrentMetrics> {
        let transactions = self.load().await?;
        let last = transactions
            .iter()
            .map(|t| t.date)
            .max()
            .ok_or(ForecastError::NoData)?;
        let start = window_start(last, self.metrics_window_days);
        let recent: Vec<Transaction> = transactions
            .into_iter()
            .filter(|t| t.date >= start)
            .collect();

        let (revenue, expenses) =
            classify_all(&recent)
                .iter()
                .fold((0.0, 0.0), |(rev, exp), entry| match entry.role {
                    Role::Revenue => (rev + entry.magnitude, exp),
                    Role::Expense => (rev, exp + entry.magnitude),
                });
        let days = self.metrics_window_days as f64;

        Ok(CurrentMetrics {
            window_start: start,
            window_end: last,
            revenue: round_money(revenue),
            expenses: round_money(expenses),
            profit: round_money(revenue - expenses),
            profit_margin_pct: Ratio::percent(revenue - expenses, revenue).map(round_pct),
            daily_avg_revenue: round_money(revenue / days),
            daily_avg_expenses: round_money(expenses / days),
            transaction_count: recent.len(),
            category_breakdown: category_breakdown(&recent)
                .into_iter()
                .map(|(c, v)| (c, round_money(v)))
                .collect(),
            last_updated: Utc::now(),
        })
    }
}
