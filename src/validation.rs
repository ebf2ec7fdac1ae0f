//! Forecast validation: data quality, backtesting, rolling-origin
//! cross-validation and business sanity checks.
//!
//! The validator reads transactions through a signed-amount view: every
//! positive amount is an inflow and every negative amount an outflow,
//! regardless of category. This deliberately differs from the classifier
//! used by the forecast path.

use crate::aggregator::{slice_series, DailySeries};
use crate::config::{CrossValidationConfig, ForecastConfig, ValidationConfig};
use crate::engine::{ForecastEngine, ForecastModel, ForecastPoint, SeasonalRegression};
use crate::error::{ForecastError, Result};
use crate::math::mean;
use crate::schema::{Category, Transaction};
use crate::summary::Ratio;
use crate::utils::{round_money, round_pct, shift_days, window_start};
use chrono::{Datelike, NaiveDate, Weekday};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

pub const INDUSTRY_MARGIN_RANGE: (f64, f64) = (3.0, 15.0);
pub const EXPENSE_CONTROL_LIMIT_PCT: f64 = 65.0;
pub const SANITY_EXPENSE_RATIO_LIMIT_PCT: f64 = 80.0;
pub const CONFIDENCE_EXPENSE_RATIO_LIMIT_PCT: f64 = 70.0;
pub const CONFIDENCE_MIN_DAILY_REVENUE: f64 = 300.0;
pub const RELIABLE_MAPE_PCT: f64 = 20.0;
pub const STRONG_MARGIN_PCT: f64 = 10.0;
pub const SUFFICIENT_RECORDS: usize = 60;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Daily sum of positive amounts.
pub fn daily_inflow(transactions: &[Transaction]) -> DailySeries {
    let mut series = DailySeries::new();
    for tx in transactions.iter().filter(|t| t.amount > 0.0) {
        *series.entry(tx.date).or_insert(0.0) += tx.amount;
    }
    series
}

fn date_range(transactions: &[Transaction]) -> Option<DateRange> {
    let start = transactions.iter().map(|t| t.date).min()?;
    let end = transactions.iter().map(|t| t.date).max()?;
    Some(DateRange { start, end })
}

// --- Data quality ---------------------------------------------------------

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryShare {
    pub count: usize,
    pub share_pct: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DataQualityReport {
    pub record_count: usize,
    pub date_range: Option<DateRange>,
    pub missing_value_count: usize,
    pub revenue_outliers: usize,
    pub expense_outliers: usize,
    pub avg_transactions_per_day: f64,
    pub category_distribution: BTreeMap<Category, CategoryShare>,
}

impl DataQualityReport {
    pub fn verdict(&self) -> &'static str {
        if self.missing_value_count == 0 {
            "GOOD"
        } else {
            "FAIR"
        }
    }

    fn rounded(&self) -> Self {
        let mut out = self.clone();
        out.avg_transactions_per_day = round_pct(out.avg_transactions_per_day);
        for share in out.category_distribution.values_mut() {
            share.share_pct = round_pct(share.share_pct);
        }
        out
    }
}

/// Counts values above `multiplier` times the mean magnitude of their group.
fn count_outliers(magnitudes: &[f64], multiplier: f64) -> usize {
    match mean(magnitudes) {
        Some(avg) => magnitudes.iter().filter(|m| **m > avg * multiplier).count(),
        None => 0,
    }
}

pub fn validate_data_quality(
    transactions: &[Transaction],
    outlier_multiplier: f64,
) -> DataQualityReport {
    let inflows: Vec<f64> = transactions
        .iter()
        .filter(|t| t.amount > 0.0)
        .map(|t| t.amount)
        .collect();
    let outflows: Vec<f64> = transactions
        .iter()
        .filter(|t| t.amount < 0.0)
        .map(|t| t.amount.abs())
        .collect();

    let active_days: BTreeSet<NaiveDate> = transactions.iter().map(|t| t.date).collect();
    let avg_transactions_per_day = if active_days.is_empty() {
        0.0
    } else {
        transactions.len() as f64 / active_days.len() as f64
    };

    let mut counts: BTreeMap<Category, usize> = BTreeMap::new();
    for tx in transactions {
        *counts.entry(tx.category).or_insert(0) += 1;
    }
    let category_distribution = counts
        .into_iter()
        .map(|(category, count)| {
            let share_pct = count as f64 / transactions.len() as f64 * 100.0;
            (category, CategoryShare { count, share_pct })
        })
        .collect();

    DataQualityReport {
        record_count: transactions.len(),
        date_range: date_range(transactions),
        missing_value_count: transactions.iter().map(|t| t.missing_fields()).sum(),
        revenue_outliers: count_outliers(&inflows, outlier_multiplier),
        expense_outliers: count_outliers(&outflows, outlier_multiplier),
        avg_transactions_per_day,
        category_distribution,
    }
}

// --- Accuracy -------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccuracyTier {
    Excellent,
    Good,
    Fair,
    Poor,
}

pub fn accuracy_tier(mape_pct: f64) -> AccuracyTier {
    if mape_pct < 10.0 {
        AccuracyTier::Excellent
    } else if mape_pct < 20.0 {
        AccuracyTier::Good
    } else if mape_pct < 30.0 {
        AccuracyTier::Fair
    } else {
        AccuracyTier::Poor
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Comparison {
    pub date: NaiveDate,
    pub actual: f64,
    pub predicted: f64,
    pub lower: f64,
    pub upper: f64,
}

impl Comparison {
    fn covered(&self) -> bool {
        self.actual >= self.lower && self.actual <= self.upper
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct AccuracyMetrics {
    pub mae: f64,
    /// Zero actuals are left out. Undefined when every actual is zero.
    pub mape: Ratio,
    pub rmse: f64,
    pub ci_coverage_pct: f64,
}

impl AccuracyMetrics {
    fn rounded(&self) -> Self {
        Self {
            mae: round_money(self.mae),
            mape: self.mape.map(round_pct),
            rmse: round_money(self.rmse),
            ci_coverage_pct: round_pct(self.ci_coverage_pct),
        }
    }
}

pub fn accuracy_metrics(comparison: &[Comparison]) -> Result<AccuracyMetrics> {
    if comparison.is_empty() {
        return Err(ForecastError::InvalidInput(
            "no overlapping dates between forecast and actuals".to_string(),
        ));
    }
    let n = comparison.len() as f64;
    let mae = comparison
        .iter()
        .map(|c| (c.actual - c.predicted).abs())
        .sum::<f64>()
        / n;
    let rmse = (comparison
        .iter()
        .map(|c| (c.actual - c.predicted).powi(2))
        .sum::<f64>()
        / n)
        .sqrt();

    let pct_errors: Vec<f64> = comparison
        .iter()
        .filter(|c| c.actual != 0.0)
        .map(|c| ((c.actual - c.predicted) / c.actual).abs() * 100.0)
        .collect();
    let mape = mean(&pct_errors).map_or(Ratio::Undefined, Ratio::Defined);

    let covered = comparison.iter().filter(|c| c.covered()).count();

    Ok(AccuracyMetrics {
        mae,
        mape,
        rmse,
        ci_coverage_pct: covered as f64 / n * 100.0,
    })
}

/// Pairs actuals with predictions on the same date. Dates present on only
/// one side are dropped.
fn join_on_date(actual: &DailySeries, predictions: &[ForecastPoint]) -> (Vec<Comparison>, usize) {
    let by_date: BTreeMap<NaiveDate, &ForecastPoint> =
        predictions.iter().map(|p| (p.date, p)).collect();
    let comparison: Vec<Comparison> = actual
        .iter()
        .filter_map(|(date, value)| {
            by_date.get(date).map(|p| Comparison {
                date: *date,
                actual: *value,
                predicted: p.yhat,
                lower: p.yhat_lower,
                upper: p.yhat_upper,
            })
        })
        .collect();
    let dropped = actual.len() + predictions.len() - 2 * comparison.len();
    (comparison, dropped)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BacktestReport {
    pub training: DateRange,
    pub testing: DateRange,
    #[serde(flatten)]
    pub metrics: AccuracyMetrics,
    /// Numeric MAPE behind `accuracy_tier`.
    pub mape_pct: f64,
    pub accuracy_tier: AccuracyTier,
    pub comparison: Vec<Comparison>,
}

impl BacktestReport {
    fn rounded(&self) -> Self {
        let mut out = self.clone();
        out.metrics = self.metrics.rounded();
        out.mape_pct = round_pct(self.mape_pct);
        for row in &mut out.comparison {
            row.actual = round_money(row.actual);
            row.predicted = round_money(row.predicted);
            row.lower = round_money(row.lower);
            row.upper = round_money(row.upper);
        }
        out
    }
}

// --- Cross-validation -----------------------------------------------------

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CrossValidationFold {
    pub cutoff: NaiveDate,
    pub train_points: usize,
    pub test_points: usize,
    #[serde(flatten)]
    pub metrics: AccuracyMetrics,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CrossValidationReport {
    pub folds: Vec<CrossValidationFold>,
    pub averages: AccuracyMetrics,
}

impl CrossValidationReport {
    fn rounded(&self) -> Self {
        Self {
            folds: self
                .folds
                .iter()
                .map(|f| CrossValidationFold {
                    metrics: f.metrics.rounded(),
                    ..f.clone()
                })
                .collect(),
            averages: self.averages.rounded(),
        }
    }
}

/// Cutoffs step back from `max - horizon` by `period` while at least
/// `initial` days of history remain before them. Returned oldest first.
pub fn cross_validation_cutoffs(
    first: NaiveDate,
    last: NaiveDate,
    config: &CrossValidationConfig,
) -> Vec<NaiveDate> {
    let mut cutoffs = Vec::new();
    if config.period_days <= 0 {
        return cutoffs;
    }
    let (Some(earliest), Some(mut cutoff)) = (
        shift_days(first, config.initial_days),
        config
            .horizon_days
            .checked_neg()
            .and_then(|back| shift_days(last, back)),
    ) else {
        return cutoffs;
    };
    while cutoff >= earliest {
        cutoffs.push(cutoff);
        match shift_days(cutoff, -config.period_days) {
            Some(previous) => cutoff = previous,
            None => break,
        }
    }
    cutoffs.reverse();
    cutoffs
}

fn average_metrics(folds: &[CrossValidationFold]) -> AccuracyMetrics {
    let pick = |f: fn(&AccuracyMetrics) -> f64| -> f64 {
        mean(&folds.iter().map(|fold| f(&fold.metrics)).collect::<Vec<_>>()).unwrap_or(0.0)
    };
    let mapes: Vec<f64> = folds.iter().filter_map(|f| f.metrics.mape.value()).collect();
    AccuracyMetrics {
        mae: pick(|m| m.mae),
        mape: mean(&mapes).map_or(Ratio::Undefined, Ratio::Defined),
        rmse: pick(|m| m.rmse),
        ci_coverage_pct: pick(|m| m.ci_coverage_pct),
    }
}

// --- Business metrics -----------------------------------------------------

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BusinessMetrics {
    pub window: Option<DateRange>,
    pub daily_revenue: f64,
    pub daily_expenses: f64,
    pub profit_margin_pct: Ratio,
    pub expense_ratio_pct: Ratio,
}

impl BusinessMetrics {
    fn rounded(&self) -> Self {
        Self {
            window: self.window,
            daily_revenue: round_money(self.daily_revenue),
            daily_expenses: round_money(self.daily_expenses),
            profit_margin_pct: self.profit_margin_pct.map(round_pct),
            expense_ratio_pct: self.expense_ratio_pct.map(round_pct),
        }
    }
}

/// Trailing-window averages. Records dated on or after `last - window_days`
/// count, and sums are divided by `window_days` whether or not every day
/// had activity.
pub fn business_metrics(transactions: &[Transaction], window_days: i64) -> BusinessMetrics {
    let Some(last) = transactions.iter().map(|t| t.date).max() else {
        return BusinessMetrics {
            window: None,
            daily_revenue: 0.0,
            daily_expenses: 0.0,
            profit_margin_pct: Ratio::Undefined,
            expense_ratio_pct: Ratio::Undefined,
        };
    };
    let start = window_start(last, window_days);
    let recent = transactions.iter().filter(|t| t.date >= start);

    let (inflow, outflow) = recent.fold((0.0, 0.0), |(inp, out), t| {
        if t.amount > 0.0 {
            (inp + t.amount, out)
        } else {
            (inp, out + t.amount.abs())
        }
    });
    let days = window_days as f64;
    let daily_revenue = inflow / days;
    let daily_expenses = outflow / days;

    BusinessMetrics {
        window: Some(DateRange { start, end: last }),
        daily_revenue,
        daily_expenses,
        profit_margin_pct: Ratio::percent(daily_revenue - daily_expenses, daily_revenue),
        expense_ratio_pct: Ratio::percent(daily_expenses, daily_revenue),
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SanityCheck {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

/// Every check runs; a failure in one never hides the others.
pub fn sanity_checks(metrics: &BusinessMetrics) -> Vec<SanityCheck> {
    let revenue_positive = metrics.daily_revenue > 0.0;
    let ratio_ok = metrics
        .expense_ratio_pct
        .is_defined_and(|r| r < SANITY_EXPENSE_RATIO_LIMIT_PCT);
    let profitable = metrics.profit_margin_pct.is_defined_and(|m| m > 0.0);

    vec![
        SanityCheck {
            name: "revenue_positive",
            passed: revenue_positive,
            detail: if revenue_positive {
                format!("Revenue is positive: ${:.2}/day", metrics.daily_revenue)
            } else {
                "No revenue detected, check the data".to_string()
            },
        },
        SanityCheck {
            name: "expense_ratio",
            passed: ratio_ok,
            detail: if ratio_ok {
                format!("Expense ratio is healthy: {}", metrics.expense_ratio_pct)
            } else {
                format!("High expense ratio: {}", metrics.expense_ratio_pct)
            },
        },
        SanityCheck {
            name: "profit_margin",
            passed: profitable,
            detail: if profitable {
                format!("Business is profitable: {} margin", metrics.profit_margin_pct)
            } else {
                format!("Business is losing money: {} margin", metrics.profit_margin_pct)
            },
        },
    ]
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkBand {
    Below,
    Within,
    Above,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BenchmarkComparison {
    pub industry_margin_range_pct: (f64, f64),
    /// Absent when the margin itself is undefined.
    pub profit_margin_band: Option<BenchmarkBand>,
    pub expense_control_limit_pct: f64,
    pub expense_control_ok: bool,
}

pub fn compare_with_benchmarks(metrics: &BusinessMetrics) -> BenchmarkComparison {
    let (low, high) = INDUSTRY_MARGIN_RANGE;
    let profit_margin_band = metrics.profit_margin_pct.value().map(|m| {
        if m < low {
            BenchmarkBand::Below
        } else if m > high {
            BenchmarkBand::Above
        } else {
            BenchmarkBand::Within
        }
    });
    BenchmarkComparison {
        industry_margin_range_pct: INDUSTRY_MARGIN_RANGE,
        profit_margin_band,
        expense_control_limit_pct: EXPENSE_CONTROL_LIMIT_PCT,
        expense_control_ok: metrics
            .expense_ratio_pct
            .is_defined_and(|r| r < EXPENSE_CONTROL_LIMIT_PCT),
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WeekdayAverage {
    pub weekday: String,
    pub average_inflow: f64,
    pub transactions: usize,
}

/// Mean positive amount per weekday, Monday first. Weekdays with no inflow
/// are left out.
pub fn weekly_pattern(transactions: &[Transaction]) -> Vec<WeekdayAverage> {
    let mut buckets = [(0.0_f64, 0_usize); 7];
    for tx in transactions.iter().filter(|t| t.amount > 0.0) {
        let slot = &mut buckets[tx.date.weekday().num_days_from_monday() as usize];
        slot.0 += tx.amount;
        slot.1 += 1;
    }

    let mut weekday = Weekday::Mon;
    let mut out = Vec::new();
    for (sum, count) in buckets {
        if count > 0 {
            out.push(WeekdayAverage {
                weekday: weekday_name(weekday).to_string(),
                average_inflow: sum / count as f64,
                transactions: count,
            });
        }
        weekday = weekday.succ();
    }
    out
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

// --- Confidence -----------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn from_score(score: u8) -> Self {
        if score >= 75 {
            ConfidenceLevel::High
        } else if score >= 50 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

/// Four independent checks worth 25 points each.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ConfidenceChecks {
    pub profit_margin_positive: bool,
    pub expense_ratio_below_limit: bool,
    pub daily_revenue_above_minimum: bool,
    pub daily_expenses_positive: bool,
}

impl ConfidenceChecks {
    pub fn from_metrics(metrics: &BusinessMetrics) -> Self {
        Self {
            profit_margin_positive: metrics.profit_margin_pct.is_defined_and(|m| m > 0.0),
            expense_ratio_below_limit: metrics
                .expense_ratio_pct
                .is_defined_and(|r| r < CONFIDENCE_EXPENSE_RATIO_LIMIT_PCT),
            daily_revenue_above_minimum: metrics.daily_revenue > CONFIDENCE_MIN_DAILY_REVENUE,
            daily_expenses_positive: metrics.daily_expenses > 0.0,
        }
    }

    pub fn score(&self) -> u8 {
        [
            self.profit_margin_positive,
            self.expense_ratio_below_limit,
            self.daily_revenue_above_minimum,
            self.daily_expenses_positive,
        ]
        .iter()
        .filter(|passed| **passed)
        .count() as u8
            * 25
    }

    pub fn level(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_score(self.score())
    }
}

// --- Report ---------------------------------------------------------------

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ValidationReport {
    pub data_quality: DataQualityReport,
    pub data_quality_verdict: &'static str,
    pub backtest: Option<BacktestReport>,
    pub cross_validation: Option<CrossValidationReport>,
    pub business_metrics: BusinessMetrics,
    pub business_logic_verdict: &'static str,
    pub sanity_checks: Vec<SanityCheck>,
    pub benchmarks: BenchmarkComparison,
    pub weekly_pattern: Vec<WeekdayAverage>,
    pub confidence_checks: ConfidenceChecks,
    pub confidence_score: u8,
    pub confidence_level: ConfidenceLevel,
    pub recommendations: Vec<String>,
}

impl ValidationReport {
    /// JSON with money rounded to cents and percentages to one decimal.
    /// The report itself keeps full precision.
    pub fn to_presentation_json(&self) -> Result<serde_json::Value> {
        let mut rounded = self.clone();
        rounded.data_quality = self.data_quality.rounded();
        rounded.backtest = self.backtest.as_ref().map(BacktestReport::rounded);
        rounded.cross_validation = self
            .cross_validation
            .as_ref()
            .map(CrossValidationReport::rounded);
        rounded.business_metrics = self.business_metrics.rounded();
        for day in &mut rounded.weekly_pattern {
            day.average_inflow = round_money(day.average_inflow);
        }
        Ok(serde_json::to_value(&rounded)?)
    }
}

pub struct Validator<M = SeasonalRegression> {
    engine: ForecastEngine<M>,
    config: ValidationConfig,
}

impl Validator<SeasonalRegression> {
    pub fn new(config: ForecastConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            engine: ForecastEngine::new(config.model)?,
            config: config.validation,
        })
    }
}

impl Default for Validator<SeasonalRegression> {
    fn default() -> Self {
        Self {
            engine: ForecastEngine::default(),
            config: ValidationConfig::default(),
        }
    }
}

impl<M: ForecastModel> Validator<M> {
    pub fn with_engine(engine: ForecastEngine<M>, config: ValidationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { engine, config })
    }

    pub fn validate_data_quality(&self, transactions: &[Transaction]) -> DataQualityReport {
        validate_data_quality(transactions, self.config.outlier_multiplier)
    }

    /// Trains on all daily inflow up to `max - test_days` and scores the
    /// forecast of the remaining days.
    pub fn backtest(&self, transactions: &[Transaction], test_days: i64) -> Result<BacktestReport> {
        let horizon = match u32::try_from(test_days) {
            Ok(days) if days > 0 => days,
            _ => {
                return Err(ForecastError::InvalidInput(format!(
                    "test_days must be a positive day count (got {})",
                    test_days
                )))
            }
        };
        let series = daily_inflow(transactions);
        let required = (horizon as usize).saturating_add(self.engine.min_points());
        if series.len() < required {
            return Err(ForecastError::InsufficientData {
                series: "daily revenue (backtest)".to_string(),
                required,
                found: series.len(),
            });
        }
        let (Some((&first, _)), Some((&last, _))) =
            (series.first_key_value(), series.last_key_value())
        else {
            return Err(ForecastError::NoData);
        };

        let (Some(cutoff), Some(test_start)) =
            (shift_days(last, -test_days), shift_days(last, 1 - test_days))
        else {
            return Err(ForecastError::InvalidInput(format!(
                "{} test days before {} is outside the supported calendar",
                test_days, last
            )));
        };
        let train = slice_series(&series, first, cutoff);
        let actual = slice_series(&series, test_start, last);

        info!(
            "Backtesting on {} training days and {} test days",
            train.len(),
            actual.len()
        );

        let result = self
            .engine
            .forecast_labeled("daily revenue (backtest)", &train, horizon)?;
        let (comparison, dropped) = join_on_date(&actual, result.future());
        if dropped > 0 {
            debug!("Backtest dropped {} unmatched dates", dropped);
        }

        let metrics = accuracy_metrics(&comparison)?;
        let mape_pct = metrics.mape.value().ok_or_else(|| {
            ForecastError::UndefinedRatio("MAPE with every actual equal to zero".to_string())
        })?;

        let train_end = train.keys().next_back().copied().unwrap_or(cutoff);
        let test_start = actual.keys().next().copied().unwrap_or(last);

        Ok(BacktestReport {
            training: DateRange {
                start: first,
                end: train_end,
            },
            testing: DateRange {
                start: test_start,
                end: last,
            },
            metrics,
            mape_pct,
            accuracy_tier: accuracy_tier(mape_pct),
            comparison,
        })
    }

    pub fn cross_validate(&self, transactions: &[Transaction]) -> Result<CrossValidationReport> {
        let cv = &self.config.cross_validation;
        let series = daily_inflow(transactions);
        if series.len() < cv.min_points {
            return Err(ForecastError::InsufficientData {
                series: "daily revenue (cross-validation)".to_string(),
                required: cv.min_points,
                found: series.len(),
            });
        }
        let (Some((&first, _)), Some((&last, _))) =
            (series.first_key_value(), series.last_key_value())
        else {
            return Err(ForecastError::NoData);
        };

        let horizon = u32::try_from(cv.horizon_days).map_err(|_| {
            ForecastError::InvalidInput(format!(
                "cross-validation horizon must be a positive day count (got {})",
                cv.horizon_days
            ))
        })?;
        let cutoffs = cross_validation_cutoffs(first, last, cv);
        debug!("Cross-validating with {} cutoffs", cutoffs.len());

        let mut folds = Vec::with_capacity(cutoffs.len());
        for cutoff in cutoffs {
            let train = slice_series(&series, first, cutoff);
            let test = match (shift_days(cutoff, 1), shift_days(cutoff, cv.horizon_days)) {
                (Some(start), Some(end)) => slice_series(&series, start, end.min(last)),
                (Some(start), None) => slice_series(&series, start, last),
                _ => DailySeries::new(),
            };
            if test.is_empty() {
                continue;
            }

            let result = match self.engine.forecast_labeled(
                "daily revenue (cross-validation)",
                &train,
                horizon,
            ) {
                Ok(result) => result,
                Err(ForecastError::InsufficientData { found, .. }) => {
                    debug!("Skipping cutoff {} with {} training points", cutoff, found);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let (comparison, _) = join_on_date(&test, result.future());
            if comparison.is_empty() {
                continue;
            }
            folds.push(CrossValidationFold {
                cutoff,
                train_points: train.len(),
                test_points: comparison.len(),
                metrics: accuracy_metrics(&comparison)?,
            });
        }

        if folds.is_empty() {
            return Err(ForecastError::InsufficientData {
                series: "cross-validation folds".to_string(),
                required: 1,
                found: 0,
            });
        }

        let averages = average_metrics(&folds);
        Ok(CrossValidationReport { folds, averages })
    }

    pub fn business_metrics(&self, transactions: &[Transaction]) -> BusinessMetrics {
        business_metrics(transactions, self.config.business_window_days)
    }

    pub fn generate_report(&self, transactions: &[Transaction]) -> Result<ValidationReport> {
        if transactions.is_empty() {
            return Err(ForecastError::NoData);
        }
        info!("Generating validation report for {} records", transactions.len());

        let data_quality = self.validate_data_quality(transactions);

        let backtest = match self.backtest(transactions, self.config.backtest_test_days) {
            Ok(report) => Some(report),
            Err(e) => {
                warn!("Backtest skipped: {}", e);
                None
            }
        };
        let cross_validation = match self.cross_validate(transactions) {
            Ok(report) => Some(report),
            Err(e) => {
                warn!("Cross-validation skipped: {}", e);
                None
            }
        };

        let business_metrics = self.business_metrics(transactions);
        let sanity_checks = sanity_checks(&business_metrics);
        let benchmarks = compare_with_benchmarks(&business_metrics);
        let weekly_pattern = weekly_pattern(transactions);
        let confidence_checks = ConfidenceChecks::from_metrics(&business_metrics);
        let confidence_score = confidence_checks.score();

        let recommendations = recommendations(
            backtest.as_ref().map(|b| b.mape_pct),
            &business_metrics,
            data_quality.record_count,
        );

        let business_logic_verdict =
            if business_metrics.profit_margin_pct.is_defined_and(|m| m > 0.0) {
                "VALID"
            } else {
                "QUESTIONABLE"
            };

        Ok(ValidationReport {
            data_quality_verdict: data_quality.verdict(),
            data_quality,
            backtest,
            cross_validation,
            business_metrics,
            business_logic_verdict,
            sanity_checks,
            benchmarks,
            weekly_pattern,
            confidence_checks,
            confidence_score,
            confidence_level: ConfidenceLevel::from_score(confidence_score),
            recommendations,
        })
    }
}

fn recommendations(
    backtest_mape: Option<f64>,
    metrics: &BusinessMetrics,
    record_count: usize,
) -> Vec<String> {
    let mut out = Vec::new();
    if backtest_mape.is_some_and(|m| m < RELIABLE_MAPE_PCT) {
        out.push("Model predictions appear reliable".to_string());
    } else {
        out.push("Model predictions may be less accurate, use with caution".to_string());
    }
    if metrics.profit_margin_pct.is_defined_and(|m| m > STRONG_MARGIN_PCT) {
        out.push("Business fundamentals are strong".to_string());
    } else {
        out.push("Monitor business performance closely".to_string());
    }
    if record_count > SUFFICIENT_RECORDS {
        out.push("Sufficient data for reliable forecasting".to_string());
    } else {
        out.push("Consider collecting more data for better accuracy".to_string());
    }
    out
}
