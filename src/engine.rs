use crate::aggregator::DailySeries;
use crate::config::{ModelConfig, SeasonalityMode, DEFAULT_MAX_HORIZON_DAYS};
use crate::error::{ForecastError, Result};
use crate::math::{dot, median, normal_quantile, variance, weighted_ridge};
use crate::seasonality::{active_components, feature_row, informative_columns, SeasonalComponent};
use crate::utils::{date_range, shift_days};
use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};

// Floors in scaled units (values divided by the largest absolute observation).
const MIN_NOISE_VAR: f64 = 1e-4;
const MIN_ROBUST_SCALE: f64 = 1e-3;
const HUBER_K: f64 = 1.345;
const MAD_TO_SIGMA: f64 = 1.4826;
const SLOPE_PRIOR_SCALE: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
    /// Trend component alone, without seasonality.
    pub trend: f64,
}

impl ForecastPoint {
    pub fn interval_width(&self) -> f64 {
        self.yhat_upper - self.yhat_lower
    }
}

/// A forecasting technique: anything that can be fitted to a daily series.
pub trait ForecastModel {
    type Fitted: FittedModel;

    fn fit(&self, series: &DailySeries) -> Result<Self::Fitted>;
}

/// Fitted model state. Must produce bounds that widen (never narrow) with
/// distance past the last observed date.
pub trait FittedModel {
    fn first_date(&self) -> NaiveDate;
    fn last_date(&self) -> NaiveDate;
    fn predict(&self, dates: &[NaiveDate]) -> Vec<ForecastPoint>;
}

#[derive(Debug, Clone)]
pub struct ForecastResult<F = FittedSeasonalModel> {
    pub model: F,
    /// Every calendar day from the first observation through the horizon.
    pub predictions: Vec<ForecastPoint>,
    pub historical: DailySeries,
    pub horizon_days: usize,
}

impl<F> ForecastResult<F> {
    /// The trailing `horizon_days` predictions, i.e. the actual forecast.
    pub fn future(&self) -> &[ForecastPoint] {
        let start = self.predictions.len().saturating_sub(self.horizon_days);
        &self.predictions[start..]
    }

    /// In-sample reconstruction of the history.
    pub fn fitted_history(&self) -> &[ForecastPoint] {
        let end = self.predictions.len().saturating_sub(self.horizon_days);
        &self.predictions[..end]
    }
}

pub struct ForecastEngine<M = SeasonalRegression> {
    model: M,
    min_points: usize,
    max_horizon_days: u32,
}

impl ForecastEngine<SeasonalRegression> {
    pub fn new(config: ModelConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: ModelConfig) -> Self {
        let min_points = config.min_points;
        let max_horizon_days = config.max_horizon_days;
        Self {
            model: SeasonalRegression::new(config),
            min_points,
            max_horizon_days,
        }
    }
}

impl Default for ForecastEngine<SeasonalRegression> {
    fn default() -> Self {
        Self::from_valid_config(ModelConfig::default())
    }
}

impl<M: ForecastModel> ForecastEngine<M> {
    pub fn with_model(model: M, min_points: usize) -> Self {
        Self {
            model,
            min_points,
            max_horizon_days: DEFAULT_MAX_HORIZON_DAYS,
        }
    }

    pub fn with_max_horizon_days(mut self, days: u32) -> Self {
        self.max_horizon_days = days;
        self
    }

    pub fn min_points(&self) -> usize {
        self.min_points
    }

    pub fn max_horizon_days(&self) -> u32 {
        self.max_horizon_days
    }

    /// Fits on all of `series` and predicts through `horizon_days` past its
    /// last date. Fails with `InsufficientData` below `min_points` points.
    pub fn forecast(
        &self,
        series: &DailySeries,
        horizon_days: u32,
    ) -> Result<ForecastResult<M::Fitted>> {
        self.forecast_labeled("series", series, horizon_days)
    }

    pub fn forecast_labeled(
        &self,
        label: &str,
        series: &DailySeries,
        horizon_days: u32,
    ) -> Result<ForecastResult<M::Fitted>> {
        if horizon_days == 0 {
            return Err(ForecastError::InvalidInput(
                "horizon_days must be positive".to_string(),
            ));
        }
        if horizon_days > self.max_horizon_days {
            return Err(ForecastError::InvalidInput(format!(
                "horizon of {} days exceeds the maximum of {}",
                horizon_days, self.max_horizon_days
            )));
        }
        if series.len() < self.min_points {
            return Err(ForecastError::InsufficientData {
                series: label.to_string(),
                required: self.min_points,
                found: series.len(),
            });
        }
        if let Some((date, value)) = series.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ForecastError::InvalidInput(format!(
                "{} has non-finite value {} on {}",
                label, value, date
            )));
        }

        info!(
            "Creating {}-day forecast for {} from {} points",
            horizon_days,
            label,
            series.len()
        );

        let model = self.model.fit(series)?;
        let end = shift_days(model.last_date(), i64::from(horizon_days)).ok_or_else(|| {
            ForecastError::InvalidInput(format!(
                "{} days past {} is outside the supported calendar",
                horizon_days,
                model.last_date()
            ))
        })?;
        let predictions = model.predict(&date_range(model.first_date(), end));

        Ok(ForecastResult {
            model,
            predictions,
            historical: series.clone(),
            horizon_days: horizon_days as usize,
        })
    }
}

/// Piecewise-linear trend with potential changepoints, combined with
/// Fourier seasonality. Fitted by alternating penalized least squares with
/// Huber reweighting. The first round already weights points by their
/// distance from the median, so a single spike is treated as an outlier
/// rather than a level shift.
///
/// Short histories get a smaller model: a seasonal cycle needs two full
/// periods of history and there is at most one changepoint per three
/// observations.
#[derive(Debug, Clone)]
pub struct SeasonalRegression {
    config: ModelConfig,
    components: Vec<SeasonalComponent>,
}

impl SeasonalRegression {
    pub fn new(config: ModelConfig) -> Self {
        let components = active_components(&config);
        Self { config, components }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedSeasonalModel {
    mode: SeasonalityMode,
    components: Vec<SeasonalComponent>,
    seasonal_columns: Vec<usize>,
    start: NaiveDate,
    end: NaiveDate,
    span_days: f64,
    y_scale: f64,
    changepoints: Vec<f64>,
    trend_params: Vec<f64>,
    seasonal_params: Vec<f64>,
    sigma: f64,
    n_obs: usize,
    change_rate: f64,
    change_scale: f64,
    z: f64,
}

impl FittedSeasonalModel {
    /// Trend slope after the last changepoint, in value units per day.
    pub fn final_growth_per_day(&self) -> f64 {
        let slope: f64 = self.trend_params.iter().skip(1).sum();
        slope * self.y_scale / self.span_days
    }

    /// Residual standard deviation corrected for the degrees of freedom the
    /// fit used, in value units.
    pub fn residual_scale(&self) -> f64 {
        self.sigma * self.y_scale
    }

    fn scaled_time(&self, date: NaiveDate) -> f64 {
        (date - self.start).num_days() as f64 / self.span_days
    }

    fn seasonal_row(&self, date: NaiveDate) -> Vec<f64> {
        let days = (date - self.start).num_days() as f64;
        let full = feature_row(&self.components, days);
        self.seasonal_columns.iter().map(|&j| full[j]).collect()
    }

    fn variance_at(&self, t: f64) -> f64 {
        let n = self.n_obs as f64;
        let offset = t.max(1.0) - 0.5;
        let h = (t - 1.0).max(0.0);
        let estimation = self.sigma.powi(2) * (1.0 + 1.0 / n + 12.0 * offset * offset / n);
        let trend_change =
            self.change_rate * 2.0 * self.change_scale.powi(2) * h.powi(3) / 3.0;
        estimation + trend_change
    }
}

impl FittedModel for FittedSeasonalModel {
    fn first_date(&self) -> NaiveDate {
        self.start
    }

    fn last_date(&self) -> NaiveDate {
        self.end
    }

    fn predict(&self, dates: &[NaiveDate]) -> Vec<ForecastPoint> {
        dates
            .iter()
            .map(|&date| {
                let t = self.scaled_time(date);
                let trend = dot(&trend_row(t, &self.changepoints), &self.trend_params);
                let seasonal = dot(&self.seasonal_row(date), &self.seasonal_params);
                let yhat = combine(self.mode, trend, seasonal);
                let half_width = self.z * self.variance_at(t).sqrt();

                ForecastPoint {
                    date,
                    yhat: yhat * self.y_scale,
                    yhat_lower: (yhat - half_width) * self.y_scale,
                    yhat_upper: (yhat + half_width) * self.y_scale,
                    trend: trend * self.y_scale,
                }
            })
            .collect()
    }
}

impl ForecastModel for SeasonalRegression {
    type Fitted = FittedSeasonalModel;

    fn fit(&self, series: &DailySeries) -> Result<FittedSeasonalModel> {
        let n = series.len();
        let (Some((&start, _)), Some((&end, _))) = (series.first_key_value(), series.last_key_value())
        else {
            return Err(ForecastError::InsufficientData {
                series: "series".to_string(),
                required: 2,
                found: 0,
            });
        };

        let span_days = ((end - start).num_days() as f64).max(1.0);
        let days: Vec<f64> = series
            .keys()
            .map(|d| (*d - start).num_days() as f64)
            .collect();
        let t: Vec<f64> = days.iter().map(|d| d / span_days).collect();

        let y_scale = series
            .values()
            .fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let y_scale = if y_scale > 0.0 { y_scale } else { 1.0 };
        let y: Vec<f64> = series.values().map(|v| v / y_scale).collect();

        let changepoints = place_changepoints(
            &t,
            self.config.n_changepoints.min(n / 3),
            self.config.changepoint_range,
        );
        let trend_rows: Vec<Vec<f64>> = t.iter().map(|&ti| trend_row(ti, &changepoints)).collect();

        let components: Vec<SeasonalComponent> = self
            .components
            .iter()
            .filter(|c| span_days >= 2.0 * c.period_days)
            .cloned()
            .collect();
        let raw_seasonal: Vec<Vec<f64>> = days
            .iter()
            .map(|&d| feature_row(&components, d))
            .collect();
        let seasonal_columns = informative_columns(&raw_seasonal);
        let seasonal_rows: Vec<Vec<f64>> = raw_seasonal
            .iter()
            .map(|row| seasonal_columns.iter().map(|&j| row[j]).collect())
            .collect();

        debug!(
            "Fitting {} points with {} changepoints and {} seasonal features",
            n,
            changepoints.len(),
            seasonal_columns.len()
        );

        let mode = self.config.seasonality_mode;
        let tau = self.config.changepoint_prior_scale;
        let season_prior = self.config.seasonality_prior_scale;

        let centre = median(&y).unwrap_or(0.0);
        let deviations: Vec<f64> = y.iter().map(|v| v - centre).collect();
        let mut weights = huber_weights(&deviations, robust_scale(&deviations));

        let mut seasonal = vec![0.0; n];
        let mut trend = vec![0.0; n];
        let mut trend_params = vec![0.0; changepoints.len() + 2];
        let mut seasonal_params = vec![0.0; seasonal_columns.len()];
        let mut noise_var = (variance(&y).unwrap_or(0.0) * 0.5).max(MIN_NOISE_VAR);
        let mut residuals = vec![0.0; n];
        let mut fit_weights = weights.clone();
        let mut used_dof = 0.0;

        for _ in 0..self.config.robust_iterations.max(1) {
            let mut trend_penalties = vec![1e-10, noise_var / SLOPE_PRIOR_SCALE.powi(2)];
            trend_penalties.extend(std::iter::repeat(noise_var / (tau * tau)).take(changepoints.len()));

            let (rows, targets): (Vec<Vec<f64>>, Vec<f64>) = match mode {
                SeasonalityMode::Multiplicative => trend_rows
                    .iter()
                    .zip(&seasonal)
                    .zip(&y)
                    .map(|((row, s), yi)| (row.iter().map(|x| x * (1.0 + s)).collect(), *yi))
                    .unzip(),
                SeasonalityMode::Additive => trend_rows
                    .iter()
                    .zip(&seasonal)
                    .zip(&y)
                    .map(|((row, s), yi)| (row.clone(), yi - s))
                    .unzip(),
            };
            let trend_fit = weighted_ridge(&rows, &targets, &weights, &trend_penalties)?;
            trend_params = trend_fit.coefficients;
            used_dof = trend_fit.effective_dof;
            for (g, row) in trend.iter_mut().zip(&trend_rows) {
                *g = dot(row, &trend_params);
            }

            if !seasonal_params.is_empty() {
                let penalties = vec![noise_var / (season_prior * season_prior); seasonal_params.len()];
                let (rows, targets): (Vec<Vec<f64>>, Vec<f64>) = match mode {
                    SeasonalityMode::Multiplicative => seasonal_rows
                        .iter()
                        .zip(&trend)
                        .zip(&y)
                        .map(|((row, g), yi)| (row.iter().map(|x| x * g).collect(), yi - g))
                        .unzip(),
                    SeasonalityMode::Additive => seasonal_rows
                        .iter()
                        .zip(&trend)
                        .zip(&y)
                        .map(|((row, g), yi)| (row.clone(), yi - g))
                        .unzip(),
                };
                let seasonal_fit = weighted_ridge(&rows, &targets, &weights, &penalties)?;
                seasonal_params = seasonal_fit.coefficients;
                used_dof += seasonal_fit.effective_dof;
                for (s, row) in seasonal.iter_mut().zip(&seasonal_rows) {
                    *s = dot(row, &seasonal_params);
                }
            }

            for i in 0..n {
                residuals[i] = y[i] - combine(mode, trend[i], seasonal[i]);
            }
            fit_weights = weights;
            weights = huber_weights(&residuals, robust_scale(&residuals));
            noise_var = weighted_mean_square(&residuals, &weights).max(MIN_NOISE_VAR);
        }

        if trend_params.iter().chain(&seasonal_params).any(|p| !p.is_finite()) {
            return Err(ForecastError::ModelFit(
                "fitted parameters are not finite".to_string(),
            ));
        }

        // Weights of the final solve, so the hat trace and residuals agree.
        let total_weight: f64 = fit_weights.iter().sum();
        let weighted_sse: f64 = residuals
            .iter()
            .zip(&fit_weights)
            .map(|(r, w)| w * r * r)
            .sum();
        let residual_dof = (total_weight - used_dof).max(1.0);
        let sigma = (weighted_sse / residual_dof).max(MIN_NOISE_VAR).sqrt();
        let deltas = &trend_params[2..];
        let change_scale = if deltas.is_empty() {
            0.0
        } else {
            deltas.iter().map(|d| d.abs()).sum::<f64>() / deltas.len() as f64
        };

        let fitted = FittedSeasonalModel {
            mode,
            components,
            seasonal_columns,
            start,
            end,
            span_days,
            y_scale,
            change_rate: changepoints.len() as f64,
            changepoints,
            trend_params,
            seasonal_params,
            sigma,
            n_obs: n,
            change_scale,
            z: normal_quantile(0.5 + self.config.interval_width / 2.0),
        };
        debug!(
            "Fit used {:.1} degrees of freedom; residual scale {:.2}",
            used_dof,
            fitted.residual_scale()
        );
        Ok(fitted)
    }
}

fn combine(mode: SeasonalityMode, trend: f64, seasonal: f64) -> f64 {
    match mode {
        SeasonalityMode::Multiplicative => trend * (1.0 + seasonal),
        SeasonalityMode::Additive => trend + seasonal,
    }
}

fn trend_row(t: f64, changepoints: &[f64]) -> Vec<f64> {
    let mut row = Vec::with_capacity(changepoints.len() + 2);
    row.push(1.0);
    row.push(t);
    row.extend(changepoints.iter().map(|s| (t - s).max(0.0)));
    row
}

/// Evenly spaced over the first `range` share of the observations, never
/// at the first one.
fn place_changepoints(t: &[f64], max_changepoints: usize, range: f64) -> Vec<f64> {
    let hist = ((t.len() as f64) * range).floor() as usize;
    let count = max_changepoints.min(hist.saturating_sub(1));
    if count == 0 {
        return Vec::new();
    }
    let last = (hist - 1) as f64;
    let mut points: Vec<f64> = (1..=count)
        .map(|j| t[(j as f64 * last / count as f64).round() as usize])
        .collect();
    points.dedup();
    points
}

fn huber_weights(residuals: &[f64], scale: f64) -> Vec<f64> {
    let limit = HUBER_K * scale;
    residuals
        .iter()
        .map(|r| {
            let a = r.abs();
            if a <= limit {
                1.0
            } else {
                limit / a
            }
        })
        .collect()
}

/// MAD-based scale of residuals around zero.
fn robust_scale(residuals: &[f64]) -> f64 {
    let abs: Vec<f64> = residuals.iter().map(|r| r.abs()).collect();
    (MAD_TO_SIGMA * median(&abs).unwrap_or(0.0)).max(MIN_ROBUST_SCALE)
}

fn weighted_mean_square(residuals: &[f64], weights: &[f64]) -> f64 {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    residuals
        .iter()
        .zip(weights)
        .map(|(r, w)| w * r * r)
        .sum::<f64>()
        / total
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::f64::consts::PI;

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(offset)
    }

    fn series_from(f: impl Fn(i64) -> f64, days: i64) -> DailySeries {
        (0..days).map(|d| (day(d), f(d))).collect()
    }

    #[test]
    fn test_nine_points_is_insufficient() {
        let engine = ForecastEngine::default();
        let series = series_from(|d| 100.0 + d as f64, 9);
        let err = engine.forecast(&series, 7).unwrap_err();
        match err {
            ForecastError::InsufficientData {
                required, found, ..
            } => {
                assert_eq!(required, 10);
                assert_eq!(found, 9);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_ten_points_proceeds() {
        let engine = ForecastEngine::default();
        let series = series_from(|d| 100.0 + d as f64, 10);
        let result = engine.forecast(&series, 7).unwrap();
        assert_eq!(result.future().len(), 7);
        assert_eq!(result.predictions.len(), 10 + 7);
    }

    #[test]
    fn test_zero_horizon_is_rejected() {
        let engine = ForecastEngine::default();
        let series = series_from(|_| 10.0, 20);
        assert!(matches!(
            engine.forecast(&series, 0),
            Err(ForecastError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_horizon_beyond_maximum_is_rejected() {
        let engine = ForecastEngine::default();
        let series = series_from(|_| 100.0, 20);
        assert!(matches!(
            engine.forecast(&series, u32::MAX),
            Err(ForecastError::InvalidInput(_))
        ));
        assert!(engine.forecast(&series, engine.max_horizon_days()).is_ok());
    }

    #[test]
    fn test_horizon_past_calendar_end_is_rejected() {
        let engine = ForecastEngine::default().with_max_horizon_days(u32::MAX);
        let series = series_from(|_| 100.0, 20);
        assert!(matches!(
            engine.forecast(&series, u32::MAX),
            Err(ForecastError::InvalidInput(_))
        ));

        let late: DailySeries = (0..20)
            .map(|d| (NaiveDate::MAX - Duration::days(19 - d), 100.0))
            .collect();
        assert!(matches!(
            engine.forecast(&late, 1),
            Err(ForecastError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ModelConfig {
            interval_width: 1.0,
            ..ModelConfig::default()
        };
        assert!(matches!(
            ForecastEngine::new(config),
            Err(ForecastError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_single_spike_leaves_trend_flat() {
        let engine = ForecastEngine::default();
        let mut series = series_from(|_| 500.0, 40);
        series.insert(day(20), 5500.0);

        let result = engine.forecast(&series, 30).unwrap();
        let growth = result.model.final_growth_per_day();
        assert!(growth.abs() < 0.5, "growth per day {}", growth);
        for point in result.future() {
            assert!(
                (point.yhat - 500.0).abs() < 25.0,
                "{} on {}",
                point.yhat,
                point.date
            );
        }
    }

    #[test]
    fn test_short_noisy_series_keeps_honest_intervals() {
        let engine = ForecastEngine::default();
        let series = series_from(|d| if d % 2 == 0 { 550.0 } else { 450.0 }, 10);
        let result = engine.forecast(&series, 7).unwrap();

        assert!(
            result.model.residual_scale() > 40.0,
            "residual scale {}",
            result.model.residual_scale()
        );
        let first = &result.future()[0];
        assert!(first.interval_width() >= 100.0, "{:?}", first);
    }

    #[test]
    fn test_predictions_cover_gaps_and_horizon() {
        let engine = ForecastEngine::default();
        let series: DailySeries = (0..30)
            .filter(|d| d % 7 != 6)
            .map(|d| (day(d), 300.0 + (d % 5) as f64 * 10.0))
            .collect();
        let result = engine.forecast(&series, 14).unwrap();

        assert_eq!(result.predictions.first().unwrap().date, day(0));
        assert_eq!(result.predictions.last().unwrap().date, day(29 + 14));
        assert_eq!(result.future().first().unwrap().date, day(30));
        assert_eq!(result.fitted_history().len(), 30);
    }

    #[test]
    fn test_constant_series_forecasts_constant() {
        let engine = ForecastEngine::default();
        let series = series_from(|_| 250.0, 30);
        let result = engine.forecast(&series, 10).unwrap();
        for point in result.future() {
            assert!((point.yhat - 250.0).abs() < 2.5, "{:?}", point);
        }
    }

    #[test]
    fn test_linear_growth_is_extrapolated() {
        let engine = ForecastEngine::default();
        let series = series_from(|d| 100.0 + 4.0 * d as f64, 60);
        let result = engine.forecast(&series, 10).unwrap();
        let last = result.future().last().unwrap();
        let expected = 100.0 + 4.0 * 69.0;
        assert!(
            (last.yhat - expected).abs() / expected < 0.05,
            "got {}, expected {}",
            last.yhat,
            expected
        );
        assert!(result.model.final_growth_per_day() > 3.0);
    }

    #[test]
    fn test_interval_width_never_shrinks_over_horizon() {
        let engine = ForecastEngine::default();
        let series = series_from(
            |d| 400.0 + 3.0 * d as f64 + 40.0 * ((d * 37 % 11) as f64 - 5.0),
            70,
        );
        let result = engine.forecast(&series, 30).unwrap();
        let widths: Vec<f64> = result.future().iter().map(|p| p.interval_width()).collect();
        for pair in widths.windows(2) {
            assert!(pair[1] >= pair[0] - 1e-9, "{:?}", pair);
        }
        assert!(widths.last().unwrap() > widths.first().unwrap());
        for point in result.future() {
            assert!(point.yhat_lower <= point.yhat && point.yhat <= point.yhat_upper);
        }
    }

    #[test]
    fn test_seasonal_swing_scales_with_level() {
        let engine = ForecastEngine::default();
        let series = series_from(
            |d| (100.0 + 5.0 * d as f64) * (1.0 + 0.3 * (2.0 * PI * d as f64 / 7.0).sin()),
            84,
        );
        let result = engine.forecast(&series, 60).unwrap();
        let future = result.future();

        let swing = |points: &[ForecastPoint]| {
            let max = points.iter().map(|p| p.yhat).fold(f64::MIN, f64::max);
            let min = points.iter().map(|p| p.yhat).fold(f64::MAX, f64::min);
            max - min
        };
        let early = swing(&future[..7]);
        let late = swing(&future[future.len() - 7..]);
        assert!(late > early * 1.2, "early {} late {}", early, late);
    }

    #[test]
    fn test_fitting_is_deterministic() {
        let engine = ForecastEngine::default();
        let series = series_from(|d| 500.0 + ((d * 13) % 7) as f64 * 25.0, 45);
        let a = engine.forecast(&series, 14).unwrap();
        let b = engine.forecast(&series, 14).unwrap();
        assert_eq!(a.predictions, b.predictions);
    }

    #[test]
    fn test_changepoints_stay_in_early_history() {
        let t: Vec<f64> = (0..50).map(|i| i as f64 / 49.0).collect();
        let cps = place_changepoints(&t, 25, 0.8);
        assert_eq!(cps.len(), 25);
        assert!(cps.iter().all(|&c| c > 0.0 && c <= 0.8));

        let short: Vec<f64> = (0..10).map(|i| i as f64 / 9.0).collect();
        assert_eq!(place_changepoints(&short, 25, 0.8).len(), 7);
    }

    #[test]
    fn test_additive_mode_keeps_swing_constant() {
        let config = ModelConfig {
            seasonality_mode: SeasonalityMode::Additive,
            ..ModelConfig::default()
        };
        let engine = ForecastEngine::new(config).unwrap();
        let series = series_from(
            |d| 100.0 + 5.0 * d as f64 + 30.0 * (2.0 * PI * d as f64 / 7.0).sin(),
            84,
        );
        let result = engine.forecast(&series, 56).unwrap();
        let future = result.future();
        let swing = |points: &[ForecastPoint]| {
            let detrended: Vec<f64> = points.iter().map(|p| p.yhat - p.trend).collect();
            let max = detrended.iter().cloned().fold(f64::MIN, f64::max);
            let min = detrended.iter().cloned().fold(f64::MAX, f64::min);
            max - min
        };
        let early = swing(&future[..7]);
        let late = swing(&future[future.len() - 7..]);
        assert!((late - early).abs() / early < 0.1, "early {} late {}", early, late);
    }
}
