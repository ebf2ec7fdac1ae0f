use crate::error::{ForecastError, Result};
use crate::seasonality::SeasonalComponent;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalityMode {
    #[schemars(description = "Seasonal effects are added to the trend")]
    Additive,

    #[schemars(
        description = "Seasonal effects scale with the trend level. Suited to revenue that grows over time."
    )]
    Multiplicative,
}

pub const DEFAULT_MAX_HORIZON_DAYS: u32 = 3650;

/// Fixed configuration of the seasonal forecasting model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct ModelConfig {
    pub daily_seasonality: bool,
    pub weekly_seasonality: bool,
    pub yearly_seasonality: bool,

    #[schemars(description = "Seasonal components added on top of the built-in ones")]
    pub extra_seasonalities: Vec<SeasonalComponent>,

    pub seasonality_mode: SeasonalityMode,

    #[schemars(
        description = "Trend flexibility. Larger values let the trend bend more at changepoints."
    )]
    pub changepoint_prior_scale: f64,

    #[schemars(description = "Strength of the seasonality prior. Larger values allow larger seasonal swings.")]
    pub seasonality_prior_scale: f64,

    #[schemars(description = "Maximum number of potential trend changepoints")]
    pub n_changepoints: usize,

    #[schemars(description = "Fraction of the history in which changepoints may be placed")]
    pub changepoint_range: f64,

    #[schemars(description = "Coverage of the uncertainty interval, e.g. 0.8 for 80%")]
    pub interval_width: f64,

    #[schemars(description = "Minimum distinct dated points required to fit")]
    pub min_points: usize,

    #[schemars(description = "Reweighting rounds used to damp outliers during fitting")]
    pub robust_iterations: usize,

    #[schemars(description = "Longest horizon, in days, a single forecast may request")]
    pub max_horizon_days: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            daily_seasonality: true,
            weekly_seasonality: true,
            yearly_seasonality: false,
            extra_seasonalities: vec![SeasonalComponent::monthly()],
            seasonality_mode: SeasonalityMode::Multiplicative,
            changepoint_prior_scale: 0.1,
            seasonality_prior_scale: 10.0,
            n_changepoints: 25,
            changepoint_range: 0.8,
            interval_width: 0.8,
            min_points: 10,
            robust_iterations: 8,
            max_horizon_days: DEFAULT_MAX_HORIZON_DAYS,
        }
    }
}

impl ModelConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.changepoint_prior_scale > 0.0) {
            return Err(ForecastError::InvalidConfig(format!(
                "changepoint_prior_scale must be positive (got {})",
                self.changepoint_prior_scale
            )));
        }
        if !(self.seasonality_prior_scale > 0.0) {
            return Err(ForecastError::InvalidConfig(format!(
                "seasonality_prior_scale must be positive (got {})",
                self.seasonality_prior_scale
            )));
        }
        if !(self.interval_width > 0.0 && self.interval_width < 1.0) {
            return Err(ForecastError::InvalidConfig(format!(
                "interval_width must be between 0 and 1 (got {})",
                self.interval_width
            )));
        }
        if !(self.changepoint_range > 0.0 && self.changepoint_range <= 1.0) {
            return Err(ForecastError::InvalidConfig(format!(
                "changepoint_range must be in (0, 1] (got {})",
                self.changepoint_range
            )));
        }
        if self.min_points < 2 {
            return Err(ForecastError::InvalidConfig(
                "min_points must be at least 2".to_string(),
            ));
        }
        if self.max_horizon_days == 0 {
            return Err(ForecastError::InvalidConfig(
                "max_horizon_days must be positive".to_string(),
            ));
        }
        for component in &self.extra_seasonalities {
            component.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct CrossValidationConfig {
    #[schemars(description = "Days of history used to train the first fold")]
    pub initial_days: i64,

    #[schemars(description = "Spacing between successive cutoff dates")]
    pub period_days: i64,

    #[schemars(description = "Days forecast after each cutoff")]
    pub horizon_days: i64,

    #[schemars(description = "Minimum daily points required before cross-validation is attempted")]
    pub min_points: usize,
}

impl Default for CrossValidationConfig {
    fn default() -> Self {
        Self {
            initial_days: 15,
            period_days: 7,
            horizon_days: 7,
            min_points: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct ValidationConfig {
    pub backtest_test_days: i64,
    pub cross_validation: CrossValidationConfig,

    #[schemars(description = "A value is an outlier when it exceeds this multiple of its group mean")]
    pub outlier_multiplier: f64,

    #[schemars(description = "Trailing window used for current business metrics")]
    pub business_window_days: i64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            backtest_test_days: 14,
            cross_validation: CrossValidationConfig::default(),
            outlier_multiplier: 3.0,
            business_window_days: 30,
        }
    }
}

impl ValidationConfig {
    pub fn validate(&self) -> Result<()> {
        let cv = &self.cross_validation;
        if cv.initial_days <= 0 || cv.period_days <= 0 || cv.horizon_days <= 0 {
            return Err(ForecastError::InvalidConfig(
                "cross-validation initial, period and horizon must be positive".to_string(),
            ));
        }
        if u32::try_from(cv.horizon_days).is_err() {
            return Err(ForecastError::InvalidConfig(format!(
                "cross-validation horizon of {} days is too long",
                cv.horizon_days
            )));
        }
        if self.backtest_test_days <= 0 {
            return Err(ForecastError::InvalidConfig(
                "backtest_test_days must be positive".to_string(),
            ));
        }
        if u32::try_from(self.backtest_test_days).is_err() {
            return Err(ForecastError::InvalidConfig(format!(
                "backtest of {} days is too long",
                self.backtest_test_days
            )));
        }
        if self.business_window_days <= 0 {
            return Err(ForecastError::InvalidConfig(
                "business_window_days must be positive".to_string(),
            ));
        }
        if !(self.outlier_multiplier > 0.0) {
            return Err(ForecastError::InvalidConfig(
                "outlier_multiplier must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct ForecastConfig {
    pub model: ModelConfig,
    pub validation: ValidationConfig,
}

impl ForecastConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        self.model.validate()?;
        self.validation.validate()
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ForecastConfig)
    }
}

pub const DEFAULT_TABLE: &str = "daily_expenses";

/// Connection settings for the hosted record store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub url: String,
    pub api_key: String,
    pub table: String,
}

impl StoreConfig {
    /// Reads `SUPABASE_URL`, `SUPABASE_ANON_KEY` and optionally `SUPABASE_TABLE`.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("SUPABASE_URL")
            .map_err(|_| ForecastError::InvalidConfig("SUPABASE_URL is not set".to_string()))?;
        let api_key = std::env::var("SUPABASE_ANON_KEY").map_err(|_| {
            ForecastError::InvalidConfig("SUPABASE_ANON_KEY is not set".to_string())
        })?;
        let table = std::env::var("SUPABASE_TABLE").unwrap_or_else(|_| DEFAULT_TABLE.to_string());

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            api_key,
            table,
        })
    }
}
