use crate::config::ModelConfig;
use crate::error::{ForecastError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct SeasonalComponent {
    pub name: String,

    #[schemars(description = "Cycle length in days. May be fractional, e.g. 30.5 for a month.")]
    pub period_days: f64,

    #[schemars(description = "Number of sine/cosine pairs used to shape the cycle")]
    pub fourier_order: usize,
}

impl SeasonalComponent {
    pub fn new(name: impl Into<String>, period_days: f64, fourier_order: usize) -> Self {
        Self {
            name: name.into(),
            period_days,
            fourier_order,
        }
    }

    pub fn daily() -> Self {
        Self::new("daily", 1.0, 4)
    }

    pub fn weekly() -> Self {
        Self::new("weekly", 7.0, 3)
    }

    pub fn monthly() -> Self {
        Self::new("monthly", 30.5, 5)
    }

    pub fn yearly() -> Self {
        Self::new("yearly", 365.25, 10)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.period_days > 0.0) {
            return Err(ForecastError::InvalidConfig(format!(
                "Seasonality '{}' must have a positive period (got {})",
                self.name, self.period_days
            )));
        }
        if self.fourier_order == 0 {
            return Err(ForecastError::InvalidConfig(format!(
                "Seasonality '{}' must have a Fourier order of at least 1",
                self.name
            )));
        }
        Ok(())
    }

    /// Appends `2 * fourier_order` features for time `t_days` (days since
    /// the epoch used by the model).
    pub fn push_features(&self, t_days: f64, out: &mut Vec<f64>) {
        for k in 1..=self.fourier_order {
            let angle = 2.0 * PI * k as f64 * t_days / self.period_days;
            out.push(angle.sin());
            out.push(angle.cos());
        }
    }

    pub fn feature_count(&self) -> usize {
        2 * self.fourier_order
    }
}

/// Built-in components switched on by the config, then the extra ones.
pub fn active_components(config: &ModelConfig) -> Vec<SeasonalComponent> {
    let mut components = Vec::new();
    if config.daily_seasonality {
        components.push(SeasonalComponent::daily());
    }
    if config.weekly_seasonality {
        components.push(SeasonalComponent::weekly());
    }
    if config.yearly_seasonality {
        components.push(SeasonalComponent::yearly());
    }
    components.extend(config.extra_seasonalities.iter().cloned());
    components
}

pub fn feature_row(components: &[SeasonalComponent], t_days: f64) -> Vec<f64> {
    let mut row = Vec::with_capacity(components.iter().map(|c| c.feature_count()).sum());
    for component in components {
        component.push_features(t_days, &mut row);
    }
    row
}

/// Indices of columns that vary over the given rows. A column that is
/// constant carries no seasonal information, e.g. daily terms sampled once
/// per day.
pub fn informative_columns(rows: &[Vec<f64>]) -> Vec<usize> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    (0..first.len())
        .filter(|&j| {
            let (min, max) = rows.iter().fold((f64::MAX, f64::MIN), |(lo, hi), r| {
                (lo.min(r[j]), hi.max(r[j]))
            });
            max - min > 1e-8
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_components() {
        let components = active_components(&ModelConfig::default());
        let names: Vec<&str> = components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["daily", "weekly", "monthly"]);
    }

    #[test]
    fn test_feature_count() {
        let components = active_components(&ModelConfig::default());
        let row = feature_row(&components, 3.0);
        assert_eq!(row.len(), 8 + 6 + 10);
    }

    #[test]
    fn test_weekly_features_repeat_every_seven_days() {
        let weekly = vec![SeasonalComponent::weekly()];
        let a = feature_row(&weekly, 2.0);
        let b = feature_row(&weekly, 9.0);
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_daily_columns_are_uninformative_on_whole_days() {
        let components = vec![SeasonalComponent::daily(), SeasonalComponent::weekly()];
        let rows: Vec<Vec<f64>> = (0..14).map(|t| feature_row(&components, t as f64)).collect();
        let keep = informative_columns(&rows);
        assert!(keep.iter().all(|&j| j >= 8));
        assert_eq!(keep.len(), 6);
    }

    #[test]
    fn test_invalid_component() {
        assert!(SeasonalComponent::new("bad", 0.0, 3).validate().is_err());
        assert!(SeasonalComponent::new("bad", 7.0, 0).validate().is_err());
        assert!(SeasonalComponent::monthly().validate().is_ok());
    }
}
