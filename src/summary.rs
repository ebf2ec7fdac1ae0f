use crate::engine::{ForecastPoint, ForecastResult};
use crate::error::{ForecastError, Result};
use crate::schema::SeriesSelector;
use crate::utils::{format_money, round_money};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
}

impl TrendDirection {
    /// Strictly greater last value means increasing; a flat horizon reads as
    /// decreasing.
    pub fn between(first: f64, last: f64) -> Self {
        if last > first {
            TrendDirection::Increasing
        } else {
            TrendDirection::Decreasing
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Increasing => "increasing",
            TrendDirection::Decreasing => "decreasing",
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregates over the forecast horizon only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ForecastSummary {
    pub total_over_horizon: f64,
    pub daily_average: f64,
    pub trend_direction: TrendDirection,
    pub confidence_lower_total: f64,
    pub confidence_upper_total: f64,
    pub min_day: f64,
    pub max_day: f64,
}

impl ForecastSummary {
    /// Copy with every amount rounded to cents, for responses.
    pub fn rounded(&self) -> Self {
        Self {
            total_over_horizon: round_money(self.total_over_horizon),
            daily_average: round_money(self.daily_average),
            trend_direction: self.trend_direction,
            confidence_lower_total: round_money(self.confidence_lower_total),
            confidence_upper_total: round_money(self.confidence_upper_total),
            min_day: round_money(self.min_day),
            max_day: round_money(self.max_day),
        }
    }
}

pub fn summarize<F>(result: &ForecastResult<F>) -> Result<ForecastSummary> {
    summarize_points(result.future())
}

pub fn summarize_points(points: &[ForecastPoint]) -> Result<ForecastSummary> {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Err(ForecastError::InvalidInput(
            "cannot summarize an empty forecast horizon".to_string(),
        ));
    };

    let total: f64 = points.iter().map(|p| p.yhat).sum();
    let min_day = points.iter().map(|p| p.yhat).fold(f64::INFINITY, f64::min);
    let max_day = points
        .iter()
        .map(|p| p.yhat)
        .fold(f64::NEG_INFINITY, f64::max);

    Ok(ForecastSummary {
        total_over_horizon: total,
        daily_average: total / points.len() as f64,
        trend_direction: TrendDirection::between(first.yhat, last.yhat),
        confidence_lower_total: points.iter().map(|p| p.yhat_lower).sum(),
        confidence_upper_total: points.iter().map(|p| p.yhat_upper).sum(),
        min_day,
        max_day,
    })
}

/// A percentage that may have no value because its base is zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ratio {
    Defined(f64),
    Undefined,
}

impl Ratio {
    pub fn percent(numerator: f64, denominator: f64) -> Self {
        match ratio_pct(numerator, denominator) {
            Ok(value) => Ratio::Defined(value),
            Err(_) => Ratio::Undefined,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Ratio::Defined(v) => Some(*v),
            Ratio::Undefined => None,
        }
    }

    /// `false` when undefined, so an undefined ratio never passes a check.
    pub fn is_defined_and(&self, predicate: impl FnOnce(f64) -> bool) -> bool {
        self.value().is_some_and(predicate)
    }

    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            Ratio::Defined(v) => Ratio::Defined(f(v)),
            Ratio::Undefined => Ratio::Undefined,
        }
    }
}

impl Serialize for Ratio {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Ratio::Defined(v) => serializer.serialize_f64(*v),
            Ratio::Undefined => serializer.serialize_str("undefined"),
        }
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ratio::Defined(v) => write!(f, "{:.1}%", v),
            Ratio::Undefined => f.write_str("undefined"),
        }
    }
}

/// `numerator / denominator * 100`, refusing a zero or non-finite base.
pub fn ratio_pct(numerator: f64, denominator: f64) -> Result<f64> {
    if denominator == 0.0 || !denominator.is_finite() {
        return Err(ForecastError::UndefinedRatio(format!(
            "{} / {}",
            numerator, denominator
        )));
    }
    Ok(numerator / denominator * 100.0)
}

/// Profit and per-series insight lines for a set of horizon summaries.
pub fn generate_business_insights(
    summaries: &BTreeMap<SeriesSelector, ForecastSummary>,
    horizon_days: u32,
) -> Vec<String> {
    let mut insights = Vec::new();
    let revenue = summaries.get(&SeriesSelector::Revenue);
    let expenses = summaries.get(&SeriesSelector::Expenses);

    if let (Some(rev), Some(exp)) = (revenue, expenses) {
        let profit = rev.total_over_horizon - exp.total_over_horizon;
        let margin = Ratio::percent(profit, rev.total_over_horizon);
        insights.push(format!("Profit forecast (next {} days)", horizon_days));
        insights.push(format!(
            "  Projected revenue: {}",
            format_money(rev.total_over_horizon)
        ));
        insights.push(format!(
            "  Projected expenses: {}",
            format_money(exp.total_over_horizon)
        ));
        insights.push(format!("  Projected profit: {}", format_money(profit)));
        match margin {
            Ratio::Defined(_) => insights.push(format!("  Profit margin: {}", margin)),
            Ratio::Undefined => {
                insights.push("  Profit margin: undefined (no projected revenue)".to_string())
            }
        }
    }

    for (selector, label) in [
        (SeriesSelector::Expenses, "Expense"),
        (SeriesSelector::Revenue, "Revenue"),
    ] {
        if let Some(summary) = summaries.get(&selector) {
            insights.push(format!("{} forecast", label));
            insights.push(format!(
                "  Daily average: {}",
                format_money(summary.daily_average)
            ));
            insights.push(format!("  Trend: {}", summary.trend_direction));
            insights.push(format!(
                "  Confidence range: {} - {}",
                format_money(summary.confidence_lower_total),
                format_money(summary.confidence_upper_total)
            ));
        }
    }

    insights
}

/// The three insight lines returned with a single-metric forecast.
pub fn metric_insights(
    metric: SeriesSelector,
    summary: &ForecastSummary,
    horizon_days: u32,
) -> Vec<String> {
    let direction = match summary.trend_direction {
        TrendDirection::Increasing => format!("{} is trending upward", metric.title()),
        TrendDirection::Decreasing => {
            format!("{} is declining, consider adjustments", metric.title())
        }
    };
    vec![
        direction,
        format!(
            "Expected {}-day {}: {}",
            horizon_days,
            metric.as_str().replace('_', " "),
            format_money(summary.total_over_horizon)
        ),
        format!("Daily average: {}", format_money(summary.daily_average)),
    ]
}

pub fn recommendations(summaries: &BTreeMap<SeriesSelector, ForecastSummary>) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(exp) = summaries.get(&SeriesSelector::Expenses) {
        out.push(match exp.trend_direction {
            TrendDirection::Increasing => {
                "Expenses are trending upward, consider cost optimization".to_string()
            }
            TrendDirection::Decreasing => "Expenses are stable or decreasing".to_string(),
        });
    }
    if let Some(rev) = summaries.get(&SeriesSelector::Revenue) {
        out.push(match rev.trend_direction {
            TrendDirection::Increasing => "Revenue is growing".to_string(),
            TrendDirection::Decreasing => {
                "Revenue is declining, focus on sales and marketing".to_string()
            }
        });
    }
    out
}
