use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Not enough data for {series}: need at least {required} points, found {found}")]
    InsufficientData {
        series: String,
        required: usize,
        found: usize,
    },

    #[error("Ratio is undefined: {0}")]
    UndefinedRatio(String),

    #[error("Record store unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Malformed transaction record: {0}")]
    MalformedRecord(String),

    #[error("No transactions found in the record store")]
    NoData,

    #[error("Model fitting failed: {0}")]
    ModelFit(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ForecastError {
    /// Advice shown to the end user. "No data yet", "not enough data",
    /// "model failed" and "store unreachable" each get their own wording.
    pub fn remediation(&self) -> &'static str {
        match self {
            Self::NoData => "No transactions recorded yet. Add some transactions and try again.",
            Self::InsufficientData { .. } => {
                "Not enough history to forecast. Keep recording daily transactions."
            }
            Self::UndefinedRatio(_) => {
                "A ratio could not be computed because its base is zero (e.g. no revenue)."
            }
            Self::UpstreamUnavailable(_) => {
                "The transaction store is unreachable. Check connectivity and credentials."
            }
            Self::MalformedRecord(_) => {
                "A stored transaction is missing required fields. Fix or remove the record."
            }
            Self::ModelFit(_) => {
                "Data is present but the forecasting model failed. Try a different horizon or series."
            }
            Self::InvalidInput(_) | Self::InvalidConfig(_) => "Check the request parameters.",
            Self::SerializationError(_) | Self::IoError(_) => "Internal error while handling data.",
        }
    }
}

#[cfg(feature = "supabase")]
impl From<reqwest::Error> for ForecastError {
    fn from(err: reqwest::Error) -> Self {
        Self::UpstreamUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ForecastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remediation_distinguishes_failure_kinds() {
        let no_data = ForecastError::NoData.remediation();
        let short = ForecastError::InsufficientData {
            series: "revenue".to_string(),
            required: 10,
            found: 3,
        }
        .remediation();
        let fit = ForecastError::ModelFit("singular".to_string()).remediation();
        let upstream = ForecastError::UpstreamUnavailable("timeout".to_string()).remediation();

        let all = [no_data, short, fit, upstream];
        for (i, a) in all.iter().enumerate() {
            for b in all.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_insufficient_data_message() {
        let err = ForecastError::InsufficientData {
            series: "total_revenue".to_string(),
            required: 10,
            found: 9,
        };
        assert_eq!(
            err.to_string(),
            "Not enough data for total_revenue: need at least 10 points, found 9"
        );
    }
}
