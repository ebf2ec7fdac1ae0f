mod common;

use cashflow_forecast::*;
use chrono::Duration;
use common::{cafe_books, date};

#[test]
fn test_single_spike_does_not_shift_the_forecast() {
    let start = date(2024, 2, 1);
    let mut transactions: Vec<Transaction> = (0..40)
        .map(|d| Transaction::new(start + Duration::days(d), 500.0, Category::Other))
        .collect();
    transactions.push(Transaction::new(
        start + Duration::days(20),
        5000.0,
        Category::Other,
    ));

    let prepared = prepare_series(&transactions);
    assert_eq!(
        prepared.total_revenue.get(&(start + Duration::days(20))),
        Some(&5500.0)
    );

    let engine = ForecastEngine::default();
    let first = engine.forecast(&prepared.total_revenue, 7).unwrap();
    for point in first.future() {
        assert!(
            (point.yhat - 500.0).abs() <= 100.0,
            "forecast {} on {} is more than 20% away from 500",
            point.yhat,
            point.date
        );
    }
    assert!(first.model.final_growth_per_day().abs() < 0.5);

    let month = engine.forecast(&prepared.total_revenue, 30).unwrap();
    for point in month.future() {
        assert!(
            (point.yhat - 500.0).abs() <= 25.0,
            "forecast {} on {} drifted from 500",
            point.yhat,
            point.date
        );
    }

    let second = engine.forecast(&prepared.total_revenue, 7).unwrap();
    assert_eq!(
        summarize(&first).unwrap().trend_direction,
        summarize(&second).unwrap().trend_direction
    );
}

#[test]
fn test_mixed_sign_conventions_aggregate_consistently() {
    let transactions = cafe_books(7, 90, date(2024, 6, 1));
    let prepared = prepare_series(&transactions);

    // rent is a negative `other` amount, so it must land in expenses
    let rent_days = transactions
        .iter()
        .filter(|t| t.category == Category::Other && t.amount < 0.0)
        .count();
    assert!(rent_days > 10);

    for (day, net) in &prepared.net_cash_flow {
        let rev = prepared.total_revenue.get(day).copied().unwrap_or(0.0);
        let exp = prepared.total_expenses.get(day).copied().unwrap_or(0.0);
        assert!((net - (rev - exp)).abs() < 1e-6);
    }

    let total_by_category: f64 = category_breakdown(&transactions).values().sum();
    let total_expenses: f64 = prepared.total_expenses.values().sum();
    assert!((total_by_category - total_expenses).abs() < 1e-6);
}

#[test]
fn test_forecasts_are_reproducible() {
    let transactions = cafe_books(11, 120, date(2024, 5, 1));
    let prepared = prepare_series(&transactions);
    let engine = ForecastEngine::default();

    let a = engine.forecast(&prepared.net_cash_flow, 30).unwrap();
    let b = engine.forecast(&prepared.net_cash_flow, 30).unwrap();
    assert_eq!(a.predictions, b.predictions);

    let widths: Vec<f64> = a.future().iter().map(|p| p.interval_width()).collect();
    for pair in widths.windows(2) {
        assert!(pair[1] >= pair[0] - 1e-9);
    }
}

#[test]
fn test_validation_report_on_cafe_books() {
    let transactions = cafe_books(42, 120, date(2024, 4, 1));
    let report = Validator::default().generate_report(&transactions).unwrap();

    assert_eq!(report.data_quality.record_count, transactions.len());
    assert_eq!(report.data_quality.missing_value_count, 0);
    assert_eq!(report.data_quality_verdict, "GOOD");

    let backtest = report.backtest.as_ref().expect("backtest should run");
    assert!(!backtest.comparison.is_empty());
    assert_eq!(backtest.accuracy_tier, accuracy_tier(backtest.mape_pct));

    let cv = report
        .cross_validation
        .as_ref()
        .expect("cross-validation should run");
    assert!(cv.folds.len() >= 5);

    assert_eq!(report.confidence_score % 25, 0);
    assert_eq!(report.confidence_score, report.confidence_checks.score());
    assert_eq!(report.recommendations.len(), 3);
    assert_eq!(report.recommendations[2], "Sufficient data for reliable forecasting");
    // closed on Sundays
    assert_eq!(report.weekly_pattern.len(), 6);
    assert_eq!(report.weekly_pattern[0].weekday, "Monday");
    assert!(report.weekly_pattern.iter().all(|d| d.weekday != "Sunday"));

    let json = report.to_presentation_json().unwrap();
    assert!(json["backtest"]["mae"].is_number());
    assert!(json["confidence_level"].is_string());
    assert!(json["cross_validation"]["averages"]["rmse"].is_number());
}

#[test]
fn test_validation_report_omits_cross_validation_on_short_books() {
    let transactions = cafe_books(3, 30, date(2024, 4, 1));
    let report = Validator::default().generate_report(&transactions).unwrap();
    assert!(report.cross_validation.is_none());

    let json = report.to_presentation_json().unwrap();
    assert!(json["cross_validation"].is_null());
}

#[tokio::test]
async fn test_service_round_trip_through_store() -> anyhow::Result<()> {
    let store = InMemoryStore::new();
    let books = cafe_books(5, 100, date(2024, 7, 1));
    let written = store.insert_batch(&books).await?;
    assert_eq!(written, books.len());

    let service = ForecastService::new(store, ForecastConfig::default())?;

    for period in [ForecastPeriod::Week, ForecastPeriod::Month, ForecastPeriod::Quarter] {
        for metric in [
            SeriesSelector::Revenue,
            SeriesSelector::Expenses,
            SeriesSelector::Profit,
            SeriesSelector::CashFlow,
        ] {
            let response = service.forecast(&ForecastRequest::new(metric, period)).await?;
            assert_eq!(response.forecast_data.len(), period.days() as usize);
            assert_eq!(response.business_insights.len(), 3);
            assert!(response.forecast_data.windows(2).all(|w| w[0].date < w[1].date));
        }
    }

    let comprehensive = service.comprehensive_forecast(30).await?;
    assert_eq!(comprehensive.summaries.len(), 3);
    assert!(comprehensive
        .insights
        .iter()
        .any(|line| line.starts_with("Profit forecast")));

    let current = service.current_metrics().await?;
    assert!(current.revenue > 0.0);
    assert!(current.expenses > 0.0);
    assert!((current.profit - (current.revenue - current.expenses)).abs() < 0.011);
    Ok(())
}

#[tokio::test]
async fn test_service_errors_carry_remediation() {
    let service = ForecastService::new(InMemoryStore::new(), ForecastConfig::default()).unwrap();
    let err = service
        .forecast(&ForecastRequest::new(SeriesSelector::Revenue, ForecastPeriod::Week))
        .await
        .unwrap_err();
    assert!(matches!(err, ForecastError::NoData));
    assert!(err.remediation().contains("No transactions"));
}
