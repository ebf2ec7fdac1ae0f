use crate::classifier::{classify_all, Role};
use crate::schema::{Category, SeriesSelector, Transaction};
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One value per calendar date. Days without activity are absent, not zero.
pub type DailySeries = BTreeMap<NaiveDate, f64>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreparedSeries {
    pub net_cash_flow: DailySeries,
    pub total_revenue: DailySeries,
    pub total_expenses: DailySeries,
    /// Expense magnitudes only. Revenue booked under `other` is excluded.
    pub categories: BTreeMap<Category, DailySeries>,
}

impl PreparedSeries {
    /// `Profit` has no stored series; it is derived from the revenue and
    /// expense forecasts.
    pub fn select(&self, selector: SeriesSelector) -> Option<&DailySeries> {
        match selector {
            SeriesSelector::Revenue => Some(&self.total_revenue),
            SeriesSelector::Expenses => Some(&self.total_expenses),
            SeriesSelector::CashFlow => Some(&self.net_cash_flow),
            SeriesSelector::Profit => None,
        }
    }

    pub fn category(&self, category: Category) -> Option<&DailySeries> {
        self.categories.get(&category)
    }
}

pub fn prepare_series(transactions: &[Transaction]) -> PreparedSeries {
    let mut total_revenue = DailySeries::new();
    let mut total_expenses = DailySeries::new();
    let mut categories: BTreeMap<Category, DailySeries> =
        Category::ALL.iter().map(|c| (*c, DailySeries::new())).collect();

    for entry in classify_all(transactions) {
        let date = entry.transaction.date;
        match entry.role {
            Role::Revenue => {
                *total_revenue.entry(date).or_insert(0.0) += entry.magnitude;
            }
            Role::Expense => {
                *total_expenses.entry(date).or_insert(0.0) += entry.magnitude;
                if let Some(series) = categories.get_mut(&entry.transaction.category) {
                    *series.entry(date).or_insert(0.0) += entry.magnitude;
                }
            }
        }
    }

    let net_cash_flow = net_cash_flow(&total_revenue, &total_expenses);

    debug!(
        "Prepared {} revenue days, {} expense days, {} cash flow days from {} transactions",
        total_revenue.len(),
        total_expenses.len(),
        net_cash_flow.len(),
        transactions.len()
    );

    PreparedSeries {
        net_cash_flow,
        total_revenue,
        total_expenses,
        categories,
    }
}

/// Outer join on dates. A day missing from one side contributed nothing to
/// that side, so it counts as zero here.
pub fn net_cash_flow(revenue: &DailySeries, expenses: &DailySeries) -> DailySeries {
    let mut net = DailySeries::new();
    for date in revenue.keys().chain(expenses.keys()) {
        net.entry(*date).or_insert_with(|| {
            revenue.get(date).copied().unwrap_or(0.0) - expenses.get(date).copied().unwrap_or(0.0)
        });
    }
    net
}

/// Total expense magnitude per category over the whole slice.
pub fn category_breakdown(transactions: &[Transaction]) -> BTreeMap<Category, f64> {
    let mut totals = BTreeMap::new();
    for entry in classify_all(transactions) {
        if entry.role == Role::Expense {
            *totals.entry(entry.transaction.category).or_insert(0.0) += entry.magnitude;
        }
    }
    totals
}

/// Restricts a series to dates within `[start, end]`.
pub fn slice_series(series: &DailySeries, start: NaiveDate, end: NaiveDate) -> DailySeries {
    if end < start {
        return DailySeries::new();
    }
    series
        .range(start..=end)
        .map(|(d, v)| (*d, *v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn sample() -> Vec<Transaction> {
        vec![
            Transaction::new(d(1), 300.0, Category::Other),
            Transaction::new(d(1), 200.0, Category::Other),
            Transaction::new(d(1), 50.0, Category::Ingredients),
            Transaction::new(d(1), -20.0, Category::Other),
            Transaction::new(d(2), 40.0, Category::Utilities),
            Transaction::new(d(2), -15.0, Category::Supplies),
            Transaction::new(d(3), 400.0, Category::Other),
            Transaction::new(d(4), 0.0, Category::Other),
            Transaction::new(d(4), 0.0, Category::Equipment),
        ]
    }

    #[test]
    fn test_same_day_sums() {
        let prepared = prepare_series(&sample());
        assert_eq!(prepared.total_revenue.get(&d(1)), Some(&500.0));
        assert_eq!(prepared.total_expenses.get(&d(1)), Some(&70.0));
        assert_eq!(prepared.total_expenses.get(&d(2)), Some(&55.0));
    }

    #[test]
    fn test_gaps_are_absent_not_zero() {
        let prepared = prepare_series(&sample());
        assert!(prepared.total_revenue.get(&d(2)).is_none());
        assert!(prepared.total_expenses.get(&d(3)).is_none());
        assert!(prepared.total_revenue.get(&d(4)).is_none());
    }

    #[test]
    fn test_net_cash_flow_outer_join() {
        let prepared = prepare_series(&sample());
        assert_eq!(prepared.net_cash_flow.get(&d(1)), Some(&430.0));
        assert_eq!(prepared.net_cash_flow.get(&d(2)), Some(&-55.0));
        assert_eq!(prepared.net_cash_flow.get(&d(3)), Some(&400.0));
        // zero-amount equipment expense still creates an expense day
        assert_eq!(prepared.net_cash_flow.get(&d(4)), Some(&0.0));

        for (date, net) in &prepared.net_cash_flow {
            let rev = prepared.total_revenue.get(date).copied().unwrap_or(0.0);
            let exp = prepared.total_expenses.get(date).copied().unwrap_or(0.0);
            assert!((net - (rev - exp)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_revenue_plus_expenses_equals_classified_magnitudes() {
        let txs = sample();
        let prepared = prepare_series(&txs);
        for day in 1..=4 {
            let date = d(day);
            let magnitudes: f64 = classify_all(&txs)
                .iter()
                .filter(|e| e.transaction.date == date)
                .map(|e| e.magnitude)
                .sum();
            let rev = prepared.total_revenue.get(&date).copied().unwrap_or(0.0);
            let exp = prepared.total_expenses.get(&date).copied().unwrap_or(0.0);
            assert!((rev + exp - magnitudes).abs() < 1e-9);
        }
    }

    #[test]
    fn test_category_series_sum_to_total_expenses() {
        let prepared = prepare_series(&sample());
        for (date, total) in &prepared.total_expenses {
            let by_category: f64 = prepared
                .categories
                .values()
                .filter_map(|s| s.get(date))
                .sum();
            assert!((by_category - total).abs() < 1e-9, "date {}", date);
        }
    }

    #[test]
    fn test_other_category_excludes_revenue() {
        let prepared = prepare_series(&sample());
        let other = prepared.category(Category::Other).unwrap();
        assert_eq!(other.get(&d(1)), Some(&20.0));
        assert!(other.get(&d(3)).is_none());
    }

    #[test]
    fn test_select_profit_has_no_series() {
        let prepared = prepare_series(&sample());
        assert!(prepared.select(SeriesSelector::Profit).is_none());
        assert_eq!(
            prepared.select(SeriesSelector::CashFlow).unwrap().len(),
            prepared.net_cash_flow.len()
        );
    }

    #[test]
    fn test_category_breakdown() {
        let breakdown = category_breakdown(&sample());
        assert_eq!(breakdown.get(&Category::Ingredients), Some(&50.0));
        assert_eq!(breakdown.get(&Category::Other), Some(&20.0));
        assert_eq!(breakdown.get(&Category::Supplies), Some(&15.0));
    }

    #[test]
    fn test_slice_series() {
        let prepared = prepare_series(&sample());
        let sliced = slice_series(&prepared.net_cash_flow, d(2), d(3));
        assert_eq!(sliced.len(), 2);
        assert!(slice_series(&prepared.net_cash_flow, d(3), d(2)).is_empty());
    }
}
