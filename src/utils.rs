use chrono::{Duration, NaiveDate};

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Money is presented with two decimals.
pub fn round_money(value: f64) -> f64 {
    round_to(value, 2)
}

/// Percentages are presented with one decimal.
pub fn round_pct(value: f64) -> f64 {
    round_to(value, 1)
}

/// Formats an amount as `$1,234.56`, with a leading minus for negatives.
pub fn format_money(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}

/// Inclusive list of consecutive dates.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d <= end).collect()
}

/// `date` moved by `days`, or `None` outside the calendar chrono supports.
pub fn shift_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    Duration::try_days(days).and_then(|delta| date.checked_add_signed(delta))
}

/// The first date of a trailing window of `days` ending on `end`. The
/// window is inclusive on both ends. Windows reaching past the earliest
/// representable date start there.
pub fn window_start(end: NaiveDate, days: i64) -> NaiveDate {
    days.checked_neg()
        .and_then(|back| shift_days(end, back))
        .unwrap_or(NaiveDate::MIN)
}
