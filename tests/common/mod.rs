//! Seeded synthetic books for a small cafe, used as integration fixtures.

#![allow(dead_code)]

use cashflow_forecast::{Category, PaymentMethod, Transaction};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

const INGREDIENTS: [&str; 6] = [
    "coffee beans",
    "whole milk",
    "oat milk",
    "flour",
    "pastries",
    "syrup",
];
const SUPPLIES: [&str; 4] = ["coffee cups", "lids", "napkins", "cleaning supplies"];

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn payment(rng: &mut StdRng) -> PaymentMethod {
    if rng.gen_bool(0.6) {
        PaymentMethod::Card
    } else {
        PaymentMethod::Cash
    }
}

fn base_revenue(weekday: Weekday) -> Option<f64> {
    match weekday {
        Weekday::Mon => Some(750.0),
        Weekday::Tue => Some(780.0),
        Weekday::Wed => Some(800.0),
        Weekday::Thu => Some(820.0),
        Weekday::Fri => Some(850.0),
        Weekday::Sat => Some(600.0),
        Weekday::Sun => None,
    }
}

/// `days` of trading ending the day before `end`. Closed on Sundays. Rent is
/// booked the old way, as a negative amount in `other`; every other expense
/// is a positive amount in its own category.
pub fn cafe_books(seed: u64, days: i64, end: NaiveDate) -> Vec<Transaction> {
    let mut rng = StdRng::seed_from_u64(seed);
    let weather = Normal::new(1.0, 0.1).unwrap();
    let ingredient_cost = Normal::new(85.0, 25.0).unwrap();
    let supply_cost = Normal::new(35.0, 12.0).unwrap();
    let utility_cost = Normal::new(140.0, 35.0).unwrap();

    let start = end - Duration::days(days);
    let mut txs = Vec::new();

    for offset in 0..days {
        let date = start + Duration::days(offset);
        let Some(base) = base_revenue(date.weekday()) else {
            continue;
        };

        let impact: f64 = weather.sample(&mut rng);
        let daily = (base * impact.clamp(0.7, 1.3)).max(150.0);
        let splits = rng.gen_range(1..=4);
        for _ in 0..splits {
            let share = daily / splits as f64 * rng.gen_range(0.9..1.1);
            txs.push(
                Transaction::new(date, round_cents(share.max(10.0)), Category::Other)
                    .with_description("sales")
                    .with_payment_method(payment(&mut rng)),
            );
        }

        if rng.gen_bool(0.8) {
            for _ in 0..rng.gen_range(1..=3) {
                let cost: f64 = ingredient_cost.sample(&mut rng);
                let item = INGREDIENTS.choose(&mut rng).copied().unwrap_or("flour");
                txs.push(
                    Transaction::new(date, round_cents(cost.abs()), Category::Ingredients)
                        .with_description(item)
                        .with_payment_method(payment(&mut rng)),
                );
            }
        }

        if rng.gen_bool(0.5) {
            let cost: f64 = supply_cost.sample(&mut rng);
            let item = SUPPLIES.choose(&mut rng).copied().unwrap_or("lids");
            txs.push(
                Transaction::new(date, round_cents(cost.abs()), Category::Supplies)
                    .with_description(item)
                    .with_payment_method(payment(&mut rng)),
            );
        }

        if matches!(date.day(), 1 | 15) {
            let cost: f64 = utility_cost.sample(&mut rng);
            txs.push(
                Transaction::new(date, round_cents(cost.abs()), Category::Utilities)
                    .with_description("utility bill")
                    .with_payment_method(PaymentMethod::BankTransfer),
            );
        }

        if date.weekday() == Weekday::Mon {
            txs.push(
                Transaction::new(date, -450.0, Category::Other)
                    .with_description("weekly rent")
                    .with_payment_method(PaymentMethod::BankTransfer),
            );
        }
    }

    txs
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}
