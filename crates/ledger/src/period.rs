//! Period windows and bucketing for the stats time series.
//!
//! A period selects a window ending today and a bucket granularity:
//!
//! | period | window                          | bucket |
//! |--------|---------------------------------|--------|
//! | week   | last 7 calendar days            | day    |
//! | month  | last 30 calendar days           | day    |
//! | year   | last 12 calendar months         | month  |
//!
//! The canonical bucket labels for the whole window are generated first,
//! independently of what data exists; fetched transactions are folded into
//! them afterwards. Buckets with no matching transactions stay at zero, so
//! the output is always gap-free and ordered oldest to newest.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{LedgerError, Transaction, TransactionKind};

/// Aggregation window selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Week,
    Month,
    Year,
}

impl Period {
    /// Number of buckets in the window.
    pub fn bucket_count(self) -> usize {
        match self {
            Self::Week => 7,
            Self::Month => 30,
            Self::Year => 12,
        }
    }

    /// Start dates of every bucket in the window, oldest first.
    ///
    /// Day buckets start on their calendar day, month buckets on the first
    /// of their month. The newest bucket always contains `today`.
    pub(crate) fn bucket_starts(self, today: NaiveDate) -> Vec<NaiveDate> {
        match self {
            Self::Week | Self::Month => (0..self.bucket_count() as u64)
                .rev()
                .filter_map(|back| today.checked_sub_days(Days::new(back)))
                .collect(),
            Self::Year => (0..self.bucket_count() as u32)
                .rev()
                .filter_map(|back| {
                    let (year, month) = months_back(today.year(), today.month(), back);
                    NaiveDate::from_ymd_opt(year, month, 1)
                })
                .collect(),
        }
    }

    /// Canonical bucket labels for the window, oldest first.
    pub(crate) fn bucket_labels(self, today: NaiveDate) -> Vec<String> {
        self.bucket_starts(today)
            .into_iter()
            .map(|start| self.label_of(start))
            .collect()
    }

    /// The label of the bucket a timestamp falls into.
    pub(crate) fn bucket_of(self, at: DateTime<Utc>) -> String {
        self.label_of(at.date_naive())
    }

    fn label_of(self, date: NaiveDate) -> String {
        match self {
            Self::Week | Self::Month => date.format("%Y-%m-%d").to_string(),
            Self::Year => date.format("%Y-%m").to_string(),
        }
    }
}

impl TryFrom<&str> for Period {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            other => Err(LedgerError::InvalidPeriod(format!(
                "unsupported period: {other}"
            ))),
        }
    }
}

/// One bucket of the aggregated series.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub bucket: String,
    pub income_minor: i64,
    pub expense_minor: i64,
}

/// Midnight UTC at the start of `date`.
pub(crate) fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Shift a 1-based `(year, month)` pair `back` months into the past.
fn months_back(year: i32, month: u32, back: u32) -> (i32, u32) {
    let total = year * 12 + month as i32 - 1 - back as i32;
    (total.div_euclid(12), (total.rem_euclid(12) + 1) as u32)
}

/// Folds fetched transactions into the canonical label set.
///
/// Transactions are grouped by the bucket their creation time falls into;
/// anything outside the label set is ignored. One point is emitted per
/// label, in label order, zero-filled where no data matched.
pub(crate) fn fold_series(
    period: Period,
    labels: Vec<String>,
    transactions: &[Transaction],
) -> Vec<SeriesPoint> {
    let mut totals: HashMap<String, (i64, i64)> = HashMap::new();
    for tx in transactions {
        let (income, expense) = totals.entry(period.bucket_of(tx.created_at)).or_default();
        match tx.kind {
            TransactionKind::Income => *income += tx.amount_minor,
            TransactionKind::Expense => *expense += tx.amount_minor,
        }
    }

    labels
        .into_iter()
        .map(|bucket| {
            let (income_minor, expense_minor) =
                totals.get(&bucket).copied().unwrap_or_default();
            SeriesPoint {
                bucket,
                income_minor,
                expense_minor,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn tx(amount_minor: i64, kind: TransactionKind, at: NaiveDate) -> Transaction {
        Transaction::new(
            "entry",
            amount_minor,
            kind,
            "alice",
            None,
            start_of_day(at) + chrono::Duration::hours(12),
        )
        .unwrap()
    }

    #[test]
    fn week_labels_cover_seven_days_ending_today() {
        let labels = Period::Week.bucket_labels(date(2026, 3, 15));
        assert_eq!(
            labels,
            vec![
                "2026-03-09",
                "2026-03-10",
                "2026-03-11",
                "2026-03-12",
                "2026-03-13",
                "2026-03-14",
                "2026-03-15",
            ]
        );
    }

    #[test]
    fn month_labels_cover_thirty_days_across_month_boundary() {
        let labels = Period::Month.bucket_labels(date(2026, 3, 15));
        assert_eq!(labels.len(), 30);
        assert_eq!(labels.first().map(String::as_str), Some("2026-02-14"));
        assert_eq!(labels.last().map(String::as_str), Some("2026-03-15"));
        let mut sorted = labels.clone();
        sorted.sort();
        assert_eq!(labels, sorted);
    }

    #[test]
    fn year_labels_cover_twelve_months_ending_current() {
        let labels = Period::Year.bucket_labels(date(2026, 3, 15));
        assert_eq!(labels.len(), 12);
        assert_eq!(labels.first().map(String::as_str), Some("2025-04"));
        assert_eq!(labels.last().map(String::as_str), Some("2026-03"));
    }

    #[test]
    fn year_labels_wrap_around_january() {
        let labels = Period::Year.bucket_labels(date(2026, 1, 10));
        assert_eq!(labels.first().map(String::as_str), Some("2025-02"));
        assert_eq!(labels.last().map(String::as_str), Some("2026-01"));
    }

    #[test]
    fn fold_zero_fills_buckets_without_data() {
        let labels = Period::Week.bucket_labels(date(2026, 3, 15));
        let series = fold_series(Period::Week, labels, &[]);
        assert_eq!(series.len(), 7);
        assert!(series
            .iter()
            .all(|point| point.income_minor == 0 && point.expense_minor == 0));
    }

    #[test]
    fn fold_accumulates_income_and_expense_per_bucket() {
        let today = date(2026, 3, 15);
        let transactions = vec![
            tx(5000, TransactionKind::Income, date(2026, 3, 12)),
            tx(2000, TransactionKind::Expense, date(2026, 3, 12)),
            tx(700, TransactionKind::Expense, date(2026, 3, 12)),
            tx(100, TransactionKind::Income, date(2026, 3, 15)),
        ];

        let series = fold_series(
            Period::Week,
            Period::Week.bucket_labels(today),
            &transactions,
        );

        let day = series.iter().find(|p| p.bucket == "2026-03-12").unwrap();
        assert_eq!(day.income_minor, 5000);
        assert_eq!(day.expense_minor, 2700);

        let today_point = series.iter().find(|p| p.bucket == "2026-03-15").unwrap();
        assert_eq!(today_point.income_minor, 100);
        assert_eq!(today_point.expense_minor, 0);

        let untouched = series
            .iter()
            .filter(|p| p.bucket != "2026-03-12" && p.bucket != "2026-03-15");
        assert!(untouched
            .into_iter()
            .all(|p| p.income_minor == 0 && p.expense_minor == 0));
    }

    #[test]
    fn fold_ignores_records_outside_the_window() {
        let today = date(2026, 3, 15);
        let transactions = vec![tx(9999, TransactionKind::Income, date(2026, 1, 1))];
        let series = fold_series(
            Period::Week,
            Period::Week.bucket_labels(today),
            &transactions,
        );
        assert!(series.iter().all(|p| p.income_minor == 0));
    }

    #[test]
    fn year_buckets_group_by_calendar_month() {
        let today = date(2026, 3, 15);
        let transactions = vec![
            tx(100, TransactionKind::Income, date(2025, 12, 3)),
            tx(250, TransactionKind::Income, date(2025, 12, 28)),
            tx(40, TransactionKind::Expense, date(2026, 3, 1)),
        ];
        let series = fold_series(
            Period::Year,
            Period::Year.bucket_labels(today),
            &transactions,
        );

        let december = series.iter().find(|p| p.bucket == "2025-12").unwrap();
        assert_eq!(december.income_minor, 350);
        let march = series.iter().find(|p| p.bucket == "2026-03").unwrap();
        assert_eq!(march.expense_minor, 40);
    }

    #[test]
    fn period_parses_known_selectors_only() {
        assert_eq!(Period::try_from("week").unwrap(), Period::Week);
        assert_eq!(Period::try_from("month").unwrap(), Period::Month);
        assert_eq!(Period::try_from("year").unwrap(), Period::Year);

        let err = Period::try_from("decade").unwrap_err();
        assert!(matches!(err, LedgerError::InvalidPeriod(_)));
    }

    #[test]
    fn months_back_wraps_years() {
        assert_eq!(months_back(2026, 1, 11), (2025, 2));
        assert_eq!(months_back(2026, 3, 0), (2026, 3));
        assert_eq!(months_back(2026, 3, 11), (2025, 4));
        assert_eq!(months_back(2026, 12, 24), (2024, 12));
    }
}
