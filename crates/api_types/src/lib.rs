use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Income,
        Expense,
    }

    /// Request body for recording a transaction.
    ///
    /// The owning user comes from the authentication context, never from the
    /// payload.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub title: String,
        /// Must be > 0. The kind defines the sign of the balance effect.
        pub amount_minor: i64,
        pub kind: TransactionKind,
        pub category_id: Option<Uuid>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub title: String,
        pub amount_minor: i64,
        pub kind: TransactionKind,
        pub category_id: Option<Uuid>,
        /// RFC3339 UTC timestamp, assigned at insert and immutable.
        pub created_at: DateTime<Utc>,
        /// RFC3339 UTC timestamp, refreshed on every update.
        pub updated_at: DateTime<Utc>,
    }

    /// Partial update for an existing transaction.
    ///
    /// `category_id` distinguishes three states: absent leaves the category
    /// untouched, `null` clears it, a value re-files the transaction.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionUpdate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub amount_minor: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub kind: Option<TransactionKind>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub category_id: Option<Option<Uuid>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
    }
}

pub mod stats {
    use super::*;

    /// Aggregation window selector for the stats endpoint.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Period {
        Week,
        Month,
        Year,
    }

    /// Point-in-time balance summary.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct Statistic {
        pub balance_minor: i64,
        pub total_income_minor: i64,
        pub total_expenses_minor: i64,
    }

    /// One bucket of the aggregated series.
    ///
    /// `bucket` is a calendar date (`YYYY-MM-DD`) for day granularity or a
    /// calendar month (`YYYY-MM`) for month granularity.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct SeriesPoint {
        pub bucket: String,
        pub income_minor: i64,
        pub expense_minor: i64,
    }

    /// Response body for the period stats endpoint: one point per bucket of
    /// the window, oldest first, zero-filled where the user had no activity.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct SeriesResponse {
        pub period: Period,
        pub series: Vec<SeriesPoint>,
    }
}
