//! Transaction primitives.
//!
//! A `Transaction` is a single income or expense recorded for a user,
//! optionally filed under a category.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, DbErr, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{LedgerError, ResultLedger};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    /// The signed effect of an amount of this kind on the owner's balance.
    pub fn signed(self, amount_minor: i64) -> i64 {
        match self {
            Self::Income => amount_minor,
            Self::Expense => -amount_minor,
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(LedgerError::Database(DbErr::Type(format!(
                "invalid transaction kind: {other}"
            )))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub title: String,
    pub amount_minor: i64,
    pub kind: TransactionKind,
    pub user_id: String,
    pub category_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        title: &str,
        amount_minor: i64,
        kind: TransactionKind,
        user_id: &str,
        category_id: Option<Uuid>,
        created_at: DateTime<Utc>,
    ) -> ResultLedger<Self> {
        if amount_minor <= 0 {
            return Err(LedgerError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }
        if title.trim().is_empty() {
            return Err(LedgerError::InvalidTitle(
                "title must not be empty".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            amount_minor,
            kind,
            user_id: user_id.to_string(),
            category_id,
            created_at,
            updated_at: created_at,
        })
    }

    /// The signed effect of this transaction on the owner's balance.
    pub fn signed_amount(&self) -> i64 {
        self.kind.signed(self.amount_minor)
    }
}

/// Partial update for an existing transaction.
///
/// `category_id` uses a double option: `None` leaves the category untouched,
/// `Some(None)` clears it, `Some(Some(id))` re-files the transaction.
#[derive(Clone, Debug, Default)]
pub struct TransactionPatch {
    pub title: Option<String>,
    pub amount_minor: Option<i64>,
    pub kind: Option<TransactionKind>,
    pub category_id: Option<Option<Uuid>>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub title: String,
    pub amount_minor: i64,
    pub kind: String,
    pub user_id: String,
    pub category_id: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Categories,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            title: ActiveValue::Set(tx.title.clone()),
            amount_minor: ActiveValue::Set(tx.amount_minor),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            user_id: ActiveValue::Set(tx.user_id.clone()),
            category_id: ActiveValue::Set(tx.category_id.map(|id| id.to_string())),
            created_at: ActiveValue::Set(tx.created_at),
            updated_at: ActiveValue::Set(tx.updated_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| LedgerError::NotFound("transaction not exists".to_string()))?,
            title: model.title,
            amount_minor: model.amount_minor,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            user_id: model.user_id,
            category_id: model.category_id.and_then(|s| Uuid::parse_str(&s).ok()),
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_non_positive_amounts() {
        let err = Transaction::new(
            "Groceries",
            0,
            TransactionKind::Expense,
            "alice",
            None,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));

        let err = Transaction::new(
            "Groceries",
            -500,
            TransactionKind::Expense,
            "alice",
            None,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
    }

    #[test]
    fn new_rejects_blank_titles() {
        let err = Transaction::new("  ", 100, TransactionKind::Income, "alice", None, Utc::now())
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTitle(_)));
    }

    #[test]
    fn signed_amount_follows_kind() {
        let now = Utc::now();
        let income =
            Transaction::new("Salary", 1000, TransactionKind::Income, "alice", None, now).unwrap();
        let expense =
            Transaction::new("Lunch", 300, TransactionKind::Expense, "alice", None, now).unwrap();
        assert_eq!(income.signed_amount(), 1000);
        assert_eq!(expense.signed_amount(), -300);
    }

    #[test]
    fn kind_round_trips_through_storage_strings() {
        for kind in [TransactionKind::Income, TransactionKind::Expense] {
            assert_eq!(TransactionKind::try_from(kind.as_str()).unwrap(), kind);
        }
        assert!(TransactionKind::try_from("transfer").is_err());
    }
}
