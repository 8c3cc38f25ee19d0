use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QueryOrder, SqlErr, Statement, TransactionTrait,
};
use uuid::Uuid;

pub use error::LedgerError;
pub use money::MoneyCents;
pub use period::{Period, SeriesPoint};
pub use transactions::{Transaction, TransactionKind, TransactionPatch};

pub mod categories;
mod error;
mod locks;
mod money;
mod period;
pub mod transactions;
pub mod users;

type ResultLedger<T> = Result<T, LedgerError>;

/// Time filter for store reads: inclusive `from`, exclusive `to`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimeRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// The ledger accounting engine.
///
/// Balances are never cached: every admission decision recomputes the
/// balance from the durable ledger inside the same unit of work, so edits
/// and deletes can never leave a stale counter behind. The only mutable
/// state held here is the per-user admission lock registry.
#[derive(Debug)]
pub struct Ledger {
    database: DatabaseConnection,
    admissions: locks::UserLocks,
}

impl Ledger {
    /// Return a builder for `Ledger`. Help to build the struct.
    pub fn builder() -> LedgerBuilder {
        LedgerBuilder::default()
    }

    /// Records a new transaction for a user.
    ///
    /// Income is inserted unconditionally. An expense is admitted only if
    /// the user's current balance covers it; the balance read and the insert
    /// run as one atomic unit of work under the user's admission lock, so
    /// two concurrent expenses that would jointly overdraw can never both
    /// pass. A transient store failure is retried once with the same draft;
    /// if it persists the call fails with [`LedgerError::Unavailable`].
    pub async fn create_transaction(
        &self,
        user_id: &str,
        title: &str,
        amount_minor: i64,
        kind: TransactionKind,
        category_id: Option<Uuid>,
    ) -> ResultLedger<Transaction> {
        let tx = Transaction::new(title, amount_minor, kind, user_id, category_id, Utc::now())?;

        match self.admit(&tx).await {
            // Nothing was committed, so retrying the same draft is safe.
            Err(err) if is_transient(&err) => self.admit(&tx).await.map_err(|retry_err| {
                if is_transient(&retry_err) {
                    LedgerError::Unavailable(format!("admission failed twice: {retry_err}"))
                } else {
                    retry_err
                }
            }),
            other => other,
        }
    }

    async fn admit(&self, tx: &Transaction) -> ResultLedger<Transaction> {
        match tx.kind {
            TransactionKind::Income => {
                transactions::ActiveModel::from(tx)
                    .insert(&self.database)
                    .await
                    .map_err(reference_error)?;
                Ok(tx.clone())
            }
            TransactionKind::Expense => {
                let lock = self.admissions.lock_for(&tx.user_id);
                let _guard = lock.lock().await;
                self.insert_if_balance_holds(tx, 0).await
            }
        }
    }

    /// Conditionally inserts an expense, keeping the post-insert balance at
    /// or above `required_min_after`. Caller must hold the user's admission
    /// lock; the check and the insert share one database transaction so an
    /// early return rolls everything back.
    async fn insert_if_balance_holds(
        &self,
        tx: &Transaction,
        required_min_after: i64,
    ) -> ResultLedger<Transaction> {
        let db_tx = self.database.begin().await?;

        let balance = self.balance_on(&db_tx, &tx.user_id).await?;
        if balance - tx.amount_minor < required_min_after {
            return Err(LedgerError::InsufficientBalance(format!(
                "expense of {} exceeds balance {balance}",
                tx.amount_minor
            )));
        }

        transactions::ActiveModel::from(tx)
            .insert(&db_tx)
            .await
            .map_err(reference_error)?;
        db_tx.commit().await?;

        Ok(tx.clone())
    }

    /// Current balance for a user: all-time income minus all-time expenses.
    ///
    /// Reads outside an admission are approximations by design; only the
    /// copy computed inside [`Self::insert_if_balance_holds`] gates writes.
    pub async fn balance(&self, user_id: &str) -> ResultLedger<i64> {
        self.balance_on(&self.database, user_id).await
    }

    async fn balance_on<C: ConnectionTrait>(&self, conn: &C, user_id: &str) -> ResultLedger<i64> {
        let income = self
            .sum_amount(conn, user_id, TransactionKind::Income, TimeRange::default())
            .await?;
        let expenses = self
            .sum_amount(conn, user_id, TransactionKind::Expense, TimeRange::default())
            .await?;
        Ok(income - expenses)
    }

    /// All-time sum of a user's transactions of one kind.
    pub async fn sum_by_kind(&self, user_id: &str, kind: TransactionKind) -> ResultLedger<i64> {
        self.sum_amount(&self.database, user_id, kind, TimeRange::default())
            .await
    }

    /// Returns `(balance_minor, total_income_minor, total_expenses_minor)`.
    pub async fn statistics(&self, user_id: &str) -> ResultLedger<(i64, i64, i64)> {
        let income = self
            .sum_amount(
                &self.database,
                user_id,
                TransactionKind::Income,
                TimeRange::default(),
            )
            .await?;
        let expenses = self
            .sum_amount(
                &self.database,
                user_id,
                TransactionKind::Expense,
                TimeRange::default(),
            )
            .await?;
        Ok((income - expenses, income, expenses))
    }

    async fn sum_amount<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
        kind: TransactionKind,
        range: TimeRange,
    ) -> ResultLedger<i64> {
        let backend = self.database.get_database_backend();

        let mut sql = String::from(
            "SELECT COALESCE(SUM(amount_minor), 0) AS sum \
             FROM transactions \
             WHERE user_id = ? AND kind = ?",
        );
        let mut values: Vec<sea_orm::Value> = vec![user_id.into(), kind.as_str().into()];
        if let Some(from) = range.from {
            sql.push_str(" AND created_at >= ?");
            values.push(from.into());
        }
        if let Some(to) = range.to {
            sql.push_str(" AND created_at < ?");
            values.push(to.into());
        }

        let stmt = Statement::from_sql_and_values(backend, sql, values);
        let row = conn.query_one(stmt).await?;
        Ok(row.and_then(|r| r.try_get("", "sum").ok()).unwrap_or(0))
    }

    /// Gap-free income/expense series for the selected period, oldest
    /// bucket first.
    ///
    /// The canonical bucket labels are generated for the whole window
    /// before any data is consulted, then the fetched transactions are
    /// folded into them; empty buckets therefore show up as zeros instead
    /// of disappearing.
    pub async fn stats_by_period(
        &self,
        user_id: &str,
        period: Period,
    ) -> ResultLedger<Vec<SeriesPoint>> {
        let today = Utc::now().date_naive();
        let starts = period.bucket_starts(today);
        let Some(&first) = starts.first() else {
            return Ok(Vec::new());
        };

        let range = TimeRange {
            from: Some(period::start_of_day(first)),
            to: None,
        };
        let transactions = self.list_transactions(user_id, None, range).await?;

        Ok(period::fold_series(
            period,
            period.bucket_labels(today),
            &transactions,
        ))
    }

    /// Lists a user's transactions, newest first, optionally filtered by
    /// kind and creation-time range.
    pub async fn list_transactions(
        &self,
        user_id: &str,
        kind: Option<TransactionKind>,
        range: TimeRange,
    ) -> ResultLedger<Vec<Transaction>> {
        let mut query =
            transactions::Entity::find().filter(transactions::Column::UserId.eq(user_id));

        if let Some(kind) = kind {
            query = query.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        if let Some(from) = range.from {
            query = query.filter(transactions::Column::CreatedAt.gte(from));
        }
        if let Some(to) = range.to {
            query = query.filter(transactions::Column::CreatedAt.lt(to));
        }

        let models = query
            .order_by_desc(transactions::Column::CreatedAt)
            .all(&self.database)
            .await?;

        models.into_iter().map(Transaction::try_from).collect()
    }

    /// Returns a single transaction owned by `user_id`.
    pub async fn transaction(&self, user_id: &str, transaction_id: Uuid) -> ResultLedger<Transaction> {
        let model = transactions::Entity::find_by_id(transaction_id.to_string())
            .filter(transactions::Column::UserId.eq(user_id))
            .one(&self.database)
            .await?
            .ok_or_else(|| LedgerError::NotFound("transaction not exists".to_string()))?;

        Transaction::try_from(model)
    }

    /// Updates the title/amount/kind/category of an existing transaction.
    ///
    /// When the patch changes the row's signed effect on the balance (a new
    /// amount, or an income/expense flip), the invariant is re-validated
    /// under the same admission lock and database transaction used for
    /// expense creation, so an edit can never overdraw the user either.
    pub async fn update_transaction(
        &self,
        user_id: &str,
        transaction_id: Uuid,
        patch: TransactionPatch,
    ) -> ResultLedger<Transaction> {
        if let Some(amount_minor) = patch.amount_minor
            && amount_minor <= 0
        {
            return Err(LedgerError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }
        if let Some(title) = &patch.title
            && title.trim().is_empty()
        {
            return Err(LedgerError::InvalidTitle(
                "title must not be empty".to_string(),
            ));
        }

        let lock = self.admissions.lock_for(user_id);
        let _guard = lock.lock().await;

        let db_tx = self.database.begin().await?;

        let model = transactions::Entity::find_by_id(transaction_id.to_string())
            .filter(transactions::Column::UserId.eq(user_id))
            .one(&db_tx)
            .await?
            .ok_or_else(|| LedgerError::NotFound("transaction not exists".to_string()))?;
        let current = Transaction::try_from(model)?;

        let new_amount = patch.amount_minor.unwrap_or(current.amount_minor);
        let new_kind = patch.kind.unwrap_or(current.kind);

        let old_effect = current.signed_amount();
        let new_effect = new_kind.signed(new_amount);
        if new_effect < old_effect {
            let balance = self.balance_on(&db_tx, user_id).await?;
            if balance - old_effect + new_effect < 0 {
                return Err(LedgerError::InsufficientBalance(format!(
                    "update would overdraw balance {balance}"
                )));
            }
        }

        let now = Utc::now();
        let mut active = transactions::ActiveModel {
            id: ActiveValue::Set(transaction_id.to_string()),
            updated_at: ActiveValue::Set(now),
            ..Default::default()
        };
        if let Some(title) = &patch.title {
            active.title = ActiveValue::Set(title.clone());
        }
        if let Some(amount_minor) = patch.amount_minor {
            active.amount_minor = ActiveValue::Set(amount_minor);
        }
        if let Some(kind) = patch.kind {
            active.kind = ActiveValue::Set(kind.as_str().to_string());
        }
        if let Some(category_id) = patch.category_id {
            active.category_id = ActiveValue::Set(category_id.map(|id| id.to_string()));
        }
        active.update(&db_tx).await.map_err(reference_error)?;

        db_tx.commit().await?;

        Ok(Transaction {
            id: current.id,
            title: patch.title.unwrap_or(current.title),
            amount_minor: new_amount,
            kind: new_kind,
            user_id: current.user_id,
            category_id: patch.category_id.unwrap_or(current.category_id),
            created_at: current.created_at,
            updated_at: now,
        })
    }

    /// Deletes a transaction and returns it.
    ///
    /// No invariant re-check happens here: the removed row simply stops
    /// contributing to future balance and stats computations.
    pub async fn delete_transaction(
        &self,
        user_id: &str,
        transaction_id: Uuid,
    ) -> ResultLedger<Transaction> {
        let tx = self.transaction(user_id, transaction_id).await?;

        transactions::Entity::delete_by_id(transaction_id.to_string())
            .exec(&self.database)
            .await?;

        Ok(tx)
    }
}

/// Classifies store failures that are safe to retry: nothing has been
/// committed when the connection itself fails.
fn is_transient(err: &LedgerError) -> bool {
    matches!(
        err,
        LedgerError::Database(DbErr::Conn(_) | DbErr::ConnectionAcquire(_))
    )
}

/// Maps referential-integrity violations to `NotFound`: the core stores
/// user/category ids without validating them, so a missing referent only
/// surfaces here.
fn reference_error(err: DbErr) -> LedgerError {
    match err.sql_err() {
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
            LedgerError::NotFound("referenced user or category not exists".to_string())
        }
        _ => LedgerError::Database(err),
    }
}

/// The builder for `Ledger`
#[derive(Default)]
pub struct LedgerBuilder {
    database: DatabaseConnection,
}

impl LedgerBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> LedgerBuilder {
        self.database = db;
        self
    }

    /// Construct `Ledger`
    pub fn build(self) -> Ledger {
        Ledger {
            database: self.database,
            admissions: locks::UserLocks::default(),
        }
    }
}
