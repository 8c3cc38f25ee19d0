use std::error::Error;

use clap::{Args, Parser, Subcommand};
use ledger::{Ledger, MoneyCents, Period, TransactionKind, TransactionPatch};
use migration::MigratorTrait;
use sea_orm::{ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

mod settings;

#[derive(Parser, Debug)]
#[command(name = "libretto")]
#[command(about = "Personal income/expense ledger")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bootstrap reference user rows.
    User(User),
    /// Bootstrap category rows.
    Category(Category),
    /// Record an income.
    Income(EntryArgs),
    /// Record an expense.
    Expense(EntryArgs),
    /// Show the balance and all-time totals.
    Balance(UserArgs),
    /// Show the income/expense series for a period.
    Stats(StatsArgs),
    /// List transactions, newest first.
    List(ListArgs),
    /// Show a single transaction.
    Show(IdArgs),
    /// Update a transaction.
    Update(UpdateArgs),
    /// Delete a transaction.
    Delete(IdArgs),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    email: String,
}

#[derive(Args, Debug)]
struct Category {
    #[command(subcommand)]
    command: CategoryCommand,
}

#[derive(Subcommand, Debug)]
enum CategoryCommand {
    Create(CategoryCreateArgs),
}

#[derive(Args, Debug)]
struct CategoryCreateArgs {
    #[arg(long)]
    user: String,
    #[arg(long)]
    title: String,
}

#[derive(Args, Debug)]
struct EntryArgs {
    #[arg(long)]
    user: String,
    #[arg(long)]
    title: String,
    /// Amount in major units, e.g. `12.34` or `12,34`.
    #[arg(long)]
    amount: String,
    #[arg(long)]
    category: Option<Uuid>,
}

#[derive(Args, Debug)]
struct UserArgs {
    #[arg(long)]
    user: String,
}

#[derive(Args, Debug)]
struct StatsArgs {
    #[arg(long)]
    user: String,
    /// One of `week`, `month`, `year`.
    #[arg(long)]
    period: String,
}

#[derive(Args, Debug)]
struct ListArgs {
    #[arg(long)]
    user: String,
    /// Filter by kind: `income` or `expense`.
    #[arg(long)]
    kind: Option<String>,
}

#[derive(Args, Debug)]
struct IdArgs {
    #[arg(long)]
    user: String,
    #[arg(long)]
    id: Uuid,
}

#[derive(Args, Debug)]
struct UpdateArgs {
    #[arg(long)]
    user: String,
    #[arg(long)]
    id: Uuid,
    #[arg(long)]
    title: Option<String>,
    /// New amount in major units.
    #[arg(long)]
    amount: Option<String>,
    /// New kind: `income` or `expense`.
    #[arg(long)]
    kind: Option<String>,
    #[arg(long)]
    category: Option<Uuid>,
    /// Clear the category reference.
    #[arg(long, conflicts_with = "category")]
    clear_category: bool,
}

fn parse_kind(raw: &str) -> Result<TransactionKind, String> {
    match raw {
        "income" => Ok(TransactionKind::Income),
        "expense" => Ok(TransactionKind::Expense),
        other => Err(format!("unsupported kind: {other}")),
    }
}

fn api_kind(kind: TransactionKind) -> api_types::transaction::TransactionKind {
    match kind {
        TransactionKind::Income => api_types::transaction::TransactionKind::Income,
        TransactionKind::Expense => api_types::transaction::TransactionKind::Expense,
    }
}

fn core_kind(kind: api_types::transaction::TransactionKind) -> TransactionKind {
    match kind {
        api_types::transaction::TransactionKind::Income => TransactionKind::Income,
        api_types::transaction::TransactionKind::Expense => TransactionKind::Expense,
    }
}

fn api_period(period: Period) -> api_types::stats::Period {
    match period {
        Period::Week => api_types::stats::Period::Week,
        Period::Month => api_types::stats::Period::Month,
        Period::Year => api_types::stats::Period::Year,
    }
}

fn view(tx: &ledger::Transaction) -> api_types::transaction::TransactionView {
    api_types::transaction::TransactionView {
        id: tx.id,
        title: tx.title.clone(),
        amount_minor: tx.amount_minor,
        kind: api_kind(tx.kind),
        category_id: tx.category_id,
        created_at: tx.created_at,
        updated_at: tx.updated_at,
    }
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

async fn record(
    ledger: &Ledger,
    args: &EntryArgs,
    kind: api_types::transaction::TransactionKind,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let amount: MoneyCents = args.amount.parse()?;

    // The same wire shape a transport collaborator would deliver.
    let request = api_types::transaction::TransactionNew {
        title: args.title.clone(),
        amount_minor: amount.cents(),
        kind,
        category_id: args.category,
    };
    let tx = ledger
        .create_transaction(
            &args.user,
            &request.title,
            request.amount_minor,
            core_kind(request.kind),
            request.category_id,
        )
        .await?;

    println!("{}", serde_json::to_string_pretty(&view(&tx))?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = settings::Settings::new()?;

    let level = settings
        .app
        .as_ref()
        .map(|app| app.level.clone())
        .unwrap_or_else(|| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(format!("libretto={level},ledger={level}"))
        .init();

    let database_url = cli
        .database_url
        .or_else(|| {
            settings
                .sqlite
                .map(|sqlite| format!("sqlite:{}?mode=rwc", sqlite.path))
        })
        .unwrap_or_else(|| "sqlite:./libretto.db?mode=rwc".to_string());

    let db = match connect_db(&database_url).await {
        Ok(db) => db,
        Err(err) => {
            tracing::error!("failed to initialize database: {err}");
            std::process::exit(1);
        }
    };
    let ledger = Ledger::builder().database(db.clone()).build();

    if let Err(err) = run(cli.command, &db, &ledger).await {
        eprintln!("{err}");
        std::process::exit(1);
    }

    Ok(())
}

async fn run(
    command: Command,
    db: &DatabaseConnection,
    ledger: &Ledger,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    match command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let existing = ledger::users::Entity::find()
                .filter(ledger::users::Column::Email.eq(args.email.clone()))
                .one(db)
                .await?;
            if existing.is_some() {
                eprintln!("user already exists: {}", args.email);
                std::process::exit(1);
            }

            let id = Uuid::new_v4().to_string();
            let user = ledger::users::ActiveModel {
                id: Set(id.clone()),
                email: Set(args.email.clone()),
            };
            ledger::users::Entity::insert(user).exec(db).await?;

            println!("created user: {} ({id})", args.email);
        }
        Command::Category(Category {
            command: CategoryCommand::Create(args),
        }) => {
            if ledger::users::Entity::find_by_id(args.user.clone())
                .one(db)
                .await?
                .is_none()
            {
                eprintln!("user not found: {}", args.user);
                std::process::exit(1);
            }

            let id = Uuid::new_v4().to_string();
            let category = ledger::categories::ActiveModel {
                id: Set(id.clone()),
                title: Set(args.title.clone()),
                user_id: Set(args.user.clone()),
            };
            ledger::categories::Entity::insert(category).exec(db).await?;

            println!("created category: {} ({id})", args.title);
        }
        Command::Income(args) => {
            record(ledger, &args, api_types::transaction::TransactionKind::Income).await?;
        }
        Command::Expense(args) => {
            record(ledger, &args, api_types::transaction::TransactionKind::Expense).await?;
        }
        Command::Balance(args) => {
            let (balance_minor, total_income_minor, total_expenses_minor) =
                ledger.statistics(&args.user).await?;
            let statistic = api_types::stats::Statistic {
                balance_minor,
                total_income_minor,
                total_expenses_minor,
            };
            println!("{}", serde_json::to_string_pretty(&statistic)?);
        }
        Command::Stats(args) => {
            let period = Period::try_from(args.period.as_str())?;
            let series = ledger.stats_by_period(&args.user, period).await?;
            let response = api_types::stats::SeriesResponse {
                period: api_period(period),
                series: series
                    .into_iter()
                    .map(|point| api_types::stats::SeriesPoint {
                        bucket: point.bucket,
                        income_minor: point.income_minor,
                        expense_minor: point.expense_minor,
                    })
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::List(args) => {
            let kind = match args.kind.as_deref() {
                Some(raw) => Some(parse_kind(raw)?),
                None => None,
            };
            let transactions = ledger
                .list_transactions(&args.user, kind, ledger::TimeRange::default())
                .await?;
            let response = api_types::transaction::TransactionListResponse {
                transactions: transactions.iter().map(view).collect(),
            };
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Show(args) => {
            let tx = ledger.transaction(&args.user, args.id).await?;
            println!("{}", serde_json::to_string_pretty(&view(&tx))?);
        }
        Command::Update(args) => {
            let amount_minor = match args.amount.as_deref() {
                Some(raw) => Some(raw.parse::<MoneyCents>()?.cents()),
                None => None,
            };
            let kind = match args.kind.as_deref() {
                Some(raw) => Some(parse_kind(raw)?),
                None => None,
            };
            let category_id = if args.clear_category {
                Some(None)
            } else {
                args.category.map(Some)
            };

            // The same wire shape a transport collaborator would deliver.
            let request = api_types::transaction::TransactionUpdate {
                title: args.title,
                amount_minor,
                kind: kind.map(api_kind),
                category_id,
            };
            let patch = TransactionPatch {
                title: request.title,
                amount_minor: request.amount_minor,
                kind: request.kind.map(core_kind),
                category_id: request.category_id,
            };
            let tx = ledger.update_transaction(&args.user, args.id, patch).await?;
            println!("{}", serde_json::to_string_pretty(&view(&tx))?);
        }
        Command::Delete(args) => {
            let tx = ledger.delete_transaction(&args.user, args.id).await?;
            println!(
                "deleted transaction: {} ({})",
                tx.title,
                MoneyCents::new(tx.amount_minor)
            );
        }
    }

    Ok(())
}
