use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use clap::Subcommand;
use serde::Serialize;
use serde_json::{Value, json};
use shelf::catalog::Catalog;
use shelf::loader::load_seed_file;
use shelf::store::CatalogStore;
use shelf::types::{BookId, BookUpdate, NewBook, TransactionId, User, UserId};
use shelf_config::shared::ShelfConfig;

/// Catalog commands available on the command line.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ingest a seed document, skipping books and users that already exist.
    ///
    /// Uses the configured `seed_file` when no file is given.
    Seed { file: Option<PathBuf> },

    /// Catalog a new book.
    AddBook {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: String,
        #[arg(long)]
        isbn: String,
    },

    /// Change the metadata of a book. Omitted fields are kept.
    UpdateBook {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        isbn: Option<String>,
    },

    /// Remove a book that is not on loan.
    RemoveBook {
        #[arg(long)]
        id: i64,
    },

    /// Register a new user.
    AddUser {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        contact: String,
    },

    /// Remove a user without open loans. Their past transactions are kept.
    RemoveUser {
        #[arg(long)]
        id: i64,
    },

    /// Look up a book by id or by ISBN.
    Book {
        #[arg(long, conflicts_with = "isbn", required_unless_present = "isbn")]
        id: Option<i64>,
        #[arg(long)]
        isbn: Option<String>,
    },

    /// Look up a user.
    User {
        #[arg(long)]
        id: i64,
    },

    /// List the transactions of a user, oldest first.
    Loans {
        #[arg(long)]
        user: i64,
    },

    /// List the books currently available.
    Available,

    /// Lend a book to a user.
    Borrow {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        book: i64,
    },

    /// Close a loan and make its book available again.
    Return {
        #[arg(long)]
        transaction: i64,
    },

    /// List the transactions dated within a range, both bounds inclusive.
    ///
    /// Bounds are RFC 3339 timestamps or plain dates; a plain end date covers the whole day.
    Report {
        #[arg(long, value_parser = parse_range_start)]
        start: DateTime<Utc>,
        #[arg(long, value_parser = parse_range_end)]
        end: DateTime<Utc>,
    },

    /// Compare the in-memory index with the store.
    Check {
        /// Rebuild the index from the store when they disagree.
        #[arg(long)]
        repair: bool,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Seed { .. } => "seed",
            Command::AddBook { .. } => "add-book",
            Command::UpdateBook { .. } => "update-book",
            Command::RemoveBook { .. } => "remove-book",
            Command::AddUser { .. } => "add-user",
            Command::RemoveUser { .. } => "remove-user",
            Command::Book { .. } => "book",
            Command::User { .. } => "user",
            Command::Loans { .. } => "loans",
            Command::Available => "available",
            Command::Borrow { .. } => "borrow",
            Command::Return { .. } => "return",
            Command::Report { .. } => "report",
            Command::Check { .. } => "check",
        }
    }

    pub fn is_seed(&self) -> bool {
        matches!(self, Command::Seed { .. })
    }

    /// Runs the command against `catalog` and returns its JSON result.
    pub async fn run<S>(
        self,
        catalog: &mut Catalog<S>,
        config: &ShelfConfig,
    ) -> anyhow::Result<Value>
    where
        S: CatalogStore,
    {
        let output = match self {
            Command::Seed { file } => {
                let path = file
                    .or_else(|| config.seed_file.clone())
                    .context("no seed file given and none configured")?;
                let seed = load_seed_file(&path)
                    .await
                    .with_context(|| format!("failed to load seed file `{}`", path.display()))?;

                to_json(catalog.ingest(seed).await?)?
            }
            Command::AddBook {
                id,
                title,
                author,
                isbn,
            } => to_json(
                catalog
                    .add_book(NewBook::new(BookId::new(id), title, author, isbn))
                    .await?,
            )?,
            Command::UpdateBook {
                id,
                title,
                author,
                isbn,
            } => {
                let update = BookUpdate {
                    title,
                    author,
                    isbn,
                };

                to_json(catalog.update_book(BookId::new(id), update).await?)?
            }
            Command::RemoveBook { id } => to_json(catalog.remove_book(BookId::new(id)).await?)?,
            Command::AddUser { id, name, contact } => to_json(
                catalog
                    .add_user(User::new(UserId::new(id), name, contact))
                    .await?,
            )?,
            Command::RemoveUser { id } => to_json(catalog.remove_user(UserId::new(id)).await?)?,
            Command::Book { id, isbn } => {
                let book = match (id, isbn) {
                    (Some(id), _) => catalog.lookup_book_by_id(BookId::new(id)),
                    (None, Some(isbn)) => catalog.lookup_book_by_isbn(&isbn),
                    (None, None) => None,
                };

                to_json(book)?
            }
            Command::User { id } => to_json(catalog.lookup_user_by_id(UserId::new(id)))?,
            Command::Loans { user } => to_json(catalog.transactions_for_user(UserId::new(user)))?,
            Command::Available => to_json(catalog.available_books())?,
            Command::Borrow { user, book } => to_json(
                catalog
                    .borrow(UserId::new(user), BookId::new(book))
                    .await?,
            )?,
            Command::Return { transaction } => {
                to_json(catalog.return_book(TransactionId::new(transaction)).await?)?
            }
            Command::Report { start, end } => {
                anyhow::ensure!(start <= end, "report start {start} is after its end {end}");

                to_json(catalog.transactions_in_range(start, end).await?)?
            }
            Command::Check { repair } => match catalog.check_consistency().await {
                Ok(()) => json!({ "consistent": true }),
                Err(err) if repair => {
                    catalog.rebuild_index().await?;
                    json!({ "consistent": false, "repaired": true, "detail": err.detail() })
                }
                Err(err) => return Err(err.into()),
            },
        };

        Ok(output)
    }
}

fn to_json<T: Serialize>(value: T) -> anyhow::Result<Value> {
    Ok(serde_json::to_value(value)?)
}

fn parse_range_start(value: &str) -> Result<DateTime<Utc>, String> {
    parse_instant(value, |date| date.and_hms_opt(0, 0, 0))
}

fn parse_range_end(value: &str) -> Result<DateTime<Utc>, String> {
    parse_instant(value, |date| date.and_hms_nano_opt(23, 59, 59, 999_999_999))
}

/// Parses an RFC 3339 timestamp, or a `YYYY-MM-DD` date placed in the day by `time_of_day`.
fn parse_instant(
    value: &str,
    time_of_day: impl FnOnce(NaiveDate) -> Option<chrono::NaiveDateTime>,
) -> Result<DateTime<Utc>, String> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(time_of_day)
        .map(|instant| instant.and_utc())
        .ok_or_else(|| format!("`{value}` is neither an RFC 3339 timestamp nor a YYYY-MM-DD date"))
}
