use std::str::FromStr;

use chrono::{DateTime, Utc};
use shelf_config::shared::SqliteStoreConfig;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::bail;
use crate::error::{CatalogError, CatalogResult, ErrorKind};
use crate::failpoints::{
    CLOSE_LOAN__BEFORE_BOOK_UPDATE, OPEN_LOAN__BEFORE_RECORD, shelf_fail_point,
};
use crate::store::base::CatalogStore;
use crate::types::{
    Book, BookId, BookUpdate, NewBook, NewTransaction, Transaction, TransactionId,
    TransactionStatus, User, UserId,
};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const TRANSACTION_COLUMNS: &str = "transaction_id, user_id, book_id, transaction_type, \
    transaction_date, return_date, status";

#[derive(Debug, FromRow)]
struct BookRow {
    book_id: i64,
    title: String,
    author: String,
    isbn: String,
    is_available: bool,
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        Book {
            book_id: BookId::new(row.book_id),
            title: row.title,
            author: row.author,
            isbn: row.isbn,
            is_available: row.is_available,
        }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    user_id: i64,
    name: String,
    contact_details: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User::new(UserId::new(row.user_id), row.name, row.contact_details)
    }
}

#[derive(Debug, FromRow)]
struct TransactionRow {
    transaction_id: i64,
    user_id: i64,
    book_id: i64,
    transaction_type: String,
    transaction_date: DateTime<Utc>,
    return_date: DateTime<Utc>,
    status: String,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = CatalogError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Transaction {
            transaction_id: TransactionId::new(row.transaction_id),
            user_id: UserId::new(row.user_id),
            book_id: BookId::new(row.book_id),
            transaction_type: row.transaction_type.parse()?,
            transaction_date: row.transaction_date,
            return_date: row.return_date,
            status: row.status.parse()?,
        })
    }
}

/// SQLite-backed catalog store.
///
/// All statements run over a single pooled connection, so writes are serialized and an
/// in-memory database lives exactly as long as the store. Timestamps are written as RFC 3339
/// text in UTC, which sorts chronologically and keeps range queries on the `transaction_date`
/// index.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens the database file described by `config` and applies pending migrations.
    pub async fn connect(config: &SqliteStoreConfig) -> CatalogResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(config.create_if_missing)
            .foreign_keys(false);

        info!(path = %config.path.display(), "opening sqlite catalog store");

        Self::connect_with(options).await
    }

    /// Opens a private in-memory database. Its content is gone once the store is closed.
    pub async fn connect_in_memory() -> CatalogResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(false);

        Self::connect_with(options).await
    }

    async fn connect_with(options: SqliteConnectOptions) -> CatalogResult<Self> {
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|err| {
                CatalogError::from((
                    ErrorKind::StoreConnectionFailed,
                    "Failed to open the sqlite database",
                    err.to_string(),
                ))
                .with_source(err)
            })?;

        MIGRATOR.run(&pool).await?;
        debug!("catalog migrations applied");

        Ok(Self { pool })
    }
}

async fn insert_transaction(
    connection: &mut SqliteConnection,
    transaction: &NewTransaction,
) -> CatalogResult<Transaction> {
    let result = sqlx::query(
        r#"
        insert into transactions (user_id, book_id, transaction_type, transaction_date, return_date, status)
        values ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(transaction.user_id.into_inner())
    .bind(transaction.book_id.into_inner())
    .bind(transaction.transaction_type.as_static_str())
    .bind(transaction.transaction_date)
    .bind(transaction.return_date)
    .bind(transaction.status.as_static_str())
    .execute(&mut *connection)
    .await?;

    let transaction_id = TransactionId::new(result.last_insert_rowid());

    Ok(transaction.clone().into_transaction(transaction_id))
}

impl CatalogStore for SqliteStore {
    async fn load_books(&self) -> CatalogResult<Vec<Book>> {
        let rows: Vec<BookRow> = sqlx::query_as(
            r#"
            select book_id, title, author, isbn, is_available
            from books
            order by book_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Book::from).collect())
    }

    async fn load_users(&self) -> CatalogResult<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(
            r#"
            select user_id, name, contact_details
            from users
            order by user_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn load_transactions(&self) -> CatalogResult<Vec<Transaction>> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            "select {TRANSACTION_COLUMNS} from transactions order by transaction_id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Transaction::try_from).collect()
    }

    async fn put_book(&self, book: &NewBook) -> CatalogResult<Book> {
        sqlx::query(
            r#"
            insert into books (book_id, title, author, isbn, is_available)
            values ($1, $2, $3, $4, 1)
            "#,
        )
        .bind(book.book_id.into_inner())
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .execute(&self.pool)
        .await?;

        Ok(book.clone().into_book())
    }

    async fn delete_book(&self, book_id: BookId) -> CatalogResult<()> {
        let result = sqlx::query("delete from books where book_id = $1")
            .bind(book_id.into_inner())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            bail!(ErrorKind::NotFound, "Book not found", format!("book_id={book_id}"));
        }

        Ok(())
    }

    async fn update_book(&self, book_id: BookId, update: &BookUpdate) -> CatalogResult<Book> {
        let row: Option<BookRow> = sqlx::query_as(
            r#"
            update books
            set title = coalesce($2, title),
                author = coalesce($3, author),
                isbn = coalesce($4, isbn)
            where book_id = $1
            returning book_id, title, author, isbn, is_available
            "#,
        )
        .bind(book_id.into_inner())
        .bind(update.title.as_deref())
        .bind(update.author.as_deref())
        .bind(update.isbn.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(row.into()),
            None => bail!(ErrorKind::NotFound, "Book not found", format!("book_id={book_id}")),
        }
    }

    async fn set_book_availability(&self, book_id: BookId, is_available: bool) -> CatalogResult<()> {
        let result = sqlx::query("update books set is_available = $2 where book_id = $1")
            .bind(book_id.into_inner())
            .bind(is_available)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            bail!(ErrorKind::NotFound, "Book not found", format!("book_id={book_id}"));
        }

        Ok(())
    }

    async fn put_user(&self, user: &User) -> CatalogResult<User> {
        sqlx::query(
            r#"
            insert into users (user_id, name, contact_details)
            values ($1, $2, $3)
            "#,
        )
        .bind(user.user_id.into_inner())
        .bind(&user.name)
        .bind(&user.contact_details)
        .execute(&self.pool)
        .await?;

        Ok(user.clone())
    }

    async fn delete_user(&self, user_id: UserId) -> CatalogResult<()> {
        let result = sqlx::query("delete from users where user_id = $1")
            .bind(user_id.into_inner())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            bail!(ErrorKind::NotFound, "User not found", format!("user_id={user_id}"));
        }

        Ok(())
    }

    async fn record_transaction(&self, transaction: &NewTransaction) -> CatalogResult<Transaction> {
        let mut connection = self.pool.acquire().await?;

        insert_transaction(&mut connection, transaction).await
    }

    async fn set_transaction_status(
        &self,
        transaction_id: TransactionId,
        status: TransactionStatus,
    ) -> CatalogResult<()> {
        let result = sqlx::query("update transactions set status = $2 where transaction_id = $1")
            .bind(transaction_id.into_inner())
            .bind(status.as_static_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            bail!(
                ErrorKind::NotFound,
                "Transaction not found",
                format!("transaction_id={transaction_id}")
            );
        }

        Ok(())
    }

    async fn open_loan(&self, transaction: &NewTransaction) -> CatalogResult<Transaction> {
        let book_id = transaction.book_id;
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "update books set is_available = 0 where book_id = $1 and is_available = 1",
        )
        .bind(book_id.into_inner())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let exists: Option<i64> =
                sqlx::query_scalar("select book_id from books where book_id = $1")
                    .bind(book_id.into_inner())
                    .fetch_optional(&mut *tx)
                    .await?;
            tx.rollback().await?;

            if exists.is_none() {
                bail!(ErrorKind::NotFound, "Book not found", format!("book_id={book_id}"));
            }
            bail!(
                ErrorKind::BookUnavailable,
                "Book is already on loan",
                format!("book_id={book_id}")
            );
        }

        // Dropping `tx` on any error below rolls the availability change back.
        shelf_fail_point(OPEN_LOAN__BEFORE_RECORD)?;

        let transaction = insert_transaction(&mut tx, transaction).await?;
        tx.commit().await?;

        Ok(transaction)
    }

    async fn close_loan(&self, transaction_id: TransactionId) -> CatalogResult<Transaction> {
        let mut tx = self.pool.begin().await?;

        let row: Option<TransactionRow> = sqlx::query_as(&format!(
            "select {TRANSACTION_COLUMNS} from transactions where transaction_id = $1"
        ))
        .bind(transaction_id.into_inner())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            bail!(
                ErrorKind::NotFound,
                "Transaction not found",
                format!("transaction_id={transaction_id}")
            );
        };
        let mut transaction = Transaction::try_from(row)?;

        if !transaction.status.is_open() {
            bail!(
                ErrorKind::AlreadyReturned,
                "Transaction was already returned",
                format!("transaction_id={transaction_id}")
            );
        }

        sqlx::query("update transactions set status = $2 where transaction_id = $1")
            .bind(transaction_id.into_inner())
            .bind(TransactionStatus::Returned.as_static_str())
            .execute(&mut *tx)
            .await?;

        shelf_fail_point(CLOSE_LOAN__BEFORE_BOOK_UPDATE)?;

        let result = sqlx::query("update books set is_available = 1 where book_id = $1")
            .bind(transaction.book_id.into_inner())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            bail!(
                ErrorKind::NotFound,
                "Book not found",
                format!("book_id={}", transaction.book_id)
            );
        }

        tx.commit().await?;
        transaction.status = TransactionStatus::Returned;

        Ok(transaction)
    }

    async fn query_transactions_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CatalogResult<Vec<Transaction>> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            "select {TRANSACTION_COLUMNS} from transactions \
             where transaction_date >= $1 and transaction_date <= $2 \
             order by transaction_id"
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Transaction::try_from).collect()
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
