//! The catalog service.
//!
//! [`Catalog`] combines a [`CatalogStore`] with a [`CatalogIndex`] and implements the lending
//! rules on top of them. Every mutation writes the store first and mirrors the result into the
//! index only once the store call succeeded, so a failed operation leaves both untouched.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info, warn};

use crate::bail;
use crate::clock::{Clock, SystemClock};
use crate::error::{CatalogResult, ErrorKind};
use crate::index::CatalogIndex;
use crate::loader::{CatalogSeed, IngestReport};
use crate::store::CatalogStore;
use crate::types::{
    Book, BookId, BookUpdate, NewBook, NewTransaction, Transaction, TransactionId,
    TransactionStatus, TransactionType, User, UserId,
};

/// Number of days a borrowed book may be kept.
pub const LOAN_PERIOD_DAYS: i64 = 14;

/// A lending-library catalog.
///
/// Each book is either available or on loan. [`Catalog::borrow`] moves an available book on loan
/// and records a transaction; [`Catalog::return_book`] closes that transaction and makes the book
/// available again. Mutations take `&mut self`, so operations on one catalog never interleave.
#[derive(Debug)]
pub struct Catalog<S, C = SystemClock> {
    store: S,
    clock: C,
    index: CatalogIndex,
}

impl<S> Catalog<S, SystemClock>
where
    S: CatalogStore,
{
    /// Opens a catalog over `store` using the system clock.
    pub async fn open_with_system_clock(store: S) -> CatalogResult<Self> {
        Self::open(store, SystemClock).await
    }
}

impl<S, C> Catalog<S, C>
where
    S: CatalogStore,
    C: Clock,
{
    /// Opens a catalog over `store`, building the index from its current content.
    pub async fn open(store: S, clock: C) -> CatalogResult<Self> {
        let index = load_index(&store).await?;

        info!(
            books = index.book_count(),
            users = index.user_count(),
            transactions = index.transaction_count(),
            "catalog opened"
        );

        Ok(Self {
            store,
            clock,
            index,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn index(&self) -> &CatalogIndex {
        &self.index
    }

    /// Catalogs a new book. It starts out available.
    pub async fn add_book(&mut self, book: impl Into<NewBook>) -> CatalogResult<Book> {
        let book = book.into();

        if self.index.book(book.book_id).is_some() {
            bail!(
                ErrorKind::DuplicateKey,
                "Book already exists",
                format!("book_id={}", book.book_id)
            );
        }
        if self.index.book_by_isbn(&book.isbn).is_some() {
            bail!(
                ErrorKind::DuplicateKey,
                "ISBN already catalogued",
                format!("isbn={}", book.isbn)
            );
        }

        let book = self.store.put_book(&book).await?;
        self.index.insert_book(book.clone());

        debug!(book_id = %book.book_id, isbn = %book.isbn, "book added");

        Ok(book)
    }

    /// Catalogs every book of `books` in order and returns how many were added.
    ///
    /// Stops at the first failure; the books added before it stay catalogued.
    pub async fn add_books<I>(&mut self, books: I) -> CatalogResult<usize>
    where
        I: IntoIterator,
        I::Item: Into<NewBook>,
    {
        let mut added = 0;
        for book in books {
            self.add_book(book).await?;
            added += 1;
        }

        info!(added, "books added");

        Ok(added)
    }

    /// Updates the metadata of a book and returns the result.
    pub async fn update_book(&mut self, book_id: BookId, update: BookUpdate) -> CatalogResult<Book> {
        let Some(current) = self.index.book(book_id) else {
            bail!(ErrorKind::NotFound, "Book not found", format!("book_id={book_id}"));
        };

        if update.is_empty() {
            return Ok(current.clone());
        }

        if let Some(isbn) = &update.isbn {
            if let Some(other) = self.index.book_by_isbn(isbn) {
                if other.book_id != book_id {
                    bail!(
                        ErrorKind::DuplicateKey,
                        "ISBN already catalogued",
                        format!("isbn={isbn}")
                    );
                }
            }
        }

        let book = self.store.update_book(book_id, &update).await?;
        self.index.insert_book(book.clone());

        info!(book_id = %book_id, "book updated");

        Ok(book)
    }

    /// Removes a book from the catalog. A book that is on loan cannot be removed.
    pub async fn remove_book(&mut self, book_id: BookId) -> CatalogResult<Book> {
        let Some(book) = self.index.book(book_id) else {
            bail!(ErrorKind::NotFound, "Book not found", format!("book_id={book_id}"));
        };

        if !book.is_available {
            bail!(
                ErrorKind::OpenLoans,
                "Book is on loan and cannot be removed",
                format!("book_id={book_id}")
            );
        }

        let book = book.clone();
        self.store.delete_book(book_id).await?;
        self.index.remove_book(book_id);

        info!(book_id = %book_id, "book removed");

        Ok(book)
    }

    /// Registers a new user.
    pub async fn add_user(&mut self, user: impl Into<User>) -> CatalogResult<User> {
        let user = user.into();

        if self.index.user(user.user_id).is_some() {
            bail!(
                ErrorKind::DuplicateKey,
                "User already exists",
                format!("user_id={}", user.user_id)
            );
        }

        let user = self.store.put_user(&user).await?;
        self.index.insert_user(user.clone());

        debug!(user_id = %user.user_id, "user added");

        Ok(user)
    }

    /// Registers every user of `users` in order and returns how many were added.
    ///
    /// Stops at the first failure; the users added before it stay registered.
    pub async fn add_users<I>(&mut self, users: I) -> CatalogResult<usize>
    where
        I: IntoIterator,
        I::Item: Into<User>,
    {
        let mut added = 0;
        for user in users {
            self.add_user(user).await?;
            added += 1;
        }

        info!(added, "users added");

        Ok(added)
    }

    /// Removes a user. Users with a book still on loan cannot be removed.
    ///
    /// The user's past transactions are kept and keep referring to the removed id.
    pub async fn remove_user(&mut self, user_id: UserId) -> CatalogResult<User> {
        let Some(user) = self.index.user(user_id).cloned() else {
            bail!(ErrorKind::NotFound, "User not found", format!("user_id={user_id}"));
        };

        if self.index.has_open_loans(user_id) {
            bail!(
                ErrorKind::OpenLoans,
                "User has books on loan and cannot be removed",
                format!("user_id={user_id}")
            );
        }

        self.store.delete_user(user_id).await?;
        self.index.remove_user(user_id);

        info!(user_id = %user_id, "user removed");

        Ok(user)
    }

    pub fn lookup_book_by_id(&self, book_id: BookId) -> Option<&Book> {
        self.index.book(book_id)
    }

    pub fn lookup_book_by_isbn(&self, isbn: &str) -> Option<&Book> {
        self.index.book_by_isbn(isbn)
    }

    pub fn lookup_user_by_id(&self, user_id: UserId) -> Option<&User> {
        self.index.user(user_id)
    }

    pub fn lookup_transaction(&self, transaction_id: TransactionId) -> Option<&Transaction> {
        self.index.transaction(transaction_id)
    }

    /// Returns every transaction of `user_id`, oldest first.
    pub fn transactions_for_user(&self, user_id: UserId) -> Vec<&Transaction> {
        self.index.transactions_for_user(user_id).collect()
    }

    /// Returns the books currently available for borrowing, by ascending id.
    pub fn available_books(&self) -> Vec<&Book> {
        self.index.available_books().collect()
    }

    /// Lends `book_id` to `user_id` and returns the opened transaction.
    ///
    /// The loan is due [`LOAN_PERIOD_DAYS`] after it was opened. Fails with
    /// [`ErrorKind::BookUnavailable`] if the book is already on loan and with
    /// [`ErrorKind::NotFound`] if the user or the book does not exist.
    pub async fn borrow(&mut self, user_id: UserId, book_id: BookId) -> CatalogResult<Transaction> {
        if self.index.user(user_id).is_none() {
            bail!(ErrorKind::NotFound, "User not found", format!("user_id={user_id}"));
        }

        let transaction_date = self.clock.now();
        let transaction = NewTransaction {
            user_id,
            book_id,
            transaction_type: TransactionType::Borrow,
            transaction_date,
            return_date: transaction_date + TimeDelta::days(LOAN_PERIOD_DAYS),
            status: TransactionStatus::Borrowed,
        };

        let transaction = self.store.open_loan(&transaction).await?;
        self.index.set_book_availability(book_id, false);
        self.index.insert_transaction(transaction.clone());

        info!(
            transaction_id = %transaction.transaction_id,
            user_id = %user_id,
            book_id = %book_id,
            return_date = %transaction.return_date,
            "book borrowed"
        );

        Ok(transaction)
    }

    /// Closes a borrow transaction and makes its book available again.
    ///
    /// Fails with [`ErrorKind::NotFound`] for an unknown transaction and with
    /// [`ErrorKind::AlreadyReturned`] if it was already closed; nothing changes in either case.
    pub async fn return_book(&mut self, transaction_id: TransactionId) -> CatalogResult<Transaction> {
        let transaction = self.store.close_loan(transaction_id).await?;
        self.index
            .set_transaction_status(transaction_id, TransactionStatus::Returned);
        self.index.set_book_availability(transaction.book_id, true);

        info!(
            transaction_id = %transaction_id,
            user_id = %transaction.user_id,
            book_id = %transaction.book_id,
            "book returned"
        );

        Ok(transaction)
    }

    /// Returns the transactions dated within `[start, end]`, both inclusive, by ascending id.
    pub async fn transactions_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CatalogResult<Vec<Transaction>> {
        self.store.query_transactions_in_range(start, end).await
    }

    /// Discards the index and rebuilds it from the store.
    pub async fn rebuild_index(&mut self) -> CatalogResult<()> {
        self.index = load_index(&self.store).await?;

        info!(
            books = self.index.book_count(),
            users = self.index.user_count(),
            transactions = self.index.transaction_count(),
            "catalog index rebuilt"
        );

        Ok(())
    }

    /// Compares the index with the store.
    ///
    /// Fails with [`ErrorKind::IndexDiverged`] if they disagree; [`Catalog::rebuild_index`]
    /// brings them back in line.
    pub async fn check_consistency(&self) -> CatalogResult<()> {
        let stored = load_index(&self.store).await?;

        if stored != self.index {
            bail!(
                ErrorKind::IndexDiverged,
                "Index does not match the store",
                format!(
                    "index: books={} users={} transactions={}; store: books={} users={} transactions={}",
                    self.index.book_count(),
                    self.index.user_count(),
                    self.index.transaction_count(),
                    stored.book_count(),
                    stored.user_count(),
                    stored.transaction_count()
                )
            );
        }

        Ok(())
    }

    /// Inserts the books and users of `seed`, skipping any whose key already exists.
    pub async fn ingest(&mut self, seed: CatalogSeed) -> CatalogResult<IngestReport> {
        let mut report = IngestReport::default();

        for book in seed.books {
            match self.add_book(book).await {
                Ok(_) => report.books_added += 1,
                Err(err) if err.kind() == ErrorKind::DuplicateKey => {
                    warn!(detail = err.detail(), "skipping duplicate book");
                    report.books_skipped += 1;
                }
                Err(err) => return Err(err),
            }
        }

        for user in seed.users {
            match self.add_user(user).await {
                Ok(_) => report.users_added += 1,
                Err(err) if err.kind() == ErrorKind::DuplicateKey => {
                    warn!(detail = err.detail(), "skipping duplicate user");
                    report.users_skipped += 1;
                }
                Err(err) => return Err(err),
            }
        }

        info!(
            books_added = report.books_added,
            books_skipped = report.books_skipped,
            users_added = report.users_added,
            users_skipped = report.users_skipped,
            "seed ingested"
        );

        Ok(report)
    }

    /// Closes the underlying store.
    pub async fn close(self) {
        self.store.close().await;
    }
}

async fn load_index<S: CatalogStore>(store: &S) -> CatalogResult<CatalogIndex> {
    let books = store.load_books().await?;
    let users = store.load_users().await?;
    let transactions = store.load_transactions().await?;

    Ok(CatalogIndex::from_records(books, users, transactions))
}
