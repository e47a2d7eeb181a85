use std::future::Future;

use chrono::{DateTime, Utc};

use crate::error::CatalogResult;
use crate::types::{
    Book, BookId, BookUpdate, NewBook, NewTransaction, Transaction, TransactionId,
    TransactionStatus, User, UserId,
};

/// Durable storage for books, users and lending transactions.
///
/// A [`CatalogStore`] is the source of truth of the catalog. Every method is a single atomic
/// write or read: a failed call leaves no partial change behind. Implementations enforce primary
/// key uniqueness for books and users, ISBN uniqueness for books, and assign transaction ids that
/// strictly increase and are never reused.
///
/// Referential fields of transactions are not enforced: a transaction may keep pointing at a
/// user that was removed afterwards.
pub trait CatalogStore {
    /// Reads every book, ordered by id.
    fn load_books(&self) -> impl Future<Output = CatalogResult<Vec<Book>>> + Send;

    /// Reads every user, ordered by id.
    fn load_users(&self) -> impl Future<Output = CatalogResult<Vec<User>>> + Send;

    /// Reads every transaction, ordered by id.
    fn load_transactions(&self) -> impl Future<Output = CatalogResult<Vec<Transaction>>> + Send;

    /// Inserts a new, available book.
    ///
    /// Fails with [`crate::error::ErrorKind::DuplicateKey`] if the id or the ISBN is taken.
    fn put_book(&self, book: &NewBook) -> impl Future<Output = CatalogResult<Book>> + Send;

    /// Removes a book. Fails with [`crate::error::ErrorKind::NotFound`] if absent.
    fn delete_book(&self, book_id: BookId) -> impl Future<Output = CatalogResult<()>> + Send;

    /// Applies a partial metadata update and returns the updated book.
    ///
    /// Fails with [`crate::error::ErrorKind::NotFound`] if the book is absent and with
    /// [`crate::error::ErrorKind::DuplicateKey`] if the new ISBN belongs to another book.
    fn update_book(
        &self,
        book_id: BookId,
        update: &BookUpdate,
    ) -> impl Future<Output = CatalogResult<Book>> + Send;

    /// Sets the availability flag of a book.
    fn set_book_availability(
        &self,
        book_id: BookId,
        is_available: bool,
    ) -> impl Future<Output = CatalogResult<()>> + Send;

    /// Inserts a new user. Fails with [`crate::error::ErrorKind::DuplicateKey`] if the id is taken.
    fn put_user(&self, user: &User) -> impl Future<Output = CatalogResult<User>> + Send;

    /// Removes a user without touching the transactions that reference it.
    fn delete_user(&self, user_id: UserId) -> impl Future<Output = CatalogResult<()>> + Send;

    /// Inserts a transaction row as given and returns it with its newly assigned id.
    fn record_transaction(
        &self,
        transaction: &NewTransaction,
    ) -> impl Future<Output = CatalogResult<Transaction>> + Send;

    /// Sets the status of a transaction.
    fn set_transaction_status(
        &self,
        transaction_id: TransactionId,
        status: TransactionStatus,
    ) -> impl Future<Output = CatalogResult<()>> + Send;

    /// Marks the book of `transaction` unavailable and records `transaction`, atomically.
    ///
    /// Fails with [`crate::error::ErrorKind::NotFound`] if the book is absent and with
    /// [`crate::error::ErrorKind::BookUnavailable`] if it is already on loan; neither write
    /// happens in that case.
    fn open_loan(
        &self,
        transaction: &NewTransaction,
    ) -> impl Future<Output = CatalogResult<Transaction>> + Send;

    /// Marks a borrowed transaction returned and its book available again, atomically.
    ///
    /// Fails with [`crate::error::ErrorKind::NotFound`] if the transaction (or its book) is
    /// absent and with [`crate::error::ErrorKind::AlreadyReturned`] if it is already closed.
    fn close_loan(
        &self,
        transaction_id: TransactionId,
    ) -> impl Future<Output = CatalogResult<Transaction>> + Send;

    /// Returns the transactions dated within `[start, end]`, both ends inclusive, ordered by id.
    fn query_transactions_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Future<Output = CatalogResult<Vec<Transaction>>> + Send;

    /// Releases the resources held by the store.
    fn close(&self) -> impl Future<Output = ()> + Send;
}
