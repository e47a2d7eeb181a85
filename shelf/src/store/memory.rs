use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::bail;
use crate::error::{CatalogResult, ErrorKind};
use crate::store::base::CatalogStore;
use crate::types::{
    Book, BookId, BookUpdate, NewBook, NewTransaction, Transaction, TransactionId,
    TransactionStatus, User, UserId,
};

/// Inner state of [`MemoryStore`].
#[derive(Debug, Default)]
struct Inner {
    books: BTreeMap<BookId, Book>,
    /// Unique ISBN constraint, mapping each ISBN to the book that holds it.
    isbns: HashMap<String, BookId>,
    users: BTreeMap<UserId, User>,
    transactions: BTreeMap<TransactionId, Transaction>,
    /// Highest transaction id ever assigned. Ids are never reused.
    last_transaction_id: i64,
}

impl Inner {
    fn book_mut(&mut self, book_id: BookId) -> CatalogResult<&mut Book> {
        match self.books.get_mut(&book_id) {
            Some(book) => Ok(book),
            None => bail!(ErrorKind::NotFound, "Book not found", format!("book_id={book_id}")),
        }
    }

    fn transaction_mut(&mut self, transaction_id: TransactionId) -> CatalogResult<&mut Transaction> {
        match self.transactions.get_mut(&transaction_id) {
            Some(transaction) => Ok(transaction),
            None => bail!(
                ErrorKind::NotFound,
                "Transaction not found",
                format!("transaction_id={transaction_id}")
            ),
        }
    }

    fn insert_transaction(&mut self, transaction: &NewTransaction) -> Transaction {
        self.last_transaction_id += 1;
        let transaction_id = TransactionId::new(self.last_transaction_id);
        let transaction = transaction.clone().into_transaction(transaction_id);
        self.transactions.insert(transaction_id, transaction.clone());

        transaction
    }
}

/// In-memory catalog store.
///
/// [`MemoryStore`] keeps all records in ordered maps and enforces the same keys and lending
/// rules as the SQLite store, which makes it a drop-in replacement for tests and throwaway
/// sessions. Everything is lost when the store is dropped.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    /// Creates a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CatalogStore for MemoryStore {
    async fn load_books(&self) -> CatalogResult<Vec<Book>> {
        let inner = self.inner.lock().await;

        Ok(inner.books.values().cloned().collect())
    }

    async fn load_users(&self) -> CatalogResult<Vec<User>> {
        let inner = self.inner.lock().await;

        Ok(inner.users.values().cloned().collect())
    }

    async fn load_transactions(&self) -> CatalogResult<Vec<Transaction>> {
        let inner = self.inner.lock().await;

        Ok(inner.transactions.values().cloned().collect())
    }

    async fn put_book(&self, book: &NewBook) -> CatalogResult<Book> {
        let mut inner = self.inner.lock().await;

        if inner.books.contains_key(&book.book_id) {
            bail!(
                ErrorKind::DuplicateKey,
                "Book already exists",
                format!("book_id={}", book.book_id)
            );
        }
        if inner.isbns.contains_key(&book.isbn) {
            bail!(
                ErrorKind::DuplicateKey,
                "ISBN already catalogued",
                format!("isbn={}", book.isbn)
            );
        }

        let book = book.clone().into_book();
        inner.isbns.insert(book.isbn.clone(), book.book_id);
        inner.books.insert(book.book_id, book.clone());

        Ok(book)
    }

    async fn delete_book(&self, book_id: BookId) -> CatalogResult<()> {
        let mut inner = self.inner.lock().await;

        let Some(book) = inner.books.remove(&book_id) else {
            bail!(ErrorKind::NotFound, "Book not found", format!("book_id={book_id}"));
        };
        inner.isbns.remove(&book.isbn);

        Ok(())
    }

    async fn update_book(&self, book_id: BookId, update: &BookUpdate) -> CatalogResult<Book> {
        let mut inner = self.inner.lock().await;

        let current_isbn = inner.book_mut(book_id)?.isbn.clone();
        if let Some(isbn) = &update.isbn {
            if *isbn != current_isbn && inner.isbns.contains_key(isbn) {
                bail!(
                    ErrorKind::DuplicateKey,
                    "ISBN already catalogued",
                    format!("isbn={isbn}")
                );
            }
            inner.isbns.remove(&current_isbn);
            inner.isbns.insert(isbn.clone(), book_id);
        }

        let book = inner.book_mut(book_id)?;
        update.apply_to(book);

        Ok(book.clone())
    }

    async fn set_book_availability(&self, book_id: BookId, is_available: bool) -> CatalogResult<()> {
        let mut inner = self.inner.lock().await;
        inner.book_mut(book_id)?.is_available = is_available;

        Ok(())
    }

    async fn put_user(&self, user: &User) -> CatalogResult<User> {
        let mut inner = self.inner.lock().await;

        if inner.users.contains_key(&user.user_id) {
            bail!(
                ErrorKind::DuplicateKey,
                "User already exists",
                format!("user_id={}", user.user_id)
            );
        }
        inner.users.insert(user.user_id, user.clone());

        Ok(user.clone())
    }

    async fn delete_user(&self, user_id: UserId) -> CatalogResult<()> {
        let mut inner = self.inner.lock().await;

        if inner.users.remove(&user_id).is_none() {
            bail!(ErrorKind::NotFound, "User not found", format!("user_id={user_id}"));
        }

        Ok(())
    }

    async fn record_transaction(&self, transaction: &NewTransaction) -> CatalogResult<Transaction> {
        let mut inner = self.inner.lock().await;

        Ok(inner.insert_transaction(transaction))
    }

    async fn set_transaction_status(
        &self,
        transaction_id: TransactionId,
        status: TransactionStatus,
    ) -> CatalogResult<()> {
        let mut inner = self.inner.lock().await;
        inner.transaction_mut(transaction_id)?.status = status;

        Ok(())
    }

    async fn open_loan(&self, transaction: &NewTransaction) -> CatalogResult<Transaction> {
        let mut inner = self.inner.lock().await;

        let book = inner.book_mut(transaction.book_id)?;
        if !book.is_available {
            bail!(
                ErrorKind::BookUnavailable,
                "Book is already on loan",
                format!("book_id={}", transaction.book_id)
            );
        }
        book.is_available = false;

        Ok(inner.insert_transaction(transaction))
    }

    async fn close_loan(&self, transaction_id: TransactionId) -> CatalogResult<Transaction> {
        let mut inner = self.inner.lock().await;

        let transaction = inner.transaction_mut(transaction_id)?;
        if !transaction.status.is_open() {
            bail!(
                ErrorKind::AlreadyReturned,
                "Transaction was already returned",
                format!("transaction_id={transaction_id}")
            );
        }
        let book_id = transaction.book_id;

        // Check the book before touching anything so a failure leaves no trace.
        inner.book_mut(book_id)?.is_available = true;
        let transaction = inner.transaction_mut(transaction_id)?;
        transaction.status = TransactionStatus::Returned;

        Ok(transaction.clone())
    }

    async fn query_transactions_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CatalogResult<Vec<Transaction>> {
        let inner = self.inner.lock().await;

        Ok(inner
            .transactions
            .values()
            .filter(|transaction| {
                transaction.transaction_date >= start && transaction.transaction_date <= end
            })
            .cloned()
            .collect())
    }

    async fn close(&self) {}
}
