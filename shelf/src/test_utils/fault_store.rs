use chrono::{DateTime, Utc};

use crate::bail;
use crate::error::{CatalogResult, ErrorKind};
use crate::store::CatalogStore;
use crate::types::{
    Book, BookId, BookUpdate, NewBook, NewTransaction, Transaction, TransactionId,
    TransactionStatus, User, UserId,
};

/// How an injected fault manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultType {
    Panic,
    Error,
}

/// Selects which store writes fail. Reads always go through.
#[derive(Debug, Clone, Default)]
pub struct FaultConfig {
    pub put_book: Option<FaultType>,
    pub delete_book: Option<FaultType>,
    pub update_book: Option<FaultType>,
    pub put_user: Option<FaultType>,
    pub delete_user: Option<FaultType>,
    pub open_loan: Option<FaultType>,
    pub close_loan: Option<FaultType>,
}

impl FaultConfig {
    /// Fails every write with [`FaultType::Error`].
    pub fn all_writes() -> Self {
        Self {
            put_book: Some(FaultType::Error),
            delete_book: Some(FaultType::Error),
            update_book: Some(FaultType::Error),
            put_user: Some(FaultType::Error),
            delete_user: Some(FaultType::Error),
            open_loan: Some(FaultType::Error),
            close_loan: Some(FaultType::Error),
        }
    }
}

/// Store wrapper that fails selected writes before they reach the wrapped store.
#[derive(Debug, Clone)]
pub struct FaultInjectingStore<S> {
    inner: S,
    config: FaultConfig,
}

impl<S> FaultInjectingStore<S> {
    pub fn wrap(inner: S, config: FaultConfig) -> Self {
        Self { inner, config }
    }

    pub fn get_inner(&self) -> &S {
        &self.inner
    }

    fn trigger_fault(&self, fault: Option<FaultType>, operation: &'static str) -> CatalogResult<()> {
        match fault {
            Some(FaultType::Panic) => panic!("injected panic in {operation}"),
            Some(FaultType::Error) => bail!(
                ErrorKind::StoreQueryFailed,
                "Injected store failure",
                operation
            ),
            None => Ok(()),
        }
    }
}

impl<S> CatalogStore for FaultInjectingStore<S>
where
    S: CatalogStore + Sync,
{
    async fn load_books(&self) -> CatalogResult<Vec<Book>> {
        self.inner.load_books().await
    }

    async fn load_users(&self) -> CatalogResult<Vec<User>> {
        self.inner.load_users().await
    }

    async fn load_transactions(&self) -> CatalogResult<Vec<Transaction>> {
        self.inner.load_transactions().await
    }

    async fn put_book(&self, book: &NewBook) -> CatalogResult<Book> {
        self.trigger_fault(self.config.put_book, "put_book")?;
        self.inner.put_book(book).await
    }

    async fn delete_book(&self, book_id: BookId) -> CatalogResult<()> {
        self.trigger_fault(self.config.delete_book, "delete_book")?;
        self.inner.delete_book(book_id).await
    }

    async fn update_book(&self, book_id: BookId, update: &BookUpdate) -> CatalogResult<Book> {
        self.trigger_fault(self.config.update_book, "update_book")?;
        self.inner.update_book(book_id, update).await
    }

    async fn set_book_availability(&self, book_id: BookId, is_available: bool) -> CatalogResult<()> {
        self.inner.set_book_availability(book_id, is_available).await
    }

    async fn put_user(&self, user: &User) -> CatalogResult<User> {
        self.trigger_fault(self.config.put_user, "put_user")?;
        self.inner.put_user(user).await
    }

    async fn delete_user(&self, user_id: UserId) -> CatalogResult<()> {
        self.trigger_fault(self.config.delete_user, "delete_user")?;
        self.inner.delete_user(user_id).await
    }

    async fn record_transaction(&self, transaction: &NewTransaction) -> CatalogResult<Transaction> {
        self.inner.record_transaction(transaction).await
    }

    async fn set_transaction_status(
        &self,
        transaction_id: TransactionId,
        status: TransactionStatus,
    ) -> CatalogResult<()> {
        self.inner
            .set_transaction_status(transaction_id, status)
            .await
    }

    async fn open_loan(&self, transaction: &NewTransaction) -> CatalogResult<Transaction> {
        self.trigger_fault(self.config.open_loan, "open_loan")?;
        self.inner.open_loan(transaction).await
    }

    async fn close_loan(&self, transaction_id: TransactionId) -> CatalogResult<Transaction> {
        self.trigger_fault(self.config.close_loan, "close_loan")?;
        self.inner.close_loan(transaction_id).await
    }

    async fn query_transactions_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CatalogResult<Vec<Transaction>> {
        self.inner.query_transactions_in_range(start, end).await
    }

    async fn close(&self) {
        self.inner.close().await;
    }
}
