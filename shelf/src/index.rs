//! In-memory index over the catalog records.
//!
//! [`CatalogIndex`] mirrors the durable store for point lookups. It is never the source of truth:
//! the catalog writes the store first and only then updates the index, and the whole index can
//! be rebuilt from the store at any time with [`CatalogIndex::from_records`].

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::types::{Book, BookId, Transaction, TransactionId, TransactionStatus, User, UserId};

/// Lookup structures mirroring the durable store.
///
/// Books are keyed by id; the ISBN map resolves to the book id so that both keys always observe
/// the same record. The availability set and the per-user transaction sets mirror the store's
/// secondary indexes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogIndex {
    books_by_id: HashMap<BookId, Book>,
    book_ids_by_isbn: HashMap<String, BookId>,
    available_book_ids: BTreeSet<BookId>,
    users_by_id: HashMap<UserId, User>,
    transactions_by_id: BTreeMap<TransactionId, Transaction>,
    transaction_ids_by_user: HashMap<UserId, BTreeSet<TransactionId>>,
}

impl CatalogIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index holding exactly the given records.
    pub fn from_records(
        books: impl IntoIterator<Item = Book>,
        users: impl IntoIterator<Item = User>,
        transactions: impl IntoIterator<Item = Transaction>,
    ) -> Self {
        let mut index = Self::new();

        for book in books {
            index.insert_book(book);
        }
        for user in users {
            index.insert_user(user);
        }
        for transaction in transactions {
            index.insert_transaction(transaction);
        }

        index
    }

    pub fn book(&self, book_id: BookId) -> Option<&Book> {
        self.books_by_id.get(&book_id)
    }

    pub fn book_by_isbn(&self, isbn: &str) -> Option<&Book> {
        self.book_ids_by_isbn
            .get(isbn)
            .and_then(|book_id| self.books_by_id.get(book_id))
    }

    pub fn user(&self, user_id: UserId) -> Option<&User> {
        self.users_by_id.get(&user_id)
    }

    pub fn transaction(&self, transaction_id: TransactionId) -> Option<&Transaction> {
        self.transactions_by_id.get(&transaction_id)
    }

    /// Returns the transactions of `user_id` in ascending id order.
    pub fn transactions_for_user(&self, user_id: UserId) -> impl Iterator<Item = &Transaction> {
        self.transaction_ids_by_user
            .get(&user_id)
            .into_iter()
            .flatten()
            .filter_map(|transaction_id| self.transactions_by_id.get(transaction_id))
    }

    /// Returns whether `user_id` still has a book that was not returned.
    pub fn has_open_loans(&self, user_id: UserId) -> bool {
        self.transactions_for_user(user_id)
            .any(|transaction| transaction.status.is_open())
    }

    /// Returns the available books in ascending id order.
    pub fn available_books(&self) -> impl Iterator<Item = &Book> {
        self.available_book_ids
            .iter()
            .filter_map(|book_id| self.books_by_id.get(book_id))
    }

    pub fn book_count(&self) -> usize {
        self.books_by_id.len()
    }

    pub fn user_count(&self) -> usize {
        self.users_by_id.len()
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions_by_id.len()
    }

    /// Inserts or replaces a book, keeping the ISBN and availability entries in step.
    pub fn insert_book(&mut self, book: Book) {
        if let Some(previous) = self.books_by_id.get(&book.book_id) {
            if previous.isbn != book.isbn {
                self.book_ids_by_isbn.remove(&previous.isbn);
            }
        }

        self.book_ids_by_isbn.insert(book.isbn.clone(), book.book_id);
        if book.is_available {
            self.available_book_ids.insert(book.book_id);
        } else {
            self.available_book_ids.remove(&book.book_id);
        }
        self.books_by_id.insert(book.book_id, book);
    }

    /// Removes a book from every lookup structure.
    pub fn remove_book(&mut self, book_id: BookId) -> Option<Book> {
        let book = self.books_by_id.remove(&book_id)?;
        self.book_ids_by_isbn.remove(&book.isbn);
        self.available_book_ids.remove(&book_id);

        Some(book)
    }

    /// Flips the availability of a book. Returns `false` if the book is not indexed.
    pub fn set_book_availability(&mut self, book_id: BookId, is_available: bool) -> bool {
        let Some(book) = self.books_by_id.get_mut(&book_id) else {
            return false;
        };

        book.is_available = is_available;
        if is_available {
            self.available_book_ids.insert(book_id);
        } else {
            self.available_book_ids.remove(&book_id);
        }

        true
    }

    pub fn insert_user(&mut self, user: User) {
        self.users_by_id.insert(user.user_id, user);
    }

    /// Removes a user. Their transactions stay indexed.
    pub fn remove_user(&mut self, user_id: UserId) -> Option<User> {
        self.users_by_id.remove(&user_id)
    }

    pub fn insert_transaction(&mut self, transaction: Transaction) {
        self.transaction_ids_by_user
            .entry(transaction.user_id)
            .or_default()
            .insert(transaction.transaction_id);
        self.transactions_by_id
            .insert(transaction.transaction_id, transaction);
    }

    /// Updates the status of a transaction. Returns `false` if it is not indexed.
    pub fn set_transaction_status(
        &mut self,
        transaction_id: TransactionId,
        status: TransactionStatus,
    ) -> bool {
        match self.transactions_by_id.get_mut(&transaction_id) {
            Some(transaction) => {
                transaction.status = status;
                true
            }
            None => false,
        }
    }
}
