//! Record types shared by the durable store, the index layer and the catalog service.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bail;
use crate::error::{CatalogError, ErrorKind};

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            pub fn into_inner(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(
    /// Primary key of a [`Book`], chosen by whoever catalogs the book.
    BookId
);
record_id!(
    /// Primary key of a [`User`], chosen at registration.
    UserId
);
record_id!(
    /// Primary key of a [`Transaction`], assigned by the durable store.
    ///
    /// Ids are strictly increasing and never reused, even after the row they named is gone.
    TransactionId
);

/// A catalogued book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub is_available: bool,
}

/// A book about to be catalogued. New books always start out available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub isbn: String,
}

impl NewBook {
    pub fn new(
        book_id: BookId,
        title: impl Into<String>,
        author: impl Into<String>,
        isbn: impl Into<String>,
    ) -> Self {
        Self {
            book_id,
            title: title.into(),
            author: author.into(),
            isbn: isbn.into(),
        }
    }

    /// Returns the stored form of this book.
    pub fn into_book(self) -> Book {
        Book {
            book_id: self.book_id,
            title: self.title,
            author: self.author,
            isbn: self.isbn,
            is_available: true,
        }
    }
}

impl<T, A, I> From<(i64, T, A, I)> for NewBook
where
    T: Into<String>,
    A: Into<String>,
    I: Into<String>,
{
    fn from((book_id, title, author, isbn): (i64, T, A, I)) -> Self {
        NewBook::new(BookId::new(book_id), title, author, isbn)
    }
}

/// Partial update of a book's metadata. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookUpdate {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
}

impl BookUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.author.is_none() && self.isbn.is_none()
    }

    /// Applies the update to `book` in place.
    pub fn apply_to(&self, book: &mut Book) {
        if let Some(title) = &self.title {
            book.title = title.clone();
        }
        if let Some(author) = &self.author {
            book.author = author.clone();
        }
        if let Some(isbn) = &self.isbn {
            book.isbn = isbn.clone();
        }
    }
}

/// A registered library member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub name: String,
    pub contact_details: String,
}

impl User {
    pub fn new(
        user_id: UserId,
        name: impl Into<String>,
        contact_details: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            name: name.into(),
            contact_details: contact_details.into(),
        }
    }
}

impl<N, C> From<(i64, N, C)> for User
where
    N: Into<String>,
    C: Into<String>,
{
    fn from((user_id, name, contact_details): (i64, N, C)) -> Self {
        User::new(UserId::new(user_id), name, contact_details)
    }
}

/// Kind of a lending transaction. Only borrows exist today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    #[default]
    Borrow,
}

impl TransactionType {
    pub fn as_static_str(&self) -> &'static str {
        match self {
            TransactionType::Borrow => "borrow",
        }
    }
}

impl FromStr for TransactionType {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "borrow" => Ok(TransactionType::Borrow),
            other => bail!(
                ErrorKind::InvalidData,
                "Unknown transaction type",
                format!("transaction_type={other}")
            ),
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_static_str())
    }
}

/// Lifecycle status of a lending transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// The book is still with the borrower.
    Borrowed,
    /// The book came back; the transaction is closed.
    Returned,
}

impl TransactionStatus {
    pub fn as_static_str(&self) -> &'static str {
        match self {
            TransactionStatus::Borrowed => "borrowed",
            TransactionStatus::Returned => "returned",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, TransactionStatus::Borrowed)
    }
}

impl FromStr for TransactionStatus {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "borrowed" => Ok(TransactionStatus::Borrowed),
            "returned" => Ok(TransactionStatus::Returned),
            other => bail!(
                ErrorKind::InvalidData,
                "Unknown transaction status",
                format!("status={other}")
            ),
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_static_str())
    }
}

/// A lending transaction as persisted by the durable store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: TransactionId,
    pub user_id: UserId,
    pub book_id: BookId,
    pub transaction_type: TransactionType,
    pub transaction_date: DateTime<Utc>,
    pub return_date: DateTime<Utc>,
    pub status: TransactionStatus,
}

/// A transaction before the store assigned it an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub user_id: UserId,
    pub book_id: BookId,
    pub transaction_type: TransactionType,
    pub transaction_date: DateTime<Utc>,
    pub return_date: DateTime<Utc>,
    pub status: TransactionStatus,
}

impl NewTransaction {
    /// Returns the stored form of this transaction under `transaction_id`.
    pub fn into_transaction(self, transaction_id: TransactionId) -> Transaction {
        Transaction {
            transaction_id,
            user_id: self.user_id,
            book_id: self.book_id,
            transaction_type: self.transaction_type,
            transaction_date: self.transaction_date,
            return_date: self.return_date,
            status: self.status,
        }
    }
}
