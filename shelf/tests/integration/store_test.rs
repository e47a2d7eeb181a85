use chrono::{TimeDelta, TimeZone, Utc};
use shelf::error::ErrorKind;
use shelf::store::CatalogStore;
use shelf::types::{
    BookId, BookUpdate, NewBook, NewTransaction, TransactionId, TransactionStatus,
    TransactionType, User, UserId,
};

macro_rules! for_each_store {
    ($($case:ident),* $(,)?) => {
        mod memory_store {
            use shelf::store::MemoryStore;
            use shelf_telemetry::tracing::init_test_tracing;

            $(
                #[tokio::test]
                async fn $case() {
                    init_test_tracing();

                    super::$case(MemoryStore::new()).await;
                }
            )*
        }

        mod sqlite_store {
            use shelf::store::SqliteStore;
            use shelf_telemetry::tracing::init_test_tracing;

            $(
                #[tokio::test]
                async fn $case() {
                    init_test_tracing();
                    let store = SqliteStore::connect_in_memory().await.unwrap();

                    super::$case(store).await;
                }
            )*
        }
    };
}

for_each_store!(
    duplicate_keys_are_rejected,
    missing_records_are_not_found,
    update_book_applies_partial_changes,
    open_loan_checks_availability,
    close_loan_is_applied_once,
    transaction_ids_keep_increasing,
    deleted_users_stay_referenced_by_transactions,
);

fn new_book(id: i64, isbn: &str) -> NewBook {
    NewBook::new(BookId::new(id), format!("Book {id}"), "Author", isbn)
}

fn new_loan(user_id: i64, book_id: i64) -> NewTransaction {
    let transaction_date = Utc.with_ymd_and_hms(2023, 3, 1, 10, 0, 0).unwrap();

    NewTransaction {
        user_id: UserId::new(user_id),
        book_id: BookId::new(book_id),
        transaction_type: TransactionType::Borrow,
        transaction_date,
        return_date: transaction_date + TimeDelta::days(14),
        status: TransactionStatus::Borrowed,
    }
}

async fn duplicate_keys_are_rejected<S: CatalogStore>(store: S) {
    store.put_book(&new_book(1, "111")).await.unwrap();
    store
        .put_user(&User::new(UserId::new(101), "Alice", "alice@gmail.com"))
        .await
        .unwrap();

    let err = store.put_book(&new_book(1, "222")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateKey);
    let err = store.put_book(&new_book(2, "111")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateKey);
    let err = store
        .put_user(&User::new(UserId::new(101), "Alicia", "alicia@gmail.com"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateKey);

    assert_eq!(store.load_books().await.unwrap().len(), 1);
    let users = store.load_users().await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].name, "Alice");
}

async fn missing_records_are_not_found<S: CatalogStore>(store: S) {
    let err = store.delete_book(BookId::new(1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = store.delete_user(UserId::new(101)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = store
        .update_book(BookId::new(1), &BookUpdate::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = store
        .set_book_availability(BookId::new(1), false)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = store
        .set_transaction_status(TransactionId::new(1), TransactionStatus::Returned)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = store.close_loan(TransactionId::new(1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = store.open_loan(&new_loan(101, 1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(store.load_transactions().await.unwrap().is_empty());
}

async fn update_book_applies_partial_changes<S: CatalogStore>(store: S) {
    store.put_book(&new_book(1, "111")).await.unwrap();
    store.put_book(&new_book(2, "222")).await.unwrap();

    let update = BookUpdate {
        author: Some("Someone Else".to_string()),
        isbn: Some("333".to_string()),
        ..Default::default()
    };
    let book = store.update_book(BookId::new(1), &update).await.unwrap();

    assert_eq!(book.title, "Book 1");
    assert_eq!(book.author, "Someone Else");
    assert_eq!(book.isbn, "333");
    assert!(book.is_available);

    let collision = BookUpdate {
        isbn: Some("222".to_string()),
        ..Default::default()
    };
    let err = store.update_book(BookId::new(1), &collision).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateKey);

    let books = store.load_books().await.unwrap();
    assert_eq!(books[0].isbn, "333");
    assert_eq!(books[1].isbn, "222");
}

async fn open_loan_checks_availability<S: CatalogStore>(store: S) {
    store.put_book(&new_book(1, "111")).await.unwrap();

    let transaction = store.open_loan(&new_loan(101, 1)).await.unwrap();
    assert_eq!(transaction.status, TransactionStatus::Borrowed);
    assert!(!store.load_books().await.unwrap()[0].is_available);

    let err = store.open_loan(&new_loan(102, 1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BookUnavailable);

    let transactions = store.load_transactions().await.unwrap();
    assert_eq!(transactions, vec![transaction]);
}

async fn close_loan_is_applied_once<S: CatalogStore>(store: S) {
    store.put_book(&new_book(1, "111")).await.unwrap();
    let opened = store.open_loan(&new_loan(101, 1)).await.unwrap();

    let closed = store.close_loan(opened.transaction_id).await.unwrap();
    assert_eq!(closed.status, TransactionStatus::Returned);
    assert_eq!(closed.transaction_date, opened.transaction_date);
    assert!(store.load_books().await.unwrap()[0].is_available);

    let err = store.close_loan(opened.transaction_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyReturned);

    let transactions = store.load_transactions().await.unwrap();
    assert_eq!(transactions, vec![closed]);
}

async fn transaction_ids_keep_increasing<S: CatalogStore>(store: S) {
    let mut last = 0;
    for book_id in 1..=3 {
        let transaction = store.record_transaction(&new_loan(101, book_id)).await.unwrap();
        let id = transaction.transaction_id.into_inner();

        assert!(id > last);
        last = id;
    }

    store
        .set_transaction_status(TransactionId::new(last), TransactionStatus::Returned)
        .await
        .unwrap();

    let transactions = store.load_transactions().await.unwrap();
    let ids: Vec<_> = transactions
        .iter()
        .map(|transaction| transaction.transaction_id.into_inner())
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(transactions[2].status, TransactionStatus::Returned);
}

async fn deleted_users_stay_referenced_by_transactions<S: CatalogStore>(store: S) {
    store.put_book(&new_book(1, "111")).await.unwrap();
    store
        .put_user(&User::new(UserId::new(101), "Alice", "alice@gmail.com"))
        .await
        .unwrap();
    let loan = store.open_loan(&new_loan(101, 1)).await.unwrap();
    store.close_loan(loan.transaction_id).await.unwrap();

    store.delete_user(UserId::new(101)).await.unwrap();

    assert!(store.load_users().await.unwrap().is_empty());
    let transactions = store.load_transactions().await.unwrap();
    assert_eq!(transactions[0].user_id, UserId::new(101));
}
