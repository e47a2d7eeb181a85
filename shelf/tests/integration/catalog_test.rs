use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use shelf::catalog::{Catalog, LOAN_PERIOD_DAYS};
use shelf::clock::{Clock, ManualClock};
use shelf::error::ErrorKind;
use shelf::store::CatalogStore;
use shelf::test_utils::fixtures::{SAMPLE_BOOKS, SAMPLE_USERS, sample_seed, seed_sample_library};
use shelf::types::{BookId, TransactionId, TransactionStatus, UserId};

/// Runs every listed case once over a memory store and once over an in-memory SQLite store.
macro_rules! for_each_store {
    ($($case:ident),* $(,)?) => {
        mod memory_store {
            use shelf::test_utils::fixtures::{memory_catalog, test_clock};
            use shelf_telemetry::tracing::init_test_tracing;

            $(
                #[tokio::test]
                async fn $case() {
                    init_test_tracing();
                    let clock = test_clock();
                    let catalog = memory_catalog(clock.clone()).await;

                    super::$case(catalog, clock).await;
                }
            )*
        }

        mod sqlite_store {
            use shelf::test_utils::fixtures::{sqlite_catalog, test_clock};
            use shelf_telemetry::tracing::init_test_tracing;

            $(
                #[tokio::test]
                async fn $case() {
                    init_test_tracing();
                    let clock = test_clock();
                    let catalog = sqlite_catalog(clock.clone()).await;

                    super::$case(catalog, clock).await;
                }
            )*
        }
    };
}

for_each_store!(
    sample_library_is_indexed_like_the_store,
    sample_lending_session,
    borrowing_a_lent_book_fails_until_it_is_returned,
    loans_are_due_after_the_loan_period,
    re_returning_a_loan_is_rejected,
    removed_book_disappears_from_both_keys,
    range_query_is_inclusive_and_ordered,
);

fn instant(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

async fn sample_library_is_indexed_like_the_store<S: CatalogStore>(
    mut catalog: Catalog<S, ManualClock>,
    _clock: ManualClock,
) {
    let report = catalog.ingest(sample_seed()).await.unwrap();

    // Book 19 repeats the ISBN of book 7.
    assert_eq!(report.books_added, SAMPLE_BOOKS.len() - 1);
    assert_eq!(report.books_skipped, 1);
    assert_eq!(report.users_added, SAMPLE_USERS.len());
    assert!(catalog.lookup_book_by_id(BookId::new(19)).is_none());

    let stored_books = catalog.store().load_books().await.unwrap();
    assert_eq!(stored_books.len(), SAMPLE_BOOKS.len() - 1);
    for book in &stored_books {
        assert_eq!(catalog.lookup_book_by_id(book.book_id), Some(book));
        assert_eq!(catalog.lookup_book_by_isbn(&book.isbn), Some(book));
    }

    let bob = catalog.lookup_user_by_id(UserId::new(102)).unwrap();
    assert_eq!(bob.name, "Bob");
    assert_eq!(bob.contact_details, "bob@gmail.com");
    assert!(catalog.lookup_user_by_id(UserId::new(131)).is_none());
    assert!(catalog.lookup_book_by_isbn("0000000000000").is_none());

    catalog.check_consistency().await.unwrap();
}

async fn sample_lending_session<S: CatalogStore>(
    mut catalog: Catalog<S, ManualClock>,
    _clock: ManualClock,
) {
    seed_sample_library(&mut catalog).await;

    let loans = [
        (101, 1),
        (102, 2),
        (104, 31),
        (108, 22),
        (112, 23),
        (113, 11),
        (103, 44),
        (102, 32),
        (101, 21),
        (104, 47),
    ];
    for (expected_id, (user_id, book_id)) in (1..).zip(loans) {
        let transaction = catalog
            .borrow(UserId::new(user_id), BookId::new(book_id))
            .await
            .unwrap();
        assert_eq!(transaction.transaction_id, TransactionId::new(expected_id));
    }

    for transaction_id in [1, 5, 3] {
        catalog
            .return_book(TransactionId::new(transaction_id))
            .await
            .unwrap();
    }

    for book_id in [1, 23, 31] {
        assert!(catalog.lookup_book_by_id(BookId::new(book_id)).unwrap().is_available);
    }
    for book_id in [2, 22, 11, 44, 32, 21, 47] {
        assert!(!catalog.lookup_book_by_id(BookId::new(book_id)).unwrap().is_available);
    }

    let bob: Vec<_> = catalog
        .transactions_for_user(UserId::new(102))
        .into_iter()
        .map(|transaction| transaction.transaction_id.into_inner())
        .collect();
    assert_eq!(bob, vec![2, 8]);

    let sixth = catalog.lookup_transaction(TransactionId::new(6)).unwrap();
    assert_eq!(sixth.user_id, UserId::new(113));
    assert_eq!(sixth.book_id, BookId::new(11));
    assert_eq!(sixth.status, TransactionStatus::Borrowed);
    assert_eq!(
        catalog
            .lookup_transaction(TransactionId::new(5))
            .unwrap()
            .status,
        TransactionStatus::Returned
    );

    assert_eq!(catalog.available_books().len(), SAMPLE_BOOKS.len() - 1 - 7);
    catalog.check_consistency().await.unwrap();
}

async fn borrowing_a_lent_book_fails_until_it_is_returned<S: CatalogStore>(
    mut catalog: Catalog<S, ManualClock>,
    _clock: ManualClock,
) {
    seed_sample_library(&mut catalog).await;

    let loan = catalog.borrow(UserId::new(101), BookId::new(1)).await.unwrap();
    let err = catalog
        .borrow(UserId::new(102), BookId::new(1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BookUnavailable);
    assert!(catalog.lookup_transaction(TransactionId::new(2)).is_none());

    catalog.return_book(loan.transaction_id).await.unwrap();
    let second = catalog.borrow(UserId::new(102), BookId::new(1)).await.unwrap();

    assert_eq!(second.transaction_id, TransactionId::new(2));
    catalog.check_consistency().await.unwrap();
}

async fn loans_are_due_after_the_loan_period<S: CatalogStore>(
    mut catalog: Catalog<S, ManualClock>,
    clock: ManualClock,
) {
    seed_sample_library(&mut catalog).await;

    for (user_id, book_id) in [(101, 1), (102, 2), (103, 3)] {
        clock.advance(TimeDelta::hours(7) + TimeDelta::milliseconds(250));
        let transaction = catalog
            .borrow(UserId::new(user_id), BookId::new(book_id))
            .await
            .unwrap();

        assert_eq!(transaction.transaction_date, clock.now());
        assert_eq!(
            transaction.return_date,
            transaction.transaction_date + TimeDelta::days(LOAN_PERIOD_DAYS)
        );
    }

    // Timestamps survive the store unchanged.
    for transaction in catalog.store().load_transactions().await.unwrap() {
        let indexed = catalog.lookup_transaction(transaction.transaction_id).unwrap();
        assert_eq!(&transaction, indexed);
    }
}

async fn re_returning_a_loan_is_rejected<S: CatalogStore>(
    mut catalog: Catalog<S, ManualClock>,
    _clock: ManualClock,
) {
    catalog
        .add_book((1, "1984", "George Orwell", "9780451524935"))
        .await
        .unwrap();
    catalog
        .add_user((101, "Alice", "alice@gmail.com"))
        .await
        .unwrap();

    let loan = catalog.borrow(UserId::new(101), BookId::new(1)).await.unwrap();
    assert_eq!(loan.transaction_id, TransactionId::new(1));
    assert!(!catalog.lookup_book_by_id(BookId::new(1)).unwrap().is_available);

    let returned = catalog.return_book(TransactionId::new(1)).await.unwrap();
    assert_eq!(returned.status, TransactionStatus::Returned);
    assert!(catalog.lookup_book_by_id(BookId::new(1)).unwrap().is_available);

    // A second loan of the same book must not be released by the stale transaction.
    catalog.borrow(UserId::new(101), BookId::new(1)).await.unwrap();
    let err = catalog.return_book(TransactionId::new(1)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AlreadyReturned);
    assert!(!catalog.lookup_book_by_id(BookId::new(1)).unwrap().is_available);
    let err = catalog.return_book(TransactionId::new(42)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    catalog.check_consistency().await.unwrap();
}

async fn removed_book_disappears_from_both_keys<S: CatalogStore>(
    mut catalog: Catalog<S, ManualClock>,
    _clock: ManualClock,
) {
    seed_sample_library(&mut catalog).await;

    let removed = catalog.remove_book(BookId::new(45)).await.unwrap();

    assert_eq!(removed.title, "Dune");
    assert!(catalog.lookup_book_by_id(BookId::new(45)).is_none());
    assert!(catalog.lookup_book_by_isbn("9780441013593").is_none());
    let stored = catalog.store().load_books().await.unwrap();
    assert!(stored.iter().all(|book| book.book_id != BookId::new(45)));

    let err = catalog.remove_book(BookId::new(45)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // The freed ISBN can be catalogued again.
    catalog
        .add_book((51, "Dune", "Frank Herbert", "9780441013593"))
        .await
        .unwrap();
    catalog.check_consistency().await.unwrap();
}

async fn range_query_is_inclusive_and_ordered<S: CatalogStore>(
    mut catalog: Catalog<S, ManualClock>,
    clock: ManualClock,
) {
    seed_sample_library(&mut catalog).await;

    for (date, book_id) in [
        (instant(2023, 3, 1), 1),
        (instant(2023, 6, 15), 2),
        (instant(2024, 1, 1), 3),
    ] {
        clock.set(date);
        catalog.borrow(UserId::new(101), BookId::new(book_id)).await.unwrap();
    }

    let in_2023 = catalog
        .transactions_in_range(instant(2023, 1, 1), instant(2023, 12, 31))
        .await
        .unwrap();
    let ids: Vec<_> = in_2023
        .iter()
        .map(|transaction| transaction.transaction_id.into_inner())
        .collect();
    assert_eq!(ids, vec![1, 2]);

    // Both bounds are inclusive.
    let exact = catalog
        .transactions_in_range(instant(2023, 6, 15), instant(2024, 1, 1))
        .await
        .unwrap();
    assert_eq!(exact.len(), 2);

    let empty = catalog
        .transactions_in_range(instant(2022, 1, 1), instant(2022, 12, 31))
        .await
        .unwrap();
    assert!(empty.is_empty());
}
