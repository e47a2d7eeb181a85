use shelf::error::ErrorKind;
use shelf::failpoints::{CLOSE_LOAN__BEFORE_BOOK_UPDATE, OPEN_LOAN__BEFORE_RECORD};
use shelf::store::CatalogStore;
use shelf::test_utils::failpoints::FailPointGuard;
use shelf::test_utils::fixtures::{seed_sample_library, sqlite_catalog, test_clock};
use shelf::types::{BookId, TransactionId, TransactionStatus, UserId};
use shelf_telemetry::tracing::init_test_tracing;

#[tokio::test]
async fn failed_open_loan_rolls_back_the_availability_change() {
    init_test_tracing();
    let mut catalog = sqlite_catalog(test_clock()).await;
    seed_sample_library(&mut catalog).await;

    {
        let _guard = FailPointGuard::setup(&[(OPEN_LOAN__BEFORE_RECORD, "return")]);

        let err = catalog
            .borrow(UserId::new(101), BookId::new(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InjectedFault);
    }

    let books = catalog.store().load_books().await.unwrap();
    assert!(books[0].is_available);
    assert!(catalog.store().load_transactions().await.unwrap().is_empty());
    assert!(catalog.lookup_book_by_id(BookId::new(1)).unwrap().is_available);
    catalog.check_consistency().await.unwrap();

    let transaction = catalog.borrow(UserId::new(101), BookId::new(1)).await.unwrap();
    assert_eq!(transaction.transaction_id, TransactionId::new(1));
}

#[tokio::test]
async fn failed_close_loan_rolls_back_the_status_change() {
    init_test_tracing();
    let mut catalog = sqlite_catalog(test_clock()).await;
    seed_sample_library(&mut catalog).await;
    let loan = catalog.borrow(UserId::new(101), BookId::new(1)).await.unwrap();

    {
        let _guard = FailPointGuard::setup(&[(CLOSE_LOAN__BEFORE_BOOK_UPDATE, "return")]);

        let err = catalog.return_book(loan.transaction_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InjectedFault);
    }

    let transactions = catalog.store().load_transactions().await.unwrap();
    assert_eq!(transactions[0].status, TransactionStatus::Borrowed);
    assert!(!catalog.store().load_books().await.unwrap()[0].is_available);
    assert_eq!(
        catalog
            .lookup_transaction(loan.transaction_id)
            .unwrap()
            .status,
        TransactionStatus::Borrowed
    );
    catalog.check_consistency().await.unwrap();

    let returned = catalog.return_book(loan.transaction_id).await.unwrap();
    assert_eq!(returned.status, TransactionStatus::Returned);
}
