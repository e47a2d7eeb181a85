use shelf::catalog::Catalog;
use shelf::error::ErrorKind;
use shelf::store::{CatalogStore, MemoryStore};
use shelf::test_utils::fault_store::{FaultConfig, FaultInjectingStore};
use shelf::test_utils::fixtures::{TempDatabase, seed_sample_library, test_clock};
use shelf::types::{BookId, BookUpdate, NewBook, TransactionId, UserId};
use shelf_telemetry::tracing::init_test_tracing;

#[tokio::test]
async fn reopened_sqlite_catalog_rebuilds_the_same_index() {
    init_test_tracing();
    let database = TempDatabase::new();
    let clock = test_clock();

    let mut catalog = Catalog::open(database.connect().await, clock.clone())
        .await
        .unwrap();
    seed_sample_library(&mut catalog).await;
    catalog.borrow(UserId::new(101), BookId::new(1)).await.unwrap();
    catalog.borrow(UserId::new(102), BookId::new(2)).await.unwrap();
    catalog.return_book(TransactionId::new(1)).await.unwrap();
    catalog.remove_book(BookId::new(50)).await.unwrap();
    let before = catalog.index().clone();
    catalog.close().await;

    let catalog = Catalog::open(database.connect().await, clock).await.unwrap();

    assert_eq!(catalog.index(), &before);
    assert!(database.path().exists());
    assert!(catalog.lookup_book_by_id(BookId::new(1)).unwrap().is_available);
    assert!(!catalog.lookup_book_by_id(BookId::new(2)).unwrap().is_available);
    assert!(catalog.lookup_book_by_isbn("9781590302255").is_none());
}

#[tokio::test]
async fn transaction_ids_are_not_reused_after_reopening() {
    init_test_tracing();
    let database = TempDatabase::new();
    let clock = test_clock();

    let mut catalog = Catalog::open(database.connect().await, clock.clone())
        .await
        .unwrap();
    seed_sample_library(&mut catalog).await;
    let first = catalog.borrow(UserId::new(101), BookId::new(1)).await.unwrap();
    catalog.close().await;

    let mut catalog = Catalog::open(database.connect().await, clock).await.unwrap();
    let second = catalog.borrow(UserId::new(101), BookId::new(2)).await.unwrap();

    assert!(second.transaction_id > first.transaction_id);
}

#[tokio::test]
async fn consistency_check_detects_writes_behind_the_index() {
    init_test_tracing();
    let store = MemoryStore::new();
    let mut catalog = Catalog::open(store.clone(), test_clock()).await.unwrap();
    seed_sample_library(&mut catalog).await;
    catalog.check_consistency().await.unwrap();

    store
        .put_book(&NewBook::new(
            BookId::new(51),
            "The Iliad",
            "Homer",
            "9780140275360",
        ))
        .await
        .unwrap();

    let err = catalog.check_consistency().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IndexDiverged);
    assert!(catalog.lookup_book_by_id(BookId::new(51)).is_none());

    catalog.rebuild_index().await.unwrap();

    catalog.check_consistency().await.unwrap();
    assert_eq!(
        catalog.lookup_book_by_isbn("9780140275360").unwrap().book_id,
        BookId::new(51)
    );
}

#[tokio::test]
async fn failed_store_writes_leave_the_catalog_untouched() {
    init_test_tracing();
    let store = MemoryStore::new();
    let mut seeding = Catalog::open(store.clone(), test_clock()).await.unwrap();
    seed_sample_library(&mut seeding).await;
    seeding.borrow(UserId::new(101), BookId::new(1)).await.unwrap();

    let failing = FaultInjectingStore::wrap(store.clone(), FaultConfig::all_writes());
    let mut catalog = Catalog::open(failing, test_clock()).await.unwrap();
    let before = catalog.index().clone();

    let errors = [
        catalog
            .add_book((51, "The Iliad", "Homer", "9780140275360"))
            .await
            .unwrap_err(),
        catalog
            .update_book(
                BookId::new(2),
                BookUpdate {
                    title: Some("Mockingbird".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err(),
        catalog.remove_book(BookId::new(3)).await.unwrap_err(),
        catalog
            .add_user((131, "Eve", "eve@gmail.com"))
            .await
            .unwrap_err(),
        catalog.remove_user(UserId::new(130)).await.unwrap_err(),
        catalog
            .borrow(UserId::new(102), BookId::new(2))
            .await
            .unwrap_err(),
        catalog
            .return_book(TransactionId::new(1))
            .await
            .unwrap_err(),
    ];

    for err in errors {
        assert_eq!(err.kind(), ErrorKind::StoreQueryFailed);
    }
    assert_eq!(catalog.index(), &before);
    catalog.check_consistency().await.unwrap();
    assert_eq!(catalog.store().get_inner().load_transactions().await.unwrap().len(), 1);
}

#[tokio::test]
async fn removed_users_keep_their_history_across_reopening() {
    init_test_tracing();
    let database = TempDatabase::new();
    let clock = test_clock();

    let mut catalog = Catalog::open(database.connect().await, clock.clone())
        .await
        .unwrap();
    seed_sample_library(&mut catalog).await;
    let loan = catalog.borrow(UserId::new(105), BookId::new(5)).await.unwrap();
    catalog.return_book(loan.transaction_id).await.unwrap();
    catalog.remove_user(UserId::new(105)).await.unwrap();
    catalog.close().await;

    let catalog = Catalog::open(database.connect().await, clock).await.unwrap();

    assert!(catalog.lookup_user_by_id(UserId::new(105)).is_none());
    let history = catalog.transactions_for_user(UserId::new(105));
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].book_id, BookId::new(5));
}
