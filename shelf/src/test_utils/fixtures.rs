use std::path::{Path, PathBuf};

use chrono::{TimeZone, Utc};
use shelf_config::shared::SqliteStoreConfig;
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::clock::ManualClock;
use crate::loader::CatalogSeed;
use crate::store::{CatalogStore, MemoryStore, SqliteStore};

/// Books of the sample library. Book 19 repeats the ISBN of book 7.
pub const SAMPLE_BOOKS: &[(i64, &str, &str, &str)] = &[
    (1, "1984", "George Orwell", "9780451524935"),
    (2, "To Kill a Mockingbird", "Harper Lee", "9780061120084"),
    (3, "Pride and Prejudice", "Jane Austen", "9781503290563"),
    (4, "The Great Gatsby", "F. Scott Fitzgerald", "9780743273565"),
    (5, "Moby-Dick", "Herman Melville", "9781503280786"),
    (6, "War and Peace", "Leo Tolstoy", "9780143039990"),
    (7, "The Catcher in the Rye", "J.D. Salinger", "9780316769488"),
    (8, "The Hobbit", "J.R.R. Tolkien", "9780547928227"),
    (9, "Fahrenheit 451", "Ray Bradbury", "9781451673319"),
    (10, "The Odyssey", "Homer", "9780140268867"),
    (11, "Crime and Punishment", "Fyodor Dostoevsky", "9780486454115"),
    (12, "The Brothers Karamazov", "Fyodor Dostoevsky", "9780374528379"),
    (13, "Jane Eyre", "Charlotte Brontë", "9780141441146"),
    (14, "Brave New World", "Aldous Huxley", "9780060850524"),
    (15, "The Divine Comedy", "Dante Alighieri", "9780142437223"),
    (16, "Les Misérables", "Victor Hugo", "9780451419439"),
    (17, "Wuthering Heights", "Emily Brontë", "9780141439556"),
    (18, "Anna Karenina", "Leo Tolstoy", "9781400079988"),
    (19, "The Catcher in the Rye", "J.D. Salinger", "9780316769488"),
    (20, "The Picture of Dorian Gray", "Oscar Wilde", "9780141439570"),
    (21, "Dracula", "Bram Stoker", "9780486411097"),
    (22, "Frankenstein", "Mary Shelley", "9780486282114"),
    (23, "The Stranger", "Albert Camus", "9780679736376"),
    (24, "The Scarlet Letter", "Nathaniel Hawthorne", "9780142437261"),
    (25, "A Tale of Two Cities", "Charles Dickens", "9780486406512"),
    (26, "The Sun Also Rises", "Ernest Hemingway", "9780743297332"),
    (27, "The Grapes of Wrath", "John Steinbeck", "9780143039433"),
    (28, "The Road", "Cormac McCarthy", "9780307387899"),
    (29, "One Hundred Years of Solitude", "Gabriel García Márquez", "9780060883287"),
    (30, "Slaughterhouse-Five", "Kurt Vonnegut", "9780440180296"),
    (31, "The Shining", "Stephen King", "9780307743657"),
    (32, "The Color Purple", "Alice Walker", "9780156031820"),
    (33, "The Alchemist", "Paulo Coelho", "9780062315007"),
    (34, "Catch-22", "Joseph Heller", "9781451626683"),
    (35, "The Godfather", "Mario Puzo", "9780451205766"),
    (36, "The Lord of the Rings", "J.R.R. Tolkien", "9780544003415"),
    (37, "The Hunger Games", "Suzanne Collins", "9780439023481"),
    (38, "The Twilight Saga", "Stephenie Meyer", "9780316015844"),
    (39, "Harry Potter and the Sorcerer's Stone", "J.K. Rowling", "9780590353427"),
    (40, "The Chronicles of Narnia", "C.S. Lewis", "9780066238500"),
    (41, "The Maze Runner", "James Dashner", "9780385737951"),
    (42, "The Outsiders", "S.E. Hinton", "9780142407332"),
    (43, "The Hitchhiker's Guide to the Galaxy", "Douglas Adams", "9780345391803"),
    (44, "Ender's Game", "Orson Scott Card", "9780812550702"),
    (45, "Dune", "Frank Herbert", "9780441013593"),
    (46, "The Handmaid's Tale", "Margaret Atwood", "9780385490818"),
    (47, "The Secret Garden", "Frances Hodgson Burnett", "9780141321042"),
    (48, "The Wind in the Willows", "Kenneth Grahame", "9780486283661"),
    (49, "The Little Prince", "Antoine de Saint-Exupéry", "9780156012195"),
    (50, "The Art of War", "Sun Tzu", "9781590302255"),
];

/// Members of the sample library.
pub const SAMPLE_USERS: &[(i64, &str, &str)] = &[
    (101, "Alice", "alice@gmail.com"),
    (102, "Bob", "bob@gmail.com"),
    (103, "Charlie", "charlie@gmail.com"),
    (104, "David", "david@gmail.com"),
    (105, "Eva", "eva@gmail.com"),
    (106, "Frank", "frank@gmail.com"),
    (107, "Grace", "grace@gmail.com"),
    (108, "Hannah", "hannah@gmail.com"),
    (109, "Ivy", "ivy@gmail.com"),
    (110, "Jack", "jack@gmail.com"),
    (111, "Kathy", "kathy@gmail.com"),
    (112, "Liam", "liam@gmail.com"),
    (113, "Mona", "mona@gmail.com"),
    (114, "Nathan", "nathan@gmail.com"),
    (115, "Olivia", "olivia@gmail.com"),
    (116, "Peter", "peter@gmail.com"),
    (117, "Quincy", "quincy@gmail.com"),
    (118, "Rachel", "rachel@gmail.com"),
    (119, "Sam", "sam@gmail.com"),
    (120, "Tina", "tina@gmail.com"),
    (121, "Ursula", "ursula@gmail.com"),
    (122, "Victor", "victor@gmail.com"),
    (123, "Wendy", "wendy@gmail.com"),
    (124, "Xander", "xander@gmail.com"),
    (125, "Yara", "yara@gmail.com"),
    (126, "Zane", "zane@gmail.com"),
    (127, "Amy", "amy@gmail.com"),
    (128, "Brian", "brian@gmail.com"),
    (129, "Catherine", "catherine@gmail.com"),
    (130, "Daniel", "daniel@gmail.com"),
];

/// Returns the sample library as a seed document.
pub fn sample_seed() -> CatalogSeed {
    CatalogSeed::new(SAMPLE_BOOKS.iter().copied(), SAMPLE_USERS.iter().copied())
}

/// Returns a manual clock set to 2023-03-01 10:00:00 UTC.
pub fn test_clock() -> ManualClock {
    ManualClock::new(
        Utc.with_ymd_and_hms(2023, 3, 1, 10, 0, 0)
            .single()
            .expect("valid test instant"),
    )
}

/// Opens an empty catalog over a fresh [`MemoryStore`].
pub async fn memory_catalog(clock: ManualClock) -> Catalog<MemoryStore, ManualClock> {
    Catalog::open(MemoryStore::new(), clock)
        .await
        .expect("failed to open memory catalog")
}

/// Opens an empty catalog over a private in-memory SQLite database.
pub async fn sqlite_catalog(clock: ManualClock) -> Catalog<SqliteStore, ManualClock> {
    let store = SqliteStore::connect_in_memory()
        .await
        .expect("failed to open in-memory sqlite store");

    Catalog::open(store, clock)
        .await
        .expect("failed to open sqlite catalog")
}

/// Ingests [`sample_seed`] into `catalog`.
pub async fn seed_sample_library<S, C>(catalog: &mut Catalog<S, C>)
where
    S: CatalogStore,
    C: crate::clock::Clock,
{
    catalog
        .ingest(sample_seed())
        .await
        .expect("failed to ingest the sample library");
}

/// A SQLite database file in the system temp directory, removed on drop.
#[derive(Debug)]
pub struct TempDatabase {
    path: PathBuf,
}

impl TempDatabase {
    pub fn new() -> Self {
        let path = std::env::temp_dir().join(format!("shelf-test-{}.db", Uuid::new_v4()));

        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns a store configuration that creates the file on first connect.
    pub fn config(&self) -> SqliteStoreConfig {
        SqliteStoreConfig {
            path: self.path.clone(),
            create_if_missing: true,
        }
    }

    pub async fn connect(&self) -> SqliteStore {
        SqliteStore::connect(&self.config())
            .await
            .expect("failed to open sqlite store")
    }
}

impl Default for TempDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TempDatabase {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm", "-journal"] {
            let mut path = self.path.clone().into_os_string();
            path.push(suffix);
            let _ = std::fs::remove_file(path);
        }
    }
}
