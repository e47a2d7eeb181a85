//! Error types and result definitions for catalog operations.
//!
//! Every fallible catalog call returns a [`CatalogError`] classified by an [`ErrorKind`]. The
//! kinds cover the domain outcomes callers are expected to branch on (missing records, key
//! collisions, lending conflicts) as well as infrastructure failures from the durable store.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Convenient result type for catalog operations using [`CatalogError`] as the error type.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Detailed payload stored for every [`CatalogError`].
#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Main error type for catalog operations.
///
/// Carries a [`ErrorKind`] for programmatic handling, a static description, an optional
/// dynamic detail (usually the offending key) and an optional source error.
#[derive(Debug, Clone)]
pub struct CatalogError {
    payload: ErrorPayload,
}

/// Categories of errors that can occur while operating the catalog.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Domain Errors
    NotFound,
    DuplicateKey,
    BookUnavailable,
    AlreadyReturned,
    OpenLoans,

    // Consistency Errors
    IndexDiverged,
    InvalidData,

    // Store Errors
    StoreConnectionFailed,
    StoreQueryFailed,

    // IO & Serialization Errors
    IoError,
    DeserializationError,

    // Configuration Errors
    ConfigError,

    // Special error kind returned by fail points during tests.
    #[cfg(feature = "failpoints")]
    InjectedFault,

    // Unknown / Uncategorized
    Unknown,
}

impl CatalogError {
    /// Returns the [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        self.payload.kind
    }

    /// Returns the static description of this error.
    pub fn description(&self) -> &str {
        &self.payload.description
    }

    /// Returns the detailed error information if available.
    pub fn detail(&self) -> Option<&str> {
        self.payload.detail.as_deref()
    }

    /// Returns the captured backtrace for this error.
    pub fn backtrace(&self) -> &Backtrace {
        self.payload.backtrace.as_ref()
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        self.payload.location
    }

    /// Attaches an originating [`error::Error`] to this error and returns the modified instance.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.payload.source = Some(Arc::new(source));
        self
    }

    /// Creates a [`CatalogError`] from its components.
    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        CatalogError {
            payload: ErrorPayload {
                kind,
                description,
                detail,
                source,
                location: Location::caller(),
                backtrace: Arc::new(Backtrace::capture()),
            },
        }
    }
}

impl PartialEq for CatalogError {
    fn eq(&self, other: &CatalogError) -> bool {
        self.payload.kind == other.payload.kind
    }
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        let payload = &self.payload;
        let location = payload.location;
        write!(
            f,
            "[{:?}] {} @ {}:{}:{}",
            payload.kind,
            payload.description,
            location.file(),
            location.line(),
            location.column()
        )?;

        if let Some(detail) = payload.detail.as_deref() {
            write!(f, "\n  Detail:")?;
            for line in detail.lines() {
                write!(f, "\n    {line}")?;
            }
        }

        let rendered_backtrace = format!("{}", payload.backtrace);
        if !rendered_backtrace.trim().is_empty() {
            write!(f, "\n  Backtrace:")?;
            for line in rendered_backtrace.lines() {
                write!(f, "\n    {line}")?;
            }
        }

        Ok(())
    }
}

impl error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.payload
            .source
            .as_ref()
            .map(|source| source as &(dyn error::Error + 'static))
    }
}

/// Creates a [`CatalogError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for CatalogError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> CatalogError {
        CatalogError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates a [`CatalogError`] from an error kind, static description, and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for CatalogError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> CatalogError {
        CatalogError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Converts [`std::io::Error`] to [`CatalogError`] with [`ErrorKind::IoError`].
impl From<std::io::Error> for CatalogError {
    #[track_caller]
    fn from(err: std::io::Error) -> CatalogError {
        let detail = err.to_string();
        CatalogError::from_components(
            ErrorKind::IoError,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`serde_json::Error`] to [`CatalogError`].
///
/// I/O failures map to [`ErrorKind::IoError`], everything else to
/// [`ErrorKind::DeserializationError`] since the catalog only ever parses JSON.
impl From<serde_json::Error> for CatalogError {
    #[track_caller]
    fn from(err: serde_json::Error) -> CatalogError {
        let (kind, description) = match err.classify() {
            serde_json::error::Category::Io => (ErrorKind::IoError, "JSON I/O operation failed"),
            serde_json::error::Category::Syntax
            | serde_json::error::Category::Data
            | serde_json::error::Category::Eof => (
                ErrorKind::DeserializationError,
                "JSON deserialization failed",
            ),
        };

        let detail = err.to_string();
        CatalogError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`sqlx::Error`] to [`CatalogError`] with the appropriate error kind.
///
/// Unique constraint violations become [`ErrorKind::DuplicateKey`], a missing row becomes
/// [`ErrorKind::NotFound`], pool failures become [`ErrorKind::StoreConnectionFailed`] and
/// everything else [`ErrorKind::StoreQueryFailed`].
impl From<sqlx::Error> for CatalogError {
    #[track_caller]
    fn from(err: sqlx::Error) -> CatalogError {
        let (kind, description) = match &err {
            sqlx::Error::Database(db_err) if is_unique_violation(db_err.as_ref()) => {
                (ErrorKind::DuplicateKey, "Record key already exists")
            }
            sqlx::Error::RowNotFound => (ErrorKind::NotFound, "Record not found"),
            sqlx::Error::Io(_) => (ErrorKind::IoError, "Store I/O operation failed"),
            sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => (
                ErrorKind::StoreConnectionFailed,
                "Store connection unavailable",
            ),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                (ErrorKind::InvalidData, "Stored value could not be decoded")
            }
            _ => (ErrorKind::StoreQueryFailed, "Store operation failed"),
        };

        let detail = err.to_string();
        CatalogError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// SQLite extended result codes for primary key and unique constraint violations.
const SQLITE_CONSTRAINT_PRIMARYKEY: &str = "1555";
const SQLITE_CONSTRAINT_UNIQUE: &str = "2067";

fn is_unique_violation(err: &dyn sqlx::error::DatabaseError) -> bool {
    err.is_unique_violation()
        || matches!(
            err.code().as_deref(),
            Some(SQLITE_CONSTRAINT_PRIMARYKEY | SQLITE_CONSTRAINT_UNIQUE)
        )
}

/// Converts [`sqlx::migrate::MigrateError`] to [`CatalogError`] with
/// [`ErrorKind::StoreQueryFailed`].
impl From<sqlx::migrate::MigrateError> for CatalogError {
    #[track_caller]
    fn from(err: sqlx::migrate::MigrateError) -> CatalogError {
        let detail = err.to_string();
        CatalogError::from_components(
            ErrorKind::StoreQueryFailed,
            Cow::Borrowed("Store migration failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}
