use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`], for callers that only need to
/// tell "nothing there" from "something is broken" from "state may be
/// inconsistent".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    StoreFailure,
    RollbackFailure,
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Redb(#[from] redb::Error),

    #[error("database open error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("database storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("database transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("database table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("database commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("search index error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    #[error("record encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("content is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("data directory does not exist and could not be created: {0}")]
    DataDir(PathBuf),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("{op} `{key}` failed: {source}")]
    Store {
        op: &'static str,
        key: String,
        #[source]
        source: Box<Error>,
    },

    #[error(
        "failed to write metadata for `{path}`, content write rolled back: {source}"
    )]
    RolledBack {
        path: String,
        #[source]
        source: Box<Error>,
    },

    #[error(
        "failed to write metadata for `{path}` ({source}) and rollback of its content failed, blob is orphaned: {rollback}"
    )]
    RollbackFailed {
        path: String,
        #[source]
        source: Box<Error>,
        rollback: Box<Error>,
    },

    #[error(
        "content for `{path}` was removed but its metadata record was not, record is orphaned: {source}"
    )]
    OrphanedMetadata {
        path: String,
        #[source]
        source: Box<Error>,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl Error {
    /// Wrap an underlying store error, naming the step that failed.
    pub fn store(op: &'static str, key: &str, source: Error) -> Self {
        Self::Store {
            op,
            key: key.to_string(),
            source: Box::new(source),
        }
    }

    pub fn not_found(kind: &'static str, name: &str) -> Self {
        Self::NotFound {
            kind,
            name: name.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Cancelled | Self::DeadlineExceeded => ErrorKind::Cancelled,
            Self::Store { source, .. } | Self::RolledBack { source, .. }
                if source.kind() == ErrorKind::Cancelled =>
            {
                ErrorKind::Cancelled
            }
            Self::RollbackFailed { .. } => ErrorKind::RollbackFailure,
            _ => ErrorKind::StoreFailure,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// True when the failed operation may have left a blob or record
    /// behind that needs reconciling.
    pub fn leaves_orphan(&self) -> bool {
        matches!(
            self,
            Self::RollbackFailed { .. } | Self::OrphanedMetadata { .. }
        )
    }
}
