//! Capabilities the coordinator needs from its three backing stores.
//!
//! Each store offers per-key atomicity and nothing more: no transactions
//! span keys or stores. Every call takes the caller's [`Context`] and
//! must check it before doing work. A missing key is reported as
//! [`Error::NotFound`] so callers can treat it as control flow.

use crate::{
    context::Context,
    document::Record,
    error::{Error, Result},
};

/// Logical tables of the metadata store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// Document records keyed by path.
    Documents,
    /// Tag records keyed by tag name.
    Tags,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Self::Documents => "documents",
            Self::Tags => "tags",
        }
    }

    /// What a missing key in this table is called in errors.
    pub fn kind(self) -> &'static str {
        match self {
            Self::Documents => "document",
            Self::Tags => "tag",
        }
    }

    pub(crate) fn read_op(self) -> &'static str {
        match self {
            Self::Documents => "read document",
            Self::Tags => "read tag",
        }
    }

    pub(crate) fn write_op(self) -> &'static str {
        match self {
            Self::Documents => "write document",
            Self::Tags => "write tag",
        }
    }

    pub(crate) fn delete_op(self) -> &'static str {
        match self {
            Self::Documents => "delete document",
            Self::Tags => "delete tag",
        }
    }
}

/// Durable bytes keyed by document path.
pub trait ContentStore: Send + Sync {
    /// Fails with `NotFound` when no blob exists for `path`.
    fn read_file(&self, ctx: &Context, path: &str) -> Result<Vec<u8>>;

    fn write_file(&self, ctx: &Context, path: &str, data: &[u8]) -> Result<()>;

    /// Fails with `NotFound` when no blob exists for `path`.
    fn remove_file(&self, ctx: &Context, path: &str) -> Result<()>;
}

/// Durable records in the `documents` and `tags` tables.
pub trait MetadataStore: Send + Sync {
    /// Fails with `NotFound` when `key` is absent from `table`.
    fn get_item(&self, ctx: &Context, table: Table, key: &str)
    -> Result<Vec<u8>>;

    fn put_item(
        &self,
        ctx: &Context,
        table: Table,
        key: &str,
        record: &[u8],
    ) -> Result<()>;

    /// Deleting an absent key succeeds.
    fn delete_item(&self, ctx: &Context, table: Table, key: &str)
    -> Result<()>;

    /// Every record in `table`, ordered by key.
    fn scan(&self, ctx: &Context, table: Table) -> Result<Vec<Vec<u8>>>;
}

/// Free-text search over document content.
pub trait TextIndex: Send + Sync {
    /// Paths of documents matching `query`. An empty list means no match.
    fn search(&self, ctx: &Context, query: &str) -> Result<Vec<String>>;
}

/// Fetch and decode one record.
pub fn get_record<R: Record>(
    store: &dyn MetadataStore,
    ctx: &Context,
    key: &str,
) -> Result<R> {
    let bytes = store.get_item(ctx, R::TABLE, key)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Encode and store one record under its own key.
pub fn put_record<R: Record>(
    store: &dyn MetadataStore,
    ctx: &Context,
    record: &R,
) -> Result<()> {
    let bytes = serde_json::to_vec(record)?;
    store.put_item(ctx, R::TABLE, record.key(), &bytes)
}

/// Decode every record of one table.
pub fn scan_records<R: Record>(
    store: &dyn MetadataStore,
    ctx: &Context,
) -> Result<Vec<R>> {
    store
        .scan(ctx, R::TABLE)?
        .iter()
        .map(|bytes| serde_json::from_slice(bytes).map_err(Error::from))
        .collect()
}
