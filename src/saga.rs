//! Ordered multi-store write sequences with compensating actions.
//!
//! Content and metadata live in stores that share no transaction, so a
//! document write or removal is a short sequence of single-store steps.
//! Each sequence is a small state machine; its final state says exactly
//! which stores were touched, which makes partial failures observable.

use tracing::{debug, error, warn};

use crate::{
    context::Context,
    error::{Error, Result},
    store::{ContentStore, MetadataStore, Table},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutState {
    Pending,
    ContentWritten,
    MetadataWritten,
    /// Metadata write failed; the content blob was removed again.
    RolledBack,
    /// Metadata write failed and the blob could not be removed.
    RollbackFailed,
}

/// Writes content first, then the metadata record, undoing the content
/// write if the metadata write fails.
pub struct PutSaga<'a> {
    content: &'a dyn ContentStore,
    metadata: &'a dyn MetadataStore,
    path: &'a str,
    state: PutState,
}

impl<'a> PutSaga<'a> {
    pub fn new(
        content: &'a dyn ContentStore,
        metadata: &'a dyn MetadataStore,
        path: &'a str,
    ) -> Self {
        Self {
            content,
            metadata,
            path,
            state: PutState::Pending,
        }
    }

    pub fn state(&self) -> PutState {
        self.state
    }

    pub fn run(
        &mut self,
        ctx: &Context,
        content: &[u8],
        record: &[u8],
    ) -> Result<()> {
        // Nothing has been written yet, so there is nothing to undo.
        self.content
            .write_file(ctx, self.path, content)
            .map_err(|e| Error::store("write content", self.path, e))?;
        self.state = PutState::ContentWritten;
        debug!(path = self.path, "content written");

        if let Err(cause) =
            self.metadata
                .put_item(ctx, Table::Documents, self.path, record)
        {
            return Err(self.rollback(ctx, cause));
        }
        self.state = PutState::MetadataWritten;
        debug!(path = self.path, "metadata written");
        Ok(())
    }

    fn rollback(&mut self, ctx: &Context, cause: Error) -> Error {
        // The caller's deadline may be what failed the metadata write;
        // the compensating delete must still run.
        let detached = ctx.detached();
        match self.content.remove_file(&detached, self.path) {
            Ok(()) => {
                self.state = PutState::RolledBack;
                warn!(path = self.path, error = %cause, "metadata write failed, content rolled back");
                Error::RolledBack {
                    path: self.path.to_string(),
                    source: Box::new(cause),
                }
            }
            Err(rollback) => {
                self.state = PutState::RollbackFailed;
                error!(
                    path = self.path,
                    error = %cause,
                    rollback_error = %rollback,
                    "metadata write failed and content rollback failed, blob orphaned"
                );
                Error::RollbackFailed {
                    path: self.path.to_string(),
                    source: Box::new(cause),
                    rollback: Box::new(rollback),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveState {
    Pending,
    ContentRemoved,
    MetadataRemoved,
    /// Content is gone but the metadata record could not be deleted.
    MetadataOrphaned,
}

/// Removes content first, then the metadata record.
///
/// A failed content removal leaves both in place, so a document is never
/// observable with metadata gone but content present.
pub struct RemoveSaga<'a> {
    content: &'a dyn ContentStore,
    metadata: &'a dyn MetadataStore,
    path: &'a str,
    state: RemoveState,
}

impl<'a> RemoveSaga<'a> {
    pub fn new(
        content: &'a dyn ContentStore,
        metadata: &'a dyn MetadataStore,
        path: &'a str,
    ) -> Self {
        Self {
            content,
            metadata,
            path,
            state: RemoveState::Pending,
        }
    }

    pub fn state(&self) -> RemoveState {
        self.state
    }

    pub fn run(&mut self, ctx: &Context) -> Result<()> {
        self.content.remove_file(ctx, self.path).map_err(|e| {
            if e.is_not_found() {
                e
            } else {
                Error::store("remove content", self.path, e)
            }
        })?;
        self.state = RemoveState::ContentRemoved;
        debug!(path = self.path, "content removed");

        // Content is already gone; a deadline or cancellation must not
        // strand the record now.
        let detached = ctx.detached();
        if let Err(cause) =
            self.metadata
                .delete_item(&detached, Table::Documents, self.path)
        {
            self.state = RemoveState::MetadataOrphaned;
            error!(
                path = self.path,
                error = %cause,
                "content removed but metadata delete failed, record orphaned"
            );
            return Err(Error::OrphanedMetadata {
                path: self.path.to_string(),
                source: Box::new(cause),
            });
        }
        self.state = RemoveState::MetadataRemoved;
        debug!(path = self.path, "metadata removed");
        Ok(())
    }
}
