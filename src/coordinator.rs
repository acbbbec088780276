//! Document CRUD and tagging across the content, metadata and text stores.
//!
//! # Invariants
//! - A document record in the metadata store never carries content.
//! - `created_at` is set on the first successful write and never changes.
//! - A path appears at most once in any tag's path set.
//!
//! # Consistency
//! The stores share no transaction. Writes go content first, then
//! metadata, with the content write undone if the metadata write fails
//! (see [`crate::saga`]). Tag updates are read-modify-write per tag and
//! can lose updates under concurrent taggers of the same tag.

use std::sync::Arc;

use tracing::debug;

use crate::{
    clock::{Clock, SystemClock},
    context::Context,
    document::{Document, Record, Tag, validate_path, validate_tags},
    error::{Error, Result},
    saga::{PutSaga, RemoveSaga},
    store::{
        ContentStore,
        MetadataStore,
        TextIndex,
        get_record,
        put_record,
        scan_records,
    },
};

/// Default cap on documents returned by a query listing.
pub const DEFAULT_SEARCH_LIMIT: usize = 1000;

/// Stateless orchestrator over the three injected stores.
///
/// Cheap to clone and safe to share between threads; all state lives in
/// the stores.
#[derive(Clone)]
pub struct Coordinator {
    pub(crate) content: Arc<dyn ContentStore>,
    pub(crate) metadata: Arc<dyn MetadataStore>,
    pub(crate) index: Arc<dyn TextIndex>,
    clock: Arc<dyn Clock>,
    pub(crate) search_limit: Option<usize>,
}

impl Coordinator {
    pub fn new(
        content: Arc<dyn ContentStore>,
        metadata: Arc<dyn MetadataStore>,
        index: Arc<dyn TextIndex>,
    ) -> Self {
        Self {
            content,
            metadata,
            index,
            clock: Arc::new(SystemClock),
            search_limit: None,
        }
    }

    /// Replace the timestamp source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Cap how many documents a listing with a text query returns.
    ///
    /// The cap applies after tag filtering, so it never hides tagged
    /// matches behind untagged ones.
    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = Some(limit.max(1));
        self
    }

    /// Fetch a document with its content attached.
    ///
    /// Fails with `NotFound` when no metadata record exists. A record
    /// whose content blob is missing is a consistency fault and fails with
    /// a store error instead of returning empty content.
    pub fn get_doc(&self, ctx: &Context, path: &str) -> Result<Document> {
        ctx.check()?;
        validate_path(path)?;
        let mut doc = self
            .lookup::<Document>(ctx, path)?
            .ok_or_else(|| Error::not_found("document", path))?;

        let bytes = self
            .content
            .read_file(ctx, path)
            .map_err(|e| Error::store("read content", path, e))?;
        doc.content = String::from_utf8(bytes)
            .map_err(|e| Error::store("decode content", path, e.into()))?;
        Ok(doc)
    }

    /// Fetch the metadata record only.
    pub fn get_meta(&self, ctx: &Context, path: &str) -> Result<Document> {
        ctx.check()?;
        validate_path(path)?;
        self.lookup::<Document>(ctx, path)?
            .ok_or_else(|| Error::not_found("document", path))
    }

    /// Create or update a document.
    ///
    /// The path must be canonical (see [`validate_path`]).
    /// Returns the metadata record as stored (without content).
    pub fn put_doc(&self, ctx: &Context, mut doc: Document) -> Result<Document> {
        ctx.check()?;
        validate_path(&doc.path)?;

        let now = self.clock.now_millis();
        doc.created_at = match self.lookup::<Document>(ctx, &doc.path)? {
            Some(existing) => existing.created_at,
            None => now,
        };
        doc.updated_at = now;

        let content = std::mem::take(&mut doc.content);
        let record = serde_json::to_vec(&doc)?;

        PutSaga::new(&*self.content, &*self.metadata, &doc.path).run(
            ctx,
            content.as_bytes(),
            &record,
        )?;
        debug!(path = %doc.path, created_at = doc.created_at, "document stored");
        Ok(doc)
    }

    /// Add `path` to each named tag.
    ///
    /// Tags are handled one at a time and the call stops at the first
    /// failure; tags processed before it stay committed. Tagging a path
    /// that already carries a tag is a no-op for that tag.
    pub fn tag_doc<S: AsRef<str>>(
        &self,
        ctx: &Context,
        path: &str,
        tags: &[S],
    ) -> Result<()> {
        ctx.check()?;
        validate_tagging(path, tags)?;

        for name in tags {
            let name = name.as_ref();
            let mut tag = self
                .lookup::<Tag>(ctx, name)?
                .unwrap_or_else(|| Tag::new(name));

            if !tag.insert(path) {
                debug!(path, tag = name, "already tagged");
                continue;
            }

            self.store_record(ctx, &tag)?;
            debug!(path, tag = name, "tagged");
        }

        Ok(())
    }

    /// Remove `path` from each named tag, deleting tags left empty.
    ///
    /// Same per-tag, fail-fast semantics as [`Coordinator::tag_doc`].
    pub fn untag_doc<S: AsRef<str>>(
        &self,
        ctx: &Context,
        path: &str,
        tags: &[S],
    ) -> Result<()> {
        ctx.check()?;
        validate_tagging(path, tags)?;

        for name in tags {
            let name = name.as_ref();
            let Some(mut tag) = self.lookup::<Tag>(ctx, name)? else {
                continue;
            };
            if !tag.remove(path) {
                continue;
            }

            if tag.paths.is_empty() {
                self.metadata
                    .delete_item(ctx, Tag::TABLE, name)
                    .map_err(|e| Error::store(Tag::TABLE.delete_op(), name, e))?;
                debug!(path, tag = name, "untagged, tag removed");
            } else {
                self.store_record(ctx, &tag)?;
                debug!(path, tag = name, "untagged");
            }
        }

        Ok(())
    }

    /// Every tag record, ordered by name.
    pub fn list_tags(&self, ctx: &Context) -> Result<Vec<Tag>> {
        ctx.check()?;
        scan_records::<Tag>(&*self.metadata, ctx)
            .map_err(|e| Error::store("scan", Tag::TABLE.name(), e))
    }

    /// Delete a document's content and then its metadata record.
    ///
    /// Tag records that list the path are left untouched; listings skip
    /// such stale references.
    pub fn remove_doc(&self, ctx: &Context, path: &str) -> Result<()> {
        ctx.check()?;
        validate_path(path)?;
        RemoveSaga::new(&*self.content, &*self.metadata, path).run(ctx)?;
        debug!(path, "document removed");
        Ok(())
    }

    /// Fetch one record, mapping `NotFound` to `None`.
    pub(crate) fn lookup<R: Record>(
        &self,
        ctx: &Context,
        key: &str,
    ) -> Result<Option<R>> {
        match get_record::<R>(&*self.metadata, ctx, key) {
            Ok(record) => Ok(Some(record)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(Error::store(R::TABLE.read_op(), key, e)),
        }
    }

    fn store_record<R: Record>(&self, ctx: &Context, record: &R) -> Result<()> {
        put_record(&*self.metadata, ctx, record)
            .map_err(|e| Error::store(R::TABLE.write_op(), record.key(), e))
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator").finish_non_exhaustive()
    }
}

fn validate_tagging<S: AsRef<str>>(path: &str, tags: &[S]) -> Result<()> {
    validate_path(path)?;
    validate_tags(tags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        content_store::FsContentStore,
        metadata_db::RedbMetadataStore,
        store::Table,
        tantivy_index::TantivyTextIndex,
    };

    fn test_coordinator() -> (tempfile::TempDir, Coordinator) {
        let tmp = tempfile::tempdir().unwrap();
        let content = FsContentStore::open(&tmp.path().join("content")).unwrap();
        let metadata =
            RedbMetadataStore::open(&tmp.path().join("metadata.redb")).unwrap();
        let index = TantivyTextIndex::open_in_ram().unwrap();
        let coordinator = Coordinator::new(
            Arc::new(content),
            Arc::new(metadata),
            Arc::new(index),
        );
        (tmp, coordinator)
    }

    #[test]
    fn stored_record_has_no_content() {
        let (_tmp, c) = test_coordinator();
        let ctx = Context::background();

        let stored = c.put_doc(&ctx, Document::new("a.md", "secret")).unwrap();
        assert!(stored.content.is_empty());

        let raw = c.metadata.get_item(&ctx, Table::Documents, "a.md").unwrap();
        let json: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert!(json.get("content").is_none());
    }

    #[test]
    fn get_meta_skips_content() {
        let (_tmp, c) = test_coordinator();
        let ctx = Context::background();
        c.put_doc(&ctx, Document::new("a.md", "body").with_title("A"))
            .unwrap();

        let meta = c.get_meta(&ctx, "a.md").unwrap();
        assert_eq!(meta.title.as_deref(), Some("A"));
        assert!(meta.content.is_empty());
    }

    #[test]
    fn missing_content_is_a_store_failure() {
        let (_tmp, c) = test_coordinator();
        let ctx = Context::background();
        c.put_doc(&ctx, Document::new("a.md", "body")).unwrap();
        c.content.remove_file(&ctx, "a.md").unwrap();

        let err = c.get_doc(&ctx, "a.md").unwrap_err();
        assert!(!err.is_not_found());
        assert!(matches!(err, Error::Store { op: "read content", .. }));
    }

    #[test]
    fn empty_tag_name_is_rejected() {
        let (_tmp, c) = test_coordinator();
        let err = c
            .tag_doc(&Context::background(), "a.md", &["ok", ""])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(c.list_tags(&Context::background()).unwrap().is_empty());
    }

    #[test]
    fn untag_removes_path_and_empty_tags() {
        let (_tmp, c) = test_coordinator();
        let ctx = Context::background();
        c.tag_doc(&ctx, "a.md", &["x", "y"]).unwrap();
        c.tag_doc(&ctx, "b.md", &["y"]).unwrap();

        c.untag_doc(&ctx, "a.md", &["x", "y", "never-existed"]).unwrap();

        let tags = c.list_tags(&ctx).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "y");
        assert_eq!(tags[0].paths, vec!["b.md".to_string()]);
    }

    #[test]
    fn list_tags_is_ordered_by_name() {
        let (_tmp, c) = test_coordinator();
        let ctx = Context::background();
        c.tag_doc(&ctx, "a.md", &["zeta", "alpha", "mid"]).unwrap();

        let names: Vec<_> = c
            .list_tags(&ctx)
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn cancelled_context_writes_nothing() {
        let (_tmp, c) = test_coordinator();
        let (ctx, handle) = Context::background().with_cancel();
        handle.cancel();

        let err = c.put_doc(&ctx, Document::new("a.md", "body")).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(
            c.get_doc(&Context::background(), "a.md")
                .unwrap_err()
                .is_not_found()
        );
    }
}
