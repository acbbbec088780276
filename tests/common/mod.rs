#![allow(dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use docshelf::{
    Clock,
    ContentStore,
    Context,
    Coordinator,
    Error,
    FsContentStore,
    MetadataStore,
    RedbMetadataStore,
    Result,
    Table,
    TextIndex,
};

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self(AtomicU64::new(start))
    }

    pub fn advance(&self, millis: u64) {
        self.0.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Content store wrapper whose removals can be made to fail.
pub struct FlakyContent {
    inner: FsContentStore,
    pub fail_remove: AtomicBool,
}

impl ContentStore for FlakyContent {
    fn read_file(&self, ctx: &Context, path: &str) -> Result<Vec<u8>> {
        self.inner.read_file(ctx, path)
    }

    fn write_file(&self, ctx: &Context, path: &str, data: &[u8]) -> Result<()> {
        self.inner.write_file(ctx, path, data)
    }

    fn remove_file(&self, ctx: &Context, path: &str) -> Result<()> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(Error::Io(std::io::Error::other("disk on fire")));
        }
        self.inner.remove_file(ctx, path)
    }
}

/// Metadata store wrapper whose writes and deletes can be made to fail.
pub struct FlakyMetadata {
    inner: RedbMetadataStore,
    pub fail_put: AtomicBool,
    pub fail_delete: AtomicBool,
    pub fail_get: AtomicBool,
}

impl MetadataStore for FlakyMetadata {
    fn get_item(&self, ctx: &Context, table: Table, key: &str) -> Result<Vec<u8>> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(Error::Io(std::io::Error::other("connection reset")));
        }
        self.inner.get_item(ctx, table, key)
    }

    fn put_item(
        &self,
        ctx: &Context,
        table: Table,
        key: &str,
        record: &[u8],
    ) -> Result<()> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(Error::Io(std::io::Error::other("throttled")));
        }
        self.inner.put_item(ctx, table, key, record)
    }

    fn delete_item(&self, ctx: &Context, table: Table, key: &str) -> Result<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Error::Io(std::io::Error::other("throttled")));
        }
        self.inner.delete_item(ctx, table, key)
    }

    fn scan(&self, ctx: &Context, table: Table) -> Result<Vec<Vec<u8>>> {
        self.inner.scan(ctx, table)
    }
}

/// Text index returning a fixed path list for every query.
#[derive(Debug, Default)]
pub struct FixedIndex(pub Vec<String>);

impl TextIndex for FixedIndex {
    fn search(&self, ctx: &Context, _query: &str) -> Result<Vec<String>> {
        ctx.check()?;
        Ok(self.0.clone())
    }
}

pub struct Harness {
    pub _tmp: tempfile::TempDir,
    pub content: Arc<FlakyContent>,
    pub metadata: Arc<FlakyMetadata>,
    pub clock: Arc<ManualClock>,
    pub coordinator: Coordinator,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_search_results(&[])
    }

    pub fn with_search_results(paths: &[&str]) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let content = Arc::new(FlakyContent {
            inner: FsContentStore::open(&tmp.path().join("content")).unwrap(),
            fail_remove: AtomicBool::new(false),
        });
        let metadata = Arc::new(FlakyMetadata {
            inner: RedbMetadataStore::open(&tmp.path().join("metadata.redb"))
                .unwrap(),
            fail_put: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            fail_get: AtomicBool::new(false),
        });
        let index = Arc::new(FixedIndex(
            paths.iter().map(|p| p.to_string()).collect(),
        ));
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));

        let coordinator =
            Coordinator::new(content.clone(), metadata.clone(), index)
                .with_clock(clock.clone());

        Self {
            _tmp: tmp,
            content,
            metadata,
            clock,
            coordinator,
        }
    }

    pub fn has_blob(&self, path: &str) -> bool {
        self.content
            .read_file(&Context::background(), path)
            .is_ok()
    }
}
