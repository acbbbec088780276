use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use crate::{
    context::Context,
    error::{Error, Result},
    store::{MetadataStore, Table},
};

const DOCUMENTS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("documents");
const TAGS: TableDefinition<&str, &[u8]> = TableDefinition::new("tags");
const SETTINGS: TableDefinition<&str, &str> = TableDefinition::new("settings");

fn definition(table: Table) -> TableDefinition<'static, &'static str, &'static [u8]> {
    match table {
        Table::Documents => DOCUMENTS,
        Table::Tags => TAGS,
    }
}

/// Metadata store backed by a single redb database file.
///
/// Document and tag records are stored as opaque bytes; a `settings`
/// table holds runtime configuration.
pub struct RedbMetadataStore {
    db: Database,
}

impl RedbMetadataStore {
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path)?;

        // Ensure all tables exist by opening them in a write transaction.
        let txn = db.begin_write()?;
        txn.open_table(DOCUMENTS)?;
        txn.open_table(TAGS)?;
        txn.open_table(SETTINGS)?;
        txn.commit()?;

        Ok(Self { db })
    }

    // -- Settings --

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(SETTINGS)?;
            table.insert(key, value)?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SETTINGS)?;
        Ok(table.get(key)?.map(|v| v.value().to_string()))
    }

    /// Get a setting, returning the default if not set.
    pub fn get_setting_or(&self, key: &str, default: &str) -> Result<String> {
        Ok(self
            .get_setting(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    pub fn list_settings(&self) -> Result<Vec<(String, String)>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SETTINGS)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let (k, v) = entry?;
            result.push((k.value().to_string(), v.value().to_string()));
        }
        Ok(result)
    }
}

impl MetadataStore for RedbMetadataStore {
    fn get_item(
        &self,
        ctx: &Context,
        table: Table,
        key: &str,
    ) -> Result<Vec<u8>> {
        ctx.check()?;
        let txn = self.db.begin_read()?;
        let records = txn.open_table(definition(table))?;
        records
            .get(key)?
            .map(|v| v.value().to_vec())
            .ok_or_else(|| Error::not_found(table.kind(), key))
    }

    fn put_item(
        &self,
        ctx: &Context,
        table: Table,
        key: &str,
        record: &[u8],
    ) -> Result<()> {
        ctx.check()?;
        let txn = self.db.begin_write()?;
        {
            let mut records = txn.open_table(definition(table))?;
            records.insert(key, record)?;
        }
        txn.commit()?;
        Ok(())
    }

    fn delete_item(&self, ctx: &Context, table: Table, key: &str) -> Result<()> {
        ctx.check()?;
        let txn = self.db.begin_write()?;
        {
            let mut records = txn.open_table(definition(table))?;
            records.remove(key)?;
        }
        txn.commit()?;
        Ok(())
    }

    fn scan(&self, ctx: &Context, table: Table) -> Result<Vec<Vec<u8>>> {
        ctx.check()?;
        let txn = self.db.begin_read()?;
        let records = txn.open_table(definition(table))?;
        let mut result = Vec::new();
        for entry in records.iter()? {
            let (_k, v) = entry?;
            result.push(v.value().to_vec());
        }
        Ok(result)
    }
}

impl std::fmt::Debug for RedbMetadataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbMetadataStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, RedbMetadataStore) {
        let tmp = tempfile::tempdir().unwrap();
        let db =
            RedbMetadataStore::open(&tmp.path().join("metadata.redb")).unwrap();
        (tmp, db)
    }

    #[test]
    fn items_crud() {
        let (_tmp, db) = test_db();
        let ctx = Context::background();

        assert!(
            db.get_item(&ctx, Table::Documents, "a.md")
                .unwrap_err()
                .is_not_found()
        );

        db.put_item(&ctx, Table::Documents, "a.md", b"one").unwrap();
        assert_eq!(db.get_item(&ctx, Table::Documents, "a.md").unwrap(), b"one");

        db.put_item(&ctx, Table::Documents, "a.md", b"two").unwrap();
        assert_eq!(db.get_item(&ctx, Table::Documents, "a.md").unwrap(), b"two");

        db.delete_item(&ctx, Table::Documents, "a.md").unwrap();
        assert!(
            db.get_item(&ctx, Table::Documents, "a.md")
                .unwrap_err()
                .is_not_found()
        );
    }

    #[test]
    fn delete_absent_key_succeeds() {
        let (_tmp, db) = test_db();
        let ctx = Context::background();
        db.delete_item(&ctx, Table::Tags, "ghost").unwrap();
    }

    #[test]
    fn tables_are_independent() {
        let (_tmp, db) = test_db();
        let ctx = Context::background();

        db.put_item(&ctx, Table::Tags, "shared", b"tag").unwrap();
        let err = db.get_item(&ctx, Table::Documents, "shared").unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: "document", .. }));
        assert_eq!(db.scan(&ctx, Table::Documents).unwrap().len(), 0);
        assert_eq!(db.scan(&ctx, Table::Tags).unwrap(), vec![b"tag".to_vec()]);
    }

    #[test]
    fn scan_is_key_ordered() {
        let (_tmp, db) = test_db();
        let ctx = Context::background();
        db.put_item(&ctx, Table::Documents, "b", b"2").unwrap();
        db.put_item(&ctx, Table::Documents, "a", b"1").unwrap();
        db.put_item(&ctx, Table::Documents, "c", b"3").unwrap();
        assert_eq!(
            db.scan(&ctx, Table::Documents).unwrap(),
            vec![b"1".to_vec(), b"2".to_vec(), b"3".to_vec()]
        );
    }

    #[test]
    fn settings_crud() {
        let (_tmp, db) = test_db();

        assert_eq!(db.get_setting("search_limit").unwrap(), None);
        assert_eq!(db.get_setting_or("search_limit", "1000").unwrap(), "1000");

        db.set_setting("search_limit", "50").unwrap();
        assert_eq!(db.get_setting_or("search_limit", "1000").unwrap(), "50");
        assert_eq!(
            db.list_settings().unwrap(),
            vec![("search_limit".to_string(), "50".to_string())]
        );
    }

    #[test]
    fn cancelled_context_is_rejected() {
        let (_tmp, db) = test_db();
        let (ctx, handle) = Context::background().with_cancel();
        handle.cancel();
        assert!(matches!(
            db.put_item(&ctx, Table::Tags, "t", b"x"),
            Err(Error::Cancelled)
        ));
    }

    #[test]
    fn reopen_preserves_data() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("metadata.redb");
        let ctx = Context::background();

        {
            let db = RedbMetadataStore::open(&path).unwrap();
            db.put_item(&ctx, Table::Tags, "rust", b"{}").unwrap();
            db.set_setting("search_limit", "10").unwrap();
        }

        {
            let db = RedbMetadataStore::open(&path).unwrap();
            assert_eq!(db.get_item(&ctx, Table::Tags, "rust").unwrap(), b"{}");
            assert_eq!(
                db.get_setting("search_limit").unwrap(),
                Some("10".to_string())
            );
        }
    }
}
