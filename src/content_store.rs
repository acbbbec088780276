use std::{
    io::Write,
    path::{Path, PathBuf},
};

use crate::{
    context::Context,
    document::validate_path,
    error::{Error, Result},
    store::ContentStore,
};

/// Content store keeping one file per document under a root directory.
///
/// Document paths map to relative file paths. Only canonical paths are
/// accepted, so each file has exactly one document path.
#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    pub fn open(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)
            .map_err(|_| Error::DataDir(root.to_path_buf()))?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        validate_path(path)?;
        Ok(path.split('/').fold(self.root.clone(), |mut file, seg| {
            file.push(seg);
            file
        }))
    }
}

fn not_found_or(err: std::io::Error, path: &str) -> Error {
    if err.kind() == std::io::ErrorKind::NotFound {
        Error::not_found("content", path)
    } else {
        Error::Io(err)
    }
}

impl ContentStore for FsContentStore {
    fn read_file(&self, ctx: &Context, path: &str) -> Result<Vec<u8>> {
        ctx.check()?;
        let file = self.resolve(path)?;
        std::fs::read(&file).map_err(|e| not_found_or(e, path))
    }

    fn write_file(&self, ctx: &Context, path: &str, data: &[u8]) -> Result<()> {
        ctx.check()?;
        let file = self.resolve(path)?;
        let parent = file.parent().unwrap_or(&self.root);
        std::fs::create_dir_all(parent)?;

        // Each write gets its own temp file next to the target, then
        // renames over it.
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(data)?;
        tmp.persist(&file).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    fn remove_file(&self, ctx: &Context, path: &str) -> Result<()> {
        ctx.check()?;
        let file = self.resolve(path)?;
        std::fs::remove_file(&file).map_err(|e| not_found_or(e, path))
    }
}
