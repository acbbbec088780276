use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use crate::error::{Error, Result};

/// Environment variable overriding the default shelf location.
pub const DATA_DIR_ENV: &str = "DOCSHELF_DATA_DIR";

const METADATA_DB: &str = "metadata.redb";
const CONTENT_DIR: &str = "content";
const TANTIVY_DIR: &str = "tantivy";

/// On-disk layout of a shelf: metadata database, content blobs and the
/// text index, all under one root.
///
/// Opening a `DataDir` creates every directory in the layout, so the
/// accessors are plain path joins.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Pick the shelf root and open it. An explicit path (`--data-dir`)
    /// wins over `DOCSHELF_DATA_DIR`, which wins over the XDG data home.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let root = pick_root(explicit, std::env::var_os(DATA_DIR_ENV))?;
        Self::open(root)
    }

    /// Open a shelf rooted at `root`, creating the layout as needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let dir = Self { root: root.into() };
        for path in [dir.root.clone(), dir.content_dir(), dir.tantivy_dir()] {
            std::fs::create_dir_all(&path).map_err(|_| Error::DataDir(path))?;
        }
        Ok(dir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn metadata_db(&self) -> PathBuf {
        self.root.join(METADATA_DB)
    }

    pub fn content_dir(&self) -> PathBuf {
        self.root.join(CONTENT_DIR)
    }

    pub fn tantivy_dir(&self) -> PathBuf {
        self.root.join(TANTIVY_DIR)
    }
}

fn pick_root(explicit: Option<&Path>, env: Option<OsString>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(val) = env.filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(val));
    }
    xdg::BaseDirectories::with_prefix("docshelf")
        .get_data_home()
        .ok_or_else(|| {
            Error::Config("could not determine XDG data home directory".into())
        })
}
