//! Bulk loading of a directory tree of markdown and text files.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::warn;

use crate::{document::Document, error::Result};

/// File extensions picked up by an import.
const SUPPORTED_EXTENSIONS: &[&str] = &["md", "txt"];

/// A file found under the import root and the document path it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSource {
    pub path: String,
    pub file: PathBuf,
}

/// Find importable files under `root`.
///
/// Hidden entries (leading `.`) and symlinks are skipped. Document paths
/// are the `/`-joined path relative to `root`, under `prefix` when one is
/// given. Results are sorted by document path.
pub fn discover(root: &Path, prefix: Option<&str>) -> Result<Vec<ImportSource>> {
    let prefix = prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty());
    let mut found = Vec::new();
    let mut pending = vec![(root.to_path_buf(), Vec::<String>::new())];

    while let Some((dir, parts)) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }

            let file_type = entry.file_type()?;
            let mut child = parts.clone();
            child.push(name);

            if file_type.is_dir() {
                pending.push((entry.path(), child));
            } else if file_type.is_file() && is_supported(&entry.path()) {
                let relative = child.join("/");
                let path = match prefix {
                    Some(prefix) => format!("{prefix}/{relative}"),
                    None => relative,
                };
                found.push(ImportSource {
                    path,
                    file: entry.path(),
                });
            }
        }
    }

    found.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(found)
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext))
}

/// Read every source in parallel into a document ready to be stored.
///
/// Unreadable or non-UTF-8 files are logged and left out.
pub fn load(sources: &[ImportSource]) -> Vec<Document> {
    sources
        .par_iter()
        .filter_map(|source| match std::fs::read_to_string(&source.file) {
            Ok(content) => {
                let title = extract_title(&content, &source.file);
                Some(Document::new(source.path.clone(), content).with_title(title))
            }
            Err(e) => {
                warn!(file = %source.file.display(), error = %e, "skipping unreadable file");
                None
            }
        })
        .collect()
}

/// First markdown `# ` heading, or the file stem.
pub fn extract_title(content: &str, file: &Path) -> String {
    content
        .lines()
        .filter_map(|line| line.trim().strip_prefix("# "))
        .map(str::trim)
        .find(|heading| !heading.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            file.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("untitled")
                .to_string()
        })
}
