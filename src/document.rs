use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    error::{Error, Result},
    store::Table,
};

/// A record persisted in one of the metadata store's tables.
pub trait Record: Serialize + DeserializeOwned {
    const TABLE: Table;

    fn key(&self) -> &str;
}

/// A document on the shelf.
///
/// `content` only ever travels between the caller and the content store.
/// The metadata record written for a document never carries it, and an
/// empty `content` is omitted when serialized.
///
/// ```
/// use docshelf::Document;
///
/// let doc = Document::new("notes/hello.md", "# Hello");
/// let json = serde_json::to_value(doc.without_content()).unwrap();
/// assert_eq!(json["path"], "notes/hello.md");
/// assert!(json.get("content").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
    /// Creation time in epoch milliseconds. Set once on first write.
    #[serde(default)]
    pub created_at: u64,
    /// Last write time in epoch milliseconds.
    #[serde(default)]
    pub updated_at: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// A copy of this document with its content stripped.
    pub fn without_content(&self) -> Self {
        Self {
            content: String::new(),
            ..self.clone()
        }
    }
}

/// Check that `path` is a canonical document path.
///
/// A document path is the storage key in every store, so two spellings of
/// the same file must never both be accepted. Canonical means relative,
/// `/`-separated, with no empty, `.` or `..` segments and no trailing `/`.
pub fn validate_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(Error::InvalidArgument(
            "document path must not be empty".to_string(),
        ));
    }
    let bad_segment = path.split('/').any(|seg| {
        seg.is_empty() || seg == "." || seg == ".." || seg.contains('\\')
    });
    if bad_segment {
        return Err(Error::InvalidArgument(format!(
            "document path is not canonical: {path:?}"
        )));
    }
    Ok(())
}

/// Check that every tag name is non-empty.
pub fn validate_tags<S: AsRef<str>>(tags: &[S]) -> Result<()> {
    if tags.iter().any(|t| t.as_ref().is_empty()) {
        return Err(Error::InvalidArgument(
            "tag names must not be empty".to_string(),
        ));
    }
    Ok(())
}

impl Record for Document {
    const TABLE: Table = Table::Documents;

    fn key(&self) -> &str {
        &self.path
    }
}

/// The set of document paths carrying one tag.
///
/// `paths` keeps insertion order but never holds the same path twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub paths: Vec<String>,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            paths: Vec::new(),
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    /// Adds `path`, returning false if it was already present.
    pub fn insert(&mut self, path: &str) -> bool {
        if self.contains(path) {
            return false;
        }
        self.paths.push(path.to_string());
        true
    }

    /// Removes `path`, returning false if it was not present.
    pub fn remove(&mut self, path: &str) -> bool {
        let before = self.paths.len();
        self.paths.retain(|p| p != path);
        self.paths.len() != before
    }

    /// The path set as a sorted, deduplicated sequence.
    pub fn sorted_paths(&self) -> Vec<String> {
        let mut paths = self.paths.clone();
        paths.sort();
        paths.dedup();
        paths
    }
}

impl Record for Tag {
    const TABLE: Table = Table::Tags;

    fn key(&self) -> &str {
        &self.name
    }
}
