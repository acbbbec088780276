//! docshelf - documents whose content, metadata and search index live in
//! three independent stores.
//!
//! Content bytes go to a [`ContentStore`], document and tag records to a
//! [`MetadataStore`], and keyword queries are answered by a [`TextIndex`].
//! The stores share no transaction; the [`Coordinator`] orders writes
//! across them, undoes partial writes where it can, and reports the cases
//! it cannot undo so orphans are never silent.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use docshelf::{
//!     Context, Coordinator, DataDir, Document, FsContentStore,
//!     RedbMetadataStore, TantivyTextIndex,
//! };
//!
//! let data_dir = DataDir::resolve(None).unwrap();
//! let coordinator = Coordinator::new(
//!     Arc::new(FsContentStore::open(&data_dir.content_dir()).unwrap()),
//!     Arc::new(RedbMetadataStore::open(&data_dir.metadata_db()).unwrap()),
//!     Arc::new(TantivyTextIndex::open(&data_dir.tantivy_dir()).unwrap()),
//! );
//!
//! let ctx = Context::background();
//! coordinator
//!     .put_doc(&ctx, Document::new("notes/rust.md", "# Rust"))
//!     .unwrap();
//! coordinator.tag_doc(&ctx, "notes/rust.md", &["lang"]).unwrap();
//!
//! for doc in coordinator.list_docs(&ctx, "", &["lang"]).unwrap() {
//!     println!("{}", doc.path);
//! }
//! ```

pub mod cli;
pub mod clock;
pub mod content_store;
pub mod context;
pub mod coordinator;
pub mod data_dir;
pub mod document;
pub mod error;
pub mod import;
pub mod metadata_db;
pub mod query;
pub mod saga;
pub mod store;
pub mod tantivy_index;

pub use clock::{Clock, SystemClock};
pub use content_store::FsContentStore;
pub use context::{CancelHandle, Context};
pub use coordinator::Coordinator;
pub use data_dir::DataDir;
pub use document::{Document, Tag};
pub use error::{Error, ErrorKind, Result};
pub use metadata_db::RedbMetadataStore;
pub use store::{ContentStore, MetadataStore, Table, TextIndex};
pub use tantivy_index::TantivyTextIndex;
