use std::{collections::HashSet, path::Path};

use tantivy::{
    Index,
    IndexReader,
    IndexWriter,
    TantivyDocument,
    collector::TopDocs,
    doc,
    query::QueryParser,
    schema::*,
    tokenizer::{
        LowerCaser,
        RemoveLongFilter,
        SimpleTokenizer,
        Stemmer,
        TextAnalyzer,
    },
};

use crate::{context::Context, error::Result, store::TextIndex};

/// Writer heap budget used by the CLI.
pub const WRITER_MEMORY_BUDGET: usize = 15_000_000;

/// Field names used in the schema.
pub mod fields {
    pub const PATH: &str = "path";
    pub const TITLE: &str = "title";
    pub const BODY: &str = "body";
}

/// Full-text index over document content, keyed by document path.
pub struct TantivyTextIndex {
    index: Index,
    reader: IndexReader,
    fields: SchemaFields,
}

/// Resolved field handles for the schema.
#[derive(Clone, Copy)]
struct SchemaFields {
    path: Field,
    title: Field,
    body: Field,
}

fn build_schema() -> Schema {
    let mut builder = Schema::builder();

    builder.add_text_field(fields::PATH, STRING | STORED);

    let text_opts = TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer("en_stem")
            .set_index_option(IndexRecordOption::WithFreqsAndPositions),
    );
    builder.add_text_field(fields::TITLE, text_opts.clone());
    builder.add_text_field(fields::BODY, text_opts);

    builder.build()
}

fn resolve_fields(schema: &Schema) -> Result<SchemaFields> {
    Ok(SchemaFields {
        path: schema.get_field(fields::PATH)?,
        title: schema.get_field(fields::TITLE)?,
        body: schema.get_field(fields::BODY)?,
    })
}

fn register_tokenizers(index: &Index) {
    let en_stem = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(40))
        .filter(LowerCaser)
        .filter(Stemmer::new(tantivy::tokenizer::Language::English))
        .build();
    index.tokenizers().register("en_stem", en_stem);
}

impl TantivyTextIndex {
    /// Open or create a search index at the given directory.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;

        let mmap_dir = tantivy::directory::MmapDirectory::open(dir)
            .map_err(|e| tantivy::TantivyError::SystemError(e.to_string()))?;
        let index = if Index::exists(&mmap_dir)
            .map_err(|e| tantivy::TantivyError::SystemError(e.to_string()))?
        {
            Index::open(mmap_dir)?
        } else {
            Index::create(
                mmap_dir,
                build_schema(),
                tantivy::IndexSettings::default(),
            )?
        };

        Self::from_index(index)
    }

    /// Create an in-memory search index (for testing).
    pub fn open_in_ram() -> Result<Self> {
        Self::from_index(Index::create_in_ram(build_schema()))
    }

    fn from_index(index: Index) -> Result<Self> {
        register_tokenizers(&index);
        let fields = resolve_fields(&index.schema())?;
        let reader = index.reader()?;

        Ok(Self {
            index,
            reader,
            fields,
        })
    }

    /// Create a writer with the given memory budget (in bytes).
    pub fn writer(&self, memory_budget: usize) -> Result<IndexWriter> {
        Ok(self.index.writer(memory_budget)?)
    }

    /// Add or replace the entry for `path` via the given writer.
    pub fn add_document(
        &self,
        writer: &IndexWriter,
        path: &str,
        title: &str,
        body: &str,
    ) -> Result<()> {
        let f = self.fields;

        // Delete any existing entry for this path first.
        writer.delete_term(tantivy::Term::from_field_text(f.path, path));
        writer.add_document(doc!(
            f.path => path,
            f.title => title,
            f.body => body,
        ))?;

        Ok(())
    }

    /// Remove the entry for `path`, if any.
    pub fn delete_document(&self, writer: &IndexWriter, path: &str) {
        writer.delete_term(tantivy::Term::from_field_text(self.fields.path, path));
    }

    /// Index one document and commit immediately.
    pub fn index_document(
        &self,
        path: &str,
        title: &str,
        body: &str,
    ) -> Result<()> {
        let mut writer = self.writer(WRITER_MEMORY_BUDGET)?;
        self.add_document(&writer, path, title, body)?;
        writer.commit()?;
        Ok(())
    }

    /// Remove one document and commit immediately.
    pub fn remove_document(&self, path: &str) -> Result<()> {
        let mut writer = self.writer(WRITER_MEMORY_BUDGET)?;
        self.delete_document(&writer, path);
        writer.commit()?;
        Ok(())
    }
}

impl TextIndex for TantivyTextIndex {
    /// BM25 search over title and body with the title boosted 2x.
    /// Every matching path comes back, best match first, each at most
    /// once. Callers filter before truncating.
    fn search(&self, ctx: &Context, query: &str) -> Result<Vec<String>> {
        ctx.check()?;
        let f = self.fields;
        self.reader.reload()?;
        let searcher = self.reader.searcher();

        let mut parser =
            QueryParser::for_index(&self.index, vec![f.title, f.body]);
        parser.set_field_boost(f.title, 2.0);

        let (parsed, _errors) = parser.parse_query_lenient(query);
        // No match set is larger than the live document count.
        let all = (searcher.num_docs() as usize).max(1);
        let top_docs = searcher.search(&parsed, &TopDocs::with_limit(all))?;

        let mut seen = HashSet::new();
        let mut paths = Vec::with_capacity(top_docs.len());
        for (_score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher.doc(doc_address)?;
            let path = doc
                .get_first(f.path)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            if !path.is_empty() && seen.insert(path.clone()) {
                paths.push(path);
            }
        }

        Ok(paths)
    }
}

impl std::fmt::Debug for TantivyTextIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TantivyTextIndex").finish_non_exhaustive()
    }
}
