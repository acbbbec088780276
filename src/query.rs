//! Combined full-text and multi-tag listing.
//!
//! A listing narrows in up to two steps: the text index turns a query
//! into a set of paths, and tags narrow to paths carrying every named
//! tag. Both sides are plain path lists, so the filtering is set algebra
//! over sorted sequences.

use std::collections::HashSet;

use tracing::debug;

use crate::{
    context::Context,
    coordinator::Coordinator,
    document::{Document, Tag},
    error::{Error, Result},
    store::scan_records,
};

impl Coordinator {
    /// List documents matching an optional text query and every given tag.
    ///
    /// - Empty query, no tags: every document.
    /// - Query, no tags: documents the text index returns for the query.
    /// - Tags: documents carrying all of them, further restricted to the
    ///   query's matches when a query is given.
    ///
    /// A tag without a record matches nothing. Documents come back without
    /// content. Paths whose document record no longer exists (for example
    /// removed documents still listed under a tag) are skipped. Query
    /// listings are cut to the search limit last, after all filtering.
    pub fn list_docs<S: AsRef<str>>(
        &self,
        ctx: &Context,
        query: &str,
        tags: &[S],
    ) -> Result<Vec<Document>> {
        ctx.check()?;

        if query.is_empty() {
            if tags.is_empty() {
                return scan_records::<Document>(&*self.metadata, ctx)
                    .map_err(|e| Error::store("scan", "documents", e));
            }
            let tagged = self.tagged_paths(ctx, tags)?;
            return self.resolve(ctx, &tagged, None);
        }

        // An empty match list is "no matches", not "no query".
        let found = self
            .index
            .search(ctx, query)
            .map_err(|e| Error::store("search", query, e))?;
        let paths = if tags.is_empty() {
            found
        } else {
            retain_found(self.tagged_paths(ctx, tags)?, &found)
        };
        self.resolve(ctx, &paths, self.search_limit)
    }

    /// Paths carrying every tag in `tags`, in sorted order.
    fn tagged_paths<S: AsRef<str>>(
        &self,
        ctx: &Context,
        tags: &[S],
    ) -> Result<Vec<String>> {
        let mut acc: Option<Vec<String>> = None;
        for name in tags {
            let name = name.as_ref();
            let Some(tag) = self.lookup::<Tag>(ctx, name)? else {
                debug!(tag = name, "unknown tag, listing is empty");
                return Ok(Vec::new());
            };

            let paths = tag.sorted_paths();
            let next = match acc {
                Some(prev) => intersect_sorted(&prev, &paths),
                None => paths,
            };
            if next.is_empty() {
                return Ok(Vec::new());
            }
            acc = Some(next);
        }
        Ok(acc.unwrap_or_default())
    }

    /// Metadata-only fetch of each path, skipping stale references, up to
    /// `limit` documents.
    fn resolve(
        &self,
        ctx: &Context,
        paths: &[String],
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        let limit = limit.unwrap_or(usize::MAX);
        let mut docs = Vec::with_capacity(paths.len().min(limit));
        for path in paths {
            if docs.len() == limit {
                break;
            }
            match self.lookup::<Document>(ctx, path)? {
                Some(doc) => docs.push(doc),
                None => debug!(path = %path, "skipping stale reference"),
            }
        }
        Ok(docs)
    }
}

/// Intersection of two ascending, duplicate-free sequences.
pub fn intersect_sorted(a: &[String], b: &[String]) -> Vec<String> {
    let (mut i, mut j) = (0, 0);
    let mut out = Vec::new();
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i].clone());
                i += 1;
                j += 1;
            }
        }
    }
    out
}

/// Keep the entries of `tagged` that also appear in `found`, in
/// `tagged` order.
pub fn retain_found(mut tagged: Vec<String>, found: &[String]) -> Vec<String> {
    let found: HashSet<&str> = found.iter().map(String::as_str).collect();
    tagged.retain(|p| found.contains(p.as_str()));
    tagged
}
