//! Loading documents into a collection
//!
//! Text files are split into pages on form feeds, the form pdftotext emits
//! between pages. Each non-blank page becomes one record keyed by
//! `{file_stem}-{page_index}`, so re-ingesting a file replaces its pages.
//! A missing collection is created with the width of the first embedding.


use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::database::lancedb::{CollectionRecord, Metadata, VectorStore};
use crate::embeddings::Embedder;
use crate::{Error, Result};

pub const PAGE_BREAK: char = '\x0c';

/// One page of a source file, ready to embed
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub files: usize,
    pub pages: usize,
    pub skipped_pages: usize,
}

/// Split `text` into its non-blank pages, keeping each page's position in
/// the file
#[inline]
pub fn split_pages(text: &str) -> Vec<(usize, &str)> {
    text.split(PAGE_BREAK)
        .enumerate()
        .map(|(index, page)| (index, page.trim()))
        .filter(|(_, page)| !page.is_empty())
        .collect()
}

/// Build the records for one file. `source` is stored as the `source`
/// metadata entry and pages are numbered from 1.
#[inline]
pub fn build_pages(stem: &str, source: &str, text: &str) -> Vec<Page> {
    split_pages(text)
        .into_iter()
        .map(|(index, page)| {
            let mut metadata = Metadata::new();
            metadata.insert("source".to_string(), Value::from(source));
            metadata.insert("page".to_string(), Value::from(index + 1));
            Page {
                id: format!("{}-{}", stem, index),
                text: page.to_string(),
                metadata,
            }
        })
        .collect()
}

/// Read, embed and store every file in `paths` into the `collection` of
/// `store`. Stops at the first file that cannot be read or embedded; files
/// before it stay stored.
#[inline]
pub async fn ingest_files<P: AsRef<Path>>(
    paths: &[P],
    embedder: &dyn Embedder,
    store: &VectorStore,
    collection: &str,
) -> Result<IngestReport> {
    let bar = if console::user_attended_stderr() {
        ProgressBar::new(paths.len() as u64).with_style(
            ProgressStyle::with_template("{bar:30} [{pos}/{len}] Ingesting {msg}")
                .expect("style template is valid"),
        )
    } else {
        ProgressBar::hidden()
    };

    let mut report = IngestReport::default();
    for path in paths {
        let path = path.as_ref();
        bar.set_message(path.display().to_string());

        let file_report = ingest_file(path, embedder, store, collection).await?;
        report.files += 1;
        report.pages += file_report.pages;
        report.skipped_pages += file_report.skipped_pages;
        bar.inc(1);
    }
    bar.finish_and_clear();

    info!(
        "Ingested {} pages from {} files into {} ({} blank pages skipped)",
        report.pages,
        report.files,
        collection,
        report.skipped_pages
    );
    Ok(report)
}

/// Ingest a single file
#[inline]
pub async fn ingest_file(
    path: &Path,
    embedder: &dyn Embedder,
    store: &VectorStore,
    collection: &str,
) -> Result<IngestReport> {
    let text = tokio::fs::read_to_string(path).await?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| Error::Other(anyhow::anyhow!("No file name in {}", path.display())))?;
    let source = path
        .file_name()
        .map_or_else(|| stem.clone(), |s| s.to_string_lossy().into_owned());

    let total_pages = text.split(PAGE_BREAK).count();
    let pages = build_pages(&stem, &source, &text);
    let skipped_pages = total_pages - pages.len();

    if pages.is_empty() {
        warn!("No text found in {}", path.display());
        return Ok(IngestReport {
            files: 1,
            pages: 0,
            skipped_pages,
        });
    }

    debug!("Embedding {} pages from {}", pages.len(), path.display());
    let texts: Vec<String> = pages.iter().map(|p| p.text.clone()).collect();
    let vectors = embedder.embed(&texts).await?;
    if vectors.len() != pages.len() {
        return Err(Error::Embedding(format!(
            "Expected {} embeddings for {} but got {}",
            pages.len(),
            path.display(),
            vectors.len()
        )));
    }

    let dimension = vectors.first().map_or(0, Vec::len);
    let collection = store.get_or_create_collection(collection, dimension).await?;

    let records: Vec<CollectionRecord> = pages
        .into_iter()
        .zip(vectors)
        .map(|(page, vector)| CollectionRecord {
            id: page.id,
            vector,
            document: page.text,
            metadata: Some(page.metadata),
        })
        .collect();
    collection.add(&records).await?;

    Ok(IngestReport {
        files: 1,
        pages: records.len(),
        skipped_pages,
    })
}
