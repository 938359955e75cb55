//! Reconciles the `{year}/{topic}/{file}.md` library into the record store.
//!
//! A scan runs in two phases. Files are first read through [`PaperStorage`]
//! and turned into records; the records are then upserted by relative path
//! inside one transaction that commits once at the end. Problems with a
//! single folder or file are collected into [`ScanResult::errors`] and never
//! stop the batch.

use chrono::Utc;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use serde::Serialize;
use tracing::{info, warn};

use crate::extract::{extract_company, extract_summary, extract_title};
use crate::models::NewPaper;
use crate::storage::PaperStorage;
use crate::store::{upsert_by_file_path, StoreResult, UpsertOutcome};

pub const MISSING_ROOT_ERROR: &str = "Storage folder not found";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    pub added: usize,
    pub updated: usize,
    pub errors: Vec<String>,
}

/// Records read from disk, plus the errors hit while reading them.
#[derive(Debug, Default)]
pub struct ScanBatch {
    pub papers: Vec<NewPaper>,
    pub errors: Vec<String>,
    pub root_missing: bool,
}

pub async fn scan_library(
    storage: &dyn PaperStorage,
    conn: &mut SqliteConnection,
) -> StoreResult<ScanResult> {
    let batch = collect_papers(storage).await;
    apply_batch(conn, batch)
}

pub async fn collect_papers(storage: &dyn PaperStorage) -> ScanBatch {
    let mut batch = ScanBatch::default();

    if !storage.root_exists().await {
        batch.root_missing = true;
        batch.errors.push(MISSING_ROOT_ERROR.to_string());
        return batch;
    }

    let years = match storage.list_dir("").await {
        Ok(entries) => entries,
        Err(err) => {
            batch.errors.push(format!("Error listing storage folder: {err:#}"));
            return batch;
        }
    };

    for year_entry in years.into_iter().filter(|entry| entry.is_dir) {
        let year: i32 = match year_entry.name.parse() {
            Ok(year) => year,
            Err(_) => {
                batch
                    .errors
                    .push(format!("Invalid year folder: {}", year_entry.name));
                continue;
            }
        };

        let topics = match storage.list_dir(&year_entry.name).await {
            Ok(entries) => entries,
            Err(err) => {
                batch
                    .errors
                    .push(format!("Error processing {}: {err:#}", year_entry.name));
                continue;
            }
        };

        for topic_entry in topics.into_iter().filter(|entry| entry.is_dir) {
            let topic_key = format!("{}/{}", year_entry.name, topic_entry.name);
            let files = match storage.list_dir(&topic_key).await {
                Ok(entries) => entries,
                Err(err) => {
                    batch
                        .errors
                        .push(format!("Error processing {topic_key}: {err:#}"));
                    continue;
                }
            };

            for file_entry in files
                .into_iter()
                .filter(|entry| !entry.is_dir && entry.name.ends_with(".md"))
            {
                let relative_path = format!("{topic_key}/{}", file_entry.name);
                match read_paper(storage, &relative_path, &file_entry.name, year, &topic_entry.name)
                    .await
                {
                    Ok(paper) => batch.papers.push(paper),
                    Err(err) => batch
                        .errors
                        .push(format!("Error processing {relative_path}: {err:#}")),
                }
            }
        }
    }

    batch
}

async fn read_paper(
    storage: &dyn PaperStorage,
    relative_path: &str,
    filename: &str,
    year: i32,
    topic: &str,
) -> anyhow::Result<NewPaper> {
    let bytes = storage.get_object(relative_path).await?;
    let content = String::from_utf8(bytes)?;

    Ok(NewPaper {
        title: extract_title(&content, filename),
        company: extract_company(filename, &content),
        year,
        topic: topic.to_string(),
        summary: Some(extract_summary(&content)),
        content,
        file_path: Some(relative_path.to_string()),
        created_at: Utc::now().naive_utc(),
    })
}

/// Upserts every collected record in a single transaction.
pub fn apply_batch(conn: &mut SqliteConnection, batch: ScanBatch) -> StoreResult<ScanResult> {
    let ScanBatch {
        papers,
        mut errors,
        root_missing,
    } = batch;

    if root_missing {
        warn!("scan skipped: storage folder not found");
        return Ok(ScanResult {
            added: 0,
            updated: 0,
            errors,
        });
    }

    let (added, updated) = conn.transaction::<_, diesel::result::Error, _>(|conn| {
        let mut added = 0usize;
        let mut updated = 0usize;
        for paper in &papers {
            let path = paper.file_path.as_deref().unwrap_or_default();
            match upsert_by_file_path(conn, paper) {
                Ok(UpsertOutcome::Added(_)) => added += 1,
                Ok(UpsertOutcome::Updated(_)) => updated += 1,
                Err(err) => errors.push(format!("Error processing {path}: {err}")),
            }
        }
        Ok((added, updated))
    })?;

    for error in &errors {
        warn!(%error, "scan entry skipped");
    }
    info!(added, updated, errors = errors.len(), "library scan finished");

    Ok(ScanResult {
        added,
        updated,
        errors,
    })
}
