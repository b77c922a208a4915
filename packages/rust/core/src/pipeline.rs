//! Sync pipeline: markdown files in, store pages out.
//!
//! One file maps to one page, keyed by title (the file stem). An existing
//! page is updated by archive-and-recreate, carrying its properties and
//! cover forward, because the store offers no in-place replacement of a
//! page's full block tree.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use pagelift_shared::{PageliftError, Result};
use pagelift_store::{MAX_BLOCKS_PER_REQUEST, QueryHit, StoreClient};
use pagelift_translate::{ImageSync, TranslateOptions, Translator};

use crate::files::{file_last_modified, find_markdown_files, title_for};

/// Database properties every synced database must carry.
const REQUIRED_PROPERTIES: [(&str, &str); 5] = [
    ("last modified", "date"),
    ("category", "select"),
    ("date", "date"),
    ("status", "select"),
    ("type", "select"),
];

/// Remote and local timestamps are compared at minute precision; filesystem
/// and store clocks disagree below that.
const MINUTE_FORMAT: &str = "%Y-%m-%d %H:%M";

// ---------------------------------------------------------------------------
// Image sync memoization
// ---------------------------------------------------------------------------

/// Wraps an [`ImageSync`] so each directory is synced at most once per run.
///
/// The translation engine requests a sync for every local-image reference;
/// across a batch of documents that would repeat the same directory walk
/// many times.
pub struct MemoizedSync<S> {
    inner: S,
    seen: Mutex<HashSet<std::path::PathBuf>>,
}

impl<S> MemoizedSync<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            seen: Mutex::new(HashSet::new()),
        }
    }
}

impl<S: ImageSync + Sync> ImageSync for MemoizedSync<S> {
    async fn sync_directory(&self, dir: &Path) -> Result<()> {
        {
            let mut seen = self
                .seen
                .lock()
                .map_err(|_| PageliftError::validation("image sync memo lock poisoned"))?;
            // One attempt per directory per run, even if that attempt fails.
            if !seen.insert(dir.to_path_buf()) {
                return Ok(());
            }
        }
        self.inner.sync_directory(dir).await
    }
}

// ---------------------------------------------------------------------------
// Sync decision
// ---------------------------------------------------------------------------

/// What to do with one markdown file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    Create,
    Update { page_id: String },
    Skip,
}

/// Decide from the title-query hits whether the file needs pushing.
///
/// No hit means create. Every hit is examined: the first whose remote
/// `last modified` does not match the local mtime at minute precision
/// (including a missing or unparseable remote timestamp) selects an update
/// of that page. Skip only when every hit matches. `force` turns every
/// would-be skip into an update of the first hit.
pub fn decide(hits: &[QueryHit], local_mtime: DateTime<Utc>, force: bool) -> SyncAction {
    let Some(first) = hits.first() else {
        return SyncAction::Create;
    };

    if force {
        return SyncAction::Update {
            page_id: first.id.clone(),
        };
    }

    let local = local_mtime.format(MINUTE_FORMAT).to_string();
    for hit in hits {
        let remote = hit
            .last_modified
            .map(|dt| dt.format(MINUTE_FORMAT).to_string());
        if remote.as_deref() != Some(local.as_str()) {
            return SyncAction::Update {
                page_id: hit.id.clone(),
            };
        }
    }
    SyncAction::Skip
}

// ---------------------------------------------------------------------------
// Page payloads
// ---------------------------------------------------------------------------

/// Property set for a page that does not exist yet.
fn default_properties(title: &str, mtime: DateTime<Utc>) -> Value {
    json!({
        "title": { "title": [{ "text": { "content": title } }] },
        "category": { "select": { "name": "Uncategorized" } },
        "date": { "date": { "start": Utc::now().to_rfc3339() } },
        "status": { "select": { "name": "Published" } },
        "type": { "select": { "name": "Post" } },
        "last modified": { "date": { "start": mtime.to_rfc3339() } },
    })
}

/// Random cover for new pages. The `sig` query defeats URL-level caching so
/// each page gets its own image.
fn default_cover() -> Value {
    json!({
        "type": "external",
        "external": {
            "url": format!(
                "https://source.unsplash.com/random/?sig={}",
                Utc::now().format("%Y%m%d%H%M%S")
            )
        }
    })
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Outcome of pushing one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Created { page_id: String },
    Updated { page_id: String },
    Skipped,
}

/// Counts for a whole batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Drives translation and persistence for markdown files.
pub struct Pipeline<S: ImageSync + Sync> {
    store: StoreClient,
    translator: Translator<MemoizedSync<S>>,
}

impl<S: ImageSync + Sync> Pipeline<S> {
    pub fn new(store: StoreClient, images: S, options: TranslateOptions) -> Self {
        Self {
            store,
            translator: Translator::new(MemoizedSync::new(images), options),
        }
    }

    /// Create the required database properties that are missing.
    pub async fn ensure_schema(&self) -> Result<()> {
        for (name, kind) in REQUIRED_PROPERTIES {
            self.store.ensure_property(name, kind).await?;
        }
        Ok(())
    }

    /// Push one markdown file to the store.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn push_file(&self, path: &Path, force: bool) -> Result<PushOutcome> {
        let title = title_for(path);
        let mtime = file_last_modified(path)?;

        let hits = self.store.query_by_title(&title).await?;
        let action = decide(&hits, mtime, force);
        if action == SyncAction::Skip {
            info!(title, "unchanged, skipping");
            return Ok(PushOutcome::Skipped);
        }

        let source = std::fs::read_to_string(path).map_err(|e| PageliftError::io(path, e))?;
        let blocks = self.translator.translate(&source).await?;

        match action {
            SyncAction::Create => {
                let page_id = self
                    .create_with_blocks(default_properties(&title, mtime), default_cover(), &blocks)
                    .await?;
                info!(title, page_id, "page created");
                Ok(PushOutcome::Created { page_id })
            }
            SyncAction::Update { page_id } => {
                let snapshot = self.store.page_snapshot(&page_id).await?;
                self.store.archive_page(&page_id).await?;

                let mut properties = snapshot.properties;
                properties["last modified"] = json!({ "date": { "start": mtime.to_rfc3339() } });
                let cover = snapshot.cover.unwrap_or_else(default_cover);

                let new_id = self.create_with_blocks(properties, cover, &blocks).await?;
                info!(title, old = page_id, new = new_id, "page replaced");
                Ok(PushOutcome::Updated { page_id: new_id })
            }
            SyncAction::Skip => unreachable!("skip handled above"),
        }
    }

    /// Create a page and append whatever blocks did not fit in the creation
    /// request.
    async fn create_with_blocks(
        &self,
        properties: Value,
        cover: Value,
        blocks: &[pagelift_shared::Block],
    ) -> Result<String> {
        let page_id = self.store.create_page(properties, cover, blocks).await?;
        if blocks.len() > MAX_BLOCKS_PER_REQUEST {
            self.store
                .append_blocks(&page_id, &blocks[MAX_BLOCKS_PER_REQUEST..])
                .await?;
        }
        Ok(page_id)
    }

    /// Sync every markdown file under `dir`. One file's failure is logged
    /// and counted, never fatal to the batch.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub async fn run_sync(&self, dir: &Path, force: bool) -> Result<SyncSummary> {
        self.ensure_schema().await?;

        let files = find_markdown_files(dir)?;
        info!(count = files.len(), "markdown files discovered");

        let mut summary = SyncSummary::default();
        for file in &files {
            match self.push_file(file, force).await {
                Ok(PushOutcome::Created { .. }) => summary.created += 1,
                Ok(PushOutcome::Updated { .. }) => summary.updated += 1,
                Ok(PushOutcome::Skipped) => summary.skipped += 1,
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "sync failed for file");
                    summary.failed += 1;
                }
            }
        }

        info!(
            created = summary.created,
            updated = summary.updated,
            skipped = summary.skipped,
            failed = summary.failed,
            "sync run complete"
        );
        Ok(summary)
    }
}
