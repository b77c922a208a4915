//! Orchestration for pagelift: file discovery, sync decisions, and the
//! translate-then-persist pipeline that ties the engine to the document
//! store and image host.

pub mod files;
pub mod pipeline;

pub use files::{file_last_modified, find_markdown_files, title_for};
pub use pipeline::{MemoizedSync, Pipeline, PushOutcome, SyncAction, SyncSummary, decide};
