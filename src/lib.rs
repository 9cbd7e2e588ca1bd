// ABOUTME: Public library API for Memos export
// ABOUTME: Re-exports core modules for external use

pub mod api;
pub mod cli;
pub mod error;
pub mod export;
pub mod model;
pub mod storage;

pub use error::{Error, Result};
pub use model::{AttachmentMeta, AttachmentRef, ExportReport, ExportSummary, MemoRecord, UserRecord};
