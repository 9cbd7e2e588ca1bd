// ABOUTME: Export driver walking every memo and its attachments
// ABOUTME: Fatal setup/listing/save errors abort; per-memo failures are recorded

use crate::{
    api::{ApiClient, DEFAULT_PAGE_SIZE},
    model::is_truthy,
    storage::{safe_file_name, Paths},
    AttachmentMeta, AttachmentRef, Error, ExportReport, MemoRecord, Result,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub page_size: u32,
    pub show_progress: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            page_size: DEFAULT_PAGE_SIZE,
            show_progress: false,
        }
    }
}

/// Runs a full export and returns the report that was written to disk.
pub fn export_all(client: &ApiClient, paths: &Paths, options: &ExportOptions) -> Result<ExportReport> {
    paths.ensure_dirs()?;
    info!(output = %paths.output_dir.display(), "prepared output directories");

    let mut report = ExportReport::new(client.base_url().as_str());

    let user = client.current_user()?;
    info!(
        user = user.label(),
        email = user.email.as_deref().unwrap_or("N/A"),
        "authenticated"
    );
    report.user = Some(user);

    let memos = client.list_memos(options.page_size)?;
    report.summary.total_memos = memos.len();
    info!(total = memos.len(), "listed memos");

    let pb = progress_bar(memos.len() as u64, options.show_progress);

    for (idx, summary) in memos.iter().enumerate() {
        let name = summary
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty());
        if let Some(name) = name {
            pb.set_message(name.to_string());
        }

        // Log lines share stderr with the bar; keep it off screen while a memo runs.
        // The closure must not touch `pb`, suspend holds its state lock.
        pb.suspend(|| match name {
            Some(name) => export_one(client, paths, name, summary, &mut report),
            None => warn!(index = idx, "skipping memo without a name"),
        });
        pb.inc(1);
    }

    pb.finish_and_clear();

    paths.save_report(&report)?;
    info!(path = %paths.report_path.display(), "saved export report");

    Ok(report)
}

fn export_one(
    client: &ApiClient,
    paths: &Paths,
    name: &str,
    summary: &Value,
    report: &mut ExportReport,
) {
    match process_memo(client, paths, name, summary) {
        Ok(memo) => {
            debug!(memo = name, attachments = memo.attachments.len(), "memo exported");
            report.push_memo(memo);
        }
        Err(e) => {
            let message = format!("Memo {}: {}", name, e);
            error!("{}", message);
            report.push_error(message);
        }
    }
}

/// Fetches one memo's details and attachments. Detail and attachment-list
/// fetch failures degrade; malformed payloads fail the memo.
pub fn process_memo(
    client: &ApiClient,
    paths: &Paths,
    name: &str,
    summary: &Value,
) -> Result<MemoRecord> {
    let detail = match client.get_memo(name) {
        Ok(detail) if is_truthy(&detail) => detail,
        Ok(_) => {
            warn!(memo = name, "empty memo details, using list entry");
            summary.clone()
        }
        Err(e) => {
            warn!(memo = name, error = %e, "failed to fetch memo details, using list entry");
            summary.clone()
        }
    };

    let metas = match client.list_attachments(name) {
        Ok(raw) => AttachmentMeta::list_from_value(&raw)?,
        Err(e) => {
            warn!(memo = name, error = %e, "failed to fetch attachments");
            Vec::new()
        }
    };

    let mut record = MemoRecord::from_detail(&detail, Vec::new())?;

    for meta in &metas {
        match download_attachment(client, paths, meta) {
            Ok(Some(attachment)) => record.attachments.push(attachment),
            Ok(None) => {}
            Err(e) => {
                warn!(memo = name, attachment = %meta.name, error = %e, "failed to download attachment");
            }
        }
    }

    Ok(record)
}

/// Downloads one attachment into the attachments directory.
///
/// Returns `Ok(None)` without touching the network when the metadata lacks a
/// resource name or a usable filename.
pub fn download_attachment(
    client: &ApiClient,
    paths: &Paths,
    meta: &AttachmentMeta,
) -> Result<Option<AttachmentRef>> {
    if meta.name.is_empty() || safe_file_name(&meta.filename).is_none() {
        warn!(attachment = ?meta, "invalid attachment data, skipping");
        return Ok(None);
    }

    let content = client.download(&meta.name, &meta.filename)?;
    let file_path = paths.store_attachment(&meta.filename, &content)?;
    info!(path = %file_path, bytes = content.len(), "downloaded attachment");

    Ok(Some(meta.clone().into_ref(file_path)))
}

/// Prints the closing summary of a finished run.
pub fn print_summary(report: &ExportReport, paths: &Paths) {
    println!("Export data saved to: {}", paths.report_path.display());
    println!("Total memos exported: {}", report.memos.len());
    println!(
        "Total attachments downloaded: {}",
        report.summary.total_attachments
    );
    if !report.summary.export_errors.is_empty() {
        println!(
            "Errors encountered: {}",
            report.summary.export_errors.len()
        );
    }
}

fn progress_bar(len: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40}] {pos}/{len} memos {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    pb
}

/// Rejects option values the API would refuse.
pub fn validate_options(options: &ExportOptions) -> Result<()> {
    if options.page_size == 0 {
        return Err(Error::Validation("page size must be at least 1".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn offline_client() -> ApiClient {
        // Nothing listens on port 9; tests here must not reach the network.
        ApiClient::new("http://127.0.0.1:9", "token".into(), Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_default_options() {
        let options = ExportOptions::default();
        assert_eq!(options.page_size, 1000);
        assert!(!options.show_progress);
        assert!(validate_options(&options).is_ok());
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let options = ExportOptions {
            page_size: 0,
            ..ExportOptions::default()
        };
        assert!(matches!(
            validate_options(&options),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_download_skips_incomplete_metadata() {
        let temp = TempDir::new().unwrap();
        let paths = Paths::new(temp.path().to_path_buf());
        paths.ensure_dirs().unwrap();
        let client = offline_client();

        let no_name = AttachmentMeta::from_value(&serde_json::json!({"filename": "a.png"})).unwrap();
        let no_file = AttachmentMeta::from_value(&serde_json::json!({"name": "attachments/a"})).unwrap();

        assert!(download_attachment(&client, &paths, &no_name).unwrap().is_none());
        assert!(download_attachment(&client, &paths, &no_file).unwrap().is_none());
        assert_eq!(std::fs::read_dir(&paths.attachments_dir).unwrap().count(), 0);
    }

    #[test]
    fn test_download_network_failure_is_an_error() {
        let temp = TempDir::new().unwrap();
        let paths = Paths::new(temp.path().to_path_buf());
        paths.ensure_dirs().unwrap();
        let client = offline_client();

        let meta = AttachmentMeta::from_value(&serde_json::json!({
            "name": "attachments/a",
            "filename": "a.png"
        }))
        .unwrap();

        assert!(matches!(
            download_attachment(&client, &paths, &meta),
            Err(Error::Transport(_))
        ));
    }
}
