// ABOUTME: Command-line interface definitions using clap
// ABOUTME: Host, token and output flags with env fallbacks

use crate::api::{DEFAULT_PAGE_SIZE, DEFAULT_TIMEOUT_SECS};
use crate::export::ExportOptions;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "memos-export")]
#[command(about = "Export memos and attachments from a self-hosted Memos instance", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Memos instance URL (e.g. https://memos.example.com)
    #[arg(long, env = "MEMOS_HOST")]
    pub host: String,

    /// Access token, sent as a bearer token
    #[arg(long, env = "MEMOS_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Output directory for the report and attachments
    #[arg(long, default_value = "./memos_export")]
    pub output: PathBuf,

    /// Memos requested per list page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, value_parser = clap::value_parser!(u32).range(1..))]
    pub page_size: u32,

    /// API request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl Cli {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            page_size: self.page_size,
            show_progress: !self.no_progress,
        }
    }
}
