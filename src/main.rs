// ABOUTME: CLI entrypoint for the memos-export command
// ABOUTME: Sets up logging, runs the export and maps fatal errors to exit 1

use clap::Parser;
use memos_export::{
    api::ApiClient,
    cli::Cli,
    export::{export_all, print_summary, validate_options},
    storage::Paths,
    Result,
};

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .ok();

    if let Err(e) = run() {
        eprintln!("memos-export: {}", e);
        if e.is_unauthorized() {
            eprintln!("memos-export: check that --token is a valid access token");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let options = cli.export_options();
    validate_options(&options)?;

    let client = ApiClient::new(&cli.host, cli.token.clone(), cli.timeout())?;
    let paths = Paths::new(cli.output.clone());

    let report = export_all(&client, &paths, &options)?;
    print_summary(&report, &paths);

    Ok(())
}
