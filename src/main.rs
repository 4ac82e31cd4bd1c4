use clap::Parser;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use hyp3_transfer::{
    config::TransferConfig,
    models::transfer::TransferReport,
    services::{
        hyp3::{Credentials, Hyp3Client},
        replicator::{Replicator, TransferPlan},
        storage::S3Store,
    },
};

/// Copy new HyP3 RTC products into a destination bucket.
#[derive(Debug, Parser)]
#[command(name = "hyp3-transfer", version, about)]
struct Cli {
    /// HyP3 project name (prompted for when omitted)
    project: Option<String>,

    /// Destination bucket (prompted for when omitted)
    bucket: Option<String>,

    /// Multipart threshold and part size in bytes [env: CHUNK_SIZE]
    #[arg(long)]
    chunk_size: Option<u64>,

    /// Maximum copies in flight [env: MAX_CONCURRENT_COPIES]
    #[arg(long)]
    concurrency: Option<usize>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,

    /// Print the plan and exit without copying
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries the operator report
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .json()
        .init();

    metrics::describe_counter!(
        "transfer_files_planned_total",
        "Files found missing from the destination"
    );
    metrics::describe_counter!("transfer_copies_completed", "Files copied successfully");
    metrics::describe_counter!("transfer_copies_failed", "File copies that failed");
    metrics::describe_histogram!("transfer_copy_seconds", "Time to copy one file");

    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Transfer aborted");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = TransferConfig::from_env()?.with_overrides(cli.chunk_size, cli.concurrency)?;

    let project_name = match cli.project {
        Some(p) => p,
        None => prompt("HyP3 project name: ").await?,
    };
    let project_name = require_value("project name", &project_name)?;
    let target_bucket = match cli.bucket {
        Some(b) => b,
        None => prompt("Destination bucket: ").await?,
    };
    let target_bucket = require_value("destination bucket", &target_bucket)?;

    tracing::info!("Connecting to HyP3 at {}", config.hyp3_api_url);
    let credentials = Credentials::from_config(&config)?;
    let hyp3 = Hyp3Client::connect(&config.hyp3_api_url, credentials).await?;

    tracing::info!(region = %config.aws_region, "Initializing S3 client");
    let store = S3Store::new(
        &config.aws_region,
        config.s3_endpoint_url.as_deref(),
        config.s3_max_attempts,
    )
    .await;

    let replicator = Replicator::new(hyp3, store)
        .with_chunk_size(config.chunk_size)
        .with_max_concurrent_copies(config.max_concurrent_copies);

    println!("\nLooking for new files to copy...");
    let plan = replicator.plan(&project_name, &target_bucket).await?;
    print_plan(&plan);

    if plan.tasks.is_empty() || cli.dry_run {
        return Ok(ExitCode::SUCCESS);
    }

    if !cli.yes {
        prompt("Press Enter to continue, Ctrl-c to cancel").await?;
    }

    let report = replicator.execute(plan.tasks).await;
    print_report(&report);

    Ok(if report.is_complete_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Ask on stdout and read one line from stdin off the async runtime.
async fn prompt(label: &'static str) -> io::Result<String> {
    tokio::task::spawn_blocking(move || read_answer(&mut io::stdin().lock(), &mut io::stdout(), label))
        .await
        .map_err(io::Error::other)?
}

/// Closed input is an error, never an answer.
fn read_answer<R: BufRead, W: Write>(input: &mut R, output: &mut W, label: &str) -> io::Result<String> {
    write!(output, "{}", label)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "stdin closed before an answer was given; pass PROJECT, BUCKET and --yes for non-interactive runs",
        ));
    }
    Ok(line.trim().to_string())
}

fn require_value(field: &str, value: &str) -> io::Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} must not be empty", field),
        ));
    }
    Ok(value.to_string())
}

fn print_plan(plan: &TransferPlan) {
    println!("\nProject {}: {} jobs", plan.project_name, plan.jobs.len());
    for job in &plan.jobs {
        println!("  {}", job);
    }
    println!(
        "\nFound {} new files to copy to s3://{}/{}/",
        plan.tasks.len(),
        plan.target_bucket,
        plan.project_name
    );
}

fn print_report(report: &TransferReport) {
    println!(
        "\nCopied {} of {} files, {} failed",
        report.succeeded(),
        report.planned,
        report.failed()
    );
    for (task, error) in report.failures() {
        println!("  FAILED {} -> {}: {}", task.source_uri(), task.target_uri(), error);
    }
}
