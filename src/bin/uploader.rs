/*
 * Responsibility
 * - Drive the upload/process/download workflow from the command line
 */
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use url::Url;

use crimestat_gateway::uploader::{
    batch::{MAX_FILE_SIZE_MB, SelectedFile, format_size},
    controller::{NoticeKind, Phase, Workflow},
    save::DiskSink,
    transport::HttpGateway,
};

/// Upload crime spreadsheets through the gateway and save the processed
/// result next to you.
#[derive(Parser, Debug)]
#[command(name = "uploader", version, about)]
struct Args {
    /// Gateway origin, e.g. http://localhost:3000
    #[arg(long, default_value = "http://localhost:3000")]
    gateway: Url,

    /// Directory the processed result is saved into
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Spreadsheet files to upload (.xls / .xlsx)
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut candidates = Vec::new();
    for path in &args.files {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("invalid file name: {}", path.display()))?
            .to_string();
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("could not read {}", path.display()))?;
        candidates.push(SelectedFile { name, bytes });
    }

    let mut workflow = Workflow::new(HttpGateway::new(args.gateway), DiskSink::new(&args.out_dir));

    let offered = candidates.len();
    let accepted = workflow.add_files(candidates);
    if accepted < offered {
        println!(
            "Skipped {} non-spreadsheet file(s) (accepted: .xls, .xlsx).",
            offered - accepted
        );
    }
    if workflow.batch().is_empty() {
        bail!("nothing to upload");
    }

    println!(
        "Uploading {} file(s), limit {} MB per file:",
        workflow.batch().len(),
        MAX_FILE_SIZE_MB
    );
    for file in workflow.batch().files() {
        println!("  {} ({})", file.name, format_size(file.size()));
    }

    let notice = workflow.process_files().await;
    println!("{}: {}", notice.title, notice.message);
    if workflow.phase() != Phase::ResultAvailable {
        bail!("processing did not produce a result");
    }

    let notice = workflow.download_result().await;
    println!("{}: {}", notice.title, notice.message);
    if notice.kind == NoticeKind::Error {
        bail!("download failed");
    }

    Ok(())
}
