use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use bigfiles_rs::config::ScanConfig;
use bigfiles_rs::export;
use bigfiles_rs::scanner::{self, FileRecord, ScanController, ScanError, ScanEvent, ScanRequest};
use bigfiles_rs::tree::aggregate;
use bigfiles_rs::tree::extensions::ExtensionFilter;
use bigfiles_rs::tree::FolderIndex;

const BAR_WIDTH: usize = 40;

/// Find large files under a directory.
#[derive(Debug, Parser)]
#[command(name = "bigfiles", version, about)]
struct Cli {
    /// Directory to scan
    root: PathBuf,

    /// Size in GiB a file must exceed (default 0.1)
    #[arg(short, long, value_name = "GIB")]
    threshold: Option<f64>,

    /// Comma-separated name suffixes to keep, e.g. ".mp4,.zip"
    #[arg(short, long, value_name = "LIST", default_value = "")]
    extensions: String,

    /// Delay between reported files, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 50)]
    pace_ms: u64,

    /// Write results to a CSV file when the scan completes
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,

    /// Show the N largest files as a bar chart
    #[arg(long, value_name = "N")]
    chart: Option<usize>,

    /// Read p(ause) / r(esume) / c(ancel) commands from stdin
    #[arg(short, long)]
    interactive: bool,

    /// Only print the final summary
    #[arg(short, long)]
    quiet: bool,
}

enum Outcome {
    Completed(usize),
    Cancelled,
    Failed(ScanError),
}

fn main() -> Result<()> {
    // Logs go to stderr; stdout carries results
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bigfiles_rs=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let request = ScanRequest::new(
        &cli.root,
        cli.threshold,
        ExtensionFilter::parse(&cli.extensions),
    )
    .context("Invalid scan request")?;
    let config = ScanConfig::default().with_pace(Duration::from_millis(cli.pace_ms));

    let session = scanner::start(request, config);
    if cli.interactive {
        spawn_command_reader(session.controller());
        eprintln!("Commands: p = pause, r = resume, c = cancel");
    }

    let mut index = FolderIndex::new();
    let mut outcome = None;

    for event in session.events() {
        match event {
            ScanEvent::Started { root } => {
                if !cli.quiet {
                    eprintln!("Scanning {} ...", root.display());
                }
            }
            ScanEvent::Enumerated { candidates } => {
                if !cli.quiet {
                    eprintln!("{} files above threshold", candidates);
                }
            }
            ScanEvent::FileDiscovered(record) => {
                if !cli.quiet {
                    println!("{}", format_record(&record));
                }
                index.ingest(&record);
            }
            ScanEvent::Progress(progress) => {
                if !cli.quiet {
                    eprintln!(
                        "[{:>3}%] {}  ({})",
                        progress.percent,
                        progress.message,
                        progress.eta_label()
                    );
                }
            }
            ScanEvent::Completed { total_found } => outcome = Some(Outcome::Completed(total_found)),
            ScanEvent::Cancelled => outcome = Some(Outcome::Cancelled),
            ScanEvent::Failed(e) => outcome = Some(Outcome::Failed(e)),
        }
    }
    drop(session);

    match outcome {
        Some(Outcome::Completed(total)) => {
            print_groups(&index);
            if let Some(n) = cli.chart {
                print_chart(&index, n);
            }
            if let Some(path) = &cli.csv {
                let rows = export::export_csv(&index, path)
                    .with_context(|| format!("Failed to export CSV to {}", path.display()))?;
                eprintln!("Exported {} rows to {}", rows, path.display());
            }
            println!("Completed. {} large files found.", total);
        }
        Some(Outcome::Cancelled) => {
            print_groups(&index);
            println!("Scan cancelled after {} files.", index.file_count());
        }
        Some(Outcome::Failed(e)) => return Err(e).context("Scan failed"),
        None => anyhow::bail!("Scan thread ended without a result"),
    }

    Ok(())
}

fn format_record(record: &FileRecord) -> String {
    format!(
        "{} {:>10.2} MiB {:>8.2} GiB  {}",
        if record.is_large() { "!" } else { " " },
        record.size_mib,
        record.size_gib,
        record.path.display()
    )
}

fn print_groups(index: &FolderIndex) {
    for group in index.groups() {
        println!(
            "\n{} ({}) - {:.2} GiB",
            group.label,
            group.folder_path.display(),
            group.total_gib()
        );
        for child in &group.children {
            println!("    {:<40} {:>8.2} GiB", child.name, child.size_gib);
        }
    }
}

fn print_chart(index: &FolderIndex, top: usize) {
    let ranked = aggregate::rank(index.groups());
    println!("\nLargest files:");
    if ranked.is_empty() {
        println!("    (no data to display)");
        return;
    }
    for entry in ranked.iter().take(top) {
        let width = ((entry.relative * BAR_WIDTH as f64).round() as usize).max(1);
        println!(
            "    {:<bar$} {:>8.2} GiB  {}",
            "#".repeat(width),
            entry.size_gib,
            entry.label,
            bar = BAR_WIDTH
        );
    }
}

/// Map stdin lines onto the scan's control surface.
fn spawn_command_reader(controller: ScanController) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match line.trim() {
                "p" | "pause" => {
                    controller.pause();
                    eprintln!("Paused");
                }
                "r" | "resume" => {
                    controller.resume();
                    eprintln!("Resumed");
                }
                "c" | "cancel" | "q" => {
                    controller.cancel();
                    eprintln!("Cancelling...");
                    break;
                }
                "" => {}
                other => eprintln!("Unknown command '{}'", other),
            }
        }
    });
}
