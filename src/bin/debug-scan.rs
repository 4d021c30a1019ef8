/// Diagnostic tool to verify the scan → aggregate → rank pipeline without pacing
use bigfiles_rs::config::ScanConfig;
use bigfiles_rs::scanner::{self, ScanEvent, ScanRequest};
use bigfiles_rs::tree::aggregate;
use bigfiles_rs::tree::extensions::ExtensionFilter;
use bigfiles_rs::tree::FolderIndex;
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bigfiles_rs=debug".parse()?),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let scan_path = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    let threshold = args.next().map(|t| t.parse::<f64>()).transpose()?;
    let filter = ExtensionFilter::parse(&args.next().unwrap_or_default());

    println!("=== DIAGNOSTIC: Scan → Aggregate → Rank Pipeline ===");
    println!("Scanning: {}", scan_path.display());

    let request = ScanRequest::new(&scan_path, threshold, filter)?;
    let threshold = request.threshold_gib();

    // Scan
    let start = std::time::Instant::now();
    let events = scanner::run_scan_blocking(&request, &ScanConfig::immediate());
    println!(
        "\n[1] Scan finished in {:.2}s: {} events",
        start.elapsed().as_secs_f64(),
        events.len()
    );

    match events.last() {
        Some(ScanEvent::Completed { total_found }) => println!("    Completed: {} files", total_found),
        Some(ScanEvent::Failed(e)) => {
            println!("    FAILED: {}", e);
            return Ok(());
        }
        other => println!("    Unexpected terminal event: {:?}", other),
    }

    // Aggregate
    let mut index = FolderIndex::new();
    let mut discovered = 0usize;
    let mut percents = Vec::new();
    for event in &events {
        match event {
            ScanEvent::FileDiscovered(_) => discovered += 1,
            ScanEvent::Progress(p) => percents.push(p.percent),
            _ => {}
        }
        index.apply(event);
    }
    println!(
        "\n[2] Aggregated {} records into {} folders",
        index.file_count(),
        index.groups().len()
    );

    // Top 10 folders
    println!("\n[3] Top 10 folders by size:");
    for (i, entry) in aggregate::rank_folders(index.groups()).iter().take(10).enumerate() {
        println!("    [{}] '{}' - {:.2} GB", i, entry.label, entry.size_gib);
    }

    // Top 10 files
    println!("\n[4] Top 10 files by size:");
    for (i, entry) in aggregate::rank(index.groups()).iter().take(10).enumerate() {
        println!(
            "    [{}] '{}' - {:.2} GB ({:.0}% of largest)",
            i,
            entry.label,
            entry.size_gib,
            entry.relative * 100.0
        );
    }

    // Check for anomalies
    println!("\n[5] Checking for anomalies:");
    let mut anomalies = 0;

    if discovered != index.file_count() {
        println!(
            "    ✗ {} discoveries but {} unique records (duplicates emitted)",
            discovered,
            index.file_count()
        );
        anomalies += 1;
    }

    for record in index.records() {
        let exact_gib = record.size_bytes as f64 / 1_073_741_824.0;
        if exact_gib <= threshold {
            println!("    ✗ {} is not above the threshold", record.path.display());
            anomalies += 1;
        }
        if !request.filter().matches(&record.name) {
            println!("    ✗ {} does not match the filter", record.path.display());
            anomalies += 1;
        }
    }

    if percents.windows(2).any(|w| w[1] < w[0]) {
        println!("    ✗ Progress percent went backwards: {:?}", percents);
        anomalies += 1;
    }
    if percents.last().copied() != Some(100) {
        println!("    ✗ Progress did not finish at 100%: {:?}", percents.last());
        anomalies += 1;
    }

    if anomalies == 0 {
        println!("    ✓ No anomalies");
    }

    Ok(())
}
