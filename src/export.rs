use std::io;
use std::path::Path;

use crate::tree::FolderIndex;

pub const HEADER: [&str; 4] = ["File Name", "File Path", "Size (MB)", "Size (GB)"];

/// Write the index as CSV, folder by folder. Returns the number of data rows.
pub fn write_csv<W: io::Write>(index: &FolderIndex, writer: W) -> csv::Result<usize> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(HEADER)?;

    let mut rows = 0;
    for record in index.records() {
        let path = record.path.to_string_lossy();
        let mib = format!("{:.2}", record.size_mib);
        let gib = format!("{:.2}", record.size_gib);
        out.write_record([record.name.as_str(), path.as_ref(), mib.as_str(), gib.as_str()])?;
        rows += 1;
    }

    out.flush()?;
    Ok(rows)
}

pub fn export_csv(index: &FolderIndex, path: &Path) -> csv::Result<usize> {
    let file = std::fs::File::create(path)?;
    let rows = write_csv(index, io::BufWriter::new(file))?;
    tracing::info!("Exported {} rows to {}", rows, path.display());
    Ok(rows)
}
