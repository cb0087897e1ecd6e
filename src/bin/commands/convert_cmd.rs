use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use ip2mmdb::{MmdbBuilder, RowReader};
use std::path::{Path, PathBuf};

pub fn cmd_convert(input: PathBuf, verbose: bool, quiet: bool) -> Result<()> {
    let mut reader = RowReader::from_path(&input)
        .with_context(|| format!("Failed to open input file: {}", input.display()))?;

    let progress = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {human_pos} rows read")?,
        );
        pb
    };

    let mut builder = MmdbBuilder::new();
    while let Some(row) = reader.read_row()? {
        builder.add_row(&row)?;
        progress.inc(1);
    }
    progress.finish_and_clear();

    if verbose {
        let stats = builder.stats();
        let mode = builder
            .mode()
            .map(|m| m.to_string())
            .unwrap_or_else(|| "empty".to_string());
        println!("Building database:");
        println!("  Mode:            {}", mode);
        println!("  Rows:            {}", stats.rows);
        println!("  CIDR entries:    {}", stats.cidr_entries);
        println!("  Payload records: {}", stats.payload_records);
        println!("  Tokens:          {}", stats.tokens);
        println!("  Coordinates:     {}", stats.coordinates);
    }

    let output = output_path(&input);
    builder
        .write_to_path(&output)
        .with_context(|| format!("Failed to write database: {}", output.display()))?;

    println!("✓ Database built: {}", output.display());
    Ok(())
}

/// Output path: the input path with ".MMDB" appended
fn output_path(input: &Path) -> PathBuf {
    let mut os = input.as_os_str().to_os_string();
    os.push(".MMDB");
    PathBuf::from(os)
}
