//! URL list exports
//!
//! Each configured format produces `{dir}/crawl_{domain}_{ts}.{ext}`.

use crate::config::ExportFormat;
use crate::output::crawled::{file_timestamp, safe_domain};
use crate::output::traits::OutputResult;
use chrono::Local;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Exports `urls` in one format and returns the file path
///
/// # Formats
///
/// | Format | Content |
/// |--------|---------|
/// | json | Pretty-printed array of strings |
/// | csv | One URL per record, no header |
/// | txt | One URL per line |
pub fn export_urls(
    dir: &Path,
    domain: &str,
    urls: &[String],
    format: ExportFormat,
) -> OutputResult<PathBuf> {
    fs::create_dir_all(dir)?;

    let path = dir.join(format!(
        "crawl_{}_{}.{}",
        safe_domain(domain),
        file_timestamp(Local::now()),
        format.extension()
    ));

    match format {
        ExportFormat::Json => {
            let mut writer = BufWriter::new(File::create(&path)?);
            serde_json::to_writer_pretty(&mut writer, urls)?;
            writer.flush()?;
        }
        ExportFormat::Csv => {
            let mut writer = csv::Writer::from_path(&path)?;
            for url in urls {
                writer.write_record([url.as_str()])?;
            }
            writer.flush()?;
        }
        ExportFormat::Txt => {
            let mut writer = BufWriter::new(File::create(&path)?);
            for url in urls {
                writeln!(writer, "{}", url)?;
            }
            writer.flush()?;
        }
    }

    Ok(path)
}

/// Exports `urls` in every format, logging and skipping failures
pub fn export_all(
    dir: &Path,
    domain: &str,
    urls: &[String],
    formats: &[ExportFormat],
) -> Vec<PathBuf> {
    let mut written = Vec::new();

    for format in formats {
        match export_urls(dir, domain, urls, *format) {
            Ok(path) => {
                info!(format = %format, path = %path.display(), "Exported URLs");
                written.push(path);
            }
            Err(e) => {
                error!(format = %format, error = %e, "Export failed");
            }
        }
    }

    written
}
