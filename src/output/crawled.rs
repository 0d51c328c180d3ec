//! Crawled URL lists
//!
//! A finished crawl writes its discovered URLs to
//! `{dir}/{domain}_{YYYYmmdd_HHMMSS}.txt`, one per line, under a short
//! `#`-comment header. The same files feed `scrape-all`.

use crate::output::traits::OutputResult;
use chrono::{DateTime, Local};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Makes a network location usable in a file name
pub fn safe_domain(domain: &str) -> String {
    domain.replace(':', "_")
}

/// Timestamp used in output file names
pub fn file_timestamp(now: DateTime<Local>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

/// Writes the discovered URL list and returns the file path
pub fn save_crawled_urls(dir: &Path, domain: &str, urls: &[String]) -> OutputResult<PathBuf> {
    fs::create_dir_all(dir)?;

    let now = Local::now();
    let path = dir.join(format!("{}_{}.txt", safe_domain(domain), file_timestamp(now)));

    let mut writer = BufWriter::new(File::create(&path)?);
    writeln!(writer, "# Crawled URLs for {}", domain)?;
    writeln!(writer, "# Date: {}", now.format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(writer, "# Total URLs: {}", urls.len())?;
    writeln!(writer)?;
    for url in urls {
        writeln!(writer, "{}", url)?;
    }
    writer.flush()?;

    Ok(path)
}

/// Reads a crawled URL list, skipping comments and blank lines
pub fn read_crawled_urls(path: &Path) -> OutputResult<Vec<String>> {
    let reader = BufReader::new(File::open(path)?);

    let mut urls = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        urls.push(line.to_string());
    }

    Ok(urls)
}

/// The `YYYYmmdd_HHMMSS` stamp at the end of a crawled file's name
fn name_stamp(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let mut parts = stem.rsplitn(3, '_');
    let time = parts.next()?;
    let date = parts.next()?;
    parts.next()?;

    let is_stamp = date.len() == 8
        && time.len() == 6
        && date.bytes().chain(time.bytes()).all(|b| b.is_ascii_digit());
    is_stamp.then(|| format!("{}{}", date, time))
}

/// Lists crawled URL files in `dir`, most recently written first
///
/// Files are ordered by the timestamp in their name, whatever their domain.
/// Names without a timestamp come last.
pub fn list_crawled_files(dir: &Path) -> OutputResult<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().map_or(false, |ext| ext == "txt"))
        .collect();
    files.sort_by(|a, b| {
        name_stamp(b)
            .cmp(&name_stamp(a))
            .then_with(|| b.cmp(a))
    });

    Ok(files)
}
