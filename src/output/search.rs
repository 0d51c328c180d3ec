//! Full-text search over scraped results
//!
//! Scraped pages in the results directory (`.json`, `.md` and `.html`) are
//! searched case-insensitively. Each matching file yields one hit with a
//! short snippet around the first match.

use crate::output::crawled::file_timestamp;
use crate::output::traits::{OutputError, OutputResult};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Characters of context kept on each side of a match
pub const SNIPPET_CONTEXT: usize = 50;

const SEARCHABLE_EXTENSIONS: [&str; 3] = ["json", "md", "html"];

/// One file that contains the search term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub file: String,
    pub snippet: String,
}

/// Layout of an exported search
#[derive(Debug, Serialize)]
struct SearchExport<'a> {
    search_term: &'a str,
    timestamp: DateTime<Local>,
    result_count: usize,
    results: &'a [SearchHit],
}

/// Lists searchable result files in `dir`, sorted by path
pub fn searchable_files(dir: &Path) -> OutputResult<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map_or(false, |ext| SEARCHABLE_EXTENSIONS.contains(&ext))
        })
        .collect();
    files.sort();

    Ok(files)
}

/// Searches every result file in `dir` for `term`, ignoring case
///
/// Files that cannot be read as UTF-8 text are logged and skipped.
///
/// # Errors
///
/// `OutputError::Format` for a blank term, `OutputError::Io` if the
/// directory cannot be listed.
pub fn search_results(dir: &Path, term: &str) -> OutputResult<Vec<SearchHit>> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return Err(OutputError::Format("search term is empty".to_string()));
    }

    let mut hits = Vec::new();
    for path in searchable_files(dir)? {
        let content = match fs::read_to_string(&path) {
            Ok(content) => content.to_lowercase(),
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to read result file");
                continue;
            }
        };

        if let Some(snippet) = snippet_around(&content, &term) {
            debug!(path = %path.display(), "Search match");
            hits.push(SearchHit {
                file: path.to_string_lossy().into_owned(),
                snippet,
            });
        }
    }

    Ok(hits)
}

/// Builds the snippet for the first occurrence of `term` in `content`
///
/// Both arguments are expected to be lowercased already. Newlines become
/// spaces and `...` marks text cut on either side.
pub fn snippet_around(content: &str, term: &str) -> Option<String> {
    let pos = content.find(term)?;

    let mut start = pos.saturating_sub(SNIPPET_CONTEXT);
    while !content.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (pos + term.len() + SNIPPET_CONTEXT).min(content.len());
    while !content.is_char_boundary(end) {
        end += 1;
    }

    let mut snippet = content[start..end].replace('\n', " ").trim().to_string();
    if start > 0 {
        snippet = format!("...{}", snippet);
    }
    if end < content.len() {
        snippet.push_str("...");
    }

    Some(snippet)
}

/// Writes search hits to `{dir}/search_{term}_{YYYYmmdd_HHMMSS}.json`
///
/// Returns `None` without writing anything when there are no hits.
pub fn export_search_results(
    dir: &Path,
    term: &str,
    hits: &[SearchHit],
) -> OutputResult<Option<PathBuf>> {
    if hits.is_empty() {
        return Ok(None);
    }

    fs::create_dir_all(dir)?;
    let now = Local::now();
    let safe_term: String = term
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() || c == '/' || c == '\\' { '_' } else { c })
        .collect();
    let path = dir.join(format!("search_{}_{}.json", safe_term, file_timestamp(now)));

    let export = SearchExport {
        search_term: term,
        timestamp: now,
        result_count: hits.len(),
        results: hits,
    };

    let mut writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(&mut writer, &export)?;
    writer.flush()?;

    Ok(Some(path))
}
