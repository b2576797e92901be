//! Candidate discovery and the small size/count helpers shown by the menu.

use crate::models::CandidateFile;
use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;

/// Whether `path` carries a `.pdf` extension, in any letter case.
pub fn has_pdf_extension(path: &Utf8Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// List the PDFs directly inside `dir`, sorted by file name.
///
/// Upper- and lower-case extensions are merged into one result set and the
/// order is byte-wise lexicographic on the file name, independent of the
/// order the filesystem enumerates entries in. Subdirectories and non-UTF-8
/// names are skipped. An empty directory yields an empty list.
pub fn list_candidates(dir: &Utf8Path) -> Result<Vec<CandidateFile>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to read directory: {}", dir))?;

    let mut candidates = Vec::new();

    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to read entry in: {}", dir))?;

        let Ok(path) = camino::Utf8PathBuf::try_from(entry.path()) else {
            tracing::debug!("Skipping non UTF-8 path: {:?}", entry.path());
            continue;
        };

        if !has_pdf_extension(&path) {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!("Skipping {}: {}", path, e);
                continue;
            }
        };

        let Some(name) = path.file_name().map(str::to_string) else {
            continue;
        };

        candidates.push(CandidateFile {
            path,
            name,
            size: metadata.len(),
        });
    }

    candidates.sort_by(|a, b| a.name.cmp(&b.name));

    tracing::debug!("Found {} PDF file(s) in {}", candidates.len(), dir);
    Ok(candidates)
}

/// Number of PDFs in `dir`; zero when the directory cannot be read.
pub fn count_candidates(dir: &Utf8Path) -> usize {
    list_candidates(dir).map(|files| files.len()).unwrap_or(0)
}

/// Human readable size of the file at `path`, or `unknown`.
pub fn human_size(path: &Utf8Path) -> String {
    match fs::metadata(path) {
        Ok(metadata) => format_size(metadata.len()),
        Err(_) => "unknown".to_string(),
    }
}

/// Format a byte count as `512B`, `1.5K`, `2.0M` or `1.1G` (1024-based).
pub fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    match size {
        s if s < KB => format!("{}B", s),
        s if s < MB => format!("{:.1}K", s as f64 / KB as f64),
        s if s < GB => format!("{:.1}M", s as f64 / MB as f64),
        s => format!("{:.1}G", s as f64 / GB as f64),
    }
}
