use crate::services::discovery::has_pdf_extension;
use crate::services::pdf::{PdfEngine, PdfError};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use thiserror::Error;

/// Reasons a candidate is rejected before any processing.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("File not found: {0}")]
    Missing(Utf8PathBuf),

    #[error("Not a regular file: {0}")]
    NotAFile(Utf8PathBuf),

    #[error("File is empty: {0}")]
    Empty(Utf8PathBuf),

    #[error("Not a PDF file: {0}")]
    WrongExtension(Utf8PathBuf),

    #[error("Invalid PDF structure in {path}: {source}")]
    Structure {
        path: Utf8PathBuf,
        #[source]
        source: PdfError,
    },
}

/// Check that `path` is a non-empty regular `.pdf` file the engine can read.
///
/// Returns the file size in bytes.
pub fn validate_pdf<E: PdfEngine + ?Sized>(
    engine: &E,
    path: &Utf8Path,
) -> Result<u64, ValidationError> {
    let metadata = fs::metadata(path).map_err(|_| ValidationError::Missing(path.to_path_buf()))?;

    if !metadata.is_file() {
        return Err(ValidationError::NotAFile(path.to_path_buf()));
    }
    if metadata.len() == 0 {
        return Err(ValidationError::Empty(path.to_path_buf()));
    }
    if !has_pdf_extension(path) {
        return Err(ValidationError::WrongExtension(path.to_path_buf()));
    }

    engine
        .validate(path)
        .map_err(|source| ValidationError::Structure {
            path: path.to_path_buf(),
            source,
        })?;

    tracing::debug!("PDF validation successful: {}", path);
    Ok(metadata.len())
}
