use crate::models::Operation;
use crate::services::discovery::list_candidates;
use crate::services::pdf::PdfEngine;
use crate::services::placement::place_to_many;
use crate::services::routing::route_success;
use crate::services::validation::validate_pdf;
use crate::services::{
    ProcessContext, ProcessError, ProcessOutcome, fail_sources, log_operation, log_performance,
};
use std::time::Instant;

const KIND: &str = "SINGLE_FILE_MOVE";
const INVALID_KIND: &str = "SINGLE_FILE_INVALID";

/// Send the first candidate in the intake folder to every output folder.
///
/// The source is validated, copied to each output, then archived (or deleted
/// when archive mode is off). A file that fails validation, or that could not
/// be placed anywhere, is moved to the error folder.
pub fn process_single_file<E: PdfEngine + ?Sized>(
    ctx: &ProcessContext<'_, E>,
) -> Result<ProcessOutcome, ProcessError> {
    let started = Instant::now();
    let dirs = ctx.dirs;

    let candidates = list_candidates(&dirs.main).map_err(ProcessError::Discovery)?;
    let Some(file) = candidates.into_iter().next() else {
        return Err(ProcessError::NoFiles);
    };
    let sources = [file.path.clone()];

    tracing::info!("Processing single file: {}", file.name);

    let size = match validate_pdf(ctx.engine, &file.path) {
        Ok(size) => size,
        Err(e) => return Err(fail_sources(dirs, INVALID_KIND, &sources, e.into())),
    };

    let fan_out = match place_to_many(&file.path, &file.name, &dirs.outputs, &dirs.error) {
        Ok(fan_out) => fan_out,
        Err(e) => return Err(fail_sources(dirs, KIND, &sources, e.into())),
    };

    let mut warnings: Vec<String> = fan_out.warning().into_iter().collect();

    let disposal = route_success(&sources, &dirs.archive, ctx.archive_mode);
    let archive_files = if ctx.archive_mode && disposal.is_complete(1) {
        disposal.placed
    } else {
        Vec::new()
    };
    warnings.extend(disposal.warnings);

    let placed = fan_out.succeeded();
    let operation = Operation::single(
        file.path,
        fan_out.placed,
        dirs.outputs.clone(),
        archive_files,
    );

    log_operation(KIND, &file.name, "", "SUCCESS");
    log_performance(KIND, started.elapsed(), size);

    Ok(ProcessOutcome {
        description: format!("Moved {} to {} output folder(s)", file.name, placed),
        operation,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WatchedDirectorySet;
    use crate::services::pdf::{MockPdfEngine, PdfError};
    use camino::Utf8PathBuf;
    use std::fs;
    use tempfile::TempDir;

    fn workspace(outputs: &[&str]) -> (TempDir, WatchedDirectorySet) {
        let temp = TempDir::new().unwrap();
        let main = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();
        let outputs: Vec<String> = outputs.iter().map(|s| s.to_string()).collect();
        let dirs = WatchedDirectorySet::new(main, &outputs);
        dirs.prepare().unwrap();
        (temp, dirs)
    }

    fn accepting_engine() -> MockPdfEngine {
        let mut engine = MockPdfEngine::new();
        engine.expect_validate().returning(|_| Ok(()));
        engine
    }

    #[test]
    fn test_no_files() {
        let (_temp, dirs) = workspace(&["output"]);
        let engine = MockPdfEngine::new();
        let ctx = ProcessContext { engine: &engine, dirs: &dirs, archive_mode: true };

        assert!(matches!(process_single_file(&ctx), Err(ProcessError::NoFiles)));
    }

    #[test]
    fn test_moves_first_file_and_archives() {
        let (_temp, dirs) = workspace(&["out/a", "out/b"]);
        fs::write(dirs.main.join("b.pdf"), b"%PDF-b").unwrap();
        fs::write(dirs.main.join("a.pdf"), b"%PDF-a").unwrap();
        let engine = accepting_engine();
        let ctx = ProcessContext { engine: &engine, dirs: &dirs, archive_mode: true };

        let outcome = process_single_file(&ctx).unwrap();

        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.operation.original_files, vec![dirs.main.join("a.pdf")]);
        assert_eq!(outcome.operation.archive_files, vec![dirs.archive.join("a.pdf")]);
        assert_eq!(outcome.operation.placed_outputs().count(), 2);
        assert!(!dirs.main.join("a.pdf").exists());
        assert!(dirs.main.join("b.pdf").exists());
        assert!(dirs.outputs[0].join("a.pdf").exists());
        assert!(dirs.outputs[1].join("a.pdf").exists());
    }

    #[test]
    fn test_archive_mode_off_deletes_source() {
        let (_temp, dirs) = workspace(&["output"]);
        fs::write(dirs.main.join("a.pdf"), b"%PDF-a").unwrap();
        let engine = accepting_engine();
        let ctx = ProcessContext { engine: &engine, dirs: &dirs, archive_mode: false };

        let outcome = process_single_file(&ctx).unwrap();

        assert!(outcome.operation.archive_files.is_empty());
        assert!(!dirs.main.join("a.pdf").exists());
        assert_eq!(fs::read_dir(&dirs.archive).unwrap().count(), 0);
    }

    #[test]
    fn test_invalid_file_goes_to_error() {
        let (_temp, dirs) = workspace(&["output"]);
        fs::write(dirs.main.join("a.pdf"), b"garbage").unwrap();
        let mut engine = MockPdfEngine::new();
        engine
            .expect_validate()
            .returning(|p| Err(PdfError::NoPages(p.to_path_buf())));
        let ctx = ProcessContext { engine: &engine, dirs: &dirs, archive_mode: true };

        let err = process_single_file(&ctx).unwrap_err();

        assert!(err.is_failure());
        assert!(dirs.error.join("a.pdf").exists());
        assert_eq!(fs::read_dir(&dirs.outputs[0]).unwrap().count(), 0);
    }
}
