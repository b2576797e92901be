//! The duplex-scan merge.
//!
//! A duplex scan pair is the fronts of a stack in one file and the backs,
//! scanned in reverse, in the other. Interleaving the first file with the
//! second one reversed restores reading order:
//! `doc1[1], doc2[N], doc1[2], doc2[N-1], ..., doc1[N], doc2[1]`.

use crate::models::{CandidateFile, Operation};
use crate::services::discovery::list_candidates;
use crate::services::pdf::{PageSelection, PdfEngine, PdfError};
use crate::services::placement::place_to_many;
use crate::services::routing::route_success;
use crate::services::validation::{ValidationError, validate_pdf};
use crate::services::{
    ProcessContext, ProcessError, ProcessOutcome, fail_sources, log_operation, log_performance,
};
use camino::{Utf8Path, Utf8PathBuf};
use std::time::Instant;

const KIND: &str = "MERGE";
const INVALID_KIND: &str = "MERGE_INVALID";

/// Merges the first two candidates of the intake folder.
///
/// Each run goes through the same fixed steps: discover, validate both files,
/// check page counts, compose, place, dispose of sources. The first failing
/// step ends the attempt and both sources go to the error folder. Nothing is
/// retried.
pub struct MergeOrchestrator<'a, E: PdfEngine + ?Sized> {
    ctx: ProcessContext<'a, E>,
}

impl<'a, E: PdfEngine + ?Sized> MergeOrchestrator<'a, E> {
    pub fn new(ctx: ProcessContext<'a, E>) -> Self {
        Self { ctx }
    }

    /// Output file name for a pair: `<stem1>-<stem2>.pdf`.
    pub fn output_name(first: &CandidateFile, second: &CandidateFile) -> String {
        format!("{}-{}.pdf", first.stem(), second.stem())
    }

    pub fn merge_first_available(&self) -> Result<ProcessOutcome, ProcessError> {
        let started = Instant::now();
        let dirs = self.ctx.dirs;

        let candidates = list_candidates(&dirs.main).map_err(ProcessError::Discovery)?;
        if candidates.len() < 2 {
            tracing::warn!("Not enough files to merge ({} found)", candidates.len());
            return Err(ProcessError::NotEnoughFiles(candidates.len()));
        }
        let (first, second) = (&candidates[0], &candidates[1]);
        let sources = [first.path.clone(), second.path.clone()];

        tracing::info!("Merging: {} + {}", first.name, second.name);

        let (bytes, pages) = match self.validate_pair(first, second) {
            Ok(checked) => checked,
            Err(e) => return Err(fail_sources(dirs, INVALID_KIND, &sources, e)),
        };

        let workdir = match tempfile::Builder::new().prefix(".blendpdf-merge").tempdir() {
            Ok(workdir) => workdir,
            Err(e) => return Err(fail_sources(dirs, KIND, &sources, PdfError::from(e).into())),
        };

        let output_name = Self::output_name(first, second);
        let fan_out = match self
            .compose(&first.path, &second.path, pages, workdir.path(), &output_name)
            .map_err(ProcessError::from)
            .and_then(|merged| {
                place_to_many(&merged, &output_name, &dirs.outputs, &dirs.error)
                    .map_err(ProcessError::from)
            }) {
            Ok(fan_out) => fan_out,
            // The work directory and any partial result are removed on drop
            Err(e) => return Err(fail_sources(dirs, KIND, &sources, e)),
        };

        if let Err(e) = workdir.close() {
            tracing::warn!("Failed to remove merge work directory: {}", e);
        }

        let mut warnings: Vec<String> = fan_out.warning().into_iter().collect();

        let disposal = route_success(&sources, &dirs.archive, self.ctx.archive_mode);
        let archive_files = if self.ctx.archive_mode && disposal.is_complete(sources.len()) {
            disposal.placed
        } else {
            Vec::new()
        };
        warnings.extend(disposal.warnings);

        let placed = fan_out.succeeded();
        let [first_path, second_path] = sources;
        let operation = Operation::merge(
            first_path,
            second_path,
            fan_out.placed,
            dirs.outputs.clone(),
            archive_files,
        );

        log_operation(KIND, &first.name, &second.name, "COMPLETED");
        log_performance(KIND, started.elapsed(), bytes);

        Ok(ProcessOutcome {
            description: format!(
                "Merged {} + {} -> {} ({} pages, {} output folder(s))",
                first.name,
                second.name,
                output_name,
                pages * 2,
                placed
            ),
            operation,
            warnings,
        })
    }

    /// Validate both files and require equal page counts.
    ///
    /// Returns the combined size in bytes and the per-file page count.
    fn validate_pair(
        &self,
        first: &CandidateFile,
        second: &CandidateFile,
    ) -> Result<(u64, usize), ProcessError> {
        let first_size = validate_pdf(self.ctx.engine, &first.path)?;
        let second_size = validate_pdf(self.ctx.engine, &second.path)?;

        let first_pages = self.page_count(first)?;
        let second_pages = self.page_count(second)?;

        if first_pages != second_pages {
            return Err(ProcessError::PageCountMismatch {
                first: first.name.clone(),
                first_pages,
                second: second.name.clone(),
                second_pages,
            });
        }

        tracing::debug!("Both files have {} page(s)", first_pages);
        Ok((first_size + second_size, first_pages))
    }

    fn page_count(&self, file: &CandidateFile) -> Result<usize, ProcessError> {
        self.ctx.engine.page_count(&file.path).map_err(|source| {
            ProcessError::Validation(ValidationError::Structure {
                path: file.path.clone(),
                source,
            })
        })
    }

    /// Build the merged document inside `workdir` and return its path.
    ///
    /// A single-page second file needs no reversal and is appended directly.
    /// Otherwise the second file is extracted in reverse page order and
    /// zip-interleaved with the first.
    fn compose(
        &self,
        first: &Utf8Path,
        second: &Utf8Path,
        second_pages: usize,
        workdir: &std::path::Path,
        output_name: &str,
    ) -> Result<Utf8PathBuf, PdfError> {
        let workdir = Utf8PathBuf::try_from(workdir.to_path_buf())
            .map_err(|e| PdfError::Io(e.into_io_error()))?;
        let merged = workdir.join(output_name);
        let engine = self.ctx.engine;

        if second_pages == 1 {
            tracing::debug!("Second file has one page, concatenating");
            engine.concatenate(&[first.to_path_buf(), second.to_path_buf()], &merged)?;
            return Ok(merged);
        }

        let selection: PageSelection = format!("{}-1", second_pages).parse()?;
        let reversed = workdir.join("reversed.pdf");

        tracing::debug!("Reversing second file with selection {}", selection);
        engine.extract_pages(second, &reversed, &selection)?;
        engine.zip_interleave(first, &reversed, &merged)?;

        Ok(merged)
    }
}
