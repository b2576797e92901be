//! Conflict-safe file placement.
//!
//! Nothing here ever overwrites an existing file. When `dir/name.pdf` is
//! taken the next free name among `name_1.pdf`, `name_2.pdf`, ... is used,
//! giving up after [`MAX_RENAME_ATTEMPTS`] tries.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{self, File, OpenOptions};
use std::io;
use thiserror::Error;

/// Upper bound on `_N` suffixes tried before a placement is abandoned.
pub const MAX_RENAME_ATTEMPTS: u32 = 1000;

/// Errors that can occur while placing a file.
#[derive(Error, Debug)]
pub enum PlacementError {
    #[error("Source file does not exist: {0}")]
    SourceMissing(Utf8PathBuf),

    #[error("Failed to create destination directory {dir}: {source}")]
    CreateDir {
        dir: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Too many duplicate files named {name} in {dir}")]
    NameSpaceExhausted { dir: Utf8PathBuf, name: String },

    #[error("Failed to copy {from} to {to}: {source}")]
    Copy {
        from: Utf8PathBuf,
        to: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to move {from} to {to}: rename failed ({rename}), copy fallback failed ({copy})")]
    Move {
        from: Utf8PathBuf,
        to: Utf8PathBuf,
        rename: io::Error,
        copy: io::Error,
    },

    #[error("All output destinations failed: {}", .0.join("; "))]
    AllDestinationsFailed(Vec<String>),
}

/// First path at or next to `desired` that does not exist yet.
///
/// The parent directory is created when missing.
pub fn resolve_free_path(desired: &Utf8Path) -> Result<Utf8PathBuf, PlacementError> {
    let dir = desired.parent().unwrap_or(Utf8Path::new("."));
    fs::create_dir_all(dir).map_err(|source| PlacementError::CreateDir {
        dir: dir.to_path_buf(),
        source,
    })?;

    if !desired.exists() {
        return Ok(desired.to_path_buf());
    }

    let stem = desired.file_stem().unwrap_or_default();
    let extension = desired.extension().map(|ext| format!(".{}", ext)).unwrap_or_default();

    for counter in 1..=MAX_RENAME_ATTEMPTS {
        let candidate = dir.join(format!("{}_{}{}", stem, counter, extension));
        if !candidate.exists() {
            tracing::debug!(
                "Destination exists, using: {}",
                candidate.file_name().unwrap_or_default()
            );
            return Ok(candidate);
        }
    }

    Err(PlacementError::NameSpaceExhausted {
        dir: dir.to_path_buf(),
        name: desired.file_name().unwrap_or_default().to_string(),
    })
}

/// Move `src` to `desired` (or the next free name beside it).
///
/// An atomic rename is tried first. When that fails, e.g. across devices, the
/// bytes are copied and the source deleted; a failed deletion after a good
/// copy is only a warning.
pub fn move_file(src: &Utf8Path, desired: &Utf8Path) -> Result<Utf8PathBuf, PlacementError> {
    if !src.exists() {
        return Err(PlacementError::SourceMissing(src.to_path_buf()));
    }

    let dest = resolve_free_path(desired)?;

    match fs::rename(src, &dest) {
        Ok(()) => {}
        Err(rename) => {
            tracing::debug!("Rename {} -> {} failed ({}), copying instead", src, dest, rename);

            if let Err(copy) = copy_bytes(src, &dest) {
                return Err(PlacementError::Move {
                    from: src.to_path_buf(),
                    to: dest,
                    rename,
                    copy,
                });
            }

            if let Err(e) = fs::remove_file(src) {
                tracing::warn!("Original file not deleted: {}: {}", src, e);
            }
        }
    }

    tracing::debug!("Moved {} -> {}", src, dest);
    Ok(dest)
}

/// Copy `src` to `desired` (or the next free name beside it).
pub fn copy_file(src: &Utf8Path, desired: &Utf8Path) -> Result<Utf8PathBuf, PlacementError> {
    if !src.exists() {
        return Err(PlacementError::SourceMissing(src.to_path_buf()));
    }

    let dest = resolve_free_path(desired)?;

    copy_bytes(src, &dest).map_err(|source| PlacementError::Copy {
        from: src.to_path_buf(),
        to: dest.clone(),
        source,
    })?;

    tracing::debug!("Copied {} -> {}", src, dest);
    Ok(dest)
}

/// Move `src` into `dest_dir`, keeping its file name when it is free.
pub fn place(src: &Utf8Path, dest_dir: &Utf8Path) -> Result<Utf8PathBuf, PlacementError> {
    let name = src
        .file_name()
        .ok_or_else(|| PlacementError::SourceMissing(src.to_path_buf()))?;
    move_file(src, &dest_dir.join(name))
}

/// Write `dest` from `src` without ever replacing an existing file.
/// A partially written destination is removed.
fn copy_bytes(src: &Utf8Path, dest: &Utf8Path) -> io::Result<()> {
    let mut reader = File::open(src)?;
    let mut writer = OpenOptions::new().write(true).create_new(true).open(dest)?;

    let result = io::copy(&mut reader, &mut writer).and_then(|_| writer.sync_all());
    if let Err(e) = result {
        drop(writer);
        let _ = fs::remove_file(dest);
        return Err(e);
    }

    Ok(())
}

/// Outcome of a fan-out placement that did not fail outright.
///
/// `placed` has one slot per requested destination, in request order; a slot
/// is `None` when that destination failed and its reason is in `failures`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanOut {
    pub placed: Vec<Option<Utf8PathBuf>>,
    pub failures: Vec<String>,
}

impl FanOut {
    pub fn succeeded(&self) -> usize {
        self.placed.iter().flatten().count()
    }

    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Aggregated warning describing the failed destinations.
    pub fn warning(&self) -> Option<String> {
        if self.failures.is_empty() {
            None
        } else {
            Some(format!(
                "{} of {} output destination(s) failed: {}",
                self.failures.len(),
                self.placed.len(),
                self.failures.join("; ")
            ))
        }
    }
}

/// Copy `src` as `file_name` into every directory of `dest_dirs`.
///
/// Each destination is attempted independently. When every destination fails
/// the call fails with all reasons and the caller routes its sources to the
/// error folder. On partial success `src` is also copied into `error_dir` as a
/// safety net (best effort, only logged on failure) and the caller gets the
/// partial result. The source itself is left in place.
pub fn place_to_many(
    src: &Utf8Path,
    file_name: &str,
    dest_dirs: &[Utf8PathBuf],
    error_dir: &Utf8Path,
) -> Result<FanOut, PlacementError> {
    let mut fan_out = FanOut::default();

    for dir in dest_dirs {
        match copy_file(src, &dir.join(file_name)) {
            Ok(actual) => fan_out.placed.push(Some(actual)),
            Err(e) => {
                tracing::warn!("Output destination failed: {}: {}", dir, e);
                fan_out.failures.push(format!("{}: {}", dir, e));
                fan_out.placed.push(None);
            }
        }
    }

    if fan_out.succeeded() == 0 && !dest_dirs.is_empty() {
        return Err(PlacementError::AllDestinationsFailed(fan_out.failures));
    }

    if fan_out.is_partial() {
        match copy_file(src, &error_dir.join(file_name)) {
            Ok(copy) => tracing::info!("Safety copy written to {}", copy),
            Err(e) => tracing::warn!("Failed to copy to error folder: {}", e),
        }
    }

    Ok(fan_out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn temp_utf8() -> (TempDir, Utf8PathBuf) {
        let temp = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();
        (temp, path)
    }

    #[test]
    fn test_free_path_when_absent() {
        let (_temp, dir) = temp_utf8();
        let desired = dir.join("scan.pdf");
        assert_eq!(resolve_free_path(&desired).unwrap(), desired);
    }

    #[test]
    fn test_free_path_numbering() {
        let (_temp, dir) = temp_utf8();
        fs::write(dir.join("scan.pdf"), b"0").unwrap();
        fs::write(dir.join("scan_1.pdf"), b"1").unwrap();

        let resolved = resolve_free_path(&dir.join("scan.pdf")).unwrap();
        assert_eq!(resolved, dir.join("scan_2.pdf"));
    }

    #[test]
    fn test_free_path_creates_parent() {
        let (_temp, dir) = temp_utf8();
        let desired = dir.join("nested/deeper/scan.pdf");

        resolve_free_path(&desired).unwrap();
        assert!(dir.join("nested/deeper").is_dir());
    }

    #[test]
    fn test_free_path_exhausted() {
        let (_temp, dir) = temp_utf8();
        fs::write(dir.join("scan.pdf"), b"").unwrap();
        for i in 1..=MAX_RENAME_ATTEMPTS {
            fs::write(dir.join(format!("scan_{}.pdf", i)), b"").unwrap();
        }

        let result = resolve_free_path(&dir.join("scan.pdf"));
        assert!(matches!(result, Err(PlacementError::NameSpaceExhausted { .. })));
    }

    #[test]
    fn test_move_file() {
        let (_temp, dir) = temp_utf8();
        let src = dir.join("scan.pdf");
        fs::write(&src, b"payload").unwrap();

        let dest = move_file(&src, &dir.join("out/scan.pdf")).unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(&dest).unwrap(), b"payload");
    }

    #[test]
    fn test_move_missing_source() {
        let (_temp, dir) = temp_utf8();
        let result = move_file(&dir.join("ghost.pdf"), &dir.join("out/ghost.pdf"));
        assert!(matches!(result, Err(PlacementError::SourceMissing(_))));
    }

    #[test]
    fn test_copy_never_overwrites() {
        let (_temp, dir) = temp_utf8();
        let src = dir.join("scan.pdf");
        fs::write(&src, b"new").unwrap();
        fs::create_dir(dir.join("out")).unwrap();
        fs::write(dir.join("out/scan.pdf"), b"old").unwrap();

        let dest = copy_file(&src, &dir.join("out/scan.pdf")).unwrap();

        assert_eq!(dest, dir.join("out/scan_1.pdf"));
        assert_eq!(fs::read(dir.join("out/scan.pdf")).unwrap(), b"old");
        assert_eq!(fs::read(&dest).unwrap(), b"new");
        assert!(src.exists());
    }

    #[test]
    fn test_place_keeps_name() {
        let (_temp, dir) = temp_utf8();
        let src = dir.join("scan.pdf");
        fs::write(&src, b"x").unwrap();

        let dest = place(&src, &dir.join("archive")).unwrap();
        assert_eq!(dest, dir.join("archive/scan.pdf"));
    }

    #[test]
    fn test_place_to_many_all_succeed() {
        let (_temp, dir) = temp_utf8();
        let src = dir.join("scan.pdf");
        fs::write(&src, b"x").unwrap();
        let outputs = vec![dir.join("a"), dir.join("b")];

        let fan_out = place_to_many(&src, "scan.pdf", &outputs, &dir.join("error")).unwrap();

        assert_eq!(fan_out.succeeded(), 2);
        assert!(fan_out.warning().is_none());
        assert!(src.exists(), "fan-out copies, the caller disposes of the source");
        assert!(!dir.join("error").exists());
    }

    #[test]
    fn test_place_to_many_partial() {
        let (_temp, dir) = temp_utf8();
        let src = dir.join("scan.pdf");
        fs::write(&src, b"x").unwrap();
        // A regular file where a directory is expected makes that destination unusable
        fs::write(dir.join("blocked"), b"").unwrap();
        let outputs = vec![dir.join("blocked/out"), dir.join("good")];

        let fan_out = place_to_many(&src, "scan.pdf", &outputs, &dir.join("error")).unwrap();

        assert_eq!(fan_out.placed[0], None);
        assert_eq!(fan_out.placed[1], Some(dir.join("good/scan.pdf")));
        assert!(fan_out.warning().unwrap().contains("1 of 2"));
        assert!(dir.join("error/scan.pdf").exists(), "safety copy expected");
    }

    #[test]
    fn test_place_to_many_all_fail() {
        let (_temp, dir) = temp_utf8();
        let src = dir.join("scan.pdf");
        fs::write(&src, b"x").unwrap();
        fs::write(dir.join("blocked"), b"").unwrap();
        let outputs = vec![dir.join("blocked/a"), dir.join("blocked/b")];

        let result = place_to_many(&src, "scan.pdf", &outputs, &dir.join("error"));

        match result {
            Err(PlacementError::AllDestinationsFailed(reasons)) => assert_eq!(reasons.len(), 2),
            other => panic!("Expected AllDestinationsFailed, got: {:?}", other),
        }
        assert!(!dir.join("error").exists(), "sources are routed by the caller");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_repeated_copies_get_distinct_names(count in 1usize..20) {
            let (_temp, dir) = temp_utf8();
            let src = dir.join("scan.pdf");
            fs::write(&src, b"x").unwrap();

            let mut placed = Vec::new();
            for _ in 0..count {
                placed.push(copy_file(&src, &dir.join("out/scan.pdf")).unwrap());
            }

            let mut expected = vec![dir.join("out/scan.pdf")];
            for i in 1..count {
                expected.push(dir.join(format!("out/scan_{}.pdf", i)));
            }
            prop_assert_eq!(placed, expected);
        }
    }
}
