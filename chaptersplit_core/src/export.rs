use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::chapter::ConversionResult;
use crate::error::ChapterSplitError;
use crate::plan::output_file_name;

const ARCHIVE_COMPRESSION_LEVEL: i64 = 6;

/// File name used for a converted chapter, inside the output directory or
/// the archive.
pub fn result_file_name(result: &ConversionResult) -> String {
    output_file_name(result.chapter.number(), result.chapter.display_title())
}

/// `<input stem>.zip`.
pub fn archive_name(input: &Path) -> Result<String, ChapterSplitError> {
    let stem = input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .ok_or(ChapterSplitError::InvalidInputName)?;
    Ok(format!("{stem}.zip"))
}

/// Fail if `path` exists and may not be replaced.
pub fn ensure_writable(path: &Path, overwrite: bool) -> Result<(), ChapterSplitError> {
    if !overwrite && path.exists() {
        return Err(ChapterSplitError::OutputExists(path.to_path_buf()));
    }
    Ok(())
}

/// Write one file per result into `output_dir`.
pub fn write_chapter_files(
    results: &[ConversionResult],
    output_dir: &Path,
    overwrite: bool,
) -> Result<Vec<PathBuf>, ChapterSplitError> {
    if !output_dir.is_dir() {
        return Err(ChapterSplitError::MissingOutputDirectory(
            output_dir.to_path_buf(),
        ));
    }

    let paths: Vec<PathBuf> = results
        .iter()
        .map(|result| output_dir.join(result_file_name(result)))
        .collect();
    for path in &paths {
        ensure_writable(path, overwrite)?;
    }

    for (result, path) in results.iter().zip(&paths) {
        fs::write(path, &result.data)?;
        info!("wrote '{}' ({} bytes)", path.display(), result.size());
    }

    Ok(paths)
}

/// Bundle all results into a single zip archive at `path`.
pub fn write_archive(
    results: &[ConversionResult],
    path: &Path,
    overwrite: bool,
) -> Result<PathBuf, ChapterSplitError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        if !parent.is_dir() {
            return Err(ChapterSplitError::MissingOutputDirectory(
                parent.to_path_buf(),
            ));
        }
    }
    ensure_writable(path, overwrite)?;

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(ARCHIVE_COMPRESSION_LEVEL));

    let mut writer = ZipWriter::new(File::create(path)?);
    for result in results {
        writer.start_file(result_file_name(result), options)?;
        writer.write_all(&result.data)?;
    }
    writer.finish()?;

    info!(
        "wrote archive '{}' with {} chapter(s)",
        path.display(),
        results.len()
    );
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chapter::Chapter;
    use tempfile::tempdir;

    fn result(number: u32, title: &str, data: &[u8]) -> ConversionResult {
        let start = u64::from(number) * 1_000;
        let chapter = Chapter::new(number, title, start, start + 1_000).unwrap();
        ConversionResult::new(chapter, data.to_vec())
    }

    #[test]
    fn archive_is_named_after_input() {
        assert_eq!(
            archive_name(Path::new("/books/My Book.m4b")).unwrap(),
            "My Book.zip"
        );
        assert!(archive_name(Path::new("/")).is_err());
    }

    #[test]
    fn writes_one_file_per_chapter() {
        let dir = tempdir().unwrap();
        let results = [result(1, "Start", b"one"), result(2, "End: Part/2", b"two")];

        let paths = write_chapter_files(&results, dir.path(), false).unwrap();
        assert_eq!(paths[0], dir.path().join("01 - Start.mp3"));
        assert_eq!(paths[1], dir.path().join("02 - End Part2.mp3"));
        assert_eq!(fs::read(&paths[1]).unwrap(), b"two");
    }

    #[test]
    fn refuses_to_overwrite_without_permission() {
        let dir = tempdir().unwrap();
        let results = [result(1, "Start", b"new")];
        fs::write(dir.path().join("01 - Start.mp3"), b"old").unwrap();

        let err = write_chapter_files(&results, dir.path(), false).unwrap_err();
        assert!(matches!(err, ChapterSplitError::OutputExists(_)));

        write_chapter_files(&results, dir.path(), true).unwrap();
        assert_eq!(fs::read(dir.path().join("01 - Start.mp3")).unwrap(), b"new");
    }

    #[test]
    fn edited_titles_name_the_files() {
        let dir = tempdir().unwrap();
        let mut edited = result(1, "Parsed", b"x");
        edited.chapter.set_edited_title(Some("Edited".into()));

        let paths = write_chapter_files(&[edited], dir.path(), false).unwrap();
        assert_eq!(paths[0], dir.path().join("01 - Edited.mp3"));
    }
}
