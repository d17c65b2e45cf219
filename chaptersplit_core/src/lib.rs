//! Chapter-aware splitting of M4B audiobooks.
//!
//! The container's `ffmetadata` dump is parsed into a validated chapter
//! list, each chapter becomes a [`SegmentRequest`], and an external engine
//! encodes the requests one at a time. The results are written either as
//! separate files or as a single zip archive.

mod chapter;
mod config;
pub mod encoder;
mod error;
pub mod export;
mod parser;
mod plan;
mod session;
pub mod source;
mod timebase;
mod timestamp;
mod validate;

use std::path::PathBuf;

use log::info;

pub use chapter::{fallback_title, Chapter, ConversionResult};
pub use config::{Config, ConfigBuilder};
pub use encoder::{EngineError, FfmpegEncoder, SegmentEncoder};
pub use error::{BoundaryError, ChapterSplitError, ErrorKind};
pub use parser::{parse_chapters, parse_metadata, ChapterParser, ParsedMetadata, RejectedSection};
pub use plan::{build_plan, output_file_name, sanitize_file_name, SegmentRequest, OUTPUT_EXTENSION};
pub use session::{ProgressEvent, ProgressReporter, Session, SessionFailure, SessionState};
pub use source::ContainerKind;
pub use timebase::TimeBase;
pub use timestamp::{format_duration, format_timestamp};
pub use validate::{tiling_issues, validate_chapters, TilingIssue};

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of chapters converted.
    pub chapters: usize,
    /// Total encoded bytes across all chapters.
    pub bytes: u64,
    /// Files written: one per chapter, or the single archive.
    pub outputs: Vec<PathBuf>,
    /// Chapter sections dropped from the metadata because of bad boundaries.
    pub skipped: Vec<RejectedSection>,
}

/// Read the chapter list and return the extraction plan without encoding
/// anything.
pub fn plan_segments(config: &Config) -> Result<Vec<SegmentRequest>, ChapterSplitError> {
    let mut session = Session::new(config.encoder());
    prepare(&mut session, config)?;
    Ok(build_plan(session.chapters()))
}

/// Convert every chapter using the configured `ffmpeg`.
pub fn run(config: Config) -> Result<RunSummary, ChapterSplitError> {
    run_with_progress(config, |_: ProgressEvent| {})
}

/// Like [`run`], reporting progress after each chapter.
pub fn run_with_progress<P: ProgressReporter>(
    config: Config,
    progress: P,
) -> Result<RunSummary, ChapterSplitError> {
    let encoder = config.encoder();
    run_with_encoder(&config, encoder, progress)
}

/// Like [`run_with_progress`] with a caller-supplied engine.
pub fn run_with_encoder<E: SegmentEncoder, P: ProgressReporter>(
    config: &Config,
    encoder: E,
    progress: P,
) -> Result<RunSummary, ChapterSplitError> {
    let mut session = Session::new(encoder);
    prepare(&mut session, config)?;

    // Collisions are checked up front so a long batch is not thrown away at
    // the end.
    for target in output_targets(config, session.chapters())? {
        export::ensure_writable(&target, config.overwrite)?;
    }

    let results = session.convert(progress)?;
    let bytes = results.iter().map(ConversionResult::size).sum();

    let outputs = if config.archive {
        let path = config.archive_path()?;
        vec![export::write_archive(results, &path, config.overwrite)?]
    } else {
        export::write_chapter_files(results, &config.output_dir, config.overwrite)?
    };

    let chapters = results.len();
    info!(
        "converted {chapters} chapter(s) from '{}'",
        config.input_path.display()
    );

    Ok(RunSummary {
        chapters,
        bytes,
        outputs,
        skipped: session.rejected().to_vec(),
    })
}

fn prepare<E: SegmentEncoder>(
    session: &mut Session<E>,
    config: &Config,
) -> Result<(), ChapterSplitError> {
    session.load_as(&config.input_path, config.container)?;
    for (number, title) in &config.title_overrides {
        session.edit_title(*number, title.clone())?;
    }
    Ok(())
}

fn output_targets(config: &Config, chapters: &[Chapter]) -> Result<Vec<PathBuf>, ChapterSplitError> {
    if config.archive {
        return Ok(vec![config.archive_path()?]);
    }
    Ok(chapters
        .iter()
        .map(|chapter| {
            config
                .output_dir
                .join(output_file_name(chapter.number(), chapter.display_title()))
        })
        .collect())
}
