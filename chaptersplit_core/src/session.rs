//! Conversion session: load chapters, accept title edits, then drive the
//! engine through every chapter one at a time.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use tempfile::TempDir;

use crate::chapter::{Chapter, ConversionResult};
use crate::encoder::SegmentEncoder;
use crate::error::{ChapterSplitError, ErrorKind};
use crate::parser::{parse_metadata, RejectedSection};
use crate::plan::{SegmentRequest, OUTPUT_EXTENSION};
use crate::source::{classify_probe_failure, mentions_drm, ContainerKind};
use crate::validate::validate_chapters;

/// Where a [`Session`] is in its lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Ready,
    Converting,
    Completed,
    Failed,
}

impl SessionState {
    fn name(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Ready => "ready",
            SessionState::Converting => "converting",
            SessionState::Completed => "completed",
            SessionState::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The structured failure kept by a failed session until it is reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFailure {
    pub kind: ErrorKind,
    pub message: String,
}

/// Events emitted while a batch is converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Emitted once before the first chapter is extracted.
    Start { total: usize },
    /// Emitted after each chapter has been fully produced.
    Advance {
        completed: usize,
        total: usize,
        number: u32,
        title: String,
        size: u64,
    },
    /// Emitted once after the last chapter.
    Finish,
}

/// Receives [`ProgressEvent`]s from a running conversion.
pub trait ProgressReporter {
    fn report(&mut self, _event: ProgressEvent) {}
}

impl<F: FnMut(ProgressEvent)> ProgressReporter for F {
    fn report(&mut self, event: ProgressEvent) {
        self(event)
    }
}

/// One audiobook conversion against a single engine instance.
///
/// The engine is treated as a single slot: requests are issued strictly in
/// chapter order and each temporary artifact is removed before the next
/// request. Any failure parks the session in [`SessionState::Failed`] until
/// [`Session::reset`] is called.
pub struct Session<E> {
    encoder: E,
    state: SessionState,
    source: Option<PathBuf>,
    chapters: Vec<Chapter>,
    rejected: Vec<RejectedSection>,
    results: Vec<ConversionResult>,
    failure: Option<SessionFailure>,
}

impl<E: SegmentEncoder> Session<E> {
    pub fn new(encoder: E) -> Self {
        Self {
            encoder,
            state: SessionState::Idle,
            source: None,
            chapters: Vec::new(),
            rejected: Vec::new(),
            results: Vec::new(),
            failure: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    /// Chapter sections that were dropped while loading.
    pub fn rejected(&self) -> &[RejectedSection] {
        &self.rejected
    }

    /// Results of a completed conversion, in chapter order.
    pub fn results(&self) -> &[ConversionResult] {
        &self.results
    }

    pub fn failure(&self) -> Option<&SessionFailure> {
        self.failure.as_ref()
    }

    /// Dump and parse the chapter list of `source`, classifying the
    /// container by its extension.
    pub fn load(&mut self, source: &Path) -> Result<&[Chapter], ChapterSplitError> {
        self.require(SessionState::Idle, "load")?;
        match ContainerKind::from_path(source) {
            Some(kind) => self.load_as(source, kind),
            None => Err(self.fail(ChapterSplitError::UnsupportedExtension(
                source.to_path_buf(),
            ))),
        }
    }

    /// Dump and parse the chapter list of `source`, which is already known
    /// to be a `kind` container.
    pub fn load_as(
        &mut self,
        source: &Path,
        kind: ContainerKind,
    ) -> Result<&[Chapter], ChapterSplitError> {
        self.require(SessionState::Idle, "load")?;

        info!("reading chapters from '{}'", source.display());
        let metadata = match self.encoder.dump_metadata(source) {
            Ok(metadata) => metadata,
            Err(err) => return Err(self.fail(classify_probe_failure(source, kind, err))),
        };

        let parsed = parse_metadata(&metadata);
        if let Err(err) = validate_chapters(&parsed.chapters) {
            return Err(self.fail(err));
        }

        info!(
            "found {} chapter(s), dropped {} malformed section(s)",
            parsed.chapters.len(),
            parsed.rejected.len()
        );
        self.source = Some(source.to_path_buf());
        self.chapters = parsed.chapters;
        self.rejected = parsed.rejected;
        self.state = SessionState::Ready;
        Ok(&self.chapters)
    }

    /// Set the display title of chapter `number`. Only allowed before
    /// conversion starts.
    pub fn edit_title(
        &mut self,
        number: u32,
        title: impl Into<String>,
    ) -> Result<(), ChapterSplitError> {
        self.require(SessionState::Ready, "editing titles")?;
        let chapter = self
            .chapters
            .iter_mut()
            .find(|chapter| chapter.number() == number)
            .ok_or(ChapterSplitError::UnknownChapter(number))?;
        chapter.set_edited_title(Some(title.into()));
        Ok(())
    }

    /// Extract every chapter in order. Stops at the first failure and keeps
    /// no partial results.
    pub fn convert<P: ProgressReporter>(
        &mut self,
        mut progress: P,
    ) -> Result<&[ConversionResult], ChapterSplitError> {
        self.require(SessionState::Ready, "convert")?;
        self.state = SessionState::Converting;

        match self.convert_all(&mut progress) {
            Ok(results) => {
                self.results = results;
                self.state = SessionState::Completed;
                progress.report(ProgressEvent::Finish);
                Ok(&self.results)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Drop all chapters and results and return to [`SessionState::Idle`].
    pub fn reset(&mut self) {
        debug!("resetting session from {}", self.state);
        self.state = SessionState::Idle;
        self.source = None;
        self.chapters.clear();
        self.rejected.clear();
        self.results.clear();
        self.failure = None;
    }

    fn convert_all<P: ProgressReporter>(
        &mut self,
        progress: &mut P,
    ) -> Result<Vec<ConversionResult>, ChapterSplitError> {
        let source = self.source.clone().ok_or(ChapterSplitError::InvalidState {
            state: "ready",
            operation: "convert without a source",
        })?;
        let workspace = tempfile::Builder::new()
            .prefix("chaptersplit-")
            .tempdir()?;

        let total = self.chapters.len();
        progress.report(ProgressEvent::Start { total });

        let mut results = Vec::with_capacity(total);
        for chapter in &self.chapters {
            let request = SegmentRequest::for_chapter(chapter);
            let data = extract_one(&mut self.encoder, &source, &request, &workspace)?;
            info!(
                "chapter {} '{}' converted ({} bytes)",
                request.number,
                request.title,
                data.len()
            );

            let result = ConversionResult::new(chapter.clone(), data);
            progress.report(ProgressEvent::Advance {
                completed: results.len() + 1,
                total,
                number: request.number,
                title: request.title,
                size: result.size(),
            });
            results.push(result);
        }

        workspace.close()?;
        Ok(results)
    }

    fn require(
        &self,
        expected: SessionState,
        operation: &'static str,
    ) -> Result<(), ChapterSplitError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ChapterSplitError::InvalidState {
                state: self.state.name(),
                operation,
            })
        }
    }

    fn fail(&mut self, err: ChapterSplitError) -> ChapterSplitError {
        self.state = SessionState::Failed;
        self.results.clear();
        self.failure = Some(SessionFailure {
            kind: err.kind(),
            message: err.to_string(),
        });
        err
    }
}

fn extract_one<E: SegmentEncoder>(
    encoder: &mut E,
    source: &Path,
    request: &SegmentRequest,
    workspace: &TempDir,
) -> Result<Vec<u8>, ChapterSplitError> {
    let artifact = workspace
        .path()
        .join(format!("chapter_{}.{OUTPUT_EXTENSION}", request.number));
    debug!(
        "extracting chapter {} from {} for {}",
        request.number,
        request.start(),
        request.duration()
    );

    if let Err(err) = encoder.extract(source, request, &artifact) {
        // Leave nothing behind for the next request even on failure.
        let _ = fs::remove_file(&artifact);
        let mut message = err.to_string();
        if mentions_drm(&message) {
            message.push_str(" (this file may be DRM-protected)");
        }
        return Err(ChapterSplitError::ExtractionFailure {
            number: request.number,
            title: request.title.clone(),
            message,
        });
    }

    let data = fs::read(&artifact)?;
    fs::remove_file(&artifact)?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::EngineError;

    struct CannedEncoder {
        metadata: Result<String, String>,
    }

    impl SegmentEncoder for CannedEncoder {
        fn dump_metadata(&mut self, _source: &Path) -> Result<String, EngineError> {
            self.metadata.clone().map_err(|message| EngineError::Failed {
                status: Some(1),
                message,
            })
        }

        fn extract(
            &mut self,
            _source: &Path,
            request: &SegmentRequest,
            output: &Path,
        ) -> Result<(), EngineError> {
            fs::write(output, request.title.as_bytes()).map_err(|source| EngineError::Spawn {
                program: "canned".into(),
                source,
            })
        }
    }

    fn session(metadata: &str) -> Session<CannedEncoder> {
        Session::new(CannedEncoder {
            metadata: Ok(metadata.to_owned()),
        })
    }

    const TWO_CHAPTERS: &str = "[CHAPTER]\nSTART=0\nEND=1000\ntitle=One\n[CHAPTER]\nSTART=1000\nEND=2000\ntitle=Two\n";

    #[test]
    fn edits_are_only_allowed_when_ready() {
        let mut session = session(TWO_CHAPTERS);
        assert!(matches!(
            session.edit_title(1, "Early"),
            Err(ChapterSplitError::InvalidState { .. })
        ));

        session.load(Path::new("book.m4b")).unwrap();
        session.edit_title(2, "Renamed").unwrap();
        assert_eq!(session.chapters()[1].display_title(), "Renamed");
        assert!(matches!(
            session.edit_title(3, "Nope"),
            Err(ChapterSplitError::UnknownChapter(3))
        ));

        session.convert(|_: ProgressEvent| {}).unwrap();
        assert_eq!(session.state(), SessionState::Completed);
        assert!(matches!(
            session.edit_title(1, "Late"),
            Err(ChapterSplitError::InvalidState { .. })
        ));
    }

    #[test]
    fn empty_metadata_fails_and_requires_reset() {
        let mut session = session(";FFMETADATA1\n");
        let err = session.load(Path::new("book.m4b")).unwrap_err();
        assert!(matches!(err, ChapterSplitError::NoChaptersFound));
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(
            session.failure().map(|failure| failure.kind),
            Some(ErrorKind::NoChaptersFound)
        );

        assert!(matches!(
            session.load(Path::new("book.m4b")),
            Err(ChapterSplitError::InvalidState { .. })
        ));
        session.reset();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.failure().is_none());
    }

    #[test]
    fn aax_probe_failure_is_reported_as_drm() {
        let mut session = Session::new(CannedEncoder {
            metadata: Err("activation_bytes option is missing".into()),
        });
        let err = session.load(Path::new("book.aax")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedSource);
    }

    #[test]
    fn progress_is_reported_after_each_chapter() {
        let mut session = session(TWO_CHAPTERS);
        session.load(Path::new("book.m4b")).unwrap();

        let mut events = Vec::new();
        let results = session.convert(|event: ProgressEvent| events.push(event)).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].data, b"One");
        assert_eq!(results[1].size(), 3);

        assert_eq!(events.first(), Some(&ProgressEvent::Start { total: 2 }));
        assert_eq!(events.last(), Some(&ProgressEvent::Finish));
        assert_eq!(
            events[2],
            ProgressEvent::Advance {
                completed: 2,
                total: 2,
                number: 2,
                title: "Two".into(),
                size: 3,
            }
        );
    }
}
