use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Reason a single chapter section could not be turned into a [`Chapter`].
///
/// [`Chapter`]: crate::Chapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundaryError {
    /// The section never assigned `START=`.
    MissingStart,
    /// The section never assigned `END=`.
    MissingEnd,
    /// A boundary value was not a non-negative integer.
    InvalidNumber { field: &'static str, value: String },
    /// The scaled value does not fit in a millisecond counter.
    Overflow { field: &'static str },
    /// The section ends before it starts.
    EndBeforeStart { start_ms: u64, end_ms: u64 },
}

impl fmt::Display for BoundaryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryError::MissingStart => write!(f, "missing START"),
            BoundaryError::MissingEnd => write!(f, "missing END"),
            BoundaryError::InvalidNumber { field, value } => {
                write!(f, "{field} value '{value}' is not a non-negative integer")
            }
            BoundaryError::Overflow { field } => write!(f, "{field} value is too large"),
            BoundaryError::EndBeforeStart { start_ms, end_ms } => {
                write!(f, "end {end_ms}ms is before start {start_ms}ms")
            }
        }
    }
}

impl std::error::Error for BoundaryError {}

/// Coarse classification of a [`ChapterSplitError`], suitable for callers
/// that need to branch on the failure without matching every variant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NoChaptersFound,
    MalformedBoundary,
    UnsupportedSource,
    ExtractionFailure,
    InvalidInput,
    InvalidState,
    Io,
    Archive,
}

/// Errors that can occur while parsing chapters or converting them.
#[derive(Debug, Error)]
pub enum ChapterSplitError {
    /// The metadata contained no usable chapter section.
    #[error("no chapters found in the audiobook file")]
    NoChaptersFound,

    /// A chapter section had unusable boundaries.
    #[error("chapter section {section} is malformed: {reason}")]
    MalformedBoundary { section: usize, reason: BoundaryError },

    /// The source is DRM-protected or otherwise cannot be read by the engine.
    #[error("'{}' is DRM-protected, cannot convert: {message}", .path.display())]
    UnsupportedSource { path: PathBuf, message: String },

    /// The engine failed while producing a single chapter.
    #[error("failed to convert chapter {number}: {title}: {message}")]
    ExtractionFailure {
        number: u32,
        title: String,
        message: String,
    },

    /// The input file has an extension that is not a supported container.
    #[error("unsupported input file '{}': expected an .m4b or .aax file", .0.display())]
    UnsupportedExtension(PathBuf),

    /// A file name could not be derived from the input path.
    #[error("failed to derive a base name for the input file")]
    InvalidInputName,

    /// Chapters are not numbered 1..N in order.
    #[error("chapter numbering is out of order: expected {expected}, found {found}")]
    ChapterOrder { expected: u32, found: u32 },

    /// A title override referenced a chapter that does not exist.
    #[error("no chapter numbered {0}")]
    UnknownChapter(u32),

    /// The output directory disappeared after configuration.
    #[error("output directory '{}' does not exist", .0.display())]
    MissingOutputDirectory(PathBuf),

    /// An output file already exists and overwriting is disabled.
    #[error("refusing to overwrite existing file '{}'", .0.display())]
    OutputExists(PathBuf),

    /// The engine could not dump the container metadata.
    #[error("failed to read chapter metadata from '{}': {message}", .path.display())]
    MetadataProbe { path: PathBuf, message: String },

    /// The engine executable could not be started.
    #[error("failed to run '{program}': {source}")]
    EngineUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A session operation was called in a state that does not allow it.
    #[error("session is {state}; {operation} is not allowed")]
    InvalidState {
        state: &'static str,
        operation: &'static str,
    },

    /// Wrapper around IO errors encountered while reading or writing files.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapper around errors produced while writing the zip archive.
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

impl ChapterSplitError {
    /// Structured kind of this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChapterSplitError::NoChaptersFound => ErrorKind::NoChaptersFound,
            ChapterSplitError::MalformedBoundary { .. } => ErrorKind::MalformedBoundary,
            ChapterSplitError::UnsupportedSource { .. } => ErrorKind::UnsupportedSource,
            ChapterSplitError::ExtractionFailure { .. } => ErrorKind::ExtractionFailure,
            ChapterSplitError::UnsupportedExtension(_)
            | ChapterSplitError::InvalidInputName
            | ChapterSplitError::UnknownChapter(_)
            | ChapterSplitError::ChapterOrder { .. } => ErrorKind::InvalidInput,
            ChapterSplitError::InvalidState { .. } => ErrorKind::InvalidState,
            ChapterSplitError::MissingOutputDirectory(_)
            | ChapterSplitError::OutputExists(_)
            | ChapterSplitError::MetadataProbe { .. }
            | ChapterSplitError::EngineUnavailable { .. }
            | ChapterSplitError::Io(_) => ErrorKind::Io,
            ChapterSplitError::Zip(_) => ErrorKind::Archive,
        }
    }
}
