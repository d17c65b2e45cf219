use std::path::Path;

use crate::encoder::EngineError;
use crate::error::ChapterSplitError;

/// Fragments of engine output that indicate an encrypted source.
const DRM_MARKERS: [&str; 4] = ["activation_bytes", "decrypt", "audible_key", "encrypted"];

/// Container kinds accepted as input.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// MPEG-4 audiobook.
    M4b,
    /// Audible container. Only readable when it carries no DRM.
    Aax,
}

impl ContainerKind {
    /// Classify a path by its extension, ignoring case.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "m4b" => Some(ContainerKind::M4b),
            "aax" => Some(ContainerKind::Aax),
            _ => None,
        }
    }

    /// Whether this kind is normally distributed with DRM.
    pub fn is_proprietary(self) -> bool {
        matches!(self, ContainerKind::Aax)
    }
}

/// Whether engine output mentions a decryption problem.
pub fn mentions_drm(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    DRM_MARKERS.iter().any(|marker| message.contains(marker))
}

/// Turn a failed metadata dump into the error reported to the caller.
///
/// Proprietary containers and failures mentioning decryption are reported
/// as DRM-protected; anything else is a plain probe failure.
pub fn classify_probe_failure(
    path: &Path,
    kind: ContainerKind,
    error: EngineError,
) -> ChapterSplitError {
    match error {
        EngineError::Spawn { program, source } => {
            ChapterSplitError::EngineUnavailable { program, source }
        }
        EngineError::Failed { message, .. } if kind.is_proprietary() || mentions_drm(&message) => {
            ChapterSplitError::UnsupportedSource {
                path: path.to_path_buf(),
                message,
            }
        }
        other => ChapterSplitError::MetadataProbe {
            path: path.to_path_buf(),
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io;
    use std::path::PathBuf;

    fn failed(message: &str) -> EngineError {
        EngineError::Failed {
            status: Some(1),
            message: message.to_owned(),
        }
    }

    #[test]
    fn detects_container_kind_case_insensitively() {
        assert_eq!(
            ContainerKind::from_path(Path::new("Book.M4B")),
            Some(ContainerKind::M4b)
        );
        assert_eq!(
            ContainerKind::from_path(Path::new("book.aax")),
            Some(ContainerKind::Aax)
        );
        assert_eq!(ContainerKind::from_path(Path::new("book.mp3")), None);
        assert_eq!(ContainerKind::from_path(Path::new("book")), None);
    }

    #[test]
    fn aax_failures_are_drm() {
        let err = classify_probe_failure(
            &PathBuf::from("book.aax"),
            ContainerKind::Aax,
            failed("moov atom not found"),
        );
        assert_eq!(err.kind(), ErrorKind::UnsupportedSource);
    }

    #[test]
    fn decryption_markers_are_drm_for_any_container() {
        let err = classify_probe_failure(
            &PathBuf::from("book.m4b"),
            ContainerKind::M4b,
            failed("[mov,mp4] Failed to Decrypt stream"),
        );
        assert_eq!(err.kind(), ErrorKind::UnsupportedSource);
    }

    #[test]
    fn other_m4b_failures_are_probe_errors() {
        let err = classify_probe_failure(
            &PathBuf::from("book.m4b"),
            ContainerKind::M4b,
            failed("Invalid data found when processing input"),
        );
        assert!(matches!(err, ChapterSplitError::MetadataProbe { .. }));
    }

    #[test]
    fn missing_engine_is_not_drm() {
        let err = classify_probe_failure(
            &PathBuf::from("book.aax"),
            ContainerKind::Aax,
            EngineError::Spawn {
                program: "ffmpeg".into(),
                source: io::Error::new(io::ErrorKind::NotFound, "not found"),
            },
        );
        assert!(matches!(err, ChapterSplitError::EngineUnavailable { .. }));
    }
}
