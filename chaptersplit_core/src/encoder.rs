//! The external decode/encode engine.
//!
//! Everything that touches audio samples is delegated to an engine behind
//! the [`SegmentEncoder`] trait. [`FfmpegEncoder`] drives an `ffmpeg`
//! executable; tests substitute their own implementation.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use log::debug;
use thiserror::Error;

use crate::plan::SegmentRequest;

pub const DEFAULT_FFMPEG: &str = "ffmpeg";
pub const DEFAULT_CODEC: &str = "libmp3lame";
pub const DEFAULT_BITRATE: &str = "128k";

/// Failure reported by an engine invocation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine could not be started at all.
    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The engine ran and reported failure.
    #[error("{message}")]
    Failed {
        status: Option<i32>,
        message: String,
    },
}

/// A single-slot engine that can dump container metadata and produce one
/// encoded chapter at a time.
///
/// Calls are never issued concurrently. Each `extract` call must have
/// finished writing `output` before it returns.
pub trait SegmentEncoder {
    /// Return the container's metadata in `ffmetadata` text form.
    fn dump_metadata(&mut self, source: &Path) -> Result<String, EngineError>;

    /// Encode the span described by `request` from `source` into `output`.
    fn extract(
        &mut self,
        source: &Path,
        request: &SegmentRequest,
        output: &Path,
    ) -> Result<(), EngineError>;
}

impl<E: SegmentEncoder + ?Sized> SegmentEncoder for &mut E {
    fn dump_metadata(&mut self, source: &Path) -> Result<String, EngineError> {
        (**self).dump_metadata(source)
    }

    fn extract(
        &mut self,
        source: &Path,
        request: &SegmentRequest,
        output: &Path,
    ) -> Result<(), EngineError> {
        (**self).extract(source, request, output)
    }
}

/// [`SegmentEncoder`] backed by the `ffmpeg` command line tool.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    program: PathBuf,
    codec: String,
    bitrate: String,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_FFMPEG)
    }
}

impl FfmpegEncoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            codec: DEFAULT_CODEC.to_owned(),
            bitrate: DEFAULT_BITRATE.to_owned(),
        }
    }

    pub fn with_bitrate(mut self, bitrate: impl Into<String>) -> Self {
        self.bitrate = bitrate.into();
        self
    }

    /// Arguments that print the container metadata to stdout.
    pub fn metadata_args(&self, source: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-i"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(source.into());
        args.extend(["-f", "ffmetadata", "pipe:1"].map(OsString::from));
        args
    }

    /// Arguments that encode one chapter into `output`.
    ///
    /// `-ss` follows `-i` so the engine seeks by decoding, which keeps chapter
    /// boundaries sample accurate.
    pub fn extraction_args(
        &self,
        source: &Path,
        request: &SegmentRequest,
        output: &Path,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-y", "-i"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(source.into());
        args.extend(
            [
                "-ss".to_owned(),
                request.start(),
                "-t".to_owned(),
                request.duration(),
                "-vn".to_owned(),
                "-acodec".to_owned(),
                self.codec.clone(),
                "-b:a".to_owned(),
                self.bitrate.clone(),
                "-metadata".to_owned(),
                format!("title={}", request.title),
                "-metadata".to_owned(),
                format!("track={}", request.number),
            ]
            .map(OsString::from),
        );
        args.push(output.into());
        args
    }

    fn execute(&self, args: Vec<OsString>) -> Result<Output, EngineError> {
        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!("running {:?}", command);

        let output = command.output().map_err(|source| EngineError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;

        if !output.status.success() {
            return Err(EngineError::Failed {
                status: output.status.code(),
                message: failure_message(&output),
            });
        }

        Ok(output)
    }
}

impl SegmentEncoder for FfmpegEncoder {
    fn dump_metadata(&mut self, source: &Path) -> Result<String, EngineError> {
        let output = self.execute(self.metadata_args(source))?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn extract(
        &mut self,
        source: &Path,
        request: &SegmentRequest,
        output: &Path,
    ) -> Result<(), EngineError> {
        self.execute(self.extraction_args(source, request, output))?;
        Ok(())
    }
}

/// The last non-empty stderr line is where ffmpeg puts the actual error.
fn failure_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| format!("exited with {}", output.status))
}
