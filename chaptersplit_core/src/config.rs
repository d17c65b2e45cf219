use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::encoder::{FfmpegEncoder, DEFAULT_BITRATE, DEFAULT_FFMPEG};
use crate::error::ChapterSplitError;
use crate::export::archive_name;
use crate::source::ContainerKind;

/// Configuration for converting one audiobook.
#[derive(Clone, Debug)]
pub struct Config {
    /// Canonicalized path of the source audiobook.
    pub input_path: PathBuf,
    /// The input path as it was given, before symlinks were resolved.
    pub requested_input: PathBuf,
    /// Container kind derived from the extension of `requested_input`.
    pub container: ContainerKind,
    /// Canonicalized directory into which the output files will be written.
    pub output_dir: PathBuf,
    /// Program used as the decode/encode engine.
    pub ffmpeg: PathBuf,
    /// Target bitrate passed to the encoder, e.g. `128k`.
    pub bitrate: String,
    /// Whether existing output files may be replaced.
    pub overwrite: bool,
    /// Bundle all chapters into one zip archive instead of separate files.
    pub archive: bool,
    /// Title overrides keyed by chapter number.
    pub title_overrides: BTreeMap<u32, String>,
}

impl Config {
    /// Construct a new [`Config`] with default options, canonicalizing the
    /// provided paths.
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        input: P,
        output: Q,
    ) -> Result<Self, ChapterSplitError> {
        Self::builder(input, output).build()
    }

    /// Create a [`ConfigBuilder`] for the given input and output locations.
    pub fn builder<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> ConfigBuilder {
        ConfigBuilder {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            ffmpeg: PathBuf::from(DEFAULT_FFMPEG),
            bitrate: DEFAULT_BITRATE.to_owned(),
            overwrite: false,
            archive: false,
            title_overrides: BTreeMap::new(),
        }
    }

    /// Location of the zip archive: the requested input's stem with a
    /// `.zip` extension, inside the output directory.
    pub fn archive_path(&self) -> Result<PathBuf, ChapterSplitError> {
        Ok(self.output_dir.join(archive_name(&self.requested_input)?))
    }

    /// Engine configured with this config's program and bitrate.
    pub fn encoder(&self) -> FfmpegEncoder {
        FfmpegEncoder::new(&self.ffmpeg).with_bitrate(&self.bitrate)
    }
}

/// Builder for [`Config`].
#[derive(Clone, Debug)]
pub struct ConfigBuilder {
    input: PathBuf,
    output: PathBuf,
    ffmpeg: PathBuf,
    bitrate: String,
    overwrite: bool,
    archive: bool,
    title_overrides: BTreeMap<u32, String>,
}

impl ConfigBuilder {
    pub fn ffmpeg<P: Into<PathBuf>>(mut self, program: P) -> Self {
        self.ffmpeg = program.into();
        self
    }

    pub fn bitrate<S: Into<String>>(mut self, bitrate: S) -> Self {
        self.bitrate = bitrate.into();
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn archive(mut self, archive: bool) -> Self {
        self.archive = archive;
        self
    }

    /// Replace the title of chapter `number`. Later calls for the same
    /// chapter win.
    pub fn title_override<S: Into<String>>(mut self, number: u32, title: S) -> Self {
        self.title_overrides.insert(number, title.into());
        self
    }

    pub fn build(self) -> Result<Config, ChapterSplitError> {
        let container = ContainerKind::from_path(&self.input)
            .ok_or_else(|| ChapterSplitError::UnsupportedExtension(self.input.clone()))?;

        let input_path = fs::canonicalize(&self.input)?;
        let output_dir = fs::canonicalize(&self.output)?;
        if !output_dir.is_dir() {
            return Err(ChapterSplitError::MissingOutputDirectory(output_dir));
        }

        Ok(Config {
            input_path,
            requested_input: self.input,
            container,
            output_dir,
            ffmpeg: self.ffmpeg,
            bitrate: self.bitrate,
            overwrite: self.overwrite,
            archive: self.archive,
            title_overrides: self.title_overrides,
        })
    }
}
