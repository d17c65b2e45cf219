//! Line-oriented parser for `ffmetadata` dumps.
//!
//! The dump is read one line at a time by a two-state machine. Outside a
//! chapter only `TIMEBASE` declarations matter; inside a chapter the
//! `START`, `END` and `title` keys fill a single pending record, which is
//! flushed when the next section begins or the input ends.

use log::{debug, warn};

use crate::chapter::{fallback_title, Chapter};
use crate::error::{BoundaryError, ChapterSplitError};
use crate::timebase::TimeBase;
use crate::validate::validate_chapters;

const CHAPTER_MARKER: &str = "[CHAPTER]";
const START_KEY: &str = "START=";
const END_KEY: &str = "END=";
const TITLE_KEY: &str = "title=";

/// A chapter section that was dropped while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedSection {
    /// 1-based index of the `[CHAPTER]` section in the source text.
    pub section: usize,
    pub reason: BoundaryError,
}

impl RejectedSection {
    pub fn into_error(self) -> ChapterSplitError {
        ChapterSplitError::MalformedBoundary {
            section: self.section,
            reason: self.reason,
        }
    }
}

/// Everything the parser learned from one metadata dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMetadata {
    /// Accepted chapters, numbered 1..N in source order.
    pub chapters: Vec<Chapter>,
    /// Sections that were dropped, in source order.
    pub rejected: Vec<RejectedSection>,
    /// The time base active when the input ended.
    pub time_base: TimeBase,
}

/// Parse a metadata dump and require at least one chapter.
pub fn parse_chapters(metadata: &str) -> Result<Vec<Chapter>, ChapterSplitError> {
    let parsed = parse_metadata(metadata);
    validate_chapters(&parsed.chapters)?;
    Ok(parsed.chapters)
}

/// Parse a metadata dump without validating the result.
pub fn parse_metadata(metadata: &str) -> ParsedMetadata {
    let mut parser = ChapterParser::new();
    for line in metadata.lines() {
        parser.feed_line(line);
    }
    parser.finish()
}

#[derive(Debug, Default)]
struct PendingChapter {
    section: usize,
    start_ms: Option<u64>,
    end_ms: Option<u64>,
    title: Option<String>,
    error: Option<BoundaryError>,
}

impl PendingChapter {
    fn new(section: usize) -> Self {
        Self {
            section,
            ..Self::default()
        }
    }

    fn set_boundary(&mut self, field: &'static str, value: &str, time_base: TimeBase) {
        let scaled = parse_raw(field, value).and_then(|raw| time_base.to_millis(raw, field));
        match scaled {
            Ok(ms) if field == "START" => self.start_ms = Some(ms),
            Ok(ms) => self.end_ms = Some(ms),
            Err(err) => {
                self.error.get_or_insert(err);
            }
        }
    }

    fn into_chapter(self, number: u32) -> Result<Chapter, BoundaryError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let start_ms = self.start_ms.ok_or(BoundaryError::MissingStart)?;
        let end_ms = self.end_ms.ok_or(BoundaryError::MissingEnd)?;
        let title = self
            .title
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| fallback_title(number));
        Chapter::new(number, title, start_ms, end_ms)
    }
}

#[derive(Debug)]
enum State {
    OutsideChapter,
    InsideChapter(PendingChapter),
}

/// Incremental chapter parser. Each instance owns all of its state, so
/// separate parses never influence each other.
#[derive(Debug)]
pub struct ChapterParser {
    state: State,
    time_base: TimeBase,
    sections_seen: usize,
    chapters: Vec<Chapter>,
    rejected: Vec<RejectedSection>,
}

impl Default for ChapterParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ChapterParser {
    pub fn new() -> Self {
        Self {
            state: State::OutsideChapter,
            time_base: TimeBase::default(),
            sections_seen: 0,
            chapters: Vec::new(),
            rejected: Vec::new(),
        }
    }

    /// Consume one line of the dump.
    pub fn feed_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            return;
        }

        if line.starts_with("TIMEBASE=") {
            match TimeBase::parse_declaration(line) {
                Some(time_base) => {
                    debug!("time base {time_base} (x{})", time_base.multiplier());
                    self.time_base = time_base;
                }
                None => debug!("ignoring malformed declaration '{line}'"),
            }
            return;
        }

        if line == CHAPTER_MARKER {
            self.flush();
            self.sections_seen += 1;
            self.state = State::InsideChapter(PendingChapter::new(self.sections_seen));
            return;
        }

        // Any other section header ends the chapter, so its keys are not
        // mistaken for chapter fields.
        if line.starts_with('[') && line.ends_with(']') {
            self.flush();
            return;
        }

        let State::InsideChapter(pending) = &mut self.state else {
            return;
        };

        if let Some(value) = line.strip_prefix(START_KEY) {
            pending.set_boundary("START", value, self.time_base);
        } else if let Some(value) = line.strip_prefix(END_KEY) {
            pending.set_boundary("END", value, self.time_base);
        } else if let Some(value) = line.strip_prefix(TITLE_KEY) {
            pending.title = Some(value.to_owned());
        }
    }

    /// Flush the last pending chapter and return the results.
    pub fn finish(mut self) -> ParsedMetadata {
        self.flush();
        ParsedMetadata {
            chapters: self.chapters,
            rejected: self.rejected,
            time_base: self.time_base,
        }
    }

    fn flush(&mut self) {
        let State::InsideChapter(pending) =
            std::mem::replace(&mut self.state, State::OutsideChapter)
        else {
            return;
        };

        let section = pending.section;
        let number = self.chapters.len() as u32 + 1;
        match pending.into_chapter(number) {
            Ok(chapter) => {
                debug!(
                    "chapter {number} '{}' {}..{}ms",
                    chapter.title(),
                    chapter.start_ms(),
                    chapter.end_ms()
                );
                self.chapters.push(chapter);
            }
            Err(reason) => {
                match reason {
                    BoundaryError::MissingStart | BoundaryError::MissingEnd => {
                        debug!("dropping incomplete chapter section {section}: {reason}")
                    }
                    _ => warn!("dropping chapter section {section}: {reason}"),
                }
                self.rejected.push(RejectedSection { section, reason });
            }
        }
    }
}

fn parse_raw(field: &'static str, value: &str) -> Result<u64, BoundaryError> {
    let invalid = || BoundaryError::InvalidNumber {
        field,
        value: value.to_owned(),
    };
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    value.parse().map_err(|_| invalid())
}
