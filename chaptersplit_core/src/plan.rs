use crate::chapter::{fallback_title, Chapter};
use crate::timestamp::format_timestamp;

/// Extension of every produced segment.
pub const OUTPUT_EXTENSION: &str = "mp3";

/// Parameters for one engine invocation that produces one chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentRequest {
    /// Chapter number, also written as the `track` tag.
    pub number: u32,
    /// Display title, written as the `title` tag.
    pub title: String,
    pub start_ms: u64,
    pub duration_ms: u64,
}

impl SegmentRequest {
    pub fn for_chapter(chapter: &Chapter) -> Self {
        Self {
            number: chapter.number(),
            title: chapter.display_title().to_owned(),
            start_ms: chapter.start_ms(),
            duration_ms: chapter.duration_ms(),
        }
    }

    /// Offset into the source, as passed to `-ss`.
    pub fn start(&self) -> String {
        format_timestamp(self.start_ms)
    }

    /// Length of the segment, as passed to `-t`. This is a span, not the
    /// chapter's end position.
    pub fn duration(&self) -> String {
        format_timestamp(self.duration_ms)
    }

    pub fn file_name(&self) -> String {
        output_file_name(self.number, &self.title)
    }
}

/// One request per chapter, in ascending chapter order.
pub fn build_plan(chapters: &[Chapter]) -> Vec<SegmentRequest> {
    chapters.iter().map(SegmentRequest::for_chapter).collect()
}

/// `NN - Title.mp3`, with the number zero-padded to two digits.
pub fn output_file_name(number: u32, title: &str) -> String {
    let mut title = sanitize_file_name(title);
    if title.is_empty() {
        title = fallback_title(number);
    }
    format!("{number:02} - {title}.{OUTPUT_EXTENSION}")
}

/// Strip characters that are not allowed in file names on common platforms
/// and collapse runs of whitespace.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(*c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .filter(|c| !c.is_control() || c.is_whitespace())
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}
