use crate::error::BoundaryError;

/// One chapter of the source, with container-relative boundaries in
/// milliseconds.
///
/// Boundaries are fixed at construction. The only mutable part is the
/// user-supplied title override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    number: u32,
    title: String,
    start_ms: u64,
    end_ms: u64,
    edited_title: Option<String>,
}

impl Chapter {
    /// Build a chapter, rejecting boundaries that would give a negative
    /// duration.
    pub fn new(
        number: u32,
        title: impl Into<String>,
        start_ms: u64,
        end_ms: u64,
    ) -> Result<Self, BoundaryError> {
        if end_ms < start_ms {
            return Err(BoundaryError::EndBeforeStart { start_ms, end_ms });
        }
        Ok(Self {
            number,
            title: title.into(),
            start_ms,
            end_ms,
            edited_title: None,
        })
    }

    /// 1-based position in discovery order.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Title as parsed, or the synthesized `Chapter {number}` label.
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn start_ms(&self) -> u64 {
        self.start_ms
    }

    pub fn end_ms(&self) -> u64 {
        self.end_ms
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }

    pub fn edited_title(&self) -> Option<&str> {
        self.edited_title.as_deref()
    }

    /// Set or clear the title override.
    pub fn set_edited_title(&mut self, title: Option<String>) {
        self.edited_title = title;
    }

    /// The title shown and exported: a non-empty edit wins over the parsed
    /// title.
    pub fn display_title(&self) -> &str {
        match self.edited_title.as_deref() {
            Some(edited) if !edited.is_empty() => edited,
            _ => &self.title,
        }
    }
}

/// Fallback label for a chapter without a usable title.
pub fn fallback_title(number: u32) -> String {
    format!("Chapter {number}")
}

/// An encoded chapter produced by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub chapter: Chapter,
    pub data: Vec<u8>,
}

impl ConversionResult {
    pub fn new(chapter: Chapter, data: Vec<u8>) -> Self {
        Self { chapter, data }
    }

    /// Size of the encoded segment in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_is_span_between_boundaries() {
        let chapter = Chapter::new(1, "Opening", 5_000, 12_500).unwrap();
        assert_eq!(chapter.duration_ms(), 7_500);
    }

    #[test]
    fn rejects_negative_duration() {
        assert_eq!(
            Chapter::new(1, "Backwards", 2_000, 1_000),
            Err(BoundaryError::EndBeforeStart {
                start_ms: 2_000,
                end_ms: 1_000
            })
        );
    }

    #[test]
    fn zero_length_chapters_are_allowed() {
        let chapter = Chapter::new(4, "Marker", 1_000, 1_000).unwrap();
        assert_eq!(chapter.duration_ms(), 0);
    }

    #[test]
    fn display_title_prefers_non_empty_edit() {
        let mut chapter = Chapter::new(2, "Original", 0, 1).unwrap();
        assert_eq!(chapter.display_title(), "Original");

        chapter.set_edited_title(Some("Renamed".into()));
        assert_eq!(chapter.display_title(), "Renamed");

        chapter.set_edited_title(Some(String::new()));
        assert_eq!(chapter.display_title(), "Original");
    }
}
