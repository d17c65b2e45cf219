use log::warn;

use crate::chapter::Chapter;
use crate::error::ChapterSplitError;

/// Space between two consecutive chapters that is not an exact join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TilingIssue {
    /// Audio between chapter `after` and the next one belongs to no chapter.
    Gap { after: u32, ms: u64 },
    /// The next chapter starts before chapter `after` ends.
    Overlap { after: u32, ms: u64 },
}

/// Check a parsed chapter list before it is handed to conversion.
///
/// An empty list is fatal and numbering must run 1..N. Negative spans
/// cannot reach this point because [`Chapter::new`] refuses them. Gaps and
/// overlaps between neighbours are only logged; chapters are extracted by their own boundaries either way.
pub fn validate_chapters(chapters: &[Chapter]) -> Result<(), ChapterSplitError> {
    if chapters.is_empty() {
        return Err(ChapterSplitError::NoChaptersFound);
    }

    for (index, chapter) in chapters.iter().enumerate() {
        let expected = index as u32 + 1;
        if chapter.number() != expected {
            return Err(ChapterSplitError::ChapterOrder {
                expected,
                found: chapter.number(),
            });
        }
    }

    for issue in tiling_issues(chapters) {
        match issue {
            TilingIssue::Gap { after, ms } => {
                warn!("{ms}ms gap after chapter {after} is not covered by any chapter")
            }
            TilingIssue::Overlap { after, ms } => {
                warn!("chapter {} overlaps chapter {after} by {ms}ms", after + 1)
            }
        }
    }

    Ok(())
}

/// List every place where a chapter does not end exactly where the next
/// one starts.
pub fn tiling_issues(chapters: &[Chapter]) -> Vec<TilingIssue> {
    chapters
        .windows(2)
        .filter_map(|pair| {
            let (current, next) = (&pair[0], &pair[1]);
            let after = current.number();
            if next.start_ms() > current.end_ms() {
                Some(TilingIssue::Gap {
                    after,
                    ms: next.start_ms() - current.end_ms(),
                })
            } else if next.start_ms() < current.end_ms() {
                Some(TilingIssue::Overlap {
                    after,
                    ms: current.end_ms() - next.start_ms(),
                })
            } else {
                None
            }
        })
        .collect()
}
