//! Millisecond formatting for engine arguments and listings.

const MS_PER_SECOND: u64 = 1_000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;

/// Format a millisecond offset or span as `H:MM:SS.mmm`.
///
/// Hours are unpadded and unbounded; minutes and seconds use two digits and
/// the fraction always has three. This is the form the engine accepts for
/// `-ss` and `-t`.
pub fn format_timestamp(ms: u64) -> String {
    let hours = ms / MS_PER_HOUR;
    let minutes = (ms % MS_PER_HOUR) / MS_PER_MINUTE;
    let seconds = (ms % MS_PER_MINUTE) / MS_PER_SECOND;
    let millis = ms % MS_PER_SECOND;
    format!("{hours}:{minutes:02}:{seconds:02}.{millis:03}")
}

/// Format a span for people: `M:SS`, or `H:MM:SS` once it reaches an hour.
/// Sub-second remainders are dropped.
pub fn format_duration(ms: u64) -> String {
    let total_seconds = ms / MS_PER_SECOND;
    let hours = total_seconds / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_engine_timestamps() {
        assert_eq!(format_timestamp(0), "0:00:00.000");
        assert_eq!(format_timestamp(7), "0:00:00.007");
        assert_eq!(format_timestamp(59_999), "0:00:59.999");
        assert_eq!(format_timestamp(60_000), "0:01:00.000");
        assert_eq!(format_timestamp(3_723_456), "1:02:03.456");
    }

    #[test]
    fn hours_are_not_padded_or_wrapped() {
        assert_eq!(format_timestamp(36_000_000), "10:00:00.000");
        assert_eq!(format_timestamp(100 * MS_PER_HOUR + 1), "100:00:00.001");
    }

    #[test]
    fn formats_human_durations() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(65_999), "1:05");
        assert_eq!(format_duration(3_723_456), "1:02:03");
    }
}
