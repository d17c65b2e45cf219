use std::path::PathBuf;

use chaptersplit_core::encoder::{DEFAULT_BITRATE, DEFAULT_FFMPEG};
use clap::{builder::ValueParser, value_parser, Arg, ArgAction, Command};

/// Parse a `N=TITLE` chapter title override.
///
/// `N` is the 1-based chapter number; everything after the first `=` is
/// the title, so titles may themselves contain `=`.
pub fn parse_title_override(value: &str) -> Result<(u32, String), String> {
    let (number, title) = value
        .split_once('=')
        .ok_or_else(|| format!("expected N=TITLE but got '{value}'"))?;

    let number = number
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|number| *number > 0)
        .ok_or_else(|| format!("invalid chapter number '{}'", number.trim()))?;

    if title.trim().is_empty() {
        return Err("title cannot be empty".into());
    }

    Ok((number, title.to_owned()))
}

/// Parse an encoder bitrate such as `128k`, `64K` or `192000`.
pub fn parse_bitrate(value: &str) -> Result<String, String> {
    let input = value.trim();
    let digits = input
        .strip_suffix(['k', 'K'])
        .unwrap_or(input);

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("invalid bitrate '{value}'"));
    }
    if digits.bytes().all(|b| b == b'0') {
        return Err("bitrate must be greater than zero".into());
    }

    Ok(input.to_owned())
}

pub fn build_cli() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about("Split an M4B audiobook into one MP3 per chapter")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("OUTPUT_DIR")
                .help("Directory where the chapter files will be written")
                .default_value(".")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("bitrate")
                .short('b')
                .long("bitrate")
                .value_name("RATE")
                .help("MP3 bitrate (e.g. 128k)")
                .default_value(DEFAULT_BITRATE)
                .value_parser(ValueParser::new(parse_bitrate)),
        )
        .arg(
            Arg::new("ffmpeg")
                .long("ffmpeg")
                .value_name("PATH")
                .help("ffmpeg executable used to read and encode the audiobook")
                .env("CHAPTERSPLIT_FFMPEG")
                .default_value(DEFAULT_FFMPEG)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("title")
                .short('t')
                .long("title")
                .value_name("N=TITLE")
                .help("Replace the title of chapter N (repeatable)")
                .action(ArgAction::Append)
                .value_parser(ValueParser::new(parse_title_override)),
        )
        .arg(
            Arg::new("archive")
                .long("archive")
                .help("Bundle all chapters into a single zip archive")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("overwrite")
                .long("overwrite")
                .help("Allow overwriting existing files in the output directory")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("List the chapters that would be extracted without encoding anything")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("file_path")
                .value_name("FILE_PATH")
                .help("Path to the input .m4b or .aax file")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_title_override_splits_on_first_equals() {
        assert_eq!(
            parse_title_override("3=Intro").unwrap(),
            (3, "Intro".to_owned())
        );
        assert_eq!(
            parse_title_override("12=E = mc^2").unwrap(),
            (12, "E = mc^2".to_owned())
        );
    }

    #[test]
    fn parse_title_override_rejects_bad_numbers() {
        assert!(parse_title_override("Intro").is_err());
        assert!(parse_title_override("0=Intro").is_err());
        assert!(parse_title_override("x=Intro").is_err());
        assert!(parse_title_override("-1=Intro").is_err());
    }

    #[test]
    fn parse_title_override_rejects_empty_titles() {
        assert!(parse_title_override("2=").is_err());
        assert!(parse_title_override("2=   ").is_err());
    }

    #[test]
    fn parse_bitrate_accepts_common_forms() {
        assert_eq!(parse_bitrate("128k").unwrap(), "128k");
        assert_eq!(parse_bitrate("64K").unwrap(), "64K");
        assert_eq!(parse_bitrate("192000").unwrap(), "192000");
    }

    #[test]
    fn parse_bitrate_rejects_garbage() {
        assert!(parse_bitrate("fast").is_err());
        assert!(parse_bitrate("k").is_err());
        assert!(parse_bitrate("0k").is_err());
        assert!(parse_bitrate("12.5k").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        build_cli().debug_assert();
    }
}
