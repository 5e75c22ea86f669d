use super::timestamp::Timestamp;
use regex::{Captures, Regex};
use std::sync::OnceLock;

fn ass_timestamp_regex() -> &'static Regex {
    static ASS_TIMESTAMP_REGEX: OnceLock<Regex> = OnceLock::new();
    ASS_TIMESTAMP_REGEX.get_or_init(|| {
        Regex::new(r"([0-9]+):([0-9]+):([0-9]+)\.([0-9]+)")
            .expect("Failed to compile ASS timestamp regex")
    })
}

/// Shift every `h:mm:ss.cc` token in `doc` by `offset_ms`, clamping at zero.
///
/// Each token is shifted on its own, so a cue's start and end move together
/// and `start <= end` is preserved.
pub fn shift_timestamps(doc: &str, offset_ms: i64) -> String {
    if offset_ms == 0 {
        return doc.to_string();
    }

    ass_timestamp_regex()
        .replace_all(doc, |caps: &Captures| match Timestamp::parse_ass(&caps[0]) {
            Some(ts) => ts.shifted(offset_ms).to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_offset() {
        assert_eq!(shift_timestamps("0:00:10.00", 750), "0:00:10.75");
        assert_eq!(shift_timestamps("0:00:59.50", 750), "0:01:00.25");
        assert_eq!(shift_timestamps("0:59:59.99", 10), "1:00:00.00");
    }

    #[test]
    fn test_negative_offset_clamps_to_zero() {
        assert_eq!(shift_timestamps("0:00:00.50", -1000), "0:00:00.00");
        assert_eq!(shift_timestamps("0:00:02.00", -500), "0:00:01.50");
    }

    #[test]
    fn test_zero_offset_is_identity() {
        let doc = "Dialogue: 0,0:00:01.23,0:00:04.56,Default,,0,0,0,,hello";
        assert_eq!(shift_timestamps(doc, 0), doc);
    }

    #[test]
    fn test_start_and_end_shift_together() {
        let doc = "Dialogue: 0,0:00:00.20,0:00:00.90,Default,,0,0,0,,oh";
        assert_eq!(
            shift_timestamps(doc, -500),
            "Dialogue: 0,0:00:00.00,0:00:00.40,Default,,0,0,0,,oh"
        );
    }

    #[test]
    fn test_non_timestamp_content_untouched() {
        let doc = "[Script Info]\nPlayResX: 1920\nStyle: Default,Arial,48";
        assert_eq!(shift_timestamps(doc, 750), doc);
    }
}
