// ASS timestamps: `h:mm:ss.cc`
use regex::{Captures, Regex};
use std::fmt;
use std::sync::OnceLock;

/// Engine-native token: `[hours:]minutes:seconds.fraction`.
fn engine_timestamp_regex() -> &'static Regex {
    static ENGINE_TIMESTAMP_REGEX: OnceLock<Regex> = OnceLock::new();
    ENGINE_TIMESTAMP_REGEX.get_or_init(|| {
        Regex::new(r"(?:([0-9]+):)?([0-9]+):([0-9]+)\.([0-9]+)")
            .expect("Failed to compile engine timestamp regex")
    })
}

/// A non-negative offset from program start, at millisecond resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Timestamp {
    millis: u64,
}

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp { millis: 0 };

    pub fn from_millis(millis: u64) -> Self {
        Self { millis }
    }

    /// Returns `None` if the total does not fit in a `u64`.
    pub fn from_parts(hours: u64, minutes: u64, seconds: u64, millis: u64) -> Option<Self> {
        let total_secs = hours
            .checked_mul(3600)?
            .checked_add(minutes.checked_mul(60)?)?
            .checked_add(seconds)?;
        let millis = total_secs.checked_mul(1000)?.checked_add(millis)?;
        Some(Self { millis })
    }

    pub fn as_millis(&self) -> u64 {
        self.millis
    }

    pub fn centiseconds(&self) -> u64 {
        (self.millis % 1000) / 10
    }

    /// Shift by a signed offset, clamping at program start.
    pub fn shifted(&self, offset_ms: i64) -> Self {
        let millis = if offset_ms >= 0 {
            self.millis.saturating_add(offset_ms.unsigned_abs())
        } else {
            self.millis.saturating_sub(offset_ms.unsigned_abs())
        };
        Self { millis }
    }

    /// Parse a destination-format token `h:mm:ss.cc`.
    pub fn parse_ass(s: &str) -> Option<Self> {
        let (hms, centis) = s.trim().split_once('.')?;
        let mut parts = hms.split(':');
        let hours = parse_digits(parts.next()?)?;
        let minutes = parse_digits(parts.next()?)?;
        let seconds = parse_digits(parts.next()?)?;
        if parts.next().is_some() {
            return None;
        }
        let centis = parse_digits(centis)?;
        Self::from_parts(hours, minutes, seconds, centis.checked_mul(10)?)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.millis / 3_600_000;
        let minutes = (self.millis % 3_600_000) / 60_000;
        let seconds = (self.millis % 60_000) / 1000;
        write!(
            f,
            "{}:{:02}:{:02}.{:02}",
            hours,
            minutes,
            seconds,
            self.centiseconds()
        )
    }
}

fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Interpret the fraction digits as a decimal fraction truncated to hundredths,
/// returned in milliseconds (`5` -> 500, `123` -> 120).
fn fraction_to_millis(fraction: &str) -> Option<u64> {
    let mut digits = fraction.bytes();
    let tenths = digits.next().map(|b| u64::from(b - b'0'))?;
    let hundredths = digits.next().map(|b| u64::from(b - b'0')).unwrap_or(0);
    Some(tenths * 100 + hundredths * 10)
}

fn convert_engine_token(caps: &Captures) -> Option<String> {
    let hours = caps.get(1).map_or(Some(0), |m| parse_digits(m.as_str()))?;
    let minutes = parse_digits(&caps[2])?;
    let seconds = parse_digits(&caps[3])?;
    let millis = fraction_to_millis(&caps[4])?;
    Timestamp::from_parts(hours, minutes, seconds, millis).map(|t| t.to_string())
}

/// Rewrite every engine-native timestamp in `doc` into ASS grammar.
///
/// Tokens that cannot be represented are left as they are.
pub fn format_engine_timestamps(doc: &str) -> String {
    engine_timestamp_regex()
        .replace_all(doc, |caps: &Captures| {
            convert_engine_token(caps).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_padding() {
        let t = Timestamp::from_parts(1, 2, 3, 450).unwrap();
        assert_eq!(t.to_string(), "1:02:03.45");
        assert_eq!(Timestamp::ZERO.to_string(), "0:00:00.00");
        assert_eq!(Timestamp::from_millis(36_000_000).to_string(), "10:00:00.00");
    }

    #[test]
    fn test_display_truncates_to_centiseconds() {
        assert_eq!(Timestamp::from_millis(1_999).to_string(), "0:00:01.99");
        assert_eq!(Timestamp::from_millis(1_005).to_string(), "0:00:01.00");
    }

    #[test]
    fn test_parse_ass() {
        let t = Timestamp::parse_ass("0:01:02.34").unwrap();
        assert_eq!(t.as_millis(), 62_340);
        assert!(Timestamp::parse_ass("01:02").is_none());
        assert!(Timestamp::parse_ass("a:01:02.00").is_none());
        assert!(Timestamp::parse_ass("1:2:3:4.00").is_none());
    }

    #[test]
    fn test_shifted_clamps() {
        let t = Timestamp::from_millis(500);
        assert_eq!(t.shifted(-1000), Timestamp::ZERO);
        assert_eq!(t.shifted(250).as_millis(), 750);
        assert_eq!(t.shifted(i64::MIN), Timestamp::ZERO);
    }

    #[test]
    fn test_format_engine_without_hours() {
        assert_eq!(format_engine_timestamps("01:02.345"), "0:01:02.34");
        assert_eq!(format_engine_timestamps("1:2.5"), "0:01:02.50");
    }

    #[test]
    fn test_format_engine_with_hours() {
        assert_eq!(format_engine_timestamps("2:03:04.999"), "2:03:04.99");
        assert_eq!(format_engine_timestamps("00:00:09.07"), "0:00:09.07");
    }

    #[test]
    fn test_format_engine_leaves_other_text() {
        let line = "Dialogue: 0,0:00:01.500,0:00:02.25,Default,,0,0,0,,la la la";
        assert_eq!(
            format_engine_timestamps(line),
            "Dialogue: 0,0:00:01.50,0:00:02.25,Default,,0,0,0,,la la la"
        );
        assert_eq!(format_engine_timestamps("[Script Info]"), "[Script Info]");
    }

    #[test]
    fn test_format_engine_overflowing_token_untouched() {
        let huge = "99999999999999999999:00:00.00";
        assert_eq!(format_engine_timestamps(huge), huge);
    }

    #[test]
    fn test_round_trip_within_one_centisecond() {
        for input in ["0:00:00.00", "0:59:59.99", "3:07:42.15", "12:30:05.01"] {
            let formatted = format_engine_timestamps(input);
            let original = Timestamp::parse_ass(input).unwrap();
            let parsed = Timestamp::parse_ass(&formatted).unwrap();

            assert_eq!(parsed.as_millis() / 1000, original.as_millis() / 1000);
            assert!(parsed.centiseconds().abs_diff(original.centiseconds()) <= 1);
        }
    }
}
