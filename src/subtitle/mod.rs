pub mod ass;
pub mod offset;
pub mod timestamp;
pub mod wrap;

pub use ass::{Cue, SubtitleDocument};
pub use offset::shift_timestamps;
pub use timestamp::{format_engine_timestamps, Timestamp};
pub use wrap::{wrap_cue_record, wrap_document, wrap_text, LINE_BREAK, MAX_LINE_LENGTH};

/// Turn raw engine output into a burn-in ready ASS document:
/// reformat timestamps, shift by `offset_ms`, then wrap cue text.
pub fn prepare_karaoke_subtitles(native: &str, offset_ms: i64) -> String {
    let formatted = format_engine_timestamps(native);
    let shifted = shift_timestamps(&formatted, offset_ms);
    wrap_document(&shifted)
}
