use tracing::warn;

/// Maximum characters per rendered line.
pub const MAX_LINE_LENGTH: usize = 80;

/// Maximum rendered lines per cue; anything past this is dropped.
pub const MAX_LINES: usize = 2;

/// ASS hard line break.
pub const LINE_BREAK: &str = r"\N";

/// Index of the text field in an ASS event record.
pub const TEXT_FIELD: usize = 9;

const EVENT_PREFIXES: &[&str] = &["Dialogue:", "Comment:"];

/// Greedily break `text` into lines of at most `max_length` characters.
///
/// A single word longer than the budget gets a line of its own.
fn break_lines(text: &str, max_length: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split(' ') {
        let word_len = word.chars().count();

        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len <= max_length {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

/// Re-flow cue text into at most two lines joined by `\N`.
///
/// Text beyond the second line is discarded.
pub fn wrap_text(text: &str) -> String {
    let mut lines = break_lines(text, MAX_LINE_LENGTH);

    if lines.len() > MAX_LINES {
        let dropped = lines.split_off(MAX_LINES);
        warn!(
            "Cue text exceeds {} lines, dropping: {:?}",
            MAX_LINES,
            dropped.join(" ")
        );
    }

    lines.join(LINE_BREAK)
}

/// Wrap the text field of one comma-separated cue record.
///
/// Records with fewer than ten fields are returned unchanged. The text field
/// runs to the end of the record, so commas inside it are kept.
pub fn wrap_cue_record(record: &str) -> String {
    let fields: Vec<&str> = record.splitn(TEXT_FIELD + 1, ',').collect();
    if fields.len() <= TEXT_FIELD {
        return record.to_string();
    }

    let mut out = fields[..TEXT_FIELD].join(",");
    out.push(',');
    out.push_str(&wrap_text(fields[TEXT_FIELD]));
    out
}

/// Wrap every event record in an ASS document; all other lines pass through.
pub fn wrap_document(doc: &str) -> String {
    doc.split('\n')
        .map(|line| {
            if EVENT_PREFIXES.iter().any(|p| line.starts_with(p)) {
                wrap_cue_record(line)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_unchanged() {
        assert_eq!(wrap_text("hello world"), "hello world");
        assert_eq!(wrap_text(""), "");
    }

    #[test]
    fn test_exactly_80_chars_stays_on_one_line() {
        let text = format!("{} {}", "a".repeat(40), "b".repeat(39));
        assert_eq!(text.chars().count(), 80);
        assert_eq!(wrap_text(&text), text);

        let solid = "x".repeat(80);
        assert_eq!(wrap_text(&solid), solid);
    }

    #[test]
    fn test_81_chars_splits_in_two() {
        let text = format!("{} {}", "a".repeat(79), "b");
        assert_eq!(text.chars().count(), 81);

        let wrapped = wrap_text(&text);
        let lines: Vec<&str> = wrapped.split(LINE_BREAK).collect();
        assert_eq!(lines, vec!["a".repeat(79).as_str(), "b"]);
        assert!(lines.iter().all(|l| l.chars().count() <= MAX_LINE_LENGTH));
    }

    #[test]
    fn test_four_lines_truncated_to_first_two() {
        let words: Vec<String> = (0..4).map(|i| i.to_string().repeat(70)).collect();
        let wrapped = wrap_text(&words.join(" "));

        assert_eq!(wrapped.matches(LINE_BREAK).count(), 1);
        assert_eq!(wrapped, format!("{}{}{}", words[0], LINE_BREAK, words[1]));
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let text = format!("{} {}", "ä".repeat(40), "ö".repeat(39));
        assert_eq!(wrap_text(&text), text);
    }

    #[test]
    fn test_long_first_word_has_no_empty_line() {
        let text = format!("{} tail", "z".repeat(90));
        assert_eq!(wrap_text(&text), format!("{}{}tail", "z".repeat(90), LINE_BREAK));
    }

    #[test]
    fn test_record_only_rewrites_text_field() {
        let record = "a,b,c,d,e,f,g,h,i,word1 word2";
        assert_eq!(wrap_cue_record(record), record);

        let long = format!("a,b,c,d,e,f,g,h,i,{} {}", "w".repeat(60), "v".repeat(30));
        let wrapped = wrap_cue_record(&long);
        assert!(wrapped.starts_with("a,b,c,d,e,f,g,h,i,"));
        assert_eq!(
            &wrapped["a,b,c,d,e,f,g,h,i,".len()..],
            format!("{}{}{}", "w".repeat(60), LINE_BREAK, "v".repeat(30))
        );
    }

    #[test]
    fn test_record_with_few_fields_unchanged() {
        let record = "a,b,c very long text that does not matter";
        assert_eq!(wrap_cue_record(record), record);
    }

    #[test]
    fn test_commas_in_text_stay_in_text() {
        let record = "Dialogue: 0,0:00:01.00,0:00:02.00,Default,,0,0,0,,well, hello there";
        assert_eq!(wrap_cue_record(record), record);
    }

    #[test]
    fn test_document_skips_non_event_lines() {
        let doc = format!(
            "[Events]\nFormat: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\nDialogue: 0,0:00:01.00,0:00:02.00,Default,,0,0,0,,{} {}",
            "a".repeat(50),
            "b".repeat(50)
        );
        let wrapped = wrap_document(&doc);
        let lines: Vec<&str> = wrapped.split('\n').collect();

        assert_eq!(lines[0], "[Events]");
        assert!(lines[1].ends_with(", Effect, Text"));
        assert!(lines[2].ends_with(&format!("{}{}{}", "a".repeat(50), LINE_BREAK, "b".repeat(50))));
    }
}
