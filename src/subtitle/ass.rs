// Advanced SubStation Alpha event parsing
use super::timestamp::Timestamp;
use super::wrap::{LINE_BREAK, TEXT_FIELD};

const DIALOGUE_PREFIX: &str = "Dialogue:";

/// One timed subtitle entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub start: Timestamp,
    pub end: Timestamp,
    pub text: String,
}

impl Cue {
    /// Parse a `Dialogue:` record. Returns `None` for anything else.
    pub fn parse_dialogue(line: &str) -> Option<Self> {
        let body = line.strip_prefix(DIALOGUE_PREFIX)?;
        let fields: Vec<&str> = body.splitn(TEXT_FIELD + 1, ',').collect();
        if fields.len() <= TEXT_FIELD {
            return None;
        }

        Some(Cue {
            start: Timestamp::parse_ass(fields[1])?,
            end: Timestamp::parse_ass(fields[2])?,
            text: fields[TEXT_FIELD].trim_end_matches('\r').to_string(),
        })
    }

    /// Rendered lines of this cue.
    pub fn lines(&self) -> Vec<&str> {
        self.text.split(LINE_BREAK).collect()
    }
}

/// The dialogue events of an ASS document, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtitleDocument {
    pub cues: Vec<Cue>,
}

impl SubtitleDocument {
    pub fn parse(doc: &str) -> Self {
        let cues = doc.lines().filter_map(Cue::parse_dialogue).collect();
        Self { cues }
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// End of the last cue, if any.
    pub fn duration(&self) -> Option<Timestamp> {
        self.cues.iter().map(|c| c.end).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "[Script Info]\r\nScriptType: v4.00+\r\n\r\n[Events]\r\nFormat: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\r\nDialogue: 0,0:00:01.50,0:00:03.25,Default,,0,0,0,,{\\k50}Hello {\\k75}there\r\nComment: 0,0:00:04.00,0:00:05.00,Default,,0,0,0,,ignored\r\nDialogue: 0,0:00:04.00,0:00:06.00,Default,,0,0,0,,first\\Nsecond\r\n";

    #[test]
    fn test_parse_dialogue_cues() {
        let doc = SubtitleDocument::parse(SAMPLE);
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.cues[0].start.as_millis(), 1_500);
        assert_eq!(doc.cues[0].end.as_millis(), 3_250);
        assert_eq!(doc.cues[0].text, "{\\k50}Hello {\\k75}there");
        assert_eq!(doc.duration().unwrap().as_millis(), 6_000);
    }

    #[test]
    fn test_cue_lines() {
        let doc = SubtitleDocument::parse(SAMPLE);
        assert_eq!(doc.cues[1].lines(), vec!["first", "second"]);
    }

    #[test]
    fn test_malformed_dialogue_skipped() {
        let doc = SubtitleDocument::parse("Dialogue: 0,bad,0:00:01.00,Default,,0,0,0,,x\nDialogue: too,short");
        assert!(doc.is_empty());
        assert!(doc.duration().is_none());
    }
}
