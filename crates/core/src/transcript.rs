//! Parser for diarized single-line SRT transcripts.
//!
//! Each useful line has the shape
//! `<index> <HH:MM:SS,mmm> --> <HH:MM:SS,mmm> SPEAKER_<id>: <text>`.
//! Lines that do not conform (blank lines, headers, segments without a
//! speaker label) are skipped, not errors; the skip count is reported so
//! callers can tell a sparse transcript from a misformatted one.

use crate::domain::SpeakerSegment;
use tracing::debug;

/// Result of parsing one transcript block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedTranscript {
    /// Segments in the order their lines appeared.
    pub segments: Vec<SpeakerSegment>,
    /// Non-blank lines that did not match the segment pattern.
    pub skipped_lines: usize,
}

impl ParsedTranscript {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Parses a raw transcript into speaker segments.
///
/// Never fails: a fully malformed input yields an empty segment list,
/// which callers must check for themselves.
pub fn parse_segments(raw: &str) -> ParsedTranscript {
    let mut parsed = ParsedTranscript::default();

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_segment_line(line) {
            Some(segment) => parsed.segments.push(segment),
            None => {
                parsed.skipped_lines += 1;
                debug!(line, "skipped non-segment line");
            }
        }
    }

    parsed
}

fn parse_segment_line(line: &str) -> Option<SpeakerSegment> {
    let (index, rest) = line.split_once(char::is_whitespace)?;
    if index.is_empty() || !index.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let (start_raw, rest) = rest.split_once("-->")?;
    let start = parse_srt_time(start_raw.trim())?;

    let rest = rest.trim_start();
    let (end_raw, label_and_text) = rest.split_once(char::is_whitespace)?;
    let end = parse_srt_time(end_raw)?;

    let (speaker, text) = parse_speaker_label(label_and_text.trim_start())?;

    Some(SpeakerSegment {
        speaker,
        start,
        end,
        text: text.to_owned(),
    })
}

/// Decodes `HH:MM:SS,mmm` to seconds. A `.` millisecond separator is
/// accepted as a fallback, matching what diarization tools emit.
fn parse_srt_time(value: &str) -> Option<f64> {
    let (hms, ms_raw) = if let Some(pos) = value.rfind(',') {
        (&value[..pos], &value[pos + 1..])
    } else if let Some(pos) = value.rfind('.') {
        (&value[..pos], &value[pos + 1..])
    } else {
        return None;
    };

    let ms = ms_raw.parse::<f64>().ok()?;

    let mut parts = hms.split(':');
    let hours = parts.next()?.parse::<f64>().ok()?;
    let minutes = parts.next()?.parse::<f64>().ok()?;
    let seconds = parts.next()?.parse::<f64>().ok()?;
    if parts.next().is_some() {
        return None;
    }

    Some((hours * 3600.0) + (minutes * 60.0) + seconds + (ms / 1000.0))
}

/// Splits `SPEAKER_<id>: <text>` into the numeric id and the trailing
/// text. Text may be empty; the label may not.
fn parse_speaker_label(value: &str) -> Option<(u32, &str)> {
    let rest = value.strip_prefix("SPEAKER_")?;
    let (id_raw, text) = rest.split_once(':')?;
    if id_raw.is_empty() || !id_raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let speaker = id_raw.parse::<u32>().ok()?;
    Some((speaker, text.trim()))
}
