use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single tokenizer output unit, annotated with a speaker and timestamp
/// once alignment has run.
///
/// Serializes to the record shape consumed downstream:
/// `{"token": ..., "id": ..., "speaker": ..., "start": ..., "end": ...}`.
/// The optional fields stay `null` until [`crate::align::align`] fills
/// them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    #[serde(rename = "token")]
    pub text: String,
    pub id: usize,
    pub speaker: Option<u32>,
    pub start: Option<f64>,
    pub end: Option<f64>,
}

impl Token {
    /// Builds a token fresh out of a tokenizer, with no speaker or
    /// timestamp assigned yet.
    pub fn unaligned(text: impl Into<String>, id: usize) -> Self {
        Token {
            text: text.into(),
            id,
            speaker: None,
            start: None,
            end: None,
        }
    }

    /// True once the token carries a speaker and both timestamps.
    pub fn is_aligned(&self) -> bool {
        self.speaker.is_some() && self.start.is_some() && self.end.is_some()
    }
}

/// A time interval attributed to one speaker, parsed from a diarized
/// transcript line. The interval is closed: `start <= t <= end`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerSegment {
    pub speaker: u32,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl SpeakerSegment {
    pub fn contains(&self, seconds: f64) -> bool {
        self.start <= seconds && seconds <= self.end
    }

    pub fn midpoint(&self) -> f64 {
        (self.start + self.end) / 2.0
    }
}

/// Rule applied when a token's interpolated time falls in a gap between
/// segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Assign the speaker of the last segment in the transcript.
    #[default]
    LastSegment,
    /// Assign the speaker of the segment whose midpoint is closest.
    NearestSegment,
    /// Leave the token's speaker unset.
    Unassigned,
}

impl fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackPolicy::LastSegment => write!(f, "last_segment"),
            FallbackPolicy::NearestSegment => write!(f, "nearest_segment"),
            FallbackPolicy::Unassigned => write!(f, "unassigned"),
        }
    }
}

impl FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "last_segment" | "last" => Ok(FallbackPolicy::LastSegment),
            "nearest_segment" | "nearest" => Ok(FallbackPolicy::NearestSegment),
            "unassigned" | "none" => Ok(FallbackPolicy::Unassigned),
            _ => Err(format!("Invalid fallback policy: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_serializes_with_downstream_field_names() {
        let token = Token::unaligned("Hello", 0);
        let json = serde_json::to_value(&token).unwrap();

        assert_eq!(json["token"], "Hello");
        assert_eq!(json["id"], 0);
        assert!(json["speaker"].is_null());
        assert!(json["start"].is_null());
        assert!(json["end"].is_null());
    }

    #[test]
    fn token_round_trips_after_alignment_fields_are_set() {
        let mut token = Token::unaligned(" world", 7);
        token.speaker = Some(1);
        token.start = Some(12.34);
        token.end = Some(12.34);

        let json = serde_json::to_string(&token).unwrap();
        let back: Token = serde_json::from_str(&json).unwrap();
        assert_eq!(back, token);
        assert!(back.is_aligned());
    }

    #[test]
    fn segment_interval_is_closed_on_both_ends() {
        let segment = SpeakerSegment {
            speaker: 0,
            start: 1.0,
            end: 2.0,
            text: String::new(),
        };

        assert!(segment.contains(1.0));
        assert!(segment.contains(2.0));
        assert!(!segment.contains(2.001));
    }

    #[test]
    fn fallback_policy_parses_short_and_long_names() {
        assert_eq!(
            FallbackPolicy::from_str("last").unwrap(),
            FallbackPolicy::LastSegment
        );
        assert_eq!(
            FallbackPolicy::from_str("NEAREST_SEGMENT").unwrap(),
            FallbackPolicy::NearestSegment
        );
        assert!(FallbackPolicy::from_str("median").is_err());
    }
}
