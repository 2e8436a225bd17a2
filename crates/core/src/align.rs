//! Token–speaker alignment.
//!
//! Tokens are distributed evenly across the span covered by the first and
//! last speaker segments; each token's interpolated time is then matched
//! against the segment intervals to pick its speaker. The interpolation
//! is a deliberate approximation: it assumes a roughly constant speaking
//! rate and does no per-token error correction.

use crate::domain::{FallbackPolicy, SpeakerSegment, Token};
use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Diagnostic)]
pub enum AlignError {
    #[error("Segment {index} has start {start}s after end {end}s")]
    #[diagnostic(help("Check the transcript for a swapped timestamp pair"))]
    InvalidSegmentInterval { index: usize, start: f64, end: f64 },

    #[error(
        "Segment {index} starts at {start}s, before the previous segment ends at {previous_end}s"
    )]
    #[diagnostic(help(
        "Segments must be in time order and must not overlap; re-export the transcript sorted by start time"
    ))]
    InvalidSegmentOrder {
        index: usize,
        start: f64,
        previous_end: f64,
    },

    #[error("Transcript span is empty: starts at {span_start}s and ends at {span_end}s")]
    #[diagnostic(help(
        "The first segment's start must lie strictly before the last segment's end"
    ))]
    EmptySpan { span_start: f64, span_end: f64 },
}

/// Checks that every segment is a well-formed interval and that the list
/// is in non-overlapping time order. Touching boundaries
/// (`next.start == previous.end`) are fine; the shared instant resolves
/// to the earlier segment.
pub fn validate_segments(segments: &[SpeakerSegment]) -> Result<(), AlignError> {
    for (index, segment) in segments.iter().enumerate() {
        if segment.start > segment.end {
            return Err(AlignError::InvalidSegmentInterval {
                index,
                start: segment.start,
                end: segment.end,
            });
        }
        if index > 0 {
            let previous_end = segments[index - 1].end;
            if segment.start < previous_end {
                return Err(AlignError::InvalidSegmentOrder {
                    index,
                    start: segment.start,
                    previous_end,
                });
            }
        }
    }
    Ok(())
}

/// Assigns a speaker and timestamp to every token.
///
/// Tokens are spread evenly across the recording span; each token's
/// estimated time picks the first segment whose closed interval contains
/// it, and `policy` decides what happens when the estimate lands in a gap
/// between segments. Timestamps are rounded to two fractional digits and
/// written to both `start` and `end`.
///
/// If either input is empty the tokens come back unchanged. The result
/// depends only on list positions and the segment set, so applying
/// `align` to its own output reproduces it.
pub fn align(
    tokens: Vec<Token>,
    segments: &[SpeakerSegment],
    policy: FallbackPolicy,
) -> Result<Vec<Token>, AlignError> {
    if tokens.is_empty() || segments.is_empty() {
        return Ok(tokens);
    }

    validate_segments(segments)?;

    let span_start = segments[0].start;
    let span_end = segments[segments.len() - 1].end;
    let duration = span_end - span_start;
    if duration <= 0.0 {
        return Err(AlignError::EmptySpan {
            span_start,
            span_end,
        });
    }

    let time_per_token = duration / tokens.len() as f64;
    debug!(
        span_start,
        span_end,
        time_per_token,
        tokens = tokens.len(),
        segments = segments.len(),
        "aligning tokens"
    );

    let mut tokens = tokens;
    for (position, token) in tokens.iter_mut().enumerate() {
        let estimate = span_start + position as f64 * time_per_token;

        let speaker = segments
            .iter()
            .find(|segment| segment.contains(estimate))
            .map(|segment| segment.speaker);

        token.speaker = match speaker {
            Some(found) => Some(found),
            None => fallback_speaker(segments, estimate, policy),
        };

        let stamp = round_centis(estimate);
        token.start = Some(stamp);
        token.end = Some(stamp);
    }

    Ok(tokens)
}

fn fallback_speaker(
    segments: &[SpeakerSegment],
    estimate: f64,
    policy: FallbackPolicy,
) -> Option<u32> {
    match policy {
        FallbackPolicy::LastSegment => segments.last().map(|segment| segment.speaker),
        FallbackPolicy::NearestSegment => segments
            .iter()
            .min_by(|a, b| {
                let da = (a.midpoint() - estimate).abs();
                let db = (b.midpoint() - estimate).abs();
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|segment| segment.speaker),
        FallbackPolicy::Unassigned => None,
    }
}

fn round_centis(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn token(text: &str, id: usize) -> Token {
        Token::unaligned(text, id)
    }

    fn segment(speaker: u32, start: f64, end: f64) -> SpeakerSegment {
        SpeakerSegment {
            speaker,
            start,
            end,
            text: String::new(),
        }
    }

    fn tokens(count: usize) -> Vec<Token> {
        (0..count).map(|i| token("t", i)).collect()
    }

    #[test]
    fn four_tokens_over_two_segments() {
        let segments = vec![segment(0, 0.0, 2.0), segment(1, 2.0, 4.0)];
        let aligned = align(tokens(4), &segments, FallbackPolicy::LastSegment).unwrap();

        let speakers: Vec<u32> = aligned.iter().map(|t| t.speaker.unwrap()).collect();
        // Token 2 lands exactly on the 2.0 boundary; first match wins.
        assert_eq!(speakers, vec![0, 0, 0, 1]);

        let starts: Vec<f64> = aligned.iter().map(|t| t.start.unwrap()).collect();
        assert_eq!(starts, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn alignment_preserves_length_and_order_and_fills_every_field() {
        let segments = vec![segment(0, 0.0, 10.0)];
        let input: Vec<Token> = (0..7).map(|i| token(&format!("w{i}"), i)).collect();
        let aligned = align(input, &segments, FallbackPolicy::LastSegment).unwrap();

        assert_eq!(aligned.len(), 7);
        for (i, t) in aligned.iter().enumerate() {
            assert_eq!(t.id, i);
            assert_eq!(t.text, format!("w{i}"));
            assert!(t.is_aligned());
        }
    }

    #[test]
    fn empty_tokens_are_a_no_op() {
        let segments = vec![segment(0, 0.0, 1.0)];
        let aligned = align(Vec::new(), &segments, FallbackPolicy::LastSegment).unwrap();
        assert!(aligned.is_empty());
    }

    #[test]
    fn empty_segments_leave_tokens_untouched() {
        let aligned = align(tokens(3), &[], FallbackPolicy::LastSegment).unwrap();
        assert_eq!(aligned.len(), 3);
        assert!(aligned.iter().all(|t| !t.is_aligned()));
    }

    #[test]
    fn single_token_single_segment_lands_on_segment_start() {
        let segments = vec![segment(4, 1.5, 3.0)];
        let aligned = align(tokens(1), &segments, FallbackPolicy::LastSegment).unwrap();

        assert_eq!(aligned[0].speaker, Some(4));
        assert_abs_diff_eq!(aligned[0].start.unwrap(), 1.5);
        assert_abs_diff_eq!(aligned[0].end.unwrap(), 1.5);
    }

    #[test]
    fn double_application_is_idempotent() {
        let segments = vec![segment(0, 0.0, 3.0), segment(1, 3.0, 9.0)];
        let once = align(tokens(5), &segments, FallbackPolicy::LastSegment).unwrap();
        let twice = align(once.clone(), &segments, FallbackPolicy::LastSegment).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn gap_falls_back_to_last_segment_speaker() {
        // 10 tokens over [0, 10]; estimates 4.0..=6.0 land in the gap.
        let segments = vec![segment(0, 0.0, 3.5), segment(7, 6.5, 10.0)];
        let aligned = align(tokens(10), &segments, FallbackPolicy::LastSegment).unwrap();

        assert_eq!(aligned[4].speaker, Some(7));
        assert_eq!(aligned[5].speaker, Some(7));
        assert_eq!(aligned[0].speaker, Some(0));
    }

    #[test]
    fn gap_falls_back_to_nearest_segment_speaker() {
        let segments = vec![segment(0, 0.0, 3.5), segment(7, 6.5, 10.0)];
        let aligned = align(tokens(10), &segments, FallbackPolicy::NearestSegment).unwrap();

        // Estimate 4.0 is nearer the first segment's midpoint (1.75) than
        // the second's (8.25).
        assert_eq!(aligned[4].speaker, Some(0));
        assert_eq!(aligned[6].speaker, Some(7));
    }

    #[test]
    fn gap_can_leave_tokens_unassigned() {
        let segments = vec![segment(0, 0.0, 3.5), segment(7, 6.5, 10.0)];
        let aligned = align(tokens(10), &segments, FallbackPolicy::Unassigned).unwrap();

        assert_eq!(aligned[4].speaker, None);
        assert!(aligned[4].start.is_some(), "timestamp is still assigned");
        assert_eq!(aligned[0].speaker, Some(0));
    }

    #[test]
    fn swapped_interval_is_rejected() {
        let segments = vec![segment(0, 5.0, 2.0)];
        let err = align(tokens(2), &segments, FallbackPolicy::LastSegment).unwrap_err();
        assert!(matches!(
            err,
            AlignError::InvalidSegmentInterval { index: 0, .. }
        ));
    }

    #[test]
    fn overlapping_segments_are_rejected() {
        let segments = vec![segment(0, 0.0, 3.0), segment(1, 2.0, 5.0)];
        let err = align(tokens(2), &segments, FallbackPolicy::LastSegment).unwrap_err();
        assert!(matches!(
            err,
            AlignError::InvalidSegmentOrder { index: 1, .. }
        ));
    }

    #[test]
    fn touching_boundaries_are_legal() {
        let segments = vec![segment(0, 0.0, 2.0), segment(1, 2.0, 4.0)];
        assert!(validate_segments(&segments).is_ok());
    }

    #[test]
    fn zero_duration_span_is_rejected() {
        let segments = vec![segment(0, 3.0, 3.0)];
        let err = align(tokens(1), &segments, FallbackPolicy::LastSegment).unwrap_err();
        assert!(matches!(err, AlignError::EmptySpan { .. }));
    }

    #[test]
    fn timestamps_round_to_two_digits() {
        // 3 tokens over [0, 1]: estimates 0, 1/3, 2/3.
        let segments = vec![segment(0, 0.0, 1.0)];
        let aligned = align(tokens(3), &segments, FallbackPolicy::LastSegment).unwrap();

        assert_abs_diff_eq!(aligned[1].start.unwrap(), 0.33);
        assert_abs_diff_eq!(aligned[2].start.unwrap(), 0.67);
    }
}
