pub mod align;
pub mod domain;
pub mod pipeline;
pub mod transcript;

pub use align::{AlignError, align, validate_segments};
pub use domain::{FallbackPolicy, SpeakerSegment, Token};
pub use pipeline::{AlignJob, JobReport, PipelineError};
pub use transcript::{ParsedTranscript, parse_segments};
