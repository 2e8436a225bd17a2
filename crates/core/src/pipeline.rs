//! File-level pipeline: load an unaligned token file and a diarized
//! transcript, align, and write the annotated tokens back out. A batch
//! runner drives a list of jobs described by a JSON manifest instead of
//! hard-coded path constants.

use crate::align::{AlignError, align};
use crate::domain::{FallbackPolicy, Token};
use crate::transcript::parse_segments;
use miette::Diagnostic;
use serde::Deserialize;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug, Diagnostic)]
pub enum PipelineError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("File is empty: {0}")]
    FileEmpty(String),

    #[error("Invalid token file {path}")]
    #[diagnostic(help("Expected a JSON array of {{token, id, speaker, start, end}} records"))]
    InvalidTokens {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid job manifest {path}")]
    #[diagnostic(help(
        "Expected a JSON array of jobs: [{{\"tokens\": ..., \"transcript\": ..., \"output\": ...}}]"
    ))]
    InvalidManifest {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("No speaker segments found in {0}")]
    #[diagnostic(help(
        "Lines must look like `1 00:00:01,000 --> 00:00:02,500 SPEAKER_00: text`"
    ))]
    NoSegments(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Align(#[from] AlignError),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
}

/// One unit of batch work: align `tokens` against `transcript` and write
/// the result to `output`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AlignJob {
    pub tokens: PathBuf,
    pub transcript: PathBuf,
    pub output: PathBuf,
    #[serde(default)]
    pub fallback: FallbackPolicy,
}

/// Statistics from one completed job, mirroring what the alignment run
/// reports to its operator.
#[derive(Debug, Clone, PartialEq)]
pub struct JobReport {
    pub tokens: usize,
    pub segments: usize,
    pub skipped_lines: usize,
    pub span_start: f64,
    pub span_end: f64,
    pub time_per_token: f64,
}

impl JobReport {
    pub fn duration(&self) -> f64 {
        self.span_end - self.span_start
    }
}

/// Checks that a pipeline input exists and is non-empty.
pub fn validate_input_file(path: &Path) -> Result<(), PipelineError> {
    if !path.exists() {
        return Err(PipelineError::FileNotFound(path.display().to_string()));
    }
    let metadata = fs::metadata(path)?;
    if metadata.len() == 0 {
        return Err(PipelineError::FileEmpty(path.display().to_string()));
    }
    Ok(())
}

/// Loads a JSON array of token records.
pub fn load_tokens(path: &Path) -> Result<Vec<Token>, PipelineError> {
    validate_input_file(path)?;
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|source| PipelineError::InvalidTokens {
        path: path.display().to_string(),
        source,
    })
}

/// Writes token records as pretty-printed JSON.
pub fn write_tokens(path: &Path, tokens: &[Token]) -> Result<(), PipelineError> {
    let file = fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, tokens).map_err(|source| {
        PipelineError::InvalidTokens {
            path: path.display().to_string(),
            source,
        }
    })
}

/// Loads a JSON manifest listing the jobs of a batch run.
pub fn load_manifest(path: &Path) -> Result<Vec<AlignJob>, PipelineError> {
    validate_input_file(path)?;
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|source| PipelineError::InvalidManifest {
        path: path.display().to_string(),
        source,
    })
}

/// Runs a single alignment job end to end.
///
/// A transcript that parses to zero segments is an error here even though
/// the aligner itself treats it as a no-op: writing an untouched copy of
/// the input would silently hide a misformatted transcript.
pub fn run_job(job: &AlignJob) -> Result<JobReport, PipelineError> {
    let tokens = load_tokens(&job.tokens)?;

    validate_input_file(&job.transcript)?;
    let raw = fs::read_to_string(&job.transcript)?;
    let parsed = parse_segments(&raw);

    if parsed.is_empty() {
        return Err(PipelineError::NoSegments(
            job.transcript.display().to_string(),
        ));
    }
    if parsed.skipped_lines > 0 {
        warn!(
            transcript = %job.transcript.display(),
            skipped = parsed.skipped_lines,
            "transcript contained non-segment lines"
        );
    }

    let span_start = parsed.segments[0].start;
    let span_end = parsed.segments[parsed.segments.len() - 1].end;
    let token_count = tokens.len();

    let aligned = align(tokens, &parsed.segments, job.fallback)?;
    write_tokens(&job.output, &aligned)?;

    let report = JobReport {
        tokens: token_count,
        segments: parsed.segments.len(),
        skipped_lines: parsed.skipped_lines,
        span_start,
        span_end,
        time_per_token: if token_count == 0 {
            0.0
        } else {
            (span_end - span_start) / token_count as f64
        },
    };

    info!(
        tokens = report.tokens,
        segments = report.segments,
        skipped = report.skipped_lines,
        span_start = report.span_start,
        span_end = report.span_end,
        output = %job.output.display(),
        "alignment job complete"
    );

    Ok(report)
}

/// Runs every job in order, stopping at the first failure.
pub fn run_batch(jobs: &[AlignJob]) -> Result<Vec<JobReport>, PipelineError> {
    let mut reports = Vec::with_capacity(jobs.len());
    for job in jobs {
        reports.push(run_job(job)?);
    }
    Ok(reports)
}
