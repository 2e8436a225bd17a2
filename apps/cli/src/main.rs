use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use diarscribe_core::domain::FallbackPolicy as CoreFallback;
use diarscribe_core::pipeline::{AlignJob, JobReport, load_manifest, run_batch, run_job};
use diarscribe_core::transcript::parse_segments;
use miette::{Context, IntoDiagnostic, Result, set_panic_hook};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliFallback {
    /// Assign gap tokens to the last segment's speaker
    Last,
    /// Assign gap tokens to the nearest segment's speaker
    Nearest,
    /// Leave gap tokens without a speaker
    Unassigned,
}

impl From<CliFallback> for CoreFallback {
    fn from(cli: CliFallback) -> Self {
        match cli {
            CliFallback::Last => CoreFallback::LastSegment,
            CliFallback::Nearest => CoreFallback::NearestSegment,
            CliFallback::Unassigned => CoreFallback::Unassigned,
        }
    }
}

#[derive(Parser)]
#[command(name = "diarscribe")]
#[command(about = "Token-level speaker alignment for diarized transcripts", version)]
struct Cli {
    #[command(subcommand)]
    command: Resource,
}

#[derive(Subcommand)]
enum Resource {
    Tokens {
        #[command(subcommand)]
        action: TokensAction,
    },
    Transcript {
        #[command(subcommand)]
        action: TranscriptAction,
    },
}

#[derive(Subcommand)]
enum TokensAction {
    /// Align an unaligned token file against a diarized transcript
    Align {
        #[arg(short, long)]
        tokens: PathBuf,
        #[arg(short = 'r', long)]
        transcript: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(short, long, value_enum, default_value_t = CliFallback::Last)]
        fallback: CliFallback,
    },
    /// Run every alignment job listed in a JSON manifest
    Batch {
        #[arg(short, long)]
        manifest: PathBuf,
    },
}

#[derive(Subcommand)]
enum TranscriptAction {
    /// Parse a transcript and summarize its speaker segments
    Inspect {
        #[arg(short, long)]
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    set_panic_hook();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Resource::Tokens { action } => match action {
            TokensAction::Align {
                tokens,
                transcript,
                output,
                fallback,
            } => {
                print_banner();
                println!("   {:<12} {}", "TOKENS:".dimmed(), tokens.display());
                println!("   {:<12} {}", "TRANSCRIPT:".dimmed(), transcript.display());
                println!();

                let job = AlignJob {
                    tokens,
                    transcript,
                    output: output.clone(),
                    fallback: fallback.into(),
                };
                let report = run_job(&job).wrap_err("Alignment failed")?;

                println!("   {}", "✔ ALIGNMENT COMPLETE".green().bold());
                print_report(&report);
                println!("   {:<12} {}", "Output:".dimmed(), output.display());
                println!();
            }
            TokensAction::Batch { manifest } => {
                print_banner();
                println!("   {:<12} {}", "MANIFEST:".dimmed(), manifest.display());
                println!();

                let jobs = load_manifest(&manifest).wrap_err("Could not load manifest")?;
                println!(
                    "   {:<12} {}",
                    "JOBS:".dimmed(),
                    jobs.len().to_string().yellow().bold()
                );

                let reports = run_batch(&jobs).wrap_err("Batch run failed")?;
                println!("   {}", "✔ BATCH COMPLETE".green().bold());
                for (job, report) in jobs.iter().zip(&reports) {
                    println!(
                        "   {:<12} {} tokens, {} segments → {}",
                        "Job:".dimmed(),
                        report.tokens.to_string().yellow(),
                        report.segments.to_string().yellow(),
                        job.output.display()
                    );
                }
                println!();
            }
        },
        Resource::Transcript { action } => match action {
            TranscriptAction::Inspect { file } => {
                print_banner();

                let raw = std::fs::read_to_string(&file)
                    .into_diagnostic()
                    .wrap_err("Could not read transcript")?;
                let parsed = parse_segments(&raw);

                println!("   {:<12} {}", "FILE:".dimmed(), file.display());
                println!(
                    "   {:<12} {}",
                    "Segments:".dimmed(),
                    parsed.segments.len().to_string().yellow().bold()
                );
                println!(
                    "   {:<12} {}",
                    "Skipped:".dimmed(),
                    parsed.skipped_lines.to_string().yellow()
                );
                for segment in &parsed.segments {
                    println!(
                        "   {:>8.2}s – {:>8.2}s  {}  {}",
                        segment.start,
                        segment.end,
                        format!("SPEAKER_{:02}", segment.speaker).blue().bold(),
                        segment.text
                    );
                }
                println!();
            }
        },
    }

    Ok(())
}

fn print_report(report: &JobReport) {
    println!(
        "   {:<12} {}",
        "Tokens:".dimmed(),
        report.tokens.to_string().yellow()
    );
    println!(
        "   {:<12} {} ({} lines skipped)",
        "Segments:".dimmed(),
        report.segments.to_string().yellow(),
        report.skipped_lines
    );
    println!(
        "   {:<12} {:.2}s – {:.2}s ({:.2}s total)",
        "Span:".dimmed(),
        report.span_start,
        report.span_end,
        report.duration()
    );
    println!(
        "   {:<12} {:.3}s",
        "Per token:".dimmed(),
        report.time_per_token
    );
}

fn print_banner() {
    println!();
    println!("   {}", "DIARSCRIBE ALIGNMENT ENGINE".bold());
    println!("   {}", "===========================".dimmed());
}
