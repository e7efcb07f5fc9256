//! talkturn - Assign speakers to a Whisper-style transcript.

mod format;
mod wav;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use talkturn_diarize::{
    parse_transcript, AudioSource, CancelFlag, DiarizeConfig, Diarizer, Strategy,
};
use tracing_subscriber::EnvFilter;

/// Assign speakers to a Whisper-style transcript.
///
/// Reads the transcript JSON (either the full verbose document or a bare
/// segment array) and labels every span with a speaker. Pass the matching
/// WAV recording to enable word-level analysis, the most precise strategy.
#[derive(Parser, Debug)]
#[command(name = "talkturn")]
#[command(about = "Speaker diarization for timed transcripts")]
#[command(version)]
struct Args {
    /// Transcript JSON file
    #[arg(short = 't', long)]
    transcript: PathBuf,

    /// WAV recording the transcript was made from
    #[arg(short = 'a', long)]
    audio: Option<PathBuf>,

    /// Language code for speaker labels (e.g. en, es, de)
    #[arg(short = 'l', long, default_value = "auto")]
    language: String,

    /// Clustering strategy
    #[arg(short = 's', long, value_enum, default_value_t = StrategyArg::Auto)]
    strategy: StrategyArg,

    /// Output as JSON instead of a formatted transcript
    #[arg(long)]
    json: bool,

    /// Annotate speaker turns with their speaking rate
    #[arg(long)]
    rates: bool,

    /// Output file (default: stdout)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Quiet mode (less output)
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Verbose output
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    /// Word-level when audio is given, then segment strategies
    Auto,
    /// Per-word clustering (requires --audio)
    Word,
    /// Profile-matching segment clustering
    Enhanced,
    /// Pause-gated segment clustering
    Basic,
    /// Assign everything to one speaker
    Single,
}

impl StrategyArg {
    fn strategies(self) -> Vec<Strategy> {
        match self {
            StrategyArg::Auto => vec![
                Strategy::WordLevel,
                Strategy::EnhancedSegment,
                Strategy::BasicSegment,
            ],
            StrategyArg::Word => vec![Strategy::WordLevel],
            StrategyArg::Enhanced => vec![Strategy::EnhancedSegment],
            StrategyArg::Basic => vec![Strategy::BasicSegment],
            StrategyArg::Single => vec![Strategy::SingleSpeaker],
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if args.strategy == StrategyArg::Word && args.audio.is_none() {
        anyhow::bail!("--strategy word requires --audio");
    }

    let json = fs::read_to_string(&args.transcript)
        .with_context(|| format!("failed to read {}", args.transcript.display()))?;
    let spans = parse_transcript(&json).context("failed to parse transcript JSON")?;

    let cfg = DiarizeConfig {
        language: args.language.clone(),
        strategies: args.strategy.strategies(),
        ..DiarizeConfig::default()
    };
    let sample_rate = cfg.sample_rate;

    let clip = match &args.audio {
        Some(path) => Some(wav::load_wav(path, sample_rate)?),
        None => None,
    };

    let diarizer = Diarizer::new(cfg);
    let run = diarizer.diarize(
        &spans,
        clip.as_ref().map(|c| c as &dyn AudioSource),
        &CancelFlag::new(),
    )?;

    if !args.quiet {
        eprintln!(
            "{} speaker(s) across {} span(s) via {}",
            run.speakers,
            run.spans.len(),
            run.strategy
        );
    }

    let rendered = if args.json {
        serde_json::to_string_pretty(&run).context("failed to encode result")?
    } else {
        format::render(&run, &args.language, args.rates)
    };

    match &args.output {
        Some(path) => {
            fs::write(path, rendered.as_bytes())
                .with_context(|| format!("failed to write {}", path.display()))?;
            if !args.quiet {
                eprintln!("wrote {}", path.display());
            }
        }
        None => println!("{rendered}"),
    }

    Ok(())
}
