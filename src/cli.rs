// Command line interface
// Headless access to track inspection, the gesture library and plan-driven export
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::commands::{CommandError, CompositionPlan, EditorSession};
use crate::state::{GestureLibrary, LoadReport, SessionConfig};

#[derive(Parser)]
#[command(name = "gesture-composer", version, about = "Beat-aligned robot gesture composer")]
struct Cli {
    /// Session config file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TrackArgs {
    /// Beat analysis artifact (JSON)
    #[arg(long)]
    analysis: Option<PathBuf>,

    /// Track audio (defaults to the analysis path with a .wav extension)
    #[arg(long)]
    audio: Option<PathBuf>,

    /// Gesture library directory
    #[arg(long)]
    library: Option<PathBuf>,

    /// Timeline width in pixels
    #[arg(long)]
    width: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show tempo, beats and segments for a track
    Inspect {
        #[command(flatten)]
        track: TrackArgs,
    },

    /// List the gestures in a library directory
    Library {
        /// Library directory (defaults to the configured one)
        dir: Option<PathBuf>,
    },

    /// Place gestures from a plan file and export the merged sequence
    Export {
        #[command(flatten)]
        track: TrackArgs,

        /// Plan file: JSON list of gesture names per segment
        #[arg(long)]
        plan: PathBuf,

        /// Name of the exported file (without extension)
        #[arg(short, long, default_value = "sequence")]
        name: String,

        /// Export directory
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn command_error(error: CommandError) -> anyhow::Error {
    anyhow::anyhow!("{}", error.message())
}

fn load_config(path: Option<&Path>) -> Result<SessionConfig> {
    match path {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(SessionConfig::default()),
    }
}

fn apply_track_args(config: &mut SessionConfig, track: TrackArgs) {
    if let Some(analysis) = track.analysis {
        config.analysis_path = Some(analysis);
    }
    if let Some(audio) = track.audio {
        config.audio_path = Some(audio);
    }
    if let Some(library) = track.library {
        config.library_dir = library;
    }
    if let Some(width) = track.width {
        config.render_width = width;
    }
}

fn print_skipped(report: &LoadReport) {
    for skipped in &report.skipped {
        eprintln!("skipped {}: {}", skipped.path.display(), skipped.reason);
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Inspect { track } => {
            apply_track_args(&mut config, track);
            let (session, report) = EditorSession::open(config).map_err(command_error)?;
            print_skipped(&report);

            let summary = session.summary();
            println!(
                "{} BPM, {} beats, {} ({} px)",
                summary.tempo_bpm, summary.beat_count, summary.duration_label, summary.render_width
            );
            println!("{:>4}  {:>6}  {:>6}  {:>9}  {:>7}  {:>6}", "seg", "start", "end", "start(s)", "beats", "px");
            for segment in &summary.segments {
                println!(
                    "{:>4}  {:>6}  {:>6}  {:>9.2}  {:>7}  {:>6}",
                    segment.index,
                    segment.start_beat,
                    segment.end_beat,
                    segment.start_secs,
                    segment.capacity_beats,
                    segment.width_pixels
                );
            }
        }

        Commands::Library { dir } => {
            let dir = dir.unwrap_or(config.library_dir);
            let (library, report) = GestureLibrary::open(&dir)
                .with_context(|| format!("Failed to open library {}", dir.display()))?;
            print_skipped(&report);

            if library.is_empty() {
                println!("No gestures in {}", dir.display());
            }
            for gesture in library.gestures() {
                println!(
                    "{:<24} {:>6} beats  {:>3} rows  {}",
                    gesture.name(),
                    gesture.beat_length(),
                    gesture.instructions().len(),
                    gesture.color().to_hex()
                );
            }
        }

        Commands::Export {
            track,
            plan,
            name,
            out,
        } => {
            apply_track_args(&mut config, track);
            if let Some(out) = out {
                config.export_dir = out;
            }

            let plan_text = std::fs::read_to_string(&plan)
                .with_context(|| format!("Failed to read plan {}", plan.display()))?;
            let plan: CompositionPlan =
                serde_json::from_str(&plan_text).context("Plan must be a JSON list of name lists")?;

            let (mut session, report) = EditorSession::open(config).map_err(command_error)?;
            print_skipped(&report);

            let applied = session.apply_plan(&plan).map_err(command_error)?;
            for rejection in &applied.rejected {
                eprintln!(
                    "segment {}: '{}' not placed: {}",
                    rejection.segment_index, rejection.gesture, rejection.reason
                );
            }

            for cue in session.cue_list() {
                println!("{:>8}  {}", cue.start_beat, cue.name);
            }

            let path = session.export(&name).map_err(command_error)?;
            println!("Placed {} gestures, exported {}", applied.placed, path.display());
        }
    }

    Ok(())
}
