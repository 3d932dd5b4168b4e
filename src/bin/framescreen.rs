use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;

use framescreen::{
    BatchOptions, CancellationToken, ContentSafetyClient, OperationType, ProgressCallback,
    ProgressInfo, ReportFormat, RetryPolicy, ScreeningOptions, ServiceCredentials, VideoScreener,
};

const CLI_AFTER_HELP: &str = "Examples:\n  framescreen scan input.mp4\n  framescreen scan input.mp4 --rate 2 --format json --out report.json --progress\n  framescreen extract input.mp4 --out frames --rate 0.5\n  framescreen completions zsh > _framescreen\n\nEnvironment:\n  CONTENT_SAFETY_ENDPOINT  Content Safety resource endpoint\n  CONTENT_SAFETY_KEY       Content Safety subscription key";

#[derive(Debug, Parser)]
#[command(
    name = "framescreen",
    version,
    about = "Find the time ranges of a video that a moderation service flags as unsafe",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show additional logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar.
    #[arg(long, global = true)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long, global = true)]
    overwrite: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Sample, classify, and write the unsafe ranges report.
    #[command(
        about = "Screen a video for unsafe content",
        after_help = "Examples:\n  framescreen scan input.mp4\n  framescreen scan input.mp4 --format frames --out frames.txt --concurrency 4"
    )]
    Scan {
        /// Video file. Prompted for when omitted.
        video: Option<PathBuf>,

        /// Frames sampled per second of video.
        #[arg(long, default_value_t = 1.0)]
        rate: f64,

        /// Report layout: ranges | frames | json.
        #[arg(long, default_value = "ranges")]
        format: String,

        /// Report path. Defaults to a name derived from the format.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Maximum requests in flight.
        #[arg(long, default_value_t = 8)]
        concurrency: usize,

        /// Minimum milliseconds between request starts.
        #[arg(long, default_value_t = 200)]
        interval_ms: u64,

        /// Seconds before a single request is abandoned.
        #[arg(long, default_value_t = 30)]
        request_timeout: u64,

        /// Seconds before the whole batch is abandoned (0 waits forever).
        #[arg(long, default_value_t = 600)]
        batch_timeout: u64,

        /// Retries per frame after a transient failure.
        #[arg(long, default_value_t = 2)]
        retries: u32,

        /// Directory under which the temporary frames directory is created.
        #[arg(long)]
        frames_dir: Option<PathBuf>,
    },

    /// Write sampled frames to a directory without classifying them.
    #[command(
        about = "Extract sampled frames",
        after_help = "Examples:\n  framescreen extract input.mp4 --out frames\n  framescreen extract input.mp4 --out frames --rate 4"
    )]
    Extract {
        /// Video file. Prompted for when omitted.
        video: Option<PathBuf>,

        /// Output directory for frame images.
        #[arg(long)]
        out: PathBuf,

        /// Frames sampled per second of video.
        #[arg(long, default_value_t = 1.0)]
        rate: f64,
    },

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();
    framescreen::sync_ffmpeg_log_level(log::max_level());
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

/// Refuse an existing output directory unless overwriting. Nothing is
/// created here; the directory appears only once frames are written.
fn check_output_directory(
    out: &Path,
    overwrite: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if out.exists() {
        if !overwrite {
            return Err(format!(
                "output directory already exists: {} (use --overwrite)",
                out.display()
            )
            .into());
        }
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            format!("writing into existing directory {}", out.display()).yellow()
        );
    }
    Ok(())
}

/// Ask for a video path until an existing file is given.
fn prompt_video_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
    loop {
        let answer: String = Input::new()
            .with_prompt("Path to the video file")
            .interact_text()?;
        let path = PathBuf::from(answer.trim().trim_matches('"'));
        if path.is_file() {
            return Ok(path);
        }
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            format!("no file at {}", path.display()).yellow()
        );
    }
}

fn resolve_video(video: Option<PathBuf>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match video {
        Some(path) => Ok(path),
        None => prompt_video_path(),
    }
}

fn batch_options(
    concurrency: usize,
    interval_ms: u64,
    request_timeout: u64,
    batch_timeout: u64,
    retries: u32,
) -> BatchOptions {
    BatchOptions::new()
        .with_max_concurrency(concurrency)
        .with_submission_interval(Duration::from_millis(interval_ms))
        .with_request_timeout(Duration::from_secs(request_timeout))
        .with_batch_timeout((batch_timeout > 0).then(|| Duration::from_secs(batch_timeout)))
        .with_retry(RetryPolicy::new().with_max_attempts(retries.saturating_add(1)))
}

/// Cancel `token` on the first Ctrl-C.
fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "interrupted, stopping...".yellow());
            token.cancel();
        }
    });
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.green} {msg:<10} {bar:40.cyan/blue} {pos}/{len} ({eta})",
        )?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        let stage = match info.operation {
            OperationType::FrameSampling => "sampling",
            OperationType::Classification => "screening",
            _ => "working",
        };
        self.bar.set_message(stage);
        if let Some(total) = info.total {
            self.bar.set_length(total);
        }
        self.bar.set_position(info.current);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    match cli.command {
        Commands::Scan {
            video,
            rate,
            format,
            out,
            concurrency,
            interval_ms,
            request_timeout,
            batch_timeout,
            retries,
            frames_dir,
        } => {
            let credentials = ServiceCredentials::from_env()?;
            let format: ReportFormat = format.parse()?;
            let out = out.unwrap_or_else(|| PathBuf::from(format.default_file_name()));
            ensure_writable_path(&out, cli.global.overwrite)?;

            let video = resolve_video(video)?;
            let client = ContentSafetyClient::with_timeout(
                &credentials,
                Duration::from_secs(request_timeout),
            )?;

            let token = CancellationToken::new();
            cancel_on_interrupt(token.clone());

            let mut options = ScreeningOptions::new()
                .with_samples_per_second(rate)
                .with_batch(batch_options(
                    concurrency,
                    interval_ms,
                    request_timeout,
                    batch_timeout,
                    retries,
                ))
                .with_cancellation(token);
            if let Some(root) = frames_dir {
                options = options.with_frames_root(root);
            }

            let progress = if cli.global.progress {
                let progress = Arc::new(TerminalProgress::new()?);
                options = options.with_progress(progress.clone());
                Some(progress)
            } else {
                None
            };

            let outcome = VideoScreener::new(client, options).screen(&video).await;
            if let Some(progress) = &progress {
                progress.finish();
            }
            let report = outcome?;

            framescreen::report::save(&out, &report, format)?;

            if report.unavailable_count() > 0 {
                eprintln!(
                    "{} {}",
                    "warning:".yellow().bold(),
                    format!(
                        "{} frame(s) could not be classified; ranges stop at those frames",
                        report.unavailable_count()
                    )
                    .yellow()
                );
            }
            println!(
                "{} {}",
                "success:".green().bold(),
                format!(
                    "Screened {} frame(s), {} unsafe, {} range(s) -> {}",
                    report.frames.len(),
                    report.unsafe_frame_count(),
                    report.ranges.len(),
                    out.display()
                )
                .green()
            );
        }
        Commands::Extract { video, out, rate } => {
            check_output_directory(&out, cli.global.overwrite)?;
            ScreeningOptions::new().with_samples_per_second(rate).validate()?;

            let video = resolve_video(video)?;
            let token = CancellationToken::new();
            cancel_on_interrupt(token.clone());

            let mut options = ScreeningOptions::new()
                .with_samples_per_second(rate)
                .with_cancellation(token);
            let progress = if cli.global.progress {
                let progress = Arc::new(TerminalProgress::new()?);
                options = options.with_progress(progress.clone());
                Some(progress)
            } else {
                None
            };

            let destination = out.clone();
            let outcome = tokio::task::spawn_blocking(move || {
                framescreen::extract_frames(&video, &destination, &options)
            })
            .await?;
            if let Some(progress) = &progress {
                progress.finish();
            }
            let written = outcome?;

            if cli.global.verbose {
                for path in &written {
                    eprintln!("saved {}", path.display());
                }
            }
            println!(
                "{} {}",
                "success:".green().bold(),
                format!("Extracted {} frame(s) to {}", written.len(), out.display()).green()
            );
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "framescreen", &mut std::io::stdout());
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
