use clap::{Parser, Subcommand};
use gallery_optimizer::{config, output, process, video};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gallery-optimizer")]
#[command(about = "Batch image optimizer for photo galleries")]
#[command(long_about = "\
Batch image optimizer for photo galleries

Every JPEG and PNG directly inside the input directory is re-encoded in place,
optionally resized and watermarked, and gets a .webp sibling. The first time a
file is touched, a byte-identical copy is kept in the backup directory; later
runs never overwrite it.

Directory layout:

  media/gallery/
  ├── dawn.jpg          # re-encoded in place
  ├── dawn.webp         # derivative (or in paths.output_dir)
  ├── logo.png
  ├── logo.webp
  ├── notes.txt         # skipped
  └── backup/           # pristine originals, never overwritten
      ├── dawn.jpg
      └── logo.png

Run 'gallery-optimizer gen-config' to generate a documented gallery-optimizer.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// Log debug details to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Optimize every image in the input directory
    Optimize {
        /// Input directory (overrides paths.input_dir)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Print the summary and per-file results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Burn the configured watermark into a video with ffmpeg
    Video {
        /// Video file to process in place
        #[arg(long)]
        input: PathBuf,
        /// ffmpeg binary
        #[arg(long, default_value = "ffmpeg")]
        ffmpeg: PathBuf,
    },
    /// Print a stock gallery-optimizer.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Optimize { input, json } => {
            let mut config = config::load_config(&cli.config)?;
            if let Some(input) = input {
                config.paths.input_dir = input;
            }

            if json {
                let report = process::optimize_directory(&config, None)?;
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }

            println!("==> Optimizing {}", config.paths.input_dir.display());
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    output::print_process_event(&event);
                }
            });
            let result = process::optimize_directory(&config, Some(tx));
            printer.join().ok();
            let report = result?;
            println!();
            output::print_summary(
                &report.summary,
                config.webp.enabled,
                &config.paths.backup_dir(),
            );
        }
        Command::Video { input, ffmpeg } => {
            let config = config::load_config(&cli.config)?;
            let backup_dir = config.paths.backup_dir.clone().unwrap_or_else(|| {
                input
                    .parent()
                    .map(|p| p.join("backup"))
                    .unwrap_or_else(|| PathBuf::from("backup"))
            });
            let mut job = video::VideoJob::new(&input, backup_dir);
            job.ffmpeg = ffmpeg;

            println!("==> Processing video {}", input.display());
            let outcome = video::watermark_video(&job, &config.watermark)?;
            for line in output::format_video_outcome(&input, &outcome) {
                println!("{}", line);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr so stdout stays clean for `--json`.
///
/// `RUST_LOG` wins when set; otherwise `-v` selects debug, default info.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
