use std::path::PathBuf;

use aerosweep::commands::{self, LabeledFile, PlotTarget, RunOptions};
use aerosweep::{LogPolicy, default_log_dir};
use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "aerosweep")]
#[command(about = "Parameter sweeps and output plotting for external turbine simulators")]
struct Args {
    /// Directory for the aerosweep log (default: ~/.aerosweep/)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Trim the log once it grows past this many MiB
    #[arg(long, default_value_t = 5, global = true)]
    log_max_mib: u64,

    /// MiB of recent log entries kept by a trim
    #[arg(long, default_value_t = 1, global = true)]
    log_keep_mib: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Expand a sweep file and print its case matrix
    Cases {
        /// Sweep definition (YAML)
        file: PathBuf,
    },

    /// Expand a sweep file and run every case
    Run {
        /// Sweep definition (YAML)
        file: PathBuf,

        /// Maximum concurrently running cases
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Use the full simulation length for wind cases
        #[arg(long)]
        full: bool,

        /// Write inputs and the case matrix without launching anything
        #[arg(long)]
        dry_run: bool,

        /// Override the output directory from the sweep file
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Load output files and plot or export selected channels
    Plot(PlotArgs),
}

#[derive(ClapArgs, Debug)]
struct PlotArgs {
    /// Output file with its label, as LABEL=PATH (repeatable)
    #[arg(short, long = "file", required = true)]
    files: Vec<LabeledFile>,

    /// Channels to select, comma separated
    #[arg(short, long, value_delimiter = ',', required = true)]
    channels: Vec<String>,

    /// Write one CSV per channel into this directory
    #[arg(long, conflicts_with = "json")]
    csv: Option<PathBuf>,

    /// Write all series into one JSON document
    #[arg(long)]
    json: Option<PathBuf>,
}

impl PlotArgs {
    fn target(&self) -> PlotTarget {
        match (&self.csv, &self.json) {
            (Some(dir), _) => PlotTarget::Csv(dir.clone()),
            (None, Some(path)) => PlotTarget::Json(path.clone()),
            (None, None) => PlotTarget::Terminal,
        }
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let log_dir = args.log_dir.unwrap_or_else(default_log_dir);
    LogPolicy::new(log_dir, args.log_level)
        .with_limits_mib(args.log_max_mib, args.log_keep_mib)
        .init()?;

    match args.command {
        Command::Cases { file } => commands::cases(&file)?,
        Command::Run {
            file,
            jobs,
            full,
            dry_run,
            output_dir,
        } => {
            let options = RunOptions {
                jobs,
                full,
                dry_run,
                output_dir,
            };
            let results = commands::run(&file, &options)?;
            let failed = results.iter().filter(|r| !r.is_success()).count();
            if failed > 0 {
                color_eyre::eyre::bail!("{failed} of {} case(s) failed", results.len());
            }
        }
        Command::Plot(plot) => {
            let target = plot.target();
            commands::plot(&plot.files, &plot.channels, &target)?;
            if target == PlotTarget::Terminal
                && let Err(err) = ratatui::try_restore()
            {
                tracing::error!("Failed to restore terminal: {err}");
            }
        }
    }

    tracing::info!("aerosweep finished");
    Ok(())
}
