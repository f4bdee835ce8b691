mod calc;
mod cmd;
mod data;
mod error;
mod geocode;
mod ui;

use clap::{Parser, Subcommand};
use cmd::edit::{Direction, Edit};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Parser)]
#[command(name = "itin", about = "plan a multi-stop trip")]
struct Cli {
    /// Path to the data directory containing config and itinerary files (default: ./config)
    #[arg(long, default_value = "./config")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize data files with a sample itinerary
    Init,
    /// Print every stop with its derived dates
    Show {
        /// Itinerary file (default: <data-dir>/itinerary_default.json)
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Override the trip start (YYYY-MM-DD or MM-DD-YYYY)
        #[arg(short, long)]
        start: Option<String>,
    },
    /// Write the itinerary with derived dates filled in
    Save {
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Output path (default: <data-dir>/itinerary.json)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Look up a place and append it as a new stop
    Add {
        location: String,
        #[arg(short, long, default_value_t = 1)]
        nights: u32,
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Set the nights of stop INDEX (1-based)
    Nights {
        index: usize,
        /// Any text; non-numbers and values below 1 become 1
        #[arg(allow_hyphen_values = true)]
        value: String,
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Swap stop INDEX with its neighbour
    Move {
        index: usize,
        #[arg(value_enum)]
        direction: Direction,
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Delete stop INDEX
    Remove {
        index: usize,
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let data_dir = if cli.data_dir.is_absolute() {
        cli.data_dir.clone()
    } else {
        std::env::current_dir()?.join(&cli.data_dir)
    };
    data::persistence::set_data_dir(data_dir.clone());

    // Auto-init when the data directory is missing or empty and the user did not
    // explicitly invoke the `init` subcommand.
    let is_init_command = matches!(cli.command, Some(Commands::Init));
    if !is_init_command && dir_needs_init(&data_dir) {
        eprintln!(
            "Data directory '{}' is missing or empty, running init...",
            data_dir.display()
        );
        cmd::init::run()?;
    }

    if let Err(e) = init_logging(&data_dir) {
        eprintln!("logging disabled: {e:#}");
    }

    match cli.command {
        None => cmd::root::run(),
        Some(Commands::Init) => cmd::init::run(),
        Some(Commands::Show { file, start }) => cmd::show::run(file.as_deref(), start.as_deref()),
        Some(Commands::Save { file, out }) => cmd::save::run(file.as_deref(), out.as_deref()),
        Some(Commands::Add {
            location,
            nights,
            file,
        }) => cmd::add::run(file.as_deref(), &location, nights),
        Some(Commands::Nights { index, value, file }) => {
            cmd::edit::run(file.as_deref(), Edit::Nights { index, value })
        }
        Some(Commands::Move {
            index,
            direction,
            file,
        }) => cmd::edit::run(file.as_deref(), Edit::Move { index, direction }),
        Some(Commands::Remove { index, file }) => {
            cmd::edit::run(file.as_deref(), Edit::Remove { index })
        }
    }
}

/// Sends tracing output to `<data_dir>/itin.log` so it never lands on the TUI.
fn init_logging(data_dir: &Path) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    std::fs::create_dir_all(data_dir)?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(data_dir.join("itin.log"))?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(log_file));
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,itin=debug".into());

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;
    Ok(())
}

/// Returns true when `dir` does not exist or exists but contains no files.
fn dir_needs_init(dir: &Path) -> bool {
    if !dir.exists() {
        return true;
    }
    dir.read_dir()
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}
