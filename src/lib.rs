mod commands;
pub mod db;
pub mod detection;
pub mod export;
pub mod models;
pub mod ocr;
pub mod processing;
pub mod recipe;
pub mod session;
pub mod settings;
pub mod storage;
pub mod utils;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use db::Database;
use export::{ExportFormat, Exporter};
use ocr::FixtureRecognizer;
use session::ScanController;
use settings::SettingsStore;
use storage::ImageStore;

pub(crate) struct AppState {
    pub(crate) controller: ScanController,
    pub(crate) recognizer: Arc<FixtureRecognizer>,
}

impl AppState {
    async fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let database = Database::new(data_dir.join("shelf.sqlite3"))?;
        let settings = SettingsStore::new(data_dir.join("settings.json"))?;
        let recognizer = Arc::new(FixtureRecognizer::new());

        let controller = ScanController::new(
            database,
            recognizer.clone(),
            Arc::new(settings),
            ImageStore::new(data_dir),
            Exporter::new(data_dir.join("exports")),
        );

        // Scans that were live when the last run died come back paused.
        for scan_id in controller.recover().await? {
            log::warn!("Recovered interrupted scan {scan_id}; marked as paused");
        }

        Ok(Self {
            controller,
            recognizer,
        })
    }
}

#[derive(Parser)]
#[command(name = "shelf", version, about = "Scan cookbooks into Markdown recipes")]
struct Cli {
    /// Where scans, images, exports and settings live.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a scan session over a directory of recorded frames.
    Replay(ReplayArgs),
    /// List stored scans.
    List,
    /// Show a stored scan.
    Show {
        scan_id: String,
        /// Print the full scan as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Export a stored scan.
    Export {
        scan_id: String,
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
        /// Also copy the export into this directory.
        #[arg(long)]
        share_dir: Option<PathBuf>,
    },
    /// Delete a scan with its pages and images.
    Delete { scan_id: String },
    /// Print what the pipeline sees in a single frame.
    Inspect { frame: PathBuf },
}

#[derive(Args)]
pub(crate) struct ReplayArgs {
    /// Directory of frames (images with recognition sidecars, or bare JSON).
    pub(crate) frames: PathBuf,
    #[arg(long)]
    pub(crate) name: String,
    #[arg(long)]
    pub(crate) cookbook: Option<String>,
    #[arg(long)]
    pub(crate) author: Option<String>,
    #[arg(long)]
    pub(crate) notes: Option<String>,
    /// Export the scan once the frames run out.
    #[arg(long)]
    pub(crate) export: bool,
    #[arg(long, value_enum)]
    pub(crate) format: Option<FormatArg>,
}

#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum FormatArg {
    Markdown,
    Json,
}

impl From<FormatArg> for ExportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Markdown => ExportFormat::Markdown,
            FormatArg::Json => ExportFormat::Json,
        }
    }
}

fn default_data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("shelf"))
        .ok_or_else(|| anyhow!("no data directory on this platform; pass --data-dir"))
}

async fn dispatch(cli: Cli) -> Result<()> {
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };
    let state = AppState::open(&data_dir).await?;

    match cli.command {
        Command::Replay(args) => commands::replay(&state, args).await,
        Command::List => commands::list(&state).await,
        Command::Show { scan_id, json } => commands::show(&state, &scan_id, json).await,
        Command::Export {
            scan_id,
            format,
            share_dir,
        } => commands::export(&state, &scan_id, format.map(Into::into), share_dir).await,
        Command::Delete { scan_id } => commands::delete(&state, &scan_id).await,
        Command::Inspect { frame } => commands::inspect(&state, &frame),
    }
}

pub fn run() {
    utils::logging::init_logging();

    log::info!("Shelf starting up...");

    let cli = Cli::parse();
    let result = tokio::runtime::Runtime::new()
        .context("failed to start the async runtime")
        .and_then(|runtime| runtime.block_on(dispatch(cli)));

    if let Err(err) = result {
        log::error!("{err:#}");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
