//! hfdatasets: manage your datasets on the Hugging Face Hub.
//!
//! Upload local dataset directories, download remote datasets (whole or per
//! configuration), list an author's datasets and delete datasets after
//! confirmation.
//!
//! # Modules
//!
//! - [`hf`]: Hub capability trait, its production adapter and shared types
//! - [`store`]: Local dataset directories
//! - [`workflow`]: Download, upload and removal orchestration
//! - [`listing`]: Dataset listing, filtering and the listing report
//! - [`error`]: Error types for hfdatasets operations

pub mod error;
pub mod hf;
pub mod listing;
pub mod logging;
pub mod store;
pub mod workflow;

use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use tracing::{info, warn};

pub use error::HfDatasetsError;

use hf::{HubClient, HubSettings, RepoId, Visibility};
use listing::Lister;
use store::DiskStore;
use workflow::{LinePrompt, TransferWorkflow};

/// Namespace listed when `list` is called without `-u`.
pub const DEFAULT_LIST_USER: &str = "ATLASBIOINFO";

/// The hfdatasets CLI application.
#[derive(Parser)]
#[command(name = "hfdatasets")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    hub: HubArgs,

    /// Increase log output (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn verbosity(&self) -> i8 {
        if self.quiet {
            -1
        } else {
            i8::try_from(self.verbose).unwrap_or(i8::MAX)
        }
    }
}

/// Hub connection options shared by every subcommand.
#[derive(clap::Args)]
struct HubArgs {
    /// Hugging Face access token (defaults to the token saved by `huggingface-cli login`).
    #[arg(long, global = true, env = "HF_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Hub endpoint.
    #[arg(long, global = true, env = "HF_ENDPOINT", default_value = hf::DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Dataset viewer endpoint used to discover configurations.
    #[arg(
        long,
        global = true,
        env = "HF_DATASETS_SERVER",
        default_value = hf::DEFAULT_VIEWER_ENDPOINT
    )]
    viewer_endpoint: String,
}

impl From<HubArgs> for HubSettings {
    fn from(args: HubArgs) -> Self {
        HubSettings {
            endpoint: args.endpoint,
            viewer_endpoint: args.viewer_endpoint,
            token: args.token.filter(|token| !token.is_empty()),
        }
    }
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Upload dataset to Hugging Face Hub.
    Upload(UploadArgs),
    /// List available datasets on Hugging Face Hub.
    List(ListArgs),
    /// Remove dataset from Hugging Face Hub.
    Remove(RemoveArgs),
    /// Download dataset from Hugging Face Hub.
    Download(DownloadArgs),
    /// Check dataset statistics from Hugging Face Hub (reserved, not implemented).
    Check(CheckArgs),
}

#[derive(clap::Args)]
struct UploadArgs {
    /// Path to the local dataset.
    #[arg(short = 'i', value_name = "PATH")]
    input: PathBuf,

    /// Repository name for upload (format: username/repo_name). Default is the dataset folder name.
    #[arg(short = 'r', value_name = "REPO")]
    repo: Option<String>,

    /// Make dataset public (default: false).
    #[arg(
        short = 'p',
        value_name = "BOOL",
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true",
        value_parser = BoolishValueParser::new(),
        action = ArgAction::Set
    )]
    public: bool,
}

#[derive(clap::Args)]
struct ListArgs {
    /// Hugging Face username.
    #[arg(short = 'u', value_name = "USER", default_value = DEFAULT_LIST_USER)]
    user: String,

    /// Filter datasets by keyword (case-insensitive regular expression).
    #[arg(short = 'f', value_name = "KEYWORD")]
    filter: Option<String>,
}

#[derive(clap::Args)]
struct RemoveArgs {
    /// Repository name to remove (format: username/repo_name).
    repo_id: String,

    /// Force deletion without confirmation (default: false).
    #[arg(
        short = 'f',
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true",
        value_parser = BoolishValueParser::new(),
        action = ArgAction::Set
    )]
    force: bool,
}

#[derive(clap::Args)]
struct DownloadArgs {
    /// Repository name to download (format: username/repo_name).
    repo_id: String,

    /// Output directory path.
    #[arg(short = 'o', value_name = "DIR", default_value = "./")]
    output: PathBuf,

    /// Download every configuration into its own subdirectory.
    #[arg(long)]
    all_configs: bool,
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Repository name to check (format: username/repo_name).
    repo_id: String,
}

/// Run the hfdatasets CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`, which
/// reports a returned error once on stderr.
pub fn run() -> Result<(), HfDatasetsError> {
    let cli = Cli::parse();
    logging::init(cli.verbosity());

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let client = HubClient::new(cli.hub.into());
    let store = DiskStore;

    match command {
        Commands::Upload(args) => run_upload(&client, &store, args),
        Commands::List(args) => run_list(&client, args),
        Commands::Remove(args) => run_remove(&client, &store, args),
        Commands::Download(args) => run_download(&client, &store, args),
        Commands::Check(args) => run_check(args),
    }
}

fn run_upload(
    client: &HubClient,
    store: &DiskStore,
    args: UploadArgs,
) -> Result<(), HfDatasetsError> {
    let target = hf::resolve::parse_upload_target(args.repo.as_deref(), &args.input)?;
    let visibility = Visibility::from_public_flag(args.public);
    info!(%target, %visibility, "uploading dataset to Hugging Face Hub");

    TransferWorkflow::new(client, store).upload(&args.input, &target, visibility)?;
    Ok(())
}

fn run_list(client: &HubClient, args: ListArgs) -> Result<(), HfDatasetsError> {
    let outcome = Lister::new(client).list(&args.user, args.filter.as_deref());
    print!("{outcome}");
    Ok(())
}

fn run_remove(
    client: &HubClient,
    store: &DiskStore,
    args: RemoveArgs,
) -> Result<(), HfDatasetsError> {
    let repo_id = RepoId::parse(&args.repo_id)?;
    let mut prompt = LinePrompt::stdio();

    TransferWorkflow::new(client, store).remove(&repo_id, args.force, &mut prompt)?;
    Ok(())
}

fn run_download(
    client: &HubClient,
    store: &DiskStore,
    args: DownloadArgs,
) -> Result<(), HfDatasetsError> {
    let repo_id = RepoId::parse(&args.repo_id)?;
    let workflow = TransferWorkflow::new(client, store);

    if args.all_configs {
        let results = workflow.download_all(&repo_id, &args.output)?;
        info!(configs = results.len(), "all configurations downloaded");
    } else {
        workflow.download_whole(&repo_id, &args.output)?;
    }
    Ok(())
}

fn run_check(args: CheckArgs) -> Result<(), HfDatasetsError> {
    warn!(
        repo_id = %args.repo_id,
        "the check command is reserved and not implemented yet"
    );
    Cli::command().print_help()?;
    Ok(())
}
