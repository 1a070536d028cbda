use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "compsync",
    about = "Inspect compsync storage caches and state documents",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Runtime configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Cache directory, overriding the configuration
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Inspect the local blob cache
    Cache(CacheArgs),
    /// Work with saved state documents
    Doc(DocArgs),
}

#[derive(Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// Count blobs and total size
    Stats,
    /// Print one cached blob
    Show {
        /// Full hex hash of the blob
        hash: String,
        /// Dump the whole blob as hex instead of a preview
        #[arg(long)]
        raw: bool,
    },
    /// List the hashes a storage document references and whether they are cached
    Refs {
        /// A storage.json written by a save or a snapshot case
        storage: PathBuf,
    },
}

#[derive(Args)]
pub struct DocArgs {
    #[command(subcommand)]
    pub action: DocAction,
}

#[derive(Subcommand)]
pub enum DocAction {
    /// Show changes between two state documents
    Diff { old: PathBuf, new: PathBuf },
}
