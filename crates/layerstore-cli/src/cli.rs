use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "layerstore",
    about = "Inspect and manage stores declared in a layerstore configuration document",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration document (YAML, TOML or JSON)
    #[arg(
        short,
        long,
        global = true,
        env = "LAYERSTORE_CONFIG",
        default_value = "stores.yaml"
    )]
    pub config: PathBuf,

    /// Store definition to operate on; defaults to the document's `main`
    #[arg(short, long, global = true)]
    pub store: Option<String>,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the object stored under a key
    Get(GetArgs),
    /// Store an object
    Put(PutArgs),
    /// Report whether a key exists
    Exists(KeyArgs),
    /// Delete a key
    Delete(KeyArgs),
    /// List keys
    Keys(KeysArgs),
    /// Copy every object into another store
    Copy(CopyArgs),
    /// Make another store's key set match this one
    Sync(SyncArgs),
    /// Delete every key
    Clear,
    /// List registered store types
    Types,
}

#[derive(Args)]
pub struct GetArgs {
    pub key: String,
    /// Write the object to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct PutArgs {
    pub key: String,
    /// Read the object from a file
    #[arg(short, long, conflicts_with = "data", required_unless_present = "data")]
    pub file: Option<PathBuf>,
    /// Use this text as the object
    #[arg(short, long)]
    pub data: Option<String>,
}

#[derive(Args)]
pub struct KeyArgs {
    pub key: String,
}

#[derive(Args)]
pub struct KeysArgs {
    #[arg(short, long)]
    pub prefix: Option<String>,
}

#[derive(Args)]
pub struct CopyArgs {
    /// Target store definition
    #[arg(long)]
    pub to: String,
    /// Skip keys the target already has
    #[arg(long)]
    pub no_overwrite: bool,
}

#[derive(Args)]
pub struct SyncArgs {
    /// Target store definition
    #[arg(long)]
    pub to: String,
    /// Also delete keys the source does not have
    #[arg(long)]
    pub delete: bool,
}
