use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "photostash")]
#[command(about = "Content-addressed photo backup", long_about = None)]
pub struct Cli {
    /// Force debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Index directories, build the hash and date trees, and sync to S3
    Backup(BackupArgs),
    /// Print the indexed record for a hash or a path as JSON
    Lookup(LookupArgs),
    /// Print total and deduplicated sizes of the persisted index
    Stats,
    /// Print configuration values
    PrintConfig,
}

/// Flags override the merged configuration field by field.
#[derive(Debug, Args)]
pub struct BackupArgs {
    /// Directory to scan; repeat for several
    #[arg(short = 'd', long = "directory")]
    pub directories: Vec<String>,

    /// Hash tree root
    #[arg(short = 'u', long = "hash-tree")]
    pub hash_tree_dir: Option<PathBuf>,

    /// Date tree root, requires a hash tree
    #[arg(short = 'b', long = "date-tree")]
    pub date_tree_dir: Option<PathBuf>,

    /// Discard the persisted index before scanning
    #[arg(short, long)]
    pub rescan: bool,

    /// Only index files that look like images
    #[arg(short = 'i', long)]
    pub only_images: bool,

    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Index file location
    #[arg(short = 'f', long = "index-file")]
    pub index_file: Option<PathBuf>,

    /// Remote target, s3://bucket/prefix
    #[arg(short = 'p', long = "remote")]
    pub remote_uri: Option<String>,

    #[arg(short = 'a', long)]
    pub access_key_id: Option<String>,

    #[arg(short = 's', long)]
    pub secret_access_key: Option<String>,

    #[arg(long)]
    pub region: Option<String>,

    /// Endpoint of an S3-compatible store
    #[arg(long)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Args)]
pub struct LookupArgs {
    #[arg(long)]
    pub hash: Option<String>,

    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Index file location
    #[arg(short = 'f', long = "index-file")]
    pub index_file: Option<PathBuf>,
}
