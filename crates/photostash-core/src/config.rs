use config::{Config, ConfigError, Environment, File as ConfigFile};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Error;

pub const DEFAULT_INDEX_FILE: &str = "/var/tmp/picture-data-cache.json";
pub const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub directories: Vec<String>,
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    /// Discard the persisted index before scanning.
    #[serde(default)]
    pub rescan: bool,
    #[serde(default)]
    pub only_images: bool,
    #[serde(default = "default_threads")]
    pub threads: usize,
    #[serde(default = "default_index_file")]
    pub index_file: PathBuf,
    pub hash_tree_dir: Option<PathBuf>,
    pub date_tree_dir: Option<PathBuf>,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub remote: RemoteConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteConfig {
    pub uri: Option<String>,
    pub access_key_id: Option<String>,
    #[serde(skip_serializing)]
    pub secret_access_key: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    pub endpoint: Option<String>,
}

fn default_threads() -> usize {
    1
}

fn default_index_file() -> PathBuf {
    PathBuf::from(DEFAULT_INDEX_FILE)
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            uri: None,
            access_key_id: None,
            secret_access_key: None,
            region: default_region(),
            endpoint: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            directories: Vec::new(),
            ignore_patterns: Vec::new(),
            rescan: false,
            only_images: false,
            threads: default_threads(),
            index_file: default_index_file(),
            hash_tree_dir: None,
            date_tree_dir: None,
            verbose: false,
            remote: RemoteConfig::default(),
        }
    }
}

impl AppConfig {
    /// Worker count, never below one.
    pub fn worker_threads(&self) -> usize {
        self.threads.max(1)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.directories.is_empty() {
            return Err(Error::Other(
                "You must specify at least one directory".to_string(),
            ));
        }
        if self.date_tree_dir.is_some() && self.hash_tree_dir.is_none() {
            return Err(Error::Other(
                "A date tree links into the hash tree, so a hash tree directory is required"
                    .to_string(),
            ));
        }
        if self.remote.uri.is_some() && self.hash_tree_dir.is_none() {
            return Err(Error::Other(
                "Remote sync mirrors the hash tree, so a hash tree directory is required"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Merge `~/.photostash.*`, `./Config.*` and `PHOTOSTASH_*` environment variables.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();
    if let Some(dirs) = BaseDirs::new() {
        let user_file = dirs.home_dir().join(".photostash");
        builder = builder.add_source(
            ConfigFile::with_name(&user_file.to_string_lossy()).required(false),
        );
    }
    builder
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(environment())
        .build()?
        .try_deserialize::<AppConfig>()
}

/// `PHOTOSTASH_THREADS`, `PHOTOSTASH_REMOTE__REGION`: one `_` after the
/// prefix, `__` between nested keys.
fn environment() -> Environment {
    Environment::with_prefix("PHOTOSTASH")
        .prefix_separator("_")
        .separator("__")
}

/// Remove directories that are subdirectories of other directories in the list.
pub fn non_overlapping_directories(dirs: Vec<String>) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();

    for dir in dirs {
        let dir_path = Path::new(&dir);
        if result.iter().any(|kept| dir_path.starts_with(kept)) {
            continue;
        }
        result.retain(|kept| !Path::new(kept).starts_with(dir_path));
        result.push(dir);
    }

    result
}
