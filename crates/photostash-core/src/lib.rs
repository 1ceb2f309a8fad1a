pub mod config;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod index;
pub mod media;
pub mod platform;
pub mod pool;
pub mod progress;
pub mod remote;
pub mod scanner;
pub mod tree;

pub use config::AppConfig;
pub use engine::{RunSummary, StashEngine};
pub use error::{EntryFailure, Error};
pub use index::{ContentIndex, FileMetadata, LookupKey};
pub use progress::{ProgressReporter, SilentReporter, Stage};
