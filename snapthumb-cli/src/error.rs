//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent
//! formatting and appropriate exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;
use snapthumb::cache::ThumbnailError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Failed to create the thumbnail cache
    CacheInit(ThumbnailError),
    /// Thumbnail generation resolved to not-found
    Generate(PathBuf),
    /// Failed to clear the cache directory
    CacheClear(ThumbnailError),
    /// Failed to enumerate files for pregeneration
    Walk { dir: PathBuf, error: String },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::Generate(_) = self {
            eprintln!();
            eprintln!("The file may be missing, unreadable, or not a decodable image.");
            eprintln!("Run with RUST_LOG=debug for the underlying cause.");
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::CacheInit(err) => write!(f, "Failed to open thumbnail cache: {}", err),
            CliError::Generate(path) => {
                write!(f, "Could not generate a thumbnail for {}", path.display())
            }
            CliError::CacheClear(err) => write!(f, "Failed to clear the cache: {}", err),
            CliError::Walk { dir, error } => {
                write!(f, "Failed to scan {}: {}", dir.display(), error)
            }
        }
    }
}

impl std::error::Error for CliError {}
