//! Error types for the include-resolution seam.

use std::path::PathBuf;
use thiserror::Error;

/// Failure modes of an [`crate::include::IncludeResolver`]: one `thiserror`
/// variant per distinguishable failure, each carrying the path that failed.
#[derive(Debug, Error)]
pub enum IncludeError {
    #[error("include not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read include {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type IncludeResult<T> = Result<T, IncludeError>;
