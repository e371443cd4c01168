//! The include resolver collaborator.

use crate::error::{IncludeError, IncludeResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Resolves a `?[path]` include relative to the including document's base
/// directory, joining it with the relative path before reading.
pub trait IncludeResolver {
    /// Returns the included file's content and its resolved absolute path.
    fn resolve(&self, base: &Path, relative: &str) -> IncludeResult<(String, PathBuf)>;
}

/// Default collaborator: reads from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsIncludeResolver;

impl IncludeResolver for FsIncludeResolver {
    fn resolve(&self, base: &Path, relative: &str) -> IncludeResult<(String, PathBuf)> {
        let path = base.join(relative);
        let content = fs::read_to_string(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                IncludeError::NotFound(path.clone())
            } else {
                IncludeError::Io {
                    path: path.clone(),
                    source,
                }
            }
        })?;
        Ok((content, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn resolves_sibling_file_relative_to_base() {
        let dir = std::env::temp_dir().join(format!(
            "gularen-include-test-{}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("other.gr");
        let mut f = fs::File::create(&file).unwrap();
        write!(f, "hello").unwrap();

        let resolver = FsIncludeResolver;
        let (content, resolved) = resolver.resolve(&dir, "other.gr").unwrap();
        assert_eq!(content, "hello");
        assert_eq!(resolved, file);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_file_is_not_found() {
        let resolver = FsIncludeResolver;
        let err = resolver
            .resolve(Path::new("/nonexistent-gularen-dir"), "missing.gr")
            .unwrap_err();
        assert!(matches!(err, IncludeError::NotFound(_)));
    }
}
