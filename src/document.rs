//! The public convenience entry point for parsing documents.

use crate::ast::Node;
use crate::diagnostics::{CollectingSink, Diagnostic};
use crate::include::{FsIncludeResolver, IncludeResolver};
use crate::parser;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Pipeline configuration. `file_inclusion` gates whether `?[path]`
/// directives are resolved and recursively parsed or left as unresolved
/// path-only `document` nodes.
#[derive(Debug, Clone)]
pub struct Config {
    file_inclusion: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self { file_inclusion: true }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file_inclusion(mut self, enabled: bool) -> Self {
        self.file_inclusion = enabled;
        self
    }
}

/// A parsed document: the root node plus every diagnostic raised while
/// parsing it (and, with `file_inclusion` on, while parsing its includes).
#[derive(Debug, Clone)]
pub struct Document {
    pub root: Node,
    pub diagnostics: Vec<Diagnostic>,
}

impl Document {
    /// Parse a source buffer. Includes (if enabled) are resolved relative to
    /// `base_dir`, since there is no backing file to derive it from.
    pub fn parse_string(source: &str, base_dir: impl AsRef<Path>, config: &Config) -> Self {
        Self::parse_with_resolver(source, base_dir.as_ref().to_path_buf(), config, &FsIncludeResolver)
    }

    /// Parse a file from disk; includes resolve relative to its parent
    /// directory.
    pub fn parse_file(path: impl AsRef<Path>, config: &Config) -> io::Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
        let mut doc = Self::parse_with_resolver(&source, base_dir, config, &FsIncludeResolver);
        if let crate::ast::NodeKind::Document { path: doc_path, .. } = &mut doc.root.kind {
            *doc_path = Some(path.to_string_lossy().into_owned());
        }
        Ok(doc)
    }

    /// Parse with a caller-supplied include resolver, e.g. an in-memory one
    /// for tests that should not touch the filesystem.
    pub fn parse_with_resolver(
        source: &str,
        base_dir: PathBuf,
        config: &Config,
        resolver: &dyn IncludeResolver,
    ) -> Self {
        let mut sink = CollectingSink::default();
        let mut root = parser::parse(source, base_dir, config.file_inclusion, resolver, &mut sink);
        if let crate::ast::NodeKind::Document { content, .. } = &mut root.kind {
            *content = Some(source.to_string());
        }
        Self { root, diagnostics: sink.diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_string_stores_source_on_root_content() {
        let doc = Document::parse_string("hello\n", ".", &Config::new());
        match &doc.root.kind {
            crate::ast::NodeKind::Document { content, path } => {
                assert_eq!(content.as_deref(), Some("hello\n"));
                assert_eq!(*path, None);
            }
            other => panic!("unexpected kind: {:?}", other),
        }
        assert!(doc.diagnostics.is_empty());
    }

    #[test]
    fn disabled_file_inclusion_produces_path_only_document_node() {
        let doc = Document::parse_string("?[other.gr]\n", ".", &Config::new().with_file_inclusion(false));
        let include = &doc.root.children[0];
        match &include.kind {
            crate::ast::NodeKind::Document { path, content } => {
                assert_eq!(path.as_deref(), Some("other.gr"));
                assert!(content.is_none());
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn parse_file_stores_its_own_path_on_root() {
        let dir = std::env::temp_dir().join(format!("gularen-document-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("doc.gr");
        fs::write(&file, "hello\n").unwrap();

        let doc = Document::parse_file(&file, &Config::new()).unwrap();
        match &doc.root.kind {
            crate::ast::NodeKind::Document { path, content } => {
                assert_eq!(path.as_deref(), Some(file.to_string_lossy().as_ref()));
                assert_eq!(content.as_deref(), Some("hello\n"));
            }
            other => panic!("unexpected kind: {:?}", other),
        }

        fs::remove_dir_all(&dir).ok();
    }
}
