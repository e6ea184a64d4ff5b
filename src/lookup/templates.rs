//! Template existence checks.

use std::path::{Path, PathBuf};

/// Answers whether a renderable template exists at a path.
pub trait TemplateExistence: Send + Sync {
    /// `public_only` excludes templates with a private segment.
    fn exists(&self, path: &str, public_only: bool) -> bool;
}

/// Whether a template path tries to leave the template root.
pub fn is_traversal(path: &str) -> bool {
    path.contains('\\')
        || path.contains('\0')
        || path.split('/').any(|segment| segment == ".." || segment == ".")
}

/// Whether any segment of `path` starts with the private marker.
pub fn has_private_segment(path: &str, marker: &str) -> bool {
    !marker.is_empty() && path.split('/').any(|segment| segment.starts_with(marker))
}

/// Templates stored on disk under a root directory.
///
/// `news/index` resolves to `news/index.html`, `news/index.twig`,
/// `news/index/index.html` or `news/index/index.twig`.
#[derive(Debug, Clone)]
pub struct FsTemplates {
    root: PathBuf,
    private_trigger: String,
    extensions: Vec<String>,
}

impl FsTemplates {
    pub fn new(root: impl Into<PathBuf>, private_trigger: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            private_trigger: private_trigger.into(),
            extensions: vec!["html".to_string(), "twig".to_string()],
        }
    }

    fn candidates(&self, path: &str) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        for ext in &self.extensions {
            if !path.is_empty() {
                candidates.push(self.root.join(format!("{path}.{ext}")));
            }
            candidates.push(self.root.join(path).join(format!("index.{ext}")));
        }
        candidates
    }

    fn within_root(&self, candidate: &Path) -> bool {
        match (self.root.canonicalize(), candidate.canonicalize()) {
            (Ok(root), Ok(candidate)) => candidate.starts_with(root),
            _ => false,
        }
    }
}

impl TemplateExistence for FsTemplates {
    fn exists(&self, path: &str, public_only: bool) -> bool {
        let path = path.trim_matches('/');
        if is_traversal(path) {
            return false;
        }
        if public_only && has_private_segment(path, &self.private_trigger) {
            return false;
        }

        self.candidates(path)
            .iter()
            .any(|candidate| candidate.is_file() && self.within_root(candidate))
    }
}
