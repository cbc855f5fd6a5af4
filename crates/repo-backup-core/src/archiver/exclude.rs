use glob::Pattern;
use std::path::{Component, Path};
use tracing::error;

/// Exclusion globs with `tar --exclude` matching: a member is excluded when a
/// pattern matches its whole name or any trailing run of its components, so
/// `*.pyc` and `raw_input/*.out` both apply at any depth.
#[derive(Debug, Clone, Default)]
pub struct ExcludeSet {
    patterns: Vec<Pattern>,
}

impl ExcludeSet {
    pub fn new(globs: &[String]) -> Self {
        let patterns = globs
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob, e);
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// `member` is the name relative to the archive root, e.g. `64/ab/file`.
    pub fn is_excluded(&self, member: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let parts: Vec<&str> = member
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => part.to_str(),
                _ => None,
            })
            .collect();
        (0..parts.len()).any(|start| {
            let suffix = parts[start..].join("/");
            self.patterns.iter().any(|p| p.matches(&suffix))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(globs: &[&str]) -> ExcludeSet {
        ExcludeSet::new(&globs.iter().map(|g| g.to_string()).collect::<Vec<_>>())
    }

    #[test]
    fn test_basename_pattern_matches_at_any_depth() {
        let excludes = set(&["*.pyc"]);
        assert!(excludes.is_excluded(Path::new("64/fd5a/path/mod.pyc")));
        assert!(!excludes.is_excluded(Path::new("64/fd5a/path/mod.py")));
    }

    #[test]
    fn test_multi_component_pattern() {
        let excludes = set(&["raw_input/*.out"]);
        assert!(excludes.is_excluded(Path::new("64/fd5a/raw_input/aiida.out")));
        assert!(!excludes.is_excluded(Path::new("64/fd5a/path/aiida.out")));
    }

    #[test]
    fn test_directory_name_pattern() {
        let excludes = set(&["__pycache__"]);
        assert!(excludes.is_excluded(Path::new("64/fd5a/__pycache__")));
    }

    #[test]
    fn test_invalid_pattern_is_dropped() {
        let excludes = set(&["[unterminated"]);
        assert!(excludes.is_empty());
        assert!(!excludes.is_excluded(Path::new("64/[unterminated")));
    }
}
