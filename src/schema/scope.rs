//! Instrumentation scope: which artifacts besides the primary target
//! participate in instrumentation.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Boolean predicate over fully-qualified artifact names.
///
/// The primary target is always in scope. Additional names come from an
/// externally supplied classification file, one name per line.
#[derive(Debug, Clone, Default)]
pub struct InstrumentationScope {
    primary: String,
    additional: HashSet<String>,
}

impl InstrumentationScope {
    /// Build a scope from an explicit list.
    pub fn new<I, S>(primary: impl Into<String>, additional: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let additional = additional
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            primary: primary.into(),
            additional,
        }
    }

    /// Build a scope from a classification file.
    ///
    /// A missing path means no additional artifacts. An unreadable file is
    /// logged and treated the same way.
    pub fn from_file(primary: impl Into<String>, path: Option<&Path>) -> Self {
        let primary = primary.into();
        let Some(path) = path else {
            log::debug!("No additional artifacts");
            return Self::new(primary, std::iter::empty::<&str>());
        };

        match fs::read_to_string(path) {
            Ok(content) => {
                let scope = Self::new(primary, content.lines());
                if scope.additional.is_empty() {
                    log::warn!("Additional artifacts file {} is empty", path.display());
                }
                for name in &scope.additional {
                    log::info!("Adding additional artifact: {}", name);
                }
                scope
            }
            Err(e) => {
                log::error!(
                    "Could not read additional artifacts from {}: {}",
                    path.display(),
                    e
                );
                Self::new(primary, std::iter::empty::<&str>())
            }
        }
    }

    /// Whether the given artifact should be instrumented.
    pub fn should_instrument(&self, name: &str) -> bool {
        name == self.primary || self.additional.contains(name)
    }

    /// True when nothing besides the primary target is in scope.
    pub fn limit_to_primary(&self) -> bool {
        self.additional.is_empty()
    }

    /// The primary target name.
    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// Additional artifact names.
    pub fn additional(&self) -> &HashSet<String> {
        &self.additional
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_empty_scope_permits_primary_only() {
        let scope = InstrumentationScope::from_file("com.example.Target", None);
        assert!(scope.limit_to_primary());
        assert!(scope.should_instrument("com.example.Target"));
        assert!(!scope.should_instrument("com.example.Other"));
    }

    #[test]
    fn test_scope_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("additional.txt");
        fs::write(&path, "  com.example.Helper \n\ncom.example.Util\n").unwrap();

        let scope = InstrumentationScope::from_file("com.example.Target", Some(&path));
        assert!(!scope.limit_to_primary());
        assert_eq!(scope.additional().len(), 2);
        assert!(scope.should_instrument("com.example.Helper"));
        assert!(scope.should_instrument("com.example.Util"));
        assert!(scope.should_instrument("com.example.Target"));
        assert!(!scope.should_instrument("com.example.Missing"));
    }

    #[test]
    fn test_unreadable_file_falls_back_to_primary() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("does-not-exist.txt");

        let scope = InstrumentationScope::from_file("Target", Some(&path));
        assert!(scope.limit_to_primary());
        assert!(scope.should_instrument("Target"));
    }
}
