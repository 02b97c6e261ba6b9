//! Wildcard filename matching for exclusion rules.
//!
//! Patterns use shell-glob semantics (`*`, `?`, `[...]`, `[!...]`) and are
//! matched case-sensitively against bare file names, never paths.

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::warn;

/// Compiled, ordered set of exclusion patterns.
///
/// Immutable once built; share one instance across a whole scan.
#[derive(Debug, Clone)]
pub struct ExclusionRuleSet {
    patterns: Vec<String>,
    set: GlobSet,
}

impl ExclusionRuleSet {
    /// Compiles the given patterns. Blank or invalid patterns are skipped
    /// with a warning rather than failing the whole set.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        let mut accepted = Vec::new();

        for pattern in patterns {
            let pattern = pattern.as_ref();
            if pattern.trim().is_empty() {
                continue;
            }
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                    accepted.push(pattern.to_string());
                }
                Err(e) => warn!(pattern, error = %e, "ignoring invalid exclusion pattern"),
            }
        }

        let set = builder.build().unwrap_or_else(|e| {
            warn!(error = %e, "failed to compile exclusion patterns, excluding nothing");
            accepted.clear();
            GlobSet::empty()
        });

        Self {
            patterns: accepted,
            set,
        }
    }

    /// An empty rule set that excludes nothing.
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            set: GlobSet::empty(),
        }
    }

    /// Whether `name` matches any pattern in the set.
    pub fn matches(&self, name: &str) -> bool {
        !self.set.is_empty() && self.set.is_match(name)
    }

    /// The patterns that compiled successfully, in input order.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// True when no usable pattern was compiled.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for ExclusionRuleSet {
    fn default() -> Self {
        Self::empty()
    }
}

/// One-shot form of [`ExclusionRuleSet::matches`].
///
/// ```rust
/// use devhome_core::pattern::matches;
///
/// assert!(matches(&["*.png"], "logo.png"));
/// assert!(!matches::<&str>(&[], "logo.png"));
/// ```
pub fn matches<S: AsRef<str>>(patterns: &[S], name: &str) -> bool {
    if patterns.is_empty() {
        return false;
    }
    ExclusionRuleSet::new(patterns).matches(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_patterns_never_match() {
        assert!(!matches::<&str>(&[], "anything"));
        assert!(!ExclusionRuleSet::empty().matches("anything"));
    }

    #[test]
    fn test_star_matches_any_non_empty_name() {
        for name in ["a", ".hidden", "file.txt", "dir name with spaces", "ünïcode"] {
            assert!(matches(&["*"], name), "{name} should match *");
        }
    }

    #[test]
    fn test_default_exclusions() {
        let rules = ExclusionRuleSet::new([".DS_Store", ".localized", "*.php*", "*.png"]);

        assert!(rules.matches(".DS_Store"));
        assert!(rules.matches("index.php"));
        assert!(rules.matches("index.phps"));
        assert!(rules.matches("info.php.bak"));
        assert!(rules.matches("logo.png"));
        assert!(!rules.matches("logo.PNG"));
        assert!(!rules.matches("project"));
        assert!(!rules.matches("notes.txt"));
    }

    #[test]
    fn test_question_mark_and_classes() {
        assert!(matches(&["file?.log"], "file1.log"));
        assert!(!matches(&["file?.log"], "file10.log"));
        assert!(matches(&["[abc]*"], "beta"));
        assert!(!matches(&["[abc]*"], "delta"));
        assert!(matches(&["[!abc]*"], "delta"));
    }

    #[test]
    fn test_any_pattern_wins() {
        let rules = ExclusionRuleSet::new(["*.exe", ".git*", "*.sh"]);
        assert!(rules.matches(".gitignore"));
        assert!(rules.matches("setup.exe"));
        assert!(rules.matches("build.sh"));
        assert!(!rules.matches("README.md"));
    }

    #[test]
    fn test_invalid_patterns_are_skipped() {
        let rules = ExclusionRuleSet::new(["[unclosed", "", "*.tmp"]);
        assert_eq!(rules.patterns(), &["*.tmp".to_string()]);
        assert!(rules.matches("scratch.tmp"));
        assert!(!rules.matches("[unclosed"));
    }
}
