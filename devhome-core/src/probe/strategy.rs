//! Detection strategies and version extraction.

use crate::connection::ConnectionConfig;
use crate::models::StrategyKind;
use regex::Regex;
use tracing::warn;

/// One way of obtaining raw version text for a runtime.
#[derive(Debug, Clone)]
pub enum DetectionStrategy {
    /// Binaries named in configuration, invoked with the probe's version args
    ExplicitBinary(Vec<String>),
    /// Well-known install locations, invoked like explicit binaries
    KnownLocations(Vec<String>),
    /// Shell commands whose first output line names a binary to invoke
    ShellDiscovery(Vec<String>),
    /// Ask a running server for its self-reported version
    LiveConnection(ConnectionConfig),
    /// Fixed text, typically the version of a bundled client library
    LibraryFallback(String),
}

impl DetectionStrategy {
    /// Report label for this strategy.
    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::ExplicitBinary(_) => StrategyKind::ExplicitBinary,
            Self::KnownLocations(_) => StrategyKind::KnownLocations,
            Self::ShellDiscovery(_) => StrategyKind::ShellDiscovery,
            Self::LiveConnection(_) => StrategyKind::LiveConnection,
            Self::LibraryFallback(_) => StrategyKind::LibraryFallback,
        }
    }

    /// Whether raw text from this strategy is accepted when no pattern matches.
    pub fn accepts_raw(&self) -> bool {
        matches!(self, Self::LiveConnection(_) | Self::LibraryFallback(_))
    }

    /// Whether the strategy needs a process runner.
    pub fn needs_exec(&self) -> bool {
        matches!(
            self,
            Self::ExplicitBinary(_) | Self::KnownLocations(_) | Self::ShellDiscovery(_)
        )
    }
}

/// Compiles version patterns. Invalid patterns are skipped with a warning.
pub fn compile_patterns<I, S>(patterns: I) -> Vec<Regex>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    patterns
        .into_iter()
        .filter_map(|pattern| {
            let pattern = pattern.as_ref();
            match Regex::new(pattern) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    warn!(pattern, error = %e, "skipping invalid version pattern");
                    None
                }
            }
        })
        .collect()
}

/// Extracts a version from `text`.
///
/// Patterns are tried in order; the first match yields its first capture
/// group (or the whole match when the pattern has no group). With
/// `accept_raw`, unmatched non-empty text is returned trimmed.
pub fn extract_version(patterns: &[Regex], text: &str, accept_raw: bool) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let matched = patterns.iter().find_map(|pattern| {
        let captures = pattern.captures(text)?;
        captures
            .get(1)
            .or_else(|| captures.get(0))
            .map(|m| m.as_str().to_string())
    });

    match matched {
        Some(version) if !version.is_empty() => Some(version),
        _ if accept_raw => Some(text.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mysql_patterns() -> Vec<Regex> {
        compile_patterns([
            r"Distrib\s+([0-9.]+)",
            r"Ver\s+([0-9.]+)",
            r"([0-9]+\.[0-9]+\.[0-9]+)",
        ])
    }

    #[test]
    fn test_extract_distrib_before_ver() {
        let text = "mysql  Ver 14.14 Distrib 5.7.44, for Linux (x86_64)";
        assert_eq!(
            extract_version(&mysql_patterns(), text, false).as_deref(),
            Some("5.7.44")
        );
    }

    #[test]
    fn test_extract_ver_format() {
        let text = "mysql  Ver 8.0.36 for Linux on x86_64 (MySQL Community Server - GPL)";
        assert_eq!(
            extract_version(&mysql_patterns(), text, false).as_deref(),
            Some("8.0.36")
        );
    }

    #[test]
    fn test_extract_no_match_without_raw() {
        assert_eq!(
            extract_version(&mysql_patterns(), "sh: 1: mysql: not found", false),
            None
        );
    }

    #[test]
    fn test_extract_accepts_raw_text() {
        let patterns = compile_patterns([r"Distrib\s+([0-9.]+)"]);
        assert_eq!(
            extract_version(&patterns, "  10.11.6-MariaDB  ", true).as_deref(),
            Some("10.11.6-MariaDB")
        );
    }

    #[test]
    fn test_extract_empty_text_never_accepted() {
        assert_eq!(extract_version(&mysql_patterns(), "   ", true), None);
    }

    #[test]
    fn test_pattern_without_group_uses_whole_match() {
        let patterns = compile_patterns([r"[0-9]+\.[0-9]+"]);
        assert_eq!(
            extract_version(&patterns, "v3.12 build", false).as_deref(),
            Some("3.12")
        );
    }

    #[test]
    fn test_invalid_patterns_skipped() {
        let patterns = compile_patterns(["(unclosed", r"PHP ([0-9.]+)"]);
        assert_eq!(patterns.len(), 1);
    }

    #[test]
    fn test_strategy_kinds() {
        assert_eq!(
            DetectionStrategy::ShellDiscovery(vec![]).kind(),
            StrategyKind::ShellDiscovery
        );
        assert!(DetectionStrategy::LibraryFallback(String::new()).accepts_raw());
        assert!(!DetectionStrategy::KnownLocations(vec![]).accepts_raw());
        assert!(DetectionStrategy::ExplicitBinary(vec![]).needs_exec());
        assert!(!DetectionStrategy::LiveConnection(ConnectionConfig::default()).needs_exec());
    }
}
