//! Sort policy applied to listings after retrieval.
//!
//! Directories always precede files. Within each partition entries are
//! ordered by the requested key.

use crate::models::{DirectoryEntry, SortKey};
use std::cmp::Ordering;

/// Sorts `entries` in place: directories first, then by `key`.
///
/// - `Name`: case-insensitive, ties broken by the raw name
/// - `Date`: newest modification first, ties by name
/// - `Size`: largest file first, ties by name (directories carry no size)
pub fn sort_entries(entries: &mut [DirectoryEntry], key: SortKey) {
    entries.sort_by(|a, b| {
        b.kind
            .is_dir()
            .cmp(&a.kind.is_dir())
            .then_with(|| compare_by_key(a, b, key))
    });
}

/// Returns a sorted copy of `entries`.
pub fn sorted(mut entries: Vec<DirectoryEntry>, key: SortKey) -> Vec<DirectoryEntry> {
    sort_entries(&mut entries, key);
    entries
}

fn compare_by_key(a: &DirectoryEntry, b: &DirectoryEntry, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => compare_names(a, b),
        SortKey::Date => b
            .modified_at
            .cmp(&a.modified_at)
            .then_with(|| compare_names(a, b)),
        SortKey::Size => b
            .size_bytes
            .unwrap_or(0)
            .cmp(&a.size_bytes.unwrap_or(0))
            .then_with(|| compare_names(a, b)),
    }
}

fn compare_names(a: &DirectoryEntry, b: &DirectoryEntry) -> Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then_with(|| a.name.cmp(&b.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(secs: i64) -> chrono::DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn order(entries: &[DirectoryEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_size_sort_keeps_directories_first() {
        let entries = vec![
            DirectoryEntry::file("a.txt", at(10), 100),
            DirectoryEntry::dir("b", at(10)),
            DirectoryEntry::file("c.txt", at(10), 50),
        ];

        let sorted = sorted(entries, SortKey::Size);

        assert_eq!(order(&sorted), vec!["b", "a.txt", "c.txt"]);
    }

    #[test]
    fn test_name_sort_is_case_insensitive() {
        let entries = vec![
            DirectoryEntry::file("beta.txt", at(1), 1),
            DirectoryEntry::file("Alpha.txt", at(1), 1),
            DirectoryEntry::dir("zeta", at(1)),
            DirectoryEntry::dir("Gamma", at(1)),
        ];

        let sorted = sorted(entries, SortKey::Name);

        assert_eq!(order(&sorted), vec!["Gamma", "zeta", "Alpha.txt", "beta.txt"]);
    }

    #[test]
    fn test_date_sort_newest_first_within_partitions() {
        let entries = vec![
            DirectoryEntry::file("old.txt", at(100), 1),
            DirectoryEntry::dir("old-dir", at(50)),
            DirectoryEntry::file("new.txt", at(300), 1),
            DirectoryEntry::dir("new-dir", at(400)),
        ];

        let sorted = sorted(entries, SortKey::Date);

        assert_eq!(order(&sorted), vec!["new-dir", "old-dir", "new.txt", "old.txt"]);
    }

    #[test]
    fn test_partition_holds_for_every_key() {
        let entries = vec![
            DirectoryEntry::file("a", at(999), 999_999),
            DirectoryEntry::dir("z", at(1)),
            DirectoryEntry::file("b", at(5), 0),
            DirectoryEntry::dir("y", at(2)),
        ];

        for key in [SortKey::Name, SortKey::Date, SortKey::Size] {
            let sorted = sorted(entries.clone(), key);
            let first_file = sorted.iter().position(|e| !e.kind.is_dir()).unwrap();
            assert!(
                sorted[first_file..].iter().all(|e| !e.kind.is_dir()),
                "directories after files for {key}"
            );
        }
    }

    #[test]
    fn test_sort_key_parse_lenient() {
        assert_eq!(SortKey::parse_lenient("DATE"), SortKey::Date);
        assert_eq!(SortKey::parse_lenient(" size "), SortKey::Size);
        assert_eq!(SortKey::parse_lenient("name"), SortKey::Name);
        assert_eq!(SortKey::parse_lenient("bogus"), SortKey::Name);
    }
}
