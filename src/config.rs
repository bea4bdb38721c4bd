use std::path::PathBuf;

use crate::limits::*;

/// Runtime settings, read from `HOLDSHELF_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Active appointments a user may hold for one book.
    pub max_active_per_book: usize,
    /// Refuse approvals when the book has no copies left. Off by default:
    /// approval decrements unconditionally and the count may go negative.
    pub guard_approvals: bool,
    pub notify_capacity: usize,
    /// JSON array of books used to seed the in-memory catalog.
    pub catalog_path: Option<PathBuf>,
    pub metrics_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_active_per_book: MAX_ACTIVE_PER_USER_BOOK,
            guard_approvals: false,
            notify_capacity: NOTIFY_CHANNEL_CAPACITY,
            catalog_path: None,
            metrics_port: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let max_active_per_book = lookup("HOLDSHELF_MAX_ACTIVE_PER_BOOK")
            .and_then(|s| s.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.max_active_per_book);
        let guard_approvals = lookup("HOLDSHELF_GUARD_APPROVALS")
            .and_then(|s| parse_flag(&s))
            .unwrap_or(defaults.guard_approvals);
        let notify_capacity = lookup("HOLDSHELF_NOTIFY_CAPACITY")
            .and_then(|s| s.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.notify_capacity);
        let catalog_path = lookup("HOLDSHELF_CATALOG_PATH")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);
        let metrics_port = lookup("HOLDSHELF_METRICS_PORT").and_then(|s| s.parse().ok());

        Self {
            max_active_per_book,
            guard_approvals,
            notify_capacity,
            catalog_path,
            metrics_port,
        }
    }

    pub fn with_guard_approvals(mut self, guard: bool) -> Self {
        self.guard_approvals = guard;
        self
    }

    pub fn with_max_active_per_book(mut self, max: usize) -> Self {
        self.max_active_per_book = max;
        self
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_env_gives_defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config, Config::default());
        assert_eq!(config.max_active_per_book, 2);
        assert!(!config.guard_approvals);
    }

    #[test]
    fn reads_all_keys() {
        let config = Config::from_lookup(lookup_from(&[
            ("HOLDSHELF_MAX_ACTIVE_PER_BOOK", "5"),
            ("HOLDSHELF_GUARD_APPROVALS", "yes"),
            ("HOLDSHELF_NOTIFY_CAPACITY", "16"),
            ("HOLDSHELF_CATALOG_PATH", "/tmp/books.json"),
            ("HOLDSHELF_METRICS_PORT", "9100"),
        ]));
        assert_eq!(config.max_active_per_book, 5);
        assert!(config.guard_approvals);
        assert_eq!(config.notify_capacity, 16);
        assert_eq!(config.catalog_path, Some(PathBuf::from("/tmp/books.json")));
        assert_eq!(config.metrics_port, Some(9100));
    }

    #[test]
    fn garbage_falls_back_to_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("HOLDSHELF_MAX_ACTIVE_PER_BOOK", "0"),
            ("HOLDSHELF_GUARD_APPROVALS", "maybe"),
            ("HOLDSHELF_METRICS_PORT", "99999"),
        ]));
        assert_eq!(config.max_active_per_book, MAX_ACTIVE_PER_USER_BOOK);
        assert!(!config.guard_approvals);
        assert_eq!(config.metrics_port, None);
    }
}
