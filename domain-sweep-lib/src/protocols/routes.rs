//! Suffix to registrar endpoint routing.
//!
//! A route maps a suffix prefix (e.g. `.hidns`) to the check endpoint of
//! the registrar that serves every suffix starting with it. Lookups pick
//! the longest matching prefix, so a configured `.hidns.vip` route can
//! override the built-in `.hidns` one.

use crate::error::SweepError;
use std::collections::HashMap;

/// Built-in registrar routes.
pub fn builtin_routes() -> Vec<(&'static str, &'static str)> {
    vec![
        // HiDNS free second-level suffixes (.hidns.co, .hidns.vip, ...)
        (
            ".hidns",
            "https://www.hidoha.net/index.php?_url=/api/guest/servicedomain/check",
        ),
        // NodeLoc free suffix
        (
            ".loc.cc",
            "https://free.nodeloc.com/index.php?_url=/api/guest/servicedomain/check",
        ),
    ]
}

/// Validate one route entry.
pub fn validate_route(prefix: &str, url: &str) -> Result<(), SweepError> {
    if !prefix.starts_with('.') || prefix.len() < 2 || prefix.contains(char::is_whitespace) {
        return Err(SweepError::config(format!(
            "Route prefix '{}' must start with '.' and contain no spaces",
            prefix
        )));
    }
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(SweepError::config(format!(
            "Route '{}' has invalid endpoint '{}': expected an http(s) URL",
            prefix, url
        )));
    }
    Ok(())
}

/// Routing table from suffix prefixes to endpoint URLs.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: HashMap<String, String>,
}

impl RouteTable {
    /// Table holding only the built-in routes.
    pub fn builtin() -> Self {
        Self {
            routes: builtin_routes()
                .into_iter()
                .map(|(prefix, url)| (prefix.to_string(), url.to_string()))
                .collect(),
        }
    }

    /// Table with no routes at all.
    pub fn empty() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// Built-in routes plus `custom`; custom entries replace built-in ones
    /// with the same prefix.
    pub fn with_custom(custom: &HashMap<String, String>) -> Result<Self, SweepError> {
        let mut table = Self::builtin();
        for (prefix, url) in custom {
            table.insert(prefix, url)?;
        }
        Ok(table)
    }

    pub fn insert(&mut self, prefix: &str, url: &str) -> Result<(), SweepError> {
        validate_route(prefix, url)?;
        self.routes.insert(prefix.to_lowercase(), url.to_string());
        Ok(())
    }

    /// Endpoint for `suffix`, by longest matching prefix.
    pub fn resolve(&self, suffix: &str) -> Result<&str, SweepError> {
        let suffix_lower = suffix.to_lowercase();
        self.routes
            .iter()
            .filter(|(prefix, _)| suffix_lower.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, url)| url.as_str())
            .ok_or_else(|| SweepError::unknown_suffix(suffix))
    }

    /// All routes sorted by prefix.
    pub fn entries(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .routes
            .iter()
            .map(|(p, u)| (p.as_str(), u.as_str()))
            .collect();
        entries.sort();
        entries
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_routes_cover_default_suffixes() {
        let table = RouteTable::builtin();
        for suffix in crate::types::DEFAULT_SUFFIXES {
            assert!(table.resolve(suffix).is_ok(), "no route for {}", suffix);
        }
        assert!(table.resolve(".hidns.vip").unwrap().contains("hidoha.net"));
        assert!(table.resolve(".loc.cc").unwrap().contains("nodeloc.com"));
    }

    #[test]
    fn test_unknown_suffix() {
        let table = RouteTable::builtin();
        assert!(matches!(
            table.resolve(".example"),
            Err(SweepError::UnknownSuffix { .. })
        ));
        assert!(RouteTable::empty().resolve(".loc.cc").is_err());
    }

    #[test]
    fn test_longest_prefix_wins() {
        let mut custom = HashMap::new();
        custom.insert(
            ".hidns.vip".to_string(),
            "http://127.0.0.1:9000/check".to_string(),
        );
        let table = RouteTable::with_custom(&custom).unwrap();

        assert_eq!(
            table.resolve(".hidns.vip").unwrap(),
            "http://127.0.0.1:9000/check"
        );
        assert!(table.resolve(".hidns.co").unwrap().contains("hidoha.net"));
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        assert!(RouteTable::builtin().resolve(".LOC.CC").is_ok());
    }

    #[test]
    fn test_validate_route() {
        assert!(validate_route(".loc.cc", "https://example.net/check").is_ok());
        assert!(validate_route("loc.cc", "https://example.net/check").is_err());
        assert!(validate_route(".", "https://example.net/check").is_err());
        assert!(validate_route(".loc.cc", "ftp://example.net").is_err());
    }

    #[test]
    fn test_all_builtin_endpoints_are_https() {
        for (prefix, url) in builtin_routes() {
            assert!(url.starts_with("https://"), "{} -> {}", prefix, url);
        }
    }

    #[test]
    fn test_entries_sorted() {
        let table = RouteTable::builtin();
        let entries = table.entries();
        assert_eq!(entries[0].0, ".hidns");
        assert_eq!(entries[1].0, ".loc.cc");
    }
}
