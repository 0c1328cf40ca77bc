//! Raw query-string parameters and the reserved directive keys.

use std::collections::HashMap;

pub const SCOPE: &str = "scope";
pub const STRICT: &str = "strict";
pub const NOT: &str = "not";
pub const SORT: &str = "sort";
pub const WITH: &str = "with";
pub const PAGE: &str = "page";
pub const LIMIT: &str = "limit";
pub const TAKE: &str = "take";
pub const RETURN: &str = "return";

/// Query parameters of one request. Keys are case-sensitive.
#[derive(Clone, Debug, Default)]
pub struct QueryParams {
    raw: HashMap<String, String>,
}

impl QueryParams {
    pub fn new(raw: HashMap<String, String>) -> Self {
        QueryParams { raw }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.raw.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.raw.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn strict(&self) -> bool {
        self.get(STRICT).map(parse_bool).unwrap_or(false)
    }

    /// Comma-separated list under `key`, trimmed, empty items dropped.
    pub fn list(&self, key: &str) -> Vec<&str> {
        self.get(key)
            .map(|v| v.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }
}

impl From<HashMap<String, String>> for QueryParams {
    fn from(raw: HashMap<String, String>) -> Self {
        QueryParams::new(raw)
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        QueryParams::new(iter.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }
}

/// Lenient boolean: `1`, `true`, `on`, `yes` (any case) are true; everything else is false.
pub fn parse_bool(s: &str) -> bool {
    matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "on" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_booleans() {
        for t in ["1", "true", "TRUE", "Yes", "on"] {
            assert!(parse_bool(t), "{t}");
        }
        for f in ["0", "false", "no", "", "maybe"] {
            assert!(!parse_bool(f), "{f}");
        }
    }

    #[test]
    fn strict_defaults_to_false() {
        let p: QueryParams = [("name", "Bob")].into_iter().collect();
        assert!(!p.strict());
        let p: QueryParams = [("strict", "true")].into_iter().collect();
        assert!(p.strict());
    }

    #[test]
    fn list_skips_blank_items() {
        let p: QueryParams = [("with", "comments, ,author,")].into_iter().collect();
        assert_eq!(p.list(WITH), vec!["comments", "author"]);
        assert!(p.list(SORT).is_empty());
    }
}
