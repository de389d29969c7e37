use regex::Regex;
use std::sync::OnceLock;

fn enumeration_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\d+\s*[.)]\s*").unwrap())
}

fn trailing_colons() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s:：]+$").unwrap())
}

fn inner_whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Key used to dedupe search hits inside one collection.
pub fn dedup_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Comparison form of a disease name: enumeration prefix ("1. ", "2) ")
/// and trailing colons removed, whitespace collapsed, lowercased.
pub fn normalize_name(name: &str) -> String {
    let name = enumeration_prefix().replace(name, "");
    let name = trailing_colons().replace(&name, "");
    inner_whitespace()
        .replace_all(name.trim(), " ")
        .to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NameMatch {
    Exact,
    Contains,
}

/// Compare two names in normalized form. Containment counts in either
/// direction; empty names never match.
pub fn compare_names(stored: &str, wanted: &str) -> Option<NameMatch> {
    let stored = normalize_name(stored);
    let wanted = normalize_name(wanted);
    if stored.is_empty() || wanted.is_empty() {
        return None;
    }
    if stored == wanted {
        Some(NameMatch::Exact)
    } else if stored.contains(&wanted) || wanted.contains(&stored) {
        Some(NameMatch::Contains)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_enumeration_and_colons() {
        assert_eq!(normalize_name("1. Foot and Mouth Disease:"), "foot and mouth disease");
        assert_eq!(normalize_name("  12) Mastitis :: "), "mastitis");
        assert_eq!(normalize_name("Bloat"), "bloat");
        assert_eq!(normalize_name("दस्त:"), "दस्त");
    }

    #[test]
    fn numbers_inside_names_are_kept() {
        assert_eq!(normalize_name("Vitamin B12 deficiency"), "vitamin b12 deficiency");
    }

    #[test]
    fn dedup_key_is_trim_and_lowercase_only() {
        assert_eq!(dedup_key("  Milk Fever "), "milk fever");
        assert_eq!(dedup_key("1. Milk Fever"), "1. milk fever");
    }

    #[test]
    fn compare_prefers_exact() {
        assert_eq!(compare_names("2) Mastitis:", "mastitis"), Some(NameMatch::Exact));
        assert_eq!(
            compare_names("Clinical Mastitis", "Mastitis"),
            Some(NameMatch::Contains)
        );
        assert_eq!(
            compare_names("Mastitis", "Clinical Mastitis"),
            Some(NameMatch::Contains)
        );
        assert_eq!(compare_names("Bloat", "Mastitis"), None);
        assert_eq!(compare_names("", "Mastitis"), None);
    }
}
