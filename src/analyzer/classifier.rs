use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

/// Ordered WAF table: the first name with a matching signature wins, and
/// within one name the signatures are tried in order.
const WAF_SIGNATURES: &[(&str, &[&str])] = &[
    ("ModSecurity", &[r"403 Forbidden", r"mod_security"]),
    ("Cloudflare", &[r"1020", r"Ray ID"]),
    ("AWS WAF", &[r"400 Bad Request", r"AWS WAF"]),
    ("Imperva", &[r"403 Forbidden", r"Imperva"]),
];

const SQL_ERROR_PATTERNS: &[&str] = &[
    r"SQL syntax",
    r"mysql_fetch",
    r"Warning.*mysql",
    r"Unclosed quotation",
    r"quoted string",
    r"syntax error",
    r"database error",
    r"ODBC",
    r"OLE DB",
    r"Oracle error",
];

fn case_insensitive(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("signature pattern is valid")
}

static WAF_TABLE: LazyLock<Vec<(&'static str, Vec<Regex>)>> = LazyLock::new(|| {
    WAF_SIGNATURES
        .iter()
        .map(|(name, sigs)| (*name, sigs.iter().map(|s| case_insensitive(s)).collect()))
        .collect()
});

static ERROR_TABLE: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    SQL_ERROR_PATTERNS
        .iter()
        .map(|p| (*p, case_insensitive(p)))
        .collect()
});

pub struct ResponseClassifier;

impl ResponseClassifier {
    pub fn detect_waf(body: &str, status: u16) -> Option<String> {
        for (name, signatures) in WAF_TABLE.iter() {
            if signatures.iter().any(|sig| sig.is_match(body)) {
                return Some(name.to_string());
            }
        }

        match status {
            403 => Some("Unknown WAF (403 Forbidden)".to_string()),
            406 => Some("Unknown WAF (406 Not Acceptable)".to_string()),
            _ => None,
        }
    }

    /// Returns the first SQL error pattern found in the body.
    pub fn detect_error(body: &str) -> Option<&'static str> {
        ERROR_TABLE
            .iter()
            .find(|(_, re)| re.is_match(body))
            .map(|(pattern, _)| *pattern)
    }

    pub fn contains_marker(body: &str, marker: &str) -> bool {
        body.contains(marker)
    }
}
