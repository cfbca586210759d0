//! Textual obfuscation applied to finished payloads.
//!
//! Transforms run strictly in the order the caller lists them and are not
//! commutative: `randomcase` followed by `space2comment` is not the same string
//! as the reverse, although both parse as the same SQL.

use rand::Rng;
use regex::{Captures, Regex};
use std::fmt;
use std::sync::LazyLock;

static KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:UNION|SELECT|FROM|WHERE|AND|OR|ORDER|BY)\b")
        .expect("keyword pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tamper {
    Space2Comment,
    Space2Tab,
    Space2Plus,
    RandomCase,
}

impl fmt::Display for Tamper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Tamper {
    pub fn all() -> &'static [Tamper] {
        &[
            Tamper::Space2Comment,
            Tamper::Space2Tab,
            Tamper::Space2Plus,
            Tamper::RandomCase,
        ]
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "space2comment" => Some(Tamper::Space2Comment),
            "space2tab" => Some(Tamper::Space2Tab),
            "space2plus" => Some(Tamper::Space2Plus),
            "randomcase" => Some(Tamper::RandomCase),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tamper::Space2Comment => "space2comment",
            Tamper::Space2Tab => "space2tab",
            Tamper::Space2Plus => "space2plus",
            Tamper::RandomCase => "randomcase",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Tamper::Space2Comment => "Replace spaces with inline comments /**/",
            Tamper::Space2Tab => "Replace spaces with tab characters",
            Tamper::Space2Plus => "Replace spaces with plus signs",
            Tamper::RandomCase => "Randomize the letter case of SQL keywords",
        }
    }

    pub fn apply(&self, payload: &str) -> String {
        match self {
            Tamper::Space2Comment => payload.replace(' ', "/**/"),
            Tamper::Space2Tab => payload.replace(' ', "\t"),
            Tamper::Space2Plus => payload.replace(' ', "+"),
            Tamper::RandomCase => randomcase(payload),
        }
    }
}

/// Resolve tamper names, silently skipping the ones we don't know.
pub fn resolve(names: &[String]) -> Vec<Tamper> {
    names
        .iter()
        .filter_map(|name| {
            let tamper = Tamper::from_name(name);
            if tamper.is_none() {
                tracing::debug!(tamper = %name, "ignoring unknown tamper");
            }
            tamper
        })
        .collect()
}

pub fn apply_all(payload: &str, tampers: &[Tamper]) -> String {
    tampers
        .iter()
        .fold(payload.to_string(), |acc, tamper| tamper.apply(&acc))
}

/// Only text outside `'...'` literals is touched; schema and table names
/// compared against `information_schema` keep their case. A leading quote is
/// the breakout from the target's own literal, so SQL starts right after it.
fn randomcase(payload: &str) -> String {
    let mut rng = rand::rng();
    let sql_parity = usize::from(payload.starts_with('\''));

    payload
        .split('\'')
        .enumerate()
        .map(|(i, segment)| {
            if i % 2 != sql_parity {
                segment.to_string()
            } else {
                KEYWORDS
                    .replace_all(segment, |caps: &Captures| shuffle_case(&caps[0], &mut rng))
                    .into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("'")
}

/// Every keyword comes out with mixed case, never all-upper or all-lower.
fn shuffle_case(word: &str, rng: &mut impl Rng) -> String {
    let mut chars: Vec<char> = word
        .chars()
        .map(|c| {
            if rng.random_bool(0.5) {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect();

    let uniform = chars.iter().all(|c| c.is_ascii_uppercase())
        || chars.iter().all(|c| c.is_ascii_lowercase());

    if chars.len() > 1 && uniform {
        let i = rng.random_range(0..chars.len());
        chars[i] = if chars[i].is_ascii_uppercase() {
            chars[i].to_ascii_lowercase()
        } else {
            chars[i].to_ascii_uppercase()
        };
    }

    chars.into_iter().collect()
}
