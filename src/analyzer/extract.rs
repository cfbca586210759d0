use crate::models::Row;
use crate::payload::{FIELD_SEPARATOR, ROW_SEPARATOR};

/// Reads whatever a UNION probe rendered into the page right after the marker.
///
/// Misses are silent: an absent marker or an empty capture yields an empty
/// value and the caller moves on.
#[derive(Debug, Clone)]
pub struct ExtractionParser {
    marker: String,
}

impl ExtractionParser {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    fn is_list_char(c: char) -> bool {
        c.is_ascii_alphanumeric()
            || c == '_'
            || c == ROW_SEPARATOR
            || c == FIELD_SEPARATOR
            || c.is_whitespace()
    }

    fn is_scalar_char(c: char) -> bool {
        Self::is_list_char(c) || matches!(c, '.' | '-' | '+' | '~')
    }

    /// First non-blank run after any occurrence of the marker.
    fn capture<'a>(&self, body: &'a str, allowed: fn(char) -> bool) -> Option<&'a str> {
        if self.marker.is_empty() {
            return None;
        }

        body.match_indices(self.marker.as_str())
            .map(|(idx, _)| {
                let rest = &body[idx + self.marker.len()..];
                let end = rest
                    .char_indices()
                    .find(|(_, c)| !allowed(*c))
                    .map(|(i, _)| i)
                    .unwrap_or(rest.len());
                &rest[..end]
            })
            .find(|run| !run.trim().is_empty())
    }

    /// Current database name, version banner and the like.
    pub fn parse_scalar(&self, body: &str) -> Option<String> {
        self.capture(body, Self::is_scalar_char)
            .map(|run| run.trim().to_string())
    }

    pub fn parse_list(&self, body: &str) -> Vec<String> {
        self.capture(body, Self::is_list_char)
            .map(|run| {
                run.split(ROW_SEPARATOR)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Rows whose field count differs from `columns.len()` are dropped.
    pub fn parse_rows(&self, body: &str, columns: &[String]) -> Vec<Row> {
        let Some(run) = self.capture(body, Self::is_list_char) else {
            return Vec::new();
        };

        run.split(ROW_SEPARATOR)
            .map(str::trim)
            .filter(|row| !row.is_empty())
            .filter_map(|row| {
                let values: Vec<&str> = row.split(FIELD_SEPARATOR).collect();
                if values.len() != columns.len() {
                    return None;
                }
                Some(
                    columns
                        .iter()
                        .cloned()
                        .zip(values.into_iter().map(String::from))
                        .collect::<Row>(),
                )
            })
            .collect()
    }
}
