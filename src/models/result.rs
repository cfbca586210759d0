use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One extracted row, keyed by column name.
pub type Row = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dbms {
    MySql,
    MariaDb,
    PostgreSql,
    MsSql,
    Unknown,
}

impl fmt::Display for Dbms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Dbms::MySql => "MySQL",
            Dbms::MariaDb => "MariaDB",
            Dbms::PostgreSql => "PostgreSQL",
            Dbms::MsSql => "MSSQL",
            Dbms::Unknown => "Unknown",
        };
        write!(f, "{}", s)
    }
}

impl Dbms {
    /// Case-insensitive substring match against the version banner. The order
    /// of the checks matters: the first hit wins.
    pub fn from_version(version: &str) -> Self {
        let lower = version.to_lowercase();
        if lower.contains("mysql") {
            Dbms::MySql
        } else if lower.contains("mariadb") {
            Dbms::MariaDb
        } else if lower.contains("postgresql") {
            Dbms::PostgreSql
        } else if lower.contains("microsoft") || lower.contains("mssql") {
            Dbms::MsSql
        } else {
            Dbms::Unknown
        }
    }
}

/// Outcome of ORDER BY column discovery. `boundary_found` is false when the
/// cap was reached without any failing probe, in which case `count` is only
/// the cap and not a measured value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnCount {
    pub count: usize,
    pub boundary_found: bool,
}

/// Accumulated findings of one scan.
///
/// `tables`, `columns` and `data` only carry keys for databases and tables
/// that were actually probed and answered. A missing key means "not probed",
/// never "empty".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanResult {
    pub vulnerable: bool,
    pub dbms: Option<Dbms>,
    pub version: Option<String>,
    pub current_db: Option<String>,
    pub column_count: Option<ColumnCount>,
    pub databases: Vec<String>,
    pub tables: BTreeMap<String, Vec<String>>,
    pub columns: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    pub data: BTreeMap<String, BTreeMap<String, Vec<Row>>>,
    pub errors: Vec<String>,
    pub waf_detected: Option<String>,
}

impl ScanResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_columns(&mut self, database: &str, table: &str, columns: Vec<String>) {
        self.columns
            .entry(database.to_string())
            .or_default()
            .insert(table.to_string(), columns);
    }

    pub fn set_rows(&mut self, database: &str, table: &str, rows: Vec<Row>) {
        self.data
            .entry(database.to_string())
            .or_default()
            .insert(table.to_string(), rows);
    }

    pub fn columns_of(&self, database: &str, table: &str) -> Option<&Vec<String>> {
        self.columns.get(database).and_then(|t| t.get(table))
    }

    pub fn rows_of(&self, database: &str, table: &str) -> Option<&Vec<Row>> {
        self.data.get(database).and_then(|t| t.get(table))
    }

    pub fn table_count(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    pub fn row_count(&self) -> usize {
        self.data
            .values()
            .flat_map(|tables| tables.values())
            .map(Vec::len)
            .sum()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dbms_from_version() {
        assert_eq!(Dbms::from_version("5.7.40-MySQL Community"), Dbms::MySql);
        assert_eq!(Dbms::from_version("10.6.12-MariaDB-0ubuntu"), Dbms::MariaDb);
        assert_eq!(Dbms::from_version("PostgreSQL 15.2 on x86_64"), Dbms::PostgreSql);
        assert_eq!(Dbms::from_version("Microsoft SQL Server 2019"), Dbms::MsSql);
        assert_eq!(Dbms::from_version("8.0.32"), Dbms::Unknown);
    }

    #[test]
    fn test_default_is_empty() {
        let result = ScanResult::new();
        assert!(!result.vulnerable);
        assert!(result.dbms.is_none());
        assert!(result.current_db.is_none());
        assert!(result.databases.is_empty());
        assert!(result.tables.is_empty());
        assert!(!result.has_errors());
    }

    #[test]
    fn test_nested_accessors() {
        let mut result = ScanResult::new();
        result.set_columns("shop", "users", vec!["id".into(), "name".into()]);

        let mut row = Row::new();
        row.insert("id".into(), "1".into());
        row.insert("name".into(), "alice".into());
        result.set_rows("shop", "users", vec![row]);

        assert_eq!(result.columns_of("shop", "users").map(Vec::len), Some(2));
        assert!(result.columns_of("shop", "orders").is_none());
        assert_eq!(result.row_count(), 1);
    }
}
