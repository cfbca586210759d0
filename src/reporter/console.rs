use colored::Colorize;
use tabled::builder::Builder;
use tabled::settings::{Alignment, Modify, Style, object::Rows};
use tabled::{Table, Tabled};

use crate::models::{Level, ProgressEvent, ScanResult};

pub struct ConsoleReporter;

#[derive(Tabled)]
struct SchemaRow {
    #[tabled(rename = "Database")]
    database: String,
    #[tabled(rename = "Table")]
    table: String,
    #[tabled(rename = "Columns")]
    columns: String,
    #[tabled(rename = "Rows")]
    rows: String,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn format_event(event: &ProgressEvent) -> String {
        let time = event.timestamp.format("%H:%M:%S").to_string().dimmed();
        let tag = match event.level {
            Level::Info => "[*]".cyan().to_string(),
            Level::Success => "[+]".green().bold().to_string(),
            Level::Warning => "[!]".yellow().bold().to_string(),
            Level::Error => "[-]".red().bold().to_string(),
        };
        let message = match event.level {
            Level::Error => event.message.red().to_string(),
            Level::Warning => event.message.yellow().to_string(),
            _ => event.message.clone(),
        };
        format!("{} {} {}", time, tag, message)
    }

    pub fn print_summary(&self, result: &ScanResult) {
        println!("\n{}", "Summary".bold().underline());

        if result.vulnerable {
            println!("  {}: {}", "Vulnerable".bold(), "YES".red().bold());
        } else {
            println!("  {}: {}", "Vulnerable".bold(), "no".green());
        }

        if let Some(columns) = result.column_count {
            let note = if columns.boundary_found {
                String::new()
            } else {
                " (cap reached, not measured)".yellow().to_string()
            };
            println!("  Columns: {}{}", columns.count, note);
        }

        Self::print_field("DBMS", result.dbms.map(|d| d.to_string()));
        Self::print_field("Version", result.version.clone());
        Self::print_field("Current database", result.current_db.clone());
        Self::print_field("WAF", result.waf_detected.clone());

        if !result.databases.is_empty() {
            println!("  Databases: {}", result.databases.join(", ").cyan());
        }
        println!(
            "  {} tables, {} rows extracted",
            result.table_count(),
            result.row_count()
        );

        if result.has_errors() {
            println!("  {} ({}):", "Errors".red().bold(), result.errors.len());
            for error in &result.errors {
                println!("    - {}", error);
            }
        }
        println!();
    }

    fn print_field(label: &str, value: Option<String>) {
        if let Some(value) = value {
            println!("  {}: {}", label, value.cyan());
        }
    }

    pub fn print_schema(&self, result: &ScanResult) {
        let rows: Vec<SchemaRow> = result
            .tables
            .iter()
            .flat_map(|(database, tables)| {
                tables.iter().map(move |table| SchemaRow {
                    database: database.clone(),
                    table: table.clone(),
                    columns: result
                        .columns_of(database, table)
                        .map(|c| c.join(", "))
                        .unwrap_or_else(|| "-".to_string()),
                    rows: result
                        .rows_of(database, table)
                        .map(|r| r.len().to_string())
                        .unwrap_or_else(|| "-".to_string()),
                })
            })
            .collect();

        if rows.is_empty() {
            return;
        }

        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()))
            .to_string();

        println!("{}", "Schema".bold().underline());
        println!("{}", table);
    }

    pub fn print_data(&self, result: &ScanResult) {
        for (database, tables) in &result.data {
            for (table, rows) in tables {
                if rows.is_empty() {
                    continue;
                }
                let Some(columns) = result.columns_of(database, table) else {
                    continue;
                };

                let mut builder = Builder::default();
                builder.push_record(columns.iter().cloned());
                for row in rows {
                    builder.push_record(
                        columns
                            .iter()
                            .map(|c| row.get(c).cloned().unwrap_or_default()),
                    );
                }

                let table_str = builder.build().with(Style::rounded()).to_string();
                println!("\n{}", format!("{}.{}", database, table).white().bold());
                println!("{}", table_str);
            }
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_event_contains_message() {
        colored::control::set_override(false);
        let line = ConsoleReporter::format_event(&ProgressEvent::success("Found 4 columns"));
        assert!(line.contains("[+]"));
        assert!(line.ends_with("Found 4 columns"));
    }
}
