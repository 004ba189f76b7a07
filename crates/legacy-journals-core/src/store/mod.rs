//! Relational store adapter.
//!
//! The migration only needs four things from its environment: identifier and
//! literal quoting, column introspection, parameterized selects and
//! parameterized writes. [`SchemaAdapter`] captures exactly that surface so the
//! engine stays independent of the backing database.

pub mod sqlite;

pub use sqlite::SqliteStore;

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::error::Error;

/// A fetched row: column name to value.
pub type Row = BTreeMap<String, Value>;

/// Interface the migration requires from a relational store.
pub trait SchemaAdapter {
    /// Quote a table or column name.
    fn quote_identifier(&self, name: &str) -> String;

    /// Render a value as an SQL literal.
    ///
    /// Only used for diagnostics; statements always bind their values.
    fn quote(&self, value: &Value) -> String;

    /// Positional parameter marker for the 1-based `position`.
    fn placeholder(&self, position: usize) -> String {
        format!("?{}", position)
    }

    /// Names of the columns of `table`. Unknown tables yield an empty set.
    fn column_names(&self, table: &str) -> Result<BTreeSet<String>, Error>;

    /// Run a query and collect its rows in result order.
    fn select(&self, statement: &Statement) -> Result<Vec<Row>, Error>;

    /// Run a write statement, returning the number of affected rows.
    fn execute(&self, statement: &Statement) -> Result<usize, Error>;
}

/// SQL text with positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// SQL text using the adapter's placeholders.
    pub sql: String,
    /// Bound parameter values, in placeholder order.
    pub params: Vec<Value>,
}

impl Statement {
    /// Create a statement without parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Bind the next positional parameter.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    /// `SELECT * FROM table WHERE c1 = ? AND c2 = ? ...`
    pub fn select_eq(
        store: &dyn SchemaAdapter,
        table: &str,
        conditions: &[(&str, Value)],
    ) -> Self {
        let mut statement = Self::new(format!("SELECT * FROM {}", store.quote_identifier(table)));
        statement.push_where(store, conditions);
        statement
    }

    /// `INSERT INTO table (c1, c2, ...) VALUES (?, ?, ...)`
    pub fn insert(store: &dyn SchemaAdapter, table: &str, columns: &[(String, Value)]) -> Self {
        let names: Vec<String> = columns
            .iter()
            .map(|(name, _)| store.quote_identifier(name))
            .collect();
        let markers: Vec<String> = (1..=columns.len()).map(|i| store.placeholder(i)).collect();

        Self {
            sql: format!(
                "INSERT INTO {} ({}) VALUES ({})",
                store.quote_identifier(table),
                names.join(", "),
                markers.join(", ")
            ),
            params: columns.iter().map(|(_, value)| value.clone()).collect(),
        }
    }

    /// `UPDATE table SET a1 = ?, ... WHERE c1 = ? AND ...`
    pub fn update_eq(
        store: &dyn SchemaAdapter,
        table: &str,
        assignments: &[(String, Value)],
        conditions: &[(&str, Value)],
    ) -> Self {
        let sets: Vec<String> = assignments
            .iter()
            .enumerate()
            .map(|(i, (name, _))| {
                format!("{} = {}", store.quote_identifier(name), store.placeholder(i + 1))
            })
            .collect();

        let mut statement = Self {
            sql: format!(
                "UPDATE {} SET {}",
                store.quote_identifier(table),
                sets.join(", ")
            ),
            params: assignments.iter().map(|(_, value)| value.clone()).collect(),
        };
        statement.push_where(store, conditions);
        statement
    }

    fn push_where(&mut self, store: &dyn SchemaAdapter, conditions: &[(&str, Value)]) {
        if conditions.is_empty() {
            return;
        }
        let clauses: Vec<String> = conditions
            .iter()
            .enumerate()
            .map(|(i, (name, _))| {
                format!(
                    "{} = {}",
                    store.quote_identifier(name),
                    store.placeholder(self.params.len() + i + 1)
                )
            })
            .collect();
        self.sql.push_str(" WHERE ");
        self.sql.push_str(&clauses.join(" AND "));
        self.params
            .extend(conditions.iter().map(|(_, value)| value.clone()));
    }

    /// Render the statement with inlined literals, for logs and error text.
    pub fn render(&self, store: &dyn SchemaAdapter) -> String {
        let params: Vec<String> = self.params.iter().map(|p| store.quote(p)).collect();
        format!("{} -- [{}]", self.sql, params.join(", "))
    }
}

/// Read an integer column, accepting numeric text.
pub fn row_i64(row: &Row, column: &str) -> Result<Option<i64>, Error> {
    match row.get(column) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| Error::InvalidData(format!("column {} is not an integer: {}", column, n))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| Error::InvalidData(format!("column {} is not an integer: {:?}", column, s))),
        Some(other) => Err(Error::InvalidData(format!(
            "column {} is not an integer: {}",
            column, other
        ))),
    }
}

/// Read a required integer column.
pub fn require_i64(row: &Row, column: &str) -> Result<i64, Error> {
    row_i64(row, column)?.ok_or_else(|| Error::InvalidData(format!("column {} is missing", column)))
}

/// Read a text column.
pub fn row_string(row: &Row, column: &str) -> Result<Option<String>, Error> {
    match row.get(column) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(Error::InvalidData(format!(
            "column {} is not text: {}",
            column, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_select_eq_sql() {
        let store = SqliteStore::open_in_memory().unwrap();
        let stmt = Statement::select_eq(
            &store,
            "attachable_journals",
            &[("journal_id", json!(3)), ("attachment_id", json!(5))],
        );
        assert_eq!(
            stmt.sql,
            r#"SELECT * FROM "attachable_journals" WHERE "journal_id" = ?1 AND "attachment_id" = ?2"#
        );
        assert_eq!(stmt.params, vec![json!(3), json!(5)]);
    }

    #[test]
    fn test_update_placeholders_follow_assignments() {
        let store = SqliteStore::open_in_memory().unwrap();
        let stmt = Statement::update_eq(
            &store,
            "news_journals",
            &[("title".to_string(), json!("t")), ("summary".to_string(), json!("s"))],
            &[("journal_id", json!(9))],
        );
        assert_eq!(
            stmt.sql,
            r#"UPDATE "news_journals" SET "title" = ?1, "summary" = ?2 WHERE "journal_id" = ?3"#
        );
        assert_eq!(stmt.params.len(), 3);
    }

    #[test]
    fn test_render_inlines_literals() {
        let store = SqliteStore::open_in_memory().unwrap();
        let stmt = Statement::new("SELECT ?1, ?2").bind(json!("it's")).bind(Value::Null);
        assert_eq!(stmt.render(&store), "SELECT ?1, ?2 -- ['it''s', NULL]");
    }

    #[test]
    fn test_row_i64_accepts_text() {
        let mut row = Row::new();
        row.insert("id".to_string(), json!("42"));
        row.insert("user_id".to_string(), Value::Null);
        row.insert("notes".to_string(), json!("x"));

        assert_eq!(row_i64(&row, "id").unwrap(), Some(42));
        assert_eq!(row_i64(&row, "user_id").unwrap(), None);
        assert!(row_i64(&row, "notes").is_err());
        assert!(require_i64(&row, "missing").is_err());
    }
}
