// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, params_from_iter};
use serde_json::{Number, Value};
use std::collections::BTreeSet;
use std::path::Path;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::{Filter, Row, TableBackend, TableNames, is_safe_identifier};

/// Local stand-in for the hosted tables, used by demo mode and tests.
pub struct SqliteBackend {
    conn: Connection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PragmaColumn {
    pub name: String,
    pub column_type: String,
}

impl PragmaColumn {
    fn is_boolean(&self) -> bool {
        self.column_type.to_ascii_uppercase().starts_with("BOOL")
    }
}

impl SqliteBackend {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    /// Creates both tables if they do not exist yet.
    pub fn bootstrap(&self, tables: &TableNames) -> Result<()> {
        tables.validate()?;
        let schema = include_str!("sql/schema.sql")
            .replace("{customers}", &tables.customers)
            .replace("{orders}", &tables.orders);
        self.conn
            .execute_batch(&schema)
            .context("create schema")?;
        Ok(())
    }

    pub fn table_columns(&self, table: &str) -> Result<Vec<PragmaColumn>> {
        checked_identifier(table)?;
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .with_context(|| format!("inspect columns for {table}"))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(PragmaColumn {
                    name: row.get(1)?,
                    column_type: row.get(2)?,
                })
            })
            .with_context(|| format!("query column info for {table}"))?;
        let columns = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("collect columns for {table}"))?;
        if columns.is_empty() {
            bail!("table {table} does not exist");
        }
        Ok(columns)
    }

    fn boolean_columns(&self, table: &str) -> Result<BTreeSet<String>> {
        Ok(self
            .table_columns(table)?
            .into_iter()
            .filter(PragmaColumn::is_boolean)
            .map(|column| column.name)
            .collect())
    }

    fn query_rows(&self, table: &str, sql: &str, params: Vec<SqlValue>) -> Result<Vec<Row>> {
        let booleans = self.boolean_columns(table)?;
        let mut stmt = self
            .conn
            .prepare(sql)
            .with_context(|| format!("prepare query on {table}"))?;
        let names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_owned)
            .collect();

        let mut rows = stmt
            .query(params_from_iter(params))
            .with_context(|| format!("query {table}"))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().with_context(|| format!("read {table} row"))? {
            let mut record = Row::new();
            for (index, name) in names.iter().enumerate() {
                let value = row
                    .get_ref(index)
                    .with_context(|| format!("read {table}.{name}"))?;
                record.insert(name.clone(), json_value(value, booleans.contains(name)));
            }
            out.push(record);
        }
        Ok(out)
    }
}

impl TableBackend for SqliteBackend {
    fn select(&self, table: &str, filters: &[Filter]) -> Result<Vec<Row>> {
        checked_identifier(table)?;
        let (clause, params) = where_clause(filters)?;
        let sql = format!("SELECT * FROM {table}{clause} ORDER BY id ASC");
        self.query_rows(table, &sql, params)
    }

    fn insert(&self, table: &str, record: &Row) -> Result<Row> {
        checked_identifier(table)?;
        let mut record = record.clone();
        let has_created_at = self
            .table_columns(table)?
            .iter()
            .any(|column| column.name == "created_at");
        if has_created_at && !record.contains_key("created_at") {
            record.insert("created_at".to_owned(), Value::String(now_rfc3339()?));
        }

        let sql = if record.is_empty() {
            format!("INSERT INTO {table} DEFAULT VALUES RETURNING *")
        } else {
            let mut columns = Vec::with_capacity(record.len());
            for column in record.keys() {
                checked_identifier(column)?;
                columns.push(column.as_str());
            }
            let placeholders = vec!["?"; columns.len()].join(", ");
            format!(
                "INSERT INTO {table} ({}) VALUES ({placeholders}) RETURNING *",
                columns.join(", ")
            )
        };
        let params = record.values().map(sql_value).collect();

        self.query_rows(table, &sql, params)?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("insert into {table} returned no row"))
    }

    fn update(&self, table: &str, record: &Row, filters: &[Filter]) -> Result<Vec<Row>> {
        checked_identifier(table)?;
        if filters.is_empty() {
            bail!("refusing to update every row of {table} -- pass a filter");
        }
        if record.is_empty() {
            return self.select(table, filters);
        }

        let mut assignments = Vec::with_capacity(record.len());
        for column in record.keys() {
            checked_identifier(column)?;
            assignments.push(format!("{column} = ?"));
        }
        let (clause, filter_params) = where_clause(filters)?;
        let sql = format!(
            "UPDATE {table} SET {}{clause} RETURNING *",
            assignments.join(", ")
        );
        let mut params: Vec<SqlValue> = record.values().map(sql_value).collect();
        params.extend(filter_params);

        let mut rows = self.query_rows(table, &sql, params)?;
        rows.sort_by_key(|row| row.get("id").and_then(Value::as_i64));
        Ok(rows)
    }

    fn delete(&self, table: &str, filters: &[Filter]) -> Result<()> {
        checked_identifier(table)?;
        if filters.is_empty() {
            bail!("refusing to delete every row of {table} -- pass a filter");
        }
        let (clause, params) = where_clause(filters)?;
        self.conn
            .execute(
                &format!("DELETE FROM {table}{clause}"),
                params_from_iter(params),
            )
            .with_context(|| format!("delete from {table}"))?;
        Ok(())
    }

    fn probe(&self, table: &str) -> Result<()> {
        self.table_columns(table).map(|_| ())
    }
}

fn checked_identifier(identifier: &str) -> Result<()> {
    if !is_safe_identifier(identifier) {
        bail!("invalid identifier: {identifier:?}");
    }
    Ok(())
}

fn where_clause(filters: &[Filter]) -> Result<(String, Vec<SqlValue>)> {
    if filters.is_empty() {
        return Ok((String::new(), Vec::new()));
    }
    let mut conditions = Vec::with_capacity(filters.len());
    let mut params = Vec::new();
    for filter in filters {
        checked_identifier(&filter.column)?;
        if filter.value.is_null() {
            conditions.push(format!("{} IS NULL", filter.column));
        } else {
            conditions.push(format!("{} = ?", filter.column));
            params.push(sql_value(&filter.value));
        }
    }
    Ok((format!(" WHERE {}", conditions.join(" AND ")), params))
}

fn sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(flag) => SqlValue::Integer(i64::from(*flag)),
        Value::Number(number) => match number.as_i64() {
            Some(integer) => SqlValue::Integer(integer),
            None => SqlValue::Real(number.as_f64().unwrap_or_default()),
        },
        Value::String(text) => SqlValue::Text(text.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn json_value(value: ValueRef<'_>, boolean: bool) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(integer) if boolean => Value::Bool(integer != 0),
        ValueRef::Integer(integer) => Value::from(integer),
        ValueRef::Real(real) => Number::from_f64(real).map_or(Value::Null, Value::Number),
        ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(blob) => Value::String(String::from_utf8_lossy(blob).into_owned()),
    }
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}

#[cfg(test)]
mod tests {
    use super::SqliteBackend;
    use crate::{Filter, Row, TableBackend, TableNames};
    use anyhow::Result;
    use serde_json::{Value, json};

    fn backend() -> Result<SqliteBackend> {
        let backend = SqliteBackend::open_memory()?;
        backend.bootstrap(&TableNames::default())?;
        Ok(backend)
    }

    fn record(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => Row::new(),
        }
    }

    #[test]
    fn bootstrap_is_idempotent() -> Result<()> {
        let backend = backend()?;
        backend.bootstrap(&TableNames::default())?;
        let columns = backend.table_columns("mikapi_customers")?;
        let names: Vec<&str> = columns.iter().map(|column| column.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "settled", "memo", "created_at"]);
        Ok(())
    }

    #[test]
    fn boolean_columns_come_back_as_json_bools() -> Result<()> {
        let backend = backend()?;
        let row = backend.insert(
            "mikapi_customers",
            &record(json!({ "name": "Tanaka", "settled": false })),
        )?;
        assert_eq!(row.get("settled"), Some(&json!(false)));
        assert_eq!(row.get("id"), Some(&json!(1)));
        assert!(row.get("created_at").is_some_and(Value::is_string));

        let open = backend.select("mikapi_customers", &[Filter::eq("settled", false)])?;
        assert_eq!(open.len(), 1);
        Ok(())
    }

    #[test]
    fn update_returns_changed_rows_only() -> Result<()> {
        let backend = backend()?;
        for name in ["Tanaka", "Sato"] {
            backend.insert(
                "mikapi_customers",
                &record(json!({ "name": name, "settled": false })),
            )?;
        }
        let updated = backend.update(
            "mikapi_customers",
            &record(json!({ "settled": true })),
            &[Filter::eq("id", 2)],
        )?;
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].get("name"), Some(&json!("Sato")));
        assert_eq!(updated[0].get("settled"), Some(&json!(true)));

        let missing = backend.update(
            "mikapi_customers",
            &record(json!({ "settled": true })),
            &[Filter::eq("id", 99)],
        )?;
        assert!(missing.is_empty());
        Ok(())
    }

    #[test]
    fn null_filters_match_missing_values() -> Result<()> {
        let backend = backend()?;
        backend.insert("mikapi_customers", &record(json!({ "name": "Tanaka" })))?;
        backend.insert(
            "mikapi_customers",
            &record(json!({ "name": "Sato", "memo": "regular" })),
        )?;
        let rows = backend.select("mikapi_customers", &[Filter::eq("memo", Value::Null)])?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name"), Some(&json!("Tanaka")));
        Ok(())
    }

    #[test]
    fn unfiltered_writes_and_unsafe_columns_are_rejected() -> Result<()> {
        let backend = backend()?;
        assert!(backend.delete("mikapi_orders", &[]).is_err());
        assert!(
            backend
                .update("mikapi_orders", &record(json!({ "price": 1 })), &[])
                .is_err()
        );
        let error = backend
            .select("mikapi_orders", &[Filter::eq("id; drop table x", 1)])
            .expect_err("unsafe column should fail");
        assert!(error.to_string().contains("invalid identifier"));
        Ok(())
    }

    #[test]
    fn missing_table_fails_probe() -> Result<()> {
        let backend = SqliteBackend::open_memory()?;
        let error = backend
            .probe("mikapi_orders")
            .expect_err("empty database has no tables");
        assert!(error.to_string().contains("does not exist"));
        Ok(())
    }
}
