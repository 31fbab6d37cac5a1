//! Row normalization: every row returned to a caller is a mapping from
//! lowercase column name to a [`serde_json::Value`], regardless of which
//! backend produced it. This removes backend branching from every store.

use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo};

#[derive(Debug, Clone, Default)]
pub struct NormalizedRow(pub HashMap<String, Value>);

impl NormalizedRow {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn text(&self, key: &str) -> Result<String> {
        self.get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("column `{key}` missing or not text"))
    }

    pub fn opt_text(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str()).map(str::to_string)
    }

    pub fn int(&self, key: &str) -> Result<i64> {
        self.get(key)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| anyhow::anyhow!("column `{key}` missing or not integer"))
    }

    pub fn opt_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_i64())
    }

    /// SQLite has no native boolean storage class; it round-trips through
    /// an integer column. Accept either representation.
    pub fn boolean(&self, key: &str) -> Result<bool> {
        match self.get(key) {
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::Number(n)) => Ok(n.as_i64().map(|i| i != 0).unwrap_or(false)),
            _ => Err(anyhow::anyhow!("column `{key}` missing or not boolean")),
        }
    }

    pub fn timestamp(&self, key: &str) -> Result<DateTime<Utc>> {
        let raw = self.text(key)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| anyhow::anyhow!("column `{key}` is not a valid timestamp: {e}"))
    }

    pub fn opt_timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        self.opt_text(key)
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn json(&self, key: &str) -> Result<Value> {
        match self.get(key) {
            Some(Value::String(s)) => {
                serde_json::from_str(s).map_err(|e| anyhow::anyhow!("column `{key}` is not valid json: {e}"))
            }
            Some(other) => Ok(other.clone()),
            None => Err(anyhow::anyhow!("column `{key}` missing")),
        }
    }
}

pub fn from_pg_row(row: &PgRow) -> Result<NormalizedRow> {
    let mut map = HashMap::with_capacity(row.columns().len());
    for col in row.columns() {
        let name = col.name().to_ascii_lowercase();
        let type_name = col.type_info().name().to_ascii_uppercase();
        let value = match type_name.as_str() {
            "INT4" | "INT8" | "INT2" => row
                .try_get::<Option<i64>, _>(col.ordinal())
                .ok()
                .flatten()
                .map(Value::from)
                .unwrap_or(Value::Null),
            "BOOL" => row
                .try_get::<Option<bool>, _>(col.ordinal())
                .ok()
                .flatten()
                .map(Value::from)
                .unwrap_or(Value::Null),
            "TIMESTAMPTZ" | "TIMESTAMP" => row
                .try_get::<Option<DateTime<Utc>>, _>(col.ordinal())
                .ok()
                .flatten()
                .map(|dt| Value::from(dt.to_rfc3339()))
                .unwrap_or(Value::Null),
            "JSON" | "JSONB" => row
                .try_get::<Option<Value>, _>(col.ordinal())
                .ok()
                .flatten()
                .unwrap_or(Value::Null),
            _ => row
                .try_get::<Option<String>, _>(col.ordinal())
                .ok()
                .flatten()
                .map(Value::from)
                .unwrap_or(Value::Null),
        };
        map.insert(name, value);
    }
    Ok(NormalizedRow(map))
}

pub fn from_sqlite_row(row: &SqliteRow) -> Result<NormalizedRow> {
    let mut map = HashMap::with_capacity(row.columns().len());
    for col in row.columns() {
        let name = col.name().to_ascii_lowercase();
        // SQLite is dynamically typed at the storage level; try integer,
        // then real, then text, falling back to NULL.
        let value = if let Ok(Some(i)) = row.try_get::<Option<i64>, _>(col.ordinal()) {
            Value::from(i)
        } else if let Ok(Some(s)) = row.try_get::<Option<String>, _>(col.ordinal()) {
            Value::from(s)
        } else if let Ok(Some(f)) = row.try_get::<Option<f64>, _>(col.ordinal()) {
            Value::from(f)
        } else {
            Value::Null
        };
        map.insert(name, value);
    }
    Ok(NormalizedRow(map))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_report_missing_columns() {
        let row = NormalizedRow::default();
        assert!(row.text("missing").is_err());
        assert!(row.int("missing").is_err());
        assert!(row.opt_text("missing").is_none());
    }

    #[test]
    fn json_column_decodes_from_string_payload() {
        let mut map = HashMap::new();
        map.insert("errors".to_string(), Value::from(r#"[{"ticker":"AAA"}]"#));
        let row = NormalizedRow(map);
        let decoded = row.json("errors").unwrap();
        assert!(decoded.is_array());
        assert_eq!(decoded[0]["ticker"], "AAA");
    }
}
