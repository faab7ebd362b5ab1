use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use sqlx::mysql::MySqlArguments;
use sqlx::query::{Query, QueryAs, QueryScalar};
use sqlx::{Executor, MySql};

use crate::error::ApiError;

/// A value bound into a dynamically built statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Null,
}

#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// Builds `UPDATE <table> SET a = ?, b = ? WHERE <id_column> = ?` from a
/// JSON object. Only keys listed in `allowed_columns` may appear; column
/// names never come from the request verbatim.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    allowed_columns: &[&'static str],
    id_column: &str,
    id_value: u64,
) -> Result<SqlUpdate, ApiError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| ApiError::bad_request("Payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(ApiError::bad_request("No fields provided for update"));
    }

    let mut columns = Vec::with_capacity(obj.len());
    let mut values = Vec::with_capacity(obj.len() + 1);

    for (key, value) in obj {
        let column = allowed_columns
            .iter()
            .find(|c| **c == key.as_str())
            .ok_or_else(|| ApiError::bad_request(format!("Field '{}' cannot be updated", key)))?;
        columns.push(format!("{} = ?", column));
        values.push(to_sql_value(value)?);
    }

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        table,
        columns.join(", "),
        id_column
    );
    values.push(SqlValue::U64(id_value));

    Ok(SqlUpdate { sql, values })
}

fn to_sql_value(value: &Value) -> Result<SqlValue, ApiError> {
    Ok(match value {
        Value::String(s) => {
            if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                SqlValue::Date(d)
            } else if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
                SqlValue::DateTime(dt)
            } else {
                SqlValue::String(s.clone())
            }
        }
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                SqlValue::U64(u)
            } else if let Some(i) = n.as_i64() {
                SqlValue::I64(i)
            } else if let Some(f) = n.as_f64() {
                SqlValue::F64(f)
            } else {
                return Err(ApiError::bad_request("Unsupported number"));
            }
        }
        Value::Bool(b) => SqlValue::Bool(*b),
        Value::Null => SqlValue::Null,
        _ => return Err(ApiError::bad_request("Unsupported JSON value type")),
    })
}

macro_rules! bind_each {
    ($query:expr, $values:expr) => {{
        let mut query = $query;
        for value in $values {
            query = match value {
                SqlValue::String(v) => query.bind(v.clone()),
                SqlValue::I64(v) => query.bind(*v),
                SqlValue::U64(v) => query.bind(*v),
                SqlValue::F64(v) => query.bind(*v),
                SqlValue::Bool(v) => query.bind(*v),
                SqlValue::Date(v) => query.bind(*v),
                SqlValue::DateTime(v) => query.bind(*v),
                SqlValue::Null => query.bind(None::<String>),
            };
        }
        query
    }};
}

pub fn bind_query<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    values: &[SqlValue],
) -> Query<'q, MySql, MySqlArguments> {
    bind_each!(query, values)
}

pub fn bind_query_as<'q, O>(
    query: QueryAs<'q, MySql, O, MySqlArguments>,
    values: &[SqlValue],
) -> QueryAs<'q, MySql, O, MySqlArguments> {
    bind_each!(query, values)
}

pub fn bind_query_scalar<'q, O>(
    query: QueryScalar<'q, MySql, O, MySqlArguments>,
    values: &[SqlValue],
) -> QueryScalar<'q, MySql, O, MySqlArguments> {
    bind_each!(query, values)
}

/// Runs the update on a pool or an open transaction; returns the affected
/// row count.
pub async fn execute_update<'e, E>(executor: E, update: SqlUpdate) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = MySql>,
{
    let query = bind_query(sqlx::query(&update.sql), &update.values);
    let result = query.execute(executor).await?;
    Ok(result.rows_affected())
}

/// MySQL reports unique-key violations as SQLSTATE 23000.
pub fn is_duplicate_key(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23000"))
}

/// `?, ?, ?` for an `IN (...)` list of `n` items.
pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
