//! Generic CRUD over named tables
//!
//! These primitives back every slice. Rows are exchanged as [`Record`]s of
//! dynamically typed [`Value`]s; predicates are SQL fragments with `?`
//! placeholders bound positionally from `args`. Column names are checked to be
//! plain identifiers before they are spliced into SQL.

use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Row, Sqlite, SqliteConnection, TypeInfo, ValueRef};

use cadence_core::{CadenceError, Result};

use crate::locks::{RowKey, RowLocks};
use crate::schema::Table;

/// A dynamically typed column value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// An ordered set of `column = value` pairs
///
/// Used both as a selected row and as an insert payload / update assignment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field setter
    #[must_use]
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    /// Set a field, replacing an earlier value for the same column
    pub fn set(&mut self, column: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| name == column) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((column.to_string(), value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, value)| value)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    fn require(&self, column: &str) -> Result<&Value> {
        self.get(column)
            .ok_or_else(|| CadenceError::Serialization(format!("missing column `{column}`")))
    }

    pub fn get_i64(&self, column: &str) -> Result<i64> {
        self.require(column)?.as_i64().ok_or_else(|| {
            CadenceError::Serialization(format!("column `{column}` is not an integer"))
        })
    }

    pub fn get_bool(&self, column: &str) -> Result<bool> {
        Ok(self.get_i64(column)? != 0)
    }

    pub fn get_string(&self, column: &str) -> Result<String> {
        self.require(column)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| CadenceError::Serialization(format!("column `{column}` is not text")))
    }

    pub fn get_opt_string(&self, column: &str) -> Result<Option<String>> {
        match self.require(column)? {
            Value::Null => Ok(None),
            Value::Text(v) => Ok(Some(v.clone())),
            _ => Err(CadenceError::Serialization(format!(
                "column `{column}` is not text"
            ))),
        }
    }
}

fn check_identifier(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(CadenceError::invalid_argument(format!(
            "invalid column name `{name}`"
        )))
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    args: &[Value],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for arg in args {
        query = match arg {
            Value::Null => query.bind(None::<i64>),
            Value::Integer(v) => query.bind(*v),
            Value::Real(v) => query.bind(*v),
            Value::Text(v) => query.bind(v.clone()),
        };
    }
    query
}

fn decode_row(row: &SqliteRow) -> Result<Record> {
    let mut record = Record::new();
    for (i, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(i)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let type_name = raw.type_info().name().to_string();
            match type_name.as_str() {
                "INTEGER" | "BOOLEAN" => Value::Integer(row.try_get(i)?),
                "REAL" => Value::Real(row.try_get(i)?),
                "TEXT" => Value::Text(row.try_get(i)?),
                other => {
                    return Err(CadenceError::Serialization(format!(
                        "unsupported column type {other} for `{}`",
                        column.name()
                    )))
                }
            }
        };
        record.set(column.name(), value);
    }
    Ok(record)
}

fn where_clause(predicate: Option<&str>) -> String {
    predicate.map_or_else(String::new, |p| format!(" WHERE {p}"))
}

/// Select rows from `table`
///
/// `columns = None` selects every column; `predicate = None` selects every
/// row. Rows come back ordered by the table's order column.
pub async fn select_from(
    conn: &mut SqliteConnection,
    table: Table,
    columns: Option<&[&str]>,
    predicate: Option<&str>,
    args: &[Value],
) -> Result<Vec<Record>> {
    let projection = match columns {
        Some(cols) if !cols.is_empty() => {
            for col in cols {
                check_identifier(col)?;
            }
            cols.join(", ")
        }
        _ => "*".to_string(),
    };

    let sql = format!(
        "SELECT {projection} FROM {table}{} ORDER BY {}",
        where_clause(predicate),
        table.order_column()
    );

    let rows = bind_all(sqlx::query(&sql), args)
        .fetch_all(&mut *conn)
        .await?;

    rows.iter().map(decode_row).collect()
}

/// First row matching `predicate`, if any
pub async fn select_one(
    conn: &mut SqliteConnection,
    table: Table,
    predicate: &str,
    args: &[Value],
) -> Result<Option<Record>> {
    Ok(select_from(conn, table, None, Some(predicate), args)
        .await?
        .into_iter()
        .next())
}

/// Insert `record` into `table`, returning the new row id
///
/// # Errors
///
/// `InvalidArgument` for an empty record, `ConstraintViolation` when a unique
/// or foreign key constraint fails
pub async fn insert_into(
    conn: &mut SqliteConnection,
    table: Table,
    record: &Record,
) -> Result<i64> {
    if record.is_empty() {
        return Err(CadenceError::invalid_argument(format!(
            "empty insert into {table}"
        )));
    }
    for col in record.columns() {
        check_identifier(col)?;
    }

    let columns = record.columns().collect::<Vec<_>>().join(", ");
    let placeholders = vec!["?"; record.len()].join(", ");
    let sql = format!("INSERT INTO {table} ({columns}) VALUES ({placeholders})");
    let args: Vec<Value> = record.values().cloned().collect();

    let result = bind_all(sqlx::query(&sql), &args)
        .execute(&mut *conn)
        .await?;

    Ok(result.last_insert_rowid())
}

/// Apply `assignments` to the rows matching `predicate`
///
/// Assignment values are bound before `args`.
pub async fn update(
    conn: &mut SqliteConnection,
    table: Table,
    assignments: &Record,
    predicate: Option<&str>,
    args: &[Value],
) -> Result<u64> {
    if assignments.is_empty() {
        return Err(CadenceError::invalid_argument(format!(
            "empty update of {table}"
        )));
    }
    for col in assignments.columns() {
        check_identifier(col)?;
    }

    let set = assignments
        .columns()
        .map(|col| format!("{col} = ?"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("UPDATE {table} SET {set}{}", where_clause(predicate));

    let mut all_args: Vec<Value> = assignments.values().cloned().collect();
    all_args.extend_from_slice(args);

    let result = bind_all(sqlx::query(&sql), &all_args)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

/// Delete the rows matching `predicate` (every row when `None`)
pub async fn delete_from(
    conn: &mut SqliteConnection,
    table: Table,
    predicate: Option<&str>,
    args: &[Value],
) -> Result<u64> {
    let sql = format!("DELETE FROM {table}{}", where_clause(predicate));
    let result = bind_all(sqlx::query(&sql), args)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Whether any row matches `predicate`
pub async fn exists_in(
    conn: &mut SqliteConnection,
    table: Table,
    predicate: &str,
    args: &[Value],
) -> Result<bool> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE {predicate})");
    let found: i64 = bind_all(sqlx::query(&sql), args)
        .fetch_one(&mut *conn)
        .await?
        .try_get(0)?;
    Ok(found != 0)
}

/// Insert `record` unless a row matching `predicate` already exists
///
/// The check and the insert run under the table lock, so two callers racing
/// on the same key cannot both insert. Returns the new id, or `None` when the
/// row was already present.
pub async fn insert_if_not_exists(
    conn: &mut SqliteConnection,
    locks: &RowLocks,
    table: Table,
    predicate: &str,
    args: &[Value],
    record: &Record,
) -> Result<Option<i64>> {
    let _guard = locks.lock(RowKey::Table(table)).await;
    if exists_in(conn, table, predicate, args).await? {
        return Ok(None);
    }
    insert_into(conn, table, record).await.map(Some)
}

/// Negate an integer flag column of the row `id`, returning the new value
///
/// The new value is derived from the stored one, never from the caller, and
/// the read and write run under the row lock.
pub async fn toggle_flag(
    conn: &mut SqliteConnection,
    locks: &RowLocks,
    table: Table,
    id: i64,
    column: &str,
) -> Result<bool> {
    check_identifier(column)?;
    let _guard = locks.lock(RowKey::Row(table, id)).await;

    let row = select_from(conn, table, Some(&[column]), Some("id = ?"), &[id.into()])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| CadenceError::not_found(table.as_str(), id))?;

    let toggled = !row.get_bool(column)?;
    update(
        conn,
        table,
        &Record::new().with(column, toggled),
        Some("id = ?"),
        &[id.into()],
    )
    .await?;

    Ok(toggled)
}
