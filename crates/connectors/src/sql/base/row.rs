use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use core::fmt;
use model::{core::value::Value, records::record::Record};
use mysql_async::{
    Row as MySqlRow,
    consts::{ColumnFlags, ColumnType},
    prelude::FromValue,
};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use std::fmt::Formatter;
use tokio_postgres::{Row as PgRow, types::Type as PgType};
use tracing::warn;

/// MySQL reports this character set number for binary strings and blobs.
const MYSQL_BINARY_CHARSET: u16 = 63;

pub enum DbRow<'a> {
    MySqlRow(&'a MySqlRow),
    PostgresRow(&'a PgRow),
}

impl DbRow<'_> {
    /// Decodes every column of the row, keeping the column order of the query.
    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        for (idx, name) in self.columns().into_iter().enumerate() {
            let value = match self {
                DbRow::MySqlRow(row) => mysql_value(row, idx),
                DbRow::PostgresRow(row) => pg_value(row, idx),
            };
            record.insert(name, value);
        }
        record
    }

    pub fn columns(&self) -> Vec<String> {
        match self {
            DbRow::MySqlRow(row) => row
                .columns_ref()
                .iter()
                .map(|col| col.name_str().into_owned())
                .collect(),
            DbRow::PostgresRow(row) => row
                .columns()
                .iter()
                .map(|col| col.name().to_string())
                .collect(),
        }
    }
}

fn mysql_value(row: &MySqlRow, idx: usize) -> Value {
    if matches!(row.as_ref(idx), None | Some(mysql_async::Value::NULL)) {
        return Value::Null;
    }

    let column = &row.columns_ref()[idx];
    let unsigned = column.flags().contains(ColumnFlags::UNSIGNED_FLAG);

    let decoded = match column.column_type() {
        ColumnType::MYSQL_TYPE_TINY
        | ColumnType::MYSQL_TYPE_SHORT
        | ColumnType::MYSQL_TYPE_INT24
        | ColumnType::MYSQL_TYPE_LONG
        | ColumnType::MYSQL_TYPE_LONGLONG
        | ColumnType::MYSQL_TYPE_YEAR => {
            if unsigned {
                mysql_get::<u64>(row, idx).map(Value::Uint)
            } else {
                mysql_get::<i64>(row, idx).map(Value::Int)
            }
        }
        ColumnType::MYSQL_TYPE_FLOAT
        | ColumnType::MYSQL_TYPE_DOUBLE
        | ColumnType::MYSQL_TYPE_DECIMAL
        | ColumnType::MYSQL_TYPE_NEWDECIMAL => mysql_get::<f64>(row, idx).map(Value::Float),
        ColumnType::MYSQL_TYPE_DATETIME
        | ColumnType::MYSQL_TYPE_DATETIME2
        | ColumnType::MYSQL_TYPE_TIMESTAMP
        | ColumnType::MYSQL_TYPE_TIMESTAMP2 => {
            mysql_get::<NaiveDateTime>(row, idx).map(Value::DateTime)
        }
        ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE => {
            mysql_get::<NaiveDate>(row, idx).map(Value::Date)
        }
        ColumnType::MYSQL_TYPE_JSON => mysql_get::<String>(row, idx).map(|text| {
            serde_json::from_str(&text)
                .map(Value::Json)
                .unwrap_or(Value::String(text))
        }),
        ColumnType::MYSQL_TYPE_TINY_BLOB
        | ColumnType::MYSQL_TYPE_MEDIUM_BLOB
        | ColumnType::MYSQL_TYPE_LONG_BLOB
        | ColumnType::MYSQL_TYPE_BLOB
        | ColumnType::MYSQL_TYPE_GEOMETRY
        | ColumnType::MYSQL_TYPE_BIT
            if column.character_set() == MYSQL_BINARY_CHARSET =>
        {
            mysql_get::<Vec<u8>>(row, idx).map(Value::Bytes)
        }
        _ => mysql_get::<String>(row, idx).map(Value::String),
    };

    decoded.unwrap_or_else(|| {
        warn!(
            "Could not decode MySQL column '{}' ({:?}); keeping raw bytes",
            column.name_str(),
            column.column_type()
        );
        mysql_get::<Vec<u8>>(row, idx)
            .map(Value::Bytes)
            .unwrap_or(Value::Null)
    })
}

fn mysql_get<T: FromValue>(row: &MySqlRow, idx: usize) -> Option<T> {
    row.get_opt::<T, usize>(idx).and_then(|res| res.ok())
}

fn pg_value(row: &PgRow, idx: usize) -> Value {
    let column = &row.columns()[idx];
    let ty = column.type_();

    let decoded = if *ty == PgType::INT2 {
        pg_get::<i16>(row, idx).map(|v| v.map(|v| Value::Int(i64::from(v))))
    } else if *ty == PgType::INT4 {
        pg_get::<i32>(row, idx).map(|v| v.map(|v| Value::Int(i64::from(v))))
    } else if *ty == PgType::INT8 {
        pg_get::<i64>(row, idx).map(|v| v.map(Value::Int))
    } else if *ty == PgType::FLOAT4 {
        pg_get::<f32>(row, idx).map(|v| v.map(|v| Value::Float(f64::from(v))))
    } else if *ty == PgType::FLOAT8 {
        pg_get::<f64>(row, idx).map(|v| v.map(Value::Float))
    } else if *ty == PgType::NUMERIC {
        pg_get::<Decimal>(row, idx).map(|v| v.and_then(|d| d.to_f64()).map(Value::Float))
    } else if *ty == PgType::BOOL {
        pg_get::<bool>(row, idx).map(|v| v.map(Value::Boolean))
    } else if *ty == PgType::TIMESTAMP {
        pg_get::<NaiveDateTime>(row, idx).map(|v| v.map(Value::DateTime))
    } else if *ty == PgType::TIMESTAMPTZ {
        pg_get::<DateTime<Utc>>(row, idx).map(|v| v.map(Value::Timestamp))
    } else if *ty == PgType::DATE {
        pg_get::<NaiveDate>(row, idx).map(|v| v.map(Value::Date))
    } else if *ty == PgType::JSON || *ty == PgType::JSONB {
        pg_get::<serde_json::Value>(row, idx).map(|v| v.map(Value::Json))
    } else if *ty == PgType::BYTEA {
        pg_get::<Vec<u8>>(row, idx).map(|v| v.map(Value::Bytes))
    } else {
        pg_get::<String>(row, idx).map(|v| v.map(Value::String))
    };

    match decoded {
        Some(value) => value.unwrap_or(Value::Null),
        None => {
            warn!(
                "Could not decode Postgres column '{}' of type {}; storing NULL",
                column.name(),
                ty.name()
            );
            Value::Null
        }
    }
}

/// `None` when decoding failed, `Some(None)` for SQL NULL.
fn pg_get<'a, T>(row: &'a PgRow, idx: usize) -> Option<Option<T>>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get::<_, Option<T>>(idx).ok()
}

impl fmt::Debug for DbRow<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DbRow::MySqlRow(row) => write!(f, "{row:?}"),
            DbRow::PostgresRow(row) => write!(f, "{row:?}"),
        }
    }
}
