//! PostgreSQL backend over `tokio-postgres`.
//!
//! [`Value`] parameters are encoded according to the type the server inferred for each placeholder, so
//! an `i64` bound against an `int4` column is narrowed instead of rejected. Result cells are decoded by
//! column type into [`Value`].

use std::error::Error;
use std::sync::Arc;

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tokio_postgres::types::{IsNull, ToSql, Type};
use uuid::Uuid;

use crate::client::GenericClient;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::row::Row;
use crate::value::Value;

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => match *ty {
                Type::INT2 | Type::INT4 | Type::INT8 => Value::Int(i64::from(*b)).to_sql(ty, out),
                _ => b.to_sql(ty, out),
            },
            Value::Int(i) => match *ty {
                Type::BOOL => (*i != 0).to_sql(ty, out),
                Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
                Type::OID => u32::try_from(*i)?.to_sql(ty, out),
                Type::FLOAT4 => (*i as f32).to_sql(ty, out),
                Type::FLOAT8 => (*i as f64).to_sql(ty, out),
                Type::NUMERIC => Decimal::from(*i).to_sql(ty, out),
                _ => i.to_sql(ty, out),
            },
            Value::Float(f) => match *ty {
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                Type::NUMERIC => Decimal::try_from(*f)?.to_sql(ty, out),
                _ => f.to_sql(ty, out),
            },
            Value::Decimal(d) => match *ty {
                Type::FLOAT8 => d
                    .to_f64()
                    .ok_or("decimal out of range for float8")?
                    .to_sql(ty, out),
                Type::INT8 => d
                    .to_i64()
                    .ok_or("decimal out of range for int8")?
                    .to_sql(ty, out),
                _ => d.to_sql(ty, out),
            },
            Value::Text(s) => match *ty {
                Type::UUID => Uuid::parse_str(s)?.to_sql(ty, out),
                _ => s.as_str().to_sql(ty, out),
            },
            Value::Bytes(b) => b.as_slice().to_sql(ty, out),
            Value::Json(j) => match *ty {
                Type::TEXT | Type::VARCHAR => j.to_string().to_sql(ty, out),
                _ => j.to_sql(ty, out),
            },
            Value::Date(d) => d.to_sql(ty, out),
            Value::Time(t) => t.to_sql(ty, out),
            Value::Timestamp(ts) => ts.to_sql(ty, out),
            Value::TimestampTz(ts) => ts.to_sql(ty, out),
            Value::Uuid(u) => u.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

fn params_ref(params: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

fn decode_rows(rows: Vec<tokio_postgres::Row>) -> OrmResult<Vec<Row>> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    let columns: Arc<[String]> = first
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    rows.iter()
        .map(|row| {
            let values = (0..row.len())
                .map(|idx| decode_cell(row, idx))
                .collect::<OrmResult<Vec<_>>>()?;
            Ok(Row::new(Arc::clone(&columns), values))
        })
        .collect()
}

fn decode_cell(row: &tokio_postgres::Row, idx: usize) -> OrmResult<Value> {
    let column = &row.columns()[idx];
    let value = match *column.type_() {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx).map(Value::from),
        Type::INT2 => row.try_get::<_, Option<i16>>(idx).map(Value::from),
        Type::INT4 => row.try_get::<_, Option<i32>>(idx).map(Value::from),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx).map(Value::from),
        Type::OID => row.try_get::<_, Option<u32>>(idx).map(Value::from),
        Type::FLOAT4 => row.try_get::<_, Option<f32>>(idx).map(Value::from),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx).map(Value::from),
        Type::NUMERIC => row.try_get::<_, Option<Decimal>>(idx).map(Value::from),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            row.try_get::<_, Option<String>>(idx).map(Value::from)
        }
        Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(idx).map(Value::from),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<serde_json::Value>>(idx)
            .map(Value::from),
        Type::DATE => row.try_get::<_, Option<NaiveDate>>(idx).map(Value::from),
        Type::TIME => row.try_get::<_, Option<NaiveTime>>(idx).map(Value::from),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)
            .map(Value::from),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)
            .map(Value::from),
        Type::UUID => row.try_get::<_, Option<Uuid>>(idx).map(Value::from),
        ref other => {
            return Err(OrmError::decode(
                column.name(),
                format!("unsupported column type {other}"),
            ));
        }
    };
    value.map_err(|e| OrmError::decode(column.name(), e.to_string()))
}

impl GenericClient for tokio_postgres::Client {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        let rows = tokio_postgres::Client::query(self, sql, &params_ref(params))
            .await
            .map_err(OrmError::from_db_error)?;
        decode_rows(rows)
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        tokio_postgres::Client::execute(self, sql, &params_ref(params))
            .await
            .map_err(OrmError::from_db_error)
    }
}

impl GenericClient for tokio_postgres::Transaction<'_> {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        let rows = tokio_postgres::Transaction::query(self, sql, &params_ref(params))
            .await
            .map_err(OrmError::from_db_error)?;
        decode_rows(rows)
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        tokio_postgres::Transaction::execute(self, sql, &params_ref(params))
            .await
            .map_err(OrmError::from_db_error)
    }
}
