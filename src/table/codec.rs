//! Row Codec
//!
//! Marshals rows to record bytes in schema order, and back.

use std::collections::HashSet;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{DbError, Result};
use crate::storage::MAX_RECORD_SIZE;

use super::{ColumnAttribute, ColumnAttributes, ColumnNames, DataType, Identifier, Row, Value};

/// Converts rows of one fixed schema to and from bytes
#[derive(Debug, Clone)]
pub struct RowCodec {
    column_names: ColumnNames,
    column_attributes: ColumnAttributes,
}

impl RowCodec {
    /// Build a codec for parallel column names and attributes
    pub fn new(column_names: ColumnNames, column_attributes: ColumnAttributes) -> Result<Self> {
        if column_names.len() != column_attributes.len() {
            return Err(DbError::SchemaMismatch(format!(
                "{} column names but {} column attributes",
                column_names.len(),
                column_attributes.len()
            )));
        }

        let mut seen = HashSet::new();
        for name in &column_names {
            if !seen.insert(name.as_str()) {
                return Err(DbError::SchemaMismatch(format!("Duplicate column {}", name)));
            }
        }

        Ok(Self {
            column_names,
            column_attributes,
        })
    }

    /// Get the column names in schema order
    pub fn column_names(&self) -> &[Identifier] {
        &self.column_names
    }

    /// Get the column attributes in schema order
    pub fn column_attributes(&self) -> &[ColumnAttribute] {
        &self.column_attributes
    }

    /// Project `row` onto the schema
    ///
    /// Every schema column must be present with a value of its type;
    /// columns the schema does not know are dropped.
    pub fn validate(&self, row: &Row) -> Result<Row> {
        let mut full = Row::new();
        for (name, data_type) in self.columns() {
            let value = Self::lookup(row, name)?;
            if value.data_type() != data_type {
                return Err(DbError::SchemaMismatch(format!(
                    "Column {} expects {:?}, got {:?}",
                    name,
                    data_type,
                    value.data_type()
                )));
            }
            full.insert(name.clone(), value.clone());
        }
        Ok(full)
    }

    /// Encode a row; the result always fits in an empty block
    pub fn marshal(&self, row: &Row) -> Result<Bytes> {
        let mut buf = BytesMut::new();

        for (name, data_type) in self.columns() {
            let value = Self::lookup(row, name)?;
            match (data_type, value) {
                (DataType::Boolean, _) => return Err(DbError::UnsupportedType(data_type)),
                (DataType::Int, Value::Int(n)) => buf.put_i32_le(*n),
                (DataType::Text, Value::Text(s)) => {
                    let len = u16::try_from(s.len()).map_err(|_| DbError::RecordTooLarge {
                        size: s.len(),
                        max: u16::MAX as usize,
                    })?;
                    buf.put_u16_le(len);
                    buf.put_slice(s.as_bytes());
                }
                (_, value) => {
                    return Err(DbError::SchemaMismatch(format!(
                        "Column {} expects {:?}, got {:?}",
                        name,
                        data_type,
                        value.data_type()
                    )))
                }
            }
        }

        if buf.len() > MAX_RECORD_SIZE {
            return Err(DbError::RecordTooLarge {
                size: buf.len(),
                max: MAX_RECORD_SIZE,
            });
        }

        Ok(buf.freeze())
    }

    /// Decode record bytes written by `marshal`
    pub fn unmarshal(&self, data: &[u8]) -> Result<Row> {
        let mut buf = data;
        let mut row = Row::new();

        for (name, data_type) in self.columns() {
            let value = match data_type {
                DataType::Int => {
                    Self::ensure(buf, 4, name)?;
                    Value::Int(buf.get_i32_le())
                }
                DataType::Text => {
                    Self::ensure(buf, 2, name)?;
                    let len = buf.get_u16_le() as usize;
                    Self::ensure(buf, len, name)?;
                    let text = std::str::from_utf8(&buf[..len]).map_err(|e| {
                        DbError::Corruption(format!("Column {} is not valid UTF-8: {}", name, e))
                    })?;
                    let value = Value::Text(text.to_string());
                    buf.advance(len);
                    value
                }
                DataType::Boolean => return Err(DbError::UnsupportedType(data_type)),
            };
            row.insert(name.clone(), value);
        }

        if buf.has_remaining() {
            return Err(DbError::Corruption(format!(
                "{} trailing bytes after last column",
                buf.remaining()
            )));
        }

        Ok(row)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn columns(&self) -> impl Iterator<Item = (&Identifier, DataType)> {
        self.column_names
            .iter()
            .zip(self.column_attributes.iter().map(ColumnAttribute::data_type))
    }

    fn lookup<'a>(row: &'a Row, name: &str) -> Result<&'a Value> {
        row.get(name)
            .ok_or_else(|| DbError::SchemaMismatch(format!("Missing column {}", name)))
    }

    fn ensure(buf: &[u8], needed: usize, name: &str) -> Result<()> {
        if buf.remaining() < needed {
            return Err(DbError::Corruption(format!(
                "Record truncated while reading column {}",
                name
            )));
        }
        Ok(())
    }
}
