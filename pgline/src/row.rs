//! Postgres row operation.
//!
//! - [`Field`]
//! - [`Row`]
//! - [`Index`]
//! - [`CommandTag`]
//! - [`QueryResult`]
use bytes::{Buf, Bytes};
use std::{fmt, sync::Arc};

use crate::{
    common::ByteStr,
    ext::FmtExt,
    notice::Notice,
    postgres::{Oid, PgFormat},
    types::{Context, DecodeError, FromValue, Value, codec},
};

/// Description of a result column, from `RowDescription`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// The field name.
    pub name: ByteStr,
    /// If the field can be identified as a column of a specific table, the object ID of the table; otherwise zero.
    pub table_oid: Oid,
    /// If the field can be identified as a column of a specific table, the attribute number of the column; otherwise zero.
    pub column_id: i16,
    /// The object ID of the field's data type.
    pub type_oid: Oid,
    /// The data type size (see pg_type.typlen). Note that negative values denote variable-width types.
    pub type_size: i16,
    /// The type modifier (see pg_attribute.atttypmod). The meaning of the modifier is type-specific.
    pub type_modifier: i32,
    /// The format code being used for the field.
    pub format: PgFormat,
}

/// Postgres row.
///
/// Values are kept in wire format and decoded on access.
#[derive(Clone)]
pub struct Row {
    fields: Arc<[Field]>,
    values: Bytes,
}

impl Row {
    /// `values` is the `DataRow` body after the column count.
    pub(crate) fn new(fields: Arc<[Field]>, values: Bytes) -> Row {
        Self { fields, values }
    }

    /// Returns `true` if row contains no columns.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the number of fields/column.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns the raw wire value, `None` if NULL.
    pub fn raw<I: Index>(&self, idx: I) -> Result<Option<Bytes>, DecodeError> {
        let nth = idx.position(&self.fields)?;
        let mut values = self.seek(nth)?;
        Ok(codec::get_length(&mut values)?.map(|len|values.split_to(len)))
    }

    /// Decode column using the codec registered for its type.
    pub fn value<I: Index>(&self, idx: I, cx: &dyn Context) -> Result<Value, DecodeError> {
        let nth = idx.position(&self.fields)?;
        let field = &self.fields[nth];
        let codec = cx.registry().lookup_by_type(field.type_oid)?;
        let mut values = self.seek(nth)?;

        match field.format {
            PgFormat::Binary => codec.binary_decoder.decode(&codec.ty, &mut values, cx),
            PgFormat::Text => match codec::get_length(&mut values)? {
                Some(len) => {
                    let text = values.split_to(len);
                    codec.text_decoder.decode(&codec.ty, std::str::from_utf8(&text)?, cx)
                },
                None => Ok(Value::Null),
            },
        }
    }

    /// Decode column into host type.
    pub fn get<T: FromValue, I: Index>(&self, idx: I, cx: &dyn Context) -> Result<T, DecodeError> {
        T::from_value(self.value(idx, cx)?)
    }

    /// Returns values starting at the length prefix of the `nth` column.
    fn seek(&self, nth: usize) -> Result<Bytes, DecodeError> {
        let mut values = self.values.clone();
        for _ in 0..nth {
            if let Some(len) = codec::get_length(&mut values)? {
                values.advance(len);
            }
        }
        Ok(values)
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_map();
        let mut v = self.values.clone();
        for field in self.fields.iter() {
            dbg.key(&field.name);
            match codec::get_length(&mut v) {
                Ok(Some(len)) => dbg.value(&v.split_to(len).lossy()),
                Ok(None) => dbg.value(&format_args!("NULL")),
                Err(_) => break,
            };
        }
        dbg.finish()
    }
}

/// Type that can be used for indexing column.
pub trait Index: Sized + sealed::Sealed {
    /// Returns the column position.
    fn position(self, fields: &[Field]) -> Result<usize, DecodeError>;
}

impl Index for usize {
    fn position(self, fields: &[Field]) -> Result<usize, DecodeError> {
        match self < fields.len() {
            true => Ok(self),
            false => Err(DecodeError::IndexOutOfBounds(self)),
        }
    }
}

impl Index for &str {
    fn position(self, fields: &[Field]) -> Result<usize, DecodeError> {
        fields
            .iter()
            .position(|f|f.name == self)
            .ok_or_else(||DecodeError::ColumnNotFound(String::from(self).into()))
    }
}

mod sealed {
    pub trait Sealed { }
    impl Sealed for usize { }
    impl Sealed for &str { }
}

/// Decoded `CommandComplete` tag.
///
/// The tag is usually a single word that identifies which SQL command was
/// completed, followed by the number of rows affected when applicable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTag {
    tag: ByteStr,
    rows: u64,
}

impl CommandTag {
    pub(crate) fn parse(tag: ByteStr) -> CommandTag {
        let mut whs = tag.split_whitespace();
        let rows = match (whs.next(), whs.next()) {
            // `INSERT oid rows`
            (Some("INSERT"), _) => whs.next(),
            (Some("SELECT" | "UPDATE" | "DELETE" | "MERGE" | "FETCH" | "MOVE" | "COPY"), rows) => rows,
            _ => None,
        };
        let rows = rows.and_then(|e|e.parse().ok()).unwrap_or_default();
        Self { tag, rows }
    }

    /// The full tag, e.g. `INSERT 0 1`.
    pub fn as_str(&self) -> &str {
        &self.tag
    }

    /// The command word, e.g. `INSERT`.
    pub fn command(&self) -> &str {
        self.tag.split_whitespace().next().unwrap_or_default()
    }

    pub fn rows_affected(&self) -> u64 {
        self.rows
    }
}

impl fmt::Display for CommandTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)
    }
}

/// Result of a single statement.
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// `None` for an empty query.
    pub tag: Option<CommandTag>,
    pub fields: Arc<[Field]>,
    pub rows: Vec<Row>,
    /// Notices received while the statement ran.
    pub notices: Vec<Notice>,
}

impl QueryResult {
    pub(crate) fn empty() -> QueryResult {
        Self {
            tag: None,
            fields: Arc::new([]),
            rows: Vec::new(),
            notices: Vec::new(),
        }
    }

    pub fn rows_affected(&self) -> u64 {
        self.tag.as_ref().map(CommandTag::rows_affected).unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    use bytes::{BufMut, BytesMut};

    use super::*;
    use crate::{postgres::oid, types::SessionContext};

    fn field(name: &'static str, type_oid: Oid, format: PgFormat) -> Field {
        Field {
            name: ByteStr::from_static(name),
            table_oid: 0,
            column_id: 0,
            type_oid,
            type_size: -1,
            type_modifier: -1,
            format,
        }
    }

    fn row() -> Row {
        let fields: Arc<[Field]> = Arc::from([
            field("id", oid::INT4, PgFormat::Binary),
            field("note", oid::TEXT, PgFormat::Text),
            field("data", oid::BYTEA, PgFormat::Binary),
        ]);
        let mut values = BytesMut::new();
        values.put_i32(4);
        values.put_i32(420);
        values.put_i32(-1);
        values.put_i32(3);
        values.put_slice(b"\x01\x02\x03");
        Row::new(fields, values.freeze())
    }

    #[test]
    fn get_by_index_and_name() {
        let cx = SessionContext::default();
        let row = row();
        assert_eq!(row.len(), 3);
        assert_eq!(row.get::<i32, _>(0, &cx).unwrap(), 420);
        assert_eq!(row.get::<Option<String>, _>("note", &cx).unwrap(), None);
        assert_eq!(row.get::<Vec<u8>, _>("data", &cx).unwrap(), [1, 2, 3]);
        assert_eq!(row.raw(2).unwrap().as_deref(), Some(&b"\x01\x02\x03"[..]));
    }

    #[test]
    fn missing_column() {
        let cx = SessionContext::default();
        let row = row();
        assert!(matches!(row.value(3, &cx), Err(DecodeError::IndexOutOfBounds(3))));
        assert!(matches!(row.value("nope", &cx), Err(DecodeError::ColumnNotFound(_))));
        assert!(matches!(row.get::<String, _>("note", &cx), Err(DecodeError::Null)));
    }

    #[test]
    fn command_tag() {
        let tag = CommandTag::parse(ByteStr::from_static("INSERT 0 14"));
        assert_eq!(tag.command(), "INSERT");
        assert_eq!(tag.rows_affected(), 14);

        assert_eq!(CommandTag::parse(ByteStr::from_static("SELECT 3")).rows_affected(), 3);
        assert_eq!(CommandTag::parse(ByteStr::from_static("BEGIN")).rows_affected(), 0);
        assert_eq!(CommandTag::parse(ByteStr::from_static("CREATE TABLE")).rows_affected(), 0);
    }
}
