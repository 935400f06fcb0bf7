//! Prepared statement.
use std::sync::{Arc, atomic::Ordering};

use crate::{
    postgres::{Oid, PgFormat},
    row::Field,
    types::Registry,
};

type AtomicId = std::sync::atomic::AtomicU32;

/// Server side statement name, `s` followed by a zero padded counter.
#[derive(Clone, PartialEq, Eq)]
pub struct StatementName([u8; 11]);

impl StatementName {
    pub(crate) fn next() -> Self {
        static ID: AtomicId = AtomicId::new(0);
        let id = ID.fetch_add(1, Ordering::Relaxed);

        let mut buf = [b'0'; 11];
        buf[0] = b's';
        let len = buf.len();

        let mut b = itoa::Buffer::new();
        let id = b.format(id);
        let i = id.as_bytes();
        buf[len - i.len()..].copy_from_slice(i);

        Self(buf)
    }

    pub fn as_str(&self) -> &str {
        // SAFETY: ascii only construction and is immutable
        unsafe { std::str::from_utf8_unchecked(&self.0[..]) }
    }
}

impl std::fmt::Display for StatementName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Debug for StatementName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StatementName").field(&self.as_str()).finish()
    }
}

impl AsRef<str> for StatementName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// A statement prepared on the server.
#[derive(Debug, Clone)]
pub struct Statement {
    pub(crate) name: StatementName,
    pub(crate) params: Vec<Oid>,
    pub(crate) fields: Arc<[Field]>,
}

impl Statement {
    pub fn name(&self) -> &StatementName {
        &self.name
    }

    /// Parameter types as inferred by the server.
    pub fn params(&self) -> &[Oid] {
        &self.params
    }

    /// Result columns, empty for statements that return no rows.
    pub fn fields(&self) -> &Arc<[Field]> {
        &self.fields
    }

    /// Result column formats to request in `Bind`.
    ///
    /// Binary when the registry can decode the column type, text otherwise.
    pub(crate) fn result_formats(&self, registry: &Registry) -> Vec<PgFormat> {
        self.fields
            .iter()
            .map(|f|match registry.contains(f.type_oid) {
                true => PgFormat::Binary,
                false => PgFormat::Text,
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn names_are_unique() {
        let a = StatementName::next();
        let b = StatementName::next();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with('s'));
        assert_eq!(a.as_str().len(), 11);
        assert!(a.as_str()[1..].bytes().all(|e|e.is_ascii_digit()));
    }
}
