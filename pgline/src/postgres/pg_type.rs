/// Postgres object identifier.
///
/// The oid type is implemented as an unsigned four-byte integer.
///
/// <https://www.postgresql.org/docs/current/datatype-oid.html>
pub type Oid = u32;

/// Well known builtin type oids.
///
/// Values are fixed by `pg_type.dat` and never change across server versions.
pub mod oid {
    use super::Oid;

    macro_rules! oids {
        ($($name:ident = $oid:literal, $doc:literal;)*) => {$(
            #[doc = $doc]
            pub const $name: Oid = $oid;
        )*};
    }

    oids! {
        UNSPECIFIED = 0, "Type unspecified, let the server infer it";
        BOOL = 16, "`bool` boolean, 'true'/'false'";
        BYTEA = 17, "`bytea` variable-length string, binary values escaped";
        CHAR = 18, "`char` single character";
        NAME = 19, "`name` 63-byte type for storing system identifiers";
        INT8 = 20, "`int8` ~18 digit integer, 8-byte storage";
        INT2 = 21, "`int2` -32 thousand to 32 thousand, 2-byte storage";
        INT4 = 23, "`int4` -2 billion to 2 billion integer, 4-byte storage";
        TEXT = 25, "`text` variable-length string, no limit specified";
        JSON = 114, "`json` JSON stored as text";
        FLOAT4 = 700, "`float4` single-precision floating point number, 4-byte storage";
        FLOAT8 = 701, "`float8` double-precision floating point number, 8-byte storage";
        BPCHAR = 1042, "`bpchar` char(length), blank-padded string, fixed storage length";
        VARCHAR = 1043, "`varchar` varchar(length), non-blank-padded string, variable storage length";
        TIMESTAMP = 1114, "`timestamp` date and time";
        TIMESTAMPTZ = 1184, "`timestamptz` date and time with time zone";
        JSONB = 3802, "`jsonb` Binary JSON";
    }
}
