//! Host catalog type mapping
//!
//! Two lookups, both fallible: engine type name to host type OID, and host
//! OID to the catalog details (typmod, collation) a target-list var needs.
//! A miss on either aborts the translation: a partially typed substitute
//! plan is never returned.

/// Host catalog type OID.
pub type Oid = u32;

pub const BOOL_OID: Oid = 16;
pub const BYTEA_OID: Oid = 17;
pub const INT8_OID: Oid = 20;
pub const INT2_OID: Oid = 21;
pub const INT4_OID: Oid = 23;
pub const TEXT_OID: Oid = 25;
pub const FLOAT4_OID: Oid = 700;
pub const FLOAT8_OID: Oid = 701;
pub const DATE_OID: Oid = 1082;
pub const TIME_OID: Oid = 1083;
pub const TIMESTAMP_OID: Oid = 1114;
pub const TIMESTAMPTZ_OID: Oid = 1184;
pub const INTERVAL_OID: Oid = 1186;
pub const NUMERIC_OID: Oid = 1700;
pub const UUID_OID: Oid = 2950;

/// The host's default collation OID, carried by collatable types.
pub const DEFAULT_COLLATION_OID: Oid = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDetails {
    pub typmod: i32,
    pub collation: Oid,
}

/// Catalog lookup service.
pub trait TypeCatalog {
    /// Map an engine-reported type name to a host type OID.
    fn host_type_for(&self, engine_type: &str) -> Option<Oid>;

    /// Catalog details for a host type OID.
    fn type_details(&self, oid: Oid) -> Option<TypeDetails>;
}

/// Builtin catalog covering the scalar types the engine and host share.
#[derive(Debug, Default)]
pub struct PgTypeCatalog;

impl TypeCatalog for PgTypeCatalog {
    fn host_type_for(&self, engine_type: &str) -> Option<Oid> {
        // Parameterized names like DECIMAL(18,3) map by their base name.
        let normalized = engine_type.to_ascii_uppercase();
        let base = normalized.split('(').next().unwrap_or("").trim();
        let oid = match base {
            "BOOLEAN" | "BOOL" => BOOL_OID,
            "TINYINT" | "SMALLINT" | "INT2" => INT2_OID,
            "INTEGER" | "INT" | "INT4" => INT4_OID,
            "BIGINT" | "INT8" => INT8_OID,
            "HUGEINT" | "DECIMAL" | "NUMERIC" => NUMERIC_OID,
            "FLOAT" | "REAL" | "FLOAT4" => FLOAT4_OID,
            "DOUBLE" | "FLOAT8" => FLOAT8_OID,
            "VARCHAR" | "TEXT" | "STRING" => TEXT_OID,
            "BLOB" | "BYTEA" => BYTEA_OID,
            "DATE" => DATE_OID,
            "TIME" => TIME_OID,
            "TIMESTAMP" => TIMESTAMP_OID,
            "TIMESTAMP WITH TIME ZONE" | "TIMESTAMPTZ" => TIMESTAMPTZ_OID,
            "INTERVAL" => INTERVAL_OID,
            "UUID" => UUID_OID,
            _ => return None,
        };
        Some(oid)
    }

    fn type_details(&self, oid: Oid) -> Option<TypeDetails> {
        let collation = match oid {
            TEXT_OID => DEFAULT_COLLATION_OID,
            BOOL_OID | BYTEA_OID | INT2_OID | INT4_OID | INT8_OID | FLOAT4_OID | FLOAT8_OID
            | DATE_OID | TIME_OID | TIMESTAMP_OID | TIMESTAMPTZ_OID | INTERVAL_OID
            | NUMERIC_OID | UUID_OID => 0,
            _ => return None,
        };
        Some(TypeDetails { typmod: -1, collation })
    }
}
