//! DuckDB engine connector
//!
//! Implements the plan crate's engine seam on an in-memory DuckDB session.
//! Each connection is created fresh per prepare call and its catalog view is
//! limited to the relations in the connection scope, materialized as empty
//! schema-qualified tables.

use duckbridge_ast::BoundParams;
use duckbridge_plan::types::{
    BOOL_OID, BYTEA_OID, DATE_OID, FLOAT4_OID, FLOAT8_OID, INT2_OID, INT4_OID, INT8_OID,
    INTERVAL_OID, NUMERIC_OID, TEXT_OID, TIMESTAMPTZ_OID, TIMESTAMP_OID, TIME_OID, UUID_OID,
};
use duckbridge_plan::{
    ConnectionScope, Engine, EngineColumn, EngineConnection, EngineError, PreparedStatement,
    ScopedRelation,
};
use duckdb::types::Value as DuckValue;
use duckdb::Connection;
use tracing::{debug, warn};

pub mod options;
pub mod settings;

pub use options::{EngineExtension, EngineSecret};
pub use settings::EngineSettings;

/// Factory for scoped in-memory DuckDB connections.
#[derive(Debug, Default)]
pub struct DuckEngine {
    settings: EngineSettings,
}

impl DuckEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: EngineSettings) -> Self {
        Self { settings }
    }

    fn apply_settings(&self, conn: &Connection) -> Result<(), EngineError> {
        if let Some(limit) = self.settings.memory_limit_mb {
            conn.execute_batch(&format!("PRAGMA memory_limit='{}MB'", limit))
                .map_err(|e| EngineError::Configure(e.to_string()))?;
        }
        if let Some(threads) = self.settings.threads {
            conn.execute_batch(&format!("PRAGMA threads={}", threads))
                .map_err(|e| EngineError::Configure(e.to_string()))?;
        }

        options::load_extensions(conn, &self.settings.extensions);
        options::apply_secrets(conn, &self.settings.secrets);
        Ok(())
    }

    fn materialize_scope(
        &self,
        conn: &Connection,
        scope: &ConnectionScope,
    ) -> Result<(), EngineError> {
        for relation in &scope.relations {
            conn.execute_batch(&create_relation_sql(relation)?)
                .map_err(|e| EngineError::Configure(e.to_string()))?;
        }
        Ok(())
    }
}

impl Engine for DuckEngine {
    fn connect(&self, scope: &ConnectionScope) -> Result<Box<dyn EngineConnection>, EngineError> {
        let conn =
            Connection::open_in_memory().map_err(|e| EngineError::Connect(e.to_string()))?;
        self.apply_settings(&conn)?;
        self.materialize_scope(&conn, scope)?;
        debug!(relations = scope.relations.len(), "created scoped engine connection");
        Ok(Box::new(DuckConnection { conn }))
    }
}

/// One DuckDB session holding the scoped catalog.
pub struct DuckConnection {
    conn: Connection,
}

impl DuckConnection {
    pub fn raw(&self) -> &Connection {
        &self.conn
    }

    /// Prepare and probe the result schema. The scoped tables are empty, so
    /// executing the statement is a zero-row way to get DuckDB to report
    /// the result types through the arrow schema.
    fn probe(&self, sql: &str, params: &BoundParams) -> duckdb::Result<Vec<EngineColumn>> {
        let mut stmt = self.conn.prepare(sql)?;
        let values: Vec<DuckValue> = params
            .iter()
            .map(|param| match &param.value {
                Some(text) => DuckValue::Text(text.clone()),
                None => DuckValue::Null,
            })
            .collect();
        let arrow = stmt.query_arrow(duckdb::params_from_iter(values))?;
        let schema = arrow.get_schema();
        Ok(schema
            .fields()
            .iter()
            .map(|field| EngineColumn {
                name: field.name().clone(),
                type_name: engine_type_name(field.data_type()),
            })
            .collect())
    }
}

impl EngineConnection for DuckConnection {
    fn prepare(&mut self, sql: &str, params: &BoundParams) -> PreparedStatement {
        match self.probe(sql, params) {
            Ok(columns) => PreparedStatement::new(sql, columns),
            Err(err) => {
                warn!(error = %err, "engine rejected prepared query");
                PreparedStatement::failed(sql, err.to_string())
            }
        }
    }

    fn is_open(&self) -> bool {
        self.conn.query_row("SELECT 1", [], |row| row.get::<_, i32>(0)).is_ok()
    }
}

fn create_relation_sql(relation: &ScopedRelation) -> Result<String, EngineError> {
    if relation.columns.is_empty() {
        return Err(EngineError::Configure(format!(
            "relation \"{}\" has no columns to expose",
            relation.name
        )));
    }

    let columns: Result<Vec<String>, EngineError> = relation
        .columns
        .iter()
        .map(|col| {
            let duck_type = duck_type_for_oid(col.type_oid).ok_or_else(|| {
                EngineError::Configure(format!(
                    "no engine type for host type {} (column \"{}\")",
                    col.type_oid, col.name
                ))
            })?;
            Ok(format!("\"{}\" {}", col.name.replace('"', "\"\""), duck_type))
        })
        .collect();

    Ok(format!(
        "CREATE SCHEMA IF NOT EXISTS \"{schema}\"; CREATE TABLE \"{schema}\".\"{name}\" ({columns});",
        schema = relation.schema.replace('"', "\"\""),
        name = relation.name.replace('"', "\"\""),
        columns = columns?.join(", ")
    ))
}

/// Host catalog type OID to DuckDB column type.
fn duck_type_for_oid(oid: u32) -> Option<&'static str> {
    let duck_type = match oid {
        BOOL_OID => "BOOLEAN",
        INT2_OID => "SMALLINT",
        INT4_OID => "INTEGER",
        INT8_OID => "BIGINT",
        FLOAT4_OID => "FLOAT",
        FLOAT8_OID => "DOUBLE",
        NUMERIC_OID => "DECIMAL(18,3)",
        TEXT_OID | 1043 | 18 | 19 => "VARCHAR",
        BYTEA_OID => "BLOB",
        DATE_OID => "DATE",
        TIME_OID => "TIME",
        TIMESTAMP_OID => "TIMESTAMP",
        TIMESTAMPTZ_OID => "TIMESTAMP WITH TIME ZONE",
        INTERVAL_OID => "INTERVAL",
        UUID_OID => "UUID",
        _ => return None,
    };
    Some(duck_type)
}

/// Arrow result type to the engine type name the type catalog understands.
fn engine_type_name(data_type: &arrow::datatypes::DataType) -> String {
    use arrow::datatypes::DataType;

    match data_type {
        DataType::Boolean => "BOOLEAN".to_string(),
        DataType::Int8 => "TINYINT".to_string(),
        DataType::Int16 => "SMALLINT".to_string(),
        DataType::Int32 => "INTEGER".to_string(),
        DataType::Int64 => "BIGINT".to_string(),
        DataType::UInt8 => "UTINYINT".to_string(),
        DataType::UInt16 => "USMALLINT".to_string(),
        DataType::UInt32 => "UINTEGER".to_string(),
        DataType::UInt64 => "UBIGINT".to_string(),
        DataType::Float32 => "FLOAT".to_string(),
        DataType::Float64 => "DOUBLE".to_string(),
        DataType::Utf8 | DataType::LargeUtf8 => "VARCHAR".to_string(),
        DataType::Binary | DataType::LargeBinary => "BLOB".to_string(),
        DataType::Date32 | DataType::Date64 => "DATE".to_string(),
        DataType::Time32(_) | DataType::Time64(_) => "TIME".to_string(),
        DataType::Timestamp(_, None) => "TIMESTAMP".to_string(),
        DataType::Timestamp(_, Some(_)) => "TIMESTAMP WITH TIME ZONE".to_string(),
        DataType::Decimal128(_, _) | DataType::Decimal256(_, _) => "DECIMAL".to_string(),
        DataType::Interval(_) | DataType::Duration(_) => "INTERVAL".to_string(),
        other => format!("{:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::DataType;
    use duckbridge_ast::ColumnDef;

    #[test]
    fn test_duck_types_for_common_oids() {
        assert_eq!(duck_type_for_oid(INT4_OID), Some("INTEGER"));
        assert_eq!(duck_type_for_oid(TEXT_OID), Some("VARCHAR"));
        assert_eq!(duck_type_for_oid(1043), Some("VARCHAR"));
        assert_eq!(duck_type_for_oid(999_999), None);
    }

    #[test]
    fn test_engine_type_names() {
        assert_eq!(engine_type_name(&DataType::Int32), "INTEGER");
        assert_eq!(engine_type_name(&DataType::Utf8), "VARCHAR");
        assert_eq!(
            engine_type_name(&DataType::Timestamp(arrow::datatypes::TimeUnit::Microsecond, None)),
            "TIMESTAMP"
        );
    }

    #[test]
    fn test_create_relation_sql_quotes_identifiers() {
        let relation = ScopedRelation {
            schema: "public".to_string(),
            name: "t".to_string(),
            columns: vec![ColumnDef {
                name: "a".to_string(),
                type_oid: INT4_OID,
                typmod: -1,
                collation: 0,
            }],
            row_estimate: 0.0,
        };
        let sql = create_relation_sql(&relation).unwrap();
        assert_eq!(
            sql,
            "CREATE SCHEMA IF NOT EXISTS \"public\"; CREATE TABLE \"public\".\"t\" (\"a\" INTEGER);"
        );
    }

    #[test]
    fn test_relation_without_columns_rejected() {
        let relation = ScopedRelation {
            schema: "public".to_string(),
            name: "empty".to_string(),
            columns: vec![],
            row_estimate: 0.0,
        };
        assert!(create_relation_sql(&relation).is_err());
    }
}
