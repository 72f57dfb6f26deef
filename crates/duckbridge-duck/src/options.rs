//! Engine-side options: extensions, secrets, remote object caching
//!
//! Extensions and secrets come from the settings file and are applied to
//! every fresh connection. A failing extension or secret is logged and
//! skipped rather than failing the connection; the query can still run
//! without it.

use duckbridge_plan::EngineError;
use duckdb::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

fn default_true() -> bool {
    true
}

/// A DuckDB extension to make available on new connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineExtension {
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Credential material handed to the engine as a named secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSecret {
    /// Secret type, e.g. "s3" or "gcs".
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub secret: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub session_token: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_true")]
    pub use_ssl: bool,
}

impl EngineSecret {
    /// CREATE SECRET statement for this secret.
    pub fn to_sql(&self, name: &str) -> String {
        let mut clauses = vec![
            format!("TYPE {}", self.kind),
            format!("KEY_ID {}", quote_literal(&self.id)),
            format!("SECRET {}", quote_literal(&self.secret)),
        ];
        if let Some(region) = &self.region {
            clauses.push(format!("REGION {}", quote_literal(region)));
        }
        if let Some(token) = &self.session_token {
            clauses.push(format!("SESSION_TOKEN {}", quote_literal(token)));
        }
        if let Some(endpoint) = &self.endpoint {
            clauses.push(format!("ENDPOINT {}", quote_literal(endpoint)));
        }
        if !self.use_ssl {
            clauses.push("USE_SSL false".to_string());
        }
        format!("CREATE SECRET {} ({});", name, clauses.join(", "))
    }
}

/// Install and load one extension. Returns whether it is usable.
pub fn install_extension(conn: &Connection, name: &str) -> bool {
    if let Err(err) = conn.execute_batch(&format!("INSTALL {name}; LOAD {name};")) {
        warn!(extension = name, error = %err, "failed to load engine extension");
        return false;
    }
    debug!(extension = name, "loaded engine extension");
    true
}

/// Load every enabled extension, skipping failures.
pub fn load_extensions(conn: &Connection, extensions: &[EngineExtension]) {
    for extension in extensions.iter().filter(|ext| ext.enabled) {
        install_extension(conn, &extension.name);
    }
}

/// Register configured secrets, skipping failures.
pub fn apply_secrets(conn: &Connection, secrets: &[EngineSecret]) {
    for (i, secret) in secrets.iter().enumerate() {
        let sql = secret.to_sql(&format!("duckbridge_secret_{}", i + 1));
        if let Err(err) = conn.execute_batch(&sql) {
            warn!(secret = %secret.id, error = %err, "failed to register engine secret");
        }
    }
}

/// Only remote objects behind these schemes can be cached.
pub fn can_cache_remote_object(object: &str) -> bool {
    ["https://", "http://", "s3://", "s3a://", "s3n://", "gcs://", "gs://", "r2://"]
        .iter()
        .any(|scheme| object.starts_with(scheme))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheObjectKind {
    Parquet,
    Csv,
}

impl CacheObjectKind {
    fn reader_function(self) -> &'static str {
        match self {
            CacheObjectKind::Parquet => "read_parquet",
            CacheObjectKind::Csv => "read_csv",
        }
    }
}

/// Pull a remote object through the engine's HTTP file cache by probing it
/// once with the matching reader. Returns whether the probe succeeded.
pub fn cache_remote_object(conn: &Connection, object: &str, kind: CacheObjectKind) -> bool {
    if !can_cache_remote_object(object) {
        warn!(object, "object path cannot be cached");
        return false;
    }

    let _ = conn.execute_batch("SET enable_http_file_cache TO true;");
    let probe = format!("SELECT 1 FROM {}({});", kind.reader_function(), quote_literal(object));
    let result = conn.execute_batch(&probe);
    let _ = conn.execute_batch("SET enable_http_file_cache TO false;");

    match result {
        Ok(()) => true,
        Err(err) => {
            warn!(object, error = %err, "failed to cache remote object");
            false
        }
    }
}

/// Stringified result of a raw passthrough query.
#[derive(Debug)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

/// Run arbitrary SQL directly against a connection. Diagnostic surface,
/// not part of the translation pipeline.
pub fn raw_query(conn: &Connection, sql: &str) -> Result<QueryOutput, EngineError> {
    let query_err = |e: duckdb::Error| EngineError::Query(e.to_string());

    let mut stmt = conn.prepare(sql).map_err(query_err)?;
    let mut rows = stmt.query([]).map_err(query_err)?;

    let mut columns: Vec<String> = Vec::new();
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(query_err)? {
        if columns.is_empty() {
            for i in 0..row.as_ref().column_count() {
                columns.push(row.as_ref().column_name(i).map_err(query_err)?.to_string());
            }
        }
        let mut json_row = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            json_row.push(value_to_json(row.get_ref(i).map_err(query_err)?));
        }
        out.push(json_row);
    }

    Ok(QueryOutput { columns, rows: out })
}

fn value_to_json(value: duckdb::types::ValueRef<'_>) -> serde_json::Value {
    use duckdb::types::ValueRef;

    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Boolean(b) => serde_json::Value::Bool(b),
        ValueRef::TinyInt(i) => serde_json::json!(i),
        ValueRef::SmallInt(i) => serde_json::json!(i),
        ValueRef::Int(i) => serde_json::json!(i),
        ValueRef::BigInt(i) => serde_json::json!(i),
        ValueRef::HugeInt(i) => serde_json::Value::String(i.to_string()),
        ValueRef::UTinyInt(i) => serde_json::json!(i),
        ValueRef::USmallInt(i) => serde_json::json!(i),
        ValueRef::UInt(i) => serde_json::json!(i),
        ValueRef::UBigInt(i) => serde_json::json!(i),
        ValueRef::Float(f) => serde_json::json!(f),
        ValueRef::Double(f) => serde_json::json!(f),
        ValueRef::Text(s) => serde_json::Value::String(String::from_utf8_lossy(s).to_string()),
        ValueRef::Blob(b) => serde_json::Value::String(format!("<blob {} bytes>", b.len())),
        _ => serde_json::Value::String("<unsupported>".to_string()),
    }
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
