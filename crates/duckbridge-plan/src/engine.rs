//! External engine seam
//!
//! The pipeline talks to the analytical engine through these traits. A
//! connection is created fresh per prepare call, scoped to exactly the
//! relations the query references, and travels together with the prepared
//! statement it produced; the two are never split.

use duckbridge_ast::{BoundParams, ColumnDef, RangeTableEntry, Var};
use thiserror::Error;

use crate::planner::PlannerInfo;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine connection failed: {0}")]
    Connect(String),

    #[error("engine configuration failed: {0}")]
    Configure(String),

    #[error("engine query failed: {0}")]
    Query(String),
}

/// One relation the engine is allowed to see.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedRelation {
    pub schema: String,
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub row_estimate: f64,
}

/// The catalog view for one connection: only what the query needs, an
/// isolation boundary as much as a performance one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionScope {
    pub relations: Vec<ScopedRelation>,
}

impl ConnectionScope {
    /// Relations referenced by the query: everything the from-clause or a
    /// pulled var points at, with access metadata from the resolved
    /// planning context.
    pub fn build(rtable: &[RangeTableEntry], vars: &[Var], info: &PlannerInfo) -> Self {
        let mut referenced: Vec<i32> = vars.iter().map(|var| var.var_no).collect();
        referenced.extend(info.relations.iter().map(|rel| rel.rt_index));
        referenced.sort_unstable();
        referenced.dedup();

        let relations = referenced
            .into_iter()
            .filter(|&rt_index| rt_index >= 1)
            .filter_map(|rt_index| {
                let rte = rtable.get(rt_index as usize - 1)?;
                Some(ScopedRelation {
                    schema: rte.schema_name.clone(),
                    name: rte.rel_name.clone(),
                    columns: rte.columns.clone(),
                    row_estimate: info
                        .relation(rt_index)
                        .map(|rel| rel.row_estimate)
                        .unwrap_or(0.0),
                })
            })
            .collect();

        Self { relations }
    }
}

/// One output column as reported by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineColumn {
    pub name: String,
    pub type_name: String,
}

/// Engine-side compiled form of the reconstructed text. Engine rejection is
/// an error state here, not an `Err`; the materializer checks the flag.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedStatement {
    pub sql: String,
    pub columns: Vec<EngineColumn>,
    error: Option<String>,
}

impl PreparedStatement {
    pub fn new(sql: impl Into<String>, columns: Vec<EngineColumn>) -> Self {
        Self { sql: sql.into(), columns, error: None }
    }

    pub fn failed(sql: impl Into<String>, error: impl Into<String>) -> Self {
        Self { sql: sql.into(), columns: Vec::new(), error: Some(error.into()) }
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error(&self) -> &str {
        self.error.as_deref().unwrap_or("")
    }
}

/// A session into the external engine.
pub trait EngineConnection {
    /// Prepare SQL text. Bound parameters are passed through so the engine
    /// can resolve placeholder types; failures land in the returned
    /// statement's error state.
    fn prepare(&mut self, sql: &str, params: &BoundParams) -> PreparedStatement;

    /// Whether the session is still usable.
    fn is_open(&self) -> bool;
}

/// Factory for scoped connections.
pub trait Engine {
    fn connect(&self, scope: &ConnectionScope) -> Result<Box<dyn EngineConnection>, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::RelAccessInfo;

    fn rte(schema: &str, name: &str) -> RangeTableEntry {
        RangeTableEntry {
            schema_name: schema.to_string(),
            rel_name: name.to_string(),
            rel_oid: 16384,
            alias: None,
            columns: vec![ColumnDef { name: "a".to_string(), type_oid: 23, typmod: -1, collation: 0 }],
            is_temp: false,
        }
    }

    fn var(var_no: i32) -> Var {
        Var { var_no, att_no: 1, type_oid: 23, typmod: -1, collation: 0 }
    }

    #[test]
    fn test_scope_deduplicates_references() {
        let rtable = vec![rte("public", "t"), rte("public", "u")];
        let info = PlannerInfo {
            relations: vec![
                RelAccessInfo { rt_index: 1, rel_oid: 16384, row_estimate: 10.0, indexes: vec![] },
                RelAccessInfo { rt_index: 2, rel_oid: 16385, row_estimate: 0.0, indexes: vec![] },
            ],
        };
        let scope = ConnectionScope::build(&rtable, &[var(1), var(1), var(2)], &info);
        assert_eq!(scope.relations.len(), 2);
        assert_eq!(scope.relations[0].name, "t");
        assert_eq!(scope.relations[0].row_estimate, 10.0);
    }

    #[test]
    fn test_scope_ignores_index_vars() {
        let rtable = vec![rte("public", "t")];
        let info = PlannerInfo::default();
        let scope = ConnectionScope::build(&rtable, &[var(duckbridge_ast::INDEX_VAR)], &info);
        assert!(scope.relations.is_empty());
    }

    #[test]
    fn test_prepared_statement_error_state() {
        let ok = PreparedStatement::new("SELECT 1", vec![]);
        assert!(!ok.has_error());
        assert_eq!(ok.error(), "");

        let failed = PreparedStatement::failed("SELECT nope", "Binder Error: nope");
        assert!(failed.has_error());
        assert!(failed.error().contains("Binder Error"));
        assert!(failed.columns.is_empty());
    }
}
