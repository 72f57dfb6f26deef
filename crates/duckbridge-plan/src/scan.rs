//! Schema materialization
//!
//! Turns a successful prepared statement into a substitute scan node: one
//! synthetic output var per engine column, typed through the host catalog
//! and labeled with the engine-reported name. Any failure yields no node at
//! all; the caller falls back to native planning.

use std::sync::Arc;

use duckbridge_ast::{Expr, Query, TargetEntry, Var, INDEX_VAR};
use tracing::warn;

use crate::engine::PreparedStatement;
use crate::types::TypeCatalog;

/// Executor callback table for substitute scans. The callbacks themselves
/// live with the execution-time collaborator; the plan node only carries
/// the reference.
#[derive(Debug)]
pub struct CustomScanMethods {
    pub name: &'static str,
}

pub static SUBSTITUTE_SCAN_METHODS: CustomScanMethods =
    CustomScanMethods { name: "duckbridge_scan" };

/// Plan node standing in for a host-native scan; its rows are produced by
/// the external engine at execution time.
#[derive(Debug)]
pub struct SubstituteScan {
    /// Output columns, one per prepared-statement column, in order.
    pub target_list: Vec<TargetEntry>,
    /// The original (uncopied) input query, carried opaquely for the
    /// execution-time collaborator to re-derive prepare state from.
    pub query: Arc<Query>,
    pub methods: &'static CustomScanMethods,
}

/// Build the substitute scan for a prepared statement, or `None` when the
/// statement failed or a column cannot be represented in the host catalog.
pub fn materialize_scan(
    statement: &PreparedStatement,
    query: Arc<Query>,
    types: &dyn TypeCatalog,
) -> Option<SubstituteScan> {
    if statement.has_error() {
        warn!(error = %statement.error(), "prepared query returned an error");
        return None;
    }

    let mut target_list = Vec::with_capacity(statement.columns.len());
    for (i, column) in statement.columns.iter().enumerate() {
        let Some(type_oid) = types.host_type_for(&column.type_name) else {
            warn!(engine_type = %column.type_name, column = %column.name,
                "no host type mapping for engine type");
            return None;
        };
        let Some(details) = types.type_details(type_oid) else {
            warn!(type_oid, "catalog lookup failed for type");
            return None;
        };

        let var = Var {
            var_no: INDEX_VAR,
            att_no: i as i32 + 1,
            type_oid,
            typmod: details.typmod,
            collation: details.collation,
        };
        target_list.push(TargetEntry {
            expr: Expr::Var(var),
            res_no: i as i32 + 1,
            res_name: Some(column.name.clone()),
            res_junk: false,
        });
    }

    Some(SubstituteScan { target_list, query, methods: &SUBSTITUTE_SCAN_METHODS })
}
