//! Plan assembly
//!
//! Wraps a substitute scan into the complete plan object the host runtime
//! expects: command metadata copied from the original query, every
//! host-native planning substructure explicitly empty because planning has
//! been delegated. Failure is pure null propagation, never a partially
//! populated plan.

use std::sync::Arc;

use duckbridge_ast::{BoundParams, CmdType, Query, RangeTableEntry};
use tracing::warn;

use crate::bridge;
use crate::scan::{materialize_scan, SubstituteScan};
use crate::{PlanContext, PlanError};

/// Complete executable plan wrapping one substitute scan.
#[derive(Debug)]
pub struct PlannedStatement {
    pub command_type: CmdType,
    pub query_id: u64,
    pub has_returning: bool,
    pub has_modifying_cte: bool,
    pub can_set_tag: bool,
    pub transient_plan: bool,
    pub depends_on_role: bool,
    pub parallel_mode_needed: bool,
    pub plan_tree: SubstituteScan,
    pub rtable: Vec<RangeTableEntry>,
    pub result_relations: Vec<u32>,
    pub append_relations: Vec<u32>,
    pub subplan_ids: Vec<i32>,
    pub rewind_plan_ids: Vec<i32>,
    pub row_marks: Vec<i32>,
    pub relation_oids: Vec<u32>,
    pub inval_items: Vec<u32>,
    pub param_exec_types: Vec<u32>,
    pub utility_stmt: Option<String>,
    pub stmt_location: i32,
    pub stmt_len: i32,
}

/// Wrap the scan node, propagating "no node" unchanged.
pub fn assemble(scan: Option<SubstituteScan>, query: &Query) -> Option<PlannedStatement> {
    let plan_tree = scan?;

    Some(PlannedStatement {
        command_type: query.command_type,
        query_id: query.query_id,
        has_returning: query.has_returning(),
        has_modifying_cte: query.has_modifying_cte,
        can_set_tag: query.can_set_tag,
        transient_plan: false,
        depends_on_role: false,
        parallel_mode_needed: false,
        plan_tree,
        rtable: Vec::new(),
        result_relations: Vec::new(),
        append_relations: Vec::new(),
        subplan_ids: Vec::new(),
        rewind_plan_ids: Vec::new(),
        row_marks: Vec::new(),
        relation_oids: Vec::new(),
        inval_items: Vec::new(),
        param_exec_types: Vec::new(),
        // Should be None for anything we can translate, but copy it anyway.
        utility_stmt: query.utility_stmt.clone(),
        stmt_location: query.stmt_location,
        stmt_len: query.stmt_len,
    })
}

/// Full translation pipeline: prepare against the engine, materialize the
/// result schema, assemble the plan. `Ok(None)` means "no substitute plan,
/// fall back to native execution"; `Err` means the query is unplannable.
pub fn create_substitute_plan(
    ctx: &PlanContext<'_>,
    query: &Arc<Query>,
    params: &BoundParams,
) -> Result<Option<PlannedStatement>, PlanError> {
    let prepared = match bridge::prepare(ctx, query, params) {
        Ok(prepared) => prepared,
        Err(err) if err.is_recoverable() => {
            warn!(error = %err, "delegated prepare failed");
            return Ok(None);
        }
        Err(err) => return Err(err),
    };

    // The connection and statement are only needed for their schema here;
    // both are dropped together when `prepared` goes out of scope.
    let scan = materialize_scan(prepared.statement(), Arc::clone(query), ctx.types);
    Ok(assemble(scan, query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineColumn, PreparedStatement};
    use crate::types::PgTypeCatalog;
    use duckbridge_ast::{Expr, FromExpr, TargetEntry, Value};

    fn query() -> Query {
        Query {
            command_type: CmdType::Select,
            query_id: 99,
            target_list: vec![],
            jointree: FromExpr { items: vec![], quals: None },
            rtable: vec![],
            returning_list: vec![TargetEntry {
                expr: Expr::Const { value: Value::Int(1), type_oid: 23 },
                res_no: 1,
                res_name: None,
                res_junk: false,
            }],
            has_modifying_cte: true,
            can_set_tag: true,
            utility_stmt: None,
            stmt_location: 12,
            stmt_len: 34,
        }
    }

    #[test]
    fn test_none_propagates() {
        assert!(assemble(None, &query()).is_none());
    }

    #[test]
    fn test_metadata_copied_and_substructures_empty() {
        let statement =
            PreparedStatement::new("SELECT 1", vec![EngineColumn {
                name: "one".to_string(),
                type_name: "INTEGER".to_string(),
            }]);
        let q = Arc::new(query());
        let scan = materialize_scan(&statement, Arc::clone(&q), &PgTypeCatalog);
        let plan = assemble(scan, &q).unwrap();

        assert_eq!(plan.command_type, CmdType::Select);
        assert_eq!(plan.query_id, 99);
        assert!(plan.has_returning);
        assert!(plan.has_modifying_cte);
        assert!(plan.can_set_tag);
        assert_eq!(plan.stmt_location, 12);
        assert_eq!(plan.stmt_len, 34);

        assert!(!plan.transient_plan);
        assert!(!plan.depends_on_role);
        assert!(!plan.parallel_mode_needed);
        assert!(plan.rtable.is_empty());
        assert!(plan.result_relations.is_empty());
        assert!(plan.append_relations.is_empty());
        assert!(plan.subplan_ids.is_empty());
        assert!(plan.rewind_plan_ids.is_empty());
        assert!(plan.row_marks.is_empty());
        assert!(plan.relation_oids.is_empty());
        assert!(plan.inval_items.is_empty());
        assert!(plan.param_exec_types.is_empty());
    }
}
