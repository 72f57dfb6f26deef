//! Planner-info shim
//!
//! Runs the host's sub-query planning routine in a side-effect-only mode:
//! the plan tree it would produce is thrown away, only the resolved
//! planning context survives, which connection scoping consults for
//! relation-access metadata. Failure here is a hard failure of the whole
//! translation.

use duckbridge_ast::{BoundParams, FromItem, Query, RangeTableEntry};

use crate::refs::pull_var_refs;
use crate::PlanError;

/// Global planning state handed to the sub-query planner. Every field is
/// set explicitly; collection-typed fields start empty because planning
/// responsibility is being delegated.
#[derive(Debug, Clone)]
pub struct PlannerGlobal {
    pub bound_params: BoundParams,
    pub subplan_ids: Vec<i32>,
    pub rewind_plan_ids: Vec<i32>,
    pub final_rtable: Vec<RangeTableEntry>,
    pub final_row_marks: Vec<i32>,
    pub result_relations: Vec<u32>,
    pub append_relations: Vec<u32>,
    pub relation_oids: Vec<u32>,
    pub inval_items: Vec<u32>,
    pub param_exec_types: Vec<u32>,
    pub last_ph_id: u32,
    pub last_row_mark_id: u32,
    pub last_plan_node_id: u32,
    pub transient_plan: bool,
    pub depends_on_role: bool,
}

impl PlannerGlobal {
    pub fn for_params(bound_params: BoundParams) -> Self {
        Self {
            bound_params,
            subplan_ids: Vec::new(),
            rewind_plan_ids: Vec::new(),
            final_rtable: Vec::new(),
            final_row_marks: Vec::new(),
            result_relations: Vec::new(),
            append_relations: Vec::new(),
            relation_oids: Vec::new(),
            inval_items: Vec::new(),
            param_exec_types: Vec::new(),
            last_ph_id: 0,
            last_row_mark_id: 0,
            last_plan_node_id: 0,
            transient_plan: false,
            depends_on_role: false,
        }
    }
}

/// Resolved planning context: per-relation access metadata, nothing else.
#[derive(Debug, Clone, Default)]
pub struct PlannerInfo {
    pub relations: Vec<RelAccessInfo>,
}

impl PlannerInfo {
    pub fn relation(&self, rt_index: i32) -> Option<&RelAccessInfo> {
        self.relations.iter().find(|rel| rel.rt_index == rt_index)
    }
}

#[derive(Debug, Clone)]
pub struct RelAccessInfo {
    /// 1-based range table index.
    pub rt_index: i32,
    pub rel_oid: u32,
    pub row_estimate: f64,
    pub indexes: Vec<String>,
}

/// The host's sub-query planning routine.
pub trait SubqueryPlanner {
    fn plan(&self, glob: &PlannerGlobal, query: &Query) -> Result<PlannerInfo, PlanError>;
}

/// Default planner: validates the range table and every var reference the
/// way the host's planner would, then resolves access metadata from the
/// range table's catalog data.
#[derive(Debug, Default)]
pub struct HostPlanner;

impl SubqueryPlanner for HostPlanner {
    fn plan(&self, _glob: &PlannerGlobal, query: &Query) -> Result<PlannerInfo, PlanError> {
        for item in &query.jointree.items {
            check_from_item(item, query)?;
        }

        for var in pull_var_refs(query) {
            let rte = query.rte(var.var_no).ok_or_else(|| {
                PlanError::Unplannable(format!(
                    "var references range table entry {} of {}",
                    var.var_no,
                    query.rtable.len()
                ))
            })?;
            if var.att_no < 1 || var.att_no as usize > rte.columns.len() {
                return Err(PlanError::Unplannable(format!(
                    "relation \"{}\" has no attribute {}",
                    rte.rel_name, var.att_no
                )));
            }
        }

        for rte in &query.rtable {
            if rte.rel_oid == 0 {
                return Err(PlanError::Unplannable(format!(
                    "relation \"{}\" has no valid OID",
                    rte.rel_name
                )));
            }
        }

        let relations = query
            .rtable
            .iter()
            .enumerate()
            .map(|(i, rte)| RelAccessInfo {
                rt_index: i as i32 + 1,
                rel_oid: rte.rel_oid,
                row_estimate: 0.0,
                indexes: Vec::new(),
            })
            .collect();

        Ok(PlannerInfo { relations })
    }
}

fn check_from_item(item: &FromItem, query: &Query) -> Result<(), PlanError> {
    match item {
        FromItem::Relation { rt_index } => {
            if query.rte(*rt_index).is_none() {
                return Err(PlanError::Unplannable(format!(
                    "from-clause entry {} not found in range table",
                    rt_index
                )));
            }
            Ok(())
        }
        FromItem::Join { left, right, .. } => {
            check_from_item(left, query)?;
            check_from_item(right, query)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duckbridge_ast::{CmdType, ColumnDef, Expr, FromExpr, TargetEntry, Var};

    fn valid_query() -> Query {
        Query {
            command_type: CmdType::Select,
            query_id: 0,
            target_list: vec![TargetEntry {
                expr: Expr::Var(Var { var_no: 1, att_no: 1, type_oid: 23, typmod: -1, collation: 0 }),
                res_no: 1,
                res_name: Some("a".to_string()),
                res_junk: false,
            }],
            jointree: FromExpr { items: vec![FromItem::Relation { rt_index: 1 }], quals: None },
            rtable: vec![RangeTableEntry {
                schema_name: "public".to_string(),
                rel_name: "t".to_string(),
                rel_oid: 16384,
                alias: None,
                columns: vec![ColumnDef { name: "a".to_string(), type_oid: 23, typmod: -1, collation: 0 }],
                is_temp: false,
            }],
            returning_list: vec![],
            has_modifying_cte: false,
            can_set_tag: true,
            utility_stmt: None,
            stmt_location: 0,
            stmt_len: 0,
        }
    }

    #[test]
    fn test_planner_global_starts_empty() {
        let glob = PlannerGlobal::for_params(BoundParams::none());
        assert!(glob.subplan_ids.is_empty());
        assert!(glob.relation_oids.is_empty());
        assert!(glob.param_exec_types.is_empty());
        assert_eq!(glob.last_plan_node_id, 0);
        assert!(!glob.transient_plan);
        assert!(!glob.depends_on_role);
    }

    #[test]
    fn test_valid_query_resolves_relations() {
        let glob = PlannerGlobal::for_params(BoundParams::none());
        let info = HostPlanner.plan(&glob, &valid_query()).unwrap();
        assert_eq!(info.relations.len(), 1);
        assert_eq!(info.relation(1).unwrap().rel_oid, 16384);
    }

    #[test]
    fn test_malformed_range_table_is_unplannable() {
        let mut query = valid_query();
        query.jointree.items = vec![FromItem::Relation { rt_index: 7 }];
        let glob = PlannerGlobal::for_params(BoundParams::none());
        let err = HostPlanner.plan(&glob, &query).unwrap_err();
        assert!(matches!(err, PlanError::Unplannable(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_dangling_var_is_unplannable() {
        let mut query = valid_query();
        query.target_list[0].expr =
            Expr::Var(Var { var_no: 1, att_no: 9, type_oid: 23, typmod: -1, collation: 0 });
        let glob = PlannerGlobal::for_params(BoundParams::none());
        assert!(HostPlanner.plan(&glob, &query).is_err());
    }

    #[test]
    fn test_invalid_relation_oid_is_unplannable() {
        let mut query = valid_query();
        query.rtable[0].rel_oid = 0;
        let glob = PlannerGlobal::for_params(BoundParams::none());
        assert!(HostPlanner.plan(&glob, &query).is_err());
    }
}
