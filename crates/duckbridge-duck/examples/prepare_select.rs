//! End-to-end walkthrough: build a parsed SELECT, translate it through the
//! bridge and print the substitute plan's output schema.
//!
//! Run with: cargo run --example prepare_select

use std::sync::Arc;

use anyhow::Context;
use duckbridge_ast::{
    BoundParam, BoundParams, CmdType, ColumnDef, Expr, FromExpr, FromItem, Query,
    RangeTableEntry, TargetEntry, Var,
};
use duckbridge_duck::DuckEngine;
use duckbridge_plan::{
    create_substitute_plan, prepare, HostPlanner, PgTypeCatalog, PlanContext, SessionConfig,
};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .init();

    // SELECT t.a, t.b FROM public.t WHERE t.a > $1, as the host parser
    // would hand it over: resolved range table, vars by attribute number.
    let query = Arc::new(Query {
        command_type: CmdType::Select,
        query_id: 7,
        target_list: vec![
            target(1, "a", var(1, 1, 23)),
            target(2, "b", var(1, 2, 25)),
        ],
        jointree: FromExpr {
            items: vec![FromItem::Relation { rt_index: 1 }],
            quals: Some(Expr::OpExpr {
                op: ">".to_string(),
                args: vec![var(1, 1, 23), Expr::Param { number: 1, type_oid: 23 }],
            }),
        },
        rtable: vec![RangeTableEntry {
            schema_name: "public".to_string(),
            rel_name: "t".to_string(),
            rel_oid: 16384,
            alias: None,
            columns: vec![
                ColumnDef { name: "a".to_string(), type_oid: 23, typmod: -1, collation: 0 },
                ColumnDef { name: "b".to_string(), type_oid: 25, typmod: -1, collation: 100 },
            ],
            is_temp: false,
        }],
        returning_list: vec![],
        has_modifying_cte: false,
        can_set_tag: true,
        utility_stmt: None,
        stmt_location: 0,
        stmt_len: 37,
    });

    let params = BoundParams(vec![BoundParam { type_oid: 23, value: Some("42".to_string()) }]);

    let session = SessionConfig::new();
    let engine = DuckEngine::new();
    let planner = HostPlanner;
    let types = PgTypeCatalog;
    let ctx = PlanContext {
        session: &session,
        planner: &planner,
        engine: &engine,
        types: &types,
        portal: None,
        explain_analyze: false,
    };

    let prepared = prepare(&ctx, &query, &params).context("prepare failed")?;
    println!("reconstructed SQL: {}", prepared.statement().sql);
    println!("engine result schema:");
    for column in &prepared.statement().columns {
        println!("  {} {}", column.name, column.type_name);
    }
    drop(prepared);

    let plan = create_substitute_plan(&ctx, &query, &params)
        .context("translation failed")?
        .context("engine produced no substitute plan")?;

    println!("substitute plan targets:");
    for entry in &plan.plan_tree.target_list {
        if let Expr::Var(v) = &entry.expr {
            println!(
                "  #{} {} (type oid {})",
                entry.res_no,
                entry.res_name.as_deref().unwrap_or("?"),
                v.type_oid
            );
        }
    }

    Ok(())
}

fn target(res_no: i32, name: &str, expr: Expr) -> TargetEntry {
    TargetEntry { expr, res_no, res_name: Some(name.to_string()), res_junk: false }
}

fn var(var_no: i32, att_no: i32, type_oid: u32) -> Expr {
    Expr::Var(Var { var_no, att_no, type_oid, typmod: -1, collation: 0 })
}
