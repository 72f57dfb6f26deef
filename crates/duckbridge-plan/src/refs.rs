//! Reference extraction
//!
//! Collects every base-relation var the query reads, from the target list
//! and the join-tree qualifications, descending into aggregate arguments,
//! window-function arguments and placeholder expressions. Pure; duplicates
//! are fine, consumers tolerate them.

use duckbridge_ast::{Expr, FromItem, Query, Var};

/// Vars referenced by the query's projection and quals.
pub fn pull_var_refs(query: &Query) -> Vec<Var> {
    let mut vars = Vec::new();
    for te in &query.target_list {
        pull_from_expr(&te.expr, &mut vars);
    }
    if let Some(quals) = &query.jointree.quals {
        pull_from_expr(quals, &mut vars);
    }
    for item in &query.jointree.items {
        pull_from_item(item, &mut vars);
    }
    vars
}

fn pull_from_item(item: &FromItem, out: &mut Vec<Var>) {
    if let FromItem::Join { left, right, quals, .. } = item {
        pull_from_item(left, out);
        pull_from_item(right, out);
        if let Some(quals) = quals {
            pull_from_expr(quals, out);
        }
    }
}

fn pull_from_expr(expr: &Expr, out: &mut Vec<Var>) {
    match expr {
        Expr::Var(var) => out.push(*var),
        Expr::Param { .. } | Expr::Const { .. } => {}
        Expr::OpExpr { args, .. }
        | Expr::FuncCall { args, .. }
        | Expr::BoolExpr { args, .. }
        | Expr::Aggref { args, .. } => {
            for arg in args {
                pull_from_expr(arg, out);
            }
        }
        Expr::WindowFunc { args, partition_by, order_by, .. } => {
            for arg in args.iter().chain(partition_by).chain(order_by) {
                pull_from_expr(arg, out);
            }
        }
        Expr::Placeholder(inner) => pull_from_expr(inner, out),
    }
}
