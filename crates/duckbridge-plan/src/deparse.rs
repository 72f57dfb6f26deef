//! Query text reconstruction
//!
//! Renders canonical SQL from the AST. A relation is schema-qualified
//! whenever its schema is not on the active search path, so the bridge
//! clears the search path for the duration of rendering and everything
//! user-level comes out fully qualified. Relations in `pg_catalog` and
//! temporary relations are never qualified; that matches the host's own
//! deparser and is an accepted limitation, not something to fix here.
//!
//! Rendering is deterministic: the same AST always produces the same text,
//! independent of anything but the search path the caller scoped.

use duckbridge_ast::{
    BoolOp, CmdType, Expr, FromItem, JoinType, Query, RangeTableEntry, TargetEntry, Value, Var,
};
use thiserror::Error;

use crate::session::SessionConfig;

#[derive(Debug, Error)]
pub enum DeparseError {
    #[error("cannot deparse {0:?} statements")]
    UnsupportedCommand(CmdType),

    #[error("query has no output columns")]
    EmptyTargetList,

    #[error("var references range table entry {0} which does not exist")]
    BadRangeTableRef(i32),

    #[error("var references attribute {att_no} of {rel} which does not exist")]
    BadAttribute { rel: String, att_no: i32 },
}

/// Render the query as canonical SQL against the current search path.
pub fn deparse_query(query: &Query, session: &SessionConfig) -> Result<String, DeparseError> {
    if query.command_type != CmdType::Select {
        return Err(DeparseError::UnsupportedCommand(query.command_type));
    }

    let deparser = Deparser { query, search_path: session.search_path() };
    deparser.render()
}

struct Deparser<'a> {
    query: &'a Query,
    search_path: Vec<String>,
}

impl Deparser<'_> {
    fn render(&self) -> Result<String, DeparseError> {
        let mut text = String::from("SELECT ");

        let entries: Vec<&TargetEntry> =
            self.query.target_list.iter().filter(|te| !te.res_junk).collect();
        if entries.is_empty() {
            return Err(DeparseError::EmptyTargetList);
        }

        for (i, te) in entries.iter().enumerate() {
            if i > 0 {
                text.push_str(", ");
            }
            text.push_str(&self.render_target_entry(te)?);
        }

        if !self.query.jointree.items.is_empty() {
            text.push_str(" FROM ");
            for (i, item) in self.query.jointree.items.iter().enumerate() {
                if i > 0 {
                    text.push_str(", ");
                }
                text.push_str(&self.render_from_item(item)?);
            }
        }

        if let Some(quals) = &self.query.jointree.quals {
            text.push_str(" WHERE ");
            text.push_str(&self.render_expr(quals)?);
        }

        Ok(text)
    }

    fn render_target_entry(&self, te: &TargetEntry) -> Result<String, DeparseError> {
        let rendered = self.render_expr(&te.expr)?;

        // Emit AS only when the label differs from the column's own name.
        if let Some(name) = &te.res_name {
            let natural = match &te.expr {
                Expr::Var(var) => Some(self.column_name(var)?),
                _ => None,
            };
            if natural.as_deref() != Some(name.as_str()) {
                return Ok(format!("{} AS {}", rendered, quote_ident(name)));
            }
        }
        Ok(rendered)
    }

    fn render_from_item(&self, item: &FromItem) -> Result<String, DeparseError> {
        match item {
            FromItem::Relation { rt_index } => {
                let rte = self
                    .query
                    .rte(*rt_index)
                    .ok_or(DeparseError::BadRangeTableRef(*rt_index))?;
                let mut rendered = self.relation_name(rte);
                if let Some(alias) = &rte.alias {
                    if alias != &rte.rel_name {
                        rendered.push(' ');
                        rendered.push_str(&quote_ident(alias));
                    }
                }
                Ok(rendered)
            }
            FromItem::Join { join_type, left, right, quals } => {
                let keyword = match join_type {
                    JoinType::Inner => "JOIN",
                    JoinType::Left => "LEFT JOIN",
                    JoinType::Right => "RIGHT JOIN",
                    JoinType::Full => "FULL JOIN",
                    JoinType::Cross => "CROSS JOIN",
                };
                let mut rendered = format!(
                    "{} {} {}",
                    self.render_from_item(left)?,
                    keyword,
                    self.render_from_item(right)?
                );
                if *join_type != JoinType::Cross {
                    match quals {
                        Some(quals) => {
                            rendered.push_str(" ON ");
                            rendered.push_str(&self.render_expr(quals)?);
                        }
                        None => rendered.push_str(" ON true"),
                    }
                }
                Ok(rendered)
            }
        }
    }

    /// Qualified or bare relation name, per the active search path.
    fn relation_name(&self, rte: &RangeTableEntry) -> String {
        let on_path = self.search_path.iter().any(|schema| schema == &rte.schema_name);
        // pg_catalog and temp relations stay unqualified (known limitation).
        if on_path || rte.schema_name == "pg_catalog" || rte.is_temp {
            quote_ident(&rte.rel_name)
        } else {
            format!("{}.{}", quote_ident(&rte.schema_name), quote_ident(&rte.rel_name))
        }
    }

    fn render_expr(&self, expr: &Expr) -> Result<String, DeparseError> {
        match expr {
            Expr::Var(var) => self.render_var(var),
            Expr::Param { number, .. } => Ok(format!("${}", number)),
            Expr::Const { value, .. } => Ok(render_value(value)),
            Expr::OpExpr { op, args } => match args.as_slice() {
                [operand] => Ok(format!("{}{}", op, self.render_operand(operand)?)),
                [left, right] => Ok(format!(
                    "{} {} {}",
                    self.render_operand(left)?,
                    op,
                    self.render_operand(right)?
                )),
                _ => Ok(format!("{}({})", op, self.render_args(args)?)),
            },
            Expr::FuncCall { name, args } => {
                Ok(format!("{}({})", quote_ident(name), self.render_args(args)?))
            }
            Expr::Aggref { name, args, distinct } => {
                if args.is_empty() {
                    Ok(format!("{}(*)", quote_ident(name)))
                } else if *distinct {
                    Ok(format!("{}(DISTINCT {})", quote_ident(name), self.render_args(args)?))
                } else {
                    Ok(format!("{}({})", quote_ident(name), self.render_args(args)?))
                }
            }
            Expr::WindowFunc { name, args, partition_by, order_by } => {
                let mut over = Vec::new();
                if !partition_by.is_empty() {
                    over.push(format!("PARTITION BY {}", self.render_args(partition_by)?));
                }
                if !order_by.is_empty() {
                    over.push(format!("ORDER BY {}", self.render_args(order_by)?));
                }
                Ok(format!(
                    "{}({}) OVER ({})",
                    quote_ident(name),
                    self.render_args(args)?,
                    over.join(" ")
                ))
            }
            Expr::BoolExpr { op, args } => match op {
                BoolOp::Not => {
                    let operand = args.first().map(|arg| self.render_operand(arg));
                    match operand {
                        Some(rendered) => Ok(format!("NOT {}", rendered?)),
                        None => Ok("NOT true".to_string()),
                    }
                }
                BoolOp::And | BoolOp::Or => {
                    let keyword = if *op == BoolOp::And { " AND " } else { " OR " };
                    let parts: Result<Vec<_>, _> =
                        args.iter().map(|arg| self.render_operand(arg)).collect();
                    Ok(parts?.join(keyword))
                }
            },
            Expr::Placeholder(inner) => self.render_expr(inner),
        }
    }

    /// Operands of operators get parenthesized when they are themselves
    /// compound, which keeps the output unambiguous without a precedence
    /// table.
    fn render_operand(&self, expr: &Expr) -> Result<String, DeparseError> {
        let rendered = self.render_expr(expr)?;
        match expr {
            Expr::OpExpr { .. } | Expr::BoolExpr { .. } => Ok(format!("({})", rendered)),
            _ => Ok(rendered),
        }
    }

    fn render_args(&self, args: &[Expr]) -> Result<String, DeparseError> {
        let parts: Result<Vec<_>, _> = args.iter().map(|arg| self.render_expr(arg)).collect();
        Ok(parts?.join(", "))
    }

    fn render_var(&self, var: &Var) -> Result<String, DeparseError> {
        let rte = self
            .query
            .rte(var.var_no)
            .ok_or(DeparseError::BadRangeTableRef(var.var_no))?;
        Ok(format!("{}.{}", quote_ident(rte.ref_name()), quote_ident(&self.column_name(var)?)))
    }

    fn column_name(&self, var: &Var) -> Result<String, DeparseError> {
        let rte = self
            .query
            .rte(var.var_no)
            .ok_or(DeparseError::BadRangeTableRef(var.var_no))?;
        let bad_attribute = || DeparseError::BadAttribute {
            rel: rte.rel_name.clone(),
            att_no: var.att_no,
        };
        // Attribute numbers are 1-based; system columns and whole-row
        // references carry non-positive numbers and cannot be rendered.
        if var.att_no < 1 {
            return Err(bad_attribute());
        }
        rte.columns
            .get(var.att_no as usize - 1)
            .map(|col| col.name.clone())
            .ok_or_else(bad_attribute)
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "true".to_string(),
        Value::Bool(false) => "false".to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
    }
}

/// Quote an identifier unless it is a safe lowercase name.
fn quote_ident(name: &str) -> String {
    let safe = !name.is_empty()
        && name.chars().next().is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !is_reserved(name);
    if safe {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

fn is_reserved(name: &str) -> bool {
    matches!(
        name,
        "select" | "from" | "where" | "group" | "order" | "table" | "user" | "join" | "on"
            | "and" | "or" | "not" | "null" | "true" | "false" | "as" | "distinct" | "union"
            | "all" | "case" | "when" | "then" | "else" | "end" | "limit" | "offset"
    )
}
