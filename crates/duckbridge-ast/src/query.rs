//! AST types for a single parsed statement
//!
//! Field set follows what the translation pipeline consumes: command
//! metadata, target list, join tree with quals, and a range table whose
//! entries carry the host catalog data (schema, relation OID, columns)
//! needed to deparse and to scope the engine connection.

use serde::{Deserialize, Serialize};

/// Var number marking a synthetic output column on a substitute scan,
/// as opposed to a reference into the range table.
pub const INDEX_VAR: i32 = -3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmdType {
    Select,
    Insert,
    Update,
    Delete,
    Utility,
}

/// A single parsed statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub command_type: CmdType,
    pub query_id: u64,
    pub target_list: Vec<TargetEntry>,
    pub jointree: FromExpr,
    pub rtable: Vec<RangeTableEntry>,
    pub returning_list: Vec<TargetEntry>,
    pub has_modifying_cte: bool,
    pub can_set_tag: bool,
    /// Raw text of a non-SQL utility statement, when the parser produced one.
    pub utility_stmt: Option<String>,
    pub stmt_location: i32,
    pub stmt_len: i32,
}

impl Query {
    pub fn has_returning(&self) -> bool {
        !self.returning_list.is_empty()
    }

    /// Range table entry for a 1-based var number.
    pub fn rte(&self, rt_index: i32) -> Option<&RangeTableEntry> {
        if rt_index < 1 {
            return None;
        }
        self.rtable.get(rt_index as usize - 1)
    }
}

/// One output (or returning) column of a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetEntry {
    pub expr: Expr,
    /// 1-based ordinal position.
    pub res_no: i32,
    pub res_name: Option<String>,
    /// Junk entries exist for the planner's benefit and are not output.
    pub res_junk: bool,
}

/// A base relation referenced by the query, with its catalog data resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeTableEntry {
    pub schema_name: String,
    pub rel_name: String,
    pub rel_oid: u32,
    pub alias: Option<String>,
    pub columns: Vec<ColumnDef>,
    pub is_temp: bool,
}

impl RangeTableEntry {
    /// Name the relation is referred to by in rendered text.
    pub fn ref_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.rel_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub type_oid: u32,
    pub typmod: i32,
    pub collation: u32,
}

/// The join tree: from-items plus the WHERE qualifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FromExpr {
    pub items: Vec<FromItem>,
    pub quals: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FromItem {
    /// Reference into the range table, 1-based.
    Relation { rt_index: i32 },
    Join {
        join_type: JoinType,
        left: Box<FromItem>,
        right: Box<FromItem>,
        quals: Option<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Var(Var),
    /// External parameter placeholder, rendered as `$n`.
    Param { number: i32, type_oid: u32 },
    Const { value: Value, type_oid: u32 },
    /// Infix (two args) or prefix (one arg) operator invocation.
    OpExpr { op: String, args: Vec<Expr> },
    FuncCall { name: String, args: Vec<Expr> },
    Aggref {
        name: String,
        args: Vec<Expr>,
        distinct: bool,
    },
    WindowFunc {
        name: String,
        args: Vec<Expr>,
        partition_by: Vec<Expr>,
        order_by: Vec<Expr>,
    },
    BoolExpr { op: BoolOp, args: Vec<Expr> },
    /// Placeholder wrapper introduced by the host planner around an
    /// expression that must be evaluated elsewhere in the join tree.
    Placeholder(Box<Expr>),
}

/// Reference to a column of a range-table relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Var {
    /// 1-based index into the range table, or [`INDEX_VAR`].
    pub var_no: i32,
    /// 1-based attribute number within the relation.
    pub att_no: i32,
    pub type_oid: u32,
    pub typmod: i32,
    pub collation: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoolOp {
    And,
    Or,
    Not,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}
