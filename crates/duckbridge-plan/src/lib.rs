//! Translation-and-preparation pipeline
//!
//! Turns a parsed host query into a substitute plan whose rows the external
//! engine will produce: deparse the AST to fully-qualified SQL under a
//! temporarily cleared search path, resolve the referenced relations, prepare
//! the text against a freshly scoped engine connection, map the result schema
//! back into host catalog types and wrap everything into a plan object the
//! host executor can run.
//!
//! Failure is two-tier: a query the host planner itself cannot make sense of
//! is a hard error; everything the engine rejects degrades to "no substitute
//! plan" so the caller falls back to native execution.

use thiserror::Error;

pub mod bridge;
pub mod deparse;
pub mod engine;
pub mod plan;
pub mod planner;
pub mod refs;
pub mod scan;
pub mod session;
pub mod types;

pub use bridge::{prepare, Prepared};
pub use deparse::{deparse_query, DeparseError};
pub use engine::{
    ConnectionScope, Engine, EngineColumn, EngineConnection, EngineError, PreparedStatement,
    ScopedRelation,
};
pub use plan::{create_substitute_plan, PlannedStatement};
pub use planner::{HostPlanner, PlannerGlobal, PlannerInfo, RelAccessInfo, SubqueryPlanner};
pub use scan::{SubstituteScan, SUBSTITUTE_SCAN_METHODS};
pub use session::{ConfigScope, SessionConfig};
pub use types::{PgTypeCatalog, TypeCatalog, TypeDetails};

#[derive(Debug, Error)]
pub enum PlanError {
    /// The host's sub-query planning routine rejected the query. Not
    /// recoverable: if the host planner cannot resolve it, neither can we.
    #[error("query is not plannable: {0}")]
    Unplannable(String),

    #[error(transparent)]
    Deparse(#[from] DeparseError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl PlanError {
    /// Recoverable errors degrade to "no substitute plan"; the caller plans
    /// natively instead.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, PlanError::Unplannable(_))
    }
}

/// Command tag of the portal the statement runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandTag {
    Select,
    Insert,
    Update,
    Delete,
    Explain,
}

/// Execution context of the surrounding command, as far as the bridge
/// needs it: whether this is an explain-style request.
#[derive(Debug, Clone, Copy)]
pub struct PortalContext {
    pub command_tag: CommandTag,
}

/// Collaborators for one translation call. Everything here is borrowed;
/// the pipeline holds no state across calls.
pub struct PlanContext<'a> {
    pub session: &'a SessionConfig,
    pub planner: &'a dyn SubqueryPlanner,
    pub engine: &'a dyn Engine,
    pub types: &'a dyn TypeCatalog,
    /// Active portal, when one exists.
    pub portal: Option<PortalContext>,
    /// Global toggle: EXPLAIN requests become EXPLAIN ANALYZE.
    pub explain_analyze: bool,
}
