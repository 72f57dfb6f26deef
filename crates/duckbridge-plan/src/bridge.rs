//! Connection & prepare bridge
//!
//! Deep-copies the input query, reconstructs its text under a cleared
//! search path, resolves the referenced relations through the planner shim
//! and prepares the text against a freshly scoped engine connection. The
//! prepared statement and its connection are returned as one movable unit;
//! the statement must never outlive the connection that produced it.

use duckbridge_ast::{BoundParams, Query};
use tracing::debug;

use crate::deparse::{deparse_query, DeparseError};
use crate::engine::{ConnectionScope, EngineConnection, PreparedStatement};
use crate::planner::PlannerGlobal;
use crate::refs::pull_var_refs;
use crate::{CommandTag, PlanContext, PlanError};

/// Prepared statement bundled with the connection it lives on. The fields
/// are private so callers cannot split the pair; ownership of both moves
/// together.
pub struct Prepared {
    statement: PreparedStatement,
    connection: Box<dyn EngineConnection>,
}

impl Prepared {
    pub fn statement(&self) -> &PreparedStatement {
        &self.statement
    }

    pub fn connection(&self) -> &dyn EngineConnection {
        self.connection.as_ref()
    }

    pub fn connection_mut(&mut self) -> &mut dyn EngineConnection {
        self.connection.as_mut()
    }
}

/// Reconstruct the query's text and prepare it against a scoped engine
/// connection.
pub fn prepare(
    ctx: &PlanContext<'_>,
    query: &Query,
    params: &BoundParams,
) -> Result<Prepared, PlanError> {
    // Work on a copy so planning cannot mutate the caller's query.
    let copied = query.clone();

    // Clear search_path for the duration of rendering so every user-level
    // relation comes out fully qualified. The scope guard restores the
    // prior value no matter how rendering ends.
    let deparsed = {
        let scope = ctx.session.scope();
        scope.set("search_path", "");
        deparse_query(&copied, ctx.session)
    };
    // A reference pointing outside the range table means the input tree is
    // corrupt; that is the same hard failure the planner raises, not a
    // degradable one.
    let mut sql = match deparsed {
        Ok(sql) => sql,
        Err(err @ (DeparseError::BadRangeTableRef(_) | DeparseError::BadAttribute { .. })) => {
            return Err(PlanError::Unplannable(err.to_string()));
        }
        Err(err) => return Err(err.into()),
    };

    if matches!(ctx.portal, Some(portal) if portal.command_tag == CommandTag::Explain) {
        sql = if ctx.explain_analyze {
            format!("EXPLAIN ANALYZE {}", sql)
        } else {
            format!("EXPLAIN {}", sql)
        };
    }

    debug!(sql = %sql, "preparing delegated query");

    let vars = pull_var_refs(&copied);
    let glob = PlannerGlobal::for_params(params.clone());
    let info = ctx.planner.plan(&glob, &copied)?;

    let scope = ConnectionScope::build(&copied.rtable, &vars, &info);
    let mut connection = ctx.engine.connect(&scope)?;
    let statement = connection.prepare(&sql, params);

    Ok(Prepared { statement, connection })
}
