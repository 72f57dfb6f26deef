//! Bound runtime parameters
//!
//! Opaque to the pipeline: they are attached to the planner's global state
//! and passed through to the engine's prepare call untouched.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundParam {
    pub type_oid: u32,
    /// Textual form of the value; `None` for SQL NULL or a value the host
    /// has not materialized yet.
    pub value: Option<String>,
}

/// Ordered parameter list, positionally matching `$1..$n`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundParams(pub Vec<BoundParam>);

impl BoundParams {
    pub fn none() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BoundParam> {
        self.0.iter()
    }
}

impl FromIterator<BoundParam> for BoundParams {
    fn from_iter<I: IntoIterator<Item = BoundParam>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
