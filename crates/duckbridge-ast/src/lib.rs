//! Host-side parsed query representation
//!
//! The bridge receives queries in this form from the host's parser; it never
//! parses SQL itself. `Clone` is the deep-copy operation the pipeline uses so
//! the caller's query is never mutated.

pub mod params;
pub mod query;

pub use params::{BoundParam, BoundParams};
pub use query::*;
