//! Canonical Schemas
//!
//! Source-agnostic shapes shared by every adapter: what the user asked for
//! (`Filter`), what came back (`Article`, `QueryResult`).
//! All structs use `serde(rename_all = "camelCase")` for JSON compatibility
//! with the dashboard front-end.

pub mod common;
pub mod filter;
pub mod article;

pub use common::*;
pub use filter::*;
pub use article::*;

/// Items per page, fixed across every source
pub const PAGE_SIZE: u64 = 10;
