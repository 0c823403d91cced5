//! Fact extractors.
//!
//! Each extractor is a pure function of a repository's [`RepoTree`](crate::survey::RepoTree),
//! its pre-enumerated source list and, where needed, another extractor's
//! output. Extractors read through the filesystem port and never fail: a
//! missing or malformed input yields an empty-but-valid fact value.

pub mod cycles;
pub mod db;
pub mod deps;
pub mod domain;
pub mod env;
pub mod inventory;
pub mod quality;
pub mod routes;
pub mod text;
