//! The embedded document storage engine.
//!
//! Supplies the primitives the temporal layer is written against: named
//! databases holding named collections, a sorted primary-key index per
//! collection, and a small aggregation pipeline (`match`, `sort`, `limit`,
//! `project`). The engine knows nothing about datasets or visibility; those
//! semantics live entirely in the pipelines the temporal layer builds.

mod collection;
mod database;
mod pipeline;

pub use collection::Collection;
pub use database::{Database, StorageClient};
pub use pipeline::{Filter, Pipeline, SortOrder, Stage};
