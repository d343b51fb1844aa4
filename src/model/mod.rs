//! # Semantic Graph Model
//!
//! Clean DTOs for the compression engine: units, relations, the graph that
//! owns them, and the metadata they carry. These types cross every
//! boundary from ingestion through to the run report.
//!
//! Design rule: this module is pure data with no I/O and no async.

pub mod node;
pub mod relationship;
pub mod graph;
pub mod value;
pub mod property_map;

pub use node::{SemanticUnit, UnitId, UnitKind};
pub use relationship::Relation;
pub use graph::{SemanticGraph, SortKey};
pub use value::Value;
pub use property_map::{keys, Metadata};
