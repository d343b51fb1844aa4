//! Metadata: the open key-value map carried on every unit.

use std::collections::BTreeMap;
use super::Value;

/// A map of metadata keys to values.
///
/// Ordered so serialized reports are stable across runs.
pub type Metadata = BTreeMap<String, Value>;

/// Well-known metadata keys written during ingestion.
pub mod keys {
    /// The free-form kind label the extractor reported, before synonym mapping.
    pub const RAW_KIND: &str = "raw_kind";
    /// Finer extractor label such as `"person"` or `"timeframe"`.
    pub const SUBTYPE: &str = "subtype";
    /// The extractor's own importance guess (`"critical"`, `"high"`, `0.7`, ...).
    pub const IMPORTANCE_HINT: &str = "importance_hint";
    /// Where the unit came from (`"extractor"`, `"fallback"`).
    pub const ORIGIN: &str = "origin";
}
