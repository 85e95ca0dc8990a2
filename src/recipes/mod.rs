//! Consumer recipes: the stock denormalizations built purely on the engine
//! primitives. Each one registers watchers and declares mutations through the
//! dispatch context; none of them touches collections outside a cycle.

// Submodule declaration
// -----------------------------------------------------------------------------
mod cache_count;
mod cache_doc;
mod cache_field;

#[cfg(test)]
mod cache_count_test;
#[cfg(test)]
mod cache_doc_test;

// Re-export
// -----------------------------------------------------------------------------
pub use cache_count::*;
pub use cache_doc::*;
pub use cache_field::*;

use serde_json::Map;
use serde_json::Value;

pub(crate) fn single(field: &str, value: Value) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert(field.to_string(), value);
    fields
}
