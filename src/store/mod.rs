//! Backing-store collaborator contract and the in-memory adaptor.
//!
//! The engine never owns documents; it reads point-in-time snapshots from a
//! [`Collection`] and issues mutation requests back to it. Any store that
//! implements the trait (and fires the three lifecycle observers) can sit
//! behind the engine; [`MemoryCollection`] is the bundled in-process adaptor.

// Submodule declaration
// -----------------------------------------------------------------------------
mod collection;
mod memory;
mod selector;

#[cfg(test)]
mod selector_test;

// Re-export
// -----------------------------------------------------------------------------
pub use collection::*;
pub use memory::*;
pub use selector::*;

use serde_json::Value;

use crate::constants::ID_FIELD;

/// Extracts the string identifier of a document, if it carries one.
pub fn doc_id(doc: &Value) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}
