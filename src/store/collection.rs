use std::sync::Arc;

use serde_json::Map;
use serde_json::Value;

use super::Selector;
use crate::Result;

#[cfg(test)]
use mockall::automock;

/// Fired after a document is inserted: (actor, new document).
pub type InsertObserver = Arc<dyn Fn(Option<&str>, &Value) + Send + Sync>;

/// Fired after a document is updated: (actor, new document, previous
/// snapshot, changed top-level field names).
pub type UpdateObserver = Arc<dyn Fn(Option<&str>, &Value, &Value, &[String]) + Send + Sync>;

/// Fired after a document is removed: (actor, removed document).
pub type RemoveObserver = Arc<dyn Fn(Option<&str>, &Value) + Send + Sync>;

/// The two halves of a minimal write: dotted-path assignments and dotted-path
/// removals ($set / $unset equivalents).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOps {
    pub assign: Map<String, Value>,
    pub remove: Vec<String>,
}

impl UpdateOps {
    pub fn is_empty(&self) -> bool {
        self.assign.is_empty() && self.remove.is_empty()
    }
}

/// Shared handle to a collection behind the engine.
pub type CollectionRef = Arc<dyn Collection>;

/// Backing-store collaborator: a named document collection with equality
/// queries, writes, and post-write lifecycle observation.
///
/// Observers fire synchronously as part of the triggering write, with the
/// previous snapshot available for updates. Implementations must not hold
/// internal locks while firing them: observers re-enter the collection.
#[cfg_attr(test, automock)]
pub trait Collection: Send + Sync + 'static {
    /// Stable identity of this collection within the process.
    fn name(&self) -> &str;

    fn find(&self, selector: &Selector) -> Result<Vec<Value>>;

    fn find_one(&self, selector: &Selector) -> Result<Option<Value>>;

    /// Inserts a mapping document, assigning an identifier when the document
    /// carries none. Returns the identifier.
    fn insert(&self, doc: Value) -> Result<String>;

    /// Applies `ops` to every matching document (first match only when
    /// `multi` is false). Returns the number of documents written.
    fn update(&self, selector: &Selector, ops: UpdateOps, multi: bool) -> Result<usize>;

    /// Removes every matching document. Returns the number removed.
    fn remove(&self, selector: &Selector) -> Result<usize>;

    fn after_insert(&self, observer: InsertObserver);

    fn after_update(&self, observer: UpdateObserver);

    fn after_remove(&self, observer: RemoveObserver);
}
