use std::collections::BTreeMap;

use serde_json::Map;
use serde_json::Value;
use tracing::debug;
use tracing::warn;

use crate::CollectionRef;
use crate::Selector;
use crate::UpdateOps;

/// Field names handed to [`MutationBatch::unset`]: a single name, a sequence
/// of names, or a mapping whose keys are taken as the names.
pub struct FieldNames(Vec<String>);

impl From<&str> for FieldNames {
    fn from(name: &str) -> Self {
        FieldNames(vec![name.to_string()])
    }
}

impl From<String> for FieldNames {
    fn from(name: String) -> Self {
        FieldNames(vec![name])
    }
}

impl From<Vec<String>> for FieldNames {
    fn from(names: Vec<String>) -> Self {
        FieldNames(names)
    }
}

impl From<&[&str]> for FieldNames {
    fn from(names: &[&str]) -> Self {
        FieldNames(names.iter().map(|n| n.to_string()).collect())
    }
}

impl From<Map<String, Value>> for FieldNames {
    fn from(shape: Map<String, Value>) -> Self {
        FieldNames(shape.keys().cloned().collect())
    }
}

/// Transient accumulator for one dispatch cycle. Collects set/unset intents
/// keyed by (target collection, canonical selector), merges intents that
/// target the same document, and commits them as one minimal update each.
///
/// A batch commits at most once; a second commit is a no-op.
pub struct MutationBatch {
    entries: BTreeMap<String, CollectionEntry>,
    committed: bool,
}

struct CollectionEntry {
    collection: CollectionRef,
    docs: BTreeMap<String, DocIntents>,
}

struct DocIntents {
    selector: Selector,
    /// field path → value (`None` is an explicit unset intent)
    fields: BTreeMap<String, Option<Value>>,
}

impl MutationBatch {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            committed: false,
        }
    }

    /// Records set intents for the targeted document(s). Intents for the same
    /// (collection, selector) shallow-merge, later calls winning on
    /// overlapping paths.
    pub fn set(
        &mut self,
        collection: &CollectionRef,
        selector: impl Into<Selector>,
        field_values: Map<String, Value>,
    ) {
        let intents = self.intents(collection, selector.into());
        for (field, value) in field_values {
            intents.fields.insert(field, Some(value));
        }
    }

    /// Records explicit absent-value intents for the named fields, in the
    /// same accumulator entry `set` uses.
    pub fn unset(
        &mut self,
        collection: &CollectionRef,
        selector: impl Into<Selector>,
        fields: impl Into<FieldNames>,
    ) {
        let intents = self.intents(collection, selector.into());
        for field in fields.into().0 {
            intents.fields.insert(field, None);
        }
    }

    fn intents(&mut self, collection: &CollectionRef, selector: Selector) -> &mut DocIntents {
        let entry = self
            .entries
            .entry(collection.name().to_string())
            .or_insert_with(|| CollectionEntry {
                collection: collection.clone(),
                docs: BTreeMap::new(),
            });
        entry
            .docs
            .entry(selector.canonical())
            .or_insert_with(|| DocIntents {
                selector,
                fields: BTreeMap::new(),
            })
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Issues one update per distinct target document, partitioning intents
    /// into assignments and removals. Mapping values assigned under a path
    /// are flattened into dotted-path assignments so that watchers setting
    /// different sub-fields of the same cached value never clobber each
    /// other. Idempotent; store failures get one attempt and a warning.
    pub fn commit(&mut self) {
        if self.committed {
            return;
        }
        self.committed = true;

        for entry in self.entries.values() {
            for intents in entry.docs.values() {
                let mut ops = UpdateOps::default();
                for (field, value) in &intents.fields {
                    match value {
                        None => ops.remove.push(field.clone()),
                        Some(Value::Object(nested)) => {
                            flatten_into(&mut ops.assign, field, nested)
                        }
                        Some(value) => {
                            ops.assign.insert(field.clone(), value.clone());
                        }
                    }
                }
                if ops.is_empty() {
                    continue;
                }

                let multi = !intents.selector.is_single_id();
                debug!(
                    "UPDATE {} selector: {} assign: {:?} remove: {:?}",
                    entry.collection.name().to_uppercase(),
                    intents.selector.canonical(),
                    ops.assign,
                    ops.remove
                );
                if let Err(e) = entry.collection.update(&intents.selector, ops, multi) {
                    warn!(
                        "batch commit write to '{}' ({}) failed, cached fields may be stale: {:?}",
                        entry.collection.name(),
                        intents.selector.canonical(),
                        e
                    );
                }
            }
        }
    }
}

impl Default for MutationBatch {
    fn default() -> Self {
        Self::new()
    }
}

fn flatten_into(assign: &mut Map<String, Value>, prefix: &str, nested: &Map<String, Value>) {
    for (key, value) in nested {
        let path = format!("{prefix}.{key}");
        match value {
            Value::Object(inner) if !inner.is_empty() => flatten_into(assign, &path, inner),
            _ => {
                assign.insert(path, value.clone());
            }
        }
    }
}
