use serde_json::Map;
use serde_json::Value;

use super::FieldNames;
use super::MutationBatch;
use crate::fieldpath::FieldDiff;
use crate::CollectionRef;
use crate::Selector;

/// What a watcher callback sees for one document change: the diff of its
/// watched fields, the full snapshots, and mutation declaration bound to the
/// batch of the triggering event. A callback cannot reach any other batch.
///
/// `old_field_values` and `old_doc` are present for updates only.
pub struct HookContext<'a> {
    pub field_values: FieldDiff,
    pub doc: Value,
    pub old_field_values: Option<FieldDiff>,
    pub old_doc: Option<Value>,
    batch: &'a mut MutationBatch,
}

impl<'a> HookContext<'a> {
    pub(crate) fn new(
        field_values: FieldDiff,
        doc: Value,
        old_field_values: Option<FieldDiff>,
        old_doc: Option<Value>,
        batch: &'a mut MutationBatch,
    ) -> Self {
        Self {
            field_values,
            doc,
            old_field_values,
            old_doc,
            batch,
        }
    }

    /// The changed value at `path`, `None` when the path did not change or
    /// changed to absent.
    pub fn changed(&self, path: &str) -> Option<&Value> {
        self.field_values.get(path).and_then(Option::as_ref)
    }

    /// The previous value at `path` (updates only).
    pub fn previous(&self, path: &str) -> Option<&Value> {
        self.old_field_values
            .as_ref()
            .and_then(|fields| fields.get(path))
            .and_then(Option::as_ref)
    }

    pub fn set(
        &mut self,
        collection: &CollectionRef,
        selector: impl Into<Selector>,
        field_values: Map<String, Value>,
    ) {
        self.batch.set(collection, selector, field_values);
    }

    pub fn unset(
        &mut self,
        collection: &CollectionRef,
        selector: impl Into<Selector>,
        fields: impl Into<FieldNames>,
    ) {
        self.batch.unset(collection, selector, fields);
    }
}
