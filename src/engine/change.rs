use std::sync::Arc;

use serde_json::Map;
use serde_json::Value;
use tracing::trace;
use tracing::warn;

use super::hook::intersects;
use super::hook::Hook;
use super::hook::HookStore;
use super::HookContext;
use super::MutationBatch;
use super::OpKind;
use crate::fieldpath;
use crate::fieldpath::FieldDiff;

/// One document change awaiting dispatch: the watcher store of the affected
/// collection, the operation kind, the snapshots and the top-level field
/// names this write touched. The top-level fast path already passed when a
/// cycle is built.
pub(crate) struct ChangeCycle {
    pub store: Arc<HookStore>,
    pub kind: OpKind,
    pub doc: Value,
    pub old_doc: Option<Value>,
    pub changed_top_level: Vec<String>,
}

/// Runs one dispatch cycle: per-watcher top-level filter, exact-path diff,
/// callback invocation in registration order, then a single batch commit.
///
/// A failing callback is isolated: it is logged and the cycle continues with
/// the remaining watchers and still commits what was declared.
pub(crate) fn run_cycle(cycle: ChangeCycle) {
    let hooks: Vec<Arc<Hook>> = {
        let ops = cycle.store.ops(cycle.kind).read();
        ops.hooks.values().cloned().collect()
    };

    let empty = Value::Object(Map::new());
    let previous = cycle.old_doc.as_ref().unwrap_or(&empty);

    let mut batch = MutationBatch::new();
    for hook in hooks {
        if !intersects(&hook.watched_top_level, &cycle.changed_top_level) {
            continue;
        }
        let field_values = fieldpath::diff(&hook.watched_fields, &cycle.doc, previous);
        if field_values.is_empty() {
            trace!("watcher {}: no watched field changed, skipping", hook.id);
            continue;
        }

        let (old_field_values, old_doc) = match cycle.kind {
            OpKind::Update => {
                let old_values: FieldDiff = field_values
                    .keys()
                    .map(|path| (path.clone(), fieldpath::get(previous, path).cloned()))
                    .collect();
                (Some(old_values), cycle.old_doc.clone())
            }
            _ => (None, None),
        };

        let mut context = HookContext::new(
            field_values,
            cycle.doc.clone(),
            old_field_values,
            old_doc,
            &mut batch,
        );
        if let Err(e) = (hook.callback)(&mut context) {
            warn!(
                "watcher {} failed during {:?} dispatch: {:?}; continuing with remaining watchers",
                hook.id, cycle.kind, e
            );
        }
    }
    batch.commit();
}
