use std::sync::Arc;

use serde_json::Value;

use super::single;
use crate::constants::DEFAULT_JOIN_GLUE;
use crate::doc_id;
use crate::fieldpath;
use crate::CollectionRef;
use crate::Engine;
use crate::HookContext;
use crate::HookSet;
use crate::Result;

/// Computes the cached value from the current document and the watched field
/// paths. `None` means the cache field should be absent.
pub type ValueFn = Arc<dyn Fn(&Value, &[String]) -> Option<Value> + Send + Sync>;

/// Keeps `cache_field` on each document derived from that same document:
/// recomputed through `value` after insert, and after any update that
/// actually changes one of `watched_fields`. A `None` value unsets the cache
/// field on update.
pub fn cache_field(
    engine: &Engine,
    collection: &CollectionRef,
    cache_field: &str,
    watched_fields: &[&str],
    value: ValueFn,
) -> Result<()> {
    let watched: Vec<String> = watched_fields.iter().map(|f| f.to_string()).collect();

    let insert = {
        let collection = collection.clone();
        let cache = cache_field.to_string();
        let value = value.clone();
        let watched = watched.clone();
        move |ctx: &mut HookContext<'_>| {
            let Some(id) = doc_id(&ctx.doc).map(str::to_string) else {
                return Ok(());
            };
            if let Some(val) = value(&ctx.doc, &watched) {
                ctx.set(&collection, id, single(&cache, val));
            }
            Ok(())
        }
    };

    let update = {
        let collection = collection.clone();
        let cache = cache_field.to_string();
        move |ctx: &mut HookContext<'_>| {
            let Some(id) = doc_id(&ctx.doc).map(str::to_string) else {
                return Ok(());
            };
            match value(&ctx.doc, &watched) {
                Some(val) => ctx.set(&collection, id, single(&cache, val)),
                None => ctx.unset(&collection, id, cache.as_str()),
            }
            Ok(())
        }
    };

    engine.add_hooks(
        collection,
        watched_fields,
        HookSet::new().on_insert(insert).on_update(update),
    )
}

/// A [`ValueFn`] concatenating the given fields (the watched fields when
/// `None`) with `glue`, default `", "`. Absent and falsy values (null,
/// `false`, zero, the empty string) are dropped from the join.
pub fn fields_joiner(fields: Option<Vec<String>>, glue: Option<&str>) -> ValueFn {
    let glue = glue.unwrap_or(DEFAULT_JOIN_GLUE).to_string();
    Arc::new(move |doc, watched| {
        let selected: &[String] = fields.as_deref().unwrap_or(watched);
        let parts: Vec<String> = selected
            .iter()
            .filter_map(|field| fieldpath::get(doc, field))
            .filter_map(joinable)
            .collect();
        Some(Value::String(parts.join(&glue)))
    })
}

fn joinable(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(false) => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
