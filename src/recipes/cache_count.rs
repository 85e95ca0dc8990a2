use std::sync::Arc;

use serde_json::Map;
use serde_json::Value;

use super::single;
use crate::constants::ID_FIELD;
use crate::doc_id;
use crate::fieldpath;
use crate::CollectionRef;
use crate::Engine;
use crate::HookContext;
use crate::HookSet;
use crate::Result;
use crate::Selector;

#[derive(Default, Clone)]
pub struct CacheCountOptions {
    /// Extra equality constraints on the counted children. Its keys join the
    /// watched field set, so moving a child in or out of the filter
    /// recounts too.
    pub selector: Map<String, Value>,
}

struct CountQuery {
    children: CollectionRef,
    reference_field: String,
    selector: Map<String, Value>,
}

impl CountQuery {
    /// Counts from current authoritative data, so repeated or re-ordered
    /// application converges on the true count.
    fn count(&self, reference: &Value) -> Result<Value> {
        let mut select = self.selector.clone();
        select.insert(self.reference_field.clone(), reference.clone());
        let n = self.children.find(&Selector::Where(select))?.len();
        Ok(Value::from(n as u64))
    }
}

/// Keeps `cache_field` on each parent document equal to the number of
/// children whose `reference_field` points at it (optionally filtered by
/// `options.selector`). Parent insert initializes the count; child
/// insert/update/remove recounts for both the new and the old reference.
pub fn cache_count(
    engine: &Engine,
    parent: &CollectionRef,
    cache_field: &str,
    children: &CollectionRef,
    reference_field: &str,
    options: CacheCountOptions,
) -> Result<()> {
    let mut watched: Vec<String> = vec![reference_field.to_string()];
    for key in options.selector.keys() {
        if !watched.contains(key) {
            watched.push(key.clone());
        }
    }
    let watched_refs: Vec<&str> = watched.iter().map(String::as_str).collect();

    let query = Arc::new(CountQuery {
        children: children.clone(),
        reference_field: reference_field.to_string(),
        selector: options.selector,
    });

    let parent_insert = {
        let parent = parent.clone();
        let cache = cache_field.to_string();
        let query = query.clone();
        move |ctx: &mut HookContext<'_>| {
            let Some(id) = doc_id(&ctx.doc).map(str::to_string) else {
                return Ok(());
            };
            recount(ctx, &parent, &cache, &query, &Value::String(id))
        }
    };
    engine.add_hooks(parent, &[ID_FIELD], HookSet::new().on_insert(parent_insert))?;

    let child_insert = {
        let parent = parent.clone();
        let cache = cache_field.to_string();
        let query = query.clone();
        let reference_field = reference_field.to_string();
        move |ctx: &mut HookContext<'_>| {
            if let Some(reference) = fieldpath::get(&ctx.doc, &reference_field).cloned() {
                recount(ctx, &parent, &cache, &query, &reference)?;
            }
            Ok(())
        }
    };

    let child_update = {
        let parent = parent.clone();
        let cache = cache_field.to_string();
        let query = query.clone();
        let reference_field = reference_field.to_string();
        move |ctx: &mut HookContext<'_>| {
            let new_reference = fieldpath::get(&ctx.doc, &reference_field).cloned();
            let old_reference = ctx
                .old_doc
                .as_ref()
                .and_then(|doc| fieldpath::get(doc, &reference_field).cloned());

            if let Some(reference) = &new_reference {
                recount(ctx, &parent, &cache, &query, reference)?;
            }
            if let Some(reference) = &old_reference {
                if new_reference.as_ref() != Some(reference) {
                    recount(ctx, &parent, &cache, &query, reference)?;
                }
            }
            Ok(())
        }
    };

    let child_remove = {
        let parent = parent.clone();
        let cache = cache_field.to_string();
        let query = query.clone();
        let reference_field = reference_field.to_string();
        move |ctx: &mut HookContext<'_>| {
            if let Some(reference) = fieldpath::get(&ctx.doc, &reference_field).cloned() {
                recount(ctx, &parent, &cache, &query, &reference)?;
            }
            Ok(())
        }
    };

    engine.add_hooks(
        children,
        &watched_refs,
        HookSet::new()
            .on_insert(child_insert)
            .on_update(child_update)
            .on_remove(child_remove),
    )
}

fn recount(
    ctx: &mut HookContext<'_>,
    parent: &CollectionRef,
    cache_field: &str,
    query: &CountQuery,
    reference: &Value,
) -> Result<()> {
    let count = query.count(reference)?;
    let selector = match reference {
        Value::String(id) => Selector::Id(id.clone()),
        other => {
            let mut select = Map::new();
            select.insert(ID_FIELD.to_string(), other.clone());
            Selector::Where(select)
        }
    };
    ctx.set(parent, selector, single(cache_field, count));
    Ok(())
}
