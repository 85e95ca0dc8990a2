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
pub struct CacheDocOptions {
    /// Cached copy's field on the child, default `_{name}`
    pub cache_field: Option<String>,
    /// Reference field on the child, default `{name}_id`
    pub ref_field: Option<String>,
}

/// Keeps a partial copy of a referenced parent document on each child.
///
/// Child insert (and any change of its reference) looks the parent up and
/// sets or clears the copy; parent insert/update pushes its copied fields to
/// every referencing child in one multi-document update; parent removal
/// clears the copy everywhere. The copy only ever contains `copied_fields`,
/// never the parent's identifier.
pub fn cache_doc(
    engine: &Engine,
    child: &CollectionRef,
    parent: &CollectionRef,
    copied_fields: &[&str],
    name: Option<&str>,
    options: CacheDocOptions,
) -> Result<()> {
    let name = name.unwrap_or_else(|| parent.name()).to_string();
    let cache_field = options.cache_field.unwrap_or_else(|| format!("_{name}"));
    let ref_field = options.ref_field.unwrap_or_else(|| format!("{name}_id"));
    let copied: Vec<String> = copied_fields
        .iter()
        .filter(|f| **f != ID_FIELD)
        .map(|f| f.to_string())
        .collect();
    let copied_refs: Vec<&str> = copied_fields
        .iter()
        .copied()
        .filter(|f| *f != ID_FIELD)
        .collect();

    // child side: resolve the reference and copy (or clear) on this document
    let child_insert = pull_from_parent(
        child.clone(),
        parent.clone(),
        ref_field.clone(),
        cache_field.clone(),
        copied.clone(),
        false,
    );
    let child_update = pull_from_parent(
        child.clone(),
        parent.clone(),
        ref_field.clone(),
        cache_field.clone(),
        copied.clone(),
        true,
    );
    engine.add_hooks(
        child,
        &[ref_field.as_str()],
        HookSet::new().on_insert(child_insert).on_update(child_update),
    )?;

    // parent side: push the copied fields to every referencing child
    let push_insert = push_to_children(
        child.clone(),
        ref_field.clone(),
        cache_field.clone(),
        copied.clone(),
    );
    let push_update = push_to_children(
        child.clone(),
        ref_field.clone(),
        cache_field.clone(),
        copied.clone(),
    );
    engine.add_hooks(
        parent,
        &copied_refs,
        HookSet::new().on_insert(push_insert).on_update(push_update),
    )?;

    let clear_on_remove = {
        let child = child.clone();
        move |ctx: &mut HookContext<'_>| {
            let Some(id) = doc_id(&ctx.doc) else {
                return Ok(());
            };
            let mut select = Map::new();
            select.insert(ref_field.clone(), Value::String(id.to_string()));
            ctx.unset(&child, Selector::Where(select), cache_field.as_str());
            Ok(())
        }
    };
    engine.add_hooks(parent, &[ID_FIELD], HookSet::new().on_remove(clear_on_remove))
}

fn copy_of(parent_doc: &Value, copied: &[String]) -> Value {
    Value::Object(fieldpath::pick(parent_doc, copied))
}

/// Hook body for the child side. `clear_when_unresolved` distinguishes
/// updates (a dangling or dropped reference clears the copy) from inserts
/// (nothing to clear yet).
fn pull_from_parent(
    child: CollectionRef,
    parent: CollectionRef,
    ref_field: String,
    cache_field: String,
    copied: Vec<String>,
    clear_when_unresolved: bool,
) -> impl Fn(&mut HookContext<'_>) -> Result<()> + Send + Sync + 'static {
    move |ctx| {
        let Some(id) = doc_id(&ctx.doc).map(str::to_string) else {
            return Ok(());
        };
        let parent_doc = match fieldpath::get(&ctx.doc, &ref_field) {
            Some(Value::String(reference)) => {
                parent.find_one(&Selector::Id(reference.clone()))?
            }
            _ => None,
        };
        match parent_doc {
            Some(doc) => ctx.set(&child, id, single(&cache_field, copy_of(&doc, &copied))),
            None if clear_when_unresolved => ctx.unset(&child, id, cache_field.as_str()),
            None => {}
        }
        Ok(())
    }
}

fn push_to_children(
    child: CollectionRef,
    ref_field: String,
    cache_field: String,
    copied: Vec<String>,
) -> impl Fn(&mut HookContext<'_>) -> Result<()> + Send + Sync + 'static {
    move |ctx| {
        let Some(id) = doc_id(&ctx.doc) else {
            return Ok(());
        };
        let mut select = Map::new();
        select.insert(ref_field.clone(), Value::String(id.to_string()));
        ctx.set(
            &child,
            Selector::Where(select),
            single(&cache_field, copy_of(&ctx.doc, &copied)),
        );
        Ok(())
    }
}
