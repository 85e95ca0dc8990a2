//! Dotted field-path resolution over untyped documents.
//!
//! Documents are `serde_json::Value` mappings. A path such as `"author.name"`
//! walks nested mappings one segment at a time; an unresolvable path yields
//! absence, never an error. Computed fields are supported through the explicit
//! [`FieldAccessor`] capability instead of detecting callables in the data.


use std::borrow::Cow;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Map;
use serde_json::Value;

/// Per-path diff result. `None` means the path resolved to nothing in the
/// newer document (changed-to-absent), which downstream turns into an unset.
pub type FieldDiff = BTreeMap<String, Option<Value>>;

/// A document field computed on demand rather than stored. Path resolution
/// treats a registered accessor exactly like a stored value at its path;
/// `owner` is the value the walk reached at the accessor's parent path.
pub trait FieldAccessor: Send + Sync {
    fn resolve(&self, owner: &Value) -> Value;
}

/// Accessors keyed by the dotted path prefix they stand in for.
pub type AccessorTable = HashMap<String, Arc<dyn FieldAccessor>>;

/// Resolves a dotted path through nested mappings. Returns `None` if any
/// segment cannot be resolved.
pub fn get<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Like [`get`], but consults `accessors` at every step: when the walk reaches
/// a path prefix with a registered accessor, the accessor supplies the value
/// and the walk continues into it.
pub fn get_with(doc: &Value, path: &str, accessors: &AccessorTable) -> Option<Value> {
    let mut current = Cow::Borrowed(doc);
    let mut prefix = String::new();
    for segment in path.split('.') {
        if !prefix.is_empty() {
            prefix.push('.');
        }
        prefix.push_str(segment);

        if let Some(accessor) = accessors.get(&prefix) {
            current = Cow::Owned(accessor.resolve(&current));
            continue;
        }
        let next = current.as_object()?.get(segment)?.clone();
        current = Cow::Owned(next);
    }
    Some(current.into_owned())
}

/// Ordered resolution of several paths at once.
pub fn get_many<'a>(doc: &'a Value, paths: &[String]) -> Vec<Option<&'a Value>> {
    paths.iter().map(|p| get(doc, p)).collect()
}

/// Path → value mapping over `paths`, skipping unresolved paths.
pub fn pick<'a, I>(doc: &Value, paths: I) -> Map<String, Value>
where I: IntoIterator<Item = &'a String> {
    let mut out = Map::new();
    for path in paths {
        if let Some(value) = get(doc, path) {
            out.insert(path.clone(), value.clone());
        }
    }
    out
}

/// Assigns `value` at a dotted path, creating intermediate mappings as
/// needed. Non-mapping intermediate values are replaced by fresh mappings.
pub fn set_path(doc: &mut Value, path: &str, value: Value) {
    if !doc.is_object() {
        *doc = Value::Object(Map::new());
    }
    let mut current = doc;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let map = current.as_object_mut().unwrap();
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        let entry = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = entry;
    }
}

/// Applies every path → value pair of `source` onto `target` via [`set_path`].
/// Apply several sources in order to get later-source-wins semantics.
/// Mutates and returns `target`.
pub fn assign<'a>(target: &'a mut Value, source: &Map<String, Value>) -> &'a mut Value {
    for (path, value) in source {
        set_path(target, path, value.clone());
    }
    target
}

/// Removes the value at a dotted path. No-op when the path does not resolve.
pub fn remove_path(doc: &mut Value, path: &str) {
    let Some((parent_path, leaf)) = path.rsplit_once('.') else {
        if let Some(map) = doc.as_object_mut() {
            map.remove(path);
        }
        return;
    };
    let mut current = doc;
    for segment in parent_path.split('.') {
        let Some(next) = current.as_object_mut().and_then(|m| m.get_mut(segment)) else {
            return;
        };
        current = next;
    }
    if let Some(map) = current.as_object_mut() {
        map.remove(leaf);
    }
}

/// Per-path diff between two documents. A path is included (with `a`'s value,
/// `None` when absent in `a`) only if the two resolutions differ.
///
/// Mapping- and sequence-valued resolutions are always reported as different
/// when at least one side holds one, even if structurally equal. This
/// over-triggers rather than under-triggers watchers whose cached values are
/// recomputed from authoritative data anyway.
pub fn diff(paths: &[String], a: &Value, b: &Value) -> FieldDiff {
    let mut out = FieldDiff::new();
    for path in paths {
        let va = get(a, path);
        let vb = get(b, path);
        if differs(va, vb) {
            out.insert(path.clone(), va.cloned());
        }
    }
    out
}

/// Like [`diff`], but resolves both documents through `accessors`, so a
/// computed field participates in change detection the same way a stored
/// one does.
pub fn diff_with(
    paths: &[String],
    a: &Value,
    b: &Value,
    accessors: &AccessorTable,
) -> FieldDiff {
    let mut out = FieldDiff::new();
    for path in paths {
        let va = get_with(a, path, accessors);
        let vb = get_with(b, path, accessors);
        if differs(va.as_ref(), vb.as_ref()) {
            out.insert(path.clone(), va);
        }
    }
    out
}

fn differs(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (None, None) => false,
        (Some(va), Some(vb)) => {
            if is_composite(va) || is_composite(vb) {
                return true;
            }
            va != vb
        }
        _ => true,
    }
}

fn is_composite(value: &Value) -> bool {
    value.is_object() || value.is_array()
}

/// Expands a nested field-selection shape into a flat list of dotted paths.
/// Leaves are any non-mapping values; `prefix` seeds the path (pass `""` at
/// the top level).
pub fn flatten(nested: &Map<String, Value>, prefix: &str) -> Vec<String> {
    let mut out = Vec::new();
    for (key, value) in nested {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(inner) if !inner.is_empty() => out.extend(flatten(inner, &path)),
            _ => out.push(path),
        }
    }
    out
}

/// Deduplicated first segment of each path, preserving first-seen order. Used
/// as the cheap pre-filter before any per-path diffing.
pub fn top_level_segments<I, S>(paths: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for path in paths {
        let segment = path.as_ref().split('.').next().unwrap_or_default().to_string();
        if !out.contains(&segment) {
            out.push(segment);
        }
    }
    out
}
