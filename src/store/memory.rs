use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use super::doc_id;
use super::Collection;
use super::CollectionRef;
use super::InsertObserver;
use super::RemoveObserver;
use super::Selector;
use super::UpdateObserver;
use super::UpdateOps;
use crate::constants::ID_FIELD;
use crate::fieldpath;
use crate::Result;
use crate::StoreError;

/// In-process backing store keeping documents in a `BTreeMap` keyed by
/// identifier. Fulfils the whole [`Collection`] contract, including firing
/// lifecycle observers synchronously after each write with previous
/// snapshots and changed top-level field names.
///
/// Locks are released before observers fire; observers may freely read or
/// write the collection again.
pub struct MemoryCollection {
    name: String,
    docs: RwLock<BTreeMap<String, Value>>,
    insert_observers: RwLock<Vec<InsertObserver>>,
    update_observers: RwLock<Vec<UpdateObserver>>,
    remove_observers: RwLock<Vec<RemoveObserver>>,
}

impl MemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            docs: RwLock::new(BTreeMap::new()),
            insert_observers: RwLock::new(Vec::new()),
            update_observers: RwLock::new(Vec::new()),
            remove_observers: RwLock::new(Vec::new()),
        }
    }

    /// Convenience constructor yielding the shared trait handle the engine
    /// and recipes work with.
    pub fn new_shared(name: impl Into<String>) -> CollectionRef {
        std::sync::Arc::new(Self::new(name))
    }

    fn matches(doc: &Value, selector: &Selector) -> bool {
        match selector {
            Selector::Id(id) => doc_id(doc) == Some(id.as_str()),
            Selector::Where(map) => map
                .iter()
                .all(|(path, expected)| fieldpath::get(doc, path) == Some(expected)),
        }
    }

    fn matching_ids(
        docs: &BTreeMap<String, Value>,
        selector: &Selector,
    ) -> Vec<String> {
        match selector {
            // point lookup, no scan
            Selector::Id(id) => docs.contains_key(id).then(|| id.clone()).into_iter().collect(),
            _ => docs
                .iter()
                .filter(|(_, doc)| Self::matches(doc, selector))
                .map(|(id, _)| id.clone())
                .collect(),
        }
    }
}

impl Collection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn find(&self, selector: &Selector) -> Result<Vec<Value>> {
        let docs = self.docs.read();
        Ok(Self::matching_ids(&docs, selector)
            .into_iter()
            .filter_map(|id| docs.get(&id).cloned())
            .collect())
    }

    fn find_one(&self, selector: &Selector) -> Result<Option<Value>> {
        Ok(self.find(selector)?.into_iter().next())
    }

    fn insert(&self, mut doc: Value) -> Result<String> {
        let Some(map) = doc.as_object_mut() else {
            return Err(StoreError::NotADocument {
                collection: self.name.clone(),
            }
            .into());
        };
        let id = match map.get(ID_FIELD) {
            Some(Value::String(id)) => id.clone(),
            Some(_) => {
                return Err(StoreError::InvalidId {
                    collection: self.name.clone(),
                }
                .into())
            }
            None => {
                let id = nanoid::nanoid!();
                map.insert(ID_FIELD.to_string(), Value::String(id.clone()));
                id
            }
        };

        {
            let mut docs = self.docs.write();
            if docs.contains_key(&id) {
                return Err(StoreError::DuplicateId {
                    collection: self.name.clone(),
                    id,
                }
                .into());
            }
            docs.insert(id.clone(), doc.clone());
        }
        debug!("INSERT {}: {}", self.name.to_uppercase(), id);

        let observers = self.insert_observers.read().clone();
        for observer in observers {
            observer(None, &doc);
        }
        Ok(id)
    }

    fn update(&self, selector: &Selector, ops: UpdateOps, multi: bool) -> Result<usize> {
        if ops.is_empty() {
            return Ok(0);
        }
        // changed fields are derived from the modifier, matching what the
        // contract promises update observers
        let changed: Vec<String> = fieldpath::top_level_segments(
            ops.assign.keys().map(String::as_str).chain(ops.remove.iter().map(String::as_str)),
        );

        let mut written: Vec<(Value, Value)> = Vec::new();
        {
            let mut docs = self.docs.write();
            let mut ids = Self::matching_ids(&docs, selector);
            if !multi {
                ids.truncate(1);
            }
            for id in ids {
                let Some(doc) = docs.get_mut(&id) else { continue };
                let previous = doc.clone();
                fieldpath::assign(doc, &ops.assign);
                for path in &ops.remove {
                    fieldpath::remove_path(doc, path);
                }
                written.push((doc.clone(), previous));
            }
        }
        debug!(
            "UPDATE {}: {} document(s), fields {:?}",
            self.name.to_uppercase(),
            written.len(),
            changed
        );

        let observers = self.update_observers.read().clone();
        for (doc, previous) in &written {
            for observer in &observers {
                observer(None, doc, previous, &changed);
            }
        }
        Ok(written.len())
    }

    fn remove(&self, selector: &Selector) -> Result<usize> {
        let removed: Vec<Value> = {
            let mut docs = self.docs.write();
            Self::matching_ids(&docs, selector)
                .into_iter()
                .filter_map(|id| docs.remove(&id))
                .collect()
        };
        debug!("REMOVE {}: {} document(s)", self.name.to_uppercase(), removed.len());

        let observers = self.remove_observers.read().clone();
        for doc in &removed {
            for observer in &observers {
                observer(None, doc);
            }
        }
        Ok(removed.len())
    }

    fn after_insert(&self, observer: InsertObserver) {
        self.insert_observers.write().push(observer);
    }

    fn after_update(&self, observer: UpdateObserver) {
        self.update_observers.write().push(observer);
    }

    fn after_remove(&self, observer: RemoveObserver) {
        self.remove_observers.write().push(observer);
    }
}
