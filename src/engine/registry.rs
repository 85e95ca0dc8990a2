use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

use super::change::ChangeCycle;
use super::hook::Hook;
use super::hook::HookStore;
use super::DispatchMode;
use super::Dispatcher;
use super::HookSet;
use crate::fieldpath;
use crate::CollectionRef;
use crate::OpKind;
use crate::RegistrationError;
use crate::Result;
use crate::Settings;

/// The explicit context every registration goes through. Holds the
/// per-collection watcher registry and the dispatcher; attaching reactive
/// behavior to a collection never requires touching its definition site.
///
/// Registrations are permanent for the engine's lifetime; there is no
/// unregistration.
pub struct Engine {
    dispatcher: Dispatcher,
    stores: DashMap<String, Arc<HookStore>>,
    next_hook_id: AtomicU64,
}

impl Engine {
    pub fn new(settings: Settings) -> Self {
        Self {
            dispatcher: Dispatcher::new(
                settings.dispatch.mode,
                settings.dispatch.max_in_flight,
            ),
            stores: DashMap::new(),
            next_hook_id: AtomicU64::new(0),
        }
    }

    pub fn with_mode(mode: DispatchMode) -> Self {
        let mut settings = Settings::default();
        settings.dispatch.mode = mode;
        Self::new(settings)
    }

    /// Registers one watcher on `collection`: up to one callback per
    /// operation kind, all sharing `watched_fields`.
    ///
    /// Malformed paths are rejected immediately. An empty path list or an
    /// empty hook set is a silent no-op by contract. The first registration
    /// for a collection installs the three lifecycle observers, exactly
    /// once, no matter how many watchers follow.
    pub fn add_hooks(
        &self,
        collection: &CollectionRef,
        watched_fields: &[&str],
        hooks: HookSet,
    ) -> Result<()> {
        for path in watched_fields {
            if path.is_empty() {
                return Err(RegistrationError::EmptyPath.into());
            }
            if path.split('.').any(str::is_empty) {
                return Err(RegistrationError::EmptySegment {
                    path: path.to_string(),
                }
                .into());
            }
        }
        if watched_fields.is_empty() || hooks.is_empty() {
            return Ok(());
        }

        let store = self.ensure_store(collection);
        let watched: Vec<String> = watched_fields.iter().map(|p| p.to_string()).collect();
        let top_level = fieldpath::top_level_segments(&watched);
        let id = self.next_hook_id.fetch_add(1, Ordering::SeqCst) + 1;

        for (kind, callback) in hooks.into_parts() {
            debug!(
                "watcher {} on '{}' {:?}, fields {:?}",
                id,
                collection.name(),
                kind,
                watched
            );
            store.ops(kind).write().add(Arc::new(Hook {
                id,
                watched_fields: watched.clone(),
                watched_top_level: top_level.clone(),
                callback,
            }));
        }
        Ok(())
    }

    /// Waits until every deferred dispatch cycle (including chains triggered
    /// by commits) has finished.
    pub async fn quiesce(&self) {
        self.dispatcher.quiesce().await;
    }

    #[cfg(test)]
    pub(crate) fn in_flight(&self) -> usize {
        self.dispatcher.in_flight()
    }

    fn ensure_store(&self, collection: &CollectionRef) -> Arc<HookStore> {
        match self.stores.entry(collection.name().to_string()) {
            Entry::Occupied(occupied) => occupied.get().clone(),
            Entry::Vacant(vacant) => {
                let store = Arc::new(HookStore::default());
                install_observers(collection, &store, &self.dispatcher);
                vacant.insert(store.clone());
                store
            }
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

fn top_level_keys(doc: &Value) -> Vec<String> {
    doc.as_object()
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default()
}

/// Wires the three lifecycle observers of a collection to the dispatcher.
/// Each observer applies the collection-level top-level fast path before
/// building a cycle, so irrelevant writes cost one intersection check.
fn install_observers(collection: &CollectionRef, store: &Arc<HookStore>, dispatcher: &Dispatcher) {
    let st = store.clone();
    let dsp = dispatcher.clone();
    collection.after_insert(Arc::new(move |_actor, doc| {
        let changed = top_level_keys(doc);
        if !st.ops(OpKind::Insert).read().is_relevant(&changed) {
            return;
        }
        dsp.dispatch(ChangeCycle {
            store: st.clone(),
            kind: OpKind::Insert,
            doc: doc.clone(),
            old_doc: None,
            changed_top_level: changed,
        });
    }));

    let st = store.clone();
    let dsp = dispatcher.clone();
    collection.after_update(Arc::new(move |_actor, doc, previous, changed| {
        if !st.ops(OpKind::Update).read().is_relevant(changed) {
            return;
        }
        dsp.dispatch(ChangeCycle {
            store: st.clone(),
            kind: OpKind::Update,
            doc: doc.clone(),
            old_doc: Some(previous.clone()),
            changed_top_level: changed.to_vec(),
        });
    }));

    let st = store.clone();
    let dsp = dispatcher.clone();
    collection.after_remove(Arc::new(move |_actor, doc| {
        let changed = top_level_keys(doc);
        if !st.ops(OpKind::Remove).read().is_relevant(&changed) {
            return;
        }
        dsp.dispatch(ChangeCycle {
            store: st.clone(),
            kind: OpKind::Remove,
            doc: doc.clone(),
            old_doc: None,
            changed_top_level: changed,
        });
    }));
}
