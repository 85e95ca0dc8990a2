use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::HookContext;
use crate::Result;

/// Monotonically increasing watcher identifier, unique per engine.
pub type HookId = u64;

/// Lifecycle operation a watcher reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Insert,
    Update,
    Remove,
}

/// A watcher callback. Declares mutations through the context; an error is
/// logged and isolated to this watcher, the dispatch cycle continues.
pub type HookCallback = Arc<dyn Fn(&mut HookContext<'_>) -> Result<()> + Send + Sync>;

/// The callbacks one registration attaches, at most one per operation kind.
#[derive(Default)]
pub struct HookSet {
    insert: Option<HookCallback>,
    update: Option<HookCallback>,
    remove: Option<HookCallback>,
}

impl HookSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_insert<F>(mut self, callback: F) -> Self
    where F: Fn(&mut HookContext<'_>) -> Result<()> + Send + Sync + 'static {
        self.insert = Some(Arc::new(callback));
        self
    }

    pub fn on_update<F>(mut self, callback: F) -> Self
    where F: Fn(&mut HookContext<'_>) -> Result<()> + Send + Sync + 'static {
        self.update = Some(Arc::new(callback));
        self
    }

    pub fn on_remove<F>(mut self, callback: F) -> Self
    where F: Fn(&mut HookContext<'_>) -> Result<()> + Send + Sync + 'static {
        self.remove = Some(Arc::new(callback));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.insert.is_none() && self.update.is_none() && self.remove.is_none()
    }

    pub(crate) fn into_parts(self) -> Vec<(OpKind, HookCallback)> {
        let mut parts = Vec::new();
        if let Some(cb) = self.insert {
            parts.push((OpKind::Insert, cb));
        }
        if let Some(cb) = self.update {
            parts.push((OpKind::Update, cb));
        }
        if let Some(cb) = self.remove {
            parts.push((OpKind::Remove, cb));
        }
        parts
    }
}

/// One registered watcher: its identity, declared field paths, their
/// top-level segments and the callback. Never mutated after registration.
pub(crate) struct Hook {
    pub id: HookId,
    pub watched_fields: Vec<String>,
    pub watched_top_level: Vec<String>,
    pub callback: HookCallback,
}

/// Watchers of one (collection, operation kind) pair plus the accumulated
/// unions used by the top-level fast path.
#[derive(Default)]
pub(crate) struct OpHooks {
    pub watched_fields: Vec<String>,
    pub watched_top_level: Vec<String>,
    pub hooks: BTreeMap<HookId, Arc<Hook>>,
}

impl OpHooks {
    pub fn add(&mut self, hook: Arc<Hook>) {
        for path in &hook.watched_fields {
            if !self.watched_fields.contains(path) {
                self.watched_fields.push(path.clone());
            }
        }
        for segment in &hook.watched_top_level {
            if !self.watched_top_level.contains(segment) {
                self.watched_top_level.push(segment.clone());
            }
        }
        self.hooks.insert(hook.id, hook);
    }

    /// Top-level fast path: can any watcher here possibly care about a write
    /// that changed these top-level fields?
    pub fn is_relevant(&self, changed_top_level: &[String]) -> bool {
        intersects(&self.watched_top_level, changed_top_level)
    }
}

/// Per-collection watcher storage, one slot per operation kind. Mutated only
/// at registration time; dispatch takes read guards.
#[derive(Default)]
pub(crate) struct HookStore {
    insert: RwLock<OpHooks>,
    update: RwLock<OpHooks>,
    remove: RwLock<OpHooks>,
}

impl HookStore {
    pub fn ops(&self, kind: OpKind) -> &RwLock<OpHooks> {
        match kind {
            OpKind::Insert => &self.insert,
            OpKind::Update => &self.update,
            OpKind::Remove => &self.remove,
        }
    }
}

pub(crate) fn intersects(a: &[String], b: &[String]) -> bool {
    a.iter().any(|x| b.contains(x))
}
