use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use async_trait::async_trait;
use cqrs_es::persist::{PersistenceError, ViewContext, ViewRepository};

use super::{Intake, View};

/// How long a cached view is served before the backing store is read again.
/// Other instances may write the same intake, so entries cannot live forever.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5);

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process view table keyed by intake id. Used for local runs and tests.
/// Clones share the same table.
#[derive(Clone, Default)]
pub struct MemViewRepository {
    views: Arc<Mutex<HashMap<String, (View, i64)>>>,
}

impl MemViewRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ViewRepository<View, Intake> for MemViewRepository {
    async fn load(&self, view_id: &str) -> Result<Option<View>, PersistenceError> {
        Ok(lock(&self.views).get(view_id).map(|(view, _)| view.clone()))
    }

    async fn load_with_context(
        &self,
        view_id: &str,
    ) -> Result<Option<(View, ViewContext)>, PersistenceError> {
        Ok(lock(&self.views).get(view_id).map(|(view, version)| {
            (view.clone(), ViewContext::new(view_id.to_string(), *version))
        }))
    }

    async fn update_view(&self, view: View, context: ViewContext) -> Result<(), PersistenceError> {
        let mut views = lock(&self.views);
        let current = views.get(&context.view_instance_id).map_or(0, |(_, v)| *v);
        if current != context.version {
            return Err(PersistenceError::OptimisticLockError);
        }
        views.insert(context.view_instance_id, (view, current + 1));
        Ok(())
    }
}

struct Entry {
    view: View,
    cached_at: Instant,
}

#[derive(Default)]
struct Entries {
    views: HashMap<String, Entry>,
    // Lowest version a read may cache, per id, raised by every local write
    floor: HashMap<String, i64>,
}

/// Read-through cache in front of a view repository. Entries expire after a
/// TTL. Every local write goes to the backing store, drops the cached entry and
/// refuses any older version a concurrent read tries to put back.
pub struct ViewCache {
    inner: Box<dyn ViewRepository<View, Intake>>,
    ttl: Duration,
    entries: Mutex<Entries>,
}

impl ViewCache {
    pub fn new(inner: Box<dyn ViewRepository<View, Intake>>) -> Self {
        Self::with_ttl(inner, DEFAULT_TTL)
    }

    pub fn with_ttl(inner: Box<dyn ViewRepository<View, Intake>>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(Entries::default()),
        }
    }

    pub fn invalidate(&self, view_id: &str) {
        lock(&self.entries).views.remove(view_id);
    }

    pub fn is_cached(&self, view_id: &str) -> bool {
        self.fresh(view_id).is_some()
    }

    fn fresh(&self, view_id: &str) -> Option<View> {
        let mut entries = lock(&self.entries);
        let expired = match entries.views.get(view_id) {
            Some(entry) if entry.cached_at.elapsed() < self.ttl => return Some(entry.view.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.views.remove(view_id);
        }
        None
    }

    /// Cache a view read at `version` unless a newer one was written since.
    fn remember(&self, view_id: &str, view: View, version: i64) {
        let mut entries = lock(&self.entries);
        let floor = entries.floor.get(view_id).copied().unwrap_or(0);
        if version < floor {
            return;
        }
        entries.views.insert(
            view_id.to_string(),
            Entry {
                view,
                cached_at: Instant::now(),
            },
        );
    }

    fn written(&self, view_id: &str, version: i64) {
        let mut entries = lock(&self.entries);
        entries.views.remove(view_id);
        let floor = entries.floor.entry(view_id.to_string()).or_insert(version);
        *floor = (*floor).max(version);
    }
}

#[async_trait]
impl ViewRepository<View, Intake> for ViewCache {
    async fn load(&self, view_id: &str) -> Result<Option<View>, PersistenceError> {
        if let Some(view) = self.fresh(view_id) {
            return Ok(Some(view));
        }

        let loaded = self.inner.load_with_context(view_id).await?;
        Ok(loaded.map(|(view, context)| {
            self.remember(view_id, view.clone(), context.version);
            view
        }))
    }

    async fn load_with_context(
        &self,
        view_id: &str,
    ) -> Result<Option<(View, ViewContext)>, PersistenceError> {
        self.inner.load_with_context(view_id).await
    }

    async fn update_view(&self, view: View, context: ViewContext) -> Result<(), PersistenceError> {
        let view_id = context.view_instance_id.clone();
        let next_version = context.version + 1;
        let result = self.inner.update_view(view, context).await;
        if result.is_ok() {
            self.written(&view_id, next_version);
        } else {
            self.invalidate(&view_id);
        }
        result
    }
}
