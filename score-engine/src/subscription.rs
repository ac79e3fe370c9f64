//! Path-addressed listeners.
//!
//! A listener is registered at exactly one [`Path`] and is invoked with a fresh
//! [`Snapshot`] once on registration and then whenever that path is notified.
//! List snapshots can be ordered per listener with [`OrderBy`].

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::path::Path;
use crate::state::Snapshot;
use crate::timestamp::Timestamp;

/// A comparable field value. Timestamps compare by their millisecond value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum FieldValue {
    Number(i64),
    Text(String),
    Time(Timestamp),
}

/// Records that can be ordered by a named field (`"createdAt"`, `"name"`, ...).
pub trait Sortable {
    fn field(&self, name: &str) -> Option<FieldValue>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self { field: field.into(), direction }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, Direction::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, Direction::Desc)
    }

    /// Records lacking the field sort before those that have it (ascending).
    pub fn compare<T: Sortable>(&self, a: &T, b: &T) -> Ordering {
        let ordering = a.field(&self.field).cmp(&b.field(&self.field));
        match self.direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        }
    }
}

impl From<&str> for OrderBy {
    fn from(field: &str) -> Self {
        OrderBy::asc(field)
    }
}

impl From<(&str, Direction)> for OrderBy {
    fn from((field, direction): (&str, Direction)) -> Self {
        OrderBy::new(field, direction)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscribeOptions {
    pub order_by: Option<OrderBy>,
}

impl SubscribeOptions {
    pub fn ordered(order_by: impl Into<OrderBy>) -> Self {
        Self { order_by: Some(order_by.into()) }
    }
}

pub type Callback = Box<dyn FnMut(Snapshot) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct Listener {
    id: SubscriptionId,
    order_by: Option<OrderBy>,
    callback: Arc<Mutex<Callback>>,
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    by_path: HashMap<Path, Vec<Listener>>,
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn deliver(callback: &Mutex<Callback>, order_by: Option<&OrderBy>, mut snapshot: Snapshot) {
    if let Some(order) = order_by {
        snapshot.sort(order);
    }
    let mut callback = lock(callback);
    (*callback)(snapshot);
}

/// Maps paths to their listeners. Cloning yields another handle to the same
/// registry.
#[derive(Clone, Default)]
pub struct SubscriptionRegistry {
    inner: Arc<Mutex<Listeners>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invokes `callback` with `initial`, then registers it at `path`.
    pub fn register(
        &self,
        path: Path,
        options: SubscribeOptions,
        callback: Callback,
        initial: Snapshot,
    ) -> Subscription {
        let callback = Arc::new(Mutex::new(callback));
        deliver(&callback, options.order_by.as_ref(), initial);

        let mut listeners = lock(&self.inner);
        listeners.next_id += 1;
        let id = SubscriptionId(listeners.next_id);
        listeners.by_path.entry(path.clone()).or_default().push(Listener {
            id,
            order_by: options.order_by,
            callback,
        });

        Subscription { id, path, registry: Arc::downgrade(&self.inner) }
    }

    pub fn has_listeners(&self, path: &Path) -> bool {
        lock(&self.inner)
            .by_path
            .get(path)
            .is_some_and(|listeners| !listeners.is_empty())
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.inner).by_path.values().map(Vec::len).sum()
    }

    pub fn active_paths(&self) -> Vec<Path> {
        let mut paths: Vec<Path> = lock(&self.inner)
            .by_path
            .iter()
            .filter(|(_, listeners)| !listeners.is_empty())
            .map(|(path, _)| path.clone())
            .collect();
        paths.sort();
        paths
    }

    /// Hands a copy of `snapshot` to every listener at `path`, in
    /// registration order. Returns how many listeners were called.
    pub fn notify(&self, path: &Path, snapshot: &Snapshot) -> usize {
        // Listeners may unsubscribe from inside their callback, so the
        // registry lock is released before any of them runs.
        let listeners = lock(&self.inner);
        let targets: Vec<(Option<OrderBy>, Arc<Mutex<Callback>>)> = match listeners.by_path.get(path) {
            Some(at_path) => at_path
                .iter()
                .map(|l| (l.order_by.clone(), Arc::clone(&l.callback)))
                .collect(),
            None => return 0,
        };
        drop(listeners);

        for (order_by, callback) in &targets {
            deliver(callback, order_by.as_ref(), snapshot.clone());
        }
        targets.len()
    }

    fn remove(inner: &Mutex<Listeners>, path: &Path, id: SubscriptionId) -> bool {
        let mut listeners = lock(inner);
        let Some(at_path) = listeners.by_path.get_mut(path) else {
            return false;
        };
        let before = at_path.len();
        at_path.retain(|l| l.id != id);
        let removed = at_path.len() != before;
        if at_path.is_empty() {
            listeners.by_path.remove(path);
        }
        removed
    }
}

/// Handle returned by a subscribe call. Listening continues until
/// [`Subscription::unsubscribe`] is called; dropping the handle does not stop it.
#[must_use = "keep the handle to be able to unsubscribe"]
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    path: Path,
    registry: Weak<Mutex<Listeners>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stops delivery. Returns `false` if the listener was already gone.
    pub fn unsubscribe(self) -> bool {
        match self.registry.upgrade() {
            Some(inner) => SubscriptionRegistry::remove(&inner, &self.path, self.id),
            None => false,
        }
    }
}
