use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, Weak};
use std::thread::Thread;
use uuid::Uuid;

thread_local! {
    // Dropped when the thread exits, which marks its bindings as dead.
    static THREAD_ALIVE: Arc<()> = Arc::new(());
}

/// Identity of the execution context a log call is made from.
///
/// Derived from the calling thread's name joined with its `ThreadId`, so
/// two threads sharing a name (e.g. pooled workers) never share a key.
/// Ids taken with [`ContextId::current`] also track whether their thread
/// is still running, so the registry can drop bindings of exited threads.
#[derive(Debug, Clone)]
pub struct ContextId {
    key: String,
    owner: Option<Weak<()>>,
}

impl ContextId {
    /// Explicit key for callers that track their own unit of work.
    /// Such ids live until flushed.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            key: id.into(),
            owner: None,
        }
    }

    pub fn current() -> Self {
        Self {
            key: Self::thread_key(&std::thread::current()),
            owner: THREAD_ALIVE.try_with(Arc::downgrade).ok(),
        }
    }

    pub fn from_thread(thread: &Thread) -> Self {
        Self::new(Self::thread_key(thread))
    }

    fn thread_key(thread: &Thread) -> String {
        format!("{}#{:?}", thread.name().unwrap_or("unnamed"), thread.id())
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// `false` once the owning thread has exited.
    pub fn is_alive(&self) -> bool {
        self.owner.as_ref().map_or(true, |owner| owner.strong_count() > 0)
    }
}

impl PartialEq for ContextId {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ContextId {}

impl Hash for ContextId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// Mapping from execution context to the correlation id bound to it.
///
/// Entries are created by [`bind`](Self::bind), read by every formatted
/// event and removed by [`flush`](Self::flush). Entries of threads that
/// exited without flushing are pruned on the next `bind` or `len`. None
/// of the operations fail; a poisoned lock is recovered since the map
/// holds plain strings.
#[derive(Debug, Default)]
pub struct CorrelationRegistry {
    entries: Mutex<HashMap<ContextId, String>>,
}

impl CorrelationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by every logger in the process.
    pub fn global() -> &'static CorrelationRegistry {
        static GLOBAL: OnceLock<CorrelationRegistry> = OnceLock::new();
        GLOBAL.get_or_init(CorrelationRegistry::new)
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<ContextId, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Bind a fresh correlation id to `context`, replacing any previous one.
    pub fn bind(&self, context: ContextId) -> String {
        let id = new_correlation_id();
        let mut entries = self.entries();
        prune(&mut entries);
        // Remove first so the key carries the new owner.
        entries.remove(&context);
        entries.insert(context, id.clone());
        id
    }

    /// Remove the entry for `context`. No-op when nothing is bound.
    pub fn flush(&self, context: &ContextId) {
        self.entries().remove(context);
    }

    /// Bound id for `context`, or an empty string.
    pub fn lookup(&self, context: &ContextId) -> String {
        self.get(context).unwrap_or_default()
    }

    pub fn get(&self, context: &ContextId) -> Option<String> {
        self.entries().get(context).cloned()
    }

    /// Number of live bindings.
    pub fn len(&self) -> usize {
        let mut entries = self.entries();
        prune(&mut entries);
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bind for the calling thread and flush again when the guard drops.
    pub fn bind_scoped(&self) -> CorrelationGuard<'_> {
        let context = ContextId::current();
        let id = self.bind(context.clone());
        CorrelationGuard {
            registry: self,
            context,
            id,
        }
    }
}

/// Releases a correlation binding on drop, including during unwinding.
#[derive(Debug)]
#[must_use = "the binding is flushed as soon as the guard is dropped"]
pub struct CorrelationGuard<'a> {
    registry: &'a CorrelationRegistry,
    context: ContextId,
    id: String,
}

impl CorrelationGuard<'_> {
    pub fn correlation_id(&self) -> &str {
        &self.id
    }
}

impl Drop for CorrelationGuard<'_> {
    fn drop(&mut self) {
        // Only flush if the entry was not re-bound in the meantime.
        let mut entries = self.registry.entries();
        if entries.get(&self.context) == Some(&self.id) {
            entries.remove(&self.context);
        }
    }
}

fn prune(entries: &mut HashMap<ContextId, String>) {
    entries.retain(|context, _| context.is_alive());
}

/// Time-ordered UUIDv1 with a per-process random node id.
fn new_correlation_id() -> String {
    static NODE_ID: OnceLock<[u8; 6]> = OnceLock::new();
    let node = NODE_ID.get_or_init(|| {
        let mut node: [u8; 6] = rand::random();
        // Multicast bit marks a node id that is not a real MAC address.
        node[0] |= 0x01;
        node
    });
    Uuid::now_v1(node).to_string()
}
