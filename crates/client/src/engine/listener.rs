//! Listener fan-out & async plumbing (§2, §4.4).
//!
//! Grounded on `original_source/src/rtc/src/webrtc/AsyncListeners.h`:
//! that type holds a `shared_ptr<Listeners>` behind a `weak_ptr<TaskQueueBase>`
//! and posts `invoke(method, args...)` onto the queue so every
//! dispatch happens off the calling thread. [`EventQueue`] is the Rust
//! equivalent of that task queue (a single spawned task draining an
//! unbounded channel of boxed closures); [`ListenerRegistry`] is the
//! equivalent of `Listeners<T>` — a weak-reference collection that
//! drops dead handles as it iterates, per §9's redesign note ("a
//! listener whose handle fails to upgrade is removed").

use std::sync::{Arc, Mutex, Weak};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

type BoxedTask = Box<dyn FnOnce() + Send>;

/// The single-threaded cooperative queue of §5 ("Event task queue").
/// Every listener dispatch and every track-model mutation happens from
/// a closure posted here, which is what gives per-listener delivery
/// order (§4.4) and keeps the track arena single-writer (§5).
#[derive(Clone)]
pub struct EventQueue {
    sender: mpsc::UnboundedSender<BoxedTask>,
}

/// Owns the spawned task backing an [`EventQueue`]. The task itself
/// keeps running if this is dropped (a bare `JoinHandle` doesn't abort
/// on drop); hold onto this for the lifetime of the `Room` so the
/// queue can be torn down deliberately instead of leaking for the rest
/// of the process.
pub struct EventQueueHandle {
    _task: JoinHandle<()>,
}

impl EventQueue {
    /// Spawns the event task and returns a queue plus the handle that
    /// owns its lifetime.
    #[must_use]
    pub fn spawn() -> (Self, EventQueueHandle) {
        let (sender, mut receiver) = mpsc::unbounded_channel::<BoxedTask>();
        let task = tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                job();
            }
        });
        (Self { sender }, EventQueueHandle { _task: task })
    }

    /// Posts a closure to run on the event task. Never blocks; silently
    /// drops the job if the task has already shut down (room torn
    /// down) — a best-effort post, the same shape as upgrading a weak
    /// handle and skipping the call when it's gone.
    pub fn post(&self, job: impl FnOnce() + Send + 'static) {
        let _ = self.sender.send(Box::new(job));
    }
}

/// A weak-reference fan-out list for listener trait objects of type
/// `T` (§4.4).
///
/// `add`/`remove` are safe from any thread at any time, including from
/// inside a dispatched invocation, because [`ListenerRegistry::snapshot`]
/// takes its own copy before a dispatch pass begins: a listener added
/// mid-dispatch joins the *next* snapshot, and one removed mid-dispatch
/// finishes the invocation already in flight (its `Arc` is still held
/// by that snapshot) but is absent from the next one.
pub struct ListenerRegistry<T: ?Sized> {
    listeners: Mutex<Vec<Weak<T>>>,
}

impl<T: ?Sized> Default for ListenerRegistry<T> {
    fn default() -> Self {
        Self { listeners: Mutex::new(Vec::new()) }
    }
}

impl<T: ?Sized> ListenerRegistry<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Weak<T>) {
        self.listeners.lock().expect("listener registry poisoned").push(listener);
    }

    /// Removes every handle pointing at the same allocation as
    /// `listener`.
    pub fn remove(&self, listener: &Weak<T>) {
        let target = listener.as_ptr();
        self.listeners
            .lock()
            .expect("listener registry poisoned")
            .retain(|w| !std::ptr::eq(w.as_ptr(), target));
    }

    /// Upgrades every live handle, dropping dead ones from the backing
    /// store in the same pass, and returns the strong snapshot to
    /// dispatch against (§4.4, §9).
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        let mut guard = self.listeners.lock().expect("listener registry poisoned");
        let mut live = Vec::with_capacity(guard.len());
        guard.retain(|w| match w.upgrade() {
            Some(strong) => {
                live.push(strong);
                true
            }
            None => false,
        });
        live
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.lock().expect("listener registry poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    trait Probe: Send + Sync {
        fn hit(&self);
    }

    struct Counter(AtomicUsize);
    impl Probe for Counter {
        fn hit(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn dead_handle_is_dropped_from_snapshot() {
        let registry: ListenerRegistry<dyn Probe> = ListenerRegistry::new();
        {
            let listener: Arc<dyn Probe> = Arc::new(Counter(AtomicUsize::new(0)));
            registry.add(Arc::downgrade(&listener));
            assert_eq!(registry.snapshot().len(), 1);
        }
        // `listener` dropped; the next snapshot should reap the dead weak ref.
        assert!(registry.snapshot().is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn remove_by_identity_only_removes_the_matching_handle() {
        let registry: ListenerRegistry<dyn Probe> = ListenerRegistry::new();
        let a: Arc<dyn Probe> = Arc::new(Counter(AtomicUsize::new(0)));
        let b: Arc<dyn Probe> = Arc::new(Counter(AtomicUsize::new(0)));
        let weak_a = Arc::downgrade(&a);
        registry.add(weak_a.clone());
        registry.add(Arc::downgrade(&b));
        registry.remove(&weak_a);
        assert_eq!(registry.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn event_queue_preserves_post_order() {
        let (queue, _handle) = EventQueue::spawn();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..5 {
            let order = order.clone();
            queue.post(move || order.lock().unwrap().push(i));
        }
        // give the event task a chance to drain
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn listener_removed_during_its_own_invocation_sees_no_further_events() {
        struct SelfRemoving {
            seen: AtomicUsize,
        }
        let registry: Arc<ListenerRegistry<dyn Probe>> = Arc::new(ListenerRegistry::new());
        let listener = Arc::new(SelfRemoving { seen: AtomicUsize::new(0) });
        impl Probe for SelfRemoving {
            fn hit(&self) {
                self.seen.fetch_add(1, Ordering::SeqCst);
            }
        }
        let weak: Weak<dyn Probe> = Arc::downgrade(&(listener.clone() as Arc<dyn Probe>));
        registry.add(weak.clone());

        // First dispatch pass: listener removes itself mid-invocation.
        for l in registry.snapshot() {
            l.hit();
            registry.remove(&weak);
        }
        // Second dispatch pass must not see it again.
        for l in registry.snapshot() {
            l.hit();
        }
        assert_eq!(listener.seen.load(Ordering::SeqCst), 1);
    }
}
