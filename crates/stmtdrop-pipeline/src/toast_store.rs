//! Observable store of upload-status toasts.
//!
//! [`ToastStore`] is an explicit object: create one per UI and hand clones of it to
//! whatever needs it. Clones share state. Every mutation notifies the subscribed
//! [`ToastObserver`]s with a snapshot of the list. The listener set is copied before
//! notifying and the lock is released first, so observers may read the store,
//! subscribe or unsubscribe from inside a notification without deadlocking or
//! causing a successor to be skipped.

use rand::Rng;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

use stmtdrop_core::{Toast, ToastStatus, ToastUpdate};

/// Time a completed or failed toast stays visible by default.
pub const DEFAULT_TOAST_TTL: Duration = Duration::from_millis(5000);

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_LENGTH: usize = 13;

/// Receives the full toast list after every change.
pub trait ToastObserver: Send + Sync {
    fn on_toasts_changed(&self, toasts: &[Toast]);
}

impl<F> ToastObserver for F
where
    F: Fn(&[Toast]) + Send + Sync,
{
    fn on_toasts_changed(&self, toasts: &[Toast]) {
        self(toasts)
    }
}

#[derive(Default)]
struct Inner {
    toasts: Vec<Toast>,
    observers: Vec<(u64, Arc<dyn ToastObserver>)>,
    next_observer_id: u64,
}

#[derive(Clone)]
pub struct ToastStore {
    inner: Arc<Mutex<Inner>>,
    ttl: Duration,
}

impl Default for ToastStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ToastStore {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TOAST_TTL)
    }

    /// Store whose [`auto_remove_toast`](Self::auto_remove_toast) waits `ttl`.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        let (toasts, observers) = {
            let inner = self.lock();
            let observers: Vec<Arc<dyn ToastObserver>> =
                inner.observers.iter().map(|(_, o)| Arc::clone(o)).collect();
            (inner.toasts.clone(), observers)
        };
        for observer in observers {
            observer.on_toasts_changed(&toasts);
        }
    }

    /// Snapshot of all toasts in insertion order.
    pub fn toasts(&self) -> Vec<Toast> {
        self.lock().toasts.clone()
    }

    pub fn get(&self, id: &str) -> Option<Toast> {
        self.lock().toasts.iter().find(|t| t.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().toasts.is_empty()
    }

    pub fn add_toast(
        &self,
        message: impl Into<String>,
        status: ToastStatus,
        filename: Option<String>,
    ) -> String {
        let id = {
            let mut inner = self.lock();
            let id = loop {
                let candidate = generate_id();
                if !inner.toasts.iter().any(|t| t.id == candidate) {
                    break candidate;
                }
            };
            inner.toasts.push(Toast {
                id: id.clone(),
                message: message.into(),
                status,
                filename,
            });
            id
        };
        self.notify();
        id
    }

    /// Merge `update` into the toast with `id`. Returns false (and changes nothing)
    /// for an unknown id. A status that would move the toast backwards is ignored.
    pub fn update_toast(&self, id: &str, update: ToastUpdate) -> bool {
        {
            let mut inner = self.lock();
            let Some(toast) = inner.toasts.iter_mut().find(|t| t.id == id) else {
                tracing::trace!(toast_id = %id, "Update for unknown toast ignored");
                return false;
            };

            if let Some(status) = update.status {
                if toast.status.can_transition_to(status) {
                    toast.status = status;
                } else {
                    tracing::debug!(
                        toast_id = %id,
                        from = %toast.status,
                        to = %status,
                        "Ignoring backward toast status change"
                    );
                }
            }
            if let Some(message) = update.message {
                toast.message = message;
            }
            if let Some(filename) = update.filename {
                toast.filename = Some(filename);
            }
        }
        self.notify();
        true
    }

    /// Remove the toast with `id`. Observers are notified even when nothing was
    /// removed. Returns whether the toast existed.
    pub fn remove_toast(&self, id: &str) -> bool {
        let removed = {
            let mut inner = self.lock();
            let before = inner.toasts.len();
            inner.toasts.retain(|t| t.id != id);
            inner.toasts.len() != before
        };
        self.notify();
        removed
    }

    /// Remove the toast only if it currently has a terminal status.
    pub fn remove_if_terminal(&self, id: &str) -> bool {
        let removed = {
            let mut inner = self.lock();
            match inner.toasts.iter().position(|t| t.id == id) {
                Some(index) if inner.toasts[index].status.is_terminal() => {
                    inner.toasts.remove(index);
                    true
                }
                _ => false,
            }
        };
        if removed {
            self.notify();
        }
        removed
    }

    /// After the store's TTL, remove the toast if it is then completed or failed.
    pub fn auto_remove_toast(&self, id: &str) -> JoinHandle<()> {
        self.auto_remove_toast_after(id, self.ttl)
    }

    pub fn auto_remove_toast_after(&self, id: &str, delay: Duration) -> JoinHandle<()> {
        let store = self.clone();
        let id = id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !store.remove_if_terminal(&id) {
                tracing::trace!(toast_id = %id, "Toast kept: gone or not terminal");
            }
        })
    }

    pub fn subscribe(&self, observer: impl ToastObserver + 'static) -> Subscription {
        let mut inner = self.lock();
        let id = inner.next_observer_id;
        inner.next_observer_id += 1;
        let observer: Arc<dyn ToastObserver> = Arc::new(observer);
        inner.observers.push((id, observer));
        Subscription {
            store: Arc::downgrade(&self.inner),
            id: Some(id),
        }
    }

    pub fn observer_count(&self) -> usize {
        self.lock().observers.len()
    }
}

fn generate_id() -> String {
    let mut rng = rand::rng();
    (0..ID_LENGTH)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// Keeps an observer registered. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    store: Weak<Mutex<Inner>>,
    id: Option<u64>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.remove();
    }

    /// Keep the observer registered for the lifetime of the store.
    pub fn detach(mut self) {
        self.id = None;
    }

    fn remove(&mut self) {
        let Some(id) = self.id.take() else { return };
        if let Some(inner) = self.store.upgrade() {
            inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .observers
                .retain(|(observer_id, _)| *observer_id != id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.remove();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter(store: &ToastStore) -> (Arc<AtomicUsize>, Subscription) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let sub = store.subscribe(move |_: &[Toast]| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (count, sub)
    }

    #[test]
    fn added_toast_is_retrievable_with_same_fields() {
        let store = ToastStore::new();
        let id = store.add_toast("Uploading a.pdf...", ToastStatus::Pending, Some("a.pdf".into()));

        assert_eq!(id.len(), 13);
        assert!(id.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_eq!(
            store.toasts(),
            vec![Toast {
                id: id.clone(),
                message: "Uploading a.pdf...".to_string(),
                status: ToastStatus::Pending,
                filename: Some("a.pdf".to_string()),
            }]
        );
    }

    #[test]
    fn ids_are_unique_and_order_is_insertion_order() {
        let store = ToastStore::new();
        let ids: Vec<String> = (0..50)
            .map(|i| store.add_toast(format!("t{}", i), ToastStatus::Pending, None))
            .collect();
        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 50);
        let listed: Vec<String> = store.toasts().into_iter().map(|t| t.id).collect();
        assert_eq!(listed, ids);
    }

    #[test]
    fn update_merges_only_given_fields() {
        let store = ToastStore::new();
        let id = store.add_toast("Uploading", ToastStatus::Pending, Some("a.pdf".into()));

        assert!(store.update_toast(
            &id,
            ToastUpdate {
                status: Some(ToastStatus::Processing),
                ..ToastUpdate::default()
            }
        ));
        let toast = store.get(&id).unwrap();
        assert_eq!(toast.status, ToastStatus::Processing);
        assert_eq!(toast.message, "Uploading");
        assert_eq!(toast.filename.as_deref(), Some("a.pdf"));
    }

    #[test]
    fn update_of_unknown_id_is_a_silent_no_op() {
        let store = ToastStore::new();
        store.add_toast("x", ToastStatus::Pending, None);
        let before = store.toasts();
        let (count, _sub) = counter(&store);

        assert!(!store.update_toast("missing", ToastUpdate::status(ToastStatus::Failed, "boom")));
        assert_eq!(store.toasts(), before);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn status_never_moves_backwards() {
        let store = ToastStore::new();
        let id = store.add_toast("x", ToastStatus::Pending, None);
        store.update_toast(&id, ToastUpdate::status(ToastStatus::Completed, "done"));
        store.update_toast(&id, ToastUpdate::status(ToastStatus::Processing, "late progress"));

        let toast = store.get(&id).unwrap();
        assert_eq!(toast.status, ToastStatus::Completed);
        assert_eq!(toast.message, "late progress");
    }

    #[test]
    fn remove_always_notifies() {
        let store = ToastStore::new();
        let id = store.add_toast("x", ToastStatus::Pending, None);
        let (count, _sub) = counter(&store);

        assert!(store.remove_toast(&id));
        assert!(!store.remove_toast(&id));
        assert!(store.is_empty());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn observers_receive_snapshots_and_unsubscribe_on_drop() {
        let store = ToastStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = store.subscribe(move |toasts: &[Toast]| {
            sink.lock().unwrap().push(toasts.len());
        });

        store.add_toast("a", ToastStatus::Pending, None);
        store.add_toast("b", ToastStatus::Pending, None);
        drop(sub);
        store.add_toast("c", ToastStatus::Pending, None);

        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
        assert_eq!(store.observer_count(), 0);
    }

    #[test]
    fn observer_may_unsubscribe_itself_without_skipping_others() {
        let store = ToastStore::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let slot_for_observer = Arc::clone(&slot);
        let first = store.subscribe(move |_: &[Toast]| {
            if let Some(sub) = slot_for_observer.lock().unwrap().take() {
                sub.unsubscribe();
            }
        });
        *slot.lock().unwrap() = Some(first);

        let (count, _second) = counter(&store);
        store.add_toast("a", ToastStatus::Pending, None);
        store.add_toast("b", ToastStatus::Pending, None);

        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(store.observer_count(), 1);
    }

    #[test]
    fn observer_can_read_store_during_notification() {
        let store = ToastStore::new();
        let reader = store.clone();
        let lengths = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lengths);
        store
            .subscribe(move |_: &[Toast]| {
                sink.lock().unwrap().push(reader.len());
            })
            .detach();

        store.add_toast("a", ToastStatus::Pending, None);
        assert_eq!(*lengths.lock().unwrap(), vec![1]);
        assert_eq!(store.observer_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn auto_remove_removes_terminal_toast_after_ttl() {
        let store = ToastStore::new();
        let id = store.add_toast("x", ToastStatus::Pending, None);
        store.update_toast(&id, ToastUpdate::status(ToastStatus::Failed, "Upload failed"));

        let handle = store.auto_remove_toast(&id);
        tokio::time::sleep(Duration::from_millis(4999)).await;
        assert!(store.get(&id).is_some());

        handle.await.unwrap();
        assert!(store.get(&id).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn auto_remove_keeps_non_terminal_toast() {
        let store = ToastStore::new();
        let id = store.add_toast("x", ToastStatus::Processing, None);

        store.auto_remove_toast(&id).await.unwrap();
        assert_eq!(store.get(&id).unwrap().status, ToastStatus::Processing);
    }

    #[tokio::test(start_paused = true)]
    async fn auto_remove_checks_status_at_expiry_not_at_scheduling() {
        let store = ToastStore::new();
        let id = store.add_toast("x", ToastStatus::Processing, None);
        let handle = store.auto_remove_toast_after(&id, Duration::from_millis(100));

        store.update_toast(&id, ToastUpdate::status(ToastStatus::Completed, "done"));
        handle.await.unwrap();
        assert!(store.get(&id).is_none());
    }
}
