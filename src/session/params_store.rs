use crate::core::{RealmFilter, SortField, UsernameFilter, ViewParameters, MIN_USERNAME_FILTER_LEN};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer = Arc<dyn Fn(&ViewParameters) + Send + Sync>;

/// Session-scoped view parameters with synchronous change observers.
///
/// Setters normalize their input. When the stored value actually changes,
/// every observer runs before the setter returns, with no internal lock held,
/// so observers may read the store or call its setters.
pub struct ViewParameterStore {
    state: RwLock<ViewParameters>,
    observers: Mutex<Vec<(ObserverId, Observer)>>,
    next_observer: AtomicU64,
    min_username_len: usize,
}

impl Default for ViewParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewParameterStore {
    pub fn new() -> Self {
        Self::with_min_username_len(MIN_USERNAME_FILTER_LEN)
    }

    pub fn with_min_username_len(min_username_len: usize) -> Self {
        Self {
            state: RwLock::new(ViewParameters::default()),
            observers: Mutex::new(Vec::new()),
            next_observer: AtomicU64::new(0),
            min_username_len,
        }
    }

    pub fn get(&self) -> ViewParameters {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn page(&self) -> u64 {
        self.get().page
    }

    pub fn sort_field(&self) -> SortField {
        self.get().sort_field
    }

    pub fn realm_filter(&self) -> RealmFilter {
        self.get().realm_filter
    }

    pub fn username_filter(&self) -> UsernameFilter {
        self.get().username_filter
    }

    pub fn set_page(&self, page: u64) -> bool {
        self.update(|params| params.page = page)
    }

    /// Unknown field names fall back to the default sort.
    pub fn set_sort(&self, name: &str) -> bool {
        self.set_sort_field(SortField::from_name_or_default(name))
    }

    pub fn set_sort_field(&self, field: SortField) -> bool {
        self.update(|params| params.sort_field = field)
    }

    /// `"all"` and unknown codes clear the realm filter.
    pub fn set_realm(&self, code: &str) -> bool {
        self.set_realm_filter(RealmFilter::from_code(code))
    }

    pub fn set_realm_filter(&self, filter: RealmFilter) -> bool {
        self.update(|params| params.realm_filter = filter)
    }

    /// Text shorter than the activation threshold clears the filter.
    pub fn set_username(&self, text: Option<&str>) -> bool {
        let filter = UsernameFilter::new(text, self.min_username_len);
        self.update(|params| params.username_filter = filter)
    }

    pub fn next_page(&self) -> bool {
        self.update(|params| params.page = params.page.saturating_add(1))
    }

    /// No-op at page 0.
    pub fn prev_page(&self) -> bool {
        self.update(|params| params.page = params.page.saturating_sub(1))
    }

    pub fn subscribe(&self, observer: impl Fn(&ViewParameters) + Send + Sync + 'static) -> ObserverId {
        let id = ObserverId(self.next_observer.fetch_add(1, Ordering::Relaxed));
        let observer: Observer = Arc::new(observer);
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, observer));
        id
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn update(&self, mutate: impl FnOnce(&mut ViewParameters)) -> bool {
        let changed = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let mut next = state.clone();
            mutate(&mut next);
            if next == *state {
                None
            } else {
                *state = next.clone();
                Some(next)
            }
        };

        let Some(params) = changed else {
            return false;
        };

        let observers: Vec<Observer> = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer(&params);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Realm;
    use std::sync::atomic::AtomicUsize;

    fn counting(store: &ViewParameterStore) -> Arc<AtomicUsize> {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        store.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        calls
    }

    #[test]
    fn test_defaults() {
        let store = ViewParameterStore::new();
        assert_eq!(store.get(), ViewParameters::default());
    }

    #[test]
    fn test_prev_page_clamps_at_zero() {
        let store = ViewParameterStore::new();
        let calls = counting(&store);
        assert!(!store.prev_page());
        assert_eq!(store.page(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_next_then_prev_restores_page() {
        let store = ViewParameterStore::new();
        store.set_page(4);
        store.next_page();
        assert_eq!(store.page(), 5);
        store.prev_page();
        assert_eq!(store.page(), 4);
    }

    #[test]
    fn test_observers_fire_synchronously_on_change_only() {
        let store = ViewParameterStore::new();
        let calls = counting(&store);

        assert!(store.set_sort("battles"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Same value again: nothing to signal.
        assert!(!store.set_sort("battles"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(store.set_realm("ru"));
        assert!(store.set_username(Some("abc")));
        assert!(store.next_page());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_setters_normalize() {
        let store = ViewParameterStore::new();
        store.set_sort("battles");
        store.set_sort("password");
        assert_eq!(store.sort_field(), SortField::Vpb);

        store.set_realm("eu");
        assert_eq!(store.realm_filter(), RealmFilter::Only(Realm::Eu));
        store.set_realm("narnia");
        assert_eq!(store.realm_filter(), RealmFilter::All);

        store.set_username(Some("ab"));
        assert!(!store.username_filter().is_active());
        store.set_username(Some("abc"));
        assert_eq!(store.username_filter().prefix(), Some("abc"));
        store.set_username(None);
        assert!(!store.username_filter().is_active());
    }

    #[test]
    fn test_observer_sees_new_value() {
        let store = Arc::new(ViewParameterStore::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store.subscribe(move |params| sink.lock().unwrap().push(params.page));

        store.set_page(3);
        store.set_page(7);
        assert_eq!(*seen.lock().unwrap(), vec![3, 7]);
    }

    #[test]
    fn test_observer_may_call_back_into_store() {
        let store = Arc::new(ViewParameterStore::new());
        let handle = Arc::clone(&store);
        // Changing the sort resets paging, driven from an observer.
        store.subscribe(move |params| {
            if params.sort_field != SortField::Vpb {
                handle.set_page(0);
            }
        });
        store.set_page(5);
        store.set_sort("experience");
        assert_eq!(store.page(), 0);
    }

    #[test]
    fn test_unsubscribe() {
        let store = ViewParameterStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let id = store.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.next_page();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.observer_count(), 0);
    }
}
