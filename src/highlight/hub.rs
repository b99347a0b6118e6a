//! Shared highlight state with an observer registry
//!
//! One hub exists per loaded dataset. Views keep a cloned [`HighlightHub`]
//! handle and register themselves as observers; the hub only keeps weak
//! references to them, so a closed view can never be called back.

use super::observer::{HighlightObserver, ObserverId};
use super::state::{EventType, HighlightState};
use crate::error::{LinkError, Result};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

type WeakObserver = Weak<RefCell<dyn HighlightObserver>>;
type SharedObserver = Rc<RefCell<dyn HighlightObserver>>;
type TeardownHook = Box<dyn FnOnce()>;

struct HubInner {
    state: HighlightState,
    observers: BTreeMap<ObserverId, WeakObserver>,
    last_event: EventType,
    next_id: u64,
    close_when_empty: bool,
    teardown_hooks: Vec<TeardownHook>,
}

/// Cloneable handle to the highlight state of one dataset.
///
/// Once torn down every operation returns [`LinkError::HubClosed`]. Mutating
/// calls made from inside an observer callback return
/// [`LinkError::ReentrantNotify`].
#[derive(Clone)]
pub struct HighlightHub {
    inner: Rc<RefCell<Option<HubInner>>>,
}

impl HighlightHub {
    pub fn new(size: usize) -> Self {
        log::debug!("creating highlight state for {} observations", size);
        Self {
            inner: Rc::new(RefCell::new(Some(HubInner {
                state: HighlightState::new(size),
                observers: BTreeMap::new(),
                last_event: EventType::Empty,
                next_id: 1,
                close_when_empty: false,
                teardown_hooks: Vec::new(),
            }))),
        }
    }

    /// False once the hub has been torn down
    pub fn is_open(&self) -> bool {
        self.inner
            .try_borrow()
            .map(|guard| guard.is_some())
            .unwrap_or(true)
    }

    fn with_inner<R>(&self, f: impl FnOnce(&HubInner) -> R) -> Result<R> {
        let guard = self
            .inner
            .try_borrow()
            .map_err(|_| LinkError::ReentrantNotify)?;
        let inner = guard.as_ref().ok_or(LinkError::HubClosed)?;
        Ok(f(inner))
    }

    fn with_inner_mut<R>(&self, f: impl FnOnce(&mut HubInner) -> R) -> Result<R> {
        let mut guard = self
            .inner
            .try_borrow_mut()
            .map_err(|_| LinkError::ReentrantNotify)?;
        let inner = guard.as_mut().ok_or(LinkError::HubClosed)?;
        Ok(f(inner))
    }

    /// Run `f` against the current state
    pub fn read<R>(&self, f: impl FnOnce(&HighlightState) -> R) -> Result<R> {
        self.with_inner(|inner| f(&inner.state))
    }

    /// Run `f` with mutable access, for direct membership edits before a
    /// [`request_delta`](Self::request_delta)
    pub fn edit<R>(&self, f: impl FnOnce(&mut HighlightState) -> R) -> Result<R> {
        self.with_inner_mut(|inner| f(&mut inner.state))
    }

    /// Resize to a new dataset cardinality. Observers are not notified.
    pub fn set_size(&self, size: usize) -> Result<()> {
        log::debug!("resizing highlight state to {} observations", size);
        self.edit(|state| state.set_size(size))
    }

    pub fn size(&self) -> Result<usize> {
        self.read(HighlightState::size)
    }

    pub fn total_highlighted(&self) -> Result<usize> {
        self.read(HighlightState::total_highlighted)
    }

    pub fn highlighted_indices(&self) -> Result<Vec<usize>> {
        self.read(HighlightState::highlighted_indices)
    }

    pub fn request_delta(&self) -> Result<()> {
        self.edit(HighlightState::request_delta)
    }

    pub fn request_unhighlight_all(&self) -> Result<()> {
        self.edit(HighlightState::request_unhighlight_all)
    }

    pub fn request_invert(&self) -> Result<()> {
        self.edit(HighlightState::request_invert)
    }

    /// Apply the pending operation and call every live observer except
    /// `exclude`. Returns the number of observers called; nobody is called
    /// when nothing was pending.
    pub fn notify(&self, exclude: Option<ObserverId>) -> Result<usize> {
        profiling::scope!("HighlightHub::notify");

        let (event, targets, emptied) = {
            let mut guard = self
                .inner
                .try_borrow_mut()
                .map_err(|_| LinkError::ReentrantNotify)?;
            let inner = guard.as_mut().ok_or(LinkError::HubClosed)?;

            let event = inner.state.apply_changes();
            inner.last_event = event;
            if event == EventType::Empty {
                log::trace!("notify with no pending event");
                return Ok(0);
            }

            let before = inner.observers.len();
            inner.observers.retain(|id, observer| {
                let alive = observer.strong_count() > 0;
                if !alive {
                    log::debug!("pruning dropped observer {}", id);
                }
                alive
            });
            let emptied = before > 0 && inner.observers.is_empty() && inner.close_when_empty;

            let targets: Vec<(ObserverId, SharedObserver)> = inner
                .observers
                .iter()
                .filter(|(id, _)| Some(**id) != exclude)
                .filter_map(|(id, observer)| observer.upgrade().map(|o| (*id, o)))
                .collect();
            (event, targets, emptied)
        };

        log::debug!(
            "broadcasting {} event to {} observer(s)",
            event,
            targets.len()
        );

        let mut notified = 0;
        {
            let guard = self
                .inner
                .try_borrow()
                .map_err(|_| LinkError::ReentrantNotify)?;
            let inner = guard.as_ref().ok_or(LinkError::HubClosed)?;
            for (id, observer) in &targets {
                match observer.try_borrow_mut() {
                    Ok(mut observer) => {
                        observer.update(&inner.state);
                        notified += 1;
                    }
                    Err(_) => log::warn!("observer {} busy during {} event, skipped", id, event),
                }
            }
        }

        if emptied {
            self.teardown();
        }
        Ok(notified)
    }

    /// Event applied by the most recent notify (`Empty` if nothing was pending)
    pub fn last_event(&self) -> Result<EventType> {
        self.with_inner(|inner| inner.last_event)
    }

    /// Register an observer. The hub keeps only a weak reference.
    pub fn register_observer<O>(&self, observer: &Rc<RefCell<O>>) -> Result<ObserverId>
    where
        O: HighlightObserver + 'static,
    {
        let shared: SharedObserver = observer.clone();
        let weak = Rc::downgrade(&shared);
        self.with_inner_mut(|inner| {
            let id = ObserverId(inner.next_id);
            inner.next_id += 1;
            inner.observers.insert(id, weak);
            log::debug!(
                "registered observer {} ({} total)",
                id,
                inner.observers.len()
            );
            id
        })
    }

    /// Unregister an observer; tears the hub down if it was the last one and
    /// [`close_when_empty`](Self::close_when_empty) was called.
    pub fn remove_observer(&self, id: ObserverId) -> Result<()> {
        let emptied = self.with_inner_mut(|inner| {
            if inner.observers.remove(&id).is_none() {
                return Err(LinkError::UnknownObserver { id: id.get() });
            }
            log::debug!(
                "removed observer {} ({} left)",
                id,
                inner.observers.len()
            );
            Ok(inner.observers.is_empty() && inner.close_when_empty)
        })??;

        if emptied {
            log::debug!("no observers left, closing highlight state");
            self.teardown();
        }
        Ok(())
    }

    /// Tear down as soon as no observer is registered (immediately if none is)
    pub fn close_when_empty(&self) -> Result<()> {
        let empty = self.with_inner_mut(|inner| {
            inner.close_when_empty = true;
            inner.observers.is_empty()
        })?;
        if empty {
            log::debug!("closing highlight state now, no registered observers");
            self.teardown();
        }
        Ok(())
    }

    /// Run `hook` once when the hub is torn down
    pub fn on_teardown(&self, hook: impl FnOnce() + 'static) -> Result<()> {
        self.with_inner_mut(|inner| inner.teardown_hooks.push(Box::new(hook)))
    }

    /// Number of registered observers (dropped ones count until pruned)
    pub fn observer_count(&self) -> usize {
        self.with_inner(|inner| inner.observers.len()).unwrap_or(0)
    }

    fn teardown(&self) {
        let taken = match self.inner.try_borrow_mut() {
            Ok(mut guard) => guard.take(),
            Err(_) => {
                log::error!("highlight state busy, teardown skipped");
                return;
            }
        };
        if let Some(inner) = taken {
            log::info!(
                "highlight state for {} observations closed",
                inner.state.size()
            );
            for hook in inner.teardown_hooks {
                hook();
            }
        }
    }
}

impl fmt::Debug for HighlightHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("HighlightHub");
        match self.inner.try_borrow() {
            Ok(guard) => match guard.as_ref() {
                Some(inner) => s
                    .field("size", &inner.state.size())
                    .field("total_highlighted", &inner.state.total_highlighted())
                    .field("observers", &inner.observers.len()),
                None => s.field("closed", &true),
            },
            Err(_) => s.field("busy", &true),
        };
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Default)]
    struct Recorder {
        calls: usize,
        last_total: Option<usize>,
    }

    impl HighlightObserver for Recorder {
        fn update(&mut self, state: &HighlightState) {
            self.calls += 1;
            self.last_total = Some(state.total_highlighted());
        }
    }

    fn recorder() -> Rc<RefCell<Recorder>> {
        Rc::new(RefCell::new(Recorder::default()))
    }

    #[test]
    fn test_notify_without_request_calls_nobody() {
        let hub = HighlightHub::new(4);
        let a = recorder();
        hub.register_observer(&a).unwrap();

        assert_eq!(hub.notify(None).unwrap(), 0);
        assert_eq!(a.borrow().calls, 0);
        assert_eq!(hub.last_event().unwrap(), EventType::Empty);
    }

    #[test]
    fn test_notify_excluding_originator() {
        let hub = HighlightHub::new(5);
        let a = recorder();
        let b = recorder();
        let id_a = hub.register_observer(&a).unwrap();
        hub.register_observer(&b).unwrap();

        hub.request_invert().unwrap();
        assert_eq!(hub.notify(Some(id_a)).unwrap(), 1);
        assert_eq!(hub.last_event().unwrap(), EventType::Invert);

        assert_eq!(a.borrow().calls, 0);
        assert_eq!(b.borrow().calls, 1);
        assert_eq!(b.borrow().last_total, Some(5));
    }

    #[test]
    fn test_delta_after_direct_edit() {
        let hub = HighlightHub::new(5);
        let a = recorder();
        hub.register_observer(&a).unwrap();

        hub.edit(|state| {
            state.highlight_mut()[1] = true;
            state.highlight_mut()[3] = true;
            state.request_delta();
        })
        .unwrap();
        assert_eq!(hub.notify(None).unwrap(), 1);

        assert_eq!(hub.total_highlighted().unwrap(), 2);
        assert_eq!(a.borrow().last_total, Some(2));
        assert_eq!(hub.highlighted_indices().unwrap(), vec![1, 3]);
    }

    #[test]
    fn test_dropped_observer_is_pruned() {
        let hub = HighlightHub::new(3);
        let a = recorder();
        let b = recorder();
        hub.register_observer(&a).unwrap();
        hub.register_observer(&b).unwrap();
        drop(b);
        assert_eq!(hub.observer_count(), 2);

        hub.request_unhighlight_all().unwrap();
        assert_eq!(hub.notify(None).unwrap(), 1);
        assert_eq!(hub.observer_count(), 1);
        assert_eq!(a.borrow().calls, 1);
    }

    #[test]
    fn test_teardown_after_last_observer_removed() {
        let hub = HighlightHub::new(3);
        let torn_down = Rc::new(Cell::new(false));
        let flag = torn_down.clone();
        hub.on_teardown(move || flag.set(true)).unwrap();

        let a = recorder();
        let b = recorder();
        let id_a = hub.register_observer(&a).unwrap();
        let id_b = hub.register_observer(&b).unwrap();

        hub.close_when_empty().unwrap();
        assert!(hub.is_open());

        hub.remove_observer(id_a).unwrap();
        assert!(!torn_down.get());
        hub.remove_observer(id_b).unwrap();

        assert!(torn_down.get());
        assert!(!hub.is_open());
        assert!(matches!(hub.request_invert(), Err(LinkError::HubClosed)));
        assert!(matches!(hub.notify(None), Err(LinkError::HubClosed)));
    }

    #[test]
    fn test_close_when_empty_without_observers_is_immediate() {
        let hub = HighlightHub::new(2);
        let torn_down = Rc::new(Cell::new(false));
        let flag = torn_down.clone();
        hub.on_teardown(move || flag.set(true)).unwrap();

        hub.close_when_empty().unwrap();
        assert!(torn_down.get());
        assert!(!hub.is_open());
    }

    #[test]
    fn test_remove_without_close_keeps_hub() {
        let hub = HighlightHub::new(2);
        let a = recorder();
        let id = hub.register_observer(&a).unwrap();
        hub.remove_observer(id).unwrap();

        assert!(hub.is_open());
        assert!(matches!(
            hub.remove_observer(id),
            Err(LinkError::UnknownObserver { .. })
        ));
    }

    struct Meddler {
        hub: HighlightHub,
        read_total: Option<usize>,
        write_error: Option<LinkError>,
    }

    impl HighlightObserver for Meddler {
        fn update(&mut self, _state: &HighlightState) {
            self.read_total = self.hub.total_highlighted().ok();
            self.write_error = self.hub.request_invert().err();
        }
    }

    #[test]
    fn test_reentrant_mutation_is_rejected() {
        let hub = HighlightHub::new(4);
        let meddler = Rc::new(RefCell::new(Meddler {
            hub: hub.clone(),
            read_total: None,
            write_error: None,
        }));
        hub.register_observer(&meddler).unwrap();

        hub.request_invert().unwrap();
        hub.notify(None).unwrap();

        let meddler = meddler.borrow();
        assert_eq!(meddler.read_total, Some(4));
        assert!(matches!(meddler.write_error, Some(LinkError::ReentrantNotify)));
        assert_eq!(hub.read(|s| s.event_type()).unwrap(), EventType::Empty);
    }

    #[test]
    fn test_busy_observer_is_skipped() {
        let hub = HighlightHub::new(2);
        let a = recorder();
        hub.register_observer(&a).unwrap();

        let _held = a.borrow_mut();
        hub.request_invert().unwrap();
        assert_eq!(hub.notify(None).unwrap(), 0);
    }
}
