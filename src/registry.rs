//! The shared observation registry: one size-change detector multiplexed
//! across every watched container.
//!
//! Detectors are comparatively expensive and batch naturally when shared, so
//! a registry owns exactly one, created lazily on first registration, and
//! fans its batches out to per-element callbacks. In the default async mode
//! deliveries are coalesced to one flush per rendering frame.

use std::{cell::RefCell, rc::Rc};

use indexmap::IndexMap;
use peniko::kurbo::Size;
use rustc_hash::FxBuildHasher;
use slotmap::SecondaryMap;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::{
    element::ElementId,
    observer::{FrameScheduler, FrameToken, ResizeDetector, ResizeEntry},
};

/// Per-element delivery callback.
pub type SizeCallback = dyn Fn(Size);

type DetectorFactory = Box<dyn FnOnce() -> Box<dyn ResizeDetector>>;

/// A cheap-to-clone handle to a shared observation registry.
///
/// All clones refer to the same underlying state; watchers keep a clone so
/// they can unregister themselves on detach. Dropping the last handle tears
/// the registry down.
///
/// The registry is strictly single-threaded: registration and delivery all
/// happen on the UI thread, and callbacks may re-enter the registry (a
/// consumer detaching itself or a sibling in response to a size change is
/// fine).
#[derive(Clone)]
pub struct SizeWatcherRegistry {
    state: Rc<RefCell<RegistryState>>,
}

struct RegistryState {
    detector: Option<Box<dyn ResizeDetector>>,
    detector_factory: Option<DetectorFactory>,
    scheduler: Box<dyn FrameScheduler>,
    callbacks: SecondaryMap<ElementId, Rc<SizeCallback>>,
    /// Most recent size per element awaiting an async flush. Later batches
    /// overwrite earlier entries; there is no per-element queueing.
    pending: IndexMap<ElementId, Size, FxBuildHasher>,
    pending_flush: Option<FrameToken>,
    sync: bool,
    torn_down: bool,
}

impl RegistryState {
    fn ensure_detector(&mut self) {
        if self.detector.is_none()
            && let Some(factory) = self.detector_factory.take()
        {
            debug!("creating shared resize detector");
            self.detector = Some(factory());
        }
    }
}

impl SizeWatcherRegistry {
    /// Create a registry in the default async (frame-coalesced) dispatch
    /// mode.
    ///
    /// `detector` is invoked once, on first registration, to build the
    /// shared size-change primitive. `scheduler` must run a scheduled
    /// callback on the next rendering frame and must not run it from inside
    /// [`FrameScheduler::schedule`] itself.
    pub fn new(
        detector: impl FnOnce() -> Box<dyn ResizeDetector> + 'static,
        scheduler: impl FrameScheduler + 'static,
    ) -> Self {
        SizeWatcherRegistry {
            state: Rc::new(RefCell::new(RegistryState {
                detector: None,
                detector_factory: Some(Box::new(detector)),
                scheduler: Box::new(scheduler),
                callbacks: SecondaryMap::new(),
                pending: IndexMap::default(),
                pending_flush: None,
                sync: false,
                torn_down: false,
            })),
        }
    }

    /// Switch to synchronous dispatch: callbacks run inside
    /// [`notify_resized`](Self::notify_resized) instead of being deferred to
    /// the next frame.
    ///
    /// Synchronous dispatch lets a callback trigger further layout changes
    /// in the same frame, which some platforms flag as a notification loop;
    /// the async default exists to avoid that.
    pub fn sync(self) -> Self {
        self.state.borrow_mut().sync = true;
        self
    }

    /// Associate `element` with `on_size` and begin observing it.
    ///
    /// Re-registering an element replaces its callback without duplicate
    /// delivery.
    pub fn register(&self, element: ElementId, on_size: impl Fn(Size) + 'static) {
        let mut state = self.state.borrow_mut();
        if state.torn_down {
            trace!(element = ?element, "register ignored after teardown");
            return;
        }
        state.ensure_detector();
        let replacing = state.callbacks.insert(element, Rc::new(on_size)).is_some();
        if !replacing && let Some(detector) = state.detector.as_mut() {
            detector.observe(element);
        }
        trace!(element = ?element, replacing, "registered element");
    }

    /// Remove `element`'s association and stop observing it. No-op when the
    /// element isn't registered.
    pub fn unregister(&self, element: ElementId) {
        let mut state = self.state.borrow_mut();
        if state.callbacks.remove(element).is_some() {
            if let Some(detector) = state.detector.as_mut() {
                detector.unobserve(element);
            }
            trace!(element = ?element, "unregistered element");
        }
    }

    pub fn is_registered(&self, element: ElementId) -> bool {
        self.state.borrow().callbacks.contains_key(element)
    }

    pub fn registered_count(&self) -> usize {
        self.state.borrow().callbacks.len()
    }

    /// The platform batch entry point: the detector reports every observed
    /// element whose size changed this frame.
    ///
    /// Entries for elements no longer registered are dropped silently; a
    /// notification racing a detach is expected, not an error.
    pub fn notify_resized(&self, entries: &[ResizeEntry]) {
        let sync = {
            let state = self.state.borrow();
            if state.torn_down {
                return;
            }
            state.sync
        };
        if sync {
            self.dispatch(entries.iter().map(|entry| (entry.element, entry.size)));
        } else {
            self.enqueue(entries);
        }
    }

    // Deliver one entry at a time, looking the callback up at delivery time
    // so re-entrant register/unregister calls from inside a callback are
    // observed by the rest of the batch.
    fn dispatch(&self, entries: impl Iterator<Item = (ElementId, Size)>) {
        for (element, size) in entries {
            let callback = self.state.borrow().callbacks.get(element).cloned();
            match callback {
                Some(callback) => callback(size),
                None => trace!(element = ?element, "dropping stale resize entry"),
            }
        }
    }

    // Merge the batch into the pending map and (re)schedule a single flush
    // on the next frame. A burst of batches collapses to one delivery per
    // element with the most recent size.
    fn enqueue(&self, entries: &[ResizeEntry]) {
        let mut state = self.state.borrow_mut();
        for entry in entries {
            state.pending.insert(entry.element, entry.size);
        }
        if let Some(token) = state.pending_flush.take() {
            state.scheduler.cancel(token);
        }
        let weak = Rc::downgrade(&self.state);
        let token = state.scheduler.schedule(Box::new(move || {
            if let Some(state) = weak.upgrade() {
                SizeWatcherRegistry { state }.flush_pending();
            }
        }));
        state.pending_flush = Some(token);
    }

    fn flush_pending(&self) {
        let pending: SmallVec<[(ElementId, Size); 4]> = {
            let mut state = self.state.borrow_mut();
            state.pending_flush = None;
            state.pending.drain(..).collect()
        };
        self.dispatch(pending.into_iter());
    }

    /// Cancel any pending flush, disconnect the detector, and drop every
    /// registration. The registry delivers nothing after this.
    pub fn teardown(&self) {
        let detector = {
            let mut state = self.state.borrow_mut();
            if state.torn_down {
                return;
            }
            state.torn_down = true;
            if let Some(token) = state.pending_flush.take() {
                state.scheduler.cancel(token);
            }
            state.pending.clear();
            state.callbacks.clear();
            state.detector_factory = None;
            state.detector.take()
        };
        if let Some(mut detector) = detector {
            detector.disconnect();
        }
        debug!("size watcher registry torn down");
    }
}

impl Drop for SizeWatcherRegistry {
    fn drop(&mut self) {
        // last handle out tears the registry down; scheduled flushes only
        // hold weak references and cannot keep it alive
        if Rc::strong_count(&self.state) == 1 {
            self.teardown();
        }
    }
}
