//! Headless collaborators for testing and benchmarking.
//!
//! Registries normally sit on a platform detector and a rendering-frame
//! scheduler. These stand-ins record what the registry asks of them and let
//! tests feed batches and pump frames by hand, without a platform.
//!
//! ```
//! use size_watcher::ResizeEntry;
//! use size_watcher::headless::headless_registry;
//!
//! let (registry, detector, scheduler) = headless_registry();
//! let element = size_watcher::ElementId::new();
//! registry.register(element, |size| println!("{size:?}"));
//! assert!(detector.is_observing(element));
//!
//! registry.notify_resized(&[ResizeEntry::new(element, (300.0, 200.0))]);
//! scheduler.run_frame();
//! ```

use std::{cell::RefCell, rc::Rc};

use crate::{
    element::ElementId,
    observer::{FrameScheduler, FrameToken, ResizeDetector},
    registry::SizeWatcherRegistry,
};

/// A detector that records observe/unobserve calls instead of talking to a
/// platform. Clones share state, so tests keep one handle while the registry
/// owns another.
#[derive(Clone, Default)]
pub struct HeadlessDetector {
    state: Rc<RefCell<DetectorState>>,
}

#[derive(Default)]
struct DetectorState {
    observed: Vec<ElementId>,
    disconnected: bool,
}

impl HeadlessDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Elements currently under observation, in observe order.
    pub fn observed(&self) -> Vec<ElementId> {
        self.state.borrow().observed.clone()
    }

    pub fn is_observing(&self, element: ElementId) -> bool {
        self.state.borrow().observed.contains(&element)
    }

    pub fn is_disconnected(&self) -> bool {
        self.state.borrow().disconnected
    }
}

impl ResizeDetector for HeadlessDetector {
    fn observe(&mut self, element: ElementId) {
        let mut state = self.state.borrow_mut();
        if !state.observed.contains(&element) {
            state.observed.push(element);
        }
    }

    fn unobserve(&mut self, element: ElementId) {
        self.state.borrow_mut().observed.retain(|el| *el != element);
    }

    fn disconnect(&mut self) {
        let mut state = self.state.borrow_mut();
        state.observed.clear();
        state.disconnected = true;
    }
}

/// A frame scheduler pumped by hand: nothing runs until the test calls
/// [`run_frame`](Self::run_frame).
#[derive(Clone, Default)]
pub struct ManualFrameScheduler {
    state: Rc<RefCell<SchedulerState>>,
}

#[derive(Default)]
struct SchedulerState {
    next_token: u64,
    pending: Vec<(FrameToken, Box<dyn FnOnce()>)>,
}

impl ManualFrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_count(&self) -> usize {
        self.state.borrow().pending.len()
    }

    /// Run everything scheduled so far, as one rendering frame. Callbacks
    /// scheduled while the frame runs wait for the next one.
    pub fn run_frame(&self) {
        let pending = std::mem::take(&mut self.state.borrow_mut().pending);
        for (_, frame) in pending {
            frame();
        }
    }
}

impl FrameScheduler for ManualFrameScheduler {
    fn schedule(&mut self, frame: Box<dyn FnOnce()>) -> FrameToken {
        let mut state = self.state.borrow_mut();
        let token = FrameToken(state.next_token);
        state.next_token += 1;
        state.pending.push((token, frame));
        token
    }

    fn cancel(&mut self, token: FrameToken) {
        self.state
            .borrow_mut()
            .pending
            .retain(|(pending, _)| *pending != token);
    }
}

/// A registry wired to a [`HeadlessDetector`] and a
/// [`ManualFrameScheduler`], with handles to both for inspection.
pub fn headless_registry() -> (SizeWatcherRegistry, HeadlessDetector, ManualFrameScheduler) {
    let detector = HeadlessDetector::new();
    let scheduler = ManualFrameScheduler::new();
    let registry = SizeWatcherRegistry::new(
        {
            let detector = detector.clone();
            move || Box::new(detector) as Box<dyn ResizeDetector>
        },
        scheduler.clone(),
    );
    (registry, detector, scheduler)
}
