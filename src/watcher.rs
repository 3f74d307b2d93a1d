//! The per-container watcher: owns a breakpoint set, tracks the container's
//! measured size, and tells the consumer when the selected rule changes.

use std::{cell::RefCell, rc::Rc};

use peniko::kurbo::Size;
use tracing::trace;

use crate::{
    breakpoint::{Breakpoint, BreakpointSet, RuleIndex, Sensitivity},
    element::ElementId,
    registry::SizeWatcherRegistry,
};

/// Invoked on every size change with the new size, the previously selected
/// rule (`None` before the first selection), and the rule selected now.
pub type SizeChangeCallback<T> = dyn Fn(Size, Option<&Breakpoint<T>>, &Breakpoint<T>);

/// Invoked when the selected rule changes, with the rule and the size it was
/// selected for (`None` when selection ran before any measurement).
pub type BreakpointCallback<T> = dyn Fn(&Breakpoint<T>, Option<Size>);

/// What the watcher currently considers selected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Selected {
    /// No selection yet; the consumer renders nothing rule-dependent until
    /// the first measurement lands.
    Unset,
    Fallback,
    Rule(usize),
}

impl Selected {
    fn from_index(index: RuleIndex) -> Self {
        match index {
            RuleIndex::Fallback => Selected::Fallback,
            RuleIndex::Rule(i) => Selected::Rule(i),
        }
    }
}

struct WatcherState<T> {
    set: Rc<BreakpointSet<T>>,
    size: Option<Size>,
    selected: Selected,
    eager_select: bool,
    on_size_change: Option<Rc<SizeChangeCallback<T>>>,
    on_breakpoint_change: Option<Rc<BreakpointCallback<T>>>,
}

fn resolve<T>(set: &BreakpointSet<T>, selected: Selected) -> Option<&Breakpoint<T>> {
    match selected {
        Selected::Unset => None,
        Selected::Fallback => Some(set.fallback()),
        Selected::Rule(i) => Some(&set.rules()[i]),
    }
}

/// Watches one container and re-selects its breakpoint as the container's
/// own rendered size changes.
///
/// A watcher starts unmeasured. Once attached, the first reported
/// measurement moves it to measured and it never goes back; every further
/// notification re-selects only when an axis the rule set is sensitive to
/// actually changed.
///
/// ```
/// use size_watcher::{
///     Breakpoint, BreakpointSet, ElementId, MatchBy, ResizeEntry, SizeWatcher,
/// };
/// use size_watcher::headless::headless_registry;
///
/// let (registry, _detector, scheduler) = headless_registry();
/// let set = BreakpointSet::new(
///     vec![
///         Breakpoint::new().max_width(400.0).with_data("narrow"),
///         Breakpoint::new().min_width(400.0).with_data("wide"),
///     ],
///     MatchBy::Order,
/// )
/// .unwrap();
///
/// let element = ElementId::new();
/// let mut watcher = SizeWatcher::new(&registry, set)
///     .on_breakpoint_change(|rule, _size| {
///         println!("now {:?}", rule.data());
///     });
/// watcher.attach(element);
///
/// registry.notify_resized(&[ResizeEntry::new(element, (640.0, 480.0))]);
/// scheduler.run_frame();
/// watcher.with_current(|rule| assert_eq!(rule.unwrap().data(), Some(&"wide")));
/// ```
pub struct SizeWatcher<T> {
    state: Rc<RefCell<WatcherState<T>>>,
    registry: SizeWatcherRegistry,
    element: Option<ElementId>,
}

impl<T: 'static> SizeWatcher<T> {
    pub fn new(registry: &SizeWatcherRegistry, set: BreakpointSet<T>) -> Self {
        SizeWatcher {
            state: Rc::new(RefCell::new(WatcherState {
                set: Rc::new(set),
                size: None,
                selected: Selected::Unset,
                eager_select: false,
                on_size_change: None,
                on_breakpoint_change: None,
            })),
            registry: registry.clone(),
            element: None,
        }
    }

    /// Select a rule immediately against the unmeasured assumption instead
    /// of waiting for the first measurement.
    ///
    /// Off by default: a container is usually rendered empty once just to
    /// obtain a real measurement, not to display a guessed rule.
    pub fn eager_select(self, eager: bool) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.eager_select = eager;
            if eager && state.selected == Selected::Unset {
                state.selected = Selected::from_index(state.set.select_index(state.size));
            }
        }
        self
    }

    /// Report every size change, including ones on axes the rule set is not
    /// sensitive to.
    pub fn on_size_change(
        self,
        callback: impl Fn(Size, Option<&Breakpoint<T>>, &Breakpoint<T>) + 'static,
    ) -> Self {
        self.state.borrow_mut().on_size_change = Some(Rc::new(callback));
        self
    }

    /// Report selection changes to the render layer.
    pub fn on_breakpoint_change(
        self,
        callback: impl Fn(&Breakpoint<T>, Option<Size>) + 'static,
    ) -> Self {
        self.state.borrow_mut().on_breakpoint_change = Some(Rc::new(callback));
        self
    }

    /// Register with the registry under `element` and start receiving its
    /// size changes. Re-attaching moves the registration to the new element.
    pub fn attach(&mut self, element: ElementId) {
        self.detach();
        let state = self.state.clone();
        self.registry
            .register(element, move |size| Self::handle_size(&state, size));
        self.element = Some(element);
        trace!(element = ?element, "watcher attached");
    }

    /// Unregister from the registry. No notification fires afterward.
    pub fn detach(&mut self) {
        if let Some(element) = self.element.take() {
            self.registry.unregister(element);
            trace!(element = ?element, "watcher detached");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.element.is_some()
    }

    pub fn element(&self) -> Option<ElementId> {
        self.element
    }

    /// The last size reported for the container, if it has been measured.
    pub fn size(&self) -> Option<Size> {
        self.state.borrow().size
    }

    /// Run `f` with the currently selected rule (`None` while unset).
    ///
    /// The watcher state is borrowed for the duration of the call; `f` must
    /// not call back into this watcher.
    pub fn with_current<R>(&self, f: impl FnOnce(Option<&Breakpoint<T>>) -> R) -> R {
        let state = self.state.borrow();
        f(resolve(&state.set, state.selected))
    }

    /// Replace the rule set (and with it the strategy and sensitivity
    /// flags) wholesale, re-selecting immediately against the last known
    /// size or the unmeasured assumption.
    ///
    /// Replacement rules are fresh, so the consumer is re-notified whenever
    /// the new selection is a real rule; only a fallback-to-fallback
    /// replacement stays silent.
    pub fn set_breakpoints(&self, set: BreakpointSet<T>) {
        let (set, previous, current, size, breakpoint_cb) = {
            let mut state = self.state.borrow_mut();
            let set = Rc::new(set);
            state.set = set.clone();
            let previous = state.selected;
            let current = Selected::from_index(set.select_index(state.size));
            state.selected = current;
            (
                set,
                previous,
                current,
                state.size,
                state.on_breakpoint_change.clone(),
            )
        };
        let changed = previous != current || matches!(current, Selected::Rule(_));
        if changed
            && let Some(callback) = breakpoint_cb
            && let Some(rule) = resolve(&set, current)
        {
            callback(rule, size);
        }
    }

    // Runs on every delivered size. Associated fn so the registry closure
    // only captures the state cell, not the whole watcher.
    fn handle_size(state: &Rc<RefCell<WatcherState<T>>>, size: Size) {
        let (set, previous, current, size_cb, breakpoint_cb) = {
            let mut state = state.borrow_mut();
            if state.size == Some(size) {
                return;
            }
            let sensitivity = state.set.sensitivity();
            let needs_rematch = match state.size {
                None => true,
                Some(last) => {
                    (sensitivity.contains(Sensitivity::WIDTH) && size.width != last.width)
                        || (sensitivity.contains(Sensitivity::HEIGHT)
                            && size.height != last.height)
                }
            };
            let previous = state.selected;
            let current = if needs_rematch {
                Selected::from_index(state.set.select_index(Some(size)))
            } else {
                previous
            };
            state.size = Some(size);
            state.selected = current;
            (
                state.set.clone(),
                previous,
                current,
                state.on_size_change.clone(),
                state.on_breakpoint_change.clone(),
            )
        };
        // current is never Unset past a measurement, but resolving keeps the
        // callbacks free of placeholder rules
        if let Some(rule) = resolve(&set, current) {
            if let Some(callback) = size_cb {
                callback(size, resolve(&set, previous), rule);
            }
            if current != previous && let Some(callback) = breakpoint_cb {
                callback(rule, Some(size));
            }
        }
    }
}

impl<T> Drop for SizeWatcher<T> {
    fn drop(&mut self) {
        if let Some(element) = self.element.take() {
            self.registry.unregister(element);
        }
    }
}
