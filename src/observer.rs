//! Boundary traits for the platform collaborators: the by-element
//! size-change primitive and the per-frame scheduler.
//!
//! Both stay outside this crate. A registry drives them through these traits
//! and the platform reports back through
//! [`SizeWatcherRegistry::notify_resized`](crate::SizeWatcherRegistry::notify_resized).

use peniko::kurbo::Size;

use crate::element::ElementId;

/// One observed change inside a batch reported by the platform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResizeEntry {
    pub element: ElementId,
    pub size: Size,
}

impl ResizeEntry {
    pub fn new(element: ElementId, size: impl Into<Size>) -> Self {
        ResizeEntry {
            element,
            size: size.into(),
        }
    }
}

/// The native by-element size-change detection primitive.
///
/// Implementations are expected to batch naturally: report every observed
/// element whose box size changed, at most once per rendering frame, through
/// the owning registry's `notify_resized`.
pub trait ResizeDetector {
    /// Start reporting size changes for `element`.
    fn observe(&mut self, element: ElementId);

    /// Stop reporting size changes for `element`.
    fn unobserve(&mut self, element: ElementId);

    /// Stop observing everything and release platform resources.
    fn disconnect(&mut self);
}

/// Identifies one scheduled frame callback so it can be cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameToken(pub u64);

/// "Run this once on the next rendering frame."
///
/// The registry keeps at most one outstanding callback and cancels it before
/// rescheduling; schedulers only need to honor `schedule` and `cancel`.
pub trait FrameScheduler {
    fn schedule(&mut self, frame: Box<dyn FnOnce()>) -> FrameToken;

    /// Drop a previously scheduled callback. No-op for tokens that already
    /// ran or were cancelled.
    fn cancel(&mut self, token: FrameToken);
}
