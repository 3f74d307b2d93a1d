//! # size-watcher
//!
//! Container-driven breakpoints: a container tells its descendants which
//! breakpoint applies based on the container's own rendered size, not the
//! viewport's.
//!
//! Three pieces compose:
//!
//! - [`BreakpointSet`]: an ordered, validated list of [`Breakpoint`] rules
//!   bound to a [`MatchBy`] strategy. Pure matching from a `(width, height)`
//!   pair to one rule.
//! - [`SizeWatcherRegistry`]: one shared size-change detector multiplexed
//!   across every watched container, with per-frame coalescing of
//!   rapid-fire notifications in the default dispatch mode.
//! - [`SizeWatcher`]: the per-container unit tying both together, notifying
//!   the render layer when the selected rule changes.
//!
//! The platform primitives stay outside the crate behind the
//! [`ResizeDetector`] and [`FrameScheduler`] traits; the [`headless`] module
//! provides in-process stand-ins for tests and benches.
//!
//! ```
//! use size_watcher::{Breakpoint, BreakpointSet, MatchBy, Size};
//!
//! let set = BreakpointSet::new(
//!     vec![
//!         Breakpoint::new().max_width(400.0).with_data("compact"),
//!         Breakpoint::new().min_width(400.0).with_data("regular"),
//!     ],
//!     MatchBy::Order,
//! )?;
//!
//! let rule = set.select(Some(Size::new(640.0, 480.0)));
//! assert_eq!(rule.data(), Some(&"regular"));
//! # Ok::<(), size_watcher::BreakpointError>(())
//! ```

pub mod breakpoint;
pub mod element;
pub mod headless;
pub mod observer;
pub mod registry;
pub mod watcher;

pub use breakpoint::{Axis, Breakpoint, BreakpointError, BreakpointSet, MatchBy, Sensitivity};
pub use element::ElementId;
pub use observer::{FrameScheduler, FrameToken, ResizeDetector, ResizeEntry};
pub use registry::{SizeCallback, SizeWatcherRegistry};
pub use watcher::{BreakpointCallback, SizeChangeCallback, SizeWatcher};

pub use peniko::kurbo;
pub use peniko::kurbo::Size;
