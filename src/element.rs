//! Identity for observed container elements.
//!
//! The crate never touches platform handles; the embedding framework mints
//! an [`ElementId`] per container and keeps the mapping to whatever backs it
//! on screen.

use std::cell::RefCell;

use slotmap::{SlotMap, new_key_type};

thread_local! {
    static ELEMENT_IDS: RefCell<SlotMap<ElementId, ()>> = RefCell::new(SlotMap::with_key());
}

new_key_type! {
    /// A small unique identifier for an observed container element.
    pub struct ElementId;
}

impl ElementId {
    /// Allocate a new, unique `ElementId`.
    pub fn new() -> ElementId {
        ELEMENT_IDS.with_borrow_mut(|ids| ids.insert(()))
    }

    /// Whether this id is still allocated.
    ///
    /// Ids become invalid once [`remove`](Self::remove)d; slots are
    /// versioned, so a recycled slot never aliases an old id.
    pub fn is_valid(&self) -> bool {
        ELEMENT_IDS.with_borrow(|ids| ids.contains_key(*self))
    }

    /// Release this id. The caller is responsible for unregistering it from
    /// any registry first.
    pub fn remove(&self) {
        ELEMENT_IDS.with_borrow_mut(|ids| {
            ids.remove(*self);
        });
    }
}
