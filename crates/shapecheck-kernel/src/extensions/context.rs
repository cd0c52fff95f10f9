//! State shared by extensions during one `diagnose` call.

use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Typed slots, one per state type. Built-ins keep their duplicate sets
/// here; custom extensions can add their own types alongside.
#[derive(Default)]
pub struct ExtensionContext {
    slots: HashMap<TypeId, Box<dyn Any + Send>>,
}

impl ExtensionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The slot for `T`, created with `T::default()` on first use.
    pub fn state<T: Default + Send + 'static>(&mut self) -> &mut T {
        let slot = self
            .slots
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::default()));
        match slot.downcast_mut::<T>() {
            Some(state) => state,
            None => unreachable!("context slot keyed by a different type"),
        }
    }

    /// The slot for `T`, if anything created it.
    pub fn get<T: Send + 'static>(&self) -> Option<&T> {
        self.slots.get(&TypeId::of::<T>())?.downcast_ref::<T>()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl std::fmt::Debug for ExtensionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionContext")
            .field("slots", &self.slots.len())
            .finish()
    }
}
