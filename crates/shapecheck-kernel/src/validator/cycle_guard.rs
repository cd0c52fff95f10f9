//! Recursion guard for walking type references.
//!
//! Tracks which reference instantiations are being walked, so a type that
//! refers to itself is entered once per path and then treated as satisfied.

use shapecheck_schema::Location;

/// Stack of reference identities currently being walked. An identity is
/// the referenced declaration plus the instantiation text, so `Box<A>` and
/// `Box<B>` are distinct while a second `Box<A>` below the first is not.
#[derive(Debug, Default)]
pub struct CycleGuard {
    frames: Vec<(Location, String)>,
}

impl CycleGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an identity. Returns `false`, pushing nothing, when it is
    /// already on the stack.
    pub fn enter(&mut self, decl: Location, instantiation: &str) -> bool {
        if self.contains(decl, instantiation) {
            return false;
        }
        self.frames.push((decl, instantiation.to_string()));
        true
    }

    /// Pop the innermost identity.
    pub fn exit(&mut self) {
        self.frames.pop();
    }

    pub fn contains(&self, decl: Location, instantiation: &str) -> bool {
        self.frames
            .iter()
            .any(|(d, text)| *d == decl && text == instantiation)
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}
