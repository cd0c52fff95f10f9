//! Type parameter scopes for the walker.
//!
//! A reference to a type parameter is a leaf: it names no declaration to
//! walk into. Frames are lexical, so entering another declaration starts
//! from a fresh scope.

use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct TypeScope {
    frames: Vec<HashSet<String>>,
}

impl TypeScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scope whose only frame binds `names`.
    pub fn with_params<'n>(names: impl IntoIterator<Item = &'n str>) -> Self {
        let mut scope = Self::new();
        scope.push_frame();
        for name in names {
            scope.bind(name);
        }
        scope
    }

    pub fn push_frame(&mut self) {
        self.frames.push(HashSet::new());
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    /// Bind a name in the innermost frame.
    pub fn bind(&mut self, name: impl Into<String>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into());
        }
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.frames.iter().rev().any(|frame| frame.contains(name))
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_are_bound() {
        let scope = TypeScope::with_params(["T", "U"]);
        assert!(scope.is_bound("T"));
        assert!(scope.is_bound("U"));
        assert!(!scope.is_bound("Sub"));
    }

    #[test]
    fn frames_nest_and_unwind() {
        let mut scope = TypeScope::with_params(["T"]);
        scope.push_frame();
        scope.bind("K");
        assert!(scope.is_bound("K") && scope.is_bound("T"));
        scope.pop_frame();
        assert!(!scope.is_bound("K"));
        assert_eq!(scope.depth(), 1);
    }

    #[test]
    fn bind_without_frame_is_ignored() {
        let mut scope = TypeScope::new();
        scope.bind("T");
        assert!(!scope.is_bound("T"));
    }
}
