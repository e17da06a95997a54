//! Per-field scope frames for the decode engine.
//!
//! Every field decode pushes one frame holding the resolved directive
//! outputs (size, condition, presence list) and any `$name` bindings.
//! Variable lookup walks the stack top-down, so bindings declared on a
//! field are visible to that field and to everything nested beneath it,
//! but never to siblings: the sibling's frame is gone by the time theirs
//! is pushed.

use crate::error::{Error, Result};
use crate::value::Value;

/// Activation record for one field decode
#[derive(Debug, Default)]
pub(crate) struct Frame {
    /// Resolved size: fixed element/byte count, or length-prefix width
    pub size: Option<i64>,
    /// Resolved condition value; absent means "always decode"
    pub condition: Option<Value>,
    /// Resolved presence list for holey arrays
    pub presence: Option<Vec<Value>>,
    /// Locally bound variables in binding order
    vars: Vec<(String, Value)>,
}

/// Stack of scope frames, one per in-flight field decode.
///
/// The stack being empty while queried is a programming error inside the
/// engine, reported as [`Error::Internal`] rather than a panic.
#[derive(Debug, Default)]
pub(crate) struct ScopeStack {
    frames: Vec<Frame>,
}

impl ScopeStack {
    pub(crate) fn new() -> Self {
        Self {
            frames: Vec::with_capacity(16),
        }
    }

    /// Pushes a fresh frame for the field decode about to start
    pub(crate) fn push(&mut self) {
        self.frames.push(Frame::default());
    }

    /// Pops the top frame, dropping its bindings
    pub(crate) fn pop(&mut self) -> Result<()> {
        self.frames
            .pop()
            .map(|_| ())
            .ok_or_else(|| Error::internal("scope stack is empty on pop"))
    }

    /// The current (top) frame
    pub(crate) fn current(&mut self) -> Result<&mut Frame> {
        self.frames
            .last_mut()
            .ok_or_else(|| Error::internal("scope stack is empty"))
    }

    /// Read-only view of the current frame
    pub(crate) fn current_ref(&self) -> Result<&Frame> {
        self.frames
            .last()
            .ok_or_else(|| Error::internal("scope stack is empty"))
    }

    /// Binds a variable in the current frame
    pub(crate) fn bind(&mut self, name: impl Into<String>, value: Value) -> Result<()> {
        self.current()?.vars.push((name.into(), value));
        Ok(())
    }

    /// Looks a variable up, searching frames from top to bottom.
    ///
    /// The first match wins, so an inner binding shadows an outer one of
    /// the same name.
    pub(crate) fn lookup(&self, name: &str) -> Option<Value> {
        for frame in self.frames.iter().rev() {
            if let Some((_, value)) = frame.vars.iter().rev().find(|(n, _)| n == name) {
                return Some(value.clone());
            }
        }
        None
    }

    /// Current nesting depth
    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_and_lookup() {
        let mut stack = ScopeStack::new();
        stack.push();
        stack.bind("size", Value::Int(3)).unwrap();
        assert_eq!(stack.lookup("size"), Some(Value::Int(3)));
        assert_eq!(stack.lookup("missing"), None);
    }

    #[test]
    fn test_inner_shadows_outer() {
        let mut stack = ScopeStack::new();
        stack.push();
        stack.bind("n", Value::Int(1)).unwrap();
        stack.push();
        stack.bind("n", Value::Int(2)).unwrap();
        assert_eq!(stack.lookup("n"), Some(Value::Int(2)));
        stack.pop().unwrap();
        assert_eq!(stack.lookup("n"), Some(Value::Int(1)));
    }

    #[test]
    fn test_popped_frame_is_invisible() {
        let mut stack = ScopeStack::new();
        stack.push();
        stack.bind("gone", Value::Int(9)).unwrap();
        stack.pop().unwrap();
        // sibling pushed after the pop must not see the binding
        stack.push();
        assert_eq!(stack.lookup("gone"), None);
    }

    #[test]
    fn test_empty_stack_is_an_error_not_a_panic() {
        let mut stack = ScopeStack::new();
        assert!(stack.pop().is_err());
        assert!(stack.current().is_err());
        assert!(stack.bind("x", Value::Null).is_err());
        assert_eq!(stack.depth(), 0);
    }
}
