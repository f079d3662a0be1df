//! RAII guard that pops the call stack when a nested execution ends.
//!
//! The guard holds `&mut Interpreter` and derefs to it, so the dispatch loop
//! runs through the guard. Dropping it pops the frame it pushed, on success,
//! on an early `?` return and during unwinding alike.

use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use super::{Frame, Interpreter};
use crate::errors::InterpretResult;

pub(super) struct FrameGuard<'a> {
    interpreter: &'a mut Interpreter,
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        self.interpreter.call_stack.pop();
    }
}

impl Deref for FrameGuard<'_> {
    type Target = Interpreter;

    fn deref(&self) -> &Self::Target {
        self.interpreter
    }
}

impl DerefMut for FrameGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.interpreter
    }
}

impl Interpreter {
    /// Push `frame` and return a guard that pops it on drop.
    pub(super) fn enter(&mut self, frame: Rc<Frame>) -> InterpretResult<FrameGuard<'_>> {
        self.call_stack.push(frame)?;
        Ok(FrameGuard { interpreter: self })
    }
}
