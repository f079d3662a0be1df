//! Execution frames and the call stack.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::environment::EnvRef;
use crate::errors::{ErrorKind, InterpretError, InterpretResult, Location};

/// What a frame is executing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// A top-level program or loaded file.
    Program,
    /// A nested block body (conditional, loop, guarded block).
    Block,
    /// A function body.
    Function,
    /// A class body.
    Class,
}

/// One active execution context.
///
/// Frames are shared (`Rc`) between the call stack and whoever started the
/// execution, so resolvers can signal a frame that is not the current one.
/// All bookkeeping uses `Cell`: a frame is never borrowed mutably.
pub struct Frame {
    env: EnvRef,
    source: Rc<str>,
    kind: FrameKind,
    line: Cell<usize>,
    jump: Cell<isize>,
    halted: Cell<bool>,
}

impl Frame {
    pub fn new(env: EnvRef, source: Rc<str>, kind: FrameKind) -> Self {
        Frame {
            env,
            source,
            kind,
            line: Cell::new(0),
            jump: Cell::new(1),
            halted: Cell::new(false),
        }
    }

    pub fn env(&self) -> &EnvRef {
        &self.env
    }

    /// Identifier of the source being executed (file path or label).
    pub fn source(&self) -> &Rc<str> {
        &self.source
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    /// Line of the instruction most recently dispatched in this frame.
    pub fn line(&self) -> usize {
        self.line.get()
    }

    pub(super) fn set_line(&self, line: usize) {
        self.line.set(line);
    }

    pub fn location(&self) -> Location {
        Location {
            source: Rc::clone(&self.source),
            line: self.line.get(),
        }
    }

    /// Move the cursor by `delta` after the current instruction instead of by one.
    pub fn jump(&self, delta: isize) {
        self.jump.set(delta);
    }

    /// The pending cursor delta, resetting it to one.
    pub(super) fn take_jump(&self) -> isize {
        self.jump.replace(1)
    }

    /// Stop this frame before its next instruction.
    pub fn halt(&self) {
        self.halted.set(true);
    }

    pub fn is_halted(&self) -> bool {
        self.halted.get()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("source", &self.source)
            .field("kind", &self.kind)
            .field("line", &self.line.get())
            .field("halted", &self.halted.get())
            .finish_non_exhaustive()
    }
}

/// The engine-owned stack of active frames, outermost first.
#[derive(Clone, Debug, Default)]
pub struct CallStack {
    frames: Vec<Rc<Frame>>,
    max_depth: Option<usize>,
}

impl CallStack {
    /// `max_depth` of `None` means unlimited.
    pub fn new(max_depth: Option<usize>) -> Self {
        CallStack {
            frames: Vec::new(),
            max_depth,
        }
    }

    /// Push a frame, checking the depth limit. The frame is not pushed on overflow.
    pub fn push(&mut self, frame: Rc<Frame>) -> InterpretResult {
        if let Some(max) = self.max_depth {
            if self.frames.len() >= max {
                return Err(InterpretError::new(ErrorKind::RecursionLimit { depth: max }));
            }
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<Rc<Frame>> {
        debug_assert!(!self.frames.is_empty(), "CallStack::pop() on empty stack");
        self.frames.pop()
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Active frames, outermost first.
    pub fn frames(&self) -> &[Rc<Frame>] {
        &self.frames
    }

    /// The innermost frame.
    pub fn top(&self) -> Option<&Rc<Frame>> {
        self.frames.last()
    }

    /// Innermost frame of the given kind.
    pub fn nearest(&self, kind: FrameKind) -> Option<&Rc<Frame>> {
        self.frames.iter().rev().find(|frame| frame.kind == kind)
    }

    /// The frame directly below `frame`.
    pub fn caller_of(&self, frame: &Frame) -> Option<&Rc<Frame>> {
        let position = self.position(frame)?;
        position.checked_sub(1).map(|below| &self.frames[below])
    }

    /// Stack index of `frame`, searching from the top.
    pub fn position(&self, frame: &Frame) -> Option<usize> {
        self.frames
            .iter()
            .rposition(|candidate| std::ptr::eq(Rc::as_ptr(candidate), frame))
    }
}
