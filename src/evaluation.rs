//! # Evaluation state
//!
//! [`Evaluation`] bundles everything the step executor reads and mutates:
//! the frame stack, the heap, and the shared, immutable [`Environment`]
//! (spec.md §3).

use std::rc::Rc;

use crate::environment::Environment;
use crate::frame::Frame;
use crate::heap::Heap;

pub struct Evaluation {
    pub environment: Rc<Environment>,
    /// Non-empty; top (`last()`) is the innermost call.
    pub frame_stack: Vec<Frame>,
    pub heap: Heap,
}

impl Evaluation {
    pub fn new(environment: Rc<Environment>, heap: Heap, initial_frame: Frame) -> Self {
        Evaluation {
            environment,
            frame_stack: vec![initial_frame],
            heap,
        }
    }

    /// The innermost frame. The frame stack is never empty: the driver
    /// only ever stops stepping once it, or all callers, pop the very
    /// last frame via a natural return it then observes directly.
    pub fn top(&self) -> &Frame {
        self.frame_stack.last().expect("frame stack is never empty")
    }

    pub fn top_mut(&mut self) -> &mut Frame {
        self.frame_stack.last_mut().expect("frame stack is never empty")
    }

    pub fn push_frame(&mut self, frame: Frame) {
        self.frame_stack.push(frame);
    }

    /// Has the top frame run off the end of its instructions? A
    /// well-formed program never actually hits this (every non-native
    /// call sequence ends with `INTERRUPT(return)`); reaching it is a
    /// host-level failure (spec.md §7).
    pub fn top_exhausted(&self) -> bool {
        self.top().current_instruction().is_none()
    }

    /// Duplicate every `RuntimeObject` and every frame; share the
    /// environment and instruction sequences by reference (spec.md §5).
    pub fn deep_clone(&self) -> Self {
        Evaluation {
            environment: Rc::clone(&self.environment),
            frame_stack: self.frame_stack.iter().map(Frame::deep_clone).collect(),
            heap: self.heap.deep_clone(),
        }
    }
}
