//! # Activation records
//!
//! A [`Frame`] is one entry on the evaluation's call stack: the immutable
//! instruction sequence it's stepping through, its program counter, its
//! local bindings, its operand stack, and the set of interruption kinds it
//! is willing to catch (spec.md §3, §4.6).

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::EvalError;
use crate::id::Id;
use crate::instr::{Instruction, InterruptionKind};

#[derive(Clone, Debug)]
pub struct Frame {
    /// Shared, immutable — the same `Rc` may back many frames and many
    /// cloned evaluations.
    pub instructions: Rc<[Instruction]>,
    /// `0 <= next_instruction <= instructions.len()`.
    pub next_instruction: usize,
    pub locals: HashMap<String, Id>,
    pub operand_stack: Vec<Id>,
    pub resume: Vec<InterruptionKind>,
}

impl Frame {
    /// A fresh frame over `instructions` resuming nothing; the caller sets
    /// up `resume` via [`Self::resuming`] / mutation as needed.
    pub fn new(instructions: Rc<[Instruction]>) -> Self {
        Frame {
            instructions,
            next_instruction: 0,
            locals: HashMap::new(),
            operand_stack: Vec::new(),
            resume: Vec::new(),
        }
    }

    pub fn resuming(mut self, kinds: impl IntoIterator<Item = InterruptionKind>) -> Self {
        self.resume = kinds.into_iter().collect();
        self
    }

    pub fn with_locals(mut self, locals: HashMap<String, Id>) -> Self {
        self.locals = locals;
        self
    }

    pub fn resumes(&self, kind: InterruptionKind) -> bool {
        self.resume.contains(&kind)
    }

    /// Add `kind` to this frame's resume set if it isn't already present.
    /// Idempotent so repeated dispatch through the same frame (e.g. two
    /// nested `try` blocks in one method) never duplicates an entry —
    /// `RESUME_INTERRUPTION` depends on the resume set having exactly one
    /// kind missing, which duplicate entries would break.
    pub fn mark_resuming(&mut self, kind: InterruptionKind) {
        if !self.resumes(kind) {
            self.resume.push(kind);
        }
    }

    /// Remove `kind` from this frame's resume set; used when an
    /// interruption is caught (spec.md §4.6).
    pub fn consume_resume(&mut self, kind: InterruptionKind) {
        self.resume.retain(|k| *k != kind);
    }

    pub fn push_operand(&mut self, id: Id) {
        self.operand_stack.push(id);
    }

    pub fn pop_operand(&mut self) -> Result<Id, EvalError> {
        self.operand_stack.pop().ok_or(EvalError::EmptyStack)
    }

    /// The next instruction to execute, or `None` if this frame has run
    /// off the end of its instruction sequence.
    pub fn current_instruction(&self) -> Option<&Instruction> {
        self.instructions.get(self.next_instruction)
    }

    pub fn advance(&mut self) {
        self.next_instruction += 1;
    }

    /// Shallow-clone: locals, operand stack, and resume set are
    /// duplicated; the instruction sequence is shared by reference
    /// (spec.md §5 Cloning).
    pub fn deep_clone(&self) -> Self {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_operand_fails_on_empty_stack() {
        let mut frame = Frame::new(Rc::from(vec![]));
        assert_eq!(frame.pop_operand().unwrap_err(), EvalError::EmptyStack);
    }

    #[test]
    fn consume_resume_removes_only_the_given_kind() {
        let mut frame = Frame::new(Rc::from(vec![]))
            .resuming([InterruptionKind::Return, InterruptionKind::Exception]);
        frame.consume_resume(InterruptionKind::Return);
        assert!(!frame.resumes(InterruptionKind::Return));
        assert!(frame.resumes(InterruptionKind::Exception));
    }
}
