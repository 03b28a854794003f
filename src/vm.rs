//! # Step executor
//!
//! Interprets exactly one [`Instruction`] per call to [`step`], mutating
//! the top frame's operand stack, locals, the heap, and (for `CALL`,
//! `INIT`, `IF_THEN_ELSE`, `TRY_CATCH_ALWAYS`, and interruption unwinding)
//! the frame stack itself. Dispatch logic is split across two sibling
//! modules by concern: [`ops_dispatch`] for method/constructor dispatch,
//! [`ops_control`] for everything else.

mod ops_control;
mod ops_dispatch;

use crate::environment::Environment;
use crate::error::EvalError;
use crate::evaluation::Evaluation;
use crate::instr::Instruction;
use crate::natives::NativesRegistry;

/// Execute the top frame's next instruction. Advances that frame's program
/// counter before dispatch, so instruction handlers that push a new frame
/// leave the pusher correctly positioned to resume after it, and
/// `CONDITIONAL_JUMP` computes its target relative to the already-advanced
/// counter (spec.md §9 Open Questions: `n = 0` is a valid no-op).
pub fn step(eval: &mut Evaluation, env: &Environment, natives: &dyn NativesRegistry) -> Result<(), EvalError> {
    let instr = eval
        .top()
        .current_instruction()
        .cloned()
        .ok_or(EvalError::InstructionsExhausted)?;
    eval.top_mut().advance();

    match instr {
        Instruction::Load(name) => ops_control::handle_load(eval, &name),
        Instruction::Store { name, lookup } => ops_control::handle_store(eval, &name, lookup),
        Instruction::Push(id) => {
            ops_control::handle_push(eval, &id);
            Ok(())
        }
        Instruction::Get(name) => ops_control::handle_get(eval, &name),
        Instruction::Set(name) => ops_control::handle_set(eval, &name),
        Instruction::Swap => ops_control::handle_swap(eval),
        Instruction::Instantiate { module, payload } => {
            ops_control::handle_instantiate(eval, &module, &payload);
            Ok(())
        }
        Instruction::Inherits(module) => ops_control::handle_inherits(eval, env, &module),
        Instruction::ConditionalJump(offset) => ops_control::handle_conditional_jump(eval, offset),
        Instruction::Call { message, arity, lookup_start } => {
            ops_dispatch::handle_call(eval, env, natives, &message, arity, &lookup_start)
        }
        Instruction::Init { arity, lookup_start, init_fields } => {
            ops_dispatch::handle_init(eval, env, arity, &lookup_start, init_fields)
        }
        Instruction::IfThenElse { then_branch, else_branch } => {
            ops_control::handle_if_then_else(eval, &then_branch, &else_branch)
        }
        Instruction::TryCatchAlways { body, catch, always } => {
            ops_control::handle_try_catch_always(eval, &body, &catch, &always);
            Ok(())
        }
        Instruction::Interrupt(kind) => ops_control::handle_interrupt(eval, kind),
        Instruction::ResumeInterruption => ops_control::handle_resume_interruption(eval),
    }
}

/// Step `eval` until its frame stack has unwound back down to
/// `target_depth` frames (used by the driver to run a pushed frame to
/// completion without stepping its caller's remaining instructions).
pub fn run_until_depth(
    eval: &mut Evaluation,
    env: &Environment,
    natives: &dyn NativesRegistry,
    target_depth: usize,
) -> Result<(), EvalError> {
    loop {
        if eval.frame_stack.len() <= target_depth {
            return Ok(());
        }
        if eval.frame_stack.len() == target_depth + 1 && eval.top_exhausted() {
            return Ok(());
        }
        step(eval, env, natives)?;
    }
}

#[cfg(test)]
mod tests;
