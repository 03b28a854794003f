//! Control-flow and plain stack/heap instruction handlers: everything
//! except `CALL`/`INIT`, which live in [`super::ops_dispatch`].

use std::rc::Rc;

use crate::environment::{Environment, BAD_PARAMETER_EXCEPTION};
use crate::error::EvalError;
use crate::evaluation::Evaluation;
use crate::frame::Frame;
use crate::id::{Id, FALSE_ID, TRUE_ID, VOID_ID};
use crate::instr::{InstantiatePayload, Instruction, InterruptionKind};
use crate::value::InnerValue;

pub(super) fn handle_load(eval: &mut Evaluation, name: &str) -> Result<(), EvalError> {
    for frame in eval.frame_stack.iter().rev() {
        if let Some(id) = frame.locals.get(name) {
            let id = id.clone();
            eval.top_mut().push_operand(id);
            return Ok(());
        }
    }
    Err(EvalError::UndefinedLocal(name.to_string()))
}

pub(super) fn handle_store(eval: &mut Evaluation, name: &str, lookup: bool) -> Result<(), EvalError> {
    let v = eval.top_mut().pop_operand()?;
    if lookup {
        for frame in eval.frame_stack.iter_mut().rev() {
            if frame.locals.contains_key(name) {
                frame.locals.insert(name.to_string(), v);
                return Ok(());
            }
        }
    }
    eval.top_mut().locals.insert(name.to_string(), v);
    Ok(())
}

pub(super) fn handle_push(eval: &mut Evaluation, id: &Id) {
    eval.top_mut().push_operand(id.clone());
}

pub(super) fn handle_get(eval: &mut Evaluation, name: &str) -> Result<(), EvalError> {
    let self_id = eval.top_mut().pop_operand()?;
    let obj = eval.heap.get_instance(&self_id)?;
    let value = obj.fields.get(name).cloned().ok_or_else(|| EvalError::UndefinedField {
        module: obj.module.clone(),
        field: name.to_string(),
    })?;
    eval.top_mut().push_operand(value);
    Ok(())
}

pub(super) fn handle_set(eval: &mut Evaluation, name: &str) -> Result<(), EvalError> {
    let value = eval.top_mut().pop_operand()?;
    let self_id = eval.top_mut().pop_operand()?;
    eval.heap.get_instance_mut(&self_id)?.fields.insert(name.to_string(), value);
    Ok(())
}

pub(super) fn handle_swap(eval: &mut Evaluation) -> Result<(), EvalError> {
    let a = eval.top_mut().pop_operand()?;
    let b = eval.top_mut().pop_operand()?;
    eval.top_mut().push_operand(a);
    eval.top_mut().push_operand(b);
    Ok(())
}

pub(super) fn handle_instantiate(eval: &mut Evaluation, module: &str, payload: &Option<InstantiatePayload>) {
    let inner = payload.as_ref().map(|p| match p {
        InstantiatePayload::Number(n) => InnerValue::Number(*n),
        InstantiatePayload::Str(s) => InnerValue::Str(s.clone()),
    });
    let id = eval.heap.add_instance(module.to_string(), inner);
    eval.top_mut().push_operand(id);
}

pub(super) fn handle_inherits(eval: &mut Evaluation, env: &Environment, module: &str) -> Result<(), EvalError> {
    let self_id = eval.top_mut().pop_operand()?;
    let self_module = eval.heap.get_instance(&self_id)?.module.clone();
    let result = env.inherits(&self_module, module)?;
    let id = Id::new(if result { TRUE_ID } else { FALSE_ID });
    eval.top_mut().push_operand(id);
    Ok(())
}

/// `CONDITIONAL_JUMP n`. `eval.top_mut().next_instruction` has already
/// been advanced past this instruction by the step loop; `n = 0` is a
/// valid no-op-length jump (see spec.md §9 Open Questions).
pub(super) fn handle_conditional_jump(eval: &mut Evaluation, offset: usize) -> Result<(), EvalError> {
    let c = eval.top_mut().pop_operand()?;
    if c == Id::new(TRUE_ID) {
        Ok(())
    } else if c == Id::new(FALSE_ID) {
        let from = eval.top().next_instruction;
        let len = eval.top().instructions.len();
        let target = from + offset;
        if target > len {
            return Err(EvalError::JumpOutOfBounds { from, offset: offset as i64, len });
        }
        eval.top_mut().next_instruction = target;
        Ok(())
    } else {
        raise_bad_parameter(eval)
    }
}

pub(super) fn handle_if_then_else(
    eval: &mut Evaluation,
    then_branch: &Rc<[Instruction]>,
    else_branch: &Rc<[Instruction]>,
) -> Result<(), EvalError> {
    let c = eval.top_mut().pop_operand()?;
    let branch = if c == Id::new(TRUE_ID) {
        then_branch
    } else if c == Id::new(FALSE_ID) {
        else_branch
    } else {
        return raise_bad_parameter(eval);
    };

    let mut instrs = Vec::with_capacity(branch.len() + 2);
    instrs.push(Instruction::Push(Id::new(VOID_ID)));
    instrs.extend(branch.iter().cloned());
    instrs.push(Instruction::Interrupt(InterruptionKind::Result));

    eval.top_mut().mark_resuming(InterruptionKind::Result);
    eval.push_frame(Frame::new(Rc::from(instrs)));
    Ok(())
}

pub(super) fn handle_try_catch_always(
    eval: &mut Evaluation,
    body: &Rc<[Instruction]>,
    catch: &Rc<[Instruction]>,
    always: &Rc<[Instruction]>,
) {
    eval.top_mut().mark_resuming(InterruptionKind::Result);
    eval.push_frame(
        Frame::new(Rc::clone(always)).resuming([
            InterruptionKind::Result,
            InterruptionKind::Return,
            InterruptionKind::Exception,
        ]),
    );
    eval.push_frame(Frame::new(Rc::clone(catch)).resuming([InterruptionKind::Exception]));
    eval.push_frame(Frame::new(Rc::clone(body)));
}

pub(super) fn handle_interrupt(eval: &mut Evaluation, kind: InterruptionKind) -> Result<(), EvalError> {
    let value = eval.top_mut().pop_operand()?;
    interrupt(eval, kind, value)
}

pub(super) fn handle_resume_interruption(eval: &mut Evaluation) -> Result<(), EvalError> {
    let value = eval.top_mut().pop_operand()?;
    let resume = &eval.top().resume;
    if resume.len() != 2 {
        return Err(EvalError::AmbiguousResume);
    }
    let missing = InterruptionKind::ALL
        .into_iter()
        .find(|k| !resume.contains(k))
        .ok_or(EvalError::AmbiguousResume)?;
    interrupt(eval, missing, value)
}

fn raise_bad_parameter(eval: &mut Evaluation) -> Result<(), EvalError> {
    let exc = eval.heap.add_instance(BAD_PARAMETER_EXCEPTION, None);
    interrupt(eval, InterruptionKind::Exception, exc)
}

/// The unified interruption mechanism (spec.md §4.6): pop frames until one
/// remains whose resume set contains `kind`, then deliver `value` there.
pub(super) fn interrupt(eval: &mut Evaluation, kind: InterruptionKind, value: Id) -> Result<(), EvalError> {
    loop {
        if eval.frame_stack.is_empty() {
            return Err(match kind {
                InterruptionKind::Exception => EvalError::UnhandledException(value),
                _ => EvalError::UnhandledInterruption(kind.as_str()),
            });
        }
        if eval.top().resumes(kind) {
            eval.top_mut().consume_resume(kind);
            eval.top_mut().push_operand(value);
            return Ok(());
        }
        eval.frame_stack.pop();
    }
}
