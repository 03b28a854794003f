//! # Evaluation driver
//!
//! Builds the initial evaluation (global singleton bootstrap), runs a body
//! to completion against it, and drives a whole test suite by cloning that
//! initial evaluation once per test (spec.md §2, §6 "Driver-exposed API").

use std::rc::Rc;

use crate::ast::Body;
use crate::compiler;
use crate::environment::Environment;
use crate::error::EvalError;
use crate::evaluation::Evaluation;
use crate::frame::Frame;
use crate::heap::Heap;
use crate::id::Id;
use crate::instr::Instruction;
use crate::natives::NativesRegistry;
use crate::value::InnerValue;
use crate::vm;

/// Create the heap with `null`, `void`, `true`, `false`, and every named
/// global singleton pre-allocated under its own AST id, then run each
/// singleton's constructor to completion (spec.md §9 Open Questions: the
/// bootstrap frame's `PUSH id` references are valid because the heap is
/// seeded *before* the frame that references those ids is built).
pub fn build_evaluation_for(
    environment: Rc<Environment>,
    natives: &dyn NativesRegistry,
) -> Result<Evaluation, EvalError> {
    let mut heap = Heap::bootstrap();
    for singleton in environment.singletons() {
        heap.add_instance_with_id(singleton.id.clone(), singleton.fqn.clone(), None);
    }

    let mut instrs = Vec::new();
    for singleton in environment.singletons() {
        instrs.push(Instruction::Push(singleton.id.clone()));
        instrs.push(Instruction::Init {
            arity: 0,
            lookup_start: singleton.fqn.clone(),
            init_fields: true,
        });
    }

    let bootstrap_frame = Frame::new(Rc::from(instrs));
    let mut eval = Evaluation::new(Rc::clone(&environment), heap, bootstrap_frame);
    run_logging_unhandled(&mut eval, &environment, natives, 0)?;
    Ok(eval)
}

/// Push a frame executing `body` and step until it completes; return the
/// instance whose id is popped from that frame's operand stack.
pub fn run(eval: &mut Evaluation, natives: &dyn NativesRegistry, body: &Body) -> Result<Id, EvalError> {
    let environment = Rc::clone(&eval.environment);
    let instructions = compiler::compile_body(&environment, body);
    let base_depth = eval.frame_stack.len();
    eval.push_frame(Frame::new(instructions));

    run_logging_unhandled(eval, &environment, natives, base_depth)?;

    let id = eval.top_mut().pop_operand()?;
    eval.frame_stack.pop();
    Ok(id)
}

/// Initialize the evaluation, then clone it and run each test body in
/// isolation. Every test gets a fresh clone of the same bootstrapped
/// state, so side effects in one test never leak into another.
pub fn run_tests(
    environment: Rc<Environment>,
    natives: &dyn NativesRegistry,
    tests: &[(String, Body)],
) -> Result<Vec<(String, Result<Id, EvalError>)>, EvalError> {
    let base = build_evaluation_for(environment, natives)?;
    Ok(tests
        .iter()
        .map(|(name, body)| {
            let mut clone = base.deep_clone();
            (name.clone(), run(&mut clone, natives, body))
        })
        .collect())
}

fn run_logging_unhandled(
    eval: &mut Evaluation,
    environment: &Environment,
    natives: &dyn NativesRegistry,
    target_depth: usize,
) -> Result<(), EvalError> {
    match vm::run_until_depth(eval, environment, natives, target_depth) {
        Err(EvalError::UnhandledException(id)) => {
            log_exception_message(eval, &id);
            Err(EvalError::UnhandledException(id))
        }
        other => other,
    }
}

/// Unhandled exceptions at the outermost frame must first try to log the
/// exception's `message` field, if present (spec.md §7). No logging
/// façade crate is used here, just a direct `eprintln!`.
fn log_exception_message(eval: &Evaluation, exception_id: &Id) {
    let Ok(exception) = eval.heap.get_instance(exception_id) else { return };
    let Some(message_id) = exception.fields.get("message") else { return };
    let Ok(message_obj) = eval.heap.get_instance(message_id) else { return };
    if let Some(InnerValue::Str(message)) = &message_obj.inner_value {
        eprintln!("unhandled exception: {}", message);
    }
}
