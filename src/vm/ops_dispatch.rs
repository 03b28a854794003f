//! `CALL` and `INIT`: method dispatch and constructor chaining (spec.md
//! §4.3, §4.4). The two share a lot of shape — argument popping, varargs
//! binding, building a callee frame and marking the caller as resuming
//! `return` — so the common parts live in [`bind_params`] and
//! [`push_method_frame`].

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::Method;
use crate::compiler;
use crate::environment::{Environment, LIST, STRING};
use crate::error::EvalError;
use crate::evaluation::Evaluation;
use crate::frame::Frame;
use crate::id::{Id, VOID_ID};
use crate::instr::{Instruction, InterruptionKind};
use crate::natives::NativesRegistry;
use crate::value::InnerValue;

pub(super) fn handle_call(
    eval: &mut Evaluation,
    env: &Environment,
    natives: &dyn NativesRegistry,
    message: &str,
    arity: usize,
    lookup_start: &Option<String>,
) -> Result<(), EvalError> {
    let mut args = Vec::with_capacity(arity);
    for _ in 0..arity {
        args.push(eval.top_mut().pop_operand()?);
    }
    args.reverse();
    let receiver = eval.top_mut().pop_operand()?;
    let receiver_module = eval.heap.get_instance(&receiver)?.module.clone();

    let start_fqn = match lookup_start {
        Some(ls) => {
            let hierarchy = env.hierarchy(&receiver_module)?;
            match hierarchy.iter().position(|f| f == ls) {
                Some(i) if i + 1 < hierarchy.len() => Some(hierarchy[i + 1].clone()),
                _ => None,
            }
        }
        None => Some(receiver_module.clone()),
    };

    let found = match &start_fqn {
        Some(fqn) => env.method_lookup(message, arity, fqn)?,
        None => None,
    };

    match found {
        Some((declaring_class, method)) => {
            dispatch_found(eval, env, natives, receiver, &receiver_module, &declaring_class, message, arity, method, args)
        }
        None => dispatch_message_not_understood(eval, env, natives, receiver, receiver_module, message, args),
    }
}

#[allow(clippy::too_many_arguments)]
fn dispatch_found(
    eval: &mut Evaluation,
    env: &Environment,
    natives: &dyn NativesRegistry,
    receiver: Id,
    receiver_module: &str,
    declaring_class: &str,
    message: &str,
    arity: usize,
    method: &Method,
    args: Vec<Id>,
) -> Result<(), EvalError> {
    if method.is_native() {
        let native = natives.lookup(declaring_class, message, arity).ok_or_else(|| {
            EvalError::NoApplicableMethod {
                module: declaring_class.to_string(),
                message: message.to_string(),
                arity,
            }
        })?;
        native(eval, receiver, &args)?;
        Ok(())
    } else {
        let _ = receiver_module;
        push_method_frame(eval, env, receiver, method, args)
    }
}

fn dispatch_message_not_understood(
    eval: &mut Evaluation,
    env: &Environment,
    natives: &dyn NativesRegistry,
    receiver: Id,
    receiver_module: String,
    message: &str,
    args: Vec<Id>,
) -> Result<(), EvalError> {
    let name_id = eval.heap.add_instance(STRING, Some(InnerValue::Str(message.to_string())));
    let list_id = eval.heap.add_instance(LIST, Some(InnerValue::List(args)));
    let mnu_args = vec![name_id, list_id];

    match env.method_lookup("messageNotUnderstood", 2, &receiver_module)? {
        Some((declaring_class, method)) => {
            if method.is_native() {
                let native = natives.lookup(&declaring_class, "messageNotUnderstood", 2).ok_or_else(|| {
                    EvalError::NoApplicableMethod {
                        module: declaring_class.clone(),
                        message: "messageNotUnderstood".to_string(),
                        arity: 2,
                    }
                })?;
                native(eval, receiver, &mnu_args)?;
                Ok(())
            } else {
                push_method_frame(eval, env, receiver, method, mnu_args)
            }
        }
        None => Err(EvalError::NoApplicableMethod {
            module: receiver_module,
            message: message.to_string(),
            arity: mnu_args.len(),
        }),
    }
}

fn push_method_frame(
    eval: &mut Evaluation,
    env: &Environment,
    receiver: Id,
    method: &Method,
    args: Vec<Id>,
) -> Result<(), EvalError> {
    let mut locals = bind_params(&method.params, method.is_varargs, &args, &mut eval.heap);
    locals.insert("self".to_string(), receiver.clone());

    let body = method.body.as_ref().expect("dispatch only reaches here for non-native methods");
    let compiled = compiler::compile_body(env, body);
    let mut instrs: Vec<Instruction> = compiled.iter().cloned().collect();
    instrs.push(Instruction::Push(Id::new(VOID_ID)));
    instrs.push(Instruction::Interrupt(InterruptionKind::Return));

    eval.top_mut().mark_resuming(InterruptionKind::Return);
    eval.push_frame(Frame::new(Rc::from(instrs)).with_locals(locals));
    Ok(())
}

pub(super) fn handle_init(
    eval: &mut Evaluation,
    env: &Environment,
    arity: usize,
    lookup_start: &str,
    init_fields: bool,
) -> Result<(), EvalError> {
    let self_id = eval.top_mut().pop_operand()?;
    let mut args = Vec::with_capacity(arity);
    for _ in 0..arity {
        args.push(eval.top_mut().pop_operand()?);
    }
    args.reverse();

    let receiver_module = eval.heap.get_instance(&self_id)?.module.clone();
    let ctor = env
        .constructor_lookup(arity, lookup_start)?
        .ok_or_else(|| EvalError::MissingConstructor { module: lookup_start.to_string(), arity })?;

    let mut locals = bind_params(&ctor.params, ctor.is_varargs, &args, &mut eval.heap);
    locals.insert("self".to_string(), self_id.clone());

    let mut instrs = Vec::new();

    if init_fields {
        for (_owner, field) in env.all_fields_ordered(&receiver_module)? {
            instrs.push(Instruction::Load("self".to_string()));
            instrs.extend(compiler::compile_expression(&field.initializer));
            instrs.push(Instruction::Set(field.name.clone()));
        }
    }

    if let Some(base_call) = &ctor.base_call {
        let target_fqn = env
            .superclass(lookup_start)?
            .expect("a constructor's base_call is only Some when its class has a superclass");
        for arg in &base_call.args {
            instrs.extend(compiler::compile_expression(arg));
        }
        instrs.push(Instruction::Load("self".to_string()));
        instrs.push(Instruction::Init {
            arity: base_call.args.len(),
            lookup_start: target_fqn,
            init_fields: false,
        });
    }

    instrs.extend(compiler::compile_body(env, &ctor.body).iter().cloned());
    instrs.push(Instruction::Load("self".to_string()));
    instrs.push(Instruction::Interrupt(InterruptionKind::Return));

    eval.top_mut().mark_resuming(InterruptionKind::Return);
    eval.push_frame(Frame::new(Rc::from(instrs)).with_locals(locals));
    Ok(())
}

/// Bind `args` to `params`: pairwise for fixed arity, or pairwise for the
/// leading fixed parameters plus a freshly allocated `List` for the tail
/// when `is_varargs` (spec.md §4.3).
fn bind_params(params: &[String], is_varargs: bool, args: &[Id], heap: &mut crate::heap::Heap) -> HashMap<String, Id> {
    let mut locals = HashMap::new();
    if is_varargs {
        let fixed = params.len() - 1;
        for (param, arg) in params[..fixed].iter().zip(args.iter()) {
            locals.insert(param.clone(), arg.clone());
        }
        let tail = args[fixed..].to_vec();
        let list_id = heap.add_instance(LIST, Some(InnerValue::List(tail)));
        locals.insert(params[fixed].clone(), list_id);
    } else {
        for (param, arg) in params.iter().zip(args.iter()) {
            locals.insert(param.clone(), arg.clone());
        }
    }
    locals
}
