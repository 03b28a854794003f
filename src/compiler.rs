//! # Compiler
//!
//! Lowers a linked [`crate::ast::Body`]/[`crate::ast::Expression`] tree
//! into a flat [`Instruction`] sequence (spec.md §4.1). Entry point is
//! [`compile_body`], which is referentially transparent: the same
//! `(environment, body)` pair always returns the same `Rc<[Instruction]>`,
//! memoized via [`Environment::get_or_compile`].
//!
//! Two synthetic local names, `"<exception>"` and `"<previous_interruption>"`,
//! are used as scratch bindings inside the frames `Try` lowering builds;
//! the Language's own identifier grammar cannot produce names containing
//! `<`, so there is no risk of shadowing a real local.

use std::rc::Rc;

use crate::ast::{AssignTarget, Body, Expression, ReferenceTarget, Sentence};
use crate::environment::{Environment, NUMBER, STRING};
use crate::id::{Id, FALSE_ID, NULL_ID, TRUE_ID, VOID_ID};
use crate::instr::{InstantiatePayload, Instruction, InterruptionKind};

const EXCEPTION_LOCAL: &str = "<exception>";
const PREVIOUS_INTERRUPTION_LOCAL: &str = "<previous_interruption>";

/// Compile `body`, consulting and populating the environment's
/// memoization cache.
pub fn compile_body(env: &Environment, body: &Body) -> Rc<[Instruction]> {
    env.get_or_compile(body, || compile_sentences(body))
}

fn compile_sentences(body: &Body) -> Vec<Instruction> {
    body.iter().flat_map(compile_sentence).collect()
}

fn compile_sentence(sentence: &Sentence) -> Vec<Instruction> {
    match sentence {
        Sentence::Variable { name, value } => {
            let mut out = compile_expression(value);
            out.push(Instruction::Store { name: name.clone(), lookup: false });
            out
        }
        Sentence::Return(value) => {
            let mut out = match value {
                Some(e) => compile_expression(e),
                None => vec![Instruction::Push(Id::new(VOID_ID))],
            };
            out.push(Instruction::Interrupt(InterruptionKind::Return));
            out
        }
        Sentence::Assignment { target, value } => match target {
            AssignTarget::Field(name) => {
                let mut out = vec![Instruction::Load("self".to_string())];
                out.extend(compile_expression(value));
                out.push(Instruction::Set(name.clone()));
                out
            }
            AssignTarget::Name(name) => {
                let mut out = compile_expression(value);
                out.push(Instruction::Store { name: name.clone(), lookup: true });
                out
            }
        },
        // A bare expression statement's value is left on the operand
        // stack. For all but the body's last sentence this is inert: the
        // next sentence pushes on top of it and nothing ever reaches back
        // down for it within the same frame. For the *last* sentence it
        // is exactly the value the enclosing construct (a method body's
        // trailing `INTERRUPT(return)`, an `if`-branch's trailing
        // `INTERRUPT(result)`, or a top-level run/test body's natural
        // exhaustion) expects to find on top of the stack.
        Sentence::Expr(e) => compile_expression(e),
    }
}

/// Compile a single expression node. Unlike [`compile_body`], this is not
/// memoized: it's used both for whole method/constructor bodies (via
/// [`compile_sentences`], called once per distinct `Body` node and cached
/// there) and, in `vm::ops_dispatch`, for field initializers and base-call
/// argument expressions, which are recompiled on every `INIT` — cheap,
/// pure, and still referentially transparent, just not cached.
pub(crate) fn compile_expression(expr: &Expression) -> Vec<Instruction> {
    match expr {
        Expression::SelfExpr => vec![Instruction::Load("self".to_string())],
        Expression::Reference(target) => match target {
            ReferenceTarget::Field(name) => vec![
                Instruction::Load("self".to_string()),
                Instruction::Get(name.clone()),
            ],
            ReferenceTarget::Module(fqn) => vec![Instruction::Load(fqn.clone())],
            ReferenceTarget::Name(name) => vec![Instruction::Load(name.clone())],
        },
        Expression::LiteralNull => vec![Instruction::Push(Id::new(NULL_ID))],
        Expression::LiteralBool(true) => vec![Instruction::Push(Id::new(TRUE_ID))],
        Expression::LiteralBool(false) => vec![Instruction::Push(Id::new(FALSE_ID))],
        Expression::LiteralNumber(n) => vec![Instruction::Instantiate {
            module: NUMBER.to_string(),
            payload: Some(InstantiatePayload::Number(*n)),
        }],
        Expression::LiteralString(s) => vec![Instruction::Instantiate {
            module: STRING.to_string(),
            payload: Some(InstantiatePayload::Str(s.clone())),
        }],
        Expression::LiteralSingleton { fqn, superclass_fqn, super_args } => {
            let mut out: Vec<Instruction> = super_args.iter().flat_map(compile_expression).collect();
            out.push(Instruction::Instantiate { module: fqn.clone(), payload: None });
            out.push(Instruction::Init {
                arity: super_args.len(),
                lookup_start: superclass_fqn.clone(),
                init_fields: true,
            });
            out
        }
        Expression::LiteralObject { class_fqn, args } => {
            let mut out: Vec<Instruction> = args.iter().flat_map(compile_expression).collect();
            out.push(Instruction::Instantiate { module: class_fqn.clone(), payload: None });
            out.push(Instruction::Init {
                arity: args.len(),
                lookup_start: class_fqn.clone(),
                init_fields: false,
            });
            out
        }
        Expression::Send { receiver, message, args } => {
            let mut out = compile_expression(receiver);
            out.extend(args.iter().flat_map(compile_expression));
            out.push(Instruction::Call {
                message: message.clone(),
                arity: args.len(),
                lookup_start: None,
            });
            out
        }
        Expression::Super { enclosing_method, enclosing_class_fqn, args } => {
            let mut out = vec![Instruction::Load("self".to_string())];
            out.extend(args.iter().flat_map(compile_expression));
            out.push(Instruction::Call {
                message: enclosing_method.clone(),
                arity: args.len(),
                lookup_start: Some(enclosing_class_fqn.clone()),
            });
            out
        }
        Expression::New { class_fqn, args } => {
            let mut out: Vec<Instruction> = args.iter().flat_map(compile_expression).collect();
            out.push(Instruction::Instantiate { module: class_fqn.clone(), payload: None });
            out.push(Instruction::Init {
                arity: args.len(),
                lookup_start: class_fqn.clone(),
                init_fields: true,
            });
            out
        }
        Expression::If { condition, then_branch, else_branch } => {
            let mut out = compile_expression(condition);
            out.push(Instruction::IfThenElse {
                then_branch: compile_sentences(then_branch).into(),
                else_branch: compile_sentences(else_branch).into(),
            });
            out
        }
        Expression::Throw(e) => {
            let mut out = compile_expression(e);
            out.push(Instruction::Interrupt(InterruptionKind::Exception));
            out
        }
        Expression::Try { body, catches, always } => {
            vec![compile_try(body, catches, always)]
        }
    }
}

fn compile_try(body: &Body, catches: &[crate::ast::Catch], always: &Body) -> Instruction {
    let mut body_frame = vec![Instruction::Push(Id::new(VOID_ID))];
    body_frame.extend(compile_sentences(body));
    body_frame.push(Instruction::Interrupt(InterruptionKind::Result));

    let mut catch_frame = vec![Instruction::Store { name: EXCEPTION_LOCAL.to_string(), lookup: false }];
    for catch in catches {
        let mut handler = vec![
            Instruction::Push(Id::new(VOID_ID)),
            Instruction::Load(EXCEPTION_LOCAL.to_string()),
            Instruction::Store { name: catch.parameter.clone(), lookup: false },
        ];
        handler.extend(compile_sentences(&catch.body));
        handler.push(Instruction::Interrupt(InterruptionKind::Result));

        catch_frame.push(Instruction::Load(EXCEPTION_LOCAL.to_string()));
        catch_frame.push(Instruction::Inherits(catch.exception_type_fqn.clone()));
        catch_frame.push(Instruction::ConditionalJump(handler.len()));
        catch_frame.extend(handler);
    }
    catch_frame.push(Instruction::Load(EXCEPTION_LOCAL.to_string()));
    catch_frame.push(Instruction::Interrupt(InterruptionKind::Exception));

    let mut always_frame = vec![Instruction::Store {
        name: PREVIOUS_INTERRUPTION_LOCAL.to_string(),
        lookup: false,
    }];
    always_frame.extend(compile_sentences(always));
    always_frame.push(Instruction::Load(PREVIOUS_INTERRUPTION_LOCAL.to_string()));
    always_frame.push(Instruction::ResumeInterruption);

    Instruction::TryCatchAlways {
        body: body_frame.into(),
        catch: catch_frame.into(),
        always: always_frame.into(),
    }
}

// Re-exported so callers needing the well-known module names don't have to
// import `environment` separately just for this.
pub use crate::environment::{BOOLEAN as BOOLEAN_MODULE, LIST as LIST_MODULE, NUMBER as NUMBER_MODULE, OBJECT as OBJECT_MODULE, STRING as STRING_MODULE};
