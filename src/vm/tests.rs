//! End-to-end tests driving the compiler and VM together through the
//! `driver` API, covering the concrete scenarios from spec.md §8.

use std::rc::Rc;

use crate::ast::{AssignTarget, Body, Catch, Class, Expression, Field, Method, ReferenceTarget, Sentence};
use crate::driver;
use crate::environment::{Environment, BAD_PARAMETER_EXCEPTION, BOOLEAN, LIST, NUMBER, OBJECT, STRING};
use crate::error::EvalError;
use crate::id::{Id, TRUE_ID};
use crate::natives::test_support::number_registry;
use crate::value::InnerValue;

fn object_class() -> Class {
    Class::with_synthesized_default_constructor(OBJECT, None, vec![], vec![], vec![])
}

fn number_class() -> Class {
    Class::with_synthesized_default_constructor(
        NUMBER,
        Some(OBJECT.to_string()),
        vec![],
        vec![
            Method { name: "+".to_string(), params: vec!["other".to_string()], is_varargs: false, body: None },
            Method { name: "==".to_string(), params: vec!["other".to_string()], is_varargs: false, body: None },
        ],
        vec![],
    )
}

fn boolean_class() -> Class {
    Class::with_synthesized_default_constructor(BOOLEAN, Some(OBJECT.to_string()), vec![], vec![], vec![])
}

fn string_class() -> Class {
    Class::with_synthesized_default_constructor(STRING, Some(OBJECT.to_string()), vec![], vec![], vec![])
}

fn list_class() -> Class {
    Class::with_synthesized_default_constructor(LIST, Some(OBJECT.to_string()), vec![], vec![], vec![])
}

fn builtin_classes() -> Vec<Class> {
    vec![object_class(), number_class(), boolean_class(), string_class(), list_class()]
}

fn number_value(eval: &crate::evaluation::Evaluation, id: &Id) -> f64 {
    match eval.heap.get_instance(id).unwrap().inner_value {
        Some(InnerValue::Number(n)) => n,
        ref other => panic!("expected a Number, got {:?}", other),
    }
}

// 1. Arithmetic literal: `42` evaluates to a Number of 42.0000.
#[test]
fn arithmetic_literal_rounds_and_tags_its_module() {
    let env = Rc::new(Environment::new(builtin_classes(), vec![]));
    let natives = number_registry();
    let mut eval = driver::build_evaluation_for(Rc::clone(&env), &natives).unwrap();

    let body: Body = vec![Sentence::Expr(Expression::LiteralNumber(42.0))];
    let id = driver::run(&mut eval, &natives, &body).unwrap();

    let obj = eval.heap.get_instance(&id).unwrap();
    assert_eq!(obj.module, NUMBER);
    assert_eq!(obj.inner_value, Some(InnerValue::Number(42.0)));
}

// 2. Field set/get: `new C().bump()` where `bump` does `x = x + 1; return x`.
#[test]
fn field_set_get_via_native_plus() {
    let c_class = Class::with_synthesized_default_constructor(
        "app.C",
        Some(OBJECT.to_string()),
        vec![Field { name: "x".to_string(), initializer: Expression::LiteralNumber(0.0) }],
        vec![Method {
            name: "bump".to_string(),
            params: vec![],
            is_varargs: false,
            body: Some(vec![
                Sentence::Assignment {
                    target: AssignTarget::Field("x".to_string()),
                    value: Expression::Send {
                        receiver: Box::new(Expression::Reference(ReferenceTarget::Field("x".to_string()))),
                        message: "+".to_string(),
                        args: vec![Expression::LiteralNumber(1.0)],
                    },
                },
                Sentence::Return(Some(Expression::Reference(ReferenceTarget::Field("x".to_string())))),
            ]),
        }],
        vec![],
    );

    let mut classes = builtin_classes();
    classes.push(c_class);
    let env = Rc::new(Environment::new(classes, vec![]));
    let natives = number_registry();
    let mut eval = driver::build_evaluation_for(Rc::clone(&env), &natives).unwrap();

    let body: Body = vec![Sentence::Expr(Expression::Send {
        receiver: Box::new(Expression::New { class_fqn: "app.C".to_string(), args: vec![] }),
        message: "bump".to_string(),
        args: vec![],
    })];
    let id = driver::run(&mut eval, &natives, &body).unwrap();
    assert_eq!(number_value(&eval, &id), 1.0);
}

// 3. Super-dispatch: `B.m()` calls `super() + 10` where `A.m()` is `1`.
#[test]
fn super_dispatch_starts_lookup_above_the_enclosing_class() {
    let a_class = Class::with_synthesized_default_constructor(
        "app.A",
        Some(OBJECT.to_string()),
        vec![],
        vec![Method {
            name: "m".to_string(),
            params: vec![],
            is_varargs: false,
            body: Some(vec![Sentence::Return(Some(Expression::LiteralNumber(1.0)))]),
        }],
        vec![],
    );
    let b_class = Class::with_synthesized_default_constructor(
        "app.B",
        Some("app.A".to_string()),
        vec![],
        vec![Method {
            name: "m".to_string(),
            params: vec![],
            is_varargs: false,
            body: Some(vec![Sentence::Return(Some(Expression::Send {
                receiver: Box::new(Expression::Super {
                    enclosing_method: "m".to_string(),
                    enclosing_class_fqn: "app.B".to_string(),
                    args: vec![],
                }),
                message: "+".to_string(),
                args: vec![Expression::LiteralNumber(10.0)],
            }))]),
        }],
        vec![],
    );

    let mut classes = builtin_classes();
    classes.push(a_class);
    classes.push(b_class);
    let env = Rc::new(Environment::new(classes, vec![]));
    let natives = number_registry();
    let mut eval = driver::build_evaluation_for(Rc::clone(&env), &natives).unwrap();

    let body: Body = vec![Sentence::Expr(Expression::Send {
        receiver: Box::new(Expression::New { class_fqn: "app.B".to_string(), args: vec![] }),
        message: "m".to_string(),
        args: vec![],
    })];
    let id = driver::run(&mut eval, &natives, &body).unwrap();
    assert_eq!(number_value(&eval, &id), 11.0);
}

fn env_with_exception_and_sample() -> Rc<Environment> {
    let e_class = Class::with_synthesized_default_constructor("app.E", Some(OBJECT.to_string()), vec![], vec![], vec![]);
    let sample = Class::with_synthesized_default_constructor(
        "app.Sample",
        Some(OBJECT.to_string()),
        vec![],
        vec![
            Method {
                name: "valueTest".to_string(),
                params: vec![],
                is_varargs: false,
                body: Some(vec![Sentence::Return(Some(Expression::Try {
                    body: vec![Sentence::Expr(Expression::Throw(Box::new(Expression::New {
                        class_fqn: "app.E".to_string(),
                        args: vec![],
                    })))],
                    catches: vec![Catch {
                        parameter: "e".to_string(),
                        exception_type_fqn: "app.E".to_string(),
                        body: vec![Sentence::Expr(Expression::LiteralNumber(7.0))],
                    }],
                    always: vec![],
                }))]),
            },
            Method {
                name: "alwaysRunsOnThrow".to_string(),
                params: vec![],
                is_varargs: false,
                body: Some(vec![
                    Sentence::Variable { name: "ran".to_string(), value: Expression::LiteralBool(false) },
                    Sentence::Expr(Expression::Try {
                        body: vec![Sentence::Expr(Expression::Throw(Box::new(Expression::New {
                            class_fqn: "app.E".to_string(),
                            args: vec![],
                        })))],
                        catches: vec![Catch {
                            parameter: "e".to_string(),
                            exception_type_fqn: "app.E".to_string(),
                            body: vec![Sentence::Expr(Expression::LiteralNumber(7.0))],
                        }],
                        always: vec![Sentence::Assignment {
                            target: AssignTarget::Name("ran".to_string()),
                            value: Expression::LiteralBool(true),
                        }],
                    }),
                    Sentence::Return(Some(Expression::Reference(ReferenceTarget::Name("ran".to_string())))),
                ]),
            },
            Method {
                name: "alwaysRunsWithoutThrow".to_string(),
                params: vec![],
                is_varargs: false,
                body: Some(vec![
                    Sentence::Variable { name: "ran".to_string(), value: Expression::LiteralBool(false) },
                    Sentence::Expr(Expression::Try {
                        body: vec![Sentence::Expr(Expression::LiteralNumber(5.0))],
                        catches: vec![Catch {
                            parameter: "e".to_string(),
                            exception_type_fqn: "app.E".to_string(),
                            body: vec![Sentence::Expr(Expression::LiteralNumber(-1.0))],
                        }],
                        always: vec![Sentence::Assignment {
                            target: AssignTarget::Name("ran".to_string()),
                            value: Expression::LiteralBool(true),
                        }],
                    }),
                    Sentence::Return(Some(Expression::Reference(ReferenceTarget::Name("ran".to_string())))),
                ]),
            },
        ],
        vec![],
    );

    let mut classes = builtin_classes();
    classes.push(e_class);
    classes.push(sample);
    Rc::new(Environment::new(classes, vec![]))
}

fn bool_value(id: &Id) -> bool {
    *id == Id::new(TRUE_ID)
}

// 4. Try/catch/always.
#[test]
fn try_catch_evaluates_to_the_matching_handlers_value() {
    let env = env_with_exception_and_sample();
    let natives = number_registry();
    let mut eval = driver::build_evaluation_for(Rc::clone(&env), &natives).unwrap();

    let body: Body = vec![Sentence::Expr(Expression::Send {
        receiver: Box::new(Expression::New { class_fqn: "app.Sample".to_string(), args: vec![] }),
        message: "valueTest".to_string(),
        args: vec![],
    })];
    let id = driver::run(&mut eval, &natives, &body).unwrap();
    assert_eq!(number_value(&eval, &id), 7.0);
}

#[test]
fn always_clause_runs_whether_the_body_throws_or_not() {
    let env = env_with_exception_and_sample();
    let natives = number_registry();

    for message in ["alwaysRunsOnThrow", "alwaysRunsWithoutThrow"] {
        let mut eval = driver::build_evaluation_for(Rc::clone(&env), &natives).unwrap();
        let body: Body = vec![Sentence::Expr(Expression::Send {
            receiver: Box::new(Expression::New { class_fqn: "app.Sample".to_string(), args: vec![] }),
            message: message.to_string(),
            args: vec![],
        })];
        let id = driver::run(&mut eval, &natives, &body).unwrap();
        assert!(bool_value(&id), "{} should report the always clause ran", message);
    }
}

// 5. Message not understood.
#[test]
fn undeclared_message_dispatches_to_message_not_understood() {
    let probe = Class::with_synthesized_default_constructor(
        "app.Probe",
        Some(OBJECT.to_string()),
        vec![],
        vec![Method {
            name: "messageNotUnderstood".to_string(),
            params: vec!["name".to_string(), "args".to_string()],
            is_varargs: false,
            body: Some(vec![Sentence::Return(Some(Expression::Reference(ReferenceTarget::Name("args".to_string()))))]),
        }],
        vec![],
    );
    let mut classes = builtin_classes();
    classes.push(probe);
    let env = Rc::new(Environment::new(classes, vec![]));
    let natives = number_registry();
    let mut eval = driver::build_evaluation_for(Rc::clone(&env), &natives).unwrap();

    let body: Body = vec![Sentence::Expr(Expression::Send {
        receiver: Box::new(Expression::New { class_fqn: "app.Probe".to_string(), args: vec![] }),
        message: "foo".to_string(),
        args: vec![Expression::LiteralNumber(1.0), Expression::LiteralNumber(2.0)],
    })];
    let id = driver::run(&mut eval, &natives, &body).unwrap();

    let args_obj = eval.heap.get_instance(&id).unwrap();
    match &args_obj.inner_value {
        Some(InnerValue::List(items)) => {
            assert_eq!(items.len(), 2);
            assert_eq!(number_value(&eval, &items[0]), 1.0);
            assert_eq!(number_value(&eval, &items[1]), 2.0);
        }
        other => panic!("expected a List, got {:?}", other),
    }
}

// 6. Varargs: `m(a, b...)` called with three arguments.
#[test]
fn varargs_binds_fixed_params_then_sweeps_the_rest_into_a_list() {
    let varargs_class = Class::with_synthesized_default_constructor(
        "app.Varargs",
        Some(OBJECT.to_string()),
        vec![],
        vec![
            Method {
                name: "firstArg".to_string(),
                params: vec!["a".to_string(), "b".to_string()],
                is_varargs: true,
                body: Some(vec![Sentence::Return(Some(Expression::Reference(ReferenceTarget::Name("a".to_string()))))]),
            },
            Method {
                name: "restArgs".to_string(),
                params: vec!["a".to_string(), "b".to_string()],
                is_varargs: true,
                body: Some(vec![Sentence::Return(Some(Expression::Reference(ReferenceTarget::Name("b".to_string()))))]),
            },
        ],
        vec![],
    );
    let mut classes = builtin_classes();
    classes.push(varargs_class);
    let env = Rc::new(Environment::new(classes, vec![]));
    let natives = number_registry();

    let mut eval_a = driver::build_evaluation_for(Rc::clone(&env), &natives).unwrap();
    let body_a: Body = vec![Sentence::Expr(Expression::Send {
        receiver: Box::new(Expression::New { class_fqn: "app.Varargs".to_string(), args: vec![] }),
        message: "firstArg".to_string(),
        args: vec![Expression::LiteralNumber(1.0), Expression::LiteralNumber(2.0), Expression::LiteralNumber(3.0)],
    })];
    let a_id = driver::run(&mut eval_a, &natives, &body_a).unwrap();
    assert_eq!(number_value(&eval_a, &a_id), 1.0);

    let mut eval_b = driver::build_evaluation_for(Rc::clone(&env), &natives).unwrap();
    let body_b: Body = vec![Sentence::Expr(Expression::Send {
        receiver: Box::new(Expression::New { class_fqn: "app.Varargs".to_string(), args: vec![] }),
        message: "restArgs".to_string(),
        args: vec![Expression::LiteralNumber(1.0), Expression::LiteralNumber(2.0), Expression::LiteralNumber(3.0)],
    })];
    let b_id = driver::run(&mut eval_b, &natives, &body_b).unwrap();
    match &eval_b.heap.get_instance(&b_id).unwrap().inner_value {
        Some(InnerValue::List(items)) => {
            assert_eq!(items.len(), 2);
            assert_eq!(number_value(&eval_b, &items[0]), 2.0);
            assert_eq!(number_value(&eval_b, &items[1]), 3.0);
        }
        other => panic!("expected a List, got {:?}", other),
    }
}

// Boundary: CONDITIONAL_JUMP / IF_THEN_ELSE on a non-boolean raises
// BadParameterException rather than panicking the host.
#[test]
fn if_on_non_boolean_raises_bad_parameter_exception() {
    let env = Rc::new(Environment::new(builtin_classes(), vec![]));
    let natives = number_registry();
    let mut eval = driver::build_evaluation_for(Rc::clone(&env), &natives).unwrap();

    let body: Body = vec![Sentence::Return(Some(Expression::If {
        condition: Box::new(Expression::LiteralNumber(1.0)),
        then_branch: vec![Sentence::Expr(Expression::LiteralNumber(1.0))],
        else_branch: vec![Sentence::Expr(Expression::LiteralNumber(2.0))],
    }))];
    let err = driver::run(&mut eval, &natives, &body).unwrap_err();
    let exception_id = match err {
        EvalError::UnhandledException(id) => id,
        other => panic!("expected UnhandledException, got {:?}", other),
    };
    assert_eq!(eval.heap.get_instance(&exception_id).unwrap().module, BAD_PARAMETER_EXCEPTION);
}
