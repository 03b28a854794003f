//! # Native method registry
//!
//! Methods declared `native` in the Language have no compiled body; `CALL`
//! looks them up here by `(module, message, arity)` and invokes them
//! synchronously (spec.md §4.3, §6). The registry's *contents* are an
//! external collaborator out of this crate's scope — only the shape
//! (`NativesRegistry`) is specified, as a trait so a host crate can back
//! it however it likes.
//!
//! Native implementations never suspend: they run to completion within a
//! single `CALL` step and may only push onto the current top frame's
//! operand stack or mutate the heap (spec.md §9 Open Questions).

use crate::evaluation::Evaluation;
use crate::error::EvalError;
use crate::id::Id;

/// A native method's implementation. Receives the evaluation (so it can
/// push a result onto the top frame's operand stack and allocate heap
/// objects), the receiver id, and the already-evaluated argument ids.
pub type NativeFn = fn(&mut Evaluation, Id, &[Id]) -> Result<(), EvalError>;

/// Looks up native implementations by fully qualified method identity.
pub trait NativesRegistry {
    fn lookup(&self, module: &str, message: &str, arity: usize) -> Option<NativeFn>;
}

/// A registry backed by a plain map, keyed on `(module, message, arity)`.
/// Useful for hosts with a fixed, small native surface; also backs this
/// crate's own tests.
#[derive(Default)]
pub struct MapNativesRegistry {
    entries: std::collections::HashMap<(String, String, usize), NativeFn>,
}

impl MapNativesRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module: impl Into<String>, message: impl Into<String>, arity: usize, f: NativeFn) {
        self.entries.insert((module.into(), message.into(), arity), f);
    }
}

impl NativesRegistry for MapNativesRegistry {
    fn lookup(&self, module: &str, message: &str, arity: usize) -> Option<NativeFn> {
        self.entries
            .get(&(module.to_string(), message.to_string(), arity))
            .copied()
    }
}

#[cfg(test)]
pub mod test_support {
    //! A small, illustrative set of native bindings for `wollok.lang.Number`
    //! and `wollok.lang.Boolean`, enough to exercise `CALL`-to-native
    //! dispatch (spec.md §4.3) in integration tests. Not part of the
    //! crate's public surface.

    use super::*;
    use crate::environment::NUMBER;
    use crate::value::InnerValue;

    fn number_of(eval: &Evaluation, id: &Id) -> Result<f64, EvalError> {
        match eval.heap.get_instance(id)?.inner_value {
            Some(InnerValue::Number(n)) => Ok(n),
            _ => Err(EvalError::UndefinedField {
                module: NUMBER.to_string(),
                field: "<inner value>".to_string(),
            }),
        }
    }

    fn plus(eval: &mut Evaluation, receiver: Id, args: &[Id]) -> Result<(), EvalError> {
        let lhs = number_of(eval, &receiver)?;
        let rhs = number_of(eval, &args[0])?;
        let id = eval.heap.add_instance(NUMBER, Some(InnerValue::Number(lhs + rhs)));
        eval.top_mut().push_operand(id);
        Ok(())
    }

    fn equals(eval: &mut Evaluation, receiver: Id, args: &[Id]) -> Result<(), EvalError> {
        let lhs = number_of(eval, &receiver)?;
        let rhs = number_of(eval, &args[0])?;
        let id = if lhs == rhs {
            Id::new(crate::id::TRUE_ID)
        } else {
            Id::new(crate::id::FALSE_ID)
        };
        eval.top_mut().push_operand(id);
        Ok(())
    }

    /// A registry carrying `Number>>+/1` and `Number>>==/1`, the minimum
    /// needed to drive the field set/get and super-dispatch scenarios.
    pub fn number_registry() -> MapNativesRegistry {
        let mut registry = MapNativesRegistry::new();
        registry.register(NUMBER, "+", 1, plus);
        registry.register(NUMBER, "==", 1, equals);
        registry
    }
}
