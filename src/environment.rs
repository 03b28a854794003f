//! # Linked program environment
//!
//! `Environment` is the read-only, shared representation of a fully linked
//! program: every class and singleton, indexed by fully qualified name,
//! plus the compiler's memoization cache (spec.md §4.1, §9 "Memoization of
//! compilation").
//!
//! There is no parser/linker in this crate (spec.md §1), so `Environment`
//! is built directly — by hand, or by a future linker — via
//! [`Environment::new`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{Body, Class, Constructor, Method};
use crate::error::EvalError;
use crate::id::Id;
use crate::instr::Instruction;

/// Fully qualified name of the root of the class hierarchy.
pub const OBJECT: &str = "wollok.lang.Object";
pub const BOOLEAN: &str = "wollok.lang.Boolean";
pub const NUMBER: &str = "wollok.lang.Number";
pub const STRING: &str = "wollok.lang.String";
pub const LIST: &str = "wollok.lang.List";
pub const BAD_PARAMETER_EXCEPTION: &str = "wollok.lang.BadParameterException";

/// A named global object allocated once during evaluation bootstrap.
#[derive(Clone, Debug, PartialEq)]
pub struct Singleton {
    pub fqn: String,
    /// Id this singleton's `RuntimeObject` must be pre-allocated under
    /// (see `driver::build_evaluation_for` and spec.md §9 Open Questions).
    pub id: Id,
}

/// The fully linked, immutable program representation.
pub struct Environment {
    classes: HashMap<String, Rc<Class>>,
    singletons: Vec<Singleton>,
    compile_cache: RefCell<HashMap<(usize, usize), Rc<[Instruction]>>>,
}

impl Environment {
    pub fn new(classes: Vec<Class>, singletons: Vec<Singleton>) -> Self {
        Environment {
            classes: classes
                .into_iter()
                .map(|c| (c.fqn.clone(), Rc::new(c)))
                .collect(),
            singletons,
            compile_cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn singletons(&self) -> &[Singleton] {
        &self.singletons
    }

    pub fn resolve(&self, fqn: &str) -> Result<Rc<Class>, EvalError> {
        self.classes
            .get(fqn)
            .cloned()
            .ok_or_else(|| EvalError::UndefinedModule(fqn.to_string()))
    }

    pub fn fully_qualified_name(&self, class: &Class) -> String {
        class.fqn.clone()
    }

    /// The class's hierarchy from itself up to (and including) the root.
    pub fn hierarchy(&self, fqn: &str) -> Result<Vec<String>, EvalError> {
        let mut out = Vec::new();
        let mut current = fqn.to_string();
        loop {
            let class = self.resolve(&current)?;
            out.push(class.fqn.clone());
            match &class.superclass_fqn {
                Some(parent) => current = parent.clone(),
                None => break,
            }
        }
        Ok(out)
    }

    pub fn superclass(&self, fqn: &str) -> Result<Option<String>, EvalError> {
        Ok(self.resolve(fqn)?.superclass_fqn.clone())
    }

    pub fn inherits(&self, sub_fqn: &str, super_fqn: &str) -> Result<bool, EvalError> {
        Ok(self.hierarchy(sub_fqn)?.iter().any(|fqn| fqn == super_fqn))
    }

    /// Walk the hierarchy from `start_fqn` upward for a method named
    /// `message` whose arity accepts `arity`. Returns the method together
    /// with the fully qualified name of the class that declares it.
    ///
    /// Borrows the method straight out of `self.classes`'s own storage
    /// rather than cloning it: `compile_body`/`get_or_compile` memoize on
    /// the method body's address, so the body handed to the compiler must
    /// keep living at the same address across calls, not a fresh
    /// allocation that's freed the moment dispatch returns.
    pub fn method_lookup(&self, message: &str, arity: usize, start_fqn: &str) -> Result<Option<(String, &Method)>, EvalError> {
        for class_fqn in self.hierarchy(start_fqn)? {
            let class = self
                .classes
                .get(&class_fqn)
                .ok_or_else(|| EvalError::UndefinedModule(class_fqn.clone()))?;
            if let Some(method) = class
                .methods
                .iter()
                .find(|m| m.name == message && m.accepts_arity(arity))
            {
                return Ok(Some((class_fqn, method)));
            }
        }
        Ok(None)
    }

    /// Look up a constructor of `arity` declared directly on `class_fqn`.
    /// Constructors are not inherited: chaining to a superclass happens
    /// explicitly via each constructor's `base_call` (spec.md §4.4).
    ///
    /// Borrowed from `self.classes`'s own storage for the same reason as
    /// [`Self::method_lookup`].
    pub fn constructor_lookup(&self, arity: usize, class_fqn: &str) -> Result<Option<&Constructor>, EvalError> {
        let class = self
            .classes
            .get(class_fqn)
            .ok_or_else(|| EvalError::UndefinedModule(class_fqn.to_string()))?;
        Ok(class.constructors.iter().find(|c| c.accepts_arity(arity)))
    }

    /// Every field declared anywhere in `fqn`'s hierarchy, ordered so that
    /// superclass fields come before subclass fields while declaration
    /// order within a class is preserved (spec.md §4.4 step 1).
    pub fn all_fields_ordered(&self, fqn: &str) -> Result<Vec<(String, crate::ast::Field)>, EvalError> {
        let mut hierarchy = self.hierarchy(fqn)?;
        hierarchy.reverse(); // root first
        let mut out = Vec::new();
        for class_fqn in hierarchy {
            let class = self.resolve(&class_fqn)?;
            for field in &class.fields {
                out.push((class_fqn.clone(), field.clone()));
            }
        }
        Ok(out)
    }

    /// Look up, or lazily compile and cache, the instruction sequence for
    /// `node`. Keyed on `(self identity, node identity)` so the same
    /// `(environment, node)` pair always returns the same `Rc` — the
    /// referential-transparency requirement from spec.md §4.1.
    pub fn get_or_compile(
        &self,
        node: &Body,
        compile: impl FnOnce() -> Vec<Instruction>,
    ) -> Rc<[Instruction]> {
        let key = (self as *const Environment as usize, node.as_ptr() as usize);
        if let Some(cached) = self.compile_cache.borrow().get(&key) {
            return Rc::clone(cached);
        }
        let compiled: Rc<[Instruction]> = compile().into();
        self.compile_cache.borrow_mut().insert(key, Rc::clone(&compiled));
        compiled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Class;

    fn env_with_a_b() -> Environment {
        let object = Class::with_synthesized_default_constructor(OBJECT, None, vec![], vec![], vec![]);
        let a = Class::with_synthesized_default_constructor(
            "app.A",
            Some(OBJECT.to_string()),
            vec![],
            vec![],
            vec![],
        );
        let b = Class::with_synthesized_default_constructor(
            "app.B",
            Some("app.A".to_string()),
            vec![],
            vec![],
            vec![],
        );
        Environment::new(vec![object, a, b], vec![])
    }

    #[test]
    fn hierarchy_walks_from_class_to_root() {
        let env = env_with_a_b();
        assert_eq!(
            env.hierarchy("app.B").unwrap(),
            vec!["app.B".to_string(), "app.A".to_string(), OBJECT.to_string()]
        );
    }

    #[test]
    fn inherits_is_true_for_transitive_ancestors() {
        let env = env_with_a_b();
        assert!(env.inherits("app.B", OBJECT).unwrap());
        assert!(!env.inherits(OBJECT, "app.B").unwrap());
    }

    #[test]
    fn get_or_compile_memoizes_by_node_identity() {
        let env = env_with_a_b();
        let node: Body = vec![];
        let calls = std::cell::Cell::new(0);
        let first = env.get_or_compile(&node, || {
            calls.set(calls.get() + 1);
            vec![]
        });
        let second = env.get_or_compile(&node, || {
            calls.set(calls.get() + 1);
            vec![]
        });
        assert_eq!(calls.get(), 1);
        assert!(Rc::ptr_eq(&first, &second));
    }
}
