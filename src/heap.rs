//! # Object heap
//!
//! An evaluation's heap is a flat map from [`Id`] to owned
//! [`RuntimeObject`]. This module owns allocation (`add_instance`),
//! lookup (`get_instance`/`get_instance_mut`), and the bootstrap of the
//! four well-known ids every evaluation must have before a single
//! instruction runs.
//!
//! Reclamation is explicitly out of scope (spec.md §1 Non-goals): the
//! heap only grows for the lifetime of an `Evaluation`.

use std::collections::HashMap;

use crate::error::EvalError;
use crate::id::{Id, IdGenerator, FALSE_ID, NULL_ID, TRUE_ID, VOID_ID};
use crate::value::{round4, InnerValue, RuntimeObject};

/// Well-known module name for the root of the class hierarchy.
pub const OBJECT_MODULE: &str = "wollok.lang.Object";
/// Well-known module name for booleans.
pub const BOOLEAN_MODULE: &str = "wollok.lang.Boolean";
/// Well-known module name for numbers.
pub const NUMBER_MODULE: &str = "wollok.lang.Number";
/// Well-known module name for strings.
pub const STRING_MODULE: &str = "wollok.lang.String";
/// Well-known module name for lists.
pub const LIST_MODULE: &str = "wollok.lang.List";
/// Well-known module name for the exception the VM itself raises.
pub const BAD_PARAMETER_EXCEPTION_MODULE: &str = "wollok.lang.BadParameterException";

/// The evaluation's object heap.
#[derive(Clone)]
pub struct Heap {
    instances: HashMap<Id, RuntimeObject>,
    ids: IdGenerator,
}

impl Heap {
    /// Build a heap with just the four well-known ids seeded: `null`,
    /// `void`, `true`, `false`. Everything else is allocated by
    /// `add_instance` as the program runs.
    pub fn bootstrap() -> Self {
        let mut instances = HashMap::new();
        instances.insert(
            Id::new(NULL_ID),
            RuntimeObject::with_inner_value(Id::new(NULL_ID), OBJECT_MODULE, InnerValue::Null),
        );
        instances.insert(
            Id::new(VOID_ID),
            RuntimeObject::new(Id::new(VOID_ID), OBJECT_MODULE),
        );
        instances.insert(
            Id::new(TRUE_ID),
            RuntimeObject::with_inner_value(Id::new(TRUE_ID), BOOLEAN_MODULE, InnerValue::Bool(true)),
        );
        instances.insert(
            Id::new(FALSE_ID),
            RuntimeObject::with_inner_value(
                Id::new(FALSE_ID),
                BOOLEAN_MODULE,
                InnerValue::Bool(false),
            ),
        );
        Heap {
            instances,
            ids: IdGenerator::new(),
        }
    }

    /// Allocate a new object of `module`, optionally carrying an inner
    /// value. `wollok.lang.Number` payloads are rounded to 4 decimal
    /// places here, at allocation time, per spec.md §4.2.
    pub fn add_instance(&mut self, module: impl Into<String>, inner_value: Option<InnerValue>) -> Id {
        let id = self.ids.next_id();
        self.add_instance_with_id(id.clone(), module, inner_value);
        id
    }

    /// Like [`Self::add_instance`] but the caller supplies the id. Used by
    /// the bootstrap frame builder (`driver::build_evaluation_for`) to
    /// pre-seed singleton instances under their AST node ids, so the
    /// bootstrap frame's `PUSH id` instructions always resolve (see
    /// spec.md §9 Open Questions).
    pub fn add_instance_with_id(
        &mut self,
        id: Id,
        module: impl Into<String>,
        inner_value: Option<InnerValue>,
    ) {
        let module = module.into();
        let inner_value = match inner_value {
            Some(InnerValue::Number(n)) => Some(InnerValue::Number(round4(n))),
            other => other,
        };
        let object = match inner_value {
            Some(v) => RuntimeObject::with_inner_value(id.clone(), module, v),
            None => RuntimeObject::new(id.clone(), module),
        };
        self.instances.insert(id, object);
    }

    pub fn get_instance(&self, id: &Id) -> Result<&RuntimeObject, EvalError> {
        self.instances
            .get(id)
            .ok_or_else(|| EvalError::UndefinedInstance(id.clone()))
    }

    pub fn get_instance_mut(&mut self, id: &Id) -> Result<&mut RuntimeObject, EvalError> {
        self.instances
            .get_mut(id)
            .ok_or_else(|| EvalError::UndefinedInstance(id.clone()))
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.instances.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Duplicate every `RuntimeObject` (shallow-copying fields and inner
    /// value). The id generator is cloned too, so ids minted by the clone
    /// never collide with ids minted by the original going forward.
    pub fn deep_clone(&self) -> Self {
        Heap {
            instances: self
                .instances
                .iter()
                .map(|(id, obj)| (id.clone(), obj.clone_with_id(id.clone())))
                .collect(),
            ids: self.ids.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_seeds_well_known_ids() {
        let heap = Heap::bootstrap();
        assert_eq!(heap.get_instance(&Id::new(NULL_ID)).unwrap().module, OBJECT_MODULE);
        assert_eq!(heap.get_instance(&Id::new(VOID_ID)).unwrap().module, OBJECT_MODULE);
        assert_eq!(heap.get_instance(&Id::new(TRUE_ID)).unwrap().module, BOOLEAN_MODULE);
        assert_eq!(heap.get_instance(&Id::new(FALSE_ID)).unwrap().module, BOOLEAN_MODULE);
    }

    #[test]
    fn add_instance_rounds_numbers_to_four_decimals() {
        let mut heap = Heap::bootstrap();
        let id = heap.add_instance(NUMBER_MODULE, Some(InnerValue::Number(1.0 / 3.0)));
        match &heap.get_instance(&id).unwrap().inner_value {
            Some(InnerValue::Number(n)) => assert_eq!(*n, 0.3333),
            other => panic!("expected Number, got {:?}", other),
        }
    }

    #[test]
    fn get_instance_fails_on_unknown_id() {
        let heap = Heap::bootstrap();
        let err = heap.get_instance(&Id::new("nope")).unwrap_err();
        assert_eq!(err, EvalError::UndefinedInstance(Id::new("nope")));
    }

    #[test]
    fn deep_clone_is_independent_but_equal() {
        let mut heap = Heap::bootstrap();
        let id = heap.add_instance("app.Counter", None);
        heap.get_instance_mut(&id)
            .unwrap()
            .fields
            .insert("n".to_string(), Id::new(NULL_ID));

        let clone = heap.deep_clone();
        assert_eq!(
            clone.get_instance(&id).unwrap().fields.get("n"),
            Some(&Id::new(NULL_ID))
        );

        heap.get_instance_mut(&id)
            .unwrap()
            .fields
            .insert("n".to_string(), Id::new(TRUE_ID));
        assert_eq!(
            clone.get_instance(&id).unwrap().fields.get("n"),
            Some(&Id::new(NULL_ID)),
            "mutating the original must not affect the clone"
        );
    }
}
