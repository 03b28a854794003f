//! # Heap-resident values
//!
//! This module defines [`RuntimeObject`], the single representation used
//! for every value that lives in an evaluation's heap: user-defined
//! instances, booleans, numbers, strings and lists alike.
//!
//! ## Design
//! - Every object carries its own [`Id`] plus the fully qualified name of
//!   its runtime `module` (class). Ordinary objects keep their state in
//!   `fields`; the four primitive-ish builtins (`Number`, `String`,
//!   `Boolean`, `List`) additionally carry a host-side payload in
//!   `inner_value` that native methods read and write directly.
//! - `inner_value` is `None` for plain user objects — there is nothing
//!   for a native to unwrap, only `fields` to look at.
//! - Numbers are rounded to 4 decimal places at allocation time (see
//!   [`round4`]), never on every arithmetic step; native implementations
//!   of arithmetic operators are expected to round again when they
//!   allocate their result, not on every intermediate computation.

use std::collections::HashMap;

use crate::id::Id;

/// The host-side payload carried by the small set of builtin modules that
/// need one. Absent (`RuntimeObject::inner_value == None`) for ordinary
/// user-defined objects.
#[derive(Clone, Debug, PartialEq)]
pub enum InnerValue {
    /// `wollok.lang.Number` — rounded to 4 decimal places, see [`round4`].
    Number(f64),
    /// `wollok.lang.String`.
    Str(String),
    /// `wollok.lang.Boolean`.
    Bool(bool),
    /// `wollok.lang.List` — an ordered sequence of references into the heap.
    List(Vec<Id>),
    /// The `null` sentinel.
    Null,
}

/// Round a number to 4 fraction digits, half-away-from-zero.
///
/// Rust's `f64::round` already rounds halves away from zero, which matches
/// the half-away-from-zero convention spec.md calls out explicitly (as
/// opposed to banker's rounding); this is just that convention scaled to
/// four decimal places.
pub fn round4(n: f64) -> f64 {
    (n * 10_000.0).round() / 10_000.0
}

/// A heap-resident value: a `Runtime` instance of some `module`, identified
/// by a unique [`Id`].
#[derive(Clone, Debug)]
pub struct RuntimeObject {
    pub id: Id,
    /// Fully qualified name of this object's runtime class, e.g.
    /// `"wollok.lang.Number"` or a user-defined `"mygame.Board"`.
    pub module: String,
    /// Field name → value id. Keys are unique within an object.
    pub fields: HashMap<String, Id>,
    /// Host-side primitive payload, present only for the builtin modules
    /// that need one (see [`InnerValue`]).
    pub inner_value: Option<InnerValue>,
}

impl RuntimeObject {
    pub fn new(id: Id, module: impl Into<String>) -> Self {
        RuntimeObject {
            id,
            module: module.into(),
            fields: HashMap::new(),
            inner_value: None,
        }
    }

    pub fn with_inner_value(id: Id, module: impl Into<String>, inner_value: InnerValue) -> Self {
        RuntimeObject {
            id,
            module: module.into(),
            fields: HashMap::new(),
            inner_value: Some(inner_value),
        }
    }

    /// Shallow-clone this object under a (possibly different) id: fields
    /// map and inner value are duplicated, but any `Id`s they contain keep
    /// pointing at whatever the target heap resolves them to. Used by
    /// [`crate::evaluation::Evaluation::deep_clone`].
    pub fn clone_with_id(&self, id: Id) -> Self {
        RuntimeObject {
            id,
            module: self.module.clone(),
            fields: self.fields.clone(),
            inner_value: self.inner_value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round4_truncates_to_four_fraction_digits() {
        assert_eq!(round4(42.0), 42.0);
        assert_eq!(round4(1.0 / 3.0), 0.3333);
        assert_eq!(round4(2.0 / 3.0), 0.6667);
        assert_eq!(round4(-2.0 / 3.0), -0.6667);
    }
}
