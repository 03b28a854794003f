//! # Object identifiers
//!
//! This module defines [`Id`], the opaque handle used throughout the
//! evaluation core to refer to a [`crate::value::RuntimeObject`] without
//! borrowing it. Everything that would otherwise hold a reference into
//! the heap — locals, operand stacks, fields — holds an `Id` instead.
//!
//! ## Well-known ids
//! Four ids are reserved and stable for the lifetime of an evaluation:
//! `null`, `void`, `true`, `false`. The heap seeds them at construction
//! time (see [`crate::heap::Heap::bootstrap`]) and nothing ever removes
//! them.

use std::fmt;

/// Opaque identifier for a heap-resident [`crate::value::RuntimeObject`].
///
/// Cheap to clone and compare; internally a reference-counted string so
/// that well-known ids can be handed out as `'static`-like constants
/// without re-allocating on every clone.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(std::rc::Rc<str>);

impl Id {
    /// Build an `Id` from any string-like value.
    pub fn new(raw: impl Into<std::rc::Rc<str>>) -> Self {
        Id(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.0)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reserved id for the `null` object. Module is always `wollok.lang.Object`.
pub const NULL_ID: &str = "null";
/// Reserved id for the `void` object. Module is always `wollok.lang.Object`.
pub const VOID_ID: &str = "void";
/// Reserved id for the canonical `true` object. Module is `wollok.lang.Boolean`.
pub const TRUE_ID: &str = "true";
/// Reserved id for the canonical `false` object. Module is `wollok.lang.Boolean`.
pub const FALSE_ID: &str = "false";

/// A monotonically increasing generator of fresh, unique ids for a single
/// evaluation. Well-known ids are handed out once by the heap and never
/// minted again by this counter.
#[derive(Clone)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        IdGenerator { next: 0 }
    }

    /// Mint a fresh id, guaranteed not to collide with any previously
    /// minted id from this generator (well-known ids are reserved strings
    /// that never collide with the `obj#N` shape this produces).
    pub fn next_id(&mut self) -> Id {
        let id = Id::new(format!("obj#{}", self.next));
        self.next += 1;
        id
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
