//! # Host-level failures
//!
//! Two layers of "error" exist in this crate (spec.md §7):
//!
//! - **Language-level exceptions** are ordinary control flow: they travel
//!   through the `exception` interruption (`Instruction::Interrupt`) and
//!   never touch a Rust `Result`. The VM itself only ever raises one such
//!   exception directly, `wollok.lang.BadParameterException`, when
//!   `CONDITIONAL_JUMP`/`IF_THEN_ELSE` see a non-boolean operand; see
//!   `vm::ops_control`.
//! - **Host-level failures** are bugs in the interpreter or an invalid
//!   linked AST: popping an empty stack, an undefined instance or field, an
//!   unhandled interruption, a missing constructor, and so on. Those are
//!   [`EvalError`], returned as `Result::Err` and meant to never happen in
//!   a correctly linked program.
//!
//! No `thiserror`/`anyhow` here, just a hand-written `Display` and
//! `std::error::Error` impl.

use std::fmt;

use crate::id::Id;

/// A host-level failure: something the evaluator cannot recover from
/// because it indicates a bug in the VM or an invalid linked program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// Popped an operand stack that had nothing on it.
    EmptyStack,
    /// Referenced an `Id` with no corresponding heap entry.
    UndefinedInstance(Id),
    /// `GET`/`SET` referenced a field absent from the object.
    UndefinedField { module: String, field: String },
    /// `LOAD` found no frame binding `name`.
    UndefinedLocal(String),
    /// An interruption of `kind` reached the bottom of the frame stack
    /// with no frame willing to resume it.
    UnhandledInterruption(&'static str),
    /// `INIT`/super-dispatch found no constructor matching the requested
    /// arity anywhere in the hierarchy.
    MissingConstructor { module: String, arity: usize },
    /// A frame's `nextInstruction` ran past the end of its instruction
    /// sequence without reaching an `INTERRUPT(return)`.
    InstructionsExhausted,
    /// `CONDITIONAL_JUMP` target fell outside `[0, instructions.len()]`.
    JumpOutOfBounds { from: usize, offset: i64, len: usize },
    /// `RESUME_INTERRUPTION` ran on a frame whose resume set didn't have
    /// exactly one interruption kind missing from the full set of three.
    AmbiguousResume,
    /// An exception reached the outermost frame unhandled. Carries the
    /// exception value's id for the diagnostic snapshot; its `message`
    /// field, if present, has already been logged by the driver.
    UnhandledException(Id),
    /// An AST reference named a module the environment has no class or
    /// singleton for. Only possible with an invalid linked program.
    UndefinedModule(String),
    /// `CALL`/`INIT` resolved a message or constructor with no matching
    /// method, and `messageNotUnderstood` itself could not be found either.
    NoApplicableMethod { module: String, message: String, arity: usize },
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::EmptyStack => write!(f, "operand stack underflow"),
            EvalError::UndefinedInstance(id) => {
                write!(f, "undefined instance: {}", id)
            }
            EvalError::UndefinedField { module, field } => {
                write!(f, "object of module {} has no field {}", module, field)
            }
            EvalError::UndefinedLocal(name) => {
                write!(f, "no frame binds local {}", name)
            }
            EvalError::UnhandledInterruption(kind) => {
                write!(f, "unhandled {}", kind)
            }
            EvalError::MissingConstructor { module, arity } => {
                write!(f, "no constructor of arity {} found for {}", arity, module)
            }
            EvalError::InstructionsExhausted => {
                write!(f, "frame ran off the end of its instructions without returning")
            }
            EvalError::JumpOutOfBounds { from, offset, len } => {
                write!(
                    f,
                    "jump from {} by {} lands outside instruction bounds (len {})",
                    from, offset, len
                )
            }
            EvalError::AmbiguousResume => {
                write!(f, "RESUME_INTERRUPTION could not infer a unique interruption kind")
            }
            EvalError::UnhandledException(id) => {
                write!(f, "unhandled exception: {}", id)
            }
            EvalError::UndefinedModule(fqn) => {
                write!(f, "undefined module: {}", fqn)
            }
            EvalError::NoApplicableMethod { module, message, arity } => {
                write!(
                    f,
                    "{} does not understand {}/{} and has no messageNotUnderstood",
                    module, message, arity
                )
            }
        }
    }
}

impl std::error::Error for EvalError {}
