//! Execution core for a small object-oriented language: an AST-to-bytecode
//! compiler and a stack-based virtual machine.
//!
//! Two tightly coupled subsystems live here: [`compiler`] lowers a linked
//! AST ([`ast`]) into [`instr::Instruction`] sequences, and [`vm`]
//! executes those sequences against an [`evaluation::Evaluation`] (frame
//! stack + object [`heap`] + a shared, immutable [`environment::Environment`]).
//! [`driver`] ties the two together: bootstrap, run a body, run a test
//! suite.

pub mod ast;
pub mod compiler;
pub mod driver;
pub mod environment;
pub mod error;
pub mod evaluation;
pub mod frame;
pub mod heap;
pub mod id;
pub mod instr;
pub mod natives;
pub mod value;
pub mod vm;

pub use ast::{Body, Class, Expression, Sentence};
pub use driver::{build_evaluation_for, run, run_tests};
pub use environment::Environment;
pub use error::EvalError;
pub use evaluation::Evaluation;
pub use id::Id;
pub use natives::NativesRegistry;
pub use value::RuntimeObject;
