//! The Whitespace compiler core.
//!
//! `wsc` lowers a tokenized Whitespace program into a language-neutral SSA
//! intermediate representation with a connected control-flow graph, then
//! runs the first round of optimizations over it. Code generators and
//! dumpers consume the resulting [`Program`] through its block and
//! instruction arenas.
//!
//! The pipeline:
//!
//! ```no_run
//! use std::rc::Rc;
//! use wsc::{ir::Program, passes};
//! use wsc_core::SourceFile;
//!
//! let source = std::fs::read("hello.ws").unwrap();
//! let file = Rc::new(SourceFile::new("hello.ws", &source));
//! let tokens = wsc_ws::lex(file, &source).unwrap();
//!
//! let (mut program, mut errors) = Program::build(&tokens);
//! if let Err(underflow) = program.connect() {
//!     errors.push(underflow.into());
//! }
//! passes::optimize(&mut program);
//! println!("{}", program.display());
//! ```
//!
//! Errors that describe bugs in the source program accumulate; errors that
//! would indicate a bug in the compiler itself panic.

#![warn(
    clippy::cast_lossless,
    clippy::missing_errors_doc,
    clippy::used_underscore_binding,
    clippy::redundant_closure_for_method_calls,
    clippy::type_repetition_in_bounds,
    clippy::inconsistent_struct_constructor,
    clippy::default_trait_access,
    clippy::map_unwrap_or,
    clippy::items_after_statements
)]

pub mod analysis;
mod error;
pub mod ir;
pub mod passes;

pub use self::error::{Error, ErrorKind, RetUnderflowError, TokenError, TokenErrorKind};
