//! Whitespace language front end for the `wsc` compiler.
//!
//! The front end turns raw source bytes into the token stream the IR builder
//! consumes:
//!
//! - [`Token`] and [`TokenKind`]: the token model, grouped by instruction
//!   family (stack, arithmetic, heap, flow, I/O),
//! - [`lex`]: the prefix-tree scanner over space/tab/lf,
//! - [`pack`] and [`unpack`]: the bit-packed source codec,
//! - [`parse_source_map`]: the `.map` sidecar with human label names.

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

mod lex;
mod pack;
mod srcmap;
mod token;

pub use self::{
    lex::{lex, LexError, LexErrorKind},
    pack::{from_visible, pack, to_visible, unpack, PackError},
    srcmap::{parse_source_map, LabelNames, SourceMapError, SourceMapErrorKind},
    token::{Token, TokenKind, TokenProgram},
};
