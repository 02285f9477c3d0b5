//! Shared leaf data structures for the `wsc` Whitespace compiler.
//!
//! This crate hosts the pieces every other `wsc` crate builds upon:
//!
//! - [`Int`]: arbitrary-precision signed integers with the arithmetic the
//!   Whitespace abstract machine and the constant folder require,
//! - [`IntMap`]: a map keyed by shared [`Int`] values, hashed by their low
//!   64 bits and iterable in ascending numeric order,
//! - [`Arena`]: a push-only entity arena addressed by typed index newtypes,
//! - [`Pos`] and [`SourceFile`]: source position bookkeeping.

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

mod arena;
mod int;
mod map;
mod pos;

pub use self::{
    arena::{Arena, ArenaIndex, Iter, IterMut},
    int::Int,
    map::{IntMap, Pairs},
    pos::{DisplayPos, Location, Pos, SourceFile},
};
