//! A denormalization engine for document collections.
//!
//! Watchers register field paths on a collection; every insert, update or
//! remove is diffed against the previous snapshot, matching watchers declare
//! set/unset mutations, and the engine batches them into one minimal update
//! per affected document, committed off the write path.

mod config;
mod constants;
mod engine;
mod errors;
mod recipes;
mod store;

pub mod fieldpath;

pub use config::*;
pub use constants::ID_FIELD;
pub use engine::*;
pub use errors::*;
pub use recipes::*;
pub use store::*;
