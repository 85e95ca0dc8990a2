//! Hook-dispatch and mutation-batching core.
//!
//! A write on a watched collection fires a lifecycle observer, change
//! detection diffs the new snapshot against the previous one, registered
//! watchers declare mutations against a per-cycle [`MutationBatch`], and the
//! batch commits as one minimal update per affected document. All of it runs
//! off the critical path of the triggering write unless the engine is in
//! inline dispatch mode.

// Submodule declaration
// -----------------------------------------------------------------------------
mod batch;
mod change;
mod context;
mod dispatch;
mod hook;
mod registry;


// Re-export
// -----------------------------------------------------------------------------
pub use batch::*;
pub use context::*;
pub use dispatch::*;
pub use hook::*;
pub use registry::*;

pub(crate) use change::*;
