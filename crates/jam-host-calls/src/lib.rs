//! Accumulation host-call ABI (spec §5.3): register conventions, return-code
//! sentinels, and the implementations of the 17 accumulate host calls plus
//! the debug log call. Refine-only calls (FETCH, EXPORT, MACHINE, PEEK,
//! POKE, PAGES, INVOKE, EXPUNGE) and PROVIDE are out of scope.

pub mod calls;
pub mod codes;
pub mod context;
pub mod ids;

pub use calls::{dispatch, HostCallOutcome};
pub use context::{DeferredTransfer, HostCallContext};
