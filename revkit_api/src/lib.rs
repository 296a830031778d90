//! Backend-independent value types returned by revkit.
//!
//! Every type here is a plain, serializable value: nothing carries identity
//! beyond the call that produced it and no backend-specific type leaks
//! through.

pub mod commit;
pub mod diff;
pub mod status;
pub mod tag;

pub use commit::*;
pub use diff::*;
pub use status::*;
pub use tag::*;
