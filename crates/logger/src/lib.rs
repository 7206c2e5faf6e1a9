//! Tracing subscriber setup shared by the webring binaries.

mod tracing;

pub use self::tracing::{init as init_tracing, init_with_level};
