//! Webring core
//!
//! This library owns the ring membership model: circular next/previous
//! navigation over the eligible members and the scheduled verification that
//! every member still links back into the ring.

pub mod directory;
pub mod error;
pub mod member;
pub mod monitor;
pub mod ring;
pub mod schedule;
pub mod settings;
pub mod store;
pub mod validation;
pub mod verifier;

// Re-export main types
pub use directory::MemberDirectory;
pub use error::{RingError, StoreError};
pub use member::{Member, MemberId, MemberUpdate, NewMember};
pub use monitor::{RingMonitor, RunSummary};
pub use ring::Ring;
pub use schedule::CheckSchedule;
pub use settings::{CheckerSettings, MarkerVariant, RingEndpoint};
pub use store::{MemberStore, MemoryStore};
pub use verifier::{HttpFetcher, LinkVerifier, PageFetcher, VerificationResult};

/// Result type for ring operations
pub type Result<T> = std::result::Result<T, RingError>;
