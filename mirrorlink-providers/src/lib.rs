// MirrorLink Provider Clients
//
// Pure HTTP clients for mirror sites plus the pipeline that turns a media
// identity into a playable stream. Configuration and logging live in
// mirrorlink-core; this crate only needs a reqwest client and a cookie.

// Shared error types
pub mod error;

// Mirror clients
pub mod netmirror;

// Re-export client types for convenience
pub use error::{ErrorKind, NetMirrorError};
pub use netmirror::{NetMirrorClient, Resolver};
