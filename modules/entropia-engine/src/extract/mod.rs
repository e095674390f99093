//! Claim and evidence extraction: plain-text utilities, the generic
//! extractors, and the domain adapter registry.

pub mod adapters;
pub mod claims;
pub mod evidence;
pub mod text;

pub use adapters::{Adapter, Registry};
pub use claims::extract_claims;
pub use evidence::extract_evidence;
