//! Evidence validation: authority classification and concurrent link probing.

mod authority;
mod validator;

pub use authority::AuthorityClassifier;
pub use validator::{HttpProber, ProbeError, ProbeOutcome, UrlProber, Validator};
