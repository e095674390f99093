//! Transparent, formula-driven scoring. Pure functions only; every signal
//! carries the inputs and the literal formula behind its number.

mod scorer;

pub use scorer::Scorer;
