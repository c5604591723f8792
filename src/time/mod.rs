//! Wall clock abstraction, real or simulated.

pub mod simulate;
pub mod source;
