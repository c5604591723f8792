//! External I/O: process signals.
pub mod signals;
