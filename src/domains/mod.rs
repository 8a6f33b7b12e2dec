//! Domain modules organized by bounded contexts.

pub mod tools;
