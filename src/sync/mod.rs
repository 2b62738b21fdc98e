//! Synchronization primitives for the port layer

pub mod mutex;
pub mod sem;
