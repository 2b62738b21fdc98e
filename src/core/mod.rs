//! Core port-layer modules

pub mod config;
pub mod critical;
pub mod error;
pub mod types;
