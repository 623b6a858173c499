//! Infrastructure: configuration, wiring and the runtime loop.

pub mod bootstrap;
pub mod config;
pub mod runtime;
