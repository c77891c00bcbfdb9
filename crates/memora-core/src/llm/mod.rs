//! Generation backend port and the engine that drives it.

pub mod backend;
pub mod box_backend;
pub mod engine;
