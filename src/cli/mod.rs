//! CLI command implementations
//!
//! Wires the parsed request to the controller and the real process supervisor.

pub mod service;
