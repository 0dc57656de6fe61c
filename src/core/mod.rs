//! Core domain models for the command pipeline
//!
//! This module defines the pipeline, its ordered steps, their runtime
//! state and the YAML configuration they are built from.

pub mod config;
pub mod context;
pub mod pipeline;
pub mod state;
pub mod step;

pub use context::*;
pub use pipeline::*;
pub use state::*;
pub use step::*;
