//! Pipeline execution engine

pub mod engine;
pub mod executor;
pub mod lock;

pub use engine::{EngineError, EventHandler, ExecutionEngine, ExecutionEvent};
pub use executor::{ExecutionResult, StepExecutor};
pub use lock::WorkdirLock;
