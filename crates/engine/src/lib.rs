//! Task-execution engine: interchangeable execution strategies behind a
//! bounded, ordered admission queue.
//!
//! The pieces compose at startup: a [`ComputeRegistry`] names the work, a
//! [`TaskStrategy`] decides how it runs (inline, rayon pool, worker
//! processes), and the [`AsyncTaskQueue`] arbitrates every submission with
//! explicit backpressure. Callers hold a single-fire [`CompletionHandle`]
//! per task.
//!
//! [`ComputeRegistry`]: drossel_core::ComputeRegistry

pub mod error;
pub mod protocol;
pub mod queue;
pub mod strategy;

pub use error::EngineError;
pub use queue::{AsyncTaskQueue, CompletionHandle, QueueConfig, QueueStats};
pub use strategy::in_process::{InProcessStrategy, NullStrategy};
pub use strategy::process_pool::{ProcessPoolConfig, ProcessPoolStrategy};
pub use strategy::thread_pool::ThreadPoolStrategy;
pub use strategy::{build_strategy, TaskStrategy, WorkerState};
