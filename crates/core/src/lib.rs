pub mod codec;
pub mod config;
pub mod error;
pub mod events;
pub mod kinds;
pub mod registry;
pub mod task;

pub use codec::{CodecKind, JsonCodec, MsgpackCodec, PayloadCodec};
pub use config::{ClusterConfig, ConfigError, DrosselConfig, EngineConfig, RestartConfig, ServerConfig, StrategyKind};
pub use error::{CodecError, TaskError, TaskResult};
pub use events::{EngineEvent, EventSink, FailureKind, NullSink, TracingSink};
pub use registry::{ComputeFn, ComputeRegistry};
pub use task::{Priority, Task, TaskId, TaskOutput};
