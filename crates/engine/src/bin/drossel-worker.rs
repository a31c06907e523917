//! drossel-worker — compute worker for the process-pool strategy.
//!
//! Speaks length-prefixed MessagePack frames over stdin/stdout: one
//! [`WorkerRequest`] in, one [`WorkerReply`] out, strictly in order. Logs go
//! to stderr so stdout stays a clean frame stream. Exits when the parent
//! closes stdin.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tracing::{debug, info};

use drossel_core::{ComputeRegistry, PayloadCodec, Task, TaskError};
use drossel_engine::protocol::{read_frame, write_frame, WorkerReply, WorkerRequest, PROTOCOL_VERSION};

/// Compute worker executing framed task requests from its parent process.
#[derive(Parser, Debug)]
#[command(name = "drossel-worker", version, about)]
struct Cli {
    /// Slot ID assigned by the parent, used only for logging.
    #[arg(long, env = "DROSSEL_WORKER_ID", default_value_t = 0)]
    worker_id: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let registry = ComputeRegistry::standard();

    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = BufWriter::new(tokio::io::stdout());
    info!(worker_id = cli.worker_id, "worker ready");

    while let Some(request) = read_frame::<_, WorkerRequest>(&mut stdin)
        .await
        .context("reading request frame")?
    {
        debug!(worker_id = cli.worker_id, task_id = %request.task_id, kind = %request.kind, "request received");
        let reply = run_request(&registry, request);
        write_frame(&mut stdout, &reply)
            .await
            .context("writing reply frame")?;
        stdout.flush().await?;
    }

    info!(worker_id = cli.worker_id, "stdin closed, exiting");
    Ok(())
}

/// Decode, execute, encode. Compute panics are caught so a buggy compute
/// function reports `Compute` instead of taking the worker down — only a
/// hard abort (or a kill from the parent) reads as a crash.
fn run_request(registry: &ComputeRegistry, request: WorkerRequest) -> WorkerReply {
    let task_id = request.task_id;

    if request.version != PROTOCOL_VERSION {
        return WorkerReply {
            task_id,
            result: Err(TaskError::compute(format!(
                "unsupported protocol version {}",
                request.version
            ))),
            duration_ms: 0,
        };
    }

    let codec = request.codec.build();
    let payload = match codec.decode(&request.payload) {
        Ok(value) => value,
        Err(e) => {
            return WorkerReply {
                task_id,
                result: Err(TaskError::compute(format!("payload decode failed: {e}"))),
                duration_ms: 0,
            }
        }
    };

    let mut task = Task::new(request.kind, payload);
    task.id = task_id;

    let start = Instant::now();
    let outcome = catch_unwind(AssertUnwindSafe(|| registry.execute(&task)));
    let duration_ms = start.elapsed().as_millis() as u64;

    let result = match outcome {
        Ok(Ok(value)) => codec
            .encode(&value)
            .map_err(|e| TaskError::compute(format!("result encode failed: {e}"))),
        Ok(Err(err)) => Err(err),
        Err(_) => Err(TaskError::compute("compute panicked")),
    };

    WorkerReply {
        task_id,
        result,
        duration_ms,
    }
}
