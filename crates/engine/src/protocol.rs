//! Wire protocol between the control process and its worker processes.
//!
//! Frames are MessagePack-encoded structs behind a u32 big-endian length
//! prefix, exchanged over the worker's stdin/stdout. The payload bytes
//! inside a frame are opaque to the protocol — they are produced by the
//! injected [`PayloadCodec`](drossel_core::PayloadCodec) on either side.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use drossel_core::{CodecKind, TaskError, TaskId};

use crate::error::EngineError;

/// Bumped when the frame layout changes. Workers reject newer requests.
pub const PROTOCOL_VERSION: u16 = 1;

/// Upper bound on a single frame. Oversized frames indicate a corrupt
/// stream, not a legitimate payload.
pub const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

/// Parent → worker: execute one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRequest {
    pub version: u16,
    pub task_id: TaskId,
    /// Registered compute kind to run.
    pub kind: String,
    /// Codec-encoded payload bytes.
    pub payload: Vec<u8>,
    /// Codec the payload (and the reply value) is encoded with.
    pub codec: CodecKind,
}

/// Worker → parent: outcome of one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerReply {
    pub task_id: TaskId,
    /// Codec-encoded result value, or the compute failure.
    pub result: Result<Vec<u8>, TaskError>,
    /// Wall-clock compute time on the worker, in milliseconds.
    pub duration_ms: u64,
}

/// Write one length-prefixed frame.
pub async fn write_frame<W, T>(writer: &mut W, message: &T) -> Result<(), EngineError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let bytes = rmp_serde::to_vec(message).map_err(drossel_core::CodecError::from)?;
    let len = u32::try_from(bytes.len())
        .map_err(|_| EngineError::Protocol(format!("frame of {} bytes exceeds u32", bytes.len())))?;
    if len > MAX_FRAME_LEN {
        return Err(EngineError::Protocol(format!(
            "frame of {len} bytes exceeds the {MAX_FRAME_LEN} byte limit"
        )));
    }
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed frame. Returns `None` on a clean EOF at a frame
/// boundary; EOF inside a frame is an error (the peer died mid-write).
pub async fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>, EngineError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(EngineError::Protocol(format!(
            "incoming frame of {len} bytes exceeds the {MAX_FRAME_LEN} byte limit"
        )));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).await?;
    let message = rmp_serde::from_slice(&buf).map_err(drossel_core::CodecError::from)?;
    Ok(Some(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_round_trip_over_a_duplex_pipe() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        let request = WorkerRequest {
            version: PROTOCOL_VERSION,
            task_id: TaskId::new(),
            kind: "fib".into(),
            payload: vec![1, 2, 3],
            codec: CodecKind::Msgpack,
        };
        write_frame(&mut a, &request).await.unwrap();
        let received: WorkerRequest = read_frame(&mut b).await.unwrap().unwrap();
        assert_eq!(received.task_id, request.task_id);
        assert_eq!(received.kind, "fib");
        assert_eq!(received.payload, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn clean_eof_reads_as_none() {
        let (a, mut b) = tokio::io::duplex(64);
        drop(a);
        let result: Option<WorkerReply> = read_frame(&mut b).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn reply_carries_failures() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        let reply = WorkerReply {
            task_id: TaskId::new(),
            result: Err(TaskError::Compute {
                message: "bad payload".into(),
            }),
            duration_ms: 0,
        };
        write_frame(&mut a, &reply).await.unwrap();
        let received: WorkerReply = read_frame(&mut b).await.unwrap().unwrap();
        assert!(matches!(received.result, Err(TaskError::Compute { .. })));
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected() {
        let (mut a, mut b) = tokio::io::duplex(64);
        let len = (MAX_FRAME_LEN + 1).to_be_bytes();
        tokio::io::AsyncWriteExt::write_all(&mut a, &len).await.unwrap();
        let result: Result<Option<WorkerReply>, _> = read_frame(&mut b).await;
        assert!(matches!(result, Err(EngineError::Protocol(_))));
    }
}
