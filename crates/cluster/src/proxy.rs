//! Round-robin connection handoff.
//!
//! The supervisor owns the public listening socket; every accepted
//! connection is relayed bidirectionally to the next ready worker. Workers
//! that are starting, crashed, or halted are skipped; with no ready worker
//! the connection is dropped (the caller sees a refused/reset connection,
//! which is the honest signal).

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::supervisor::SlotShared;
use crate::ClusterError;

/// Public accept socket plus the round-robin cursor.
pub struct Proxy {
    listener: TcpListener,
    local_addr: SocketAddr,
    cursor: AtomicUsize,
}

impl Proxy {
    /// Bind the public endpoint.
    pub async fn bind(addr: &str) -> Result<Self, ClusterError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
            cursor: AtomicUsize::new(0),
        })
    }

    /// The bound address (useful when binding port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept and hand off connections until `shutdown` fires.
    pub(crate) async fn run(
        self,
        slots: Arc<Vec<Arc<SlotShared>>>,
        shutdown: Arc<Notify>,
    ) -> Result<(), ClusterError> {
        info!(addr = %self.local_addr, "accepting connections");
        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    info!("stopped accepting connections");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    let (client, peer) = accepted?;
                    match self.pick_ready(&slots) {
                        Some(port) => {
                            debug!(peer = %peer, port, "handing off connection");
                            tokio::spawn(handoff(client, port));
                        }
                        None => {
                            warn!(peer = %peer, "no ready workers, dropping connection");
                        }
                    }
                }
            }
        }
    }

    /// Next ready worker's port, round-robin.
    fn pick_ready(&self, slots: &[Arc<SlotShared>]) -> Option<u16> {
        let len = slots.len();
        if len == 0 {
            return None;
        }
        let start = self.cursor.fetch_add(1, Ordering::Relaxed);
        for offset in 0..len {
            let slot = &slots[(start + offset) % len];
            if slot.ready.load(Ordering::SeqCst) {
                return Some(slot.port);
            }
        }
        None
    }
}

/// Relay bytes both ways until either side closes.
async fn handoff(mut client: TcpStream, port: u16) {
    match TcpStream::connect(("127.0.0.1", port)).await {
        Ok(mut upstream) => {
            let _ = tokio::io::copy_bidirectional(&mut client, &mut upstream).await;
        }
        Err(e) => {
            warn!(port, error = %e, "upstream connect failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervisor::WorkerProcState;
    use std::sync::atomic::AtomicBool;
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn slot(id: u32, port: u16, ready: bool) -> Arc<SlotShared> {
        Arc::new(SlotShared {
            id,
            port,
            state: Mutex::new(if ready {
                WorkerProcState::Ready
            } else {
                WorkerProcState::Starting
            }),
            ready: AtomicBool::new(ready),
        })
    }

    /// Backend that tags every connection with its one-byte ID.
    async fn tagged_backend(tag: u8) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            loop {
                let Ok((mut conn, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let _ = conn.write_all(&[tag]).await;
                });
            }
        });
        port
    }

    async fn tag_via(proxy_addr: SocketAddr) -> u8 {
        let mut conn = TcpStream::connect(proxy_addr).await.unwrap();
        let mut buf = [0u8; 1];
        conn.read_exact(&mut buf).await.unwrap();
        buf[0]
    }

    #[tokio::test]
    async fn distributes_round_robin_across_ready_workers() {
        let port_a = tagged_backend(b'a').await;
        let port_b = tagged_backend(b'b').await;
        let slots = Arc::new(vec![slot(0, port_a, true), slot(1, port_b, true)]);

        let proxy = Proxy::bind("127.0.0.1:0").await.unwrap();
        let addr = proxy.local_addr();
        let shutdown = Arc::new(Notify::new());
        let server = tokio::spawn(proxy.run(slots, Arc::clone(&shutdown)));

        let mut tags = Vec::new();
        for _ in 0..4 {
            tags.push(tag_via(addr).await);
        }
        tags.sort_unstable();
        assert_eq!(tags, vec![b'a', b'a', b'b', b'b']);

        shutdown.notify_waiters();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn skips_workers_that_are_not_ready() {
        let port_a = tagged_backend(b'a').await;
        let slots = Arc::new(vec![slot(0, 1, false), slot(1, port_a, true)]);

        let proxy = Proxy::bind("127.0.0.1:0").await.unwrap();
        let addr = proxy.local_addr();
        let shutdown = Arc::new(Notify::new());
        let server = tokio::spawn(proxy.run(slots, Arc::clone(&shutdown)));

        for _ in 0..3 {
            assert_eq!(tag_via(addr).await, b'a');
        }

        shutdown.notify_waiters();
        server.await.unwrap().unwrap();
    }
}
