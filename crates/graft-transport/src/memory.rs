//! In-process duplex pipe.
//!
//! Each direction is a byte queue guarded by a mutex and condition variable.
//! Reads block until data arrives or the peer end is dropped or shut down,
//! after which a drained queue reads as end of stream. Writes to a peer that
//! has gone away fail with `BrokenPipe`.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;
use tracing::trace;

#[derive(Debug, Default)]
struct Queue {
    bytes: VecDeque<u8>,
    closed: bool,
}

#[derive(Debug, Default)]
struct Channel {
    queue: Mutex<Queue>,
    ready: Condvar,
}

impl Channel {
    fn lock(&self) -> io::Result<MutexGuard<'_, Queue>> {
        self.queue
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "pipe lock poisoned"))
    }

    fn close(&self) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.closed = true;
        }
        self.ready.notify_all();
    }
}

/// One end of a [`duplex`] pipe.
#[derive(Debug)]
pub struct MemoryTransport {
    rx: Arc<Channel>,
    tx: Arc<Channel>,
    read_timeout: Option<Duration>,
}

/// Create a connected pair of pipe ends.
///
/// ```
/// use graft_transport::memory::duplex;
/// use std::io::{Read, Write};
///
/// let (mut a, mut b) = duplex();
/// a.write_all(b"ping").unwrap();
/// let mut buf = [0u8; 4];
/// b.read_exact(&mut buf).unwrap();
/// assert_eq!(&buf, b"ping");
/// ```
pub fn duplex() -> (MemoryTransport, MemoryTransport) {
    let ab = Arc::new(Channel::default());
    let ba = Arc::new(Channel::default());
    (
        MemoryTransport {
            rx: ba.clone(),
            tx: ab.clone(),
            read_timeout: None,
        },
        MemoryTransport {
            rx: ab,
            tx: ba,
            read_timeout: None,
        },
    )
}

impl MemoryTransport {
    /// Bound how long a read waits for data. `None` waits indefinitely.
    ///
    /// A read that times out fails with `WouldBlock`.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.read_timeout = timeout;
    }

    /// Bytes written by the peer and not yet read.
    pub fn pending(&self) -> usize {
        self.rx.lock().map(|q| q.bytes.len()).unwrap_or(0)
    }

    /// Stop sending. The peer reads end of stream once it drains the queue.
    pub fn shutdown_write(&self) {
        self.tx.close();
    }
}

impl Read for MemoryTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let mut queue = self.rx.lock()?;
        while queue.bytes.is_empty() && !queue.closed {
            queue = match self.read_timeout {
                None => self
                    .rx
                    .ready
                    .wait(queue)
                    .map_err(|_| io::Error::new(io::ErrorKind::Other, "pipe lock poisoned"))?,
                Some(timeout) => {
                    let (queue, waited) = self
                        .rx
                        .ready
                        .wait_timeout(queue, timeout)
                        .map_err(|_| io::Error::new(io::ErrorKind::Other, "pipe lock poisoned"))?;
                    if waited.timed_out() && queue.bytes.is_empty() && !queue.closed {
                        return Err(io::ErrorKind::WouldBlock.into());
                    }
                    queue
                }
            };
        }

        let n = buf.len().min(queue.bytes.len());
        for (slot, byte) in buf.iter_mut().zip(queue.bytes.drain(..n)) {
            *slot = byte;
        }
        trace!(bytes = n, "pipe read");
        Ok(n)
    }
}

impl Write for MemoryTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut queue = self.tx.lock()?;
        if queue.closed {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        queue.bytes.extend(buf);
        drop(queue);
        self.tx.ready.notify_all();
        trace!(bytes = buf.len(), "pipe write");
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        self.tx.close();
        self.rx.close();
    }
}
