//! Provides an in-memory implementation of [`PacketConn`]
//!
//! A [`MemoryConn`] holds a queue of inbound packets and records every packet
//! written to it. An optional responder plays the part of the peers on the
//! segment, producing inbound packets in reaction to each write. Clones share
//! the same state, so a test can keep a handle after moving a clone into a
//! client.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
    },
    time::Instant,
};

use crate::error::{RLanProbeError, Result};

use super::{time_remaining, Addr, Deadlines, PacketConn};

/// Function producing the inbound packets a write provokes
pub type Responder = dyn Fn(&[u8], &Addr) -> Vec<(Vec<u8>, Addr)> + Send + Sync;

#[derive(Default)]
struct Queues {
    inbound: VecDeque<(Vec<u8>, Addr)>,
    written: Vec<(Vec<u8>, Addr)>,
}

struct Shared {
    local_addr: Addr,
    queues: Mutex<Queues>,
    arrived: Condvar,
    deadlines: Mutex<Deadlines>,
    closed: AtomicBool,
    responder: Option<Box<Responder>>,
}

/// An in-memory packet transport
///
/// Reads with an empty queue wait for a packet until the read deadline. With
/// no read deadline set, an empty queue fails immediately with
/// [`RLanProbeError::Timeout`] instead of blocking forever.
#[derive(Clone)]
pub struct MemoryConn {
    shared: Arc<Shared>,
}

impl MemoryConn {
    /// Returns a new transport with no responder
    pub fn new(local_addr: Addr) -> Self {
        Self::build(local_addr, None)
    }

    /// Returns a new transport that calls `responder` on every write and
    /// queues whatever it returns
    pub fn with_responder<F>(local_addr: Addr, responder: F) -> Self
    where
        F: Fn(&[u8], &Addr) -> Vec<(Vec<u8>, Addr)> + Send + Sync + 'static,
    {
        Self::build(local_addr, Some(Box::new(responder)))
    }

    fn build(local_addr: Addr, responder: Option<Box<Responder>>) -> Self {
        Self {
            shared: Arc::new(Shared {
                local_addr,
                queues: Mutex::new(Queues::default()),
                arrived: Condvar::new(),
                deadlines: Mutex::new(Deadlines::default()),
                closed: AtomicBool::new(false),
                responder,
            }),
        }
    }

    /// Queues a packet to be returned by a later read
    pub fn push_inbound(&self, packet: Vec<u8>, from: Addr) {
        self.queues().inbound.push_back((packet, from));
        self.shared.arrived.notify_all();
    }

    /// Returns every packet written so far, oldest first
    pub fn written(&self) -> Vec<(Vec<u8>, Addr)> {
        self.queues().written.clone()
    }

    /// Returns the number of packets waiting to be read
    pub fn pending(&self) -> usize {
        self.queues().inbound.len()
    }

    /// Returns true once the transport has been closed
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    fn queues(&self) -> MutexGuard<'_, Queues> {
        self.shared
            .queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn deadlines(&self) -> MutexGuard<'_, Deadlines> {
        self.shared
            .deadlines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // Taking the queue lock before notifying guarantees a reader is either
    // parked on the condvar or has not yet looked at the state we changed
    fn wake_readers(&self) {
        drop(self.queues());
        self.shared.arrived.notify_all();
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(RLanProbeError::Closed);
        }
        Ok(())
    }
}

impl PacketConn for MemoryConn {
    fn read_from(&self, buf: &mut [u8]) -> Result<(usize, Addr)> {
        let mut queues = self.queues();

        loop {
            self.ensure_open()?;

            if let Some((packet, from)) = queues.inbound.pop_front() {
                // like a datagram socket, excess bytes are dropped
                let n = packet.len().min(buf.len());
                buf[..n].copy_from_slice(&packet[..n]);
                return Ok((n, from));
            }

            let deadline = self.deadlines().read;
            let remaining =
                time_remaining(deadline)?.ok_or(RLanProbeError::Timeout)?;

            queues = self
                .shared
                .arrived
                .wait_timeout(queues, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn write_to(&self, buf: &[u8], addr: &Addr) -> Result<usize> {
        self.ensure_open()?;
        time_remaining(self.deadlines().write)?;

        let replies = match &self.shared.responder {
            Some(responder) => responder(buf, addr),
            None => Vec::new(),
        };

        let mut queues = self.queues();
        queues.written.push((buf.to_vec(), *addr));
        queues.inbound.extend(replies);
        drop(queues);

        self.shared.arrived.notify_all();

        Ok(buf.len())
    }

    fn close(&self) -> Result<()> {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return Err(RLanProbeError::Closed);
        }
        self.wake_readers();
        Ok(())
    }

    fn local_addr(&self) -> Addr {
        self.shared.local_addr
    }

    fn set_deadline(&self, deadline: Option<Instant>) -> Result<()> {
        let mut d = self.deadlines();
        d.read = deadline;
        d.write = deadline;
        drop(d);
        self.wake_readers();
        Ok(())
    }

    fn set_read_deadline(&self, deadline: Option<Instant>) -> Result<()> {
        self.deadlines().read = deadline;
        self.wake_readers();
        Ok(())
    }

    fn set_write_deadline(&self, deadline: Option<Instant>) -> Result<()> {
        self.deadlines().write = deadline;
        Ok(())
    }
}

#[cfg(test)]
#[path = "./memory_tests.rs"]
mod tests;
