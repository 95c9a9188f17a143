//! Bounded TCP accept.
//!
//! A semaphore caps how many connection tasks exist at once. When every
//! slot is taken the accept call waits and new clients queue in the kernel
//! backlog until a task finishes.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::ListenerConfig;

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// A single accept failed; the listener itself is still usable.
    #[error("Failed to accept: {0}")]
    Accept(#[source] io::Error),

    #[error("Listener closed")]
    Closed,
}

/// One accepted connection and the slot it occupies.
#[derive(Debug)]
pub struct Accepted {
    pub stream: TcpStream,
    pub peer: SocketAddr,
    pub slot: ConnectionSlot,
}

/// Occupied connection slot, released on drop even if the task panics.
#[derive(Debug)]
pub struct ConnectionSlot {
    _permit: OwnedSemaphorePermit,
}

pub struct Listener {
    tcp: TcpListener,
    slots: Arc<Semaphore>,
    capacity: usize,
}

impl Listener {
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let bind_error = |source| ListenerError::Bind {
            addr: config.bind_address.clone(),
            source,
        };
        let addr: SocketAddr = config
            .bind_address
            .parse()
            .map_err(|e| bind_error(io::Error::new(io::ErrorKind::InvalidInput, e)))?;
        let tcp = TcpListener::bind(addr).await.map_err(bind_error)?;
        Ok(Self::from_tcp(tcp, config.max_connections))
    }

    /// Wrap a listener that is already bound, e.g. to port 0 in tests.
    pub fn from_tcp(tcp: TcpListener, capacity: usize) -> Self {
        if let Ok(addr) = tcp.local_addr() {
            tracing::info!(address = %addr, max_connections = capacity, "Listener bound");
        }
        Self {
            tcp,
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a free slot, then for the next client.
    pub async fn accept(&self) -> Result<Accepted, ListenerError> {
        let permit = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| ListenerError::Closed)?;
        let (stream, peer) = self.tcp.accept().await.map_err(ListenerError::Accept)?;
        tracing::debug!(peer_addr = %peer, free_slots = self.slots.available_permits(), "Connection accepted");
        Ok(Accepted {
            stream,
            peer,
            slot: ConnectionSlot { _permit: permit },
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.tcp.local_addr()
    }

    pub fn free_slots(&self) -> usize {
        self.slots.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
