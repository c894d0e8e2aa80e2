//! In-memory transport for tests

use crate::transport::traits::{DatagramConnector, DatagramLink};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

type Inbound = std::result::Result<Vec<u8>, io::ErrorKind>;

/// How the fake drone reacts to one datagram
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Raw(Vec<u8>),
    /// Swallow the command
    Silent,
    /// Fail the send locally
    SendError(io::ErrorKind),
    /// Fail the next receive
    RecvError(io::ErrorKind),
    /// Answer only after the given time
    Delayed(String, Duration),
}

type Responder = dyn Fn(&str) -> MockReply + Send + Sync;

/// Shared record of what happened on the mock transport
pub struct MockRecord {
    sent: Mutex<Vec<(Instant, String)>>,
    connect_attempts: AtomicU32,
}

impl MockRecord {
    /// Commands sent so far, in order
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(_, c)| c.clone()).collect()
    }

    /// When each command was sent
    pub fn sent_at(&self) -> Vec<Instant> {
        self.sent.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }

    pub fn connect_attempts(&self) -> u32 {
        self.connect_attempts.load(Ordering::SeqCst)
    }
}

pub struct MockConnector {
    responder: Arc<Responder>,
    record: Arc<MockRecord>,
    unreachable_for: u32,
    fatal: bool,
}

impl MockConnector {
    pub fn new(responder: impl Fn(&str) -> MockReply + Send + Sync + 'static) -> Self {
        Self {
            responder: Arc::new(responder),
            record: Arc::new(MockRecord {
                sent: Mutex::new(Vec::new()),
                connect_attempts: AtomicU32::new(0),
            }),
            unreachable_for: 0,
            fatal: false,
        }
    }

    /// Answer every command with the same text
    pub fn echo(reply: &str) -> Self {
        let reply = reply.to_string();
        Self::new(move |_| MockReply::Text(reply.clone()))
    }

    /// Report the network unreachable for the first `attempts` connects
    pub fn unreachable_for(mut self, attempts: u32) -> Self {
        self.unreachable_for = attempts;
        self
    }

    /// Fail every connect with a non-recoverable error
    pub fn fatal(mut self) -> Self {
        self.fatal = true;
        self
    }

    pub fn record(&self) -> Arc<MockRecord> {
        self.record.clone()
    }
}

#[async_trait]
impl DatagramConnector for MockConnector {
    async fn connect(&self) -> Result<Box<dyn DatagramLink>> {
        let attempt = self.record.connect_attempts.fetch_add(1, Ordering::SeqCst) + 1;

        if self.fatal {
            return Err(io::Error::new(io::ErrorKind::AddrInUse, "address in use").into());
        }
        if attempt <= self.unreachable_for {
            return Err(io::Error::new(
                io::ErrorKind::NetworkUnreachable,
                "network is unreachable",
            )
            .into());
        }

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Ok(Box::new(MockLink {
            responder: self.responder.clone(),
            record: self.record.clone(),
            inbound_tx,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
        }))
    }

    fn name(&self) -> &'static str {
        "Mock"
    }
}

struct MockLink {
    responder: Arc<Responder>,
    record: Arc<MockRecord>,
    inbound_tx: mpsc::UnboundedSender<Inbound>,
    inbound_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Inbound>>,
}

#[async_trait]
impl DatagramLink for MockLink {
    async fn send(&self, payload: &[u8]) -> Result<()> {
        let command = String::from_utf8_lossy(payload).into_owned();

        let reply = match (self.responder)(&command) {
            MockReply::SendError(kind) => return Err(io::Error::from(kind).into()),
            MockReply::Text(text) => Some(Ok(text.into_bytes())),
            MockReply::Raw(bytes) => Some(Ok(bytes)),
            MockReply::RecvError(kind) => Some(Err(kind)),
            MockReply::Delayed(text, after) => {
                let inbound_tx = self.inbound_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    let _ = inbound_tx.send(Ok(text.into_bytes()));
                });
                None
            }
            MockReply::Silent => None,
        };

        self.record
            .sent
            .lock()
            .unwrap()
            .push((Instant::now(), command));

        if let Some(reply) = reply {
            self.inbound_tx
                .send(reply)
                .map_err(|_| anyhow!("mock link closed"))?;
        }
        Ok(())
    }

    async fn recv(&self) -> Result<Bytes> {
        let mut inbound = self.inbound_rx.lock().await;
        match inbound.recv().await {
            Some(Ok(bytes)) => Ok(Bytes::from(bytes)),
            Some(Err(kind)) => Err(io::Error::from(kind).into()),
            None => Err(anyhow!("mock link closed")),
        }
    }

    fn drain(&self) -> Result<Vec<Bytes>> {
        let mut queued = Vec::new();
        // A receive in progress owns the queue
        let Ok(mut inbound) = self.inbound_rx.try_lock() else {
            return Ok(queued);
        };
        while let Ok(item) = inbound.try_recv() {
            match item {
                Ok(bytes) => queued.push(Bytes::from(bytes)),
                Err(kind) => return Err(io::Error::from(kind).into()),
            }
        }
        Ok(queued)
    }

    fn peer(&self) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 8889))
    }
}
