//! Actor mailboxes for the concurrent model.
//!
//! Every actor owns one unbounded FIFO mailbox. Control envelopes (timer
//! ticks, arm/cancel requests, stop) travel through the same queue as
//! messages, so an actor sees them in arrival order and never concurrently
//! with its own firing.

use crate::messages::Message;
use crate::registry::{ActorId, TimerId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Everything that can land in a mailbox
#[derive(Debug)]
pub enum Envelope {
    /// A wall-clock timer of this actor elapsed
    Tick(TimerId),
    /// Inbound message
    Deliver { from: ActorId, message: Message },
    /// Arm a trigger from outside the actor
    Arm {
        delay: Duration,
        reply: Option<oneshot::Sender<TimerId>>,
    },
    /// Cancel all pending triggers from outside the actor
    CancelTimers { reply: Option<oneshot::Sender<usize>> },
    /// Finish processing and return the actor
    Stop,
}

/// Sending half of an actor mailbox
#[derive(Debug, Clone)]
pub struct Mailbox {
    sender: mpsc::UnboundedSender<Envelope>,
}

/// Receiving half of an actor mailbox
#[derive(Debug)]
pub struct MailboxReceiver {
    receiver: mpsc::UnboundedReceiver<Envelope>,
}

impl Mailbox {
    pub fn new() -> (Self, MailboxReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, MailboxReceiver { receiver })
    }

    /// Non-blocking send; `false` once the receiving actor is gone
    pub fn send(&self, envelope: Envelope) -> bool {
        self.sender.send(envelope).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl MailboxReceiver {
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.receiver.recv().await
    }
}

/// Shared lookup from actor id to mailbox
#[derive(Debug, Clone, Default)]
pub struct MailboxDirectory {
    mailboxes: Arc<RwLock<HashMap<ActorId, Mailbox>>>,
}

impl MailboxDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: ActorId, mailbox: Mailbox) {
        self.mailboxes.write().insert(id, mailbox);
    }

    pub fn remove(&self, id: &ActorId) -> Option<Mailbox> {
        self.mailboxes.write().remove(id)
    }

    pub fn get(&self, id: &ActorId) -> Option<Mailbox> {
        self.mailboxes.read().get(id).cloned()
    }

    /// Send to `id`; `false` if it does not resolve or its mailbox is closed
    pub fn send(&self, id: &ActorId, envelope: Envelope) -> bool {
        match self.mailboxes.read().get(id) {
            Some(mailbox) => mailbox.send(envelope),
            None => false,
        }
    }

    pub fn ids(&self) -> Vec<ActorId> {
        self.mailboxes.read().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.mailboxes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.mailboxes.read().is_empty()
    }
}
