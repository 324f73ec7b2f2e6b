//! Per-room event fan-out.
//!
//! Events are serialized once conceptually (`Arc`-shared frames) and
//! enqueued onto each subscriber's bounded channel with `try_send`; the
//! room task never blocks on a slow socket. A full queue means the
//! consumer cannot keep up: the subscriber is dropped and the caller
//! handles it as a disconnect. Per-subscriber ordering follows publish
//! order because one task does all the publishing.

use std::sync::Arc;

use crate::protocol::{ConnectionId, EventFrame, GamePhase, ServerMessage};
use crate::room::command::EventSender;

/// Audience class of one subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberRole {
    /// Singleton; receives everything public plus organizer-only events.
    Organizer,
    /// Receives public events plus its own private events.
    Player,
    /// Receives public state summaries only.
    Spectator,
}

#[derive(Debug)]
struct Subscriber {
    conn_id: ConnectionId,
    role: SubscriberRole,
    sender: EventSender,
}

/// Fan-out table for one room.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, conn_id: ConnectionId, role: SubscriberRole, sender: EventSender) {
        // A conn_id resubscribing replaces its previous entry.
        self.subscribers.retain(|s| s.conn_id != conn_id);
        self.subscribers.push(Subscriber {
            conn_id,
            role,
            sender,
        });
    }

    /// Dropping the sender ends the connection's writer task, which closes
    /// the socket once the already-queued frames have flushed.
    pub fn remove(&mut self, conn_id: ConnectionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.conn_id != conn_id);
        self.subscribers.len() != before
    }

    pub fn contains(&self, conn_id: ConnectionId) -> bool {
        self.subscribers.iter().any(|s| s.conn_id == conn_id)
    }

    pub fn role_of(&self, conn_id: ConnectionId) -> Option<SubscriberRole> {
        self.subscribers
            .iter()
            .find(|s| s.conn_id == conn_id)
            .map(|s| s.role)
    }

    pub fn count_role(&self, role: SubscriberRole) -> usize {
        self.subscribers.iter().filter(|s| s.role == role).count()
    }

    /// Publishes to every subscriber. Returns the connections whose queue
    /// overflowed or whose writer is gone; the caller must treat those as
    /// disconnects.
    pub fn publish_all(&mut self, phase: GamePhase, message: ServerMessage) -> Vec<ConnectionId> {
        self.publish_where(phase, message, |_| true)
    }

    /// Publishes to every subscriber except one connection (roster changes
    /// are announced to everyone but the participant who caused them).
    pub fn publish_all_except(
        &mut self,
        phase: GamePhase,
        message: ServerMessage,
        excluded: ConnectionId,
    ) -> Vec<ConnectionId> {
        let mut dropped = Vec::new();
        let frame = Arc::new(EventFrame::new(phase, message));
        for subscriber in &self.subscribers {
            if subscriber.conn_id == excluded {
                continue;
            }
            if subscriber.sender.try_send(Arc::clone(&frame)).is_err() {
                dropped.push(subscriber.conn_id);
            }
        }
        for conn_id in &dropped {
            self.remove(*conn_id);
        }
        dropped
    }

    /// Publishes to the organizer and spectators only (answer tallies and
    /// other telemetry the players must not see mid-question).
    pub fn publish_observers(
        &mut self,
        phase: GamePhase,
        message: ServerMessage,
    ) -> Vec<ConnectionId> {
        self.publish_where(phase, message, |role| {
            matches!(role, SubscriberRole::Organizer | SubscriberRole::Spectator)
        })
    }

    /// Publishes to players and spectators (everyone but the organizer).
    pub fn publish_audience(
        &mut self,
        phase: GamePhase,
        message: ServerMessage,
    ) -> Vec<ConnectionId> {
        self.publish_where(phase, message, |role| {
            matches!(role, SubscriberRole::Player | SubscriberRole::Spectator)
        })
    }

    fn publish_where(
        &mut self,
        phase: GamePhase,
        message: ServerMessage,
        include: impl Fn(SubscriberRole) -> bool,
    ) -> Vec<ConnectionId> {
        let frame = Arc::new(EventFrame::new(phase, message));
        let mut overflowed = Vec::new();
        for subscriber in &self.subscribers {
            if !include(subscriber.role) {
                continue;
            }
            if subscriber.sender.try_send(Arc::clone(&frame)).is_err() {
                overflowed.push(subscriber.conn_id);
            }
        }
        for conn_id in &overflowed {
            self.remove(*conn_id);
        }
        overflowed
    }

    /// Sends a private event to a single connection. Returns false when
    /// the subscriber is unknown or its queue rejected the frame (the
    /// subscriber is removed in the latter case).
    pub fn send_to(
        &mut self,
        conn_id: ConnectionId,
        phase: GamePhase,
        message: ServerMessage,
    ) -> bool {
        let frame = Arc::new(EventFrame::new(phase, message));
        let Some(subscriber) = self.subscribers.iter().find(|s| s.conn_id == conn_id) else {
            return false;
        };
        if subscriber.sender.try_send(frame).is_err() {
            self.remove(conn_id);
            return false;
        }
        true
    }

    /// Drops every subscriber (room close). Queued frames still flush.
    pub fn clear(&mut self) {
        self.subscribers.clear();
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
