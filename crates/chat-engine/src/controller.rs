//! Session lifecycle controller
//!
//! Owns at most one active session per engine instance. Mediates
//! between the transport binding and the message log, and pushes
//! `SessionUpdate`s to the registered subscriber.
//!
//! Every session carries a generation tag; inbound events are stamped
//! with the generation they were opened under and discarded if the
//! session has since been torn down, so a mid-flight user switch can
//! never leak messages from the old session into the new log.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use chat_core::{ChatMessage, DeliveryStatus, Error, MessageLog, Result, Snapshot};

use crate::observer::{ObserverSlot, UpdateHandler};
use crate::transport::{
    InboundEvent, InboundMessage, OutboundRequest, Transport, TransportConnection,
};

/// Connection lifecycle state of the active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Unit pushed to the subscriber: the full snapshot plus connection
/// state and the last transport fault, if any.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdate {
    #[serde(flatten)]
    pub snapshot: Snapshot,
    pub connection_state: ConnectionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One live session: identity, connection state, log and the handles
/// kept from the transport connection.
struct ActiveSession {
    user_id: String,
    state: ConnectionState,
    log: MessageLog,
    requests: Option<tokio::sync::mpsc::UnboundedSender<OutboundRequest>>,
    close: Option<tokio::sync::oneshot::Sender<()>>,
    error: Option<String>,
}

struct Inner {
    /// Bumped on every session change; stale events carry an old value
    generation: u64,
    /// Bumped on every emitted update; delivery drops superseded ones
    seq: u64,
    session: Option<ActiveSession>,
    observer: ObserverSlot,
}

/// State shared with the spawned open and pump tasks.
struct Shared {
    inner: Mutex<Inner>,
    /// Sequence of the last update handed to the subscriber
    delivered: Mutex<u64>,
}

/// The engine's public surface.
///
/// All methods are synchronous and non-blocking; transport open/close
/// runs on spawned tasks and the resulting transitions are observed
/// through emitted updates. Must be used from within a tokio runtime.
pub struct SessionController {
    transport: Arc<dyn Transport>,
    shared: Arc<Shared>,
}

/// Handler, update and sequence number, all captured inside the same
/// critical section as the mutation and delivered after the state
/// lock is released.
type PendingNotify = (Option<Arc<UpdateHandler>>, SessionUpdate, u64);

impl SessionController {
    /// Create a controller over the given transport
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    generation: 0,
                    seq: 0,
                    session: None,
                    observer: ObserverSlot::new(),
                }),
                delivered: Mutex::new(0),
            }),
        }
    }

    /// Start a session for `user_id`.
    ///
    /// A live session for the same user is left untouched. Any other
    /// session is torn down first: its transport is asked to close
    /// (best-effort) and its pending events are discarded by the
    /// generation check. Returns immediately; the connection attempt
    /// runs on a spawned task.
    pub fn start(&self, user_id: &str) {
        let generation;
        let pending = {
            let mut guard = self.shared.inner.lock().unwrap();
            if let Some(session) = &guard.session {
                if session.user_id == user_id && session.state != ConnectionState::Disconnected {
                    debug!("Session already active for user: {}", user_id);
                    return;
                }
            }
            Self::teardown(&mut guard);
            guard.generation += 1;
            generation = guard.generation;
            guard.session = Some(ActiveSession {
                user_id: user_id.to_string(),
                state: ConnectionState::Connecting,
                log: MessageLog::new(),
                requests: None,
                close: None,
                error: None,
            });
            info!("Starting session for user: {}", user_id);
            Self::pending_notify(&mut guard)
        };
        Self::deliver(&self.shared, pending);

        let transport = Arc::clone(&self.transport);
        let shared = Arc::clone(&self.shared);
        let user_id = user_id.to_string();
        tokio::spawn(async move {
            match transport.open(&user_id).await {
                Ok(conn) => Self::attach(&shared, generation, conn),
                Err(e) => {
                    warn!("Failed to open transport for {}: {}", user_id, e);
                    let pending = {
                        let mut guard = shared.inner.lock().unwrap();
                        if guard.generation != generation {
                            return;
                        }
                        if let Some(session) = guard.session.as_mut() {
                            session.state = ConnectionState::Disconnected;
                            session.error = Some(e.to_string());
                        }
                        Self::pending_notify(&mut guard)
                    };
                    Self::deliver(&shared, pending);
                }
            }
        });
    }

    /// Tear down the active session, if any.
    ///
    /// Close is best-effort; the log is discarded and one final empty
    /// disconnected update is emitted. Safe to call when idle.
    pub fn stop(&self) {
        let pending = {
            let mut guard = self.shared.inner.lock().unwrap();
            if guard.session.is_none() {
                return;
            }
            Self::teardown(&mut guard);
            guard.generation += 1;
            Self::pending_notify(&mut guard)
        };
        Self::deliver(&self.shared, pending);
    }

    /// Forward a message to the backend.
    ///
    /// The controller does not append optimistically; the
    /// authoritative copy comes back through the inbound stream and
    /// the log's dedup rule absorbs redelivery.
    pub fn send_message(&self, text: &str, username: &str) -> Result<()> {
        if username.trim().is_empty() {
            return Err(Error::InvalidInput("no username specified".to_string()));
        }
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("empty message text".to_string()));
        }

        let guard = self.shared.inner.lock().unwrap();
        let session = guard.session.as_ref().ok_or(Error::NoActiveSession)?;
        if session.state != ConnectionState::Connected {
            return Err(Error::NoActiveSession);
        }
        let requests = session.requests.as_ref().ok_or(Error::NoActiveSession)?;
        requests
            .send(OutboundRequest::Message {
                text: text.to_string(),
                username: username.to_string(),
            })
            .map_err(|_| Error::NoActiveSession)
    }

    /// Zero the unread counter and notify the backend.
    ///
    /// Silent no-op without an active session.
    pub fn mark_all_as_read(&self) {
        let pending = {
            let mut guard = self.shared.inner.lock().unwrap();
            let Some(session) = guard.session.as_mut() else {
                debug!("Mark-all-as-read with no active session");
                return;
            };
            session.log.mark_all_as_read();
            if let Some(requests) = &session.requests {
                if requests.send(OutboundRequest::ReadReceipt).is_err() {
                    debug!("Read receipt not sent; transport gone");
                }
            }
            Self::pending_notify(&mut guard)
        };
        Self::deliver(&self.shared, pending);
    }

    /// Register the subscriber, replacing any previous one.
    ///
    /// The current update is delivered synchronously so a late
    /// subscriber catches up without waiting for the next event.
    pub fn subscribe(&self, handler: impl Fn(SessionUpdate) + Send + Sync + 'static) {
        let handler: Arc<UpdateHandler> = Arc::new(handler);
        let pending = {
            let mut guard = self.shared.inner.lock().unwrap();
            guard.observer.set(Arc::clone(&handler));
            guard.seq += 1;
            (Some(handler), Self::current_update(&guard), guard.seq)
        };
        Self::deliver(&self.shared, pending);
    }

    /// Deregister the subscriber; later emissions are dropped silently
    pub fn unsubscribe(&self) {
        self.shared.inner.lock().unwrap().observer.clear();
    }

    /// Connection state of the active session (`Disconnected` if none)
    pub fn connection_state(&self) -> ConnectionState {
        let guard = self.shared.inner.lock().unwrap();
        guard.session.as_ref().map(|s| s.state).unwrap_or_default()
    }

    /// User the active session is scoped to, if any
    pub fn active_user(&self) -> Option<String> {
        let guard = self.shared.inner.lock().unwrap();
        guard.session.as_ref().map(|s| s.user_id.clone())
    }

    /// Current snapshot of the active session's log (empty if none)
    pub fn snapshot(&self) -> Snapshot {
        let guard = self.shared.inner.lock().unwrap();
        guard
            .session
            .as_ref()
            .map(|s| s.log.snapshot())
            .unwrap_or_default()
    }

    /// Hand an opened connection to the session it was opened for.
    ///
    /// If that session was torn down while the open was in flight, the
    /// connection is closed and dropped instead.
    fn attach(shared: &Arc<Shared>, generation: u64, conn: TransportConnection) {
        let TransportConnection {
            events,
            requests,
            close,
        } = conn;

        let pending = {
            let mut guard = shared.inner.lock().unwrap();
            let stale = guard.generation != generation;
            let Some(session) = guard.session.as_mut().filter(|_| !stale) else {
                debug!("Closing connection opened for a superseded session");
                if close.send(()).is_err() {
                    debug!("Transport already gone on close");
                }
                return;
            };
            session.state = ConnectionState::Connected;
            session.requests = Some(requests);
            session.close = Some(close);
            session.error = None;
            info!("Session connected for user: {}", session.user_id);
            Self::pending_notify(&mut guard)
        };
        Self::deliver(shared, pending);

        // Inbound pump: one task per connection, ends when the event
        // stream closes or the session is superseded.
        let shared = Arc::clone(shared);
        tokio::spawn(async move {
            let mut events = events;
            while let Some(event) = events.recv().await {
                if !Self::handle_event(&shared, generation, event) {
                    break;
                }
            }
            debug!("Inbound pump ended");
        });
    }

    /// Apply one inbound event. Returns `false` when the pump should end.
    fn handle_event(shared: &Arc<Shared>, generation: u64, event: InboundEvent) -> bool {
        let mut guard = shared.inner.lock().unwrap();
        if guard.generation != generation {
            debug!("Dropping event from superseded session");
            return false;
        }
        let Some(session) = guard.session.as_mut() else {
            return false;
        };

        let pending = match event {
            InboundEvent::Message(raw) => {
                let message = match validate_inbound(raw) {
                    Ok(message) => message,
                    Err(e) => {
                        warn!("Dropping malformed inbound message: {}", e);
                        return true;
                    }
                };
                if !session.log.append(message) {
                    return true;
                }
                Self::pending_notify(&mut guard)
            }
            InboundEvent::Delivered { delivery_id } => {
                if !session
                    .log
                    .update_status(&delivery_id, DeliveryStatus::ReceivedByServer)
                {
                    return true;
                }
                Self::pending_notify(&mut guard)
            }
            InboundEvent::Closed { reason } => {
                info!(
                    "Transport closed for user {}: {}",
                    session.user_id,
                    reason.as_deref().unwrap_or("clean close")
                );
                session.state = ConnectionState::Disconnected;
                session.error = reason;
                session.requests = None;
                session.close = None;
                let pending = Self::pending_notify(&mut guard);
                drop(guard);
                Self::deliver(shared, pending);
                return false;
            }
        };
        drop(guard);
        Self::deliver(shared, pending);
        true
    }

    /// Request close on the active session and drop it
    fn teardown(guard: &mut Inner) {
        if let Some(mut session) = guard.session.take() {
            info!("Tearing down session for user: {}", session.user_id);
            if let Some(close) = session.close.take() {
                if close.send(()).is_err() {
                    debug!("Transport already gone on close");
                }
            }
        }
    }

    fn current_update(guard: &Inner) -> SessionUpdate {
        match &guard.session {
            Some(session) => SessionUpdate {
                snapshot: session.log.snapshot(),
                connection_state: session.state,
                error: session.error.clone(),
            },
            None => SessionUpdate::default(),
        }
    }

    fn pending_notify(guard: &mut Inner) -> PendingNotify {
        guard.seq += 1;
        (guard.observer.get(), Self::current_update(guard), guard.seq)
    }

    /// Hand an update to the subscriber, keeping deliveries in
    /// sequence order.
    ///
    /// Updates are computed under the state lock but delivered outside
    /// it, so two emitters can race here; an update that lost the race
    /// to a newer one is dropped (snapshots are full views, so the
    /// newer update subsumes it). The handler runs under the delivery
    /// lock and must not call back into the controller.
    fn deliver(shared: &Shared, (handler, update, seq): PendingNotify) {
        let Some(handler) = handler else {
            return;
        };
        let mut delivered = shared.delivered.lock().unwrap();
        if seq <= *delivered {
            debug!("Dropping superseded update");
            return;
        }
        *delivered = seq;
        handler(update);
    }
}

/// Reject inbound messages that would corrupt the log.
fn validate_inbound(raw: InboundMessage) -> Result<ChatMessage> {
    if raw.text.trim().is_empty() {
        return Err(Error::Protocol("empty message text".to_string()));
    }
    Ok(ChatMessage {
        delivery_id: raw.delivery_id,
        text: raw.text,
        username: raw.username,
        created_at: raw.created_at,
        is_sent: raw.is_own,
        status: DeliveryStatus::None,
    })
}
