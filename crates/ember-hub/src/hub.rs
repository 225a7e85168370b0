use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use ember_ids::{ChannelId, ConnectionId, ServerId, UserId};
use ember_protocol::{Envelope, ServerEvent};
use futures::{SinkExt, StreamExt};
use parking_lot::RwLock;
use tokio::sync::{mpsc, Notify};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::registry::{Registry, OUTBOUND_QUEUE_CAPACITY};
use crate::seams::{ConnectionContext, ConnectionLifecycle, IntentRouter, MembershipProvider};

/// Expected client-side heartbeat cadence; the watchdog only enforces
/// [`HEARTBEAT_TIMEOUT`], but this is the interval clients are told to use.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(45);
const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(60);
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);
const PONG_GRACE: Duration = Duration::from_secs(10);
const WATCHDOG_TICK: Duration = Duration::from_secs(5);

enum RegistryCommand {
    Register { id: ConnectionId, user_id: UserId, tx: mpsc::Sender<String> },
    Unregister { id: ConnectionId },
}

/// Single process-wide object owning every live WebSocket connection. Fans
/// out domain events to the correct subset of users and dispatches inbound
/// client ops to the registered [`IntentRouter`].
pub struct Hub {
    registry: Arc<RwLock<Registry>>,
    seq: AtomicU64,
    membership: Arc<dyn MembershipProvider>,
    router: OnceLock<Arc<dyn IntentRouter>>,
    commands: mpsc::UnboundedSender<RegistryCommand>,
    closers: RwLock<std::collections::HashMap<ConnectionId, Arc<Notify>>>,
    lifecycle: Arc<OnceLock<Vec<Arc<dyn ConnectionLifecycle>>>>,
}

impl Hub {
    /// Lifecycle hooks are registered after construction via
    /// [`Self::set_lifecycle_hooks`] rather than taken as a constructor
    /// argument — most hooks (presence, voice auto-leave) need an `Arc<Hub>`
    /// themselves to broadcast from, which doesn't exist until this call
    /// returns.
    pub fn new(membership: Arc<dyn MembershipProvider>) -> Arc<Self> {
        let registry = Arc::new(RwLock::new(Registry::default()));
        let (commands, mut rx) = mpsc::unbounded_channel::<RegistryCommand>();
        let lifecycle: Arc<OnceLock<Vec<Arc<dyn ConnectionLifecycle>>>> = Arc::new(OnceLock::new());

        let task_registry = registry.clone();
        let task_lifecycle = lifecycle.clone();
        tokio::spawn(async move {
            // Single serializing task: first-connect / last-disconnect edges
            // are each observed exactly once, and lifecycle hooks run after
            // the write guard is released.
            while let Some(cmd) = rx.recv().await {
                match cmd {
                    RegistryCommand::Register { id, user_id, tx } => {
                        let first = task_registry.write().insert(id, user_id, tx);
                        if first {
                            if let Some(hooks) = task_lifecycle.get() {
                                for hook in hooks {
                                    hook.on_first_connect(user_id).await;
                                }
                            }
                        }
                    }
                    RegistryCommand::Unregister { id } => {
                        let outcome = task_registry.write().remove(id);
                        if let Some((user_id, last)) = outcome {
                            if last {
                                if let Some(hooks) = task_lifecycle.get() {
                                    for hook in hooks {
                                        hook.on_last_disconnect(user_id).await;
                                    }
                                }
                            }
                        }
                    }
                }
            }
        });

        Arc::new(Self {
            registry,
            seq: AtomicU64::new(0),
            membership,
            router: OnceLock::new(),
            commands,
            closers: RwLock::new(std::collections::HashMap::new()),
            lifecycle,
        })
    }

    /// Registers the single intent router. Called once during startup
    /// wiring, before any connection is accepted.
    pub fn set_intent_router(&self, router: Arc<dyn IntentRouter>) {
        let _ = self.router.set(router);
    }

    /// Registers every connection-lifecycle hook. Called once during startup
    /// wiring, before any connection is accepted.
    pub fn set_lifecycle_hooks(&self, hooks: Vec<Arc<dyn ConnectionLifecycle>>) {
        let _ = self.lifecycle.set(hooks);
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn stamp(&self, event: ServerEvent) -> Envelope {
        Envelope::outbound(event.op_name(), event.to_value(), self.next_seq())
    }

    pub fn is_online(&self, user_id: UserId) -> bool {
        self.registry.read().is_online(user_id)
    }

    /// Snapshot of every user with at least one live connection, for the
    /// `ready` payload sent to a freshly connecting client.
    pub fn online_user_ids(&self) -> Vec<UserId> {
        self.registry.read().all_user_ids()
    }

    async fn fanout(&self, user_ids: Vec<UserId>, event: ServerEvent) {
        let envelope = self.stamp(event);
        let Ok(text) = serde_json::to_string(&envelope) else {
            warn!(op = envelope.op, "failed to serialize outbound event");
            return;
        };

        let registry = self.registry.read();
        let mut slow = Vec::new();
        for user_id in user_ids {
            for id in registry.connections_of(user_id) {
                let Some(sender) = registry.sender(id) else { continue };
                if sender.try_send(text.clone()).is_err() {
                    slow.push(id);
                }
            }
        }
        drop(registry);

        for id in slow {
            debug!(%id, "outbound queue full, scheduling connection for removal");
            self.disconnect_connection(id);
        }
    }

    pub async fn broadcast_to_all(&self, event: ServerEvent) {
        let ids = self.registry.read().all_user_ids();
        self.fanout(ids, event).await;
    }

    pub async fn broadcast_to_server(&self, server_id: ServerId, event: ServerEvent) {
        let ids = self.membership.server_member_ids(server_id).await;
        self.fanout(ids, event).await;
    }

    pub async fn broadcast_to_channel_viewers(&self, channel_id: ChannelId, event: ServerEvent) {
        let ids = self.membership.channel_viewer_ids(channel_id).await;
        self.fanout(ids, event).await;
    }

    pub async fn broadcast_to_user(&self, user_id: UserId, event: ServerEvent) {
        self.fanout(vec![user_id], event).await;
    }

    pub async fn broadcast_to_users(&self, user_ids: &[UserId], event: ServerEvent) {
        self.fanout(user_ids.to_vec(), event).await;
    }

    pub async fn broadcast_to_all_except(&self, exclude: UserId, event: ServerEvent) {
        let ids: Vec<UserId> =
            self.registry.read().all_user_ids().into_iter().filter(|u| *u != exclude).collect();
        self.fanout(ids, event).await;
    }

    /// Forces unregistration of every connection belonging to `user_id`.
    /// Used by ban and kick.
    pub fn disconnect_user(&self, user_id: UserId) {
        for id in self.registry.read().connections_of(user_id) {
            self.disconnect_connection(id);
        }
    }

    fn disconnect_connection(&self, id: ConnectionId) {
        if let Some(notify) = self.closers.read().get(&id) {
            notify.notify_one();
        }
    }

    /// Drives one accepted connection end to end: sends `ready`, registers,
    /// then runs the read/write/watchdog loops until any one exits.
    pub async fn handle_socket(self: Arc<Self>, socket: WebSocket, user_id: UserId, ready: ServerEvent) {
        let (mut ws_tx, mut ws_rx) = socket.split();
        let (tx, mut outbound_rx) = mpsc::channel::<String>(OUTBOUND_QUEUE_CAPACITY);
        let connection_id = ConnectionId::new();

        let ready_envelope = self.stamp(ready);
        let ready_json = match serde_json::to_string(&ready_envelope) {
            Ok(json) => json,
            Err(e) => {
                warn!(%user_id, error = %e, "failed to serialize ready payload");
                return;
            }
        };
        // Ready is sent before registration so no broadcast can race it.
        if ws_tx.send(Message::Text(ready_json)).await.is_err() {
            return;
        }

        let close = Arc::new(Notify::new());
        self.closers.write().insert(connection_id, close.clone());
        let _ = self.commands.send(RegistryCommand::Register { id: connection_id, user_id, tx: tx.clone() });
        info!(%user_id, %connection_id, "connection registered");

        let last_heartbeat = Arc::new(AtomicI64::new(now_millis()));
        let last_pong = Arc::new(AtomicI64::new(now_millis()));

        let write_close = close.clone();
        let mut write_task = tokio::spawn(async move {
            let mut keepalive = tokio::time::interval_at(Instant::now() + KEEPALIVE_INTERVAL, KEEPALIVE_INTERVAL);
            loop {
                tokio::select! {
                    msg = outbound_rx.recv() => match msg {
                        Some(text) => if ws_tx.send(Message::Text(text)).await.is_err() { break },
                        None => break,
                    },
                    _ = keepalive.tick() => {
                        let since_pong = now_millis() - last_pong.load(Ordering::Relaxed);
                        if since_pong > (KEEPALIVE_INTERVAL + PONG_GRACE).as_millis() as i64 {
                            debug!("keepalive pong overdue, closing");
                            break;
                        }
                        if ws_tx.send(Message::Ping(Vec::new())).await.is_err() { break; }
                    }
                    _ = write_close.notified() => break,
                }
            }
            let _ = ws_tx.close().await;
        });

        let read_router = self.router.get().cloned();
        let read_close = close.clone();
        let read_last_heartbeat = last_heartbeat.clone();
        let read_last_pong = last_pong.clone();
        let read_tx = tx.clone();
        let read_hub = self.clone();
        let mut read_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    frame = ws_rx.next() => {
                        match frame {
                            Some(Ok(Message::Text(text))) => {
                                handle_inbound(
                                    &text,
                                    ConnectionContext { connection_id, user_id },
                                    &read_router,
                                    &read_tx,
                                    &read_last_heartbeat,
                                    &read_hub,
                                )
                                .await;
                            }
                            Some(Ok(Message::Pong(_))) => {
                                read_last_pong.store(now_millis(), Ordering::Relaxed);
                            }
                            Some(Ok(Message::Close(_))) | None => break,
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                debug!(%user_id, error = %e, "websocket read error");
                                break;
                            }
                        }
                    }
                    _ = read_close.notified() => break,
                }
            }
        });

        let watchdog_close = close.clone();
        let mut watchdog_task = tokio::spawn(async move {
            let mut tick = tokio::time::interval(WATCHDOG_TICK);
            loop {
                tick.tick().await;
                let elapsed = now_millis() - last_heartbeat.load(Ordering::Relaxed);
                if elapsed > HEARTBEAT_TIMEOUT.as_millis() as i64 {
                    debug!(%user_id, %connection_id, "heartbeat missing, closing connection");
                    watchdog_close.notify_waiters();
                    break;
                }
            }
        });

        tokio::select! {
            _ = &mut write_task => { read_task.abort(); watchdog_task.abort(); }
            _ = &mut read_task => { write_task.abort(); watchdog_task.abort(); }
            _ = &mut watchdog_task => { close.notify_waiters(); write_task.abort(); read_task.abort(); }
        }

        self.closers.write().remove(&connection_id);
        let _ = self.commands.send(RegistryCommand::Unregister { id: connection_id });
        info!(%user_id, %connection_id, "connection unregistered");
    }
}

async fn handle_inbound(
    text: &str,
    ctx: ConnectionContext,
    router: &Option<Arc<dyn IntentRouter>>,
    self_tx: &mpsc::Sender<String>,
    last_heartbeat: &AtomicI64,
    hub: &Hub,
) {
    let Ok(intent) = serde_json::from_str::<ember_protocol::ClientIntent>(text) else {
        return; // malformed frames are dropped, not fatal
    };

    if matches!(intent, ember_protocol::ClientIntent::Heartbeat) {
        last_heartbeat.store(now_millis(), Ordering::Relaxed);
        let ack = hub.stamp(ServerEvent::HeartbeatAck);
        if let Ok(json) = serde_json::to_string(&ack) {
            let _ = self_tx.try_send(json);
        }
        return;
    }

    if let Some(router) = router {
        router.dispatch(ctx, intent).await;
    }
}

fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
