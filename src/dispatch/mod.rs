//! Dispatch core
//!
//! The [`Dispatcher`] routes decoded messages from any number of adapters to
//! user callbacks. It owns:
//!
//! - the callback registry, one slot per [`SensorKind`] (last registration wins)
//! - a session per connection, with statistics and a lifecycle state
//! - process-wide counters shared by every adapter
//!
//! ## Guarantees
//!
//! - Messages of one connection reach callbacks in arrival order; the next
//!   message waits for the previous callback, including suspending ones.
//! - Different connections are dispatched concurrently.
//! - Decode failures, callback errors and callback panics are reported to the
//!   `on_error` hook and never end the connection.
//! - After [`Dispatcher::disconnect`], further messages for that connection
//!   are dropped. A callback already running is allowed to finish.
//!
//! A callback must not dispatch to its own connection: the connection's turn
//! is held while it runs.
//!
//! ## Usage Example
//!
//! ```rust
//! use arvos::dispatch::{DispatchOutcome, Dispatcher};
//! use arvos::decode::InboundFrame;
//! use arvos::types::{ConnectionId, ImuData};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let dispatcher = Dispatcher::builder()
//!     .on::<ImuData, _>(|client, imu| {
//!         println!("{}: accel z = {}", client, imu.linear_acceleration[2]);
//!         Ok(())
//!     })
//!     .on_error(|error, context| eprintln!("{}: {}", context.connection_id, error))
//!     .build();
//!
//! let client = ConnectionId::from("192.168.1.20:53211");
//! dispatcher.connect(&client);
//!
//! let frame = InboundFrame::Text(
//!     r#"{"type":"imu","timestampNs":1,"angularVelocity":[0,0,0],"linearAcceleration":[0,0,-9.8]}"#.into(),
//! );
//! assert_eq!(dispatcher.ingest(&client, frame).await, DispatchOutcome::Delivered);
//!
//! let stats = dispatcher.disconnect(&client).unwrap();
//! assert_eq!(stats.messages_received, 1);
//! # }
//! ```

mod callback;
mod registry;
mod session;
mod stats;

pub use callback::{Callback, CallbackResult, ConnectionHook, ErrorContext, ErrorHook};
pub use session::{ConnectionState, ConnectionStats};
pub use stats::{GlobalStats, GlobalStatsSnapshot};

use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use self::callback::panic_message;
use self::registry::CallbackRegistry;
use self::session::Session;
use crate::ArvosError;
use crate::config::{DecoderConfig, DispatchConfig, SdkConfig};
use crate::decode::{Decoded, InboundFrame, MessageDecoder};
use crate::types::{ConnectionId, SensorKind, SensorMessage, SensorSample};

/// What happened to one dispatched message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchOutcome {
    /// The registered callback ran and returned `Ok`.
    Delivered,
    /// No callback is registered for the message kind.
    NoCallback,
    /// The connection is disconnected; nothing was counted or delivered.
    Dropped,
    /// The frame could not be decoded; `on_error` was notified.
    DecodeFailed,
    /// The callback returned an error or panicked; `on_error` was notified.
    CallbackFailed,
}

/// Remembers recently closed connections so that late messages are dropped
/// rather than re-creating a session.
#[derive(Debug)]
struct ClosedConnections {
    order: VecDeque<ConnectionId>,
    members: HashSet<ConnectionId>,
    capacity: usize,
}

impl ClosedConnections {
    fn new(capacity: usize) -> Self {
        Self { order: VecDeque::new(), members: HashSet::new(), capacity }
    }

    fn insert(&mut self, id: ConnectionId) {
        if self.capacity == 0 || !self.members.insert(id.clone()) {
            return;
        }
        self.order.push_back(id);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
    }

    fn remove(&mut self, id: &ConnectionId) {
        if self.members.remove(id) {
            self.order.retain(|closed| closed != id);
        }
    }

    fn contains(&self, id: &ConnectionId) -> bool {
        self.members.contains(id)
    }
}

struct Inner {
    registry: RwLock<CallbackRegistry>,
    sessions: RwLock<HashMap<ConnectionId, Arc<Session>>>,
    closed: Mutex<ClosedConnections>,
    decoder: MessageDecoder,
    stats: GlobalStats,
}

/// Routes decoded messages to callbacks.
///
/// Cloning is cheap and every clone shares the same state, so one dispatcher
/// can be handed to several adapters.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("callbacks", &self.inner.registry.read().kinds())
            .field("connections", &self.inner.sessions.read().len())
            .finish()
    }
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// Install `callback` for `kind`, returning the callback it replaces.
    pub fn register(&self, kind: SensorKind, callback: Callback) -> Option<Callback> {
        debug!("Registering {} callback for {}", if callback.is_suspending() { "async" } else { "sync" }, kind);
        self.inner.registry.write().register(kind, callback)
    }

    pub fn unregister(&self, kind: SensorKind) -> Option<Callback> {
        self.inner.registry.write().unregister(kind)
    }

    /// Register a synchronous callback for the record type `T`.
    pub fn on<T, F>(&self, f: F) -> Option<Callback>
    where
        T: SensorSample,
        F: Fn(&ConnectionId, T) -> CallbackResult + Send + Sync + 'static,
    {
        self.register(T::KIND, Callback::typed(f))
    }

    /// Register a suspending callback for the record type `T`.
    pub fn on_async<T, F, Fut>(&self, f: F) -> Option<Callback>
    where
        T: SensorSample,
        F: Fn(ConnectionId, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CallbackResult> + Send + 'static,
    {
        self.register(T::KIND, Callback::typed_async(f))
    }

    /// Kinds that currently have a callback.
    pub fn registered_kinds(&self) -> Vec<SensorKind> {
        self.inner.registry.read().kinds()
    }

    /// Start a session for `id`.
    ///
    /// Connecting an id that is already connected is a no-op. Connecting an
    /// id that was disconnected starts a fresh session.
    pub fn connect(&self, id: &ConnectionId) {
        if let Some((_, true)) = self.open_session(id, true) {
            info!("Client connected: {}", id);
        }
    }

    /// End the session for `id` and return its final statistics.
    ///
    /// Returns `None` if `id` had no session.
    pub fn disconnect(&self, id: &ConnectionId) -> Option<ConnectionStats> {
        // Tombstone and removal happen under the sessions write lock so a
        // concurrent message cannot recreate the session in between.
        let stats = {
            let mut sessions = self.inner.sessions.write();
            let session = sessions.remove(id)?;
            self.inner.closed.lock().insert(id.clone());
            session.close()
        };
        self.inner.stats.client_disconnected();

        info!(
            "Client disconnected: {} ({} messages, {} bytes)",
            id, stats.messages_received, stats.bytes_received
        );

        let hook = self.inner.registry.read().on_disconnect.clone();
        if let Some(hook) = hook {
            run_hook("on_disconnect", || hook(id));
        }
        Some(stats)
    }

    /// Route an already decoded message.
    ///
    /// `wire_size` is the size of the transport frame the message came from.
    pub async fn dispatch(
        &self,
        id: &ConnectionId,
        message: SensorMessage,
        wire_size: usize,
    ) -> DispatchOutcome {
        self.process(id, wire_size, move || Ok(Decoded::from(message))).await
    }

    /// Decode a transport frame and route the result.
    pub async fn ingest(&self, id: &ConnectionId, frame: InboundFrame) -> DispatchOutcome {
        let decoder = self.inner.decoder;
        let wire_size = frame.len();
        self.process(id, wire_size, move || decoder.decode(&frame)).await
    }

    /// Statistics of a live connection.
    pub fn connection_stats(&self, id: &ConnectionId) -> Option<ConnectionStats> {
        self.inner.sessions.read().get(id).map(|session| session.stats())
    }

    pub fn connections(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<_> = self.inner.sessions.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn connected_clients(&self) -> usize {
        self.inner.sessions.read().len()
    }

    pub fn stats(&self) -> GlobalStatsSnapshot {
        self.inner.stats.snapshot()
    }

    async fn process<F>(&self, id: &ConnectionId, wire_size: usize, decode: F) -> DispatchOutcome
    where
        F: FnOnce() -> crate::Result<Decoded>,
    {
        let Some(session) = self.session_for(id) else {
            warn!("Dropping message for disconnected client {}", id);
            return DispatchOutcome::Dropped;
        };

        let _turn = session.turn().await;
        if session.is_closed() {
            warn!("Dropping message for disconnected client {}", id);
            return DispatchOutcome::Dropped;
        }

        self.inner.stats.record_message(wire_size);

        let decoded = match decode() {
            Ok(decoded) => decoded,
            Err(e) => {
                session.record_decode_error(wire_size);
                warn!("Dropping undecodable message from {}: {}", id, e);
                self.report_error(&e, ErrorContext { connection_id: id.clone(), kind: None });
                return DispatchOutcome::DecodeFailed;
            }
        };
        session.record_message(wire_size, &decoded);

        let kind = decoded.message.kind();
        let callback = self.inner.registry.read().get(kind);
        let Some(callback) = callback else {
            trace!("No callback for {} from {}", kind, id);
            return DispatchOutcome::NoCallback;
        };

        match callback.invoke(&session.id, decoded.message).await {
            Ok(()) => DispatchOutcome::Delivered,
            Err(e) => {
                session.record_callback_error();
                warn!("{} callback failed for {}: {:#}", kind, id, e);
                self.report_error(&e, ErrorContext { connection_id: id.clone(), kind: Some(kind) });
                DispatchOutcome::CallbackFailed
            }
        }
    }

    /// Live session for `id`, created on first use unless `id` was closed.
    fn session_for(&self, id: &ConnectionId) -> Option<Arc<Session>> {
        if let Some(session) = self.inner.sessions.read().get(id) {
            return Some(Arc::clone(session));
        }

        let (session, created) = self.open_session(id, false)?;
        if created {
            debug!("Created session for {} on first message", id);
        }
        Some(session)
    }

    /// Get or create the session for `id`. The flag is true if it was created.
    ///
    /// A closed `id` is only reopened when `reopen` is set; otherwise `None`.
    /// The tombstone check runs under the sessions write lock, the same lock
    /// `disconnect` holds while it tombstones.
    fn open_session(&self, id: &ConnectionId, reopen: bool) -> Option<(Arc<Session>, bool)> {
        let (session, created) = {
            let mut sessions = self.inner.sessions.write();
            match sessions.get(id) {
                Some(session) => (Arc::clone(session), false),
                None => {
                    let mut closed = self.inner.closed.lock();
                    if reopen {
                        closed.remove(id);
                    } else if closed.contains(id) {
                        return None;
                    }
                    drop(closed);

                    let session = Arc::new(Session::new(id.clone()));
                    sessions.insert(id.clone(), Arc::clone(&session));
                    (session, true)
                }
            }
        };

        if created {
            self.inner.stats.client_connected();
            let hook = self.inner.registry.read().on_connect.clone();
            if let Some(hook) = hook {
                run_hook("on_connect", || hook(id));
            }
        }
        Some((session, created))
    }

    fn report_error(&self, error: &ArvosError, context: ErrorContext) {
        self.inner.stats.record_error();
        let hook = self.inner.registry.read().on_error.clone();
        if let Some(hook) = hook {
            run_hook("on_error", || hook(error, &context));
        }
    }
}

fn run_hook(name: &str, hook: impl FnOnce()) {
    if let Err(panic) = catch_unwind(AssertUnwindSafe(hook)) {
        warn!("{} hook panicked: {}", name, panic_message(panic.as_ref()));
    }
}

/// Builder for [`Dispatcher`].
#[derive(Default)]
pub struct DispatcherBuilder {
    registry: CallbackRegistry,
    decoder: DecoderConfig,
    dispatch: DispatchConfig,
}

impl DispatcherBuilder {
    pub fn callback(mut self, kind: SensorKind, callback: Callback) -> Self {
        self.registry.register(kind, callback);
        self
    }

    pub fn on<T, F>(self, f: F) -> Self
    where
        T: SensorSample,
        F: Fn(&ConnectionId, T) -> CallbackResult + Send + Sync + 'static,
    {
        self.callback(T::KIND, Callback::typed(f))
    }

    pub fn on_async<T, F, Fut>(self, f: F) -> Self
    where
        T: SensorSample,
        F: Fn(ConnectionId, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CallbackResult> + Send + 'static,
    {
        self.callback(T::KIND, Callback::typed_async(f))
    }

    pub fn on_connect(mut self, f: impl Fn(&ConnectionId) + Send + Sync + 'static) -> Self {
        self.registry.on_connect = Some(Arc::new(f));
        self
    }

    pub fn on_disconnect(mut self, f: impl Fn(&ConnectionId) + Send + Sync + 'static) -> Self {
        self.registry.on_disconnect = Some(Arc::new(f));
        self
    }

    pub fn on_error(
        mut self,
        f: impl Fn(&ArvosError, &ErrorContext) + Send + Sync + 'static,
    ) -> Self {
        self.registry.on_error = Some(Arc::new(f));
        self
    }

    pub fn decoder_config(mut self, config: DecoderConfig) -> Self {
        self.decoder = config;
        self
    }

    pub fn dispatch_config(mut self, config: DispatchConfig) -> Self {
        self.dispatch = config;
        self
    }

    /// Apply the decoder and dispatch sections of `config`.
    pub fn config(self, config: &SdkConfig) -> Self {
        self.decoder_config(config.decoder.clone()).dispatch_config(config.dispatch.clone())
    }

    pub fn build(self) -> Dispatcher {
        Dispatcher {
            inner: Arc::new(Inner {
                registry: RwLock::new(self.registry),
                sessions: RwLock::new(HashMap::new()),
                closed: Mutex::new(ClosedConnections::new(self.dispatch.closed_connection_memory)),
                decoder: MessageDecoder::new(&self.decoder),
                stats: GlobalStats::default(),
            }),
        }
    }
}
