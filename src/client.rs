//! Connection lifecycle and the client handle.
//!
//! One `BanchoClient` owns one long-lived gateway connection: the state
//! machine, the reader task feeding the router, the identity cache, the
//! rate limiter, and the event stream. Handles are cheap clones sharing
//! the same state.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, trace, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::events::Event;
use crate::handlers::Registry;
use crate::irc::line::LineCodec;
use crate::irc::router::Router;
use crate::limits::MessageLimiter;
use crate::lookup::{HttpLookup, UserLookup};
use crate::state::{Channel, Directory, User, names};

/// Lifecycle states of the gateway connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Reconnecting,
    Connected,
}

const EVENT_BUFFER: usize = 256;

type LineWriter = FramedWrite<OwnedWriteHalf, LineCodec>;
type LineReader = FramedRead<OwnedReadHalf, LineCodec>;

/// Handle to one gateway client.
#[derive(Clone)]
pub struct BanchoClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: Config,
    /// Normalized spelling of our own name, for self-detection in traffic.
    own_key: String,
    directory: Directory,
    limiter: MessageLimiter,
    router: Router,
    lookup: Option<Arc<dyn UserLookup>>,
    events: broadcast::Sender<Event>,
    conn: Mutex<ConnState>,
    writer: tokio::sync::Mutex<Option<LineWriter>>,
}

struct ConnState {
    state: ConnectionState,
    /// Monotonic transport generation. Loss signals carry the generation
    /// they observed; stale ones no-op, which collapses duplicate close
    /// notifications into a single transition.
    generation: u64,
    connect_waiter: Option<oneshot::Sender<Result<()>>>,
    reconnect_timer: Option<JoinHandle<()>>,
    reader: Option<JoinHandle<()>>,
}

impl BanchoClient {
    /// Build a client with the default handler table. A metadata lookup is
    /// wired up when the config carries an `[api]` section.
    pub fn new(config: Config) -> Result<Self> {
        let lookup: Option<Arc<dyn UserLookup>> = match &config.api {
            Some(api) => Some(Arc::new(HttpLookup::new(api)?)),
            None => None,
        };
        Ok(Self::with_parts(config, Registry::with_defaults(), lookup))
    }

    /// Build with a custom handler table and/or lookup collaborator.
    pub fn with_parts(
        config: Config,
        registry: Registry,
        lookup: Option<Arc<dyn UserLookup>>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let inner = Inner {
            own_key: names::username_key(&config.username),
            directory: Directory::new(lookup.is_some()),
            limiter: MessageLimiter::new(&config.rate_limit),
            router: Router::new(Arc::new(registry)),
            lookup,
            events,
            conn: Mutex::new(ConnState {
                state: ConnectionState::Disconnected,
                generation: 0,
                connect_waiter: None,
                reconnect_timer: None,
                reader: None,
            }),
            writer: tokio::sync::Mutex::new(None),
            config,
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.conn.lock().state
    }

    /// Subscribe to the client's event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.events.subscribe()
    }

    pub(crate) fn limiter(&self) -> &MessageLimiter {
        &self.inner.limiter
    }

    pub(crate) fn emit(&self, event: Event) {
        let _ = self.inner.events.send(event);
    }

    pub(crate) fn is_self(&self, nick: &str) -> bool {
        names::username_key(nick) == self.inner.own_key
    }

    // ======================================================================
    // Identity cache
    // ======================================================================

    /// The one shared instance for `name`; created on first reference.
    pub fn user(&self, name: &str) -> Arc<User> {
        self.inner.directory.user(name)
    }

    /// Cached or new channel. Validates the name shape synchronously.
    pub fn channel(&self, name: &str) -> Result<Arc<Channel>> {
        self.inner.directory.channel(name)
    }

    /// Resolve a user by numeric id, consulting the metadata lookup on a
    /// cache miss. Non-positive ids are rejected without any request.
    pub async fn user_by_id(&self, id: i64) -> Result<Arc<User>> {
        let id = u32::try_from(id).ok().filter(|v| *v > 0).ok_or(Error::InvalidUserId(id))?;
        if let Some(user) = self.inner.directory.user_by_id(id) {
            return Ok(user);
        }
        let lookup = self.inner.lookup.as_ref().ok_or(Error::LookupUnavailable)?;
        let info = lookup.lookup_user_by_id(id).await?;
        let user = self.inner.directory.user(&info.username);
        user.set_display(names::sanitize_username(&info.username));
        self.inner.directory.bind_user_id(id, &user);
        Ok(user)
    }

    pub(crate) fn drop_member_everywhere(&self, user_key: &str) -> Vec<Arc<Channel>> {
        self.inner.directory.drop_member_everywhere(user_key)
    }

    // ======================================================================
    // Lifecycle
    // ======================================================================

    /// Open the connection and authenticate.
    ///
    /// Resolves on the gateway's welcome. While reconnection is enabled the
    /// same future stays pending across automatic retries; with it disabled
    /// a transport failure rejects immediately. Calling while anything but
    /// `Disconnected` rejects with [`Error::AlreadyConnected`].
    pub async fn connect(&self) -> Result<()> {
        let waiter = {
            let mut conn = self.inner.conn.lock();
            if conn.state != ConnectionState::Disconnected {
                return Err(Error::AlreadyConnected);
            }
            let (tx, rx) = oneshot::channel();
            conn.connect_waiter = Some(tx);
            self.set_state(&mut conn, ConnectionState::Connecting, None);
            rx
        };
        self.dial().await;
        match waiter.await {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::Aborted),
        }
    }

    /// Close the connection and stop all retries. Safe to call repeatedly;
    /// a pending `connect()` rejects with [`Error::Aborted`].
    pub async fn disconnect(&self) {
        let send_quit = {
            let mut conn = self.inner.conn.lock();
            if conn.state == ConnectionState::Disconnected {
                return;
            }
            if let Some(timer) = conn.reconnect_timer.take() {
                timer.abort();
            }
            conn.state == ConnectionState::Connected
        };
        if send_quit {
            let _ = self.send_raw("QUIT".to_owned()).await;
        }
        {
            let mut conn = self.inner.conn.lock();
            conn.generation += 1;
            if let Some(reader) = conn.reader.take() {
                reader.abort();
            }
            if let Some(waiter) = conn.connect_waiter.take() {
                let _ = waiter.send(Err(Error::Aborted));
            }
            self.set_state(&mut conn, ConnectionState::Disconnected, None);
        }
        *self.inner.writer.lock().await = None;
        self.emit(Event::Disconnected { error: None });
        info!("disconnected");
    }

    /// One connection attempt: dial, install the writer, send the auth
    /// lines, start the reader. Failures feed [`Self::connection_lost`],
    /// which owns the retry policy.
    async fn dial(&self) {
        let generation = {
            let mut conn = self.inner.conn.lock();
            conn.generation += 1;
            conn.generation
        };

        let config = &self.inner.config;
        info!(host = %config.host, port = config.port, "connecting");
        let attempt = timeout(
            config.connect_timeout(),
            TcpStream::connect((config.host.clone(), config.port)),
        )
        .await;
        let stream = match attempt {
            Ok(Ok(stream)) => stream,
            Ok(Err(error)) => {
                self.connection_lost(generation, Error::Io(error));
                return;
            }
            Err(_) => {
                self.connection_lost(generation, Error::ConnectTimeout(config.connect_timeout()));
                return;
            }
        };

        let (read_half, write_half) = stream.into_split();
        *self.inner.writer.lock().await =
            Some(FramedWrite::new(write_half, LineCodec::new(config.max_line_len)));
        // A disconnect may have raced the dial; drop the fresh writer again
        if self.inner.conn.lock().generation != generation {
            *self.inner.writer.lock().await = None;
            return;
        }

        // Auth lines: password, user registration, nickname, in this order
        let username = &config.username;
        for line in [
            format!("PASS {}", config.password),
            format!("USER {username} 0 * :{username}"),
            format!("NICK {username}"),
        ] {
            if let Err(error) = self.send_raw(line).await {
                self.connection_lost(generation, error);
                return;
            }
        }

        let reader = FramedRead::new(read_half, LineCodec::new(config.max_line_len));
        let client = self.clone();
        let handle = tokio::spawn(async move { client.read_loop(generation, reader).await });
        self.inner.conn.lock().reader = Some(handle);
    }

    /// The single stream of execution for inbound traffic: each line is
    /// routed to completion before the next read.
    async fn read_loop(self, generation: u64, mut reader: LineReader) {
        let idle = self.inner.config.idle_timeout();
        loop {
            if self.inner.conn.lock().generation != generation {
                return;
            }
            match timeout(idle, reader.next()).await {
                Err(_) => {
                    self.connection_lost(generation, Error::IdleTimeout(idle));
                    return;
                }
                Ok(None) => {
                    self.connection_lost(generation, Error::ConnectionClosed);
                    return;
                }
                Ok(Some(Err(error))) => {
                    self.connection_lost(generation, error);
                    return;
                }
                Ok(Some(Ok(line))) => {
                    debug!(raw = %line, "received line");
                    self.inner.router.route(&self, &line).await;
                }
            }
        }
    }

    /// Transport failure entry point. Idempotent: stale generations and
    /// already-torn-down states no-op, so a forced close followed by the
    /// transport's own close notification yields one transition.
    fn connection_lost(&self, generation: u64, error: Error) {
        let mut conn = self.inner.conn.lock();
        if conn.generation != generation {
            return;
        }
        if matches!(
            conn.state,
            ConnectionState::Disconnected | ConnectionState::Reconnecting
        ) {
            return;
        }
        conn.generation += 1;
        conn.reader = None;
        warn!(%error, "connection lost");

        // Writer teardown needs the async lock; hand it to a task
        let inner = self.inner.clone();
        tokio::spawn(async move {
            *inner.writer.lock().await = None;
        });

        let reason = error.to_string();
        if self.inner.config.reconnect {
            self.set_state(&mut conn, ConnectionState::Reconnecting, Some(reason.clone()));
            self.emit(Event::Disconnected {
                error: Some(reason),
            });
            let client = self.clone();
            let delay = self.inner.config.reconnect_delay();
            conn.reconnect_timer = Some(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                {
                    let mut conn = client.inner.conn.lock();
                    if conn.state != ConnectionState::Reconnecting {
                        return;
                    }
                    client.set_state(&mut conn, ConnectionState::Connecting, None);
                }
                client.dial().await;
            }));
        } else {
            if let Some(waiter) = conn.connect_waiter.take() {
                let _ = waiter.send(Err(error));
            }
            self.set_state(&mut conn, ConnectionState::Disconnected, Some(reason.clone()));
            self.emit(Event::Disconnected {
                error: Some(reason),
            });
        }
    }

    /// Transition helper. Same-state transitions are no-ops and emit
    /// nothing.
    fn set_state(&self, conn: &mut ConnState, state: ConnectionState, error: Option<String>) {
        if conn.state == state {
            return;
        }
        debug!(from = ?conn.state, to = ?state, "state transition");
        conn.state = state;
        self.emit(Event::StateChanged { state, error });
    }

    /// Welcome numeric arrived: the connection is usable. Resolves the
    /// pending connect waiter and restores the channel subscription set.
    pub(crate) async fn finish_connect(&self) {
        let rejoin: Vec<Arc<Channel>> = {
            let mut conn = self.inner.conn.lock();
            if conn.state == ConnectionState::Connected {
                return;
            }
            self.set_state(&mut conn, ConnectionState::Connected, None);
            if let Some(waiter) = conn.connect_waiter.take() {
                let _ = waiter.send(Ok(()));
            }
            self.inner
                .directory
                .channels()
                .into_iter()
                .filter(|c| c.is_joined() || c.has_pending_join())
                .collect()
        };
        info!("connected");
        self.emit(Event::Connected);
        for channel in rejoin {
            debug!(channel = %channel.name(), "rejoining");
            if let Err(error) = self.send_raw(format!("JOIN {}", channel.name())).await {
                warn!(channel = %channel.name(), %error, "rejoin failed");
            }
        }
    }

    /// The gateway rejected our credentials. Retrying the same token cannot
    /// succeed, so the pending connect rejects now; the transport teardown
    /// still follows the configured reconnect policy.
    pub(crate) fn auth_failed(&self, reason: String) {
        warn!(%reason, "authentication rejected");
        let generation = {
            let mut conn = self.inner.conn.lock();
            if let Some(waiter) = conn.connect_waiter.take() {
                let _ = waiter.send(Err(Error::AuthFailed(reason.clone())));
            }
            conn.generation
        };
        self.connection_lost(generation, Error::AuthFailed(reason));
    }

    // ======================================================================
    // Channel negotiation
    // ======================================================================

    /// Enter a channel by name. See [`Self::join_channel`].
    pub async fn join(&self, name: &str) -> Result<()> {
        let channel = self.channel(name)?;
        self.join_channel(&channel).await
    }

    /// Enter a channel. Concurrent calls for one channel share a single
    /// in-flight exchange: exactly one JOIN line goes out per logical
    /// request, and every caller observes the same outcome. Joining a
    /// channel we are already in resolves immediately.
    pub async fn join_channel(&self, channel: &Arc<Channel>) -> Result<()> {
        if self.state() != ConnectionState::Connected {
            return Err(Error::NotConnected);
        }
        if channel.is_joined() {
            return Ok(());
        }
        let (mut outcome, initiator) = channel.begin_join();
        if initiator {
            if let Err(error) = self.send_raw(format!("JOIN {}", channel.name())).await {
                channel.cancel_join();
                return Err(error);
            }
        }
        match outcome.recv().await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(reason)) => Err(Error::JoinRejected {
                channel: channel.name().to_owned(),
                reason,
            }),
            Err(_) => Err(Error::Aborted),
        }
    }

    /// Leave a channel by name. See [`Self::part_channel`].
    pub async fn part(&self, name: &str) -> Result<()> {
        let channel = self.channel(name)?;
        self.part_channel(&channel).await
    }

    /// Leave a channel. Concurrent calls collapse like joins; parting a
    /// channel we are not in is a state error.
    pub async fn part_channel(&self, channel: &Arc<Channel>) -> Result<()> {
        if self.state() != ConnectionState::Connected {
            return Err(Error::NotConnected);
        }
        if !channel.is_joined() && !channel.has_pending_part() {
            return Err(Error::NotJoined(channel.name().to_owned()));
        }
        let (mut outcome, initiator) = channel.begin_part();
        if initiator {
            if let Err(error) = self.send_raw(format!("PART {}", channel.name())).await {
                channel.cancel_part();
                return Err(error);
            }
        }
        match outcome.recv().await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(reason)) => Err(Error::PartRejected {
                channel: channel.name().to_owned(),
                reason,
            }),
            Err(_) => Err(Error::Aborted),
        }
    }

    // ======================================================================
    // Raw writes
    // ======================================================================

    /// Write one protocol line, bypassing the rate limiter. Used for
    /// control traffic (auth, keep-alive replies, JOIN/PART) and available
    /// to custom handlers.
    pub async fn send_raw(&self, line: String) -> Result<()> {
        trace!(raw = %line, "sending line");
        let mut writer = self.inner.writer.lock().await;
        match writer.as_mut() {
            Some(sink) => sink.send(line).await,
            None => Err(Error::NotConnected),
        }
    }
}
