//! SSH host. Every shell request on every connection gets its own session.
//!
//! Visitors are guests: all authentication methods are accepted. Output for
//! a channel goes through one writer task so frames, link requests and the
//! farewell reach the client in the order they were produced.

use std::collections::HashMap;
use std::hash::Hash;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use russh::server::{self, Auth, Handle, Msg, Server as _, Session as SshSession};
use russh::{Channel, ChannelId, CryptoVec, Pty};
use russh_keys::key::{KeyPair, PublicKey};
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::action::KeyDecoder;
use crate::config::{Config, DEFAULT_COLS, DEFAULT_ROWS, MAX_COLS, MAX_ROWS};
use crate::content::Content;
use crate::session::{Session, SessionEvent};
use crate::terminal::TerminalSurface;

const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(3600);

/// Loads the server's host key, refusing a missing or empty file.
pub fn load_host_key(path: &Path) -> anyhow::Result<KeyPair> {
    let guidance = || {
        format!(
            "host key {} is missing or empty; generate one with: ssh-keygen -t ed25519 -f {} -N \"\"",
            path.display(),
            path.display()
        )
    };
    let metadata = std::fs::metadata(path).with_context(guidance)?;
    if metadata.len() == 0 {
        anyhow::bail!(guidance());
    }
    russh_keys::load_secret_key(path, None)
        .with_context(|| format!("loading host key {}", path.display()))
}

pub async fn serve(host: &str, port: u16, key: KeyPair, content: Arc<Content>) -> anyhow::Result<()> {
    let config = server::Config {
        inactivity_timeout: Some(INACTIVITY_TIMEOUT),
        auth_rejection_time: Duration::from_secs(1),
        auth_rejection_time_initial: Some(Duration::from_secs(0)),
        keys: vec![key],
        ..Default::default()
    };

    let mut server = SshServer {
        content,
        next_client: 0,
    };
    tracing::info!(%host, port, "ssh server starting");
    server
        .run_on_address(Arc::new(config), (host, port))
        .await
        .with_context(|| format!("ssh server on {host}:{port}"))
}

struct SshServer {
    content: Arc<Content>,
    next_client: u64,
}

impl server::Server for SshServer {
    type Handler = ClientHandler;

    fn new_client(&mut self, peer: Option<SocketAddr>) -> ClientHandler {
        self.next_client += 1;
        tracing::info!(client = self.next_client, ?peer, "client connected");
        ClientHandler {
            id: self.next_client,
            content: Arc::clone(&self.content),
            channels: Channels::new(),
        }
    }
}

#[derive(Default)]
struct ChannelState {
    size: Option<(u16, u16)>,
    shell: Option<Shell>,
}

struct Shell {
    events: mpsc::UnboundedSender<SessionEvent>,
    decoder: KeyDecoder,
}

impl Shell {
    fn send(&self, event: SessionEvent) {
        // The session may already have quit; late input is dropped
        let _ = self.events.send(event);
    }
}

/// Open channels on one connection and the session each one feeds.
///
/// Every way a channel can go away ends in [`Channels::close`], which removes
/// the entry: a session hears `Closed` at most once. Dropping the map closes
/// whatever is left.
struct Channels<K: Copy + Eq + Hash> {
    by_id: HashMap<K, ChannelState>,
}

impl<K: Copy + Eq + Hash> Channels<K> {
    fn new() -> Self {
        Self {
            by_id: HashMap::new(),
        }
    }

    fn open(&mut self, id: K) {
        self.by_id.insert(id, ChannelState::default());
    }

    fn set_size(&mut self, id: K, size: (u16, u16)) {
        if let Some(state) = self.by_id.get_mut(&id) {
            state.size = Some(size);
        }
    }

    /// Size for a new shell on `id`. `None` when the channel is unknown or
    /// already runs a shell.
    fn shell_size(&self, id: K) -> Option<(u16, u16)> {
        let state = self.by_id.get(&id)?;
        if state.shell.is_some() {
            return None;
        }
        Some(state.size.unwrap_or((DEFAULT_COLS, DEFAULT_ROWS)))
    }

    fn attach(&mut self, id: K, events: mpsc::UnboundedSender<SessionEvent>) -> bool {
        match self.by_id.get_mut(&id) {
            Some(state) if state.shell.is_none() => {
                state.shell = Some(Shell {
                    events,
                    decoder: KeyDecoder::new(),
                });
                true
            }
            _ => false,
        }
    }

    /// Decodes raw input and forwards the resulting actions.
    fn input(&mut self, id: K, data: &[u8]) {
        let Some(shell) = self.by_id.get_mut(&id).and_then(|state| state.shell.as_mut()) else {
            return;
        };
        for action in shell.decoder.feed(data) {
            shell.send(SessionEvent::Key(action));
        }
    }

    fn resize(&mut self, id: K, cols: u16, rows: u16) {
        if let Some(state) = self.by_id.get_mut(&id) {
            state.size = Some((cols, rows));
            if let Some(shell) = &state.shell {
                shell.send(SessionEvent::Resize { cols, rows });
            }
        }
    }

    /// Returns true when a running session was told to stop.
    fn close(&mut self, id: K) -> bool {
        match self.by_id.remove(&id).and_then(|state| state.shell) {
            Some(shell) => {
                shell.send(SessionEvent::Closed);
                true
            }
            None => false,
        }
    }

    fn close_all(&mut self) -> usize {
        let ids: Vec<K> = self.by_id.keys().copied().collect();
        ids.into_iter().filter(|&id| self.close(id)).count()
    }
}

impl<K: Copy + Eq + Hash> Drop for Channels<K> {
    fn drop(&mut self) {
        self.close_all();
    }
}

struct ClientHandler {
    id: u64,
    content: Arc<Content>,
    channels: Channels<ChannelId>,
}

impl ClientHandler {
    fn start_shell(&mut self, channel: ChannelId, handle: Handle) -> anyhow::Result<bool> {
        let Some((cols, rows)) = self.channels.shell_size(channel) else {
            return Ok(false);
        };

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let surface = TerminalSurface::new(ChannelWriter::new(out_tx), cols, rows)?;
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let session = Session::new(surface, Arc::clone(&self.content), Config::terminal());

        tokio::spawn(pump_output(handle, channel, out_rx));
        let span = tracing::info_span!("session", client = self.id, ?channel, cols, rows);
        tokio::spawn(
            async move {
                if let Err(err) = session.run(event_rx).await {
                    tracing::warn!(error = %err, "session ended with error");
                }
            }
            .instrument(span),
        );

        Ok(self.channels.attach(channel, event_tx))
    }
}

#[async_trait]
impl server::Handler for ClientHandler {
    type Error = anyhow::Error;

    async fn auth_none(&mut self, user: &str) -> Result<Auth, Self::Error> {
        tracing::debug!(client = self.id, user, "guest login");
        Ok(Auth::Accept)
    }

    async fn auth_password(&mut self, user: &str, _password: &str) -> Result<Auth, Self::Error> {
        tracing::debug!(client = self.id, user, "password login accepted as guest");
        Ok(Auth::Accept)
    }

    async fn auth_publickey(&mut self, user: &str, _key: &PublicKey) -> Result<Auth, Self::Error> {
        tracing::debug!(client = self.id, user, "key login accepted as guest");
        Ok(Auth::Accept)
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<Msg>,
        _session: &mut SshSession,
    ) -> Result<bool, Self::Error> {
        self.channels.open(channel.id());
        Ok(true)
    }

    #[allow(clippy::too_many_arguments)]
    async fn pty_request(
        &mut self,
        channel: ChannelId,
        term: &str,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _modes: &[(Pty, u32)],
        session: &mut SshSession,
    ) -> Result<(), Self::Error> {
        let size = terminal_size(col_width, row_height);
        tracing::debug!(client = self.id, term, cols = size.0, rows = size.1, "pty requested");
        self.channels.set_size(channel, size);
        session.channel_success(channel);
        Ok(())
    }

    async fn shell_request(
        &mut self,
        channel: ChannelId,
        session: &mut SshSession,
    ) -> Result<(), Self::Error> {
        if self.start_shell(channel, session.handle())? {
            session.channel_success(channel);
        } else {
            session.channel_failure(channel);
        }
        Ok(())
    }

    async fn data(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        _session: &mut SshSession,
    ) -> Result<(), Self::Error> {
        self.channels.input(channel, data);
        Ok(())
    }

    async fn window_change_request(
        &mut self,
        channel: ChannelId,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _session: &mut SshSession,
    ) -> Result<(), Self::Error> {
        let (cols, rows) = terminal_size(col_width, row_height);
        self.channels.resize(channel, cols, rows);
        Ok(())
    }

    async fn channel_eof(
        &mut self,
        channel: ChannelId,
        _session: &mut SshSession,
    ) -> Result<(), Self::Error> {
        self.channels.close(channel);
        Ok(())
    }

    async fn channel_close(
        &mut self,
        channel: ChannelId,
        _session: &mut SshSession,
    ) -> Result<(), Self::Error> {
        self.channels.close(channel);
        Ok(())
    }
}

impl Drop for ClientHandler {
    fn drop(&mut self) {
        let sessions = self.channels.close_all();
        tracing::info!(client = self.id, sessions, "client disconnected");
    }
}

/// Client-reported size, with zero meaning "unknown". Capped at
/// [`MAX_COLS`] x [`MAX_ROWS`].
fn terminal_size(cols: u32, rows: u32) -> (u16, u16) {
    let clamp = |value: u32, default: u16, max: u16| match value {
        0 => default,
        value => u16::try_from(value).map_or(max, |value| value.min(max)),
    };
    (
        clamp(cols, DEFAULT_COLS, MAX_COLS),
        clamp(rows, DEFAULT_ROWS, MAX_ROWS),
    )
}

/// Collects terminal output and hands it to the writer task on flush.
struct ChannelWriter {
    buffer: Vec<u8>,
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl ChannelWriter {
    fn new(tx: mpsc::UnboundedSender<Vec<u8>>) -> Self {
        Self {
            buffer: Vec::new(),
            tx,
        }
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let bytes = std::mem::take(&mut self.buffer);
        self.tx
            .send(bytes)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "ssh channel closed"))
    }
}

/// Drains queued output into the channel, then closes it once the session
/// has dropped its writer.
async fn pump_output(handle: Handle, channel: ChannelId, mut rx: mpsc::UnboundedReceiver<Vec<u8>>) {
    while let Some(bytes) = rx.recv().await {
        if handle.data(channel, CryptoVec::from_slice(&bytes)).await.is_err() {
            tracing::debug!(?channel, "channel gone, dropping output");
            return;
        }
    }
    let _ = handle.eof(channel).await;
    let _ = handle.close(channel).await;
}
