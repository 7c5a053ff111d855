//! Web host: serves a page shell and runs one session per websocket.
//!
//! The browser never holds state. Every frame is rendered server side by
//! [`html::render`] and pushed as a JSON message; the page script sends key
//! presses, tab clicks and link hovers back.

use std::sync::Arc;

use anyhow::Context;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::WebSocketUpgrade;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use futures::stream::StreamExt;
use futures::SinkExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::action::Action;
use crate::config::Config;
use crate::content::{Content, Link};
use crate::html;
use crate::session::{Session, SessionEvent, Surface};
use crate::state::Page;
use crate::theme::{Theme, EMBER};
use crate::ui_state::Scene;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    Key {
        key: String,
        #[serde(default)]
        shift: bool,
    },
    /// Tab click
    Page { page: Page },
    /// Pointer entered a link row
    Hover { index: usize },
}

impl ClientMsg {
    pub fn into_action(self) -> Option<Action> {
        match self {
            ClientMsg::Key { key, shift } => Action::from_web_key(&key, shift),
            ClientMsg::Page { page } => Some(Action::ShowPage(page)),
            ClientMsg::Hover { index } => Some(Action::SelectLink(index)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    Frame { html: String },
    Open { url: String },
}

/// Pushes rendered fragments to the socket writer, skipping repeats.
pub struct WebSurface {
    tx: mpsc::UnboundedSender<ServerMsg>,
    last_frame: Option<String>,
}

impl WebSurface {
    pub fn new(tx: mpsc::UnboundedSender<ServerMsg>) -> Self {
        Self {
            tx,
            last_frame: None,
        }
    }

    fn send(&self, msg: ServerMsg) -> anyhow::Result<()> {
        self.tx
            .send(msg)
            .map_err(|_| anyhow::anyhow!("websocket writer closed"))
    }
}

impl Surface for WebSurface {
    fn render(&mut self, scene: &Scene<'_>) -> anyhow::Result<()> {
        let fragment = html::render(scene);
        if self.last_frame.as_deref() == Some(fragment.as_str()) {
            return Ok(());
        }
        self.send(ServerMsg::Frame {
            html: fragment.clone(),
        })?;
        self.last_frame = Some(fragment);
        Ok(())
    }

    fn open_link(&mut self, link: &Link) -> anyhow::Result<()> {
        self.send(ServerMsg::Open {
            url: link.url.clone(),
        })
    }

    fn close(&mut self) -> anyhow::Result<()> {
        self.last_frame = None;
        Ok(())
    }
}

pub fn router(content: Arc<Content>) -> Router {
    Router::new()
        .route("/", get(serve_page))
        .route(
            "/ws",
            get(move |ws: WebSocketUpgrade| ws_handler(ws, content)),
        )
}

pub async fn serve(host: &str, port: u16, content: Arc<Content>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind((host, port))
        .await
        .with_context(|| format!("binding web listener on {host}:{port}"))?;
    tracing::info!(%host, port, "web server listening");

    axum::serve(listener, router(content))
        .await
        .context("web server stopped")
}

async fn serve_page() -> Html<String> {
    Html(build_page(&EMBER))
}

async fn ws_handler(ws: WebSocketUpgrade, content: Arc<Content>) -> axum::response::Response {
    ws.on_upgrade(move |socket| handle_socket(socket, content))
}

async fn handle_socket(socket: WebSocket, content: Arc<Content>) {
    tracing::info!("web client connected");
    let (mut sender, mut receiver) = socket.split();

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ServerMsg>();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let session = Session::new(WebSurface::new(out_tx), content, Config::web());
    let session_task = tokio::spawn(session.run(event_rx));

    // Single writer keeps frames and open requests in order
    let writer = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to encode server message");
                    continue;
                }
            };
            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMsg>(&text) {
                Ok(msg) => {
                    let Some(action) = msg.into_action() else {
                        continue;
                    };
                    if event_tx.send(SessionEvent::Key(action)).is_err() {
                        break;
                    }
                }
                Err(err) => tracing::debug!(error = %err, "ignoring malformed client message"),
            },
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    let _ = event_tx.send(SessionEvent::Closed);
    drop(event_tx);
    match session_task.await {
        Ok(Err(err)) => tracing::warn!(error = %err, "web session failed"),
        Err(err) => tracing::warn!(error = %err, "web session task panicked"),
        Ok(Ok(())) => {}
    }
    let _ = writer.await;
    tracing::info!("web client disconnected");
}

/// The page shell: palette, layout and the socket script. The body is filled
/// by server frames.
fn build_page(theme: &Theme) -> String {
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>termfolio</title>
<style>
:root {{
    --bg: {bg}; --bg-subtle: {bg_subtle}; --fg: {fg};
    --fg-muted: {fg_muted}; --accent: {accent}; --border: {border};
}}
* {{ margin: 0; padding: 0; box-sizing: border-box; }}
html, body {{ height: 100%; background: var(--bg); color: var(--fg); }}
body {{ font-family: 'JetBrains Mono', 'Menlo', 'Consolas', monospace; font-size: 14px; line-height: 1.4; }}
pre {{ font-family: inherit; }}
#app, .app {{ height: 100%; display: flex; flex-direction: column; }}

.loading-screen {{ height: 100%; display: flex; align-items: center; justify-content: center; gap: 1ch; }}
.spinner {{ color: var(--accent); }}
.loading-text {{ color: var(--fg-muted); }}

.header {{ display: flex; justify-content: space-between; padding: 1rem 2ch; }}
.header-tabs {{ display: flex; gap: 3ch; }}
.header-tab {{ color: var(--fg-muted); cursor: pointer; }}
.header-tab.active {{ color: var(--accent); }}
.header-motto {{ color: var(--accent); }}

.main-content {{ flex: 1; display: flex; align-items: center; justify-content: center; }}

.about-page {{ display: flex; align-items: center; gap: 14ch; }}
.about-map {{ position: relative; min-width: 42ch; }}
.highlight, .location-label {{ color: var(--accent); }}
.location-label {{ position: absolute; white-space: nowrap; }}
.bio-pre {{ width: 51ch; white-space: pre-wrap; }}
.cursor {{ color: var(--accent); }}
.cursor.hidden {{ visibility: hidden; }}

.links-box {{ width: 72ch; border: 1px solid var(--border); padding: 1rem 2ch; }}
.links-title {{ color: var(--accent); font-weight: bold; margin-bottom: 1.4em; }}
.links-empty {{ color: var(--fg-muted); }}
.link-row {{ display: block; color: var(--fg); text-decoration: none; white-space: pre; }}
.link-row .link-value {{ color: var(--fg-muted); margin-left: 1ch; }}
.link-row.selected, .link-row.selected .link-indicator {{ color: var(--accent); }}
.link-row.selected .link-label {{ font-weight: bold; }}
.link-row.selected .link-value {{ color: var(--fg); }}
.link-indicator {{ display: inline-block; width: 2ch; }}
.links-url {{ color: var(--fg-muted); margin-top: 1.4em; }}
.links-url-value, .links-flash {{ color: var(--accent); }}
.links-flash {{ margin-top: 1.4em; }}

.footer {{ display: flex; justify-content: space-between; padding: 0 2ch 0.5rem; color: var(--fg-muted); }}
.shortcut-key, .sig-accent {{ color: var(--accent); }}
</style>
</head>
<body>
<div id="app"></div>
<script>
const app = document.getElementById('app');
const scheme = location.protocol === 'https:' ? 'wss://' : 'ws://';
const ws = new WebSocket(scheme + location.host + '/ws');
const send = (msg) => {{
    if (ws.readyState === WebSocket.OPEN) ws.send(JSON.stringify(msg));
}};

ws.onmessage = (event) => {{
    const msg = JSON.parse(event.data);
    if (msg.type === 'frame') app.innerHTML = msg.html;
    else if (msg.type === 'open') window.open(msg.url, '_blank', 'noopener');
}};

const KEYS = ['Tab', 'ArrowUp', 'ArrowDown', 'ArrowLeft', 'ArrowRight', 'Enter', ' '];
document.addEventListener('keydown', (e) => {{
    if (!KEYS.includes(e.key)) return;
    e.preventDefault();
    send({{ type: 'key', key: e.key, shift: e.shiftKey }});
}});

app.addEventListener('click', (e) => {{
    const tab = e.target.closest('[data-page]');
    if (tab) send({{ type: 'page', page: tab.dataset.page }});
}});

app.addEventListener('mouseover', (e) => {{
    const row = e.target.closest('[data-link]');
    if (row) send({{ type: 'hover', index: Number(row.dataset.link) }});
}});
</script>
</body>
</html>
"##,
        bg = theme.bg,
        bg_subtle = theme.bg_subtle,
        fg = theme.fg,
        fg_muted = theme.fg_muted,
        accent = theme.accent,
        border = theme.border,
    )
}
