//! `--local`: one session on the invoking terminal, no network involved.

use std::io;
use std::sync::Arc;

use anyhow::Context;
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste, Event, EventStream},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use tokio::sync::mpsc;

use crate::action::Action;
use crate::config::Config;
use crate::content::Content;
use crate::session::{Session, SessionEvent};
use crate::terminal::TerminalSurface;

pub async fn run(content: Arc<Content>) -> anyhow::Result<()> {
    // Setup terminal
    enable_raw_mode().context("enabling raw mode")?;
    execute!(io::stdout(), EnterAlternateScreen, EnableBracketedPaste)
        .context("entering alternate screen")?;

    let result = run_session(content).await;

    // Restore terminal; both steps run even if the first fails
    let raw = disable_raw_mode();
    let screen = execute!(io::stdout(), LeaveAlternateScreen, DisableBracketedPaste);
    finish(result, raw.and(screen))
}

/// The session's own error wins over a failed restore, which is only logged.
fn finish(result: anyhow::Result<()>, restored: io::Result<()>) -> anyhow::Result<()> {
    match (result, restored) {
        (Err(err), Err(restore_err)) => {
            tracing::warn!(error = %restore_err, "failed to restore terminal");
            Err(err)
        }
        (Ok(()), Err(restore_err)) => Err(restore_err).context("restoring terminal"),
        (result, Ok(())) => result,
    }
}

async fn run_session(content: Arc<Content>) -> anyhow::Result<()> {
    let (cols, rows) = crossterm::terminal::size().context("reading terminal size")?;
    let surface = TerminalSurface::new(io::stdout(), cols, rows)?;
    let session = Session::new(surface, content, Config::terminal());

    let (tx, rx) = mpsc::unbounded_channel();
    let input = tokio::spawn(forward_input(tx));
    let result = session.run(rx).await;
    input.abort();
    result
}

async fn forward_input(tx: mpsc::UnboundedSender<SessionEvent>) {
    let mut events = EventStream::new();
    while let Some(event) = events.next().await {
        let event = match event {
            Ok(Event::Key(key)) => match Action::from_key_event(key) {
                Some(action) => SessionEvent::Key(action),
                None => continue,
            },
            Ok(Event::Resize(cols, rows)) => SessionEvent::Resize { cols, rows },
            Ok(_) => continue,
            Err(err) => {
                tracing::warn!(error = %err, "terminal input failed");
                let _ = tx.send(SessionEvent::Closed);
                return;
            }
        };
        if tx.send(event).is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broken_tty() -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Other, "not a tty"))
    }

    #[test]
    fn test_session_error_survives_failed_restore() {
        let err = finish(Err(anyhow::anyhow!("render failed")), broken_tty()).unwrap_err();
        assert_eq!(err.to_string(), "render failed");
    }

    #[test]
    fn test_failed_restore_reported_after_clean_run() {
        let err = finish(Ok(()), broken_tty()).unwrap_err();
        assert_eq!(err.to_string(), "restoring terminal");
        assert!(format!("{err:#}").contains("not a tty"));
    }

    #[test]
    fn test_clean_restore_passes_result_through() {
        assert!(finish(Ok(()), Ok(())).is_ok());
        let err = finish(Err(anyhow::anyhow!("input closed")), Ok(())).unwrap_err();
        assert_eq!(err.to_string(), "input closed");
    }
}
