//! Terminal render surface shared by the SSH host and the local preview.

use std::io::Write;

use anyhow::Context;
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal, TerminalOptions, Viewport};

use crate::config::{MAX_COLS, MAX_ROWS};
use crate::content::Link;
use crate::osc;
use crate::session::Surface;
use crate::theme::EMBER;
use crate::ui;
use crate::ui_state::Scene;

/// Draws into any byte sink. The viewport is fixed to the size the client
/// reported, never queried from the host's own tty.
pub struct TerminalSurface<W: Write> {
    terminal: Terminal<CrosstermBackend<W>>,
}

impl<W: Write + Send> TerminalSurface<W> {
    pub fn new(writer: W, cols: u16, rows: u16) -> anyhow::Result<Self> {
        let mut backend = CrosstermBackend::new(writer);
        backend
            .write_all(osc::set_background(EMBER.bg).as_bytes())
            .context("writing background colour")?;

        let options = TerminalOptions {
            viewport: Viewport::Fixed(viewport(cols, rows)),
        };
        let mut terminal = Terminal::with_options(backend, options).context("creating terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;
        Ok(Self { terminal })
    }

    fn write_raw(&mut self, sequence: &str) -> anyhow::Result<()> {
        let backend = self.terminal.backend_mut();
        backend.write_all(sequence.as_bytes())?;
        backend.flush()?;
        Ok(())
    }
}

/// The drawable area for a client-reported size, capped at
/// [`MAX_COLS`] x [`MAX_ROWS`].
fn viewport(cols: u16, rows: u16) -> Rect {
    Rect::new(0, 0, cols.min(MAX_COLS), rows.min(MAX_ROWS))
}

impl<W: Write + Send> Surface for TerminalSurface<W> {
    fn render(&mut self, scene: &Scene<'_>) -> anyhow::Result<()> {
        self.terminal.draw(|frame| ui::draw(frame, scene))?;
        Ok(())
    }

    fn resize(&mut self, cols: u16, rows: u16) -> anyhow::Result<()> {
        self.terminal.resize(viewport(cols, rows))?;
        Ok(())
    }

    fn open_link(&mut self, link: &Link) -> anyhow::Result<()> {
        let sequence = format!("{}{}", osc::open_url(&link.url), osc::copy_to_clipboard(&link.url));
        self.write_raw(&sequence)
    }

    fn close(&mut self) -> anyhow::Result<()> {
        self.write_raw(&osc::farewell())
    }
}
