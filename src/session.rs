//! One hosted session: a reveal driver, its timers and a render surface.
//!
//! Everything runs on a single task. Timer fires and inbound events are
//! interleaved by one `select!` loop, so no two mutations are ever concurrent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::action::Action;
use crate::app::{App, Effect};
use crate::config::Config;
use crate::content::{Content, Link};
use crate::state::ListenerId;
use crate::timers::TimerSet;
use crate::ui_state::Scene;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Key(Action),
    Resize { cols: u16, rows: u16 },
    /// The transport closed, ended or errored
    Closed,
}

/// Where a session draws. Implemented by the terminal and web renderers.
pub trait Surface: Send {
    fn render(&mut self, scene: &Scene<'_>) -> anyhow::Result<()>;

    fn resize(&mut self, _cols: u16, _rows: u16) -> anyhow::Result<()> {
        Ok(())
    }

    fn open_link(&mut self, link: &Link) -> anyhow::Result<()>;

    /// Called exactly once, from [`Session::teardown`].
    fn close(&mut self) -> anyhow::Result<()>;
}

pub struct Session<S: Surface> {
    app: App,
    timers: TimerSet,
    surface: S,
    content: Arc<Content>,
    dirty: Arc<AtomicBool>,
    listener: Option<ListenerId>,
    torn_down: bool,
}

impl<S: Surface> Session<S> {
    pub fn new(surface: S, content: Arc<Content>, config: Config) -> Self {
        let mut app = App::new(content.limits(), config);

        // Any state broadcast schedules a redraw
        let dirty = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&dirty);
        let listener = app.subscribe(Box::new(move |_| flag.store(true, Ordering::Relaxed)));

        Self {
            app,
            timers: TimerSet::new(),
            surface,
            content,
            dirty,
            listener: Some(listener),
            torn_down: false,
        }
    }

    /// Runs until the user quits or the event channel closes, then tears
    /// down. Errors from the surface end the session; they are returned for
    /// logging but the teardown has already happened.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<SessionEvent>) -> anyhow::Result<()> {
        tracing::info!("session started");
        let result = self.drive(&mut events).await;
        self.teardown();
        result
    }

    async fn drive(&mut self, events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> anyhow::Result<()> {
        let effects = self.app.start();
        if self.apply(effects)? {
            return Ok(());
        }
        self.redraw()?;

        loop {
            let quit = tokio::select! {
                timer = self.timers.next() => {
                    let effects = self.app.on_timer(timer);
                    self.apply(effects)?
                }
                event = events.recv() => match event {
                    Some(SessionEvent::Key(action)) => {
                        let effects = self.app.handle(action);
                        self.apply(effects)?
                    }
                    Some(SessionEvent::Resize { cols, rows }) => {
                        self.surface.resize(cols, rows)?;
                        self.dirty.store(true, Ordering::Relaxed);
                        false
                    }
                    Some(SessionEvent::Closed) | None => true,
                },
            };
            if quit {
                return Ok(());
            }

            let view_changed = self.app.take_view_changed();
            if self.dirty.load(Ordering::Relaxed) || view_changed {
                self.redraw()?;
            }
        }
    }

    /// Returns true when the session should end.
    fn apply(&mut self, effects: Vec<Effect>) -> anyhow::Result<bool> {
        let mut quit = false;
        for effect in effects {
            match effect {
                Effect::Start(kind, schedule) => self.timers.start(kind, schedule),
                Effect::Stop(kind) => {
                    self.timers.cancel(kind);
                }
                Effect::OpenLink(index) => {
                    if let Some(link) = self.content.link(index) {
                        tracing::info!(url = %link.url, "link opened");
                        self.surface.open_link(link)?;
                    }
                }
                Effect::Reveal(milestone) => tracing::debug!(?milestone, "reveal milestone"),
                Effect::Quit => quit = true,
            }
        }
        Ok(quit)
    }

    fn redraw(&mut self) -> anyhow::Result<()> {
        self.dirty.store(false, Ordering::Relaxed);
        let state = self.app.state();
        let scene = Scene {
            state: &state,
            view: self.app.view(),
            content: &self.content,
        };
        self.surface.render(&scene)
    }

    /// Cancels every outstanding timer and releases the surface. Safe to call
    /// more than once; only the first call does anything.
    pub fn teardown(&mut self) -> bool {
        if self.torn_down {
            return false;
        }
        self.torn_down = true;

        let cancelled = self.timers.cancel_all();
        debug_assert!(self.timers.is_empty());
        if let Some(id) = self.listener.take() {
            self.app.unsubscribe(id);
        }
        if let Err(err) = self.surface.close() {
            tracing::debug!(error = %err, "surface already closed");
        }
        tracing::info!(cancelled_timers = cancelled, "session ended");
        true
    }
}

impl<S: Surface> Drop for Session<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::MapArt;
    use crate::state::{AppState, Page, Phase};
    use crate::ui_state::View;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorded {
        frames: Vec<(AppState, View)>,
        opened: Vec<String>,
        resizes: Vec<(u16, u16)>,
        closes: usize,
    }

    #[derive(Clone, Default)]
    struct MockSurface {
        log: Arc<Mutex<Recorded>>,
        fail_render: bool,
    }

    impl Surface for MockSurface {
        fn render(&mut self, scene: &Scene<'_>) -> anyhow::Result<()> {
            if self.fail_render {
                anyhow::bail!("client went away");
            }
            self.log
                .lock()
                .unwrap()
                .frames
                .push((scene.state.clone(), scene.view.clone()));
            Ok(())
        }

        fn resize(&mut self, cols: u16, rows: u16) -> anyhow::Result<()> {
            self.log.lock().unwrap().resizes.push((cols, rows));
            Ok(())
        }

        fn open_link(&mut self, link: &Link) -> anyhow::Result<()> {
            self.log.lock().unwrap().opened.push(link.url.clone());
            Ok(())
        }

        fn close(&mut self) -> anyhow::Result<()> {
            self.log.lock().unwrap().closes += 1;
            Ok(())
        }
    }

    fn small_content() -> Arc<Content> {
        Arc::new(Content {
            bio: "Hello there".to_string(),
            map: MapArt {
                art: "ab\ncd\nef\ngh".to_string(),
                ..MapArt::default()
            },
            links: vec![
                Link {
                    label: "One".to_string(),
                    value: "one".to_string(),
                    url: "https://one.example".to_string(),
                },
                Link {
                    label: "Two".to_string(),
                    value: "two".to_string(),
                    url: "https://two.example".to_string(),
                },
            ],
            ..Content::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_reveal_then_open_link() {
        let surface = MockSurface::default();
        let log = Arc::clone(&surface.log);
        let session = Session::new(surface, small_content(), Config::terminal());
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(session.run(rx));

        tokio::time::sleep(Duration::from_secs(5)).await;
        {
            let log = log.lock().unwrap();
            let (state, view) = log.frames.last().unwrap();
            assert_eq!(state.phase, Phase::Main);
            assert!(state.typewriter_complete);
            assert_eq!(state.map_reveal_index, 4);
            assert!(view.chrome_visible());
            assert!(view.location_visible);
            assert_eq!(log.frames[0].0.phase, Phase::Loading);
        }

        tx.send(SessionEvent::Key(Action::NextPage)).unwrap();
        tx.send(SessionEvent::Key(Action::SelectDown)).unwrap();
        tx.send(SessionEvent::Key(Action::OpenLink)).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        {
            let log = log.lock().unwrap();
            assert_eq!(log.opened, vec!["https://two.example".to_string()]);
            let (state, view) = log.frames.last().unwrap();
            assert_eq!(state.current_page, Page::Links);
            assert_eq!(view.flash, Some("Copied to clipboard"));
        }

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(log.lock().unwrap().frames.last().unwrap().1.flash, None);

        tx.send(SessionEvent::Key(Action::Quit)).unwrap();
        handle.await.unwrap().unwrap();
        assert_eq!(log.lock().unwrap().closes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_ignored_before_navigation_unlocks() {
        let surface = MockSurface::default();
        let log = Arc::clone(&surface.log);
        let session = Session::new(surface, small_content(), Config::terminal());
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(session.run(rx));

        tokio::time::sleep(Duration::from_millis(500)).await;
        tx.send(SessionEvent::Key(Action::NextPage)).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let state = log.lock().unwrap().frames.last().unwrap().0.clone();
        assert_eq!(state.phase, Phase::Loading);
        assert_eq!(state.current_page, Page::About);

        drop(tx);
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_channel_tears_down_and_silences_timers() {
        let surface = MockSurface::default();
        let log = Arc::clone(&surface.log);
        let session = Session::new(surface, small_content(), Config::terminal());
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(session.run(rx));

        tokio::time::sleep(Duration::from_millis(2100)).await;
        tx.send(SessionEvent::Closed).unwrap();
        handle.await.unwrap().unwrap();

        let frames_at_close = log.lock().unwrap().frames.len();
        tokio::time::sleep(Duration::from_secs(10)).await;
        let log = log.lock().unwrap();
        assert_eq!(log.frames.len(), frames_at_close);
        assert_eq!(log.closes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resize_forwarded_and_redrawn() {
        let surface = MockSurface::default();
        let log = Arc::clone(&surface.log);
        let session = Session::new(surface, small_content(), Config::terminal());
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(session.run(rx));

        tokio::task::yield_now().await;
        let before = log.lock().unwrap().frames.len();
        tx.send(SessionEvent::Resize { cols: 120, rows: 40 }).unwrap();
        tx.send(SessionEvent::Closed).unwrap();
        handle.await.unwrap().unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log.resizes, vec![(120, 40)]);
        assert!(log.frames.len() > before);
    }

    #[tokio::test]
    async fn test_render_failure_ends_session_with_teardown() {
        let surface = MockSurface {
            fail_render: true,
            ..MockSurface::default()
        };
        let log = Arc::clone(&surface.log);
        let session = Session::new(surface, small_content(), Config::terminal());
        let (_tx, rx) = mpsc::unbounded_channel();

        let result = session.run(rx).await;
        assert!(result.is_err());
        assert_eq!(log.lock().unwrap().closes, 1);
    }

    #[test]
    fn test_teardown_is_idempotent() {
        let surface = MockSurface::default();
        let log = Arc::clone(&surface.log);
        let mut session = Session::new(surface, small_content(), Config::terminal());

        assert!(session.teardown());
        assert!(!session.teardown());
        drop(session);
        assert_eq!(log.lock().unwrap().closes, 1);
    }
}
