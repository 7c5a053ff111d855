//! Reveal driver: turns timer fires and user actions into state changes.
//!
//! The driver owns the session's [`StateStore`] and the view latches beside
//! it. It never touches timers directly; instead it returns [`Effect`]s and
//! the session applies them, so timer ownership stays in one place.

use crate::action::Action;
use crate::config::Config;
use crate::state::{
    AppState, Direction, LinkMove, Listener, ListenerId, Page, Phase, RevealLimits, StateStore,
};
use crate::timers::{Schedule, TimerKind};
use crate::ui_state::{Chrome, View};

/// One-time events in the reveal sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Milestone {
    /// Header and footer became visible
    Chrome,
    /// Typewriter finished; page keys are live
    Navigation,
    /// Map fully drawn; location label shown
    Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Start(TimerKind, Schedule),
    Stop(TimerKind),
    OpenLink(usize),
    Reveal(Milestone),
    Quit,
}

pub struct App {
    store: StateStore,
    config: Config,
    view: View,
    view_changed: bool,
}

impl App {
    pub fn new(limits: RevealLimits, config: Config) -> Self {
        Self {
            store: StateStore::new(limits),
            config,
            view: View::default(),
            view_changed: false,
        }
    }

    pub fn state(&self) -> AppState {
        self.store.snapshot()
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn subscribe(&mut self, listener: Listener) -> ListenerId {
        self.store.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.store.unsubscribe(id)
    }

    /// True if a view latch changed since the last call.
    pub fn take_view_changed(&mut self) -> bool {
        std::mem::take(&mut self.view_changed)
    }

    /// Timers armed when the session begins.
    pub fn start(&self) -> Vec<Effect> {
        vec![
            Effect::Start(TimerKind::Loading, Schedule::Once(self.config.loading_duration)),
            Effect::Start(TimerKind::Animation, Schedule::Every(self.config.animation_interval)),
        ]
    }

    pub fn on_timer(&mut self, timer: TimerKind) -> Vec<Effect> {
        match timer {
            TimerKind::Loading => self.enter_main(),
            TimerKind::Animation => {
                self.store.increment_animation_frame();
                Vec::new()
            }
            TimerKind::Typewriter => self.advance_typewriter(),
            TimerKind::CursorBlink => {
                self.store.toggle_cursor();
                Vec::new()
            }
            TimerKind::MapReveal => self.advance_map(),
            TimerKind::Flash => {
                if self.view.flash.take().is_some() {
                    self.view_changed = true;
                }
                Vec::new()
            }
        }
    }

    pub fn handle(&mut self, action: Action) -> Vec<Effect> {
        match action {
            Action::Quit => vec![Effect::Quit],
            Action::NextPage => self.navigate(|store| store.navigate(Direction::Right)),
            Action::PrevPage => self.navigate(|store| store.navigate(Direction::Left)),
            Action::ShowPage(page) => self.navigate(|store| store.show_page(page)),
            Action::SelectUp => self.on_links(|store| store.move_link_selection(LinkMove::Up)),
            Action::SelectDown => self.on_links(|store| store.move_link_selection(LinkMove::Down)),
            Action::SelectLink(index) => self.on_links(|store| store.select_link(index)),
            Action::OpenLink => self.open_link(),
        }
    }

    fn enter_main(&mut self) -> Vec<Effect> {
        if self.store.snapshot().phase == Phase::Main {
            return Vec::new();
        }
        self.store.set_phase(Phase::Main);
        vec![
            Effect::Start(TimerKind::Typewriter, Schedule::Every(self.config.typewriter_interval)),
            Effect::Start(TimerKind::CursorBlink, Schedule::Every(self.config.cursor_blink_interval)),
            Effect::Start(TimerKind::MapReveal, Schedule::Every(self.config.map_reveal_interval)),
        ]
    }

    fn advance_typewriter(&mut self) -> Vec<Effect> {
        let bio_len = self.store.limits().bio_len;
        let state = self.store.snapshot();
        if state.typewriter_complete {
            return vec![Effect::Stop(TimerKind::Typewriter)];
        }
        if state.typewriter_index < bio_len {
            self.store.increment_typewriter(self.config.typewriter_batch);
        }
        if self.store.snapshot().typewriter_index < bio_len {
            return Vec::new();
        }

        // Clamp hit on this tick: latch completion and unlock navigation
        self.store.set_typewriter_complete();
        let mut effects = vec![Effect::Stop(TimerKind::Typewriter)];
        if self.reveal_chrome() {
            effects.push(Effect::Reveal(Milestone::Chrome));
        }
        self.view.navigation_enabled = true;
        self.view_changed = true;
        effects.push(Effect::Reveal(Milestone::Navigation));
        effects
    }

    fn advance_map(&mut self) -> Vec<Effect> {
        let lines = self.store.limits().map_lines;
        if self.store.snapshot().map_reveal_index < lines {
            self.store.increment_map_reveal();
        }
        let revealed = self.store.snapshot().map_reveal_index;

        let mut effects = Vec::new();
        if revealed >= lines / 2 && self.reveal_chrome() {
            effects.push(Effect::Reveal(Milestone::Chrome));
        }
        if revealed >= lines {
            if !self.view.location_visible {
                self.view.location_visible = true;
                self.view_changed = true;
                effects.push(Effect::Reveal(Milestone::Location));
            }
            effects.push(Effect::Stop(TimerKind::MapReveal));
        }
        effects
    }

    /// Single guard for both chrome triggers. Returns true only on the call
    /// that actually revealed it.
    fn reveal_chrome(&mut self) -> bool {
        if self.view.chrome == Chrome::Visible {
            return false;
        }
        self.view.chrome = Chrome::Visible;
        self.view_changed = true;
        true
    }

    fn navigate(&mut self, apply: impl FnOnce(&mut StateStore)) -> Vec<Effect> {
        if self.view.navigation_enabled {
            apply(&mut self.store);
        }
        Vec::new()
    }

    fn links_active(&self) -> bool {
        self.view.navigation_enabled && self.store.snapshot().current_page == Page::Links
    }

    fn on_links(&mut self, apply: impl FnOnce(&mut StateStore)) -> Vec<Effect> {
        if self.links_active() && self.store.limits().link_count > 0 {
            apply(&mut self.store);
        }
        Vec::new()
    }

    fn open_link(&mut self) -> Vec<Effect> {
        let count = self.store.limits().link_count;
        if !self.links_active() || count == 0 {
            return Vec::new();
        }
        let index = self.store.snapshot().selected_link_index.min(count - 1);
        self.view.flash = Some(self.config.flash_message);
        self.view_changed = true;
        vec![
            Effect::OpenLink(index),
            Effect::Start(TimerKind::Flash, Schedule::Once(self.config.flash_duration)),
        ]
    }
}
