//! Per-session presentation state and the store that owns it.
//!
//! The store is the only thing allowed to mutate an [`AppState`]. Every
//! mutator applies its change and then notifies all listeners exactly once
//! with a fresh snapshot.

use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};

/// The animation frame counter wraps at this value.
pub const ANIMATION_FRAME_WRAP: u32 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Loading,
    Main,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    #[default]
    About,
    Links,
}

impl Page {
    /// Fixed page cycle, in tab order.
    pub const ALL: [Page; 2] = [Page::About, Page::Links];

    pub fn index(self) -> usize {
        match self {
            Page::About => 0,
            Page::Links => 1,
        }
    }

    /// Stable lowercase name used by the web protocol.
    pub fn slug(self) -> &'static str {
        match self {
            Page::About => "about",
            Page::Links => "links",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Page::About => "About",
            Page::Links => "Links",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMove {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub phase: Phase,
    pub current_page: Page,
    pub selected_nav_index: usize,
    pub animation_frame: u32,
    pub typewriter_index: usize,
    pub typewriter_complete: bool,
    pub cursor_visible: bool,
    pub map_reveal_index: usize,
    pub selected_link_index: usize,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            phase: Phase::Loading,
            current_page: Page::About,
            selected_nav_index: 0,
            animation_frame: 0,
            typewriter_index: 0,
            typewriter_complete: false,
            cursor_visible: true,
            map_reveal_index: 0,
            selected_link_index: 0,
        }
    }
}

/// Upper bounds the reveal counters and link cursor are clamped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RevealLimits {
    /// Bio length in characters.
    pub bio_len: usize,
    pub map_lines: usize,
    pub link_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type Listener = Box<dyn FnMut(&AppState) + Send>;

pub struct StateStore {
    state: AppState,
    limits: RevealLimits,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

impl StateStore {
    pub fn new(limits: RevealLimits) -> Self {
        Self {
            state: AppState::default(),
            limits,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    pub fn limits(&self) -> RevealLimits {
        self.limits
    }

    /// Independent copy of the current state.
    pub fn snapshot(&self) -> AppState {
        self.state.clone()
    }

    pub fn subscribe(&mut self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Returns false if the listener was already gone.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    #[cfg(test)]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn notify(&mut self) {
        let snapshot = self.state.clone();
        for (id, listener) in self.listeners.iter_mut() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener(&snapshot)));
            if outcome.is_err() {
                tracing::warn!(listener = id.0, "state listener panicked; continuing");
            }
        }
    }

    pub fn set_phase(&mut self, phase: Phase) {
        self.state.phase = phase;
        self.notify();
    }

    /// Cycles through [`Page::ALL`] with wraparound. Ungated: callers decide
    /// whether navigation is allowed yet.
    pub fn navigate(&mut self, direction: Direction) {
        let count = Page::ALL.len();
        let current = self.state.current_page.index();
        let next = match direction {
            Direction::Left => (current + count - 1) % count,
            Direction::Right => (current + 1) % count,
        };
        self.apply_page(Page::ALL[next]);
        self.notify();
    }

    pub fn show_page(&mut self, page: Page) {
        self.apply_page(page);
        self.notify();
    }

    fn apply_page(&mut self, page: Page) {
        self.state.current_page = page;
        self.state.selected_nav_index = page.index();
    }

    pub fn increment_animation_frame(&mut self) {
        self.state.animation_frame = (self.state.animation_frame + 1) % ANIMATION_FRAME_WRAP;
        self.notify();
    }

    /// Advances the typewriter, never past the end of the bio.
    pub fn increment_typewriter(&mut self, amount: usize) {
        self.state.typewriter_index = self
            .state
            .typewriter_index
            .saturating_add(amount)
            .min(self.limits.bio_len);
        self.notify();
    }

    pub fn set_typewriter_complete(&mut self) {
        self.state.typewriter_complete = true;
        self.notify();
    }

    pub fn toggle_cursor(&mut self) {
        self.state.cursor_visible = !self.state.cursor_visible;
        self.notify();
    }

    pub fn increment_map_reveal(&mut self) {
        if self.state.map_reveal_index < self.limits.map_lines {
            self.state.map_reveal_index += 1;
        }
        self.notify();
    }

    pub fn move_link_selection(&mut self, step: LinkMove) {
        let count = self.limits.link_count;
        if count == 0 {
            self.state.selected_link_index = 0;
        } else {
            let current = self.state.selected_link_index.min(count - 1);
            self.state.selected_link_index = match step {
                LinkMove::Up => (current + count - 1) % count,
                LinkMove::Down => (current + 1) % count,
            };
        }
        self.notify();
    }

    pub fn select_link(&mut self, index: usize) {
        self.state.selected_link_index = match self.limits.link_count {
            0 => 0,
            count => index.min(count - 1),
        };
        self.notify();
    }
}
