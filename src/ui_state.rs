use crate::content::Content;
use crate::state::AppState;

/// Header/footer visibility. Only ever moves from hidden to visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Chrome {
    #[default]
    Hidden,
    Visible,
}

/// Per-session view latches that live beside the broadcast [`AppState`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct View {
    pub chrome: Chrome,
    pub navigation_enabled: bool,
    pub location_visible: bool,
    /// Transient acknowledgement after opening a link
    pub flash: Option<&'static str>,
}

impl View {
    pub fn chrome_visible(&self) -> bool {
        self.chrome == Chrome::Visible
    }
}

/// Everything a renderer needs for one frame.
pub struct Scene<'a> {
    pub state: &'a AppState,
    pub view: &'a View,
    pub content: &'a Content,
}
