pub type Window = u32;
pub type Pixmap = u32;

#[derive(Debug, Copy, Clone, PartialOrd, Ord, PartialEq, Eq)]
pub enum IcccmWindowState {
    Withdrawn,
    Normal,
    Iconic,
}

impl IcccmWindowState {
    pub fn from_word(word: u32) -> Option<Self> {
        match word {
            0 => Some(IcccmWindowState::Withdrawn),
            1 => Some(IcccmWindowState::Normal),
            3 => Some(IcccmWindowState::Iconic),
            _ => None,
        }
    }

    pub fn to_word(self) -> u32 {
        match self {
            IcccmWindowState::Withdrawn => 0,
            IcccmWindowState::Normal => 1,
            IcccmWindowState::Iconic => 3,
        }
    }
}

/// The subset of `_NET_WM_STATE` atoms the window manager reads and writes.
#[derive(Debug, Copy, Clone, Hash, PartialOrd, Ord, PartialEq, Eq)]
pub enum WindowState {
    Sticky,
    MaximizedVert,
    MaximizedHorz,
    Shaded,
    Hidden,
    Fullscreen,
    Above,
    Below,
}

impl WindowState {
    pub const ALL: [WindowState; 8] = [
        WindowState::Sticky,
        WindowState::MaximizedVert,
        WindowState::MaximizedHorz,
        WindowState::Shaded,
        WindowState::Hidden,
        WindowState::Fullscreen,
        WindowState::Above,
        WindowState::Below,
    ];
}

#[derive(Debug, Copy, Clone, PartialOrd, Ord, PartialEq, Eq)]
pub enum WindowType {
    Desktop,
    Dock,
    Toolbar,
    Menu,
    Utility,
    Splash,
    Dialog,
    Normal,
}

/// Attributes of an unmanaged window as seen on the wire, used to decide
/// whether a window is adopted.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WindowAttributes {
    pub override_redirect: bool,
    pub mapped: bool,
    pub input_only: bool,
}
