pub use crate::Result;

use crate::geometry::Dim;
use crate::geometry::Pos;
use crate::input::InputEvent;
use crate::input::ModMask;
use crate::window::Window;
use crate::window::WindowState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Input(InputEvent),
    Motion {
        window: Window,
        root_pos: Pos,
        state: ModMask,
    },
    MapRequest {
        window: Window,
        parent: Window,
    },
    Unmap {
        window: Window,
        synthetic: bool,
    },
    Destroy {
        window: Window,
    },
    ConfigureRequest {
        window: Window,
        pos: (Option<i32>, Option<i32>),
        dim: (Option<i32>, Option<i32>),
    },
    Property {
        window: Window,
        kind: PropertyKind,
    },
    StateRequest {
        window: Window,
        states: Vec<WindowState>,
        action: ToggleAction,
    },
    /// `window` is a root window when the current desktop is requested,
    /// otherwise the client to move.
    DesktopRequest {
        window: Window,
        index: u32,
    },
    ActivateRequest {
        window: Window,
    },
    CloseRequest {
        window: Window,
    },
    ViewportRequest {
        window: Window,
        pos: Pos,
    },
    Expose {
        window: Window,
    },
    Mapping,
}

impl Event {
    /// The window an event concerns, if any.
    pub fn window(&self) -> Option<Window> {
        match self {
            Event::Input(event) => Some(event.window),
            Event::Motion {
                window, ..
            }
            | Event::MapRequest {
                window, ..
            }
            | Event::Unmap {
                window, ..
            }
            | Event::Destroy {
                window,
            }
            | Event::ConfigureRequest {
                window, ..
            }
            | Event::Property {
                window, ..
            }
            | Event::StateRequest {
                window, ..
            }
            | Event::ActivateRequest {
                window,
            }
            | Event::CloseRequest {
                window,
            }
            | Event::Expose {
                window,
            }
            | Event::DesktopRequest {
                window, ..
            }
            | Event::ViewportRequest {
                window, ..
            } => Some(*window),
            Event::Mapping => None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialOrd, Ord, PartialEq, Eq)]
pub enum ToggleAction {
    Toggle,
    Add,
    Remove,
}

impl ToggleAction {
    pub fn from_word(word: u32) -> Option<Self> {
        match word {
            0 => Some(ToggleAction::Remove),
            1 => Some(ToggleAction::Add),
            2 => Some(ToggleAction::Toggle),
            _ => None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialOrd, Ord, PartialEq, Eq)]
pub enum PropertyKind {
    Name,
    Class,
    Size,
    Hints,
    Strut,
}

/// A resolved configure request, once absent fields have been filled in from
/// the window's current geometry.
pub fn complete_request(
    pos: (Option<i32>, Option<i32>),
    dim: (Option<i32>, Option<i32>),
    current_pos: Pos,
    current_dim: Dim,
) -> (Pos, Dim) {
    (
        Pos::new(pos.0.unwrap_or(current_pos.x), pos.1.unwrap_or(current_pos.y)),
        Dim::new(dim.0.unwrap_or(current_dim.w), dim.1.unwrap_or(current_dim.h)),
    )
}
