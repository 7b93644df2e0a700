use crate::geometry::Pos;
use crate::input::EventKind;
use crate::input::InputEvent;
use crate::input::ModMask;

use x11rb::protocol::xproto;

impl From<ModMask> for xproto::ModMask {
    fn from(mask: ModMask) -> xproto::ModMask {
        xproto::ModMask::from(mask.wire_bits())
    }
}

/// Builds the normalized event for a pointer or key event; `window` is the
/// event window, or the child when the event was reported on the root.
pub fn input_event(
    kind: EventKind,
    detail: u8,
    state: xproto::KeyButMask,
    window: xproto::Window,
    root: xproto::Window,
    root_pos: (i16, i16),
    window_pos: (i16, i16),
    time: xproto::Timestamp,
) -> InputEvent {
    InputEvent {
        kind,
        detail: detail as u32,
        state: ModMask::from_state(u16::from(state)),
        window,
        root,
        root_pos: Pos {
            x: root_pos.0 as i32,
            y: root_pos.1 as i32,
        },
        window_pos: Pos {
            x: window_pos.0 as i32,
            y: window_pos.1 as i32,
        },
        time,
    }
}

pub fn on_button_press(event: &xproto::ButtonPressEvent) -> InputEvent {
    input_event(
        EventKind::ButtonPress,
        event.detail,
        event.state,
        event.event,
        event.root,
        (event.root_x, event.root_y),
        (event.event_x, event.event_y),
        event.time,
    )
}

pub fn on_button_release(event: &xproto::ButtonReleaseEvent) -> InputEvent {
    input_event(
        EventKind::ButtonRelease,
        event.detail,
        event.state,
        event.event,
        event.root,
        (event.root_x, event.root_y),
        (event.event_x, event.event_y),
        event.time,
    )
}

pub fn on_key_press(event: &xproto::KeyPressEvent) -> InputEvent {
    input_event(
        EventKind::KeyPress,
        event.detail,
        event.state,
        event.event,
        event.root,
        (event.root_x, event.root_y),
        (event.event_x, event.event_y),
        event.time,
    )
}

pub fn on_key_release(event: &xproto::KeyReleaseEvent) -> InputEvent {
    input_event(
        EventKind::KeyRelease,
        event.detail,
        event.state,
        event.event,
        event.root,
        (event.root_x, event.root_y),
        (event.event_x, event.event_y),
        event.time,
    )
}

pub fn on_crossing(
    kind: EventKind,
    event: &xproto::EnterNotifyEvent,
) -> InputEvent {
    input_event(
        kind,
        0,
        event.state,
        event.event,
        event.root,
        (event.root_x, event.root_y),
        (event.event_x, event.event_y),
        event.time,
    )
}
