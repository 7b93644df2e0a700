pub use crate::Result;

use crate::geometry::Pos;
use crate::window::Window;

use std::collections::HashMap;

use anyhow::anyhow;
use bitflags::bitflags;
use strum::Display;
use strum::EnumIter;
use strum::EnumString;
use strum::IntoStaticStr;

pub type KeyCode = u8;

bitflags! {
    /// Core protocol key modifiers, plus a synthetic bit that is set while a
    /// move or resize gesture is in progress.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct ModMask: u32 {
        const SHIFT = 1 << 0;
        const LOCK = 1 << 1;
        const CONTROL = 1 << 2;
        const MOD1 = 1 << 3;
        const MOD2 = 1 << 4;
        const MOD3 = 1 << 5;
        const MOD4 = 1 << 6;
        const MOD5 = 1 << 7;
        const MOVE_RESIZE = 1 << 15;
    }
}

impl ModMask {
    /// Caps lock, num lock and scroll lock never take part in matching.
    pub const IGNORED: ModMask = ModMask::LOCK.union(ModMask::MOD2).union(ModMask::MOD5);

    /// Truncates a wire state word to the key modifier bits, dropping the
    /// pointer button bits the server reports alongside them.
    pub fn from_state(state: u16) -> Self {
        ModMask::from_bits_truncate(state as u32 & 0xff)
    }

    pub fn wire_bits(self) -> u16 {
        (self.bits() & 0xff) as u16
    }

    pub fn parse_modifier(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "shift" => Ok(ModMask::SHIFT),
            "lock" => Ok(ModMask::LOCK),
            "control" | "ctrl" => Ok(ModMask::CONTROL),
            "mod1" | "alt" => Ok(ModMask::MOD1),
            "mod2" => Ok(ModMask::MOD2),
            "mod3" => Ok(ModMask::MOD3),
            "mod4" | "super" => Ok(ModMask::MOD4),
            "mod5" => Ok(ModMask::MOD5),
            "moveresize" => Ok(ModMask::MOVE_RESIZE),
            _ => Err(anyhow!("unable to resolve \"{}\" to modifier", name)),
        }
    }

    pub fn names(self) -> Vec<&'static str> {
        let mut names = Vec::with_capacity(2);

        for (flag, name) in &[
            (ModMask::SHIFT, "Shift"),
            (ModMask::LOCK, "Lock"),
            (ModMask::CONTROL, "Control"),
            (ModMask::MOD1, "Mod1"),
            (ModMask::MOD2, "Mod2"),
            (ModMask::MOD3, "Mod3"),
            (ModMask::MOD4, "Mod4"),
            (ModMask::MOD5, "Mod5"),
            (ModMask::MOVE_RESIZE, "MoveResize"),
        ] {
            if self.contains(*flag) {
                names.push(*name);
            }
        }

        names
    }
}

#[derive(
    Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, EnumString, EnumIter, Display, IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum EventKind {
    KeyPress,
    KeyRelease,
    ButtonPress,
    ButtonRelease,
    DoubleClick,
    EnterNotify,
    LeaveNotify,
    MapRequest,
}

impl EventKind {
    pub fn is_key(self) -> bool {
        matches!(self, EventKind::KeyPress | EventKind::KeyRelease)
    }

    pub fn is_button(self) -> bool {
        matches!(
            self,
            EventKind::ButtonPress | EventKind::ButtonRelease | EventKind::DoubleClick
        )
    }
}

/// A normalized input event: what the matcher compares bindings against,
/// and what interrupts capture for later dispatch.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct InputEvent {
    pub kind: EventKind,
    pub detail: u32,
    pub state: ModMask,
    pub window: Window,
    pub root: Window,
    pub root_pos: Pos,
    pub window_pos: Pos,
    pub time: u32,
}

impl InputEvent {
    pub fn new(
        kind: EventKind,
        detail: u32,
        state: ModMask,
        window: Window,
    ) -> Self {
        Self {
            kind,
            detail,
            state,
            window,
            root: 0,
            root_pos: Pos::default(),
            window_pos: Pos::default(),
            time: 0,
        }
    }
}

/// Resolves key symbol names to key codes of the running display.
pub trait KeyResolver {
    fn keycode(
        &self,
        name: &str,
    ) -> Option<KeyCode>;

    fn is_modifier(
        &self,
        code: KeyCode,
    ) -> bool {
        [
            "Shift_L",
            "Shift_R",
            "Control_L",
            "Control_R",
            "Alt_L",
            "Alt_R",
            "Meta_L",
            "Meta_R",
            "Super_L",
            "Super_R",
            "Hyper_L",
            "Hyper_R",
            "ISO_Level3_Shift",
        ]
        .iter()
        .any(|name| self.keycode(name) == Some(code))
    }
}

impl KeyResolver for HashMap<String, KeyCode> {
    fn keycode(
        &self,
        name: &str,
    ) -> Option<KeyCode> {
        self.get(name).copied()
    }
}

/// Parses `Button1`..`Button9` or a bare button number.
pub fn parse_button(name: &str) -> Result<u32> {
    let prefixed = name
        .get(..6)
        .map_or(false, |prefix| prefix.eq_ignore_ascii_case("button"));

    let digits = if prefixed {
        &name[6..]
    } else {
        name
    };

    match digits.parse::<u32>() {
        Ok(button) if (1..=9).contains(&button) => Ok(button),
        _ => Err(anyhow!("unable to resolve \"{}\" to button", name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_names_and_aliases() {
        assert_eq!(ModMask::parse_modifier("Alt").unwrap(), ModMask::MOD1);
        assert_eq!(ModMask::parse_modifier("super").unwrap(), ModMask::MOD4);
        assert_eq!(ModMask::parse_modifier("MoveResize").unwrap(), ModMask::MOVE_RESIZE);
        assert!(ModMask::parse_modifier("Hyper").is_err());

        assert_eq!((ModMask::CONTROL | ModMask::MOD1).names(), vec!["Control", "Mod1"]);
    }

    #[test]
    fn wire_state_drops_button_bits() {
        // Button1 held while Mod1 is down
        let state = ModMask::from_state(0x0100 | 0x0008);
        assert_eq!(state, ModMask::MOD1);
    }

    #[test]
    fn button_names() {
        assert_eq!(parse_button("Button3").unwrap(), 3);
        assert_eq!(parse_button("2").unwrap(), 2);
        assert!(parse_button("Button0").is_err());
        assert!(parse_button("left").is_err());
    }

    #[test]
    fn event_kinds_parse_case_insensitively() {
        assert_eq!("keypress".parse::<EventKind>().unwrap(), EventKind::KeyPress);
        assert_eq!("DoubleClick".parse::<EventKind>().unwrap(), EventKind::DoubleClick);
        assert!("Motion".parse::<EventKind>().is_err());
    }
}
