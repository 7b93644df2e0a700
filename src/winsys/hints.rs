use crate::geometry::Dim;
use crate::geometry::Edge;
use crate::geometry::Pos;
use crate::geometry::Strut;
use crate::window::IcccmWindowState;
use crate::window::Window;

const INPUT_HINT: u32 = 1 << 0;
const STATE_HINT: u32 = 1 << 1;
const ICON_WINDOW_HINT: u32 = 1 << 3;
const WINDOW_GROUP_HINT: u32 = 1 << 6;
const URGENCY_HINT: u32 = 1 << 8;

const US_POSITION: u32 = 1 << 0;
const P_POSITION: u32 = 1 << 2;
const P_MIN_SIZE: u32 = 1 << 4;
const P_MAX_SIZE: u32 = 1 << 5;
const P_RESIZE_INC: u32 = 1 << 6;
const P_BASE_SIZE: u32 = 1 << 8;
const P_WIN_GRAVITY: u32 = 1 << 9;

const MWM_HINTS_DECORATIONS: u32 = 1 << 1;
const MWM_DECOR_ALL: u32 = 1 << 0;
const MWM_DECOR_BORDER: u32 = 1 << 1;
const MWM_DECOR_RESIZEH: u32 = 1 << 2;
const MWM_DECOR_TITLE: u32 = 1 << 3;

#[derive(Debug, Copy, Clone, PartialOrd, Ord, PartialEq, Eq)]
pub struct Hints {
    pub urgent: bool,
    pub input: Option<bool>,
    pub initial_state: Option<IcccmWindowState>,
    pub icon_window: Option<Window>,
    pub group: Option<Window>,
}

impl Hints {
    /// Decodes the raw `WM_HINTS` property words.
    pub fn from_words(words: &[u32]) -> Option<Self> {
        let flags = *words.first()?;
        let word = |i: usize| words.get(i).copied().unwrap_or(0);

        Some(Self {
            urgent: flags & URGENCY_HINT != 0,
            input: if flags & INPUT_HINT != 0 {
                Some(word(1) != 0)
            } else {
                None
            },
            initial_state: if flags & STATE_HINT != 0 {
                IcccmWindowState::from_word(word(2))
            } else {
                None
            },
            icon_window: if flags & ICON_WINDOW_HINT != 0 && word(4) != 0 {
                Some(word(4))
            } else {
                None
            },
            group: if flags & WINDOW_GROUP_HINT != 0 && word(8) != 0 {
                Some(word(8))
            } else {
                None
            },
        })
    }

    #[inline]
    pub fn is_withdrawn(&self) -> bool {
        self.initial_state == Some(IcccmWindowState::Withdrawn)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct SizeHints {
    pub by_user: bool,
    pub pos: Option<Pos>,
    pub min_width: Option<i32>,
    pub min_height: Option<i32>,
    pub max_width: Option<i32>,
    pub max_height: Option<i32>,
    pub base_width: Option<i32>,
    pub base_height: Option<i32>,
    pub inc_width: Option<i32>,
    pub inc_height: Option<i32>,
    pub gravity: Option<u32>,
}

impl SizeHints {
    /// Decodes the raw `WM_NORMAL_HINTS` property words.
    pub fn from_words(words: &[u32]) -> Option<Self> {
        let flags = *words.first()?;
        let word = |i: usize| words.get(i).map(|&w| w as i32);
        let positive = |i: usize| word(i).filter(|&v| v > 0);

        let pair = |flag: u32, i: usize| {
            if flags & flag != 0 {
                (positive(i), positive(i + 1))
            } else {
                (None, None)
            }
        };

        let (min_width, min_height) = pair(P_MIN_SIZE, 5);
        let (max_width, max_height) = pair(P_MAX_SIZE, 7);
        let (inc_width, inc_height) = pair(P_RESIZE_INC, 9);
        let (base_width, base_height) = pair(P_BASE_SIZE, 15);

        let pos = if flags & (US_POSITION | P_POSITION) != 0 {
            match (word(1), word(2)) {
                (Some(x), Some(y)) => Some(Pos::new(x, y)),
                _ => None,
            }
        } else {
            None
        };

        Some(Self {
            by_user: flags & US_POSITION != 0,
            pos,
            min_width,
            min_height,
            max_width,
            max_height,
            base_width,
            base_height,
            inc_width,
            inc_height,
            gravity: if flags & P_WIN_GRAVITY != 0 {
                words.get(17).copied()
            } else {
                None
            },
        })
    }

    /// The effective base size; a missing base size falls back to the
    /// minimum size.
    pub fn base(&self) -> Dim {
        Dim {
            w: self.base_width.or(self.min_width).unwrap_or(0),
            h: self.base_height.or(self.min_height).unwrap_or(0),
        }
    }

    /// The effective minimum size; a missing minimum falls back to the base
    /// size.
    pub fn min(&self) -> Dim {
        Dim {
            w: self.min_width.or(self.base_width).unwrap_or(1),
            h: self.min_height.or(self.base_height).unwrap_or(1),
        }
    }

    pub fn constrain(
        &self,
        dim: Dim,
    ) -> Dim {
        let min = self.min();
        let base = self.base();

        let mut dest_width = std::cmp::max(dim.w, min.w);
        let mut dest_height = std::cmp::max(dim.h, min.h);

        if let Some(max_width) = self.max_width {
            dest_width = std::cmp::min(dest_width, max_width);
        }

        if let Some(max_height) = self.max_height {
            dest_height = std::cmp::min(dest_height, max_height);
        }

        if let Some(inc_width) = self.inc_width {
            dest_width = snap(dest_width, base.w, inc_width, min.w);
        }

        if let Some(inc_height) = self.inc_height {
            dest_height = snap(dest_height, base.h, inc_height, min.h);
        }

        Dim {
            w: std::cmp::max(dest_width, 1),
            h: std::cmp::max(dest_height, 1),
        }
    }
}

fn snap(
    mut dest: i32,
    base: i32,
    inc: i32,
    min: i32,
) -> i32 {
    if dest >= base {
        dest -= base;
        dest -= dest % inc;
        dest += base;

        while dest < min {
            dest += inc;
        }
    }

    dest
}

/// The decoration part of `_MOTIF_WM_HINTS`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MotifHints {
    pub title: bool,
    pub handle: bool,
    pub border: bool,
}

impl MotifHints {
    pub fn from_words(words: &[u32]) -> Option<Self> {
        let flags = *words.first()?;

        if flags & MWM_HINTS_DECORATIONS == 0 {
            return None;
        }

        let decorations = *words.get(2)?;

        // with the ALL bit set, the remaining bits name exclusions
        let has = |bit: u32| {
            if decorations & MWM_DECOR_ALL != 0 {
                decorations & bit == 0
            } else {
                decorations & bit != 0
            }
        };

        Some(Self {
            title: has(MWM_DECOR_TITLE),
            handle: has(MWM_DECOR_RESIZEH),
            border: has(MWM_DECOR_BORDER),
        })
    }
}

/// Decodes `_NET_WM_STRUT_PARTIAL` (or the four-word `_NET_WM_STRUT`) into
/// the non-empty struts it reserves.
pub fn struts_from_words(words: &[u32]) -> Vec<Strut> {
    [Edge::Left, Edge::Right, Edge::Top, Edge::Bottom]
        .iter()
        .zip(words.iter())
        .filter(|(_, width)| **width > 0)
        .map(|(&edge, &width)| Strut::new(edge, width as i32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normal_hints(
        flags: u32,
        min: (u32, u32),
        inc: (u32, u32),
        base: (u32, u32),
    ) -> Vec<u32> {
        vec![
            flags, 0, 0, 0, 0, min.0, min.1, 0, 0, inc.0, inc.1, 0, 0, 0, 0, base.0, base.1, 0,
        ]
    }

    #[test]
    fn increments_snap_relative_to_base() {
        let hints = SizeHints::from_words(&normal_hints(
            P_MIN_SIZE | P_RESIZE_INC | P_BASE_SIZE,
            (20, 20),
            (10, 15),
            (4, 4),
        ))
        .unwrap();

        let dim = hints.constrain(Dim::new(77, 68));
        assert_eq!((dim.w - 4) % 10, 0);
        assert_eq!((dim.h - 4) % 15, 0);
        assert_eq!(dim, Dim::new(74, 64));
    }

    #[test]
    fn missing_base_falls_back_to_minimum() {
        let hints = SizeHints::from_words(&normal_hints(
            P_MIN_SIZE | P_RESIZE_INC,
            (50, 50),
            (10, 15),
            (0, 0),
        ))
        .unwrap();

        assert_eq!(hints.base(), Dim::new(50, 50));
        assert_eq!(hints.constrain(Dim::new(76, 67)), Dim::new(70, 65));
        assert_eq!(hints.constrain(Dim::new(10, 10)), Dim::new(50, 50));
    }

    #[test]
    fn withdrawn_initial_state() {
        let hints = Hints::from_words(&[STATE_HINT | INPUT_HINT, 1, 0, 0, 0, 0, 0, 0, 0]).unwrap();

        assert!(hints.is_withdrawn());
        assert_eq!(hints.input, Some(true));
        assert!(Hints::from_words(&[]).is_none());
    }

    #[test]
    fn motif_exclusions() {
        let hints =
            MotifHints::from_words(&[MWM_HINTS_DECORATIONS, 0, MWM_DECOR_ALL | MWM_DECOR_TITLE])
                .unwrap();

        assert!(!hints.title);
        assert!(hints.handle);
        assert!(hints.border);

        assert!(MotifHints::from_words(&[0, 0, 0]).is_none());
    }

    #[test]
    fn partial_struts() {
        let struts = struts_from_words(&[0, 60, 0, 24, 0, 0, 0, 768, 0, 0, 0, 1024]);

        assert_eq!(struts, vec![
            Strut::new(Edge::Right, 60),
            Strut::new(Edge::Bottom, 24)
        ]);
    }
}
