use crate::actionfile::Context;
use crate::style::ButtonPlace;
use crate::style::Style;

use winsys::geometry::Dim;
use winsys::geometry::Extents;
use winsys::geometry::Padding;
use winsys::geometry::Region;
use winsys::hints::MotifHints;

use std::ops::Add;

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct Decor: u8 {
        const TITLE = 1 << 0;
        const HANDLE = 1 << 1;
        const BORDER = 1 << 2;
    }
}

impl Decor {
    pub const ALL: Decor = Decor::TITLE.union(Decor::HANDLE).union(Decor::BORDER);

    pub fn from_motif(hints: &MotifHints) -> Self {
        let mut decor = Decor::empty();
        decor.set(Decor::TITLE, hints.title);
        decor.set(Decor::HANDLE, hints.handle);
        decor.set(Decor::BORDER, hints.border);
        decor
    }

    /// The space the frame adds around the client for these decorations.
    pub fn extents(
        self,
        style: &Style,
    ) -> Extents {
        let border = if self.contains(Decor::BORDER) {
            style.border_width
        } else {
            0
        };

        Padding::with_each_edge(border) + Bars::new(self, style)
    }
}

/// The title and handle bars a frame carries.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Bars {
    title: i32,
    handle: i32,
}

impl Bars {
    fn new(
        decor: Decor,
        style: &Style,
    ) -> Self {
        Self {
            title: if decor.contains(Decor::TITLE) {
                style.title_height
            } else {
                0
            },
            handle: if decor.contains(Decor::HANDLE) {
                style.handle_width
            } else {
                0
            },
        }
    }
}

impl Add<Bars> for Padding {
    type Output = Self;

    fn add(
        self,
        bars: Bars,
    ) -> Self::Output {
        Self::Output {
            left: self.left,
            right: self.right,
            top: self.top + bars.title,
            bottom: self.bottom + bars.handle,
        }
    }
}

/// A decoration subwindow of a frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Part {
    Title,
    Label,
    Handle,
    LeftGrip,
    RightGrip,
    Button(usize),
}

impl Part {
    #[inline]
    pub fn context(self) -> Context {
        match self {
            Part::Title => Context::WindowTitle,
            Part::Label => Context::WindowLabel,
            Part::Handle => Context::WindowHandle,
            Part::LeftGrip => Context::WindowLeftGrip,
            Part::RightGrip => Context::WindowRightGrip,
            Part::Button(index) => Context::WindowButton(index),
        }
    }
}

/// Where everything goes inside a frame. `frame` is absolute; every other
/// region is relative to the frame's origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLayout {
    pub frame: Region,
    pub client: Region,
    pub parts: Vec<(Part, Region)>,
}

impl FrameLayout {
    /// Lays out a frame around the absolute client region `client`; a
    /// shaded frame collapses to its title bar.
    pub fn new(
        client: Region,
        decor: Decor,
        shaded: bool,
        style: &Style,
    ) -> Self {
        let extents = decor.extents(style);
        let mut frame = client.with_extents(&extents);

        let border = if decor.contains(Decor::BORDER) {
            style.border_width
        } else {
            0
        };

        let bars = Bars::new(decor, style);
        let inner_width = std::cmp::max(frame.dim.w - 2 * border, 1);

        if shaded && bars.title > 0 {
            frame.dim.h = bars.title + 2 * border;
        }

        let mut parts = Vec::with_capacity(8);

        if bars.title > 0 {
            let title = Region::new(border, border, inner_width, bars.title);
            parts.push((Part::Title, title));

            let size = std::cmp::max(bars.title - 4, 1);
            let mut left = title.pos.x + 2;
            let mut right = title.right() - 2;

            for (index, button) in style.buttons.iter().enumerate() {
                let x = match button.autoplace {
                    ButtonPlace::Left => {
                        left += size + 2;
                        left - size - 2
                    },
                    ButtonPlace::Right => {
                        right -= size + 2;
                        right + 2
                    },
                };

                parts.push((Part::Button(index), Region::new(x, title.pos.y + 2, size, size)));
            }

            parts.push((
                Part::Label,
                Region::new(left, title.pos.y + 2, std::cmp::max(right - left, 1), size),
            ));
        }

        if bars.handle > 0 && !shaded {
            let y = frame.dim.h - border - bars.handle;
            let grip = std::cmp::min(style.grip_width, inner_width / 3);

            parts.push((Part::LeftGrip, Region::new(border, y, grip, bars.handle)));
            parts.push((
                Part::Handle,
                Region::new(
                    border + grip,
                    y,
                    std::cmp::max(inner_width - 2 * grip, 1),
                    bars.handle,
                ),
            ));
            parts.push((
                Part::RightGrip,
                Region::new(border + inner_width - grip, y, grip, bars.handle),
            ));
        }

        Self {
            frame,
            client: Region::new(extents.left, extents.top, client.dim.w, client.dim.h),
            parts,
        }
    }

    #[inline]
    pub fn part(
        &self,
        part: Part,
    ) -> Option<Region> {
        self.parts
            .iter()
            .find(|&&(present, _)| present == part)
            .map(|&(_, region)| region)
    }

    #[inline]
    pub fn dim(&self) -> Dim {
        self.frame.dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::style::Style;

    fn style() -> Style {
        let mut style = Style::default();
        style.border_width = 1;
        style.title_height = 18;
        style.handle_width = 6;
        style.grip_width = 20;
        style
    }

    #[test]
    fn extents_follow_decorations() {
        let style = style();

        assert_eq!(Decor::ALL.extents(&style), Extents {
            left: 1,
            right: 1,
            top: 19,
            bottom: 7,
        });

        assert_eq!(Decor::empty().extents(&style), Extents::default());
        assert_eq!(Decor::TITLE.extents(&style).top, 18);
    }

    #[test]
    fn layout_parts() {
        let style = style();
        let layout = FrameLayout::new(Region::new(100, 100, 200, 100), Decor::ALL, false, &style);

        assert_eq!(layout.frame, Region::new(99, 81, 202, 126));
        assert_eq!(layout.client, Region::new(1, 19, 200, 100));
        assert_eq!(layout.part(Part::Title), Some(Region::new(1, 1, 200, 18)));
        assert_eq!(layout.part(Part::LeftGrip), Some(Region::new(1, 119, 20, 6)));
        assert_eq!(layout.part(Part::RightGrip), Some(Region::new(181, 119, 20, 6)));
        assert_eq!(layout.part(Part::Button(0)), Some(Region::new(185, 3, 14, 14)));
        assert_eq!(layout.part(Part::Label), Some(Region::new(3, 3, 180, 14)));
    }

    #[test]
    fn shaded_frame_keeps_only_the_title() {
        let style = style();
        let layout = FrameLayout::new(Region::new(0, 0, 200, 100), Decor::ALL, true, &style);

        assert_eq!(layout.frame.dim, Dim::new(202, 20));
        assert!(layout.part(Part::Handle).is_none());
    }

    #[test]
    fn motif_hints_seed_decorations() {
        let hints = MotifHints {
            title: false,
            handle: true,
            border: true,
        };

        assert_eq!(Decor::from_motif(&hints), Decor::HANDLE | Decor::BORDER);
    }
}
