use crate::change::Direction;

use winsys::geometry::Dim;
use winsys::geometry::Distance;
use winsys::geometry::Pos;

pub type DesktopMask = u64;

pub const ALL_DESKTOPS: DesktopMask = !0;

#[inline]
pub fn desktop_bit(index: usize) -> DesktopMask {
    if index < 64 {
        1 << index
    } else {
        0
    }
}

/// Parses a desktop mask parameter: `all`, or indices separated by
/// whitespace or commas.
pub fn parse_mask(param: &str) -> Option<DesktopMask> {
    let param = param.trim();

    if param.eq_ignore_ascii_case("all") {
        return Some(ALL_DESKTOPS);
    }

    param
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|index| !index.is_empty())
        .try_fold(0, |mask, index| {
            let index: usize = index.parse().ok()?;

            if index < 64 {
                Some(mask | desktop_bit(index))
            } else {
                None
            }
        })
}

pub struct Desktops {
    names: Vec<String>,
    current: usize,
}

impl Desktops {
    pub fn new(names: Vec<String>) -> Self {
        Self {
            names,
            current: 0,
        }
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[inline]
    pub fn current(&self) -> usize {
        self.current
    }

    #[inline]
    pub fn current_bit(&self) -> DesktopMask {
        desktop_bit(self.current)
    }

    /// Every valid desktop.
    #[inline]
    pub fn all(&self) -> DesktopMask {
        if self.count() >= 64 {
            ALL_DESKTOPS
        } else {
            (1 << self.count()) - 1
        }
    }

    /// Switches to `index`; returns whether the current desktop changed.
    pub fn goto(
        &mut self,
        index: usize,
    ) -> bool {
        if index >= self.count() || index == self.current {
            return false;
        }

        self.current = index;
        true
    }

    #[inline]
    pub fn neighbour(
        &self,
        dir: Direction,
    ) -> usize {
        dir.step(self.current, self.count())
    }
}

/// The pan offset over the virtual canvas.
pub struct Viewport {
    pos: Pos,
    max: Pos,
    screen: Dim,
}

impl Viewport {
    /// A canvas of `cols` by `rows` screens.
    pub fn new(
        screen: Dim,
        cols: i32,
        rows: i32,
    ) -> Self {
        Self {
            pos: Pos::default(),
            max: Pos::new(
                (cols.max(1) - 1) * screen.w,
                (rows.max(1) - 1) * screen.h,
            ),
            screen,
        }
    }

    #[inline]
    pub fn pos(&self) -> Pos {
        self.pos
    }

    #[inline]
    pub fn max(&self) -> Pos {
        self.max
    }

    #[inline]
    pub fn screen(&self) -> Dim {
        self.screen
    }

    /// The whole canvas size.
    #[inline]
    pub fn canvas(&self) -> Dim {
        Dim::new(self.max.x + self.screen.w, self.max.y + self.screen.h)
    }

    /// Moves to `target`, clamped to the canvas; returns the delta that was
    /// actually applied.
    pub fn pan_to(
        &mut self,
        target: Pos,
    ) -> Distance {
        let clamped = Pos::new(
            target.x.max(0).min(self.max.x),
            target.y.max(0).min(self.max.y),
        );

        let delta = clamped - self.pos;
        self.pos = clamped;
        delta
    }

    #[inline]
    pub fn pan_by(
        &mut self,
        delta: Distance,
    ) -> Distance {
        self.pan_to(self.pos + delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn desktop_switching() {
        let mut desktops = Desktops::new(vec!["a".into(), "b".into(), "c".into()]);

        assert!(!desktops.goto(0));
        assert!(desktops.goto(2));
        assert!(!desktops.goto(3));
        assert_eq!(desktops.current_bit(), 0b100);
        assert_eq!(desktops.all(), 0b111);
        assert_eq!(desktops.neighbour(Direction::Forward), 0);
    }

    #[test]
    fn masks() {
        assert_eq!(parse_mask("1 3"), Some(0b1010));
        assert_eq!(parse_mask("0,2"), Some(0b101));
        assert_eq!(parse_mask("ALL"), Some(ALL_DESKTOPS));
        assert_eq!(parse_mask("x"), None);
    }

    #[test]
    fn viewport_clamps_to_canvas() {
        let mut viewport = Viewport::new(Dim::new(800, 600), 3, 2);

        assert_eq!(viewport.max(), Pos::new(1600, 600));

        let delta = viewport.pan_by(Distance::new(1000, -50));
        assert_eq!(delta, Distance::new(1000, 0));

        let delta = viewport.pan_to(Pos::new(5000, 5000));
        assert_eq!(delta, Distance::new(600, 600));
        assert_eq!(viewport.pos(), Pos::new(1600, 600));
        assert_eq!(viewport.canvas(), Dim::new(2400, 1200));
    }
}
