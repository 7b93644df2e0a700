use std::ops::Add;
use std::ops::AddAssign;
use std::ops::Sub;
use std::ops::SubAssign;

pub type Extents = Padding;

#[derive(Debug, PartialOrd, Ord, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Edge {
    Left,
    Right,
    Top,
    Bottom,
}

impl Edge {
    pub const ALL: [Edge; 4] = [Edge::Left, Edge::Right, Edge::Top, Edge::Bottom];
}

#[derive(Debug, Copy, Clone, Hash, PartialOrd, Ord, PartialEq, Eq)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
}

impl Default for Pos {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
        }
    }
}

impl Pos {
    pub fn new(
        x: i32,
        y: i32,
    ) -> Self {
        Self {
            x,
            y,
        }
    }

    pub fn values(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn dist(
        &self,
        pos: Self,
    ) -> Distance {
        Distance {
            dx: (pos.x - self.x),
            dy: (pos.y - self.y),
        }
    }
}

impl Add<Pos> for Pos {
    type Output = Self;

    fn add(
        self,
        other: Pos,
    ) -> Self::Output {
        Self::Output {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl Sub for Pos {
    type Output = Distance;

    fn sub(
        self,
        other: Self,
    ) -> Self::Output {
        other.dist(self)
    }
}

#[derive(Debug, Copy, Clone, Hash, PartialOrd, Ord, PartialEq, Eq)]
pub struct Dim {
    pub w: i32,
    pub h: i32,
}

impl Default for Dim {
    fn default() -> Self {
        Self {
            w: 0,
            h: 0,
        }
    }
}

impl Dim {
    pub fn new(
        w: i32,
        h: i32,
    ) -> Self {
        Self {
            w,
            h,
        }
    }

    pub fn values(&self) -> (i32, i32) {
        (self.w, self.h)
    }

    pub fn area(&self) -> i64 {
        self.w.max(0) as i64 * self.h.max(0) as i64
    }
}

#[derive(Debug, Copy, Clone, Hash, PartialOrd, Ord, PartialEq, Eq)]
pub struct Region {
    pub pos: Pos,
    pub dim: Dim,
}

impl Default for Region {
    fn default() -> Self {
        Self {
            pos: Default::default(),
            dim: Default::default(),
        }
    }
}

impl Region {
    pub fn new(
        x: i32,
        y: i32,
        w: i32,
        h: i32,
    ) -> Self {
        Self {
            pos: Pos {
                x,
                y,
            },
            dim: Dim {
                w,
                h,
            },
        }
    }

    pub fn values(&self) -> (Pos, Dim) {
        (self.pos, self.dim)
    }

    #[inline]
    pub fn right(&self) -> i32 {
        self.pos.x + self.dim.w
    }

    #[inline]
    pub fn bottom(&self) -> i32 {
        self.pos.y + self.dim.h
    }

    pub fn encompasses(
        &self,
        pos: Pos,
    ) -> bool {
        pos.x >= self.pos.x
            && pos.y >= self.pos.y
            && pos.x < self.right()
            && pos.y < self.bottom()
    }

    pub fn contains(
        &self,
        region: Region,
    ) -> bool {
        region.pos.x >= self.pos.x
            && region.pos.y >= self.pos.y
            && region.right() <= self.right()
            && region.bottom() <= self.bottom()
    }

    pub fn intersection(
        &self,
        region: Region,
    ) -> Option<Region> {
        let x = std::cmp::max(self.pos.x, region.pos.x);
        let y = std::cmp::max(self.pos.y, region.pos.y);
        let right = std::cmp::min(self.right(), region.right());
        let bottom = std::cmp::min(self.bottom(), region.bottom());

        if right > x && bottom > y {
            Some(Region::new(x, y, right - x, bottom - y))
        } else {
            None
        }
    }

    pub fn overlap_area(
        &self,
        region: Region,
    ) -> i64 {
        self.intersection(region)
            .map_or(0, |intersection| intersection.dim.area())
    }

    pub fn translated(
        self,
        dist: Distance,
    ) -> Self {
        Self {
            pos: self.pos + dist,
            dim: self.dim,
        }
    }

    pub fn without_extents(
        self,
        extents: &Extents,
    ) -> Self {
        self - *extents
    }

    pub fn with_extents(
        self,
        extents: &Extents,
    ) -> Self {
        self + *extents
    }

    pub fn center(&self) -> Pos {
        Pos {
            x: self.pos.x + self.dim.w / 2,
            y: self.pos.y + self.dim.h / 2,
        }
    }
}

#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub struct Padding {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

impl Default for Padding {
    fn default() -> Self {
        Self {
            left: 0,
            right: 0,
            top: 0,
            bottom: 0,
        }
    }
}

impl Padding {
    pub fn with_each_edge(size: i32) -> Self {
        Self {
            left: size,
            right: size,
            top: size,
            bottom: size,
        }
    }

    pub fn edge(
        &self,
        edge: Edge,
    ) -> i32 {
        match edge {
            Edge::Left => self.left,
            Edge::Right => self.right,
            Edge::Top => self.top,
            Edge::Bottom => self.bottom,
        }
    }
}

impl Add<Padding> for Region {
    type Output = Self;

    fn add(
        self,
        padding: Padding,
    ) -> Self::Output {
        Self::Output {
            pos: Pos {
                x: self.pos.x - padding.left,
                y: self.pos.y - padding.top,
            },
            dim: Dim {
                w: self.dim.w + padding.left + padding.right,
                h: self.dim.h + padding.top + padding.bottom,
            },
        }
    }
}

impl Sub<Padding> for Region {
    type Output = Self;

    fn sub(
        self,
        padding: Padding,
    ) -> Self::Output {
        Self::Output {
            pos: Pos {
                x: self.pos.x + padding.left,
                y: self.pos.y + padding.top,
            },
            dim: Dim {
                w: self.dim.w - padding.left - padding.right,
                h: self.dim.h - padding.top - padding.bottom,
            },
        }
    }
}

impl AddAssign<Padding> for Region {
    fn add_assign(
        &mut self,
        padding: Padding,
    ) {
        *self = *self + padding;
    }
}

impl SubAssign<Padding> for Region {
    fn sub_assign(
        &mut self,
        padding: Padding,
    ) {
        *self = *self - padding;
    }
}

#[derive(Debug, Copy, Clone, Hash, PartialOrd, Ord, PartialEq, Eq)]
pub struct Distance {
    pub dx: i32,
    pub dy: i32,
}

impl Distance {
    pub fn new(
        dx: i32,
        dy: i32,
    ) -> Self {
        Self {
            dx,
            dy,
        }
    }

    pub fn values(&self) -> (i32, i32) {
        (self.dx, self.dy)
    }

    pub fn is_zero(&self) -> bool {
        self.dx == 0 && self.dy == 0
    }
}

impl std::ops::Neg for Distance {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self {
            dx: -self.dx,
            dy: -self.dy,
        }
    }
}

impl Add<Distance> for Pos {
    type Output = Self;

    fn add(
        self,
        dist: Distance,
    ) -> Self::Output {
        Self::Output {
            x: self.x + dist.dx,
            y: self.y + dist.dy,
        }
    }
}

impl AddAssign<Distance> for Pos {
    fn add_assign(
        &mut self,
        dist: Distance,
    ) {
        *self = *self + dist;
    }
}

impl Sub<Distance> for Pos {
    type Output = Self;

    fn sub(
        self,
        dist: Distance,
    ) -> Self::Output {
        Self::Output {
            x: self.x - dist.dx,
            y: self.y - dist.dy,
        }
    }
}

impl SubAssign<Distance> for Pos {
    fn sub_assign(
        &mut self,
        dist: Distance,
    ) {
        *self = *self - dist;
    }
}

/// A partial strut as announced through `_NET_WM_STRUT_PARTIAL`; only the
/// thickness per edge is relevant for workarea computation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Strut {
    pub edge: Edge,
    pub width: i32,
}

impl Strut {
    pub fn new(
        edge: Edge,
        width: i32,
    ) -> Self {
        Self {
            edge,
            width,
        }
    }
}

/// The result of parsing an X geometry string of the form
/// `[=][<w>{xX}<h>][{+-}<x>{+-}<y>]`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct GeometrySpec {
    pub w: Option<i32>,
    pub h: Option<i32>,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub x_negative: bool,
    pub y_negative: bool,
}

impl GeometrySpec {
    pub fn parse(spec: &str) -> Option<Self> {
        let mut rest = spec.trim();
        rest = rest.strip_prefix('=').unwrap_or(rest);

        let mut geometry = GeometrySpec::default();

        let size_end = rest.find(|c| c == '+' || c == '-').unwrap_or(rest.len());
        let (size, offsets) = rest.split_at(size_end);

        if !size.is_empty() {
            let mut parts = size.splitn(2, |c| c == 'x' || c == 'X');
            let w = parts.next()?;
            let h = parts.next();

            if !w.is_empty() {
                geometry.w = Some(w.parse().ok()?);
            }

            if let Some(h) = h {
                if !h.is_empty() {
                    geometry.h = Some(h.parse().ok()?);
                }
            } else if geometry.w.is_some() {
                return None;
            }
        }

        if !offsets.is_empty() {
            let (x, rest) = take_offset(offsets)?;
            let (y, rest) = take_offset(rest)?;

            if !rest.is_empty() {
                return None;
            }

            geometry.x_negative = x.0;
            geometry.x = Some(x.1);
            geometry.y_negative = y.0;
            geometry.y = Some(y.1);
        }

        Some(geometry)
    }

    /// Resolves offsets against a containing dimension, so that negative
    /// offsets are measured from the right/bottom edge.
    pub fn resolve(
        &self,
        current: Region,
        within: Dim,
    ) -> Region {
        let w = self.w.unwrap_or(current.dim.w);
        let h = self.h.unwrap_or(current.dim.h);

        let x = match self.x {
            Some(x) if self.x_negative => within.w - w - x,
            Some(x) => x,
            None => current.pos.x,
        };

        let y = match self.y {
            Some(y) if self.y_negative => within.h - h - y,
            Some(y) => y,
            None => current.pos.y,
        };

        Region::new(x, y, w, h)
    }
}

fn take_offset(input: &str) -> Option<((bool, i32), &str)> {
    let mut chars = input.chars();
    let negative = match chars.next()? {
        '+' => false,
        '-' => true,
        _ => return None,
    };

    let digits = &input[1..];
    let end = digits.find(|c| c == '+' || c == '-').unwrap_or(digits.len());
    let value = digits[..end].parse().ok()?;

    Some(((negative, value), &digits[end..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsing_full_geometry() {
        let spec = GeometrySpec::parse("640x480+10-20").unwrap();

        assert_eq!(spec.w, Some(640));
        assert_eq!(spec.h, Some(480));
        assert_eq!(spec.x, Some(10));
        assert_eq!(spec.y, Some(20));
        assert!(!spec.x_negative);
        assert!(spec.y_negative);

        let region = spec.resolve(Region::default(), Dim::new(1000, 1000));
        assert_eq!(region, Region::new(10, 500, 640, 480));
    }

    #[test]
    fn parsing_offset_only_geometry() {
        let spec = GeometrySpec::parse("+0+0").unwrap();
        let current = Region::new(5, 5, 100, 50);

        assert_eq!(spec.resolve(current, Dim::new(800, 600)), Region::new(0, 0, 100, 50));
        assert!(GeometrySpec::parse("12").is_none());
        assert!(GeometrySpec::parse("10x10+4").is_none());
    }

    #[test]
    fn overlap_of_disjoint_and_nested_regions() {
        let a = Region::new(0, 0, 100, 100);
        let b = Region::new(100, 0, 50, 50);
        let c = Region::new(25, 25, 10, 10);

        assert_eq!(a.overlap_area(b), 0);
        assert_eq!(a.overlap_area(c), 100);
        assert!(a.contains(c));
        assert!(!a.contains(b));
    }

    #[test]
    fn extents_round_trip() {
        let extents = Extents {
            left: 1,
            right: 1,
            top: 20,
            bottom: 7,
        };

        let region = Region::new(50, 50, 200, 100);
        assert_eq!(region.with_extents(&extents).without_extents(&extents), region);
        assert_eq!(region.with_extents(&extents), Region::new(49, 30, 202, 127));
    }
}
