use crate::geometry::Edge;
use crate::geometry::Region;
use crate::geometry::Strut;
use crate::window::Window;

use std::cell::Cell;
use std::cell::RefCell;
use std::collections::HashMap;

/// A physical X screen: its root window, its full rectangle, and the struts
/// reserved on it, keyed by the window that claims them.
#[derive(Debug, Clone)]
pub struct Screen {
    number: usize,
    root: Window,
    full_region: Cell<Region>,
    struts: RefCell<HashMap<Window, Vec<Strut>>>,
}

impl std::cmp::PartialEq<Self> for Screen {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.number == other.number
    }
}

impl Screen {
    pub fn new(
        number: usize,
        root: Window,
        region: Region,
    ) -> Self {
        Self {
            number,
            root,
            full_region: Cell::new(region),
            struts: RefCell::new(HashMap::new()),
        }
    }

    #[inline]
    pub fn number(&self) -> usize {
        self.number
    }

    #[inline]
    pub fn root(&self) -> Window {
        self.root
    }

    #[inline]
    pub fn full_region(&self) -> Region {
        self.full_region.get()
    }

    /// Replaces the struts claimed by `owner`; returns whether anything
    /// changed.
    pub fn set_struts(
        &self,
        owner: Window,
        struts: Vec<Strut>,
    ) -> bool {
        let mut current = self.struts.borrow_mut();

        if struts.is_empty() {
            return current.remove(&owner).is_some();
        }

        if current.get(&owner) == Some(&struts) {
            return false;
        }

        current.insert(owner, struts);
        true
    }

    #[inline]
    pub fn remove_struts(
        &self,
        owner: Window,
    ) -> bool {
        self.struts.borrow_mut().remove(&owner).is_some()
    }

    #[inline]
    pub fn has_struts(
        &self,
        owner: Window,
    ) -> bool {
        self.struts.borrow().contains_key(&owner)
    }

    pub fn max_strut(
        &self,
        edge: Edge,
        applies: &dyn Fn(Window) -> bool,
    ) -> i32 {
        self.struts
            .borrow()
            .iter()
            .filter(|&(&owner, _)| applies(owner))
            .flat_map(|(_, struts)| struts.iter())
            .filter(|strut| strut.edge == edge)
            .map(|strut| strut.width)
            .max()
            .unwrap_or(0)
    }

    /// The full region minus, on every edge, the widest strut among the
    /// owners for which `applies` holds.
    pub fn workarea(
        &self,
        applies: &dyn Fn(Window) -> bool,
    ) -> Region {
        let mut region = self.full_region.get();

        let left = self.max_strut(Edge::Left, applies);
        let right = self.max_strut(Edge::Right, applies);
        let top = self.max_strut(Edge::Top, applies);
        let bottom = self.max_strut(Edge::Bottom, applies);

        region.pos.x += left;
        region.pos.y += top;
        region.dim.w = std::cmp::max(region.dim.w - left - right, 1);
        region.dim.h = std::cmp::max(region.dim.h - top - bottom, 1);

        region
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widest_applicable_strut_wins() {
        let screen = Screen::new(0, 1, Region::new(0, 0, 1000, 800));

        screen.set_struts(10, vec![Strut::new(Edge::Right, 60)]);
        screen.set_struts(11, vec![Strut::new(Edge::Right, 40), Strut::new(Edge::Top, 20)]);
        screen.set_struts(12, vec![Strut::new(Edge::Right, 200)]);

        let workarea = screen.workarea(&|owner| owner != 12);
        assert_eq!(workarea, Region::new(0, 20, 940, 780));

        assert!(screen.remove_struts(10));
        assert_eq!(screen.workarea(&|owner| owner == 10), Region::new(0, 0, 1000, 800));
    }

    #[test]
    fn unchanged_struts_report_no_change() {
        let screen = Screen::new(0, 1, Region::new(0, 0, 100, 100));

        assert!(screen.set_struts(5, vec![Strut::new(Edge::Left, 8)]));
        assert!(!screen.set_struts(5, vec![Strut::new(Edge::Left, 8)]));
        assert!(screen.set_struts(5, Vec::new()));
        assert!(!screen.has_struts(5));
    }
}
