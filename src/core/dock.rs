use crate::config::DockConfig;
use crate::config::DockDirection;
use crate::desktop::DesktopMask;
use crate::matcher::Predicate;
use crate::matcher::WindowIdent;
use crate::stack::Layer;

use winsys::geometry::Dim;
use winsys::geometry::Edge;
use winsys::geometry::Pos;
use winsys::geometry::Region;
use winsys::geometry::Strut;
use winsys::window::Window;

/// A withdrawn client hosted inside a dock.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Dockapp {
    pub window: Window,
    pub dim: Dim,
    /// The index of the order predicate that routed it here.
    pub rank: usize,
    /// Relative to the dock.
    pub pos: Pos,
}

/// One row or column of dockapps with its own placement policy.
#[derive(Debug)]
pub struct DockHandler {
    index: usize,
    frame: Window,
    config: DockConfig,
    order: Vec<Predicate>,
    apps: Vec<Dockapp>,
    region: Option<Region>,
}

impl DockHandler {
    pub fn new(
        index: usize,
        frame: Window,
        config: DockConfig,
    ) -> Self {
        let order = config
            .order
            .iter()
            .filter_map(|text| match Predicate::parse(text) {
                Ok(predicate) => Some(predicate),
                Err(err) => {
                    warn!("dock {}: ignoring order entry \"{}\": {}", index, text, err);
                    None
                },
            })
            .collect();

        Self {
            index,
            frame,
            config,
            order,
            apps: Vec::new(),
            region: None,
        }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn frame(&self) -> Window {
        self.frame
    }

    #[inline]
    pub fn layer(&self) -> Layer {
        self.config.stacking
    }

    #[inline]
    pub fn in_workarea(&self) -> bool {
        self.config.in_workarea
    }

    #[inline]
    pub fn region(&self) -> Option<Region> {
        self.region
    }

    #[inline]
    pub fn apps(&self) -> &[Dockapp] {
        &self.apps
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    #[inline]
    pub fn contains(
        &self,
        window: Window,
    ) -> bool {
        self.apps.iter().any(|app| app.window == window)
    }

    /// Whether the dock shows on the desktop with bit `desktop`.
    #[inline]
    pub fn visible_on(
        &self,
        desktop: DesktopMask,
    ) -> bool {
        self.config
            .desktop_mask
            .map_or(true, |mask| mask & desktop != 0)
    }

    /// The index of the first order predicate matching `ident`.
    pub fn rank_of(
        &self,
        ident: &WindowIdent,
    ) -> Option<usize> {
        self.order
            .iter()
            .position(|predicate| predicate.matches(ident))
    }

    #[inline]
    fn catches_all(&self) -> bool {
        self.order.is_empty()
    }

    pub fn add(
        &mut self,
        window: Window,
        dim: Dim,
        rank: usize,
    ) {
        if !self.contains(window) {
            self.apps.push(Dockapp {
                window,
                dim,
                rank,
                pos: Pos::default(),
            });
        }
    }

    pub fn remove(
        &mut self,
        window: Window,
    ) -> bool {
        let len = self.apps.len();
        self.apps.retain(|app| app.window != window);
        self.apps.len() != len
    }

    pub fn resize_app(
        &mut self,
        window: Window,
        dim: Dim,
    ) -> bool {
        match self.apps.iter_mut().find(|app| app.window == window) {
            Some(app) if app.dim != dim => {
                app.dim = dim;
                true
            },
            _ => false,
        }
    }

    /// Sorts the dockapps by rank, keeping arrival order among equals, and
    /// lays them out in grid order inside `area`. Returns the dock's
    /// absolute region, or `None` if it hosts nothing.
    pub fn update(
        &mut self,
        area: Region,
    ) -> Option<Region> {
        self.apps.sort_by_key(|app| app.rank);

        if self.apps.is_empty() {
            self.region = None;
            return None;
        }

        let gap = std::cmp::max(self.config.grid_space, 0);
        let vertical = self.config.direction == DockDirection::Vertical;

        // along is the direction of the configured axis, across the other
        let (limit, along, across): (i32, fn(Dim) -> i32, fn(Dim) -> i32) = if vertical {
            (area.dim.h, |dim| dim.h, |dim| dim.w)
        } else {
            (area.dim.w, |dim| dim.w, |dim| dim.h)
        };

        let mut line_offset = gap;
        let mut line_breadth = 0;
        let mut cursor = gap;
        let mut extent = 0;

        for app in self.apps.iter_mut() {
            let length = along(app.dim);

            if cursor > gap && cursor + length + gap > limit {
                line_offset += line_breadth + gap;
                line_breadth = 0;
                cursor = gap;
            }

            app.pos = if vertical {
                Pos::new(line_offset, cursor)
            } else {
                Pos::new(cursor, line_offset)
            };

            cursor += length + gap;
            extent = std::cmp::max(extent, cursor);
            line_breadth = std::cmp::max(line_breadth, across(app.dim));
        }

        let breadth = line_offset + line_breadth + gap;
        let dim = if vertical {
            Dim::new(breadth, extent)
        } else {
            Dim::new(extent, breadth)
        };

        let mut region = self
            .config
            .geometry
            .resolve(Region::new(0, 0, dim.w, dim.h), area.dim);

        region.dim = dim;

        if self.config.centered {
            if vertical {
                region.pos.y = (area.dim.h - dim.h) / 2;
            } else {
                region.pos.x = (area.dim.w - dim.w) / 2;
            }
        }

        region.pos.x = region.pos.x.max(0).min(std::cmp::max(area.dim.w - dim.w, 0));
        region.pos.y = region.pos.y.max(0).min(std::cmp::max(area.dim.h - dim.h, 0));
        region.pos.x += area.pos.x;
        region.pos.y += area.pos.y;

        self.region = Some(region);
        Some(region)
    }

    /// The strut a dock kept outside the workarea reserves along the screen
    /// edge it is nearest to.
    pub fn strut(
        &self,
        screen: Region,
    ) -> Option<Strut> {
        if self.config.in_workarea {
            return None;
        }

        let region = self.region?;
        let center = region.center();
        let screen_center = screen.center();

        Some(match self.config.direction {
            DockDirection::Vertical if center.x < screen_center.x => {
                Strut::new(Edge::Left, region.right() - screen.pos.x)
            },
            DockDirection::Vertical => Strut::new(Edge::Right, screen.right() - region.pos.x),
            DockDirection::Horizontal if center.y < screen_center.y => {
                Strut::new(Edge::Top, region.bottom() - screen.pos.y)
            },
            DockDirection::Horizontal => Strut::new(Edge::Bottom, screen.bottom() - region.pos.y),
        })
    }
}

/// The docks of a screen and the routing of new dockapps between them.
#[derive(Debug)]
pub struct Docks {
    handlers: Vec<DockHandler>,
}

impl Docks {
    pub fn new(handlers: Vec<DockHandler>) -> Self {
        Self {
            handlers,
        }
    }

    #[inline]
    pub fn handlers(&self) -> &[DockHandler] {
        &self.handlers
    }

    #[inline]
    pub fn get(
        &self,
        index: usize,
    ) -> Option<&DockHandler> {
        self.handlers.get(index)
    }

    #[inline]
    pub fn get_mut(
        &mut self,
        index: usize,
    ) -> Option<&mut DockHandler> {
        self.handlers.get_mut(index)
    }

    /// The handler collecting everything no order list claims: the last one
    /// without an order list, else the last one.
    pub fn sink(&self) -> Option<usize> {
        self.handlers
            .iter()
            .rposition(DockHandler::catches_all)
            .or_else(|| self.handlers.len().checked_sub(1))
    }

    /// Where a new dockapp goes, and the rank it sorts by there.
    pub fn route(
        &self,
        ident: &WindowIdent,
    ) -> Option<(usize, usize)> {
        self.handlers
            .iter()
            .find_map(|handler| {
                handler
                    .rank_of(ident)
                    .map(|rank| (handler.index, rank))
            })
            .or_else(|| {
                self.sink()
                    .map(|sink| (sink, self.handlers[sink].order.len()))
            })
    }

    pub fn holding(
        &self,
        window: Window,
    ) -> Option<usize> {
        self.handlers
            .iter()
            .position(|handler| handler.contains(window) || handler.frame == window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler(
        index: usize,
        order: &[&str],
    ) -> DockHandler {
        DockHandler::new(index, 100 + index as Window, DockConfig {
            order: order.iter().map(|&text| text.to_owned()).collect(),
            ..DockConfig::default()
        })
    }

    fn dockapp(class: &str) -> WindowIdent {
        WindowIdent::new(class, class, class)
    }

    #[test]
    fn routing_by_order_then_catch_all() {
        let docks = Docks::new(vec![handler(0, &["c/xmms/"]), handler(1, &[])]);

        assert_eq!(docks.sink(), Some(1));
        assert_eq!(docks.route(&dockapp("xmms_panel")), Some((0, 0)));
        assert_eq!(docks.route(&dockapp("xclock")), Some((1, 0)));

        let docks = Docks::new(vec![handler(0, &["n/xclock/"]), handler(1, &[])]);
        assert_eq!(docks.route(&dockapp("xclock")), Some((0, 0)));
    }

    #[test]
    fn first_matching_predicate_ranks() {
        let docks = Docks::new(vec![handler(0, &["c/wmclock/", "c/^wm/", "c/bogus"])]);

        assert_eq!(docks.get(0).map(|handler| handler.order.len()), Some(2));
        assert_eq!(docks.route(&dockapp("wmclock")), Some((0, 0)));
        assert_eq!(docks.route(&dockapp("wmcpu")), Some((0, 1)));
        assert_eq!(docks.route(&dockapp("xeyes")), Some((0, 2)));
    }

    #[test]
    fn layout_sorts_by_rank_and_stacks_along_the_direction() {
        let mut dock = handler(0, &["c/a/", "c/b/"]);

        dock.add(1, Dim::new(56, 56), 1);
        dock.add(2, Dim::new(56, 56), 0);
        dock.add(3, Dim::new(56, 40), 1);

        let screen = Region::new(0, 0, 1000, 800);
        let region = dock.update(screen).unwrap();

        let order: Vec<Window> = dock.apps().iter().map(|app| app.window).collect();
        assert_eq!(order, vec![2, 1, 3]);

        assert_eq!(dock.apps()[1].pos, Pos::new(2, 60));
        assert_eq!(dock.apps()[2].pos, Pos::new(2, 118));
        assert_eq!(region, Region::new(940, 0, 60, 160));

        assert_eq!(dock.strut(screen), Some(Strut::new(Edge::Right, 60)));
    }

    #[test]
    fn full_columns_wrap() {
        let mut dock = handler(0, &[]);

        for window in 1..=3 {
            dock.add(window, Dim::new(20, 40), 0);
        }

        let region = dock.update(Region::new(0, 0, 500, 100)).unwrap();

        assert_eq!(dock.apps()[2].pos, Pos::new(24, 2));
        assert_eq!(region.dim, Dim::new(46, 86));
    }

    #[test]
    fn empty_docks_take_no_space() {
        let mut dock = handler(0, &[]);
        dock.add(1, Dim::new(56, 56), 0);
        dock.update(Region::new(0, 0, 1000, 800));

        assert!(dock.remove(1));
        assert_eq!(dock.update(Region::new(0, 0, 1000, 800)), None);
        assert_eq!(dock.strut(Region::new(0, 0, 1000, 800)), None);
    }
}
