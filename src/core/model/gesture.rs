use super::Session;

use crate::change::Direction;
use crate::change::Toggle;
use crate::client::ClientFlags;
use crate::decoration::Decor;
use crate::decoration::FrameLayout;
use crate::stack::MenuId;

use winsys::event::Event;
use winsys::geometry::Dim;
use winsys::geometry::Distance;
use winsys::geometry::Pos;
use winsys::geometry::Region;
use winsys::hints::SizeHints;
use winsys::input::EventKind;
use winsys::input::InputEvent;
use winsys::input::KeyCode;
use winsys::input::KeyResolver;
use winsys::input::ModMask;
use winsys::window::Window;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GestureKind {
    Move { opaque: bool },
    ResizeRight { opaque: bool },
    ResizeLeft { opaque: bool },
    MenuMove { opaque: bool },
    ViewportMove,
    TaskSwitch,
}

impl GestureKind {
    #[inline]
    pub fn is_opaque(self) -> bool {
        match self {
            GestureKind::Move {
                opaque,
            }
            | GestureKind::ResizeRight {
                opaque,
            }
            | GestureKind::ResizeLeft {
                opaque,
            }
            | GestureKind::MenuMove {
                opaque,
            } => opaque,
            GestureKind::ViewportMove | GestureKind::TaskSwitch => true,
        }
    }

    /// The horizontal resize direction, east `1` or west `-1`.
    #[inline]
    fn resize_dir(self) -> Option<i32> {
        match self {
            GestureKind::ResizeRight {
                ..
            } => Some(1),
            GestureKind::ResizeLeft {
                ..
            } => Some(-1),
            _ => None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GestureTarget {
    Client(Window),
    Menu(MenuId),
    Root,
}

/// A modal pointer (or keyboard) interaction in progress. While one is
/// active, input is grabbed on the root window and every motion event
/// updates it instead of reaching the bindings.
#[derive(Debug, Clone)]
pub struct Gesture {
    pub kind: GestureKind,
    pub target: GestureTarget,
    origin: Pos,
    start: Region,
    candidate: Region,
    shaded: bool,
    /// The button that started the gesture; its release ends it.
    button: Option<u32>,
    /// The key that opened the task switcher; pressing it again steps.
    key: Option<u32>,
    pending: Vec<Event>,
    task_menu: Option<MenuId>,
}

impl Gesture {
    #[inline]
    pub fn button(&self) -> Option<u32> {
        self.button
    }

    #[inline]
    pub fn is_task_switch(&self) -> bool {
        self.kind == GestureKind::TaskSwitch
    }

    /// Holds back an event until the gesture is over.
    #[inline]
    pub fn defer(
        &mut self,
        event: Event,
    ) {
        self.pending.push(event);
    }
}

/// The client region a resize from `start` by `delta` proposes, and whether
/// it collapses the window to its title bar instead. `dir` is `1` when
/// the east edge follows the pointer and `-1` for the west edge, which
/// keeps the east edge in place.
pub fn resize_candidate(
    start: Region,
    delta: Distance,
    dir: i32,
    hints: &SizeHints,
    has_title: bool,
) -> (Region, bool) {
    let w = start.dim.w + dir * delta.dx;
    let h = start.dim.h + delta.dy;

    let shaded = h < 0 && has_title;
    let dim = hints.constrain(Dim::new(w, if shaded {
        start.dim.h
    } else {
        h
    }));

    let x = if dir < 0 {
        start.right() - dim.w
    } else {
        start.pos.x
    };

    (
        Region {
            pos: Pos::new(x, start.pos.y),
            dim,
        },
        shaded,
    )
}

impl<'a> Session<'a> {
    /// Grabs input and enters a gesture on `target`; does nothing while
    /// another gesture runs or when a grab is refused.
    pub(super) fn start_gesture(
        &mut self,
        kind: GestureKind,
        target: GestureTarget,
        origin: Pos,
        trigger: Option<u32>,
    ) {
        if self.gesture.is_some() {
            return;
        }

        let start = match target {
            GestureTarget::Client(window) => match self.clients.get(&window) {
                Some(client) => client.region(),
                None => return,
            },
            GestureTarget::Menu(id) => match self.menus.get(&id) {
                Some(menu) if menu.mapped => menu.region(),
                _ => return,
            },
            GestureTarget::Root => Region {
                pos: self.viewport.pos(),
                dim: self.viewport.screen(),
            },
        };

        let root = self.screen.root();

        if !self.conn.grab_pointer(root) {
            warn!("unable to grab pointer for {:?}", kind);
            return;
        }

        if !self.conn.grab_keyboard(root) {
            warn!("unable to grab keyboard for {:?}", kind);
            self.conn.release_pointer();
            return;
        }

        debug!("starting {:?} on {:?}", kind, target);

        let (button, key) = match kind {
            GestureKind::TaskSwitch => (None, trigger),
            _ => (trigger, None),
        };

        let task_menu = if kind == GestureKind::TaskSwitch {
            let center = self.workarea.center();
            self.open_task_menu(center, true)
        } else {
            None
        };

        self.gesture = Some(Gesture {
            kind,
            target,
            origin,
            start,
            candidate: start,
            shaded: false,
            button,
            key,
            pending: Vec::new(),
            task_menu,
        });

        if let Some(id) = task_menu {
            let item = self.menus.get(&id).and_then(|menu| {
                if menu.items.len() >= 3 {
                    Some(2)
                } else {
                    menu.first_selectable()
                }
            });

            self.focus_menu(id, item);
        }

        if kind.is_opaque() {
            self.dontsend = true;
        } else {
            let outline = self.outline(target, start, false);
            self.conn.draw_outline(root, outline);
        }
    }

    /// The frame outline shown for `region` of `target`.
    fn outline(
        &self,
        target: GestureTarget,
        region: Region,
        shaded: bool,
    ) -> Option<Region> {
        match target {
            GestureTarget::Client(window) => self.clients.get(&window).map(|client| {
                FrameLayout::new(
                    region,
                    client.effective_decor(),
                    shaded || client.is(ClientFlags::SHADED),
                    &self.style,
                )
                .frame
            }),
            GestureTarget::Menu(_) => Some(region),
            GestureTarget::Root => None,
        }
    }

    /// Follows the pointer to `pos`.
    pub fn gesture_motion(
        &mut self,
        pos: Pos,
    ) {
        let (kind, target, start, delta) = match &self.gesture {
            Some(gesture) => (gesture.kind, gesture.target, gesture.start, pos - gesture.origin),
            None => return,
        };

        let (candidate, shaded) = match (kind, target) {
            (GestureKind::TaskSwitch, _) => return,
            (GestureKind::ViewportMove, _) => {
                self.pan_viewport(start.pos - delta);
                return;
            },
            (GestureKind::Move {
                ..
            }, _)
            | (GestureKind::MenuMove {
                ..
            }, _) => (start.translated(delta), false),
            (_, GestureTarget::Client(window)) => {
                let (hints, has_title) = match self.clients.get(&window) {
                    Some(client) => (
                        client.size_hints(),
                        client.effective_decor().contains(Decor::TITLE),
                    ),
                    None => return,
                };

                let dir = kind.resize_dir().unwrap_or(1);
                resize_candidate(start, delta, dir, &hints, has_title)
            },
            _ => return,
        };

        if let Some(gesture) = self.gesture.as_mut() {
            gesture.candidate = candidate;
            gesture.shaded = shaded;
        }

        if !kind.is_opaque() {
            let outline = self.outline(target, candidate, shaded);
            self.conn.draw_outline(self.screen.root(), outline);
            return;
        }

        match target {
            GestureTarget::Client(window) => {
                if shaded {
                    return;
                }

                if let Some(client) = self.clients.get(&window) {
                    client.set_region(candidate);
                }

                self.configure_client(window);

                if kind.resize_dir().is_some() {
                    self.decorate(window);
                }
            },
            GestureTarget::Menu(id) => {
                if let Some(menu) = self.menus.get_mut(&id) {
                    menu.pos = candidate.pos;
                    self.conn.move_window(menu.frame, candidate.pos);
                }
            },
            GestureTarget::Root => {},
        }
    }

    /// Leaves the running gesture, committing its last candidate, and
    /// queues the events it held back.
    pub fn end_gesture(&mut self) {
        let gesture = match self.gesture.take() {
            Some(gesture) => gesture,
            None => return,
        };

        debug!("ending {:?} on {:?}", gesture.kind, gesture.target);

        let root = self.screen.root();
        self.conn.draw_outline(root, None);
        self.conn.release_pointer();
        self.conn.release_keyboard();
        self.dontsend = false;

        match (gesture.kind, gesture.target) {
            (GestureKind::TaskSwitch, _) => {
                if let Some(id) = gesture.task_menu {
                    self.unmap_menu(id);
                }
            },
            (GestureKind::ViewportMove, _) => {},
            (_, GestureTarget::Client(window)) => {
                let deleted = self
                    .clients
                    .get(&window)
                    .map_or(true, |client| client.is(ClientFlags::DELETED));

                if deleted {
                    debug!("dropping gesture result for deleted window {:#0x}", window);
                } else {
                    self.commit_client(window, gesture.kind, gesture.candidate, gesture.shaded);
                }
            },
            (_, GestureTarget::Menu(id)) => {
                if let Some(menu) = self.menus.get_mut(&id) {
                    menu.pos = gesture.candidate.pos;
                    self.conn.move_window(menu.frame, menu.pos);
                }
            },
            (_, GestureTarget::Root) => {},
        }

        self.reinjected.extend(gesture.pending);
    }

    fn commit_client(
        &mut self,
        window: Window,
        kind: GestureKind,
        candidate: Region,
        shaded: bool,
    ) {
        let pos = match self.clients.get(&window) {
            Some(client) => {
                client.set_region(candidate);
                candidate.pos
            },
            None => return,
        };

        self.configure_client(window);

        if kind.resize_dir().is_some() {
            if shaded {
                self.set_shade(window, Toggle::On);
            } else {
                self.decorate(window);
            }
        }

        self.conn
            .set_virtual_pos(window, pos + self.viewport_offset());
        self.sync_states(window);
    }

    /// Feeds input to a running task switch; returns whether the event was
    /// consumed by it.
    pub fn task_switch_input(
        &mut self,
        event: &InputEvent,
    ) -> bool {
        let (key, menu) = match &self.gesture {
            Some(gesture) if gesture.is_task_switch() => (gesture.key, gesture.task_menu),
            _ => return false,
        };

        let is_modifier = event.detail <= KeyCode::MAX as u32
            && self.keys.is_modifier(event.detail as KeyCode);

        match event.kind {
            EventKind::KeyPress if Some(event.detail) == key => {
                let dir = if event.state.contains(ModMask::SHIFT) {
                    Direction::Backward
                } else {
                    Direction::Forward
                };

                let next = menu.and_then(|id| self.menus.get(&id).and_then(|menu| menu.step(dir)));

                if let (Some(id), Some(next)) = (menu, next) {
                    self.hilite(id, next);
                }
            },
            EventKind::KeyPress if is_modifier => {},
            EventKind::KeyRelease if is_modifier => {
                let window = menu.and_then(|id| {
                    self.menus.get(&id).and_then(|menu| {
                        menu.hilite
                            .and_then(|item| menu.items.get(item))
                            .and_then(|item| item.window)
                    })
                });

                self.end_gesture();

                if let Some(window) = window {
                    self.activate(window);
                }
            },
            EventKind::KeyRelease => {},
            EventKind::KeyPress | EventKind::ButtonPress => {
                debug!("task switch cancelled");
                self.end_gesture();
            },
            _ => return false,
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::action::RootAction;
    use crate::action::WindowAction;
    use crate::mock::session;
    use crate::mock::MockConnection;

    fn drag(
        kind: EventKind,
        button: u32,
        window: Window,
        pos: Pos,
    ) -> InputEvent {
        let mut event = InputEvent::new(kind, button, ModMask::MOD1, window);
        event.root_pos = pos;
        event
    }

    #[test]
    fn resizes_snap_to_increments() {
        let hints = SizeHints {
            min_width: Some(50),
            min_height: Some(50),
            inc_width: Some(10),
            inc_height: Some(15),
            ..Default::default()
        };

        let start = Region::new(10, 10, 50, 50);
        let (region, shaded) = resize_candidate(start, Distance::new(26, 17), 1, &hints, true);

        assert!(!shaded);
        assert_eq!(region, Region::new(10, 10, 70, 65));

        let (region, _) = resize_candidate(start, Distance::new(-26, 17), -1, &hints, true);
        assert_eq!(region, Region::new(-10, 10, 70, 65));
    }

    #[test]
    fn resizing_past_zero_height_shades() {
        let start = Region::new(0, 0, 200, 100);
        let hints = SizeHints::default();

        let (region, shaded) = resize_candidate(start, Distance::new(0, -200), 1, &hints, true);
        assert!(shaded);
        assert_eq!(region.dim, Dim::new(200, 100));

        let (region, shaded) = resize_candidate(start, Distance::new(0, -200), 1, &hints, false);
        assert!(!shaded);
        assert_eq!(region.dim, Dim::new(200, 1));
    }

    #[test]
    fn shading_resize_remembers_the_height() {
        let conn = MockConnection::new();
        let mut session = session(&conn, "");

        let window = conn.client("xterm", Region::new(100, 100, 200, 100));
        session.adopt(window);

        let press = drag(EventKind::ButtonPress, 1, window, Pos::new(300, 200));
        session.window_action(window, WindowAction::ResizeRight, None, Some(&press));
        session.gesture_motion(Pos::new(300, 0));
        session.end_gesture();

        let client = session.client(window).unwrap();
        assert!(client.is(ClientFlags::SHADED));
        assert_eq!(client.region().dim, Dim::new(200, 100));

        session.set_shade(window, Toggle::Off);
        assert_eq!(session.client(window).unwrap().region(), Region::new(100, 100, 200, 100));
    }

    #[test]
    fn outline_moves_commit_on_release() {
        let conn = MockConnection::new();
        let mut session = session(&conn, "");

        let window = conn.client("xterm", Region::new(100, 100, 200, 100));
        session.adopt(window);

        let press = drag(EventKind::ButtonPress, 1, window, Pos::new(150, 150));
        session.window_action(window, WindowAction::Move, None, Some(&press));

        assert!(conn.is_grabbed());
        assert!(conn.outline().is_some());

        session.gesture_motion(Pos::new(200, 170));
        assert_eq!(session.client(window).unwrap().region().pos, Pos::new(100, 100));

        session.end_gesture();

        assert!(!conn.is_grabbed());
        assert_eq!(conn.outline(), None);
        assert_eq!(session.client(window).unwrap().region().pos, Pos::new(150, 120));
        assert_eq!(conn.virtual_pos(window), Some(Pos::new(150, 120)));
    }

    #[test]
    fn opaque_moves_apply_live() {
        let conn = MockConnection::new();
        let mut session = session(&conn, "");

        let window = conn.client("xterm", Region::new(100, 100, 200, 100));
        session.adopt(window);

        let press = drag(EventKind::ButtonPress, 1, window, Pos::new(150, 150));
        session.window_action(window, WindowAction::MoveOpaque, None, Some(&press));
        session.gesture_motion(Pos::new(160, 150));

        assert_eq!(session.client(window).unwrap().region().pos, Pos::new(110, 100));
        assert_eq!(conn.outline(), None);

        session.end_gesture();
        assert!(!session.dontsend);
    }

    #[test]
    fn destroying_the_target_ends_the_gesture() {
        let conn = MockConnection::new();
        let mut session = session(&conn, "");

        let window = conn.client("xterm", Region::new(100, 100, 200, 100));
        session.adopt(window);

        let press = drag(EventKind::ButtonPress, 1, window, Pos::new(150, 150));
        session.window_action(window, WindowAction::Move, None, Some(&press));
        session.gesture_motion(Pos::new(400, 400));

        session.unmanage(window, true);

        assert!(session.gesture.is_none());
        assert!(session.client(window).is_none());
        assert!(!conn.is_grabbed());
    }

    #[test]
    fn task_switch_commits_on_modifier_release() {
        let conn = MockConnection::new();
        let mut session = session(&conn, "");

        let first = conn.client("xterm", Region::new(100, 100, 200, 100));
        let second = conn.client("xclock", Region::new(400, 100, 200, 100));
        session.adopt(first);
        session.adopt(second);
        assert_eq!(session.focused(), Some(second));

        let tab = session.keys["Tab"] as u32;
        let alt = session.keys["Alt_L"] as u32;

        let press = InputEvent::new(EventKind::KeyPress, tab, ModMask::MOD1, session.root());
        session.root_action(RootAction::TaskSwitcher, None, Some(&press));

        let menu = session.menus.values().find(|menu| menu.mapped).unwrap();
        assert_eq!(menu.items[menu.hilite.unwrap()].window, Some(first));

        let release = InputEvent::new(EventKind::KeyRelease, tab, ModMask::MOD1, session.root());
        assert!(session.task_switch_input(&release));

        let release = InputEvent::new(EventKind::KeyRelease, alt, ModMask::MOD1, session.root());
        assert!(session.task_switch_input(&release));

        assert!(session.gesture.is_none());
        assert!(session.menus.values().all(|menu| !menu.mapped));
        assert_eq!(session.focused(), Some(first));
    }

    #[test]
    fn task_switch_steps_and_cancels() {
        let conn = MockConnection::new();
        let mut session = session(&conn, "");

        let windows: Vec<_> = (0..3)
            .map(|i| conn.client("xterm", Region::new(100 * i, 100, 90, 90)))
            .collect();

        for &window in &windows {
            session.adopt(window);
        }

        let tab = session.keys["Tab"] as u32;
        let escape = session.keys["Escape"] as u32;

        let press = InputEvent::new(EventKind::KeyPress, tab, ModMask::MOD1, session.root());
        session.root_action(RootAction::TaskSwitcher, None, Some(&press));
        assert!(session.task_switch_input(&press));

        let menu = session.menus.values().find(|menu| menu.mapped).unwrap();
        assert_eq!(menu.items[menu.hilite.unwrap()].window, Some(windows[0]));

        let cancel = InputEvent::new(EventKind::KeyPress, escape, ModMask::MOD1, session.root());
        assert!(session.task_switch_input(&cancel));

        assert!(session.gesture.is_none());
        assert_eq!(session.focused(), Some(windows[2]));
    }
}
