use super::GestureKind;
use super::GestureTarget;
use super::Request;
use super::Session;

use crate::action::RootAction;
use crate::change::Direction;
use crate::change::Toggle;
use crate::client::ClientFlags;
use crate::client::MergeMode;

use winsys::geometry::GeometrySpec;
use winsys::geometry::Pos;
use winsys::geometry::Region;
use winsys::input::InputEvent;
use winsys::window::Window;

/// The `(dx, dy)` offset of a geometry's position part; a `-` sign
/// negates.
fn offsets(spec: &GeometrySpec) -> (i32, i32) {
    let dx = spec.x.unwrap_or(0);
    let dy = spec.y.unwrap_or(0);

    (
        if spec.x_negative { -dx } else { dx },
        if spec.y_negative { -dy } else { dy },
    )
}

impl<'a> Session<'a> {
    pub(super) fn root_action(
        &mut self,
        action: RootAction,
        param: Option<&str>,
        event: Option<&InputEvent>,
    ) {
        debug!("root action {:?} on screen {}", action, self.screen.number());

        let root = self.screen.root();
        let pointer = event
            .map(|event| event.root_pos)
            .unwrap_or_else(|| self.conn.pointer_position(root));

        let geometry = || match param.and_then(GeometrySpec::parse) {
            Some(spec) => Some(spec),
            None => {
                warn!("invalid geometry {:?} for {}", param, <&str>::from(action));
                None
            },
        };

        match action {
            RootAction::Focus => self.focus_root(),
            RootAction::MenuMap
            | RootAction::MenuRemap
            | RootAction::MenuMapFocused
            | RootAction::MenuRemapFocused => {
                let focused = matches!(
                    action,
                    RootAction::MenuMapFocused | RootAction::MenuRemapFocused
                );
                let remap = matches!(action, RootAction::MenuRemap | RootAction::MenuRemapFocused);

                if let Some(name) = param {
                    self.menu_map(name, pointer, focused, remap, None);
                }
            },
            RootAction::MenuUnmap | RootAction::MenuUnmapFocused => {
                if let Some(name) = param {
                    self.menu_unmap(name, action == RootAction::MenuUnmapFocused);
                }
            },
            RootAction::GotoDesktop => {
                match param.and_then(|param| param.trim().parse::<usize>().ok()) {
                    Some(index) if index < self.desktops.count() => self.goto_desktop(index),
                    _ => warn!("invalid desktop {:?}", param),
                }
            },
            RootAction::NextDesktop => {
                let next = self.desktops.neighbour(Direction::Forward);
                self.goto_desktop(next);
            },
            RootAction::PreviousDesktop => {
                let previous = self.desktops.neighbour(Direction::Backward);
                self.goto_desktop(previous);
            },
            RootAction::ViewportLeft
            | RootAction::ViewportRight
            | RootAction::ViewportUp
            | RootAction::ViewportDown => {
                let screen = self.viewport.screen();
                let pos = self.viewport.pos();

                self.pan_viewport(match action {
                    RootAction::ViewportLeft => Pos::new(pos.x - screen.w, pos.y),
                    RootAction::ViewportRight => Pos::new(pos.x + screen.w, pos.y),
                    RootAction::ViewportUp => Pos::new(pos.x, pos.y - screen.h),
                    _ => Pos::new(pos.x, pos.y + screen.h),
                });
            },
            RootAction::ViewportRelativeMove => {
                if let Some(spec) = geometry() {
                    let (dx, dy) = offsets(&spec);
                    let pos = self.viewport.pos();

                    self.pan_viewport(Pos::new(pos.x + dx, pos.y + dy));
                }
            },
            RootAction::ViewportFixedMove => {
                if let Some(spec) = geometry() {
                    let current = Region {
                        pos: self.viewport.pos(),
                        dim: self.viewport.screen(),
                    };

                    let target = spec.resolve(current, self.viewport.canvas());
                    self.pan_viewport(target.pos);
                }
            },
            RootAction::StartViewportMove => self.start_gesture(
                GestureKind::ViewportMove,
                GestureTarget::Root,
                pointer,
                event
                    .filter(|event| event.kind.is_button())
                    .map(|event| event.detail),
            ),
            RootAction::EndMoveResize => self.end_gesture(),
            RootAction::PointerRelativeWarp => {
                if let Some(spec) = geometry() {
                    let (dx, dy) = offsets(&spec);
                    self.conn
                        .warp_pointer(root, Pos::new(pointer.x + dx, pointer.y + dy));
                }
            },
            RootAction::PointerFixedWarp => {
                if let Some(spec) = geometry() {
                    let current = Region {
                        pos: pointer,
                        dim: Default::default(),
                    };

                    let target = spec.resolve(current, self.screen.full_region().dim);
                    self.conn.warp_pointer(root, target.pos);
                }
            },
            RootAction::TaskSwitcher => self.start_gesture(
                GestureKind::TaskSwitch,
                GestureTarget::Root,
                pointer,
                event
                    .filter(|event| event.kind.is_key())
                    .map(|event| event.detail),
            ),
            RootAction::NextTask => self.cycle_task(Direction::Forward),
            RootAction::PreviousTask => self.cycle_task(Direction::Backward),
            RootAction::Restart => {
                info!("restart requested");
                self.request = Some(Request::Restart(
                    param
                        .map(str::trim)
                        .filter(|command| !command.is_empty())
                        .map(str::to_owned),
                ));
            },
            RootAction::Exit => {
                info!("exit requested");
                self.request = Some(Request::Exit);
            },
            RootAction::Nop => {},
        }
    }

    /// Brings `window` into view: its desktop, out of minimization and to
    /// the front of its merge group; then raises and focuses it.
    pub(super) fn activate(
        &mut self,
        window: Window,
    ) {
        let (desktops, clone_slot) = match self.clients.get(&window) {
            Some(client) => (
                client.desktops(),
                client.master().is_some() && client.merge_mode() == MergeMode::Clone,
            ),
            None => return,
        };

        if desktops & self.desktops.current_bit() == 0 {
            self.goto_desktop(desktops.trailing_zeros() as usize);
        }

        let owner = self.owner(window);

        if self
            .clients
            .get(&owner)
            .map_or(false, |client| client.is(ClientFlags::MINIMIZED))
        {
            self.set_minimized(owner, Toggle::Off);
        }

        if clone_slot {
            self.merged_to_front(window);
        }

        self.raise(owner);
        self.focus_client(window);
    }

    /// Focuses the next (or previous) window of the current desktop in
    /// focus order.
    fn cycle_task(
        &mut self,
        dir: Direction,
    ) {
        let current = self.desktops.current();
        let clients = &self.clients;

        let next = self.recency.cycle(dir, |window| {
            clients
                .get(&window)
                .map_or(false, |client| client.on_desktop(current))
        });

        if let Some(window) = next {
            self.activate(window);
        }
    }
}
