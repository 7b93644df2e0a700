use super::GestureKind;
use super::GestureTarget;
use super::Session;

use crate::action::WindowAction;
use crate::change::Toggle;
use crate::client::ClientFlags;
use crate::client::MemoryKind;
use crate::client::MergeMode;
use crate::client::Restore;
use crate::decoration::Decor;
use crate::desktop::desktop_bit;
use crate::desktop::parse_mask;
use crate::desktop::DesktopMask;
use crate::placement::center_on;
use crate::placement::smart_place;
use crate::stack::Stacked;

use winsys::geometry::Distance;
use winsys::geometry::GeometrySpec;
use winsys::geometry::Pos;
use winsys::geometry::Region;
use winsys::input::InputEvent;
use winsys::window::IcccmWindowState;
use winsys::window::Window;
use winsys::window::WindowState;

use std::str::FromStr;

impl<'a> Session<'a> {
    pub(super) fn window_action(
        &mut self,
        window: Window,
        action: WindowAction,
        param: Option<&str>,
        event: Option<&InputEvent>,
    ) {
        if !self.clients.contains_key(&window) {
            return;
        }

        debug!("window action {:?} on {:#0x}", action, window);

        let origin = event
            .map(|event| event.root_pos)
            .unwrap_or_else(|| self.conn.pointer_position(self.screen.root()));

        let button = event
            .filter(|event| event.kind.is_button())
            .map(|event| event.detail);

        let owner = self.owner(window);

        match action {
            WindowAction::Raise => self.raise(owner),
            WindowAction::Lower => self.lower(owner),
            WindowAction::Focus => self.focus_client(window),
            WindowAction::RaiseFocus => {
                self.raise(owner);
                self.focus_client(window);
            },
            WindowAction::Close => {
                if !self.conn.close_window(window) {
                    debug!("window {:#0x} does not support closing, killed", window);
                }
            },
            WindowAction::Kill => self.conn.kill_window(window),
            WindowAction::Move | WindowAction::MoveOpaque => self.start_gesture(
                GestureKind::Move {
                    opaque: action == WindowAction::MoveOpaque,
                },
                GestureTarget::Client(owner),
                origin,
                button,
            ),
            WindowAction::ResizeRight | WindowAction::ResizeRightOpaque => self.start_gesture(
                GestureKind::ResizeRight {
                    opaque: action == WindowAction::ResizeRightOpaque,
                },
                GestureTarget::Client(owner),
                origin,
                button,
            ),
            WindowAction::ResizeLeft | WindowAction::ResizeLeftOpaque => self.start_gesture(
                GestureKind::ResizeLeft {
                    opaque: action == WindowAction::ResizeLeftOpaque,
                },
                GestureTarget::Client(owner),
                origin,
                button,
            ),
            WindowAction::Shade => self.set_shade(window, Toggle::On),
            WindowAction::Unshade => self.set_shade(window, Toggle::Off),
            WindowAction::ToggleShade => self.set_shade(window, Toggle::Reverse),
            WindowAction::Maximize => self.set_max(window, Toggle::On, ClientFlags::MAXED),
            WindowAction::Unmaximize => self.set_max(window, Toggle::Off, ClientFlags::MAXED),
            WindowAction::ToggleMaximize => {
                self.set_max(window, Toggle::Reverse, ClientFlags::MAXED)
            },
            WindowAction::Sticky => self.set_sticky(window, Toggle::On),
            WindowAction::Unsticky => self.set_sticky(window, Toggle::Off),
            WindowAction::ToggleSticky => self.set_sticky(window, Toggle::Reverse),
            WindowAction::Minimize => self.set_minimized(window, Toggle::On),
            WindowAction::Unminimize => self.set_minimized(window, Toggle::Off),
            WindowAction::ToggleMinimize => self.set_minimized(window, Toggle::Reverse),
            WindowAction::FullscreenOn => self.set_fullscreen(window, Toggle::On),
            WindowAction::FullscreenOff => self.set_fullscreen(window, Toggle::Off),
            WindowAction::FullscreenToggle => self.set_fullscreen(window, Toggle::Reverse),
            WindowAction::DecorTitleOn => self.set_decor(window, Decor::TITLE, Toggle::On),
            WindowAction::DecorTitleOff => self.set_decor(window, Decor::TITLE, Toggle::Off),
            WindowAction::DecorTitleToggle => {
                self.set_decor(window, Decor::TITLE, Toggle::Reverse)
            },
            WindowAction::DecorHandleOn => self.set_decor(window, Decor::HANDLE, Toggle::On),
            WindowAction::DecorHandleOff => self.set_decor(window, Decor::HANDLE, Toggle::Off),
            WindowAction::DecorHandleToggle => {
                self.set_decor(window, Decor::HANDLE, Toggle::Reverse)
            },
            WindowAction::DecorBorderOn => self.set_decor(window, Decor::BORDER, Toggle::On),
            WindowAction::DecorBorderOff => self.set_decor(window, Decor::BORDER, Toggle::Off),
            WindowAction::DecorBorderToggle => {
                self.set_decor(window, Decor::BORDER, Toggle::Reverse)
            },
            WindowAction::DecorAllOn => self.set_decor(window, Decor::ALL, Toggle::On),
            WindowAction::DecorAllOff => self.set_decor(window, Decor::ALL, Toggle::Off),
            WindowAction::DecorAllToggle => self.set_decor(window, Decor::ALL, Toggle::Reverse),
            WindowAction::AlwaysOnTopOn => {
                self.set_layer_flag(window, ClientFlags::ALWAYS_ON_TOP, Toggle::On)
            },
            WindowAction::AlwaysOnTopOff => {
                self.set_layer_flag(window, ClientFlags::ALWAYS_ON_TOP, Toggle::Off)
            },
            WindowAction::AlwaysOnTopToggle => {
                self.set_layer_flag(window, ClientFlags::ALWAYS_ON_TOP, Toggle::Reverse)
            },
            WindowAction::AlwaysAtBottomOn => {
                self.set_layer_flag(window, ClientFlags::ALWAYS_AT_BOTTOM, Toggle::On)
            },
            WindowAction::AlwaysAtBottomOff => {
                self.set_layer_flag(window, ClientFlags::ALWAYS_AT_BOTTOM, Toggle::Off)
            },
            WindowAction::AlwaysAtBottomToggle => {
                self.set_layer_flag(window, ClientFlags::ALWAYS_AT_BOTTOM, Toggle::Reverse)
            },
            WindowAction::MoveResize => self.move_resize(window, param.unwrap_or(""), false),
            WindowAction::MoveResizeVirtual => {
                self.move_resize(window, param.unwrap_or(""), true)
            },
            WindowAction::MoveToPointer => self.move_to_pointer(window, origin),
            WindowAction::MoveToSmartPlace => self.move_to_smart_place(window),
            WindowAction::DesktopMask => match param.and_then(parse_mask) {
                Some(mask) => self.set_desktops(window, mask),
                None => warn!("invalid desktop mask {:?}", param),
            },
            WindowAction::JoinDesktop
            | WindowAction::PartDesktop
            | WindowAction::PartCurrentJoinDesktop => {
                let bit = match param.and_then(|param| param.trim().parse::<usize>().ok()) {
                    Some(index) if index < self.desktops.count() => desktop_bit(index),
                    _ => {
                        warn!("invalid desktop {:?} for {}", param, <&str>::from(action));
                        return;
                    },
                };

                let mask = self.client(window).map_or(0, |client| client.desktops());
                let current = self.desktops.current_bit();

                self.set_desktops(window, match action {
                    WindowAction::JoinDesktop => mask | bit,
                    WindowAction::PartDesktop => mask & !bit,
                    _ => (mask & !current) | bit,
                });
            },
            WindowAction::PartCurrentDesktop => {
                let mask = self.client(window).map_or(0, |client| client.desktops());
                self.set_desktops(window, mask & !self.desktops.current_bit());
            },
            WindowAction::JoinAllDesktops => self.set_desktops(window, self.desktops.all()),
            WindowAction::PartAllDesktopsExceptCurrent => {
                self.set_desktops(window, self.desktops.current_bit())
            },
            WindowAction::CloneMergeWithWindow => {
                self.merge_under_pointer(window, origin, MergeMode::Clone)
            },
            WindowAction::VertMergeWithWindow => {
                self.merge_under_pointer(window, origin, MergeMode::Vertical)
            },
            WindowAction::HorizMergeWithWindow => {
                self.merge_under_pointer(window, origin, MergeMode::Horizontal)
            },
            WindowAction::Explode => self.explode(window),
            WindowAction::MergedToFront => self.merged_to_front(window),
            WindowAction::Unmerge => self.unmerge(window),
            WindowAction::SetMergeMode => match param.map(|param| MergeMode::from_str(param.trim())) {
                Some(Ok(mode)) => self.set_merge_mode(window, mode),
                _ => warn!("invalid merge mode {:?}", param),
            },
            WindowAction::NextMergeMode => {
                if let Some(mode) = self.client(window).map(|client| client.merge_mode()) {
                    self.set_merge_mode(window, mode.next());
                }
            },
            WindowAction::PrevMergeMode => {
                if let Some(mode) = self.client(window).map(|client| client.merge_mode()) {
                    self.set_merge_mode(window, mode.prev());
                }
            },
            WindowAction::MenuMap
            | WindowAction::MenuRemap
            | WindowAction::MenuMapFocused
            | WindowAction::MenuRemapFocused => {
                let focused = matches!(
                    action,
                    WindowAction::MenuMapFocused | WindowAction::MenuRemapFocused
                );
                let remap = matches!(
                    action,
                    WindowAction::MenuRemap | WindowAction::MenuRemapFocused
                );

                if let Some(name) = param {
                    self.menu_map(name, origin, focused, remap, Some(window));
                }
            },
            WindowAction::MenuUnmap | WindowAction::MenuUnmapFocused => {
                if let Some(name) = param {
                    self.menu_unmap(name, action == WindowAction::MenuUnmapFocused);
                }
            },
        }
    }

    /// Puts the window at the head of its stacking group, followed by the
    /// windows transient for it when configured.
    pub(super) fn raise(
        &mut self,
        window: Window,
    ) {
        let window = self.owner(window);
        let entry = Stacked::Client(window);
        self.stack.raise(entry);

        if self.config.transient_above {
            let transients: Vec<Window> = self
                .managed
                .iter()
                .copied()
                .filter(|&managed| {
                    self.clients.get(&managed).map_or(false, |client| {
                        client.transient_for() == Some(window) && client.master().is_none()
                    })
                })
                .collect();

            for transient in transients {
                self.stack.place_above(Stacked::Client(transient), entry);
            }
        }

        self.restack();
    }

    pub(super) fn lower(
        &mut self,
        window: Window,
    ) {
        let window = self.owner(window);
        self.stack.lower(Stacked::Client(window));
        self.restack();
    }

    /// Collapses the frame to its title bar; the client keeps its region,
    /// which comes back on unshade.
    pub fn set_shade(
        &mut self,
        window: Window,
        toggle: Toggle,
    ) {
        let window = self.owner(window);
        let client = match self.clients.get(&window) {
            Some(client) => client,
            None => return,
        };

        let shaded = client.is(ClientFlags::SHADED);
        let shade = toggle.eval(shaded);

        if shade == shaded || (shade && !client.effective_decor().contains(Decor::TITLE)) {
            return;
        }

        client.set_flag(ClientFlags::SHADED, shade);

        self.configure_client(window);
        self.decorate(window);
        self.sync_states(window);
    }

    /// Maximizes (or restores) `window` along the `axes`.
    pub fn set_max(
        &mut self,
        window: Window,
        toggle: Toggle,
        axes: ClientFlags,
    ) {
        let window = self.owner(window);
        let client = match self.clients.get(&window) {
            Some(client) => client,
            None => return,
        };

        let axes = axes & ClientFlags::MAXED;
        let before = client.flags() & ClientFlags::MAXED;
        let maximize = toggle.eval(before.contains(axes));

        if maximize {
            if before.contains(axes) {
                return;
            }

            if before.is_empty() {
                client.remember(MemoryKind::Max);
            }

            client.set_flag(axes, true);
            self.fit_max(window);
        } else {
            if !before.intersects(axes) {
                return;
            }

            client.set_flag(axes, false);

            let after = client.flags() & ClientFlags::MAXED;

            if after.is_empty() {
                match client.forget(MemoryKind::Max) {
                    Restore::Region(memory) => {
                        client.set_region(memory.region);
                        self.configure_client(window);
                    },
                    Restore::Deferred(_) | Restore::NotAsserted => {},
                }
            } else if let Some(memory) = client.memory(MemoryKind::Max) {
                let mut region = client.region();

                if !after.contains(ClientFlags::MAXED_H) {
                    region.pos.x = memory.region.pos.x;
                    region.dim.w = memory.region.dim.w;
                }

                if !after.contains(ClientFlags::MAXED_V) {
                    region.pos.y = memory.region.pos.y;
                    region.dim.h = memory.region.dim.h;
                }

                client.set_region(region);
                self.configure_client(window);
            }
        }

        self.sync_states(window);
    }

    /// Fits a maximized window to the workarea along its maximized axes.
    pub(super) fn fit_max(
        &mut self,
        window: Window,
    ) {
        let client = match self.clients.get(&window) {
            Some(client) if !client.is(ClientFlags::FULLSCREEN) => client,
            _ => return,
        };

        let extents = client.effective_decor().extents(&self.style);
        let area = self.workarea.without_extents(&extents);
        let mut region = client.region();

        if client.is(ClientFlags::MAXED_H) {
            region.pos.x = area.pos.x;
            region.dim.w = area.dim.w;
        }

        if client.is(ClientFlags::MAXED_V) {
            region.pos.y = area.pos.y;
            region.dim.h = area.dim.h;
        }

        region.dim = client.size_hints().constrain(region.dim);
        client.set_region(region);

        self.configure_client(window);
    }

    pub fn set_fullscreen(
        &mut self,
        window: Window,
        toggle: Toggle,
    ) {
        let window = self.owner(window);
        let client = match self.clients.get(&window) {
            Some(client) => client,
            None => return,
        };

        let fullscreen = client.is(ClientFlags::FULLSCREEN);
        let on = toggle.eval(fullscreen);

        if on == fullscreen {
            return;
        }

        let entry = Stacked::Client(window);

        if on {
            client.remember(MemoryKind::Fullscreen);
            client.set_flag(ClientFlags::FULLSCREEN, true);
            client.set_region(self.screen.full_region());
        } else {
            client.set_flag(ClientFlags::FULLSCREEN, false);

            if let Restore::Region(memory) = client.forget(MemoryKind::Fullscreen) {
                client.set_region(memory.region);
            }
        }

        let layer = client.requested_layer();
        let refit = !on && client.flags().intersects(ClientFlags::MAXED);

        client.set_layer(layer);

        if !client.is(ClientFlags::MINIMIZED) {
            self.stack.relayer(entry, layer);
            self.stack.raise(entry);
        }

        self.configure_client(window);

        if refit {
            self.fit_max(window);
        }

        self.decorate(window);
        self.sync_states(window);
        self.restack();
    }

    pub fn set_minimized(
        &mut self,
        window: Window,
        toggle: Toggle,
    ) {
        let window = self.owner(window);
        let client = match self.clients.get(&window) {
            Some(client) => client,
            None => return,
        };

        let minimized = client.is(ClientFlags::MINIMIZED);
        let on = toggle.eval(minimized);

        if on == minimized {
            return;
        }

        let entry = Stacked::Client(window);
        let layer = client.layer();
        let members: Vec<Window> = std::iter::once(window).chain(client.peers()).collect();

        client.set_flag(ClientFlags::MINIMIZED, on);

        self.conn.set_wm_state(window, if on {
            IcccmWindowState::Iconic
        } else {
            IcccmWindowState::Normal
        });

        if on {
            self.stack.remove(entry);
        } else {
            self.stack.insert(entry, layer);
        }

        self.apply_visibility(window);

        if on {
            if self.focus.map_or(false, |focus| members.contains(&focus)) {
                self.revert_focus();
            }
        } else {
            self.focus_client(window);
        }

        self.update_workarea();
        self.sync_states(window);
        self.restack();
    }

    pub fn set_sticky(
        &mut self,
        window: Window,
        toggle: Toggle,
    ) {
        let window = self.owner(window);

        if let Some(client) = self.clients.get(&window) {
            let sticky = toggle.eval(client.is(ClientFlags::STICKY));
            client.set_flag(ClientFlags::STICKY, sticky);
            self.sync_states(window);
        }
    }

    /// Sets one of the two layer flags, which exclude each other, and moves
    /// the window to the matching stacking group.
    pub(super) fn set_layer_flag(
        &mut self,
        window: Window,
        flag: ClientFlags,
        toggle: Toggle,
    ) {
        let window = self.owner(window);
        let client = match self.clients.get(&window) {
            Some(client) => client,
            None => return,
        };

        let on = toggle.eval(client.is(flag));
        client.set_flag(flag, on);

        if on {
            client.set_flag(ClientFlags::ALWAYS_ON_TOP | ClientFlags::ALWAYS_AT_BOTTOM, false);
            client.set_flag(flag, true);
        }

        let layer = client.requested_layer();
        client.set_layer(layer);

        if !client.is(ClientFlags::MINIMIZED) {
            self.stack.relayer(Stacked::Client(window), layer);
        }

        self.sync_states(window);
        self.restack();
    }

    pub(super) fn set_decor(
        &mut self,
        window: Window,
        decor: Decor,
        toggle: Toggle,
    ) {
        let window = self.owner(window);
        let client = match self.clients.get(&window) {
            Some(client) => client,
            None => return,
        };

        let current = client.decor();
        let mut next = current;
        next.set(decor, toggle.eval(current.contains(decor)));

        if next == current {
            return;
        }

        client.set_decor(next);

        if !next.contains(Decor::TITLE) && client.is(ClientFlags::SHADED) {
            client.set_flag(ClientFlags::SHADED, false);
            self.sync_states(window);
        }

        self.configure_client(window);
        self.decorate(window);
    }

    /// Applies an X geometry to the frame, in screen coordinates or, when
    /// `virtual_canvas` is set, in coordinates of the whole virtual canvas.
    pub(super) fn move_resize(
        &mut self,
        window: Window,
        param: &str,
        virtual_canvas: bool,
    ) {
        let spec = match GeometrySpec::parse(param) {
            Some(spec) => spec,
            None => {
                warn!("invalid geometry \"{}\"", param);
                return;
            },
        };

        let window = self.owner(window);
        let client = match self.clients.get(&window) {
            Some(client) => client,
            None => return,
        };

        let (within, offset) = if virtual_canvas {
            (self.viewport.canvas(), self.viewport_offset())
        } else {
            (self.screen.full_region().dim, Distance::new(0, 0))
        };

        let extents = client.effective_decor().extents(&self.style);
        let frame = client.region().with_extents(&extents).translated(offset);
        let target = spec.resolve(frame, within);

        let mut region = Region {
            pos: target.pos - offset,
            dim: target.dim,
        }
        .without_extents(&extents);

        region.dim = client.size_hints().constrain(region.dim);
        client.set_region(region);

        self.configure_client(window);

        if virtual_canvas {
            self.conn.set_virtual_pos(window, region.pos + offset);
        }
    }

    pub(super) fn move_to_pointer(
        &mut self,
        window: Window,
        pointer: Pos,
    ) {
        let window = self.owner(window);
        let client = match self.clients.get(&window) {
            Some(client) => client,
            None => return,
        };

        let extents = client.effective_decor().extents(&self.style);
        let frame = self.frame_layout(client).frame;
        let pos = center_on(pointer, frame.dim, self.workarea);

        client.set_region(Region {
            pos: Pos::new(pos.x + extents.left, pos.y + extents.top),
            dim: client.region().dim,
        });

        self.configure_client(window);
    }

    pub fn move_to_smart_place(
        &mut self,
        window: Window,
    ) {
        let window = self.owner(window);
        let occupied = self.occupied(Some(window));

        let client = match self.clients.get(&window) {
            Some(client) => client,
            None => return,
        };

        let extents = client.effective_decor().extents(&self.style);
        let frame = self.frame_layout(client).frame;
        let pos = smart_place(frame.dim, self.workarea, &occupied);

        client.set_region(Region {
            pos: Pos::new(pos.x + extents.left, pos.y + extents.top),
            dim: client.region().dim,
        });

        self.configure_client(window);
    }

    /// Replaces the desktop membership of `window` and its merged peers;
    /// masks naming no existing desktop are refused.
    pub fn set_desktops(
        &mut self,
        window: Window,
        mask: DesktopMask,
    ) {
        let mask = mask & self.desktops.all();

        if mask == 0 {
            debug!("refusing empty desktop mask for {:#0x}", window);
            return;
        }

        let window = self.owner(window);
        let members = match self.clients.get(&window) {
            Some(client) => std::iter::once(window).chain(client.peers()).collect::<Vec<_>>(),
            None => return,
        };

        for &member in &members {
            if let Some(client) = self.clients.get(&member) {
                client.set_desktops(mask);
            }

            self.sync_desktop(member);
        }

        self.apply_visibility(window);

        if self.focus.map_or(false, |focus| members.contains(&focus))
            && mask & self.desktops.current_bit() == 0
        {
            self.revert_focus();
        }

        self.update_workarea();
    }

    /// Merges `window` into the topmost other frame under the pointer.
    fn merge_under_pointer(
        &mut self,
        window: Window,
        pointer: Pos,
        mode: MergeMode,
    ) {
        let owner = self.owner(window);

        let master = self.stack.clients().into_iter().find(|&candidate| {
            candidate != owner
                && self.clients.get(&candidate).map_or(false, |client| {
                    client.is(ClientFlags::MAPPED)
                        && self.frame_layout(client).frame.encompasses(pointer)
                })
        });

        match master {
            Some(master) => self.merge(window, master, mode),
            None => debug!("no window under the pointer to merge {:#0x} with", window),
        }
    }

    /// Shows `window` inside the frame of `master`; a master that is itself
    /// merged forwards to the frame it is shown in.
    pub fn merge(
        &mut self,
        window: Window,
        master: Window,
        mode: MergeMode,
    ) {
        let master = self.owner(master);

        if window == master || !self.clients.contains_key(&master) {
            return;
        }

        if self.clients.get(&window).map_or(false, |client| client.has_peers()) {
            self.explode(window);
        }

        if self.clients.get(&window).and_then(|client| client.master()).is_some() {
            self.unmerge(window);
        }

        let (host_frame, desktops) = match self.clients.get(&master) {
            Some(client) => (client.own_frame(), client.desktops()),
            None => return,
        };

        let client = match self.clients.get(&window) {
            Some(client) => client,
            None => return,
        };

        info!("merging window {:#0x} into {:#0x} ({:?})", window, master, mode);

        let own_frame = client.own_frame();

        client.join_group(master, host_frame, mode);
        client.set_desktops(desktops);
        client.set_flag(ClientFlags::MAPPED, false);
        client.expect_unmap();

        if let Some(master_client) = self.clients.get(&master) {
            master_client.add_peer(window);

            if mode == MergeMode::Clone {
                master_client.set_front(window);
            }
        }

        self.stack.remove(Stacked::Client(window));
        self.conn.unmap_window(own_frame);
        self.conn
            .reparent_window(window, host_frame, Pos::default());

        self.sync_desktop(window);
        self.configure_client(master);
        self.decorate(master);
        self.restack();
    }

    /// Gives a merged window its own frame back.
    pub fn unmerge(
        &mut self,
        window: Window,
    ) {
        let client = match self.clients.get(&window) {
            Some(client) => client,
            None => return,
        };

        let master = match client.master() {
            Some(master) => master,
            None => return,
        };

        info!("unmerging window {:#0x} from {:#0x}", window, master);

        if let Some(master_client) = self.clients.get(&master) {
            master_client.remove_peer(window);
        }

        let hidden = client.is(ClientFlags::HIDDEN);
        let extents = client.effective_decor().extents(&self.style);

        client.leave_group();
        client.set_flag(ClientFlags::HIDDEN, false);

        if !hidden {
            client.expect_unmap();
        }

        self.conn.reparent_window(
            window,
            client.own_frame(),
            Pos::new(extents.left, extents.top),
        );

        if hidden {
            self.conn.map_window(window);
        }

        self.stack.insert(Stacked::Client(window), client.layer());

        self.apply_visibility(window);
        self.configure_client(window);
        self.configure_client(master);
        self.decorate(window);
        self.decorate(master);
        self.restack();
    }

    /// Dissolves the merge group `window` belongs to.
    pub fn explode(
        &mut self,
        window: Window,
    ) {
        let master = self.owner(window);
        let peers = self
            .clients
            .get(&master)
            .map(|client| client.peers())
            .unwrap_or_default();

        for peer in peers {
            self.unmerge(peer);
        }
    }

    pub(super) fn merged_to_front(
        &mut self,
        window: Window,
    ) {
        let master = self.owner(window);

        let in_slot = window == master
            || self
                .clients
                .get(&window)
                .map_or(false, |client| client.merge_mode() == MergeMode::Clone);

        if !in_slot {
            return;
        }

        if let Some(master_client) = self.clients.get(&master) {
            master_client.set_front(window);
        }

        self.configure_client(master);
        self.decorate(master);
    }

    pub(super) fn set_merge_mode(
        &mut self,
        window: Window,
        mode: MergeMode,
    ) {
        let master = match self.clients.get(&window) {
            Some(client) => {
                client.set_merge_mode(mode);
                client.master()
            },
            None => return,
        };

        if let Some(master) = master {
            if let Some(master_client) = self.clients.get(&master) {
                if mode == MergeMode::Clone {
                    master_client.set_front(window);
                } else if master_client.front() == window {
                    master_client.set_front(master);
                }
            }

            self.configure_client(master);
        }
    }

    /// Applies one `_NET_WM_STATE` atom.
    pub(super) fn apply_state(
        &mut self,
        window: Window,
        state: WindowState,
        toggle: Toggle,
    ) {
        match state {
            WindowState::Sticky => self.set_sticky(window, toggle),
            WindowState::MaximizedVert => self.set_max(window, toggle, ClientFlags::MAXED_V),
            WindowState::MaximizedHorz => self.set_max(window, toggle, ClientFlags::MAXED_H),
            WindowState::Shaded => self.set_shade(window, toggle),
            WindowState::Hidden => self.set_minimized(window, toggle),
            WindowState::Fullscreen => self.set_fullscreen(window, toggle),
            WindowState::Above => self.set_layer_flag(window, ClientFlags::ALWAYS_ON_TOP, toggle),
            WindowState::Below => {
                self.set_layer_flag(window, ClientFlags::ALWAYS_AT_BOTTOM, toggle)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::change::Toggle;
    use crate::client::ClientFlags;
    use crate::client::MergeMode;
    use crate::mock::session;
    use crate::mock::MockConnection;
    use crate::stack::Layer;

    use winsys::geometry::Region;
    use winsys::window::WindowState;

    #[test]
    fn shade_then_unshade_restores_geometry() {
        let conn = MockConnection::new();
        let mut session = session(&conn, "");

        let window = conn.client("xterm", Region::new(100, 100, 200, 100));
        session.adopt(window);

        let before = session.client(window).unwrap().region();
        let frame = session.client(window).unwrap().own_frame();
        let framed = conn.placed(frame).unwrap();

        session.set_shade(window, Toggle::On);

        let shaded = conn.placed(frame).unwrap();
        assert!(session.client(window).unwrap().is(ClientFlags::SHADED));
        assert!(shaded.dim.h < framed.dim.h);
        assert_eq!(conn.states(window), vec![WindowState::Shaded]);

        session.set_shade(window, Toggle::Off);

        assert_eq!(session.client(window).unwrap().region(), before);
        assert_eq!(conn.placed(frame), Some(framed));
    }

    #[test]
    fn untitled_windows_do_not_shade() {
        let conn = MockConnection::new();
        let mut session = session(&conn, "");

        let window = conn.client("xterm", Region::new(100, 100, 200, 100));
        session.adopt(window);
        session.set_decor(window, crate::decoration::Decor::TITLE, Toggle::Off);
        session.set_shade(window, Toggle::On);

        assert!(!session.client(window).unwrap().is(ClientFlags::SHADED));
    }

    #[test]
    fn maximize_then_unmaximize_restores_geometry() {
        let conn = MockConnection::new();
        let mut session = session(&conn, "");

        let window = conn.client("xterm", Region::new(100, 100, 200, 100));
        session.adopt(window);

        let before = session.client(window).unwrap().region();

        session.set_max(window, Toggle::On, ClientFlags::MAXED);
        assert_ne!(session.client(window).unwrap().region(), before);

        session.set_max(window, Toggle::Off, ClientFlags::MAXED);
        assert_eq!(session.client(window).unwrap().region(), before);
        assert!(conn.states(window).is_empty());
    }

    #[test]
    fn clearing_one_axis_restores_only_that_axis() {
        let conn = MockConnection::new();
        let mut session = session(&conn, "");

        let window = conn.client("xterm", Region::new(100, 100, 200, 100));
        session.adopt(window);

        session.set_max(window, Toggle::On, ClientFlags::MAXED);
        let maxed = session.client(window).unwrap().region();

        session.set_max(window, Toggle::Off, ClientFlags::MAXED_H);

        let region = session.client(window).unwrap().region();
        assert_eq!(region.dim.w, 200);
        assert_eq!(region.dim.h, maxed.dim.h);
    }

    #[test]
    fn fullscreen_nests_inside_maximize() {
        let conn = MockConnection::new();
        let mut session = session(&conn, "");

        let window = conn.client("xterm", Region::new(100, 100, 200, 100));
        session.adopt(window);

        let before = session.client(window).unwrap().region();

        session.set_max(window, Toggle::On, ClientFlags::MAXED);
        let maxed = session.client(window).unwrap().region();

        session.set_fullscreen(window, Toggle::On);
        assert_eq!(
            session.client(window).unwrap().region(),
            Region::new(0, 0, 1000, 768)
        );
        assert_eq!(session.stack.layer(crate::stack::Stacked::Client(window)), Some(Layer::AlwaysOnTop));

        session.set_fullscreen(window, Toggle::Off);
        assert_eq!(session.client(window).unwrap().region(), maxed);

        session.set_max(window, Toggle::Off, ClientFlags::MAXED);
        assert_eq!(session.client(window).unwrap().region(), before);
    }

    #[test]
    fn join_then_part_restores_the_mask() {
        let conn = MockConnection::new();
        let mut session = session(&conn, "");

        let window = conn.client("xterm", Region::new(100, 100, 200, 100));
        session.adopt(window);

        let before = session.client(window).unwrap().desktops();

        session.set_desktops(window, before | 0b100);
        assert_eq!(session.client(window).unwrap().desktops(), before | 0b100);

        session.set_desktops(window, before);
        assert_eq!(session.client(window).unwrap().desktops(), before);

        session.set_desktops(window, 1 << 20);
        assert_eq!(session.client(window).unwrap().desktops(), before);
    }

    #[test]
    fn merge_then_unmerge_restores_the_frame() {
        let conn = MockConnection::new();
        let mut session = session(&conn, "");

        let master = conn.client("xterm", Region::new(100, 100, 300, 200));
        let window = conn.client("xclock", Region::new(500, 100, 100, 100));
        session.adopt(master);
        session.adopt(window);

        let own_frame = session.client(window).unwrap().own_frame();
        let host_frame = session.client(master).unwrap().own_frame();

        session.merge(window, master, MergeMode::Vertical);

        let client = session.client(window).unwrap();
        assert_eq!(client.frame(), host_frame);
        assert_eq!(session.client(master).unwrap().peers(), vec![window]);
        assert!(!conn.is_mapped(own_frame));
        assert!(!conn.stacking().contains(&own_frame));

        session.unmerge(window);

        let client = session.client(window).unwrap();
        assert_eq!(client.frame(), own_frame);
        assert!(session.client(master).unwrap().peers().is_empty());
        assert!(conn.is_mapped(own_frame));
        assert!(conn.stacking().contains(&own_frame));
    }

    #[test]
    fn clone_merges_show_only_the_front() {
        let conn = MockConnection::new();
        let mut session = session(&conn, "");

        let master = conn.client("xterm", Region::new(100, 100, 300, 200));
        let window = conn.client("xclock", Region::new(500, 100, 100, 100));
        session.adopt(master);
        session.adopt(window);
        session.merge(window, master, MergeMode::Clone);

        assert!(session.client(master).unwrap().is(ClientFlags::HIDDEN));
        assert!(!session.client(window).unwrap().is(ClientFlags::HIDDEN));

        session.merged_to_front(master);

        assert!(!session.client(master).unwrap().is(ClientFlags::HIDDEN));
        assert!(session.client(window).unwrap().is(ClientFlags::HIDDEN));

        session.explode(master);

        assert!(!session.client(window).unwrap().is(ClientFlags::HIDDEN));
        assert_eq!(session.client(window).unwrap().master(), None);
        assert!(conn.is_mapped(window));
    }

    #[test]
    fn merging_into_a_peer_forwards_to_its_master() {
        let conn = MockConnection::new();
        let mut session = session(&conn, "");

        let windows: Vec<_> = (0..3)
            .map(|i| conn.client("xterm", Region::new(100 * i, 100, 90, 90)))
            .collect();

        for &window in &windows {
            session.adopt(window);
        }

        session.merge(windows[1], windows[0], MergeMode::Horizontal);
        session.merge(windows[2], windows[1], MergeMode::Horizontal);

        assert_eq!(session.client(windows[2]).unwrap().master(), Some(windows[0]));
        assert_eq!(session.client(windows[0]).unwrap().peers(), vec![windows[1], windows[2]]);
    }

    #[test]
    fn minimized_windows_leave_the_stack_and_focus() {
        let conn = MockConnection::new();
        let mut session = session(&conn, "");

        let first = conn.client("xterm", Region::new(100, 100, 300, 200));
        let second = conn.client("xclock", Region::new(500, 100, 100, 100));
        session.adopt(first);
        session.adopt(second);

        let frame = session.client(second).unwrap().own_frame();
        session.set_minimized(second, Toggle::On);

        assert!(!conn.is_mapped(frame));
        assert!(!conn.stacking().contains(&frame));
        assert_eq!(session.focused(), Some(first));

        session.set_minimized(second, Toggle::Off);

        assert!(conn.is_mapped(frame));
        assert_eq!(conn.stacking().first(), Some(&frame));
        assert_eq!(session.focused(), Some(second));
    }

    #[test]
    fn transients_follow_their_parent_up() {
        let conn = MockConnection::new();
        let mut session = session(&conn, "");

        let parent = conn.client("gimp", Region::new(100, 100, 300, 200));
        let dialog = conn.client("gimp", Region::new(150, 150, 100, 100));
        let other = conn.client("xterm", Region::new(500, 100, 100, 100));
        conn.set_transient_for(dialog, parent);

        session.adopt(parent);
        session.adopt(dialog);
        session.adopt(other);
        session.raise(parent);

        let frames: Vec<_> = [dialog, parent, other]
            .iter()
            .map(|&window| session.client(window).unwrap().own_frame())
            .collect();

        let stacking: Vec<_> = conn
            .stacking()
            .into_iter()
            .filter(|window| frames.contains(window))
            .collect();

        assert_eq!(stacking, frames);
    }
}
