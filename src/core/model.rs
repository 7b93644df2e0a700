use crate::actionfile::ActionTables;
use crate::actionfile::Context;
use crate::client::Client;
use crate::client::ClientFlags;
use crate::config::FocusRevert;
use crate::config::ScreenConfig;
use crate::decoration::Decor;
use crate::decoration::FrameLayout;
use crate::decoration::Part;
use crate::desktop::desktop_bit;
use crate::desktop::DesktopMask;
use crate::desktop::Desktops;
use crate::desktop::Viewport;
use crate::dock::DockHandler;
use crate::dock::Docks;
use crate::matcher::WindowIdent;
use crate::menu::Menu;
use crate::menu::MenuDef;
use crate::pixcache::PixmapCache;
use crate::pixcache::PixmapKey;
use crate::placement::smart_place;
use crate::recency::Recency;
use crate::stack::Layer;
use crate::stack::MenuId;
use crate::stack::Stacked;
use crate::stack::StackingGroups;
use crate::style::Justify;
use crate::style::Style;
use crate::style::Texture;
use crate::util::SpawnEnv;

use winsys::connection::Connection;
use winsys::connection::KeyMap;
use winsys::connection::ServerGrab;
use winsys::event::Event;
use winsys::geometry::Dim;
use winsys::geometry::Distance;
use winsys::geometry::Pos;
use winsys::geometry::Region;
use winsys::hints::Hints;
use winsys::input::KeyCode;
use winsys::input::ModMask;
use winsys::screen::Screen;
use winsys::window::IcccmWindowState;
use winsys::window::Pixmap;
use winsys::window::Window;
use winsys::window::WindowType;
use winsys::Result;

use std::collections::HashMap;
use std::collections::HashSet;
use std::time::Duration;

mod dispatch;
mod gesture;
mod menuops;
mod rootops;
mod winops;

pub use gesture::Gesture;
pub use gesture::GestureKind;
pub use gesture::GestureTarget;

/// What a session asks of the process once the current event is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Restart(Option<String>),
    Exit,
}

const EDGE_CONTEXTS: [Context; 4] = [
    Context::WestEdge,
    Context::EastEdge,
    Context::NorthEdge,
    Context::SouthEdge,
];

/// Everything managed on one screen: the clients, menus and docks, and the
/// stacking, focus, desktop and viewport state tying them together.
pub struct Session<'a> {
    conn: &'a dyn Connection,
    index: usize,
    screen: Screen,
    config: ScreenConfig,
    style: Style,
    tables: ActionTables,
    menu_defs: HashMap<String, MenuDef>,
    env: SpawnEnv,
    keys: KeyMap,
    clients: HashMap<Window, Client>,
    managed: Vec<Window>,
    windows: HashMap<Window, Window>,
    menus: HashMap<MenuId, Menu>,
    menu_windows: HashMap<Window, MenuId>,
    next_menu: MenuId,
    docks: Docks,
    dockapp_unmaps: HashMap<Window, usize>,
    edges: Vec<(Window, Context)>,
    stack: StackingGroups,
    recency: Recency,
    desktops: Desktops,
    viewport: Viewport,
    workarea: Region,
    focus: Option<Window>,
    menu_focus: Option<MenuId>,
    pixmaps: PixmapCache,
    held: HashMap<Window, Pixmap>,
    dontsend: bool,
    gesture: Option<Gesture>,
    reinjected: Vec<Event>,
    request: Option<Request>,
}

impl<'a> Session<'a> {
    pub fn new(
        conn: &'a dyn Connection,
        index: usize,
        screen: Screen,
        config: ScreenConfig,
        style: Style,
        tables: ActionTables,
        menu_defs: Vec<MenuDef>,
        env: SpawnEnv,
        keys: KeyMap,
    ) -> Result<Self> {
        let root = screen.root();
        let full = screen.full_region();

        let strips = [
            Region::new(full.pos.x, full.pos.y, 1, full.dim.h),
            Region::new(full.right() - 1, full.pos.y, 1, full.dim.h),
            Region::new(full.pos.x, full.pos.y, full.dim.w, 1),
            Region::new(full.pos.x, full.bottom() - 1, full.dim.w, 1),
        ];

        let edges = strips
            .iter()
            .zip(EDGE_CONTEXTS.iter())
            .map(|(region, &context)| {
                conn.create_input_window(root, *region)
                    .map(|window| (window, context))
            })
            .collect::<Result<Vec<_>>>()?;

        let handlers = config
            .docks
            .iter()
            .enumerate()
            .map(|(i, dock)| {
                conn.create_frame(root, Region::new(0, 0, 1, 1))
                    .map(|frame| DockHandler::new(i, frame, dock.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut stack = StackingGroups::new();
        for handler in &handlers {
            stack.insert(Stacked::Dock(handler.index()), handler.layer());
        }

        let (cols, rows) = config.virtual_size;
        let desktops = Desktops::new(config.desktop_names.clone());
        let viewport = Viewport::new(full.dim, cols, rows);
        let pixmaps = PixmapCache::new(config.cache_max);

        let menu_defs = menu_defs
            .into_iter()
            .map(|def| (def.name.clone(), def))
            .collect();

        Ok(Self {
            conn,
            index,
            screen,
            config,
            style,
            tables,
            menu_defs,
            env,
            keys,
            clients: HashMap::with_capacity(50),
            managed: Vec::with_capacity(50),
            windows: HashMap::with_capacity(200),
            menus: HashMap::new(),
            menu_windows: HashMap::new(),
            next_menu: 0,
            docks: Docks::new(handlers),
            dockapp_unmaps: HashMap::new(),
            edges,
            stack,
            recency: Recency::new(),
            desktops,
            viewport,
            workarea: full,
            focus: None,
            menu_focus: None,
            pixmaps,
            held: HashMap::new(),
            dontsend: false,
            gesture: None,
            reinjected: Vec::new(),
            request: None,
        })
    }

    /// Announces the session on the root window and takes over input.
    pub fn init(&mut self) {
        info!("initializing screen {}", self.screen.number());

        let root = self.screen.root();

        for &(window, context) in &self.edges {
            if !self.tables.bindings(context).is_empty() {
                self.conn.map_window(window);
            }
        }

        self.conn.init_wm_properties(root, WM_NAME!());
        self.conn.set_desktops(root, self.desktops.names());
        self.conn.set_current_desktop(root, 0);
        self.conn.set_desktop_geometry(root, self.viewport.canvas());
        self.conn.set_desktop_viewport(root, self.viewport.pos());
        self.conn
            .set_workarea(root, &vec![self.workarea; self.desktops.count()]);

        if !self.conn.load_font(&self.style.font) {
            warn!("unable to load font \"{}\", falling back to fixed", self.style.font);
        }

        self.grab_keys();
        self.set_client_lists();
    }

    pub fn grab_keys(&self) {
        let root = self.screen.root();
        self.conn.ungrab_keys(root);

        let mut grabbed: HashSet<(u32, ModMask)> = HashSet::new();

        for (_, binding) in self.tables.all() {
            if binding.kind.is_key() && binding.detail != 0 {
                let grab = (binding.detail, binding.mods - ModMask::MOVE_RESIZE);

                if grabbed.insert(grab) {
                    self.conn.grab_key(root, grab.0 as KeyCode, grab.1);
                }
            }
        }
    }

    /// Adopts the windows that were mapped before the session started.
    pub fn scan(&mut self) {
        let root = self.screen.root();
        let _grab = ServerGrab::new(self.conn);

        for window in self.conn.top_level_windows(root) {
            if self.owns(window) {
                continue;
            }

            match self.conn.window_attributes(window) {
                Some(attrs) if !attrs.override_redirect && !attrs.input_only && attrs.mapped => {
                    self.adopt(window)
                },
                _ => {},
            }
        }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn root(&self) -> Window {
        self.screen.root()
    }

    #[inline]
    pub fn double_click(&self) -> Duration {
        self.config.double_click
    }

    /// Whether `window` is one this session created or manages.
    pub fn owns(
        &self,
        window: Window,
    ) -> bool {
        window == self.screen.root()
            || self.windows.contains_key(&window)
            || self.menu_windows.contains_key(&window)
            || self.edges.iter().any(|&(edge, _)| edge == window)
            || self.docks.holding(window).is_some()
    }

    #[inline]
    pub fn take_request(&mut self) -> Option<Request> {
        self.request.take()
    }

    /// Events a finished gesture held back, in arrival order.
    #[inline]
    pub fn take_reinjected(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.reinjected)
    }

    #[inline]
    pub fn client(
        &self,
        window: Window,
    ) -> Option<&Client> {
        self.windows
            .get(&window)
            .and_then(|window| self.clients.get(window))
    }

    #[inline]
    pub fn focused(&self) -> Option<Window> {
        self.focus
    }

    /// The client whose frame `window` is shown in.
    #[inline]
    fn owner(
        &self,
        window: Window,
    ) -> Window {
        self.clients
            .get(&window)
            .and_then(Client::master)
            .unwrap_or(window)
    }

    /// Every client that has a frame of its own, in adoption order.
    fn masters(&self) -> Vec<Window> {
        self.managed
            .iter()
            .copied()
            .filter(|window| {
                self.clients
                    .get(window)
                    .map_or(false, |client| client.master().is_none())
            })
            .collect()
    }

    /// The frames of the visible, non-sticky windows other than `except`.
    fn occupied(
        &self,
        except: Option<Window>,
    ) -> Vec<Region> {
        self.masters()
            .into_iter()
            .filter(|&window| Some(window) != except)
            .filter_map(|window| self.clients.get(&window))
            .filter(|client| client.is(ClientFlags::MAPPED) && !client.is(ClientFlags::STICKY))
            .map(|client| self.frame_layout(client).frame)
            .collect()
    }

    #[inline]
    fn frame_layout(
        &self,
        client: &Client,
    ) -> FrameLayout {
        FrameLayout::new(
            client.region(),
            client.effective_decor(),
            client.is(ClientFlags::SHADED),
            &self.style,
        )
    }

    pub fn adopt(
        &mut self,
        window: Window,
    ) {
        if self.owns(window) {
            return;
        }

        let geometry = match self.conn.window_geometry(window) {
            Ok(geometry) => geometry,
            Err(err) => {
                warn!("unable to adopt window {:#0x}: {}", window, err);
                return;
            },
        };

        let (name, class) = self.conn.get_wm_class(window);
        let ident = WindowIdent::new(name, class, self.conn.get_wm_name(window));
        let hints = self.conn.get_wm_hints(window);
        let mapped = self
            .conn
            .window_attributes(window)
            .map_or(false, |attrs| attrs.mapped);

        let _grab = ServerGrab::new(self.conn);

        if hints.map_or(false, |hints| hints.is_withdrawn()) {
            self.adopt_dockapp(window, geometry, &ident, mapped);
        } else {
            self.adopt_client(window, geometry, ident, hints, mapped);
        }
    }

    fn adopt_dockapp(
        &mut self,
        window: Window,
        geometry: Region,
        ident: &WindowIdent,
        mapped: bool,
    ) {
        let (index, rank) = match self.docks.route(ident) {
            Some(route) => route,
            None => {
                warn!("no dock to hold dockapp {:#0x}", window);
                return;
            },
        };

        let frame = match self.docks.get_mut(index) {
            Some(handler) => {
                handler.add(window, geometry.dim, rank);
                handler.frame()
            },
            None => return,
        };

        info!("docking window {:#0x} ({}) in dock {}", window, ident.class, index);

        if mapped {
            *self.dockapp_unmaps.entry(window).or_insert(0) += 1;
        }

        self.conn.add_to_save_set(window);
        self.conn.reparent_window(window, frame, Pos::default());
        self.conn.map_window(window);
        self.update_dock(index);
    }

    /// Hands a dockapp back to the root window, unless it is gone already.
    pub(super) fn release_dockapp(
        &mut self,
        window: Window,
        destroyed: bool,
    ) {
        let index = match self.docks.holding(window) {
            Some(index) => index,
            None => return,
        };

        let pos = match self.docks.get_mut(index) {
            Some(handler) if handler.frame() != window => {
                let pos = handler
                    .region()
                    .map_or(Pos::default(), |region| region.pos);

                handler.remove(window);
                pos
            },
            _ => return,
        };

        info!("undocking window {:#0x}", window);
        self.dockapp_unmaps.remove(&window);

        if !destroyed {
            self.conn.reparent_window(window, self.screen.root(), pos);
            self.conn.release_client(window);
        }

        self.update_dock(index);
    }

    fn adopt_client(
        &mut self,
        window: Window,
        geometry: Region,
        ident: WindowIdent,
        hints: Option<Hints>,
        mapped: bool,
    ) {
        let root = self.screen.root();

        let frame = match self.conn.create_frame(root, geometry) {
            Ok(frame) => frame,
            Err(err) => {
                warn!("unable to create frame for window {:#0x}: {}", window, err);
                return;
            },
        };

        info!("managing window {:#0x} ({})", window, ident.class);

        let window_type = self.conn.get_window_type(window);
        let transient_for = self
            .conn
            .get_transient_for(window)
            .filter(|parent| self.clients.contains_key(parent));

        let client = Client::new(window, frame, self.index, ident, window_type, transient_for);

        let decor = match window_type {
            WindowType::Desktop | WindowType::Dock | WindowType::Splash => Decor::empty(),
            _ => self
                .conn
                .get_motif_hints(window)
                .map_or(Decor::ALL, |motif| Decor::from_motif(&motif)),
        };

        let size_hints = self.conn.get_size_hints(window).unwrap_or_default();

        client.set_decor(decor);
        client.set_hints(hints);
        client.set_size_hints(size_hints);

        let desktops = match self.conn.get_window_desktop(window) {
            Some(0xffff_ffff) => self.desktops.all(),
            Some(index) if (index as usize) < self.desktops.count() => desktop_bit(index as usize),
            _ => self.desktops.current_bit(),
        };

        client.set_desktops(desktops);

        let mut region = geometry;
        let virtual_pos = self.conn.get_virtual_pos(window);

        if let Some(pos) = virtual_pos {
            region.pos = pos - self.viewport_offset();
        }

        region.dim = size_hints.constrain(region.dim);

        if virtual_pos.is_none() && !size_hints.by_user && region.pos == Pos::default() {
            let extents = decor.extents(&self.style);
            let dim = region.with_extents(&extents).dim;
            let pos = smart_place(dim, self.workarea, &self.occupied(None));

            region.pos = Pos::new(pos.x + extents.left, pos.y + extents.top);
        }

        client.set_region(region);

        self.conn.add_to_save_set(window);
        self.conn.init_client(window);

        if mapped {
            client.expect_unmap();
        }

        let extents = decor.extents(&self.style);
        self.conn
            .reparent_window(window, frame, Pos::new(extents.left, extents.top));
        self.conn.map_window(window);

        let parts: Vec<(Part, Window)> = FrameLayout::new(region, Decor::ALL, false, &self.style)
            .parts
            .into_iter()
            .filter_map(|(part, region)| match self.conn.create_decoration(frame, region) {
                Ok(part_window) => Some((part, part_window)),
                Err(err) => {
                    warn!("unable to create {:?} for window {:#0x}: {}", part, window, err);
                    None
                },
            })
            .collect();

        for &(_, part_window) in &parts {
            self.windows.insert(part_window, window);
        }

        client.set_parts(parts);

        self.windows.insert(window, window);
        self.windows.insert(frame, window);
        self.clients.insert(window, client);
        self.managed.push(window);
        self.stack.insert(Stacked::Client(window), Layer::Normal);
        self.recency.append(window);

        for state in self.conn.get_window_states(window) {
            self.apply_state(window, state, crate::change::Toggle::On);
        }

        if hints.and_then(|hints| hints.initial_state) == Some(IcccmWindowState::Iconic) {
            if let Some(client) = self.clients.get(&window) {
                client.set_flag(ClientFlags::MINIMIZED, true);
            }
        }

        let struts = self.conn.get_window_struts(window);
        if self.screen.set_struts(window, struts) {
            self.update_workarea();
        }

        self.configure_client(window);
        self.decorate(window);
        self.sync_desktop(window);
        self.sync_states(window);

        let minimized = self
            .clients
            .get(&window)
            .map_or(false, |client| client.is(ClientFlags::MINIMIZED));

        self.conn.set_wm_state(window, if minimized {
            IcccmWindowState::Iconic
        } else {
            IcccmWindowState::Normal
        });

        if minimized {
            self.stack.remove(Stacked::Client(window));
        }

        self.apply_visibility(window);
        self.grab_client_buttons(window, false);
        self.set_client_lists();
        self.restack();

        let focusable = self
            .clients
            .get(&window)
            .map_or(false, |client| client.accepts_input() && client.is(ClientFlags::MAPPED));

        if focusable {
            self.focus_client(window);
        }
    }

    /// Releases `window`, reparenting it back to the root unless the
    /// client destroyed it.
    pub fn unmanage(
        &mut self,
        window: Window,
        destroyed: bool,
    ) {
        if !self.clients.contains_key(&window) {
            return;
        }

        let held = self
            .gesture
            .as_ref()
            .map_or(false, |gesture| gesture.target == GestureTarget::Client(window));

        if held {
            if let Some(client) = self.clients.get(&window) {
                client.set_flag(ClientFlags::DELETED, true);
            }

            self.end_gesture();
        }

        let has_peers = self
            .clients
            .get(&window)
            .map_or(false, Client::has_peers);

        if has_peers {
            self.explode(window);
        }

        let client = match self.clients.remove(&window) {
            Some(client) => client,
            None => return,
        };

        info!("unmanaging window {:#0x} ({})", window, client.ident().class);

        let root = self.screen.root();
        let _grab = ServerGrab::new(self.conn);

        if let Some(master) = client.master() {
            if let Some(master_client) = self.clients.get(&master) {
                master_client.remove_peer(window);
            }

            self.configure_client(master);
        }

        if !destroyed {
            self.conn.set_wm_state(window, IcccmWindowState::Withdrawn);
            self.conn.reparent_window(window, root, client.region().pos);
            self.conn.release_client(window);
        }

        for (_, part_window) in client.parts() {
            self.release_held(part_window);
            self.windows.remove(&part_window);
        }

        self.release_held(client.own_frame());
        self.conn.destroy_window(client.own_frame());

        self.windows.remove(&window);
        self.windows.remove(&client.own_frame());
        self.managed.retain(|&managed| managed != window);
        self.stack.remove(Stacked::Client(window));
        self.recency.remove(window);

        let stale_menus: Vec<MenuId> = self
            .menus
            .values()
            .filter(|menu| menu.target == Some(window) && menu.parent.is_none())
            .map(|menu| menu.id)
            .collect();

        for id in stale_menus {
            self.unmap_menu(id);
        }

        if self.screen.remove_struts(window) {
            self.update_workarea();
        }

        if self.focus == Some(window) {
            self.focus = None;
            self.revert_focus();
        }

        self.set_client_lists();
        self.restack();
    }

    /// Places the frame, its decorations and every window shown inside it.
    pub(super) fn configure_client(
        &mut self,
        window: Window,
    ) {
        let window = self.owner(window);
        let client = match self.clients.get(&window) {
            Some(client) => client,
            None => return,
        };

        let layout = self.frame_layout(client);
        let decor = client.effective_decor();
        self.conn.place_window(client.own_frame(), &layout.frame);

        for (part, part_window) in client.parts() {
            match layout.part(part) {
                Some(region) => {
                    self.conn.place_window(part_window, &region);
                    self.conn.map_window(part_window);
                },
                None => self.conn.unmap_window(part_window),
            }
        }

        let members: Vec<(Window, crate::client::MergeMode)> = client
            .peers()
            .into_iter()
            .filter_map(|peer| {
                self.clients
                    .get(&peer)
                    .map(|peer_client| (peer, peer_client.merge_mode()))
            })
            .collect();

        let front = client.front();
        let origin = Distance::new(layout.frame.pos.x, layout.frame.pos.y);

        for (member, cell) in crate::client::merge_layout(layout.client, window, &members) {
            let member_client = match self.clients.get(&member) {
                Some(member_client) => member_client,
                None => continue,
            };

            let shares_master_cell = member == window
                || member_client.merge_mode() == crate::client::MergeMode::Clone;
            let hidden = shares_master_cell && member != front;
            let absolute = Region {
                pos: cell.pos + origin,
                dim: cell.dim,
            };

            if member != window {
                member_client.set_region(absolute);
            }

            if hidden && !member_client.is(ClientFlags::HIDDEN) {
                member_client.set_flag(ClientFlags::HIDDEN, true);
                member_client.expect_unmap();
                self.conn.unmap_window(member);
            } else if !hidden && member_client.is(ClientFlags::HIDDEN) {
                member_client.set_flag(ClientFlags::HIDDEN, false);
                self.conn.map_window(member);
            }

            self.conn.place_window(member, &cell);

            if !self.dontsend {
                self.conn.send_configure_notify(member, absolute);
            }

            self.conn.set_frame_extents(member, decor.extents(&self.style));
        }
    }

    /// Paints the frame of `window` and its decorations for its focus
    /// state.
    pub(super) fn decorate(
        &mut self,
        window: Window,
    ) {
        let window = self.owner(window);
        let (frame, parts, layout, focused, title) = match self.clients.get(&window) {
            Some(client) => {
                let focused = client.is_focused()
                    || client
                        .peers()
                        .iter()
                        .any(|peer| self.clients.get(peer).map_or(false, Client::is_focused));

                let front = self.clients.get(&client.front()).unwrap_or(client);

                (
                    client.own_frame(),
                    client.parts(),
                    self.frame_layout(client),
                    focused,
                    front.ident().title,
                )
            },
            None => return,
        };

        let title_texture = self.style.title.texture(focused);
        self.conn
            .set_window_background(frame, self.style.border_color, None);
        self.conn.set_window_opacity(frame, title_texture.opacity);

        for (part, part_window) in parts {
            let region = match layout.part(part) {
                Some(region) => region,
                None => continue,
            };

            let texture = match part {
                Part::Title => title_texture,
                Part::Label => self.style.label.texture(focused),
                Part::Handle => self.style.handle.texture(focused),
                Part::LeftGrip | Part::RightGrip => self.style.grip.texture(focused),
                Part::Button(index) => match self.style.buttons.get(index) {
                    Some(button) if focused => button.focused,
                    Some(button) => button.unfocused,
                    None => continue,
                },
            };

            self.paint(part_window, region.dim, &texture);

            if part == Part::Label {
                let color = if focused {
                    self.style.label_color.0
                } else {
                    self.style.label_color.1
                };

                let width = self.conn.text_width(&title);
                let pos = Pos::new(
                    justify(self.style.justify, region.dim.w, width),
                    region.dim.h * 3 / 4,
                );

                self.conn.draw_text(part_window, pos, &title, color);
            }
        }
    }

    /// Sets the background of `window` to `texture`, rendering through the
    /// pixmap cache when it is not a plain color.
    pub(super) fn paint(
        &mut self,
        window: Window,
        dim: Dim,
        texture: &Texture,
    ) {
        let pixmap = if texture.is_solid() {
            None
        } else {
            let key = PixmapKey::new(dim, texture);

            match self.pixmaps.acquire(&key) {
                Some(pixmap) => Some(pixmap),
                None => {
                    match self.conn.render_pixmap(
                        self.screen.root(),
                        dim,
                        texture.color,
                        texture.color_to,
                    ) {
                        Some(pixmap) => {
                            let evicted = self.pixmaps.insert(key, pixmap);
                            self.free_pixmaps(evicted);
                            Some(pixmap)
                        },
                        None => {
                            debug!("unable to render texture for window {:#0x}", window);
                            None
                        },
                    }
                },
            }
        };

        let previous = match pixmap {
            Some(pixmap) => self.held.insert(window, pixmap),
            None => self.held.remove(&window),
        };

        if let Some(previous) = previous {
            let evicted = self.pixmaps.release(previous);
            self.free_pixmaps(evicted);
        }

        self.conn.set_window_background(window, texture.color, pixmap);
    }

    pub(super) fn release_held(
        &mut self,
        window: Window,
    ) {
        if let Some(pixmap) = self.held.remove(&window) {
            let evicted = self.pixmaps.release(pixmap);
            self.free_pixmaps(evicted);
        }
    }

    #[inline]
    fn free_pixmaps(
        &self,
        pixmaps: Vec<Pixmap>,
    ) {
        for pixmap in pixmaps {
            self.conn.free_pixmap(pixmap);
        }
    }

    /// Rewrites the stacking order of every frame in one go.
    pub(super) fn restack(&self) {
        let frames: Vec<Window> = self
            .stack
            .order()
            .into_iter()
            .filter_map(|stacked| match stacked {
                Stacked::Client(window) => self.clients.get(&window).map(Client::own_frame),
                Stacked::Menu(id) => self
                    .menus
                    .get(&id)
                    .filter(|menu| menu.mapped)
                    .map(|menu| menu.frame),
                Stacked::Dock(index) => self
                    .docks
                    .get(index)
                    .filter(|handler| handler.region().is_some())
                    .map(DockHandler::frame),
            })
            .collect();

        self.conn.restack(&frames);

        let mut clients = self.stack.clients();
        clients.reverse();
        self.conn
            .set_client_list_stacking(self.screen.root(), &clients);
    }

    #[inline]
    pub(super) fn set_client_lists(&self) {
        self.conn.set_client_list(self.screen.root(), &self.managed);
    }

    #[inline]
    pub(super) fn sync_states(
        &self,
        window: Window,
    ) {
        if let Some(client) = self.clients.get(&window) {
            self.conn.set_window_states(window, &client.net_states());
        }
    }

    pub(super) fn sync_desktop(
        &self,
        window: Window,
    ) {
        if let Some(client) = self.clients.get(&window) {
            self.conn
                .set_window_desktop(window, desktop_index(client.desktops(), self.desktops.all()));
        }
    }

    /// Whether the window is actually on screen right now.
    pub fn is_visible(
        &self,
        window: Window,
    ) -> bool {
        let client = match self.clients.get(&window) {
            Some(client) => client,
            None => return false,
        };

        let owner = client
            .master()
            .and_then(|master| self.clients.get(&master))
            .unwrap_or(client);

        owner.is(ClientFlags::MAPPED) && !client.is(ClientFlags::HIDDEN)
    }

    pub fn focus_client(
        &mut self,
        window: Window,
    ) {
        let (visible, on_current) = match self.clients.get(&window) {
            Some(client) => (
                self.is_visible(window),
                client.on_desktop(self.desktops.current()),
            ),
            None => return,
        };

        if !visible || !on_current {
            debug!("deferring focus of window {:#0x} until it maps", window);

            if let Some(client) = self.clients.get(&window) {
                client.set_flag(ClientFlags::WANT_FOCUS, true);
            }

            return;
        }

        if let Some(previous) = self.focus {
            if previous != window {
                self.unfocus_client(previous);
            }
        }

        let accepts_input = match self.clients.get(&window) {
            Some(client) => {
                client.set_flag(ClientFlags::WANT_FOCUS, false);
                client.set_focused(true);
                client.accepts_input()
            },
            None => return,
        };

        debug!("focusing window {:#0x}", window);

        self.focus = Some(window);

        if accepts_input {
            self.conn.set_input_focus(window);
        }

        self.recency.touch(window);
        self.conn
            .set_active_window(self.screen.root(), Some(window));
        self.grab_client_buttons(window, true);
        self.decorate(window);
    }

    fn unfocus_client(
        &mut self,
        window: Window,
    ) {
        if let Some(client) = self.clients.get(&window) {
            client.set_focused(false);
        }

        if self.focus == Some(window) {
            self.focus = None;
        }

        self.grab_client_buttons(window, false);
        self.decorate(window);
    }

    pub fn focus_root(&mut self) {
        if let Some(focus) = self.focus {
            self.unfocus_client(focus);
        }

        let root = self.screen.root();
        self.conn.focus_root(root);
        self.conn.set_active_window(root, None);
    }

    /// Moves focus away from a window that went away or out of view.
    pub(super) fn revert_focus(&mut self) {
        if self.config.focus_revert == FocusRevert::Window {
            let current = self.desktops.current();
            let candidate = self.recency.iter().copied().find(|&window| {
                Some(window) != self.focus
                    && self.is_visible(window)
                    && self
                        .clients
                        .get(&window)
                        .map_or(false, |client| client.on_desktop(current))
            });

            if let Some(window) = candidate {
                self.focus_client(window);
                return;
            }
        }

        self.focus_root();
    }

    /// Grabs the buttons bound on the client area, which differ with
    /// focus.
    fn grab_client_buttons(
        &self,
        window: Window,
        focused: bool,
    ) {
        let ident = match self.clients.get(&window) {
            Some(client) => client.ident(),
            None => return,
        };

        let context = if focused {
            Context::WindowActiveClient
        } else {
            Context::WindowPassiveClient
        };

        self.conn.ungrab_buttons(window);

        let mut grabbed: Vec<(u32, ModMask)> = Vec::new();

        for binding in self.tables.candidates(context, Some(&ident)) {
            if binding.kind.is_button() {
                let grab = (binding.detail, binding.mods - ModMask::MOVE_RESIZE);

                if !grabbed.contains(&grab) {
                    grabbed.push(grab);
                    self.conn.grab_button(window, grab.0, grab.1);
                }
            }
        }
    }

    /// Maps or unmaps the frame of `window` to match its desktops and
    /// minimized state.
    pub(super) fn apply_visibility(
        &mut self,
        window: Window,
    ) {
        let (frame, show, mapped, want_focus) = match self.clients.get(&window) {
            Some(client) if client.master().is_none() => (
                client.own_frame(),
                client.on_desktop(self.desktops.current()) && !client.is(ClientFlags::MINIMIZED),
                client.is(ClientFlags::MAPPED),
                client.is(ClientFlags::WANT_FOCUS),
            ),
            _ => return,
        };

        if show != mapped {
            if let Some(client) = self.clients.get(&window) {
                client.set_flag(ClientFlags::MAPPED, show);
            }

            if show {
                self.conn.map_window(frame);
            } else {
                self.conn.unmap_window(frame);
            }
        }

        if show && want_focus {
            self.focus_client(window);
        }
    }

    pub fn goto_desktop(
        &mut self,
        index: usize,
    ) {
        if !self.desktops.goto(index) {
            return;
        }

        info!("switching to desktop {}", index);

        let root = self.screen.root();
        self.conn.set_current_desktop(root, index as u32);

        {
            let _grab = ServerGrab::new(self.conn);

            for window in self.masters() {
                self.apply_visibility(window);
            }
        }

        for dock in 0..self.docks.handlers().len() {
            self.update_dock(dock);
        }

        self.update_workarea();

        let lost = self.focus.map_or(true, |focus| {
            !self.is_visible(focus)
                || !self
                    .clients
                    .get(&focus)
                    .map_or(false, |client| client.on_desktop(index))
        });

        if lost {
            self.revert_focus();
        }
    }

    #[inline]
    fn viewport_offset(&self) -> Distance {
        let pos = self.viewport.pos();
        Distance::new(pos.x, pos.y)
    }

    /// Pans the viewport; every non-sticky window moves the opposite way.
    pub fn pan_viewport(
        &mut self,
        target: Pos,
    ) {
        let delta = self.viewport.pan_to(target);

        if delta.is_zero() {
            return;
        }

        debug!("panning viewport to {:?}", self.viewport.pos());

        let offset = self.viewport_offset();
        let _grab = ServerGrab::new(self.conn);

        for window in self.masters() {
            let pos = match self.clients.get(&window) {
                Some(client) if !client.is(ClientFlags::STICKY) => {
                    client.translate(-delta);
                    client.region().pos
                },
                _ => continue,
            };

            self.configure_client(window);
            self.conn.set_virtual_pos(window, pos + offset);
        }

        self.conn
            .set_desktop_viewport(self.screen.root(), self.viewport.pos());
    }

    /// Recomputes the workarea from the struts that apply on the current
    /// desktop and refits maximized windows when it changed.
    pub(super) fn update_workarea(&mut self) {
        let current = self.desktops.current();

        let workarea = {
            let applies = |owner: Window| -> bool {
                if self.docks.holding(owner).is_some() {
                    return true;
                }

                self.clients.get(&owner).map_or(false, |client| {
                    client.on_desktop(current) && !client.is(ClientFlags::MINIMIZED)
                })
            };

            self.screen.workarea(&applies)
        };

        if workarea == self.workarea {
            return;
        }

        debug!("workarea changed to {:?}", workarea);

        self.workarea = workarea;
        self.conn
            .set_workarea(self.screen.root(), &vec![workarea; self.desktops.count()]);

        for window in self.masters() {
            let refit = self.clients.get(&window).map_or(false, |client| {
                client.flags().intersects(ClientFlags::MAXED) && !client.is(ClientFlags::FULLSCREEN)
            });

            if refit {
                self.fit_max(window);
            }
        }
    }

    #[inline]
    pub fn workarea(&self) -> Region {
        self.workarea
    }

    /// Lays out dock `index` and claims its strut.
    pub(super) fn update_dock(
        &mut self,
        index: usize,
    ) {
        let full = self.screen.full_region();
        let current_bit: DesktopMask = self.desktops.current_bit();

        let (frame, region, apps, visible, strut) = match self.docks.get_mut(index) {
            Some(handler) => {
                let region = handler.update(full);
                let visible = region.is_some() && handler.visible_on(current_bit);
                let strut = if visible {
                    handler.strut(full)
                } else {
                    None
                };

                (handler.frame(), region, handler.apps().to_vec(), visible, strut)
            },
            None => return,
        };

        if let Some(region) = region {
            self.conn.place_window(frame, &region);

            for app in &apps {
                self.conn.move_window(app.window, app.pos);
            }
        }

        if visible {
            self.conn.map_window(frame);
        } else {
            self.conn.unmap_window(frame);
        }

        if self.screen.set_struts(frame, strut.into_iter().collect()) {
            self.update_workarea();
        }

        self.restack();
    }

    /// Gives back every window and frees what the session created.
    pub fn teardown(&mut self) {
        info!("tearing down screen {}", self.screen.number());

        self.end_gesture();

        let menus: Vec<MenuId> = self.menus.keys().copied().collect();
        for id in menus {
            self.unmap_menu(id);
        }

        let root = self.screen.root();
        let _grab = ServerGrab::new(self.conn);

        for window in self.masters() {
            self.explode(window);
        }

        for window in self.managed.clone() {
            if let Some(client) = self.clients.get(&window) {
                let pos = client.region().pos;

                self.conn.reparent_window(window, root, pos);
                self.conn.release_client(window);
                self.conn.destroy_window(client.own_frame());
            }
        }

        for handler in self.docks.handlers() {
            let origin = handler.region().map_or(Pos::default(), |region| region.pos);

            for app in handler.apps() {
                self.conn.reparent_window(
                    app.window,
                    root,
                    app.pos + Distance::new(origin.x, origin.y),
                );
            }

            self.conn.destroy_window(handler.frame());
        }

        for &(edge, _) in &self.edges {
            self.conn.destroy_window(edge);
        }

        let pixmaps: Vec<Pixmap> = self
            .held
            .drain()
            .map(|(_, pixmap)| pixmap)
            .collect();

        drop(pixmaps);
        let cached = self.pixmaps.drain();
        self.free_pixmaps(cached);

        self.clients.clear();
        self.managed.clear();
        self.windows.clear();

        self.conn.focus_root(root);
        self.conn.cleanup(root);
    }
}

/// The `_NET_WM_DESKTOP` value of a membership mask.
pub fn desktop_index(
    mask: DesktopMask,
    all: DesktopMask,
) -> u32 {
    if mask & all == all && all.count_ones() > 1 {
        0xffff_ffff
    } else {
        mask.trailing_zeros()
    }
}

/// The x offset of text of `width` inside `space` pixels.
pub fn justify(
    justify: Justify,
    space: i32,
    width: i32,
) -> i32 {
    let x = match justify {
        Justify::Left => 2,
        Justify::Center => (space - width) / 2,
        Justify::Right => space - width - 2,
    };

    std::cmp::max(x, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::mock::session;
    use crate::mock::MockConnection;

    use winsys::geometry::Edge;
    use winsys::geometry::Strut;
    use winsys::hints::SizeHints;

    #[test]
    fn adoption_frames_and_focuses() {
        let conn = MockConnection::new();
        let mut session = session(&conn, "");

        let window = conn.client("xterm", Region::new(100, 100, 300, 200));
        session.adopt(window);

        let client = session.client(window).unwrap();
        let frame = client.own_frame();

        assert_eq!(session.client(frame).map(Client::window), Some(window));
        assert!(conn.is_mapped(frame));
        assert_eq!(session.focused(), Some(window));
        assert_eq!(conn.focus(), Some(window));
        assert_eq!(conn.client_list(), vec![window]);
        assert_eq!(conn.stacking().first(), Some(&frame));

        let extents = Decor::ALL.extents(&session.style);
        assert_eq!(
            conn.placed(frame),
            Some(Region::new(100, 100, 300, 200).with_extents(&extents))
        );
    }

    #[test]
    fn unmanaging_reverts_focus_and_cleans_up() {
        let conn = MockConnection::new();
        let mut session = session(&conn, "");

        let first = conn.client("xterm", Region::new(100, 100, 300, 200));
        let second = conn.client("xclock", Region::new(500, 100, 100, 100));
        session.adopt(first);
        session.adopt(second);

        assert_eq!(session.focused(), Some(second));

        let frame = session.client(second).unwrap().own_frame();
        session.unmanage(second, true);

        assert!(session.client(second).is_none());
        assert!(!session.owns(frame));
        assert!(conn.is_destroyed(frame));
        assert_eq!(session.focused(), Some(first));
        assert_eq!(conn.client_list(), vec![first]);
    }

    #[test]
    fn stacking_covers_every_frame_once() {
        let conn = MockConnection::new();
        let mut session = session(&conn, "");

        let windows: Vec<Window> = (0..3)
            .map(|i| conn.client("xterm", Region::new(10 * i, 10, 100, 100)))
            .collect();

        for &window in &windows {
            session.adopt(window);
        }

        let mut frames: Vec<Window> = windows
            .iter()
            .map(|&window| session.client(window).unwrap().own_frame())
            .collect();

        let mut stacked: Vec<Window> = conn
            .stacking()
            .into_iter()
            .filter(|window| frames.contains(window))
            .collect();

        assert_eq!(stacked[0], frames[2]);

        frames.sort_unstable();
        stacked.sort_unstable();
        assert_eq!(stacked, frames);
    }

    #[test]
    fn maximized_windows_follow_dock_struts() {
        let conn = MockConnection::new();
        let mut session = session(&conn, "");

        let dockapp = conn.dockapp("wmclock", Dim::new(56, 56));
        session.adopt(dockapp);

        assert_eq!(session.workarea(), Region::new(0, 0, 940, 768));

        let window = conn.client("xterm", Region::new(100, 100, 300, 200));
        session.adopt(window);
        session.set_max(window, crate::change::Toggle::On, ClientFlags::MAXED);

        let frame = session.client(window).unwrap().own_frame();
        assert_eq!(conn.placed(frame).map(|region| region.dim.w), Some(940));

        session.release_dockapp(dockapp, false);

        assert_eq!(session.workarea(), Region::new(0, 0, 1000, 768));
        assert!(session.client(window).unwrap().is(ClientFlags::MAXED_H));
        assert_eq!(conn.placed(frame).map(|region| region.dim.w), Some(1000));
    }

    #[test]
    fn focus_waits_for_the_desktop() {
        let conn = MockConnection::new();
        let mut session = session(&conn, "");
        session.goto_desktop(2);

        let window = conn.client("xterm", Region::new(100, 100, 300, 200));
        conn.set_desktop(window, 1);
        session.adopt(window);
        session.set_desktops(window, 0b1010);

        session.focus_client(window);

        let client = session.client(window).unwrap();
        assert!(client.is(ClientFlags::WANT_FOCUS));
        assert_eq!(session.focused(), None);

        session.goto_desktop(3);

        assert_eq!(session.focused(), Some(window));
        assert!(!session.client(window).unwrap().is(ClientFlags::WANT_FOCUS));
        assert!(conn.is_mapped(session.client(window).unwrap().own_frame()));
    }

    #[test]
    fn windows_map_only_on_their_desktops() {
        let conn = MockConnection::new();
        let mut session = session(&conn, "");

        let window = conn.client("xterm", Region::new(100, 100, 300, 200));
        session.adopt(window);
        session.set_desktops(window, 0b0101);

        let frame = session.client(window).unwrap().own_frame();

        for desktop in &[1usize, 2, 3, 0] {
            session.goto_desktop(*desktop);
            assert_eq!(conn.is_mapped(frame), desktop % 2 == 0);
        }

        assert_eq!(session.focused(), Some(window));
    }

    #[test]
    fn panning_translates_all_but_sticky_windows() {
        let conn = MockConnection::new();
        let mut session = session(&conn, "");

        let plain = conn.client("xterm", Region::new(100, 100, 300, 200));
        let sticky = conn.client("xclock", Region::new(500, 100, 100, 100));
        session.adopt(plain);
        session.adopt(sticky);
        session.set_sticky(sticky, crate::change::Toggle::On);

        session.pan_viewport(Pos::new(1000, 5000));

        assert_eq!(session.viewport.pos(), Pos::new(1000, 1536));
        assert_eq!(
            session.client(plain).unwrap().region().pos,
            Pos::new(-900, -1436)
        );
        assert_eq!(session.client(sticky).unwrap().region().pos, Pos::new(500, 100));
        assert_eq!(conn.virtual_pos(plain), Some(Pos::new(100, 100)));
    }

    #[test]
    fn client_struts_shrink_the_workarea() {
        let conn = MockConnection::new();
        let mut session = session(&conn, "");

        let panel = conn.client("panel", Region::new(0, 0, 1024, 24));
        conn.set_struts(panel, vec![Strut::new(Edge::Top, 24)]);
        session.adopt(panel);

        assert_eq!(session.workarea().pos.y, 24);

        session.set_minimized(panel, crate::change::Toggle::On);
        assert_eq!(session.workarea().pos.y, 0);
    }

    #[test]
    fn size_hints_constrain_adoption() {
        let conn = MockConnection::new();
        let mut session = session(&conn, "");

        let window = conn.client("xterm", Region::new(10, 10, 307, 203));
        conn.set_size_hints(window, SizeHints {
            base_width: Some(4),
            base_height: Some(3),
            inc_width: Some(10),
            inc_height: Some(20),
            ..SizeHints::default()
        });

        session.adopt(window);

        assert_eq!(session.client(window).unwrap().region().dim, Dim::new(304, 203));
    }

    #[test]
    fn desktop_indices() {
        assert_eq!(desktop_index(0b100, 0b1111), 2);
        assert_eq!(desktop_index(0b1111, 0b1111), 0xffff_ffff);
        assert_eq!(desktop_index(0b1, 0b1), 0);
        assert_eq!(justify(Justify::Center, 100, 40), 30);
        assert_eq!(justify(Justify::Right, 30, 40), 0);
    }
}
