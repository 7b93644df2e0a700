use super::input;
use super::util::Util;

use crate::connection::Connection;
use crate::connection::KeyMap;
use crate::event::Event;
use crate::event::PropertyKind;
use crate::event::ToggleAction;
use crate::geometry::Dim;
use crate::geometry::Extents;
use crate::geometry::Pos;
use crate::geometry::Region;
use crate::geometry::Strut;
use crate::hints::struts_from_words;
use crate::hints::Hints;
use crate::hints::MotifHints;
use crate::hints::SizeHints;
use crate::input::EventKind;
use crate::input::KeyCode;
use crate::input::ModMask;
use crate::screen::Screen;
use crate::window::IcccmWindowState;
use crate::window::Pixmap;
use crate::window::Window;
use crate::window::WindowAttributes;
use crate::window::WindowState;
use crate::window::WindowType;
use crate::Result;

use std::cell::Cell;
use std::cell::RefCell;
use std::collections::HashMap;
use std::os::unix::io::RawFd;
use std::time::Duration;
use std::time::Instant;

use x11rb::connection;
use x11rb::errors::ReplyError;
use x11rb::protocol::xproto;
use x11rb::protocol::xproto::ConnectionExt;
use x11rb::protocol::xproto::EventMask;
use x11rb::protocol::ErrorKind;
use x11rb::protocol::Event as XEvent;
use x11rb::wrapper::ConnectionExt as _;

use anyhow::anyhow;
use nix::errno::Errno;
use nix::poll::poll;
use nix::poll::PollFd;
use nix::poll::PollFlags;

type Atom = u32;

x11rb::atom_manager! {
    pub Atoms: AtomsCookie {
        Any,
        ATOM,
        CARDINAL,
        WINDOW,
        STRING,
        UTF8_STRING,

        // ICCCM client properties
        WM_NAME,
        WM_CLASS,
        WM_HINTS,
        WM_PROTOCOLS,
        WM_NORMAL_HINTS,
        WM_DELETE_WINDOW,
        WM_TRANSIENT_FOR,

        // ICCCM window manager properties
        WM_STATE,

        // Motif
        _MOTIF_WM_HINTS,

        // EWMH root properties
        _NET_SUPPORTED,
        _NET_CLIENT_LIST,
        _NET_CLIENT_LIST_STACKING,
        _NET_NUMBER_OF_DESKTOPS,
        _NET_DESKTOP_GEOMETRY,
        _NET_DESKTOP_VIEWPORT,
        _NET_CURRENT_DESKTOP,
        _NET_DESKTOP_NAMES,
        _NET_ACTIVE_WINDOW,
        _NET_WORKAREA,
        _NET_SUPPORTING_WM_CHECK,

        // EWMH root messages
        _NET_CLOSE_WINDOW,

        // EWMH application properties
        _NET_WM_NAME,
        _NET_WM_DESKTOP,
        _NET_WM_WINDOW_TYPE,
        _NET_WM_STATE,
        _NET_WM_STRUT,
        _NET_WM_STRUT_PARTIAL,
        _NET_WM_PID,
        _NET_FRAME_EXTENTS,
        _NET_WM_WINDOW_OPACITY,
        _NET_VIRTUAL_POS,

        // EWMH window states
        _NET_WM_STATE_STICKY,
        _NET_WM_STATE_MAXIMIZED_VERT,
        _NET_WM_STATE_MAXIMIZED_HORZ,
        _NET_WM_STATE_SHADED,
        _NET_WM_STATE_HIDDEN,
        _NET_WM_STATE_FULLSCREEN,
        _NET_WM_STATE_ABOVE,
        _NET_WM_STATE_BELOW,

        // EWMH window types
        _NET_WM_WINDOW_TYPE_DESKTOP,
        _NET_WM_WINDOW_TYPE_DOCK,
        _NET_WM_WINDOW_TYPE_TOOLBAR,
        _NET_WM_WINDOW_TYPE_MENU,
        _NET_WM_WINDOW_TYPE_UTILITY,
        _NET_WM_WINDOW_TYPE_SPLASH,
        _NET_WM_WINDOW_TYPE_DIALOG,
        _NET_WM_WINDOW_TYPE_NORMAL,
    }
}

struct ScreenData {
    screen: xproto::Screen,
    number: usize,
    check_window: Window,
    draw_gc: xproto::Gcontext,
    outline_gc: xproto::Gcontext,
}

pub struct XConnection<'conn, Conn: connection::Connection> {
    conn: &'conn Conn,
    fd: RawFd,
    atoms: Atoms,
    type_map: HashMap<Atom, WindowType>,
    state_map: HashMap<Atom, WindowState>,
    screens: Vec<ScreenData>,
    roots: RefCell<HashMap<Window, Window>>,
    font: Cell<xproto::Font>,
    outline: Cell<Option<(Window, Region)>>,
    client_event_mask: EventMask,
    frame_event_mask: EventMask,
    decoration_event_mask: EventMask,
    input_event_mask: EventMask,
    grab_event_mask: EventMask,
}

impl<'conn, Conn: connection::Connection> XConnection<'conn, Conn> {
    /// Takes over window management on every screen in `screen_numbers`.
    pub fn new(
        conn: &'conn Conn,
        fd: RawFd,
        screen_numbers: &[usize],
    ) -> Result<Self> {
        let atoms = Atoms::new(conn)?.reply()?;

        let root_event_mask: EventMask = EventMask::PROPERTY_CHANGE
            | EventMask::SUBSTRUCTURE_REDIRECT
            | EventMask::SUBSTRUCTURE_NOTIFY
            | EventMask::STRUCTURE_NOTIFY
            | EventMask::BUTTON_PRESS
            | EventMask::BUTTON_RELEASE
            | EventMask::ENTER_WINDOW
            | EventMask::LEAVE_WINDOW;

        let mut screens = Vec::with_capacity(screen_numbers.len());
        let mut roots = HashMap::new();

        for &number in screen_numbers {
            let screen = conn
                .setup()
                .roots
                .get(number)
                .cloned()
                .ok_or_else(|| anyhow!("screen {} does not exist", number))?;

            let aux = xproto::ChangeWindowAttributesAux::default().event_mask(root_event_mask);
            let res = conn.change_window_attributes(screen.root, &aux)?.check();

            if let Err(ReplyError::X11Error(err)) = res {
                if err.error_kind == ErrorKind::Access {
                    return Err(anyhow!("another window manager is already running"));
                } else {
                    return Err(anyhow!("unable to set up window manager"));
                }
            }

            let check_window = conn.generate_id()?;
            conn.create_window(
                x11rb::COPY_DEPTH_FROM_PARENT,
                check_window,
                screen.root,
                -1,
                -1,
                1,
                1,
                0,
                xproto::WindowClass::INPUT_ONLY,
                x11rb::COPY_FROM_PARENT,
                &xproto::CreateWindowAux::default().override_redirect(1),
            )?;

            let draw_gc = conn.generate_id()?;
            conn.create_gc(
                draw_gc,
                screen.root,
                &xproto::CreateGCAux::default()
                    .foreground(screen.black_pixel)
                    .graphics_exposures(0),
            )?;

            let outline_gc = conn.generate_id()?;
            conn.create_gc(
                outline_gc,
                screen.root,
                &xproto::CreateGCAux::default()
                    .function(xproto::GX::XOR)
                    .foreground(screen.white_pixel ^ screen.black_pixel)
                    .line_width(2)
                    .subwindow_mode(xproto::SubwindowMode::INCLUDE_INFERIORS),
            )?;

            roots.insert(screen.root, screen.root);
            screens.push(ScreenData {
                screen,
                number,
                check_window,
                draw_gc,
                outline_gc,
            });
        }

        let type_map: HashMap<Atom, WindowType> = map!(
            atoms._NET_WM_WINDOW_TYPE_DESKTOP => WindowType::Desktop,
            atoms._NET_WM_WINDOW_TYPE_DOCK => WindowType::Dock,
            atoms._NET_WM_WINDOW_TYPE_TOOLBAR => WindowType::Toolbar,
            atoms._NET_WM_WINDOW_TYPE_MENU => WindowType::Menu,
            atoms._NET_WM_WINDOW_TYPE_UTILITY => WindowType::Utility,
            atoms._NET_WM_WINDOW_TYPE_SPLASH => WindowType::Splash,
            atoms._NET_WM_WINDOW_TYPE_DIALOG => WindowType::Dialog,
            atoms._NET_WM_WINDOW_TYPE_NORMAL => WindowType::Normal,
        );

        let state_map: HashMap<Atom, WindowState> = map!(
            atoms._NET_WM_STATE_STICKY => WindowState::Sticky,
            atoms._NET_WM_STATE_MAXIMIZED_VERT => WindowState::MaximizedVert,
            atoms._NET_WM_STATE_MAXIMIZED_HORZ => WindowState::MaximizedHorz,
            atoms._NET_WM_STATE_SHADED => WindowState::Shaded,
            atoms._NET_WM_STATE_HIDDEN => WindowState::Hidden,
            atoms._NET_WM_STATE_FULLSCREEN => WindowState::Fullscreen,
            atoms._NET_WM_STATE_ABOVE => WindowState::Above,
            atoms._NET_WM_STATE_BELOW => WindowState::Below,
        );

        let font = conn.generate_id()?;
        conn.open_font(font, b"fixed")?;

        let client_event_mask: EventMask = EventMask::PROPERTY_CHANGE
            | EventMask::STRUCTURE_NOTIFY
            | EventMask::FOCUS_CHANGE
            | EventMask::ENTER_WINDOW
            | EventMask::LEAVE_WINDOW;

        let frame_event_mask: EventMask = EventMask::SUBSTRUCTURE_REDIRECT
            | EventMask::SUBSTRUCTURE_NOTIFY
            | EventMask::BUTTON_PRESS
            | EventMask::BUTTON_RELEASE
            | EventMask::ENTER_WINDOW
            | EventMask::LEAVE_WINDOW
            | EventMask::EXPOSURE;

        let decoration_event_mask: EventMask = EventMask::BUTTON_PRESS
            | EventMask::BUTTON_RELEASE
            | EventMask::ENTER_WINDOW
            | EventMask::LEAVE_WINDOW
            | EventMask::EXPOSURE;

        let input_event_mask: EventMask = EventMask::BUTTON_PRESS
            | EventMask::BUTTON_RELEASE
            | EventMask::ENTER_WINDOW
            | EventMask::LEAVE_WINDOW;

        let grab_event_mask: EventMask = EventMask::BUTTON_PRESS
            | EventMask::BUTTON_RELEASE
            | EventMask::POINTER_MOTION
            | EventMask::ENTER_WINDOW
            | EventMask::LEAVE_WINDOW;

        Self::init(Self {
            conn,
            fd,
            atoms,
            type_map,
            state_map,
            screens,
            roots: RefCell::new(roots),
            font: Cell::new(font),
            outline: Cell::new(None),
            client_event_mask,
            frame_event_mask,
            decoration_event_mask,
            input_event_mask,
            grab_event_mask,
        })
    }

    #[inline]
    fn init(connection: Self) -> Result<Self> {
        connection.flush();
        Ok(connection)
    }

    fn screen_data(
        &self,
        root: Window,
    ) -> Option<&ScreenData> {
        self.screens.iter().find(|data| data.screen.root == root)
    }

    /// The root of a window this connection created or a root itself;
    /// anything else is resolved through the server.
    fn root_of(
        &self,
        window: Window,
    ) -> Window {
        if let Some(&root) = self.roots.borrow().get(&window) {
            return root;
        }

        self.conn
            .get_geometry(window)
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .map_or_else(
                || self.screens.first().map_or(x11rb::NONE, |data| data.screen.root),
                |reply| reply.root,
            )
    }

    fn property32(
        &self,
        window: Window,
        atom: Atom,
    ) -> Option<Vec<u32>> {
        let reply = self
            .conn
            .get_property(false, window, atom, xproto::AtomEnum::ANY, 0, std::u32::MAX)
            .ok()?
            .reply()
            .ok()?;

        let words: Vec<u32> = reply.value32()?.collect();

        if words.is_empty() {
            None
        } else {
            Some(words)
        }
    }

    fn property_bytes(
        &self,
        window: Window,
        atom: Atom,
    ) -> Option<Vec<u8>> {
        let reply = self
            .conn
            .get_property(false, window, atom, xproto::AtomEnum::ANY, 0, std::u32::MAX)
            .ok()?
            .reply()
            .ok()?;

        if reply.format != 8 || reply.value.is_empty() {
            None
        } else {
            Some(reply.value)
        }
    }

    fn window_has_protocol(
        &self,
        window: Window,
        protocol: Atom,
    ) -> bool {
        self.property32(window, self.atoms.WM_PROTOCOLS)
            .map_or(false, |protocols| protocols.contains(&protocol))
    }

    #[inline]
    fn send_protocol_client_message(
        &self,
        window: Window,
        atom: Atom,
    ) -> Result<()> {
        let event = xproto::ClientMessageEvent::new(32, window, self.atoms.WM_PROTOCOLS, [
            atom,
            x11rb::CURRENT_TIME,
            0,
            0,
            0,
        ]);

        self.conn
            .send_event(false, window, EventMask::NO_EVENT, event)?;

        Ok(())
    }

    fn create_window(
        &self,
        parent: Window,
        region: Region,
        class: xproto::WindowClass,
        aux: &xproto::CreateWindowAux,
    ) -> Result<Window> {
        let window = self.conn.generate_id()?;

        self.conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            window,
            parent,
            region.pos.x as i16,
            region.pos.y as i16,
            std::cmp::max(region.dim.w, 1) as u16,
            std::cmp::max(region.dim.h, 1) as u16,
            0,
            class,
            x11rb::COPY_FROM_PARENT,
            aux,
        )?;

        let root = self.root_of(parent);
        self.roots.borrow_mut().insert(window, root);

        Ok(window)
    }

    fn draw_rectangle(
        &self,
        root: Window,
        region: Region,
    ) {
        if let Some(data) = self.screen_data(root) {
            drop(self.conn.poly_rectangle(root, data.outline_gc, &[xproto::Rectangle {
                x: region.pos.x as i16,
                y: region.pos.y as i16,
                width: std::cmp::max(region.dim.w, 1) as u16,
                height: std::cmp::max(region.dim.h, 1) as u16,
            }]));
        }
    }

    fn translate(
        &self,
        event: XEvent,
    ) -> Option<Event> {
        match event {
            XEvent::ButtonPress(e) => Some(Event::Input(input::on_button_press(&e))),
            XEvent::ButtonRelease(e) => Some(Event::Input(input::on_button_release(&e))),
            XEvent::KeyPress(e) => Some(Event::Input(input::on_key_press(&e))),
            XEvent::KeyRelease(e) => Some(Event::Input(input::on_key_release(&e))),
            XEvent::EnterNotify(e) => self.on_crossing(EventKind::EnterNotify, &e),
            XEvent::LeaveNotify(e) => self.on_crossing(EventKind::LeaveNotify, &e),
            XEvent::MotionNotify(e) => Some(Event::Motion {
                window: e.event,
                root_pos: Pos {
                    x: e.root_x as i32,
                    y: e.root_y as i32,
                },
                state: ModMask::from_state(u16::from(e.state)),
            }),
            XEvent::MapRequest(e) => Some(Event::MapRequest {
                window: e.window,
                parent: e.parent,
            }),
            XEvent::UnmapNotify(e) => Some(Event::Unmap {
                window: e.window,
                synthetic: e.response_type & 0x80 != 0,
            }),
            XEvent::DestroyNotify(e) => Some(Event::Destroy {
                window: e.window,
            }),
            XEvent::ConfigureRequest(e) => self.on_configure_request(&e),
            XEvent::PropertyNotify(e) => self.on_property_notify(&e),
            XEvent::ClientMessage(e) => self.on_client_message(&e),
            XEvent::Expose(e) if e.count == 0 => Some(Event::Expose {
                window: e.window,
            }),
            XEvent::MappingNotify(_) => Some(Event::Mapping),
            _ => None,
        }
    }

    #[inline]
    fn on_crossing(
        &self,
        kind: EventKind,
        event: &xproto::EnterNotifyEvent,
    ) -> Option<Event> {
        if event.mode != xproto::NotifyMode::NORMAL {
            return None;
        }

        Some(Event::Input(input::on_crossing(kind, event)))
    }

    #[inline]
    fn on_configure_request(
        &self,
        event: &xproto::ConfigureRequestEvent,
    ) -> Option<Event> {
        let mask = u16::from(event.value_mask);
        let has = |flag: xproto::ConfigWindow| mask & u16::from(flag) != 0;

        Some(Event::ConfigureRequest {
            window: event.window,
            pos: (
                if has(xproto::ConfigWindow::X) {
                    Some(event.x as i32)
                } else {
                    None
                },
                if has(xproto::ConfigWindow::Y) {
                    Some(event.y as i32)
                } else {
                    None
                },
            ),
            dim: (
                if has(xproto::ConfigWindow::WIDTH) {
                    Some(event.width as i32)
                } else {
                    None
                },
                if has(xproto::ConfigWindow::HEIGHT) {
                    Some(event.height as i32)
                } else {
                    None
                },
            ),
        })
    }

    #[inline]
    fn on_property_notify(
        &self,
        event: &xproto::PropertyNotifyEvent,
    ) -> Option<Event> {
        let kind = if event.atom == self.atoms.WM_NAME || event.atom == self.atoms._NET_WM_NAME {
            PropertyKind::Name
        } else if event.atom == self.atoms.WM_CLASS {
            PropertyKind::Class
        } else if event.atom == self.atoms.WM_NORMAL_HINTS {
            PropertyKind::Size
        } else if event.atom == self.atoms.WM_HINTS || event.atom == self.atoms._MOTIF_WM_HINTS {
            PropertyKind::Hints
        } else if event.atom == self.atoms._NET_WM_STRUT
            || event.atom == self.atoms._NET_WM_STRUT_PARTIAL
        {
            PropertyKind::Strut
        } else {
            return None;
        };

        Some(Event::Property {
            window: event.window,
            kind,
        })
    }

    #[inline]
    fn on_client_message(
        &self,
        event: &xproto::ClientMessageEvent,
    ) -> Option<Event> {
        if event.format != 32 {
            return None;
        }

        let data = event.data.as_data32();

        if event.type_ == self.atoms._NET_WM_STATE {
            let states: Vec<WindowState> = data[1..=2]
                .iter()
                .filter_map(|atom| self.state_map.get(atom).copied())
                .collect();

            if states.is_empty() {
                return None;
            }

            return Some(Event::StateRequest {
                window: event.window,
                states,
                action: ToggleAction::from_word(data[0])?,
            });
        }

        if event.type_ == self.atoms._NET_CURRENT_DESKTOP
            || event.type_ == self.atoms._NET_WM_DESKTOP
        {
            return Some(Event::DesktopRequest {
                window: event.window,
                index: data[0],
            });
        }

        if event.type_ == self.atoms._NET_ACTIVE_WINDOW {
            return Some(Event::ActivateRequest {
                window: event.window,
            });
        }

        if event.type_ == self.atoms._NET_CLOSE_WINDOW {
            return Some(Event::CloseRequest {
                window: event.window,
            });
        }

        if event.type_ == self.atoms._NET_DESKTOP_VIEWPORT {
            return Some(Event::ViewportRequest {
                window: event.window,
                pos: Pos {
                    x: data[0] as i32,
                    y: data[1] as i32,
                },
            });
        }

        None
    }
}

impl<'conn, Conn: connection::Connection> Connection for XConnection<'conn, Conn> {
    #[inline]
    fn flush(&self) -> bool {
        self.conn.flush().is_ok()
    }

    fn wait_event(
        &self,
        timeout: Option<Duration>,
    ) -> Result<Option<Event>> {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);

        loop {
            while let Some(event) = self.conn.poll_for_event()? {
                if let Some(event) = self.translate(event) {
                    return Ok(Some(event));
                }
            }

            self.conn.flush()?;

            let wait = match deadline {
                Some(deadline) => {
                    let now = Instant::now();

                    if now >= deadline {
                        return Ok(None);
                    }

                    (deadline - now).as_millis() as i32 + 1
                },
                None => -1,
            };

            let mut fds = [PollFd::new(self.fd, PollFlags::POLLIN)];

            match poll(&mut fds, wait) {
                Ok(0) | Err(Errno::EINTR) => return Ok(None),
                Ok(_) => {},
                Err(err) => return Err(anyhow!("unable to poll display connection: {}", err)),
            }
        }
    }

    fn poll_event(&self) -> Option<Event> {
        while let Ok(Some(event)) = self.conn.poll_for_event() {
            if let Some(event) = self.translate(event) {
                return Some(event);
            }
        }

        None
    }

    fn screens(&self) -> Vec<Screen> {
        self.screens
            .iter()
            .map(|data| {
                Screen::new(
                    data.number,
                    data.screen.root,
                    Region::new(
                        0,
                        0,
                        data.screen.width_in_pixels as i32,
                        data.screen.height_in_pixels as i32,
                    ),
                )
            })
            .collect()
    }

    fn top_level_windows(
        &self,
        root: Window,
    ) -> Vec<Window> {
        self.conn
            .query_tree(root)
            .map_or(Vec::with_capacity(0), |cookie| {
                cookie
                    .reply()
                    .map_or(Vec::with_capacity(0), |reply| reply.children)
            })
    }

    fn keymap(&self) -> KeyMap {
        Util::system_keymap().unwrap_or_default()
    }

    fn cleanup(
        &self,
        root: Window,
    ) {
        drop(
            self.conn
                .ungrab_key(xproto::Grab::ANY, root, xproto::ModMask::ANY),
        );

        if let Some(data) = self.screen_data(root) {
            drop(self.conn.destroy_window(data.check_window));
        }

        for &atom in &[
            self.atoms._NET_ACTIVE_WINDOW,
            self.atoms._NET_SUPPORTING_WM_CHECK,
            self.atoms._NET_SUPPORTED,
            self.atoms._NET_WM_PID,
            self.atoms._NET_CLIENT_LIST,
            self.atoms._NET_CLIENT_LIST_STACKING,
            self.atoms._NET_WORKAREA,
        ] {
            drop(self.conn.delete_property(root, atom));
        }

        self.flush();
    }

    #[inline]
    fn grab_server(&self) {
        drop(self.conn.grab_server());
    }

    #[inline]
    fn ungrab_server(&self) {
        drop(self.conn.ungrab_server());
        self.flush();
    }

    fn window_attributes(
        &self,
        window: Window,
    ) -> Option<WindowAttributes> {
        let reply = self
            .conn
            .get_window_attributes(window)
            .ok()?
            .reply()
            .ok()?;

        Some(WindowAttributes {
            override_redirect: reply.override_redirect,
            mapped: reply.map_state != xproto::MapState::UNMAPPED,
            input_only: reply.class == xproto::WindowClass::INPUT_ONLY,
        })
    }

    #[inline]
    fn window_geometry(
        &self,
        window: Window,
    ) -> Result<Region> {
        let reply = self.conn.get_geometry(window)?.reply()?;

        Ok(Region::new(
            reply.x as i32,
            reply.y as i32,
            reply.width as i32,
            reply.height as i32,
        ))
    }

    fn create_frame(
        &self,
        parent: Window,
        region: Region,
    ) -> Result<Window> {
        let aux = xproto::CreateWindowAux::new()
            .override_redirect(1)
            .event_mask(self.frame_event_mask);

        self.create_window(parent, region, xproto::WindowClass::INPUT_OUTPUT, &aux)
    }

    fn create_decoration(
        &self,
        parent: Window,
        region: Region,
    ) -> Result<Window> {
        let aux = xproto::CreateWindowAux::new().event_mask(self.decoration_event_mask);

        self.create_window(parent, region, xproto::WindowClass::INPUT_OUTPUT, &aux)
    }

    fn create_input_window(
        &self,
        parent: Window,
        region: Region,
    ) -> Result<Window> {
        let aux = xproto::CreateWindowAux::new()
            .override_redirect(1)
            .event_mask(self.input_event_mask);

        self.create_window(parent, region, xproto::WindowClass::INPUT_ONLY, &aux)
    }

    #[inline]
    fn init_client(
        &self,
        window: Window,
    ) {
        drop(self.conn.change_window_attributes(
            window,
            &xproto::ChangeWindowAttributesAux::default().event_mask(self.client_event_mask),
        ));

        drop(self.conn.configure_window(
            window,
            &xproto::ConfigureWindowAux::default().border_width(0),
        ));
    }

    #[inline]
    fn release_client(
        &self,
        window: Window,
    ) {
        drop(self.conn.change_window_attributes(
            window,
            &xproto::ChangeWindowAttributesAux::default().event_mask(EventMask::NO_EVENT),
        ));

        drop(self.conn.change_save_set(xproto::SetMode::DELETE, window));
    }

    #[inline]
    fn destroy_window(
        &self,
        window: Window,
    ) {
        drop(self.conn.destroy_window(window));
        self.roots.borrow_mut().remove(&window);
    }

    #[inline]
    fn map_window(
        &self,
        window: Window,
    ) {
        drop(self.conn.map_window(window));
    }

    #[inline]
    fn unmap_window(
        &self,
        window: Window,
    ) {
        drop(self.conn.unmap_window(window));
    }

    #[inline]
    fn reparent_window(
        &self,
        window: Window,
        parent: Window,
        pos: Pos,
    ) {
        drop(
            self.conn
                .reparent_window(window, parent, pos.x as i16, pos.y as i16),
        );
    }

    #[inline]
    fn place_window(
        &self,
        window: Window,
        region: &Region,
    ) {
        drop(
            self.conn.configure_window(
                window,
                &xproto::ConfigureWindowAux::default()
                    .x(region.pos.x)
                    .y(region.pos.y)
                    .width(std::cmp::max(region.dim.w, 1) as u32)
                    .height(std::cmp::max(region.dim.h, 1) as u32),
            ),
        );
    }

    #[inline]
    fn move_window(
        &self,
        window: Window,
        pos: Pos,
    ) {
        drop(self.conn.configure_window(
            window,
            &xproto::ConfigureWindowAux::default().x(pos.x).y(pos.y),
        ));
    }

    fn restack(
        &self,
        windows: &[Window],
    ) {
        if let Some(&top) = windows.first() {
            drop(self.conn.configure_window(
                top,
                &xproto::ConfigureWindowAux::default().stack_mode(xproto::StackMode::ABOVE),
            ));
        }

        for pair in windows.windows(2) {
            drop(
                self.conn.configure_window(
                    pair[1],
                    &xproto::ConfigureWindowAux::default()
                        .sibling(pair[0])
                        .stack_mode(xproto::StackMode::BELOW),
                ),
            );
        }
    }

    #[inline]
    fn add_to_save_set(
        &self,
        window: Window,
    ) {
        drop(self.conn.change_save_set(xproto::SetMode::INSERT, window));
    }

    #[inline]
    fn set_input_focus(
        &self,
        window: Window,
    ) {
        drop(self.conn.set_input_focus(
            xproto::InputFocus::POINTER_ROOT,
            window,
            x11rb::CURRENT_TIME,
        ));
    }

    #[inline]
    fn focus_root(
        &self,
        root: Window,
    ) {
        drop(self.conn.set_input_focus(
            xproto::InputFocus::POINTER_ROOT,
            root,
            x11rb::CURRENT_TIME,
        ));
    }

    fn close_window(
        &self,
        window: Window,
    ) -> bool {
        if self.window_has_protocol(window, self.atoms.WM_DELETE_WINDOW) {
            self.send_protocol_client_message(window, self.atoms.WM_DELETE_WINDOW)
                .map_or(false, |_| self.flush())
        } else {
            self.kill_window(window);
            false
        }
    }

    #[inline]
    fn kill_window(
        &self,
        window: Window,
    ) {
        drop(self.conn.kill_client(window));
        self.flush();
    }

    fn send_configure_notify(
        &self,
        window: Window,
        region: Region,
    ) {
        let event = xproto::ConfigureNotifyEvent {
            response_type: xproto::CONFIGURE_NOTIFY_EVENT,
            sequence: 0,
            event: window,
            window,
            above_sibling: x11rb::NONE,
            x: region.pos.x as i16,
            y: region.pos.y as i16,
            width: region.dim.w as u16,
            height: region.dim.h as u16,
            border_width: 0,
            override_redirect: false,
        };

        drop(
            self.conn
                .send_event(false, window, EventMask::STRUCTURE_NOTIFY, event),
        );
    }

    fn set_window_background(
        &self,
        window: Window,
        color: u32,
        pixmap: Option<Pixmap>,
    ) {
        let aux = match pixmap {
            Some(pixmap) => xproto::ChangeWindowAttributesAux::default().background_pixmap(pixmap),
            None => xproto::ChangeWindowAttributesAux::default().background_pixel(color),
        };

        drop(self.conn.change_window_attributes(window, &aux));
        drop(self.conn.clear_area(false, window, 0, 0, 0, 0));
    }

    fn render_pixmap(
        &self,
        root: Window,
        dim: Dim,
        color: u32,
        color_to: u32,
    ) -> Option<Pixmap> {
        let data = self.screen_data(root)?;
        let pixmap = self.conn.generate_id().ok()?;
        let (w, h) = (std::cmp::max(dim.w, 1), std::cmp::max(dim.h, 1));

        self.conn
            .create_pixmap(data.screen.root_depth, pixmap, root, w as u16, h as u16)
            .ok()?;

        let bands = std::cmp::min(h, 32);
        let channel = |c: u32, shift: u32| ((c >> shift) & 0xff) as i32;

        for band in 0..bands {
            let blend = |shift: u32| {
                let from = channel(color, shift);
                let to = channel(color_to, shift);
                let value = from + (to - from) * band / std::cmp::max(bands - 1, 1);

                (value as u32 & 0xff) << shift
            };

            let pixel = blend(16) | blend(8) | blend(0);
            let y = h * band / bands;
            let next = h * (band + 1) / bands;

            drop(self.conn.change_gc(
                data.draw_gc,
                &xproto::ChangeGCAux::new().foreground(pixel),
            ));

            drop(
                self.conn
                    .poly_fill_rectangle(pixmap, data.draw_gc, &[xproto::Rectangle {
                        x: 0,
                        y: y as i16,
                        width: w as u16,
                        height: std::cmp::max(next - y, 1) as u16,
                    }]),
            );
        }

        Some(pixmap)
    }

    #[inline]
    fn free_pixmap(
        &self,
        pixmap: Pixmap,
    ) {
        drop(self.conn.free_pixmap(pixmap));
    }

    fn set_window_opacity(
        &self,
        window: Window,
        opacity: Option<u32>,
    ) {
        match opacity {
            Some(opacity) => drop(self.conn.change_property32(
                xproto::PropMode::REPLACE,
                window,
                self.atoms._NET_WM_WINDOW_OPACITY,
                self.atoms.CARDINAL,
                &[opacity],
            )),
            None => drop(
                self.conn
                    .delete_property(window, self.atoms._NET_WM_WINDOW_OPACITY),
            ),
        }
    }

    fn load_font(
        &self,
        name: &str,
    ) -> bool {
        let font = match self.conn.generate_id() {
            Ok(font) => font,
            Err(_) => return false,
        };

        let loaded = self
            .conn
            .open_font(font, name.as_bytes())
            .map_or(false, |cookie| cookie.check().is_ok());

        if loaded {
            let previous = self.font.replace(font);
            drop(self.conn.close_font(previous));

            for data in &self.screens {
                drop(self.conn.change_gc(
                    data.draw_gc,
                    &xproto::ChangeGCAux::new().font(font),
                ));
            }
        }

        loaded
    }

    fn text_width(
        &self,
        text: &str,
    ) -> i32 {
        let chars: Vec<xproto::Char2b> = text
            .bytes()
            .map(|byte| xproto::Char2b {
                byte1: 0,
                byte2: byte,
            })
            .collect();

        self.conn
            .query_text_extents(self.font.get(), &chars)
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .map_or(6 * text.len() as i32, |reply| reply.overall_width)
    }

    fn draw_text(
        &self,
        window: Window,
        pos: Pos,
        text: &str,
        color: u32,
    ) {
        let root = self.root_of(window);

        if let Some(data) = self.screen_data(root) {
            drop(self.conn.change_gc(
                data.draw_gc,
                &xproto::ChangeGCAux::new()
                    .foreground(color)
                    .font(self.font.get()),
            ));

            let mut items = Vec::with_capacity(text.len() + 2);
            for chunk in text.as_bytes().chunks(254) {
                items.push(chunk.len() as u8);
                items.push(0);
                items.extend_from_slice(chunk);
            }

            drop(self.conn.clear_area(false, window, 0, 0, 0, 0));
            drop(
                self.conn
                    .poly_text8(window, data.draw_gc, pos.x as i16, pos.y as i16, &items),
            );
        }
    }

    fn draw_outline(
        &self,
        root: Window,
        region: Option<Region>,
    ) {
        // xor drawing: repainting the previous outline erases it
        if let Some((previous_root, previous)) = self.outline.take() {
            self.draw_rectangle(previous_root, previous);
        }

        if let Some(region) = region {
            self.draw_rectangle(root, region);
            self.outline.set(Some((root, region)));
        }

        self.flush();
    }

    fn grab_pointer(
        &self,
        window: Window,
    ) -> bool {
        self.conn
            .grab_pointer(
                false,
                window,
                self.grab_event_mask,
                xproto::GrabMode::ASYNC,
                xproto::GrabMode::ASYNC,
                x11rb::NONE,
                x11rb::NONE,
                x11rb::CURRENT_TIME,
            )
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .map_or(false, |reply| reply.status == xproto::GrabStatus::SUCCESS)
    }

    #[inline]
    fn release_pointer(&self) {
        drop(self.conn.ungrab_pointer(x11rb::CURRENT_TIME));
    }

    fn grab_keyboard(
        &self,
        window: Window,
    ) -> bool {
        self.conn
            .grab_keyboard(
                false,
                window,
                x11rb::CURRENT_TIME,
                xproto::GrabMode::ASYNC,
                xproto::GrabMode::ASYNC,
            )
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .map_or(false, |reply| reply.status == xproto::GrabStatus::SUCCESS)
    }

    #[inline]
    fn release_keyboard(&self) {
        drop(self.conn.ungrab_keyboard(x11rb::CURRENT_TIME));
    }

    fn grab_button(
        &self,
        window: Window,
        button: u32,
        modifiers: ModMask,
    ) {
        let lock = u16::from(xproto::ModMask::LOCK);
        let num = u16::from(xproto::ModMask::M2);

        for &m in &[0, lock, num, lock | num] {
            drop(self.conn.grab_button(
                true,
                window,
                EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE,
                xproto::GrabMode::SYNC,
                xproto::GrabMode::ASYNC,
                x11rb::NONE,
                x11rb::NONE,
                xproto::ButtonIndex::from(button as u8),
                xproto::ModMask::from(modifiers.wire_bits() | m),
            ));
        }
    }

    #[inline]
    fn ungrab_buttons(
        &self,
        window: Window,
    ) {
        drop(
            self.conn
                .ungrab_button(xproto::ButtonIndex::ANY, window, xproto::ModMask::ANY),
        );
    }

    fn grab_key(
        &self,
        root: Window,
        code: KeyCode,
        modifiers: ModMask,
    ) {
        let lock = u16::from(xproto::ModMask::LOCK);
        let num = u16::from(xproto::ModMask::M2);

        for &m in &[0, lock, num, lock | num] {
            drop(self.conn.grab_key(
                true,
                root,
                xproto::ModMask::from(modifiers.wire_bits() | m),
                code,
                xproto::GrabMode::ASYNC,
                xproto::GrabMode::SYNC,
            ));
        }
    }

    #[inline]
    fn ungrab_keys(
        &self,
        root: Window,
    ) {
        drop(
            self.conn
                .ungrab_key(xproto::Grab::ANY, root, xproto::ModMask::ANY),
        );
    }

    #[inline]
    fn allow_events(
        &self,
        keyboard: bool,
        replay: bool,
    ) {
        let mode = match (keyboard, replay) {
            (true, true) => xproto::Allow::REPLAY_KEYBOARD,
            (true, false) => xproto::Allow::ASYNC_KEYBOARD,
            (false, true) => xproto::Allow::REPLAY_POINTER,
            (false, false) => xproto::Allow::ASYNC_POINTER,
        };

        drop(self.conn.allow_events(mode, x11rb::CURRENT_TIME));
    }

    #[inline]
    fn warp_pointer(
        &self,
        root: Window,
        pos: Pos,
    ) {
        drop(self.conn.warp_pointer(
            x11rb::NONE,
            root,
            0,
            0,
            0,
            0,
            pos.x as i16,
            pos.y as i16,
        ));
    }

    #[inline]
    fn pointer_position(
        &self,
        root: Window,
    ) -> Pos {
        self.conn
            .query_pointer(root)
            .map_or(Pos::default(), |cookie| {
                cookie.reply().map_or(Pos::default(), |reply| Pos {
                    x: reply.root_x as i32,
                    y: reply.root_y as i32,
                })
            })
    }

    #[inline]
    fn get_wm_hints(
        &self,
        window: Window,
    ) -> Option<Hints> {
        Hints::from_words(&self.property32(window, self.atoms.WM_HINTS)?)
    }

    #[inline]
    fn get_size_hints(
        &self,
        window: Window,
    ) -> Option<SizeHints> {
        SizeHints::from_words(&self.property32(window, self.atoms.WM_NORMAL_HINTS)?)
    }

    #[inline]
    fn get_motif_hints(
        &self,
        window: Window,
    ) -> Option<MotifHints> {
        MotifHints::from_words(&self.property32(window, self.atoms._MOTIF_WM_HINTS)?)
    }

    fn get_wm_name(
        &self,
        window: Window,
    ) -> String {
        self.property_bytes(window, self.atoms._NET_WM_NAME)
            .or_else(|| self.property_bytes(window, self.atoms.WM_NAME))
            .map_or_else(String::new, |name| {
                String::from_utf8_lossy(&name).into_owned()
            })
    }

    fn get_wm_class(
        &self,
        window: Window,
    ) -> (String, String) {
        self.property_bytes(window, self.atoms.WM_CLASS)
            .map_or((String::new(), String::new()), |class| {
                let mut parts = class
                    .split(|&byte| byte == 0)
                    .map(|part| String::from_utf8_lossy(part).into_owned());

                let instance = parts.next().unwrap_or_default();
                let class = parts.next().unwrap_or_default();

                (instance, class)
            })
    }

    #[inline]
    fn get_transient_for(
        &self,
        window: Window,
    ) -> Option<Window> {
        self.property32(window, self.atoms.WM_TRANSIENT_FOR)?
            .first()
            .copied()
            .filter(|&transient_for| transient_for != x11rb::NONE)
    }

    #[inline]
    fn set_wm_state(
        &self,
        window: Window,
        state: IcccmWindowState,
    ) {
        drop(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            window,
            self.atoms.WM_STATE,
            self.atoms.WM_STATE,
            &[state.to_word(), 0],
        ));
    }

    fn init_wm_properties(
        &self,
        root: Window,
        wm_name: &str,
    ) {
        let check_window = match self.screen_data(root) {
            Some(data) => data.check_window,
            None => return,
        };

        let wm_class = [wm_name, wm_name].join("\0");

        for &window in &[check_window, root] {
            drop(self.conn.change_property8(
                xproto::PropMode::REPLACE,
                window,
                self.atoms._NET_WM_NAME,
                self.atoms.UTF8_STRING,
                wm_name.as_bytes(),
            ));

            drop(self.conn.change_property8(
                xproto::PropMode::REPLACE,
                window,
                self.atoms.WM_CLASS,
                self.atoms.UTF8_STRING,
                wm_class.as_bytes(),
            ));

            drop(self.conn.change_property32(
                xproto::PropMode::REPLACE,
                window,
                self.atoms._NET_SUPPORTING_WM_CHECK,
                self.atoms.WINDOW,
                &[check_window],
            ));

            drop(self.conn.change_property32(
                xproto::PropMode::REPLACE,
                window,
                self.atoms._NET_WM_PID,
                self.atoms.CARDINAL,
                &[std::process::id() as u32],
            ));
        }

        drop(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            root,
            self.atoms._NET_SUPPORTED,
            self.atoms.ATOM,
            &[
                self.atoms._NET_SUPPORTED,
                self.atoms._NET_SUPPORTING_WM_CHECK,
                self.atoms._NET_CLIENT_LIST,
                self.atoms._NET_CLIENT_LIST_STACKING,
                self.atoms._NET_ACTIVE_WINDOW,
                self.atoms._NET_CLOSE_WINDOW,
                self.atoms._NET_CURRENT_DESKTOP,
                self.atoms._NET_NUMBER_OF_DESKTOPS,
                self.atoms._NET_DESKTOP_NAMES,
                self.atoms._NET_DESKTOP_VIEWPORT,
                self.atoms._NET_DESKTOP_GEOMETRY,
                self.atoms._NET_WORKAREA,
                self.atoms._NET_WM_NAME,
                self.atoms._NET_WM_DESKTOP,
                self.atoms._NET_WM_STATE,
                self.atoms._NET_WM_STATE_STICKY,
                self.atoms._NET_WM_STATE_MAXIMIZED_VERT,
                self.atoms._NET_WM_STATE_MAXIMIZED_HORZ,
                self.atoms._NET_WM_STATE_SHADED,
                self.atoms._NET_WM_STATE_HIDDEN,
                self.atoms._NET_WM_STATE_FULLSCREEN,
                self.atoms._NET_WM_STATE_ABOVE,
                self.atoms._NET_WM_STATE_BELOW,
                self.atoms._NET_WM_STRUT,
                self.atoms._NET_WM_STRUT_PARTIAL,
                self.atoms._NET_FRAME_EXTENTS,
                self.atoms._NET_VIRTUAL_POS,
            ],
        ));

        drop(self.conn.delete_property(root, self.atoms._NET_CLIENT_LIST));
    }

    #[inline]
    fn get_window_desktop(
        &self,
        window: Window,
    ) -> Option<u32> {
        self.property32(window, self.atoms._NET_WM_DESKTOP)?
            .first()
            .copied()
    }

    fn get_window_states(
        &self,
        window: Window,
    ) -> Vec<WindowState> {
        self.property32(window, self.atoms._NET_WM_STATE)
            .map_or(Vec::with_capacity(0), |states| {
                states
                    .iter()
                    .filter_map(|atom| self.state_map.get(atom).copied())
                    .collect()
            })
    }

    fn get_window_type(
        &self,
        window: Window,
    ) -> WindowType {
        self.property32(window, self.atoms._NET_WM_WINDOW_TYPE)
            .and_then(|types| {
                types
                    .iter()
                    .find_map(|atom| self.type_map.get(atom).copied())
            })
            .unwrap_or(WindowType::Normal)
    }

    fn get_window_struts(
        &self,
        window: Window,
    ) -> Vec<Strut> {
        self.property32(window, self.atoms._NET_WM_STRUT_PARTIAL)
            .or_else(|| self.property32(window, self.atoms._NET_WM_STRUT))
            .map_or(Vec::with_capacity(0), |words| struts_from_words(&words))
    }

    fn get_virtual_pos(
        &self,
        window: Window,
    ) -> Option<Pos> {
        let words = self.property32(window, self.atoms._NET_VIRTUAL_POS)?;

        if words.len() < 2 {
            return None;
        }

        Some(Pos::new(words[0] as i32, words[1] as i32))
    }

    #[inline]
    fn set_client_list(
        &self,
        root: Window,
        clients: &[Window],
    ) {
        drop(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            root,
            self.atoms._NET_CLIENT_LIST,
            self.atoms.WINDOW,
            clients,
        ));
    }

    #[inline]
    fn set_client_list_stacking(
        &self,
        root: Window,
        clients: &[Window],
    ) {
        drop(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            root,
            self.atoms._NET_CLIENT_LIST_STACKING,
            self.atoms.WINDOW,
            clients,
        ));
    }

    #[inline]
    fn set_active_window(
        &self,
        root: Window,
        window: Option<Window>,
    ) {
        drop(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            root,
            self.atoms._NET_ACTIVE_WINDOW,
            self.atoms.WINDOW,
            &[window.unwrap_or(x11rb::NONE)],
        ));
    }

    #[inline]
    fn set_current_desktop(
        &self,
        root: Window,
        index: u32,
    ) {
        drop(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            root,
            self.atoms._NET_CURRENT_DESKTOP,
            self.atoms.CARDINAL,
            &[index],
        ));
    }

    fn set_desktops(
        &self,
        root: Window,
        names: &[String],
    ) {
        drop(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            root,
            self.atoms._NET_NUMBER_OF_DESKTOPS,
            self.atoms.CARDINAL,
            &[names.len() as u32],
        ));

        let mut joined = names.join("\0");
        joined.push('\0');

        drop(self.conn.change_property8(
            xproto::PropMode::REPLACE,
            root,
            self.atoms._NET_DESKTOP_NAMES,
            self.atoms.UTF8_STRING,
            joined.as_bytes(),
        ));
    }

    #[inline]
    fn set_desktop_viewport(
        &self,
        root: Window,
        viewport: Pos,
    ) {
        drop(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            root,
            self.atoms._NET_DESKTOP_VIEWPORT,
            self.atoms.CARDINAL,
            &[viewport.x as u32, viewport.y as u32],
        ));
    }

    #[inline]
    fn set_desktop_geometry(
        &self,
        root: Window,
        dim: Dim,
    ) {
        drop(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            root,
            self.atoms._NET_DESKTOP_GEOMETRY,
            self.atoms.CARDINAL,
            &[dim.w as u32, dim.h as u32],
        ));
    }

    fn set_workarea(
        &self,
        root: Window,
        workareas: &[Region],
    ) {
        let words: Vec<u32> = workareas
            .iter()
            .flat_map(|region| {
                vec![
                    region.pos.x as u32,
                    region.pos.y as u32,
                    region.dim.w as u32,
                    region.dim.h as u32,
                ]
            })
            .collect();

        drop(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            root,
            self.atoms._NET_WORKAREA,
            self.atoms.CARDINAL,
            &words,
        ));
    }

    #[inline]
    fn set_window_desktop(
        &self,
        window: Window,
        desktop: u32,
    ) {
        drop(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            window,
            self.atoms._NET_WM_DESKTOP,
            self.atoms.CARDINAL,
            &[desktop],
        ));
    }

    fn set_window_states(
        &self,
        window: Window,
        states: &[WindowState],
    ) {
        let atoms: Vec<Atom> = states
            .iter()
            .filter_map(|state| {
                self.state_map
                    .iter()
                    .find(|(_, mapped)| *mapped == state)
                    .map(|(&atom, _)| atom)
            })
            .collect();

        drop(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            window,
            self.atoms._NET_WM_STATE,
            self.atoms.ATOM,
            &atoms,
        ));
    }

    #[inline]
    fn set_frame_extents(
        &self,
        window: Window,
        extents: Extents,
    ) {
        drop(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            window,
            self.atoms._NET_FRAME_EXTENTS,
            self.atoms.CARDINAL,
            &[
                extents.left as u32,
                extents.right as u32,
                extents.top as u32,
                extents.bottom as u32,
            ],
        ));
    }

    #[inline]
    fn set_virtual_pos(
        &self,
        window: Window,
        pos: Pos,
    ) {
        drop(self.conn.change_property32(
            xproto::PropMode::REPLACE,
            window,
            self.atoms._NET_VIRTUAL_POS,
            self.atoms.CARDINAL,
            &[pos.x as u32, pos.y as u32],
        ));
    }
}
