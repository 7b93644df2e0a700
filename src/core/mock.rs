use crate::actionfile::ActionTables;
use crate::config::ResourceDb;
use crate::config::ScreenConfig;
use crate::model::Session;
use crate::style::Style;
use crate::util::SpawnEnv;

use winsys::connection::Connection;
use winsys::connection::KeyMap;
use winsys::event::Event;
use winsys::geometry::Dim;
use winsys::geometry::Extents;
use winsys::geometry::Pos;
use winsys::geometry::Region;
use winsys::geometry::Strut;
use winsys::hints::Hints;
use winsys::hints::MotifHints;
use winsys::hints::SizeHints;
use winsys::input::KeyCode;
use winsys::input::ModMask;
use winsys::screen::Screen;
use winsys::window::IcccmWindowState;
use winsys::window::Pixmap;
use winsys::window::Window;
use winsys::window::WindowAttributes;
use winsys::window::WindowState;
use winsys::window::WindowType;
use winsys::Result;

use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::time::Duration;

use anyhow::anyhow;

pub const ROOT: Window = 1;
pub const SCREEN: Region = Region {
    pos: Pos {
        x: 0,
        y: 0,
    },
    dim: Dim {
        w: 1000,
        h: 768,
    },
};

const KEYS: [(&str, KeyCode); 12] = [
    ("Escape", 9),
    ("Tab", 23),
    ("Return", 36),
    ("Control_L", 37),
    ("Shift_L", 50),
    ("Alt_L", 64),
    ("F4", 70),
    ("Up", 111),
    ("Left", 113),
    ("Right", 114),
    ("Down", 116),
    ("Super_L", 133),
];

#[derive(Debug, Clone, Default)]
struct MockWindow {
    parent: Window,
    region: Region,
    placed: Option<Region>,
    foreign: bool,
    mapped: bool,
    destroyed: bool,
    name: String,
    class: String,
    hints: Option<Hints>,
    size_hints: Option<SizeHints>,
    transient_for: Option<Window>,
    desktop: Option<u32>,
    states: Vec<WindowState>,
    struts: Vec<Strut>,
    virtual_pos: Option<Pos>,
    text: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    next: Window,
    windows: HashMap<Window, MockWindow>,
    stacking: Vec<Window>,
    focus: Option<Window>,
    client_list: Vec<Window>,
    current_desktop: Option<u32>,
    viewport: Option<Pos>,
    pointer: Pos,
    pointer_grabbed: bool,
    keyboard_grabbed: bool,
    outline: Option<Region>,
    allowed: Option<(bool, bool)>,
    events: VecDeque<Event>,
    next_pixmap: Pixmap,
}

/// An in-memory display server with a single 1000x768 screen, recording
/// what the window manager asks of it.
pub struct MockConnection {
    state: RefCell<State>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(State {
                next: 0x100,
                next_pixmap: 0x8000,
                ..State::default()
            }),
        }
    }

    fn create(
        &self,
        parent: Window,
        region: Region,
        foreign: bool,
    ) -> Window {
        let mut state = self.state.borrow_mut();
        let window = state.next;
        state.next += 1;

        state.windows.insert(window, MockWindow {
            parent,
            region,
            foreign,
            ..MockWindow::default()
        });

        window
    }

    fn with<T>(
        &self,
        window: Window,
        f: impl FnOnce(&mut MockWindow) -> T,
    ) -> Option<T> {
        self.state.borrow_mut().windows.get_mut(&window).map(f)
    }

    fn read<T: Default>(
        &self,
        window: Window,
        f: impl FnOnce(&MockWindow) -> T,
    ) -> T {
        self.state
            .borrow()
            .windows
            .get(&window)
            .map(f)
            .unwrap_or_default()
    }

    /// An application window, created unmapped as if it were about to
    /// request mapping.
    pub fn client(
        &self,
        class: &str,
        region: Region,
    ) -> Window {
        let window = self.create(ROOT, region, true);

        self.with(window, |mock| {
            mock.name = class.to_lowercase();
            mock.class = class.to_owned();
        });

        window
    }

    /// A withdrawn window of `dim` asking to be docked.
    pub fn dockapp(
        &self,
        class: &str,
        dim: Dim,
    ) -> Window {
        let window = self.client(class, Region {
            pos: Pos::default(),
            dim,
        });

        self.with(window, |mock| {
            mock.hints = Some(Hints {
                urgent: false,
                input: Some(false),
                initial_state: Some(IcccmWindowState::Withdrawn),
                icon_window: None,
                group: None,
            });
        });

        window
    }

    pub fn push_event(
        &self,
        event: Event,
    ) {
        self.state.borrow_mut().events.push_back(event);
    }

    pub fn set_desktop(
        &self,
        window: Window,
        desktop: u32,
    ) {
        self.with(window, |mock| mock.desktop = Some(desktop));
    }

    pub fn set_struts(
        &self,
        window: Window,
        struts: Vec<Strut>,
    ) {
        self.with(window, |mock| mock.struts = struts);
    }

    pub fn set_size_hints(
        &self,
        window: Window,
        size_hints: SizeHints,
    ) {
        self.with(window, |mock| mock.size_hints = Some(size_hints));
    }

    pub fn set_transient_for(
        &self,
        window: Window,
        parent: Window,
    ) {
        self.with(window, |mock| mock.transient_for = Some(parent));
    }

    pub fn set_pointer(
        &self,
        pos: Pos,
    ) {
        self.state.borrow_mut().pointer = pos;
    }

    pub fn is_mapped(
        &self,
        window: Window,
    ) -> bool {
        self.read(window, |mock| mock.mapped)
    }

    pub fn is_destroyed(
        &self,
        window: Window,
    ) -> bool {
        self.read(window, |mock| mock.destroyed)
    }

    pub fn placed(
        &self,
        window: Window,
    ) -> Option<Region> {
        self.read(window, |mock| mock.placed)
    }

    pub fn states(
        &self,
        window: Window,
    ) -> Vec<WindowState> {
        self.read(window, |mock| mock.states.clone())
    }

    pub fn virtual_pos(
        &self,
        window: Window,
    ) -> Option<Pos> {
        self.read(window, |mock| mock.virtual_pos)
    }

    /// The last string drawn into `window`.
    pub fn text(
        &self,
        window: Window,
    ) -> Option<String> {
        self.read(window, |mock| mock.text.clone())
    }

    pub fn focus(&self) -> Option<Window> {
        self.state.borrow().focus
    }

    pub fn client_list(&self) -> Vec<Window> {
        self.state.borrow().client_list.clone()
    }

    /// The last stacking order requested, top first.
    pub fn stacking(&self) -> Vec<Window> {
        self.state.borrow().stacking.clone()
    }

    pub fn current_desktop(&self) -> Option<u32> {
        self.state.borrow().current_desktop
    }

    pub fn viewport(&self) -> Option<Pos> {
        self.state.borrow().viewport
    }

    pub fn pointer(&self) -> Pos {
        self.state.borrow().pointer
    }

    pub fn is_grabbed(&self) -> bool {
        let state = self.state.borrow();
        state.pointer_grabbed || state.keyboard_grabbed
    }

    pub fn outline(&self) -> Option<Region> {
        self.state.borrow().outline
    }

    /// The `(keyboard, replay)` pair of the last thawed grab.
    pub fn allowed(&self) -> Option<(bool, bool)> {
        self.state.borrow().allowed
    }
}

impl Connection for MockConnection {
    fn flush(&self) -> bool {
        true
    }

    fn wait_event(
        &self,
        _timeout: Option<Duration>,
    ) -> Result<Option<Event>> {
        match self.state.borrow_mut().events.pop_front() {
            Some(event) => Ok(Some(event)),
            None => Err(anyhow!("event queue exhausted")),
        }
    }

    fn poll_event(&self) -> Option<Event> {
        self.state.borrow_mut().events.pop_front()
    }

    fn screens(&self) -> Vec<Screen> {
        vec![Screen::new(0, ROOT, SCREEN)]
    }

    fn top_level_windows(
        &self,
        root: Window,
    ) -> Vec<Window> {
        let state = self.state.borrow();
        let mut windows: Vec<Window> = state
            .windows
            .iter()
            .filter(|(_, mock)| mock.foreign && mock.parent == root && !mock.destroyed)
            .map(|(&window, _)| window)
            .collect();

        windows.sort_unstable();
        windows
    }

    fn keymap(&self) -> KeyMap {
        KEYS.iter()
            .map(|&(name, code)| (name.to_owned(), code))
            .collect()
    }

    fn cleanup(
        &self,
        _root: Window,
    ) {
        let mut state = self.state.borrow_mut();
        state.focus = None;
        state.client_list.clear();
    }

    fn grab_server(&self) {}

    fn ungrab_server(&self) {}

    fn window_attributes(
        &self,
        window: Window,
    ) -> Option<WindowAttributes> {
        self.state
            .borrow()
            .windows
            .get(&window)
            .filter(|mock| !mock.destroyed)
            .map(|mock| WindowAttributes {
                override_redirect: false,
                mapped: mock.mapped,
                input_only: false,
            })
    }

    fn window_geometry(
        &self,
        window: Window,
    ) -> Result<Region> {
        self.state
            .borrow()
            .windows
            .get(&window)
            .filter(|mock| !mock.destroyed)
            .map(|mock| mock.region)
            .ok_or_else(|| anyhow!("no such window {:#0x}", window))
    }

    fn create_frame(
        &self,
        parent: Window,
        region: Region,
    ) -> Result<Window> {
        Ok(self.create(parent, region, false))
    }

    fn create_decoration(
        &self,
        parent: Window,
        region: Region,
    ) -> Result<Window> {
        Ok(self.create(parent, region, false))
    }

    fn create_input_window(
        &self,
        parent: Window,
        region: Region,
    ) -> Result<Window> {
        Ok(self.create(parent, region, false))
    }

    fn init_client(
        &self,
        _window: Window,
    ) {
    }

    fn release_client(
        &self,
        window: Window,
    ) {
        self.with(window, |mock| mock.parent = ROOT);
    }

    fn destroy_window(
        &self,
        window: Window,
    ) {
        let mut state = self.state.borrow_mut();

        if let Some(mock) = state.windows.get_mut(&window) {
            mock.destroyed = true;
            mock.mapped = false;
        }

        state.stacking.retain(|&stacked| stacked != window);
    }

    fn map_window(
        &self,
        window: Window,
    ) {
        self.with(window, |mock| mock.mapped = true);
    }

    fn unmap_window(
        &self,
        window: Window,
    ) {
        self.with(window, |mock| mock.mapped = false);
    }

    fn reparent_window(
        &self,
        window: Window,
        parent: Window,
        pos: Pos,
    ) {
        self.with(window, |mock| {
            mock.parent = parent;
            mock.region.pos = pos;
        });
    }

    fn place_window(
        &self,
        window: Window,
        region: &Region,
    ) {
        self.with(window, |mock| {
            mock.region = *region;
            mock.placed = Some(*region);
        });
    }

    fn move_window(
        &self,
        window: Window,
        pos: Pos,
    ) {
        self.with(window, |mock| {
            mock.region.pos = pos;
            mock.placed = Some(mock.region);
        });
    }

    fn restack(
        &self,
        windows: &[Window],
    ) {
        self.state.borrow_mut().stacking = windows.to_vec();
    }

    fn add_to_save_set(
        &self,
        _window: Window,
    ) {
    }

    fn set_input_focus(
        &self,
        window: Window,
    ) {
        self.state.borrow_mut().focus = Some(window);
    }

    fn focus_root(
        &self,
        root: Window,
    ) {
        self.state.borrow_mut().focus = Some(root);
    }

    fn close_window(
        &self,
        window: Window,
    ) -> bool {
        self.destroy_window(window);
        true
    }

    fn kill_window(
        &self,
        window: Window,
    ) {
        self.destroy_window(window);
    }

    fn send_configure_notify(
        &self,
        _window: Window,
        _region: Region,
    ) {
    }

    fn set_window_background(
        &self,
        _window: Window,
        _color: u32,
        _pixmap: Option<Pixmap>,
    ) {
    }

    fn render_pixmap(
        &self,
        _root: Window,
        _dim: Dim,
        _color: u32,
        _color_to: u32,
    ) -> Option<Pixmap> {
        let mut state = self.state.borrow_mut();
        state.next_pixmap += 1;
        Some(state.next_pixmap)
    }

    fn free_pixmap(
        &self,
        _pixmap: Pixmap,
    ) {
    }

    fn set_window_opacity(
        &self,
        _window: Window,
        _opacity: Option<u32>,
    ) {
    }

    fn load_font(
        &self,
        _name: &str,
    ) -> bool {
        true
    }

    fn text_width(
        &self,
        text: &str,
    ) -> i32 {
        6 * text.chars().count() as i32
    }

    fn draw_text(
        &self,
        window: Window,
        _pos: Pos,
        text: &str,
        _color: u32,
    ) {
        self.with(window, |mock| mock.text = Some(text.to_owned()));
    }

    fn draw_outline(
        &self,
        _root: Window,
        region: Option<Region>,
    ) {
        self.state.borrow_mut().outline = region;
    }

    fn grab_pointer(
        &self,
        _window: Window,
    ) -> bool {
        self.state.borrow_mut().pointer_grabbed = true;
        true
    }

    fn release_pointer(&self) {
        self.state.borrow_mut().pointer_grabbed = false;
    }

    fn grab_keyboard(
        &self,
        _window: Window,
    ) -> bool {
        self.state.borrow_mut().keyboard_grabbed = true;
        true
    }

    fn release_keyboard(&self) {
        self.state.borrow_mut().keyboard_grabbed = false;
    }

    fn grab_button(
        &self,
        _window: Window,
        _button: u32,
        _modifiers: ModMask,
    ) {
    }

    fn ungrab_buttons(
        &self,
        _window: Window,
    ) {
    }

    fn grab_key(
        &self,
        _root: Window,
        _code: KeyCode,
        _modifiers: ModMask,
    ) {
    }

    fn ungrab_keys(
        &self,
        _root: Window,
    ) {
    }

    fn allow_events(
        &self,
        keyboard: bool,
        replay: bool,
    ) {
        self.state.borrow_mut().allowed = Some((keyboard, replay));
    }

    fn warp_pointer(
        &self,
        _root: Window,
        pos: Pos,
    ) {
        self.state.borrow_mut().pointer = pos;
    }

    fn pointer_position(
        &self,
        _root: Window,
    ) -> Pos {
        self.state.borrow().pointer
    }

    fn get_wm_hints(
        &self,
        window: Window,
    ) -> Option<Hints> {
        self.read(window, |mock| mock.hints)
    }

    fn get_size_hints(
        &self,
        window: Window,
    ) -> Option<SizeHints> {
        self.read(window, |mock| mock.size_hints)
    }

    fn get_motif_hints(
        &self,
        _window: Window,
    ) -> Option<MotifHints> {
        None
    }

    fn get_wm_name(
        &self,
        window: Window,
    ) -> String {
        self.read(window, |mock| mock.class.clone())
    }

    fn get_wm_class(
        &self,
        window: Window,
    ) -> (String, String) {
        self.read(window, |mock| (mock.name.clone(), mock.class.clone()))
    }

    fn get_transient_for(
        &self,
        window: Window,
    ) -> Option<Window> {
        self.read(window, |mock| mock.transient_for)
    }

    fn set_wm_state(
        &self,
        _window: Window,
        _state: IcccmWindowState,
    ) {
    }

    fn init_wm_properties(
        &self,
        _root: Window,
        _wm_name: &str,
    ) {
    }

    fn get_window_desktop(
        &self,
        window: Window,
    ) -> Option<u32> {
        self.read(window, |mock| mock.desktop)
    }

    fn get_window_states(
        &self,
        window: Window,
    ) -> Vec<WindowState> {
        self.states(window)
    }

    fn get_window_type(
        &self,
        _window: Window,
    ) -> WindowType {
        WindowType::Normal
    }

    fn get_window_struts(
        &self,
        window: Window,
    ) -> Vec<Strut> {
        self.read(window, |mock| mock.struts.clone())
    }

    fn get_virtual_pos(
        &self,
        window: Window,
    ) -> Option<Pos> {
        self.virtual_pos(window)
    }

    fn set_client_list(
        &self,
        _root: Window,
        clients: &[Window],
    ) {
        self.state.borrow_mut().client_list = clients.to_vec();
    }

    fn set_client_list_stacking(
        &self,
        _root: Window,
        _clients: &[Window],
    ) {
    }

    fn set_active_window(
        &self,
        _root: Window,
        _window: Option<Window>,
    ) {
    }

    fn set_current_desktop(
        &self,
        _root: Window,
        index: u32,
    ) {
        self.state.borrow_mut().current_desktop = Some(index);
    }

    fn set_desktops(
        &self,
        _root: Window,
        _names: &[String],
    ) {
    }

    fn set_desktop_viewport(
        &self,
        _root: Window,
        viewport: Pos,
    ) {
        self.state.borrow_mut().viewport = Some(viewport);
    }

    fn set_desktop_geometry(
        &self,
        _root: Window,
        _dim: Dim,
    ) {
    }

    fn set_workarea(
        &self,
        _root: Window,
        _workareas: &[Region],
    ) {
    }

    fn set_window_desktop(
        &self,
        window: Window,
        desktop: u32,
    ) {
        self.set_desktop(window, desktop);
    }

    fn set_window_states(
        &self,
        window: Window,
        states: &[WindowState],
    ) {
        self.with(window, |mock| mock.states = states.to_vec());
    }

    fn set_frame_extents(
        &self,
        _window: Window,
        _extents: Extents,
    ) {
    }

    fn set_virtual_pos(
        &self,
        window: Window,
        pos: Pos,
    ) {
        self.with(window, |mock| mock.virtual_pos = Some(pos));
    }
}

/// A session on the mock screen with default configuration and style, no
/// menus and the given action file text.
pub fn session<'a>(
    conn: &'a MockConnection,
    actions: &str,
) -> Session<'a> {
    let keys = conn.keymap();
    let config = ScreenConfig::from_db(&ResourceDb::default(), 0);
    let tables = ActionTables::parse("actions", actions, &keys, SCREEN.dim);

    let mut session = Session::new(
        conn,
        0,
        Screen::new(0, ROOT, SCREEN),
        config,
        Style::default(),
        tables,
        Vec::new(),
        SpawnEnv::new(":0", 0, None),
        keys,
    )
    .expect("mock windows are always created");

    session.init();
    session
}
