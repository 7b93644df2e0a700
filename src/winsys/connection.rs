use crate::event::Event;
use crate::geometry::Dim;
use crate::geometry::Extents;
use crate::geometry::Pos;
use crate::geometry::Region;
use crate::geometry::Strut;
use crate::hints::Hints;
use crate::hints::MotifHints;
use crate::hints::SizeHints;
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

use std::collections::HashMap;
use std::time::Duration;

pub type KeyMap = HashMap<String, KeyCode>;

pub trait Connection {
    fn flush(&self) -> bool;
    /// Blocks until an event arrives or `timeout` elapses.
    fn wait_event(
        &self,
        timeout: Option<Duration>,
    ) -> Result<Option<Event>>;
    fn poll_event(&self) -> Option<Event>;
    fn screens(&self) -> Vec<Screen>;
    fn top_level_windows(
        &self,
        root: Window,
    ) -> Vec<Window>;
    fn keymap(&self) -> KeyMap;
    fn cleanup(
        &self,
        root: Window,
    );

    fn grab_server(&self);
    fn ungrab_server(&self);

    // Window manipulation
    fn window_attributes(
        &self,
        window: Window,
    ) -> Option<WindowAttributes>;
    fn window_geometry(
        &self,
        window: Window,
    ) -> Result<Region>;
    fn create_frame(
        &self,
        parent: Window,
        region: Region,
    ) -> Result<Window>;
    fn create_decoration(
        &self,
        parent: Window,
        region: Region,
    ) -> Result<Window>;
    fn create_input_window(
        &self,
        parent: Window,
        region: Region,
    ) -> Result<Window>;
    fn init_client(
        &self,
        window: Window,
    );
    fn release_client(
        &self,
        window: Window,
    );
    fn destroy_window(
        &self,
        window: Window,
    );
    fn map_window(
        &self,
        window: Window,
    );
    fn unmap_window(
        &self,
        window: Window,
    );
    fn reparent_window(
        &self,
        window: Window,
        parent: Window,
        pos: Pos,
    );
    fn place_window(
        &self,
        window: Window,
        region: &Region,
    );
    fn move_window(
        &self,
        window: Window,
        pos: Pos,
    );
    /// Restacks siblings so that `windows` appear top to bottom in order.
    fn restack(
        &self,
        windows: &[Window],
    );
    fn add_to_save_set(
        &self,
        window: Window,
    );
    fn set_input_focus(
        &self,
        window: Window,
    );
    fn focus_root(
        &self,
        root: Window,
    );
    /// Requests a graceful close when the client supports
    /// `WM_DELETE_WINDOW`, otherwise terminates the client.
    fn close_window(
        &self,
        window: Window,
    ) -> bool;
    fn kill_window(
        &self,
        window: Window,
    );
    fn send_configure_notify(
        &self,
        window: Window,
        region: Region,
    );

    // Drawing
    fn set_window_background(
        &self,
        window: Window,
        color: u32,
        pixmap: Option<Pixmap>,
    );
    fn render_pixmap(
        &self,
        root: Window,
        dim: Dim,
        color: u32,
        color_to: u32,
    ) -> Option<Pixmap>;
    fn free_pixmap(
        &self,
        pixmap: Pixmap,
    );
    fn set_window_opacity(
        &self,
        window: Window,
        opacity: Option<u32>,
    );
    /// Loads the label font, falling back to the server's default fixed
    /// font; returns false when the fallback was used.
    fn load_font(
        &self,
        name: &str,
    ) -> bool;
    fn text_width(
        &self,
        text: &str,
    ) -> i32;
    fn draw_text(
        &self,
        window: Window,
        pos: Pos,
        text: &str,
        color: u32,
    );
    fn draw_outline(
        &self,
        root: Window,
        region: Option<Region>,
    );

    // Input
    fn grab_pointer(
        &self,
        window: Window,
    ) -> bool;
    fn release_pointer(&self);
    fn grab_keyboard(
        &self,
        window: Window,
    ) -> bool;
    fn release_keyboard(&self);
    fn grab_button(
        &self,
        window: Window,
        button: u32,
        modifiers: ModMask,
    );
    fn ungrab_buttons(
        &self,
        window: Window,
    );
    fn grab_key(
        &self,
        root: Window,
        code: KeyCode,
        modifiers: ModMask,
    );
    fn ungrab_keys(
        &self,
        root: Window,
    );
    /// Thaws the synchronous grab that delivered the last key or button
    /// event, replaying it to the client when `replay` is set.
    fn allow_events(
        &self,
        keyboard: bool,
        replay: bool,
    );
    fn warp_pointer(
        &self,
        root: Window,
        pos: Pos,
    );
    fn pointer_position(
        &self,
        root: Window,
    ) -> Pos;

    // ICCCM
    fn get_wm_hints(
        &self,
        window: Window,
    ) -> Option<Hints>;
    fn get_size_hints(
        &self,
        window: Window,
    ) -> Option<SizeHints>;
    fn get_motif_hints(
        &self,
        window: Window,
    ) -> Option<MotifHints>;
    fn get_wm_name(
        &self,
        window: Window,
    ) -> String;
    /// The (instance, class) pair of `WM_CLASS`.
    fn get_wm_class(
        &self,
        window: Window,
    ) -> (String, String);
    fn get_transient_for(
        &self,
        window: Window,
    ) -> Option<Window>;
    fn set_wm_state(
        &self,
        window: Window,
        state: IcccmWindowState,
    );

    // EWMH
    fn init_wm_properties(
        &self,
        root: Window,
        wm_name: &str,
    );
    fn get_window_desktop(
        &self,
        window: Window,
    ) -> Option<u32>;
    fn get_window_states(
        &self,
        window: Window,
    ) -> Vec<WindowState>;
    fn get_window_type(
        &self,
        window: Window,
    ) -> WindowType;
    fn get_window_struts(
        &self,
        window: Window,
    ) -> Vec<Strut>;
    fn get_virtual_pos(
        &self,
        window: Window,
    ) -> Option<Pos>;
    fn set_client_list(
        &self,
        root: Window,
        clients: &[Window],
    );
    fn set_client_list_stacking(
        &self,
        root: Window,
        clients: &[Window],
    );
    fn set_active_window(
        &self,
        root: Window,
        window: Option<Window>,
    );
    fn set_current_desktop(
        &self,
        root: Window,
        index: u32,
    );
    fn set_desktops(
        &self,
        root: Window,
        names: &[String],
    );
    fn set_desktop_viewport(
        &self,
        root: Window,
        viewport: Pos,
    );
    fn set_desktop_geometry(
        &self,
        root: Window,
        dim: Dim,
    );
    fn set_workarea(
        &self,
        root: Window,
        workareas: &[Region],
    );
    fn set_window_desktop(
        &self,
        window: Window,
        desktop: u32,
    );
    fn set_window_states(
        &self,
        window: Window,
        states: &[WindowState],
    );
    fn set_frame_extents(
        &self,
        window: Window,
        extents: Extents,
    );
    fn set_virtual_pos(
        &self,
        window: Window,
        pos: Pos,
    );
}

/// Holds the server grab for as long as it lives, so bulk mutations release
/// the grab on every exit path.
pub struct ServerGrab<'a> {
    conn: &'a dyn Connection,
}

impl<'a> ServerGrab<'a> {
    pub fn new(conn: &'a dyn Connection) -> Self {
        conn.grab_server();
        Self {
            conn,
        }
    }
}

impl<'a> Drop for ServerGrab<'a> {
    fn drop(&mut self) {
        self.conn.ungrab_server();
    }
}
