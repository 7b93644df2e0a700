use crate::decoration::Decor;
use crate::decoration::Part;
use crate::desktop::desktop_bit;
use crate::desktop::DesktopMask;
use crate::matcher::WindowIdent;
use crate::stack::Layer;

use winsys::geometry::Distance;
use winsys::geometry::Region;
use winsys::hints::Hints;
use winsys::hints::SizeHints;
use winsys::window::Window;
use winsys::window::WindowState;
use winsys::window::WindowType;

use std::cell::Cell;
use std::cell::RefCell;

use bitflags::bitflags;
use strum::EnumString;
use strum::IntoStaticStr;

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct ClientFlags: u32 {
        const SHADED = 1 << 0;
        const MAXED_H = 1 << 1;
        const MAXED_V = 1 << 2;
        const STICKY = 1 << 3;
        const MINIMIZED = 1 << 4;
        const FULLSCREEN = 1 << 5;
        const ALWAYS_ON_TOP = 1 << 6;
        const ALWAYS_AT_BOTTOM = 1 << 7;
        const HIDDEN = 1 << 8;
        const WANT_FOCUS = 1 << 9;
        const MAPPED = 1 << 10;
        const DELETED = 1 << 11;
    }
}

impl ClientFlags {
    pub const MAXED: ClientFlags = ClientFlags::MAXED_H.union(ClientFlags::MAXED_V);
}

/// A window flag as named by checkbox menu items.
#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FlagKind {
    Shaded,
    Maximized,
    Sticky,
    Minimized,
    Fullscreen,
    AlwaysOnTop,
    AlwaysAtBottom,
    DecorTitle,
    DecorHandle,
    DecorBorder,
    DecorAll,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MergeMode {
    Clone,
    Vertical,
    Horizontal,
}

impl MergeMode {
    pub fn next(self) -> Self {
        match self {
            MergeMode::Clone => MergeMode::Vertical,
            MergeMode::Vertical => MergeMode::Horizontal,
            MergeMode::Horizontal => MergeMode::Clone,
        }
    }

    pub fn prev(self) -> Self {
        self.next().next()
    }
}

/// Which asserted state a remembered geometry belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MemoryKind {
    Max,
    Fullscreen,
}

/// Geometry (and, for fullscreen, stacking and decorations) saved when a
/// state is asserted, restored when it is cleared.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Memory {
    pub kind: MemoryKind,
    pub region: Region,
    pub layer: Layer,
    pub decor: Decor,
}

/// What clearing a state amounts to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Restore {
    /// The state was outermost: go back to the saved geometry.
    Region(Memory),
    /// Another state sits on top: the saved geometry was handed to it.
    Deferred(Memory),
    NotAsserted,
}

pub struct Client {
    window: Window,
    own_frame: Window,
    host_frame: Cell<Option<Window>>,
    screen: usize,
    ident: RefCell<WindowIdent>,
    window_type: WindowType,
    region: Cell<Region>,
    decor: Cell<Decor>,
    flags: Cell<ClientFlags>,
    layer: Cell<Layer>,
    desktops: Cell<DesktopMask>,
    size_hints: Cell<SizeHints>,
    hints: Cell<Option<Hints>>,
    transient_for: Option<Window>,
    memories: RefCell<Vec<Memory>>,
    parts: RefCell<Vec<(Part, Window)>>,
    master: Cell<Option<Window>>,
    merge_mode: Cell<MergeMode>,
    peers: RefCell<Vec<Window>>,
    front: Cell<Option<Window>>,
    focused: Cell<bool>,
    expected_unmap_count: Cell<u8>,
}

impl Client {
    pub fn new(
        window: Window,
        frame: Window,
        screen: usize,
        ident: WindowIdent,
        window_type: WindowType,
        transient_for: Option<Window>,
    ) -> Self {
        Self {
            window,
            own_frame: frame,
            host_frame: Cell::new(None),
            screen,
            ident: RefCell::new(ident),
            window_type,
            region: Cell::new(Default::default()),
            decor: Cell::new(Decor::ALL),
            flags: Cell::new(ClientFlags::empty()),
            layer: Cell::new(Layer::Normal),
            desktops: Cell::new(desktop_bit(0)),
            size_hints: Cell::new(Default::default()),
            hints: Cell::new(None),
            transient_for,
            memories: RefCell::new(Vec::new()),
            parts: RefCell::new(Vec::new()),
            master: Cell::new(None),
            merge_mode: Cell::new(MergeMode::Clone),
            peers: RefCell::new(Vec::new()),
            front: Cell::new(None),
            focused: Cell::new(false),
            expected_unmap_count: Cell::new(0),
        }
    }

    #[inline]
    pub fn window(&self) -> Window {
        self.window
    }

    /// The frame this client owns, whether or not it is currently shown in
    /// it.
    #[inline]
    pub fn own_frame(&self) -> Window {
        self.own_frame
    }

    /// The frame the client is currently reparented into.
    #[inline]
    pub fn frame(&self) -> Window {
        self.host_frame.get().unwrap_or(self.own_frame)
    }

    #[inline]
    pub fn screen(&self) -> usize {
        self.screen
    }

    #[inline]
    pub fn ident(&self) -> WindowIdent {
        self.ident.borrow().clone()
    }

    #[inline]
    pub fn set_title(
        &self,
        title: impl Into<String>,
    ) {
        self.ident.borrow_mut().title = title.into();
    }

    #[inline]
    pub fn set_class(
        &self,
        name: impl Into<String>,
        class: impl Into<String>,
    ) {
        let mut ident = self.ident.borrow_mut();
        ident.name = name.into();
        ident.class = class.into();
    }

    #[inline]
    pub fn window_type(&self) -> WindowType {
        self.window_type
    }

    #[inline]
    pub fn transient_for(&self) -> Option<Window> {
        self.transient_for
    }

    #[inline]
    pub fn region(&self) -> Region {
        self.region.get()
    }

    #[inline]
    pub fn set_region(
        &self,
        region: Region,
    ) {
        self.region.set(region);
    }

    #[inline]
    pub fn translate(
        &self,
        delta: Distance,
    ) {
        self.region.set(self.region.get().translated(delta));
    }

    #[inline]
    pub fn decor(&self) -> Decor {
        self.decor.get()
    }

    #[inline]
    pub fn set_decor(
        &self,
        decor: Decor,
    ) {
        self.decor.set(decor);
    }

    /// The decorations currently drawn; fullscreen windows have none.
    #[inline]
    pub fn effective_decor(&self) -> Decor {
        if self.is(ClientFlags::FULLSCREEN) {
            Decor::empty()
        } else {
            self.decor.get()
        }
    }

    #[inline]
    pub fn flags(&self) -> ClientFlags {
        self.flags.get()
    }

    #[inline]
    pub fn is(
        &self,
        flag: ClientFlags,
    ) -> bool {
        self.flags.get().contains(flag)
    }

    #[inline]
    pub fn set_flag(
        &self,
        flag: ClientFlags,
        value: bool,
    ) {
        let mut flags = self.flags.get();
        flags.set(flag, value);
        self.flags.set(flags);
    }

    #[inline]
    pub fn layer(&self) -> Layer {
        self.layer.get()
    }

    #[inline]
    pub fn set_layer(
        &self,
        layer: Layer,
    ) {
        self.layer.set(layer);
    }

    /// The group the window is stacked in, derived from its flags.
    pub fn requested_layer(&self) -> Layer {
        if self.is(ClientFlags::FULLSCREEN) || self.is(ClientFlags::ALWAYS_ON_TOP) {
            Layer::AlwaysOnTop
        } else if self.is(ClientFlags::ALWAYS_AT_BOTTOM) {
            Layer::AlwaysAtBottom
        } else {
            Layer::Normal
        }
    }

    #[inline]
    pub fn desktops(&self) -> DesktopMask {
        self.desktops.get()
    }

    #[inline]
    pub fn set_desktops(
        &self,
        mask: DesktopMask,
    ) {
        self.desktops.set(mask);
    }

    #[inline]
    pub fn on_desktop(
        &self,
        desktop: usize,
    ) -> bool {
        self.desktops.get() & desktop_bit(desktop) != 0
    }

    /// Whether the window belongs on screen: on the current desktop, not
    /// minimized, and not hidden behind a merge.
    #[inline]
    pub fn should_map(
        &self,
        desktop: usize,
    ) -> bool {
        self.on_desktop(desktop)
            && !self.is(ClientFlags::MINIMIZED)
            && !self.is(ClientFlags::HIDDEN)
    }

    #[inline]
    pub fn size_hints(&self) -> SizeHints {
        self.size_hints.get()
    }

    #[inline]
    pub fn set_size_hints(
        &self,
        size_hints: SizeHints,
    ) {
        self.size_hints.set(size_hints);
    }

    #[inline]
    pub fn hints(&self) -> Option<Hints> {
        self.hints.get()
    }

    #[inline]
    pub fn set_hints(
        &self,
        hints: Option<Hints>,
    ) {
        self.hints.set(hints);
    }

    /// Clients that set the input hint to false never take focus
    /// themselves.
    #[inline]
    pub fn accepts_input(&self) -> bool {
        self.hints
            .get()
            .and_then(|hints| hints.input)
            .unwrap_or(true)
    }

    #[inline]
    pub fn is_focused(&self) -> bool {
        self.focused.get()
    }

    #[inline]
    pub fn set_focused(
        &self,
        focused: bool,
    ) {
        self.focused.set(focused);
    }

    pub fn set_parts(
        &self,
        parts: Vec<(Part, Window)>,
    ) {
        self.parts.replace(parts);
    }

    pub fn parts(&self) -> Vec<(Part, Window)> {
        self.parts.borrow().clone()
    }

    pub fn part_of(
        &self,
        window: Window,
    ) -> Option<Part> {
        self.parts
            .borrow()
            .iter()
            .find(|&&(_, part_window)| part_window == window)
            .map(|&(part, _)| part)
    }

    #[inline]
    pub fn expect_unmap(&self) {
        self.expected_unmap_count
            .set(self.expected_unmap_count.get() + 1);
    }

    /// Consumes one expected unmap; returns whether the unmap was one the
    /// window manager caused itself.
    #[inline]
    pub fn consume_unmap_if_expecting(&self) -> bool {
        let expected = self.expected_unmap_count.get();

        if expected > 0 {
            self.expected_unmap_count.set(expected - 1);
            true
        } else {
            false
        }
    }

    pub fn net_states(&self) -> Vec<WindowState> {
        let flags = self.flags.get();

        [
            (ClientFlags::STICKY, WindowState::Sticky),
            (ClientFlags::MAXED_V, WindowState::MaximizedVert),
            (ClientFlags::MAXED_H, WindowState::MaximizedHorz),
            (ClientFlags::SHADED, WindowState::Shaded),
            (ClientFlags::MINIMIZED, WindowState::Hidden),
            (ClientFlags::FULLSCREEN, WindowState::Fullscreen),
            (ClientFlags::ALWAYS_ON_TOP, WindowState::Above),
            (ClientFlags::ALWAYS_AT_BOTTOM, WindowState::Below),
        ]
        .iter()
        .filter(|&&(flag, _)| flags.contains(flag))
        .map(|&(_, state)| state)
        .collect()
    }

    pub fn flag_value(
        &self,
        kind: FlagKind,
    ) -> bool {
        match kind {
            FlagKind::Shaded => self.is(ClientFlags::SHADED),
            FlagKind::Maximized => self.flags.get().intersects(ClientFlags::MAXED),
            FlagKind::Sticky => self.is(ClientFlags::STICKY),
            FlagKind::Minimized => self.is(ClientFlags::MINIMIZED),
            FlagKind::Fullscreen => self.is(ClientFlags::FULLSCREEN),
            FlagKind::AlwaysOnTop => self.is(ClientFlags::ALWAYS_ON_TOP),
            FlagKind::AlwaysAtBottom => self.is(ClientFlags::ALWAYS_AT_BOTTOM),
            FlagKind::DecorTitle => self.decor.get().contains(Decor::TITLE),
            FlagKind::DecorHandle => self.decor.get().contains(Decor::HANDLE),
            FlagKind::DecorBorder => self.decor.get().contains(Decor::BORDER),
            FlagKind::DecorAll => self.decor.get() == Decor::ALL,
        }
    }

    pub fn memory(
        &self,
        kind: MemoryKind,
    ) -> Option<Memory> {
        self.memories
            .borrow()
            .iter()
            .find(|memory| memory.kind == kind)
            .copied()
    }

    /// Saves the current geometry for `kind` as the outermost memory.
    pub fn remember(
        &self,
        kind: MemoryKind,
    ) {
        let memory = Memory {
            kind,
            region: self.region.get(),
            layer: self.layer.get(),
            decor: self.decor.get(),
        };

        let mut memories = self.memories.borrow_mut();
        memories.retain(|memory| memory.kind != kind);
        memories.push(memory);
    }

    /// Drops the memory for `kind`. When a later state was asserted on top
    /// of it, the saved geometry is handed to that state instead of being
    /// restored now.
    pub fn forget(
        &self,
        kind: MemoryKind,
    ) -> Restore {
        let mut memories = self.memories.borrow_mut();

        let index = match memories.iter().position(|memory| memory.kind == kind) {
            Some(index) => index,
            None => return Restore::NotAsserted,
        };

        let memory = memories.remove(index);

        match memories.get_mut(index) {
            Some(outer) => {
                outer.region = memory.region;
                Restore::Deferred(memory)
            },
            None => Restore::Region(memory),
        }
    }

    #[inline]
    pub fn master(&self) -> Option<Window> {
        self.master.get()
    }

    #[inline]
    pub fn merge_mode(&self) -> MergeMode {
        self.merge_mode.get()
    }

    #[inline]
    pub fn set_merge_mode(
        &self,
        mode: MergeMode,
    ) {
        self.merge_mode.set(mode);
    }

    #[inline]
    pub fn peers(&self) -> Vec<Window> {
        self.peers.borrow().clone()
    }

    #[inline]
    pub fn has_peers(&self) -> bool {
        !self.peers.borrow().is_empty()
    }

    /// Marks this client as shown inside `master`'s frame.
    pub fn join_group(
        &self,
        master: Window,
        host_frame: Window,
        mode: MergeMode,
    ) {
        self.master.set(Some(master));
        self.host_frame.set(Some(host_frame));
        self.merge_mode.set(mode);
    }

    pub fn leave_group(&self) {
        self.master.set(None);
        self.host_frame.set(None);
    }

    pub fn add_peer(
        &self,
        peer: Window,
    ) {
        let mut peers = self.peers.borrow_mut();

        if !peers.contains(&peer) {
            peers.push(peer);
        }
    }

    pub fn remove_peer(
        &self,
        peer: Window,
    ) -> bool {
        let mut peers = self.peers.borrow_mut();
        let len = peers.len();
        peers.retain(|&present| present != peer);

        if self.front.get() == Some(peer) {
            self.front.set(None);
        }

        peers.len() != len
    }

    pub fn take_peers(&self) -> Vec<Window> {
        self.front.set(None);
        self.peers.replace(Vec::new())
    }

    /// The group member currently visible in a clone slot.
    #[inline]
    pub fn front(&self) -> Window {
        self.front.get().unwrap_or(self.window)
    }

    #[inline]
    pub fn set_front(
        &self,
        front: Window,
    ) {
        self.front.set(Some(front));
    }
}

impl std::fmt::Debug for Client {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("window", &self.window)
            .field("frame", &self.frame())
            .field("ident", &self.ident.borrow())
            .field("region", &self.region.get())
            .field("flags", &self.flags.get())
            .field("desktops", &format_args!("{:#b}", self.desktops.get()))
            .field("master", &self.master.get())
            .finish()
    }
}

/// Splits a merge group's client area. Vertical peers each add a row below
/// the master, horizontal peers each add a column beside it, and clone
/// peers share the master's cell.
pub fn merge_layout(
    area: Region,
    master: Window,
    peers: &[(Window, MergeMode)],
) -> Vec<(Window, Region)> {
    let rows: Vec<Window> = peers
        .iter()
        .filter(|&&(_, mode)| mode == MergeMode::Vertical)
        .map(|&(window, _)| window)
        .collect();

    let columns: Vec<Window> = peers
        .iter()
        .filter(|&&(_, mode)| mode == MergeMode::Horizontal)
        .map(|&(window, _)| window)
        .collect();

    let row_height = std::cmp::max(area.dim.h / (rows.len() as i32 + 1), 1);
    let first_row_height = area.dim.h - row_height * rows.len() as i32;
    let column_width = std::cmp::max(area.dim.w / (columns.len() as i32 + 1), 1);
    let first_column_width = area.dim.w - column_width * columns.len() as i32;

    let cell = Region::new(area.pos.x, area.pos.y, first_column_width, first_row_height);
    let mut layout = Vec::with_capacity(peers.len() + 1);

    layout.push((master, cell));

    for &(window, mode) in peers {
        if mode == MergeMode::Clone {
            layout.push((window, cell));
        }
    }

    for (i, window) in columns.into_iter().enumerate() {
        layout.push((
            window,
            Region::new(
                area.pos.x + first_column_width + i as i32 * column_width,
                area.pos.y,
                column_width,
                first_row_height,
            ),
        ));
    }

    for (i, window) in rows.into_iter().enumerate() {
        layout.push((
            window,
            Region::new(
                area.pos.x,
                area.pos.y + first_row_height + i as i32 * row_height,
                area.dim.w,
                row_height,
            ),
        ));
    }

    layout
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Client {
        let client = Client::new(
            1,
            2,
            0,
            WindowIdent::new("xterm", "XTerm", "shell"),
            WindowType::Normal,
            None,
        );

        client.set_region(Region::new(10, 20, 300, 200));
        client
    }

    #[test]
    fn outermost_memory_restores() {
        let client = client();

        client.remember(MemoryKind::Max);
        client.set_region(Region::new(0, 0, 1000, 700));

        match client.forget(MemoryKind::Max) {
            Restore::Region(memory) => assert_eq!(memory.region, Region::new(10, 20, 300, 200)),
            other => panic!("unexpected {:?}", other),
        }

        assert_eq!(client.forget(MemoryKind::Max), Restore::NotAsserted);
    }

    #[test]
    fn inner_memory_is_handed_outwards() {
        let client = client();

        client.remember(MemoryKind::Max);
        client.set_region(Region::new(0, 0, 1000, 700));
        client.remember(MemoryKind::Fullscreen);
        client.set_region(Region::new(0, 0, 1024, 768));

        assert!(matches!(client.forget(MemoryKind::Max), Restore::Deferred(_)));

        match client.forget(MemoryKind::Fullscreen) {
            Restore::Region(memory) => assert_eq!(memory.region, Region::new(10, 20, 300, 200)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn frames_follow_merging() {
        let client = client();
        assert_eq!(client.frame(), client.own_frame());

        client.join_group(7, 8, MergeMode::Vertical);
        assert_eq!(client.frame(), 8);
        assert_eq!(client.master(), Some(7));

        client.leave_group();
        assert_eq!(client.frame(), 2);
        assert_eq!(client.master(), None);
    }

    #[test]
    fn peer_bookkeeping() {
        let master = client();

        master.add_peer(3);
        master.add_peer(3);
        master.add_peer(4);
        master.set_front(4);

        assert_eq!(master.peers(), vec![3, 4]);
        assert_eq!(master.front(), 4);
        assert!(master.remove_peer(4));
        assert_eq!(master.front(), 1);
        assert_eq!(master.take_peers(), vec![3]);
        assert!(!master.has_peers());
    }

    #[test]
    fn merge_layouts() {
        let area = Region::new(0, 0, 400, 300);

        let layout = merge_layout(area, 1, &[(2, MergeMode::Clone)]);
        assert_eq!(layout, vec![(1, area), (2, area)]);

        let layout = merge_layout(area, 1, &[(2, MergeMode::Vertical), (3, MergeMode::Horizontal)]);
        assert_eq!(layout, vec![
            (1, Region::new(0, 0, 200, 150)),
            (3, Region::new(200, 0, 200, 150)),
            (2, Region::new(0, 150, 400, 150)),
        ]);
    }

    #[test]
    fn states_and_flags() {
        let client = client();

        client.set_flag(ClientFlags::STICKY | ClientFlags::MAXED_H, true);
        assert_eq!(client.net_states(), vec![
            WindowState::Sticky,
            WindowState::MaximizedHorz
        ]);
        assert!(client.flag_value(FlagKind::Maximized));
        assert_eq!("alwaysontop".parse::<FlagKind>().unwrap(), FlagKind::AlwaysOnTop);

        client.set_desktops(0b1010);
        assert!(!client.should_map(2));
        assert!(client.should_map(3));
    }
}
