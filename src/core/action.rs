use std::fmt;
use std::str::FromStr;

use strum::EnumIter;
use strum::EnumString;
use strum::IntoStaticStr;

/// The kind of object an action operates on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Window,
    Root,
    Menu,
}

/// Operations on a managed window.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum WindowAction {
    Raise,
    Lower,
    Focus,
    RaiseFocus,
    Close,
    Kill,
    Move,
    MoveOpaque,
    ResizeRight,
    ResizeLeft,
    ResizeRightOpaque,
    ResizeLeftOpaque,
    Shade,
    Unshade,
    ToggleShade,
    Maximize,
    Unmaximize,
    ToggleMaximize,
    Sticky,
    Unsticky,
    ToggleSticky,
    Minimize,
    Unminimize,
    ToggleMinimize,
    FullscreenOn,
    FullscreenOff,
    FullscreenToggle,
    DecorTitleOn,
    DecorTitleOff,
    DecorTitleToggle,
    DecorHandleOn,
    DecorHandleOff,
    DecorHandleToggle,
    DecorBorderOn,
    DecorBorderOff,
    DecorBorderToggle,
    DecorAllOn,
    DecorAllOff,
    DecorAllToggle,
    AlwaysOnTopOn,
    AlwaysOnTopOff,
    AlwaysOnTopToggle,
    AlwaysAtBottomOn,
    AlwaysAtBottomOff,
    AlwaysAtBottomToggle,
    MoveResize,
    MoveResizeVirtual,
    MoveToPointer,
    MoveToSmartPlace,
    DesktopMask,
    JoinDesktop,
    PartDesktop,
    PartCurrentDesktop,
    JoinAllDesktops,
    PartAllDesktopsExceptCurrent,
    PartCurrentJoinDesktop,
    CloneMergeWithWindow,
    VertMergeWithWindow,
    HorizMergeWithWindow,
    Explode,
    MergedToFront,
    Unmerge,
    SetMergeMode,
    NextMergeMode,
    PrevMergeMode,
    MenuMap,
    MenuRemap,
    MenuMapFocused,
    MenuRemapFocused,
    MenuUnmap,
    MenuUnmapFocused,
}

/// Screen level operations; these are reachable from every target.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RootAction {
    Focus,
    MenuMap,
    MenuRemap,
    MenuMapFocused,
    MenuRemapFocused,
    MenuUnmap,
    MenuUnmapFocused,
    GotoDesktop,
    NextDesktop,
    PreviousDesktop,
    ViewportLeft,
    ViewportRight,
    ViewportUp,
    ViewportDown,
    ViewportRelativeMove,
    ViewportFixedMove,
    StartViewportMove,
    EndMoveResize,
    PointerRelativeWarp,
    PointerFixedWarp,
    TaskSwitcher,
    NextTask,
    PreviousTask,
    Restart,
    Exit,
    Nop,
}

/// Operations on a menu, relative to the item that received the event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MenuAction {
    Unlink,
    MapSub,
    RemapSub,
    MapSubFocused,
    RemapSubFocused,
    UnmapSub,
    Unmap,
    UnmapFocused,
    UnmapTree,
    Exec,
    Func,
    Raise,
    Lower,
    Focus,
    Move,
    MoveOpaque,
    NextItem,
    PreviousItem,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    Window(WindowAction),
    Root(RootAction),
    Menu(MenuAction),
    Exec,
}

impl Action {
    /// Resolves an action name for a target; target specific actions take
    /// precedence over screen level ones.
    pub fn resolve(
        name: &str,
        kind: TargetKind,
    ) -> Option<Self> {
        let specific = match kind {
            TargetKind::Window => WindowAction::from_str(name).ok().map(Action::Window),
            TargetKind::Menu => MenuAction::from_str(name).ok().map(Action::Menu),
            TargetKind::Root => None,
        };

        specific.or_else(|| RootAction::from_str(name).ok().map(Action::Root))
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Action::Window(action) => action.into(),
            Action::Root(action) => action.into(),
            Action::Menu(action) => action.into(),
            Action::Exec => "exec",
        }
    }

    pub fn requires_param(&self) -> bool {
        match self {
            Action::Window(action) => matches!(
                action,
                WindowAction::MoveResize
                    | WindowAction::MoveResizeVirtual
                    | WindowAction::DesktopMask
                    | WindowAction::JoinDesktop
                    | WindowAction::PartDesktop
                    | WindowAction::PartCurrentJoinDesktop
                    | WindowAction::SetMergeMode
                    | WindowAction::MenuMap
                    | WindowAction::MenuRemap
                    | WindowAction::MenuMapFocused
                    | WindowAction::MenuRemapFocused
                    | WindowAction::MenuUnmap
                    | WindowAction::MenuUnmapFocused
            ),
            Action::Root(action) => matches!(
                action,
                RootAction::MenuMap
                    | RootAction::MenuRemap
                    | RootAction::MenuMapFocused
                    | RootAction::MenuRemapFocused
                    | RootAction::MenuUnmap
                    | RootAction::MenuUnmapFocused
                    | RootAction::GotoDesktop
                    | RootAction::ViewportRelativeMove
                    | RootAction::ViewportFixedMove
                    | RootAction::PointerRelativeWarp
                    | RootAction::PointerFixedWarp
            ),
            Action::Menu(_) => false,
            Action::Exec => true,
        }
    }

    /// Whether `W` and `H` in the parameter stand for the screen size.
    #[inline]
    pub fn substitutes_dim(&self) -> bool {
        let name = self.name();
        name.starts_with("viewport") || name.starts_with("moveresize")
    }

    /// Whether this action hands control to an interactive gesture.
    pub fn starts_gesture(&self) -> bool {
        matches!(
            self,
            Action::Window(WindowAction::Move)
                | Action::Window(WindowAction::MoveOpaque)
                | Action::Window(WindowAction::ResizeRight)
                | Action::Window(WindowAction::ResizeLeft)
                | Action::Window(WindowAction::ResizeRightOpaque)
                | Action::Window(WindowAction::ResizeLeftOpaque)
                | Action::Root(RootAction::StartViewportMove)
                | Action::Root(RootAction::TaskSwitcher)
                | Action::Menu(MenuAction::Move)
                | Action::Menu(MenuAction::MoveOpaque)
        )
    }
}

impl fmt::Display for Action {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}
