#[macro_export]
macro_rules! WM_NAME (
    () => { "lanthorn" };
);

/// Looked up in `$HOME` when no rc file is given on the command line.
pub const RC_FILE: &str = "~/.lanthornrc";

/// Bindings used for a screen whose rc file names no action file.
pub const ACTIONS: &str = "\
DEF MOVING {
    endmoveresize: ButtonRelease&MoveResize,
    endmoveresize: Escape=KeyPress&MoveResize
}

root {
    menumap(root): Button3=ButtonPress,
    menuunmap(root): Button1=ButtonPress,
    taskswitcher: Tab=KeyPress&Mod1,
    nextdesktop: Right=KeyPress&Mod4,
    previousdesktop: Left=KeyPress&Mod4,
    viewportright: Right=KeyPress&Mod4&Control,
    viewportleft: Left=KeyPress&Mod4&Control,
    startviewportmove: Button2=ButtonPress&!MoveResize,
    MOVING
}

westedge { viewportleft: EnterNotify:400:LeaveNotify }
eastedge { viewportright: EnterNotify:400:LeaveNotify }

menu.title {
    move: Button1=ButtonPress&!MoveResize,
    unlink: Button2=ButtonPress,
    unmaptree: Button3=ButtonPress,
    MOVING
}

menu.item {
    func: Button1=ButtonRelease&!MoveResize,
    func: Return=KeyPress,
    nextitem: Down=KeyPress,
    previousitem: Up=KeyPress,
    unmaptree: Escape=KeyPress
}

menu.sub {
    mapsub: EnterNotify,
    mapsubfocused: Return=KeyPress,
    nextitem: Down=KeyPress,
    previousitem: Up=KeyPress,
    unmaptree: Escape=KeyPress
}

menu.checkbox {
    func: Button1=ButtonRelease&!MoveResize,
    func: Return=KeyPress,
    nextitem: Down=KeyPress,
    previousitem: Up=KeyPress
}

window.title {
    raise: Button1=ButtonPress,
    move: Button1=ButtonPress&!MoveResize,
    toggleshade: Button1=DoubleClick,
    lower: Button2=ButtonPress,
    menumap(window): Button3=ButtonPress,
    MOVING
}

window.label {
    raise: Button1=ButtonPress,
    move: Button1=ButtonPress&!MoveResize,
    toggleshade: Button1=DoubleClick,
    MOVING
}

window.handle {
    raise: Button1=ButtonPress,
    move: Button1=ButtonPress&!MoveResize,
    MOVING
}

window.leftgrip {
    raise: Button1=ButtonPress,
    resizeleft: Button1=ButtonPress&!MoveResize,
    MOVING
}

window.rightgrip {
    raise: Button1=ButtonPress,
    resizeright: Button1=ButtonPress&!MoveResize,
    MOVING
}

window.frame {
    close: F4=KeyPress&Mod1,
    toggleminimize: Down=KeyPress&Mod1
}

window.passiveclient {
    raisefocus: *Button1=ButtonPress,
    move: Button1=ButtonPress&Mod1&!MoveResize,
    MOVING
}
";

/// Menus used for a screen whose rc file names no menu file.
pub const MENU: &str = r#"
[start](root)
    [title](Lanthorn)
    [item](Terminal){xterm}
    [sub](Desktops)<desktops>
    [submenu](desktops)
        [item](One)"gotodesktop(0)"
        [item](Two)"gotodesktop(1)"
        [item](Three)"gotodesktop(2)"
        [item](Four)"gotodesktop(3)"
    [end]
    [restart](Restart)
    [exit](Exit)
[end]

[start](window)
    [checkbox=shaded] @TRUE(Unshade)"unshade" @FALSE(Shade)"shade"
    [checkbox=sticky] @TRUE(Unstick)"unsticky" @FALSE(Stick)"sticky"
    [item](Minimize)"minimize"
    [item](Maximize)"togglemaximize"
    [item](Close)"close"
[end]
"#;

#[cfg(test)]
mod tests {
    use super::*;

    use crate::actionfile::parse_sections;
    use crate::menufile::parse_menu_text;

    use winsys::geometry::Dim;

    use std::collections::HashMap;

    #[test]
    fn builtin_files_parse_cleanly() {
        let keys: HashMap<String, u8> = map!(
            "Tab".to_owned() => 23,
            "Escape".to_owned() => 9,
            "Return".to_owned() => 36,
            "F4".to_owned() => 70,
            "Up".to_owned() => 111,
            "Left".to_owned() => 113,
            "Right".to_owned() => 114,
            "Down".to_owned() => 116,
        );

        let actions = parse_sections("actions", ACTIONS, &keys, Dim::new(1024, 768));
        assert!(actions.diagnostics.is_empty());

        let menus = parse_menu_text("menu", MENU);
        assert!(menus.diagnostics.is_empty());

        let names: Vec<&str> = menus.items.iter().map(|def| def.name.as_str()).collect();
        assert_eq!(names, vec!["desktops", "root", "window"]);
    }
}
