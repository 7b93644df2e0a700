use super::justify;
use super::GestureKind;
use super::GestureTarget;
use super::Session;

use crate::action::Action;
use crate::action::MenuAction;
use crate::action::TargetKind;
use crate::change::Direction;
use crate::dynamic::MenuCommand;
use crate::menu::Call;
use crate::menu::ItemFace;
use crate::menu::ItemKind;
use crate::menu::Menu;
use crate::menu::MenuDef;
use crate::menu::MenuItem;
use crate::menu::SubmenuRef;
use crate::placement::center_on;
use crate::placement::place_menu;
use crate::placement::place_submenu;
use crate::stack::MenuId;
use crate::stack::Stacked;
use crate::style::Color;
use crate::style::Texture;
use crate::util::Util;

use winsys::geometry::Dim;
use winsys::geometry::Distance;
use winsys::geometry::Pos;
use winsys::geometry::Region;
use winsys::input::InputEvent;
use winsys::window::Window;

/// The name the generated task list is shown under.
pub const TASK_MENU: &str = "Tasks";

const TEXT_PADDING: i32 = 8;

/// One row's worth of drawing work.
struct RowPaint {
    window: Window,
    dim: Dim,
    texture: Texture,
    color: Color,
    text: String,
}

impl<'a> Session<'a> {
    /// Creates the windows of a menu built from `def`. The menu is not
    /// shown yet.
    pub(super) fn build_menu(
        &mut self,
        def: MenuDef,
        target: Option<Window>,
    ) -> Option<MenuId> {
        let root = self.screen.root();
        let frame = match self.conn.create_frame(root, Region::new(0, 0, 1, 1)) {
            Ok(frame) => frame,
            Err(err) => {
                warn!("unable to create menu \"{}\": {}", def.name, err);
                return None;
            },
        };

        let id = self.next_menu;
        self.next_menu += 1;

        let conn = self.conn;
        let decoration_width = 2 * self.style.menu_border_width
            + conn.text_width(&self.style.bullet)
            + conn.text_width(&self.style.checkbox_true)
            + 2 * TEXT_PADDING;

        let mut menu = Menu::new(id, def, frame);
        menu.target = target;
        menu.build(
            self.style.menu_title_height,
            self.style.menu_item_height,
            decoration_width,
            &|text| conn.text_width(text),
        );

        for index in 0..menu.items.len() {
            match conn.create_decoration(frame, menu.row(index)) {
                Ok(row) => {
                    self.menu_windows.insert(row, id);
                    menu.rows.push(row);
                },
                Err(err) => {
                    warn!("unable to create row {} of menu \"{}\": {}", index, menu.name, err);
                    conn.destroy_window(frame);

                    for row in menu.rows.drain(..) {
                        self.menu_windows.remove(&row);
                    }

                    return None;
                },
            }
        }

        debug!("built menu \"{}\" with {} items", menu.name, menu.items.len());

        self.menu_windows.insert(frame, id);
        self.menus.insert(id, menu);

        Some(id)
    }

    /// Maps menu `id` at `pos`, kept inside the workarea. Submenus ignore
    /// `pos` and open beside the item that spawned them.
    pub(super) fn show_menu(
        &mut self,
        id: MenuId,
        pos: Pos,
    ) {
        let (dim, parent) = match self.menus.get(&id) {
            Some(menu) => (menu.dim(), menu.parent),
            None => return,
        };

        let placed = match parent.and_then(|(parent, item)| {
            self.menus.get(&parent).map(|menu| (menu.region(), menu.row(item), menu.pos))
        }) {
            Some((parent_region, row, origin)) => place_submenu(
                parent_region,
                row.translated(Distance::new(origin.x, origin.y)),
                dim,
                self.workarea,
            ),
            None => place_menu(pos, dim, self.workarea),
        };

        let menu = match self.menus.get_mut(&id) {
            Some(menu) => menu,
            None => return,
        };

        menu.pos = placed;
        menu.mapped = true;

        self.conn.place_window(menu.frame, &menu.region());

        for (index, &row) in menu.rows.iter().enumerate() {
            self.conn.place_window(row, &menu.row(index));
            self.conn.map_window(row);
        }

        self.conn.map_window(menu.frame);
        self.stack
            .insert(Stacked::Menu(id), self.config.menu_stacking);

        self.draw_menu(id);
        self.restack();
    }

    /// The mapped menu going by `name`.
    fn mapped_menu(
        &self,
        name: &str,
    ) -> Option<MenuId> {
        self.menus
            .values()
            .find(|menu| menu.mapped && menu.name == name)
            .map(|menu| menu.id)
    }

    pub(super) fn menu_map(
        &mut self,
        name: &str,
        pos: Pos,
        focused: bool,
        remap: bool,
        target: Option<Window>,
    ) {
        let id = match self.mapped_menu(name) {
            Some(id) if remap => {
                if let Some(menu) = self.menus.get_mut(&id) {
                    menu.target = target;
                }

                id
            },
            Some(_) => return,
            None => {
                let def = match self.menu_defs.get(name) {
                    Some(def) => def.clone(),
                    None => {
                        warn!("no menu named \"{}\"", name);
                        return;
                    },
                };

                match self.build_menu(def, target) {
                    Some(id) => id,
                    None => return,
                }
            },
        };

        self.show_menu(id, pos);

        if focused {
            let first = self.menus.get(&id).and_then(Menu::first_selectable);
            self.focus_menu(id, first);
        }
    }

    pub(super) fn menu_unmap(
        &mut self,
        name: &str,
        focused: bool,
    ) {
        let id = match self.mapped_menu(name) {
            Some(id) => id,
            None => return,
        };

        let parent = self.menus.get(&id).and_then(|menu| menu.parent);
        self.unmap_menu(id);

        if focused {
            if let Some((parent, item)) = parent {
                self.focus_menu(parent, Some(item));
            }
        }
    }

    /// Unmaps menu `id` together with the submenus it opened, and destroys
    /// its windows.
    pub(super) fn unmap_menu(
        &mut self,
        id: MenuId,
    ) {
        let child = match self.menus.get(&id) {
            Some(menu) => menu.child,
            None => return,
        };

        if let Some(child) = child {
            self.unmap_menu(child);
        }

        let menu = match self.menus.remove(&id) {
            Some(menu) => menu,
            None => return,
        };

        debug!("unmapping menu \"{}\"", menu.name);

        if let Some((parent, item)) = menu.parent {
            if let Some(parent_menu) = self.menus.get_mut(&parent) {
                parent_menu.child = None;

                if parent_menu.hilite == Some(item) {
                    parent_menu.hilite = None;
                }
            }

            self.draw_menu(parent);
        }

        for &row in &menu.rows {
            self.menu_windows.remove(&row);
            self.release_held(row);
        }

        self.menu_windows.remove(&menu.frame);
        self.release_held(menu.frame);
        self.stack.remove(Stacked::Menu(id));
        self.conn.destroy_window(menu.frame);

        if self.menu_focus == Some(id) {
            self.menu_focus = None;

            match menu.parent {
                Some((parent, _)) if self.menus.contains_key(&parent) => {
                    self.focus_menu(parent, None)
                },
                _ => self.restore_input_focus(),
            }
        }

        let moving = self
            .gesture
            .as_ref()
            .map_or(false, |gesture| gesture.target == GestureTarget::Menu(id));

        if moving {
            self.end_gesture();
        }

        self.restack();
    }

    /// Unmaps the whole tree of menus `id` belongs to.
    pub(super) fn unmap_tree(
        &mut self,
        id: MenuId,
    ) {
        let mut root = id;

        while let Some((parent, _)) = self.menus.get(&root).and_then(|menu| menu.parent) {
            root = parent;
        }

        self.unmap_menu(root);
    }

    /// Hands the keyboard to menu `id`, optionally hiliting `item`.
    pub(super) fn focus_menu(
        &mut self,
        id: MenuId,
        item: Option<usize>,
    ) {
        let frame = match self.menus.get_mut(&id) {
            Some(menu) => {
                if item.is_some() {
                    menu.hilite = item;
                }

                menu.frame
            },
            None => return,
        };

        for menu in self.menus.values_mut() {
            menu.focused = menu.id == id;
        }

        self.menu_focus = Some(id);
        self.conn.set_input_focus(frame);
        self.draw_menu(id);
    }

    /// Gives the keyboard back to the focused client once no menu holds it.
    fn restore_input_focus(&mut self) {
        match self.focus {
            Some(window) if self.clients.get(&window).map_or(false, |c| c.accepts_input()) => {
                self.conn.set_input_focus(window)
            },
            Some(_) => {},
            None => self.conn.focus_root(self.screen.root()),
        }
    }

    pub(super) fn hilite(
        &mut self,
        id: MenuId,
        item: usize,
    ) {
        let changed = match self.menus.get_mut(&id) {
            Some(menu) if item < menu.items.len() && menu.hilite != Some(item) => {
                menu.hilite = Some(item);
                true
            },
            _ => false,
        };

        if changed {
            self.draw_menu(id);
        }
    }

    /// Whether the checkbox flag of `item` holds for the menu's target.
    fn checked(
        &self,
        menu: &Menu,
        item: &MenuItem,
    ) -> bool {
        match (item.flag, menu.target.and_then(|target| self.client(target))) {
            (Some(flag), Some(client)) => client.flag_value(flag),
            _ => false,
        }
    }

    pub(super) fn draw_menu(
        &mut self,
        id: MenuId,
    ) {
        let menu = match self.menus.get(&id) {
            Some(menu) if menu.mapped => menu,
            _ => return,
        };

        let frame = (menu.frame, menu.dim());
        let rows: Vec<RowPaint> = menu
            .items
            .iter()
            .zip(menu.rows.iter())
            .enumerate()
            .map(|(index, (item, &window))| {
                let checked = self.checked(menu, item);
                let face = item.face(checked);

                let (texture, color) = if item.kind == ItemKind::Title {
                    (self.style.menu_title, self.style.menu_title_text_color)
                } else if menu.hilite == Some(index) {
                    (self.style.menu_hilite, self.style.menu_hilite_text_color)
                } else {
                    (self.style.menu_frame, self.style.menu_text_color)
                };

                let text = match item.kind {
                    ItemKind::Sub => format!("{} {}", face.label, self.style.bullet),
                    ItemKind::Checkbox if checked => {
                        format!("{} {}", self.style.checkbox_true, face.label)
                    },
                    ItemKind::Checkbox => format!("{} {}", self.style.checkbox_false, face.label),
                    _ => face.label.clone(),
                };

                RowPaint {
                    window,
                    dim: menu.row(index).dim,
                    texture,
                    color,
                    text,
                }
            })
            .collect();

        let frame_texture = self.style.menu_frame;
        self.paint(frame.0, frame.1, &frame_texture);

        for row in rows {
            self.paint(row.window, row.dim, &row.texture);

            let width = self.conn.text_width(&row.text);
            let pos = Pos::new(
                justify(self.style.menu_justify, row.dim.w, width),
                row.dim.h * 3 / 4,
            );

            self.conn.draw_text(row.window, pos, &row.text, row.color);
        }
    }

    pub(super) fn menu_action(
        &mut self,
        id: MenuId,
        item: usize,
        action: MenuAction,
        param: Option<&str>,
        event: Option<&InputEvent>,
    ) {
        if !self.menus.contains_key(&id) {
            return;
        }

        debug!("menu action {:?} on item {} of menu {}", action, item, id);

        match action {
            MenuAction::Unlink => {
                let parent = self.menus.get_mut(&id).and_then(|menu| menu.parent.take());

                if let Some((parent, _)) = parent {
                    if let Some(parent_menu) = self.menus.get_mut(&parent) {
                        parent_menu.child = None;
                    }

                    self.draw_menu(parent);
                }
            },
            MenuAction::MapSub => self.open_submenu(id, item, false, false),
            MenuAction::RemapSub => self.open_submenu(id, item, false, true),
            MenuAction::MapSubFocused => self.open_submenu(id, item, true, false),
            MenuAction::RemapSubFocused => self.open_submenu(id, item, true, true),
            MenuAction::UnmapSub => {
                if let Some(child) = self.menus.get(&id).and_then(|menu| menu.child) {
                    self.unmap_menu(child);
                }
            },
            MenuAction::Unmap => self.unmap_menu(id),
            MenuAction::UnmapFocused => {
                let parent = self.menus.get(&id).and_then(|menu| menu.parent);
                self.unmap_menu(id);

                if let Some((parent, item)) = parent {
                    self.focus_menu(parent, Some(item));
                }
            },
            MenuAction::UnmapTree => self.unmap_tree(id),
            MenuAction::Exec => {
                let exec = self.item_face(id, item).and_then(|face| face.exec);

                match exec {
                    Some(exec) => Util::spawn_shell(&exec, &self.env),
                    None => debug!("menu item {} of menu {} has nothing to run", item, id),
                }
            },
            MenuAction::Func => {
                let (call, target, window) = match self.menus.get(&id) {
                    Some(menu) => match (
                        self.item_face(id, item).and_then(|face| face.call),
                        menu.items.get(item),
                    ) {
                        (Some(call), Some(entry)) => (call, menu.target, entry.window),
                        _ => return,
                    },
                    None => return,
                };

                self.run_call(&call, target, window, event);
                self.draw_menu(id);
            },
            MenuAction::Raise => {
                self.stack.raise(Stacked::Menu(id));
                self.restack();
            },
            MenuAction::Lower => {
                self.stack.lower(Stacked::Menu(id));
                self.restack();
            },
            MenuAction::Focus => self.focus_menu(id, Some(item)),
            MenuAction::Move | MenuAction::MoveOpaque => {
                let origin = event
                    .map(|event| event.root_pos)
                    .unwrap_or_else(|| self.conn.pointer_position(self.screen.root()));

                self.start_gesture(
                    GestureKind::MenuMove {
                        opaque: action == MenuAction::MoveOpaque,
                    },
                    GestureTarget::Menu(id),
                    origin,
                    event
                        .filter(|event| event.kind.is_button())
                        .map(|event| event.detail),
                );
            },
            MenuAction::NextItem | MenuAction::PreviousItem => {
                let dir = if action == MenuAction::NextItem {
                    Direction::Forward
                } else {
                    Direction::Backward
                };

                if let Some(next) = self.menus.get(&id).and_then(|menu| menu.step(dir)) {
                    self.hilite(id, next);
                }
            },
        }

        if let Some(param) = param {
            trace!("menu action {:?} ignores parameter \"{}\"", action, param);
        }
    }

    /// The face item `item` of menu `id` currently shows.
    fn item_face(
        &self,
        id: MenuId,
        item: usize,
    ) -> Option<ItemFace> {
        let menu = self.menus.get(&id)?;
        let entry = menu.items.get(item)?;

        Some(entry.face(self.checked(menu, entry)).clone())
    }

    fn open_submenu(
        &mut self,
        id: MenuId,
        item: usize,
        focused: bool,
        remap: bool,
    ) {
        let (reference, target, child) = match self.menus.get(&id) {
            Some(menu) => match self.item_face(id, item).and_then(|face| face.submenu) {
                Some(reference) => (reference, menu.target, menu.child),
                None => return,
            },
            None => return,
        };

        if let Some(child) = child {
            let same = self
                .menus
                .get(&child)
                .map_or(false, |menu| menu.parent == Some((id, item)));

            if same && !remap {
                return;
            }

            self.unmap_menu(child);
        }

        let (def, dynamic) = match &reference {
            SubmenuRef::Named(name) | SubmenuRef::LateBound(name) => {
                match self.menu_defs.get(name) {
                    Some(def) => (def.clone(), false),
                    None => {
                        warn!("no menu named \"{}\"", name);
                        return;
                    },
                }
            },
            SubmenuRef::Dynamic(command) => match MenuCommand::default().run(command, &self.env) {
                Ok(parsed) => {
                    let mut defs = parsed.report();

                    let def = match defs.pop() {
                        Some(def) => def,
                        None => {
                            warn!("menu command \"{}\" produced no menu", command);
                            return;
                        },
                    };

                    for nested in defs {
                        self.menu_defs.insert(nested.name.clone(), nested);
                    }

                    (def, true)
                },
                Err(err) => {
                    warn!("unable to run menu command \"{}\": {}", command, err);
                    return;
                },
            },
        };

        let child = match self.build_menu(def, target) {
            Some(child) => child,
            None => return,
        };

        if let Some(menu) = self.menus.get_mut(&child) {
            menu.parent = Some((id, item));
            menu.dynamic = dynamic;
        }

        if let Some(menu) = self.menus.get_mut(&id) {
            menu.child = Some(child);
            menu.hilite = Some(item);
        }

        self.show_menu(child, Pos::default());
        self.draw_menu(id);

        if focused {
            let first = self.menus.get(&child).and_then(Menu::first_selectable);
            self.focus_menu(child, first);
        }
    }

    /// Runs a `function(param)` call on the window it concerns, or on the
    /// screen when there is none.
    pub(super) fn run_call(
        &mut self,
        call: &Call,
        target: Option<Window>,
        item_window: Option<Window>,
        event: Option<&InputEvent>,
    ) {
        let subject = item_window
            .or(target)
            .filter(|&window| self.clients.contains_key(&window));

        let kind = if subject.is_some() {
            TargetKind::Window
        } else {
            TargetKind::Root
        };

        let action = match Action::resolve(&call.name, kind) {
            Some(action) => action,
            None => {
                warn!("unable to run \"{}\" without a window", call.name);
                return;
            },
        };

        let param = call.param.as_deref().map(|param| {
            if action.substitutes_dim() {
                Util::substitute_dim(param, self.screen.full_region().dim)
            } else {
                param.to_owned()
            }
        });

        match (action, subject) {
            (Action::Window(action), Some(window)) => {
                if item_window.is_some() {
                    self.activate(window);
                }

                self.window_action(window, action, param.as_deref(), event);
            },
            (Action::Root(action), _) => self.root_action(action, param.as_deref(), event),
            _ => {},
        }
    }

    /// Builds the task list: every managed window, most recently focused
    /// first.
    pub(super) fn task_menu(&self) -> MenuDef {
        let mut items = vec![MenuItem::new(ItemKind::Title, ItemFace {
            label: TASK_MENU.to_owned(),
            ..Default::default()
        })];

        for &window in self.recency.iter() {
            let ident = match self.clients.get(&window) {
                Some(client) => client.ident(),
                None => continue,
            };

            let label = if ident.title.is_empty() {
                ident.class
            } else {
                ident.title
            };

            let mut item = MenuItem::new(ItemKind::Item, ItemFace {
                label,
                call: Some(Call {
                    name: "raisefocus".to_owned(),
                    param: None,
                }),
                ..Default::default()
            });

            item.window = Some(window);
            items.push(item);
        }

        MenuDef {
            name: TASK_MENU.to_owned(),
            items,
        }
    }

    /// Opens a fresh task list at `pos`, or centered on it, replacing one
    /// already shown.
    pub(super) fn open_task_menu(
        &mut self,
        pos: Pos,
        centered: bool,
    ) -> Option<MenuId> {
        if let Some(id) = self.mapped_menu(TASK_MENU) {
            self.unmap_menu(id);
        }

        let def = self.task_menu();
        let id = self.build_menu(def, None)?;

        let pos = match self.menus.get(&id) {
            Some(menu) if centered => center_on(pos, menu.dim(), self.workarea),
            _ => pos,
        };

        self.show_menu(id, pos);

        Some(id)
    }
}
