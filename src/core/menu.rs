use crate::actionfile::Context;
use crate::change::Direction;
use crate::client::FlagKind;
use crate::stack::MenuId;

use winsys::geometry::Dim;
use winsys::geometry::Pos;
use winsys::geometry::Region;
use winsys::window::Window;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ItemKind {
    Title,
    Item,
    Sub,
    Checkbox,
}

impl ItemKind {
    #[inline]
    pub fn context(self) -> Context {
        match self {
            ItemKind::Title => Context::MenuTitle,
            ItemKind::Item => Context::MenuItem,
            ItemKind::Sub => Context::MenuSub,
            ItemKind::Checkbox => Context::MenuCheckbox,
        }
    }
}

/// How an item refers to the menu it opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmenuRef {
    Named(String),
    /// Looked up when opened rather than when the menu is built.
    LateBound(String),
    /// Rebuilt from the standard output of a command every time it opens.
    Dynamic(String),
}

impl SubmenuRef {
    pub fn parse(reference: &str) -> Self {
        let reference = reference.trim();

        if let Some(command) = reference.strip_prefix('!') {
            SubmenuRef::Dynamic(command.trim().to_owned())
        } else if let Some(name) = reference.strip_suffix('!') {
            SubmenuRef::LateBound(name.trim().to_owned())
        } else {
            SubmenuRef::Named(reference.to_owned())
        }
    }

    /// The menu this reference must resolve to when menus are built.
    #[inline]
    pub fn bound_name(&self) -> Option<&str> {
        match self {
            SubmenuRef::Named(name) => Some(name),
            _ => None,
        }
    }
}

/// A `function(param)` call stored in a menu item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub name: String,
    pub param: Option<String>,
}

impl Call {
    pub fn parse(call: &str) -> Self {
        let call = call.trim();

        match call.split_once('(') {
            Some((name, rest)) => {
                let param = rest.strip_suffix(')').unwrap_or(rest).trim();

                Self {
                    name: name.trim().to_owned(),
                    param: if param.is_empty() {
                        None
                    } else {
                        Some(param.to_owned())
                    },
                }
            },
            None => Self {
                name: call.to_owned(),
                param: None,
            },
        }
    }
}

/// What an item shows and does in one checkbox state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFace {
    pub label: String,
    pub exec: Option<String>,
    pub submenu: Option<SubmenuRef>,
    pub call: Option<Call>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub kind: ItemKind,
    pub face: ItemFace,
    /// The face shown when a checkbox flag is false.
    pub alt: Option<ItemFace>,
    pub flag: Option<FlagKind>,
    /// The window a generated item stands for, e.g. in the task menu.
    pub window: Option<Window>,
}

impl MenuItem {
    pub fn new(
        kind: ItemKind,
        face: ItemFace,
    ) -> Self {
        Self {
            kind,
            face,
            alt: None,
            flag: None,
            window: None,
        }
    }

    /// The face for the current value of the checkbox flag.
    #[inline]
    pub fn face(
        &self,
        checked: bool,
    ) -> &ItemFace {
        match (&self.alt, checked) {
            (Some(alt), false) => alt,
            _ => &self.face,
        }
    }

    #[inline]
    pub fn selectable(&self) -> bool {
        self.kind != ItemKind::Title
    }

    /// Names of the menus either face opens that must already exist.
    pub fn bound_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(&self.face)
            .chain(self.alt.as_ref())
            .filter_map(|face| face.submenu.as_ref())
            .filter_map(SubmenuRef::bound_name)
    }
}

/// A parsed menu definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuDef {
    pub name: String,
    pub items: Vec<MenuItem>,
}

/// A menu instance: a definition laid out on screen with its windows and
/// its place in the tree of menus opened from one another.
#[derive(Debug)]
pub struct Menu {
    pub id: MenuId,
    pub name: String,
    pub items: Vec<MenuItem>,
    pub frame: Window,
    pub rows: Vec<Window>,
    pub pos: Pos,
    pub width: i32,
    pub title_height: i32,
    pub item_height: i32,
    pub mapped: bool,
    pub hilite: Option<usize>,
    pub focused: bool,
    /// The menu and item this one was opened from.
    pub parent: Option<(MenuId, usize)>,
    pub child: Option<MenuId>,
    /// The window window-level functions apply to.
    pub target: Option<Window>,
    pub dynamic: bool,
}

impl Menu {
    pub fn new(
        id: MenuId,
        def: MenuDef,
        frame: Window,
    ) -> Self {
        Self {
            id,
            name: def.name,
            items: def.items,
            frame,
            rows: Vec::new(),
            pos: Pos::default(),
            width: 1,
            title_height: 1,
            item_height: 1,
            mapped: false,
            hilite: None,
            focused: false,
            parent: None,
            child: None,
            target: None,
            dynamic: false,
        }
    }

    #[inline]
    fn row_height(
        &self,
        index: usize,
    ) -> i32 {
        match self.items[index].kind {
            ItemKind::Title => self.title_height,
            _ => self.item_height,
        }
    }

    /// Computes the menu's width from the widest face, measured with
    /// `text_width`.
    pub fn build(
        &mut self,
        title_height: i32,
        item_height: i32,
        decoration_width: i32,
        text_width: &dyn Fn(&str) -> i32,
    ) {
        self.title_height = title_height;
        self.item_height = item_height;

        let widest = self
            .items
            .iter()
            .flat_map(|item| std::iter::once(&item.face).chain(item.alt.iter()))
            .map(|face| text_width(&face.label))
            .max()
            .unwrap_or(0);

        self.width = std::cmp::max(widest + decoration_width, 40);
    }

    pub fn dim(&self) -> Dim {
        let height = (0..self.items.len())
            .map(|index| self.row_height(index))
            .sum::<i32>();

        Dim::new(self.width, std::cmp::max(height, 1))
    }

    #[inline]
    pub fn region(&self) -> Region {
        Region {
            pos: self.pos,
            dim: self.dim(),
        }
    }

    /// The row of item `index`, relative to the menu.
    pub fn row(
        &self,
        index: usize,
    ) -> Region {
        let y: i32 = (0..index).map(|index| self.row_height(index)).sum();
        Region::new(0, y, self.width, self.row_height(index))
    }

    pub fn item_of(
        &self,
        row: Window,
    ) -> Option<usize> {
        self.rows.iter().position(|&window| window == row)
    }

    /// The next selectable item after (or before) the hilited one, wrapping
    /// around and skipping titles.
    pub fn step(
        &self,
        dir: Direction,
    ) -> Option<usize> {
        let len = self.items.len();
        let mut index = match (self.hilite, dir) {
            (Some(index), _) => index,
            (None, Direction::Forward) => len.checked_sub(1)?,
            (None, Direction::Backward) => 0,
        };

        for _ in 0..len {
            index = dir.step(index, len);

            if self.items[index].selectable() {
                return Some(index);
            }
        }

        None
    }

    #[inline]
    pub fn first_selectable(&self) -> Option<usize> {
        self.items.iter().position(MenuItem::selectable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(label: &str) -> ItemFace {
        ItemFace {
            label: label.to_owned(),
            ..Default::default()
        }
    }

    fn menu() -> Menu {
        Menu::new(
            0,
            MenuDef {
                name: "root".to_owned(),
                items: vec![
                    MenuItem::new(ItemKind::Title, face("Root")),
                    MenuItem::new(ItemKind::Item, face("xterm")),
                    MenuItem::new(ItemKind::Title, face("Tools")),
                    MenuItem::new(ItemKind::Sub, face("Games")),
                ],
            },
            10,
        )
    }

    #[test]
    fn navigation_wraps_and_skips_titles() {
        let mut menu = menu();

        assert_eq!(menu.first_selectable(), Some(1));
        assert_eq!(menu.step(Direction::Forward), Some(1));

        menu.hilite = Some(1);
        assert_eq!(menu.step(Direction::Forward), Some(3));

        menu.hilite = Some(3);
        assert_eq!(menu.step(Direction::Forward), Some(1));
        assert_eq!(menu.step(Direction::Backward), Some(1));
    }

    #[test]
    fn geometry() {
        let mut menu = menu();
        menu.build(18, 16, 20, &|text| text.len() as i32 * 6);

        assert_eq!(menu.width, 50);
        assert_eq!(menu.dim(), Dim::new(50, 68));
        assert_eq!(menu.row(3), Region::new(0, 52, 50, 16));
    }

    #[test]
    fn references() {
        assert_eq!(SubmenuRef::parse("games"), SubmenuRef::Named("games".into()));
        assert_eq!(SubmenuRef::parse("later!"), SubmenuRef::LateBound("later".into()));
        assert_eq!(
            SubmenuRef::parse("!ls ~/bin | menugen"),
            SubmenuRef::Dynamic("ls ~/bin | menugen".into())
        );

        assert_eq!(SubmenuRef::parse("games").bound_name(), Some("games"));
        assert_eq!(SubmenuRef::parse("later!").bound_name(), None);
        assert_eq!(SubmenuRef::parse("!menugen").bound_name(), None);

        assert_eq!(Call::parse("gotodesktop(2)"), Call {
            name: "gotodesktop".into(),
            param: Some("2".into()),
        });
        assert_eq!(Call::parse("shade").param, None);
    }

    #[test]
    fn checkbox_faces() {
        let mut item = MenuItem::new(ItemKind::Checkbox, face("Unshade"));
        item.alt = Some(face("Shade"));
        item.flag = Some(FlagKind::Shaded);

        assert_eq!(item.face(true).label, "Unshade");
        assert_eq!(item.face(false).label, "Shade");
    }
}
