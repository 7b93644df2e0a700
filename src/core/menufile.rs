use crate::action::Action;
use crate::action::TargetKind;
use crate::client::FlagKind;
use crate::error::ParseError;
use crate::error::Parsed;
use crate::menu::Call;
use crate::menu::ItemFace;
use crate::menu::ItemKind;
use crate::menu::MenuDef;
use crate::menu::MenuItem;
use crate::menu::SubmenuRef;
use crate::util::Util;

use std::collections::HashSet;
use std::fs;
use std::str::FromStr;

const MAX_INCLUDE_DEPTH: usize = 8;

/// The fields that may follow an entry's tag, each at most once.
#[derive(Debug, Default)]
struct Fields {
    label: Option<String>,
    exec: Option<String>,
    submenu: Option<String>,
    call: Option<String>,
}

impl Fields {
    fn into_face(self) -> ItemFace {
        ItemFace {
            label: self.label.unwrap_or_default(),
            exec: self.exec.filter(|exec| !exec.trim().is_empty()),
            submenu: self.submenu.map(|submenu| SubmenuRef::parse(&submenu)),
            call: self.call.map(|call| Call::parse(&call)),
        }
    }
}

/// The index of the delimiter closing the one `text` starts with; nested
/// pairs of the same kind are skipped over.
fn closing(
    text: &str,
    open: char,
    close: char,
) -> Option<usize> {
    let mut depth = 0usize;

    for (i, c) in text.char_indices() {
        if c == close && open != close && depth > 0 {
            depth -= 1;

            if depth == 0 {
                return Some(i);
            }
        } else if c == open {
            if open == close && i > 0 {
                return Some(i);
            }

            depth += 1;
        }
    }

    None
}

fn parse_fields(mut text: &str) -> Result<Fields, ParseError> {
    let mut fields = Fields::default();

    loop {
        text = text.trim_start();

        let (open, close) = match text.chars().next() {
            None => return Ok(fields),
            Some('(') => ('(', ')'),
            Some('{') => ('{', '}'),
            Some('<') => ('<', '>'),
            Some('"') => ('"', '"'),
            Some(_) => return Err(ParseError::BadMenuEntry(text.to_owned())),
        };

        let end = closing(text, open, close).ok_or(ParseError::MissingDelimiter(close))?;
        let value = Some(text[1..end].to_owned());

        match open {
            '(' => fields.label = value,
            '{' => fields.exec = value,
            '<' => fields.submenu = value,
            _ => fields.call = value,
        }

        text = &text[end + 1..];
    }
}

struct MenuParser<'p> {
    parsed: &'p mut Parsed<MenuDef>,
    open: Vec<MenuDef>,
    /// Where the entry being read sits, as `(file, line)`.
    at: (String, usize),
    /// Every named submenu reference with the place it was made.
    references: Vec<(String, usize, String)>,
}

impl<'p> MenuParser<'p> {
    fn feed(
        &mut self,
        file: &str,
        text: &str,
        depth: usize,
    ) {
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            self.at = (file.to_owned(), index + 1);

            if let Err(err) = self.line(file, line, depth) {
                self.parsed.diagnose(file, index + 1, err);
            }
        }
    }

    fn line(
        &mut self,
        file: &str,
        line: &str,
        depth: usize,
    ) -> Result<(), ParseError> {
        let rest = line
            .strip_prefix('[')
            .ok_or_else(|| ParseError::BadMenuEntry(line.to_owned()))?;

        let end = rest.find(']').ok_or(ParseError::MissingDelimiter(']'))?;
        let tag = rest[..end].trim().to_ascii_lowercase();
        let rest = &rest[end + 1..];

        match tag.as_str() {
            "start" | "submenu" => {
                let name = parse_fields(rest)?
                    .label
                    .filter(|name| !name.trim().is_empty())
                    .ok_or(ParseError::MissingDelimiter('('))?;

                if tag == "start" && !self.open.is_empty() {
                    return Err(ParseError::BadMenuEntry(line.to_owned()));
                }

                self.open.push(MenuDef {
                    name: name.trim().to_owned(),
                    items: Vec::new(),
                });
            },
            "end" => {
                let def = self
                    .open
                    .pop()
                    .ok_or_else(|| ParseError::BadMenuEntry(line.to_owned()))?;

                self.parsed.push(def);
            },
            "include" => {
                let path = parse_fields(rest)?
                    .label
                    .ok_or(ParseError::MissingDelimiter('('))?;

                if depth >= MAX_INCLUDE_DEPTH {
                    return Err(ParseError::BadValue("include".to_owned(), path));
                }

                let path = Util::expand_tilde(path.trim());
                let text = fs::read_to_string(&path)
                    .map_err(|err| ParseError::Unreadable(path.clone(), err.to_string()))?;

                self.feed(&path, &text, depth + 1);
            },
            "title" | "item" | "sub" => {
                let kind = match tag.as_str() {
                    "title" => ItemKind::Title,
                    "item" => ItemKind::Item,
                    _ => ItemKind::Sub,
                };

                let face = parse_fields(rest)?.into_face();
                check_call(&face)?;

                if kind == ItemKind::Sub && face.submenu.is_none() {
                    return Err(ParseError::MissingDelimiter('<'));
                }

                self.item(line, MenuItem::new(kind, face))?;
            },
            "restart" | "exit" | "exec" | "nop" => {
                let fields = parse_fields(rest)?;
                let mut face = ItemFace {
                    label: fields.label.unwrap_or_default(),
                    ..Default::default()
                };

                match tag.as_str() {
                    "exec" => face.exec = fields.exec,
                    _ => {
                        face.call = Some(Call {
                            name: tag.clone(),
                            param: fields.exec.filter(|exec| !exec.trim().is_empty()),
                        })
                    },
                }

                self.item(line, MenuItem::new(ItemKind::Item, face))?;
            },
            _ => match tag.strip_prefix("checkbox") {
                Some(flag) => {
                    let flag = flag.trim_start_matches('=').trim();
                    let flag = FlagKind::from_str(flag)
                        .map_err(|_| ParseError::BadValue("checkbox".to_owned(), flag.to_owned()))?;

                    let mut item = parse_checkbox(rest)?;
                    item.flag = Some(flag);

                    self.item(line, item)?;
                },
                None => return Err(ParseError::BadMenuEntry(line.to_owned())),
            },
        }

        Ok(())
    }

    fn item(
        &mut self,
        line: &str,
        item: MenuItem,
    ) -> Result<(), ParseError> {
        match self.open.last_mut() {
            Some(menu) => {
                let (at_file, at_line) = &self.at;
                self.references.extend(
                    item.bound_names()
                        .map(|name| (at_file.clone(), *at_line, name.to_owned())),
                );

                menu.items.push(item);
                Ok(())
            },
            None => Err(ParseError::BadMenuEntry(line.to_owned())),
        }
    }
}

/// Splits a checkbox entry into its `@TRUE` and `@FALSE` faces.
fn parse_checkbox(text: &str) -> Result<MenuItem, ParseError> {
    let upper = text.to_ascii_uppercase();

    let on = upper
        .find("@TRUE")
        .ok_or_else(|| ParseError::BadMenuEntry(text.to_owned()))?;
    let off = upper
        .find("@FALSE")
        .ok_or_else(|| ParseError::BadMenuEntry(text.to_owned()))?;

    let (on_text, off_text) = if on < off {
        (&text[on + 5..off], &text[off + 6..])
    } else {
        (&text[on + 5..], &text[off + 6..on])
    };

    let face = parse_fields(on_text)?.into_face();
    let alt = parse_fields(off_text)?.into_face();
    check_call(&face)?;
    check_call(&alt)?;

    let mut item = MenuItem::new(ItemKind::Checkbox, face);
    item.alt = Some(alt);

    Ok(item)
}

fn check_call(face: &ItemFace) -> Result<(), ParseError> {
    match &face.call {
        Some(call) if Action::resolve(&call.name, TargetKind::Window).is_none() => {
            Err(ParseError::UnknownAction(call.name.clone()))
        },
        _ => Ok(()),
    }
}

/// Parses menu definitions. Every `[start]`/`[submenu]` closed by an
/// `[end]` yields one definition, submenus before the menus enclosing
/// them. A `<name>` reference to a menu the text does not define is
/// diagnosed; `<name!>` and `<!command>` are resolved when opened.
pub fn parse_menu_text(
    file: &str,
    text: &str,
) -> Parsed<MenuDef> {
    parse_with(file, text, true)
}

/// Parses the output of a menu command. Its references may name menus
/// loaded from the menu file, so they are only resolved when opened.
pub fn parse_generated_menu(
    command: &str,
    text: &str,
) -> Parsed<MenuDef> {
    parse_with(command, text, false)
}

fn parse_with(
    file: &str,
    text: &str,
    resolve: bool,
) -> Parsed<MenuDef> {
    let mut parsed = Parsed::default();
    let mut parser = MenuParser {
        parsed: &mut parsed,
        open: Vec::new(),
        at: (file.to_owned(), 0),
        references: Vec::new(),
    };

    parser.feed(file, text, 0);

    let unclosed = std::mem::take(&mut parser.open);
    let references = std::mem::take(&mut parser.references);
    let line = text.lines().count();

    for def in unclosed.into_iter().rev() {
        parsed.diagnose(file, line, ParseError::MissingDelimiter(']'));
        parsed.push(def);
    }

    if resolve {
        let defined: HashSet<String> = parsed.items.iter().map(|def| def.name.clone()).collect();

        for (file, line, name) in references {
            if !defined.contains(&name) {
                parsed.diagnose(&file, line, ParseError::UnknownMenu(name));
            }
        }
    }

    parsed
}

pub fn load_menus(path: &str) -> Result<Parsed<MenuDef>, ParseError> {
    let path = Util::expand_tilde(path);

    fs::read_to_string(&path)
        .map(|text| parse_menu_text(&path, &text))
        .map_err(|err| ParseError::Unreadable(path, err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::Diagnostic;

    const MENU: &str = r#"
# the root menu
[start](root)
    [title](Lanthorn)
    [item](Terminal){xterm -ls}
    [sub](Tools)<tools>
    [sub](Scripts)<!ls ~/bin | menugen>
    [submenu](tools)
        [item](Top){xterm -e top}
        [nop](---)
    [end]
    [item](Desktop 2)"gotodesktop(1)"
    [restart](Restart)
    [exit](Exit)
[end]

[start](window)
    [checkbox=shaded] @TRUE(Unshade)"unshade" @FALSE(Shade)"shade"
    [item](Close)"close"
    [item](Broken)"frobnicate"
    [bogus](entry)
[end]
"#;

    #[test]
    fn nested_definitions() {
        let parsed = parse_menu_text("menu", MENU);
        let names: Vec<&str> = parsed.items.iter().map(|def| def.name.as_str()).collect();

        assert_eq!(names, vec!["tools", "root", "window"]);

        let root = &parsed.items[1];
        assert_eq!(root.items.len(), 7);
        assert_eq!(root.items[0].kind, ItemKind::Title);
        assert_eq!(root.items[1].face.exec.as_deref(), Some("xterm -ls"));
        assert_eq!(root.items[2].face.submenu, Some(SubmenuRef::Named("tools".into())));
        assert_eq!(
            root.items[3].face.submenu,
            Some(SubmenuRef::Dynamic("ls ~/bin | menugen".into()))
        );
        assert_eq!(root.items[4].face.call, Some(Call {
            name: "gotodesktop".into(),
            param: Some("1".into()),
        }));
        assert_eq!(root.items[5].face.call.as_ref().map(|call| call.name.as_str()), Some("restart"));
        assert_eq!(root.items[6].face.label, "Exit");
    }

    #[test]
    fn checkboxes_carry_both_faces() {
        let parsed = parse_menu_text("menu", MENU);
        let window = &parsed.items[2];
        let checkbox = &window.items[0];

        assert_eq!(checkbox.kind, ItemKind::Checkbox);
        assert_eq!(checkbox.flag, Some(FlagKind::Shaded));
        assert_eq!(checkbox.face(true).label, "Unshade");
        assert_eq!(checkbox.face(false).call.as_ref().map(|call| call.name.as_str()), Some("shade"));
    }

    #[test]
    fn bad_entries_are_diagnosed_and_skipped() {
        let parsed = parse_menu_text("menu", MENU);

        assert_eq!(parsed.items[2].items.len(), 2);
        assert_eq!(parsed.diagnostics.len(), 2);
        assert_eq!(parsed.diagnostics[0].line, 20);
        assert_eq!(
            parsed.diagnostics[0].error,
            ParseError::UnknownAction("frobnicate".into())
        );
        assert_eq!(parsed.diagnostics[1].line, 21);
    }

    #[test]
    fn unterminated_menus_are_kept() {
        let parsed = parse_menu_text("menu", "[start](root)\n[item](a){a}\n[item](b){b");

        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.items[0].items.len(), 1);
        assert_eq!(parsed.diagnostics[0].error, ParseError::MissingDelimiter('}'));
        assert_eq!(parsed.diagnostics[1].error, ParseError::MissingDelimiter(']'));
    }

    #[test]
    fn unknown_submenus_are_diagnosed() {
        let text = "[start](root)\n[sub](Tools)<nosuch>\n[sub](Later)<nosuch!>\n[sub](Gen)<!menugen>\n[end]\n";
        let parsed = parse_menu_text("menu", text);

        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.diagnostics, vec![Diagnostic::new(
            "menu",
            2,
            ParseError::UnknownMenu("nosuch".into())
        )]);

        let generated = parse_generated_menu("menugen", text);
        assert!(generated.diagnostics.is_empty());
    }

    #[test]
    fn checkbox_faces_are_resolved_too() {
        let text = "[start](window)\n[checkbox=shaded] @TRUE(A)<gone> @FALSE(B)\"shade\"\n[end]\n";
        let parsed = parse_menu_text("menu", text);

        assert_eq!(parsed.diagnostics.len(), 1);
        assert_eq!(parsed.diagnostics[0].error, ParseError::UnknownMenu("gone".into()));
    }

    #[test]
    fn items_outside_menus_are_rejected() {
        let parsed = parse_menu_text("menu", "[item](stray){xterm}\n[end]");

        assert!(parsed.items.is_empty());
        assert_eq!(parsed.diagnostics.len(), 2);
    }
}
