use crate::config::ResourceDb;

use std::str::FromStr;

use strum::EnumString;

pub type Color = u32;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum TextureKind {
    Solid,
    Gradient,
    Pixmap,
    ParentRelative,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Bevel {
    Flat,
    Raised,
    Sunken,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Justify {
    Left,
    Center,
    Right,
}

/// A surface description handed to the image renderer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Texture {
    pub kind: TextureKind,
    pub bevel: Bevel,
    pub color: Color,
    pub color_to: Color,
    pub opacity: Option<u32>,
}

impl Default for Texture {
    fn default() -> Self {
        Self {
            kind: TextureKind::Solid,
            bevel: Bevel::Flat,
            color: 0x000000,
            color_to: 0x000000,
            opacity: None,
        }
    }
}

impl Texture {
    /// Parses a blackbox-style texture word list, e.g.
    /// `Raised Gradient Vertical Bevel1`; unknown words are ignored.
    pub fn parse(description: &str) -> Self {
        let mut texture = Texture::default();

        for word in description.split_whitespace() {
            if let Ok(kind) = TextureKind::from_str(word) {
                texture.kind = kind;
            } else if let Ok(bevel) = Bevel::from_str(word) {
                texture.bevel = bevel;
            }
        }

        texture
    }

    fn from_db(
        db: &ResourceDb,
        key: &str,
        default: Texture,
    ) -> Self {
        let mut texture = db.get(key).map_or(default, Texture::parse);

        let color = db.get(&format!("{}.color", key)).map(parse_color);
        texture.color = color.unwrap_or(default.color);
        texture.color_to = db.get(&format!("{}.colorTo", key)).map_or(
            if color.is_some() {
                texture.color
            } else {
                default.color_to
            },
            parse_color,
        );
        texture.opacity = db
            .get(&format!("{}.opacity", key))
            .and_then(|opacity| opacity.parse::<u32>().ok())
            .map(|percent| {
                let percent = percent.min(100) as u64;
                (percent * 0xffff_ffff / 100) as u32
            });

        texture
    }

    #[inline]
    pub fn is_solid(&self) -> bool {
        self.kind == TextureKind::Solid || self.color == self.color_to
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum ButtonPlace {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonStyle {
    pub autoplace: ButtonPlace,
    pub foreground: Color,
    pub focused: Texture,
    pub unfocused: Texture,
    pub pressed: Texture,
}

/// The colors and textures of one surface, per focus state.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Surface {
    pub focused: Texture,
    pub unfocused: Texture,
}

impl Surface {
    #[inline]
    pub fn texture(
        &self,
        focused: bool,
    ) -> Texture {
        if focused {
            self.focused
        } else {
            self.unfocused
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Style {
    pub border_width: i32,
    pub border_color: Color,
    pub title_height: i32,
    pub handle_width: i32,
    pub grip_width: i32,
    pub font: String,
    pub justify: Justify,
    pub label_color: (Color, Color),
    pub title: Surface,
    pub label: Surface,
    pub handle: Surface,
    pub grip: Surface,
    pub buttons: Vec<ButtonStyle>,
    pub menu_font: String,
    pub menu_justify: Justify,
    pub menu_title_height: i32,
    pub menu_item_height: i32,
    pub menu_border_width: i32,
    pub menu_frame: Texture,
    pub menu_title: Texture,
    pub menu_hilite: Texture,
    pub menu_text_color: Color,
    pub menu_title_text_color: Color,
    pub menu_hilite_text_color: Color,
    pub bullet: String,
    pub checkbox_true: String,
    pub checkbox_false: String,
}

impl Default for Style {
    fn default() -> Self {
        Style::from_db(&ResourceDb::default())
    }
}

impl Style {
    pub fn from_db(db: &ResourceDb) -> Self {
        let dark = Texture {
            kind: TextureKind::Gradient,
            bevel: Bevel::Raised,
            color: 0x505050,
            color_to: 0x303030,
            opacity: None,
        };

        let light = Texture {
            kind: TextureKind::Gradient,
            bevel: Bevel::Raised,
            color: 0xb0b0b0,
            color_to: 0x808080,
            opacity: None,
        };

        let surface = |key: &str| Surface {
            focused: Texture::from_db(db, &format!("window.{}.focus", key), light),
            unfocused: Texture::from_db(db, &format!("window.{}.unfocus", key), dark),
        };

        let buttons = (0..db.value("window.numberOfButtons", 1usize).min(16))
            .map(|index| {
                let key = |name: &str| format!("window.button{}.{}", index, name);

                ButtonStyle {
                    autoplace: db.value(&key("autoplace"), ButtonPlace::Right),
                    foreground: db.get(&key("foreground")).map_or(0x000000, parse_color),
                    focused: Texture::from_db(db, &key("focus"), light),
                    unfocused: Texture::from_db(db, &key("unfocus"), dark),
                    pressed: Texture::from_db(db, &key("pressed"), dark),
                }
            })
            .collect();

        let handle_width = db.value("handleWidth", 6i32).max(0);
        let title_height = db.value("window.title.height", 0i32);

        Self {
            border_width: db.value("borderWidth", 1i32).max(0),
            border_color: db.get("borderColor").map_or(0x000000, parse_color),
            title_height: if title_height > 0 {
                title_height
            } else {
                18
            },
            handle_width,
            grip_width: db.value("gripWidth", 25i32).max(0),
            font: db.string("window.font", "fixed"),
            justify: db.value("window.justify", Justify::Left),
            label_color: (
                db.get("window.label.focus.textColor").map_or(0x000000, parse_color),
                db.get("window.label.unfocus.textColor").map_or(0xd0d0d0, parse_color),
            ),
            title: surface("title"),
            label: surface("label"),
            handle: surface("handle"),
            grip: surface("grip"),
            buttons,
            menu_font: db.string("menu.font", "fixed"),
            menu_justify: db.value("menu.justify", Justify::Left),
            menu_title_height: db.value("menu.title.height", 18i32).max(1),
            menu_item_height: db.value("menu.item.height", 16i32).max(1),
            menu_border_width: db.value("menu.borderWidth", 1i32).max(0),
            menu_frame: Texture::from_db(db, "menu.frame", dark),
            menu_title: Texture::from_db(db, "menu.title", light),
            menu_hilite: Texture::from_db(db, "menu.hilite", light),
            menu_text_color: db.get("menu.frame.textColor").map_or(0xd0d0d0, parse_color),
            menu_title_text_color: db.get("menu.title.textColor").map_or(0x000000, parse_color),
            menu_hilite_text_color: db.get("menu.hilite.textColor").map_or(0x000000, parse_color),
            bullet: db.string("menu.bullet", ">"),
            checkbox_true: db.string("menu.checkbox.true", "[x]"),
            checkbox_false: db.string("menu.checkbox.false", "[ ]"),
        }
    }
}

/// Parses `#rrggbb`, `rgb:rr/gg/bb` or one of a few color names; anything
/// else falls back to pixel 0.
pub fn parse_color(color: &str) -> Color {
    let color = color.trim();

    let parsed = if let Some(hex) = color.strip_prefix('#') {
        u32::from_str_radix(hex, 16).ok().filter(|_| hex.len() == 6)
    } else if let Some(channels) = color.strip_prefix("rgb:") {
        channels.split('/').try_fold(0u32, |acc, channel| {
            let value = u32::from_str_radix(channel, 16).ok()?;
            let scaled = match channel.len() {
                1 => value * 0x11,
                2 => value,
                3 => value >> 4,
                4 => value >> 8,
                _ => return None,
            };

            Some(acc << 8 | scaled)
        })
    } else {
        match color.to_ascii_lowercase().as_str() {
            "black" => Some(0x000000),
            "white" => Some(0xffffff),
            "red" => Some(0xff0000),
            "green" => Some(0x00ff00),
            "blue" => Some(0x0000ff),
            "grey" | "gray" => Some(0xbebebe),
            "darkgrey" | "darkgray" => Some(0xa9a9a9),
            _ => None,
        }
    };

    parsed.unwrap_or_else(|| {
        warn!("unable to allocate color \"{}\", using pixel 0", color);
        0
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_descriptions() {
        let texture = Texture::parse("Sunken Gradient Vertical Bevel2");
        assert_eq!(texture.kind, TextureKind::Gradient);
        assert_eq!(texture.bevel, Bevel::Sunken);

        let texture = Texture::parse("parentrelative");
        assert_eq!(texture.kind, TextureKind::ParentRelative);
    }

    #[test]
    fn colors() {
        assert_eq!(parse_color("#102030"), 0x102030);
        assert_eq!(parse_color("rgb:f/80/0000"), 0xff8000);
        assert_eq!(parse_color("White"), 0xffffff);
        assert_eq!(parse_color("chartreuse-ish"), 0);
    }

    #[test]
    fn style_from_resources() {
        let db = ResourceDb::from_text(
            "style",
            "borderWidth: 2\n\
             window.title.height: 20\n\
             window.title.focus: Raised Gradient\n\
             window.title.focus.color: #ff0000\n\
             window.title.focus.colorTo: #0000ff\n\
             window.title.focus.opacity: 50\n\
             window.numberOfButtons: 2\n\
             window.button1.autoplace: left\n\
             menu.bullet: >>\n",
        );

        let style = Style::from_db(&db);

        assert_eq!(style.border_width, 2);
        assert_eq!(style.title_height, 20);
        assert_eq!(style.title.focused.color, 0xff0000);
        assert_eq!(style.title.focused.color_to, 0x0000ff);
        assert_eq!(style.title.focused.opacity, Some(0x7fff_ffff));
        assert_eq!(style.buttons.len(), 2);
        assert_eq!(style.buttons[1].autoplace, ButtonPlace::Left);
        assert_eq!(style.bullet, ">>");
    }
}
