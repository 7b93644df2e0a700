use crate::error::ParseError;
use crate::error::Parsed;
use crate::stack::Layer;
use crate::util::Util;

use winsys::geometry::GeometrySpec;

use std::collections::HashMap;
use std::fs;
use std::str::FromStr;
use std::time::Duration;

use strum::EnumString;

pub const MAX_DESKTOPS: usize = 64;

/// A flat `key: value` resource table, as read from rc and style files.
/// Keys are compared case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct ResourceDb {
    name: String,
    entries: HashMap<String, (String, usize)>,
}

impl ResourceDb {
    /// Parses `text` into a fresh database along with a diagnostic for
    /// every malformed line.
    pub fn parse(
        name: &str,
        text: &str,
    ) -> (Self, Parsed<()>) {
        let mut parsed = Parsed::default();
        let mut entries = HashMap::new();

        for (index, line) in text.lines().enumerate() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('!') || line.starts_with('#') {
                continue;
            }

            match line.split_once(':') {
                Some((key, value)) if !key.trim().is_empty() => {
                    entries.insert(
                        key.trim().to_ascii_lowercase(),
                        (value.trim().to_owned(), index + 1),
                    );
                },
                _ => parsed.diagnose(name, index + 1, ParseError::MissingDelimiter(':')),
            }
        }

        let db = Self {
            name: name.to_owned(),
            entries,
        };

        (db, parsed)
    }

    pub fn from_text(
        name: &str,
        text: &str,
    ) -> Self {
        let (db, parsed) = Self::parse(name, text);
        parsed.report();
        db
    }

    pub fn load(path: &str) -> Option<Self> {
        let path = Util::expand_tilde(path);

        match fs::read_to_string(&path) {
            Ok(text) => Some(Self::from_text(&path, &text)),
            Err(err) => {
                debug!("unable to read resource file {}: {}", path, err);
                None
            },
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn get(
        &self,
        key: &str,
    ) -> Option<&str> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(|(value, _)| value.as_str())
    }

    /// A typed lookup; values that fail to parse are reported and replaced
    /// by `default`.
    pub fn value<T: FromStr>(
        &self,
        key: &str,
        default: T,
    ) -> T {
        match self.entries.get(&key.to_ascii_lowercase()) {
            Some((value, line)) => value.parse().unwrap_or_else(|_| {
                warn!(
                    "{}:{}: {}",
                    self.name,
                    line,
                    ParseError::BadValue(key.to_owned(), value.to_owned())
                );
                default
            }),
            None => default,
        }
    }

    pub fn flag(
        &self,
        key: &str,
        default: bool,
    ) -> bool {
        match self.get(key).map(str::to_ascii_lowercase).as_deref() {
            Some("true") | Some("yes") | Some("on") | Some("1") => true,
            Some("false") | Some("no") | Some("off") | Some("0") => false,
            Some(other) => {
                warn!(
                    "{}: {}",
                    self.name,
                    ParseError::BadValue(key.to_owned(), other.to_owned())
                );
                default
            },
            None => default,
        }
    }

    pub fn string(
        &self,
        key: &str,
        default: &str,
    ) -> String {
        self.get(key).unwrap_or(default).to_owned()
    }
}

/// Where focus goes when the focused window disappears.
#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum FocusRevert {
    Window,
    Root,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum DockDirection {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DockConfig {
    pub geometry: GeometrySpec,
    pub order: Vec<String>,
    pub desktop_mask: Option<u64>,
    pub centered: bool,
    pub in_workarea: bool,
    pub direction: DockDirection,
    pub grid_space: i32,
    pub stacking: Layer,
}

impl Default for DockConfig {
    fn default() -> Self {
        Self {
            geometry: GeometrySpec {
                x: Some(0),
                y: Some(0),
                x_negative: true,
                ..GeometrySpec::default()
            },
            order: Vec::new(),
            desktop_mask: None,
            centered: false,
            in_workarea: false,
            direction: DockDirection::Vertical,
            grid_space: 2,
            stacking: Layer::AlwaysOnTop,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScreenConfig {
    pub number: usize,
    pub style_file: String,
    pub action_file: String,
    pub menu_file: String,
    pub desktops: usize,
    pub desktop_names: Vec<String>,
    pub virtual_size: (i32, i32),
    pub cache_max: usize,
    pub menu_stacking: Layer,
    pub transient_above: bool,
    pub focus_revert: FocusRevert,
    pub double_click: Duration,
    pub docks: Vec<DockConfig>,
}

impl ScreenConfig {
    pub fn from_db(
        db: &ResourceDb,
        number: usize,
    ) -> Self {
        let key = |name: &str| format!("screen{}.{}", number, name);

        let desktops = db
            .value(&key("numberOfDesktops"), 4usize)
            .max(1)
            .min(MAX_DESKTOPS);

        let mut desktop_names: Vec<String> = db
            .get(&key("desktopNames"))
            .map(|names| {
                names
                    .split(',')
                    .map(|name| name.trim().to_owned())
                    .collect()
            })
            .unwrap_or_default();

        desktop_names.truncate(desktops);
        for index in desktop_names.len()..desktops {
            desktop_names.push((index + 1).to_string());
        }

        let virtual_size = db
            .get(&key("virtualSize"))
            .and_then(parse_virtual_size)
            .unwrap_or((3, 3));

        let mut docks = Vec::new();
        for index in 0.. {
            let dock_key = |name: &str| format!("screen{}.dock{}.{}", number, index, name);

            let present = [
                "geometry",
                "order",
                "desktopMask",
                "centered",
                "inworkspace",
                "direction",
                "gridSpace",
                "stacking",
            ]
            .iter()
            .any(|name| db.get(&dock_key(name)).is_some());

            if !present {
                break;
            }

            docks.push(DockConfig::from_db(db, &dock_key));
        }

        if docks.is_empty() {
            docks.push(DockConfig::default());
        }

        Self {
            number,
            style_file: db.string(&key("styleFile"), ""),
            action_file: db.string(&key("actionFile"), ""),
            menu_file: db.string(&key("menuFile"), ""),
            desktops,
            desktop_names,
            virtual_size,
            cache_max: db.value(&key("cacheMax"), 200usize),
            menu_stacking: db.value(&key("menuStacking"), Layer::Normal),
            transient_above: db.flag(&key("transientAbove"), true),
            focus_revert: db.value(&key("focusRevertTo"), FocusRevert::Window),
            double_click: Duration::from_millis(db.value(&key("doubleClickInterval"), 300u64)),
            docks,
        }
    }
}

impl DockConfig {
    fn from_db(
        db: &ResourceDb,
        key: &dyn Fn(&str) -> String,
    ) -> Self {
        let defaults = DockConfig::default();

        Self {
            geometry: db
                .get(&key("geometry"))
                .and_then(GeometrySpec::parse)
                .unwrap_or(defaults.geometry),
            order: db
                .get(&key("order"))
                .map(|order| order.split_whitespace().map(str::to_owned).collect())
                .unwrap_or_default(),
            desktop_mask: db.get(&key("desktopMask")).and_then(parse_desktop_mask),
            centered: db.flag(&key("centered"), defaults.centered),
            in_workarea: db.flag(&key("inworkspace"), defaults.in_workarea),
            direction: db.value(&key("direction"), defaults.direction),
            grid_space: db.value(&key("gridSpace"), defaults.grid_space),
            stacking: db.value(&key("stacking"), defaults.stacking),
        }
    }
}

/// Everything read from the rc file.
#[derive(Debug, Clone)]
pub struct Config {
    pub screen_mask: u64,
    pub script_dir: Option<String>,
    db: ResourceDb,
}

impl Config {
    pub fn new(db: ResourceDb) -> Self {
        Self {
            screen_mask: db.get("screenMask").and_then(parse_desktop_mask).unwrap_or(!0),
            script_dir: db.get("scriptDir").map(Util::expand_tilde),
            db,
        }
    }

    #[inline]
    pub fn manages_screen(
        &self,
        number: usize,
    ) -> bool {
        number < 64 && self.screen_mask & (1 << number) != 0
    }

    #[inline]
    pub fn screen(
        &self,
        number: usize,
    ) -> ScreenConfig {
        ScreenConfig::from_db(&self.db, number)
    }
}

/// Parses `COLSxROWS`.
pub fn parse_virtual_size(size: &str) -> Option<(i32, i32)> {
    let (cols, rows) = size.trim().split_once(|c| c == 'x' || c == 'X')?;
    let cols: i32 = cols.trim().parse().ok()?;
    let rows: i32 = rows.trim().parse().ok()?;

    if (1..=20).contains(&cols) && (1..=20).contains(&rows) {
        Some((cols, rows))
    } else {
        None
    }
}

/// Parses `all` or a whitespace separated list of indices into a bit mask.
pub fn parse_desktop_mask(mask: &str) -> Option<u64> {
    let mask = mask.trim();

    if mask.eq_ignore_ascii_case("all") {
        return Some(!0);
    }

    mask.split_whitespace().try_fold(0u64, |acc, index| {
        let index: u32 = index.parse().ok()?;

        if index < 64 {
            Some(acc | 1 << index)
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RC: &str = "\
! screen zero
screen0.numberOfDesktops: 3
screen0.desktopNames: work, web
screen0.virtualSize: 2x2
screen0.menuStacking: AlwaysOnTop
screen0.focusRevertTo: root
screen0.doubleClickInterval: 250
screen0.dock0.geometry: -0+0
screen0.dock0.order: c/xmms/ n/wmclock/
screen0.dock0.desktopMask: 0 2
screen0.dock1.direction: horizontal
screen0.dock1.inworkspace: true
scriptDir: /usr/share/scripts
bogus line without separator
";

    #[test]
    fn typed_screen_configuration() {
        let db = ResourceDb::from_text("rc", RC);
        let config = Config::new(db).screen(0);

        assert_eq!(config.desktops, 3);
        assert_eq!(config.desktop_names, vec!["work", "web", "3"]);
        assert_eq!(config.virtual_size, (2, 2));
        assert_eq!(config.menu_stacking, Layer::AlwaysOnTop);
        assert_eq!(config.focus_revert, FocusRevert::Root);
        assert_eq!(config.double_click, Duration::from_millis(250));
        assert_eq!(config.cache_max, 200);
    }

    #[test]
    fn dock_sections() {
        let db = ResourceDb::from_text("rc", RC);
        let config = Config::new(db).screen(0);

        assert_eq!(config.docks.len(), 2);
        assert_eq!(config.docks[0].order, vec!["c/xmms/", "n/wmclock/"]);
        assert_eq!(config.docks[0].desktop_mask, Some(0b101));
        assert!(config.docks[0].geometry.x_negative);
        assert_eq!(config.docks[1].direction, DockDirection::Horizontal);
        assert!(config.docks[1].in_workarea);
    }

    #[test]
    fn malformed_lines_are_diagnosed() {
        let (_, parsed) = ResourceDb::parse("rc", RC);
        assert_eq!(parsed.diagnostics.len(), 1);
        assert_eq!(parsed.diagnostics[0].line, 14);
    }

    #[test]
    fn masks_and_sizes() {
        assert_eq!(parse_desktop_mask("all"), Some(!0));
        assert_eq!(parse_desktop_mask("1 3"), Some(0b1010));
        assert_eq!(parse_desktop_mask("64"), None);
        assert_eq!(parse_virtual_size("3x2"), Some((3, 2)));
        assert_eq!(parse_virtual_size("0x2"), None);
    }
}
