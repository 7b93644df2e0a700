use crate::connection::KeyMap;
use crate::input::KeyCode;
use crate::Result;

use std::process::Command;

use anyhow::anyhow;

pub struct Util;
impl Util {
    /// Reads the key symbol table of the running display through `xmodmap`.
    pub fn system_keymap() -> Result<KeyMap> {
        let out = Command::new("xmodmap")
            .arg("-pke")
            .output()
            .map_err(|err| anyhow!("unable to fetch keycodes via xmodmap: {}", err))?;

        let out = String::from_utf8(out.stdout)
            .map_err(|err| anyhow!("invalid UTF8 from xmodmap: {}", err))?;

        Ok(Self::parse_keymap(&out))
    }

    /// Parses `keycode <n> = <sym> <sym> ...` lines; the first binding of a
    /// symbol wins.
    pub fn parse_keymap(table: &str) -> KeyMap {
        let mut keymap = KeyMap::new();

        for line in table.lines() {
            let mut words = line.split_whitespace();

            if words.next() != Some("keycode") {
                continue;
            }

            let code: KeyCode = match words.next().and_then(|code| code.parse().ok()) {
                Some(code) => code,
                None => continue,
            };

            for name in words.skip(1) {
                keymap.entry(name.to_owned()).or_insert(code);
            }
        }

        keymap
    }
}
