use crate::action::Action;
use crate::action::TargetKind;
use crate::error::ParseError;
use crate::util::Util;

use winsys::geometry::Dim;
use winsys::input::parse_button;
use winsys::input::EventKind;
use winsys::input::KeyResolver;
use winsys::input::ModMask;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A single input binding: when an event matches, the action (or external
/// command) runs against the target that received the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub kind: EventKind,
    pub detail: u32,
    /// The textual form of `detail` as it was written, e.g. a key symbol.
    pub detail_name: Option<String>,
    pub mods: ModMask,
    pub nmods: ModMask,
    pub delay: Option<Duration>,
    pub breaks: Vec<EventKind>,
    pub action: Action,
    pub param: Option<String>,
    pub exec: Option<String>,
    pub replay: bool,
}

impl Binding {
    pub fn new(
        kind: EventKind,
        action: Action,
    ) -> Self {
        Self {
            kind,
            detail: 0,
            detail_name: None,
            mods: ModMask::empty(),
            nmods: ModMask::empty(),
            delay: None,
            breaks: Vec::new(),
            action,
            param: None,
            exec: None,
            replay: false,
        }
    }

    /// Parses one body entry, `name[(param)]: [*]spec` or `{command}: spec`,
    /// resolving the action for `target` and key names through `keys`.
    pub fn parse_entry(
        entry: &str,
        target: TargetKind,
        keys: &dyn KeyResolver,
        screen: Dim,
    ) -> Result<Self, ParseError> {
        let entry = entry.trim();

        let (action, param, exec, rest) = if let Some(command) = entry.strip_prefix('{') {
            let end = command.rfind('}').ok_or(ParseError::MissingDelimiter('}'))?;

            (
                Action::Exec,
                None,
                Some(command[..end].trim().to_owned()),
                &command[end + 1..],
            )
        } else {
            let head_end = entry
                .find(|c| c == '(' || c == ':')
                .ok_or(ParseError::MissingDelimiter(':'))?;

            let name = entry[..head_end].trim();
            let action =
                Action::resolve(name, target).ok_or_else(|| ParseError::UnknownAction(name.to_owned()))?;

            let (param, rest) = if entry[head_end..].starts_with('(') {
                let inner = &entry[head_end + 1..];
                let end = inner.rfind(')').ok_or(ParseError::MissingDelimiter(')'))?;
                let param = inner[..end].trim();

                (
                    if param.is_empty() {
                        None
                    } else if action.substitutes_dim() {
                        Some(Util::substitute_dim(param, screen))
                    } else {
                        Some(param.to_owned())
                    },
                    &inner[end + 1..],
                )
            } else {
                (None, &entry[head_end..])
            };

            if param.is_none() && action.requires_param() {
                return Err(ParseError::MissingParameter(name.to_owned()));
            }

            (action, param, None, rest)
        };

        let spec = rest
            .trim_start()
            .strip_prefix(':')
            .ok_or(ParseError::MissingDelimiter(':'))?
            .trim();

        let (replay, spec) = match spec.strip_prefix('*') {
            Some(spec) => (true, spec.trim_start()),
            None => (false, spec),
        };

        let mut binding = Self::parse_spec(spec, action, keys)?;
        binding.param = param;
        binding.exec = exec;
        binding.replay = replay;

        Ok(binding)
    }

    /// Parses `[detail=]kind[&mod|&!mod...][:delay[:break|break...]]`.
    pub fn parse_spec(
        spec: &str,
        action: Action,
        keys: &dyn KeyResolver,
    ) -> Result<Self, ParseError> {
        let bad_spec = || ParseError::BadEventSpec(spec.to_owned());

        let mut sections = spec.split(':');
        let event = sections.next().ok_or_else(bad_spec)?.trim();

        let (detail_name, event) = match event.split_once('=') {
            Some((detail, event)) => (Some(detail.trim()), event),
            None => (None, event),
        };

        let mut terms = event.split('&').map(str::trim);
        let kind = terms
            .next()
            .and_then(|kind| EventKind::from_str(kind).ok())
            .ok_or_else(bad_spec)?;

        let mut binding = Binding::new(kind, action);

        for term in terms {
            let (forbidden, name) = match term.strip_prefix('!') {
                Some(name) => (true, name.trim()),
                None => (false, term),
            };

            let modifier = ModMask::parse_modifier(name).map_err(|_| bad_spec())?;

            if forbidden {
                binding.nmods |= modifier;
            } else {
                binding.mods |= modifier;
            }
        }

        if let Some(name) = detail_name {
            binding.detail = if let Ok(code) = name.parse::<u32>() {
                code
            } else if kind.is_key() {
                keys.keycode(name)
                    .map(u32::from)
                    .ok_or_else(|| ParseError::BadKey(name.to_owned()))?
            } else if kind.is_button() {
                parse_button(name).map_err(|_| bad_spec())?
            } else {
                return Err(bad_spec());
            };

            binding.detail_name = Some(name.to_owned());
        }

        if let Some(delay) = sections.next() {
            let millis: u64 = delay.trim().parse().map_err(|_| bad_spec())?;

            if millis > 0 {
                binding.delay = Some(Duration::from_millis(millis));
            }
        }

        if let Some(breaks) = sections.next() {
            binding.breaks = breaks
                .split('|')
                .map(|kind| EventKind::from_str(kind.trim()).map_err(|_| bad_spec()))
                .collect::<Result<_, _>>()?;
        }

        if sections.next().is_some() {
            return Err(bad_spec());
        }

        Ok(binding)
    }

    #[inline]
    pub fn param(&self) -> Option<&str> {
        self.param.as_deref()
    }

    #[inline]
    pub fn is_delayed(&self) -> bool {
        self.delay.is_some()
    }

    #[inline]
    pub fn breaks_on(
        &self,
        kind: EventKind,
    ) -> bool {
        self.breaks.contains(&kind)
    }
}

impl fmt::Display for Binding {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match (&self.action, &self.exec) {
            (Action::Exec, Some(exec)) => write!(f, "{{{}}}", exec)?,
            (action, _) => {
                write!(f, "{}", action)?;

                if let Some(param) = &self.param {
                    write!(f, "({})", param)?;
                }
            },
        }

        f.write_str(": ")?;

        if self.replay {
            f.write_str("*")?;
        }

        match &self.detail_name {
            Some(name) => write!(f, "{}=", name)?,
            None if self.detail != 0 => write!(f, "{}=", self.detail)?,
            None => {},
        }

        write!(f, "{}", self.kind)?;

        for name in self.mods.names() {
            write!(f, "&{}", name)?;
        }

        for name in self.nmods.names() {
            write!(f, "&!{}", name)?;
        }

        if self.delay.is_some() || !self.breaks.is_empty() {
            write!(f, ":{}", self.delay.map_or(0, |delay| delay.as_millis()))?;
        }

        if !self.breaks.is_empty() {
            let breaks: Vec<&'static str> = self.breaks.iter().map(|&kind| kind.into()).collect();
            write!(f, ":{}", breaks.join("|"))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::action::MenuAction;
    use crate::action::RootAction;
    use crate::action::WindowAction;

    use std::collections::HashMap;

    fn keys() -> HashMap<String, u8> {
        map!(
            "Tab".to_owned() => 23,
            "Left".to_owned() => 113,
            "Alt_L".to_owned() => 64,
        )
    }

    const SCREEN: Dim = Dim {
        w: 1280,
        h: 1024,
    };

    #[test]
    fn full_entry() {
        let binding = Binding::parse_entry(
            "taskswitcher: Tab=KeyPress&Mod1&!Control:300:KeyRelease|KeyPress",
            TargetKind::Root,
            &keys(),
            SCREEN,
        )
        .unwrap();

        assert_eq!(binding.action, Action::Root(RootAction::TaskSwitcher));
        assert_eq!(binding.kind, EventKind::KeyPress);
        assert_eq!(binding.detail, 23);
        assert_eq!(binding.mods, ModMask::MOD1);
        assert_eq!(binding.nmods, ModMask::CONTROL);
        assert_eq!(binding.delay, Some(Duration::from_millis(300)));
        assert_eq!(binding.breaks, vec![EventKind::KeyRelease, EventKind::KeyPress]);
        assert!(!binding.replay);
    }

    #[test]
    fn params_replay_and_exec() {
        let binding = Binding::parse_entry(
            "viewportfixedmove(+W+0): *Button1=ButtonPress&Mod4",
            TargetKind::Window,
            &keys(),
            SCREEN,
        )
        .unwrap();

        assert_eq!(binding.action, Action::Root(RootAction::ViewportFixedMove));
        assert_eq!(binding.param(), Some("+1280+0"));
        assert_eq!(binding.detail, 1);
        assert!(binding.replay);

        let binding = Binding::parse_entry(
            "{xterm -e sh -c 'echo {}; read x'}: DoubleClick",
            TargetKind::Root,
            &keys(),
            SCREEN,
        )
        .unwrap();

        assert_eq!(binding.action, Action::Exec);
        assert_eq!(binding.exec.as_deref(), Some("xterm -e sh -c 'echo {}; read x'"));
        assert_eq!(binding.kind, EventKind::DoubleClick);
    }

    #[test]
    fn failure_modes() {
        let parse = |entry: &str, target| Binding::parse_entry(entry, target, &keys(), SCREEN);

        assert_eq!(
            parse("frobnicate: ButtonPress", TargetKind::Window),
            Err(ParseError::UnknownAction("frobnicate".into()))
        );
        assert_eq!(
            parse("menumap: ButtonPress", TargetKind::Root),
            Err(ParseError::MissingParameter("menumap".into()))
        );
        assert_eq!(
            parse("menumap(root: ButtonPress", TargetKind::Root),
            Err(ParseError::MissingDelimiter(')'))
        );
        assert_eq!(
            parse("{xterm: KeyPress", TargetKind::Root),
            Err(ParseError::MissingDelimiter('}'))
        );
        assert_eq!(
            parse("raise: Hyper_L=KeyPress", TargetKind::Window),
            Err(ParseError::BadKey("Hyper_L".into()))
        );
        assert!(matches!(
            parse("raise: ButtonPress&Hyper", TargetKind::Window),
            Err(ParseError::BadEventSpec(_))
        ));
        assert!(matches!(
            parse("raise: Motion", TargetKind::Window),
            Err(ParseError::BadEventSpec(_))
        ));
    }

    #[test]
    fn serialization_round_trips() {
        let entries = [
            ("raise: Button1=ButtonPress", TargetKind::Window),
            ("shade: *DoubleClick&Mod1&!MoveResize", TargetKind::Window),
            ("endmoveresize: Left=KeyPress&MoveResize:50:KeyRelease", TargetKind::Root),
            ("nextitem: EnterNotify", TargetKind::Menu),
            ("menumap(root): 3=ButtonPress", TargetKind::Root),
            ("{xterm}: Tab=KeyPress&Mod4", TargetKind::Root),
        ];

        for &(entry, target) in &entries {
            let binding = Binding::parse_entry(entry, target, &keys(), SCREEN).unwrap();
            let reparsed =
                Binding::parse_entry(&binding.to_string(), target, &keys(), SCREEN).unwrap();

            assert_eq!(binding, reparsed, "{}", entry);
        }

        let binding = Binding::parse_entry("nextitem: EnterNotify", TargetKind::Menu, &keys(), SCREEN)
            .unwrap();
        assert_eq!(binding.action, Action::Menu(MenuAction::NextItem));
        assert_eq!(binding.to_string(), "nextitem: EnterNotify");

        let binding =
            Binding::parse_entry("raise: ButtonPress", TargetKind::Window, &keys(), SCREEN).unwrap();
        assert_eq!(binding.action, Action::Window(WindowAction::Raise));
    }
}
