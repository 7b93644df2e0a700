use crate::binding::Binding;
use crate::error::ParseError;

use winsys::input::EventKind;
use winsys::input::InputEvent;
use winsys::input::ModMask;

use regex::Regex;

/// What the matcher compares a binding against.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Observed {
    pub kind: EventKind,
    pub detail: u32,
    pub state: ModMask,
}

impl Observed {
    pub fn new(
        kind: EventKind,
        detail: u32,
        state: ModMask,
    ) -> Self {
        Self {
            kind,
            detail,
            state,
        }
    }

    /// Normalizes an input event; `moving` folds the synthetic move/resize
    /// bit into the modifier state.
    pub fn from_event(
        event: &InputEvent,
        moving: bool,
    ) -> Self {
        let mut state = event.state;
        state.set(ModMask::MOVE_RESIZE, moving);

        Self::new(event.kind, event.detail, state)
    }
}

pub fn matches(
    binding: &Binding,
    observed: &Observed,
) -> bool {
    binding.kind == observed.kind
        && (binding.detail == 0 || binding.detail == observed.detail)
        && observed.state.difference(ModMask::IGNORED) == binding.mods
        && !observed.state.intersects(binding.nmods)
}

/// The identification triple of a managed window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowIdent {
    pub name: String,
    pub class: String,
    pub title: String,
}

impl WindowIdent {
    pub fn new(
        name: impl Into<String>,
        class: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            class: class.into(),
            title: title.into(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Field {
    Name,
    Class,
    Title,
}

/// One `n/re/`, `c/re/` or `t/re/` term.
#[derive(Debug, Clone)]
pub struct Predicate {
    field: Field,
    regex: Regex,
}

impl Predicate {
    /// Parses a single predicate from the front of `text`, returning it with
    /// whatever follows the closing slash.
    pub fn parse_prefix(text: &str) -> Result<(Self, &str), ParseError> {
        let field = match text.chars().next() {
            Some('n') => Field::Name,
            Some('c') => Field::Class,
            Some('t') => Field::Title,
            _ => return Err(ParseError::BadSelector(text.to_owned())),
        };

        if text.get(1..2) != Some("/") {
            return Err(ParseError::BadSelector(text.to_owned()));
        }

        let body = &text[2..];
        let end = find_unescaped_slash(body).ok_or(ParseError::MissingDelimiter('/'))?;

        let pattern = body[..end].replace("\\/", "/");
        let regex = Regex::new(&pattern)
            .map_err(|err| ParseError::BadRegex(pattern.clone(), err.to_string()))?;

        Ok((
            Self {
                field,
                regex,
            },
            &body[end + 1..],
        ))
    }

    pub fn parse(text: &str) -> Result<Self, ParseError> {
        match Self::parse_prefix(text.trim())? {
            (predicate, rest) if rest.is_empty() => Ok(predicate),
            (_, rest) => Err(ParseError::BadSelector(rest.to_owned())),
        }
    }

    #[inline]
    pub fn field(&self) -> Field {
        self.field
    }

    pub fn matches(
        &self,
        ident: &WindowIdent,
    ) -> bool {
        self.regex.is_match(match self.field {
            Field::Name => &ident.name,
            Field::Class => &ident.class,
            Field::Title => &ident.title,
        })
    }
}

/// A conjunction of predicates, one optional regex per identification
/// field; absent fields match anything.
#[derive(Debug, Clone, Default)]
pub struct IdentMatcher {
    predicates: Vec<Predicate>,
}

impl IdentMatcher {
    /// Consumes consecutive predicates from the front of `text`.
    pub fn parse_prefix(mut text: &str) -> Result<(Self, &str), ParseError> {
        let mut predicates: Vec<Predicate> = Vec::with_capacity(3);

        while text.get(1..2) == Some("/") {
            let (predicate, rest) = Predicate::parse_prefix(text)?;
            predicates.retain(|present| present.field != predicate.field);
            predicates.push(predicate);
            text = rest;
        }

        if predicates.is_empty() {
            return Err(ParseError::BadSelector(text.to_owned()));
        }

        Ok((
            Self {
                predicates,
            },
            text,
        ))
    }

    pub fn matches(
        &self,
        ident: &WindowIdent,
    ) -> bool {
        self.predicates
            .iter()
            .all(|predicate| predicate.matches(ident))
    }
}

fn find_unescaped_slash(text: &str) -> Option<usize> {
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            '/' if !escaped => return Some(i),
            _ => escaped = false,
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::action::Action;
    use crate::action::RootAction;

    fn binding(
        kind: EventKind,
        detail: u32,
        mods: ModMask,
        nmods: ModMask,
    ) -> Binding {
        let mut binding = Binding::new(kind, Action::Root(RootAction::Nop));
        binding.detail = detail;
        binding.mods = mods;
        binding.nmods = nmods;
        binding
    }

    #[test]
    fn kind_and_detail() {
        let wildcard = binding(EventKind::ButtonPress, 0, ModMask::empty(), ModMask::empty());
        let specific = binding(EventKind::ButtonPress, 3, ModMask::empty(), ModMask::empty());

        let observed = Observed::new(EventKind::ButtonPress, 1, ModMask::empty());
        assert!(matches(&wildcard, &observed));
        assert!(!matches(&specific, &observed));

        let observed = Observed::new(EventKind::ButtonRelease, 3, ModMask::empty());
        assert!(!matches(&specific, &observed));
    }

    #[test]
    fn lock_modifiers_are_ignored() {
        let binding = binding(EventKind::KeyPress, 23, ModMask::MOD1, ModMask::empty());

        let observed = Observed::new(
            EventKind::KeyPress,
            23,
            ModMask::MOD1 | ModMask::LOCK | ModMask::MOD2,
        );
        assert!(matches(&binding, &observed));

        let observed = Observed::new(EventKind::KeyPress, 23, ModMask::MOD1 | ModMask::SHIFT);
        assert!(!matches(&binding, &observed));
    }

    #[test]
    fn forbidden_modifiers_and_gestures() {
        let outside = binding(EventKind::KeyPress, 0, ModMask::empty(), ModMask::MOVE_RESIZE);
        let inside = binding(EventKind::KeyPress, 0, ModMask::MOVE_RESIZE, ModMask::empty());

        let event = InputEvent::new(EventKind::KeyPress, 9, ModMask::empty(), 1);

        assert!(matches(&outside, &Observed::from_event(&event, false)));
        assert!(!matches(&inside, &Observed::from_event(&event, false)));
        assert!(!matches(&outside, &Observed::from_event(&event, true)));
        assert!(matches(&inside, &Observed::from_event(&event, true)));
    }

    #[test]
    fn predicates() {
        let ident = WindowIdent::new("xmms", "xmms_panel", "XMMS 1.2");

        assert!(Predicate::parse("c/xmms/").unwrap().matches(&ident));
        assert!(!Predicate::parse("n/xclock/").unwrap().matches(&ident));
        assert!(Predicate::parse("t/^XMMS \\d/").unwrap().matches(&ident));
        assert!(Predicate::parse("t/a\\/b/").is_ok());

        assert_eq!(
            Predicate::parse("c/unterminated").unwrap_err(),
            ParseError::MissingDelimiter('/')
        );
        assert!(matches!(Predicate::parse("c/(/"), Err(ParseError::BadRegex(..))));
        assert!(matches!(Predicate::parse("x/y/"), Err(ParseError::BadSelector(_))));
    }

    #[test]
    fn conjunctions() {
        let (matcher, rest) = IdentMatcher::parse_prefix("n/term/c/XTerm/.title").unwrap();
        assert_eq!(rest, ".title");

        assert!(matcher.matches(&WindowIdent::new("xterm", "XTerm", "")));
        assert!(!matcher.matches(&WindowIdent::new("xterm", "URxvt", "")));
        assert!(IdentMatcher::parse_prefix(".title").is_err());
    }
}
