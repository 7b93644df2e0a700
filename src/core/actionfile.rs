use crate::action::TargetKind;
use crate::binding::Binding;
use crate::error::ParseError;
use crate::error::Parsed;
use crate::matcher::IdentMatcher;
use crate::matcher::WindowIdent;
use crate::util::Util;

use winsys::geometry::Dim;
use winsys::input::EventKind;
use winsys::input::KeyResolver;

use std::collections::HashMap;
use std::fs;

const MAX_MACRO_DEPTH: usize = 8;

/// The region of the screen that received an event, each with its own
/// binding list.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Context {
    Root,
    WestEdge,
    EastEdge,
    NorthEdge,
    SouthEdge,
    MenuTitle,
    MenuItem,
    MenuSub,
    MenuCheckbox,
    WindowFrame,
    WindowTitle,
    WindowLabel,
    WindowHandle,
    WindowActiveClient,
    WindowPassiveClient,
    WindowLeftGrip,
    WindowRightGrip,
    WindowButton(usize),
}

impl Context {
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();

        Some(match name.as_str() {
            "root" => Context::Root,
            "westedge" => Context::WestEdge,
            "eastedge" => Context::EastEdge,
            "northedge" => Context::NorthEdge,
            "southedge" => Context::SouthEdge,
            "menu.title" => Context::MenuTitle,
            "menu.item" => Context::MenuItem,
            "menu.sub" => Context::MenuSub,
            "menu.checkbox" => Context::MenuCheckbox,
            "window.frame" => Context::WindowFrame,
            "window.title" => Context::WindowTitle,
            "window.label" => Context::WindowLabel,
            "window.handle" => Context::WindowHandle,
            "window.activeclient" => Context::WindowActiveClient,
            "window.passiveclient" => Context::WindowPassiveClient,
            "window.leftgrip" => Context::WindowLeftGrip,
            "window.rightgrip" => Context::WindowRightGrip,
            other => {
                let index = other.strip_prefix("window.button")?;
                Context::WindowButton(index.parse().ok()?)
            },
        })
    }

    pub fn target(self) -> TargetKind {
        match self {
            Context::Root
            | Context::WestEdge
            | Context::EastEdge
            | Context::NorthEdge
            | Context::SouthEdge => TargetKind::Root,
            Context::MenuTitle | Context::MenuItem | Context::MenuSub | Context::MenuCheckbox => {
                TargetKind::Menu
            },
            _ => TargetKind::Window,
        }
    }
}

/// Bindings that only apply to windows whose identification matches.
#[derive(Debug, Clone)]
pub struct ExtendedBindingList {
    pub context: Context,
    pub matcher: IdentMatcher,
    pub bindings: Vec<Binding>,
}

#[derive(Debug)]
pub enum Selector {
    Base(Context),
    Extended(IdentMatcher, Context),
}

impl Selector {
    #[inline]
    pub fn context(&self) -> Context {
        match self {
            Selector::Base(context) | Selector::Extended(_, context) => *context,
        }
    }
}

#[derive(Debug)]
pub struct Section {
    pub selector: Selector,
    pub bindings: Vec<Binding>,
}

/// Every binding of a screen, indexed by context.
#[derive(Debug, Default)]
pub struct ActionTables {
    base: HashMap<Context, Vec<Binding>>,
    extended: Vec<ExtendedBindingList>,
}

impl ActionTables {
    pub fn from_sections(sections: Vec<Section>) -> Self {
        let mut tables = Self::default();

        for section in sections {
            match section.selector {
                Selector::Base(context) => tables
                    .base
                    .entry(context)
                    .or_insert_with(Vec::new)
                    .extend(section.bindings),
                Selector::Extended(matcher, context) => {
                    tables.extended.push(ExtendedBindingList {
                        context,
                        matcher,
                        bindings: section.bindings,
                    })
                },
            }
        }

        tables
    }

    pub fn parse(
        file: &str,
        text: &str,
        keys: &dyn KeyResolver,
        screen: Dim,
    ) -> Self {
        Self::from_sections(parse_sections(file, text, keys, screen).report())
    }

    pub fn load(
        path: &str,
        keys: &dyn KeyResolver,
        screen: Dim,
    ) -> Result<Self, ParseError> {
        let path = Util::expand_tilde(path);

        fs::read_to_string(&path)
            .map(|text| Self::parse(&path, &text, keys, screen))
            .map_err(|err| ParseError::Unreadable(path, err.to_string()))
    }

    #[inline]
    pub fn bindings(
        &self,
        context: Context,
    ) -> &[Binding] {
        self.base.get(&context).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The extended lists for `context` that apply to `ident`, in file
    /// order.
    pub fn extended<'t>(
        &'t self,
        context: Context,
        ident: &'t WindowIdent,
    ) -> impl Iterator<Item = &'t ExtendedBindingList> + 't {
        self.extended
            .iter()
            .filter(move |list| list.context == context && list.matcher.matches(ident))
    }

    /// The base list followed by every applicable extended list.
    pub fn candidates<'t>(
        &'t self,
        context: Context,
        ident: Option<&'t WindowIdent>,
    ) -> Vec<&'t Binding> {
        let mut candidates: Vec<&Binding> = self.bindings(context).iter().collect();

        if let Some(ident) = ident {
            for list in self.extended(context, ident) {
                candidates.extend(list.bindings.iter());
            }
        }

        candidates
    }

    /// Every binding in every context, extended lists included.
    pub fn all(&self) -> impl Iterator<Item = (Context, &Binding)> + '_ {
        self.base
            .iter()
            .flat_map(|(&context, bindings)| bindings.iter().map(move |binding| (context, binding)))
            .chain(self.extended.iter().flat_map(|list| {
                list.bindings
                    .iter()
                    .map(move |binding| (list.context, binding))
            }))
    }

    /// Whether any binding listens for `kind` in `context`.
    pub fn listens(
        &self,
        context: Context,
        kind: EventKind,
    ) -> bool {
        self.all()
            .any(|(bound, binding)| bound == context && binding.kind == kind)
    }
}

struct Scanner<'s> {
    text: &'s str,
    offset: usize,
}

impl<'s> Scanner<'s> {
    fn line_at(
        &self,
        offset: usize,
    ) -> usize {
        self.text[..offset].matches('\n').count() + 1
    }

    fn rest(&self) -> &'s str {
        &self.text[self.offset..]
    }

    fn skip_blank(&mut self) {
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start();
            self.offset += rest.len() - trimmed.len();

            if trimmed.starts_with('#') {
                self.offset += trimmed.find('\n').unwrap_or(trimmed.len());
            } else {
                break;
            }
        }
    }

    fn word(&mut self) -> &'s str {
        let rest = self.rest();
        let end = rest
            .find(|c: char| c.is_whitespace() || c == '{')
            .unwrap_or(rest.len());

        self.offset += end;
        &rest[..end]
    }

    /// Reads a brace-delimited block, returning its contents and the offset
    /// at which they start.
    fn block(&mut self) -> Result<(&'s str, usize), ParseError> {
        self.skip_blank();

        let rest = self.rest();
        if !rest.starts_with('{') {
            return Err(ParseError::MissingDelimiter('{'));
        }

        let end = matching_close(rest).ok_or(ParseError::MissingDelimiter('}'))?;
        let start = self.offset + 1;
        self.offset += end + 1;

        Ok((&rest[1..end], start))
    }
}

/// The index of the brace closing the one `text` starts with.
fn matching_close(text: &str) -> Option<usize> {
    let mut depth = 0usize;

    for (i, c) in text.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;

                if depth == 0 {
                    return Some(i);
                }
            },
            _ => {},
        }
    }

    None
}

/// Splits a body on top-level commas, yielding each entry with its offset
/// into `body`.
fn split_entries(body: &str) -> Vec<(usize, &str)> {
    let mut entries = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;

    for (i, c) in body.char_indices() {
        match c {
            '(' | '{' => depth += 1,
            ')' | '}' => depth -= 1,
            ',' if depth <= 0 => {
                entries.push((start, &body[start..i]));
                start = i + 1;
            },
            _ => {},
        }
    }

    entries.push((start, &body[start..]));
    entries
        .into_iter()
        .filter(|(_, entry)| !entry.trim().is_empty())
        .collect()
}

fn parse_selector(word: &str) -> Result<Selector, ParseError> {
    if word.get(1..2) == Some("/") {
        let (matcher, rest) = IdentMatcher::parse_prefix(word)?;

        let subregion = rest
            .strip_prefix('.')
            .ok_or_else(|| ParseError::BadSelector(word.to_owned()))?;

        let context = Context::parse(&format!("window.{}", subregion))
            .or_else(|| Context::parse(subregion))
            .filter(|context| context.target() == TargetKind::Window)
            .ok_or_else(|| ParseError::BadSelector(word.to_owned()))?;

        Ok(Selector::Extended(matcher, context))
    } else {
        Context::parse(word)
            .map(Selector::Base)
            .ok_or_else(|| ParseError::BadSelector(word.to_owned()))
    }
}

/// Parses an action file into its sections. Macro definitions are expanded
/// in place; malformed entries become diagnostics.
pub fn parse_sections(
    file: &str,
    text: &str,
    keys: &dyn KeyResolver,
    screen: Dim,
) -> Parsed<Section> {
    let mut parsed = Parsed::default();
    let mut macros: HashMap<String, String> = HashMap::new();
    let mut scanner = Scanner {
        text,
        offset: 0,
    };

    loop {
        scanner.skip_blank();

        if scanner.rest().is_empty() {
            break;
        }

        let line = scanner.line_at(scanner.offset);

        // regular expressions may contain blanks and braces
        let word = if scanner.rest().get(1..2) == Some("/") {
            match IdentMatcher::parse_prefix(scanner.rest()) {
                Ok((_, rest)) => {
                    let consumed = scanner.rest().len() - rest.len();
                    let start = scanner.offset;
                    scanner.offset += consumed;
                    scanner.word();
                    &text[start..scanner.offset]
                },
                Err(err) => {
                    parsed.diagnose(file, line, err);
                    break;
                },
            }
        } else {
            scanner.word()
        };

        if word.is_empty() {
            // a stray brace; skip its block
            if let Err(err) = scanner.block() {
                parsed.diagnose(file, line, err);
                break;
            }

            continue;
        }

        if word == "DEF" {
            scanner.skip_blank();
            let name = scanner.word().to_owned();

            match scanner.block() {
                Ok((body, _)) => {
                    macros.insert(name, body.to_owned());
                },
                Err(err) => {
                    parsed.diagnose(file, line, err);
                    break;
                },
            }

            continue;
        }

        let (body, body_start) = match scanner.block() {
            Ok(block) => block,
            Err(err) => {
                parsed.diagnose(file, line, err);
                break;
            },
        };

        let selector = match parse_selector(word) {
            Ok(selector) => selector,
            Err(err) => {
                parsed.diagnose(file, line, err);
                continue;
            },
        };

        let mut bindings = Vec::new();
        let target = selector.context().target();
        let mut expansion = BodyExpansion {
            file,
            macros: &macros,
            keys,
            screen,
            target,
        };

        for (offset, entry) in split_entries(body) {
            let line = scanner.line_at(body_start + offset + leading_blank(entry));
            expansion.entry(entry, line, 0, &mut bindings, &mut parsed);
        }

        parsed.push(Section {
            selector,
            bindings,
        });
    }

    parsed
}

#[inline]
fn leading_blank(entry: &str) -> usize {
    entry.len() - entry.trim_start().len()
}

struct BodyExpansion<'e> {
    file: &'e str,
    macros: &'e HashMap<String, String>,
    keys: &'e dyn KeyResolver,
    screen: Dim,
    target: TargetKind,
}

impl<'e> BodyExpansion<'e> {
    fn entry(
        &mut self,
        entry: &str,
        line: usize,
        depth: usize,
        bindings: &mut Vec<Binding>,
        parsed: &mut Parsed<Section>,
    ) {
        let trimmed = entry.trim();

        if let Some(body) = self.macros.get(trimmed) {
            if depth >= MAX_MACRO_DEPTH {
                parsed.diagnose(
                    self.file,
                    line,
                    ParseError::BadValue("DEF".to_owned(), trimmed.to_owned()),
                );
                return;
            }

            for (_, entry) in split_entries(body) {
                self.entry(entry, line, depth + 1, bindings, parsed);
            }

            return;
        }

        match Binding::parse_entry(trimmed, self.target, self.keys, self.screen) {
            Ok(binding) => bindings.push(binding),
            Err(err) => parsed.diagnose(self.file, line, err),
        }
    }
}
