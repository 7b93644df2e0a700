use std::fmt;

use thiserror::Error;

/// Everything that can go wrong while reading an rc, style, action or menu
/// file. None of these abort loading; the offending entry is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown action \"{0}\"")]
    UnknownAction(String),
    #[error("missing '{0}'")]
    MissingDelimiter(char),
    #[error("malformed event specification \"{0}\"")]
    BadEventSpec(String),
    #[error("action \"{0}\" requires a parameter")]
    MissingParameter(String),
    #[error("unable to resolve key \"{0}\"")]
    BadKey(String),
    #[error("invalid regular expression \"{0}\": {1}")]
    BadRegex(String, String),
    #[error("unknown selector \"{0}\"")]
    BadSelector(String),
    #[error("malformed menu entry \"{0}\"")]
    BadMenuEntry(String),
    #[error("unable to read \"{0}\": {1}")]
    Unreadable(String, String),
    #[error("invalid value \"{1}\" for \"{0}\"")]
    BadValue(String, String),
    #[error("no menu named \"{0}\"")]
    UnknownMenu(String),
}

/// A parse error tagged with where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: String,
    pub line: usize,
    pub error: ParseError,
}

impl Diagnostic {
    pub fn new(
        file: impl Into<String>,
        line: usize,
        error: ParseError,
    ) -> Self {
        Self {
            file: file.into(),
            line,
            error,
        }
    }

    #[inline]
    pub fn report(&self) {
        warn!("{}", self);
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}:{}: {}", self.file, self.line, self.error)
    }
}

/// The outcome of a lenient parse: every entry that made it, and a
/// diagnostic for every one that did not.
#[derive(Debug)]
pub struct Parsed<T> {
    pub items: Vec<T>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            diagnostics: Vec::new(),
        }
    }
}

impl<T> Parsed<T> {
    #[inline]
    pub fn push(
        &mut self,
        item: T,
    ) {
        self.items.push(item);
    }

    #[inline]
    pub fn diagnose(
        &mut self,
        file: &str,
        line: usize,
        error: ParseError,
    ) {
        self.diagnostics.push(Diagnostic::new(file, line, error));
    }

    /// Logs every diagnostic and hands back the surviving entries.
    pub fn report(self) -> Vec<T> {
        self.diagnostics.iter().for_each(Diagnostic::report);
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_carry_location() {
        let mut parsed: Parsed<u32> = Parsed::default();
        parsed.push(1);
        parsed.diagnose("action", 7, ParseError::UnknownAction("frobnicate".into()));

        assert_eq!(parsed.items, vec![1]);
        assert_eq!(
            parsed.diagnostics[0].to_string(),
            "action:7: unknown action \"frobnicate\""
        );
    }
}
