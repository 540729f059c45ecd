//! Classification of individual QIF lines.

/// One line of a QIF file.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Line<'a> {
    /// Nothing but whitespace.
    Blank,
    /// `^`, the end of a record.
    Terminator,
    /// A line starting with `!`, e.g. `!Type:Bank`. Holds the whole line.
    Header(&'a str),
    /// Any other line: a one-character field code followed by its (possibly empty) value.
    Field { code: char, value: &'a str },
}

impl<'a> Line<'a> {
    /// Classifies a raw line. Surrounding whitespace is removed first.
    pub fn classify(raw: &'a str) -> Self {
        let line = raw.trim();
        let mut chars = line.chars();
        match chars.next() {
            None => Line::Blank,
            Some('^') if line.len() == 1 => Line::Terminator,
            Some('!') => Line::Header(line),
            Some(code) => Line::Field {
                code,
                value: chars.as_str(),
            },
        }
    }

    /// The field code, if this is a field line.
    pub fn code(&self) -> Option<char> {
        match self {
            Line::Field { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// The recognised section headers.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Header<'a> {
    /// `!Account`
    Account,
    /// `!Type:<label>`
    Type(&'a str),
    /// `!Option:AutoSwitch`
    AutoSwitch,
    /// Anything else starting with `!`, such as `!Clear:AutoSwitch`.
    Other(&'a str),
}

impl<'a> Header<'a> {
    pub fn parse(text: &'a str) -> Self {
        match text {
            "!Account" => Header::Account,
            "!Option:AutoSwitch" => Header::AutoSwitch,
            _ => match text.strip_prefix("!Type:") {
                Some(label) => Header::Type(label),
                None => Header::Other(text),
            },
        }
    }
}
