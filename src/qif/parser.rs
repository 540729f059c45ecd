//! The section state machine that routes lines to the record assembler.

use crate::model::{AccountField, QifData, UNKNOWN_SECTION};
use crate::qif::assembler::{AccountDraft, Assembler, CategoryDraft, TransactionDraft};
use crate::qif::line::{Header, Line};
use crate::qif::normalize::looks_like_date;
use tracing::{debug, info, trace};

/// The parsing mode. Each state that can hold a partially read record owns it.
#[derive(Debug)]
enum State {
    /// Outside of any section. Also the state returned to when a section ends, where headerless
    /// blocks are classified by `Parser::on_start`.
    Start,
    /// Inside `!Account`. Holds the open record, if any.
    Accounts(Option<AccountDraft>),
    /// Inside `!Type:<label>` or a headerless transaction run.
    Transactions {
        section_type: String,
        draft: Option<TransactionDraft>,
    },
    /// A single headerless category definition.
    Category(CategoryDraft),
}

/// What to do with the current line after a handler ran.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Flow {
    /// Move on to the next line.
    Next,
    /// The state changed and the same line must be handled again in the new state.
    Again,
}

/// Parses QIF text. Malformed records are dropped, never reported as errors.
pub fn parse(text: &str) -> QifData {
    let lines: Vec<Line<'_>> = text.lines().map(Line::classify).collect();
    let mut parser = Parser::new();
    let mut ix = 0;
    while let Some(line) = lines.get(ix).copied() {
        let next = lines.get(ix + 1).copied();
        if parser.step(line, next) == Flow::Next {
            ix += 1;
        }
    }
    let data = parser.finish();
    info!(
        "Parsed {} accounts, {} categories, {} transactions",
        data.accounts.len(),
        data.categories.len(),
        data.transactions.len()
    );
    data
}

struct Parser {
    state: State,
    assembler: Assembler,
}

impl Parser {
    fn new() -> Self {
        Self {
            state: State::Start,
            assembler: Assembler::new(),
        }
    }

    fn step(&mut self, line: Line<'_>, next: Option<Line<'_>>) -> Flow {
        let state = std::mem::replace(&mut self.state, State::Start);
        let (state, flow) = match state {
            State::Start => self.on_start(line, next),
            State::Accounts(draft) => self.on_account(draft, line),
            State::Transactions {
                section_type,
                draft,
            } => self.on_transaction(section_type, draft, line),
            State::Category(draft) => self.on_category(draft, line),
        };
        self.state = state;
        flow
    }

    fn on_start(&mut self, line: Line<'_>, next: Option<Line<'_>>) -> (State, Flow) {
        match line {
            Line::Blank | Line::Terminator => (State::Start, Flow::Next),
            Line::Header(text) => match Header::parse(text) {
                Header::Account => (State::Accounts(None), Flow::Next),
                Header::Type(label) => (transactions(label), Flow::Next),
                Header::AutoSwitch => (State::Start, Flow::Next),
                Header::Other(text) => {
                    debug!("Skipping unsupported header '{text}'");
                    (State::Start, Flow::Next)
                }
            },
            Line::Field { code: 'N', .. } => match next {
                Some(Line::Field { code: 'D', value }) => {
                    if looks_like_date(value) {
                        trace!("Headerless block with a dated 'D' line, reading transactions");
                        (transactions(UNKNOWN_SECTION), Flow::Again)
                    } else {
                        trace!("Headerless block with a described 'D' line, reading a category");
                        (State::Category(CategoryDraft::default()), Flow::Again)
                    }
                }
                _ => (State::Start, Flow::Next),
            },
            Line::Field { code: 'D', value } if looks_like_date(value) => {
                trace!("Headerless block starting with a date, reading transactions");
                (transactions(UNKNOWN_SECTION), Flow::Again)
            }
            Line::Field { code, .. } => {
                trace!("Skipping '{code}' line outside of any section");
                (State::Start, Flow::Next)
            }
        }
    }

    fn on_account(&mut self, draft: Option<AccountDraft>, line: Line<'_>) -> (State, Flow) {
        match line {
            Line::Blank => (State::Accounts(draft), Flow::Next),
            Line::Terminator => {
                if let Some(draft) = draft {
                    self.assembler.commit_account(draft);
                }
                (State::Accounts(None), Flow::Next)
            }
            Line::Header(text) if Header::parse(text) == Header::AutoSwitch => {
                (State::Accounts(draft), Flow::Next)
            }
            Line::Header(_) => {
                if let Some(draft) = draft {
                    self.assembler.commit_account(draft);
                }
                (State::Start, Flow::Again)
            }
            Line::Field { code, value } => match draft {
                Some(mut draft) => {
                    draft.set(code, value);
                    (State::Accounts(Some(draft)), Flow::Next)
                }
                None if AccountField::from_code(code).is_some() => {
                    let mut draft = AccountDraft::default();
                    draft.set(code, value);
                    (State::Accounts(Some(draft)), Flow::Next)
                }
                None => {
                    debug!("'{code}' line ends the account section");
                    (State::Start, Flow::Again)
                }
            },
        }
    }

    fn on_transaction(
        &mut self,
        section_type: String,
        draft: Option<TransactionDraft>,
        line: Line<'_>,
    ) -> (State, Flow) {
        match line {
            Line::Blank => (
                State::Transactions {
                    section_type,
                    draft,
                },
                Flow::Next,
            ),
            Line::Terminator => {
                if let Some(draft) = draft {
                    self.assembler.commit_transaction(&section_type, draft);
                }
                (
                    State::Transactions {
                        section_type,
                        draft: None,
                    },
                    Flow::Next,
                )
            }
            Line::Header(text) if Header::parse(text) == Header::AutoSwitch => (
                State::Transactions {
                    section_type,
                    draft,
                },
                Flow::Next,
            ),
            Line::Header(_) => {
                if let Some(draft) = draft {
                    self.assembler.commit_transaction(&section_type, draft);
                }
                (State::Start, Flow::Again)
            }
            Line::Field { code, value } => {
                let mut draft = draft.unwrap_or_default();
                draft.set(code, value);
                (
                    State::Transactions {
                        section_type,
                        draft: Some(draft),
                    },
                    Flow::Next,
                )
            }
        }
    }

    fn on_category(&mut self, mut draft: CategoryDraft, line: Line<'_>) -> (State, Flow) {
        match line {
            Line::Blank => (State::Category(draft), Flow::Next),
            Line::Terminator => {
                self.assembler.commit_category(draft);
                (State::Start, Flow::Next)
            }
            Line::Header(text) if Header::parse(text) == Header::AutoSwitch => {
                (State::Category(draft), Flow::Next)
            }
            Line::Header(_) => {
                self.assembler.commit_category(draft);
                (State::Start, Flow::Again)
            }
            Line::Field { code, value } => {
                draft.set(code, value);
                (State::Category(draft), Flow::Next)
            }
        }
    }

    /// End of input acts as a terminator for a record that is still open.
    fn finish(mut self) -> QifData {
        match std::mem::replace(&mut self.state, State::Start) {
            State::Start | State::Accounts(None) => {}
            State::Accounts(Some(draft)) => self.assembler.commit_account(draft),
            State::Transactions {
                section_type,
                draft,
            } => {
                if let Some(draft) = draft {
                    self.assembler.commit_transaction(&section_type, draft);
                }
            }
            State::Category(draft) => self.assembler.commit_category(draft),
        }
        self.assembler.finish()
    }
}

fn transactions(section_type: &str) -> State {
    State::Transactions {
        section_type: section_type.to_string(),
        draft: None,
    }
}
