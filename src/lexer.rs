use std::collections::VecDeque;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{trace, warn};

use crate::token::{Token, TokenKind, TokenList};

/// Characters that may follow a backslash inside a control code.
const SLASH_CHARACTERS: &str =
    "abcdefghijklmnopqrstuvxzwyABCDEFGHIJKLMNOPQRSTUVXZWY0123456789[]{}()\\/<>!|$^.";

/// Characters emitted one at a time as raw delimiters.
const RAW_CHARACTERS: &str =
    "\u{3000}\t\n・･！？。…「」『』()（）/\"“”[]【】<>〈〉：:*＊_＿#$%=";

/// Latin letters and punctuation kept out of translation as raw runs.
const IGNORED_CHARACTERS: &str = "abcdefghijklmnopqrstuvxzwyABCDEFGHIJKLMNOPQRSTUVXZWYａｂｃｄｅｆｇｈｉｊｋｌｍｎｏｐｑｒｓｔｕｖｘｚｗｙＡＢＣＤＥＦＧＨＩＪＫＬＭＮＯＰＱＲＳＴＵＶＸＺＷＹ.,!?";

const NUMBERS: &str = "0123456789０１２３４５６７８９";

/// Counter suffixes absorbed into a preceding number.
const NUMBER_ENDINGS: &str = "つ十百千万";
const NUMBER_ADDITIONS: &str = "%％階";

static SYMBOL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\p{S}$").unwrap());

/// True when `c` belongs to one of the Unicode symbol categories.
fn is_symbol(c: char) -> bool {
    let mut buf = [0u8; 4];
    SYMBOL.is_match(c.encode_utf8(&mut buf))
}

/// Returns true if the raw value holds any Latin or ASCII punctuation
/// character that the scanner keeps out of translation.
pub(crate) fn contains_ignored(value: &str) -> bool {
    value.chars().any(|c| IGNORED_CHARACTERS.contains(c))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Text,
    Script,
    LeftDelim,
    RightDelim,
    InsideAction,
    RubyBlock,
    Number,
}

/// Pull-based scanner over one text unit.
///
/// Tokens come out strictly left to right. The stream ends after the first
/// `EndOfInput` or `Error` token and is never restarted.
pub struct Lexer<'a> {
    input: &'a str,
    state: Option<State>,
    /// Byte offset of the next rune to read.
    pos: usize,
    /// Start of the pending span.
    start: usize,
    /// Width of the last rune read, zero at end of input.
    width: usize,
    paren_depth: i32,
    pending: VecDeque<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            state: Some(State::Text),
            pos: 0,
            start: 0,
            width: 0,
            paren_depth: 0,
            pending: VecDeque::new(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn next_char(&mut self) -> Option<char> {
        match self.rest().chars().next() {
            Some(c) => {
                self.width = c.len_utf8();
                self.pos += self.width;
                Some(c)
            }
            None => {
                self.width = 0;
                None
            }
        }
    }

    /// Steps back over the last rune read. Only valid once per `next_char`.
    fn backup(&mut self) {
        self.pos -= self.width;
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn emit(&mut self, kind: TokenKind) {
        let value = &self.input[self.start..self.pos];
        self.pending.push_back(Token::new(kind, value, self.start));
        self.start = self.pos;
    }

    /// Emits everything before the rune just read, leaving that rune unread.
    fn emit_before(&mut self, kind: TokenKind) {
        self.backup();
        if self.pos > self.start {
            self.emit(kind);
        }
    }

    fn accept(&mut self, valid: &str) -> bool {
        match self.next_char() {
            Some(c) if valid.contains(c) => true,
            _ => {
                self.backup();
                false
            }
        }
    }

    fn accept_run(&mut self, valid: &str) {
        while self.accept(valid) {}
    }

    fn error(&mut self, message: String) -> Option<State> {
        self.pending
            .push_back(Token::new(TokenKind::Error, message, self.start));
        None
    }

    fn step(&mut self, state: State) -> Option<State> {
        match state {
            State::Text => self.lex_text(),
            State::Script => self.lex_script(),
            State::LeftDelim => self.lex_left_delim(),
            State::RightDelim => self.lex_right_delim(),
            State::InsideAction => self.lex_inside_action(),
            State::RubyBlock => self.lex_ruby_block(),
            State::Number => self.lex_number(),
        }
    }

    fn lex_text(&mut self) -> Option<State> {
        trace!("lex_text {:?}", self.rest());
        self.width = 0;

        while let Some(c) = self.next_char() {
            match c {
                '%' if self.peek() == Some('s') => {
                    self.emit_before(TokenKind::Text);
                    self.next_char();
                    if self.accept("s") {
                        self.emit(TokenKind::RawDelimiter);
                    }
                }
                'i' | 'e'
                    if (c == 'i' && self.rest().starts_with("f("))
                        || (c == 'e' && self.rest().starts_with("n(")) =>
                {
                    self.emit_before(TokenKind::Text);
                    return Some(State::Script);
                }
                '\\' | '@' => {
                    self.emit_before(TokenKind::Text);
                    return Some(State::Script);
                }
                '#' if self.peek() == Some('{') => {
                    self.emit_before(TokenKind::Text);
                    return Some(State::RubyBlock);
                }
                c if NUMBERS.contains(c) => {
                    self.emit_before(TokenKind::Text);
                    return Some(State::Number);
                }
                c if RAW_CHARACTERS.contains(c) || is_symbol(c) => {
                    self.emit_before(TokenKind::Text);
                    self.next_char();
                    self.emit(TokenKind::RawDelimiter);
                    return Some(State::Text);
                }
                '-' if self.peek() == Some('-') => {
                    self.emit_before(TokenKind::Text);
                    self.accept_run("-");
                    self.emit(TokenKind::RawDelimiter);
                }
                c if IGNORED_CHARACTERS.contains(c) => {
                    self.emit_before(TokenKind::Text);
                    // Spaces only join Latin words when no conditional follows,
                    // otherwise the predicate would be swallowed.
                    let rest = self.rest();
                    if !rest.contains("if(") && !rest.contains("en(") {
                        self.accept_run(&format!("{} ", IGNORED_CHARACTERS));
                    } else {
                        self.accept_run(IGNORED_CHARACTERS);
                    }
                    self.emit(TokenKind::RawDelimiter);
                    return Some(State::Text);
                }
                _ => {}
            }
        }

        if self.pos > self.start {
            self.emit(TokenKind::Text);
        }
        self.emit(TokenKind::EndOfInput);
        None
    }

    fn lex_script(&mut self) -> Option<State> {
        trace!("lex_script {:?}", self.rest());

        loop {
            match self.next_char() {
                None => {
                    warn!(
                        "script not terminated properly {:?}",
                        &self.input[self.start..]
                    );
                    break;
                }
                Some('(') => {
                    self.emit_before(TokenKind::ScriptFragment);
                    self.next_char();
                    self.emit(TokenKind::LeftParen);
                    self.paren_depth += 1;
                    return Some(State::InsideAction);
                }
                Some('[') => {
                    self.backup();
                    self.emit(TokenKind::ScriptFragment);
                    return Some(State::LeftDelim);
                }
                Some('\\') => {
                    self.accept_run(SLASH_CHARACTERS);
                    break;
                }
                Some('\n') => {
                    self.accept_run("[0123456789]");
                    break;
                }
                Some('@') => {
                    self.accept_run("0123456789-");
                    break;
                }
                Some(_) => {}
            }
        }

        self.emit(TokenKind::ScriptFragment);
        Some(State::Text)
    }

    fn lex_left_delim(&mut self) -> Option<State> {
        self.next_char();
        self.emit(TokenKind::LeftBracket);
        Some(State::InsideAction)
    }

    fn lex_right_delim(&mut self) -> Option<State> {
        self.next_char();
        self.emit(TokenKind::RightBracket);
        trace!("paren depth {}", self.paren_depth);

        if self.paren_depth == 0 {
            Some(State::Text)
        } else {
            Some(State::InsideAction)
        }
    }

    /// Scans one rune of a parameter list.
    fn lex_inside_action(&mut self) -> Option<State> {
        match self.next_char() {
            None => return self.error("unclosed action".to_string()),
            Some('(') => {
                self.emit_before(TokenKind::Parameter);
                self.next_char();
                self.emit(TokenKind::LeftParen);
                self.paren_depth += 1;
            }
            Some(')') => {
                self.emit_before(TokenKind::Parameter);
                self.next_char();
                self.emit(TokenKind::RightParen);
                self.paren_depth -= 1;

                if self.paren_depth < 0 {
                    return self.error(format!("unexpected right paren at byte {}", self.start));
                }
                if self.paren_depth == 0 {
                    return Some(State::Text);
                }
            }
            Some('[') => {
                self.emit_before(TokenKind::Parameter);
                return Some(State::LeftDelim);
            }
            Some(']') => {
                self.emit_before(TokenKind::Parameter);
                return Some(State::RightDelim);
            }
            Some('%') => {
                if self.accept("s") {
                    self.emit(TokenKind::Parameter);
                }
            }
            Some('"') => {
                self.emit(TokenKind::Parameter);
                return Some(State::Text);
            }
            Some(_) => {}
        }

        Some(State::InsideAction)
    }

    fn lex_ruby_block(&mut self) -> Option<State> {
        trace!("lex_ruby_block {:?}", self.rest());
        let mut opened = 0;

        loop {
            match self.next_char() {
                None => {
                    warn!(
                        "ruby block not terminated properly {:?}",
                        &self.input[self.start..]
                    );
                    break;
                }
                Some('{') => opened += 1,
                Some('}') => {
                    opened -= 1;
                    if opened <= 0 {
                        break;
                    }
                }
                Some(_) => {}
            }
        }

        self.emit(TokenKind::RubyBlock);
        Some(State::Text)
    }

    fn lex_number(&mut self) -> Option<State> {
        loop {
            match self.next_char() {
                None => break,
                Some(c) if NUMBERS.contains(c) => self.accept_run(NUMBERS),
                // At most one suffix.
                Some(c) if NUMBER_ENDINGS.contains(c) || NUMBER_ADDITIONS.contains(c) => break,
                Some(_) => {
                    self.backup();
                    break;
                }
            }
        }

        self.emit(TokenKind::Number);
        Some(State::Text)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Some(token);
            }
            let state = self.state?;
            self.state = self.step(state);
        }
    }
}

/// Error returned when a unit cannot be scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanError {
    pub message: String,
    pub position: usize,
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "failed to parse text: {} (byte {})",
            self.message, self.position
        )
    }
}

impl std::error::Error for ScanError {}

/// Scans `input` to completion.
///
/// The returned list always ends with the terminal token. When that token is
/// an `Error` the error is returned alongside the partial list.
pub fn tokenize(input: &str) -> (TokenList, Option<ScanError>) {
    let mut tokens = TokenList::new();
    let mut error = None;

    for token in Lexer::new(input) {
        if token.kind == TokenKind::Error {
            error = Some(ScanError {
                message: token.value.clone(),
                position: token.position,
            });
        }
        tokens.push(token);
    }

    (tokens, error)
}
