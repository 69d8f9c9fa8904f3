mod helpers;
mod xml;

use helpers::{is_digit, is_identifier_char, is_word_boundary};
use thiserror::Error;
use token::{Located, MAX_INT_CONST, Position, Token, look_up_keyword, look_up_symbol};

pub use xml::tokens_to_xml;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexicalError {
    #[error("bad token '{text}'")]
    UnrecognizedToken { text: String, position: Position },
    #[error("integer constant '{text}' is larger than {max}", max = MAX_INT_CONST)]
    IntegerOutOfRange { text: String, position: Position },
    #[error("string constant is not closed on the same line")]
    UnterminatedString { position: Position },
    #[error("block comment is never closed")]
    UnterminatedComment { position: Position },
    #[error("string constant contains a character outside ASCII")]
    InvalidCharacter { position: Position },
}

impl LexicalError {
    pub fn position(&self) -> Position {
        match self {
            Self::UnrecognizedToken { position, .. }
            | Self::IntegerOutOfRange { position, .. }
            | Self::UnterminatedString { position }
            | Self::UnterminatedComment { position }
            | Self::InvalidCharacter { position } => *position,
        }
    }
}

#[derive(Debug)]
pub struct Lexer<'a> {
    input: &'a str,
    // points to the char in the input that corresponds to the ch
    position: usize,
    // points to the next char in the input
    read_position: usize,
    // ascii only
    ch: u8,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer {
            input,
            position: 0,
            read_position: 0,
            ch: u8::default(),
            line: 1,
            column: 0,
        };

        lexer.init();
        lexer
    }

    fn init(&mut self) {
        self.read_char();
    }

    /// Returns the next token. Once the input is exhausted every call yields
    /// `Token::Eof`.
    pub fn next_token(&mut self) -> Result<Located, LexicalError> {
        self.skip_trivia()?;

        let position = self.cur_position();

        if self.is_eof() {
            return Ok(Located::new(Token::Eof, position));
        }

        let tok = match self.ch {
            b'"' => Token::StringConst(self.read_string(position)?),
            ch => match look_up_symbol(ch) {
                Some(symbol) => symbol,
                None => return self.read_word(position),
            },
        };

        self.read_char();
        Ok(Located::new(tok, position))
    }

    fn skip_trivia(&mut self) -> Result<(), LexicalError> {
        loop {
            while !self.is_eof() && self.ch.is_ascii_whitespace() {
                self.read_char();
            }

            if self.ch != b'/' || self.is_eof() {
                return Ok(());
            }

            match self.peek_char() {
                b'/' => self.skip_line_comment(),
                b'*' => self.skip_block_comment()?,
                _ => return Ok(()),
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while !self.is_eof() && self.ch != b'\n' {
            self.read_char();
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), LexicalError> {
        let position = self.cur_position();

        // step over the opening "/*"
        self.read_char();
        self.read_char();

        loop {
            if self.is_eof() {
                return Err(LexicalError::UnterminatedComment { position });
            }
            if self.ch == b'*' && self.peek_char() == b'/' {
                self.read_char();
                self.read_char();
                return Ok(());
            }
            self.read_char();
        }
    }

    /// Reads up to the closing quote, leaving `ch` on it. No escape
    /// sequences are recognised, and every character must be ASCII so each
    /// one fits an integer constant.
    fn read_string(&mut self, position: Position) -> Result<String, LexicalError> {
        let start = self.position + 1;
        loop {
            self.read_char();
            if self.is_eof() || self.ch == b'\n' || self.ch == b'\r' {
                return Err(LexicalError::UnterminatedString { position });
            }
            if !self.ch.is_ascii() {
                return Err(LexicalError::InvalidCharacter {
                    position: self.cur_position(),
                });
            }
            if self.ch == b'"' {
                break;
            }
        }
        Ok(self.input[start..self.position].to_string())
    }

    fn read_word(&mut self, position: Position) -> Result<Located, LexicalError> {
        let start = self.position;
        while !self.is_eof() && !is_word_boundary(self.ch) {
            self.read_char();
        }

        let word = &self.input[start..self.position];
        classify(word, position).map(|token| Located::new(token, position))
    }

    fn cur_position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn is_eof(&self) -> bool {
        self.position >= self.input.len()
    }

    fn peek_char(&self) -> u8 {
        self.input
            .as_bytes()
            .get(self.read_position)
            .copied()
            .unwrap_or(0)
    }

    fn read_char(&mut self) {
        if self.ch == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        self.ch = self
            .input
            .as_bytes()
            .get(self.read_position)
            .copied()
            .unwrap_or(0);
        self.position = self.read_position;
        self.read_position += 1;
    }
}

/// Classifies a maximal run of non-space, non-symbol characters: keyword
/// first, then integer constant, then identifier.
fn classify(word: &str, position: Position) -> Result<Token, LexicalError> {
    if let Some(keyword) = look_up_keyword(word) {
        return Ok(keyword);
    }

    if word.chars().all(is_digit) {
        let significant = word.trim_start_matches('0');
        let value = if significant.is_empty() {
            Some(0)
        } else if significant.len() > 5 {
            None
        } else {
            significant
                .parse::<u16>()
                .ok()
                .filter(|value| *value <= MAX_INT_CONST)
        };

        return value
            .map(Token::IntConst)
            .ok_or_else(|| LexicalError::IntegerOutOfRange {
                text: word.to_string(),
                position,
            });
    }

    let is_identifier = word.chars().next().is_some_and(|first| !is_digit(first))
        && word.chars().all(is_identifier_char);

    if is_identifier {
        Ok(Token::Ident(word.to_string()))
    } else {
        Err(LexicalError::UnrecognizedToken {
            text: word.to_string(),
            position,
        })
    }
}

/// Lexes the whole input up front. The returned sequence always ends with a
/// single `Token::Eof`.
pub fn tokenize(input: &str) -> Result<Vec<Located>, LexicalError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();

    loop {
        let located = lexer.next_token()?;
        let done = located.token == Token::Eof;
        tokens.push(located);

        if done {
            break;
        }
    }

    log::trace!("lexed {} tokens", tokens.len());

    Ok(tokens)
}
