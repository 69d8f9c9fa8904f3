mod tree;

use std::{fmt::Display, mem};
use thiserror::Error;
use token::{Located, Position, Token, TokenLiteral};

pub use tree::{Element, TreeWriter};

/// Grammar productions a syntax error can be attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Production {
    Class,
    ClassVarDec,
    SubroutineDec,
    ParameterList,
    VarDec,
    Statement,
    LetStatement,
    IfStatement,
    WhileStatement,
    DoStatement,
    ReturnStatement,
    Expression,
    Term,
    SubroutineCall,
    ExpressionList,
}

impl Display for Production {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Class => "class",
            Self::ClassVarDec => "class variable declaration",
            Self::SubroutineDec => "subroutine declaration",
            Self::ParameterList => "parameters",
            Self::VarDec => "variable declaration",
            Self::Statement => "statement",
            Self::LetStatement => "let statement",
            Self::IfStatement => "if statement",
            Self::WhileStatement => "while statement",
            Self::DoStatement => "do statement",
            Self::ReturnStatement => "return statement",
            Self::Expression => "expression",
            Self::Term => "term",
            Self::SubroutineCall => "subroutine call",
            Self::ExpressionList => "expression list",
        };
        write!(f, "{name}")
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("syntax error: invalid {production}: expected {expected}, found '{found}'")]
pub struct SyntaxError {
    pub position: Position,
    pub production: Production,
    pub expected: String,
    pub found: String,
}

/// A forward-only cursor over a fully lexed token sequence.
///
/// The sequence must end with `Token::Eof`; advancing past it is a no-op, so
/// the cursor never runs off the end no matter how recovery skips.
///
/// A cursor built with [`Parser::with_tree`] also records every consumed
/// token, together with the elements opened and closed around them, as a
/// parse tree.
#[derive(Debug)]
pub struct Parser {
    tokens: Vec<Located>,
    position: usize,
    tree: Option<TreeWriter>,
}

impl Parser {
    pub fn new(mut tokens: Vec<Located>) -> Self {
        if tokens.last().is_none_or(|last| last.token != Token::Eof) {
            let position = tokens.last().map(|last| last.position).unwrap_or_default();
            tokens.push(Located::new(Token::Eof, position));
        }

        Self {
            tokens,
            position: 0,
            tree: None,
        }
    }

    pub fn with_tree(tokens: Vec<Located>) -> Self {
        Self {
            tree: Some(TreeWriter::default()),
            ..Self::new(tokens)
        }
    }

    pub fn cur_token(&self) -> &Token {
        &self.tokens[self.position].token
    }

    pub fn peek_token(&self) -> &Token {
        let next = (self.position + 1).min(self.tokens.len() - 1);
        &self.tokens[next].token
    }

    pub fn cur_position(&self) -> Position {
        self.tokens[self.position].position
    }

    /// Index of the current token, used to tell whether recovery made
    /// progress.
    pub fn offset(&self) -> usize {
        self.position
    }

    pub fn next_token(&mut self) {
        if let Some(tree) = self.tree.as_mut() {
            let token = &self.tokens[self.position].token;
            if token != &Token::Eof {
                tree.terminal(token);
            }
        }

        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    pub fn open(&mut self, element: Element) {
        if let Some(tree) = self.tree.as_mut() {
            tree.open(element);
        }
    }

    pub fn close(&mut self, element: Element) {
        if let Some(tree) = self.tree.as_mut() {
            tree.close(element);
        }
    }

    /// The recorded parse tree, or `None` when the cursor was not built to
    /// record one.
    pub fn take_tree(&mut self) -> Option<String> {
        self.tree.take().map(TreeWriter::finish)
    }

    pub fn is_eof(&self) -> bool {
        self.cur_token() == &Token::Eof
    }

    /// Compares variants only, so `Token::Ident(String::default())` matches
    /// any identifier.
    pub fn cur_token_is(&self, token: &Token) -> bool {
        mem::discriminant(self.cur_token()) == mem::discriminant(token)
    }

    pub fn peek_token_is(&self, token: &Token) -> bool {
        mem::discriminant(self.peek_token()) == mem::discriminant(token)
    }

    /// Consumes the current token if it matches, otherwise reports what the
    /// production wanted.
    pub fn expect(&mut self, token: &Token, production: Production) -> Result<(), SyntaxError> {
        if self.cur_token_is(token) {
            self.next_token();
            return Ok(());
        }

        Err(self.error(production, format!("'{}'", token.token_literal())))
    }

    pub fn expect_ident(&mut self, production: Production) -> Result<String, SyntaxError> {
        match self.cur_token() {
            Token::Ident(name) => {
                let name = name.clone();
                self.next_token();
                Ok(name)
            }
            _ => Err(self.error(production, "an identifier")),
        }
    }

    /// Consumes `int`, `char`, `boolean` or a class name and returns its
    /// spelling.
    pub fn expect_type(&mut self, production: Production) -> Result<String, SyntaxError> {
        if self.cur_token().is_type() {
            let name = self.cur_token().token_literal();
            self.next_token();
            return Ok(name);
        }

        Err(self.error(production, "a type"))
    }

    pub fn error(&self, production: Production, expected: impl Into<String>) -> SyntaxError {
        SyntaxError {
            position: self.cur_position(),
            production,
            expected: expected.into(),
            found: self.cur_token().token_literal(),
        }
    }

    /// The tokens from the current one up to and including `Eof`, for
    /// lookahead that must not move the cursor.
    pub fn remaining(&self) -> impl Iterator<Item = &Located> {
        self.tokens[self.position..].iter()
    }
}
