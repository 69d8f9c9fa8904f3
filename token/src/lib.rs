use std::{collections::HashMap, fmt::Display, sync::LazyLock};

/// Largest value an integer constant may carry.
pub const MAX_INT_CONST: u16 = 32767;

#[derive(PartialEq, Debug, Clone, Default, Hash, Eq)]
pub enum Token {
    #[default]
    Eof,

    // Identifiers & literals
    Ident(String),
    IntConst(u16),
    StringConst(String),

    // Symbols
    Lbrace,
    Rbrace,
    Lparen,
    Rparen,
    Lbracket,
    Rbracket,
    Dot,
    Comma,
    Semicolon,
    Plus,
    Minus,
    Asterisk,
    Slash,
    Ampersand,
    Pipe,
    Lt,
    Gt,
    Equals,
    Tilde,

    // Keywords
    Class,
    Constructor,
    Function,
    Method,
    Field,
    Static,
    Var,
    Int,
    Char,
    Boolean,
    Void,
    True,
    False,
    Null,
    This,
    Let,
    Do,
    If,
    Else,
    While,
    Return,
}

/// The lexical category of a token, as named by the token XML dump.
#[derive(PartialEq, Debug, Clone, Copy, Eq)]
pub enum TokenKind {
    Keyword,
    Symbol,
    Identifier,
    IntegerConstant,
    StringConstant,
    Eof,
}

impl TokenKind {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Symbol => "symbol",
            Self::Identifier => "identifier",
            Self::IntegerConstant => "integerConstant",
            Self::StringConstant => "stringConstant",
            Self::Eof => "eof",
        }
    }
}

pub trait TokenLiteral {
    fn token_literal(&self) -> String;
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.token_literal())
    }
}

impl TokenLiteral for Token {
    fn token_literal(&self) -> String {
        match self {
            Token::Eof => "end of file".to_string(),
            Token::Ident(v) => v.to_string(),
            Token::IntConst(v) => v.to_string(),
            Token::StringConst(v) => v.to_string(),
            Token::Lbrace => "{".to_string(),
            Token::Rbrace => "}".to_string(),
            Token::Lparen => "(".to_string(),
            Token::Rparen => ")".to_string(),
            Token::Lbracket => "[".to_string(),
            Token::Rbracket => "]".to_string(),
            Token::Dot => ".".to_string(),
            Token::Comma => ",".to_string(),
            Token::Semicolon => ";".to_string(),
            Token::Plus => "+".to_string(),
            Token::Minus => "-".to_string(),
            Token::Asterisk => "*".to_string(),
            Token::Slash => "/".to_string(),
            Token::Ampersand => "&".to_string(),
            Token::Pipe => "|".to_string(),
            Token::Lt => "<".to_string(),
            Token::Gt => ">".to_string(),
            Token::Equals => "=".to_string(),
            Token::Tilde => "~".to_string(),
            Token::Class => "class".to_string(),
            Token::Constructor => "constructor".to_string(),
            Token::Function => "function".to_string(),
            Token::Method => "method".to_string(),
            Token::Field => "field".to_string(),
            Token::Static => "static".to_string(),
            Token::Var => "var".to_string(),
            Token::Int => "int".to_string(),
            Token::Char => "char".to_string(),
            Token::Boolean => "boolean".to_string(),
            Token::Void => "void".to_string(),
            Token::True => "true".to_string(),
            Token::False => "false".to_string(),
            Token::Null => "null".to_string(),
            Token::This => "this".to_string(),
            Token::Let => "let".to_string(),
            Token::Do => "do".to_string(),
            Token::If => "if".to_string(),
            Token::Else => "else".to_string(),
            Token::While => "while".to_string(),
            Token::Return => "return".to_string(),
        }
    }
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Eof => TokenKind::Eof,
            Token::Ident(_) => TokenKind::Identifier,
            Token::IntConst(_) => TokenKind::IntegerConstant,
            Token::StringConst(_) => TokenKind::StringConstant,
            Token::Lbrace
            | Token::Rbrace
            | Token::Lparen
            | Token::Rparen
            | Token::Lbracket
            | Token::Rbracket
            | Token::Dot
            | Token::Comma
            | Token::Semicolon
            | Token::Plus
            | Token::Minus
            | Token::Asterisk
            | Token::Slash
            | Token::Ampersand
            | Token::Pipe
            | Token::Lt
            | Token::Gt
            | Token::Equals
            | Token::Tilde => TokenKind::Symbol,
            _ => TokenKind::Keyword,
        }
    }

    /// Binary operators of the expression grammar. They all share one
    /// precedence level.
    pub fn is_binary_op(&self) -> bool {
        matches!(
            self,
            Token::Plus
                | Token::Minus
                | Token::Asterisk
                | Token::Slash
                | Token::Ampersand
                | Token::Pipe
                | Token::Lt
                | Token::Gt
                | Token::Equals
        )
    }

    /// Tokens that may open a statement inside a subroutine body.
    pub fn starts_statement(&self) -> bool {
        matches!(
            self,
            Token::Let | Token::If | Token::While | Token::Do | Token::Return
        )
    }

    /// `int`, `char`, `boolean` or a class name.
    pub fn is_type(&self) -> bool {
        matches!(
            self,
            Token::Int | Token::Char | Token::Boolean | Token::Ident(_)
        )
    }

    /// The token as an XML terminal, `<tag> text </tag>`, with `&`, `<` and
    /// `>` escaped.
    pub fn to_xml(&self) -> String {
        let tag = self.kind().tag();
        let text = self
            .token_literal()
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;");

        format!("<{tag}> {text} </{tag}>")
    }
}

/// Returns the symbol token for `ch`, if it is one of the fixed punctuation
/// characters.
pub fn look_up_symbol(ch: u8) -> Option<Token> {
    let token = match ch {
        b'{' => Token::Lbrace,
        b'}' => Token::Rbrace,
        b'(' => Token::Lparen,
        b')' => Token::Rparen,
        b'[' => Token::Lbracket,
        b']' => Token::Rbracket,
        b'.' => Token::Dot,
        b',' => Token::Comma,
        b';' => Token::Semicolon,
        b'+' => Token::Plus,
        b'-' => Token::Minus,
        b'*' => Token::Asterisk,
        b'/' => Token::Slash,
        b'&' => Token::Ampersand,
        b'|' => Token::Pipe,
        b'<' => Token::Lt,
        b'>' => Token::Gt,
        b'=' => Token::Equals,
        b'~' => Token::Tilde,
        _ => return None,
    };

    Some(token)
}

static KEYWORDS: LazyLock<HashMap<&'static str, Token>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    map.insert("class", Token::Class);
    map.insert("constructor", Token::Constructor);
    map.insert("function", Token::Function);
    map.insert("method", Token::Method);
    map.insert("field", Token::Field);
    map.insert("static", Token::Static);
    map.insert("var", Token::Var);
    map.insert("int", Token::Int);
    map.insert("char", Token::Char);
    map.insert("boolean", Token::Boolean);
    map.insert("void", Token::Void);
    map.insert("true", Token::True);
    map.insert("false", Token::False);
    map.insert("null", Token::Null);
    map.insert("this", Token::This);
    map.insert("let", Token::Let);
    map.insert("do", Token::Do);
    map.insert("if", Token::If);
    map.insert("else", Token::Else);
    map.insert("while", Token::While);
    map.insert("return", Token::Return);

    map
});

pub fn look_up_keyword(word: &str) -> Option<Token> {
    KEYWORDS.get(word).cloned()
}

/// 1-based line and column of a token's first character.
#[derive(PartialEq, Debug, Clone, Copy, Default, Eq, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A token together with where it starts in the source.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Located {
    pub token: Token,
    pub position: Position,
}

impl Located {
    pub fn new(token: Token, position: Position) -> Self {
        Self { token, position }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(look_up_keyword("class"), Some(Token::Class));
        assert_eq!(look_up_keyword("null"), Some(Token::Null));
        assert_eq!(look_up_keyword("Class"), None);
        assert_eq!(look_up_keyword("classy"), None);
    }

    #[test]
    fn test_kind() {
        assert_eq!(Token::While.kind(), TokenKind::Keyword);
        assert_eq!(Token::Tilde.kind(), TokenKind::Symbol);
        assert_eq!(Token::Ident("x".into()).kind(), TokenKind::Identifier);
        assert_eq!(Token::IntConst(3).kind(), TokenKind::IntegerConstant);
        assert_eq!(
            Token::StringConst("s".into()).kind(),
            TokenKind::StringConstant
        );
    }

    #[test]
    fn test_symbols_round_trip_through_literal() {
        for ch in b"{}()[].,;+-*/&|<>=~" {
            let token = look_up_symbol(*ch).unwrap();
            assert_eq!(token.token_literal(), (*ch as char).to_string());
        }
        assert_eq!(look_up_symbol(b'!'), None);
    }

    #[test]
    fn test_to_xml() {
        assert_eq!(Token::Lt.to_xml(), "<symbol> &lt; </symbol>");
        assert_eq!(Token::Ampersand.to_xml(), "<symbol> &amp; </symbol>");
        assert_eq!(Token::Return.to_xml(), "<keyword> return </keyword>");
        assert_eq!(
            Token::StringConst("a > b".into()).to_xml(),
            "<stringConstant> a &gt; b </stringConstant>"
        );
    }
}
