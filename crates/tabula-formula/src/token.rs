//! Formula tokens

use std::fmt;
use std::ops::Deref;
use tabula_core::{ErrorCode, Value};

/// Operators recognised by the scanner
///
/// `,` and `;` both scan as [`Operator::Semicolon`], the argument separator.
/// [`Operator::End`] never appears in scanned text; the compiler appends it
/// to flush the syntax stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Plus,
    Minus,
    Asterisk,
    Slash,
    Caret,
    Ampersand,
    Percent,
    LeftPar,
    RightPar,
    Semicolon,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Intersect,
    Union,
    CurlyBra,
    CurlyKet,
    Pipe,
    End,
}

impl Operator {
    /// Binding strength used by the shift-reduce compiler
    pub const fn precedence(self) -> i32 {
        match self {
            Operator::Percent => 8,
            Operator::Caret => 7,
            Operator::Slash => 6,
            Operator::Asterisk => 5,
            Operator::Plus | Operator::Minus => 3,
            Operator::Union | Operator::Ampersand | Operator::Intersect => 2,
            Operator::Equal
            | Operator::NotEqual
            | Operator::Less
            | Operator::Greater
            | Operator::LessEqual
            | Operator::GreaterEqual => 1,
            Operator::CurlyBra
            | Operator::CurlyKet
            | Operator::Pipe
            | Operator::Semicolon
            | Operator::RightPar => 0,
            Operator::LeftPar | Operator::End => -1,
        }
    }

    /// Match operator text
    ///
    /// Array punctuation (`{`, `}`, `|`) only matches when inline arrays
    /// are enabled.
    pub fn from_text(text: &str, inline_arrays: bool) -> Option<Operator> {
        let op = match text {
            "+" => Operator::Plus,
            "-" | "\u{2212}" => Operator::Minus,
            "*" | "\u{00D7}" => Operator::Asterisk,
            "/" | "\u{00F7}" | "\u{2215}" => Operator::Slash,
            "^" => Operator::Caret,
            "&" => Operator::Ampersand,
            "%" => Operator::Percent,
            "(" => Operator::LeftPar,
            ")" => Operator::RightPar,
            "," | ";" => Operator::Semicolon,
            "=" | "==" => Operator::Equal,
            "<>" | "!=" => Operator::NotEqual,
            "<" => Operator::Less,
            ">" => Operator::Greater,
            "<=" => Operator::LessEqual,
            ">=" => Operator::GreaterEqual,
            "~" => Operator::Union,
            "{" if inline_arrays => Operator::CurlyBra,
            "}" if inline_arrays => Operator::CurlyKet,
            "|" if inline_arrays => Operator::Pipe,
            _ => return None,
        };
        Some(op)
    }

    pub fn is_comparison(self) -> bool {
        self.precedence() == 1
    }
}

/// Kind of a scanned token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Text the scanner could not classify; makes the token list invalid
    Unknown,
    Boolean,
    Integer,
    Float,
    /// Quoted string, text includes the quotes
    String,
    /// Function name or unresolved bare name
    Identifier,
    /// Single cell reference, optionally sheet-qualified
    Cell,
    /// Range reference or named area
    Range,
    Operator(Operator),
    /// Error literal such as `#N/A`
    Error,
}

/// A token with its source text and character offset
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    kind: TokenKind,
    text: String,
    offset: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, offset: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            offset,
        }
    }

    /// The synthetic end marker appended by the compiler
    pub(crate) fn end(offset: usize) -> Self {
        Self::new(TokenKind::Operator(Operator::End), "", offset)
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Character offset in the formula text, counting the leading `=`
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_operator(&self) -> bool {
        matches!(self.kind, TokenKind::Operator(_))
    }

    pub fn operator(&self) -> Option<Operator> {
        match self.kind {
            TokenKind::Operator(op) => Some(op),
            _ => None,
        }
    }

    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Identifier
    }

    /// Literal value of a Boolean, Integer, Float, String or Error token
    pub fn literal(&self) -> Option<Value> {
        match self.kind {
            TokenKind::Boolean => Some(Value::boolean(self.text.eq_ignore_ascii_case("TRUE"))),
            TokenKind::Integer => match self.text.parse::<i64>() {
                Ok(i) => Some(Value::integer(i)),
                // Too wide for i64
                Err(_) => self.text.parse::<f64>().ok().map(Value::float),
            },
            TokenKind::Float => self.text.parse::<f64>().ok().map(Value::float),
            TokenKind::String => {
                let inner = self.text.strip_prefix('"').unwrap_or(&self.text);
                let inner = inner.strip_suffix('"').unwrap_or(inner);
                Some(Value::text(inner))
            }
            TokenKind::Error => self.text.parse::<ErrorCode>().ok().map(Value::error),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Scanner output: the tokens plus a validity flag
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tokens {
    tokens: Vec<Token>,
    valid: bool,
}

impl Tokens {
    pub(crate) fn new(tokens: Vec<Token>, valid: bool) -> Self {
        Self { tokens, valid }
    }

    /// False when any part of the text could not be tokenized
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// First unknown token, if any
    pub fn first_unknown(&self) -> Option<&Token> {
        self.tokens.iter().find(|t| t.kind == TokenKind::Unknown)
    }

    pub fn into_vec(self) -> Vec<Token> {
        self.tokens
    }
}

impl Deref for Tokens {
    type Target = [Token];

    fn deref(&self) -> &[Token] {
        &self.tokens
    }
}
