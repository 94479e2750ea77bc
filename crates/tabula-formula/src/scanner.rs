//! Formula scanner
//!
//! A character-level state machine that splits formula text into typed
//! tokens. Scanning never fails outright: text it cannot classify becomes an
//! [`TokenKind::Unknown`] token and the result is marked invalid.

use crate::resolver::NamedAreas;
use crate::token::{Operator, Token, TokenKind, Tokens};
use lazy_regex::regex_is_match;
use tabula_core::CalculationSettings;
use tracing::trace;

const TERMINATOR: char = '\0';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Number,
    Decimal,
    ExponentSign,
    Exponent,
    String,
    Identifier,
    Cell,
    Range,
    QuotedName,
    ErrorLiteral,
    Finish,
}

/// Tokenize formula text
///
/// The text must start with `=`; anything else yields an empty, invalid
/// token list. Offsets count characters from the start of `text`,
/// including the `=`.
pub fn scan(text: &str, settings: &CalculationSettings, names: &dyn NamedAreas) -> Tokens {
    let Some(body) = text.strip_prefix('=') else {
        return Tokens::new(Vec::new(), false);
    };
    let tokens = Scanner::new(body, settings, names).run();
    trace!(formula = text, count = tokens.len(), valid = tokens.is_valid(), "scanned");
    tokens
}

/// `A1`, `$A$1`, `a10` and so on, without a sheet qualifier
fn is_cell_reference(text: &str) -> bool {
    regex_is_match!(r"^\$?[A-Za-z]+\$?[0-9]+$", text)
}

fn is_identifier_char(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$' || ch == '.'
}

fn starts_reference(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$' || ch == '\''
}

struct Scanner<'a> {
    chars: Vec<char>,
    pos: usize,
    state: State,
    token_start: usize,
    text: String,
    tokens: Vec<Token>,
    valid: bool,
    settings: &'a CalculationSettings,
    names: &'a dyn NamedAreas,
}

impl<'a> Scanner<'a> {
    fn new(body: &str, settings: &'a CalculationSettings, names: &'a dyn NamedAreas) -> Self {
        let mut chars: Vec<char> = body.chars().collect();
        chars.push(TERMINATOR);
        Self {
            chars,
            pos: 0,
            state: State::Start,
            token_start: 0,
            text: String::new(),
            tokens: Vec::new(),
            valid: true,
            settings,
            names,
        }
    }

    fn peek(&self, ahead: usize) -> char {
        self.chars.get(self.pos + ahead).copied().unwrap_or(TERMINATOR)
    }

    /// Offset in the original text, which still has its `=`
    fn offset(&self, index: usize) -> usize {
        index + 1
    }

    fn emit(&mut self, kind: TokenKind) {
        let text = std::mem::take(&mut self.text);
        self.tokens.push(Token::new(kind, text, self.offset(self.token_start)));
        self.state = State::Start;
    }

    fn emit_unknown(&mut self) {
        self.valid = false;
        self.emit(TokenKind::Unknown);
    }

    fn consume(&mut self) {
        let ch = self.peek(0);
        self.text.push(ch);
        self.pos += 1;
    }

    fn run(mut self) -> Tokens {
        while self.state != State::Finish && self.pos < self.chars.len() {
            let ch = self.peek(0);
            match self.state {
                State::Start => self.start(ch),
                State::Number => self.number(ch),
                State::Decimal => self.decimal(ch),
                State::ExponentSign => self.exponent_sign(ch),
                State::Exponent => self.exponent(ch),
                State::String => self.string(ch),
                State::Identifier => self.identifier(ch),
                State::Cell => self.cell(ch),
                State::Range => self.range(ch),
                State::QuotedName => self.quoted_name(ch),
                State::ErrorLiteral => self.error_literal(ch),
                State::Finish => {}
            }
        }

        // Ran off the end inside a string, quoted name or error literal
        if self.state != State::Finish {
            let end = self.chars.len() - 1;
            self.text = self.chars[self.token_start..end].iter().collect();
            self.emit_unknown();
        }

        Tokens::new(self.tokens, self.valid)
    }

    fn start(&mut self, ch: char) {
        self.token_start = self.pos;

        if ch == TERMINATOR {
            self.state = State::Finish;
            return;
        }

        if ch.is_whitespace() {
            self.whitespace();
            return;
        }

        if ch.is_ascii_digit() {
            self.state = State::Number;
            return;
        }

        if ch == '"' {
            self.consume();
            self.state = State::String;
            return;
        }

        if self.settings.is_decimal_point(ch) && self.peek(1).is_ascii_digit() {
            self.text.push('.');
            self.pos += 1;
            self.state = State::Decimal;
            return;
        }

        if is_identifier_char(ch) {
            self.state = State::Identifier;
            return;
        }

        if ch == '\'' {
            self.pos += 1;
            self.state = State::QuotedName;
            return;
        }

        if ch == '#' {
            self.consume();
            self.state = State::ErrorLiteral;
            return;
        }

        self.operator(ch);
    }

    /// Whitespace between two references is the intersection operator;
    /// anywhere else it is skipped
    fn whitespace(&mut self) {
        let start = self.pos;
        while self.peek(0) != TERMINATOR && self.peek(0).is_whitespace() {
            self.pos += 1;
        }
        let after_reference = matches!(
            self.tokens.last().map(Token::kind),
            Some(TokenKind::Cell | TokenKind::Range)
        );
        if after_reference && starts_reference(self.peek(0)) {
            self.tokens.push(Token::new(
                TokenKind::Operator(Operator::Intersect),
                " ",
                self.offset(start),
            ));
        }
    }

    fn operator(&mut self, ch: char) {
        let inline = self.settings.inline_arrays;
        let pair: String = [ch, self.peek(1)].iter().collect();
        if let Some(op) = Operator::from_text(&pair, inline) {
            self.text = pair;
            self.pos += 2;
            self.emit(TokenKind::Operator(op));
            return;
        }

        self.consume();
        match Operator::from_text(&ch.to_string(), inline) {
            Some(op) => self.emit(TokenKind::Operator(op)),
            None => self.emit_unknown(),
        }
    }

    fn number(&mut self, ch: char) {
        if ch.is_ascii_digit() {
            self.consume();
        } else if Some(ch) == self.settings.thousands_separator && self.peek(1).is_ascii_digit() {
            self.pos += 1;
        } else if self.settings.is_decimal_point(ch) {
            self.text.push('.');
            self.pos += 1;
            self.state = State::Decimal;
        } else if ch == 'E' || ch == 'e' {
            self.text.push('E');
            self.pos += 1;
            self.state = State::ExponentSign;
        } else if ch == '!' {
            // Sheet names may be numeric, `2019!A1`
            self.consume();
            self.state = State::Cell;
        } else if is_identifier_char(ch) {
            self.state = State::Identifier;
        } else {
            self.emit(TokenKind::Integer);
        }
    }

    fn decimal(&mut self, ch: char) {
        if ch.is_ascii_digit() {
            self.consume();
        } else if ch == 'E' || ch == 'e' {
            self.text.push('E');
            self.pos += 1;
            self.state = State::ExponentSign;
        } else {
            self.emit(TokenKind::Float);
        }
    }

    fn exponent_sign(&mut self, ch: char) {
        if (ch == '+' || ch == '-') && self.text.ends_with('E') {
            self.consume();
        } else if ch.is_ascii_digit() {
            self.state = State::Exponent;
        } else {
            if ch != TERMINATOR {
                self.consume();
            }
            self.emit_unknown();
        }
    }

    fn exponent(&mut self, ch: char) {
        if ch.is_ascii_digit() {
            self.consume();
        } else {
            self.emit(TokenKind::Float);
        }
    }

    fn string(&mut self, ch: char) {
        self.consume();
        if ch == '"' {
            self.emit(TokenKind::String);
        }
    }

    fn identifier(&mut self, ch: char) {
        if is_identifier_char(ch) || ch.is_ascii_digit() {
            self.consume();
        } else if ch == '!' && self.peek(1) != '=' {
            self.consume();
            self.state = State::Cell;
        } else if ch == '(' {
            self.emit(TokenKind::Identifier);
        } else if is_cell_reference(&self.text) {
            self.cell_end(ch);
        } else if self.text.eq_ignore_ascii_case("TRUE") || self.text.eq_ignore_ascii_case("FALSE")
        {
            self.emit(TokenKind::Boolean);
        } else if self.names.is_named_area(&self.text) {
            self.emit(TokenKind::Range);
        } else {
            self.emit(TokenKind::Identifier);
        }
    }

    fn cell(&mut self, ch: char) {
        if is_identifier_char(ch) || ch.is_ascii_digit() {
            self.consume();
            return;
        }
        let local = self.text.rsplit('!').next().unwrap_or_default();
        if is_cell_reference(local) {
            self.cell_end(ch);
        } else {
            // `Sheet2!Total` names an area
            self.emit(TokenKind::Range);
        }
    }

    /// A complete cell reference: either it starts a range or stands alone
    fn cell_end(&mut self, ch: char) {
        if ch == ':' {
            self.consume();
            self.state = State::Range;
        } else {
            self.emit(TokenKind::Cell);
        }
    }

    fn range(&mut self, ch: char) {
        if is_identifier_char(ch) || ch.is_ascii_digit() || ch == '!' {
            self.consume();
        } else {
            self.emit(TokenKind::Range);
        }
    }

    fn quoted_name(&mut self, ch: char) {
        if ch == TERMINATOR {
            // Leave the loop; run() reports the dangling quote
            self.pos += 1;
            return;
        }
        if ch != '\'' {
            self.consume();
            return;
        }

        self.pos += 1;
        if self.peek(0) == '!' {
            // Keep the quotes so the reference still parses
            self.text = format!("'{}'!", self.text);
            self.pos += 1;
            self.state = State::Cell;
        } else if self.names.is_named_area(&self.text) {
            self.emit(TokenKind::Range);
        } else {
            self.text = format!("'{}'", self.text);
            self.emit_unknown();
        }
    }

    fn error_literal(&mut self, ch: char) {
        if ch == TERMINATOR {
            self.pos += 1;
            return;
        }
        self.consume();
        let closed = ch == '!' || ch == '?' || self.text.eq_ignore_ascii_case("#N/A");
        if closed {
            if self.text.parse::<tabula_core::ErrorCode>().is_ok() {
                self.emit(TokenKind::Error);
            } else {
                self.emit_unknown();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::NoNames;
    use pretty_assertions::assert_eq;

    struct Names(&'static [&'static str]);

    impl NamedAreas for Names {
        fn is_named_area(&self, name: &str) -> bool {
            self.0.iter().any(|n| n.eq_ignore_ascii_case(name))
        }
    }

    fn kinds(formula: &str) -> Vec<(TokenKind, String)> {
        let settings = CalculationSettings::default();
        scan(formula, &settings, &NoNames)
            .iter()
            .map(|t| (t.kind(), t.text().to_string()))
            .collect()
    }

    fn op(op: Operator, text: &str) -> (TokenKind, String) {
        (TokenKind::Operator(op), text.to_string())
    }

    fn tok(kind: TokenKind, text: &str) -> (TokenKind, String) {
        (kind, text.to_string())
    }

    #[test]
    fn test_requires_equals() {
        let settings = CalculationSettings::default();
        let tokens = scan("1+2", &settings, &NoNames);
        assert!(!tokens.is_valid());
        assert!(tokens.is_empty());
    }

    #[test]
    fn test_scan_arithmetic() {
        assert_eq!(
            kinds("=1+2*3"),
            vec![
                tok(TokenKind::Integer, "1"),
                op(Operator::Plus, "+"),
                tok(TokenKind::Integer, "2"),
                op(Operator::Asterisk, "*"),
                tok(TokenKind::Integer, "3"),
            ]
        );
    }

    #[test]
    fn test_scan_numbers() {
        assert_eq!(kinds("=2.5"), vec![tok(TokenKind::Float, "2.5")]);
        assert_eq!(kinds("=.5"), vec![tok(TokenKind::Float, ".5")]);
        assert_eq!(kinds("=1e3"), vec![tok(TokenKind::Float, "1E3")]);
        assert_eq!(kinds("=1.5E-2"), vec![tok(TokenKind::Float, "1.5E-2")]);
    }

    #[test]
    fn test_bad_exponent_is_unknown() {
        let settings = CalculationSettings::default();
        let tokens = scan("=1Ex", &settings, &NoNames);
        assert!(!tokens.is_valid());
        assert_eq!(tokens.first_unknown().map(Token::text), Some("1Ex"));
    }

    #[test]
    fn test_scan_locale_decimal() {
        let settings = CalculationSettings::comma_decimal();
        let tokens = scan("=1.234,5", &settings, &NoNames);
        assert!(tokens.is_valid());
        assert_eq!(tokens[0].kind(), TokenKind::Float);
        assert_eq!(tokens[0].text(), "1234.5");
    }

    #[test]
    fn test_scan_string() {
        assert_eq!(
            kinds("=\"a b\"&\"c\""),
            vec![
                tok(TokenKind::String, "\"a b\""),
                op(Operator::Ampersand, "&"),
                tok(TokenKind::String, "\"c\""),
            ]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let settings = CalculationSettings::default();
        let tokens = scan("=\"abc", &settings, &NoNames);
        assert!(!tokens.is_valid());
        assert_eq!(tokens.first_unknown().map(Token::text), Some("\"abc"));
        assert_eq!(tokens.first_unknown().map(Token::offset), Some(1));
    }

    #[test]
    fn test_scan_references() {
        assert_eq!(
            kinds("=A1+$B$2"),
            vec![
                tok(TokenKind::Cell, "A1"),
                op(Operator::Plus, "+"),
                tok(TokenKind::Cell, "$B$2"),
            ]
        );
        assert_eq!(kinds("=A1:B10"), vec![tok(TokenKind::Range, "A1:B10")]);
        assert_eq!(kinds("=Sheet2!C3"), vec![tok(TokenKind::Cell, "Sheet2!C3")]);
        assert_eq!(
            kinds("=Sheet2!A1:Sheet2!B2"),
            vec![tok(TokenKind::Range, "Sheet2!A1:Sheet2!B2")]
        );
        assert_eq!(
            kinds("='Sales Q3'!A4"),
            vec![tok(TokenKind::Cell, "'Sales Q3'!A4")]
        );
    }

    #[test]
    fn test_scan_function_call() {
        assert_eq!(
            kinds("=SUM(A1:A3;2)"),
            vec![
                tok(TokenKind::Identifier, "SUM"),
                op(Operator::LeftPar, "("),
                tok(TokenKind::Range, "A1:A3"),
                op(Operator::Semicolon, ";"),
                tok(TokenKind::Integer, "2"),
                op(Operator::RightPar, ")"),
            ]
        );
        // Function names that look like cells
        assert_eq!(kinds("=LOG10(1)")[0], tok(TokenKind::Identifier, "LOG10"));
    }

    #[test]
    fn test_scan_named_area() {
        let settings = CalculationSettings::default();
        let names = Names(&["Prices", "Tax Rate"]);
        let tokens = scan("=Prices*'Tax Rate'+Other", &settings, &names);
        assert!(tokens.is_valid());
        assert_eq!(tokens[0].kind(), TokenKind::Range);
        assert_eq!(tokens[2].kind(), TokenKind::Range);
        assert_eq!(tokens[2].text(), "Tax Rate");
        assert_eq!(tokens[4].kind(), TokenKind::Identifier);
    }

    #[test]
    fn test_unknown_quoted_name_is_invalid() {
        let settings = CalculationSettings::default();
        let tokens = scan("='Nope'+1", &settings, &NoNames);
        assert!(!tokens.is_valid());
    }

    #[test]
    fn test_scan_booleans_and_errors() {
        assert_eq!(kinds("=TRUE"), vec![tok(TokenKind::Boolean, "TRUE")]);
        assert_eq!(kinds("=TRUE()")[0], tok(TokenKind::Identifier, "TRUE"));
        assert_eq!(kinds("=#N/A"), vec![tok(TokenKind::Error, "#N/A")]);
        assert_eq!(kinds("=#DIV/0!"), vec![tok(TokenKind::Error, "#DIV/0!")]);
        assert_eq!(
            kinds("=#NAME?+1"),
            vec![
                tok(TokenKind::Error, "#NAME?"),
                op(Operator::Plus, "+"),
                tok(TokenKind::Integer, "1"),
            ]
        );
        let settings = CalculationSettings::default();
        assert!(!scan("=#BOGUS!", &settings, &NoNames).is_valid());
    }

    #[test]
    fn test_scan_comparisons() {
        assert_eq!(
            kinds("=1<>2"),
            vec![
                tok(TokenKind::Integer, "1"),
                op(Operator::NotEqual, "<>"),
                tok(TokenKind::Integer, "2"),
            ]
        );
        assert_eq!(kinds("=1>=2")[1], op(Operator::GreaterEqual, ">="));
        assert_eq!(kinds("=1==2")[1], op(Operator::Equal, "=="));
    }

    #[test]
    fn test_intersection_whitespace() {
        assert_eq!(
            kinds("=A1:B5 B2:C3"),
            vec![
                tok(TokenKind::Range, "A1:B5"),
                op(Operator::Intersect, " "),
                tok(TokenKind::Range, "B2:C3"),
            ]
        );
        // Other whitespace is insignificant
        assert_eq!(
            kinds("= 1 +  2 "),
            vec![
                tok(TokenKind::Integer, "1"),
                op(Operator::Plus, "+"),
                tok(TokenKind::Integer, "2"),
            ]
        );
    }

    #[test]
    fn test_inline_arrays() {
        assert_eq!(
            kinds("={1;2|3;4}")
                .into_iter()
                .map(|(k, _)| k)
                .filter(|k| matches!(k, TokenKind::Operator(_)))
                .count(),
            5
        );

        let settings = CalculationSettings {
            inline_arrays: false,
            ..CalculationSettings::default()
        };
        assert!(!scan("={1}", &settings, &NoNames).is_valid());
    }

    #[test]
    fn test_unicode_operators() {
        assert_eq!(kinds("=6\u{00F7}2")[1].0, TokenKind::Operator(Operator::Slash));
        assert_eq!(kinds("=6\u{00D7}2")[1].0, TokenKind::Operator(Operator::Asterisk));
        assert_eq!(kinds("=6\u{2212}2")[1].0, TokenKind::Operator(Operator::Minus));
    }

    #[test]
    fn test_unknown_character() {
        let settings = CalculationSettings::default();
        let tokens = scan("=1+@", &settings, &NoNames);
        assert!(!tokens.is_valid());
        let bad = tokens.first_unknown().unwrap();
        assert_eq!(bad.text(), "@");
        assert_eq!(bad.offset(), 3);
    }

    #[test]
    fn test_offsets() {
        let settings = CalculationSettings::default();
        let tokens = scan("=10+A2", &settings, &NoNames);
        let offsets: Vec<_> = tokens.iter().map(Token::offset).collect();
        assert_eq!(offsets, vec![1, 3, 4]);
    }
}
