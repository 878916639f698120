//! Lexer for type descriptors and quoted literal text
//!
//! Shared between the type-descriptor parser (`Array(Nullable(UInt8))`)
//! and the insert path's literal parser (`VALUES (1, 'abc', NULL)`).

use crate::error::{DataError, Result};

/// One token of a type descriptor or quoted-literal stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotedToken {
    /// Single-quoted, backslash-escaped string literal (unescaped content)
    StringLiteral(String),
    /// Numeric literal with optional sign and fraction, kept as text
    Number(String),
    /// `[A-Za-z_][A-Za-z0-9_]*`
    Identifier(String),
    OpeningRoundBracket,
    ClosingRoundBracket,
    Comma,
    Equals,
    Eof,
}

impl QuotedToken {
    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            QuotedToken::StringLiteral(s) => format!("string literal '{}'", s),
            QuotedToken::Number(n) => format!("number {}", n),
            QuotedToken::Identifier(id) => format!("identifier {}", id),
            QuotedToken::OpeningRoundBracket => "'('".to_string(),
            QuotedToken::ClosingRoundBracket => "')'".to_string(),
            QuotedToken::Comma => "','".to_string(),
            QuotedToken::Equals => "'='".to_string(),
            QuotedToken::Eof => "end of input".to_string(),
        }
    }
}

/// Tokeniser over a descriptor or literal string. Whitespace is skipped.
pub struct QuotedLexer {
    chars: Vec<char>,
    pos: usize,
}

impl QuotedLexer {
    pub fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    /// Look at the next token without consuming it.
    pub fn peek(&mut self) -> Result<QuotedToken> {
        let saved = self.pos;
        let token = self.next_token();
        self.pos = saved;
        token
    }

    /// Consume and return the next token.
    pub fn next_token(&mut self) -> Result<QuotedToken> {
        while let Some(&c) = self.chars.get(self.pos) {
            if !c.is_whitespace() {
                break;
            }
            self.pos += 1;
        }

        let c = match self.chars.get(self.pos) {
            Some(&c) => c,
            None => return Ok(QuotedToken::Eof),
        };

        match c {
            '(' => {
                self.pos += 1;
                Ok(QuotedToken::OpeningRoundBracket)
            }
            ')' => {
                self.pos += 1;
                Ok(QuotedToken::ClosingRoundBracket)
            }
            ',' => {
                self.pos += 1;
                Ok(QuotedToken::Comma)
            }
            '=' => {
                self.pos += 1;
                Ok(QuotedToken::Equals)
            }
            '\'' => self.string_literal(),
            '-' | '+' => self.number(),
            _ if c.is_ascii_digit() => self.number(),
            _ if c.is_ascii_alphabetic() || c == '_' => self.identifier(),
            other => Err(DataError::UnknownType(format!(
                "unexpected character '{}'",
                other
            ))),
        }
    }

    fn string_literal(&mut self) -> Result<QuotedToken> {
        // Opening quote
        self.pos += 1;
        let mut data = String::new();
        loop {
            match self.chars.get(self.pos) {
                Some('\'') => {
                    self.pos += 1;
                    return Ok(QuotedToken::StringLiteral(data));
                }
                Some('\\') => {
                    self.pos += 1;
                    match self.chars.get(self.pos) {
                        Some(&escaped) => {
                            data.push(unescape(escaped));
                            self.pos += 1;
                        }
                        None => {
                            return Err(DataError::UnknownType(
                                "unterminated escape in string literal".to_string(),
                            ));
                        }
                    }
                }
                Some(&c) => {
                    data.push(c);
                    self.pos += 1;
                }
                None => {
                    return Err(DataError::UnknownType(
                        "unterminated string literal".to_string(),
                    ));
                }
            }
        }
    }

    fn number(&mut self) -> Result<QuotedToken> {
        let start = self.pos;
        if matches!(self.chars.get(self.pos), Some('-') | Some('+')) {
            self.pos += 1;
        }
        let digits_start = self.pos;
        while matches!(self.chars.get(self.pos), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == digits_start {
            return Err(DataError::UnknownType(
                "sign without following digits".to_string(),
            ));
        }
        if matches!(self.chars.get(self.pos), Some('.')) {
            self.pos += 1;
            while matches!(self.chars.get(self.pos), Some(c) if c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        Ok(QuotedToken::Number(
            self.chars[start..self.pos].iter().collect(),
        ))
    }

    fn identifier(&mut self) -> Result<QuotedToken> {
        let start = self.pos;
        while matches!(
            self.chars.get(self.pos),
            Some(c) if c.is_ascii_alphanumeric() || *c == '_'
        ) {
            self.pos += 1;
        }
        Ok(QuotedToken::Identifier(
            self.chars[start..self.pos].iter().collect(),
        ))
    }
}

fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<QuotedToken> {
        let mut lexer = QuotedLexer::new(input);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token().unwrap();
            let done = token == QuotedToken::Eof;
            out.push(token);
            if done {
                return out;
            }
        }
    }

    #[test]
    fn test_descriptor_tokens() {
        assert_eq!(
            tokens("Array(Nullable(FixedString(3)))"),
            vec![
                QuotedToken::Identifier("Array".into()),
                QuotedToken::OpeningRoundBracket,
                QuotedToken::Identifier("Nullable".into()),
                QuotedToken::OpeningRoundBracket,
                QuotedToken::Identifier("FixedString".into()),
                QuotedToken::OpeningRoundBracket,
                QuotedToken::Number("3".into()),
                QuotedToken::ClosingRoundBracket,
                QuotedToken::ClosingRoundBracket,
                QuotedToken::ClosingRoundBracket,
                QuotedToken::Eof,
            ]
        );
    }

    #[test]
    fn test_enum_tokens_with_whitespace() {
        assert_eq!(
            tokens("Enum8('a' = -1 , 'b\\'c' = 2)"),
            vec![
                QuotedToken::Identifier("Enum8".into()),
                QuotedToken::OpeningRoundBracket,
                QuotedToken::StringLiteral("a".into()),
                QuotedToken::Equals,
                QuotedToken::Number("-1".into()),
                QuotedToken::Comma,
                QuotedToken::StringLiteral("b'c".into()),
                QuotedToken::Equals,
                QuotedToken::Number("2".into()),
                QuotedToken::ClosingRoundBracket,
                QuotedToken::Eof,
            ]
        );
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut lexer = QuotedLexer::new("DateTime('UTC')");
        assert_eq!(
            lexer.peek().unwrap(),
            QuotedToken::Identifier("DateTime".into())
        );
        assert_eq!(
            lexer.next_token().unwrap(),
            QuotedToken::Identifier("DateTime".into())
        );
        assert_eq!(lexer.peek().unwrap(), QuotedToken::OpeningRoundBracket);
    }

    #[test]
    fn test_fractional_number() {
        assert_eq!(
            tokens("-12.5"),
            vec![QuotedToken::Number("-12.5".into()), QuotedToken::Eof]
        );
    }

    #[test]
    fn test_unterminated_literal() {
        let mut lexer = QuotedLexer::new("'abc");
        assert!(matches!(
            lexer.next_token(),
            Err(DataError::UnknownType(_))
        ));
    }
}
