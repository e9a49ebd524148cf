//! Tokenizer for settings files.
//!
//! Newlines are only significant outside brackets; inside `()`, `[]` and
//! `{}` they are skipped, so a collection may span several lines.

use crate::error::SyntaxError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Name(String),
    Str(String),
    Int(i64),
    Float(f64),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Equals,
    Plus,
    Minus,
    Dot,
    Star,
    Semicolon,
    Newline,
    Eof,
}

impl TokenKind {
    /// Human description used in "expected X, found Y" messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Name(n) => format!("name '{}'", n),
            TokenKind::Str(_) => "string".to_string(),
            TokenKind::Int(_) | TokenKind::Float(_) => "number".to_string(),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::LBracket => "'['".to_string(),
            TokenKind::RBracket => "']'".to_string(),
            TokenKind::LBrace => "'{'".to_string(),
            TokenKind::RBrace => "'}'".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::Colon => "':'".to_string(),
            TokenKind::Equals => "'='".to_string(),
            TokenKind::Plus => "'+'".to_string(),
            TokenKind::Minus => "'-'".to_string(),
            TokenKind::Dot => "'.'".to_string(),
            TokenKind::Star => "'*'".to_string(),
            TokenKind::Semicolon => "';'".to_string(),
            TokenKind::Newline => "end of line".to_string(),
            TokenKind::Eof => "end of file".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    depth: Vec<char>,
    tokens: Vec<Token>,
}

/// Split source text into tokens, ending with `Eof`.
pub fn tokenize(src: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut lexer = Lexer {
        chars: src.chars().collect(),
        pos: 0,
        line: 1,
        column: 1,
        depth: Vec::new(),
        tokens: Vec::new(),
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

impl Lexer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn push(&mut self, kind: TokenKind, line: usize, column: usize) {
        self.tokens.push(Token { kind, line, column });
    }

    fn error(&self, line: usize, column: usize, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(line, column, message)
    }

    fn run(&mut self) -> Result<(), SyntaxError> {
        while let Some(c) = self.peek() {
            let (line, column) = (self.line, self.column);
            match c {
                ' ' | '\t' | '\x0c' | '\r' => {
                    self.bump();
                }
                '\n' => {
                    self.bump();
                    if self.depth.is_empty() {
                        self.push(TokenKind::Newline, line, column);
                    }
                }
                '#' => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                '\\' => {
                    // Explicit line continuation
                    self.bump();
                    if self.peek() == Some('\r') {
                        self.bump();
                    }
                    if self.bump() != Some('\n') {
                        return Err(self.error(
                            line,
                            column,
                            "unexpected character after line continuation",
                        ));
                    }
                }
                '(' | '[' | '{' => {
                    self.bump();
                    self.depth.push(c);
                    let kind = match c {
                        '(' => TokenKind::LParen,
                        '[' => TokenKind::LBracket,
                        _ => TokenKind::LBrace,
                    };
                    self.push(kind, line, column);
                }
                ')' | ']' | '}' => {
                    self.bump();
                    let open = match c {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    match self.depth.pop() {
                        Some(o) if o == open => {}
                        Some(o) => {
                            return Err(self.error(
                                line,
                                column,
                                format!("closing '{}' does not match opening '{}'", c, o),
                            ));
                        }
                        None => {
                            return Err(self.error(line, column, format!("unmatched '{}'", c)));
                        }
                    }
                    let kind = match c {
                        ')' => TokenKind::RParen,
                        ']' => TokenKind::RBracket,
                        _ => TokenKind::RBrace,
                    };
                    self.push(kind, line, column);
                }
                ',' => self.single(TokenKind::Comma),
                ':' => self.single(TokenKind::Colon),
                '+' => self.single(TokenKind::Plus),
                '-' => self.single(TokenKind::Minus),
                '*' => self.single(TokenKind::Star),
                ';' => self.single(TokenKind::Semicolon),
                '=' => {
                    if self.peek_at(1) == Some('=') {
                        return Err(self.error(line, column, "comparisons are not supported"));
                    }
                    self.single(TokenKind::Equals)
                }
                '.' => {
                    if self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) {
                        self.number()?;
                    } else {
                        self.single(TokenKind::Dot);
                    }
                }
                '\'' | '"' => {
                    let s = self.string(false)?;
                    self.push(TokenKind::Str(s), line, column);
                }
                c if c.is_ascii_digit() => self.number()?,
                c if c == '_' || c.is_alphabetic() => self.name_or_prefixed_string()?,
                other => {
                    return Err(self.error(line, column, format!("unexpected character '{}'", other)));
                }
            }
        }

        if let Some(open) = self.depth.last() {
            return Err(self.error(self.line, self.column, format!("unclosed '{}'", open)));
        }

        let (line, column) = (self.line, self.column);
        if !matches!(
            self.tokens.last().map(|t| &t.kind),
            None | Some(TokenKind::Newline)
        ) {
            self.push(TokenKind::Newline, line, column);
        }
        self.push(TokenKind::Eof, line, column);
        Ok(())
    }

    fn single(&mut self, kind: TokenKind) {
        let (line, column) = (self.line, self.column);
        self.bump();
        self.push(kind, line, column);
    }

    fn name_or_prefixed_string(&mut self) -> Result<(), SyntaxError> {
        let (line, column) = (self.line, self.column);
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c == '_' || c.is_alphanumeric() {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }

        if matches!(self.peek(), Some('\'') | Some('"')) {
            let lower = name.to_ascii_lowercase();
            match lower.as_str() {
                "r" => {
                    let s = self.string(true)?;
                    self.push(TokenKind::Str(s), line, column);
                    return Ok(());
                }
                "u" => {
                    let s = self.string(false)?;
                    self.push(TokenKind::Str(s), line, column);
                    return Ok(());
                }
                "f" | "rf" | "fr" => {
                    return Err(self.error(line, column, "f-strings are not supported"));
                }
                "b" | "rb" | "br" => {
                    return Err(self.error(line, column, "bytes literals are not supported"));
                }
                _ => {}
            }
        }

        self.push(TokenKind::Name(name), line, column);
        Ok(())
    }

    fn string(&mut self, raw: bool) -> Result<String, SyntaxError> {
        let (line, column) = (self.line, self.column);
        let quote = self.bump().unwrap_or('\'');
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.bump();
            self.bump();
        }

        let mut out = String::new();
        loop {
            let c = match self.peek() {
                Some(c) => c,
                None => {
                    return Err(self.error(line, column, "unterminated string literal"));
                }
            };

            if c == quote {
                if !triple {
                    self.bump();
                    return Ok(out);
                }
                if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
                    self.bump();
                    self.bump();
                    self.bump();
                    return Ok(out);
                }
                out.push(c);
                self.bump();
                continue;
            }

            if (c == '\n' || c == '\r') && !triple {
                return Err(self.error(line, column, "unterminated string literal"));
            }

            // Newlines in triple-quoted bodies read as `\n` whatever the file uses
            if c == '\r' {
                self.bump();
                if self.peek() == Some('\n') {
                    self.bump();
                }
                out.push('\n');
                continue;
            }

            if c == '\\' {
                self.bump();
                let next = match self.peek() {
                    Some(n) => n,
                    None => {
                        return Err(self.error(line, column, "unterminated string literal"));
                    }
                };
                if raw {
                    out.push('\\');
                    out.push(next);
                    self.bump();
                    continue;
                }
                self.escape(next, &mut out)?;
                continue;
            }

            out.push(c);
            self.bump();
        }
    }

    fn escape(&mut self, next: char, out: &mut String) -> Result<(), SyntaxError> {
        let (line, column) = (self.line, self.column);
        self.bump();
        match next {
            '\n' => {}
            '\r' => {
                if self.peek() == Some('\n') {
                    self.bump();
                }
            }
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            'v' => out.push('\x0b'),
            '0' => out.push('\0'),
            'x' => out.push(self.hex_escape(2, line, column)?),
            'u' => out.push(self.hex_escape(4, line, column)?),
            'U' => out.push(self.hex_escape(8, line, column)?),
            other => {
                // Unknown escapes keep the backslash
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn hex_escape(&mut self, len: usize, line: usize, column: usize) -> Result<char, SyntaxError> {
        let mut digits = String::with_capacity(len);
        for _ in 0..len {
            match self.peek() {
                Some(c) if c.is_ascii_hexdigit() => {
                    digits.push(c);
                    self.bump();
                }
                _ => return Err(self.error(line, column, "truncated escape sequence")),
            }
        }
        u32::from_str_radix(&digits, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.error(line, column, format!("invalid escape value \\{}", digits)))
    }

    fn number(&mut self) -> Result<(), SyntaxError> {
        let (line, column) = (self.line, self.column);

        if self.peek() == Some('0') {
            let radix = match self.peek_at(1) {
                Some('x') | Some('X') => Some(16),
                Some('o') | Some('O') => Some(8),
                Some('b') | Some('B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.bump();
                self.bump();
                let mut digits = String::new();
                while let Some(c) = self.peek() {
                    if c == '_' {
                        self.bump();
                    } else if c.is_digit(radix) {
                        digits.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
                let value = i64::from_str_radix(&digits, radix)
                    .map_err(|_| self.error(line, column, "invalid integer literal"))?;
                self.push(TokenKind::Int(value), line, column);
                return Ok(());
            }
        }

        let mut text = String::new();
        let mut is_float = false;
        self.digits(&mut text);
        if self.peek() == Some('.') {
            is_float = true;
            text.push('.');
            self.bump();
            self.digits(&mut text);
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            is_float = true;
            text.push('e');
            self.bump();
            if let Some(sign @ ('+' | '-')) = self.peek() {
                text.push(sign);
                self.bump();
            }
            if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return Err(self.error(line, column, "invalid float literal"));
            }
            self.digits(&mut text);
        }

        if self.peek().is_some_and(|c| c == '_' || c.is_alphabetic()) {
            return Err(self.error(line, column, "invalid number literal"));
        }

        let kind = if is_float {
            let value: f64 = text
                .parse()
                .map_err(|_| self.error(line, column, "invalid float literal"))?;
            if !value.is_finite() {
                return Err(self.error(line, column, "float literal out of range"));
            }
            TokenKind::Float(value)
        } else {
            let value: i64 = text
                .parse()
                .map_err(|_| self.error(line, column, "integer literal out of range"))?;
            TokenKind::Int(value)
        };
        self.push(kind, line, column);
        Ok(())
    }

    fn digits(&mut self, text: &mut String) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.bump();
            } else if c == '_' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) {
                self.bump();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_assignment() {
        assert_eq!(
            kinds("SITENAME = 'mi-atlas'"),
            vec![
                TokenKind::Name("SITENAME".into()),
                TokenKind::Equals,
                TokenKind::Str("mi-atlas".into()),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_newlines_inside_brackets_are_skipped() {
        let tokens = kinds("A = (1,\n     2)\n");
        let newlines = tokens.iter().filter(|k| **k == TokenKind::Newline).count();
        assert_eq!(newlines, 1);
    }

    #[test]
    fn test_comment_is_skipped() {
        assert_eq!(
            kinds("#RELATIVE_URLS = True\n"),
            vec![TokenKind::Newline, TokenKind::Eof]
        );
    }

    #[test]
    fn test_triple_quoted_string_spans_lines() {
        let tokens = kinds("X = \"\"\"a\nb \"quoted\" \"\"\"");
        assert_eq!(tokens[2], TokenKind::Str("a\nb \"quoted\" ".into()));
    }

    #[test]
    fn test_escapes() {
        let tokens = kinds(r"X = 'tab\there\x41é'");
        assert_eq!(tokens[2], TokenKind::Str("tab\there\u{41}\u{e9}".into()));
    }

    #[test]
    fn test_crlf_inside_triple_quoted_string() {
        let tokens = kinds("C = \"\"\"x\r\ny\"\"\"\r\nD = 'a\\\r\nb'\r\n");
        assert_eq!(tokens[2], TokenKind::Str("x\ny".into()));
        assert_eq!(tokens[6], TokenKind::Str("ab".into()));
        assert_eq!(
            tokens.iter().filter(|k| **k == TokenKind::Newline).count(),
            2
        );
    }

    #[test]
    fn test_raw_string_keeps_backslashes() {
        let tokens = kinds(r"X = r'a\nb'");
        assert_eq!(tokens[2], TokenKind::Str("a\\nb".into()));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds("1_000")[0], TokenKind::Int(1000));
        assert_eq!(kinds("0x1F")[0], TokenKind::Int(31));
        assert_eq!(kinds("2.5")[0], TokenKind::Float(2.5));
        assert_eq!(kinds(".5")[0], TokenKind::Float(0.5));
        assert_eq!(kinds("1e-7")[0], TokenKind::Float(1e-7));
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("X = 'abc\nY = 1").unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 5);
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn test_unclosed_bracket() {
        let err = tokenize("X = [1, 2").unwrap_err();
        assert!(err.message.contains("unclosed '['"));
    }

    #[test]
    fn test_mismatched_bracket() {
        let err = tokenize("X = [1, 2)").unwrap_err();
        assert!(err.message.contains("does not match"));
    }

    #[test]
    fn test_fstring_rejected() {
        let err = tokenize("X = f'{SITENAME}'").unwrap_err();
        assert!(err.message.contains("f-strings"));
    }
}
