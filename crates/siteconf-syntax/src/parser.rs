//! Settings file parser.
//!
//! Parses a sequence of `NAME = expression` statements and evaluates each
//! expression immediately. Names used inside expressions resolve against
//! the assignments made earlier in the same document, then against the
//! caller-provided [`Scope`].

use crate::error::SyntaxError;
use crate::lexer::{tokenize, Token, TokenKind};
use crate::value::Value;
use std::collections::{BTreeMap, HashMap};

/// Maximum nesting of brackets and unary operators in one expression.
pub const MAX_NESTING: usize = 200;

/// Bindings visible to a document before its first statement.
pub trait Scope {
    fn lookup(&self, name: &str) -> Option<&Value>;
}

/// A scope with no bindings.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyScope;

impl Scope for EmptyScope {
    fn lookup(&self, _name: &str) -> Option<&Value> {
        None
    }
}

impl Scope for BTreeMap<String, Value> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

impl Scope for HashMap<String, Value> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

/// One `NAME = value` statement, already evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub name: String,
    pub value: Value,
    /// Line of the statement (1-based).
    pub line: usize,
}

/// An `import` or `from ... import ...` statement. Imports carry no value;
/// they are reported so callers can log them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub module: String,
    pub line: usize,
}

/// A parsed settings document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// Assignments in source order, including repeated names.
    pub assignments: Vec<Assignment>,
    pub imports: Vec<Import>,
}

/// Parse a document with no outer bindings.
pub fn parse(src: &str) -> Result<Document, SyntaxError> {
    parse_with_scope(src, &EmptyScope)
}

/// Parse a document whose expressions may reference names bound in `scope`.
pub fn parse_with_scope(src: &str, scope: &dyn Scope) -> Result<Document, SyntaxError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        scope,
        locals: HashMap::new(),
        depth: 0,
    };
    parser.document()
}

/// Parse and evaluate a single expression, e.g. the right side of a
/// command-line override.
pub fn parse_expression(src: &str, scope: &dyn Scope) -> Result<Value, SyntaxError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        scope,
        locals: HashMap::new(),
        depth: 0,
    };
    parser.skip_newlines();
    let value = parser.expression_list()?;
    parser.skip_newlines();
    let token = parser.peek();
    if token.kind != TokenKind::Eof {
        return Err(parser.unexpected(token, "end of expression"));
    }
    Ok(value)
}

struct Parser<'s> {
    tokens: Vec<Token>,
    pos: usize,
    scope: &'s dyn Scope,
    locals: HashMap<String, Value>,
    depth: usize,
}

impl<'s> Parser<'s> {
    fn peek(&self) -> Token {
        // tokenize always terminates the stream with Eof
        self.tokens[self.pos.min(self.tokens.len() - 1)].clone()
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token, SyntaxError> {
        let token = self.peek();
        if &token.kind == kind {
            Ok(self.advance())
        } else {
            Err(self.unexpected(token, &kind.describe()))
        }
    }

    fn unexpected(&self, token: Token, expected: &str) -> SyntaxError {
        SyntaxError::new(
            token.line,
            token.column,
            format!("expected {}, found {}", expected, token.kind.describe()),
        )
    }

    fn enter(&mut self, token: &Token) -> Result<(), SyntaxError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(SyntaxError::new(
                token.line,
                token.column,
                format!("too many nested brackets (limit {})", MAX_NESTING),
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Semicolon) {
            self.advance();
        }
    }

    fn document(&mut self) -> Result<Document, SyntaxError> {
        let mut doc = Document::default();
        loop {
            self.skip_newlines();
            let token = self.peek();
            match &token.kind {
                TokenKind::Eof => break,
                TokenKind::Name(name) if name == "import" => {
                    self.advance();
                    let module = self.dotted_name()?;
                    while self.eat(&TokenKind::Comma) {
                        self.dotted_name()?;
                    }
                    doc.imports.push(Import {
                        module,
                        line: token.line,
                    });
                }
                TokenKind::Name(name) if name == "from" => {
                    self.advance();
                    let module = self.dotted_name()?;
                    self.keyword("import")?;
                    if !self.eat(&TokenKind::Star) {
                        self.import_names()?;
                    }
                    doc.imports.push(Import {
                        module,
                        line: token.line,
                    });
                }
                TokenKind::Name(_) => {
                    let assignment = self.assignment()?;
                    self.locals
                        .insert(assignment.name.clone(), assignment.value.clone());
                    doc.assignments.push(assignment);
                }
                _ => return Err(self.unexpected(token, "a setting name")),
            }
            self.end_of_statement()?;
        }
        Ok(doc)
    }

    fn end_of_statement(&mut self) -> Result<(), SyntaxError> {
        let token = self.peek();
        match token.kind {
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof => Ok(()),
            _ => Err(self.unexpected(token, "end of line")),
        }
    }

    fn keyword(&mut self, word: &str) -> Result<(), SyntaxError> {
        let token = self.advance();
        match &token.kind {
            TokenKind::Name(n) if n == word => Ok(()),
            _ => Err(self.unexpected(token, &format!("'{}'", word))),
        }
    }

    fn identifier(&mut self) -> Result<(String, Token), SyntaxError> {
        let token = self.advance();
        match &token.kind {
            TokenKind::Name(n) => Ok((n.clone(), token)),
            _ => Err(self.unexpected(token, "a name")),
        }
    }

    fn dotted_name(&mut self) -> Result<String, SyntaxError> {
        let mut name = String::new();
        // Relative imports
        while self.eat(&TokenKind::Dot) {
            name.push('.');
        }
        let (first, _) = self.identifier()?;
        name.push_str(&first);
        while self.eat(&TokenKind::Dot) {
            let (part, _) = self.identifier()?;
            name.push('.');
            name.push_str(&part);
        }
        Ok(name)
    }

    fn import_names(&mut self) -> Result<(), SyntaxError> {
        let parenthesized = self.eat(&TokenKind::LParen);
        loop {
            self.identifier()?;
            if matches!(self.peek_kind(), TokenKind::Name(n) if n == "as") {
                self.advance();
                self.identifier()?;
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
            if parenthesized && self.peek_kind() == &TokenKind::RParen {
                break;
            }
        }
        if parenthesized {
            self.expect(&TokenKind::RParen)?;
        }
        Ok(())
    }

    fn assignment(&mut self) -> Result<Assignment, SyntaxError> {
        let (name, token) = self.identifier()?;
        if is_reserved(&name) {
            return Err(SyntaxError::new(
                token.line,
                token.column,
                format!("cannot assign to '{}'", name),
            ));
        }
        self.expect(&TokenKind::Equals)?;
        let value = self.expression_list()?;
        Ok(Assignment {
            name,
            value,
            line: token.line,
        })
    }

    /// `a, b` without brackets is a tuple, as on the right side of an assignment.
    fn expression_list(&mut self) -> Result<Value, SyntaxError> {
        let first = self.expression()?;
        if self.peek_kind() != &TokenKind::Comma {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.at_statement_end() {
                break;
            }
            items.push(self.expression()?);
        }
        Ok(Value::Tuple(items))
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof
        )
    }

    fn expression(&mut self) -> Result<Value, SyntaxError> {
        let mut left = self.unary()?;
        while self.peek_kind() == &TokenKind::Plus {
            let op = self.advance();
            let right = self.unary()?;
            left = add(left, right, &op)?;
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Value, SyntaxError> {
        if self.peek_kind() == &TokenKind::Minus {
            let op = self.advance();
            self.enter(&op)?;
            let operand = self.unary()?;
            self.leave();
            return match operand {
                Value::Int(i) => i.checked_neg().map(Value::Int).ok_or_else(|| {
                    SyntaxError::new(op.line, op.column, "integer literal out of range")
                }),
                Value::Float(f) => Ok(Value::Float(-f)),
                other => Err(SyntaxError::new(
                    op.line,
                    op.column,
                    format!("bad operand type for unary -: '{}'", other.type_name()),
                )),
            };
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<Value, SyntaxError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Str(mut s) => {
                // Adjacent literals concatenate
                while let TokenKind::Str(next) = self.peek_kind() {
                    s.push_str(next);
                    self.advance();
                }
                Ok(Value::Str(s))
            }
            TokenKind::Int(i) => Ok(Value::Int(i)),
            TokenKind::Float(f) => Ok(Value::Float(f)),
            TokenKind::Name(ref name) => match name.as_str() {
                "None" => Ok(Value::None),
                "True" => Ok(Value::Bool(true)),
                "False" => Ok(Value::Bool(false)),
                _ => self.reference(name, &token),
            },
            TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => {
                self.enter(&token)?;
                let value = match token.kind {
                    TokenKind::LParen => self.paren(),
                    TokenKind::LBracket => self.items(&TokenKind::RBracket).map(Value::List),
                    _ => self.dict(),
                }?;
                self.leave();
                Ok(value)
            }
            _ => Err(self.unexpected(token, "a value")),
        }
    }

    fn reference(&self, name: &str, token: &Token) -> Result<Value, SyntaxError> {
        self.locals
            .get(name)
            .or_else(|| self.scope.lookup(name))
            .cloned()
            .ok_or_else(|| {
                SyntaxError::new(
                    token.line,
                    token.column,
                    format!("name '{}' is not defined", name),
                )
            })
    }

    fn paren(&mut self) -> Result<Value, SyntaxError> {
        if self.eat(&TokenKind::RParen) {
            return Ok(Value::Tuple(Vec::new()));
        }
        let first = self.expression()?;
        if self.eat(&TokenKind::RParen) {
            // Grouping, not a tuple
            return Ok(first);
        }
        self.expect(&TokenKind::Comma)?;
        let mut items = vec![first];
        items.extend(self.items(&TokenKind::RParen)?);
        Ok(Value::Tuple(items))
    }

    /// Comma-separated expressions up to and including `close`, trailing comma allowed.
    fn items(&mut self, close: &TokenKind) -> Result<Vec<Value>, SyntaxError> {
        let mut items = Vec::new();
        loop {
            if self.eat(close) {
                return Ok(items);
            }
            items.push(self.expression()?);
            if !self.eat(&TokenKind::Comma) {
                self.expect(close)?;
                return Ok(items);
            }
        }
    }

    fn dict(&mut self) -> Result<Value, SyntaxError> {
        let mut entries: Vec<(String, Value)> = Vec::new();
        loop {
            if self.eat(&TokenKind::RBrace) {
                break;
            }
            let key_token = self.peek();
            let key = match self.expression()? {
                Value::Str(s) => s,
                other => {
                    return Err(SyntaxError::new(
                        key_token.line,
                        key_token.column,
                        format!("dictionary keys must be strings, found {}", other.type_name()),
                    ));
                }
            };
            self.expect(&TokenKind::Colon)?;
            let value = self.expression()?;
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some(entry) => entry.1 = value,
                None => entries.push((key, value)),
            }
            if !self.eat(&TokenKind::Comma) {
                self.expect(&TokenKind::RBrace)?;
                break;
            }
        }
        Ok(Value::Dict(entries))
    }
}

fn is_reserved(name: &str) -> bool {
    matches!(
        name,
        "None" | "True" | "False" | "import" | "from" | "as" | "def" | "class" | "if" | "for"
    )
}

fn add(left: Value, right: Value, op: &Token) -> Result<Value, SyntaxError> {
    match (left, right) {
        (Value::Str(mut a), Value::Str(b)) => {
            a.push_str(&b);
            Ok(Value::Str(a))
        }
        (Value::List(mut a), Value::List(b)) => {
            a.extend(b);
            Ok(Value::List(a))
        }
        (Value::Tuple(mut a), Value::Tuple(b)) => {
            a.extend(b);
            Ok(Value::Tuple(a))
        }
        (Value::Int(a), Value::Int(b)) => a
            .checked_add(b)
            .map(Value::Int)
            .ok_or_else(|| SyntaxError::new(op.line, op.column, "integer overflow")),
        (Value::Int(a), Value::Float(b)) => finite(a as f64 + b, op),
        (Value::Float(a), Value::Int(b)) => finite(a + b as f64, op),
        (Value::Float(a), Value::Float(b)) => finite(a + b, op),
        (a, b) => Err(SyntaxError::new(
            op.line,
            op.column,
            format!(
                "unsupported operand types for +: '{}' and '{}'",
                a.type_name(),
                b.type_name()
            ),
        )),
    }
}

fn finite(sum: f64, op: &Token) -> Result<Value, SyntaxError> {
    if sum.is_finite() {
        Ok(Value::Float(sum))
    } else {
        Err(SyntaxError::new(op.line, op.column, "float result out of range"))
    }
}
