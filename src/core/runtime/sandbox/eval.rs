// Statement and expression evaluation over the lexer's token stream.
//
// Parsing and execution happen in one pass. Every production takes an `exec` flag; when it is
// false the tokens are still consumed (so branches not taken are skipped correctly) but no
// bindings change and no files are loaded.
use std::path::{Path, PathBuf};

use crate::core::error::{Error, ErrorKind};
use crate::core::lexer::{self, Token, TokenKind};

use super::value::{self, ArithOp, Value};
use super::{MAX_INCLUDE_DEPTH, Scope};

const BUILTINS: &[&str] = &[
    "define",
    "defined",
    "constant",
    "getenv",
    "dirname",
    "basename",
    "isset",
    "empty",
    "ini_set",
    "error_reporting",
    "strtolower",
    "strtoupper",
    "trim",
    "file_exists",
    "function_exists",
    "intval",
    "boolval",
];

pub(super) enum Flow {
    Next,
    Return,
}

pub(super) struct Interpreter<'s, 'a> {
    scope: &'s mut Scope,
    file: PathBuf,
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'s, 'a> Interpreter<'s, 'a> {
    pub(super) fn new(scope: &'s mut Scope, file: PathBuf, source: &'a str) -> Self {
        Self {
            scope,
            file,
            source,
            tokens: lexer::significant(lexer::tokenize(source)),
            pos: 0,
        }
    }

    /// Execute the whole file; a top-level `return` ends it early.
    pub(super) fn run(&mut self) -> Result<(), Error> {
        while self.pos < self.tokens.len() {
            if let Flow::Return = self.statement(true)? {
                break;
            }
        }
        Ok(())
    }

    // ---- token helpers ----

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek_kind_at(0)
    }

    fn peek_kind_at(&self, ahead: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + ahead).map(|token| token.kind)
    }

    fn peek_word(&self, word: &str) -> bool {
        self.peek_word_at(0, word)
    }

    fn peek_word_at(&self, ahead: usize, word: &str) -> bool {
        self.tokens
            .get(self.pos + ahead)
            .is_some_and(|token| token.is_word(self.source, word))
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), Error> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn end_statement(&mut self) -> Result<(), Error> {
        match self.peek_kind() {
            Some(TokenKind::Semicolon) => {
                self.pos += 1;
                Ok(())
            }
            // `?>` implies a semicolon; the statement loop consumes it.
            Some(TokenKind::CloseTag) | None => Ok(()),
            Some(_) => Err(self.unexpected()),
        }
    }

    fn line_at(&self, offset: usize) -> usize {
        self.source[..offset.min(self.source.len())]
            .matches('\n')
            .count()
            + 1
    }

    fn current_line(&self) -> usize {
        let offset = match self.peek() {
            Some(token) => token.span.start,
            None => self.source.len(),
        };
        self.line_at(offset)
    }

    fn fatal(&self, message: impl Into<String>) -> Error {
        Error::new(ErrorKind::ExecutionFailed)
            .with_message(format!(
                "PHP Fatal error: {} in {} on line {}",
                message.into(),
                self.file.display(),
                self.current_line()
            ))
            .with_path(&self.file)
    }

    fn unsupported(&self, what: &str) -> Error {
        self.fatal(format!("{what} is not supported by the sandbox runtime"))
            .with_hint("Install the PHP CLI and use --runtime php for this file.")
    }

    fn unexpected(&self) -> Error {
        match self.peek() {
            Some(token) => self.fatal(format!(
                "syntax error, unexpected '{}'",
                token.text(self.source)
            )),
            None => self.fatal("syntax error, unexpected end of file"),
        }
    }

    fn warn(&mut self, message: impl Into<String>) {
        let line = self.current_line();
        let warning = format!(
            "Warning: {} in {} on line {line}",
            message.into(),
            self.file.display()
        );
        self.scope.warnings.push(warning);
    }

    // ---- statements ----

    fn statement(&mut self, exec: bool) -> Result<Flow, Error> {
        let Some(token) = self.peek() else {
            return Ok(Flow::Next);
        };
        match token.kind {
            TokenKind::OpenTag
            | TokenKind::CloseTag
            | TokenKind::InlineHtml
            | TokenKind::Semicolon => {
                self.pos += 1;
                Ok(Flow::Next)
            }
            TokenKind::LBrace => self.block(exec),
            TokenKind::Variable
                if matches!(
                    self.peek_kind_at(1),
                    Some(TokenKind::Assign | TokenKind::CompoundAssign)
                ) =>
            {
                self.assignment(exec)?;
                Ok(Flow::Next)
            }
            TokenKind::Ident => {
                let word = token.text(self.source).to_ascii_lowercase();
                match word.as_str() {
                    "if" => self.if_statement(exec),
                    "require" | "require_once" | "include" | "include_once" => {
                        self.include_statement(&word, exec)?;
                        Ok(Flow::Next)
                    }
                    "return" => {
                        self.pos += 1;
                        if !matches!(
                            self.peek_kind(),
                            Some(TokenKind::Semicolon | TokenKind::CloseTag) | None
                        ) {
                            self.expression(exec)?;
                        }
                        self.end_statement()?;
                        Ok(if exec { Flow::Return } else { Flow::Next })
                    }
                    "echo" | "print" => {
                        self.pos += 1;
                        self.expression(exec)?;
                        while self.eat(TokenKind::Comma) {
                            self.expression(exec)?;
                        }
                        self.end_statement()?;
                        Ok(Flow::Next)
                    }
                    "function" | "class" | "interface" | "trait" | "enum" | "namespace"
                    | "use" | "while" | "for" | "foreach" | "do" | "switch" | "try"
                    | "global" | "static" => Err(self.unsupported(&format!("'{word}'"))),
                    _ => self.expression_statement(exec),
                }
            }
            _ => self.expression_statement(exec),
        }
    }

    fn expression_statement(&mut self, exec: bool) -> Result<Flow, Error> {
        self.expression(exec)?;
        self.end_statement()?;
        Ok(Flow::Next)
    }

    fn block(&mut self, exec: bool) -> Result<Flow, Error> {
        self.expect(TokenKind::LBrace)?;
        loop {
            match self.peek_kind() {
                Some(TokenKind::RBrace) => {
                    self.pos += 1;
                    return Ok(Flow::Next);
                }
                None => return Err(self.unexpected()),
                Some(_) => {
                    if let Flow::Return = self.statement(exec)? {
                        return Ok(Flow::Return);
                    }
                }
            }
        }
    }

    fn branch(&mut self, exec: bool) -> Result<Flow, Error> {
        match self.peek_kind() {
            Some(TokenKind::LBrace) => self.block(exec),
            Some(TokenKind::Colon) => Err(self.unsupported("alternative 'if:' syntax")),
            _ => self.statement(exec),
        }
    }

    fn condition(&mut self, exec: bool) -> Result<bool, Error> {
        self.expect(TokenKind::LParen)?;
        let value = self.expression(exec)?;
        self.expect(TokenKind::RParen)?;
        Ok(exec && value.truthy())
    }

    fn if_statement(&mut self, exec: bool) -> Result<Flow, Error> {
        self.pos += 1;
        let mut done = self.condition(exec)?;
        if let Flow::Return = self.branch(done)? {
            return Ok(Flow::Return);
        }
        loop {
            let skip = if self.peek_word("elseif") {
                1
            } else if self.peek_word("else") && self.peek_word_at(1, "if") {
                2
            } else if self.peek_word("else") {
                self.pos += 1;
                return self.branch(exec && !done);
            } else {
                return Ok(Flow::Next);
            };
            self.pos += skip;
            let take = self.condition(exec && !done)?;
            if let Flow::Return = self.branch(take)? {
                return Ok(Flow::Return);
            }
            done |= take;
        }
    }

    fn assignment(&mut self, exec: bool) -> Result<(), Error> {
        let name = self.variable_name(self.pos);
        let operator = self.tokens[self.pos + 1].text(self.source).to_string();
        self.pos += 2;
        if operator == "??=" {
            let current = self.scope.variable(&name).cloned().unwrap_or(Value::Null);
            let value = self.expression(exec && current.is_null())?;
            self.end_statement()?;
            if exec && current.is_null() {
                self.scope.set_variable(&name, value);
            }
            return Ok(());
        }
        let rhs = self.expression(exec)?;
        self.end_statement()?;
        if !exec {
            return Ok(());
        }
        let value = match operator.as_str() {
            "=" => rhs,
            _ => {
                let current = self.read_variable(&name);
                match operator.as_str() {
                    ".=" => Value::Str(current.to_php_string() + &rhs.to_php_string()),
                    "+=" => self.arith(ArithOp::Add, &current, &rhs)?,
                    "-=" => self.arith(ArithOp::Sub, &current, &rhs)?,
                    "*=" => self.arith(ArithOp::Mul, &current, &rhs)?,
                    _ => self.arith(ArithOp::Div, &current, &rhs)?,
                }
            }
        };
        self.scope.set_variable(&name, value);
        Ok(())
    }

    fn include_statement(&mut self, word: &str, exec: bool) -> Result<(), Error> {
        self.pos += 1;
        let target = self.expression(exec)?;
        self.end_statement()?;
        if exec {
            self.include(word, &target.to_php_string())?;
        }
        Ok(())
    }

    fn include(&mut self, word: &str, target: &str) -> Result<(), Error> {
        let required = word.starts_with("require");
        let once = word.ends_with("_once");
        let Some(path) = self.resolve_include(target) else {
            if required {
                return Err(self.fatal(format!(
                    "Uncaught Error: Failed opening required '{target}'"
                )));
            }
            self.warn(format!(
                "{word}({target}): Failed to open stream: No such file or directory"
            ));
            return Ok(());
        };
        let path = std::fs::canonicalize(&path).unwrap_or(path);
        if once && self.scope.included.contains(&path) {
            return Ok(());
        }
        if self.scope.depth >= MAX_INCLUDE_DEPTH {
            return Err(self.fatal(format!(
                "include nesting deeper than {MAX_INCLUDE_DEPTH} levels at '{target}'"
            )));
        }
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if required => {
                return Err(self
                    .fatal(format!("Uncaught Error: Failed opening required '{target}'"))
                    .with_source(err));
            }
            Err(err) => {
                self.warn(format!("{word}({target}): Failed to open stream: {err}"));
                return Ok(());
            }
        };
        tracing::debug!(file = %path.display(), "sandbox loading included file");
        self.scope.included.push(path.clone());
        self.scope.depth += 1;
        let result = Interpreter::new(&mut *self.scope, path, &contents).run();
        self.scope.depth -= 1;
        result
    }

    // Absolute paths as given; relative ones against the working directory, then the
    // including file's directory.
    fn resolve_include(&self, target: &str) -> Option<PathBuf> {
        if target.is_empty() {
            return None;
        }
        let path = Path::new(target);
        if path.is_absolute() {
            return path.is_file().then(|| path.to_path_buf());
        }
        let cwd = std::env::current_dir().ok().map(|dir| dir.join(path));
        let sibling = self.file.parent().map(|dir| dir.join(path));
        cwd.into_iter()
            .chain(sibling)
            .find(|candidate| candidate.is_file())
    }

    // ---- expressions ----

    fn expression(&mut self, exec: bool) -> Result<Value, Error> {
        let mut lhs = self.low_and(exec)?;
        while self.peek_word("or") {
            self.pos += 1;
            let left = lhs.truthy();
            let rhs = self.low_and(exec && !left)?;
            lhs = Value::Bool(left || rhs.truthy());
        }
        Ok(lhs)
    }

    fn low_and(&mut self, exec: bool) -> Result<Value, Error> {
        let mut lhs = self.ternary(exec)?;
        while self.peek_word("and") {
            self.pos += 1;
            let left = lhs.truthy();
            let rhs = self.ternary(exec && left)?;
            lhs = Value::Bool(left && rhs.truthy());
        }
        Ok(lhs)
    }

    fn ternary(&mut self, exec: bool) -> Result<Value, Error> {
        let cond = self.coalesce(exec)?;
        if !self.eat(TokenKind::Question) {
            return Ok(cond);
        }
        let truthy = cond.truthy();
        if self.eat(TokenKind::Colon) {
            let otherwise = self.ternary(exec && !truthy)?;
            return Ok(if truthy { cond } else { otherwise });
        }
        let then = self.ternary(exec && truthy)?;
        self.expect(TokenKind::Colon)?;
        let otherwise = self.ternary(exec && !truthy)?;
        Ok(if truthy { then } else { otherwise })
    }

    fn coalesce(&mut self, exec: bool) -> Result<Value, Error> {
        // `$undefined ?? x` must not warn.
        let lhs = if self.peek_kind() == Some(TokenKind::Variable)
            && self.peek_kind_at(1) == Some(TokenKind::Coalesce)
        {
            let name = self.variable_name(self.pos);
            self.pos += 1;
            self.scope.variable(&name).cloned().unwrap_or(Value::Null)
        } else {
            self.or_expr(exec)?
        };
        if !self.eat(TokenKind::Coalesce) {
            return Ok(lhs);
        }
        let fallback = self.coalesce(exec && lhs.is_null())?;
        Ok(if lhs.is_null() { fallback } else { lhs })
    }

    fn or_expr(&mut self, exec: bool) -> Result<Value, Error> {
        let mut lhs = self.and_expr(exec)?;
        while self.eat(TokenKind::OrOr) {
            let left = lhs.truthy();
            let rhs = self.and_expr(exec && !left)?;
            lhs = Value::Bool(left || rhs.truthy());
        }
        Ok(lhs)
    }

    fn and_expr(&mut self, exec: bool) -> Result<Value, Error> {
        let mut lhs = self.equality(exec)?;
        while self.eat(TokenKind::AndAnd) {
            let left = lhs.truthy();
            let rhs = self.equality(exec && left)?;
            lhs = Value::Bool(left && rhs.truthy());
        }
        Ok(lhs)
    }

    fn equality(&mut self, exec: bool) -> Result<Value, Error> {
        let mut lhs = self.comparison(exec)?;
        loop {
            let Some(kind @ (TokenKind::Eq
            | TokenKind::NotEq
            | TokenKind::Identical
            | TokenKind::NotIdentical)) = self.peek_kind()
            else {
                return Ok(lhs);
            };
            self.pos += 1;
            let rhs = self.comparison(exec)?;
            lhs = Value::Bool(match kind {
                TokenKind::Eq => value::loose_eq(&lhs, &rhs),
                TokenKind::NotEq => !value::loose_eq(&lhs, &rhs),
                TokenKind::Identical => value::strict_eq(&lhs, &rhs),
                _ => !value::strict_eq(&lhs, &rhs),
            });
        }
    }

    fn comparison(&mut self, exec: bool) -> Result<Value, Error> {
        let mut lhs = self.concat(exec)?;
        loop {
            let Some(kind @ (TokenKind::Lt | TokenKind::Gt | TokenKind::Le | TokenKind::Ge)) =
                self.peek_kind()
            else {
                return Ok(lhs);
            };
            self.pos += 1;
            let rhs = self.concat(exec)?;
            let ordering = value::compare(&lhs, &rhs);
            lhs = Value::Bool(match kind {
                TokenKind::Lt => ordering.is_lt(),
                TokenKind::Gt => ordering.is_gt(),
                TokenKind::Le => ordering.is_le(),
                _ => ordering.is_ge(),
            });
        }
    }

    fn concat(&mut self, exec: bool) -> Result<Value, Error> {
        let mut lhs = self.additive(exec)?;
        while self.eat(TokenKind::Dot) {
            let rhs = self.additive(exec)?;
            lhs = Value::Str(lhs.to_php_string() + &rhs.to_php_string());
        }
        Ok(lhs)
    }

    fn additive(&mut self, exec: bool) -> Result<Value, Error> {
        let mut lhs = self.multiplicative(exec)?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => ArithOp::Add,
                Some(TokenKind::Minus) => ArithOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.multiplicative(exec)?;
            lhs = if exec {
                self.arith(op, &lhs, &rhs)?
            } else {
                Value::Null
            };
        }
    }

    fn multiplicative(&mut self, exec: bool) -> Result<Value, Error> {
        let mut lhs = self.unary(exec)?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => ArithOp::Mul,
                Some(TokenKind::Slash) => ArithOp::Div,
                Some(TokenKind::Percent) => ArithOp::Mod,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary(exec)?;
            lhs = if exec {
                self.arith(op, &lhs, &rhs)?
            } else {
                Value::Null
            };
        }
    }

    fn arith(&self, op: ArithOp, lhs: &Value, rhs: &Value) -> Result<Value, Error> {
        value::arith(op, lhs, rhs).ok_or_else(|| {
            let what = match op {
                ArithOp::Mod => "Modulo by zero",
                _ => "Division by zero",
            };
            self.fatal(format!("Uncaught DivisionByZeroError: {what}"))
        })
    }

    fn unary(&mut self, exec: bool) -> Result<Value, Error> {
        match self.peek_kind() {
            Some(TokenKind::Bang) => {
                self.pos += 1;
                Ok(Value::Bool(!self.unary(exec)?.truthy()))
            }
            Some(TokenKind::Minus) => {
                self.pos += 1;
                let operand = self.unary(exec)?;
                if !exec {
                    return Ok(Value::Null);
                }
                self.arith(ArithOp::Mul, &operand, &Value::Int(-1))
            }
            Some(TokenKind::Plus) => {
                self.pos += 1;
                Ok(self.unary(exec)?.to_number())
            }
            Some(TokenKind::At) => {
                self.pos += 1;
                self.unary(exec)
            }
            Some(TokenKind::LParen) if self.cast_type().is_some() => {
                let target = self.cast_type().unwrap_or_default();
                self.pos += 3;
                let operand = self.unary(exec)?;
                self.cast(&target, operand)
            }
            _ => self.primary(exec),
        }
    }

    fn cast_type(&self) -> Option<String> {
        if self.peek_kind_at(2) != Some(TokenKind::RParen) {
            return None;
        }
        let token = self.tokens.get(self.pos + 1)?;
        if token.kind != TokenKind::Ident {
            return None;
        }
        let name = token.text(self.source).to_ascii_lowercase();
        matches!(
            name.as_str(),
            "int" | "integer" | "bool" | "boolean" | "float" | "double" | "string" | "array"
                | "object"
        )
        .then_some(name)
    }

    fn cast(&self, target: &str, operand: Value) -> Result<Value, Error> {
        Ok(match target {
            "int" | "integer" => Value::Int(operand.to_int()),
            "bool" | "boolean" => Value::Bool(operand.truthy()),
            "float" | "double" => match operand.to_number() {
                Value::Int(i) => Value::Float(i as f64),
                other => other,
            },
            "string" => Value::Str(operand.to_php_string()),
            _ => return Err(self.unsupported(&format!("the ({target}) cast"))),
        })
    }

    fn primary(&mut self, exec: bool) -> Result<Value, Error> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.unexpected());
        };
        match token.kind {
            TokenKind::Number => {
                self.pos += 1;
                Ok(value::parse_number_literal(token.text(self.source)))
            }
            TokenKind::SingleQuoted => {
                self.pos += 1;
                Ok(Value::Str(token.string_value(self.source).unwrap_or_default()))
            }
            TokenKind::DoubleQuoted => {
                self.pos += 1;
                let text = token.text(self.source);
                let body = &text[1..text.len() - 1];
                if exec {
                    self.interpolate(body).map(Value::Str)
                } else {
                    Ok(Value::Null)
                }
            }
            TokenKind::Heredoc => {
                let Some((body, nowdoc)) = lexer::heredoc_body(token.text(self.source)) else {
                    return Err(self.unexpected());
                };
                self.pos += 1;
                if !exec {
                    Ok(Value::Null)
                } else if nowdoc {
                    Ok(Value::Str(body))
                } else {
                    self.interpolate(&body).map(Value::Str)
                }
            }
            TokenKind::Variable => {
                self.pos += 1;
                if matches!(
                    self.peek_kind(),
                    Some(TokenKind::LBracket | TokenKind::Arrow | TokenKind::LParen)
                ) {
                    return Err(self.unsupported("array, object, or callable access"));
                }
                let name = self.variable_name(self.pos - 1);
                Ok(if exec {
                    self.read_variable(&name)
                } else {
                    Value::Null
                })
            }
            TokenKind::LParen => {
                self.pos += 1;
                let inner = self.expression(exec)?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBracket => Err(self.unsupported("array literal")),
            TokenKind::Ident => self.identifier(&token, exec),
            _ => Err(self.unexpected()),
        }
    }

    fn identifier(&mut self, token: &Token, exec: bool) -> Result<Value, Error> {
        let text = token.text(self.source).trim_start_matches('\\');
        let lower = text.to_ascii_lowercase();
        match lower.as_str() {
            "true" => {
                self.pos += 1;
                return Ok(Value::Bool(true));
            }
            "false" => {
                self.pos += 1;
                return Ok(Value::Bool(false));
            }
            "null" => {
                self.pos += 1;
                return Ok(Value::Null);
            }
            "__file__" => {
                self.pos += 1;
                return Ok(Value::Str(self.file.display().to_string()));
            }
            "__dir__" => {
                self.pos += 1;
                let dir = self.file.parent().unwrap_or(Path::new("."));
                return Ok(Value::Str(dir.display().to_string()));
            }
            "__line__" => {
                self.pos += 1;
                return Ok(Value::Int(self.line_at(token.span.start) as i64));
            }
            "array" | "list" => return Err(self.unsupported("array literal")),
            "new" | "function" | "fn" | "match" | "static" | "clone" | "include"
            | "include_once" | "require" | "require_once" | "print" => {
                return Err(self.unsupported(&format!("'{lower}' in an expression")));
            }
            _ => {}
        }
        match self.peek_kind_at(1) {
            Some(TokenKind::LParen) => {
                self.pos += 2;
                self.call(&lower, exec)
            }
            Some(TokenKind::DoubleColon) => Err(self.unsupported("class constant access")),
            _ => {
                self.pos += 1;
                if !exec {
                    return Ok(Value::Null);
                }
                match self.scope.constant(text) {
                    Some(value) => Ok(value.clone()),
                    None => Err(self.fatal(format!("Uncaught Error: Undefined constant \"{text}\""))),
                }
            }
        }
    }

    fn variable_name(&self, index: usize) -> String {
        self.tokens[index].text(self.source)[1..].to_string()
    }

    fn read_variable(&mut self, name: &str) -> Value {
        match self.scope.variable(name) {
            Some(value) => value.clone(),
            None => {
                self.warn(format!("Undefined variable ${name}"));
                Value::Null
            }
        }
    }

    // Simple `$name` interpolation inside double-quoted strings.
    fn interpolate(&mut self, body: &str) -> Result<String, Error> {
        let mut out = String::new();
        let mut literal = String::new();
        let mut chars = body.char_indices().peekable();
        while let Some((idx, ch)) = chars.next() {
            match ch {
                '\\' => {
                    literal.push(ch);
                    if let Some((_, next)) = chars.next() {
                        literal.push(next);
                    }
                }
                '{' if body[idx + 1..].starts_with('$') => {
                    return Err(self.unsupported("complex string interpolation"));
                }
                '$' if body[idx + 1..].starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') => {
                    out.push_str(&lexer::unescape_double(&literal));
                    literal.clear();
                    let mut name = String::new();
                    while let Some(&(_, c)) = chars.peek() {
                        if c.is_ascii_alphanumeric() || c == '_' {
                            name.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    if matches!(chars.peek(), Some((_, '[')))
                        || body[idx + 1 + name.len()..].starts_with("->")
                    {
                        return Err(self.unsupported("complex string interpolation"));
                    }
                    out.push_str(&self.read_variable(&name).to_php_string());
                }
                _ => literal.push(ch),
            }
        }
        out.push_str(&lexer::unescape_double(&literal));
        Ok(out)
    }

    // ---- function calls ----

    fn call(&mut self, name: &str, exec: bool) -> Result<Value, Error> {
        if name == "isset" || name == "empty" {
            return self.probe(name, exec);
        }
        let mut args = Vec::new();
        if !self.eat(TokenKind::RParen) {
            loop {
                args.push(self.expression(exec)?);
                if self.eat(TokenKind::RParen) {
                    break;
                }
                self.expect(TokenKind::Comma)?;
                if self.eat(TokenKind::RParen) {
                    break;
                }
            }
        }
        if !exec {
            return Ok(Value::Null);
        }
        self.builtin(name, &args)
    }

    // `isset($a, $b)` and `empty($a)` inspect variables without warning.
    fn probe(&mut self, name: &str, exec: bool) -> Result<Value, Error> {
        let mut all_set = true;
        let mut is_empty: bool;
        loop {
            if self.peek_kind() == Some(TokenKind::Variable)
                && matches!(
                    self.peek_kind_at(1),
                    Some(TokenKind::Comma | TokenKind::RParen)
                )
            {
                let var = self.variable_name(self.pos);
                self.pos += 1;
                let value = self.scope.variable(&var).cloned();
                all_set &= value.as_ref().is_some_and(|v| !v.is_null());
                is_empty = !value.is_some_and(|v| v.truthy());
            } else if name == "empty" {
                is_empty = !self.expression(exec)?.truthy();
            } else {
                return Err(self.unsupported("isset() on anything but plain variables"));
            }
            if self.eat(TokenKind::RParen) {
                break;
            }
            self.expect(TokenKind::Comma)?;
        }
        Ok(Value::Bool(if name == "isset" { all_set } else { is_empty }))
    }

    fn arg<'v>(&self, name: &str, args: &'v [Value], index: usize) -> Result<&'v Value, Error> {
        args.get(index).ok_or_else(|| {
            self.fatal(format!(
                "Uncaught ArgumentCountError: Too few arguments to function {name}(), {} passed",
                args.len()
            ))
        })
    }

    fn builtin(&mut self, name: &str, args: &[Value]) -> Result<Value, Error> {
        let string_arg = |index: usize| -> Result<String, Error> {
            Ok(self.arg(name, args, index)?.to_php_string())
        };
        let value = match name {
            "define" => {
                let constant = string_arg(0)?;
                let value = self.arg(name, args, 1)?.clone();
                if self.scope.constant(&constant).is_some() {
                    self.warn(format!("Constant {constant} already defined"));
                    Value::Bool(false)
                } else {
                    self.scope.define(&constant, value);
                    Value::Bool(true)
                }
            }
            "defined" => {
                let constant = string_arg(0)?;
                Value::Bool(self.scope.constant(constant.trim_start_matches('\\')).is_some())
            }
            "constant" => {
                let constant = string_arg(0)?;
                match self.scope.constant(constant.trim_start_matches('\\')) {
                    Some(value) => value.clone(),
                    None => {
                        return Err(self.fatal(format!(
                            "Uncaught Error: Undefined constant \"{constant}\""
                        )));
                    }
                }
            }
            "getenv" => {
                let variable = string_arg(0)?;
                std::env::var(&variable)
                    .map(Value::Str)
                    .unwrap_or(Value::Bool(false))
            }
            "dirname" => {
                let mut path = string_arg(0)?;
                let levels = args.get(1).map(Value::to_int).unwrap_or(1).max(1);
                for _ in 0..levels {
                    path = dirname(&path);
                }
                Value::Str(path)
            }
            "basename" => {
                let path = string_arg(0)?;
                Value::Str(
                    Path::new(&path)
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                )
            }
            "ini_set" => {
                self.arg(name, args, 1)?;
                Value::Bool(false)
            }
            "error_reporting" => self.scope.constant("E_ALL").cloned().unwrap_or(Value::Null),
            "strtolower" => Value::Str(string_arg(0)?.to_lowercase()),
            "strtoupper" => Value::Str(string_arg(0)?.to_uppercase()),
            "trim" => Value::Str(
                string_arg(0)?
                    .trim_matches([' ', '\t', '\n', '\r', '\0', '\x0B'])
                    .to_string(),
            ),
            "file_exists" => Value::Bool(Path::new(&string_arg(0)?).exists()),
            "function_exists" => {
                let function = string_arg(0)?.to_ascii_lowercase();
                Value::Bool(BUILTINS.contains(&function.trim_start_matches('\\')))
            }
            "intval" => Value::Int(self.arg(name, args, 0)?.to_int()),
            "boolval" => Value::Bool(self.arg(name, args, 0)?.truthy()),
            _ => {
                return Err(self
                    .fatal(format!("Uncaught Error: Call to undefined function {name}()"))
                    .with_hint(format!(
                        "The sandbox runtime only provides: {}. Use --runtime php for full PHP.",
                        BUILTINS.join(", ")
                    )));
            }
        };
        Ok(value)
    }
}

fn dirname(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    match Path::new(path).parent() {
        Some(parent) if parent.as_os_str().is_empty() => ".".to_string(),
        Some(parent) => parent.display().to_string(),
        None => path.to_string(),
    }
}
