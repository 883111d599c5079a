//! Recursive-descent parser producing [`Program`] trees.
//!
//! Operator precedence follows JavaScript, from loosest to tightest:
//! assignment, conditional, `||`, `&&`, equality, relational, additive,
//! multiplicative, unary/`await`, postfix update, call/member.

use std::sync::Arc;

use super::ast::*;
use super::lexer::{tokenize, Span, SpannedToken, Token};
use super::SyntaxError;
use crate::evaluator::type_coercion::number_to_string;

type ParseResult<T> = Result<T, SyntaxError>;

/// Deepest statement/expression nesting accepted before giving up.
///
/// Every chained operator, member access and call counts as one level, as
/// does every nested statement or parenthesized expression.
const MAX_NESTING: usize = 200;

/// Parse `source` as the body of an async function.
///
/// `return` and `await` are permitted at the top level.
pub fn parse_function_body(source: &str) -> ParseResult<Program> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(tokens);
    let program = parser.body_until_eof()?;
    Ok(program)
}

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    nesting: usize,
    loop_depth: usize,
    /// One entry per enclosing function; `true` when it is async.
    async_stack: Vec<bool>,
}

impl Parser {
    fn new(tokens: Vec<SpannedToken>) -> Self {
        Self {
            tokens,
            pos: 0,
            nesting: 0,
            loop_depth: 0,
            async_stack: vec![true],
        }
    }

    // ---------------------------------------------------------------
    // Token cursor
    // ---------------------------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].token
    }

    fn span(&self) -> Span {
        self.tokens[self.pos].span
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].token.clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn is_punct(&self, p: &str) -> bool {
        matches!(self.peek(), Token::Punct(q) if *q == p)
    }

    fn is_keyword(&self, k: &str) -> bool {
        matches!(self.peek(), Token::Keyword(q) if *q == k)
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        if self.is_punct(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, k: &str) -> bool {
        if self.is_keyword(k) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, p: &str) -> ParseResult<()> {
        if self.eat_punct(p) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", p)))
        }
    }

    fn expect_ident(&mut self) -> ParseResult<String> {
        match self.peek().clone() {
            Token::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        SyntaxError::new(
            format!("expected {}, found {}", expected, self.peek().describe()),
            self.span(),
        )
    }

    /// True when the current token starts a new line relative to the previous one.
    fn on_new_line(&self) -> bool {
        self.pos > 0 && self.tokens[self.pos].span.line > self.tokens[self.pos - 1].span.line
    }

    /// Statement terminator with automatic semicolon insertion at `}`, end of
    /// input, or a line break.
    fn consume_semicolon(&mut self) -> ParseResult<()> {
        if self.eat_punct(";") {
            return Ok(());
        }
        if self.is_punct("}") || matches!(self.peek(), Token::Eof) || self.on_new_line() {
            return Ok(());
        }
        Err(self.unexpected("';'"))
    }

    fn nested<T>(&mut self, f: fn(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        let base = self.nesting;
        self.deepen()?;
        let result = f(self);
        // Folds made inside `f` are released along with this level.
        self.nesting = base;
        result
    }

    fn deepen(&mut self) -> ParseResult<()> {
        if self.nesting >= MAX_NESTING {
            return Err(SyntaxError::new("code is nested too deeply", self.span()));
        }
        self.nesting += 1;
        Ok(())
    }

    fn in_async(&self) -> bool {
        self.async_stack.last().copied().unwrap_or(false)
    }

    // ---------------------------------------------------------------
    // Bodies and statements
    // ---------------------------------------------------------------

    fn body_until_eof(&mut self) -> ParseResult<Program> {
        let directives = self.directive_prologue();
        let mut body = Vec::new();
        while !matches!(self.peek(), Token::Eof) {
            body.push(self.statement()?);
        }
        Ok(Program { directives, body })
    }

    fn directive_prologue(&mut self) -> Vec<String> {
        let mut directives = Vec::new();
        while let Token::Str(text) = self.peek().clone() {
            let ends_here = match self.peek_at(1) {
                Token::Punct(";") | Token::Punct("}") | Token::Eof => true,
                _ => self.tokens[(self.pos + 1).min(self.tokens.len() - 1)].span.line
                    > self.tokens[self.pos].span.line,
            };
            if !ends_here {
                break;
            }
            self.advance();
            self.eat_punct(";");
            directives.push(text);
        }
        directives
    }

    fn block_body(&mut self) -> ParseResult<Vec<Stmt>> {
        self.expect_punct("{")?;
        let mut body = Vec::new();
        while !self.is_punct("}") {
            if matches!(self.peek(), Token::Eof) {
                return Err(self.unexpected("'}'"));
            }
            body.push(self.statement()?);
        }
        self.advance();
        Ok(body)
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        self.nested(Self::statement_inner)
    }

    fn statement_inner(&mut self) -> ParseResult<Stmt> {
        match self.peek().clone() {
            Token::Punct("{") => Ok(Stmt::Block(self.block_body()?)),
            Token::Punct(";") => {
                self.advance();
                Ok(Stmt::Empty)
            }
            Token::Keyword("var") | Token::Keyword("let") | Token::Keyword("const") => {
                let stmt = self.declaration()?;
                self.consume_semicolon()?;
                Ok(stmt)
            }
            Token::Keyword("function") => {
                let decl = self.function(false, true)?;
                Ok(Stmt::Function(decl))
            }
            Token::Ident(ref word)
                if word == "async" && matches!(self.peek_at(1), Token::Keyword("function")) =>
            {
                self.advance();
                let decl = self.function(true, true)?;
                Ok(Stmt::Function(decl))
            }
            Token::Keyword("if") => self.if_statement(),
            Token::Keyword("while") => {
                self.advance();
                self.expect_punct("(")?;
                let test = self.expression()?;
                self.expect_punct(")")?;
                let body = self.loop_body()?;
                Ok(Stmt::While { test, body })
            }
            Token::Keyword("do") => {
                self.advance();
                let body = self.loop_body()?;
                if !self.eat_keyword("while") {
                    return Err(self.unexpected("'while'"));
                }
                self.expect_punct("(")?;
                let test = self.expression()?;
                self.expect_punct(")")?;
                self.eat_punct(";");
                Ok(Stmt::DoWhile { body, test })
            }
            Token::Keyword("for") => self.for_statement(),
            Token::Keyword("return") => {
                self.advance();
                let arg = if self.is_punct(";")
                    || self.is_punct("}")
                    || matches!(self.peek(), Token::Eof)
                    || self.on_new_line()
                {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.consume_semicolon()?;
                Ok(Stmt::Return(arg))
            }
            Token::Keyword("throw") => {
                self.advance();
                if self.on_new_line() {
                    return Err(SyntaxError::new("illegal newline after throw", self.span()));
                }
                let arg = self.expression()?;
                self.consume_semicolon()?;
                Ok(Stmt::Throw(arg))
            }
            Token::Keyword("break") | Token::Keyword("continue") => {
                let span = self.span();
                let is_break = self.is_keyword("break");
                self.advance();
                if self.loop_depth == 0 {
                    let word = if is_break { "break" } else { "continue" };
                    return Err(SyntaxError::new(format!("illegal {} statement", word), span));
                }
                self.consume_semicolon()?;
                Ok(if is_break { Stmt::Break } else { Stmt::Continue })
            }
            Token::Keyword("try") => self.try_statement(),
            _ => {
                let expr = self.expression()?;
                self.consume_semicolon()?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn declaration(&mut self) -> ParseResult<Stmt> {
        let kind = match self.advance() {
            Token::Keyword("var") => DeclKind::Var,
            Token::Keyword("let") => DeclKind::Let,
            _ => DeclKind::Const,
        };
        let mut declarators = Vec::new();
        loop {
            let span = self.span();
            let name = self.expect_ident()?;
            let init = if self.eat_punct("=") {
                Some(self.assignment()?)
            } else {
                None
            };
            if kind == DeclKind::Const && init.is_none() {
                return Err(SyntaxError::new(
                    format!("missing initializer in const declaration '{}'", name),
                    span,
                ));
            }
            declarators.push((name, init));
            if !self.eat_punct(",") {
                break;
            }
        }
        Ok(Stmt::Decl { kind, declarators })
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        self.advance();
        self.expect_punct("(")?;
        let test = self.expression()?;
        self.expect_punct(")")?;
        let consequent = Box::new(self.statement()?);
        let alternate = if self.eat_keyword("else") {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            test,
            consequent,
            alternate,
        })
    }

    fn loop_body(&mut self) -> ParseResult<Box<Stmt>> {
        self.loop_depth += 1;
        let body = self.statement();
        self.loop_depth -= 1;
        Ok(Box::new(body?))
    }

    fn for_statement(&mut self) -> ParseResult<Stmt> {
        self.advance();
        self.expect_punct("(")?;

        let decl_kind = match self.peek() {
            Token::Keyword("var") => Some(DeclKind::Var),
            Token::Keyword("let") => Some(DeclKind::Let),
            Token::Keyword("const") => Some(DeclKind::Const),
            _ => None,
        };

        if let Some(kind) = decl_kind {
            let is_each = matches!(self.peek_at(1), Token::Ident(_))
                && (matches!(self.peek_at(2), Token::Ident(w) if w == "of")
                    || matches!(self.peek_at(2), Token::Keyword("in")));
            if is_each {
                self.advance();
                let name = self.expect_ident()?;
                let over = if self.eat_keyword("in") {
                    IterationKind::Keys
                } else {
                    self.advance();
                    IterationKind::Values
                };
                let iterable = self.expression()?;
                self.expect_punct(")")?;
                let body = self.loop_body()?;
                return Ok(Stmt::ForEach {
                    kind,
                    name,
                    iterable,
                    over,
                    body,
                });
            }
        }

        let init = if self.is_punct(";") {
            None
        } else if decl_kind.is_some() {
            Some(Box::new(self.declaration()?))
        } else {
            Some(Box::new(Stmt::Expr(self.expression()?)))
        };
        self.expect_punct(";")?;
        let test = if self.is_punct(";") {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect_punct(";")?;
        let update = if self.is_punct(")") {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect_punct(")")?;
        let body = self.loop_body()?;
        Ok(Stmt::For {
            init,
            test,
            update,
            body,
        })
    }

    fn try_statement(&mut self) -> ParseResult<Stmt> {
        let span = self.span();
        self.advance();
        let block = self.block_body()?;
        let handler = if self.eat_keyword("catch") {
            let param = if self.eat_punct("(") {
                let name = self.expect_ident()?;
                self.expect_punct(")")?;
                Some(name)
            } else {
                None
            };
            Some(CatchClause {
                param,
                body: self.block_body()?,
            })
        } else {
            None
        };
        let finalizer = if self.eat_keyword("finally") {
            Some(self.block_body()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(SyntaxError::new("missing catch or finally after try", span));
        }
        Ok(Stmt::Try {
            block,
            handler,
            finalizer,
        })
    }

    /// Parses `function name?(params) { body }`; the `async` prefix has
    /// already been consumed when `is_async` is set.
    fn function(&mut self, is_async: bool, require_name: bool) -> ParseResult<Arc<FunctionDecl>> {
        if !self.eat_keyword("function") {
            return Err(self.unexpected("'function'"));
        }
        let name = if matches!(self.peek(), Token::Ident(_)) {
            Some(self.expect_ident()?)
        } else if require_name {
            return Err(self.unexpected("function name"));
        } else {
            None
        };

        self.expect_punct("(")?;
        let mut params: Vec<String> = Vec::new();
        while !self.is_punct(")") {
            let span = self.span();
            let param = self.expect_ident()?;
            if params.contains(&param) {
                return Err(SyntaxError::new(
                    format!("duplicate parameter name '{}'", param),
                    span,
                ));
            }
            params.push(param);
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(")")?;

        let saved_loop_depth = std::mem::replace(&mut self.loop_depth, 0);
        self.async_stack.push(is_async);
        let body = self.function_block();
        self.async_stack.pop();
        self.loop_depth = saved_loop_depth;

        Ok(Arc::new(FunctionDecl {
            name,
            params,
            body: body?,
            is_async,
        }))
    }

    fn function_block(&mut self) -> ParseResult<Program> {
        self.expect_punct("{")?;
        let directives = self.directive_prologue();
        let mut body = Vec::new();
        while !self.is_punct("}") {
            if matches!(self.peek(), Token::Eof) {
                return Err(self.unexpected("'}'"));
            }
            body.push(self.statement()?);
        }
        self.advance();
        Ok(Program { directives, body })
    }

    // ---------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------

    fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        self.nested(Self::assignment_inner)
    }

    fn assignment_inner(&mut self) -> ParseResult<Expr> {
        let span = self.span();
        let target = self.conditional()?;

        let op = match self.peek() {
            Token::Punct("=") => AssignOp(None),
            Token::Punct("+=") => AssignOp(Some(BinaryOp::Add)),
            Token::Punct("-=") => AssignOp(Some(BinaryOp::Sub)),
            Token::Punct("*=") => AssignOp(Some(BinaryOp::Mul)),
            Token::Punct("/=") => AssignOp(Some(BinaryOp::Div)),
            Token::Punct("%=") => AssignOp(Some(BinaryOp::Rem)),
            _ => return Ok(target),
        };
        if !target.is_assignable() {
            return Err(SyntaxError::new("invalid assignment target", span));
        }
        self.advance();
        let value = self.assignment()?;
        Ok(Expr::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    fn conditional(&mut self) -> ParseResult<Expr> {
        let test = self.logical_or()?;
        if !self.eat_punct("?") {
            return Ok(test);
        }
        let consequent = self.assignment()?;
        self.expect_punct(":")?;
        let alternate = self.assignment()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn logical_or(&mut self) -> ParseResult<Expr> {
        let mut left = self.logical_and()?;
        while self.eat_punct("||") {
            self.deepen()?;
            let right = self.logical_and()?;
            left = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn logical_and(&mut self) -> ParseResult<Expr> {
        let mut left = self.equality()?;
        while self.eat_punct("&&") {
            self.deepen()?;
            let right = self.equality()?;
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn binary_level(
        &mut self,
        table: &[(&str, BinaryOp)],
        next: fn(&mut Self) -> ParseResult<Expr>,
    ) -> ParseResult<Expr> {
        let mut left = next(self)?;
        loop {
            let op = match self.peek() {
                Token::Punct(p) => table.iter().find(|(sym, _)| sym == p).map(|(_, op)| *op),
                _ => None,
            };
            let Some(op) = op else {
                return Ok(left);
            };
            self.advance();
            self.deepen()?;
            let right = next(self)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        self.binary_level(
            &[
                ("===", BinaryOp::StrictEq),
                ("!==", BinaryOp::StrictNotEq),
                ("==", BinaryOp::Eq),
                ("!=", BinaryOp::NotEq),
            ],
            Self::relational,
        )
    }

    fn relational(&mut self) -> ParseResult<Expr> {
        self.binary_level(
            &[
                ("<", BinaryOp::Lt),
                (">", BinaryOp::Gt),
                ("<=", BinaryOp::LtEq),
                (">=", BinaryOp::GtEq),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> ParseResult<Expr> {
        self.binary_level(
            &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> ParseResult<Expr> {
        self.binary_level(
            &[
                ("*", BinaryOp::Mul),
                ("/", BinaryOp::Div),
                ("%", BinaryOp::Rem),
            ],
            Self::unary,
        )
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        let span = self.span();
        let op = match self.peek() {
            Token::Punct("!") => Some(UnaryOp::Not),
            Token::Punct("-") => Some(UnaryOp::Neg),
            Token::Punct("+") => Some(UnaryOp::Plus),
            Token::Keyword("typeof") => Some(UnaryOp::TypeOf),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let arg = self.nested(Self::unary)?;
            return Ok(Expr::Unary {
                op,
                arg: Box::new(arg),
            });
        }

        if self.is_keyword("await") {
            if !self.in_async() {
                return Err(SyntaxError::new(
                    "await is only valid in async functions",
                    span,
                ));
            }
            self.advance();
            let arg = self.nested(Self::unary)?;
            return Ok(Expr::Await(Box::new(arg)));
        }

        if self.is_punct("++") || self.is_punct("--") {
            let op = if self.is_punct("++") {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            self.advance();
            let target = self.nested(Self::unary)?;
            if !target.is_assignable() {
                return Err(SyntaxError::new("invalid update target", span));
            }
            return Ok(Expr::Update {
                op,
                prefix: true,
                target: Box::new(target),
            });
        }

        self.postfix()
    }

    fn postfix(&mut self) -> ParseResult<Expr> {
        let span = self.span();
        let expr = self.call_member()?;
        if (self.is_punct("++") || self.is_punct("--")) && !self.on_new_line() {
            let op = if self.is_punct("++") {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            if !expr.is_assignable() {
                return Err(SyntaxError::new("invalid update target", span));
            }
            self.advance();
            return Ok(Expr::Update {
                op,
                prefix: false,
                target: Box::new(expr),
            });
        }
        Ok(expr)
    }

    fn call_member(&mut self) -> ParseResult<Expr> {
        let mut expr = if self.eat_keyword("new") {
            let mut callee = self.primary()?;
            while self.eat_punct(".") {
                self.deepen()?;
                let property = self.property_name()?;
                callee = Expr::Member {
                    object: Box::new(callee),
                    property,
                };
            }
            let args = if self.is_punct("(") {
                self.arguments()?
            } else {
                Vec::new()
            };
            Expr::New {
                callee: Box::new(callee),
                args,
            }
        } else {
            self.primary()?
        };

        loop {
            if self.is_punct(".") || self.is_punct("[") || self.is_punct("(") {
                self.deepen()?;
            }
            if self.eat_punct(".") {
                let property = self.property_name()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                };
            } else if self.eat_punct("[") {
                let index = self.expression()?;
                self.expect_punct("]")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.is_punct("(") {
                let args = self.arguments()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn property_name(&mut self) -> ParseResult<String> {
        let name = match self.peek() {
            Token::Ident(name) => name.clone(),
            Token::Keyword(k) => k.to_string(),
            _ => return Err(self.unexpected("property name")),
        };
        self.advance();
        Ok(name)
    }

    fn arguments(&mut self) -> ParseResult<Vec<Expr>> {
        self.expect_punct("(")?;
        let mut args = Vec::new();
        while !self.is_punct(")") {
            args.push(self.assignment()?);
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(")")?;
        Ok(args)
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        match self.peek().clone() {
            Token::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            Token::Str(s) => {
                self.advance();
                Ok(Expr::Str(s))
            }
            Token::Keyword("true") => {
                self.advance();
                Ok(Expr::Bool(true))
            }
            Token::Keyword("false") => {
                self.advance();
                Ok(Expr::Bool(false))
            }
            Token::Keyword("null") => {
                self.advance();
                Ok(Expr::Null)
            }
            Token::Keyword("undefined") => {
                self.advance();
                Ok(Expr::Undefined)
            }
            Token::Keyword("function") => Ok(Expr::Function(self.function(false, false)?)),
            Token::Ident(ref word)
                if word == "async" && matches!(self.peek_at(1), Token::Keyword("function")) =>
            {
                self.advance();
                Ok(Expr::Function(self.function(true, false)?))
            }
            Token::Ident(name) => {
                self.advance();
                Ok(Expr::Ident(name))
            }
            Token::Punct("(") => {
                self.advance();
                let expr = self.expression()?;
                self.expect_punct(")")?;
                Ok(expr)
            }
            Token::Punct("[") => {
                self.advance();
                let mut elements = Vec::new();
                while !self.is_punct("]") {
                    elements.push(self.assignment()?);
                    if !self.eat_punct(",") {
                        break;
                    }
                }
                self.expect_punct("]")?;
                Ok(Expr::Array(elements))
            }
            Token::Punct("{") => self.object_literal(),
            _ => Err(self.unexpected("expression")),
        }
    }

    fn object_literal(&mut self) -> ParseResult<Expr> {
        self.expect_punct("{")?;
        let mut props = Vec::new();
        while !self.is_punct("}") {
            let key = match self.peek() {
                Token::Ident(name) | Token::Str(name) => name.clone(),
                Token::Keyword(k) => k.to_string(),
                Token::Number(n) => number_to_string(*n),
                _ => return Err(self.unexpected("property key")),
            };
            self.advance();
            let value = if self.eat_punct(":") {
                self.assignment()?
            } else {
                Expr::Ident(key.clone())
            };
            props.push((key, value));
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct("}")?;
        Ok(Expr::Object(props))
    }
}
