// ABOUTME: Recursive-descent parser turning tokens into statements

use crate::ast::{Expr, FunctionDecl, LiteralValue, Stmt};
use crate::error::{ParseError, Reporter};
use crate::token::{Literal, Token, TokenKind};
use std::rc::Rc;

/// Parses a token stream into statements with panic-mode error recovery.
///
/// A parse error reports through the `Reporter` and unwinds to the nearest
/// declaration, which discards tokens until a statement boundary and keeps
/// going. The parser therefore always returns the statements it could make
/// sense of; the reporter's flag tells the driver whether to evaluate them.
pub struct Parser<'r> {
    tokens: Vec<Token>,
    current: usize,
    reporter: &'r mut dyn Reporter,
}

type ExprResult = Result<Expr, ParseError>;
type StmtResult = Result<Stmt, ParseError>;

impl<'r> Parser<'r> {
    pub fn new(tokens: Vec<Token>, reporter: &'r mut dyn Reporter) -> Self {
        Parser {
            tokens,
            current: 0,
            reporter,
        }
    }

    pub fn parse(mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            if let Some(statement) = self.declaration() {
                statements.push(statement);
            }
        }
        statements
    }

    // ----- declarations -----

    fn declaration(&mut self) -> Option<Stmt> {
        let result = if self.match_kind(&[TokenKind::Var]) {
            self.var_declaration()
        } else if self.match_kind(&[TokenKind::Fun]) {
            self.function_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(statement) => Some(statement),
            Err(ParseError) => {
                self.synchronize();
                None
            }
        }
    }

    fn var_declaration(&mut self) -> StmtResult {
        let name = self.consume(TokenKind::Identifier, "Expect variable name.")?;

        let initializer = if self.match_kind(&[TokenKind::Equal]) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenKind::Semicolon,
            "Expect ';' after variable declaration.",
        )?;
        Ok(Stmt::Var { name, initializer })
    }

    fn function_declaration(&mut self) -> StmtResult {
        let name = self.consume(TokenKind::Identifier, "Expect function name.")?;
        self.consume(TokenKind::LeftParen, "Expect '(' after function name.")?;

        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                params.push(self.consume(TokenKind::Identifier, "Expect parameter name.")?);
                if !self.match_kind(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.")?;

        self.consume(TokenKind::LeftBrace, "Expect '{' before function body.")?;
        let body = self.block()?;

        Ok(Stmt::Function {
            declaration: Rc::new(FunctionDecl { name, params, body }),
        })
    }

    // ----- statements -----

    fn statement(&mut self) -> StmtResult {
        if self.match_kind(&[TokenKind::Print]) {
            return self.print_statement();
        }
        if self.match_kind(&[TokenKind::Return]) {
            return self.return_statement();
        }
        if self.match_kind(&[TokenKind::If]) {
            return self.if_statement();
        }
        if self.match_kind(&[TokenKind::While]) {
            return self.while_statement();
        }
        if self.match_kind(&[TokenKind::For]) {
            return self.for_statement();
        }
        if self.match_kind(&[TokenKind::LeftBrace]) {
            return Ok(Stmt::Block {
                statements: self.block()?,
            });
        }
        self.expression_statement()
    }

    fn print_statement(&mut self) -> StmtResult {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after value.")?;
        Ok(Stmt::Print { expr })
    }

    fn return_statement(&mut self) -> StmtResult {
        let keyword = self.previous().clone();
        let value = if !self.check(TokenKind::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after return value.")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn if_statement(&mut self) -> StmtResult {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_kind(&[TokenKind::Else]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> StmtResult {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after condition.")?;
        let body = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body })
    }

    /// Desugars `for (init; cond; incr) body` into
    /// `{ init; while (cond) { body; incr; } }`, wrapping in blocks only
    /// for the clauses that are present.
    fn for_statement(&mut self) -> StmtResult {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.match_kind(&[TokenKind::Semicolon]) {
            None
        } else if self.match_kind(&[TokenKind::Var]) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if !self.check(TokenKind::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.")?;

        let increment = if !self.check(TokenKind::RightParen) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block {
                statements: vec![body, Stmt::Expression { expr: increment }],
            };
        }

        let condition = condition.unwrap_or(Expr::Literal {
            value: LiteralValue::Bool(true),
        });
        body = Stmt::While {
            condition,
            body: Box::new(body),
        };

        if let Some(initializer) = initializer {
            body = Stmt::Block {
                statements: vec![initializer, body],
            };
        }

        Ok(body)
    }

    fn expression_statement(&mut self) -> StmtResult {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.")?;
        Ok(Stmt::Expression { expr })
    }

    fn block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            if let Some(statement) = self.declaration() {
                statements.push(statement);
            }
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }

    // ----- expressions, precedence low to high -----

    fn expression(&mut self) -> ExprResult {
        self.assignment()
    }

    fn assignment(&mut self) -> ExprResult {
        let expr = self.or()?;

        if self.match_kind(&[TokenKind::Equal]) {
            let equals = self.previous().clone();
            let value = self.assignment()?;

            if let Expr::Variable { name, .. } = expr {
                return Ok(Expr::assign(name, value));
            }

            // Reported but not raised: the bad target is kept and parsing
            // continues from here.
            self.reporter.error_at(&equals, "Invalid assignment target.");
        }

        Ok(expr)
    }

    fn or(&mut self) -> ExprResult {
        let mut expr = self.and()?;

        while self.match_kind(&[TokenKind::Or]) {
            let op = self.previous().clone();
            let right = self.and()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn and(&mut self) -> ExprResult {
        let mut expr = self.equality()?;

        while self.match_kind(&[TokenKind::And]) {
            let op = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> ExprResult {
        let mut expr = self.comparison()?;

        while self.match_kind(&[TokenKind::BangEqual, TokenKind::EqualEqual]) {
            let op = self.previous().clone();
            let right = self.comparison()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> ExprResult {
        let mut expr = self.term()?;

        while self.match_kind(&[
            TokenKind::Greater,
            TokenKind::GreaterEqual,
            TokenKind::Less,
            TokenKind::LessEqual,
        ]) {
            let op = self.previous().clone();
            let right = self.term()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn term(&mut self) -> ExprResult {
        let mut expr = self.factor()?;

        while self.match_kind(&[TokenKind::Minus, TokenKind::Plus]) {
            let op = self.previous().clone();
            let right = self.factor()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn factor(&mut self) -> ExprResult {
        let mut expr = self.unary()?;

        while self.match_kind(&[TokenKind::Slash, TokenKind::Star]) {
            let op = self.previous().clone();
            let right = self.unary()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> ExprResult {
        if self.match_kind(&[TokenKind::Bang, TokenKind::Minus]) {
            let op = self.previous().clone();
            let right = self.unary()?;
            return Ok(Expr::Unary {
                op,
                right: Box::new(right),
            });
        }
        self.call()
    }

    fn call(&mut self) -> ExprResult {
        let mut expr = self.primary()?;

        while self.match_kind(&[TokenKind::LeftParen]) {
            expr = self.finish_call(expr)?;
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> ExprResult {
        let mut arguments = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                arguments.push(self.expression()?);
                if !self.match_kind(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        let paren = self.consume(TokenKind::RightParen, "Expect ')' after arguments.")?;

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> ExprResult {
        if self.match_kind(&[TokenKind::False]) {
            return Ok(Expr::Literal {
                value: LiteralValue::Bool(false),
            });
        }
        if self.match_kind(&[TokenKind::True]) {
            return Ok(Expr::Literal {
                value: LiteralValue::Bool(true),
            });
        }
        if self.match_kind(&[TokenKind::Nil]) {
            return Ok(Expr::Literal {
                value: LiteralValue::Nil,
            });
        }

        if self.match_kind(&[TokenKind::Number, TokenKind::String]) {
            let value = match self.previous().literal.clone() {
                Some(Literal::Number(n)) => LiteralValue::Number(n),
                Some(Literal::Str(s)) => LiteralValue::Str(s),
                None => LiteralValue::Nil,
            };
            return Ok(Expr::Literal { value });
        }

        if self.match_kind(&[TokenKind::Identifier]) {
            return Ok(Expr::variable(self.previous().clone()));
        }

        if self.match_kind(&[TokenKind::LeftParen]) {
            let inner = self.expression()?;
            self.consume(TokenKind::RightParen, "Expect ')' after expression.")?;
            return Ok(Expr::Grouping {
                inner: Box::new(inner),
            });
        }

        Err(self.error(self.peek().clone(), "Expect expression."))
    }

    // ----- token stream plumbing -----

    fn match_kind(&mut self, kinds: &[TokenKind]) -> bool {
        for kind in kinds {
            if self.check(*kind) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn check(&self, kind: TokenKind) -> bool {
        if self.is_at_end() {
            return false;
        }
        self.peek().kind == kind
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            return Ok(self.advance().clone());
        }
        Err(self.error(self.peek().clone(), message))
    }

    fn error(&mut self, token: Token, message: &str) -> ParseError {
        self.reporter.error_at(&token, message);
        ParseError
    }

    /// Panic-mode recovery: discard tokens until just past a `;` or at the
    /// start of the next statement keyword.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }

            match self.peek().kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => {}
            }

            self.advance();
        }
    }
}
