use super::ScriptError;
use super::lexer::{Spanned, Token};

/// Deepest expression/block nesting accepted, operator chains included
const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    NotEq,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Bool(bool),
    Var(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    Index(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let(String, Expr),
    Assign(String, Expr),
    If {
        condition: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Vec<Stmt>,
    },
    Return(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    /// Line of the `fn` keyword
    pub line: usize,
}

/// Parse a whole script: exactly one function definition
pub fn parse(tokens: &[Spanned]) -> Result<Function, ScriptError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let function = parser.function()?;
    if let Some(extra) = parser.peek_spanned() {
        return Err(ScriptError::Syntax {
            line: extra.line,
            message: "a script holds exactly one function".to_string(),
        });
    }
    Ok(function)
}

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek_spanned(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn peek(&self) -> Option<&Token> {
        self.peek_spanned().map(|s| &s.token)
    }

    fn line(&self) -> usize {
        self.peek_spanned()
            .or_else(|| self.tokens.last())
            .map(|s| s.line)
            .unwrap_or(1)
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T, ScriptError> {
        Err(ScriptError::Syntax {
            line: self.line(),
            message: message.into(),
        })
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos).map(|s| &s.token);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), ScriptError> {
        if self.eat(&expected) {
            Ok(())
        } else {
            self.error(format!("expected {}", what))
        }
    }

    fn ident(&mut self, what: &str) -> Result<String, ScriptError> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => self.error(format!("expected {}", what)),
        }
    }

    fn enter(&mut self) -> Result<(), ScriptError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return self.error("nesting too deep");
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Each operator node in a left-folded chain sits one level deeper than
    /// the last, so it counts towards the nesting limit like a bracket does
    fn link(&mut self, links: &mut usize) -> Result<(), ScriptError> {
        *links += 1;
        self.enter()
    }

    fn unlink(&mut self, links: usize) {
        self.depth -= links;
    }

    fn function(&mut self) -> Result<Function, ScriptError> {
        // a bare `name(params) { .. }` header is accepted as well as `fn name(..)`
        let line = self.line();
        self.eat(&Token::Fn);
        let name = self.ident("function name")?;
        self.expect(Token::LParen, "`(` after function name")?;

        let mut params = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                params.push(self.ident("parameter name")?);
                if self.eat(&Token::RParen) {
                    break;
                }
                self.expect(Token::Comma, "`,` or `)` in parameter list")?;
            }
        }

        let body = self.block()?;
        Ok(Function {
            name,
            params,
            body,
            line,
        })
    }

    fn block(&mut self) -> Result<Vec<Stmt>, ScriptError> {
        self.enter()?;
        self.expect(Token::LBrace, "`{`")?;
        let mut stmts = Vec::new();
        while !self.eat(&Token::RBrace) {
            if self.peek().is_none() {
                return self.error("unclosed block, expected `}`");
            }
            stmts.push(self.statement()?);
        }
        self.leave();
        Ok(stmts)
    }

    fn statement(&mut self) -> Result<Stmt, ScriptError> {
        match self.peek() {
            Some(Token::Let) => {
                self.pos += 1;
                let name = self.ident("variable name after `let`")?;
                self.expect(Token::Assign, "`=` in let binding")?;
                let value = self.expression()?;
                self.expect(Token::Semi, "`;` after let binding")?;
                Ok(Stmt::Let(name, value))
            }
            Some(Token::If) => self.if_statement(),
            Some(Token::Return) => {
                self.pos += 1;
                let value = self.expression()?;
                self.expect(Token::Semi, "`;` after return value")?;
                Ok(Stmt::Return(value))
            }
            Some(Token::Ident(_))
                if self.tokens.get(self.pos + 1).map(|s| &s.token) == Some(&Token::Assign) =>
            {
                let name = self.ident("variable name")?;
                self.pos += 1;
                let value = self.expression()?;
                self.expect(Token::Semi, "`;` after assignment")?;
                Ok(Stmt::Assign(name, value))
            }
            _ => self.error("expected `let`, `if`, `return` or an assignment"),
        }
    }

    fn if_statement(&mut self) -> Result<Stmt, ScriptError> {
        self.expect(Token::If, "`if`")?;
        let condition = self.expression()?;
        let then_branch = self.block()?;
        let else_branch = if self.eat(&Token::Else) {
            if self.peek() == Some(&Token::If) {
                self.enter()?;
                let nested = self.if_statement()?;
                self.leave();
                vec![nested]
            } else {
                self.block()?
            }
        } else {
            Vec::new()
        };
        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn expression(&mut self) -> Result<Expr, ScriptError> {
        self.enter()?;
        let expr = self.or();
        self.leave();
        expr
    }

    fn or(&mut self) -> Result<Expr, ScriptError> {
        let mut links = 0;
        let mut lhs = self.and()?;
        while self.eat(&Token::OrOr) {
            self.link(&mut links)?;
            let rhs = self.and()?;
            lhs = Expr::Binary(BinaryOp::Or, Box::new(lhs), Box::new(rhs));
        }
        self.unlink(links);
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr, ScriptError> {
        let mut links = 0;
        let mut lhs = self.comparison()?;
        while self.eat(&Token::AndAnd) {
            self.link(&mut links)?;
            let rhs = self.comparison()?;
            lhs = Expr::Binary(BinaryOp::And, Box::new(lhs), Box::new(rhs));
        }
        self.unlink(links);
        Ok(lhs)
    }

    fn comparison(&mut self) -> Result<Expr, ScriptError> {
        let lhs = self.additive()?;
        let op = match self.peek() {
            Some(Token::Lt) => BinaryOp::Lt,
            Some(Token::Le) => BinaryOp::Le,
            Some(Token::Gt) => BinaryOp::Gt,
            Some(Token::Ge) => BinaryOp::Ge,
            Some(Token::EqEq) => BinaryOp::Eq,
            Some(Token::NotEq) => BinaryOp::NotEq,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        self.enter()?;
        let rhs = self.additive()?;
        self.leave();
        Ok(Expr::Binary(op, Box::new(lhs), Box::new(rhs)))
    }

    fn additive(&mut self) -> Result<Expr, ScriptError> {
        let mut links = 0;
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            self.link(&mut links)?;
            let rhs = self.multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        self.unlink(links);
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> Result<Expr, ScriptError> {
        let mut links = 0;
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => break,
            };
            self.pos += 1;
            self.link(&mut links)?;
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        self.unlink(links);
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ScriptError> {
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Bang) => UnaryOp::Not,
            _ => return self.postfix(),
        };
        self.pos += 1;
        self.enter()?;
        let operand = self.unary()?;
        self.leave();
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn postfix(&mut self) -> Result<Expr, ScriptError> {
        let mut links = 0;
        let mut expr = self.primary()?;
        while self.eat(&Token::LBracket) {
            self.link(&mut links)?;
            let index = self.expression()?;
            self.expect(Token::RBracket, "`]` after index")?;
            expr = Expr::Index(Box::new(expr), Box::new(index));
        }
        self.unlink(links);
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, ScriptError> {
        let line = self.line();
        match self.advance().cloned() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::True) => Ok(Expr::Bool(true)),
            Some(Token::False) => Ok(Expr::Bool(false)),
            Some(Token::LParen) => {
                let inner = self.expression()?;
                self.expect(Token::RParen, "`)`")?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                if !self.eat(&Token::LParen) {
                    return Ok(Expr::Var(name));
                }
                let mut args = Vec::new();
                if !self.eat(&Token::RParen) {
                    loop {
                        args.push(self.expression()?);
                        if self.eat(&Token::RParen) {
                            break;
                        }
                        self.expect(Token::Comma, "`,` or `)` in call arguments")?;
                    }
                }
                Ok(Expr::Call(name, args))
            }
            Some(other) => Err(ScriptError::Syntax {
                line,
                message: format!("unexpected token {:?}", other),
            }),
            None => Err(ScriptError::Syntax {
                line,
                message: "unexpected end of script".to_string(),
            }),
        }
    }
}
